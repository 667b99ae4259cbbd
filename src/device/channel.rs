//! Device channel: single owner of the serial connection.
//!
//! Exactly one channel instance exists per process, guarded by the engine's
//! coordinating path, so the wire protocol never sees interleaved writers.

use std::time::{Duration, Instant};

use log::{debug, info, warn};
use serde::Serialize;

use crate::config::DeviceConfig;
use crate::error::{ConnectionError, IoError, Result};

use super::protocol::{is_ack, DeviceCommand};
use super::transport::{SerialTransport, Transport};

/// Connection state observable by the engine and status reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectionStatus {
    /// Whether a device is connected.
    pub connected: bool,
    /// Port identifier of the active connection, if any.
    pub port: Option<String>,
}

/// Serial connection lifecycle and acknowledged command send.
pub struct DeviceChannel {
    transport: Option<Box<dyn Transport>>,
    port: Option<String>,
    baud_rate: u32,
    ack_timeout: Duration,
}

impl DeviceChannel {
    /// Create a disconnected channel from device configuration.
    pub fn from_config(config: &DeviceConfig) -> Self {
        Self {
            transport: None,
            port: None,
            baud_rate: config.baud_rate,
            ack_timeout: Duration::from_millis(config.ack_timeout_ms),
        }
    }

    /// Connect to a serial port.
    ///
    /// An existing connection is released first. After opening, a probe
    /// line is sent and must be acknowledged within the ack timeout.
    ///
    /// # Errors
    ///
    /// `ConnectionError::PortUnavailable` when the port cannot be opened;
    /// `ConnectionError::HandshakeFailed` when the probe gets no
    /// acknowledgement.
    pub fn connect(&mut self, port: &str) -> Result<()> {
        self.disconnect();
        let transport = SerialTransport::open(port, self.baud_rate)?;
        self.attach(Box::new(transport), port)
    }

    /// Connect over an already-open transport.
    ///
    /// Used with [`super::MockTransport`] in tests and demos, or with an
    /// alternative transport backend. The handshake still runs.
    pub fn connect_with(&mut self, transport: Box<dyn Transport>, port: &str) -> Result<()> {
        self.disconnect();
        self.attach(transport, port)
    }

    fn attach(&mut self, mut transport: Box<dyn Transport>, port: &str) -> Result<()> {
        if let Err(e) = transport.flush_input() {
            warn!("input flush on connect failed: {}", e);
        }
        transport
            .write_line(&DeviceCommand::Probe.encode())
            .map_err(|_| ConnectionError::HandshakeFailed {
                port: port.to_string(),
            })?;
        let acked = wait_for_ack(transport.as_mut(), self.ack_timeout)
            .map_err(|_| ConnectionError::HandshakeFailed {
                port: port.to_string(),
            })?;
        if !acked {
            return Err(ConnectionError::HandshakeFailed {
                port: port.to_string(),
            }
            .into());
        }

        info!("device connected on {}", port);
        self.transport = Some(transport);
        self.port = Some(port.to_string());
        Ok(())
    }

    /// Release the serial resource. Idempotent, always succeeds.
    pub fn disconnect(&mut self) {
        if self.transport.take().is_some() {
            info!("device disconnected from {}", self.port.as_deref().unwrap_or("?"));
        }
        self.port = None;
    }

    /// Disconnect then connect to the given port.
    pub fn restart(&mut self, port: &str) -> Result<()> {
        self.disconnect();
        self.connect(port)
    }

    /// Send one command and block until the device acknowledges it.
    ///
    /// Non-acknowledgement lines received while waiting are telemetry and
    /// are logged then skipped.
    ///
    /// # Errors
    ///
    /// `ConnectionError::NotConnected` when no device is attached;
    /// `IoError::Write`/`IoError::Read` on transport failure;
    /// `IoError::AckTimeout` when the timeout elapses unacknowledged.
    pub fn send(&mut self, command: &DeviceCommand) -> Result<()> {
        let timeout = self.ack_timeout;
        let transport = self
            .transport
            .as_mut()
            .ok_or(ConnectionError::NotConnected)?;

        let line = command.encode();
        debug!("-> {}", line);
        transport.write_line(&line).map_err(|e| IoError::Write {
            detail: e.to_string(),
        })?;

        if wait_for_ack(transport.as_mut(), timeout)? {
            Ok(())
        } else {
            Err(IoError::AckTimeout { timeout }.into())
        }
    }

    /// Whether a device is connected.
    #[inline]
    pub fn is_connected(&self) -> bool {
        self.transport.is_some()
    }

    /// Port identifier of the active connection.
    #[inline]
    pub fn port(&self) -> Option<&str> {
        self.port.as_deref()
    }

    /// Current connection status snapshot.
    pub fn status(&self) -> ConnectionStatus {
        ConnectionStatus {
            connected: self.is_connected(),
            port: self.port.clone(),
        }
    }
}

/// Drain lines until an acknowledgement or the deadline.
fn wait_for_ack(transport: &mut dyn Transport, timeout: Duration) -> Result<bool> {
    let deadline = Instant::now() + timeout;
    loop {
        let now = Instant::now();
        if now >= deadline {
            return Ok(false);
        }
        let line = transport
            .read_line(deadline - now)
            .map_err(|e| IoError::Read {
                detail: e.to_string(),
            })?;
        match line {
            Some(line) if is_ack(&line) => return Ok(true),
            Some(line) => debug!("<- {}", line),
            None => return Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::mock::MockTransport;
    use crate::error::Error;
    use crate::pattern::Coordinate;

    fn config() -> DeviceConfig {
        DeviceConfig {
            port: None,
            baud_rate: 115_200,
            ack_timeout_ms: 50,
        }
    }

    fn connected_channel() -> (DeviceChannel, crate::device::MockHandle) {
        let mock = MockTransport::new();
        let handle = mock.handle();
        let mut channel = DeviceChannel::from_config(&config());
        channel.connect_with(Box::new(mock), "mock0").unwrap();
        (channel, handle)
    }

    #[test]
    fn test_connect_handshake_and_status() {
        let (channel, handle) = connected_channel();
        assert!(channel.is_connected());
        assert_eq!(channel.port(), Some("mock0"));
        // probe line was sent
        assert_eq!(handle.sent(), vec![String::new()]);
        assert_eq!(
            channel.status(),
            ConnectionStatus {
                connected: true,
                port: Some("mock0".to_string()),
            }
        );
    }

    #[test]
    fn test_connect_handshake_failure() {
        let mock = MockTransport::new();
        mock.handle().set_silent(true);
        let mut channel = DeviceChannel::from_config(&config());
        let err = channel.connect_with(Box::new(mock), "mock0").unwrap_err();
        assert!(matches!(
            err,
            Error::Connection(ConnectionError::HandshakeFailed { .. })
        ));
        assert!(!channel.is_connected());
    }

    #[test]
    fn test_send_waits_for_ack() {
        let (mut channel, handle) = connected_channel();
        channel
            .send(&DeviceCommand::Move(Coordinate::new(1.0, 0.5)))
            .unwrap();
        assert_eq!(handle.sent().last().unwrap(), "1.00000,0.50000");
    }

    #[test]
    fn test_send_skips_telemetry_lines() {
        let (mut channel, handle) = connected_channel();
        handle.push_response("pos 0.1,0.2");
        assert!(channel.send(&DeviceCommand::Home).is_ok());
    }

    #[test]
    fn test_send_ack_timeout() {
        let (mut channel, handle) = connected_channel();
        handle.set_silent(true);
        let err = channel.send(&DeviceCommand::Home).unwrap_err();
        assert!(matches!(err, Error::Io(IoError::AckTimeout { .. })));
    }

    #[test]
    fn test_send_write_failure() {
        let (mut channel, handle) = connected_channel();
        handle.fail_next_write("unplugged");
        let err = channel.send(&DeviceCommand::Home).unwrap_err();
        assert!(matches!(err, Error::Io(IoError::Write { .. })));
    }

    #[test]
    fn test_send_requires_connection() {
        let mut channel = DeviceChannel::from_config(&config());
        assert!(matches!(
            channel.send(&DeviceCommand::Home),
            Err(Error::Connection(ConnectionError::NotConnected))
        ));
    }

    #[test]
    fn test_disconnect_is_idempotent() {
        let (mut channel, _handle) = connected_channel();
        channel.disconnect();
        assert!(!channel.is_connected());
        channel.disconnect();
        assert!(!channel.is_connected());
        assert_eq!(channel.port(), None);
    }
}
