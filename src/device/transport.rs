//! Transport abstraction over the serial link.
//!
//! The channel talks to the device through this trait so that execution
//! logic can run against a scripted mock in tests and demos, with
//! [`SerialTransport`] as the production implementation.

use std::io::{self, ErrorKind, Read, Write};
use std::time::{Duration, Instant};

use crate::error::{ConnectionError, Result};

/// Poll granularity for deadline reads on the serial port.
const READ_POLL: Duration = Duration::from_millis(100);

/// Byte-stream transport framed into newline-terminated lines.
pub trait Transport: Send {
    /// Write one line, newline appended, and flush it to the device.
    fn write_line(&mut self, line: &str) -> io::Result<()>;

    /// Read one line, waiting up to `timeout`.
    ///
    /// Returns `Ok(None)` when the deadline expires without a complete
    /// line; trailing `\r` is stripped.
    fn read_line(&mut self, timeout: Duration) -> io::Result<Option<String>>;

    /// Discard any buffered input.
    fn flush_input(&mut self) -> io::Result<()>;
}

/// Production transport over a system serial port.
pub struct SerialTransport {
    port: Box<dyn serialport::SerialPort>,
    buffer: Vec<u8>,
}

impl SerialTransport {
    /// Open a serial port at the given baud rate.
    ///
    /// # Errors
    ///
    /// `ConnectionError::PortUnavailable` when the port cannot be opened.
    pub fn open(port_name: &str, baud_rate: u32) -> Result<Self> {
        let port = serialport::new(port_name, baud_rate)
            .timeout(READ_POLL)
            .open()
            .map_err(|e| ConnectionError::PortUnavailable {
                port: port_name.to_string(),
                detail: e.to_string(),
            })?;
        Ok(Self {
            port,
            buffer: Vec::new(),
        })
    }

    fn take_buffered_line(&mut self) -> Option<String> {
        let pos = self.buffer.iter().position(|&b| b == b'\n')?;
        let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Some(String::from_utf8_lossy(&line).into_owned())
    }
}

impl Transport for SerialTransport {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.port.write_all(line.as_bytes())?;
        self.port.write_all(b"\n")?;
        self.port.flush()
    }

    fn read_line(&mut self, timeout: Duration) -> io::Result<Option<String>> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(line) = self.take_buffered_line() {
                return Ok(Some(line));
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            let _ = self.port.set_timeout((deadline - now).min(READ_POLL));

            let mut chunk = [0u8; 256];
            match self.port.read(&mut chunk) {
                Ok(0) => {}
                Ok(n) => self.buffer.extend_from_slice(&chunk[..n]),
                Err(e)
                    if e.kind() == ErrorKind::TimedOut || e.kind() == ErrorKind::WouldBlock => {}
                Err(e) => return Err(e),
            }
        }
    }

    fn flush_input(&mut self) -> io::Result<()> {
        self.buffer.clear();
        self.port
            .clear(serialport::ClearBuffer::Input)
            .map_err(|e| io::Error::new(ErrorKind::Other, e))
    }
}

/// Enumerate system serial ports.
///
/// An empty list is not an error; enumeration failures are reported as an
/// empty list since the caller can do nothing else with them.
pub fn available_ports() -> Vec<String> {
    match serialport::available_ports() {
        Ok(ports) => ports.into_iter().map(|p| p.port_name).collect(),
        Err(e) => {
            log::warn!("serial port enumeration failed: {}", e);
            Vec::new()
        }
    }
}
