//! Scripted mock transport for tests and demos.

use std::collections::VecDeque;
use std::io::{self, ErrorKind};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::protocol::ACK;
use super::transport::Transport;

#[derive(Debug)]
struct MockState {
    sent: Vec<String>,
    responses: VecDeque<String>,
    auto_ack: bool,
    silent: bool,
    ack_delay: Duration,
    fail_next_write: Option<String>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            sent: Vec::new(),
            responses: VecDeque::new(),
            auto_ack: true,
            silent: false,
            ack_delay: Duration::ZERO,
            fail_next_write: None,
        }
    }
}

/// A [`Transport`] that acknowledges every line like the real firmware.
///
/// By default each written line queues an `R` acknowledgement. The paired
/// [`MockHandle`] scripts failures and inspects traffic from the test
/// thread while the transport itself is owned by the device channel.
#[derive(Debug, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

/// Cloneable scripting handle for a [`MockTransport`].
#[derive(Debug, Clone)]
pub struct MockHandle {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    /// Create an auto-acknowledging mock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a scripting handle.
    pub fn handle(&self) -> MockHandle {
        MockHandle {
            state: Arc::clone(&self.state),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().expect("mock transport lock poisoned")
    }
}

impl MockHandle {
    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().expect("mock transport lock poisoned")
    }

    /// Every line written so far, in order.
    pub fn sent(&self) -> Vec<String> {
        self.lock().sent.clone()
    }

    /// Number of lines written so far.
    pub fn sent_count(&self) -> usize {
        self.lock().sent.len()
    }

    /// Queue a raw response line ahead of any auto-acknowledgements.
    pub fn push_response(&self, line: &str) {
        self.lock().responses.push_front(line.to_string());
    }

    /// Switch between auto-acknowledging writes and manual acknowledgement
    /// via [`MockHandle::ack`].
    pub fn set_auto_ack(&self, auto_ack: bool) {
        self.lock().auto_ack = auto_ack;
    }

    /// Acknowledge the oldest unacknowledged command (manual-ack mode).
    pub fn ack(&self) {
        self.lock().responses.push_back(ACK.to_string());
    }

    /// Stop acknowledging; subsequent sends time out.
    pub fn set_silent(&self, silent: bool) {
        self.lock().silent = silent;
    }

    /// Delay each acknowledgement, simulating command execution time.
    pub fn set_ack_delay(&self, delay: Duration) {
        self.lock().ack_delay = delay;
    }

    /// Fail the next write with a broken-pipe error.
    pub fn fail_next_write(&self, detail: &str) {
        self.lock().fail_next_write = Some(detail.to_string());
    }
}

impl Transport for MockTransport {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        let mut state = self.lock();
        if let Some(detail) = state.fail_next_write.take() {
            return Err(io::Error::new(ErrorKind::BrokenPipe, detail));
        }
        state.sent.push(line.to_string());
        if state.auto_ack && !state.silent {
            state.responses.push_back(ACK.to_string());
        }
        Ok(())
    }

    fn read_line(&mut self, timeout: Duration) -> io::Result<Option<String>> {
        let deadline = std::time::Instant::now() + timeout;

        let delay = self.lock().ack_delay;
        if !delay.is_zero() {
            if delay >= timeout {
                std::thread::sleep(timeout);
                return Ok(None);
            }
            std::thread::sleep(delay);
        }

        // Poll: responses may arrive from the scripting handle at any time.
        loop {
            {
                let mut state = self.lock();
                if !state.silent {
                    if let Some(line) = state.responses.pop_front() {
                        return Ok(Some(line));
                    }
                }
            }
            if std::time::Instant::now() >= deadline {
                return Ok(None);
            }
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    fn flush_input(&mut self) -> io::Result<()> {
        self.lock().responses.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_ack() {
        let mut mock = MockTransport::new();
        mock.write_line("1.00000,0.50000").unwrap();
        let ack = mock.read_line(Duration::from_millis(10)).unwrap();
        assert_eq!(ack.as_deref(), Some(ACK));
    }

    #[test]
    fn test_silent_times_out() {
        let mut mock = MockTransport::new();
        let handle = mock.handle();
        handle.set_silent(true);
        mock.write_line("HOME").unwrap();
        assert!(mock.read_line(Duration::from_millis(5)).unwrap().is_none());
    }

    #[test]
    fn test_fail_next_write() {
        let mut mock = MockTransport::new();
        let handle = mock.handle();
        handle.fail_next_write("unplugged");
        assert!(mock.write_line("HOME").is_err());
        // next write succeeds again
        assert!(mock.write_line("HOME").is_ok());
        assert_eq!(handle.sent(), vec!["HOME"]);
    }
}
