//! Wire protocol for the table controller.
//!
//! The device speaks a newline-framed ASCII protocol. Every line the host
//! sends is acknowledged with [`ACK`]; the firmware answers `IGNORED` for
//! no-op moves, which counts as an acknowledgement too. An empty line is
//! acknowledged without motion and serves as the connect probe.

use crate::pattern::Coordinate;

/// Acknowledgement line sent by the device after each command.
pub const ACK: &str = "R";

/// Acknowledgement variant for commands the firmware dropped as no-ops.
pub const ACK_IGNORED: &str = "IGNORED";

/// Whether a received line acknowledges the previous command.
#[inline]
pub fn is_ack(line: &str) -> bool {
    let line = line.trim();
    line == ACK || line == ACK_IGNORED
}

/// A single host-to-device command.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCommand {
    /// Linear move to a theta-rho target.
    Move(Coordinate),
    /// Change the device-side speed scalar.
    SetSpeed(f64),
    /// Run the homing sequence.
    Home,
    /// Empty probe line, acknowledged without motion.
    Probe,
}

impl DeviceCommand {
    /// Encode the command as one wire line, newline excluded.
    pub fn encode(&self) -> String {
        match self {
            DeviceCommand::Move(c) => format!("{:.5},{:.5}", c.theta, c.rho),
            DeviceCommand::SetSpeed(v) => format!("SPEED {:.3}", v),
            DeviceCommand::Home => "HOME".to_string(),
            DeviceCommand::Probe => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_move() {
        let cmd = DeviceCommand::Move(Coordinate::new(1.5708, 0.5));
        assert_eq!(cmd.encode(), "1.57080,0.50000");
    }

    #[test]
    fn test_encode_speed_and_home() {
        assert_eq!(DeviceCommand::SetSpeed(2.5).encode(), "SPEED 2.500");
        assert_eq!(DeviceCommand::Home.encode(), "HOME");
        assert_eq!(DeviceCommand::Probe.encode(), "");
    }

    #[test]
    fn test_is_ack() {
        assert!(is_ack("R"));
        assert!(is_ack("R\r"));
        assert!(is_ack("IGNORED"));
        assert!(!is_ack("pos 1.0,0.5"));
        assert!(!is_ack(""));
    }
}
