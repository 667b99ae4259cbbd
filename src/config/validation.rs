//! Configuration validation.

use crate::error::{ConfigError, Result};

use super::{ClearPolicy, SystemConfig};

/// Validate a system configuration.
///
/// Checks:
/// - Baud rate and acknowledgement timeout are positive
/// - Default speed is a positive finite number
/// - Clear pattern file names are not empty
pub fn validate_config(config: &SystemConfig) -> Result<()> {
    if config.device.baud_rate == 0 {
        return Err(ConfigError::InvalidBaudRate(config.device.baud_rate).into());
    }

    if config.device.ack_timeout_ms == 0 {
        return Err(ConfigError::InvalidAckTimeout(config.device.ack_timeout_ms).into());
    }

    let speed = config.motion.default_speed;
    if !(speed.is_finite() && speed > 0.0) {
        return Err(ConfigError::InvalidSpeed(speed).into());
    }

    for (policy, name) in [
        ("clear_in", config.clear_patterns.file_for(ClearPolicy::ClearIn)),
        ("clear_out", config.clear_patterns.file_for(ClearPolicy::ClearOut)),
        (
            "clear_sideways",
            config.clear_patterns.file_for(ClearPolicy::ClearSideways),
        ),
    ] {
        if name.is_some_and(|n| n.trim().is_empty()) {
            return Err(ConfigError::EmptyClearPattern { policy }.into());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&SystemConfig::default()).is_ok());
    }

    #[test]
    fn test_invalid_baud_rate() {
        let mut config = SystemConfig::default();
        config.device.baud_rate = 0;
        assert!(matches!(
            validate_config(&config),
            Err(Error::Config(ConfigError::InvalidBaudRate(0)))
        ));
    }

    #[test]
    fn test_invalid_ack_timeout() {
        let mut config = SystemConfig::default();
        config.device.ack_timeout_ms = 0;
        assert!(matches!(
            validate_config(&config),
            Err(Error::Config(ConfigError::InvalidAckTimeout(0)))
        ));
    }

    #[test]
    fn test_invalid_default_speed() {
        for speed in [0.0, -2.0, f64::NAN] {
            let mut config = SystemConfig::default();
            config.motion.default_speed = speed;
            assert!(matches!(
                validate_config(&config),
                Err(Error::Config(ConfigError::InvalidSpeed(_)))
            ));
        }
    }

    #[test]
    fn test_empty_clear_pattern_name() {
        let mut config = SystemConfig::default();
        config.clear_patterns.from_out = "  ".to_string();
        assert!(matches!(
            validate_config(&config),
            Err(Error::Config(ConfigError::EmptyClearPattern {
                policy: "clear_out"
            }))
        ));
    }
}
