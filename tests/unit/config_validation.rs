//! Unit tests for TOML configuration parsing and validation.

use sandtable_motion::config::ClearPolicy;
use sandtable_motion::error::{ConfigError, Error};
use sandtable_motion::parse_config;

#[test]
fn empty_document_parses_to_defaults() {
    let config = parse_config("").expect("defaults should validate");
    assert_eq!(config.device.baud_rate, 115_200);
    assert_eq!(config.device.ack_timeout_ms, 5_000);
    assert_eq!(config.motion.default_speed, 1.0);
    assert_eq!(config.storage.playlists_file, "playlists.json");
    assert_eq!(
        config.clear_patterns.file_for(ClearPolicy::ClearSideways),
        Some("clear_sideway.thr")
    );
}

#[test]
fn partial_sections_keep_remaining_defaults() {
    let config = parse_config(
        r#"
[device]
port = "/dev/ttyACM0"
"#,
    )
    .unwrap();
    assert_eq!(config.device.port.as_deref(), Some("/dev/ttyACM0"));
    assert_eq!(config.device.baud_rate, 115_200);
}

#[test]
fn zero_baud_rate_is_rejected() {
    let err = parse_config("[device]\nbaud_rate = 0\n").unwrap_err();
    assert!(matches!(
        err,
        Error::Config(ConfigError::InvalidBaudRate(0))
    ));
}

#[test]
fn zero_ack_timeout_is_rejected() {
    let err = parse_config("[device]\nack_timeout_ms = 0\n").unwrap_err();
    assert!(matches!(
        err,
        Error::Config(ConfigError::InvalidAckTimeout(0))
    ));
}

#[test]
fn non_positive_speed_is_rejected() {
    let err = parse_config("[motion]\ndefault_speed = -0.5\n").unwrap_err();
    assert!(matches!(err, Error::Config(ConfigError::InvalidSpeed(_))));
}

#[test]
fn blank_clear_pattern_is_rejected() {
    let err = parse_config("[clear_patterns]\nsideways = \"\"\n").unwrap_err();
    assert!(matches!(
        err,
        Error::Config(ConfigError::EmptyClearPattern { .. })
    ));
}

#[test]
fn malformed_toml_reports_parse_error() {
    assert!(matches!(
        parse_config("[device\nbaud"),
        Err(Error::Config(ConfigError::Parse(_)))
    ));
}
