//! System configuration from TOML.
//!
//! Mirrors the on-disk layout of a table installation: the serial device,
//! motion defaults, storage paths, and the canned clear patterns.

pub mod loader;
pub mod system;
pub mod validation;

pub use loader::{load_config, parse_config};
pub use system::{
    ClearPatterns, ClearPolicy, DeviceConfig, MotionSettings, StorageConfig, SystemConfig,
};
pub use validation::validate_config;
