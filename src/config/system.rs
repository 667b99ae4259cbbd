//! System configuration - root configuration structure.

use serde::{Deserialize, Serialize};

/// Root configuration structure from TOML.
///
/// Every section is optional; defaults describe a stock installation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SystemConfig {
    /// Serial device settings.
    #[serde(default)]
    pub device: DeviceConfig,

    /// Motion defaults.
    #[serde(default)]
    pub motion: MotionSettings,

    /// Pattern and playlist storage paths.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Canned clear patterns run between user patterns.
    #[serde(default)]
    pub clear_patterns: ClearPatterns,
}

/// Serial device settings.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceConfig {
    /// Port to connect to at startup; `None` leaves the device disconnected
    /// until an explicit connect.
    #[serde(default)]
    pub port: Option<String>,

    /// Serial baud rate.
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// Acknowledgement timeout per command, in milliseconds.
    #[serde(default = "default_ack_timeout_ms")]
    pub ack_timeout_ms: u64,
}

/// Motion defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct MotionSettings {
    /// Default speed scalar for runs that do not specify one.
    #[serde(default = "default_speed")]
    pub default_speed: f64,
}

/// Pattern and playlist storage paths.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory holding `.thr` pattern files.
    #[serde(default = "default_patterns_dir")]
    pub patterns_dir: String,

    /// JSON document holding all playlists.
    #[serde(default = "default_playlists_file")]
    pub playlists_file: String,
}

/// File names of the canned clear patterns, relative to the pattern root.
#[derive(Debug, Clone, Deserialize)]
pub struct ClearPatterns {
    /// Wipes from the center outward.
    #[serde(default = "default_clear_from_in")]
    pub from_in: String,

    /// Wipes from the perimeter inward.
    #[serde(default = "default_clear_from_out")]
    pub from_out: String,

    /// Sideways wipe.
    #[serde(default = "default_clear_sideways")]
    pub sideways: String,
}

/// Which clear pattern, if any, runs before a user pattern.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClearPolicy {
    /// No clear prelude.
    #[default]
    None,
    /// Wipe from the center outward first.
    ClearIn,
    /// Wipe from the perimeter inward first.
    ClearOut,
    /// Sideways wipe first.
    ClearSideways,
}

impl ClearPatterns {
    /// Pattern file name for a clear policy; `None` for [`ClearPolicy::None`].
    pub fn file_for(&self, policy: ClearPolicy) -> Option<&str> {
        match policy {
            ClearPolicy::None => None,
            ClearPolicy::ClearIn => Some(self.from_in.as_str()),
            ClearPolicy::ClearOut => Some(self.from_out.as_str()),
            ClearPolicy::ClearSideways => Some(self.sideways.as_str()),
        }
    }
}

fn default_baud_rate() -> u32 {
    115_200
}

fn default_ack_timeout_ms() -> u64 {
    5_000
}

fn default_speed() -> f64 {
    1.0
}

fn default_patterns_dir() -> String {
    "patterns".to_string()
}

fn default_playlists_file() -> String {
    "playlists.json".to_string()
}

fn default_clear_from_in() -> String {
    "clear_from_in.thr".to_string()
}

fn default_clear_from_out() -> String {
    "clear_from_out.thr".to_string()
}

fn default_clear_sideways() -> String {
    "clear_sideway.thr".to_string()
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: default_baud_rate(),
            ack_timeout_ms: default_ack_timeout_ms(),
        }
    }
}

impl Default for MotionSettings {
    fn default() -> Self {
        Self {
            default_speed: default_speed(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            patterns_dir: default_patterns_dir(),
            playlists_file: default_playlists_file(),
        }
    }
}

impl Default for ClearPatterns {
    fn default() -> Self {
        Self {
            from_in: default_clear_from_in(),
            from_out: default_clear_from_out(),
            sideways: default_clear_sideways(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SystemConfig::default();
        assert_eq!(config.device.baud_rate, 115_200);
        assert_eq!(config.device.ack_timeout_ms, 5_000);
        assert_eq!(config.motion.default_speed, 1.0);
        assert_eq!(config.storage.patterns_dir, "patterns");
    }

    #[test]
    fn test_clear_pattern_lookup() {
        let patterns = ClearPatterns::default();
        assert_eq!(patterns.file_for(ClearPolicy::None), None);
        assert_eq!(
            patterns.file_for(ClearPolicy::ClearIn),
            Some("clear_from_in.thr")
        );
        assert_eq!(
            patterns.file_for(ClearPolicy::ClearOut),
            Some("clear_from_out.thr")
        );
        assert_eq!(
            patterns.file_for(ClearPolicy::ClearSideways),
            Some("clear_sideway.thr")
        );
    }
}
