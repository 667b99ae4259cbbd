//! # sandtable-motion
//!
//! Theta-rho pattern execution engine for polar sand table devices.
//!
//! ## Features
//!
//! - **Pattern decoding**: theta-rho files to ordered coordinate sequences
//! - **Motion planning**: linear interpolation commands with speed control
//! - **Serial device channel**: connect/disconnect/restart with
//!   acknowledged, timeout-bounded command sends over `serialport`
//! - **Execution engine**: one coordinating worker per process with
//!   pause/resume/stop taking effect within a single command
//! - **Playlists**: sequenced runs with clear preludes, interruptible
//!   pacing, loop mode, and a seedable shuffle
//! - **Status fan-out**: push-on-change snapshots to any number of
//!   subscribers without blocking motion control
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use sandtable_motion::{ExecutionEngine, FilePatternStore, RunOptions, SystemConfig};
//!
//! let config: SystemConfig = sandtable_motion::load_config("sandtable.toml")?;
//! let patterns = Arc::new(FilePatternStore::new(&config.storage.patterns_dir));
//!
//! let engine = ExecutionEngine::new(&config, patterns);
//! engine.connect("/dev/ttyUSB0")?;
//!
//! let run = engine.run("spiral.thr", RunOptions::default())?;
//! run.wait();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

// Core modules
pub mod config;
pub mod device;
pub mod engine;
pub mod error;
pub mod motion;
pub mod pattern;
pub mod playlist;
pub mod status;

// Re-exports for ergonomic API
pub use config::{load_config, parse_config, ClearPolicy, SystemConfig};
pub use device::{DeviceChannel, DeviceCommand, MockTransport, SerialTransport, Transport};
pub use engine::{ExecutionEngine, Progress, RunHandle, RunOptions, RunOutcome, RunState};
pub use error::{Error, Result};
pub use motion::{plan, MotionCommand};
pub use pattern::{decode, decode_bytes, Coordinate, FilePatternStore, PatternStore};
pub use playlist::{
    FilePlaylistStore, Playlist, PlaylistOptions, PlaylistScheduler, PlaylistStore, RunMode,
};
pub use status::{StatusBroadcaster, StatusSnapshot, Subscription};
