//! Error types for the sandtable-motion library.
//!
//! Provides unified error handling across pattern decoding, device I/O,
//! engine state transitions, and storage lookups.

use std::fmt;
use std::time::Duration;

use crate::engine::RunState;

/// Result type alias using the library's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for all sandtable-motion operations.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Pattern content is malformed
    Parse(ParseError),
    /// Serial connection could not be established or is absent
    Connection(ConnectionError),
    /// Serial write/read failure or acknowledgement timeout
    Io(IoError),
    /// Another run is already active
    Conflict(ConflictError),
    /// Invalid state transition requested
    State(StateError),
    /// Pattern, playlist, or port does not exist
    NotFound(NotFoundError),
    /// Operation not permitted on this resource
    Permission(PermissionError),
    /// Configuration parsing or validation error
    Config(ConfigError),
}

/// Pattern decoding errors.
///
/// A pattern that fails to decode aborts the run before any motion starts
/// and is never retried automatically.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    /// Content contains no coordinate lines
    Empty,
    /// Content is not valid UTF-8
    InvalidEncoding,
    /// A field could not be parsed as a number
    NonNumeric {
        /// 1-based line number in the file
        line: usize,
        /// The offending token
        token: String,
    },
    /// A line does not contain exactly two fields
    FieldCount {
        /// 1-based line number in the file
        line: usize,
        /// Number of fields found
        count: usize,
    },
    /// Rho is outside the normalized [0, 1] range
    RhoOutOfRange {
        /// 1-based line number in the file
        line: usize,
        /// The out-of-range value
        rho: f64,
    },
    /// A manually supplied coordinate is not a valid table position
    InvalidCoordinate {
        /// Angle in radians
        theta: f64,
        /// Normalized radius
        rho: f64,
    },
}

/// Serial connection errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionError {
    /// Port could not be opened
    PortUnavailable {
        /// Requested port identifier
        port: String,
        /// Underlying failure description
        detail: String,
    },
    /// Port opened but the device never acknowledged the probe
    HandshakeFailed {
        /// Requested port identifier
        port: String,
    },
    /// Operation requires a connected device
    NotConnected,
}

/// Serial I/O errors during command issuance.
///
/// These move the engine to the `error` state; physical position is
/// uncertain afterwards, so they are never retried blindly.
#[derive(Debug, Clone, PartialEq)]
pub enum IoError {
    /// Write to the device failed
    Write {
        /// Underlying failure description
        detail: String,
    },
    /// Read from the device failed
    Read {
        /// Underlying failure description
        detail: String,
    },
    /// No acknowledgement within the configured timeout
    AckTimeout {
        /// The timeout that elapsed
        timeout: Duration,
    },
}

/// Conflict errors: the device can execute only one motion program at a time.
#[derive(Debug, Clone, PartialEq)]
pub enum ConflictError {
    /// The execution engine is not idle
    EngineBusy {
        /// State the engine was found in
        state: RunState,
    },
    /// A playlist is already being scheduled
    PlaylistActive,
}

/// Invalid transition requested on the engine state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum StateError {
    /// The command is not valid from the current state
    InvalidTransition {
        /// State the engine was in
        from: RunState,
        /// The rejected command
        command: &'static str,
    },
}

/// Lookup failures for named resources.
#[derive(Debug, Clone, PartialEq)]
pub enum NotFoundError {
    /// Pattern name unknown to the pattern store
    Pattern(String),
    /// Playlist name unknown to the playlist store
    Playlist(String),
    /// Serial port identifier not present on the system
    Port(String),
}

/// Permission failures.
#[derive(Debug, Clone, PartialEq)]
pub enum PermissionError {
    /// Only user-provided patterns may be deleted
    BuiltinPattern(String),
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Failed to parse TOML configuration
    Parse(String),
    /// Configuration file could not be read
    Io(String),
    /// Baud rate must be positive
    InvalidBaudRate(u32),
    /// Acknowledgement timeout must be positive
    InvalidAckTimeout(u64),
    /// Speed scalar must be positive
    InvalidSpeed(f64),
    /// A clear-pattern file name is empty
    EmptyClearPattern {
        /// Which clear policy the name belongs to
        policy: &'static str,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Parse(e) => write!(f, "Parse error: {}", e),
            Error::Connection(e) => write!(f, "Connection error: {}", e),
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Conflict(e) => write!(f, "Conflict: {}", e),
            Error::State(e) => write!(f, "State error: {}", e),
            Error::NotFound(e) => write!(f, "Not found: {}", e),
            Error::Permission(e) => write!(f, "Permission denied: {}", e),
            Error::Config(e) => write!(f, "Configuration error: {}", e),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Empty => write!(f, "pattern contains no coordinates"),
            ParseError::InvalidEncoding => write!(f, "pattern is not valid UTF-8"),
            ParseError::NonNumeric { line, token } => {
                write!(f, "line {}: '{}' is not a number", line, token)
            }
            ParseError::FieldCount { line, count } => {
                write!(f, "line {}: expected 2 fields, found {}", line, count)
            }
            ParseError::RhoOutOfRange { line, rho } => {
                write!(f, "line {}: rho {} outside [0, 1]", line, rho)
            }
            ParseError::InvalidCoordinate { theta, rho } => {
                write!(f, "invalid coordinate (theta={}, rho={})", theta, rho)
            }
        }
    }
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionError::PortUnavailable { port, detail } => {
                write!(f, "port '{}' unavailable: {}", port, detail)
            }
            ConnectionError::HandshakeFailed { port } => {
                write!(f, "no handshake response on port '{}'", port)
            }
            ConnectionError::NotConnected => write!(f, "device is not connected"),
        }
    }
}

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IoError::Write { detail } => write!(f, "write failed: {}", detail),
            IoError::Read { detail } => write!(f, "read failed: {}", detail),
            IoError::AckTimeout { timeout } => {
                write!(f, "no acknowledgement within {:?}", timeout)
            }
        }
    }
}

impl fmt::Display for ConflictError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictError::EngineBusy { state } => {
                write!(f, "engine is {}, not idle", state)
            }
            ConflictError::PlaylistActive => write!(f, "a playlist is already running"),
        }
    }
}

impl fmt::Display for StateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateError::InvalidTransition { from, command } => {
                write!(f, "'{}' is not valid while {}", command, from)
            }
        }
    }
}

impl fmt::Display for NotFoundError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotFoundError::Pattern(name) => write!(f, "pattern '{}' not found", name),
            NotFoundError::Playlist(name) => write!(f, "playlist '{}' not found", name),
            NotFoundError::Port(name) => write!(f, "serial port '{}' not found", name),
        }
    }
}

impl fmt::Display for PermissionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionError::BuiltinPattern(name) => {
                write!(f, "pattern '{}' is built in and cannot be deleted", name)
            }
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Parse(msg) => write!(f, "parse error: {}", msg),
            ConfigError::Io(msg) => write!(f, "I/O error: {}", msg),
            ConfigError::InvalidBaudRate(v) => {
                write!(f, "invalid baud rate: {}. Must be > 0", v)
            }
            ConfigError::InvalidAckTimeout(v) => {
                write!(f, "invalid ack timeout: {} ms. Must be > 0", v)
            }
            ConfigError::InvalidSpeed(v) => write!(f, "invalid speed: {}. Must be > 0", v),
            ConfigError::EmptyClearPattern { policy } => {
                write!(f, "clear pattern for '{}' has an empty file name", policy)
            }
        }
    }
}

// Conversion impls
impl From<ParseError> for Error {
    fn from(e: ParseError) -> Self {
        Error::Parse(e)
    }
}

impl From<ConnectionError> for Error {
    fn from(e: ConnectionError) -> Self {
        Error::Connection(e)
    }
}

impl From<IoError> for Error {
    fn from(e: IoError) -> Self {
        Error::Io(e)
    }
}

impl From<ConflictError> for Error {
    fn from(e: ConflictError) -> Self {
        Error::Conflict(e)
    }
}

impl From<StateError> for Error {
    fn from(e: StateError) -> Self {
        Error::State(e)
    }
}

impl From<NotFoundError> for Error {
    fn from(e: NotFoundError) -> Self {
        Error::NotFound(e)
    }
}

impl From<PermissionError> for Error {
    fn from(e: PermissionError) -> Self {
        Error::Permission(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

impl std::error::Error for Error {}
impl std::error::Error for ParseError {}
impl std::error::Error for ConnectionError {}
impl std::error::Error for IoError {}
impl std::error::Error for ConflictError {}
impl std::error::Error for StateError {}
impl std::error::Error for NotFoundError {}
impl std::error::Error for PermissionError {}
impl std::error::Error for ConfigError {}
