//! Run-state machine states.
//!
//! Exactly one run state is live process-wide: the table has a single
//! physical actuator and can execute one motion program at a time.

use std::fmt;

use serde::Serialize;

/// State of the execution engine.
///
/// Transitions: `Idle → Running → {Paused ⇄ Running} → {Stopped | Error}`.
/// `Stopped` and `Error` are terminal for the run; the engine returns to
/// `Idle` through [`reset`](super::ExecutionEngine::reset) or on the next
/// accepted `run` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// No run in progress; ready to accept one.
    Idle,
    /// Commands are being issued to the device.
    Running,
    /// Issuance is suspended; the cursor is retained.
    Paused,
    /// Stop requested; waiting for the in-flight command to complete.
    Stopping,
    /// Run ended by completion or stop. Terminal.
    Stopped,
    /// Run ended by a device failure. Terminal.
    Error,
}

impl RunState {
    /// Whether a run is in progress (including one that is stopping).
    #[inline]
    pub fn is_active(self) -> bool {
        matches!(self, RunState::Running | RunState::Paused | RunState::Stopping)
    }

    /// Whether this is a terminal state for a finished run.
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Stopped | RunState::Error)
    }

    /// State name as a static string.
    pub fn as_str(self) -> &'static str {
        match self {
            RunState::Idle => "idle",
            RunState::Running => "running",
            RunState::Paused => "paused",
            RunState::Stopping => "stopping",
            RunState::Stopped => "stopped",
            RunState::Error => "error",
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
