//! Execution engine driver.
//!
//! The public [`ExecutionEngine`] handle validates commands against the
//! run-state machine under one mutex; a dedicated worker thread owns the
//! device channel and issues motion commands, checking for control changes
//! between commands. A stop or pause therefore takes effect within one
//! command's duration, never mid-command.

use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread;
use std::time::Instant;

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use log::{error, info, warn};

use crate::config::{ClearPatterns, ClearPolicy, SystemConfig};
use crate::device::channel::{ConnectionStatus, DeviceChannel};
use crate::device::protocol::DeviceCommand;
use crate::device::transport::{available_ports, Transport};
use crate::error::{
    ConflictError, ConnectionError, ConfigError, IoError, ParseError, Result, StateError,
};
use crate::motion::{self, MotionCommand};
use crate::pattern::{self, Coordinate, PatternStore};
use crate::status::{
    PlaylistStatus, ProgressReport, StatusBroadcaster, StatusSnapshot, Subscription,
};

use super::context::ExecutionContext;
use super::{Progress, RunOutcome, RunState};

/// Options for a single pattern run.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Clear pattern to run before the pattern itself.
    pub clear: ClearPolicy,
    /// Speed override; becomes the engine speed for this and later runs.
    pub speed: Option<f64>,
}

/// Handle to a started run.
#[derive(Debug)]
pub struct RunHandle {
    done_rx: Receiver<RunOutcome>,
}

impl RunHandle {
    /// Block until the run reaches a terminal state.
    pub fn wait(&self) -> RunOutcome {
        self.done_rx.recv().unwrap_or_else(|_| {
            RunOutcome::Failed(
                IoError::Read {
                    detail: "engine worker terminated".to_string(),
                }
                .into(),
            )
        })
    }

    /// Outcome if the run has already finished.
    pub fn try_wait(&self) -> Option<RunOutcome> {
        self.done_rx.try_recv().ok()
    }
}

/// One decoded-and-planned phase of a run (clear prelude or the pattern).
struct Phase {
    pattern: String,
    commands: Vec<MotionCommand>,
}

enum WorkerRequest {
    Execute {
        phases: Vec<Phase>,
        done_tx: Sender<RunOutcome>,
    },
    OneShot {
        commands: Vec<DeviceCommand>,
        done_tx: Sender<Result<()>>,
    },
}

struct EngineInner {
    state: RunState,
    context: Option<ExecutionContext>,
    speed: f64,
    playlist: Option<PlaylistStatus>,
    /// Cached so snapshots never wait on the device mutex.
    connection: ConnectionStatus,
}

struct EngineShared {
    inner: Mutex<EngineInner>,
    /// Wakes the worker out of a paused wait on resume/stop.
    wake: Condvar,
    device: Mutex<DeviceChannel>,
    broadcaster: Arc<StatusBroadcaster>,
    patterns: Arc<dyn PatternStore>,
    clear_patterns: ClearPatterns,
}

impl EngineShared {
    fn lock_inner(&self) -> MutexGuard<'_, EngineInner> {
        self.inner.lock().expect("engine state lock poisoned")
    }

    fn lock_device(&self) -> MutexGuard<'_, DeviceChannel> {
        self.device.lock().expect("device channel lock poisoned")
    }
}

/// The process-wide execution engine.
///
/// Cheap to clone; all clones drive the same state machine and worker.
#[derive(Clone)]
pub struct ExecutionEngine {
    shared: Arc<EngineShared>,
    work_tx: Sender<WorkerRequest>,
}

impl ExecutionEngine {
    /// Create an engine (disconnected, idle) and spawn its worker thread.
    ///
    /// The worker exits when the last engine clone is dropped.
    pub fn new(config: &SystemConfig, patterns: Arc<dyn PatternStore>) -> Self {
        let speed = config.motion.default_speed;
        let shared = Arc::new(EngineShared {
            inner: Mutex::new(EngineInner {
                state: RunState::Idle,
                context: None,
                speed,
                playlist: None,
                connection: ConnectionStatus {
                    connected: false,
                    port: None,
                },
            }),
            wake: Condvar::new(),
            device: Mutex::new(DeviceChannel::from_config(&config.device)),
            broadcaster: Arc::new(StatusBroadcaster::new(StatusSnapshot::initial(speed))),
            patterns,
            clear_patterns: config.clear_patterns.clone(),
        });

        let (work_tx, work_rx) = unbounded();
        let worker_shared = Arc::clone(&shared);
        thread::Builder::new()
            .name("engine-worker".to_string())
            .spawn(move || worker_loop(worker_shared, work_rx))
            .expect("failed to spawn engine worker");

        Self { shared, work_tx }
    }

    // ------------------------------------------------------------------
    // Run control
    // ------------------------------------------------------------------

    /// Start a pattern run.
    ///
    /// Reads and decodes the pattern (plus the clear prelude, if any),
    /// plans motion, and hands the plan to the worker. The engine is
    /// `running` when this returns; use the returned handle to wait for
    /// the terminal state.
    ///
    /// # Errors
    ///
    /// * `ConflictError::EngineBusy`: a run is already active
    /// * `ConnectionError::NotConnected`: no device attached
    /// * `NotFoundError::Pattern` / `ParseError`: bad pattern; the run
    ///   aborts before any motion and the engine returns to idle
    pub fn run(&self, pattern_name: &str, options: RunOptions) -> Result<RunHandle> {
        if let Some(speed) = options.speed {
            if !(speed.is_finite() && speed > 0.0) {
                return Err(ConfigError::InvalidSpeed(speed).into());
            }
        }

        self.reserve(options.speed)?;
        info!("run '{}' starting", pattern_name);

        match self.prepare_phases(pattern_name, options.clear) {
            Ok(phases) => {
                let (done_tx, done_rx) = bounded(1);
                if self
                    .work_tx
                    .send(WorkerRequest::Execute { phases, done_tx })
                    .is_err()
                {
                    self.release_reservation();
                    return Err(worker_gone());
                }
                Ok(RunHandle { done_rx })
            }
            Err(e) => {
                self.release_reservation();
                Err(e)
            }
        }
    }

    /// Pause the running pattern after the in-flight command completes.
    ///
    /// # Errors
    ///
    /// `StateError::InvalidTransition` unless the engine is `running`.
    pub fn pause(&self) -> Result<()> {
        let mut inner = self.shared.lock_inner();
        match inner.state {
            RunState::Running => {
                inner.state = RunState::Paused;
                if let Some(ctx) = inner.context.as_mut() {
                    ctx.begin_pause(Instant::now());
                }
                publish_locked(&self.shared, &inner);
                Ok(())
            }
            from => Err(StateError::InvalidTransition {
                from,
                command: "pause",
            }
            .into()),
        }
    }

    /// Resume a paused run from its cursor.
    ///
    /// # Errors
    ///
    /// `StateError::InvalidTransition` unless the engine is `paused`.
    pub fn resume(&self) -> Result<()> {
        let mut inner = self.shared.lock_inner();
        match inner.state {
            RunState::Paused => {
                inner.state = RunState::Running;
                if let Some(ctx) = inner.context.as_mut() {
                    ctx.end_pause(Instant::now());
                }
                self.shared.wake.notify_all();
                publish_locked(&self.shared, &inner);
                Ok(())
            }
            from => Err(StateError::InvalidTransition {
                from,
                command: "resume",
            }
            .into()),
        }
    }

    /// Stop the run as soon as the in-flight command completes; remaining
    /// planned commands are discarded.
    ///
    /// # Errors
    ///
    /// `StateError::InvalidTransition` unless the engine is `running` or
    /// `paused`.
    pub fn stop(&self) -> Result<()> {
        let mut inner = self.shared.lock_inner();
        match inner.state {
            RunState::Running | RunState::Paused => {
                if let Some(ctx) = inner.context.as_mut() {
                    ctx.end_pause(Instant::now());
                }
                inner.state = RunState::Stopping;
                self.shared.wake.notify_all();
                publish_locked(&self.shared, &inner);
                Ok(())
            }
            from => Err(StateError::InvalidTransition {
                from,
                command: "stop",
            }
            .into()),
        }
    }

    /// Reset a terminal `stopped`/`error` state back to `idle`.
    ///
    /// Idempotent from `idle`.
    ///
    /// # Errors
    ///
    /// `StateError::InvalidTransition` while a run is active.
    pub fn reset(&self) -> Result<()> {
        let mut inner = self.shared.lock_inner();
        match inner.state {
            s if s.is_terminal() => {
                inner.state = RunState::Idle;
                inner.context = None;
                publish_locked(&self.shared, &inner);
                Ok(())
            }
            RunState::Idle => Ok(()),
            from => Err(StateError::InvalidTransition {
                from,
                command: "reset",
            }
            .into()),
        }
    }

    /// Set the speed scalar.
    ///
    /// Applies to commands not yet issued; already-issued commands are not
    /// retro-adjusted.
    ///
    /// # Errors
    ///
    /// `ConfigError::InvalidSpeed` unless positive and finite.
    pub fn set_speed(&self, speed: f64) -> Result<()> {
        if !(speed.is_finite() && speed > 0.0) {
            return Err(ConfigError::InvalidSpeed(speed).into());
        }
        let mut inner = self.shared.lock_inner();
        inner.speed = speed;
        publish_locked(&self.shared, &inner);
        Ok(())
    }

    // ------------------------------------------------------------------
    // One-shot manual moves
    // ------------------------------------------------------------------

    /// Send a single coordinate move. Requires an idle engine.
    ///
    /// # Errors
    ///
    /// `ParseError::InvalidCoordinate` for a non-finite theta or a rho
    /// outside `[0, 1]`, plus the one-shot conflict/connection errors.
    pub fn send_coordinate(&self, theta: f64, rho: f64) -> Result<()> {
        if !theta.is_finite() || !rho.is_finite() || !(0.0..=1.0).contains(&rho) {
            return Err(ParseError::InvalidCoordinate { theta, rho }.into());
        }
        self.one_shot(vec![DeviceCommand::Move(Coordinate::new(theta, rho))])
    }

    /// Move the ball to the table center.
    pub fn move_to_center(&self) -> Result<()> {
        self.one_shot(vec![DeviceCommand::Move(Coordinate::center(0.0))])
    }

    /// Move the ball to the table perimeter.
    pub fn move_to_perimeter(&self) -> Result<()> {
        self.one_shot(vec![DeviceCommand::Move(Coordinate::perimeter(0.0))])
    }

    /// Run the device homing sequence.
    pub fn send_home(&self) -> Result<()> {
        self.one_shot(vec![DeviceCommand::Home])
    }

    // ------------------------------------------------------------------
    // Connection management
    // ------------------------------------------------------------------

    /// Connect the device channel to a serial port.
    pub fn connect(&self, port: &str) -> Result<()> {
        let result = self.shared.lock_device().connect(port);
        self.sync_connection();
        result
    }

    /// Connect over an already-open transport (mock or alternate backend).
    pub fn connect_with(&self, transport: Box<dyn Transport>, port: &str) -> Result<()> {
        let result = self.shared.lock_device().connect_with(transport, port);
        self.sync_connection();
        result
    }

    /// Release the serial connection. Idempotent.
    pub fn disconnect(&self) {
        self.shared.lock_device().disconnect();
        self.sync_connection();
    }

    /// Disconnect then reconnect to the given port.
    pub fn restart(&self, port: &str) -> Result<()> {
        let result = self.shared.lock_device().restart(port);
        self.sync_connection();
        result
    }

    /// Enumerate system serial ports. Empty is not an error.
    pub fn list_ports(&self) -> Vec<String> {
        available_ports()
    }

    /// Current connection status.
    pub fn connection(&self) -> ConnectionStatus {
        self.shared.lock_device().status()
    }

    // ------------------------------------------------------------------
    // Observation
    // ------------------------------------------------------------------

    /// Current run state.
    pub fn state(&self) -> RunState {
        self.shared.lock_inner().state
    }

    /// Progress of the current (or just-finished) run phase.
    pub fn progress(&self) -> Option<Progress> {
        let inner = self.shared.lock_inner();
        inner.context.as_ref().map(|ctx| ctx.progress(Instant::now()))
    }

    /// Current speed scalar.
    pub fn speed(&self) -> f64 {
        self.shared.lock_inner().speed
    }

    /// Latest status snapshot.
    pub fn status(&self) -> StatusSnapshot {
        self.shared.broadcaster.current()
    }

    /// Subscribe to status snapshots (current one first, then changes).
    pub fn subscribe(&self) -> Subscription {
        self.shared.broadcaster.subscribe()
    }

    /// Set or clear the playlist lookahead shown in status snapshots.
    pub(crate) fn set_playlist_context(&self, playlist: Option<PlaylistStatus>) {
        let mut inner = self.shared.lock_inner();
        if inner.playlist != playlist {
            inner.playlist = playlist;
            publish_locked(&self.shared, &inner);
        }
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Atomically claim the engine for a new run, resetting a leftover
    /// terminal state first.
    fn reserve(&self, speed: Option<f64>) -> Result<()> {
        let mut inner = self.shared.lock_inner();
        match inner.state {
            RunState::Idle => {}
            s if s.is_terminal() => {
                inner.context = None;
            }
            state => return Err(ConflictError::EngineBusy { state }.into()),
        }
        if !inner.connection.connected {
            return Err(ConnectionError::NotConnected.into());
        }
        inner.state = RunState::Running;
        if let Some(speed) = speed {
            inner.speed = speed;
        }
        publish_locked(&self.shared, &inner);
        Ok(())
    }

    /// Undo a reservation whose run never started motion.
    fn release_reservation(&self) {
        let mut inner = self.shared.lock_inner();
        inner.state = RunState::Idle;
        inner.context = None;
        publish_locked(&self.shared, &inner);
    }

    fn prepare_phases(&self, pattern_name: &str, clear: ClearPolicy) -> Result<Vec<Phase>> {
        let speed = self.speed();
        let mut phases = Vec::new();
        if let Some(clear_file) = self.shared.clear_patterns.file_for(clear) {
            phases.push(self.load_phase(clear_file, speed)?);
        }
        phases.push(self.load_phase(pattern_name, speed)?);
        Ok(phases)
    }

    fn load_phase(&self, name: &str, speed: f64) -> Result<Phase> {
        let bytes = self.shared.patterns.read(name)?;
        let coordinates = pattern::decode_bytes(&bytes)?;
        let commands = motion::plan(&coordinates, speed)?;
        Ok(Phase {
            pattern: name.to_string(),
            commands,
        })
    }

    fn one_shot(&self, commands: Vec<DeviceCommand>) -> Result<()> {
        self.reserve(None)?;
        let (done_tx, done_rx) = bounded(1);
        if self
            .work_tx
            .send(WorkerRequest::OneShot { commands, done_tx })
            .is_err()
        {
            self.release_reservation();
            return Err(worker_gone());
        }
        done_rx.recv().unwrap_or_else(|_| Err(worker_gone()))
    }

    fn sync_connection(&self) {
        let status = self.shared.lock_device().status();
        let mut inner = self.shared.lock_inner();
        if inner.connection != status {
            inner.connection = status;
            publish_locked(&self.shared, &inner);
        }
    }
}

fn worker_gone() -> crate::error::Error {
    IoError::Write {
        detail: "engine worker unavailable".to_string(),
    }
    .into()
}

/// Build and publish a snapshot from the locked engine state.
fn publish_locked(shared: &EngineShared, inner: &EngineInner) {
    let now = Instant::now();
    let progress = inner.context.as_ref().map(|ctx| {
        let p = ctx.progress(now);
        ProgressReport {
            percent: p.percent,
            elapsed_secs: p.elapsed.as_secs_f64(),
            remaining_secs: p.remaining.map(|d| d.as_secs_f64()),
        }
    });
    shared.broadcaster.publish(StatusSnapshot {
        state: inner.state,
        connection: inner.connection.clone(),
        pattern: inner.context.as_ref().map(|c| c.pattern().to_string()),
        progress,
        speed: inner.speed,
        playlist: inner.playlist.clone(),
    });
}

enum Flow {
    Proceed,
    Stop,
}

/// Block while paused; decide whether the next command may be issued.
fn wait_until_runnable(shared: &EngineShared) -> Flow {
    let mut inner = shared.lock_inner();
    loop {
        match inner.state {
            RunState::Running => return Flow::Proceed,
            RunState::Paused => {
                inner = shared
                    .wake
                    .wait(inner)
                    .expect("engine state lock poisoned");
            }
            _ => return Flow::Stop,
        }
    }
}

fn send_to_device(shared: &EngineShared, command: &DeviceCommand) -> Result<()> {
    shared.lock_device().send(command)
}

fn worker_loop(shared: Arc<EngineShared>, work_rx: Receiver<WorkerRequest>) {
    while let Ok(request) = work_rx.recv() {
        match request {
            WorkerRequest::Execute { phases, done_tx } => {
                let outcome = execute_run(&shared, phases);
                finalize_run(&shared, &outcome);
                let _ = done_tx.send(outcome);
            }
            WorkerRequest::OneShot { commands, done_tx } => {
                let _ = done_tx.send(execute_one_shot(&shared, commands));
            }
        }
    }
}

fn execute_run(shared: &EngineShared, phases: Vec<Phase>) -> RunOutcome {
    // Speed actually programmed into the device; a SPEED line is emitted
    // whenever the engine setting has drifted from it.
    let mut device_speed: Option<f64> = None;

    for phase in phases {
        {
            let mut inner = shared.lock_inner();
            let mut context = ExecutionContext::new(
                phase.pattern.clone(),
                phase.commands.len(),
                Instant::now(),
            );
            // A pause may have landed before this phase context existed;
            // its interval must still be excluded from elapsed time.
            if inner.state == RunState::Paused {
                context.begin_pause(Instant::now());
            }
            inner.context = Some(context);
            publish_locked(shared, &inner);
        }

        for command in &phase.commands {
            match wait_until_runnable(shared) {
                Flow::Proceed => {}
                Flow::Stop => return RunOutcome::Stopped,
            }

            let speed = shared.lock_inner().speed;
            if device_speed != Some(speed) {
                if let Err(e) = send_to_device(shared, &DeviceCommand::SetSpeed(speed)) {
                    return RunOutcome::Failed(e);
                }
                device_speed = Some(speed);
            }

            let issued_at = Instant::now();
            if let Err(e) = send_to_device(shared, &DeviceCommand::Move(command.target)) {
                return RunOutcome::Failed(e);
            }

            let mut inner = shared.lock_inner();
            if let Some(ctx) = inner.context.as_mut() {
                ctx.note_command_complete(issued_at.elapsed());
            }
            publish_locked(shared, &inner);
        }
    }

    RunOutcome::Completed
}

fn finalize_run(shared: &EngineShared, outcome: &RunOutcome) {
    let mut inner = shared.lock_inner();
    if let Some(ctx) = inner.context.as_mut() {
        ctx.end_pause(Instant::now());
    }
    inner.state = match outcome {
        RunOutcome::Completed => RunState::Stopped,
        RunOutcome::Stopped => {
            info!("run stopped before completion");
            RunState::Stopped
        }
        RunOutcome::Failed(e) => {
            error!("run failed: {}", e);
            RunState::Error
        }
    };
    // The context is kept through the terminal state so progress stays
    // inspectable; reset (or the next run) destroys it.
    publish_locked(shared, &inner);
}

fn execute_one_shot(shared: &EngineShared, commands: Vec<DeviceCommand>) -> Result<()> {
    for command in &commands {
        match wait_until_runnable(shared) {
            Flow::Proceed => {}
            Flow::Stop => {
                warn!("manual move interrupted by stop");
                break;
            }
        }
        if let Err(e) = send_to_device(shared, command) {
            let mut inner = shared.lock_inner();
            inner.state = RunState::Error;
            publish_locked(shared, &inner);
            return Err(e);
        }
    }

    // Jogs return the engine to idle rather than leaving a terminal state.
    let mut inner = shared.lock_inner();
    if inner.state != RunState::Error {
        inner.state = RunState::Idle;
    }
    publish_locked(shared, &inner);
    Ok(())
}
