//! Playlist scheduler.
//!
//! Sequences playlist entries atop the execution engine: clear-pattern
//! preludes, interruptible inter-entry pauses, once/loop modes, and a
//! seedable shuffle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::config::ClearPolicy;
use crate::engine::{ExecutionEngine, RunOptions, RunOutcome};
use crate::error::{ConflictError, NotFoundError, Result};
use crate::pattern::PatternStore;
use crate::status::PlaylistStatus;

use super::store::{Playlist, PlaylistStore};

/// Whether the playlist runs once or repeats until stopped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// One pass over the entries, ending at terminal `stopped`.
    #[default]
    Once,
    /// Restart at the playlist end until stopped.
    Loop,
}

/// When a shuffled order is re-materialized under [`RunMode::Loop`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReshufflePolicy {
    /// Reshuffle once per loop iteration.
    #[default]
    EachLoop,
    /// Shuffle once at playlist start, then keep that order.
    Once,
}

/// Options for a playlist run.
#[derive(Debug, Clone, Copy)]
pub struct PlaylistOptions {
    /// Idle gap between entries, interruptible by stop.
    pub pause_between: Duration,
    /// Clear pattern run before each entry.
    pub clear_policy: ClearPolicy,
    /// Once or loop.
    pub run_mode: RunMode,
    /// Shuffle the entry order.
    pub shuffle: bool,
    /// Shuffle seed; `None` seeds from entropy.
    pub seed: Option<u64>,
    /// Reshuffle policy under loop mode.
    pub reshuffle: ReshufflePolicy,
}

impl Default for PlaylistOptions {
    fn default() -> Self {
        Self {
            pause_between: Duration::ZERO,
            clear_policy: ClearPolicy::None,
            run_mode: RunMode::Once,
            shuffle: false,
            seed: None,
            reshuffle: ReshufflePolicy::EachLoop,
        }
    }
}

struct ActiveRun {
    stop_tx: Sender<()>,
    finished: Arc<AtomicBool>,
}

/// Sequences playlists atop the execution engine.
pub struct PlaylistScheduler {
    engine: ExecutionEngine,
    playlists: Arc<dyn PlaylistStore>,
    patterns: Arc<dyn PatternStore>,
    active: Mutex<Option<ActiveRun>>,
}

impl PlaylistScheduler {
    /// Create a scheduler over the given engine and stores.
    pub fn new(
        engine: ExecutionEngine,
        playlists: Arc<dyn PlaylistStore>,
        patterns: Arc<dyn PatternStore>,
    ) -> Self {
        Self {
            engine,
            playlists,
            patterns,
            active: Mutex::new(None),
        }
    }

    /// Start a playlist run on a scheduler thread.
    ///
    /// Entries are validated against the pattern store before anything
    /// moves. The materialized order is shuffled at start when requested;
    /// loop mode reshuffles per iteration under the default
    /// [`ReshufflePolicy::EachLoop`].
    ///
    /// # Errors
    ///
    /// * `NotFoundError::Playlist`: unknown or empty playlist
    /// * `NotFoundError::Pattern`: an entry missing from the pattern store
    /// * `ConflictError::PlaylistActive` / `ConflictError::EngineBusy`:
    ///   something is already running
    pub fn run_playlist(&self, name: &str, options: PlaylistOptions) -> Result<()> {
        let playlist = self.playlists.get(name)?;
        // An empty playlist is reported the same as a missing one.
        if playlist.entries.is_empty() {
            return Err(NotFoundError::Playlist(name.to_string()).into());
        }

        let known = self.patterns.list()?;
        for entry in &playlist.entries {
            if !known.contains(entry) {
                return Err(NotFoundError::Pattern(entry.clone()).into());
            }
        }

        let mut active = self.lock_active();
        if active
            .as_ref()
            .is_some_and(|run| !run.finished.load(Ordering::Acquire))
        {
            return Err(ConflictError::PlaylistActive.into());
        }
        let engine_state = self.engine.state();
        if engine_state.is_active() {
            return Err(ConflictError::EngineBusy {
                state: engine_state,
            }
            .into());
        }

        let (stop_tx, stop_rx) = unbounded();
        let finished = Arc::new(AtomicBool::new(false));
        let worker = SchedulerWorker {
            engine: self.engine.clone(),
            playlist,
            options,
            stop_rx,
            finished: Arc::clone(&finished),
        };
        thread::Builder::new()
            .name("playlist-scheduler".to_string())
            .spawn(move || worker.run())
            .expect("failed to spawn playlist scheduler");

        *active = Some(ActiveRun { stop_tx, finished });
        info!("playlist '{}' started", name);
        Ok(())
    }

    /// Stop the playlist: the running entry is stopped and no further
    /// entry is scheduled. No-op when nothing is active.
    pub fn stop(&self) {
        let active = self.lock_active();
        let Some(run) = active.as_ref() else {
            return;
        };
        if run.finished.load(Ordering::Acquire) {
            return;
        }
        let _ = run.stop_tx.send(());
        // Between entries the engine is already terminal; that is fine.
        if let Err(e) = self.engine.stop() {
            debug!("engine stop during playlist stop: {}", e);
        }
    }

    /// Whether a playlist run is in progress.
    pub fn is_active(&self) -> bool {
        self.lock_active()
            .as_ref()
            .is_some_and(|run| !run.finished.load(Ordering::Acquire))
    }

    fn lock_active(&self) -> std::sync::MutexGuard<'_, Option<ActiveRun>> {
        self.active.lock().expect("scheduler lock poisoned")
    }
}

struct SchedulerWorker {
    engine: ExecutionEngine,
    playlist: Playlist,
    options: PlaylistOptions,
    stop_rx: Receiver<()>,
    finished: Arc<AtomicBool>,
}

impl SchedulerWorker {
    fn run(self) {
        let mut rng = match self.options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut order = self.playlist.entries.clone();
        if self.options.shuffle {
            order.shuffle(&mut rng);
        }

        let mut first_pass = true;
        'outer: loop {
            if !first_pass
                && self.options.shuffle
                && self.options.reshuffle == ReshufflePolicy::EachLoop
            {
                order.shuffle(&mut rng);
            }
            first_pass = false;

            for (index, entry) in order.iter().enumerate() {
                self.engine.set_playlist_context(Some(PlaylistStatus {
                    name: self.playlist.name.clone(),
                    index,
                    total: order.len(),
                    next: order.get(index + 1).cloned(),
                }));

                let run_options = RunOptions {
                    clear: self.options.clear_policy,
                    speed: None,
                };
                let handle = match self.engine.run(entry, run_options) {
                    Ok(handle) => handle,
                    Err(e) => {
                        warn!(
                            "playlist '{}': entry '{}' failed to start: {}",
                            self.playlist.name, entry, e
                        );
                        break 'outer;
                    }
                };
                match handle.wait() {
                    RunOutcome::Completed => {}
                    RunOutcome::Stopped => break 'outer,
                    RunOutcome::Failed(e) => {
                        warn!(
                            "playlist '{}': entry '{}' failed: {}",
                            self.playlist.name, entry, e
                        );
                        break 'outer;
                    }
                }
                if self.stop_rx.try_recv().is_ok() {
                    break 'outer;
                }

                let last = index + 1 == order.len();
                let skip_pause = last && self.options.run_mode == RunMode::Once;
                if !skip_pause && !self.options.pause_between.is_zero() {
                    match self.stop_rx.recv_timeout(self.options.pause_between) {
                        Ok(()) => break 'outer,
                        Err(RecvTimeoutError::Timeout) => {}
                        Err(RecvTimeoutError::Disconnected) => {}
                    }
                }
            }

            if self.options.run_mode == RunMode::Once {
                break;
            }
        }

        self.engine.set_playlist_context(None);
        self.finished.store(true, Ordering::Release);
        info!("playlist '{}' finished", self.playlist.name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SystemConfig;
    use crate::device::MockTransport;
    use crate::error::Error;
    use crate::pattern::store::MemoryPatternStore;
    use crate::playlist::store::MemoryPlaylistStore;

    fn fixture() -> (PlaylistScheduler, ExecutionEngine) {
        let patterns = Arc::new(MemoryPatternStore::new());
        patterns.insert("a.thr", "0.0 0.2\n1.57 0.5\n3.14 0.8\n");
        patterns.insert("b.thr", "0.0 0.8\n1.0 0.3\n");

        let mut config = SystemConfig::default();
        config.device.ack_timeout_ms = 50;
        let engine = ExecutionEngine::new(&config, Arc::clone(&patterns) as Arc<dyn PatternStore>);
        engine
            .connect_with(Box::new(MockTransport::new()), "mock0")
            .unwrap();

        let playlists = Arc::new(MemoryPlaylistStore::new());
        playlists
            .save(&Playlist::new("both", vec!["a.thr".into(), "b.thr".into()]))
            .unwrap();
        playlists.save(&Playlist::new("empty", vec![])).unwrap();
        playlists
            .save(&Playlist::new("dangling", vec!["ghost.thr".into()]))
            .unwrap();

        let scheduler = PlaylistScheduler::new(engine.clone(), playlists, patterns);
        (scheduler, engine)
    }

    #[test]
    fn test_unknown_playlist() {
        let (scheduler, _engine) = fixture();
        assert!(matches!(
            scheduler.run_playlist("nope", PlaylistOptions::default()),
            Err(Error::NotFound(NotFoundError::Playlist(_)))
        ));
    }

    #[test]
    fn test_empty_playlist_reports_not_found() {
        let (scheduler, _engine) = fixture();
        assert!(matches!(
            scheduler.run_playlist("empty", PlaylistOptions::default()),
            Err(Error::NotFound(NotFoundError::Playlist(_)))
        ));
    }

    #[test]
    fn test_dangling_entry_validated_at_schedule_time() {
        let (scheduler, _engine) = fixture();
        assert!(matches!(
            scheduler.run_playlist("dangling", PlaylistOptions::default()),
            Err(Error::NotFound(NotFoundError::Pattern(name))) if name == "ghost.thr"
        ));
    }

    #[test]
    fn test_seeded_shuffle_is_deterministic() {
        let entries: Vec<String> = (0..16).map(|i| format!("{}.thr", i)).collect();

        let mut a = entries.clone();
        a.shuffle(&mut StdRng::seed_from_u64(42));
        let mut b = entries.clone();
        b.shuffle(&mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
        assert_ne!(a, entries);

        let mut c = entries.clone();
        c.shuffle(&mut StdRng::seed_from_u64(43));
        assert_ne!(a, c);
    }

    #[test]
    fn test_conflict_when_playlist_active() {
        let (scheduler, engine) = fixture();
        let options = PlaylistOptions {
            pause_between: Duration::from_millis(200),
            ..PlaylistOptions::default()
        };
        scheduler.run_playlist("both", options).unwrap();
        assert!(scheduler.is_active());

        assert!(matches!(
            scheduler.run_playlist("both", PlaylistOptions::default()),
            Err(Error::Conflict(_))
        ));

        scheduler.stop();
        // wait for the scheduler thread to drain
        for _ in 0..100 {
            if !scheduler.is_active() {
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }
        assert!(!scheduler.is_active());
        let _ = engine.reset();
    }
}
