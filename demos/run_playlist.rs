//! Run a shuffled playlist with an inter-entry pause.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use sandtable_motion::config::{ClearPolicy, SystemConfig};
use sandtable_motion::device::MockTransport;
use sandtable_motion::pattern::MemoryPatternStore;
use sandtable_motion::playlist::{
    MemoryPlaylistStore, Playlist, PlaylistOptions, PlaylistScheduler,
};
use sandtable_motion::{ExecutionEngine, PatternStore, PlaylistStore};

fn main() {
    env_logger::init();
    println!("=== Playlist Example ===\n");

    let patterns = Arc::new(MemoryPatternStore::new());
    patterns.insert("arc.thr", "0.0 0.2\n1.5708 0.5\n3.1416 0.8\n");
    patterns.insert("sweep.thr", "0.0 1.0\n6.2832 0.1\n");
    patterns.insert("clear_from_in.thr", "0.0 1.0\n0.0 0.0\n");

    let config = SystemConfig::default();
    let engine = ExecutionEngine::new(&config, Arc::clone(&patterns) as Arc<dyn PatternStore>);
    engine
        .connect_with(Box::new(MockTransport::new()), "mock0")
        .expect("mock connect");

    let playlists = Arc::new(MemoryPlaylistStore::new());
    playlists
        .save(&Playlist::new(
            "demo",
            vec!["arc.thr".into(), "sweep.thr".into()],
        ))
        .expect("save playlist");

    let scheduler = PlaylistScheduler::new(
        engine.clone(),
        playlists as Arc<dyn PlaylistStore>,
        patterns as Arc<dyn PatternStore>,
    );

    let options = PlaylistOptions {
        pause_between: Duration::from_millis(500),
        clear_policy: ClearPolicy::ClearIn,
        shuffle: true,
        seed: Some(7),
        ..PlaylistOptions::default()
    };
    scheduler
        .run_playlist("demo", options)
        .expect("playlist should start");

    while scheduler.is_active() {
        let status = engine.status();
        if let Some(playlist) = &status.playlist {
            println!(
                "[{}] entry {}/{} ({})",
                status.state,
                playlist.index + 1,
                playlist.total,
                status.pattern.as_deref().unwrap_or("-")
            );
        }
        thread::sleep(Duration::from_millis(200));
    }

    println!("\nPlaylist finished; engine is {}.", engine.state());
}
