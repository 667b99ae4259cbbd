//! Playlists: named pattern sequences, their storage contract, and the
//! scheduler that runs them atop the execution engine.

pub mod scheduler;
pub mod store;

pub use scheduler::{PlaylistOptions, PlaylistScheduler, ReshufflePolicy, RunMode};
pub use store::{FilePlaylistStore, MemoryPlaylistStore, Playlist, PlaylistStore};
