//! Run-state snapshots and push-on-change fan-out to observers.

pub mod broadcaster;

pub use broadcaster::{
    PlaylistStatus, ProgressReport, StatusBroadcaster, StatusSnapshot, Subscription,
};
