//! Planned motion command.

use std::time::Duration;

use crate::pattern::Coordinate;

/// One linear interpolation segment of a planned run.
///
/// Carries the target coordinate, the combined angular+radial distance of
/// the segment, and the duration estimated at planning speed. Actual pacing
/// belongs to the device: the engine programs the live speed into it before
/// the next issued command, so a mid-run speed change affects commands not
/// yet issued without touching these fields.
#[derive(Debug, Clone, PartialEq)]
pub struct MotionCommand {
    /// Target coordinate of the segment.
    pub target: Coordinate,
    /// Combined angular and radial distance from the previous coordinate.
    pub distance: f64,
    /// Estimated duration at the speed the plan was made with.
    pub duration: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_describe_the_segment() {
        let cmd = MotionCommand {
            target: Coordinate::new(1.0, 0.5),
            distance: 2.0,
            duration: Duration::from_secs(2),
        };
        assert_eq!(cmd.target, Coordinate::new(1.0, 0.5));
        assert!(cmd.duration > Duration::ZERO);
    }
}
