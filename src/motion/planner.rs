//! Motion planning.
//!
//! Converts a decoded coordinate sequence into ordered linear interpolation
//! commands, one per consecutive coordinate pair.

use crate::error::{ConfigError, Result};
use crate::pattern::Coordinate;

use super::MotionCommand;

/// Plan motion commands for a coordinate sequence at the given speed.
///
/// The first coordinate is the starting position; each following coordinate
/// yields one command. Consecutive coordinates at the same physical position
/// are skipped rather than planned as zero-duration commands, which would
/// stall the device channel. Every emitted command has a positive duration.
///
/// # Errors
///
/// `ConfigError::InvalidSpeed` when `speed` is not a positive finite number.
pub fn plan(coordinates: &[Coordinate], speed: f64) -> Result<Vec<MotionCommand>> {
    if !(speed.is_finite() && speed > 0.0) {
        return Err(ConfigError::InvalidSpeed(speed).into());
    }

    let mut commands = Vec::new();
    let Some(mut previous) = coordinates.first().copied() else {
        return Ok(commands);
    };

    for target in &coordinates[1..] {
        if previous.is_coincident(target) {
            continue;
        }
        let distance = previous.distance_to(target);
        commands.push(MotionCommand {
            target: *target,
            distance,
            duration: std::time::Duration::from_secs_f64(distance / speed),
        });
        previous = *target;
    }

    Ok(commands)
}
