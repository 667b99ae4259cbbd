//! Polar coordinate value type.

use serde::{Deserialize, Serialize};

/// Segments shorter than this are treated as zero-length.
pub const COINCIDENCE_EPSILON: f64 = 1e-9;

/// A single theta-rho coordinate.
///
/// `theta` is an unbounded angle in radians (patterns routinely wind far
/// past 2π); `rho` is a normalized radius in `[0, 1]`, where 0 is the table
/// center and 1 the perimeter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Angle in radians.
    pub theta: f64,
    /// Normalized radius in `[0, 1]`.
    pub rho: f64,
}

impl Coordinate {
    /// Create a coordinate.
    pub fn new(theta: f64, rho: f64) -> Self {
        Self { theta, rho }
    }

    /// The table center at the given angle.
    #[inline]
    pub fn center(theta: f64) -> Self {
        Self { theta, rho: 0.0 }
    }

    /// The table perimeter at the given angle.
    #[inline]
    pub fn perimeter(theta: f64) -> Self {
        Self { theta, rho: 1.0 }
    }

    /// Combined angular and radial distance to another coordinate.
    ///
    /// Euclidean in (theta, rho) space; both axes travel simultaneously on
    /// the physical table, so the segment length is the 2-norm of the two
    /// deltas.
    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        let d_theta = other.theta - self.theta;
        let d_rho = other.rho - self.rho;
        (d_theta * d_theta + d_rho * d_rho).sqrt()
    }

    /// Whether another coordinate is close enough to count as the same
    /// physical position.
    #[inline]
    pub fn is_coincident(&self, other: &Coordinate) -> bool {
        self.distance_to(other) < COINCIDENCE_EPSILON
    }
}
