//! Force laws driving particle motion between collision passes
//!
//! A force law maps `(position, velocity)` to an acceleration. The integrator
//! evaluates it at intermediate states, so implementations must be pure.

use crate::constants::{GRAVITY, GRAVITY_AXIS, PATH_RADIUS};
use crate::geometry::{fast_normalize, Vector3};

/// Acceleration as a function of kinematic state
pub trait ForceLaw {
    fn acceleration(&self, position: Vector3, velocity: Vector3) -> Vector3;
}

impl<F> ForceLaw for F
where
    F: Fn(Vector3, Vector3) -> Vector3,
{
    fn acceleration(&self, position: Vector3, velocity: Vector3) -> Vector3 {
        self(position, velocity)
    }
}

/// Free motion; handy for isolating collision behavior
#[derive(Debug, Clone, Copy, Default)]
pub struct NoForce;

impl ForceLaw for NoForce {
    fn acceleration(&self, _position: Vector3, _velocity: Vector3) -> Vector3 {
        Vector3::ZERO
    }
}

/// Unit vector from `position` toward the rotation axis.
///
/// The axis runs through `pivot` parallel to coordinate axis `axis`. The
/// component along the axis is dropped, so the result lies in the orthogonal
/// plane. A point on the axis yields zero.
pub fn unit_direction(position: Vector3, pivot: Vector3, axis: usize) -> Vector3 {
    let mut inward = pivot - position;
    inward[axis] = 0.0;
    fast_normalize(inward)
}

/// Constant gravity along one axis plus a velocity-dependent centripetal term
/// in the plane orthogonal to it.
#[derive(Debug, Clone, Copy)]
pub struct ReferenceForce {
    /// Magnitude of gravitational acceleration (acts toward negative `axis`)
    pub gravity: f64,
    /// Radius of the circular path the centripetal term models
    pub path_radius: f64,
    /// Axis gravity acts along; the rotation axis is parallel to it
    pub axis: usize,
    /// Point the rotation axis passes through
    pub pivot: Vector3,
}

impl Default for ReferenceForce {
    fn default() -> Self {
        Self {
            gravity: GRAVITY,
            path_radius: PATH_RADIUS,
            axis: GRAVITY_AXIS,
            pivot: Vector3::ZERO,
        }
    }
}

impl ReferenceForce {
    /// Rotate about the axis through `pivot` (usually the domain center)
    pub fn with_pivot(mut self, pivot: Vector3) -> Self {
        self.pivot = pivot;
        self
    }
}

impl ForceLaw for ReferenceForce {
    fn acceleration(&self, position: Vector3, velocity: Vector3) -> Vector3 {
        let unit = unit_direction(position, self.pivot, self.axis);

        // a = v² / 2R per orthogonal axis, pointed at the rotation axis
        let mut acceleration = velocity * velocity * (0.5 / self.path_radius) * unit;
        acceleration[self.axis] = -self.gravity;
        acceleration
    }
}
