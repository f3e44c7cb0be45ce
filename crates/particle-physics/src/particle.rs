//! Particle record and per-axis wall contact flags

use crate::geometry::Vector3;

/// Wall contact state for one axis during the current step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WallContact {
    #[default]
    None,
    /// Touched the wall at the minimum corner of the domain
    Negative,
    /// Touched the wall at the maximum corner of the domain
    Positive,
}

impl WallContact {
    /// Contact for a direction sign along an axis (`-1`, `0`, `1`)
    pub fn from_direction(direction: i32) -> Self {
        match direction.signum() {
            -1 => WallContact::Negative,
            1 => WallContact::Positive,
            _ => WallContact::None,
        }
    }

    pub fn is_none(self) -> bool {
        self == WallContact::None
    }
}

/// One [`WallContact`] per axis.
///
/// Prevents a velocity component from being inverted more than once per step
/// when several neighboring cells report the same boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WallFlags([WallContact; 3]);

impl WallFlags {
    pub fn get(&self, axis: usize) -> WallContact {
        self.0[axis]
    }

    pub fn set(&mut self, axis: usize, contact: WallContact) {
        self.0[axis] = contact;
    }

    pub fn reset(&mut self) {
        self.0 = [WallContact::None; 3];
    }

    pub fn is_clear(&self) -> bool {
        self.0.iter().all(|contact| contact.is_none())
    }
}

/// Spherical particle owned by the particle store for the whole run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub position: Vector3,
    pub velocity: Vector3,
    pub acceleration: Vector3,
    /// Always > 0
    pub mass: f64,
    /// Always > 0
    pub radius: f64,
    pub wall: WallFlags,
}

impl Particle {
    /// Create a particle at rest
    pub fn new(position: Vector3, radius: f64, mass: f64) -> Self {
        Self {
            position,
            velocity: Vector3::ZERO,
            acceleration: Vector3::ZERO,
            mass,
            radius,
            wall: WallFlags::default(),
        }
    }

    pub fn with_velocity(mut self, velocity: Vector3) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn inverse_mass(&self) -> f64 {
        1.0 / self.mass
    }
}
