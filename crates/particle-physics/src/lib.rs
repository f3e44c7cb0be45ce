//! # Particle Physics Kernel
//!
//! Geometry, particle records, force laws, and time integration for the
//! spatial-partition collision simulation. Everything here is pure and
//! allocation-free; the simulation crate owns the per-step data structures.

pub mod constants;
pub mod forces;
pub mod geometry;
pub mod integrator;
pub mod particle;

pub use constants::*;
pub use forces::*;
pub use geometry::*;
pub use integrator::*;
pub use particle::*;
