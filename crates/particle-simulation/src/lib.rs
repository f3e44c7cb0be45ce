//! # Particle Simulation Engine
//!
//! Spatial-partition collision simulation of spheres in a cubic domain.
//!
//! Every step the domain is split into a uniform grid, particles are hashed
//! into bounded per-cell buckets (refining the grid whenever a bucket
//! overflows), contacts are resolved cell by cell, and the particles are
//! integrated forward under a pluggable force law.

pub mod collision;
pub mod error;
pub mod grid;
pub mod params;
pub mod resize;
pub mod simulation;
pub mod spatial_map;
pub mod store;

pub use collision::*;
pub use error::*;
pub use grid::*;
pub use params::*;
pub use resize::*;
pub use simulation::*;
pub use spatial_map::*;
pub use store::*;
