//! Error types for map construction and simulation steps.
//!
//! `BuildError` describes why one map build attempt failed and never leaves a
//! step: the resize controller either recovers from it or converts it into a
//! `SimulationError`, which is what `advance()` reports.

use glam::{DVec3, IVec3};
use std::collections::TryReserveError;
use std::fmt;
use thiserror::Error;

/// Bucket overflow observed while building a spatial map
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Overflow {
    /// Cell whose bucket was full
    pub cell: usize,
    /// Particle that could not be inserted
    pub particle: usize,
    pub capacity: usize,
    /// Partition count of the failed attempt
    pub partitions: usize,
}

impl fmt::Display for Overflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "bucket {} of {} is full (capacity {}) inserting particle {}",
            self.cell, self.partitions, self.capacity, self.particle
        )
    }
}

/// Identifies a particle whose position does not map to a valid grid cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexDiagnostic {
    pub particle: usize,
    /// Computed per-axis cell indices
    pub indices: IVec3,
    pub position: DVec3,
    pub partitions: usize,
}

impl fmt::Display for IndexDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "particle {} at <{:.3}, {:.3}, {:.3}> maps to cell <{}, {}, {}> outside a {}-partition grid",
            self.particle,
            self.position.x,
            self.position.y,
            self.position.z,
            self.indices.x,
            self.indices.y,
            self.indices.z,
            self.partitions
        )
    }
}

/// Invalid grid partitioner input
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GridError {
    #[error("axis count must be positive")]
    ZeroAxisCount,
    #[error("cell length must be positive and finite, got {0}")]
    InvalidCellLength(f64),
    #[error("partition count {0} is not a perfect cube")]
    NotACube(usize),
}

/// Why a single spatial map build attempt failed
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("insertion overflow: {0}")]
    InsertionOverflow(Overflow),
    #[error("index out of range: {0}")]
    IndexOutOfRange(IndexDiagnostic),
    #[error("failed to allocate map storage: {0}")]
    Allocation(#[from] TryReserveError),
}

/// Rejected simulation parameters
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{name} must be positive and finite, got {value}")]
    NotPositive { name: &'static str, value: f64 },
    #[error("restitution must lie in [0, 1], got {0}")]
    Restitution(f64),
    #[error("{0} must be at least 1")]
    Zero(&'static str),
    #[error("initial partition count {0} is not a perfect cube")]
    PartitionsNotCube(usize),
    #[error("particle of radius {radius} does not fit in a domain of side {side}")]
    ParticleTooLarge { radius: f64, side: f64 },
    #[error("{count} particles exceed the store maximum of {max}")]
    TooManyParticles { count: usize, max: usize },
}

/// Fatal conditions surfaced by the simulation
#[derive(Error, Debug)]
pub enum SimulationError {
    #[error("index out of range: {0}")]
    IndexOutOfRange(IndexDiagnostic),
    #[error("no valid map after {attempts} attempts, last tried {partitions} partitions")]
    ResizeExhausted { partitions: usize, attempts: u32 },
    #[error("failed to allocate simulation storage: {0}")]
    Allocation(#[from] TryReserveError),
    #[error("invalid grid: {0}")]
    Grid(#[from] GridError),
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_message_names_particle() {
        let diagnostic = IndexDiagnostic {
            particle: 7,
            indices: IVec3::new(-1, 0, 2),
            position: DVec3::new(-0.5, 1.0, 9.0),
            partitions: 27,
        };
        let message = SimulationError::IndexOutOfRange(diagnostic).to_string();
        assert!(message.contains("particle 7"));
        assert!(message.contains("<-1, 0, 2>"));
        assert!(message.contains("27-partition"));
    }

    #[test]
    fn test_exhausted_message() {
        let error = SimulationError::ResizeExhausted {
            partitions: 3375,
            attempts: 14,
        };
        assert_eq!(
            error.to_string(),
            "no valid map after 14 attempts, last tried 3375 partitions"
        );
    }
}
