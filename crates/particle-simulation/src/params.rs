//! Simulation parameters for runtime tuning

use crate::error::ConfigError;
use crate::spatial_map::OverlapPolicy;
use particle_physics::{constants, is_perfect_cube, Integrator};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationParams {
    /// Side length of the cubic domain
    pub domain_side: f64,
    /// Contact and boundary tolerance (ε)
    pub tolerance: f64,
    /// Restitution coefficient for particle and wall contacts
    pub restitution: f64,
    /// Most entries one spatial map bucket may hold
    pub bucket_capacity: usize,
    /// Partition count each step's first map build starts from (perfect cube)
    pub initial_partitions: usize,
    /// Cap on map build attempts per step
    pub resize_attempt_cap: u32,
    /// Particle store capacity
    pub max_particles: usize,
    pub overlap_policy: OverlapPolicy,
    pub integrator: Integrator,
    /// Nominal timestep of one `advance` call
    pub timestep: f64,
    /// Integrator sub-steps per timestep, each preceded by a collision pass
    pub substeps: u32,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            domain_side: constants::CUBE_LENGTH,
            tolerance: constants::TOLERANCE,
            restitution: constants::RESTITUTION,
            bucket_capacity: constants::BUCKET_CAPACITY,
            initial_partitions: constants::INITIAL_PARTITIONS,
            resize_attempt_cap: constants::RESIZE_ATTEMPT_CAP,
            max_particles: constants::MAX_PARTICLES,
            overlap_policy: OverlapPolicy::default(),
            integrator: Integrator::default(),
            timestep: constants::TIMESTEP,
            substeps: 1,
        }
    }
}

impl SimulationParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("domain_side", self.domain_side)?;
        positive("tolerance", self.tolerance)?;
        positive("timestep", self.timestep)?;

        if !(0.0..=1.0).contains(&self.restitution) {
            return Err(ConfigError::Restitution(self.restitution));
        }
        if self.bucket_capacity == 0 {
            return Err(ConfigError::Zero("bucket_capacity"));
        }
        if self.resize_attempt_cap == 0 {
            return Err(ConfigError::Zero("resize_attempt_cap"));
        }
        if self.substeps == 0 {
            return Err(ConfigError::Zero("substeps"));
        }
        if self.initial_partitions == 0 || !is_perfect_cube(self.initial_partitions) {
            return Err(ConfigError::PartitionsNotCube(self.initial_partitions));
        }
        Ok(())
    }
}

pub(crate) fn positive(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { name, value })
    }
}
