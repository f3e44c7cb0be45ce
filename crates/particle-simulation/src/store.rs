//! Particle store: the only state that outlives a simulation step

use crate::error::{ConfigError, SimulationError};
use crate::params::positive;
use particle_physics::{flatten_vectors, Cube, Particle, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Debug, Clone, PartialEq)]
pub struct ParticleStore {
    particles: Vec<Particle>,
    max_particles: usize,
}

impl ParticleStore {
    pub fn with_capacity(max_particles: usize) -> Result<Self, SimulationError> {
        let mut particles = Vec::new();
        particles.try_reserve_exact(max_particles)?;
        Ok(Self {
            particles,
            max_particles,
        })
    }

    /// Adopt existing particles.
    ///
    /// Fails if there are more than `max_particles` or any particle has a
    /// non-positive radius or mass.
    pub fn from_particles(particles: Vec<Particle>, max_particles: usize) -> Result<Self, ConfigError> {
        validate_particles(&particles, f64::INFINITY)?;
        if particles.len() > max_particles {
            return Err(ConfigError::TooManyParticles {
                count: particles.len(),
                max: max_particles,
            });
        }
        Ok(Self {
            particles,
            max_particles,
        })
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn max_particles(&self) -> usize {
        self.max_particles
    }

    pub fn as_slice(&self) -> &[Particle] {
        &self.particles
    }

    pub fn as_mut_slice(&mut self) -> &mut [Particle] {
        &mut self.particles
    }

    /// Add a particle at rest at a uniformly random position inside `domain`.
    ///
    /// Returns its index. Fails when the store is full or the particle would
    /// not fit in `domain`.
    pub fn spawn<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        domain: &Cube,
        radius: f64,
        mass: f64,
    ) -> Result<usize, ConfigError> {
        validate_particle(radius, mass, domain.side)?;
        if self.particles.len() >= self.max_particles {
            return Err(ConfigError::TooManyParticles {
                count: self.particles.len() + 1,
                max: self.max_particles,
            });
        }
        self.particles.push(Particle::new(random_position(rng, domain, radius), radius, mass));
        Ok(self.particles.len() - 1)
    }

    /// Drop the most recently added particle
    pub fn remove_last(&mut self) -> Option<Particle> {
        self.particles.pop()
    }

    pub fn read_positions(&self) -> Vec<Vector3> {
        read_positions(&self.particles)
    }

    /// Explicit teardown, handing back the particles
    pub fn release(self) -> Vec<Particle> {
        log::debug!("Releasing particle store of {} particles", self.particles.len());
        self.particles
    }
}

/// Radius and mass must be positive and finite, and the sphere must fit
/// inside a domain of side `side`
pub fn validate_particle(radius: f64, mass: f64, side: f64) -> Result<(), ConfigError> {
    positive("radius", radius)?;
    positive("mass", mass)?;
    if 2.0 * radius >= side {
        return Err(ConfigError::ParticleTooLarge { radius, side });
    }
    Ok(())
}

pub fn validate_particles(particles: &[Particle], side: f64) -> Result<(), ConfigError> {
    particles
        .iter()
        .try_for_each(|p| validate_particle(p.radius, p.mass, side))
}

/// Uniform position keeping the whole sphere inside `domain`
fn random_position<R: Rng + ?Sized>(rng: &mut R, domain: &Cube, radius: f64) -> Vector3 {
    let lower = domain.min + radius;
    let upper = domain.max - radius;
    Vector3::new(
        rng.random_range(lower.x..=upper.x),
        rng.random_range(lower.y..=upper.y),
        rng.random_range(lower.z..=upper.z),
    )
}

/// Create `count` particles at rest, uniformly placed inside `domain`.
///
/// `count` is capped at `max_particles`. The same seed always produces the
/// same positions.
pub fn initialize_particles(
    domain: &Cube,
    count: usize,
    radius: f64,
    mass: f64,
    max_particles: usize,
    seed: u64,
) -> Result<ParticleStore, SimulationError> {
    validate_particle(radius, mass, domain.side)?;

    let count = if count > max_particles {
        log::warn!(
            "Requested {} particles, capping at the maximum of {}",
            count,
            max_particles
        );
        max_particles
    } else {
        count
    };

    let mut store = ParticleStore::with_capacity(max_particles)?;
    let mut rng = StdRng::seed_from_u64(seed);
    for _ in 0..count {
        store.spawn(&mut rng, domain, radius, mass)?;
    }

    log::debug!(
        "Initialized {} particles (radius {}, mass {}) from seed {}",
        store.len(),
        radius,
        mass,
        seed
    );
    Ok(store)
}

/// Snapshot of current positions
pub fn read_positions(particles: &[Particle]) -> Vec<Vector3> {
    particles.iter().map(|p| p.position).collect()
}

/// Positions as a flat `[x0, y0, z0, x1, ...]` buffer
pub fn flatten_positions(positions: &[Vector3]) -> &[f64] {
    flatten_vectors(positions)
}
