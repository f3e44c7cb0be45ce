//! Step driver: collision passes interleaved with integration
//!
//! Each call to [`advance`] splits the timestep into `substeps` equal parts.
//! Every sub-step builds a fresh spatial map (growing the grid as needed),
//! resolves contacts against it, releases it, and only then integrates.

use crate::collision::{CollisionResolver, CollisionStats};
use crate::error::{ConfigError, SimulationError};
use crate::params::SimulationParams;
use crate::resize::ResizeController;
use crate::spatial_map::GridMapBuilder;
use crate::store::{validate_particles, ParticleStore};
use particle_physics::{Cube, ForceLaw, Particle, ReferenceForce, Vector3};
use rand::Rng;

/// Counters from one `advance` call, summed over its sub-steps
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepReport {
    pub substeps: u32,
    /// Overflow-triggered rebuilds
    pub resizes: usize,
    /// Map build attempts, successful ones included
    pub attempts: u32,
    /// Partition count of the last successful map
    pub partitions: usize,
    /// Most non-empty cells seen in one map
    pub occupied_cells: usize,
    /// Fullest bucket seen in any map
    pub largest_bucket: usize,
    pub pairs_tested: usize,
    pub pairs_resolved: usize,
    pub wall_contacts: usize,
}

impl StepReport {
    fn absorb(&mut self, collisions: CollisionStats) {
        self.pairs_tested += collisions.pairs_tested;
        self.pairs_resolved += collisions.pairs_resolved;
        self.wall_contacts += collisions.wall_contacts;
    }
}

/// Advance `particles` by one `params.timestep`.
///
/// Invalid parameters or particles are rejected before anything moves. A map
/// build failure aborts before that sub-step's collision pass touches any
/// particle. Earlier sub-steps of the same call stay applied.
pub fn advance<F: ForceLaw + ?Sized>(
    domain: &Cube,
    particles: &mut [Particle],
    params: &SimulationParams,
    force: &F,
) -> Result<StepReport, SimulationError> {
    params.validate()?;
    validate_particles(particles, domain.side)?;

    let sub_dt = params.timestep / params.substeps as f64;
    let builder = GridMapBuilder::from_params(params);
    let resolver = CollisionResolver::from_params(params);
    let max_radius = particles.iter().map(|p| p.radius).fold(0.0, f64::max);
    let controller = ResizeController::from_params(params, max_radius);

    let mut report = StepReport {
        substeps: params.substeps,
        ..Default::default()
    };

    for _ in 0..params.substeps {
        let outcome = controller.run(&builder, domain, particles)?;
        let map = outcome.map;

        report.resizes += outcome.resizes;
        report.attempts += outcome.attempts;
        report.partitions = map.partition_count();
        report.occupied_cells = report.occupied_cells.max(map.occupied_cells().len());
        report.largest_bucket = report.largest_bucket.max(map.largest_bucket());

        for particle in particles.iter_mut() {
            particle.wall.reset();
        }
        report.absorb(resolver.resolve(&map, particles));
        map.release();

        params.integrator.advance_all(particles, force, sub_dt);
    }

    Ok(report)
}

/// Owns a particle store and steps it under a force law
pub struct Simulation<F = ReferenceForce> {
    domain: Cube,
    params: SimulationParams,
    store: ParticleStore,
    force: F,
    step_index: u64,
}

impl Simulation<ReferenceForce> {
    /// Simulation under the reference force, rotating about the domain center
    pub fn new(params: SimulationParams, store: ParticleStore) -> Result<Self, SimulationError> {
        let side = params.domain_side;
        let pivot = Cube::with_side(side).map_or(Vector3::ZERO, |domain| domain.center());
        Self::with_force(params, store, ReferenceForce::default().with_pivot(pivot))
    }
}

impl<F: ForceLaw> Simulation<F> {
    pub fn with_force(
        params: SimulationParams,
        store: ParticleStore,
        force: F,
    ) -> Result<Self, SimulationError> {
        params.validate()?;
        let domain = domain_for(&params)?;

        validate_particles(store.as_slice(), domain.side)?;
        if store.len() > params.max_particles {
            return Err(ConfigError::TooManyParticles {
                count: store.len(),
                max: params.max_particles,
            }
            .into());
        }

        log::info!(
            "Simulation created: {} particles, domain side {}, {} initial partitions, {:?} policy, {:?} integrator",
            store.len(),
            domain.side,
            params.initial_partitions,
            params.overlap_policy,
            params.integrator
        );

        Ok(Self {
            domain,
            params,
            store,
            force,
            step_index: 0,
        })
    }

    /// Run one timestep. On error the caller should stop and [`release`](Self::release).
    pub fn advance(&mut self) -> Result<StepReport, SimulationError> {
        let report = advance(&self.domain, self.store.as_mut_slice(), &self.params, &self.force)?;
        self.step_index += 1;

        log::debug!(
            "Step {}: {} partitions after {} resizes, {} contacts, {} wall contacts, largest bucket {}",
            self.step_index,
            report.partitions,
            report.resizes,
            report.pairs_resolved,
            report.wall_contacts,
            report.largest_bucket
        );
        Ok(report)
    }

    pub fn domain(&self) -> &Cube {
        &self.domain
    }

    pub fn params(&self) -> &SimulationParams {
        &self.params
    }

    pub fn particles(&self) -> &[Particle] {
        self.store.as_slice()
    }

    /// Add a particle at rest somewhere in the domain, returning its index
    pub fn spawn<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        radius: f64,
        mass: f64,
    ) -> Result<usize, ConfigError> {
        self.store.spawn(rng, &self.domain, radius, mass)
    }

    pub fn remove_last(&mut self) -> Option<Particle> {
        self.store.remove_last()
    }

    /// Completed steps
    pub fn step_index(&self) -> u64 {
        self.step_index
    }

    pub fn read_positions(&self) -> Vec<Vector3> {
        self.store.read_positions()
    }

    /// Tear down, handing back the particles
    pub fn release(self) -> Vec<Particle> {
        log::info!("Releasing simulation after {} steps", self.step_index);
        self.store.release()
    }
}

/// Domain cube `[0, side]³` described by `params`
pub fn domain_for(params: &SimulationParams) -> Result<Cube, ConfigError> {
    Cube::with_side(params.domain_side).ok_or(ConfigError::NotPositive {
        name: "domain_side",
        value: params.domain_side,
    })
}
