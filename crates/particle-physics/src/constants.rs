//! Physical and numerical constants for the collision simulation
//!
//! These are the reference defaults; everything tunable at runtime is mirrored
//! in `particle_simulation::SimulationParams`.

/// Side length of the simulation cube
pub const CUBE_LENGTH: f64 = 10.0;

/// Tolerance used for boundary and contact tests (ε)
pub const TOLERANCE: f64 = 1e-3;

/// Nominal integration timestep
pub const TIMESTEP: f64 = 1e-4;

/// Fraction of normal relative speed kept after a particle/particle or
/// particle/wall contact
pub const RESTITUTION: f64 = 0.95;

/// Upper bound on the number of particles a store will hold
pub const MAX_PARTICLES: usize = 100;

/// Most entries a single spatial map bucket may hold before the map is
/// rebuilt at a finer partition count
pub const BUCKET_CAPACITY: usize = 2;

/// Partition count the spatial map starts from every step (2×2×2)
pub const INITIAL_PARTITIONS: usize = 8;

/// Cap on map build attempts within one step
pub const RESIZE_ATTEMPT_CAP: u32 = 1000;

/// Gravitational acceleration of the reference force law
pub const GRAVITY: f64 = 9.81;

/// Axis gravity acts along (0 = x)
pub const GRAVITY_AXIS: usize = 0;

/// Radius of the circular path used by the centripetal term
pub const PATH_RADIUS: f64 = 5.0;

/// Default particle radius
pub const PARTICLE_RADIUS: f64 = 0.33;

/// Default particle mass
pub const PARTICLE_MASS: f64 = 0.5;

/// Distances below this are treated as coincident centers
pub const SOFTENING: f64 = 1e-9;
