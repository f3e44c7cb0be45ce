//! Collision resolution over a built spatial map
//!
//! Broad phase walks the occupied cells of the map. Under
//! [`OverlapPolicy::NeighborScan`] each particle is tested against the 3×3×3
//! neighborhood of its home cell and neighbor directions that leave the grid
//! become wall checks. Under [`OverlapPolicy::Replicate`] only entries sharing
//! a bucket are paired. Either way each unordered pair is resolved at most
//! once, and wall contacts are handled in a second sweep once every pair is
//! done.

use crate::grid::{Grid, NEIGHBOR_OFFSETS};
use crate::params::SimulationParams;
use crate::spatial_map::{OverlapPolicy, SpatialMap};
use glam::IVec3;
use particle_physics::{constants::SOFTENING, Cube, Particle, Vector3, WallContact};
use std::collections::HashSet;

/// Counters from one resolution pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollisionStats {
    /// Candidate pairs handed to the narrow phase
    pub pairs_tested: usize,
    /// Pairs found touching or overlapping
    pub pairs_resolved: usize,
    /// Per-axis wall contacts
    pub wall_contacts: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionResolver {
    pub restitution: f64,
    pub tolerance: f64,
}

impl CollisionResolver {
    pub fn new(restitution: f64, tolerance: f64) -> Self {
        Self {
            restitution,
            tolerance,
        }
    }

    pub fn from_params(params: &SimulationParams) -> Self {
        Self::new(params.restitution, params.tolerance)
    }

    /// Resolve every candidate pair and wall contact found in `map`.
    ///
    /// Pairs are resolved first and walls second, so positional corrections
    /// can never leave a particle past a wall it was already clamped against.
    /// `particles` must be the slice the map was built from.
    pub fn resolve(&self, map: &SpatialMap, particles: &mut [Particle]) -> CollisionStats {
        let mut stats = CollisionStats::default();
        match map.policy() {
            OverlapPolicy::NeighborScan => self.scan_neighbors(map, particles, &mut stats),
            OverlapPolicy::Replicate => self.scan_buckets(map, particles, &mut stats),
        }
        stats.wall_contacts = self.sweep_walls(map, particles);

        log::trace!(
            "Collision pass: {} pairs tested, {} resolved, {} wall contacts",
            stats.pairs_tested,
            stats.pairs_resolved,
            stats.wall_contacts
        );
        stats
    }

    fn scan_neighbors(&self, map: &SpatialMap, particles: &mut [Particle], stats: &mut CollisionStats) {
        let grid = map.grid();

        for &cell in map.occupied_cells() {
            let home = grid.decode(cell);

            for entry in map.bucket(cell) {
                let i = entry.particle;

                for offset in NEIGHBOR_OFFSETS {
                    let Some(neighbor) = grid.encode(home + offset) else {
                        continue;
                    };

                    for other in map.bucket(neighbor) {
                        let j = other.particle;
                        // i < j: the pair is reached once, from the lower index
                        if j <= i {
                            continue;
                        }
                        self.narrow_phase(particles, i, j, stats);
                    }
                }
            }
        }
    }

    fn scan_buckets(&self, map: &SpatialMap, particles: &mut [Particle], stats: &mut CollisionStats) {
        // Replicas put the same pair in up to eight shared buckets
        let mut seen = HashSet::new();

        for &cell in map.occupied_cells() {
            let bucket = map.bucket(cell);
            for (k, a) in bucket.iter().enumerate() {
                for b in &bucket[k + 1..] {
                    let (i, j) = (a.particle.min(b.particle), a.particle.max(b.particle));
                    if i == j || !seen.insert((i, j)) {
                        continue;
                    }
                    self.narrow_phase(particles, i, j, stats);
                }
            }
        }
    }

    /// Wall pass over every particle whose home cell touches the grid edge.
    ///
    /// Replicated maps contribute their recorded wall candidates first. The
    /// home-cell scan then catches particles that pair corrections pushed
    /// toward a wall after the map was built. Wall flags keep each axis from
    /// being handled twice.
    fn sweep_walls(&self, map: &SpatialMap, particles: &mut [Particle]) -> usize {
        let grid = map.grid();
        let domain = grid.domain();
        let mut contacts = 0;

        for candidate in map.wall_candidates() {
            let wall = outward(grid, candidate.home, candidate.offset);
            contacts += handle_wall(
                &mut particles[candidate.particle],
                wall,
                domain,
                self.restitution,
                self.tolerance,
            );
        }

        for &cell in map.occupied_cells() {
            let home = grid.decode(cell);
            let homed = map
                .bucket(cell)
                .iter()
                .filter(|entry| entry.offset == IVec3::ZERO);

            for entry in homed {
                for offset in NEIGHBOR_OFFSETS {
                    if grid.contains(home + offset) {
                        continue;
                    }
                    contacts += handle_wall(
                        &mut particles[entry.particle],
                        outward(grid, home, offset),
                        domain,
                        self.restitution,
                        self.tolerance,
                    );
                }
            }
        }
        contacts
    }

    fn narrow_phase(&self, particles: &mut [Particle], i: usize, j: usize, stats: &mut CollisionStats) {
        let (a, b) = pair_mut(particles, i, j);
        stats.pairs_tested += 1;
        if resolve_pair(a, b, self.restitution) {
            stats.pairs_resolved += 1;
            log::trace!("Resolved contact between particles {} and {}", i, j);
        }
    }
}

/// Mutable references to two distinct particles, `i < j`
fn pair_mut(particles: &mut [Particle], i: usize, j: usize) -> (&mut Particle, &mut Particle) {
    let (head, tail) = particles.split_at_mut(j);
    (&mut head[i], &mut tail[0])
}

/// Components of `offset` that carry `home` outside the grid, zero elsewhere
fn outward(grid: &Grid, home: IVec3, offset: IVec3) -> IVec3 {
    let n = grid.axis_count() as i32;
    let target = home + offset;
    IVec3::select(target.cmplt(IVec3::ZERO) | target.cmpge(IVec3::splat(n)), offset, IVec3::ZERO)
}

/// Narrow-phase test and impulse for one pair.
///
/// Touching or overlapping spheres are pushed apart along the contact normal
/// by half the overlap each. Approaching pairs then exchange an impulse that
/// leaves their normal relative speed at `restitution` times its value before
/// the contact; separating pairs keep their velocities. Returns whether the
/// pair was in contact.
pub fn resolve_pair(a: &mut Particle, b: &mut Particle, restitution: f64) -> bool {
    let delta = a.position - b.position;
    let distance = delta.length();
    let overlap = a.radius + b.radius - distance;
    if !(overlap >= 0.0) {
        return false;
    }

    let normal = if distance > SOFTENING {
        delta / distance
    } else {
        Vector3::X
    };

    a.position += normal * (overlap * 0.5);
    b.position -= normal * (overlap * 0.5);

    let normal_speed = normal.dot(a.velocity - b.velocity);
    if normal_speed > 0.0 {
        return true;
    }

    let (inv_a, inv_b) = (a.inverse_mass(), b.inverse_mass());
    let impulse = (1.0 + restitution) * -normal_speed / (inv_a + inv_b);
    a.velocity += normal * (impulse * inv_a);
    b.velocity -= normal * (impulse * inv_b);
    true
}

/// Bounce `particle` off the domain walls named by the signs of `outward`.
///
/// An axis is handled only when the particle has no wall flag for it yet and
/// its sphere lies within `tolerance` of that wall. A velocity component
/// heading into the wall is inverted and scaled by `restitution`; the position
/// is clamped so the sphere stays inside the domain. Returns the number of
/// axes handled.
pub fn handle_wall(
    particle: &mut Particle,
    outward: IVec3,
    domain: &Cube,
    restitution: f64,
    tolerance: f64,
) -> usize {
    let mut contacts = 0;

    for axis in 0..3 {
        let side = outward[axis];
        if side == 0 || !particle.wall.get(axis).is_none() {
            continue;
        }

        let (distance, inward_speed) = if side < 0 {
            (particle.position[axis] - domain.min[axis], -particle.velocity[axis])
        } else {
            (domain.max[axis] - particle.position[axis], particle.velocity[axis])
        };
        if distance - particle.radius > tolerance {
            continue;
        }

        if inward_speed > 0.0 {
            particle.velocity[axis] *= -restitution;
        }
        let margin = particle.radius.max(tolerance);
        particle.position[axis] = particle.position[axis]
            .max(domain.min[axis] + margin)
            .min(domain.max[axis] - margin);
        particle.wall.set(axis, WallContact::from_direction(side));
        contacts += 1;

        log::trace!(
            "Wall contact on axis {} at {:.4}, velocity now {:.4}",
            axis,
            particle.position[axis],
            particle.velocity[axis]
        );
    }
    contacts
}
