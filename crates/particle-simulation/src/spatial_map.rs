//! Per-step spatial map: cell index → particles occupying (or overlapping into)
//! that cell.
//!
//! A map is built from scratch for every collision pass and dropped once the
//! resolver is done with it. Buckets are bounded: inserting past the capacity
//! fails with [`BuildError::InsertionOverflow`] instead of growing the bucket,
//! which is the signal the resize controller uses to refine the grid.

use crate::error::{BuildError, IndexDiagnostic, Overflow};
use crate::grid::{Grid, NEIGHBOR_OFFSETS};
use crate::params::SimulationParams;
use glam::IVec3;
use particle_physics::Particle;
use std::collections::TryReserveError;

/// How particles straddling a cell boundary are made visible to neighbors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverlapPolicy {
    /// Each particle lives only in its home cell; the resolver scans the
    /// 3×3×3 neighborhood of every occupied cell.
    #[default]
    NeighborScan,
    /// Particles are copied into every adjacent cell their sphere reaches
    /// (face, edge, corner); the resolver only pairs entries sharing a bucket.
    Replicate,
}

/// Bucket entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry {
    /// Index into the particle store
    pub particle: usize,
    /// Direction from the particle's home cell to this cell (zero at home)
    pub offset: IVec3,
}

/// A replication that would have left the grid; resolved as a wall contact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WallCandidate {
    pub particle: usize,
    /// Home cell of the particle
    pub home: IVec3,
    /// Direction from the home cell that left the grid
    pub offset: IVec3,
}

#[derive(Debug)]
pub struct SpatialMap {
    grid: Grid,
    policy: OverlapPolicy,
    buckets: Vec<Vec<Entry>>,
    /// Non-empty cells in order of first insertion
    occupied: Vec<usize>,
    wall_candidates: Vec<WallCandidate>,
}

impl SpatialMap {
    /// Empty map over `grid`
    pub fn new(grid: Grid, policy: OverlapPolicy) -> Result<Self, TryReserveError> {
        let partitions = grid.partition_count();
        let mut buckets = Vec::new();
        buckets.try_reserve_exact(partitions)?;
        buckets.resize_with(partitions, Vec::new);

        Ok(Self {
            grid,
            policy,
            buckets,
            occupied: Vec::new(),
            wall_candidates: Vec::new(),
        })
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn policy(&self) -> OverlapPolicy {
        self.policy
    }

    pub fn partition_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn bucket(&self, cell: usize) -> &[Entry] {
        &self.buckets[cell]
    }

    pub fn occupied_cells(&self) -> &[usize] {
        &self.occupied
    }

    pub fn wall_candidates(&self) -> &[WallCandidate] {
        &self.wall_candidates
    }

    pub fn largest_bucket(&self) -> usize {
        self.occupied
            .iter()
            .map(|&cell| self.buckets[cell].len())
            .max()
            .unwrap_or(0)
    }

    pub fn entry_count(&self) -> usize {
        self.occupied.iter().map(|&cell| self.buckets[cell].len()).sum()
    }

    /// Cells holding an entry for `particle`
    pub fn cells_of(&self, particle: usize) -> Vec<usize> {
        self.occupied
            .iter()
            .copied()
            .filter(|&cell| self.buckets[cell].iter().any(|e| e.particle == particle))
            .collect()
    }

    /// Explicit teardown at the end of a step
    pub fn release(self) {
        log::trace!(
            "Releasing spatial map: {} partitions, {} entries",
            self.partition_count(),
            self.entry_count()
        );
    }

    fn insert(&mut self, cell: usize, entry: Entry, capacity: usize) -> Result<(), BuildError> {
        let partitions = self.buckets.len();
        let bucket = &mut self.buckets[cell];

        if bucket.len() >= capacity {
            return Err(BuildError::InsertionOverflow(Overflow {
                cell,
                particle: entry.particle,
                capacity,
                partitions,
            }));
        }

        if bucket.is_empty() {
            bucket.try_reserve_exact(capacity)?;
            self.occupied.try_reserve(1)?;
            self.occupied.push(cell);
        }
        bucket.push(entry);
        Ok(())
    }

    fn push_wall_candidate(&mut self, candidate: WallCandidate) -> Result<(), BuildError> {
        self.wall_candidates.try_reserve(1)?;
        self.wall_candidates.push(candidate);
        Ok(())
    }
}

/// Strategy for turning a grid and a particle store into a spatial map
pub trait MapBuilder {
    fn build(&self, grid: Grid, particles: &[Particle]) -> Result<SpatialMap, BuildError>;
}

/// Bounded-bucket builder for either overlap policy
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridMapBuilder {
    pub policy: OverlapPolicy,
    pub capacity: usize,
    /// Slack added to the radius in face/edge/corner overlap tests
    pub tolerance: f64,
}

impl GridMapBuilder {
    pub fn new(policy: OverlapPolicy, capacity: usize, tolerance: f64) -> Self {
        Self {
            policy,
            capacity,
            tolerance,
        }
    }

    pub fn from_params(params: &SimulationParams) -> Self {
        Self::new(params.overlap_policy, params.bucket_capacity, params.tolerance)
    }

    /// Copy `particle` into each adjacent cell its sphere reaches.
    ///
    /// Per axis, the sphere may cross the near and/or far face of its home
    /// cell. An edge or corner cell is reached only when the distance to that
    /// edge or corner is within the radius as well.
    fn replicate(
        &self,
        map: &mut SpatialMap,
        index: usize,
        particle: &Particle,
        home: IVec3,
    ) -> Result<(), BuildError> {
        let grid = *map.grid();
        let (lower, upper) = grid.cell_bounds(home);
        let reach = particle.radius + self.tolerance;

        // crossings[axis][0] = gap to the near face, [1] = gap to the far face
        let mut crossings = [[None::<f64>; 2]; 3];
        for (axis, crossing) in crossings.iter_mut().enumerate() {
            let near = particle.position[axis] - lower[axis];
            let far = upper[axis] - particle.position[axis];
            if near < reach {
                crossing[0] = Some(near);
            }
            if far < reach {
                crossing[1] = Some(far);
            }
        }

        for offset in NEIGHBOR_OFFSETS {
            if offset == IVec3::ZERO {
                continue;
            }

            let mut distance_squared = 0.0;
            let mut reachable = true;
            for (axis, crossing) in crossings.iter().enumerate() {
                let gap = match offset[axis] {
                    0 => continue,
                    d if d < 0 => crossing[0],
                    _ => crossing[1],
                };
                match gap {
                    Some(gap) => distance_squared += gap * gap,
                    None => reachable = false,
                }
            }
            if !reachable || distance_squared > reach * reach {
                continue;
            }

            match grid.encode(home + offset) {
                Some(cell) => map.insert(
                    cell,
                    Entry {
                        particle: index,
                        offset,
                    },
                    self.capacity,
                )?,
                None => map.push_wall_candidate(WallCandidate {
                    particle: index,
                    home,
                    offset,
                })?,
            }
        }
        Ok(())
    }
}

impl MapBuilder for GridMapBuilder {
    fn build(&self, grid: Grid, particles: &[Particle]) -> Result<SpatialMap, BuildError> {
        let mut map = SpatialMap::new(grid, self.policy)?;

        for (index, particle) in particles.iter().enumerate() {
            let home = grid.locate(particle.position);
            let cell = grid
                .encode(home)
                .filter(|_| particle.position.is_finite())
                .ok_or(BuildError::IndexOutOfRange(IndexDiagnostic {
                    particle: index,
                    indices: home,
                    position: particle.position,
                    partitions: grid.partition_count(),
                }))?;

            map.insert(
                cell,
                Entry {
                    particle: index,
                    offset: IVec3::ZERO,
                },
                self.capacity,
            )?;

            if self.policy == OverlapPolicy::Replicate {
                self.replicate(&mut map, index, particle, home)?;
            }
        }

        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec3;
    use particle_physics::Cube;

    fn grid(axis_count: usize) -> Grid {
        Grid::new(&Cube::with_side(10.0).unwrap(), axis_count).unwrap()
    }

    fn particle(x: f64, y: f64, z: f64, radius: f64) -> Particle {
        Particle::new(DVec3::new(x, y, z), radius, 1.0)
    }

    fn replicating(capacity: usize) -> GridMapBuilder {
        GridMapBuilder::new(OverlapPolicy::Replicate, capacity, 1e-3)
    }

    #[test]
    fn test_neighbor_scan_home_only() {
        let builder = GridMapBuilder::new(OverlapPolicy::NeighborScan, 2, 1e-3);
        let particles = [particle(4.9, 5.1, 5.0, 0.5), particle(1.0, 1.0, 1.0, 0.5)];
        let map = builder.build(grid(2), &particles).unwrap();

        assert_eq!(map.entry_count(), 2);
        assert_eq!(map.occupied_cells(), &[3, 0]);
        assert_eq!(map.cells_of(0), vec![3]);
        assert!(map.wall_candidates().is_empty());
    }

    #[test]
    fn test_overflow_is_reported() {
        let builder = GridMapBuilder::new(OverlapPolicy::NeighborScan, 2, 1e-3);
        let particles = [
            particle(1.0, 1.0, 1.0, 0.1),
            particle(2.0, 1.0, 1.0, 0.1),
            particle(3.0, 1.0, 1.0, 0.1),
        ];
        match builder.build(grid(2), &particles) {
            Err(BuildError::InsertionOverflow(overflow)) => {
                assert_eq!(overflow.cell, 0);
                assert_eq!(overflow.particle, 2);
                assert_eq!(overflow.capacity, 2);
                assert_eq!(overflow.partitions, 8);
            }
            other => panic!("expected overflow, got {other:?}"),
        }
    }

    #[test]
    fn test_out_of_domain_is_index_error() {
        let builder = GridMapBuilder::new(OverlapPolicy::NeighborScan, 2, 1e-3);
        let particles = [particle(1.0, 1.0, 1.0, 0.1), particle(1.0, 10.5, 1.0, 0.1)];
        match builder.build(grid(2), &particles) {
            Err(BuildError::IndexOutOfRange(diagnostic)) => {
                assert_eq!(diagnostic.particle, 1);
                assert_eq!(diagnostic.indices, IVec3::new(0, 2, 0));
            }
            other => panic!("expected index error, got {other:?}"),
        }
    }

    #[test]
    fn test_non_finite_position_is_index_error() {
        let builder = GridMapBuilder::new(OverlapPolicy::NeighborScan, 2, 1e-3);
        let particles = [particle(f64::NAN, 1.0, 1.0, 0.1)];
        assert!(matches!(
            builder.build(grid(2), &particles),
            Err(BuildError::IndexOutOfRange(_))
        ));
    }

    #[test]
    fn test_replicate_interior_particle_stays_home() {
        let map = replicating(2)
            .build(grid(2), &[particle(2.5, 2.5, 2.5, 0.5)])
            .unwrap();
        assert_eq!(map.entry_count(), 1);
        assert!(map.wall_candidates().is_empty());
    }

    #[test]
    fn test_replicate_face_overlap() {
        // Crosses x = 5 only
        let map = replicating(8)
            .build(grid(2), &[particle(4.8, 2.5, 2.5, 0.5)])
            .unwrap();
        assert_eq!(map.entry_count(), 2);

        let neighbor = map.grid().encode(IVec3::new(1, 0, 0)).unwrap();
        assert_eq!(
            map.bucket(neighbor),
            &[Entry {
                particle: 0,
                offset: IVec3::X
            }]
        );
    }

    #[test]
    fn test_replicate_edge_overlap() {
        // Near the x = 5, y = 5 edge: two faces plus the diagonal cell
        let map = replicating(8)
            .build(grid(2), &[particle(4.8, 4.8, 2.5, 0.5)])
            .unwrap();
        assert_eq!(map.entry_count(), 1 + 3);
    }

    #[test]
    fn test_replicate_two_faces_without_edge() {
        // Within reach of both faces but the edge itself is too far away
        let map = replicating(8)
            .build(grid(2), &[particle(4.6, 4.6, 2.5, 0.5)])
            .unwrap();
        assert_eq!(map.entry_count(), 1 + 2);
    }

    #[test]
    fn test_replicate_corner_overlap() {
        let map = replicating(8)
            .build(grid(2), &[particle(4.9, 4.9, 4.9, 0.5)])
            .unwrap();
        assert_eq!(map.entry_count(), 1 + 7);
        assert_eq!(map.occupied_cells().len(), 8);
    }

    #[test]
    fn test_replicate_toward_wall_records_candidate() {
        let map = replicating(8)
            .build(grid(2), &[particle(0.3, 2.5, 2.5, 0.5)])
            .unwrap();
        assert_eq!(map.entry_count(), 1);
        assert_eq!(
            map.wall_candidates(),
            &[WallCandidate {
                particle: 0,
                home: IVec3::ZERO,
                offset: -IVec3::X
            }]
        );
    }

    #[test]
    fn test_replicated_entries_count_toward_capacity() {
        // Each particle alone fits; the replica of the first fills the
        // second particle's bucket past capacity 1.
        let particles = [particle(4.8, 2.5, 2.5, 0.5), particle(7.5, 2.5, 2.5, 0.5)];
        assert!(matches!(
            replicating(1).build(grid(2), &particles),
            Err(BuildError::InsertionOverflow(_))
        ));
    }
}
