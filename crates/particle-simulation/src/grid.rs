//! Uniform grid partitioner
//!
//! Splits the domain cube into `axis_count³` equal cells. Cells are indexed
//! row-major: `x * axis² + y * axis + z`.

use crate::error::GridError;
use glam::{DVec3, IVec3};
use particle_physics::{cube_root, is_perfect_cube, Cube};

/// Offsets of the 3×3×3 neighborhood around a cell, self included
pub const NEIGHBOR_OFFSETS: [IVec3; 27] = {
    let mut offsets = [IVec3::ZERO; 27];
    let mut i = 0;
    while i < 27 {
        offsets[i] = IVec3::new(i as i32 / 9 - 1, (i as i32 / 3) % 3 - 1, i as i32 % 3 - 1);
        i += 1;
    }
    offsets
};

/// One grid cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    pub index: usize,
    pub lower: DVec3,
    pub upper: DVec3,
}

impl Cell {
    pub fn volume(&self) -> f64 {
        let extent = self.upper - self.lower;
        extent.x * extent.y * extent.z
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grid {
    domain: Cube,
    axis_count: usize,
    cell_length: f64,
}

impl Grid {
    pub fn new(domain: &Cube, axis_count: usize) -> Result<Self, GridError> {
        if axis_count == 0 {
            return Err(GridError::ZeroAxisCount);
        }
        let cell_length = domain.side / axis_count as f64;
        if !(cell_length.is_finite() && cell_length > 0.0) {
            return Err(GridError::InvalidCellLength(cell_length));
        }
        Ok(Self {
            domain: *domain,
            axis_count,
            cell_length,
        })
    }

    /// Build from a total partition count, which must be a perfect cube
    pub fn from_partitions(domain: &Cube, partitions: usize) -> Result<Self, GridError> {
        if !is_perfect_cube(partitions) {
            return Err(GridError::NotACube(partitions));
        }
        Self::new(domain, cube_root(partitions))
    }

    pub fn domain(&self) -> &Cube {
        &self.domain
    }

    pub fn axis_count(&self) -> usize {
        self.axis_count
    }

    pub fn cell_length(&self) -> f64 {
        self.cell_length
    }

    pub fn partition_count(&self) -> usize {
        self.axis_count * self.axis_count * self.axis_count
    }

    /// Whether every component of `coord` lies in `[0, axis_count)`
    pub fn contains(&self, coord: IVec3) -> bool {
        let n = self.axis_count as i64;
        coord
            .to_array()
            .iter()
            .all(|&c| (0..n).contains(&(c as i64)))
    }

    /// Row-major index of `coord`, or `None` when it is outside the grid
    pub fn encode(&self, coord: IVec3) -> Option<usize> {
        if !self.contains(coord) {
            return None;
        }
        let n = self.axis_count;
        Some(coord.x as usize * n * n + coord.y as usize * n + coord.z as usize)
    }

    pub fn decode(&self, index: usize) -> IVec3 {
        let n = self.axis_count;
        IVec3::new(
            (index / (n * n)) as i32,
            ((index / n) % n) as i32,
            (index % n) as i32,
        )
    }

    /// Cell coordinate containing `position`. May lie outside the grid.
    pub fn locate(&self, position: DVec3) -> IVec3 {
        ((position - self.domain.origin) / self.cell_length)
            .floor()
            .as_ivec3()
    }

    /// Bounds of the cell at `coord`, extrapolated past the grid if needed
    pub fn cell_bounds(&self, coord: IVec3) -> (DVec3, DVec3) {
        let lower = self.domain.origin + coord.as_dvec3() * self.cell_length;
        (lower, lower + DVec3::splat(self.cell_length))
    }

    /// Cell at a valid row-major index
    pub fn cell(&self, index: usize) -> Cell {
        let (lower, upper) = self.cell_bounds(self.decode(index));
        Cell {
            index,
            lower,
            upper,
        }
    }

    /// All cells in index order
    pub fn cells(&self) -> Vec<Cell> {
        (0..self.partition_count()).map(|i| self.cell(i)).collect()
    }
}
