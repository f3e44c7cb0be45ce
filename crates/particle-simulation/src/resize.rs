//! Build-or-resize protocol for the per-step spatial map.
//!
//! ```text
//! Initial → Building ─┬─ ok ──────────────→ Success
//!                     ├─ overflow → Overflowed ─┬─→ Rebuilding → Building
//!                     │                         └─→ Exhausted
//!                     └─ index / allocation ──→ Fatal
//! ```
//!
//! Every overflow grows the partition count to the next perfect cube, so
//! cells shrink until no bucket exceeds its capacity.

use crate::error::{BuildError, Overflow, SimulationError};
use crate::grid::Grid;
use crate::params::SimulationParams;
use crate::spatial_map::{MapBuilder, SpatialMap};
use particle_physics::{cube_root, next_perfect_cube, Cube, Particle};

/// Largest partition count whose cells are still at least one particle
/// diameter wide: `floor(side / (2 · max_radius))³`, never below 1.
pub fn max_partition_count(side: f64, max_radius: f64) -> usize {
    let per_axis = (side / (2.0 * max_radius)).floor();
    if per_axis.is_nan() || per_axis < 1.0 {
        return 1;
    }

    let largest_axis = cube_root(usize::MAX);
    let axis = if per_axis >= largest_axis as f64 {
        largest_axis
    } else {
        per_axis as usize
    };
    axis.checked_pow(3).unwrap_or(usize::MAX)
}

#[derive(Debug)]
pub enum ResizeState {
    Initial,
    Building { partitions: usize },
    Overflowed(Overflow),
    Rebuilding { partitions: usize },
    Success(SpatialMap),
    Exhausted { partitions: usize },
    Fatal(SimulationError),
}

impl ResizeState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ResizeState::Success(_) | ResizeState::Exhausted { .. } | ResizeState::Fatal(_)
        )
    }
}

/// Successful build together with what it took to get there
#[derive(Debug)]
pub struct ResizeOutcome {
    pub map: SpatialMap,
    /// Number of Overflowed → Rebuilding transitions
    pub resizes: usize,
    /// Number of build attempts, successful one included
    pub attempts: u32,
    /// Overflow observed by each failed attempt, in order
    pub overflows: Vec<Overflow>,
    /// Partition count of each attempt, in order
    pub history: Vec<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeController {
    pub initial_partitions: usize,
    pub max_partitions: usize,
    pub attempt_cap: u32,
}

impl ResizeController {
    pub fn new(initial_partitions: usize, max_partitions: usize, attempt_cap: u32) -> Self {
        Self {
            initial_partitions,
            max_partitions,
            attempt_cap,
        }
    }

    /// Controller bounded by the largest particle in the store
    pub fn from_params(params: &SimulationParams, max_radius: f64) -> Self {
        Self::new(
            params.initial_partitions,
            max_partition_count(params.domain_side, max_radius),
            params.resize_attempt_cap,
        )
    }

    pub fn run<B: MapBuilder + ?Sized>(
        &self,
        builder: &B,
        domain: &Cube,
        particles: &[Particle],
    ) -> Result<ResizeOutcome, SimulationError> {
        self.run_observed(builder, domain, particles, |_| {})
    }

    /// Drive the state machine to a terminal state, showing every state
    /// (terminal included) to `observe` as it is entered.
    pub fn run_observed<B, O>(
        &self,
        builder: &B,
        domain: &Cube,
        particles: &[Particle],
        mut observe: O,
    ) -> Result<ResizeOutcome, SimulationError>
    where
        B: MapBuilder + ?Sized,
        O: FnMut(&ResizeState),
    {
        let mut attempts = 0u32;
        let mut overflows = Vec::new();
        let mut history = Vec::new();
        let mut state = ResizeState::Initial;

        loop {
            observe(&state);
            state = match state {
                ResizeState::Initial => ResizeState::Building {
                    partitions: self.initial_partitions.min(self.max_partitions),
                },
                ResizeState::Building { partitions } => {
                    attempts += 1;
                    history.push(partitions);
                    let grid = Grid::from_partitions(domain, partitions)?;

                    match builder.build(grid, particles) {
                        Ok(map) => ResizeState::Success(map),
                        Err(BuildError::InsertionOverflow(overflow)) => {
                            ResizeState::Overflowed(overflow)
                        }
                        Err(BuildError::IndexOutOfRange(diagnostic)) => {
                            ResizeState::Fatal(SimulationError::IndexOutOfRange(diagnostic))
                        }
                        Err(BuildError::Allocation(error)) => {
                            ResizeState::Fatal(SimulationError::Allocation(error))
                        }
                    }
                }
                ResizeState::Overflowed(overflow) => {
                    overflows.push(overflow);
                    let next = next_perfect_cube(overflow.partitions)
                        .filter(|&next| next <= self.max_partitions);

                    match next {
                        Some(next) if attempts < self.attempt_cap => {
                            ResizeState::Rebuilding { partitions: next }
                        }
                        _ => ResizeState::Exhausted {
                            partitions: overflow.partitions,
                        },
                    }
                }
                ResizeState::Rebuilding { partitions } => {
                    log::debug!(
                        "Resizing spatial map to {} partitions after attempt {} ({})",
                        partitions,
                        attempts,
                        overflows
                            .last()
                            .map(Overflow::to_string)
                            .unwrap_or_default()
                    );
                    ResizeState::Building { partitions }
                }
                ResizeState::Success(map) => {
                    return Ok(ResizeOutcome {
                        map,
                        resizes: overflows.len(),
                        attempts,
                        overflows,
                        history,
                    });
                }
                ResizeState::Exhausted { partitions } => {
                    return Err(SimulationError::ResizeExhausted {
                        partitions,
                        attempts,
                    });
                }
                ResizeState::Fatal(error) => return Err(error),
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IndexDiagnostic;
    use crate::spatial_map::OverlapPolicy;
    use glam::{DVec3, IVec3};
    use particle_physics::is_perfect_cube;
    use std::cell::Cell;

    /// Overflows until the grid reaches `fits_at` partitions
    struct Dense {
        fits_at: usize,
        calls: Cell<u32>,
    }

    impl MapBuilder for Dense {
        fn build(&self, grid: Grid, _: &[Particle]) -> Result<SpatialMap, BuildError> {
            self.calls.set(self.calls.get() + 1);
            let partitions = grid.partition_count();
            if partitions < self.fits_at {
                return Err(BuildError::InsertionOverflow(Overflow {
                    cell: 0,
                    particle: 0,
                    capacity: 2,
                    partitions,
                }));
            }
            Ok(SpatialMap::new(grid, OverlapPolicy::NeighborScan)?)
        }
    }

    struct Misplaced;

    impl MapBuilder for Misplaced {
        fn build(&self, grid: Grid, _: &[Particle]) -> Result<SpatialMap, BuildError> {
            Err(BuildError::IndexOutOfRange(IndexDiagnostic {
                particle: 3,
                indices: IVec3::new(0, -1, 0),
                position: DVec3::new(1.0, -0.5, 1.0),
                partitions: grid.partition_count(),
            }))
        }
    }

    fn domain() -> Cube {
        Cube::with_side(10.0).unwrap()
    }

    fn dense(fits_at: usize) -> Dense {
        Dense {
            fits_at,
            calls: Cell::new(0),
        }
    }

    #[test]
    fn test_max_partition_count() {
        assert_eq!(max_partition_count(10.0, 1.0), 125);
        assert_eq!(max_partition_count(10.0, 0.33), 15 * 15 * 15);
        assert_eq!(max_partition_count(10.0, 6.0), 1);
        assert_eq!(max_partition_count(10.0, f64::NAN), 1);
        assert!(is_perfect_cube(max_partition_count(10.0, 0.0)));
        assert!(is_perfect_cube(max_partition_count(10.0, 1e-7)));
        assert_eq!(max_partition_count(10.0, 1e-7), cube_root(usize::MAX).pow(3));
    }

    #[test]
    fn test_first_attempt_success() {
        let builder = dense(1);
        let outcome = ResizeController::new(8, 1000, 10)
            .run(&builder, &domain(), &[])
            .unwrap();
        assert_eq!(outcome.resizes, 0);
        assert_eq!(outcome.attempts, 1);
        assert_eq!(outcome.history, vec![8]);
        assert_eq!(outcome.map.partition_count(), 8);
    }

    #[test]
    fn test_resizes_until_fit() {
        let builder = dense(100);
        let outcome = ResizeController::new(1, 1000, 10)
            .run(&builder, &domain(), &[])
            .unwrap();

        assert_eq!(outcome.history, vec![1, 8, 27, 64, 125]);
        assert_eq!(outcome.resizes, 4);
        assert_eq!(outcome.resizes, outcome.overflows.len());
        assert_eq!(outcome.attempts, builder.calls.get());
        assert_eq!(outcome.map.partition_count(), 125);
    }

    #[test]
    fn test_state_sequence() {
        let builder = dense(8);
        let mut states = Vec::new();
        ResizeController::new(1, 1000, 10)
            .run_observed(&builder, &domain(), &[], |state| {
                states.push(match state {
                    ResizeState::Initial => "initial",
                    ResizeState::Building { .. } => "building",
                    ResizeState::Overflowed(_) => "overflowed",
                    ResizeState::Rebuilding { .. } => "rebuilding",
                    ResizeState::Success(_) => "success",
                    ResizeState::Exhausted { .. } => "exhausted",
                    ResizeState::Fatal(_) => "fatal",
                })
            })
            .unwrap();

        assert_eq!(
            states,
            ["initial", "building", "overflowed", "rebuilding", "building", "success"]
        );
    }

    #[test]
    fn test_attempt_cap_exhausts() {
        let builder = dense(usize::MAX);
        let error = ResizeController::new(1, 1000, 3)
            .run(&builder, &domain(), &[])
            .unwrap_err();

        match error {
            SimulationError::ResizeExhausted {
                partitions,
                attempts,
            } => {
                assert_eq!(attempts, 3);
                assert_eq!(partitions, 27);
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }
        assert_eq!(builder.calls.get(), 3);
    }

    #[test]
    fn test_partition_bound_exhausts() {
        let builder = dense(usize::MAX);
        let error = ResizeController::new(1, 64, 1000)
            .run(&builder, &domain(), &[])
            .unwrap_err();
        assert!(matches!(
            error,
            SimulationError::ResizeExhausted {
                partitions: 64,
                attempts: 4
            }
        ));
    }

    #[test]
    fn test_index_error_is_not_retried() {
        let mut terminal = None;
        let error = ResizeController::new(8, 1000, 10)
            .run_observed(&Misplaced, &domain(), &[], |state| {
                if state.is_terminal() {
                    terminal = Some(matches!(state, ResizeState::Fatal(_)));
                }
            })
            .unwrap_err();

        assert_eq!(terminal, Some(true));
        match error {
            SimulationError::IndexOutOfRange(diagnostic) => assert_eq!(diagnostic.particle, 3),
            other => panic!("expected index error, got {other:?}"),
        }
    }

    #[test]
    fn test_initial_count_clamped_to_bound() {
        let builder = dense(1);
        let outcome = ResizeController::new(1000, 27, 10)
            .run(&builder, &domain(), &[])
            .unwrap();
        assert_eq!(outcome.history, vec![27]);
    }
}
