//! Spatial-partition collision simulation driver
//!
//! Usage: `particles <count> [iterations] [seed]`
//!
//! Runs `EPOCHS` × `iterations` steps and stops at the first fatal error,
//! reporting the epoch and step it happened on.

use glam::DVec3;
use particle_physics::{PARTICLE_MASS, PARTICLE_RADIUS};
use particle_simulation::{
    domain_for, initialize_particles, Simulation, SimulationError, SimulationParams, StepReport,
};
use rand::Rng;
use std::process::ExitCode;

const EPOCHS: usize = 25;
const DEFAULT_PARTICLES: usize = 20;
const DEFAULT_ITERATIONS: usize = 1000;

fn parse_arg<T: std::str::FromStr>(args: &[String], index: usize) -> Option<T> {
    args.get(index).and_then(|s| s.parse().ok())
}

fn log_positions(label: &str, positions: &[DVec3]) {
    log::info!("{label}:");
    for (i, p) in positions.iter().enumerate() {
        log::info!("  [{i:3}] <{:8.4}, {:8.4}, {:8.4}>", p.x, p.y, p.z);
    }
}

fn run(count: usize, iterations: usize, seed: u64) -> Result<(), (usize, usize, SimulationError)> {
    let params = SimulationParams::default();
    let domain = domain_for(&params).map_err(|e| (0, 0, e.into()))?;
    let store = initialize_particles(
        &domain,
        count,
        PARTICLE_RADIUS,
        PARTICLE_MASS,
        params.max_particles,
        seed,
    )
    .map_err(|e| (0, 0, e))?;
    let mut simulation = Simulation::new(params, store).map_err(|e| (0, 0, e))?;

    log::info!(
        "Simulated time: {:.4} s over {} epochs",
        (EPOCHS * iterations) as f64 * params.timestep,
        EPOCHS
    );
    log_positions("Initial positions", &simulation.read_positions());

    let mut totals = StepReport::default();
    for epoch in 0..EPOCHS {
        for step in 0..iterations {
            let report = match simulation.advance() {
                Ok(report) => report,
                Err(error) => {
                    simulation.release();
                    return Err((epoch + 1, step + 1, error));
                }
            };
            totals.resizes += report.resizes;
            totals.pairs_resolved += report.pairs_resolved;
            totals.wall_contacts += report.wall_contacts;
            totals.largest_bucket = totals.largest_bucket.max(report.largest_bucket);
            totals.partitions = report.partitions;
        }
        log::debug!(
            "Epoch {} done: {} resizes, {} contacts, {} wall contacts so far",
            epoch + 1,
            totals.resizes,
            totals.pairs_resolved,
            totals.wall_contacts
        );
    }

    log_positions("Final positions", &simulation.read_positions());
    log::info!(
        "Finished {} steps: {} resizes, {} particle contacts, {} wall contacts, last map {} partitions",
        simulation.step_index(),
        totals.resizes,
        totals.pairs_resolved,
        totals.wall_contacts,
        totals.partitions
    );
    simulation.release();
    Ok(())
}

fn main() -> ExitCode {
    // Initialize logger (RUST_LOG=debug for per-step output)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() > 4 {
        log::error!("Usage: particles <count> [iterations] [seed]");
        return ExitCode::FAILURE;
    }

    let count = parse_arg(&args, 1).unwrap_or(DEFAULT_PARTICLES);
    let iterations = parse_arg(&args, 2).unwrap_or(DEFAULT_ITERATIONS);
    let seed = parse_arg(&args, 3).unwrap_or_else(|| rand::rng().random());

    log::info!(
        "Starting collision simulation: {} particles, {} iterations per epoch, seed {}",
        count,
        iterations,
        seed
    );

    match run(count, iterations, seed) {
        Ok(()) => ExitCode::SUCCESS,
        Err((epoch, step, error)) => {
            log::error!("Failure on epoch {epoch} step {step}: {error}");
            ExitCode::FAILURE
        }
    }
}
