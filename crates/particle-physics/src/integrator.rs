//! Time integration of particle kinematics
//!
//! Both schemes advance position and velocity by `dt` under a [`ForceLaw`] and
//! leave the acceleration at the new state in `Particle::acceleration`, so the
//! next step starts from a consistent value.

use crate::forces::ForceLaw;
use crate::particle::Particle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Integrator {
    /// Half-step velocity and position, force re-evaluated at the half step
    #[default]
    Midpoint,
    /// Classical four-stage Runge-Kutta on (position, velocity)
    RungeKutta4,
}

impl Integrator {
    /// Advance one particle by `dt`
    pub fn step<F: ForceLaw + ?Sized>(&self, particle: &mut Particle, force: &F, dt: f64) {
        match self {
            Integrator::Midpoint => midpoint(particle, force, dt),
            Integrator::RungeKutta4 => runge_kutta4(particle, force, dt),
        }
    }

    /// Advance every particle by `dt`
    pub fn advance_all<F: ForceLaw + ?Sized>(&self, particles: &mut [Particle], force: &F, dt: f64) {
        for particle in particles.iter_mut() {
            self.step(particle, force, dt);
        }
    }
}

fn midpoint<F: ForceLaw + ?Sized>(particle: &mut Particle, force: &F, dt: f64) {
    let half_dt = dt * 0.5;

    let half_velocity = particle.velocity + particle.acceleration * half_dt;
    let half_position = particle.position + half_velocity * half_dt;
    let half_acceleration = force.acceleration(half_position, half_velocity);

    let velocity = half_velocity + half_acceleration * half_dt;
    let position = half_position + velocity * half_dt;

    particle.position = position;
    particle.velocity = velocity;
    particle.acceleration = force.acceleration(position, velocity);
}

fn runge_kutta4<F: ForceLaw + ?Sized>(particle: &mut Particle, force: &F, dt: f64) {
    let half_dt = dt * 0.5;
    let p = particle.position;
    let v = particle.velocity;

    let k1_p = v;
    let k1_v = force.acceleration(p, v);

    let k2_p = v + k1_v * half_dt;
    let k2_v = force.acceleration(p + k1_p * half_dt, k2_p);

    let k3_p = v + k2_v * half_dt;
    let k3_v = force.acceleration(p + k2_p * half_dt, k3_p);

    let k4_p = v + k3_v * dt;
    let k4_v = force.acceleration(p + k3_p * dt, k4_p);

    let sixth = dt / 6.0;
    particle.position = p + (k1_p + 2.0 * k2_p + 2.0 * k3_p + k4_p) * sixth;
    particle.velocity = v + (k1_v + 2.0 * k2_v + 2.0 * k3_v + k4_v) * sixth;
    particle.acceleration = force.acceleration(particle.position, particle.velocity);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forces::NoForce;
    use crate::geometry::Vector3;

    fn constant_gravity(_p: Vector3, _v: Vector3) -> Vector3 {
        Vector3::new(0.0, -9.81, 0.0)
    }

    #[test]
    fn test_free_motion_is_linear() {
        for integrator in [Integrator::Midpoint, Integrator::RungeKutta4] {
            let mut p = Particle::new(Vector3::splat(1.0), 0.1, 1.0)
                .with_velocity(Vector3::new(2.0, -1.0, 0.5));
            integrator.step(&mut p, &NoForce, 0.5);
            assert!((p.position - Vector3::new(2.0, 0.5, 1.25)).length() < 1e-12);
            assert_eq!(p.velocity, Vector3::new(2.0, -1.0, 0.5));
            assert_eq!(p.acceleration, Vector3::ZERO);
        }
    }

    #[test]
    fn test_runge_kutta_exact_under_constant_acceleration() {
        let dt = 0.01;
        let mut p = Particle::new(Vector3::new(0.0, 5.0, 0.0), 0.1, 1.0)
            .with_velocity(Vector3::new(1.0, 0.0, 0.0));
        Integrator::RungeKutta4.step(&mut p, &constant_gravity, dt);

        let expected_y = 5.0 - 0.5 * 9.81 * dt * dt;
        assert!((p.position.y - expected_y).abs() < 1e-12);
        assert!((p.position.x - dt).abs() < 1e-12);
        assert!((p.velocity.y + 9.81 * dt).abs() < 1e-12);
        assert_eq!(p.acceleration, Vector3::new(0.0, -9.81, 0.0));
    }

    #[test]
    fn test_midpoint_velocity_under_constant_acceleration() {
        let dt = 0.01;
        let mut p = Particle::new(Vector3::new(0.0, 5.0, 0.0), 0.1, 1.0);
        p.acceleration = constant_gravity(p.position, p.velocity);

        Integrator::Midpoint.step(&mut p, &constant_gravity, dt);
        assert!((p.velocity.y + 9.81 * dt).abs() < 1e-12);
        // Position error of the scheme is O(dt²)
        let expected_y = 5.0 - 0.5 * 9.81 * dt * dt;
        assert!((p.position.y - expected_y).abs() < 9.81 * dt * dt);
    }

    #[test]
    fn test_advance_all_touches_every_particle() {
        let mut particles = vec![
            Particle::new(Vector3::ZERO, 0.1, 1.0).with_velocity(Vector3::X),
            Particle::new(Vector3::ONE, 0.1, 1.0).with_velocity(Vector3::Y),
        ];
        Integrator::Midpoint.advance_all(&mut particles, &NoForce, 1.0);
        assert_eq!(particles[0].position, Vector3::X);
        assert_eq!(particles[1].position, Vector3::new(1.0, 2.0, 1.0));
    }
}
