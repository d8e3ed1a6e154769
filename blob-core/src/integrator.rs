//! Numerical integration of particle state.
//!
//! Particles are advanced with semi-implicit Euler and exponential drag:
//!
//! ```text
//! 1. x_new = x + v*dt                      (uses the pre-update velocity)
//! 2. a_eff = a + F_accum / m
//! 3. v_new = (v + a_eff*dt) * damping^dt
//! 4. F_accum = 0
//! ```
//!
//! Raising the damping factor to `dt` keeps the per-second decay the same
//! regardless of frame rate: `damping = 1` means no decay at all.

use crate::error::{validate_time_step, PhysicsError};
use crate::particle::Particle;

/// Semi-implicit Euler integrator with frame-rate independent damping.
pub struct SemiImplicitEuler;

impl SemiImplicitEuler {
    /// Advance one particle by `dt` seconds.
    ///
    /// Immovable particles are left untouched (their force accumulator
    /// included). A non-positive or non-finite `dt` is rejected before any
    /// state is modified.
    pub fn step(particle: &mut Particle, dt: f64) -> Result<(), PhysicsError> {
        validate_time_step(dt)?;

        let inverse_mass = particle.inverse_mass();
        if inverse_mass <= 0.0 {
            return Ok(());
        }

        particle.position.add_scaled(particle.velocity, dt);

        let mut acceleration = particle.acceleration;
        acceleration.add_scaled(particle.accumulated_force(), inverse_mass);

        particle.velocity.add_scaled(acceleration, dt);
        particle.velocity *= particle.damping().powf(dt);

        particle.clear_accumulator();
        Ok(())
    }

    /// Advance one particle by `substeps` steps of `dt`.
    pub fn step_n(particle: &mut Particle, dt: f64, substeps: usize) -> Result<(), PhysicsError> {
        for _ in 0..substeps {
            Self::step(particle, dt)?;
        }
        Ok(())
    }
}

impl Particle {
    /// Advance this particle by `dt` seconds. See [`SemiImplicitEuler::step`].
    pub fn integrate(&mut self, dt: f64) -> Result<(), PhysicsError> {
        SemiImplicitEuler::step(self, dt)
    }
}

// =============================================================================
// Tests
// =============================================================================
