//! Errors raised by the physics core.

use crate::particle::ParticleId;

/// Precondition failures of the simulation.
///
/// All of these are local to the call that raised them: the caller can fix
/// its input and call again next frame.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PhysicsError {
    #[error("time step must be positive and finite, got {0}")]
    InvalidTimeStep(f64),

    #[error("mass must be positive and finite, got {0}")]
    InvalidMass(f64),

    #[error("radius must be positive and finite, got {0}")]
    InvalidRadius(f64),

    #[error("damping must lie in (0, 1], got {0}")]
    InvalidDamping(f64),

    #[error("domain half-extents must be positive, got {width} x {height}")]
    InvalidDomain { width: f64, height: f64 },

    #[error("particle id {0} is already in use")]
    DuplicateId(ParticleId),

    #[error("no particle with id {0}")]
    UnknownParticle(ParticleId),

    #[error("particle {0} has a non-finite position, velocity, acceleration or force")]
    NonFiniteState(ParticleId),

    #[error("no particle id left above {}", ParticleId::MAX)]
    IdSpaceExhausted,
}

/// Checks the time step handed to integration and frame stepping.
pub fn validate_time_step(dt: f64) -> Result<(), PhysicsError> {
    if dt.is_finite() && dt > 0.0 {
        Ok(())
    } else {
        Err(PhysicsError::InvalidTimeStep(dt))
    }
}
