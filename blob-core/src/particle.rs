//! Particle state.
//!
//! A particle is a circular body with a mass, a radius and linear state. It
//! is the only kind of body the simulation knows about.

use serde::{Deserialize, Serialize};

use crate::error::PhysicsError;
use crate::types::{Mass, Vec2};

/// Identity of a particle inside one simulation.
///
/// Used for identity comparisons and for the deterministic ordering of the
/// collision pass.
pub type ParticleId = u32;

/// A single circular body.
///
/// Deserialization goes through the same checks as [`Particle::new`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ParticleRecord")]
pub struct Particle {
    id: ParticleId,
    pub position: Vec2,
    pub velocity: Vec2,
    /// Constant acceleration (gravity) applied every step.
    pub acceleration: Vec2,
    force_accumulator: Vec2,
    mass: Mass,
    damping: f64,
    radius: f64,
    #[serde(skip)]
    collided_this_frame: bool,
}

impl Particle {
    /// Creates a particle at rest with no damping.
    pub fn new(id: ParticleId, position: Vec2, radius: f64, mass: Mass) -> Result<Self, PhysicsError> {
        if !(radius.is_finite() && radius > 0.0) {
            return Err(PhysicsError::InvalidRadius(radius));
        }
        if let Mass::Finite(m) = mass {
            Mass::finite(m)?;
        }
        Ok(Self {
            id,
            position,
            velocity: Vec2::ZERO,
            acceleration: Vec2::ZERO,
            force_accumulator: Vec2::ZERO,
            mass,
            damping: 1.0,
            radius,
            collided_this_frame: false,
        })
    }

    pub fn with_velocity(mut self, velocity: Vec2) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_acceleration(mut self, acceleration: Vec2) -> Self {
        self.acceleration = acceleration;
        self
    }

    pub fn with_damping(mut self, damping: f64) -> Result<Self, PhysicsError> {
        self.set_damping(damping)?;
        Ok(self)
    }

    pub fn id(&self) -> ParticleId {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: ParticleId) {
        self.id = id;
    }

    pub fn mass(&self) -> Mass {
        self.mass
    }

    /// Sets a finite mass. Zero, negative and non-finite masses are rejected.
    pub fn set_mass(&mut self, mass: f64) -> Result<(), PhysicsError> {
        self.mass = Mass::finite(mass)?;
        Ok(())
    }

    /// Sets the mass through its inverse; `<= 0` makes the particle immovable.
    pub fn set_inverse_mass(&mut self, inverse_mass: f64) -> Result<(), PhysicsError> {
        self.mass = Mass::from_inverse(inverse_mass)?;
        Ok(())
    }

    pub fn inverse_mass(&self) -> f64 {
        self.mass.inverse()
    }

    pub fn has_finite_mass(&self) -> bool {
        self.mass.is_finite()
    }

    pub fn damping(&self) -> f64 {
        self.damping
    }

    pub fn set_damping(&mut self, damping: f64) -> Result<(), PhysicsError> {
        if !(damping > 0.0 && damping <= 1.0) {
            return Err(PhysicsError::InvalidDamping(damping));
        }
        self.damping = damping;
        Ok(())
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn set_radius(&mut self, radius: f64) -> Result<(), PhysicsError> {
        if !(radius.is_finite() && radius > 0.0) {
            return Err(PhysicsError::InvalidRadius(radius));
        }
        self.radius = radius;
        Ok(())
    }

    /// Adds a force to be applied on the next integration step.
    pub fn add_force(&mut self, force: Vec2) {
        self.force_accumulator += force;
    }

    /// Forces accumulated since the last integration step.
    pub fn accumulated_force(&self) -> Vec2 {
        self.force_accumulator
    }

    pub fn clear_accumulator(&mut self) {
        self.force_accumulator = Vec2::ZERO;
    }

    /// Whether this particle already resolved a collision in the current frame.
    pub fn collided_this_frame(&self) -> bool {
        self.collided_this_frame
    }

    pub(crate) fn mark_collided(&mut self) {
        self.collided_this_frame = true;
    }

    pub(crate) fn reset_collision_flag(&mut self) {
        self.collided_this_frame = false;
    }

    /// Translational kinetic energy; zero for immovable bodies.
    pub fn kinetic_energy(&self) -> f64 {
        match self.mass {
            Mass::Finite(m) => 0.5 * m * self.velocity.magnitude_squared(),
            Mass::Immovable => 0.0,
        }
    }

    /// Re-checks every invariant: radius, mass and damping ranges, and
    /// finite linear state. The public fields can be written freely, so this
    /// runs again whenever a particle enters a simulation.
    pub fn validate(&self) -> Result<(), PhysicsError> {
        if !(self.radius.is_finite() && self.radius > 0.0) {
            return Err(PhysicsError::InvalidRadius(self.radius));
        }
        if let Mass::Finite(m) = self.mass {
            Mass::finite(m)?;
        }
        if !(self.damping > 0.0 && self.damping <= 1.0) {
            return Err(PhysicsError::InvalidDamping(self.damping));
        }
        let finite = self.position.is_finite()
            && self.velocity.is_finite()
            && self.acceleration.is_finite()
            && self.force_accumulator.is_finite();
        if !finite {
            return Err(PhysicsError::NonFiniteState(self.id));
        }
        Ok(())
    }

    /// Linear momentum; zero for immovable bodies.
    pub fn momentum(&self) -> Vec2 {
        match self.mass {
            Mass::Finite(m) => self.velocity * m,
            Mass::Immovable => Vec2::ZERO,
        }
    }
}

/// Serialized form of a [`Particle`], checked on the way in.
#[derive(Deserialize)]
struct ParticleRecord {
    id: ParticleId,
    position: Vec2,
    #[serde(default)]
    velocity: Vec2,
    #[serde(default)]
    acceleration: Vec2,
    #[serde(default)]
    force_accumulator: Vec2,
    mass: Mass,
    #[serde(default = "no_damping")]
    damping: f64,
    radius: f64,
}

fn no_damping() -> f64 {
    1.0
}

impl TryFrom<ParticleRecord> for Particle {
    type Error = PhysicsError;

    fn try_from(record: ParticleRecord) -> Result<Self, Self::Error> {
        let mut particle = Particle::new(record.id, record.position, record.radius, record.mass)?
            .with_velocity(record.velocity)
            .with_acceleration(record.acceleration)
            .with_damping(record.damping)?;
        particle.force_accumulator = record.force_accumulator;
        particle.validate()?;
        Ok(particle)
    }
}

// =============================================================================
// Tests
// =============================================================================
