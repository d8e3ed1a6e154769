//! Force generators.
//!
//! A force generator adds a force to a particle's accumulator before the
//! integration step. Generators are registered with a [`ForceRegistry`] and
//! applied either to every particle or to a single one.
//!
//! - **Gravity**: `F = m * g`, skipped for immovable bodies
//! - **Drag**: `F = -(k1*|v| + k2*|v|²) * v̂`
//!
//! Constant gravity can also be expressed through a particle's
//! `acceleration`, which is what the scenario setup does. The generator form
//! exists for per-particle gravity and for combining it with other forces.

use crate::particle::{Particle, ParticleId};
use crate::types::{constants, Mass, Vec2};

/// Anything that can push on a particle.
pub trait ForceGenerator: Send + Sync {
    /// Add this generator's force for the coming step of `dt` seconds.
    fn update_force(&self, particle: &mut Particle, dt: f64);
}

/// Uniform gravitational field.
#[derive(Debug, Clone, Copy)]
pub struct Gravity {
    pub gravity: Vec2,
}

impl Gravity {
    pub fn new(gravity: Vec2) -> Self {
        Self { gravity }
    }
}

impl Default for Gravity {
    fn default() -> Self {
        Self::new(Vec2::new(0.0, -constants::GRAVITY))
    }
}

impl ForceGenerator for Gravity {
    fn update_force(&self, particle: &mut Particle, _dt: f64) {
        if let Mass::Finite(m) = particle.mass() {
            particle.add_force(self.gravity * m);
        }
    }
}

/// Velocity dependent drag with a linear and a quadratic term.
#[derive(Debug, Clone, Copy)]
pub struct Drag {
    /// Linear drag coefficient
    pub k1: f64,
    /// Quadratic drag coefficient
    pub k2: f64,
}

impl Drag {
    pub fn new(k1: f64, k2: f64) -> Self {
        Self { k1, k2 }
    }
}

impl ForceGenerator for Drag {
    fn update_force(&self, particle: &mut Particle, _dt: f64) {
        let speed = particle.velocity.magnitude();
        if speed < constants::EPSILON {
            return;
        }

        let drag = self.k1 * speed + self.k2 * speed * speed;
        particle.add_force(particle.velocity.normalized() * (-drag));
    }
}

/// Which particles a registered generator acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForceTarget {
    All,
    Particle(ParticleId),
}

/// Generators registered with the simulation, applied in registration order.
#[derive(Default)]
pub struct ForceRegistry {
    entries: Vec<(ForceTarget, Box<dyn ForceGenerator>)>,
}

impl ForceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, target: ForceTarget, generator: Box<dyn ForceGenerator>) {
        self.entries.push((target, generator));
    }

    /// Drops every registration aimed at `id`.
    pub fn remove_target(&mut self, id: ParticleId) {
        self.entries
            .retain(|(target, _)| *target != ForceTarget::Particle(id));
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Let every generator add its force to the particles it targets.
    pub fn apply(&self, particles: &mut [Particle], dt: f64) {
        for (target, generator) in &self.entries {
            match target {
                ForceTarget::All => {
                    for particle in particles.iter_mut() {
                        generator.update_force(particle, dt);
                    }
                }
                ForceTarget::Particle(id) => {
                    if let Some(particle) = particles.iter_mut().find(|p| p.id() == *id) {
                        generator.update_force(particle, dt);
                    }
                }
            }
        }
    }
}

impl std::fmt::Debug for ForceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForceRegistry")
            .field("entries", &self.entries.len())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn particle(id: ParticleId, mass: Mass) -> Particle {
        Particle::new(id, Vec2::ZERO, 1.0, mass).unwrap()
    }

    #[test]
    fn test_gravity_scales_with_mass() {
        let gravity = Gravity::default();
        let mut p = particle(0, Mass::Finite(2.0));

        gravity.update_force(&mut p, 0.01);

        assert!((p.accumulated_force().y + 2.0 * constants::GRAVITY).abs() < 1e-10);
    }

    #[test]
    fn test_gravity_then_integrate_matches_constant_acceleration() {
        let mut via_force = particle(0, Mass::Finite(3.0));
        let mut via_accel = particle(1, Mass::Finite(3.0))
            .with_acceleration(Vec2::new(0.0, -constants::GRAVITY));

        Gravity::default().update_force(&mut via_force, 0.1);
        via_force.integrate(0.1).unwrap();
        via_accel.integrate(0.1).unwrap();

        assert!((via_force.velocity.y - via_accel.velocity.y).abs() < 1e-10);
    }

    #[test]
    fn test_gravity_ignores_immovable() {
        let mut wall = particle(0, Mass::Immovable);
        Gravity::default().update_force(&mut wall, 0.01);
        assert_eq!(wall.accumulated_force(), Vec2::ZERO);
    }

    #[test]
    fn test_drag_opposes_velocity() {
        let drag = Drag::new(0.5, 0.1);
        let mut p = particle(0, Mass::Finite(1.0)).with_velocity(Vec2::new(10.0, 0.0));

        drag.update_force(&mut p, 0.01);

        // 0.5*10 + 0.1*100 = 15
        let force = p.accumulated_force();
        assert!((force.x + 15.0).abs() < 1e-10, "Drag force x = {}", force.x);
        assert!(force.y.abs() < 1e-10);
    }

    #[test]
    fn test_drag_at_rest_is_zero() {
        let mut p = particle(0, Mass::Finite(1.0));
        Drag::new(1.0, 1.0).update_force(&mut p, 0.01);
        assert_eq!(p.accumulated_force(), Vec2::ZERO);
    }

    #[test]
    fn test_registry_targets() {
        let mut registry = ForceRegistry::new();
        registry.add(ForceTarget::All, Box::new(Gravity::new(Vec2::new(0.0, -1.0))));
        registry.add(
            ForceTarget::Particle(1),
            Box::new(Gravity::new(Vec2::new(1.0, 0.0))),
        );

        let mut particles = vec![particle(0, Mass::Finite(1.0)), particle(1, Mass::Finite(1.0))];
        registry.apply(&mut particles, 0.01);

        assert_eq!(particles[0].accumulated_force(), Vec2::new(0.0, -1.0));
        assert_eq!(particles[1].accumulated_force(), Vec2::new(1.0, -1.0));

        registry.remove_target(1);
        assert_eq!(registry.len(), 1);
    }
}
