//! Contact generators.
//!
//! Besides particle pairs, a simulation can hold static geometry that
//! produces contacts with particles. Each generator inspects the particles
//! after the pair pass and emits [`ParticleContact`]s, which are then
//! resolved once each with a restitution impulse.
//!
//! The built-in generator is [`Platform`], a line segment particles can
//! land on and roll along.

use serde::{Deserialize, Serialize};

use crate::collision::detection::pair_mut;
use crate::particle::{Particle, ParticleId};
use crate::types::{constants, Vec2};

/// A contact between a particle and either another particle or the scenery.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleContact {
    pub particle: ParticleId,
    /// Second particle, or `None` for contact with immovable scenery.
    pub other: Option<ParticleId>,
    /// Unit vector from the other body toward `particle`.
    pub normal: Vec2,
    pub penetration: f64,
    /// 1 for a perfectly elastic bounce, 0 to kill the normal velocity.
    pub restitution: f64,
}

impl ParticleContact {
    /// Velocity at which the two bodies move apart along the normal.
    /// Negative while they approach each other.
    pub fn separating_velocity(&self, a: &Particle, b: Option<&Particle>) -> f64 {
        let mut relative = a.velocity;
        if let Some(b) = b {
            relative -= b.velocity;
        }
        relative.dot(&self.normal)
    }

    /// Apply the restitution impulse and remove the interpenetration.
    ///
    /// `b` must be the particle named by `other`, if any.
    pub fn resolve(&self, a: &mut Particle, mut b: Option<&mut Particle>) {
        self.resolve_velocity(a, b.as_deref_mut());
        self.resolve_interpenetration(a, b);
    }

    fn resolve_velocity(&self, a: &mut Particle, b: Option<&mut Particle>) {
        let separating = self.separating_velocity(a, b.as_deref());
        if separating > 0.0 {
            return;
        }

        let new_separating = -separating * self.restitution;
        let delta = new_separating - separating;

        let total_inverse_mass =
            a.inverse_mass() + b.as_ref().map_or(0.0, |b| b.inverse_mass());
        if total_inverse_mass <= 0.0 {
            return;
        }

        let impulse_per_inverse_mass = self.normal * (delta / total_inverse_mass);

        a.velocity.add_scaled(impulse_per_inverse_mass, a.inverse_mass());
        if let Some(b) = b {
            let inverse_mass = b.inverse_mass();
            b.velocity.add_scaled(impulse_per_inverse_mass, -inverse_mass);
        }
    }

    fn resolve_interpenetration(&self, a: &mut Particle, b: Option<&mut Particle>) {
        if self.penetration <= 0.0 {
            return;
        }

        let total_inverse_mass =
            a.inverse_mass() + b.as_ref().map_or(0.0, |b| b.inverse_mass());
        if total_inverse_mass <= 0.0 {
            return;
        }

        let move_per_inverse_mass = self.normal * (self.penetration / total_inverse_mass);

        a.position.add_scaled(move_per_inverse_mass, a.inverse_mass());
        if let Some(b) = b {
            let inverse_mass = b.inverse_mass();
            b.position.add_scaled(move_per_inverse_mass, -inverse_mass);
        }
    }
}

/// Something that produces contacts for particles.
pub trait ContactGenerator: Send + Sync {
    /// Append contacts for `particles` to `contacts`, producing at most
    /// `limit` of them. Returns the number added.
    fn add_contacts(
        &self,
        particles: &[Particle],
        contacts: &mut Vec<ParticleContact>,
        limit: usize,
    ) -> usize;
}

/// A static line segment particles collide with.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Platform {
    pub start: Vec2,
    pub end: Vec2,
    #[serde(default = "default_restitution")]
    pub restitution: f64,
}

fn default_restitution() -> f64 {
    1.0
}

impl Platform {
    pub fn new(start: Vec2, end: Vec2) -> Self {
        Self {
            start,
            end,
            restitution: default_restitution(),
        }
    }

    pub fn with_restitution(mut self, restitution: f64) -> Self {
        self.restitution = restitution;
        self
    }

    /// Contact between this segment and one particle, if they overlap.
    ///
    /// The closest feature of the segment is the start point, the end point
    /// or the interior, depending on where the particle projects.
    pub fn contact_with(&self, particle: &Particle) -> Option<ParticleContact> {
        let radius = particle.radius();
        let radius_sq = radius * radius;
        let line = self.end - self.start;
        let line_length_sq = line.magnitude_squared();
        let to_particle = particle.position - self.start;
        let projected = to_particle.dot(&line);

        let closest = if projected <= 0.0 || line_length_sq < constants::EPSILON {
            self.start
        } else if projected >= line_length_sq {
            self.end
        } else {
            self.start + line * (projected / line_length_sq)
        };

        let offset = particle.position - closest;
        let distance_sq = offset.magnitude_squared();
        if distance_sq >= radius_sq {
            return None;
        }

        // A centre lying exactly on the segment has no preferred side
        let normal = offset.try_normalized().unwrap_or_else(|| {
            Vec2::new(-line.y, line.x)
                .try_normalized()
                .unwrap_or(Vec2::new(0.0, 1.0))
        });

        Some(ParticleContact {
            particle: particle.id(),
            other: None,
            normal,
            penetration: radius - distance_sq.sqrt(),
            restitution: self.restitution,
        })
    }
}

impl ContactGenerator for Platform {
    fn add_contacts(
        &self,
        particles: &[Particle],
        contacts: &mut Vec<ParticleContact>,
        limit: usize,
    ) -> usize {
        let mut used = 0;
        for particle in particles {
            if used >= limit {
                break;
            }
            if let Some(contact) = self.contact_with(particle) {
                contacts.push(contact);
                used += 1;
            }
        }
        used
    }
}

/// Resolve each contact once, in order.
///
/// Contacts naming an id that is not present in `particles` are skipped.
/// Returns the number of contacts resolved.
pub fn resolve_contacts(particles: &mut [Particle], contacts: &[ParticleContact]) -> usize {
    let mut resolved = 0;
    for contact in contacts {
        let Some(i) = particles.iter().position(|p| p.id() == contact.particle) else {
            continue;
        };

        match contact.other {
            None => contact.resolve(&mut particles[i], None),
            Some(other) => {
                let Some(j) = particles.iter().position(|p| p.id() == other) else {
                    continue;
                };
                if i == j {
                    continue;
                }
                let (a, b) = pair_mut(particles, i, j);
                contact.resolve(a, Some(b));
            }
        }
        resolved += 1;
    }
    resolved
}

// =============================================================================
// Tests
// =============================================================================
