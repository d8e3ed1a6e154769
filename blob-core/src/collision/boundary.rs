//! Collisions against the edges of the simulation box.
//!
//! Two independent passes are applied to every particle each frame:
//!
//! 1. **Reflection**: a particle whose circle crosses an edge has the
//!    matching velocity component negated. X and Y are checked separately,
//!    so a particle in a corner bounces off both walls in one call.
//! 2. **Clamping**: a particle found outside the box is moved back onto the
//!    nearest allowed position. This keeps particles inside when the box
//!    shrinks between frames (a viewport resize), which reflection alone
//!    cannot do.
//!
//! ```text
//!   -width+r           width-r
//!      │    allowed centres │
//!  ────┼────────────────────┼────
//! ```

use tracing::warn;

use crate::particle::Particle;
use crate::types::Domain;

/// Which walls a particle touched during reflection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BoundaryOutcome {
    pub reflected_x: bool,
    pub reflected_y: bool,
    pub clamped: bool,
}

impl BoundaryOutcome {
    pub fn any(&self) -> bool {
        self.reflected_x || self.reflected_y || self.clamped
    }
}

/// Box-edge collision handling.
pub struct BoundaryHandler;

impl BoundaryHandler {
    /// Negate each velocity component whose axis is past its limit.
    ///
    /// Returns `(reflected_x, reflected_y)`.
    pub fn reflect(particle: &mut Particle, domain: &Domain) -> (bool, bool) {
        let radius = particle.radius();
        let (x_min, x_max) = domain.x_limits(radius);
        let (y_min, y_max) = domain.y_limits(radius);
        let position = particle.position;

        let reflect_x = position.x > x_max || position.x < x_min;
        let reflect_y = position.y > y_max || position.y < y_min;

        if reflect_x {
            particle.velocity.x = -particle.velocity.x;
        }
        if reflect_y {
            particle.velocity.y = -particle.velocity.y;
        }

        (reflect_x, reflect_y)
    }

    /// True if the particle's circle reaches past any edge of the box.
    pub fn is_out_of_bounds(particle: &Particle, domain: &Domain) -> bool {
        let radius = particle.radius();
        let (x_min, x_max) = domain.x_limits(radius);
        let (y_min, y_max) = domain.y_limits(radius);
        let position = particle.position;

        position.x > x_max || position.x < x_min || position.y > y_max || position.y < y_min
    }

    /// Move the particle back inside the box, each axis independently.
    ///
    /// Idempotent: clamping an in-bounds particle does nothing. When the box
    /// is narrower than the particle along an axis, the particle is centred
    /// on that axis.
    pub fn clamp(particle: &mut Particle, domain: &Domain) {
        let radius = particle.radius();
        let (x_min, x_max) = domain.x_limits(radius);
        let (y_min, y_max) = domain.y_limits(radius);

        particle.position.x = clamp_axis(particle.position.x, x_min, x_max);
        particle.position.y = clamp_axis(particle.position.y, y_min, y_max);
    }

    /// Reflect, then clamp if the particle is outside the box.
    pub fn resolve(particle: &mut Particle, domain: &Domain) -> BoundaryOutcome {
        let (reflected_x, reflected_y) = Self::reflect(particle, domain);

        let clamped = Self::is_out_of_bounds(particle, domain);
        if clamped {
            let before = particle.position;
            Self::clamp(particle, domain);
            if (before - particle.position).magnitude() > particle.radius() {
                warn!(
                    id = particle.id(),
                    from = ?before,
                    to = ?particle.position,
                    "particle was far outside the domain"
                );
            }
        }

        BoundaryOutcome {
            reflected_x,
            reflected_y,
            clamped,
        }
    }
}

fn clamp_axis(value: f64, min: f64, max: f64) -> f64 {
    if min > max {
        0.0
    } else if value > max {
        max
    } else if value < min {
        min
    } else {
        value
    }
}

// =============================================================================
// Tests
// =============================================================================
