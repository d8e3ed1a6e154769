//! Circle-circle collision detection.
//!
//! Detects overlapping particle pairs at the end of a step and separates
//! them along the line between their centres.

use tracing::warn;

use crate::particle::Particle;
use crate::types::{constants, Mass, Vec2};

/// Configuration for collision detection.
#[derive(Debug, Clone)]
pub struct DetectionConfig {
    /// Normal used when two centres coincide and the direction between them
    /// is undefined. Must be a unit vector.
    pub fallback_normal: Vec2,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            fallback_normal: Vec2::UNIT_X,
        }
    }
}

/// Geometry of one overlapping pair `(a, b)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionPair {
    /// Unit vector pointing from `b` toward `a`.
    pub normal: Vec2,
    /// Overlap depth along `normal`; zero when the circles just touch.
    pub penetration: f64,
    /// Distance between the centres before separation.
    pub distance: f64,
}

/// Collision detector for particle pairs.
#[derive(Debug, Clone, Default)]
pub struct CollisionDetector {
    pub config: DetectionConfig,
}

impl CollisionDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: DetectionConfig) -> Self {
        Self { config }
    }

    /// Test two circles for overlap.
    ///
    /// Touching circles (`distance == ra + rb`) count as overlapping. This is
    /// pure geometry: collision flags and masses are not looked at.
    pub fn check(&self, a: &Particle, b: &Particle) -> Option<CollisionPair> {
        let offset = a.position - b.position;
        let distance = offset.magnitude();
        let sum_radii = a.radius() + b.radius();

        if distance > sum_radii {
            return None;
        }

        let normal = match offset.try_normalized() {
            Some(normal) => normal,
            None => {
                warn!(
                    a = a.id(),
                    b = b.id(),
                    "coincident particle centres, using fallback normal"
                );
                self.config.fallback_normal
            }
        };

        Some(CollisionPair {
            normal,
            penetration: sum_radii - distance,
            distance,
        })
    }

    /// Push an overlapping pair apart so the circles just touch.
    ///
    /// The overlap is split equally between two movable bodies. An immovable
    /// body never moves; its partner takes the whole correction.
    pub fn depenetrate(a: &mut Particle, b: &mut Particle, pair: &CollisionPair) {
        let correction = pair.normal * pair.penetration;

        match (a.mass(), b.mass()) {
            (Mass::Finite(_), Mass::Finite(_)) => {
                a.position += correction * 0.5;
                b.position -= correction * 0.5;
            }
            (Mass::Finite(_), Mass::Immovable) => a.position += correction,
            (Mass::Immovable, Mass::Finite(_)) => b.position -= correction,
            (Mass::Immovable, Mass::Immovable) => {}
        }
    }

    /// Detect a collision between `a` and `b` and separate them if found.
    ///
    /// Returns `None` without touching either particle when they are the
    /// same particle, when either already collided this frame, when both are
    /// immovable, or when they do not overlap.
    pub fn detect_and_separate(&self, a: &mut Particle, b: &mut Particle) -> Option<CollisionPair> {
        if a.id() == b.id() || a.collided_this_frame() || b.collided_this_frame() {
            return None;
        }
        if !a.has_finite_mass() && !b.has_finite_mass() {
            return None;
        }

        let pair = self.check(a, b)?;
        if pair.penetration > constants::EPSILON {
            Self::depenetrate(a, b, &pair);
        }
        Some(pair)
    }
}

/// Mutable references to two distinct elements of a slice.
///
/// # Panics
/// Panics if `i == j` or either index is out of bounds.
pub fn pair_mut<T>(items: &mut [T], i: usize, j: usize) -> (&mut T, &mut T) {
    assert_ne!(i, j, "pair_mut needs two distinct indices");
    if i < j {
        let (left, right) = items.split_at_mut(j);
        (&mut left[i], &mut right[0])
    } else {
        let (left, right) = items.split_at_mut(i);
        (&mut right[0], &mut left[j])
    }
}

// =============================================================================
// Tests
// =============================================================================
