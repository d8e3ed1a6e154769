//! Collision resolution between particle pairs.
//!
//! Computes post-collision velocities with the one dimensional elastic
//! collision law applied along the contact normal.
//!
//! ## Model
//!
//! Each velocity is split into a component along the normal and a
//! perpendicular remainder:
//!
//! ```text
//!   vAx = n (vA·n)        vAy = vA - vAx
//!   vBx = n (vB·n)        vBy = vB - vBx
//! ```
//!
//! The normal components are exchanged as in a head-on elastic collision of
//! masses `mA` and `mB`; the perpendicular parts pass through unchanged:
//!
//! ```text
//!   vA' = vAx (mA-mB)/(mA+mB) + vBx 2mB/(mA+mB) + vAy
//!   vB' = vAx 2mA/(mA+mB)     + vBx (mB-mA)/(mA+mB) + vBy
//! ```
//!
//! Momentum and kinetic energy along the normal are conserved.
//!
//! ## Immovable bodies
//!
//! Taking `mB → ∞` in the formulas above gives `vA' = vAy - vAx + 2 vBx` and
//! `vB' = vB`. The movable body bounces off; the immovable one keeps its
//! velocity. Two immovable bodies do not interact.

use tracing::trace;

use crate::particle::Particle;
use crate::types::{Mass, Vec2};

/// Velocities of a pair after resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExchangedVelocities {
    pub a: Vec2,
    pub b: Vec2,
}

/// Elastic collision resolver.
pub struct CollisionResolver;

impl CollisionResolver {
    /// Post-collision velocities for bodies `(va, ma)` and `(vb, mb)` meeting
    /// along `normal` (unit vector from `b` toward `a`).
    ///
    /// Returns `None` when both bodies are immovable.
    pub fn exchange(
        va: Vec2,
        ma: Mass,
        vb: Vec2,
        mb: Mass,
        normal: Vec2,
    ) -> Option<ExchangedVelocities> {
        let va_normal = va.project_onto_unit(&normal);
        let va_perp = va - va_normal;
        let vb_normal = vb.project_onto_unit(&normal);
        let vb_perp = vb - vb_normal;

        let result = match (ma, mb) {
            (Mass::Finite(ma), Mass::Finite(mb)) => {
                let total = ma + mb;
                ExchangedVelocities {
                    a: va_normal * ((ma - mb) / total) + vb_normal * (2.0 * mb / total) + va_perp,
                    b: va_normal * (2.0 * ma / total) + vb_normal * ((mb - ma) / total) + vb_perp,
                }
            }
            (Mass::Finite(_), Mass::Immovable) => ExchangedVelocities {
                a: va_perp - va_normal + vb_normal * 2.0,
                b: vb,
            },
            (Mass::Immovable, Mass::Finite(_)) => ExchangedVelocities {
                a: va,
                b: vb_perp - vb_normal + va_normal * 2.0,
            },
            (Mass::Immovable, Mass::Immovable) => return None,
        };

        Some(result)
    }

    /// Resolve a collision between two particles and mark both as collided
    /// for the current frame.
    ///
    /// `normal` points from `b` toward `a`. Returns `false` and leaves both
    /// particles untouched when neither can move.
    pub fn resolve(a: &mut Particle, b: &mut Particle, normal: Vec2) -> bool {
        let Some(exchanged) = Self::exchange(a.velocity, a.mass(), b.velocity, b.mass(), normal)
        else {
            return false;
        };

        trace!(
            a = a.id(),
            b = b.id(),
            va = ?exchanged.a,
            vb = ?exchanged.b,
            "resolved particle collision"
        );

        a.velocity = exchanged.a;
        b.velocity = exchanged.b;
        a.mark_collided();
        b.mark_collided();
        true
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn ball(id: u32, x: f64, y: f64, mass: f64, velocity: Vec2) -> Particle {
        Particle::new(id, Vec2::new(x, y), 1.0, Mass::Finite(mass))
            .unwrap()
            .with_velocity(velocity)
    }

    fn momentum_along(p: &Particle, n: Vec2) -> f64 {
        p.momentum().dot(&n)
    }

    fn normal_energy(p: &Particle, n: Vec2) -> f64 {
        let m = p.mass().value().unwrap();
        let vn = p.velocity.dot(&n);
        m * vn * vn
    }

    #[test]
    fn test_equal_masses_head_on_swap() {
        let mut a = ball(0, -1.0, 0.0, 1.0, Vec2::new(5.0, 0.0));
        let mut b = ball(1, 1.0, 0.0, 1.0, Vec2::new(-5.0, 0.0));
        let normal = (a.position - b.position).normalized();

        assert!(CollisionResolver::resolve(&mut a, &mut b, normal));

        assert!((a.velocity.x + 5.0).abs() < 1e-10, "vA' = {:?}", a.velocity);
        assert!((b.velocity.x - 5.0).abs() < 1e-10, "vB' = {:?}", b.velocity);
        assert!(a.velocity.y.abs() < 1e-10 && b.velocity.y.abs() < 1e-10);
        assert!(a.collided_this_frame() && b.collided_this_frame());
    }

    #[test]
    fn test_momentum_and_energy_conserved_along_normal() {
        let mut a = ball(0, 0.3, 1.1, 2.5, Vec2::new(-3.0, 1.5));
        let mut b = ball(1, -0.4, 0.2, 7.0, Vec2::new(2.0, 4.0));
        let normal = (a.position - b.position).normalized();

        let momentum_before = momentum_along(&a, normal) + momentum_along(&b, normal);
        let energy_before = normal_energy(&a, normal) + normal_energy(&b, normal);

        CollisionResolver::resolve(&mut a, &mut b, normal);

        let momentum_after = momentum_along(&a, normal) + momentum_along(&b, normal);
        let energy_after = normal_energy(&a, normal) + normal_energy(&b, normal);

        assert!(
            (momentum_before - momentum_after).abs() < 1e-9,
            "Momentum changed: {} -> {}",
            momentum_before,
            momentum_after
        );
        assert!(
            (energy_before - energy_after).abs() < 1e-9,
            "Energy changed: {} -> {}",
            energy_before,
            energy_after
        );
    }

    #[test]
    fn test_perpendicular_components_unchanged() {
        let mut a = ball(0, 0.0, 1.0, 1.0, Vec2::new(3.0, -2.0));
        let mut b = ball(1, 0.0, -1.0, 4.0, Vec2::new(-1.0, 2.0));
        let normal = Vec2::new(0.0, 1.0);

        CollisionResolver::resolve(&mut a, &mut b, normal);

        assert!((a.velocity.x - 3.0).abs() < 1e-10);
        assert!((b.velocity.x + 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_heavy_target_barely_moves() {
        let mut light = ball(0, -1.0, 0.0, 1.0, Vec2::new(10.0, 0.0));
        let mut heavy = ball(1, 1.0, 0.0, 1000.0, Vec2::ZERO);

        CollisionResolver::resolve(&mut light, &mut heavy, Vec2::new(-1.0, 0.0));

        assert!(light.velocity.x < -9.9, "Light body should bounce back: {:?}", light.velocity);
        assert!(heavy.velocity.x > 0.0 && heavy.velocity.x < 0.1);
    }

    #[test]
    fn test_immovable_reflects_movable_only() {
        let mut a = ball(0, -1.0, 0.0, 3.0, Vec2::new(4.0, 1.0));
        let mut wall = Particle::new(1, Vec2::new(1.0, 0.0), 1.0, Mass::Immovable).unwrap();

        assert!(CollisionResolver::resolve(&mut a, &mut wall, Vec2::new(-1.0, 0.0)));

        assert!((a.velocity.x + 4.0).abs() < 1e-10, "vA' = {:?}", a.velocity);
        assert!((a.velocity.y - 1.0).abs() < 1e-10);
        assert_eq!(wall.velocity, Vec2::ZERO);
        assert!(a.velocity.is_finite());
    }

    #[test]
    fn test_immovable_on_either_side() {
        let exchanged = CollisionResolver::exchange(
            Vec2::ZERO,
            Mass::Immovable,
            Vec2::new(2.0, 0.0),
            Mass::Finite(1.0),
            Vec2::new(1.0, 0.0),
        )
        .unwrap();

        assert_eq!(exchanged.a, Vec2::ZERO);
        assert!((exchanged.b.x + 2.0).abs() < 1e-10);
    }

    #[test]
    fn test_two_immovable_bodies_no_op() {
        let mut a = Particle::new(0, Vec2::ZERO, 1.0, Mass::Immovable).unwrap();
        let mut b = Particle::new(1, Vec2::ZERO, 1.0, Mass::Immovable).unwrap();

        assert!(!CollisionResolver::resolve(&mut a, &mut b, Vec2::UNIT_X));
        assert!(!a.collided_this_frame());
        assert!(!b.collided_this_frame());
    }
}
