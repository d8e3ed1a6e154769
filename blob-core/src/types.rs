//! Core types for the particle simulation.
//!
//! The simulation is two dimensional and unit agnostic. The reference demo
//! works in "world units" where the visible box spans roughly `[-100, 100]`
//! on its shorter axis and time is measured in seconds.

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign};

use crate::error::PhysicsError;

// =============================================================================
// Vec2 - 2D Vector
// =============================================================================

/// A 2D vector used for positions, velocities, accelerations and forces.
///
/// Coordinate system:
/// - X: horizontal (positive to the right)
/// - Y: vertical (positive upward)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    /// Unit vector along +X.
    pub const UNIT_X: Vec2 = Vec2 { x: 1.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared magnitude (avoids sqrt for comparisons)
    pub fn magnitude_squared(&self) -> f64 {
        self.x * self.x + self.y * self.y
    }

    /// Magnitude (length) of the vector
    pub fn magnitude(&self) -> f64 {
        self.magnitude_squared().sqrt()
    }

    /// Returns a unit vector in the same direction, or zero if magnitude is zero
    pub fn normalized(&self) -> Self {
        let mag = self.magnitude();
        if mag < constants::EPSILON {
            Self::ZERO
        } else {
            *self * (1.0 / mag)
        }
    }

    /// Returns a unit vector in the same direction, or `None` for a
    /// (near) zero vector whose direction is undefined.
    pub fn try_normalized(&self) -> Option<Self> {
        let mag = self.magnitude();
        if mag < constants::EPSILON {
            None
        } else {
            Some(*self * (1.0 / mag))
        }
    }

    /// Dot product
    pub fn dot(&self, other: &Self) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// Adds `other * scale` in place.
    pub fn add_scaled(&mut self, other: Self, scale: f64) {
        self.x += other.x * scale;
        self.y += other.y * scale;
    }

    /// Component of this vector along the unit vector `axis`.
    pub fn project_onto_unit(&self, axis: &Self) -> Self {
        *axis * self.dot(axis)
    }

    /// True when both components are finite.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

// Operator overloads for Vec2
impl Add for Vec2 {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self {
            x: self.x + other.x,
            y: self.y + other.y,
        }
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, other: Self) {
        self.x += other.x;
        self.y += other.y;
    }
}

impl Sub for Vec2 {
    type Output = Self;
    fn sub(self, other: Self) -> Self {
        Self {
            x: self.x - other.x,
            y: self.y - other.y,
        }
    }
}

impl SubAssign for Vec2 {
    fn sub_assign(&mut self, other: Self) {
        self.x -= other.x;
        self.y -= other.y;
    }
}

impl Mul<f64> for Vec2 {
    type Output = Self;
    fn mul(self, scalar: f64) -> Self {
        Self {
            x: self.x * scalar,
            y: self.y * scalar,
        }
    }
}

impl MulAssign<f64> for Vec2 {
    fn mul_assign(&mut self, scalar: f64) {
        self.x *= scalar;
        self.y *= scalar;
    }
}

impl Neg for Vec2 {
    type Output = Self;
    fn neg(self) -> Self {
        Self {
            x: -self.x,
            y: -self.y,
        }
    }
}

impl Default for Vec2 {
    fn default() -> Self {
        Self::ZERO
    }
}

// =============================================================================
// Mass
// =============================================================================

/// Mass of a particle.
///
/// Immovable bodies are modelled explicitly instead of through a huge numeric
/// sentinel, so collision formulas can take the infinite-mass limit exactly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Mass {
    Finite(f64),
    Immovable,
}

impl Mass {
    /// Creates a finite mass, rejecting zero, negative and non-finite values.
    pub fn finite(mass: f64) -> Result<Self, PhysicsError> {
        if mass.is_finite() && mass > 0.0 {
            Ok(Mass::Finite(mass))
        } else {
            Err(PhysicsError::InvalidMass(mass))
        }
    }

    /// Builds a mass from an inverse mass. Zero or negative means immovable.
    pub fn from_inverse(inverse_mass: f64) -> Result<Self, PhysicsError> {
        if inverse_mass.is_nan() || inverse_mass.is_infinite() {
            return Err(PhysicsError::InvalidMass(inverse_mass));
        }
        if inverse_mass <= 0.0 {
            Ok(Mass::Immovable)
        } else {
            Self::finite(1.0 / inverse_mass)
        }
    }

    /// Reciprocal of the mass; zero for immovable bodies.
    pub fn inverse(&self) -> f64 {
        match self {
            Mass::Finite(m) => 1.0 / m,
            Mass::Immovable => 0.0,
        }
    }

    /// The finite value, if any.
    pub fn value(&self) -> Option<f64> {
        match self {
            Mass::Finite(m) => Some(*m),
            Mass::Immovable => None,
        }
    }

    pub fn is_finite(&self) -> bool {
        matches!(self, Mass::Finite(_))
    }
}

// =============================================================================
// Domain
// =============================================================================

/// The rectangular box the particles live in.
///
/// Stored as half-extents of a box centered at the origin, so the box spans
/// `[-width, width] x [-height, height]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Domain {
    pub width: f64,
    pub height: f64,
}

impl Domain {
    pub fn new(width: f64, height: f64) -> Result<Self, PhysicsError> {
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            return Err(PhysicsError::InvalidDomain { width, height });
        }
        Ok(Self { width, height })
    }

    /// A square domain spanning `[-range, range]` on both axes.
    pub fn square(range: f64) -> Result<Self, PhysicsError> {
        Self::new(range, range)
    }

    /// Fits the domain to a viewport of `pixel_width x pixel_height`.
    ///
    /// The shorter side spans `range`; the longer side is stretched by the
    /// aspect ratio so world units stay square on screen. A zero height is
    /// treated as one pixel.
    pub fn fit_viewport(pixel_width: u32, pixel_height: u32, range: f64) -> Result<Self, PhysicsError> {
        let pixel_height = pixel_height.max(1);
        let aspect = f64::from(pixel_width) / f64::from(pixel_height);

        if pixel_width <= pixel_height {
            Self::new(range, range / aspect)
        } else {
            Self::new(range * aspect, range)
        }
    }

    /// Allowed range for the centre of a particle of `radius` along X.
    pub fn x_limits(&self, radius: f64) -> (f64, f64) {
        (-self.width + radius, self.width - radius)
    }

    /// Allowed range for the centre of a particle of `radius` along Y.
    pub fn y_limits(&self, radius: f64) -> (f64, f64) {
        (-self.height + radius, self.height - radius)
    }
}

impl Default for Domain {
    fn default() -> Self {
        Self {
            width: 100.0,
            height: 100.0,
        }
    }
}

// =============================================================================
// Physical Constants
// =============================================================================

/// Physical constants used in the simulation.
pub mod constants {
    /// Gravitational acceleration (m/s²)
    pub const GRAVITY: f64 = 9.81;

    /// Small value for floating-point comparisons
    pub const EPSILON: f64 = 1e-10;
}

// =============================================================================
// Tests
// =============================================================================
