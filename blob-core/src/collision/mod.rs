//! Collision handling between particles and against the domain.
//!
//! This module handles:
//! - **Detection**: discrete circle-circle overlap at the end of a step,
//!   followed by positional de-penetration
//! - **Resolution**: elastic exchange of the velocity components along the
//!   contact normal
//! - **Boundary**: reflection and clamping against the edges of the box
//! - **Contact**: pluggable contact generators (line platforms) resolved
//!   with a restitution impulse
//!
//! ## De-penetration
//!
//! Two overlapping particles are pushed apart along the line between their
//! centres before their velocities are exchanged:
//!
//! ```text
//!    A    B              A      B
//!   ( (  ) )    ──►    (  )  (  )
//!    overlap            touching
//! ```
//!
//! Without this step, a pair that is still overlapping on the next frame
//! resolves again with reversed normals and the two particles orbit each
//! other indefinitely.

pub mod boundary;
pub mod contact;
pub mod detection;
pub mod resolution;

pub use boundary::*;
pub use contact::*;
pub use detection::*;
pub use resolution::*;
