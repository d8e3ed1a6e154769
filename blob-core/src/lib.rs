//! # Blob Core
//!
//! A 2D particle engine: circular bodies fall under gravity, bounce off the
//! walls of a box and collide elastically with each other.
//!
//! ## Architecture
//!
//! - `types`: Core data structures (Vec2, Mass, Domain)
//! - `particle`: Per-body state and force accumulation
//! - `integrator`: Numerical integration (semi-implicit Euler with damping)
//! - `forces`: Force generators (gravity, drag)
//! - `collision`: Pair detection, elastic resolution, box edges, contacts
//! - `simulation`: Main orchestrator
//! - `scenario`: YAML-based scenario configuration loader
//!
//! ## Example
//!
//! ```
//! use blob_core::simulation::Simulation;
//! use blob_core::types::{Domain, Mass, Vec2};
//!
//! let mut sim = Simulation::new(Domain::square(100.0)?);
//! sim.spawn(Vec2::new(0.0, 0.0), 1.0, Mass::finite(2.0)?)?;
//! sim.step(0.01)?;
//! # Ok::<(), blob_core::error::PhysicsError>(())
//! ```

pub mod collision;
pub mod error;
pub mod forces;
pub mod integrator;
pub mod particle;
pub mod scenario;
pub mod simulation;
pub mod types;
