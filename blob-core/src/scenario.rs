//! Scenario configuration loader.
//!
//! A scenario describes how to populate a simulation: how many particles,
//! where they start, how heavy they are and which forces act on them. They
//! are read from YAML files so demos can be tuned without recompiling.
//!
//! ## Directory Structure
//!
//! ```text
//! scenarios/
//! ├── blob_demo.yaml
//! └── head_on.yaml
//! ```
//!
//! Every field is optional; missing ones take the values of the classic
//! blob demo (20 particles in a 200x200 box under 20x gravity).

use std::fs;
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::collision::Platform;
use crate::error::PhysicsError;
use crate::particle::{Particle, ParticleId};
use crate::simulation::Simulation;
use crate::types::{constants, Domain, Mass, Vec2};

/// Error type for scenario loading and building.
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Scenario not found: {0}")]
    NotFound(String),

    #[error("Invalid scenario: {0}")]
    Invalid(String),

    #[error(transparent)]
    Physics(#[from] PhysicsError),
}

/// Everything needed to set up a simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub name: String,

    /// Number of randomly placed particles.
    pub particle_count: usize,

    /// Particles start uniformly inside `[-range, range]` on both axes.
    pub range: f64,

    /// Box half-extents. Defaults to a square of `range`.
    pub domain: Option<Domain>,

    pub initial_velocity: Vec2,

    /// Per-second velocity retention, in (0, 1].
    pub damping: f64,

    pub gravity: Vec2,

    /// Multiplier applied to `gravity` to get each particle's acceleration.
    pub gravity_scale: f64,

    pub mass_min: f64,
    pub mass_max: f64,

    /// Radius of a particle per unit of mass.
    pub radius_per_mass: f64,

    /// Interval between frames in milliseconds.
    pub time_interval_ms: f64,

    /// Seed for reproducible placement; a random seed is used when absent.
    pub seed: Option<u64>,

    /// Hand placed particles, added after the random ones.
    pub particles: Vec<ParticleSpec>,

    pub platforms: Vec<Platform>,
}

/// One hand placed particle in a scenario file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticleSpec {
    pub position: Vec2,
    #[serde(default)]
    pub velocity: Vec2,
    pub radius: f64,
    /// Omitted for an immovable particle.
    #[serde(default)]
    pub mass: Option<f64>,
    #[serde(default = "default_damping")]
    pub damping: f64,
}

fn default_damping() -> f64 {
    1.0
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            name: "Blob Demo".to_string(),
            particle_count: 20,
            range: 100.0,
            domain: None,
            initial_velocity: Vec2::new(10.0, 10.0),
            damping: 1.0,
            gravity: Vec2::new(0.0, -constants::GRAVITY),
            gravity_scale: 20.0,
            mass_min: 1.0,
            mass_max: 10.0,
            radius_per_mass: 0.5,
            time_interval_ms: 10.0,
            seed: None,
            particles: Vec::new(),
            platforms: Vec::new(),
        }
    }
}

impl ScenarioConfig {
    /// Parse a scenario from YAML text.
    pub fn from_yaml(contents: &str) -> Result<Self, ScenarioError> {
        let config: ScenarioConfig = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check ranges that serde cannot express.
    pub fn validate(&self) -> Result<(), ScenarioError> {
        if self.particle_count > ParticleId::MAX as usize {
            return Err(ScenarioError::Invalid(format!(
                "particle_count {} exceeds the particle id space",
                self.particle_count
            )));
        }
        if !(self.range.is_finite() && self.range > 0.0) {
            return Err(ScenarioError::Invalid(format!(
                "range must be positive, got {}",
                self.range
            )));
        }
        if !(self.mass_min > 0.0 && self.mass_max >= self.mass_min && self.mass_max.is_finite()) {
            return Err(ScenarioError::Invalid(format!(
                "mass range must satisfy 0 < min <= max, got {}..{}",
                self.mass_min, self.mass_max
            )));
        }
        if !(self.radius_per_mass.is_finite() && self.radius_per_mass > 0.0) {
            return Err(ScenarioError::Invalid(format!(
                "radius_per_mass must be positive, got {}",
                self.radius_per_mass
            )));
        }
        if !(self.damping > 0.0 && self.damping <= 1.0) {
            return Err(PhysicsError::InvalidDamping(self.damping).into());
        }
        if !(self.time_interval_ms.is_finite() && self.time_interval_ms > 0.0) {
            return Err(ScenarioError::Invalid(format!(
                "time_interval_ms must be positive, got {}",
                self.time_interval_ms
            )));
        }
        if !self.initial_velocity.is_finite() {
            return Err(ScenarioError::Invalid(format!(
                "initial_velocity must be finite, got {:?}",
                self.initial_velocity
            )));
        }
        if !(self.gravity.is_finite() && self.gravity_scale.is_finite() && self.acceleration().is_finite()) {
            return Err(ScenarioError::Invalid(format!(
                "gravity must be finite, got {:?} scaled by {}",
                self.gravity, self.gravity_scale
            )));
        }
        if let Some(domain) = self.domain {
            Domain::new(domain.width, domain.height)?;
        }
        Ok(())
    }

    /// Frame interval in seconds.
    pub fn time_step(&self) -> f64 {
        self.time_interval_ms / 1000.0
    }

    /// Acceleration given to every randomly placed particle.
    pub fn acceleration(&self) -> Vec2 {
        self.gravity * self.gravity_scale
    }

    pub fn domain(&self) -> Result<Domain, PhysicsError> {
        match self.domain {
            Some(domain) => Domain::new(domain.width, domain.height),
            None => Domain::square(self.range),
        }
    }

    /// Build a simulation, seeding placement from `seed` when set.
    pub fn build(&self) -> Result<Simulation, ScenarioError> {
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        self.build_with_rng(&mut rng)
    }

    /// Build a simulation drawing random placement from `rng`.
    ///
    /// Random particles get ids `0..particle_count`; hand placed particles
    /// follow in file order.
    pub fn build_with_rng<R: Rng>(&self, rng: &mut R) -> Result<Simulation, ScenarioError> {
        self.validate()?;

        let mut sim = Simulation::new(self.domain()?);
        let acceleration = self.acceleration();

        for index in 0..self.particle_count {
            let position = Vec2::new(
                rng.random_range(-self.range..=self.range),
                rng.random_range(-self.range..=self.range),
            );
            let mass = rng.random_range(self.mass_min..=self.mass_max);

            let id = ParticleId::try_from(index).map_err(|_| {
                ScenarioError::Invalid(format!("particle index {} exceeds the particle id space", index))
            })?;
            let particle = Particle::new(
                id,
                position,
                mass * self.radius_per_mass,
                Mass::finite(mass)?,
            )?
            .with_velocity(self.initial_velocity)
            .with_acceleration(acceleration)
            .with_damping(self.damping)?;

            sim.insert(particle)?;
        }

        for spec in &self.particles {
            let mass = match spec.mass {
                Some(m) => Mass::finite(m)?,
                None => Mass::Immovable,
            };
            let particle = Particle::new(sim.next_id()?, spec.position, spec.radius, mass)?
                .with_velocity(spec.velocity)
                .with_acceleration(if mass.is_finite() {
                    acceleration
                } else {
                    Vec2::ZERO
                })
                .with_damping(spec.damping)?;
            sim.insert(particle)?;
        }

        for platform in &self.platforms {
            sim.add_contact_generator(*platform);
        }

        info!(
            scenario = %self.name,
            particles = sim.len(),
            platforms = self.platforms.len(),
            "built simulation from scenario"
        );

        Ok(sim)
    }
}

/// Scenario loader with configurable base directory.
pub struct ScenarioLoader {
    base_path: PathBuf,
}

impl ScenarioLoader {
    /// Create a new loader reading `*.yaml` files from `base_path`.
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    /// Load a scenario by name (without .yaml extension).
    ///
    /// # Example
    /// ```ignore
    /// let loader = ScenarioLoader::new("scenarios");
    /// let sim = loader.load("blob_demo")?.build()?;
    /// ```
    pub fn load(&self, name: &str) -> Result<ScenarioConfig, ScenarioError> {
        let path = self.base_path.join(format!("{}.yaml", name));
        if !path.exists() {
            return Err(ScenarioError::NotFound(name.to_string()));
        }
        let contents = fs::read_to_string(&path)?;
        ScenarioConfig::from_yaml(&contents)
    }

    /// List all available scenarios, sorted by name.
    pub fn list(&self) -> Result<Vec<String>, ScenarioError> {
        if !self.base_path.exists() {
            return Ok(vec![]);
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(&self.base_path)? {
            let entry = entry?;
            let file_name = entry.file_name();
            let name = file_name.to_string_lossy();
            if let Some(stem) = name.strip_suffix(".yaml") {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}

// =============================================================================
// Tests
// =============================================================================
