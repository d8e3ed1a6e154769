//! Python bindings for the blob-core particle engine.
//!
//! Provides a simple Python API for driving the simulation from a render
//! loop:
//!
//! ```python
//! from blob_physics import Simulation
//!
//! sim = Simulation.from_scenario("scenarios", "blob_demo")
//!
//! while running:
//!     sim.step(sim.time_step)
//!     for x, y, radius in sim.positions():
//!         draw_circle(x, y, radius)
//! ```

use pyo3::exceptions::{PyIOError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyDict;

use blob_core::collision::Platform;
use blob_core::error::PhysicsError;
use blob_core::forces::{Drag, ForceTarget, Gravity};
use blob_core::particle::{Particle, ParticleId};
use blob_core::scenario::{ScenarioConfig, ScenarioError, ScenarioLoader};
use blob_core::simulation::Simulation as CoreSimulation;
use blob_core::types::{Domain, Mass, Vec2 as CoreVec2};

fn physics_err(err: PhysicsError) -> PyErr {
    PyValueError::new_err(err.to_string())
}

fn scenario_err(err: ScenarioError) -> PyErr {
    match err {
        ScenarioError::Io(e) => PyIOError::new_err(e.to_string()),
        other => PyValueError::new_err(other.to_string()),
    }
}

/// 2D vector for positions and velocities.
#[pyclass]
#[derive(Clone, Copy)]
pub struct Vec2 {
    #[pyo3(get, set)]
    pub x: f64,
    #[pyo3(get, set)]
    pub y: f64,
}

#[pymethods]
impl Vec2 {
    #[new]
    fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    fn __repr__(&self) -> String {
        format!("Vec2({:.4}, {:.4})", self.x, self.y)
    }

    fn magnitude(&self) -> f64 {
        CoreVec2::from(*self).magnitude()
    }

    fn to_tuple(&self) -> (f64, f64) {
        (self.x, self.y)
    }
}

impl From<CoreVec2> for Vec2 {
    fn from(v: CoreVec2) -> Self {
        Self { x: v.x, y: v.y }
    }
}

impl From<Vec2> for CoreVec2 {
    fn from(v: Vec2) -> Self {
        CoreVec2::new(v.x, v.y)
    }
}

/// Main simulation class.
///
/// Owns the particles and steps them frame by frame.
#[pyclass]
pub struct Simulation {
    inner: CoreSimulation,
    time_step: f64,
    last_collisions: usize,
}

#[pymethods]
impl Simulation {
    /// Create an empty simulation in a box of half-extents `width` x `height`.
    #[new]
    #[pyo3(signature = (width = 100.0, height = 100.0))]
    fn new(width: f64, height: f64) -> PyResult<Self> {
        let domain = Domain::new(width, height).map_err(physics_err)?;
        Ok(Self {
            inner: CoreSimulation::new(domain),
            time_step: ScenarioConfig::default().time_step(),
            last_collisions: 0,
        })
    }

    /// Build a simulation from `<directory>/<name>.yaml`.
    #[staticmethod]
    fn from_scenario(directory: &str, name: &str) -> PyResult<Self> {
        let config = ScenarioLoader::new(directory)
            .load(name)
            .map_err(scenario_err)?;
        let inner = config.build().map_err(scenario_err)?;
        Ok(Self {
            inner,
            time_step: config.time_step(),
            last_collisions: 0,
        })
    }

    /// Names of the scenarios available in `directory`.
    #[staticmethod]
    fn list_scenarios(directory: &str) -> PyResult<Vec<String>> {
        ScenarioLoader::new(directory).list().map_err(scenario_err)
    }

    /// Current simulation time in seconds.
    #[getter]
    fn time(&self) -> f64 {
        self.inner.time()
    }

    /// Frame interval configured by the scenario, in seconds.
    #[getter]
    fn time_step(&self) -> f64 {
        self.time_step
    }

    /// Number of completed frames.
    #[getter]
    fn frame(&self) -> u64 {
        self.inner.frame()
    }

    /// Pair collisions resolved during the last step.
    #[getter]
    fn last_collisions(&self) -> usize {
        self.last_collisions
    }

    fn __len__(&self) -> usize {
        self.inner.len()
    }

    /// Add a particle and return its id.
    ///
    /// Pass `mass=None` for an immovable particle.
    #[pyo3(signature = (x, y, radius, mass = Some(1.0), vx = 0.0, vy = 0.0, damping = 1.0))]
    fn add_particle(
        &mut self,
        x: f64,
        y: f64,
        radius: f64,
        mass: Option<f64>,
        vx: f64,
        vy: f64,
        damping: f64,
    ) -> PyResult<ParticleId> {
        let mass = match mass {
            Some(m) => Mass::finite(m).map_err(physics_err)?,
            None => Mass::Immovable,
        };
        self.inner
            .spawn_with(|id| {
                Particle::new(id, CoreVec2::new(x, y), radius, mass)?
                    .with_velocity(CoreVec2::new(vx, vy))
                    .with_damping(damping)
            })
            .map_err(physics_err)
    }

    /// Remove a particle by id.
    fn remove_particle(&mut self, id: ParticleId) -> PyResult<()> {
        self.inner.remove(id).map(|_| ()).map_err(physics_err)
    }

    /// Apply uniform gravity to every particle.
    #[pyo3(signature = (gx = 0.0, gy = -9.81))]
    fn add_gravity(&mut self, gx: f64, gy: f64) {
        self.inner
            .add_force(ForceTarget::All, Gravity::new(CoreVec2::new(gx, gy)));
    }

    /// Apply linear + quadratic drag to every particle.
    fn add_drag(&mut self, k1: f64, k2: f64) {
        self.inner.add_force(ForceTarget::All, Drag::new(k1, k2));
    }

    /// Push a force onto one particle for the next step only.
    fn apply_force(&mut self, id: ParticleId, fx: f64, fy: f64) -> PyResult<()> {
        self.inner
            .update_particle(id, |particle| particle.add_force(CoreVec2::new(fx, fy)))
            .map_err(physics_err)
    }

    /// Add a static line segment particles bounce off.
    #[pyo3(signature = (x0, y0, x1, y1, restitution = 1.0))]
    fn add_platform(&mut self, x0: f64, y0: f64, x1: f64, y1: f64, restitution: f64) {
        let platform = Platform::new(CoreVec2::new(x0, y0), CoreVec2::new(x1, y1))
            .with_restitution(restitution);
        self.inner.add_contact_generator(platform);
    }

    /// Box half-extents as (width, height).
    fn domain(&self) -> (f64, f64) {
        let domain = self.inner.domain();
        (domain.width, domain.height)
    }

    /// Change the box half-extents.
    fn set_domain(&mut self, width: f64, height: f64) -> PyResult<()> {
        let domain = Domain::new(width, height).map_err(physics_err)?;
        self.inner.set_domain(domain);
        Ok(())
    }

    /// Refit the box after the window was resized.
    fn resize_viewport(&mut self, pixel_width: u32, pixel_height: u32, range: f64) -> PyResult<()> {
        self.inner
            .resize_viewport(pixel_width, pixel_height, range)
            .map_err(physics_err)
    }

    fn position(&self, id: ParticleId) -> PyResult<Vec2> {
        self.inner
            .particle(id)
            .map(|p| p.position.into())
            .ok_or_else(|| physics_err(PhysicsError::UnknownParticle(id)))
    }

    fn velocity(&self, id: ParticleId) -> PyResult<Vec2> {
        self.inner
            .particle(id)
            .map(|p| p.velocity.into())
            .ok_or_else(|| physics_err(PhysicsError::UnknownParticle(id)))
    }

    /// (x, y, radius) of every particle in id order, ready for drawing.
    fn positions(&self) -> Vec<(f64, f64, f64)> {
        self.inner
            .particles()
            .iter()
            .map(|p| (p.position.x, p.position.y, p.radius()))
            .collect()
    }

    /// Total kinetic energy of the movable particles.
    fn kinetic_energy(&self) -> f64 {
        self.inner.kinetic_energy()
    }

    /// Advance the simulation by dt seconds.
    fn step(&mut self, dt: f64) -> PyResult<usize> {
        let report = self.inner.step(dt).map_err(physics_err)?;
        self.last_collisions = report.collisions;
        Ok(report.collisions)
    }

    /// Run multiple steps at once (more efficient).
    fn step_n(&mut self, dt: f64, steps: usize) -> PyResult<usize> {
        let report = self.inner.step_n(dt, steps).map_err(physics_err)?;
        self.last_collisions = report.collisions;
        Ok(report.collisions)
    }

    /// Get one particle's state as dict for easy inspection.
    fn particle_dict<'py>(&self, py: Python<'py>, id: ParticleId) -> PyResult<Bound<'py, PyDict>> {
        let particle = self
            .inner
            .particle(id)
            .ok_or_else(|| physics_err(PhysicsError::UnknownParticle(id)))?;

        let dict = PyDict::new(py);
        dict.set_item("id", particle.id())?;
        dict.set_item("x", particle.position.x)?;
        dict.set_item("y", particle.position.y)?;
        dict.set_item("vx", particle.velocity.x)?;
        dict.set_item("vy", particle.velocity.y)?;
        dict.set_item("radius", particle.radius())?;
        dict.set_item("mass", particle.mass().value())?;
        dict.set_item("damping", particle.damping())?;
        Ok(dict)
    }
}

/// Route the engine's `tracing` output to stderr.
///
/// `filter` uses `RUST_LOG` syntax, e.g. `"blob_core=debug"`. Calling it a
/// second time has no effect.
#[pyfunction]
#[pyo3(signature = (filter = "info"))]
fn init_logging(filter: &str) -> PyResult<()> {
    let filter = tracing_subscriber::EnvFilter::try_new(filter)
        .map_err(|e| PyValueError::new_err(e.to_string()))?;
    // An already installed subscriber is not an error for Python callers
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
    tracing::debug!("logging initialised");
    Ok(())
}

/// Python module definition.
#[pymodule]
fn blob_physics(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<Vec2>()?;
    m.add_class::<Simulation>()?;
    m.add_function(wrap_pyfunction!(init_logging, m)?)?;
    Ok(())
}
