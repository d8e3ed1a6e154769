//! Frame orchestration.
//!
//! [`Simulation`] owns every particle and advances them one frame at a time:
//!
//! ```text
//! step(dt)
//!  ├─ apply registered force generators
//!  ├─ integrate every particle
//!  ├─ boundary: reflect, clamp if outside
//!  ├─ pair pass: P in id order × Q in id order, first overlap wins
//!  ├─ contact generators: generate, resolve each contact once
//!  └─ clear collided-this-frame flags
//! ```
//!
//! A particle resolves at most one pair collision per frame. Once it has
//! collided it is skipped both as the scanning particle and as a partner,
//! so the partner it gets is the first overlapping one in ascending id
//! order, not the closest one.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::collision::{
    pair_mut, resolve_contacts, BoundaryHandler, CollisionDetector, CollisionResolver,
    ContactGenerator, ParticleContact,
};
use crate::error::{validate_time_step, PhysicsError};
use crate::forces::{ForceGenerator, ForceRegistry, ForceTarget};
use crate::particle::{Particle, ParticleId};
use crate::types::{Domain, Mass, Vec2};

/// Default cap on contacts produced by contact generators in one frame.
pub const DEFAULT_MAX_CONTACTS: usize = 256;

/// What happened during one call to [`Simulation::step`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepReport {
    /// Particle pairs whose velocities were exchanged.
    pub collisions: usize,
    /// Velocity components flipped by the box edges.
    pub reflections: usize,
    /// Particles moved back inside the box.
    pub clamps: usize,
    /// Generator contacts resolved.
    pub contacts: usize,
}

/// The particle simulation.
pub struct Simulation {
    /// Sorted by ascending id.
    particles: Vec<Particle>,
    domain: Domain,
    detector: CollisionDetector,
    forces: ForceRegistry,
    contact_generators: Vec<Box<dyn ContactGenerator>>,
    contacts: Vec<ParticleContact>,
    max_contacts: usize,
    time: f64,
    frame: u64,
}

impl Simulation {
    /// An empty simulation inside `domain`.
    pub fn new(domain: Domain) -> Self {
        Self {
            particles: Vec::new(),
            domain,
            detector: CollisionDetector::default(),
            forces: ForceRegistry::new(),
            contact_generators: Vec::new(),
            contacts: Vec::new(),
            max_contacts: DEFAULT_MAX_CONTACTS,
            time: 0.0,
            frame: 0,
        }
    }

    /// A simulation holding `particles`. Ids must be unique.
    pub fn with_particles(domain: Domain, particles: Vec<Particle>) -> Result<Self, PhysicsError> {
        let mut sim = Self::new(domain);
        for particle in particles {
            sim.insert(particle)?;
        }
        Ok(sim)
    }

    pub fn with_detector(mut self, detector: CollisionDetector) -> Self {
        self.detector = detector;
        self
    }

    // -------------------------------------------------------------------------
    // Particles
    // -------------------------------------------------------------------------

    /// Add a particle, keeping the collection ordered by id.
    ///
    /// The particle is validated again, since its public fields may have been
    /// set to non-finite values after construction.
    pub fn insert(&mut self, particle: Particle) -> Result<(), PhysicsError> {
        particle.validate()?;
        match self
            .particles
            .binary_search_by_key(&particle.id(), Particle::id)
        {
            Ok(_) => Err(PhysicsError::DuplicateId(particle.id())),
            Err(index) => {
                self.particles.insert(index, particle);
                Ok(())
            }
        }
    }

    /// Create a particle at rest with the next free id.
    pub fn spawn(&mut self, position: Vec2, radius: f64, mass: Mass) -> Result<ParticleId, PhysicsError> {
        self.spawn_with(|id| Particle::new(id, position, radius, mass))
    }

    /// Build a particle for the next free id and insert it. Nothing is
    /// inserted when `build` fails.
    pub fn spawn_with(
        &mut self,
        build: impl FnOnce(ParticleId) -> Result<Particle, PhysicsError>,
    ) -> Result<ParticleId, PhysicsError> {
        let id = self.next_id()?;
        let mut particle = build(id)?;
        particle.set_id(id);
        self.insert(particle)?;
        Ok(id)
    }

    /// One past the largest id in use.
    pub fn next_id(&self) -> Result<ParticleId, PhysicsError> {
        match self.particles.last() {
            Some(last) => last.id().checked_add(1).ok_or(PhysicsError::IdSpaceExhausted),
            None => Ok(0),
        }
    }

    /// Remove a particle along with any force registered only for it.
    pub fn remove(&mut self, id: ParticleId) -> Result<Particle, PhysicsError> {
        let index = self.index_of(id)?;
        self.forces.remove_target(id);
        Ok(self.particles.remove(index))
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn particle(&self, id: ParticleId) -> Option<&Particle> {
        self.index_of(id).ok().map(|i| &self.particles[i])
    }

    /// Run `f` on one particle in place.
    ///
    /// The slot keeps `id` even if `f` overwrites the whole particle, so the
    /// id ordering of the collection cannot be broken from outside.
    pub fn update_particle<R>(
        &mut self,
        id: ParticleId,
        f: impl FnOnce(&mut Particle) -> R,
    ) -> Result<R, PhysicsError> {
        let index = self.index_of(id)?;
        let particle = &mut self.particles[index];
        let result = f(particle);
        particle.set_id(id);
        Ok(result)
    }

    /// Run `f` on every particle in id order. Ids are restored after each call.
    pub fn update_particles(&mut self, mut f: impl FnMut(&mut Particle)) {
        for particle in &mut self.particles {
            let id = particle.id();
            f(particle);
            particle.set_id(id);
        }
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    fn index_of(&self, id: ParticleId) -> Result<usize, PhysicsError> {
        self.particles
            .binary_search_by_key(&id, Particle::id)
            .map_err(|_| PhysicsError::UnknownParticle(id))
    }

    // -------------------------------------------------------------------------
    // Environment
    // -------------------------------------------------------------------------

    pub fn domain(&self) -> Domain {
        self.domain
    }

    /// Change the box. Takes effect on the next step; particles left outside
    /// are clamped back in then.
    pub fn set_domain(&mut self, domain: Domain) {
        if domain != self.domain {
            info!(
                width = domain.width,
                height = domain.height,
                "simulation domain resized"
            );
        }
        self.domain = domain;
    }

    /// Refit the box to a new viewport size.
    pub fn resize_viewport(&mut self, pixel_width: u32, pixel_height: u32, range: f64) -> Result<(), PhysicsError> {
        let domain = Domain::fit_viewport(pixel_width, pixel_height, range)?;
        self.set_domain(domain);
        Ok(())
    }

    pub fn add_force(&mut self, target: ForceTarget, generator: impl ForceGenerator + 'static) {
        self.forces.add(target, Box::new(generator));
    }

    pub fn forces_mut(&mut self) -> &mut ForceRegistry {
        &mut self.forces
    }

    pub fn add_contact_generator(&mut self, generator: impl ContactGenerator + 'static) {
        self.contact_generators.push(Box::new(generator));
    }

    pub fn set_max_contacts(&mut self, max_contacts: usize) {
        self.max_contacts = max_contacts;
    }

    /// Simulated time in seconds.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Number of completed steps.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    // -------------------------------------------------------------------------
    // Stepping
    // -------------------------------------------------------------------------

    /// Advance the simulation by `dt` seconds.
    ///
    /// A non-positive or non-finite `dt` is rejected before anything moves.
    pub fn step(&mut self, dt: f64) -> Result<StepReport, PhysicsError> {
        validate_time_step(dt)?;

        let mut report = StepReport::default();

        self.forces.apply(&mut self.particles, dt);

        for particle in &mut self.particles {
            particle.integrate(dt)?;
        }

        for particle in &mut self.particles {
            let outcome = BoundaryHandler::resolve(particle, &self.domain);
            report.reflections += usize::from(outcome.reflected_x) + usize::from(outcome.reflected_y);
            report.clamps += usize::from(outcome.clamped);
        }

        report.collisions = self.collide_pairs();
        report.contacts = self.resolve_generated_contacts();

        for particle in &mut self.particles {
            particle.reset_collision_flag();
        }

        self.time += dt;
        self.frame += 1;

        if report.collisions > 0 || report.contacts > 0 {
            debug!(
                frame = self.frame,
                collisions = report.collisions,
                contacts = report.contacts,
                reflections = report.reflections,
                clamps = report.clamps,
                "frame stepped"
            );
        }

        Ok(report)
    }

    /// Run `steps` frames of `dt`, summing their reports.
    pub fn step_n(&mut self, dt: f64, steps: usize) -> Result<StepReport, PhysicsError> {
        let mut total = StepReport::default();
        for _ in 0..steps {
            let report = self.step(dt)?;
            total.collisions += report.collisions;
            total.reflections += report.reflections;
            total.clamps += report.clamps;
            total.contacts += report.contacts;
        }
        Ok(total)
    }

    /// The pair pass: every ordered pair in id order, one collision per
    /// particle per frame.
    fn collide_pairs(&mut self) -> usize {
        let count = self.particles.len();
        let mut collisions = 0;

        for i in 0..count {
            for j in 0..count {
                if i == j {
                    continue;
                }
                if self.particles[i].collided_this_frame() {
                    break;
                }

                let (p, q) = pair_mut(&mut self.particles, i, j);
                if let Some(pair) = self.detector.detect_and_separate(p, q) {
                    if CollisionResolver::resolve(p, q, pair.normal) {
                        collisions += 1;
                    }
                }
            }
        }

        collisions
    }

    fn resolve_generated_contacts(&mut self) -> usize {
        if self.contact_generators.is_empty() {
            return 0;
        }

        self.contacts.clear();
        for generator in &self.contact_generators {
            let remaining = self.max_contacts.saturating_sub(self.contacts.len());
            if remaining == 0 {
                break;
            }
            generator.add_contacts(&self.particles, &mut self.contacts, remaining);
        }

        resolve_contacts(&mut self.particles, &self.contacts)
    }

    // -------------------------------------------------------------------------
    // Diagnostics
    // -------------------------------------------------------------------------

    /// Sum of the momenta of all movable particles.
    pub fn total_momentum(&self) -> Vec2 {
        self.particles
            .iter()
            .fold(Vec2::ZERO, |acc, p| acc + p.momentum())
    }

    /// Sum of the kinetic energies of all movable particles.
    pub fn kinetic_energy(&self) -> f64 {
        self.particles.iter().map(Particle::kinetic_energy).sum()
    }
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("particles", &self.particles.len())
            .field("domain", &self.domain)
            .field("forces", &self.forces)
            .field("contact_generators", &self.contact_generators.len())
            .field("time", &self.time)
            .field("frame", &self.frame)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::Platform;
    use crate::forces::Gravity;

    fn ball(id: ParticleId, x: f64, y: f64, radius: f64, velocity: Vec2) -> Particle {
        Particle::new(id, Vec2::new(x, y), radius, Mass::Finite(1.0))
            .unwrap()
            .with_velocity(velocity)
    }

    fn big_domain() -> Domain {
        Domain::square(1000.0).unwrap()
    }

    #[test]
    fn test_head_on_collision_swaps_velocities() {
        // Touching after one tiny step: positions move by v*dt first
        let dt = 1e-6;
        let mut sim = Simulation::with_particles(
            big_domain(),
            vec![
                ball(0, -1.0, 0.0, 1.0, Vec2::new(5.0, 0.0)),
                ball(1, 1.0, 0.0, 1.0, Vec2::new(-5.0, 0.0)),
            ],
        )
        .unwrap();

        let report = sim.step(dt).unwrap();

        assert_eq!(report.collisions, 1);
        let a = sim.particle(0).unwrap();
        let b = sim.particle(1).unwrap();
        assert!((a.velocity.x + 5.0).abs() < 1e-9, "vA' = {:?}", a.velocity);
        assert!((b.velocity.x - 5.0).abs() < 1e-9, "vB' = {:?}", b.velocity);
        assert!((b.position - a.position).magnitude() >= 2.0 - 1e-9);
    }

    #[test]
    fn test_one_collision_per_particle_per_frame() {
        // Particle 1 overlaps both 0 and 2; only its first partner (0) counts
        let mut sim = Simulation::with_particles(
            big_domain(),
            vec![
                ball(0, -1.5, 0.0, 1.0, Vec2::new(1.0, 0.0)),
                ball(1, 0.0, 0.0, 1.0, Vec2::ZERO),
                ball(2, 1.5, 0.0, 1.0, Vec2::new(-1.0, 0.0)),
            ],
        )
        .unwrap();

        let report = sim.step(1e-6).unwrap();

        assert_eq!(report.collisions, 1, "Particle 1 must collide only once");
        let p2 = sim.particle(2).unwrap();
        assert!((p2.velocity.x + 1.0).abs() < 1e-9, "Particle 2 should be untouched this frame");

        // Flags are cleared at the end of the frame
        assert!(sim.particles().iter().all(|p| !p.collided_this_frame()));
    }

    #[test]
    fn test_second_frame_allows_new_collision() {
        // Frame 1: 0 hits 1 and hands over its velocity; 2 overlaps 1 but waits
        // Frame 2: 1 has moved away from 0 and now resolves against 2
        let mut sim = Simulation::with_particles(
            big_domain(),
            vec![
                ball(0, -1.5, 0.0, 1.0, Vec2::new(1.0, 0.0)),
                ball(1, 0.0, 0.0, 1.0, Vec2::ZERO),
                ball(2, 1.5, 0.0, 1.0, Vec2::ZERO),
            ],
        )
        .unwrap();

        let first = sim.step(0.1).unwrap();
        assert_eq!(first.collisions, 1);
        assert_eq!(sim.particle(2).unwrap().velocity, Vec2::ZERO);

        let second = sim.step(0.1).unwrap();
        assert_eq!(second.collisions, 1);
        let p2 = sim.particle(2).unwrap();
        assert!((p2.velocity.x - 1.0).abs() < 1e-9, "Particle 2 should now move: {:?}", p2.velocity);
    }

    #[test]
    fn test_step_rejects_invalid_dt() {
        let mut sim = Simulation::with_particles(
            big_domain(),
            vec![ball(0, 0.0, 0.0, 1.0, Vec2::new(1.0, 0.0))],
        )
        .unwrap();

        assert_eq!(sim.step(0.0), Err(PhysicsError::InvalidTimeStep(0.0)));
        assert!(sim.step(-1.0).is_err());
        assert_eq!(sim.frame(), 0);
        assert_eq!(sim.particle(0).unwrap().position, Vec2::ZERO);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let result = Simulation::with_particles(
            big_domain(),
            vec![
                ball(3, 0.0, 0.0, 1.0, Vec2::ZERO),
                ball(3, 10.0, 0.0, 1.0, Vec2::ZERO),
            ],
        );
        assert_eq!(result.err(), Some(PhysicsError::DuplicateId(3)));
    }

    #[test]
    fn test_particles_kept_in_id_order() {
        let mut sim = Simulation::new(big_domain());
        sim.insert(ball(5, 0.0, 0.0, 1.0, Vec2::ZERO)).unwrap();
        sim.insert(ball(1, 10.0, 0.0, 1.0, Vec2::ZERO)).unwrap();
        let spawned = sim.spawn(Vec2::new(20.0, 0.0), 1.0, Mass::Finite(2.0)).unwrap();

        let ids: Vec<_> = sim.particles().iter().map(Particle::id).collect();
        assert_eq!(ids, vec![1, 5, 6]);
        assert_eq!(spawned, 6);

        let removed = sim.remove(5).unwrap();
        assert_eq!(removed.id(), 5);
        assert_eq!(sim.remove(5).err(), Some(PhysicsError::UnknownParticle(5)));
    }

    #[test]
    fn test_spawn_fails_when_ids_run_out() {
        let mut sim = Simulation::new(big_domain());
        sim.insert(ball(u32::MAX, 0.0, 0.0, 1.0, Vec2::ZERO)).unwrap();

        assert_eq!(sim.next_id(), Err(PhysicsError::IdSpaceExhausted));
        assert_eq!(
            sim.spawn(Vec2::new(10.0, 0.0), 1.0, Mass::Finite(1.0)),
            Err(PhysicsError::IdSpaceExhausted)
        );
        assert_eq!(sim.len(), 1);
    }

    #[test]
    fn test_failed_spawn_leaves_simulation_unchanged() {
        let mut sim = Simulation::new(big_domain());
        sim.spawn(Vec2::ZERO, 1.0, Mass::Finite(1.0)).unwrap();

        let result = sim.spawn_with(|id| {
            Particle::new(id, Vec2::new(5.0, 0.0), 1.0, Mass::Finite(1.0))?
                .with_velocity(Vec2::new(1.0, 0.0))
                .with_damping(2.0)
        });

        assert_eq!(result, Err(PhysicsError::InvalidDamping(2.0)));
        assert_eq!(sim.len(), 1);
        assert!(sim.particle(1).is_none());

        let id = sim
            .spawn_with(|id| Particle::new(id, Vec2::new(5.0, 0.0), 1.0, Mass::Finite(1.0))?.with_damping(0.5))
            .unwrap();
        assert_eq!(id, 1);
        assert_eq!(sim.particle(1).unwrap().damping(), 0.5);
    }

    #[test]
    fn test_insert_rejects_invalid_particles() {
        let mut sim = Simulation::new(big_domain());

        let mut runaway = ball(0, 0.0, 0.0, 1.0, Vec2::ZERO);
        runaway.velocity = Vec2::new(f64::NAN, 0.0);
        assert_eq!(sim.insert(runaway), Err(PhysicsError::NonFiniteState(0)));

        let yaml = "id: 1\nposition: {x: 0.0, y: 0.0}\nmass: !Finite -1.0\nradius: 1.0\n";
        assert!(serde_yaml::from_str::<Particle>(yaml).is_err());
        assert!(sim.is_empty());
    }

    #[test]
    fn test_update_particle_keeps_id_order() {
        let mut sim = Simulation::with_particles(
            big_domain(),
            vec![
                ball(0, -10.0, 0.0, 1.0, Vec2::ZERO),
                ball(1, 0.0, 0.0, 1.0, Vec2::ZERO),
                ball(2, 10.0, 0.0, 1.0, Vec2::ZERO),
            ],
        )
        .unwrap();

        // Overwriting the whole particle keeps the slot's id
        sim.update_particle(0, |p| *p = ball(7, 50.0, 0.0, 2.0, Vec2::new(1.0, 0.0)))
            .unwrap();

        let ids: Vec<_> = sim.particles().iter().map(Particle::id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert!(sim.particle(7).is_none());
        let p = sim.particle(0).unwrap();
        assert_eq!(p.position, Vec2::new(50.0, 0.0));
        assert_eq!(p.radius(), 2.0);

        sim.update_particles(|p| p.velocity = Vec2::new(0.0, 3.0));
        assert!(sim.particles().iter().all(|p| p.velocity == Vec2::new(0.0, 3.0)));
        assert!(sim.particle(2).is_some());

        assert_eq!(
            sim.update_particle(9, |_| ()),
            Err(PhysicsError::UnknownParticle(9))
        );
    }

    #[test]
    fn test_bounce_off_wall_during_step() {
        let mut sim = Simulation::with_particles(
            Domain::new(100.0, 100.0).unwrap(),
            vec![Particle::new(0, Vec2::new(97.0, 0.0), 2.0, Mass::Finite(1.0))
                .unwrap()
                .with_velocity(Vec2::new(3.0, 0.0))],
        )
        .unwrap();

        let report = sim.step(1.0).unwrap();

        let p = sim.particle(0).unwrap();
        assert_eq!(report.reflections, 1);
        assert_eq!(report.clamps, 1);
        assert!((p.position.x - 98.0).abs() < 1e-10);
        assert!((p.velocity.x + 3.0).abs() < 1e-10);
    }

    #[test]
    fn test_shrinking_domain_keeps_particles_inside() {
        let mut sim = Simulation::with_particles(
            Domain::square(100.0).unwrap(),
            vec![ball(0, 90.0, -90.0, 1.0, Vec2::ZERO)],
        )
        .unwrap();

        sim.resize_viewport(400, 400, 50.0).unwrap();
        sim.step(0.01).unwrap();

        let p = sim.particle(0).unwrap();
        assert_eq!(p.position, Vec2::new(49.0, -49.0));
    }

    #[test]
    fn test_momentum_conserved_without_walls_or_gravity() {
        let mut sim = Simulation::with_particles(
            big_domain(),
            vec![
                Particle::new(0, Vec2::new(-3.0, 0.2), 1.0, Mass::Finite(2.0))
                    .unwrap()
                    .with_velocity(Vec2::new(4.0, 0.0)),
                Particle::new(1, Vec2::new(3.0, -0.2), 1.5, Mass::Finite(5.0))
                    .unwrap()
                    .with_velocity(Vec2::new(-2.0, 0.5)),
            ],
        )
        .unwrap();

        let before = sim.total_momentum();
        let energy_before = sim.kinetic_energy();
        let report = sim.step_n(0.01, 200).unwrap();
        let after = sim.total_momentum();

        assert!(report.collisions >= 1, "Particles should have met");
        assert!((before - after).magnitude() < 1e-9, "{:?} -> {:?}", before, after);
        assert!((sim.kinetic_energy() - energy_before).abs() < 1e-9);
    }

    #[test]
    fn test_gravity_force_generator() {
        let mut sim = Simulation::with_particles(
            big_domain(),
            vec![ball(0, 0.0, 0.0, 1.0, Vec2::ZERO)],
        )
        .unwrap();
        sim.add_force(ForceTarget::All, Gravity::default());

        sim.step(1.0).unwrap();

        let p = sim.particle(0).unwrap();
        assert!((p.velocity.y + 9.81).abs() < 1e-10);
        assert_eq!(p.accumulated_force(), Vec2::ZERO);
    }

    #[test]
    fn test_platform_contact_generator() {
        let mut sim = Simulation::with_particles(
            big_domain(),
            vec![ball(0, 0.0, 1.5, 1.0, Vec2::new(0.0, -100.0))],
        )
        .unwrap();
        sim.add_contact_generator(Platform::new(Vec2::new(-10.0, 0.0), Vec2::new(10.0, 0.0)));

        // Moves to y = 0.5, overlapping the platform
        let report = sim.step(0.01).unwrap();

        assert_eq!(report.contacts, 1);
        let p = sim.particle(0).unwrap();
        assert!(p.velocity.y > 0.0, "Particle should bounce up: {:?}", p.velocity);
        assert!((p.position.y - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_immovable_obstacle() {
        let mut sim = Simulation::with_particles(
            big_domain(),
            vec![
                ball(0, -1.9, 0.0, 1.0, Vec2::new(2.0, 0.0)),
                Particle::new(1, Vec2::ZERO, 1.0, Mass::Immovable).unwrap(),
            ],
        )
        .unwrap();

        sim.step(0.1).unwrap();

        let wall = sim.particle(1).unwrap();
        let p = sim.particle(0).unwrap();
        assert_eq!(wall.position, Vec2::ZERO);
        assert!((p.velocity.x + 2.0).abs() < 1e-10);
        assert!((p.position.x + 2.0).abs() < 1e-10);
    }
}
