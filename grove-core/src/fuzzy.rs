//! Particle relaxation engine: grows and relaxes a particle swarm inside a
//! closed triangle mesh until the swarm approximates the mesh's interior
//! boundary (a "fuzzy" representation of the solid).
//!
//! The engine is step-driven. Each build step either spawns one particle
//! and relaxes the swarm once (growing phase), or relaxes toward rest
//! (stabilizing phase). Relaxation combines a Lennard-Jones-style pairwise
//! potential with ray-cast boundary collisions against the mesh.
//!
//! The mesh is consumed through [`CollisionMesh`] and passed per call; the
//! engine never owns it.

use crate::{config::FuzzyConfig, mesh::CollisionMesh};
use glam::Vec3;
use log::debug;
use rand::Rng;

/// Sentinel for "no facing triangle was found"; consumed by the
/// boundary-exit check, which culls particles carrying it.
const NO_INTERSECTION: Vec3 = Vec3::MAX;

/// Pairs closer than this are skipped to avoid division blow-up.
const MIN_PAIR_DISTANCE: f32 = 1e-3;

#[derive(Clone, Copy, Debug)]
pub struct Particle {
    pub pos: Vec3,
    pub vel: Vec3,
    pub acc: Vec3,
    /// Internal sequence id; particles have no other persistent identity.
    pub id: u64,
    /// Index of the cached facing triangle.
    pub triangle_index: usize,
    /// Cached intersection point on the facing triangle, found along the
    /// particle's own velocity; [`NO_INTERSECTION`] if none was found.
    pub triangle_intersection: Vec3,
    pub in_collision: bool,
}

/// Lifecycle of one relaxation run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuildPhase {
    Empty,
    Growing,
    Stabilizing,
    Built,
}

/// A particle swarm conforming to one mesh.
#[derive(Debug)]
pub struct FuzzyObject {
    cfg: FuzzyConfig,
    /// Where new particles are spawned (jittered by the spawn offset).
    pub spawn_point: Vec3,
    particles: Vec<Particle>,
    next_id: u64,
    phase: BuildPhase,
    /// Particles flagged in-collision by the last relaxation update.
    collision_count: usize,
}

impl FuzzyObject {
    pub fn new(cfg: FuzzyConfig, spawn_point: Vec3) -> Self {
        Self {
            cfg,
            spawn_point,
            particles: Vec::new(),
            next_id: 0,
            phase: BuildPhase::Empty,
            collision_count: 0,
        }
    }

    pub fn config(&self) -> &FuzzyConfig {
        &self.cfg
    }

    pub fn phase(&self) -> BuildPhase {
        self.phase
    }

    pub fn finished_building(&self) -> bool {
        self.phase == BuildPhase::Built
    }

    pub fn particle_count(&self) -> usize {
        self.particles.len()
    }

    /// The complete swarm as a list of positions.
    pub fn get_system(&self) -> Vec<Vec3> {
        self.particles.iter().map(|p| p.pos).collect()
    }

    pub fn clear_particles(&mut self) {
        self.particles.clear();
        self.collision_count = 0;
    }

    /// Linearly rescales the particle and boundary radii and the spawn
    /// offset, and (sub-linearly, capped) the potential length scale and
    /// effect range, so denser packing can be requested for thinner
    /// branches without re-deriving constants.
    pub fn scale_density(&mut self, factor: f32) {
        self.cfg.radius *= factor;
        self.cfg.boundary_radius *= factor;
        self.cfg.spawn_offset *= factor;
        self.cfg.length_scale = self
            .cfg
            .length_scale
            .min(self.cfg.length_scale * (factor * 1.5).max(1.0));
        self.cfg.effect_range = 2.0_f32.powf(1.0 / 6.0) * self.cfg.length_scale;
    }

    /// Runs build steps until the swarm reaches [`BuildPhase::Built`].
    pub fn build(&mut self, mesh: &impl CollisionMesh, rng: &mut impl Rng) {
        while self.phase != BuildPhase::Built {
            self.build_step(mesh, rng);
        }
    }

    /// Advances the build state machine by one step.
    ///
    /// Growing: spawn one particle and relax once, until the stopping
    /// criterion holds. Stabilizing: relax until the at-rest predicate
    /// holds. Built: no-op.
    pub fn build_step(&mut self, mesh: &impl CollisionMesh, rng: &mut impl Rng) {
        match self.phase {
            BuildPhase::Empty | BuildPhase::Growing => {
                self.phase = BuildPhase::Growing;
                if self.stopping_criteria(mesh) {
                    debug!(
                        "fuzzy growth finished with {} particles",
                        self.particles.len()
                    );
                    self.phase = BuildPhase::Stabilizing;
                } else {
                    self.add_particle(mesh, rng);
                    self.relax_update(mesh);
                }
            }
            BuildPhase::Stabilizing => {
                if self.system_at_rest() {
                    self.phase = BuildPhase::Built;
                } else {
                    self.relax_update(mesh);
                }
            }
            BuildPhase::Built => {}
        }
    }

    /// Determines when the growing phase has produced a full swarm.
    ///
    /// True once the particle limit is reached, or once every particle is
    /// in collision with its facing triangle (above a minimum floor) and
    /// the condition survives a burst of extra stability updates.
    fn stopping_criteria(&mut self, mesh: &impl CollisionMesh) -> bool {
        if self.particles.len() >= self.cfg.particle_limit {
            return true;
        }

        if self.all_in_collision() {
            // Confirm: the swarm may still be in flight.
            for _ in 0..self.cfg.stability_updates {
                self.relax_update(mesh);
            }
            if self.all_in_collision() {
                return true;
            }
        }
        false
    }

    fn all_in_collision(&self) -> bool {
        self.collision_count == self.particles.len()
            && self.particles.len() > self.cfg.min_particle_count
    }

    /// At-rest predicate for the stabilizing phase.
    ///
    /// The swarm is treated as at rest as soon as growth stops; kept as a
    /// separate hook so a stricter test can be substituted.
    fn system_at_rest(&self) -> bool {
        true
    }

    /// Spawns one particle near the spawn point with a random velocity.
    fn add_particle(&mut self, mesh: &impl CollisionMesh, rng: &mut impl Rng) {
        if self.particles.len() >= self.cfg.particle_limit {
            return;
        }

        let o = self.cfg.spawn_offset;
        let pos = self.spawn_point
            + Vec3::new(
                rng.random_range(-o..=o),
                rng.random_range(-o..=o),
                rng.random_range(-o..=o),
            );
        let vel = Vec3::new(
            rng.random_range(-1.0..=1.0),
            rng.random_range(-1.0..=1.0),
            rng.random_range(-1.0..=1.0),
        ) * self.cfg.vel_range;

        self.particles.push(Particle {
            pos,
            vel,
            acc: Vec3::ZERO,
            id: self.next_id,
            triangle_index: 0,
            triangle_intersection: NO_INTERSECTION,
            in_collision: false,
        });
        self.next_id += 1;

        let index = self.particles.len() - 1;
        self.update_facing_triangle(index, mesh);
    }

    /// One relaxation update over the whole swarm.
    ///
    /// Resets per-particle state, culls particles that left the mesh,
    /// applies pairwise and boundary forces, integrates, re-faces, and
    /// recounts collisions.
    pub fn relax_update(&mut self, mesh: &impl CollisionMesh) {
        self.collision_count = 0;

        // Reset accumulators and find particles that crossed the boundary:
        // the projection of the cached intersection offset onto the outward
        // normal goes negative outside the mesh, and is unusable for the
        // no-intersection sentinel.
        let mut doomed = vec![false; self.particles.len()];
        for (i, p) in self.particles.iter_mut().enumerate() {
            p.acc = Vec3::ZERO;
            p.in_collision = false;

            if p.triangle_intersection == NO_INTERSECTION {
                doomed[i] = true;
                continue;
            }
            let d = (p.triangle_intersection - p.pos).dot(mesh.surface_normal(p.triangle_index));
            if !(d >= 0.0 && d < f32::MAX) {
                doomed[i] = true;
            }
        }
        if doomed.iter().any(|&dead| dead) {
            let mut i = 0;
            self.particles.retain(|_| {
                let keep = !doomed[i];
                i += 1;
                keep
            });
        }

        self.apply_particle_forces();
        self.apply_boundary_forces(mesh);

        // Integrate, re-face, recount.
        for i in 0..self.particles.len() {
            let cfg = self.cfg;
            {
                let p = &mut self.particles[i];
                p.acc /= cfg.mass;
                p.vel = (p.vel + p.acc).clamp(
                    Vec3::splat(-cfg.vel_range),
                    Vec3::splat(cfg.vel_range),
                );
                p.pos += p.vel;
            }

            // A particle that accelerated has potentially changed
            // direction. The facing triangle is only recomputed when the
            // acceleration is non-zero on all three axes simultaneously;
            // relax to an any-axis test here if that ever needs revisiting.
            let acc = self.particles[i].acc;
            if acc.x != 0.0 && acc.y != 0.0 && acc.z != 0.0 {
                self.update_facing_triangle(i, mesh);
            }

            if self.particles[i].in_collision {
                self.collision_count += 1;
            }
        }
    }

    /// Applies the Lennard-Jones pair force and pair friction.
    ///
    /// Friction multiplies both velocities once per in-range pair, so a
    /// particle with many neighbors is damped several times in one step;
    /// the compounding is load-bearing for stability.
    fn apply_particle_forces(&mut self) {
        let effect2 = self.cfg.effect_range * self.cfg.effect_range;

        for i in 0..self.particles.len() {
            for j in (i + 1)..self.particles.len() {
                let delta = self.particles[i].pos - self.particles[j].pos;
                let d2 = delta.length_squared();
                if d2 >= effect2 {
                    continue;
                }

                let dist = d2.sqrt();
                if dist < MIN_PAIR_DISTANCE {
                    continue;
                }

                let force = self.force_at_distance(dist, delta);
                self.particles[i].acc += force;
                self.particles[j].acc -= force;

                self.particles[i].vel *= self.cfg.particle_collision_friction;
                self.particles[j].vel *= self.cfg.particle_collision_friction;

                self.particles[i].in_collision = true;
                self.particles[j].in_collision = true;
            }
        }
    }

    /// Bounces particles off the mesh surface.
    ///
    /// A particle within the boundary radius of its cached intersection
    /// point has its velocity reflected about the inward triangle normal
    /// and its acceleration zeroed for this step (boundary reflection
    /// overrides the pairwise forces), then re-faces immediately since it
    /// now travels the opposite way.
    fn apply_boundary_forces(&mut self, mesh: &impl CollisionMesh) {
        let boundary2 = self.cfg.boundary_radius * self.cfg.boundary_radius;

        for i in 0..self.particles.len() {
            let p = self.particles[i];
            if p.triangle_intersection == NO_INTERSECTION {
                continue;
            }
            if (p.pos - p.triangle_intersection).length_squared() < boundary2 {
                let inward = -mesh.surface_normal(p.triangle_index);
                self.particles[i].vel =
                    p.vel.reflect(inward) * self.cfg.mesh_collision_friction;
                self.particles[i].acc = Vec3::ZERO;
                self.update_facing_triangle(i, mesh);
            }
        }
    }

    /// The Lennard-Jones-style radial force for one pair.
    ///
    /// Zero at the effect range (the potential minimum), strictly
    /// repulsive below it.
    fn force_at_distance(&self, dist: f32, delta: Vec3) -> Vec3 {
        let sigma = self.cfg.length_scale;
        let a = 48.0 * self.cfg.strength / (sigma * sigma);
        let b = (sigma / dist).powi(14);
        let c = 0.5 * (sigma / dist).powi(8);
        a * (b - c) * delta
    }

    /// Recomputes the triangle one particle is facing.
    ///
    /// Scans every triangle with the particle's current velocity as the
    /// ray direction and keeps the closest intersection. A particle that
    /// hits nothing receives the [`NO_INTERSECTION`] sentinel and is still
    /// flagged in-collision; the boundary-exit check culls it on the next
    /// update.
    fn update_facing_triangle(&mut self, index: usize, mesh: &impl CollisionMesh) {
        let origin = self.particles[index].pos;
        let dir = self.particles[index].vel;

        let mut closest = NO_INTERSECTION;
        let mut shortest2 = f32::MAX;
        let mut triangle_index = 0;

        for tri in 0..mesh.triangle_count() {
            if let Some(hit) = mesh.ray_intersects_triangle(origin, dir, tri) {
                let d2 = (hit - origin).length_squared();
                if d2 < shortest2 {
                    closest = hit;
                    shortest2 = d2;
                    triangle_index = tri;
                }
            }
        }

        let p = &mut self.particles[index];
        p.triangle_intersection = closest;
        p.triangle_index = triangle_index;
        p.in_collision = true;
    }
}
