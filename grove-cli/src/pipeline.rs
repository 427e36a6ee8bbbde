//! End-to-end pipeline driver: envelope sampling, skeleton growth and
//! post-processing, a wind-sway preview, and per-branch fuzzy clouds.
//!
//! This module owns the RNG and calls the `grove_core` phases in order,
//! the same loop an interactive front-end would run incrementally.

use glam::Vec3;
use grove_core::{
    attractor::AttractorField,
    config::{EnvelopeConfig, FuzzyConfig, GrowthConfig, WindConfig},
    envelope::Envelope,
    error::GroveError,
    grove::Grove,
    phases,
    wind::{self, WindContext},
};
use log::info;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::fmt;

/// Everything one pipeline run needs.
///
/// ### Fields
/// - `seed` - RNG seed; runs with equal parameters are reproducible.
/// - `attraction_points` - Number of points sampled inside the envelope.
/// - `max_rounds` - Growth round budget; `None` runs unbounded.
/// - `fuzzy` - Particle engine configuration (the default here caps the
///   per-branch particle count well below the engine default to keep a
///   full-tree run quick).
/// - `wind_preview_steps` - Frames of wind sway applied to the finished
///   skeleton before the clouds are built.
pub struct PipelineParams {
    pub seed: u64,
    pub attraction_points: usize,
    pub envelope: EnvelopeConfig,
    pub growth: GrowthConfig,
    pub fuzzy: FuzzyConfig,
    pub wind: WindConfig,
    pub max_rounds: Option<usize>,
    pub wind_preview_steps: usize,
}

impl Default for PipelineParams {
    fn default() -> Self {
        Self {
            seed: 7,
            attraction_points: 50,
            envelope: EnvelopeConfig::default(),
            growth: GrowthConfig::default(),
            fuzzy: FuzzyConfig {
                particle_limit: 200,
                ..FuzzyConfig::default()
            },
            wind: WindConfig::default(),
            max_rounds: Some(1000),
            wind_preview_steps: 10,
        }
    }
}

/// Statistics of one completed run.
pub struct Summary {
    pub rounds: usize,
    pub branches: usize,
    pub leaves: usize,
    pub merged: usize,
    pub particles: usize,
    pub world_points: usize,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "growth rounds:   {}", self.rounds)?;
        writeln!(f, "branches:        {}", self.branches)?;
        writeln!(f, "leaves:          {}", self.leaves)?;
        writeln!(f, "siblings merged: {}", self.merged)?;
        writeln!(f, "particles:       {}", self.particles)?;
        write!(f, "baked points:    {}", self.world_points)
    }
}

/// Runs the full pipeline once.
///
/// ### Returns
/// The run statistics, or the sampling/growth budget error.
pub fn run(params: PipelineParams) -> Result<Summary, GroveError> {
    let mut rng = StdRng::seed_from_u64(params.seed);

    // Envelope and attraction points.
    let envelope = Envelope::parabolic(&params.envelope);
    let points = envelope.sample_points(params.attraction_points, &mut rng)?;
    info!("sampled {} attraction points", points.len());
    let mut field = AttractorField::from_positions(points);

    // Skeleton growth and post-processing.
    let mut tree = phases::seed_tree(Vec3::ZERO, &params.growth, &mut rng);
    let rounds = phases::grow_to_completion(
        &mut tree,
        &mut field,
        &params.growth,
        &mut rng,
        params.max_rounds,
    )?;
    let merged = phases::simplify_phase(&mut tree, &params.growth);
    phases::width_phase(&mut tree, &params.growth);

    let branches = tree.reachable().len();
    let leaves = tree.leaf_count();
    info!("skeleton: {branches} branches, {leaves} leaves after {rounds} rounds");

    // A few frames of sway, to exercise the finished skeleton.
    let mut ctx = WindContext::default();
    for _ in 0..params.wind_preview_steps {
        wind::apply_wind(&mut tree, &params.wind, &ctx);
        ctx.advance(0.016);
    }

    // Per-branch fuzzy clouds and the world-space bake.
    let grove = Grove::build(tree, params.fuzzy, &mut rng);
    let world_points = grove.bake_world_points();

    Ok(Summary {
        rounds,
        branches,
        leaves,
        merged,
        particles: grove.particle_count(),
        world_points: world_points.len(),
    })
}
