//! Procedural tree synthesis and fuzzy particle-cloud generation.
//!
//! A space-colonization growth engine turns a cloud of attraction points
//! inside a height/angle envelope into a branching skeleton with widths; a
//! particle relaxation engine then fills each branch's solid geometry with
//! a mesh-conforming particle swarm.
//!
//! Main components:
//! - [`envelope`] — the allowed growth region and attraction-point sampling.
//! - [`attractor`] — the live attraction point working set.
//! - [`tree`] — branch arena and structural queries.
//! - [`influence_buffer`] — temporary buffers for accumulated influences.
//! - [`phases`] — growth rounds and skeleton post-processing.
//! - [`mesh`] — triangle meshes, collision queries and branch geometry.
//! - [`fuzzy`] — the particle relaxation engine.
//! - [`wind`] — cosmetic per-frame wind sway.
//! - [`grove`] — per-branch clouds and the world-space bake.
//! - [`config`] — configuration for every engine.
//! - [`error`] — configuration-failure errors.
//! - [`types`] — shared type aliases and IDs.

pub mod attractor;
pub mod config;
pub mod envelope;
pub mod error;
pub mod fuzzy;
pub mod grove;
pub mod influence_buffer;
pub mod mesh;
pub mod phases;
pub mod tree;
pub mod types;
pub mod wind;
