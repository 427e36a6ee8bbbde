use glam::Vec3;

/// Discretization of the growth envelope (layers stacked in height, each a
/// ring of boundary samples at fixed angular steps).
#[derive(Clone, Copy, Debug)]
pub struct EnvelopeConfig {
    /// Height of the envelope base above the tree origin (top of the trunk).
    pub base_height: f32,
    /// Vertical extent of the envelope above its base.
    pub height: f32,
    /// Number of horizontal layers sampled across `height`.
    pub layers: usize,
    /// Number of angular boundary samples per layer ring.
    pub angular_steps: usize,
    /// Peak radius handed to the default profile.
    pub max_radius: f32,
    /// Rejection-sampling attempt budget per requested point.
    pub attempts_per_point: usize,
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self {
            base_height: 4.0,
            height: 4.0,
            layers: 8,
            angular_steps: 16,
            max_radius: 3.0,
            attempts_per_point: 1000,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct GrowthConfig {
    /// Max distance at which an attraction point can pull on a branch tip.
    pub radius_of_influence: f32,
    /// Distance at which an attraction point is consumed by a nearby tip.
    pub kill_distance: f32,
    /// Length of every grown branch segment.
    pub segment_length: f32,
    /// Trunk height; the root segment is `max(trunk_height, segment_length)`
    /// long.
    pub trunk_height: f32,
    /// Constant downward bias added to every growth direction.
    pub gravity_bias: Vec3,
    /// Sibling directions closer than this angle (radians) merge during
    /// simplification.
    pub merge_angle: f32,
    /// Base width assigned to every leaf branch.
    pub min_branch_width: f32,
    /// Top width assigned to every leaf branch.
    pub tip_width: f32,
}

impl Default for GrowthConfig {
    fn default() -> Self {
        Self {
            radius_of_influence: 4.0,
            kill_distance: 1.2,
            segment_length: 1.0,
            trunk_height: 4.0,
            gravity_bias: Vec3::new(0.0, -0.2, 0.0),
            merge_angle: 5.0_f32.to_radians(),
            min_branch_width: 0.06,
            tip_width: 0.03,
        }
    }
}

/// Tuning constants for the particle relaxation engine.
///
/// See [`FuzzyConfig::example_model`] for the hand-tuned conversion
/// preset.
#[derive(Clone, Copy, Debug)]
pub struct FuzzyConfig {
    /// Hard cap on the particle count.
    pub particle_limit: usize,
    /// The all-in-collision stopping test only applies above this count.
    pub min_particle_count: usize,
    /// Extra relaxation updates run to confirm the stopping criterion.
    pub stability_updates: usize,
    /// Per-component velocity bound; also scales spawn velocities.
    pub vel_range: f32,
    /// Particle radius.
    pub radius: f32,
    /// Distance from the facing-triangle intersection at which boundary
    /// reflection kicks in.
    pub boundary_radius: f32,
    /// Particle mass dividing accumulated acceleration.
    pub mass: f32,
    /// Per-axis spawn jitter around the spawn point.
    pub spawn_offset: f32,
    /// Lennard-Jones well depth (epsilon).
    pub strength: f32,
    /// Lennard-Jones length scale (sigma).
    pub length_scale: f32,
    /// Pair interaction cutoff; `2^(1/6) * length_scale` puts it at the
    /// potential minimum.
    pub effect_range: f32,
    /// Velocity multiplier applied to both members of every in-range pair.
    pub particle_collision_friction: f32,
    /// Velocity multiplier applied on boundary reflection.
    pub mesh_collision_friction: f32,
}

impl Default for FuzzyConfig {
    fn default() -> Self {
        let length_scale = 0.35;
        Self {
            particle_limit: 3000,
            min_particle_count: 10,
            stability_updates: 10,
            vel_range: 0.03,
            radius: 0.2,
            boundary_radius: 0.25,
            mass: 100.0,
            spawn_offset: 0.05,
            strength: 0.005,
            length_scale,
            effect_range: 2.0_f32.powf(1.0 / 6.0) * length_scale,
            particle_collision_friction: 0.995,
            mesh_collision_friction: 0.995,
        }
    }
}

impl FuzzyConfig {
    /// Hand-tuned values for converting models quickly and fairly accurately.
    pub fn example_model() -> Self {
        let length_scale = 0.32;
        Self {
            stability_updates: 10,
            vel_range: 0.03,
            radius: 0.2,
            boundary_radius: 0.23,
            spawn_offset: 0.05,
            strength: 0.005,
            length_scale,
            effect_range: 2.0_f32.powf(1.0 / 6.0) * length_scale,
            ..Self::default()
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct WindConfig {
    /// Wind force; only the x and z components bend branches.
    pub force: Vec3,
    /// Material stiffness factor in the spring constant.
    pub elasticity: f32,
    /// Accumulated rotation (radians) past which the sway direction flips.
    pub clamp_angle: f32,
}

impl Default for WindConfig {
    fn default() -> Self {
        Self {
            force: Vec3::new(20.0, 0.0, 20.0),
            elasticity: 1.0e5,
            clamp_angle: 0.5,
        }
    }
}
