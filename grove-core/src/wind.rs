//! Wind sway: per-frame angular displacement of each branch from a
//! spring/pressure analogy. Purely cosmetic; the only persistent state is
//! the caller-owned [`WindContext`] clock and each branch's sway sign.

use crate::{config::WindConfig, tree::Tree};
use glam::{EulerRot, Quat, Vec3};

/// Guard against zero-length or zero-thickness spring denominators.
const SPRING_EPSILON: f32 = 1e-5;

/// Explicit simulation clock threaded through per-frame wind updates.
///
/// Owned and advanced by the caller; the wind model itself holds no
/// process-wide time.
#[derive(Clone, Copy, Debug, Default)]
pub struct WindContext {
    pub time: f32,
}

impl WindContext {
    pub fn advance(&mut self, dt: f32) {
        self.time += dt;
    }
}

/// Oscillating wind pressure on one branch.
///
/// The per-axis wind force is modulated by a sinusoid keyed to the global
/// clock plus the branch's fixed random phase, and damped for branches
/// aligned with the wind (an aligned branch presents less surface).
fn pressure(force: f32, alignment: f32, offset: f32, ctx: &WindContext) -> f32 {
    let a = 1.0 - 0.5 * alignment;
    force * (1.0 + a * (ctx.time + offset).sin())
}

/// Spring constant from branch thickness and length.
///
/// `k = elasticity * base * (base - top)^2 / (4 * length^3)`, with epsilon
/// floors on the thickness, length and result so unset widths or
/// zero-length stubs bend fully instead of dividing by zero.
fn spring_constant(base: f32, top: f32, length: f32, elasticity: f32) -> f32 {
    let thickness = (base - top).max(SPRING_EPSILON);
    let length = length.max(SPRING_EPSILON);
    let k = elasticity * base * thickness.powi(2) / (4.0 * length.powi(3));
    k.max(SPRING_EPSILON)
}

/// Angle of deflection for one axis: displacement through the spring,
/// clamped into the arcsine domain.
fn sway_angle(force: f32, alignment: f32, offset: f32, k: f32, ctx: &WindContext) -> f32 {
    let displacement = pressure(force, alignment, offset, ctx) / k;
    displacement.clamp(-1.0, 1.0).asin()
}

/// Applies one frame of wind sway to the whole tree, root-down.
///
/// Each branch's `rotation` is recomputed from the wind pressure and its
/// spring constant; `combined_rotation` accumulates down the chain from
/// the root, and whenever it exceeds the clamp angle the branch's sway
/// sign flips, producing a self-limiting oscillation rather than unbounded
/// winding. `world_dir` is the branch direction rotated by the
/// accumulated sway.
pub fn apply_wind(tree: &mut Tree, cfg: &WindConfig, ctx: &WindContext) {
    let wind_axis = cfg.force.normalize_or_zero();

    let mut stack = vec![(tree.root(), Vec3::ZERO)];
    while let Some((id, parent_rot)) = stack.pop() {
        let b = &mut tree.branches[id];

        let alignment = b.world_dir.dot(wind_axis).abs();
        let k = spring_constant(b.base_width, b.top_width, b.length, cfg.elasticity);

        let mut angle = Vec3::new(
            sway_angle(cfg.force.x, alignment, b.offset, k, ctx),
            0.0,
            sway_angle(cfg.force.z, alignment, b.offset, k, ctx),
        ) * b.sway_sign;

        let accumulated = parent_rot + angle;
        if accumulated.x.abs() > cfg.clamp_angle || accumulated.z.abs() > cfg.clamp_angle {
            b.sway_sign = -b.sway_sign;
            angle = -angle;
        }

        b.rotation = angle;
        b.combined_rotation = parent_rot + angle;
        b.world_dir = Quat::from_euler(
            EulerRot::XYZ,
            b.combined_rotation.x,
            0.0,
            b.combined_rotation.z,
        ) * b.direction;

        let combined = b.combined_rotation;
        for &c in &tree.branches[id].children {
            stack.push((c, combined));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Tree;
    use std::f32::consts::FRAC_PI_2;

    fn swaying_cfg() -> WindConfig {
        WindConfig {
            force: Vec3::new(0.5, 0.0, 0.5),
            elasticity: 5.0e5,
            clamp_angle: 0.5,
        }
    }

    fn small_tree() -> Tree {
        let mut tree = Tree::new_trunk(Vec3::ZERO, 4.0, 0.02);
        let child = tree.add_child(0, Vec3::new(1.0, 0.3, 0.0).normalize(), 1.0, 0.07);
        tree.branches[0].base_width = 0.5;
        tree.branches[0].top_width = 0.1;
        tree.branches[child].base_width = 0.3;
        tree.branches[child].top_width = 0.05;
        tree
    }

    #[test]
    fn sway_stays_bounded_and_varies_with_time() {
        let cfg = swaying_cfg();
        let mut tree = small_tree();
        let mut ctx = WindContext::default();

        let mut seen = Vec::new();
        for _ in 0..200 {
            apply_wind(&mut tree, &cfg, &ctx);
            for id in tree.reachable() {
                let combined = tree.branches[id].combined_rotation;
                // One flip past the clamp is the worst case.
                assert!(combined.x.abs() <= cfg.clamp_angle + FRAC_PI_2);
                assert!(combined.z.abs() <= cfg.clamp_angle + FRAC_PI_2);
            }
            seen.push(tree.branches[0].rotation.x);
            ctx.advance(0.1);
        }

        // The oscillation actually moves.
        let min = seen.iter().cloned().fold(f32::MAX, f32::min);
        let max = seen.iter().cloned().fold(f32::MIN, f32::max);
        assert!(max > min);
    }

    #[test]
    fn degenerate_widths_and_lengths_stay_finite() {
        let cfg = swaying_cfg();
        let mut tree = Tree::new_trunk(Vec3::ZERO, 0.0, 0.0);
        // Widths left at zero: the spring epsilon takes over.
        let ctx = WindContext { time: 1.3 };

        apply_wind(&mut tree, &cfg, &ctx);

        let b = &tree.branches[0];
        assert!(b.rotation.is_finite());
        assert!(b.combined_rotation.is_finite());
        assert!(b.world_dir.is_finite());
    }

    #[test]
    fn world_dir_stays_unit_length() {
        let cfg = swaying_cfg();
        let mut tree = small_tree();
        let mut ctx = WindContext::default();

        for _ in 0..10 {
            apply_wind(&mut tree, &cfg, &ctx);
            ctx.advance(0.25);
        }
        for id in tree.reachable() {
            let len = tree.branches[id].world_dir.length();
            assert!((len - 1.0).abs() < 1e-4);
        }
    }
}
