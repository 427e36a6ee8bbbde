//! High-level phases of the space-colonization growth engine.
//!
//! One growth round looks like:
//! 1. [`attraction_phase`] — each live attraction point pulls on the branch
//!    whose tip is nearest to it (within the radius of influence),
//!    accumulating directions in an [`InfluenceBuffer`].
//! 2. [`growth_phase`] — every influenced branch spawns one new child
//!    segment in its accumulated direction, biased downward by gravity.
//! 3. [`kill_phase`] — attraction points close enough to some tip are
//!    consumed and removed from the working set.
//!
//! Rounds repeat until the attraction point set is empty (see
//! [`grow_to_completion`]). After growth stops, the skeleton is finalized by
//! [`simplify_phase`] (merging near-duplicate siblings) and [`width_phase`]
//! (bottom-up width propagation).

use crate::{
    attractor::AttractorField, config::GrowthConfig, error::GroveError,
    influence_buffer::InfluenceBuffer, tree::Tree, types::BranchId,
};
use glam::Vec3;
use log::debug;
use rand::Rng;

/// Creates the initial tree: a single vertical trunk segment at `origin`.
///
/// The trunk length is `max(trunk_height, segment_length)` so that a short
/// trunk configuration still produces a usable first segment. The wind phase
/// offset is drawn from `rng` once, like every later segment's.
pub fn seed_tree(origin: Vec3, cfg: &GrowthConfig, rng: &mut impl Rng) -> Tree {
    let length = cfg.trunk_height.max(cfg.segment_length);
    Tree::new_trunk(origin, length, rng.random_range(0.0..=0.1))
}

/// Accumulates attraction from the live point set onto branch tips.
///
/// For each attraction point:
///
/// 1. Finds the branch whose tip is nearest to the point
///    ([`Tree::nearest_tip`]; ties break toward the lower branch index, so
///    the association is a deterministic total order).
/// 2. If the squared distance is within `cfg.radius_of_influence`, adds the
///    unit vector from that tip toward the point into the buffer for that
///    branch. Points outside the radius influence nothing this round.
///
/// The influence buffer is resized (and cleared) to the current branch count
/// at the start of this phase via [`InfluenceBuffer::ensure_len`].
///
/// ### Parameters
/// - `tree` - The current tree structure; only read access is required.
/// - `field` - The live attraction point set; read-only here.
/// - `cfg` - Growth configuration providing the radius of influence.
/// - `acc` - Scratch buffer accumulating influence directions per branch.
pub fn attraction_phase(
    tree: &Tree,
    field: &AttractorField,
    cfg: &GrowthConfig,
    acc: &mut InfluenceBuffer,
) {
    let r2 = cfg.radius_of_influence * cfg.radius_of_influence;

    acc.ensure_len(tree.branches.len());

    for &p in &field.points {
        if let Some((id, d2)) = tree.nearest_tip(p)
            && d2 < r2
        {
            let dir = (p - tree.branches[id].tip()).normalize_or_zero();
            acc.add(id, dir);
        }
    }
}

/// Grows one new child segment on every influenced branch.
///
/// For each branch with at least one influence in the buffer:
///
/// 1. Normalize the summed influence direction.
/// 2. Add the constant gravity bias (`cfg.gravity_bias`) and normalize
///    again; the result is the child's unit growth direction.
/// 3. Spawn one child of fixed `cfg.segment_length` at the parent's tip.
///
/// A branch that received no influence this round does not grow this round;
/// it may still grow later once other branches reduce competition.
///
/// ### Returns
/// All newly created branch ids in the order they were added.
pub fn growth_phase(
    tree: &mut Tree,
    acc: &InfluenceBuffer,
    cfg: &GrowthConfig,
    rng: &mut impl Rng,
) -> Vec<BranchId> {
    let mut to_add = Vec::with_capacity(16);

    for id in acc.influenced_indices() {
        let mut dir = acc.dir_sum(id).normalize_or_zero();

        // Gravity/drooping bias, then renormalize to a unit direction.
        dir += cfg.gravity_bias;
        dir = dir.normalize_or_zero();

        if dir == Vec3::ZERO {
            continue;
        }
        to_add.push((id, dir));
    }

    let mut new_ids = Vec::with_capacity(to_add.len());
    for (parent, dir) in to_add {
        let offset = rng.random_range(0.0..=0.1);
        new_ids.push(tree.add_child(parent, dir, cfg.segment_length, offset));
    }
    new_ids
}

/// Removes attraction points that have been reached by the tree.
///
/// A point is consumed when the distance to the nearest current branch tip
/// (recomputed after growth) falls below `cfg.kill_distance`. Removal is
/// swap-remove; no surviving order is guaranteed.
///
/// ### Returns
/// The number of points removed.
pub fn kill_phase(tree: &Tree, field: &mut AttractorField, cfg: &GrowthConfig) -> usize {
    let r2 = cfg.kill_distance * cfg.kill_distance;
    field.cull(|p| matches!(tree.nearest_tip(p), Some((_, d2)) if d2 < r2))
}

/// Runs one full growth round: attraction, growth, kill.
///
/// With an empty attraction point set this is a no-op and the tree is left
/// unchanged.
///
/// ### Returns
/// The branch ids created this round.
pub fn grow_step(
    tree: &mut Tree,
    field: &mut AttractorField,
    cfg: &GrowthConfig,
    acc: &mut InfluenceBuffer,
    rng: &mut impl Rng,
) -> Vec<BranchId> {
    if field.is_empty() {
        return Vec::new();
    }

    attraction_phase(tree, field, cfg, acc);
    let new_ids = growth_phase(tree, acc, cfg, rng);
    kill_phase(tree, field, cfg);
    new_ids
}

/// Repeats growth rounds until the attraction point set is empty.
///
/// Termination is only guaranteed when every point is eventually reachable
/// within the radius of influence; `max_rounds` is the guard for
/// configurations where that cannot be assumed. Passing `None` runs
/// unbounded, which is the caller's responsibility.
///
/// ### Returns
/// The number of rounds executed, or [`GroveError::RoundLimitExceeded`] if
/// the budget ran out with points still alive.
pub fn grow_to_completion(
    tree: &mut Tree,
    field: &mut AttractorField,
    cfg: &GrowthConfig,
    rng: &mut impl Rng,
    max_rounds: Option<usize>,
) -> Result<usize, GroveError> {
    let mut acc = InfluenceBuffer::with_len(tree.branches.len());
    let mut rounds = 0;

    while !field.is_empty() {
        if let Some(limit) = max_rounds
            && rounds >= limit
        {
            return Err(GroveError::RoundLimitExceeded {
                rounds,
                remaining: field.len(),
            });
        }

        let new_ids = grow_step(tree, field, cfg, &mut acc, rng);
        rounds += 1;
        debug!(
            "growth round {rounds}: {} new branches, {} points remaining",
            new_ids.len(),
            field.len()
        );
    }
    Ok(rounds)
}

/// Merges near-duplicate sibling branches across the whole tree.
///
/// For every set of siblings, any pair whose direction vectors differ by
/// less than `cfg.merge_angle` is merged: the absorbing sibling adopts the
/// absorbed sibling's children (reparented), and the absorbed branch is
/// swap-removed from its parent's child list. Its arena slot becomes
/// unreachable. Children of merged branches are then visited in turn.
///
/// ### Returns
/// The number of siblings absorbed.
pub fn simplify_phase(tree: &mut Tree, cfg: &GrowthConfig) -> usize {
    let cos_merge = cfg.merge_angle.cos();
    let mut merged = 0;

    let mut stack = vec![tree.root()];
    while let Some(id) = stack.pop() {
        let mut i = 0;
        while i < tree.branches[id].children.len() {
            let a = tree.branches[id].children[i];
            let mut j = i + 1;
            while j < tree.branches[id].children.len() {
                let b = tree.branches[id].children[j];
                let dot = tree.branches[a].direction.dot(tree.branches[b].direction);
                if dot > cos_merge {
                    // Absorb b into a: a adopts b's children.
                    let grandchildren = std::mem::take(&mut tree.branches[b].children);
                    for &g in &grandchildren {
                        tree.branches[g].parent = Some(a);
                    }
                    tree.branches[a].children.extend(grandchildren);
                    tree.branches[id].children.swap_remove(j);
                    tree.branches[b].parent = None;
                    merged += 1;
                    // swap_remove moved a new candidate into slot j.
                } else {
                    j += 1;
                }
            }
            i += 1;
        }
        for &c in &tree.branches[id].children {
            stack.push(c);
        }
    }

    if merged > 0 {
        debug!("simplification absorbed {merged} sibling branches");
    }
    merged
}

/// Propagates branch widths bottom-up from the leaves to the root.
///
/// Leaves receive the fixed minimum base width and tip top width. An
/// internal branch's base width is `sqrt(Σ child.base²)` (cross-sectional
/// area conservation) and its top width is the largest child base width.
/// Finally the root's base width is copied from its own top width, so the
/// trunk does not taper below its first branching point.
pub fn width_phase(tree: &mut Tree, cfg: &GrowthConfig) {
    // Reversed preorder visits every branch after all of its descendants.
    let order = tree.reachable();
    for &id in order.iter().rev() {
        if tree.branches[id].is_leaf() {
            tree.branches[id].base_width = cfg.min_branch_width;
            tree.branches[id].top_width = cfg.tip_width;
        } else {
            let mut sum_sq = 0.0;
            let mut widest = 0.0_f32;
            for &c in &tree.branches[id].children {
                let base = tree.branches[c].base_width;
                sum_sq += base * base;
                widest = widest.max(base);
            }
            tree.branches[id].base_width = sum_sq.sqrt();
            tree.branches[id].top_width = widest;
        }
    }

    let root = tree.root();
    tree.branches[root].base_width = tree.branches[root].top_width;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        attractor::AttractorField,
        config::{EnvelopeConfig, GrowthConfig},
        envelope::Envelope,
        influence_buffer::InfluenceBuffer,
        tree::Tree,
    };
    use glam::Vec3;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn unbiased_cfg() -> GrowthConfig {
        GrowthConfig {
            gravity_bias: Vec3::ZERO,
            ..GrowthConfig::default()
        }
    }

    #[test]
    fn attraction_phase_accumulates_toward_point_within_radius() {
        // A bare trunk with its tip at (0, 4, 0).
        let tree = Tree::new_trunk(Vec3::ZERO, 4.0, 0.0);
        let field = AttractorField::from_positions(vec![Vec3::new(2.0, 4.0, 0.0)]);

        let mut cfg = GrowthConfig::default();
        cfg.radius_of_influence = 3.0;

        let mut acc = InfluenceBuffer::with_len(0);
        attraction_phase(&tree, &field, &cfg, &mut acc);

        assert_eq!(acc.count.len(), tree.branches.len());
        assert_eq!(acc.count[0], 1);
        // Unit vector from the tip toward the point.
        assert_eq!(acc.dir_sum(0), Vec3::X);
    }

    #[test]
    fn attraction_phase_ignores_points_outside_radius() {
        let tree = Tree::new_trunk(Vec3::ZERO, 4.0, 0.0);
        let field = AttractorField::from_positions(vec![Vec3::new(100.0, 4.0, 0.0)]);

        let mut cfg = GrowthConfig::default();
        cfg.radius_of_influence = 3.0;

        let mut acc = InfluenceBuffer::with_len(0);
        attraction_phase(&tree, &field, &cfg, &mut acc);

        assert_eq!(acc.count[0], 0);
    }

    #[test]
    fn growth_phase_spawns_one_gravity_biased_child() {
        let mut tree = Tree::new_trunk(Vec3::ZERO, 4.0, 0.0);
        let mut acc = InfluenceBuffer::with_len(1);
        acc.add(0, Vec3::X);

        let cfg = GrowthConfig::default();
        let mut rng = StdRng::seed_from_u64(0);
        let new_ids = growth_phase(&mut tree, &acc, &cfg, &mut rng);

        assert_eq!(new_ids.len(), 1);
        let child = &tree.branches[new_ids[0]];

        // Child starts at the trunk tip and points along the influence
        // direction pulled down by the gravity bias.
        assert_eq!(child.position, Vec3::new(0.0, 4.0, 0.0));
        let expected = (Vec3::X + Vec3::new(0.0, -0.2, 0.0)).normalize();
        assert!((child.direction - expected).length() < 1e-6);
        assert_eq!(child.length, cfg.segment_length);
        assert!((child.direction.length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn grow_step_on_empty_field_leaves_tree_unchanged() {
        let mut tree = Tree::new_trunk(Vec3::ZERO, 4.0, 0.0);
        let mut field = AttractorField::default();
        let mut acc = InfluenceBuffer::with_len(1);
        let cfg = GrowthConfig::default();
        let mut rng = StdRng::seed_from_u64(0);

        let new_ids = grow_step(&mut tree, &mut field, &cfg, &mut acc, &mut rng);

        assert!(new_ids.is_empty());
        assert_eq!(tree.branches.len(), 1);
    }

    #[test]
    fn kill_phase_culls_exactly_the_points_within_kill_distance() {
        // Scripted tips at (0, 2, 0) and (2, 2, 0).
        let mut tree = Tree::new_trunk(Vec3::ZERO, 2.0, 0.0);
        tree.add_child(0, Vec3::X, 2.0, 0.0);

        let mut cfg = GrowthConfig::default();
        cfg.kill_distance = 1.0;

        let mut field = AttractorField::from_positions(vec![
            Vec3::new(0.0, 2.5, 0.0),  // 0.5 from the trunk tip: culled
            Vec3::new(2.0, 2.9, 0.0),  // 0.9 from the child tip: culled
            Vec3::new(0.0, 3.5, 0.0),  // 1.5 from everything: survives
            Vec3::new(-4.0, 2.0, 0.0), // far away: survives
        ]);

        let removed = kill_phase(&tree, &mut field, &cfg);

        assert_eq!(removed, 2);
        assert_eq!(field.len(), 2);
        for p in &field.points {
            let (_, d2) = tree.nearest_tip(*p).unwrap();
            assert!(d2 >= 1.0);
        }
    }

    #[test]
    fn cone_scenario_terminates_and_bounds_leaf_count() {
        // Trunk height 4, segment length 1, 50 points inside a cone
        // envelope of max radius 3 at height 4.
        let env_cfg = EnvelopeConfig {
            base_height: 4.0,
            height: 4.0,
            layers: 8,
            angular_steps: 16,
            max_radius: 3.0,
            attempts_per_point: 1000,
        };
        let env = Envelope::materialize(&env_cfg, |h, _| 3.0 * (1.0 - h / 4.0));

        let mut rng = StdRng::seed_from_u64(42);
        let mut field = AttractorField::from_positions(env.sample_points(50, &mut rng).unwrap());

        let cfg = GrowthConfig {
            trunk_height: 4.0,
            segment_length: 1.0,
            ..GrowthConfig::default()
        };
        let mut tree = seed_tree(Vec3::ZERO, &cfg, &mut rng);

        let rounds = grow_to_completion(&mut tree, &mut field, &cfg, &mut rng, Some(500))
            .expect("growth must terminate within the round budget");

        assert!(rounds <= 500);
        assert!(field.is_empty());
        assert!(tree.leaf_count() <= 50);

        // The finalized tree satisfies the width invariants.
        simplify_phase(&mut tree, &cfg);
        width_phase(&mut tree, &cfg);
        for id in tree.reachable() {
            let b = &tree.branches[id];
            assert!(
                b.top_width <= b.base_width + 1e-5,
                "branch {id}: top {} > base {}",
                b.top_width,
                b.base_width
            );
            if !b.is_leaf() && id != tree.root() {
                let sum_sq: f32 = b
                    .children
                    .iter()
                    .map(|&c| tree.branches[c].base_width.powi(2))
                    .sum();
                assert!((b.base_width - sum_sq.sqrt()).abs() < 1e-4);
            }
        }
    }

    #[test]
    fn grow_to_completion_reports_round_limit_for_unreachable_points() {
        let mut tree = Tree::new_trunk(Vec3::ZERO, 4.0, 0.0);
        // A point no tip can ever influence.
        let mut field = AttractorField::from_positions(vec![Vec3::new(1000.0, 0.0, 0.0)]);
        let cfg = GrowthConfig::default();
        let mut rng = StdRng::seed_from_u64(0);

        let err = grow_to_completion(&mut tree, &mut field, &cfg, &mut rng, Some(10)).unwrap_err();
        assert_eq!(
            err,
            GroveError::RoundLimitExceeded {
                rounds: 10,
                remaining: 1
            }
        );
    }

    #[test]
    fn simplify_merges_near_parallel_siblings_and_transfers_children() {
        let cfg = unbiased_cfg();
        let mut tree = Tree::new_trunk(Vec3::ZERO, 4.0, 0.0);

        // Two siblings 2 degrees apart, the second with two children.
        let a = tree.add_child(0, Vec3::X, 1.0, 0.0);
        let dir_b = Vec3::new(
            2.0_f32.to_radians().cos(),
            2.0_f32.to_radians().sin(),
            0.0,
        );
        let b = tree.add_child(0, dir_b, 1.0, 0.0);
        let g1 = tree.add_child(b, Vec3::Y, 1.0, 0.0);
        let g2 = tree.add_child(b, Vec3::Z, 1.0, 0.0);
        let before = tree.reachable().len();

        let merged = simplify_phase(&mut tree, &cfg);

        assert_eq!(merged, 1);
        let ids = tree.reachable();
        // Exactly the absorbed sibling left the tree; its children survive
        // reparented under the absorber.
        assert_eq!(ids.len(), before - 1);
        assert!(!ids.contains(&b));
        assert!(ids.contains(&g1) && ids.contains(&g2));
        assert_eq!(tree.branches[g1].parent, Some(a));
        assert_eq!(tree.branches[g2].parent, Some(a));
        assert!(tree.branches[a].children.contains(&g1));
        assert!(tree.branches[a].children.contains(&g2));
    }

    #[test]
    fn simplify_keeps_distinct_siblings() {
        let cfg = unbiased_cfg();
        let mut tree = Tree::new_trunk(Vec3::ZERO, 4.0, 0.0);
        tree.add_child(0, Vec3::X, 1.0, 0.0);
        tree.add_child(0, Vec3::Z, 1.0, 0.0);

        assert_eq!(simplify_phase(&mut tree, &cfg), 0);
        assert_eq!(tree.branches[0].children.len(), 2);
    }

    #[test]
    fn width_phase_propagates_bottom_up() {
        let cfg = GrowthConfig::default();
        let mut tree = Tree::new_trunk(Vec3::ZERO, 4.0, 0.0);
        let mid = tree.add_child(0, Vec3::X, 1.0, 0.0);
        let l1 = tree.add_child(mid, Vec3::X, 1.0, 0.0);
        let l2 = tree.add_child(mid, Vec3::Z, 1.0, 0.0);

        width_phase(&mut tree, &cfg);

        let w = cfg.min_branch_width;
        assert_eq!(tree.branches[l1].base_width, w);
        assert_eq!(tree.branches[l1].top_width, cfg.tip_width);
        assert_eq!(tree.branches[l2].base_width, w);

        // Internal: base from area conservation, top from the widest child.
        let expected_mid = (2.0 * w * w).sqrt();
        assert!((tree.branches[mid].base_width - expected_mid).abs() < 1e-6);
        assert_eq!(tree.branches[mid].top_width, w);

        // Root base is copied from its own top width.
        assert!((tree.branches[0].top_width - expected_mid).abs() < 1e-6);
        assert_eq!(tree.branches[0].base_width, tree.branches[0].top_width);
    }
}
