//! Whole-grove assembly: one collision mesh and one conforming particle
//! cloud per branch of a finalized skeleton, plus the world-space bake of
//! every branch-local cloud.

use crate::{
    config::FuzzyConfig,
    fuzzy::FuzzyObject,
    mesh::{TriangleMesh, cylinder, sphere},
    tree::Tree,
    types::BranchId,
};
use glam::{Quat, Vec3};
use log::debug;
use rand::Rng;

/// Tessellation of the per-branch collision geometry.
const BRANCH_SLICES: usize = 10;
const BRANCH_STACKS: usize = 4;

/// Width floor so degenerate skeleton data still produces usable geometry.
const MIN_MESH_WIDTH: f32 = 1e-3;

/// One branch's solid geometry and the particle swarm conforming to it.
///
/// Both live in the branch-local frame: the mesh axis is +Z, with the
/// branch base at the origin.
pub struct BranchCloud {
    pub branch: BranchId,
    pub mesh: TriangleMesh,
    pub fuzzy: FuzzyObject,
}

/// A finalized skeleton with a fuzzy cloud for every reachable branch.
pub struct Grove {
    pub tree: Tree,
    pub clouds: Vec<BranchCloud>,
}

impl Grove {
    /// Builds a cloud for every reachable branch of a finalized tree.
    ///
    /// Each branch gets a closed cylinder mesh from its
    /// `(base_width, top_width, length)` (a sphere for zero-length stubs)
    /// and a fuzzy object grown to completion inside it, with density
    /// scaled up for branches thinner than the trunk.
    pub fn build(tree: Tree, fuzzy_cfg: FuzzyConfig, rng: &mut impl Rng) -> Self {
        let reference_width = tree.branches[tree.root()]
            .base_width
            .max(MIN_MESH_WIDTH);

        let mut clouds = Vec::new();
        for id in tree.reachable() {
            let b = &tree.branches[id];
            let base = b.base_width.max(MIN_MESH_WIDTH);
            let top = b.top_width.max(MIN_MESH_WIDTH);

            let (mesh, spawn) = if b.length > MIN_MESH_WIDTH {
                (
                    cylinder(base, top, b.length, BRANCH_SLICES, BRANCH_STACKS),
                    Vec3::new(0.0, 0.0, b.length * 0.5),
                )
            } else {
                (sphere(base, BRANCH_SLICES, BRANCH_STACKS), Vec3::ZERO)
            };

            let mut fuzzy = FuzzyObject::new(fuzzy_cfg, spawn);
            // Thinner branches pack denser.
            let factor = (base / reference_width).clamp(0.3, 1.0);
            fuzzy.scale_density(factor);
            fuzzy.build(&mesh, rng);

            debug!(
                "branch {id}: {} particles (density factor {factor:.2})",
                fuzzy.particle_count()
            );
            clouds.push(BranchCloud {
                branch: id,
                mesh,
                fuzzy,
            });
        }

        Self { tree, clouds }
    }

    pub fn finished_building(&self) -> bool {
        self.clouds.iter().all(|c| c.fuzzy.finished_building())
    }

    pub fn particle_count(&self) -> usize {
        self.clouds.iter().map(|c| c.fuzzy.particle_count()).sum()
    }

    /// Bakes every branch's local particle positions into world space.
    ///
    /// Walks the tree from the root, accumulating each branch's world
    /// offset from its parent's tip; each cloud's local +Z particle frame
    /// is rotated onto the branch direction and translated by that offset.
    pub fn bake_world_points(&self) -> Vec<Vec3> {
        // Branch id -> cloud index, for the walk below.
        let mut cloud_of = vec![None; self.tree.branches.len()];
        for (i, c) in self.clouds.iter().enumerate() {
            cloud_of[c.branch] = Some(i);
        }

        let root = self.tree.root();
        let mut out = Vec::new();
        let mut stack = vec![(root, self.tree.branches[root].position)];
        while let Some((id, origin)) = stack.pop() {
            let b = &self.tree.branches[id];

            if let Some(i) = cloud_of[id] {
                let rot = rotation_to_direction(b.direction);
                for p in self.clouds[i].fuzzy.get_system() {
                    out.push(origin + rot * p);
                }
            }

            let tip = origin + b.direction * b.length;
            for &c in &b.children {
                stack.push((c, tip));
            }
        }
        out
    }
}

/// Rotation taking the local +Z particle axis onto a branch direction.
///
/// Derived from the angle between the two axes, about their cross product;
/// the parallel and antiparallel cases fall back to the identity and a
/// half-turn about X.
fn rotation_to_direction(dir: Vec3) -> Quat {
    let axis = Vec3::Z.cross(dir);
    let len = axis.length();
    if len < 1e-6 {
        if dir.z >= 0.0 {
            Quat::IDENTITY
        } else {
            Quat::from_axis_angle(Vec3::X, std::f32::consts::PI)
        }
    } else {
        let angle = dir.dot(Vec3::Z).clamp(-1.0, 1.0).acos();
        Quat::from_axis_angle(axis / len, angle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn rotation_maps_local_axis_onto_direction() {
        for dir in [
            Vec3::Y,
            Vec3::X,
            Vec3::Z,
            Vec3::NEG_Z,
            Vec3::new(1.0, 1.0, 1.0).normalize(),
        ] {
            let rot = rotation_to_direction(dir);
            let mapped = rot * Vec3::Z;
            assert!(
                (mapped - dir).length() < 1e-5,
                "axis mapped to {mapped}, expected {dir}"
            );
        }
    }

    #[test]
    fn grove_builds_a_cloud_per_branch_and_bakes_them() {
        let mut tree = Tree::new_trunk(Vec3::ZERO, 1.0, 0.0);
        let child = tree.add_child(0, Vec3::X, 1.0, 0.0);
        tree.branches[0].base_width = 0.5;
        tree.branches[0].top_width = 0.4;
        tree.branches[child].base_width = 0.4;
        tree.branches[child].top_width = 0.2;

        let cfg = FuzzyConfig {
            particle_limit: 10,
            min_particle_count: 3,
            ..FuzzyConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(9);
        let grove = Grove::build(tree, cfg, &mut rng);

        assert_eq!(grove.clouds.len(), 2);
        assert!(grove.finished_building());
        assert!(grove.particle_count() > 0);

        let points = grove.bake_world_points();
        assert_eq!(points.len(), grove.particle_count());

        // Everything stays near the two unit segments.
        for p in points {
            assert!(p.length() < 4.0, "baked point unreasonably far: {p}");
        }
    }
}
