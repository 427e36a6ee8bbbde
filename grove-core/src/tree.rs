use crate::types::BranchId;
use glam::Vec3;

/// One branch segment of the skeleton.
///
/// `position`, `direction` and `length` are fixed at creation; widths are
/// filled in by the post-processing phases. The `rotation` family of fields
/// is transient sway state owned by the wind model.
#[derive(Debug)]
pub struct Branch {
    pub position: Vec3,
    /// Unit growth/orientation axis.
    pub direction: Vec3,
    pub length: f32,
    pub base_width: f32,
    pub top_width: f32,
    /// Random phase used only by the wind model; assigned once at creation.
    pub offset: f32,
    pub parent: Option<BranchId>,
    pub children: Vec<BranchId>,

    // Wind sway state, rewritten every animation step.
    pub rotation: Vec3,
    pub combined_rotation: Vec3,
    pub world_dir: Vec3,
    pub sway_sign: f32,
}

impl Branch {
    fn new(
        position: Vec3,
        direction: Vec3,
        length: f32,
        offset: f32,
        parent: Option<BranchId>,
    ) -> Self {
        Self {
            position,
            direction,
            length,
            base_width: 0.0,
            top_width: 0.0,
            offset,
            parent,
            children: Vec::with_capacity(4),
            rotation: Vec3::ZERO,
            combined_rotation: Vec3::ZERO,
            world_dir: direction,
            sway_sign: 1.0,
        }
    }

    /// The far end of the segment.
    pub fn tip(&self) -> Vec3 {
        self.position + self.direction * self.length
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Rooted branch arena.
///
/// Branches are owned by the arena and linked by index; the root is always
/// id 0. Simplification can detach a branch from its parent's child list,
/// leaving its slot unreachable, so structural walks must start at the root
/// rather than iterate the arena.
#[derive(Debug)]
pub struct Tree {
    pub branches: Vec<Branch>,
}

impl Tree {
    /// Creates a tree consisting of a vertical trunk segment at `origin`.
    pub fn new_trunk(origin: Vec3, length: f32, offset: f32) -> Self {
        Self {
            branches: vec![Branch::new(origin, Vec3::Y, length, offset, None)],
        }
    }

    pub fn root(&self) -> BranchId {
        0
    }

    /// Appends a child segment starting at the parent's tip.
    pub fn add_child(
        &mut self,
        parent: BranchId,
        direction: Vec3,
        length: f32,
        offset: f32,
    ) -> BranchId {
        let position = self.branches[parent].tip();
        let id = self.branches.len();
        self.branches
            .push(Branch::new(position, direction, length, offset, Some(parent)));
        self.branches[parent].children.push(id);
        id
    }

    /// Finds the branch whose tip is closest to `pos`.
    ///
    /// Ties break toward the lower branch index (strict `<` scan in index
    /// order), which keeps point-to-branch association deterministic.
    ///
    /// ### Returns
    /// The winning branch id and the squared distance to its tip, or `None`
    /// for an empty arena.
    pub fn nearest_tip(&self, pos: Vec3) -> Option<(BranchId, f32)> {
        let mut best = None;
        let mut best_d2 = f32::MAX;
        for (id, b) in self.branches.iter().enumerate() {
            let d2 = b.tip().distance_squared(pos);
            if d2 < best_d2 {
                best_d2 = d2;
                best = Some(id);
            }
        }
        best.map(|id| (id, best_d2))
    }

    /// Ids of every branch reachable from the root, preorder.
    pub fn reachable(&self) -> Vec<BranchId> {
        self.reachable_from(self.root())
    }

    /// Ids of every branch in the subtree rooted at `id`, preorder.
    pub fn reachable_from(&self, id: BranchId) -> Vec<BranchId> {
        let mut out = Vec::with_capacity(self.branches.len());
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            out.push(id);
            for &c in &self.branches[id].children {
                stack.push(c);
            }
        }
        out
    }

    pub fn leaf_count(&self) -> usize {
        self.reachable()
            .iter()
            .filter(|&&id| self.branches[id].is_leaf())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_child_starts_at_parent_tip_and_links_both_ways() {
        let mut tree = Tree::new_trunk(Vec3::ZERO, 4.0, 0.0);
        let child = tree.add_child(0, Vec3::X, 1.0, 0.0);

        assert_eq!(child, 1);
        assert_eq!(tree.branches[child].position, Vec3::new(0.0, 4.0, 0.0));
        assert_eq!(tree.branches[child].parent, Some(0));
        assert_eq!(tree.branches[0].children, vec![child]);
    }

    #[test]
    fn nearest_tip_breaks_ties_toward_lower_index() {
        let mut tree = Tree::new_trunk(Vec3::ZERO, 1.0, 0.0);
        // Two children with tips symmetric about the query point.
        let a = tree.add_child(0, Vec3::X, 1.0, 0.0);
        let _b = tree.add_child(0, Vec3::NEG_X, 1.0, 0.0);

        let (id, d2) = tree.nearest_tip(Vec3::new(0.0, 1.0, 0.0)).unwrap();
        assert_eq!(id, a);
        assert!((d2 - 1.0).abs() < 1e-6);
    }

    #[test]
    fn reachable_ignores_detached_branches() {
        let mut tree = Tree::new_trunk(Vec3::ZERO, 1.0, 0.0);
        let a = tree.add_child(0, Vec3::X, 1.0, 0.0);
        let b = tree.add_child(0, Vec3::Z, 1.0, 0.0);
        let _under_b = tree.add_child(b, Vec3::Z, 1.0, 0.0);

        // Detach b the way simplification does.
        let pos = tree.branches[0]
            .children
            .iter()
            .position(|&c| c == b)
            .unwrap();
        tree.branches[0].children.swap_remove(pos);

        let ids = tree.reachable();
        assert!(ids.contains(&a));
        assert!(!ids.contains(&b));
        assert_eq!(ids.len(), 2);
        assert_eq!(tree.leaf_count(), 1);
    }
}
