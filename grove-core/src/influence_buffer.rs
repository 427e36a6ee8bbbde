use crate::types::BranchId;
use glam::Vec3;

/// A temporary buffer that accumulates directional influence per branch.
///
/// For each `BranchId`, this buffer stores:
///
/// - The sum of all incoming unit direction vectors.
/// - The number of contributions that were added.
///
/// The growth phase reads back the summed direction for each influenced
/// branch and normalizes it (after applying the gravity bias), so only the
/// vector sum is kept, not the average.
///
/// Internally, `dir[i]` and `count[i]` correspond to branch `i` (where
/// `BranchId` is expected to be an index-like type, e.g. `usize`).
#[derive(Debug)]
pub struct InfluenceBuffer {
    /// Accumulated direction vectors for each branch.
    dir: Vec<Vec3>,
    /// Number of contributions for each branch.
    pub count: Vec<u32>,
}

impl InfluenceBuffer {
    /// Creates a new [`InfluenceBuffer`] with the given length.
    ///
    /// All accumulated directions are initialized to `Vec3::ZERO`,
    /// and all counts are initialized to `0`.
    ///
    /// ### Parameters
    /// - `len` - Number of branches this buffer can store influences for.
    pub fn with_len(len: usize) -> Self {
        Self {
            dir: vec![Vec3::ZERO; len],
            count: vec![0; len],
        }
    }

    /// Ensures that the internal storage has exactly the given length.
    ///
    /// If the current length differs from `len`, both the direction and
    /// count arrays are resized to `len`. After this call, all entries
    /// are cleared (directions set to `Vec3::ZERO`, counts set to `0`),
    /// even if the length was already correct.
    ///
    /// ### Parameters
    /// - `len` - Desired length of the internal buffers.
    pub fn ensure_len(&mut self, len: usize) {
        if self.dir.len() != len {
            self.dir.resize(len, Vec3::ZERO);
            self.count.resize(len, 0);
        }
        self.clear();
    }

    /// Clears all accumulated influences.
    ///
    /// After calling this method, all directions are set to `Vec3::ZERO`,
    /// and all counts are reset to `0`, but the length remains unchanged.
    pub fn clear(&mut self) {
        for v in &mut self.dir {
            *v = Vec3::ZERO;
        }
        for c in &mut self.count {
            *c = 0;
        }
    }

    /// Adds one directional influence for the given branch.
    ///
    /// The `dir` vector is added to the accumulated direction for this `id`,
    /// and the count for that branch is incremented by one.
    ///
    /// ### Parameters
    /// - `id` - Branch ID to accumulate influence for (used as an index).
    /// - `dir` - Direction vector to add.
    ///
    /// ### Panics
    /// Panics if `id` is out of bounds for the internal arrays.
    #[inline]
    pub fn add(&mut self, id: BranchId, dir: Vec3) {
        self.dir[id] += dir;
        self.count[id] += 1;
    }

    /// Returns the summed influence direction for a branch.
    ///
    /// If the branch has received no influences (i.e. its count is `0`),
    /// this method returns `Vec3::ZERO`.
    ///
    /// ### Parameters
    /// - `id` - Branch ID whose summed direction should be queried.
    #[inline]
    pub fn dir_sum(&self, id: BranchId) -> Vec3 {
        self.dir[id]
    }

    /// Returns `true` if the given branch has received any influences.
    ///
    /// This is equivalent to checking whether the count for the branch
    /// is greater than zero.
    #[inline]
    pub fn is_influenced(&self, id: BranchId) -> bool {
        self.count[id] > 0
    }

    /// Returns an iterator over all branch indices that have been influenced.
    ///
    /// Only branches whose count is greater than zero are yielded.
    pub fn influenced_indices<'a>(&'a self) -> impl Iterator<Item = BranchId> + 'a {
        self.count
            .iter()
            .enumerate()
            .filter_map(|(i, &c)| if c > 0 { Some(i) } else { None })
    }
}
