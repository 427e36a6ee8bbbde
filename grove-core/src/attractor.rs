use glam::Vec3;

/// The live working set of attraction points.
///
/// Points are plain positions with no identity; the set is unordered and
/// culling uses swap-remove, so no surviving order is guaranteed.
#[derive(Debug, Default)]
pub struct AttractorField {
    pub points: Vec<Vec3>,
}

impl AttractorField {
    pub fn from_positions(points: Vec<Vec3>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Removes every point for which `dead` returns `true`.
    ///
    /// Scans back-to-front and swap-removes, so each survivor's predicate is
    /// evaluated exactly once and removal is O(1) per point.
    ///
    /// ### Returns
    /// The number of points removed.
    pub fn cull(&mut self, mut dead: impl FnMut(Vec3) -> bool) -> usize {
        let before = self.points.len();
        let mut i = self.points.len();
        while i > 0 {
            i -= 1;
            if dead(self.points[i]) {
                self.points.swap_remove(i);
            }
        }
        before - self.points.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cull_removes_matching_points_and_reports_count() {
        let mut field = AttractorField::from_positions(vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(5.0, 0.0, 0.0),
            Vec3::new(0.5, 0.0, 0.0),
        ]);

        // Remove everything within one unit of the origin.
        let removed = field.cull(|p| p.length() < 1.0);

        assert_eq!(removed, 2);
        assert_eq!(field.len(), 1);
        assert_eq!(field.points[0], Vec3::new(5.0, 0.0, 0.0));
    }

    #[test]
    fn cull_on_empty_field_is_a_no_op() {
        let mut field = AttractorField::default();
        assert_eq!(field.cull(|_| true), 0);
        assert!(field.is_empty());
    }
}
