/// Identifier for a branch in a [`crate::tree::Tree`].
///
/// This is an index into `Tree::branches`, and is only meaningful within
/// the lifetime of a given `Tree` instance.
pub type BranchId = usize;
