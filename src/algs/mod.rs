//! Re-export public algorithms.

pub mod merge;
pub mod reconcile;

#[cfg(test)]
pub(crate) mod test_mesh;

pub use merge::{MergePlan, merge_area_field, merge_edge_field};
pub use reconcile::{FirstOwner, SharedEdgeMap, correct_boundary_addressing};
