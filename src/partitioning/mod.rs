//! Partition addressing: how each partition's local numbering maps onto the
//! undecomposed mesh.

pub mod addressing;

pub use addressing::{BoundaryPatch, Boundaries, CaseMesh, EdgeCount, GlobalMesh, PartitionMesh};
