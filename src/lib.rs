//! # fa-reconstruct
//!
//! fa-reconstruct reassembles the output of a domain-decomposed finite-area
//! solver. Every partition (`processor<N>`) writes its own slice of mesh
//! addressing and field values in the solver's nested-dictionary text format;
//! this crate parses those files, merges the partition slices into one global
//! field per time step and writes the result back in the same format.
//!
//! ## Features
//! - Tokenizer and recursive-descent parser for the dictionary format, including
//!   the legacy inline-list quirks of newer solver releases
//! - Typed field decoding (`uniform` / `nonuniform`, scalar and vector) with
//!   explicit element-count validation
//! - Partition addressing loader and a merge plan that proves every global
//!   face, edge and boundary slot is written exactly once
//! - Shared-edge reconciliation: flux sign restoration on partition cuts using
//!   the undecomposed owner/neighbour arrays and edge-centre matching
//! - Encoder writing reconstructed fields with the solver's banner and layout
//! - Case driver distributing time steps over a `rayon` worker pool
//!
//! ## Usage
//!
//! ```no_run
//! use fa_reconstruct::prelude::*;
//!
//! let config = ReconstructConfig::debris_flow_defaults("run/case", "run/case/reconstructed");
//! let summary = fa_reconstruct::case::run(&config)?;
//! println!("{summary}");
//! # Ok::<(), fa_reconstruct::mesh_error::ReconstructError>(())
//! ```
//!
//! ## Determinism
//!
//! Partitions are always visited in ascending rank order, so a global edge
//! shared by two partitions keeps the value of the higher rank. Reconstructing
//! the same case twice produces byte-identical files.

pub mod algs;
pub mod case;
pub mod config;
pub mod data;
pub mod io;
pub mod mesh_error;
pub mod partitioning;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::algs::merge::{MergePlan, merge_area_field, merge_edge_field};
    pub use crate::algs::reconcile::{FirstOwner, SharedEdgeMap};
    pub use crate::case::{CaseContext, RunSummary, TimeDir};
    pub use crate::config::{FieldLocation, FieldSpec, ReconstructConfig, ValueKind};
    pub use crate::data::field::{
        BoundaryKind, BoundaryValue, Field, FieldDimensions, FieldElement, FieldValues, Vector3,
    };
    pub use crate::data::global_field::GlobalField;
    pub use crate::io::parser::parse_dictionary;
    pub use crate::io::tokenizer::TokenizerOptions;
    pub use crate::io::value::{Dict, Value};
    pub use crate::io::writer::{FieldHeader, FieldWriter};
    pub use crate::mesh_error::{
        DecodeError, ParseError, ReconciliationError, ReconstructError, ReconstructionError,
    };
    pub use crate::partitioning::addressing::{CaseMesh, GlobalMesh, PartitionMesh};
}
