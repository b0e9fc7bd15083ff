//! ReconstructError: Unified error type for fa-reconstruct public APIs
//!
//! Each processing stage has its own error enum so callers can match on the
//! failure class; [`ReconstructError`] wraps them all for the case-level
//! driver. Structural failures (mesh, addressing) abort a case, per-field
//! failures are downgraded to warnings by the driver.

use std::path::PathBuf;
use thiserror::Error;

/// Malformed token stream while parsing a dictionary file.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A bracket or entry shape that the grammar does not allow.
    #[error("unexpected token `{token}` on line {line}")]
    UnexpectedToken { token: String, line: usize },
    /// The token stream ended inside an open `{` or `(`.
    #[error("unexpected end of input while reading {context}")]
    UnexpectedEof { context: String },
}

/// A parsed dictionary did not have the shape a typed field requires.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// A declared count disagrees with the expected or supplied element count.
    #[error("entry `{entry}`: expected {expected} elements, found {found}")]
    WrongElementCount {
        entry: String,
        expected: usize,
        found: usize,
    },
    /// A required entry is absent.
    #[error("missing entry `{0}`")]
    MissingEntry(String),
    /// An entry is present but holds the wrong kind of value.
    #[error("invalid value for `{entry}`: {reason}")]
    InvalidValue { entry: String, reason: String },
}

/// Inconsistent addressing detected while assembling a global field.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReconstructionError {
    /// Global slots left unset after every partition was scattered.
    #[error("{what}: {missing} of {total} global entries were never written (first: {first})")]
    IncompleteCoverage {
        what: String,
        missing: usize,
        total: usize,
        first: usize,
    },
    /// Two partitions claim the same global slot outside a processor patch.
    #[error("{what}: global entry {global} written by partitions {first} and {second}")]
    DuplicateCoverage {
        what: String,
        global: usize,
        first: usize,
        second: usize,
    },
    /// A local-to-global address points past the global array.
    #[error("partition {partition}: address {address} out of range for {what} of length {len}")]
    AddressOutOfRange {
        partition: usize,
        what: String,
        address: usize,
        len: usize,
    },
    /// A partition boundary edge maps to a global edge that the global patch does not list.
    #[error("partition {partition}, patch `{patch}`: global edge {edge} is not part of the global patch")]
    UnknownBoundaryEdge {
        partition: usize,
        patch: String,
        edge: usize,
    },
    /// No partition reports a global physical patch.
    #[error("global patch `{0}` is not reported by any partition")]
    MissingPatch(String),
    /// Partition directories are missing or non-contiguous.
    #[error("invalid partition layout: {0}")]
    PartitionCount(String),
    /// A decoded partition field does not match the partition mesh sizes.
    #[error("partition {partition}: {reason}")]
    ShapeMismatch { partition: usize, reason: String },
}

/// Non-fatal shared-edge diagnostics accumulated by the reconciler.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReconciliationError {
    /// A partition boundary edge centre has no equal global edge centre.
    #[error("partition {partition}, patch `{patch}`: no global edge centre matches local edge {local}")]
    NoCenterMatch {
        partition: usize,
        patch: String,
        local: usize,
    },
    /// Neither the global owner nor the neighbour face lives in the partition.
    #[error("global edge {edge} on `{patch}`: partition owner does not match global owner/neighbour")]
    OwnerMismatch { patch: String, edge: usize },
}

/// Unified error type for fa-reconstruct operations.
#[derive(Debug, Error)]
pub enum ReconstructError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },
    #[error("{path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: DecodeError,
    },
    #[error(transparent)]
    Reconstruction(#[from] ReconstructionError),
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ReconstructError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn parse(path: impl Into<PathBuf>, source: ParseError) -> Self {
        Self::Parse {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn decode(path: impl Into<PathBuf>, source: DecodeError) -> Self {
        Self::Decode {
            path: path.into(),
            source,
        }
    }

    /// True when the underlying cause is a missing file.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }
}
