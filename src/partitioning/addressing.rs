//! Partition addressing loader.
//!
//! A decomposed case stores, per partition `processor<p>`:
//! - `constant/faMesh/faBoundary`: patch name -> local edge labels,
//! - `constant/faMesh/faceProcAddressing`: local face -> global face,
//! - `constant/faMesh/edgeProcAddressing`: local edge -> global edge,
//! - `0/edgeOwner`: local edge -> local owner face (optional).
//!
//! The undecomposed description supplies `constant/faMesh/faBoundary` (global
//! edge labels per patch), `0/faFaces` (face count), `0/edgeOwner` and
//! `0/edgeNeighbour`. Local edges are ordered internal first, then patch by
//! patch, so the internal edge count is the total minus all patch sizes.

use crate::data::decode::FieldLayout;
use crate::io::tokenizer::TokenizerOptions;
use crate::io::value::{Dict, Value};
use crate::io::{describe, read_dictionary, read_label_list, read_list_count};
use crate::mesh_error::{DecodeError, ReconstructError, ReconstructionError};
use indexmap::IndexMap;
use std::path::{Path, PathBuf};

/// Prefix of inter-partition patch names, `procBoundary<i>to<j>`.
pub const PROCESSOR_PATCH_PREFIX: &str = "procBoundary";

/// One named boundary patch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BoundaryPatch {
    /// The patch `type` entry (`patch`, `processor`, ...).
    pub kind: String,
    /// Edge labels, local to the mesh the patch belongs to.
    pub edges: Vec<usize>,
}

impl BoundaryPatch {
    pub fn new(kind: impl Into<String>, edges: Vec<usize>) -> Self {
        Self {
            kind: kind.into(),
            edges,
        }
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

/// Patches in file order.
pub type Boundaries = IndexMap<String, BoundaryPatch>;

/// Split `procBoundary<i>to<j>` into `(i, j)`.
pub fn parse_processor_patch(name: &str) -> Option<(usize, usize)> {
    let rest = name.strip_prefix(PROCESSOR_PATCH_PREFIX)?;
    let (from, to) = rest.split_once("to")?;
    Some((from.parse().ok()?, to.parse().ok()?))
}

/// True for inter-partition patches.
pub fn is_processor_patch(name: &str, patch: &BoundaryPatch) -> bool {
    patch.kind == "processor" || parse_processor_patch(name).is_some()
}

/// Internal and total edge counts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EdgeCount {
    pub internal: usize,
    pub total: usize,
}

/// Addressing of one partition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartitionMesh {
    pub rank: usize,
    pub face_count: usize,
    pub edge_count: EdgeCount,
    pub boundaries: Boundaries,
    /// Local face -> global face.
    pub face_addr: Vec<usize>,
    /// Local edge -> global edge.
    pub edge_addr: Vec<usize>,
    /// Local edge -> local owner face, when the partition wrote it.
    pub edge_owner: Option<Vec<usize>>,
}

impl PartitionMesh {
    /// Assemble a partition from its raw tables, deriving counts and
    /// checking every local label against the local sizes.
    pub fn from_parts(
        rank: usize,
        boundaries: Boundaries,
        face_addr: Vec<usize>,
        edge_addr: Vec<usize>,
        edge_owner: Option<Vec<usize>>,
    ) -> Result<Self, ReconstructionError> {
        let total = edge_addr.len();
        let boundary_edges: usize = boundaries.values().map(BoundaryPatch::len).sum();
        let internal = total.checked_sub(boundary_edges).ok_or_else(|| {
            ReconstructionError::ShapeMismatch {
                partition: rank,
                reason: format!("{boundary_edges} boundary edges but only {total} edges addressed"),
            }
        })?;
        for (name, patch) in &boundaries {
            if let Some(&edge) = patch.edges.iter().find(|&&e| e >= total) {
                return Err(ReconstructionError::AddressOutOfRange {
                    partition: rank,
                    what: format!("edges of patch `{name}`"),
                    address: edge,
                    len: total,
                });
            }
        }
        let face_count = face_addr.len();
        if let Some(owner) = &edge_owner {
            if let Some(&face) = owner.iter().find(|&&f| f >= face_count) {
                return Err(ReconstructionError::AddressOutOfRange {
                    partition: rank,
                    what: "edge owners".into(),
                    address: face,
                    len: face_count,
                });
            }
        }
        Ok(Self {
            rank,
            face_count,
            edge_count: EdgeCount { internal, total },
            boundaries,
            face_addr,
            edge_addr,
            edge_owner,
        })
    }

    /// Load partition `rank` of the case rooted at `case_dir`.
    pub fn load(case_dir: &Path, rank: usize, options: &TokenizerOptions) -> Result<Self, ReconstructError> {
        let dir = processor_dir(case_dir, rank);
        let fa_mesh = dir.join("constant").join("faMesh");
        let boundaries = read_boundaries(&fa_mesh.join("faBoundary"), options)?;
        let face_addr = read_label_list(&fa_mesh.join("faceProcAddressing"), options)?;
        let edge_addr = read_label_list(&fa_mesh.join("edgeProcAddressing"), options)?;
        let edge_owner = match read_label_list(&dir.join("0").join("edgeOwner"), options) {
            Ok(owner) => Some(owner),
            Err(e) if e.is_not_found() => {
                log::debug!("processor{rank}: no 0/edgeOwner, owner faces will be located by membership");
                None
            }
            Err(e) => return Err(e),
        };
        Ok(Self::from_parts(rank, boundaries, face_addr, edge_addr, edge_owner)?)
    }

    /// Sizes an area (per-face) field file of this partition must match.
    pub fn area_layout(&self) -> FieldLayout {
        layout(self.face_count, &self.boundaries)
    }

    /// Sizes an edge field file of this partition must match.
    pub fn edge_layout(&self) -> FieldLayout {
        layout(self.edge_count.internal, &self.boundaries)
    }

    /// Inter-partition patches as `(name, from, to, patch)`.
    pub fn processor_patches(&self) -> impl Iterator<Item = (&str, usize, usize, &BoundaryPatch)> {
        self.boundaries.iter().filter_map(|(name, patch)| {
            let (from, to) = parse_processor_patch(name)?;
            Some((name.as_str(), from, to, patch))
        })
    }

    /// Local index of global face `global`, if this partition holds it.
    pub fn local_face(&self, global: usize) -> Option<usize> {
        self.face_addr.iter().position(|&g| g == global)
    }
}

/// The undecomposed mesh description.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GlobalMesh {
    pub face_count: usize,
    pub edge_count: EdgeCount,
    /// Physical patches with global edge labels.
    pub boundaries: Boundaries,
    /// Global edge -> owner face, one entry per edge.
    pub edge_owner: Vec<usize>,
    /// Internal edge -> neighbour face.
    pub edge_neighbour: Vec<usize>,
}

impl GlobalMesh {
    pub fn from_parts(
        face_count: usize,
        boundaries: Boundaries,
        edge_owner: Vec<usize>,
        edge_neighbour: Vec<usize>,
    ) -> Result<Self, ReconstructionError> {
        let internal = edge_neighbour.len();
        let total = internal + boundaries.values().map(BoundaryPatch::len).sum::<usize>();
        for (name, patch) in &boundaries {
            if let Some(&edge) = patch.edges.iter().find(|&&e| e >= total) {
                return Err(ReconstructionError::AddressOutOfRange {
                    partition: 0,
                    what: format!("global edges of patch `{name}`"),
                    address: edge,
                    len: total,
                });
            }
        }
        Ok(Self {
            face_count,
            edge_count: EdgeCount { internal, total },
            boundaries,
            edge_owner,
            edge_neighbour,
        })
    }

    pub fn load(case_dir: &Path, options: &TokenizerOptions) -> Result<Self, ReconstructError> {
        let boundaries = read_boundaries(&case_dir.join("constant").join("faMesh").join("faBoundary"), options)?;
        let zero = case_dir.join("0");
        let face_count = read_list_count(&zero.join("faFaces"), options)?;
        let edge_owner = read_label_list(&zero.join("edgeOwner"), options)?;
        let edge_neighbour = read_label_list(&zero.join("edgeNeighbour"), options)?;
        Ok(Self::from_parts(face_count, boundaries, edge_owner, edge_neighbour)?)
    }

    pub fn area_layout(&self) -> FieldLayout {
        layout(self.face_count, &self.boundaries)
    }

    pub fn edge_layout(&self) -> FieldLayout {
        layout(self.edge_count.internal, &self.boundaries)
    }

    /// Owner face of global edge `edge`.
    pub fn owner(&self, edge: usize) -> Option<usize> {
        self.edge_owner.get(edge).copied()
    }

    /// Neighbour face of global edge `edge`; `None` for boundary edges.
    pub fn neighbour(&self, edge: usize) -> Option<usize> {
        self.edge_neighbour.get(edge).copied()
    }
}

/// Global mesh plus every partition, in ascending rank order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaseMesh {
    pub global: GlobalMesh,
    pub partitions: Vec<PartitionMesh>,
}

impl CaseMesh {
    /// Check every partition address against the global sizes.
    pub fn new(global: GlobalMesh, partitions: Vec<PartitionMesh>) -> Result<Self, ReconstructionError> {
        if partitions.is_empty() {
            return Err(ReconstructionError::PartitionCount("no partitions".into()));
        }
        for (i, part) in partitions.iter().enumerate() {
            if part.rank != i {
                return Err(ReconstructionError::PartitionCount(format!(
                    "partition at position {i} has rank {}",
                    part.rank
                )));
            }
            check_addresses(part.rank, "face addressing", &part.face_addr, global.face_count)?;
            check_addresses(part.rank, "edge addressing", &part.edge_addr, global.edge_count.total)?;
        }
        Ok(Self { global, partitions })
    }

    /// Load the global mesh and all `processor<N>` partitions under `case_dir`.
    pub fn load(case_dir: &Path, options: &TokenizerOptions) -> Result<Self, ReconstructError> {
        let count = discover_partitions(case_dir)?;
        let global = GlobalMesh::load(case_dir, options)?;
        let partitions = (0..count)
            .map(|rank| PartitionMesh::load(case_dir, rank, options))
            .collect::<Result<Vec<_>, _>>()?;
        log::info!(
            "loaded {} partitions: {} faces, {} edges ({} internal)",
            count,
            global.face_count,
            global.edge_count.total,
            global.edge_count.internal
        );
        Ok(Self::new(global, partitions)?)
    }
}

fn check_addresses(partition: usize, what: &str, addr: &[usize], len: usize) -> Result<(), ReconstructionError> {
    match addr.iter().find(|&&a| a >= len) {
        Some(&address) => Err(ReconstructionError::AddressOutOfRange {
            partition,
            what: what.to_string(),
            address,
            len,
        }),
        None => Ok(()),
    }
}

fn layout(internal: usize, boundaries: &Boundaries) -> FieldLayout {
    FieldLayout {
        internal,
        patches: boundaries.iter().map(|(name, p)| (name.clone(), p.len())).collect(),
    }
}

/// Directory of partition `rank`.
pub fn processor_dir(case_dir: &Path, rank: usize) -> PathBuf {
    case_dir.join(format!("processor{rank}"))
}

/// Number of partitions: highest `processor<N>` directory plus one. Gaps in
/// the numbering are an error.
pub fn discover_partitions(case_dir: &Path) -> Result<usize, ReconstructError> {
    let entries = std::fs::read_dir(case_dir).map_err(|e| ReconstructError::io(case_dir, e))?;
    let mut ranks = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ReconstructError::io(case_dir, e))?;
        if !entry.path().is_dir() {
            continue;
        }
        let name = entry.file_name();
        if let Some(rank) = name
            .to_str()
            .and_then(|n| n.strip_prefix("processor"))
            .and_then(|n| n.parse::<usize>().ok())
        {
            ranks.push(rank);
        }
    }
    ranks.sort_unstable();
    let Some(&highest) = ranks.last() else {
        return Err(ReconstructionError::PartitionCount(format!(
            "no processor directories in {}",
            case_dir.display()
        ))
        .into());
    };
    if let Some(missing) = (0..=highest).find(|r| ranks.binary_search(r).is_err()) {
        return Err(ReconstructionError::PartitionCount(format!(
            "processor{missing} is missing but processor{highest} exists"
        ))
        .into());
    }
    Ok(highest + 1)
}

/// Read a `faBoundary` file.
pub fn read_boundaries(path: &Path, options: &TokenizerOptions) -> Result<Boundaries, ReconstructError> {
    let dict = read_dictionary(path, options)?;
    boundaries_from_dict(&dict).map_err(|e| ReconstructError::decode(path, e))
}

/// Decode the counted list of `name { type ..; edgeLabels ..; }` entries.
pub fn boundaries_from_dict(dict: &Dict) -> Result<Boundaries, DecodeError> {
    let (declared, items) = dict
        .counted_list(None)
        .ok_or_else(|| DecodeError::MissingEntry("boundary list".into()))?;
    let mut boundaries = Boundaries::new();
    let mut iter = items.iter();
    while let Some(item) = iter.next() {
        let name = item.as_atom().ok_or_else(|| DecodeError::InvalidValue {
            entry: "boundary list".into(),
            reason: format!("expected a patch name, found {}", describe(item)),
        })?;
        let body = iter
            .next()
            .and_then(Value::as_dict)
            .ok_or_else(|| DecodeError::MissingEntry(format!("{name} dictionary")))?;
        boundaries.insert(name.to_string(), patch_from_dict(name, body)?);
    }
    if boundaries.len() != declared {
        return Err(DecodeError::WrongElementCount {
            entry: "boundary list".into(),
            expected: declared,
            found: boundaries.len(),
        });
    }
    Ok(boundaries)
}

fn patch_from_dict(name: &str, body: &Dict) -> Result<BoundaryPatch, DecodeError> {
    let entry = format!("{name}/edgeLabels");
    let kind = body.get_atom("type").unwrap_or("patch");
    let labels: &[Value] = match body.counted_list(None) {
        Some((declared, labels)) if declared == labels.len() => labels,
        Some((declared, labels)) => {
            return Err(DecodeError::WrongElementCount {
                entry,
                expected: declared,
                found: labels.len(),
            });
        }
        // `edgeLabels 0()` carries its (empty) list directly
        None => body
            .get("edgeLabels")
            .and_then(Value::as_list)
            .ok_or_else(|| DecodeError::MissingEntry(entry.clone()))?,
    };
    let edges = labels
        .iter()
        .map(|v| {
            v.as_label().ok_or_else(|| DecodeError::InvalidValue {
                entry: entry.clone(),
                reason: format!("expected an edge label, found {}", describe(v)),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(BoundaryPatch::new(kind, edges))
}
