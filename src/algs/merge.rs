//! Field merger: scatter per-partition fields into global fields.
//!
//! A [`MergePlan`] is built once per case from the addressing alone. It
//! records, for every global face, edge and physical-patch position, which
//! partition supplies the value and where in that partition's field it
//! lives. Building the plan proves coverage: every global slot is written
//! exactly once, except edges on a partition cut, which both neighbours
//! write through their processor patches. Partitions are visited in
//! ascending rank, so the higher rank keeps a cut edge.

use crate::data::field::{BoundaryKind, BoundaryValue, Field, FieldElement, FieldValues};
use crate::data::global_field::GlobalField;
use crate::mesh_error::ReconstructionError;
use crate::partitioning::addressing::{CaseMesh, PartitionMesh, is_processor_patch};
use indexmap::IndexMap;

/// Where a partition holds the value of one global slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Source {
    /// Internal element with this local index.
    Internal(usize),
    /// Position `position` of physical patch number `patch`.
    Patch { patch: usize, position: usize },
    /// Position `position` of processor patch number `patch`.
    Shared { patch: usize, position: usize },
}

/// Slot sources for a whole case.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MergePlan {
    faces: Vec<(usize, Source)>,
    edges: Vec<(usize, Source)>,
    internal_edges: usize,
    patches: IndexMap<String, Vec<(usize, Source)>>,
}

impl MergePlan {
    /// Derive the plan from `mesh`, checking coverage of every global slot.
    pub fn new(mesh: &CaseMesh) -> Result<Self, ReconstructionError> {
        let global = &mesh.global;

        let mut faces = GlobalField::new("faces", global.face_count);
        for part in &mesh.partitions {
            for (local, &g) in part.face_addr.iter().enumerate() {
                faces.write(part.rank, g, Source::Internal(local))?;
            }
        }

        let mut edges = GlobalField::new("edges", global.edge_count.total);
        for part in &mesh.partitions {
            for (local, &g) in part.edge_addr.iter().take(part.edge_count.internal).enumerate() {
                edges.write(part.rank, g, Source::Internal(local))?;
            }
            for (k, (name, patch)) in part.boundaries.iter().enumerate() {
                let shared = is_processor_patch(name, patch);
                for (position, &local) in patch.edges.iter().enumerate() {
                    let g = global_edge(part, local)?;
                    if shared {
                        let source = Source::Shared { patch: k, position };
                        match edges.get(g) {
                            Some((_, Source::Shared { .. })) => edges.overwrite(part.rank, g, source)?,
                            _ => edges.write(part.rank, g, source)?,
                        }
                    } else {
                        edges.write(part.rank, g, Source::Patch { patch: k, position })?;
                    }
                }
            }
        }

        let mut patches = IndexMap::with_capacity(global.boundaries.len());
        for (name, global_patch) in &global.boundaries {
            let mut slots = GlobalField::new(format!("patch `{name}`"), global_patch.len());
            for part in &mesh.partitions {
                let Some((k, _, patch)) = part.boundaries.get_full(name) else {
                    continue;
                };
                for (position, &local) in patch.edges.iter().enumerate() {
                    let g = global_edge(part, local)?;
                    let index = global_patch.edges.iter().position(|&e| e == g).ok_or_else(|| {
                        ReconstructionError::UnknownBoundaryEdge {
                            partition: part.rank,
                            patch: name.clone(),
                            edge: g,
                        }
                    })?;
                    slots.write(part.rank, index, Source::Patch { patch: k, position })?;
                }
            }
            patches.insert(name.clone(), slots.into_entries()?);
        }

        for part in &mesh.partitions {
            for (name, patch) in &part.boundaries {
                if !is_processor_patch(name, patch) && !global.boundaries.contains_key(name) {
                    return Err(ReconstructionError::ShapeMismatch {
                        partition: part.rank,
                        reason: format!("patch `{name}` is not a patch of the undecomposed mesh"),
                    });
                }
            }
        }

        Ok(Self {
            faces: faces.into_entries()?,
            edges: edges.into_entries()?,
            internal_edges: global.edge_count.internal,
            patches,
        })
    }

    /// Partition whose value global edge `edge` keeps.
    pub fn edge_writer(&self, edge: usize) -> Option<usize> {
        self.edges.get(edge).map(|(p, _)| *p)
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

fn global_edge(part: &PartitionMesh, local: usize) -> Result<usize, ReconstructionError> {
    part.edge_addr
        .get(local)
        .copied()
        .ok_or_else(|| ReconstructionError::AddressOutOfRange {
            partition: part.rank,
            what: "local edges".into(),
            address: local,
            len: part.edge_addr.len(),
        })
}

/// Merge area (per-face) fields, one per partition in rank order.
///
/// Processor patches never reach the output; physical patches follow the
/// undecomposed patch order.
pub fn merge_area_field<T: FieldElement>(
    plan: &MergePlan,
    mesh: &CaseMesh,
    fields: &[Field<T>],
) -> Result<Field<T>, ReconstructionError> {
    check_inputs(mesh, fields, |p| p.face_count)?;

    let internal = plan
        .faces
        .iter()
        .map(|&(p, source)| lookup(mesh, fields, p, source))
        .collect::<Result<Vec<_>, _>>()?;

    let mut boundary = IndexMap::with_capacity(plan.patches.len());
    for (name, slots) in &plan.patches {
        let kind = patch_kind(fields, name)?;
        let value = match kind {
            BoundaryKind::ZeroGradient => None,
            _ => patch_values(slots, |p, source| lookup(mesh, fields, p, source), &kind)?,
        };
        boundary.insert(name.clone(), BoundaryValue { kind, value });
    }

    Ok(Field {
        dimensions: fields[0].dimensions,
        internal: FieldValues::NonUniform(internal),
        boundary,
    })
}

/// Assemble the full global edge array (internal edges first, then every
/// physical patch edge) from edge fields, one per partition in rank order.
pub fn assemble_edges<T: FieldElement>(
    plan: &MergePlan,
    mesh: &CaseMesh,
    fields: &[Field<T>],
) -> Result<Vec<T>, ReconstructionError> {
    check_inputs(mesh, fields, |p| p.edge_count.internal)?;
    plan.edges
        .iter()
        .map(|&(p, source)| lookup(mesh, fields, p, source))
        .collect()
}

/// Merge edge fields. Physical patch values are read back from the global
/// edge array at each patch's global edge labels.
pub fn merge_edge_field<T: FieldElement>(
    plan: &MergePlan,
    mesh: &CaseMesh,
    fields: &[Field<T>],
) -> Result<Field<T>, ReconstructionError> {
    let all = assemble_edges(plan, mesh, fields)?;

    let mut boundary = IndexMap::with_capacity(mesh.global.boundaries.len());
    for (name, patch) in &mesh.global.boundaries {
        let kind = patch_kind(fields, name)?;
        let value = match kind {
            BoundaryKind::ZeroGradient => None,
            _ => Some(FieldValues::NonUniform(
                patch
                    .edges
                    .iter()
                    .map(|&g| {
                        all.get(g).copied().ok_or_else(|| ReconstructionError::AddressOutOfRange {
                            partition: 0,
                            what: format!("global edges of patch `{name}`"),
                            address: g,
                            len: all.len(),
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?,
            )),
        };
        boundary.insert(name.clone(), BoundaryValue { kind, value });
    }

    let mut internal = all;
    internal.truncate(plan.internal_edges);
    Ok(Field {
        dimensions: fields[0].dimensions,
        internal: FieldValues::NonUniform(internal),
        boundary,
    })
}

fn check_inputs<T: FieldElement>(
    mesh: &CaseMesh,
    fields: &[Field<T>],
    internal_len: impl Fn(&PartitionMesh) -> usize,
) -> Result<(), ReconstructionError> {
    if fields.len() != mesh.partitions.len() {
        return Err(ReconstructionError::PartitionCount(format!(
            "{} partition fields for {} partitions",
            fields.len(),
            mesh.partitions.len()
        )));
    }
    let Some(first) = fields.first() else {
        return Err(ReconstructionError::PartitionCount("no partition fields".into()));
    };
    let dims = first.dimensions;
    for (part, field) in mesh.partitions.iter().zip(fields) {
        let mismatch = |reason: String| ReconstructionError::ShapeMismatch {
            partition: part.rank,
            reason,
        };
        if field.dimensions != dims {
            return Err(mismatch(format!(
                "dimensions {} differ from {} of partition 0",
                field.dimensions, dims
            )));
        }
        let want = internal_len(part);
        if let Some(len) = field.internal.explicit_len().filter(|&len| len != want) {
            return Err(mismatch(format!("{len} internal values for {want} elements")));
        }
        for (name, patch) in &part.boundaries {
            let Some(bv) = field.boundary.get(name) else {
                return Err(mismatch(format!("field has no patch `{name}`")));
            };
            if let Some(len) = bv.value.as_ref().and_then(FieldValues::explicit_len) {
                if len != patch.len() {
                    return Err(mismatch(format!("{len} values on patch `{name}` of {} edges", patch.len())));
                }
            }
        }
    }
    Ok(())
}

fn lookup<T: FieldElement>(
    mesh: &CaseMesh,
    fields: &[Field<T>],
    partition: usize,
    source: Source,
) -> Result<T, ReconstructionError> {
    let field = &fields[partition];
    let missing = |what: String| ReconstructionError::ShapeMismatch { partition, reason: what };
    match source {
        Source::Internal(i) => field
            .internal
            .get(i)
            .ok_or_else(|| missing(format!("no internal value {i}"))),
        Source::Patch { patch, position } | Source::Shared { patch, position } => {
            let name = mesh.partitions[partition]
                .boundaries
                .get_index(patch)
                .map(|(name, _)| name.as_str())
                .unwrap_or_default();
            field
                .boundary
                .get(name)
                .and_then(|bv| bv.value.as_ref())
                .and_then(|v| v.get(position))
                .ok_or_else(|| missing(format!("no value {position} on patch `{name}`")))
        }
    }
}

/// Boundary condition of a global patch: the first physical kind any
/// partition reports for it.
fn patch_kind<T>(fields: &[Field<T>], name: &str) -> Result<BoundaryKind, ReconstructionError> {
    fields
        .iter()
        .filter_map(|f| f.boundary.get(name))
        .map(|bv| bv.kind.clone())
        .find(|k| *k != BoundaryKind::ProcessorLink)
        .ok_or_else(|| ReconstructionError::MissingPatch(name.to_string()))
}

fn patch_values<T: FieldElement>(
    slots: &[(usize, Source)],
    mut get: impl FnMut(usize, Source) -> Result<T, ReconstructionError>,
    kind: &BoundaryKind,
) -> Result<Option<FieldValues<T>>, ReconstructionError> {
    let mut values = Vec::with_capacity(slots.len());
    for &(p, source) in slots {
        match get(p, source) {
            Ok(v) => values.push(v),
            Err(e) if kind.requires_value() => return Err(e),
            Err(_) => return Ok(None),
        }
    }
    Ok(Some(FieldValues::NonUniform(values)))
}
