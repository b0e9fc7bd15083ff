//! Shared-boundary reconciler.
//!
//! Two passes, both driven by the undecomposed mesh:
//!
//! 1. [`correct_boundary_addressing`] repairs the global address of every
//!    partition boundary edge by matching edge centres (`ec`) against the
//!    undecomposed centres. Physical patch edges are matched within the same
//!    global patch; processor patch edges against the internal global edges
//!    that partition boundaries refer to.
//! 2. [`SharedEdgeMap::build`] decides, for every edge of a
//!    `procBoundary<i>to<j>` patch with `i < j`, whether partition `i` or `j`
//!    holds the global owner face. [`SharedEdgeMap::apply_flux_signs`] then
//!    negates a merged flux wherever the partition whose value was kept is
//!    not that owner, restoring the owner -> neighbour sign convention.
//!
//! Failures in either pass are diagnostics, never errors: the edge keeps its
//! address or value and is counted.

use crate::algs::merge::MergePlan;
use crate::data::field::{Field, FieldElement, FieldValues, Vector3};
use crate::mesh_error::ReconciliationError;
use crate::partitioning::addressing::{CaseMesh, GlobalMesh, PartitionMesh};
use std::collections::HashMap;

type CentreKey = (i64, i64, i64);

fn centre_key(c: Vector3, precision: usize) -> CentreKey {
    let scale = 10f64.powi(precision.min(15) as i32);
    let q = |v: f64| (v * scale).round() as i64;
    (q(c.x), q(c.y), q(c.z))
}

/// Outcome of [`correct_boundary_addressing`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CentreCorrection {
    /// Boundary edges whose global address changed.
    pub corrected: usize,
    /// Boundary edges without a matching global centre.
    pub diagnostics: Vec<ReconciliationError>,
}

/// Rewrite the global address of partition boundary edges by edge-centre
/// matching. `global_ec` is the undecomposed `ec` field, `partition_ec` the
/// partition `ec` fields in rank order.
pub fn correct_boundary_addressing(
    mesh: &mut CaseMesh,
    global_ec: &Field<Vector3>,
    partition_ec: &[Field<Vector3>],
    precision: usize,
) -> CentreCorrection {
    let internal = mesh.global.edge_count.internal;

    let mut internal_lookup: HashMap<CentreKey, usize> = HashMap::new();
    let mut candidates: Vec<usize> = mesh
        .partitions
        .iter()
        .flat_map(|part| {
            part.boundaries
                .values()
                .flat_map(|patch| patch.edges.iter())
                .filter_map(|&l| part.edge_addr.get(l).copied())
        })
        .filter(|&g| g < internal)
        .collect();
    candidates.sort_unstable();
    candidates.dedup();
    for g in candidates {
        if let Some(c) = global_ec.internal.get(g) {
            internal_lookup.entry(centre_key(c, precision)).or_insert(g);
        }
    }

    let mut patch_lookup: HashMap<&str, HashMap<CentreKey, usize>> = HashMap::new();
    for (name, patch) in &mesh.global.boundaries {
        let Some(values) = global_ec.boundary.get(name).and_then(|bv| bv.value.as_ref()) else {
            continue;
        };
        let lookup = patch_lookup.entry(name.as_str()).or_default();
        for (i, &g) in patch.edges.iter().enumerate() {
            if let Some(c) = values.get(i) {
                lookup.entry(centre_key(c, precision)).or_insert(g);
            }
        }
    }

    let mut outcome = CentreCorrection::default();
    let mut updates: Vec<(usize, usize, usize)> = Vec::new();
    for (part, ec) in mesh.partitions.iter().zip(partition_ec) {
        for (name, patch) in &part.boundaries {
            let values = ec.boundary.get(name).and_then(|bv| bv.value.as_ref());
            let lookup = patch_lookup.get(name.as_str()).unwrap_or(&internal_lookup);
            for (i, &local) in patch.edges.iter().enumerate() {
                let found = values
                    .and_then(|v| v.get(i))
                    .and_then(|c| lookup.get(&centre_key(c, precision)).copied());
                match found {
                    Some(g) => updates.push((part.rank, local, g)),
                    None => outcome.diagnostics.push(ReconciliationError::NoCenterMatch {
                        partition: part.rank,
                        patch: name.clone(),
                        local,
                    }),
                }
            }
        }
    }

    for (rank, local, g) in updates {
        if let Some(slot) = mesh.partitions.get_mut(rank).and_then(|p| p.edge_addr.get_mut(local)) {
            if *slot != g {
                log::debug!("processor{rank}: boundary edge {local} readdressed {} -> {g}", *slot);
                *slot = g;
                outcome.corrected += 1;
            }
        }
    }
    outcome
}

/// Which side of a cut holds the global owner face of an edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FirstOwner {
    /// The lower-ranked partition `i` of `procBoundary<i>to<j>`.
    Lower,
    /// The higher-ranked partition `j`.
    Upper,
    /// Neither partition holds the global owner or neighbour.
    Unresolved,
}

/// One edge on a partition cut.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SharedEdge {
    pub patch: String,
    pub global: usize,
    pub lower: usize,
    pub upper: usize,
    pub first_owner: FirstOwner,
}

impl SharedEdge {
    /// Partition holding the global owner face, if resolved.
    pub fn owner_partition(&self) -> Option<usize> {
        match self.first_owner {
            FirstOwner::Lower => Some(self.lower),
            FirstOwner::Upper => Some(self.upper),
            FirstOwner::Unresolved => None,
        }
    }
}

/// Every cut edge of a case with its first owner.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SharedEdgeMap {
    edges: Vec<SharedEdge>,
    diagnostics: Vec<ReconciliationError>,
}

impl SharedEdgeMap {
    /// Classify the edges of every `procBoundary<i>to<j>` patch with `i < j`.
    pub fn build(mesh: &CaseMesh) -> Self {
        let mut map = Self::default();
        for part in &mesh.partitions {
            for (name, from, to, patch) in part.processor_patches() {
                if from >= to {
                    continue;
                }
                for &local in &patch.edges {
                    let Some(global) = part.edge_addr.get(local).copied() else {
                        continue;
                    };
                    let first_owner = first_owner(part, local, global, &mesh.global);
                    if first_owner == FirstOwner::Unresolved {
                        map.diagnostics.push(ReconciliationError::OwnerMismatch {
                            patch: name.to_string(),
                            edge: global,
                        });
                    }
                    map.edges.push(SharedEdge {
                        patch: name.to_string(),
                        global,
                        lower: from,
                        upper: to,
                        first_owner,
                    });
                }
            }
        }
        map
    }

    pub fn edges(&self) -> &[SharedEdge] {
        &self.edges
    }

    pub fn diagnostics(&self) -> &[ReconciliationError] {
        &self.diagnostics
    }

    /// Number of cut edges whose owner could not be determined.
    pub fn unresolved_count(&self) -> usize {
        self.diagnostics.len()
    }

    /// Negate the merged internal value of every cut edge whose kept value
    /// came from the partition that is not the first owner. Returns the
    /// number of values negated. Uniform fields are left alone.
    pub fn apply_flux_signs<T: FieldElement>(&self, plan: &MergePlan, field: &mut Field<T>) -> usize {
        let FieldValues::NonUniform(values) = &mut field.internal else {
            return 0;
        };
        let mut negated = 0;
        for edge in &self.edges {
            let Some(owner) = edge.owner_partition() else {
                continue;
            };
            if plan.edge_writer(edge.global) == Some(owner) {
                continue;
            }
            if let Some(v) = values.get_mut(edge.global) {
                *v = v.negated();
                negated += 1;
            }
        }
        negated
    }
}

/// Side of the cut holding the global owner of `global`, seen from `part`,
/// the lower partition of the cut.
fn first_owner(part: &PartitionMesh, local: usize, global: usize, mesh: &GlobalMesh) -> FirstOwner {
    let owner = mesh.owner(global);
    let neighbour = mesh.neighbour(global);

    let reported = part
        .edge_owner
        .as_ref()
        .and_then(|o| o.get(local))
        .and_then(|&f| part.face_addr.get(f).copied());
    if let Some(face) = reported {
        if Some(face) == owner {
            return FirstOwner::Lower;
        }
        if Some(face) == neighbour {
            return FirstOwner::Upper;
        }
    }

    // partition owner files are unreliable on boundaries: locate by membership
    if owner.is_some_and(|f| part.local_face(f).is_some()) {
        FirstOwner::Lower
    } else if neighbour.is_some_and(|f| part.local_face(f).is_some()) {
        FirstOwner::Upper
    } else {
        FirstOwner::Unresolved
    }
}
