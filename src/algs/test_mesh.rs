//! Four faces in a strip, split into two partitions of two faces.
//!
//! ```text
//!   inlet  f0  e0  f1 | e1 |  f2  e2  f3  outlet
//!    e3     processor0     processor1      e4
//! ```
//!
//! Edge `e1` lies on the cut; its global owner `f1` is in partition 0.

use crate::data::field::{BoundaryKind, BoundaryValue, Field, FieldDimensions, FieldElement, FieldValues, Vector3};
use crate::partitioning::addressing::{BoundaryPatch, Boundaries, CaseMesh, GlobalMesh, PartitionMesh, is_processor_patch};
use indexmap::IndexMap;

pub(crate) const CENTRES: [Vector3; 5] = [
    Vector3::new(1.0, 0.5, 0.0),
    Vector3::new(2.0, 0.5, 0.0),
    Vector3::new(3.0, 0.5, 0.0),
    Vector3::new(0.0, 0.5, 0.0),
    Vector3::new(4.0, 0.5, 0.0),
];

fn patches(list: &[(&str, &str, Vec<usize>)]) -> Boundaries {
    list.iter()
        .map(|(name, kind, edges)| (name.to_string(), BoundaryPatch::new(*kind, edges.clone())))
        .collect()
}

pub(crate) fn two_partitions() -> CaseMesh {
    let global = GlobalMesh::from_parts(
        4,
        patches(&[("inlet", "patch", vec![3]), ("outlet", "patch", vec![4])]),
        vec![0, 1, 2, 0, 3],
        vec![1, 2, 3],
    )
    .unwrap();
    let p0 = PartitionMesh::from_parts(
        0,
        patches(&[
            ("inlet", "patch", vec![1]),
            ("outlet", "patch", vec![]),
            ("procBoundary0to1", "processor", vec![2]),
        ]),
        vec![0, 1],
        vec![0, 3, 1],
        Some(vec![0, 0, 1]),
    )
    .unwrap();
    let p1 = PartitionMesh::from_parts(
        1,
        patches(&[
            ("inlet", "patch", vec![]),
            ("outlet", "patch", vec![1]),
            ("procBoundary1to0", "processor", vec![2]),
        ]),
        vec![2, 3],
        vec![2, 4, 1],
        Some(vec![0, 1, 0]),
    )
    .unwrap();
    CaseMesh::new(global, vec![p0, p1]).unwrap()
}

/// Edge field of partition `rank`: `calculated` physical patches and
/// processor patches with the given values.
pub(crate) fn edge_field(mesh: &CaseMesh, rank: usize, internal: Vec<f64>, values: &[(&str, Vec<f64>)]) -> Field<f64> {
    let part = &mesh.partitions[rank];
    let boundary = values
        .iter()
        .map(|(name, v)| {
            let kind = match part.boundaries.get(*name) {
                Some(p) if is_processor_patch(name, p) => BoundaryKind::ProcessorLink,
                _ => BoundaryKind::Calculated,
            };
            (name.to_string(), BoundaryValue {
                kind,
                value: Some(FieldValues::NonUniform(v.clone())),
            })
        })
        .collect();
    Field {
        dimensions: FieldDimensions([0, 3, -1, 0, 0, 0, 0]),
        internal: FieldValues::NonUniform(internal),
        boundary,
    }
}

/// Area field of partition `rank` holding `value` everywhere.
pub(crate) fn uniform_area_field<T: FieldElement>(mesh: &CaseMesh, rank: usize, value: T) -> Field<T> {
    let boundary: IndexMap<_, _> = mesh.partitions[rank]
        .boundaries
        .iter()
        .map(|(name, patch)| {
            let kind = if is_processor_patch(name, patch) {
                BoundaryKind::ProcessorLink
            } else if name == "outlet" {
                BoundaryKind::ZeroGradient
            } else {
                BoundaryKind::FixedValue
            };
            let value = (kind != BoundaryKind::ZeroGradient).then_some(FieldValues::Uniform(value));
            (name.clone(), BoundaryValue { kind, value })
        })
        .collect();
    Field {
        dimensions: FieldDimensions::default(),
        internal: FieldValues::Uniform(value),
        boundary,
    }
}

/// `ec` fields consistent with `mesh`: the undecomposed one and one per partition.
pub(crate) fn edge_centres(mesh: &CaseMesh) -> (Field<Vector3>, Vec<Field<Vector3>>) {
    let boundary_of = |boundaries: &Boundaries, addr: Option<&[usize]>| -> IndexMap<String, BoundaryValue<Vector3>> {
        boundaries
            .iter()
            .map(|(name, patch)| {
                let values = patch
                    .edges
                    .iter()
                    .map(|&e| CENTRES[addr.map_or(e, |a| a[e])])
                    .collect();
                (name.clone(), BoundaryValue {
                    kind: BoundaryKind::Calculated,
                    value: Some(FieldValues::NonUniform(values)),
                })
            })
            .collect()
    };
    let internal = mesh.global.edge_count.internal;
    let global = Field {
        dimensions: FieldDimensions([0, 1, 0, 0, 0, 0, 0]),
        internal: FieldValues::NonUniform(CENTRES[..internal].to_vec()),
        boundary: boundary_of(&mesh.global.boundaries, None),
    };
    let partitions = mesh
        .partitions
        .iter()
        .map(|p| Field {
            dimensions: FieldDimensions([0, 1, 0, 0, 0, 0, 0]),
            internal: FieldValues::NonUniform(
                p.edge_addr[..p.edge_count.internal].iter().map(|&g| CENTRES[g]).collect(),
            ),
            boundary: boundary_of(&p.boundaries, Some(p.edge_addr.as_slice())),
        })
        .collect();
    (global, partitions)
}
