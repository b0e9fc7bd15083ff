#![allow(dead_code)]
//! On-disk fixture: a four-face strip decomposed into two partitions.
//!
//! ```text
//!   inlet  f0  e0  f1 | e1 |  f2  e2  f3  outlet
//!    e3     processor0     processor1      e4
//! ```
//!
//! The cut edge `e1` is owned by `f1` (partition 0). Partition 1 stores its
//! flux with the opposite orientation, so `Q` reads `2.5` on partition 0 and
//! `-2.5` on partition 1.

use std::fs;
use std::path::Path;
use tempfile::TempDir;

pub const CENTRES: [(f64, f64, f64); 5] = [
    (1.0, 0.5, 0.0),
    (2.0, 0.5, 0.0),
    (3.0, 0.5, 0.0),
    (0.0, 0.5, 0.0),
    (4.0, 0.5, 0.0),
];

pub struct Fixture {
    pub times: Vec<&'static str>,
    /// Write partition 0's boundary edge addresses in the wrong order.
    pub swapped_addressing: bool,
    pub edge_centres: bool,
}

impl Default for Fixture {
    fn default() -> Self {
        Self {
            times: vec!["0.5", "1"],
            swapped_addressing: false,
            edge_centres: true,
        }
    }
}

pub fn foam_file(class: &str, location: &str, object: &str, body: &str) -> String {
    format!(
        "/*--------------------------------*- C++ -*----------------------------------*\\\n\
  test fixture\n\
\\*---------------------------------------------------------------------------*/\n\
FoamFile\n\
{{\n\
    version     2.0;\n\
    format      ascii;\n\
    class       {class};\n\
    location    \"{location}\";\n\
    object      {object};\n\
}}\n\
// * * * * * * * * * * * * * * * * * * * * * * * * * * * * * * * * * * * * * //\n\
\n\
{body}\n\
\n\
// ************************************************************************* //\n"
    )
}

pub fn label_list(labels: &[usize]) -> String {
    let items: Vec<String> = labels.iter().map(usize::to_string).collect();
    format!("{}\n(\n{}\n)\n", labels.len(), items.join("\n"))
}

fn write(path: &Path, text: String) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, text).unwrap();
}

fn vector(c: (f64, f64, f64)) -> String {
    format!("({} {} {})", c.0, c.1, c.2)
}

fn vector_list(edges: &[usize]) -> String {
    let items: Vec<String> = edges.iter().map(|&e| vector(CENTRES[e])).collect();
    format!("List<vector> {}({})", edges.len(), items.join(" "))
}

/// `faBoundary` text for `(name, type, edges)` patches.
pub fn fa_boundary(patches: &[(&str, &str, &[usize])]) -> String {
    let mut body = format!("{}\n(\n", patches.len());
    for (name, kind, edges) in patches {
        let labels: Vec<String> = edges.iter().map(usize::to_string).collect();
        body.push_str(&format!(
            "    {name}\n    {{\n        type            {kind};\n        edgeLabels      List<label> {}({});\n        ngbPolyPatchIndex -1;\n    }}\n",
            edges.len(),
            labels.join(" ")
        ));
    }
    body.push_str(")\n");
    foam_file("faBoundaryMesh", "constant/faMesh", "faBoundary", &body)
}

/// `(name, type, value entry)` boundary patches of a field file.
fn field(class: &str, location: &str, object: &str, dims: &str, internal: &str, patches: &[(&str, &str, Option<&str>)]) -> String {
    let mut body = format!("dimensions      {dims};\n\ninternalField   {internal};\n\nboundaryField\n{{\n");
    for (name, kind, value) in patches {
        body.push_str(&format!("    {name}\n    {{\n        type            {kind};\n"));
        if let Some(value) = value {
            body.push_str(&format!("        value           {value};\n"));
        }
        body.push_str("    }\n");
    }
    body.push_str("}\n");
    foam_file(class, location, object, &body)
}

/// Write the two-partition case under a fresh temporary directory.
pub fn two_partition_case(fixture: &Fixture) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    write(
        &root.join("constant/faMesh/faBoundary"),
        fa_boundary(&[("inlet", "patch", &[3]), ("outlet", "patch", &[4])]),
    );
    write(
        &root.join("0/faFaces"),
        foam_file("faceList", "0", "faFaces", "4\n(\n2(0 1)\n2(1 2)\n2(2 3)\n2(3 4)\n)\n"),
    );
    write(&root.join("0/edgeOwner"), foam_file("labelList", "0", "edgeOwner", &label_list(&[0, 1, 2, 0, 3])));
    write(&root.join("0/edgeNeighbour"), foam_file("labelList", "0", "edgeNeighbour", &label_list(&[1, 2, 3])));
    if fixture.edge_centres {
        write(
            &root.join("0/ec"),
            field(
                "edgeVectorField",
                "0",
                "ec",
                "[0 1 0 0 0 0 0]",
                &format!("nonuniform {}", vector_list(&[0, 1, 2])),
                &[
                    ("inlet", "calculated", Some(format!("nonuniform {}", vector_list(&[3])).as_str())),
                    ("outlet", "calculated", Some(format!("nonuniform {}", vector_list(&[4])).as_str())),
                ],
            ),
        );
    }

    let p0_addr: &[usize] = if fixture.swapped_addressing { &[0, 1, 3] } else { &[0, 3, 1] };
    let partitions: [(&str, &[usize], &[usize], &[usize], [(&str, &str, &[usize]); 3]); 2] = [
        (
            "processor0",
            &[0, 1],
            p0_addr,
            &[0, 0, 1],
            [
                ("inlet", "patch", &[1]),
                ("outlet", "patch", &[]),
                ("procBoundary0to1", "processor", &[2]),
            ],
        ),
        (
            "processor1",
            &[2, 3],
            &[2, 4, 1],
            &[0, 1, 0],
            [
                ("inlet", "patch", &[]),
                ("outlet", "patch", &[1]),
                ("procBoundary1to0", "processor", &[2]),
            ],
        ),
    ];

    // true global edges of every local edge, for the centre fields
    let true_edges: [&[usize]; 2] = [&[0, 3, 1], &[2, 4, 1]];

    for (rank, (name, faces, edges, owner, patches)) in partitions.iter().enumerate() {
        let p = root.join(name);
        write(&p.join("constant/faMesh/faBoundary"), fa_boundary(patches));
        write(
            &p.join("constant/faMesh/faceProcAddressing"),
            foam_file("labelList", "constant/faMesh", "faceProcAddressing", &label_list(faces)),
        );
        write(
            &p.join("constant/faMesh/edgeProcAddressing"),
            foam_file("labelList", "constant/faMesh", "edgeProcAddressing", &label_list(edges)),
        );
        write(&p.join("0/edgeOwner"), foam_file("labelList", "0", "edgeOwner", &label_list(owner)));

        if fixture.edge_centres {
            let local_to_global = true_edges[rank];
            let entries: Vec<(&str, &str, String)> = patches
                .iter()
                .map(|(patch, kind, local)| {
                    let kind = if *kind == "processor" { "processor" } else { "calculated" };
                    let globals: Vec<usize> = local.iter().map(|&l| local_to_global[l]).collect();
                    (*patch, kind, format!("nonuniform {}", vector_list(&globals)))
                })
                .collect();
            let refs: Vec<(&str, &str, Option<&str>)> =
                entries.iter().map(|(n, k, v)| (*n, *k, Some(v.as_str()))).collect();
            write(
                &p.join("0/ec"),
                field(
                    "edgeVectorField",
                    "0",
                    "ec",
                    "[0 1 0 0 0 0 0]",
                    &format!("nonuniform {}", vector_list(&local_to_global[..1])),
                    &refs,
                ),
            );
        }

        for time in &fixture.times {
            write_time(&p.join(time), rank, time);
        }
    }
    dir
}

fn write_time(dir: &Path, rank: usize, time: &str) {
    let proc_patch = if rank == 0 { "procBoundary0to1" } else { "procBoundary1to0" };
    let (h_internal, h_inlet, h_proc, q_internal, q_inlet, q_outlet, q_proc) = match rank {
        0 => (
            "nonuniform List<scalar> 2(1 2)",
            "uniform 1",
            "nonuniform List<scalar> 1(3)",
            "nonuniform List<scalar> 1(0.5)",
            "nonuniform List<scalar> 1(-1)",
            "nonuniform List<scalar> 0()",
            "nonuniform List<scalar> 1(2.5)",
        ),
        _ => (
            "nonuniform List<scalar>\n2\n(\n3\n4\n)\n",
            "nonuniform List<scalar> 0()",
            "nonuniform List<scalar> 1(2)",
            "nonuniform List<scalar> 1(1.5)",
            "nonuniform List<scalar> 0()",
            "nonuniform List<scalar> 1(4)",
            "nonuniform List<scalar> 1(-2.5)",
        ),
    };
    write(
        &dir.join("h"),
        field(
            "areaScalarField",
            time,
            "h",
            "[0 1 0 0 0 0 0]",
            h_internal,
            &[
                ("inlet", "fixedValue", Some(h_inlet)),
                ("outlet", "zeroGradient", None),
                (proc_patch, "processor", Some(h_proc)),
            ],
        ),
    );
    write(
        &dir.join("Us"),
        field(
            "areaVectorField",
            time,
            "Us",
            "[0 1 -1 0 0 0 0]",
            "uniform (1 0 0)",
            &[
                ("inlet", "fixedValue", Some("uniform (1 0 0)")),
                ("outlet", "zeroGradient", None),
                (proc_patch, "processor", Some("uniform (1 0 0)")),
            ],
        ),
    );
    write(
        &dir.join("Q"),
        field(
            "edgeScalarField",
            time,
            "Q",
            "[0 3 -1 0 0 0 0]",
            q_internal,
            &[
                ("inlet", "calculated", Some(q_inlet)),
                ("outlet", "calculated", Some(q_outlet)),
                (proc_patch, "processor", Some(q_proc)),
            ],
        ),
    );
}
