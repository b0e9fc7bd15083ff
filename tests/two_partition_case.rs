mod util;

use fa_reconstruct::case::{self, CaseContext};
use fa_reconstruct::data::decode::read_field;
use fa_reconstruct::prelude::*;
use std::path::Path;
use util::{Fixture, two_partition_case};

fn config(case_dir: &Path, out: &Path) -> ReconstructConfig {
    ReconstructConfig::new(case_dir, out)
        .with_field(FieldSpec::area_scalar("h"))
        .with_field(FieldSpec::area_vector("Us"))
        .with_field(FieldSpec::edge_scalar("Q").signed())
}

fn read_back<T: FieldElement>(ctx: &CaseContext, time: &str, name: &str, on_edges: bool) -> Field<T> {
    let layout = match on_edges {
        true => ctx.mesh.global.edge_layout(),
        false => ctx.mesh.global.area_layout(),
    };
    let path = ctx.config.output_dir.join(time).join(name);
    read_field::<T>(&path, &layout, &TokenizerOptions::default()).unwrap()
}

#[test]
fn merges_faces_and_restores_flux_sign() {
    let case_dir = two_partition_case(&Fixture::default());
    let out = tempfile::tempdir().unwrap();
    let summary = case::run(&config(case_dir.path(), out.path())).unwrap();
    assert_eq!(summary.time_steps, 2);
    assert_eq!(summary.fields_written, 6);
    assert_eq!(summary.unresolved_edges, 0);
    assert_eq!(summary.unmatched_centres, 0);

    let ctx = CaseContext::open(config(case_dir.path(), out.path())).unwrap();
    let h: Field<f64> = read_back(&ctx, "1", "h", false);
    assert_eq!(h.internal, FieldValues::NonUniform(vec![1.0, 2.0, 3.0, 4.0]));
    assert_eq!(h.dimensions, FieldDimensions([0, 1, 0, 0, 0, 0, 0]));
    assert_eq!(h.boundary["inlet"].value, Some(FieldValues::NonUniform(vec![1.0])));
    assert_eq!(h.boundary["outlet"].kind, BoundaryKind::ZeroGradient);

    let q: Field<f64> = read_back(&ctx, "1", "Q", true);
    assert_eq!(q.internal, FieldValues::NonUniform(vec![0.5, 2.5, 1.5]));
    assert_eq!(q.boundary["inlet"].value, Some(FieldValues::NonUniform(vec![-1.0])));
    assert_eq!(q.boundary["outlet"].value, Some(FieldValues::NonUniform(vec![4.0])));

    let us: Field<Vector3> = read_back(&ctx, "0.5", "Us", false);
    assert_eq!(us.internal, FieldValues::NonUniform(vec![Vector3::new(1.0, 0.0, 0.0); 4]));
}

#[test]
fn unsigned_edge_field_keeps_higher_rank_value() {
    let case_dir = two_partition_case(&Fixture::default());
    let out = tempfile::tempdir().unwrap();
    let cfg = ReconstructConfig::new(case_dir.path(), out.path()).with_field(FieldSpec::edge_scalar("Q"));
    case::run(&cfg).unwrap();
    let ctx = CaseContext::open(cfg).unwrap();
    let q: Field<f64> = read_back(&ctx, "1", "Q", true);
    assert_eq!(q.internal, FieldValues::NonUniform(vec![0.5, -2.5, 1.5]));
}

#[test]
fn processor_patches_never_reach_output() {
    let case_dir = two_partition_case(&Fixture::default());
    let out = tempfile::tempdir().unwrap();
    case::run(&config(case_dir.path(), out.path())).unwrap();
    for name in ["h", "Us", "Q"] {
        let text = std::fs::read_to_string(out.path().join("1").join(name)).unwrap();
        assert!(!text.contains("procBoundary"), "{name} carries a processor patch");
        assert!(text.contains("location    \"1\";"));
        let dict = parse_dictionary(&text, &TokenizerOptions::default()).unwrap();
        let keys: Vec<_> = dict.get_dict("boundaryField").unwrap().keys().collect();
        assert_eq!(keys, ["inlet", "outlet"]);
    }
}

#[test]
fn reruns_are_byte_identical() {
    let case_dir = two_partition_case(&Fixture::default());
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();
    case::run(&config(case_dir.path(), first.path())).unwrap();
    case::run(&config(case_dir.path(), second.path()).with_workers(2)).unwrap();
    for time in ["0.5", "1"] {
        for name in ["h", "Us", "Q"] {
            let a = std::fs::read(first.path().join(time).join(name)).unwrap();
            let b = std::fs::read(second.path().join(time).join(name)).unwrap();
            assert_eq!(a, b, "{time}/{name}");
        }
    }
}

#[test]
fn edge_centres_repair_swapped_addressing() {
    let fixture = Fixture {
        swapped_addressing: true,
        ..Fixture::default()
    };
    let case_dir = two_partition_case(&fixture);
    let out = tempfile::tempdir().unwrap();
    let ctx = CaseContext::open(config(case_dir.path(), out.path())).unwrap();
    assert_eq!(ctx.mesh.partitions[0].edge_addr, [0, 3, 1]);
    assert_eq!(ctx.unmatched_centres, 0);

    case::run(&config(case_dir.path(), out.path())).unwrap();
    let q: Field<f64> = read_back(&ctx, "1", "Q", true);
    assert_eq!(q.internal, FieldValues::NonUniform(vec![0.5, 2.5, 1.5]));
}

#[test]
fn missing_centre_field_skips_correction() {
    let fixture = Fixture {
        edge_centres: false,
        ..Fixture::default()
    };
    let case_dir = two_partition_case(&fixture);
    let out = tempfile::tempdir().unwrap();
    let summary = case::run(&config(case_dir.path(), out.path())).unwrap();
    assert_eq!(summary.fields_written, 6);
}

#[test]
fn absent_fields_are_disabled() {
    let case_dir = two_partition_case(&Fixture::default());
    let out = tempfile::tempdir().unwrap();
    let cfg = config(case_dir.path(), out.path()).with_field(FieldSpec::area_scalar("pb"));
    let ctx = CaseContext::open(cfg).unwrap();
    let names: Vec<_> = ctx.fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, ["h", "Us", "Q"]);
}

#[test]
fn field_missing_in_one_step_is_skipped() {
    let case_dir = two_partition_case(&Fixture::default());
    std::fs::remove_file(case_dir.path().join("processor1/0.5/h")).unwrap();
    let out = tempfile::tempdir().unwrap();
    let summary = case::run(&config(case_dir.path(), out.path())).unwrap();
    assert_eq!(summary.fields_written, 5);
    assert_eq!(summary.fields_skipped, 1);
    assert!(summary.to_string().contains("1 fields skipped"));
    assert!(!out.path().join("0.5/h").exists());
    assert!(out.path().join("1/h").exists());
}

#[test]
fn gap_in_partitions_is_fatal() {
    let case_dir = two_partition_case(&Fixture::default());
    std::fs::rename(case_dir.path().join("processor1"), case_dir.path().join("processor2")).unwrap();
    let out = tempfile::tempdir().unwrap();
    let err = case::run(&config(case_dir.path(), out.path())).unwrap_err();
    assert!(
        matches!(err, ReconstructError::Reconstruction(ReconstructionError::PartitionCount(_))),
        "{err}"
    );
}

#[test]
fn corrupted_count_aborts_the_run() {
    let case_dir = two_partition_case(&Fixture::default());
    let path = case_dir.path().join("processor1/1/h");
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("List<scalar>\n2\n("));
    std::fs::write(&path, text.replace("List<scalar>\n2\n(", "List<scalar>\n3\n(")).unwrap();

    let out = tempfile::tempdir().unwrap();
    let cfg = ReconstructConfig::new(case_dir.path(), out.path()).with_field(FieldSpec::area_scalar("h"));
    let err = case::run(&cfg).unwrap_err();
    assert!(
        matches!(
            err,
            ReconstructError::Decode {
                source: DecodeError::WrongElementCount { expected: 3, found: 2, .. },
                ..
            }
        ),
        "{err}"
    );
}

#[test]
fn worker_slices_partition_the_times() {
    let fixture = Fixture {
        times: vec!["0.25", "0.5", "1", "2", "4"],
        ..Fixture::default()
    };
    let case_dir = two_partition_case(&fixture);
    let out = tempfile::tempdir().unwrap();
    let ctx = CaseContext::open(config(case_dir.path(), out.path())).unwrap();
    let slice = |w: usize, n: usize| -> Vec<String> { ctx.worker_slice(w, n).map(|t| t.name.clone()).collect() };

    assert_eq!(slice(0, 2), ["0.25", "1", "4"]);
    assert_eq!(slice(1, 2), ["0.5", "2"]);
    assert_eq!(slice(0, 0), ["0.25", "0.5", "1", "2", "4"]);
    assert_eq!(slice(4, 7), ["4"]);
    assert!(slice(5, 7).is_empty());

    let mut all: Vec<String> = (0..3).flat_map(|w| slice(w, 3)).collect();
    all.sort_by(|a, b| a.parse::<f64>().unwrap().total_cmp(&b.parse::<f64>().unwrap()));
    assert_eq!(all, ["0.25", "0.5", "1", "2", "4"]);

    let summary = case::run(&config(case_dir.path(), out.path()).with_workers(7)).unwrap();
    assert_eq!(summary.time_steps, 5);
    assert_eq!(summary.fields_written, 15);
}
