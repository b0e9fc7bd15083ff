//! Case-level driver: discovery, the shared [`CaseContext`] snapshot and the
//! worker pool that reconstructs every time step.
//!
//! Everything derived from the mesh (addressing, merge plan, shared-edge
//! owners) is computed once by [`CaseContext::open`] and shared read-only by
//! all workers. Time steps are assigned round-robin: worker `w` of `n`
//! processes times `w, w + n, w + 2n, ...` in increasing order.

use crate::algs::merge::{MergePlan, merge_area_field, merge_edge_field};
use crate::algs::reconcile::{SharedEdgeMap, correct_boundary_addressing};
use crate::config::{FieldLocation, FieldSpec, ReconstructConfig, ValueKind};
use crate::data::decode::read_field;
use crate::data::field::{Field, FieldElement, Vector3};
use crate::io::tokenizer::TokenizerOptions;
use crate::io::value::parse_number;
use crate::io::writer::{FieldHeader, FieldWriter, class_name};
use crate::mesh_error::ReconstructError;
use crate::partitioning::addressing::{CaseMesh, processor_dir};
use itertools::Itertools;
use rayon::prelude::*;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A time directory, keeping the spelling used on disk.
#[derive(Clone, Debug, PartialEq)]
pub struct TimeDir {
    pub name: String,
    pub value: f64,
}

/// Numeric directories of `processor0`, sorted by value. Time zero holds the
/// initial conditions and is skipped unless `include_zero`.
pub fn discover_times(case_dir: &Path, include_zero: bool) -> Result<Vec<TimeDir>, ReconstructError> {
    let dir = processor_dir(case_dir, 0);
    let entries = std::fs::read_dir(&dir).map_err(|e| ReconstructError::io(&dir, e))?;
    let mut times = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ReconstructError::io(&dir, e))?;
        if !entry.path().is_dir() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        let Some(value) = parse_number(&name) else {
            continue;
        };
        if value == 0.0 && !include_zero {
            continue;
        }
        times.push(TimeDir { name, value });
    }
    Ok(times
        .into_iter()
        .sorted_by(|a, b| a.value.total_cmp(&b.value))
        .collect())
}

/// Read-only state shared by every worker.
#[derive(Debug)]
pub struct CaseContext {
    pub config: ReconstructConfig,
    pub times: Vec<TimeDir>,
    /// Enabled fields present on disk.
    pub fields: Vec<FieldSpec>,
    pub mesh: CaseMesh,
    pub plan: MergePlan,
    pub shared: SharedEdgeMap,
    /// Partition boundary edges without a matching global edge centre.
    pub unmatched_centres: usize,
    options: TokenizerOptions,
}

impl CaseContext {
    /// Load and reconcile the mesh, discover times and fields.
    pub fn open(config: ReconstructConfig) -> Result<Self, ReconstructError> {
        config.validate()?;
        let options = config.tokenizer_options();
        let mut mesh = CaseMesh::load(&config.case_dir, &options)?;

        let unmatched_centres = match read_edge_centres(&config, &mesh, &options)? {
            Some((global_ec, partition_ec)) => {
                let outcome =
                    correct_boundary_addressing(&mut mesh, &global_ec, &partition_ec, config.center_precision);
                log::info!("edge-centre matching readdressed {} boundary edges", outcome.corrected);
                if !outcome.diagnostics.is_empty() {
                    log::warn!(
                        "{} boundary edges have no matching global edge centre",
                        outcome.diagnostics.len()
                    );
                    for d in &outcome.diagnostics {
                        log::debug!("{d}");
                    }
                }
                outcome.diagnostics.len()
            }
            None => 0,
        };

        let shared = SharedEdgeMap::build(&mesh);
        if shared.unresolved_count() > 0 {
            log::warn!(
                "{} of {} shared edges have no owner in either partition; their sign is left unchanged",
                shared.unresolved_count(),
                shared.edges().len()
            );
            for d in shared.diagnostics() {
                log::debug!("{d}");
            }
        }
        let plan = MergePlan::new(&mesh)?;

        let times = discover_times(&config.case_dir, config.include_time_zero)?;
        let fields = present_fields(&config, times.last());
        log::info!(
            "{} time steps, fields: {}",
            times.len(),
            fields.iter().map(|f| f.name.as_str()).join(" ")
        );

        Ok(Self {
            config,
            times,
            fields,
            mesh,
            plan,
            shared,
            unmatched_centres,
            options,
        })
    }

    /// Directory the reconstructed fields of `time` are written to.
    pub fn output_dir(&self, time: &TimeDir) -> PathBuf {
        self.config.output_dir.join(&time.name)
    }

    /// Reconstruct every field of one time step. A field file missing from
    /// a partition skips that field; any other failure aborts the step.
    pub fn reconstruct_time(&self, time: &TimeDir) -> Result<StepOutcome, ReconstructError> {
        let out = self.output_dir(time);
        std::fs::create_dir_all(&out).map_err(|e| ReconstructError::io(&out, e))?;

        let mut outcome = StepOutcome::default();
        for spec in &self.fields {
            let result = match spec.kind {
                ValueKind::Scalar => self.reconstruct_field::<f64>(spec, time),
                ValueKind::Vector => self.reconstruct_field::<Vector3>(spec, time),
            };
            match result {
                Ok(()) => outcome.written += 1,
                Err(e) if e.is_not_found() => {
                    log::warn!("time {}: skipping `{}`: {e}", time.name, spec.name);
                    outcome.skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }
        log::debug!(
            "time {}: {} fields written, {} skipped",
            time.name,
            outcome.written,
            outcome.skipped
        );
        Ok(outcome)
    }

    /// Read, merge, reconcile and write one field of one time step.
    pub fn reconstruct_field<T: FieldElement>(&self, spec: &FieldSpec, time: &TimeDir) -> Result<(), ReconstructError> {
        let on_edges = spec.location == FieldLocation::Edge;
        let parts = self
            .mesh
            .partitions
            .iter()
            .map(|part| {
                let path = processor_dir(&self.config.case_dir, part.rank)
                    .join(&time.name)
                    .join(&spec.name);
                let layout = match on_edges {
                    true => part.edge_layout(),
                    false => part.area_layout(),
                };
                read_field::<T>(&path, &layout, &self.options)
            })
            .collect::<Result<Vec<Field<T>>, _>>()?;

        let merged = match on_edges {
            true => {
                let mut merged = merge_edge_field(&self.plan, &self.mesh, &parts)?;
                if spec.signed_flux {
                    let flipped = self.shared.apply_flux_signs(&self.plan, &mut merged);
                    log::debug!("time {}: `{}` sign restored on {flipped} shared edges", time.name, spec.name);
                }
                merged
            }
            false => merge_area_field(&self.plan, &self.mesh, &parts)?,
        };

        let header = FieldHeader::new(class_name::<T>(on_edges), time.name.as_str(), spec.name.as_str());
        let path = self.output_dir(time).join(&spec.name);
        FieldWriter::new(spec.precision).write_file(&path, &header, &merged)
    }

    /// Times assigned to worker `worker` of `workers`, in increasing order.
    pub fn worker_slice(&self, worker: usize, workers: usize) -> impl Iterator<Item = &TimeDir> {
        round_robin(&self.times, worker, workers)
    }

    fn run_slice(&self, worker: usize, workers: usize) -> Result<SliceStats, ReconstructError> {
        let mut stats = SliceStats::default();
        for time in self.worker_slice(worker, workers) {
            let start = Instant::now();
            let step = self.reconstruct_time(time)?;
            stats.fields_written += step.written;
            stats.fields_skipped += step.skipped;
            stats.time_steps += 1;
            stats.elapsed += start.elapsed();
        }
        Ok(stats)
    }
}

/// Items `worker, worker + workers, ...` of `items`. A worker count of zero
/// is treated as one.
pub fn round_robin<T>(items: &[T], worker: usize, workers: usize) -> impl Iterator<Item = &T> {
    items.iter().skip(worker).step_by(workers.max(1))
}

/// Fields handled in one time step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StepOutcome {
    pub written: usize,
    /// Fields with a file missing from some partition.
    pub skipped: usize,
}

#[derive(Debug, Default)]
struct SliceStats {
    fields_written: usize,
    fields_skipped: usize,
    time_steps: usize,
    elapsed: Duration,
}

/// Undecomposed and per-partition edge centres, or `None` when the case has
/// no centre field at time zero.
fn read_edge_centres(
    config: &ReconstructConfig,
    mesh: &CaseMesh,
    options: &TokenizerOptions,
) -> Result<Option<(Field<Vector3>, Vec<Field<Vector3>>)>, ReconstructError> {
    let name = &config.edge_centre_field;
    let global_path = config.case_dir.join("0").join(name);
    let global = match read_field::<Vector3>(&global_path, &mesh.global.edge_layout(), options) {
        Ok(field) => field,
        Err(e) if e.is_not_found() => {
            log::warn!("no {} field, boundary edge addressing is used as decomposed", global_path.display());
            return Ok(None);
        }
        Err(e) => return Err(e),
    };
    let mut partitions = Vec::with_capacity(mesh.partitions.len());
    for part in &mesh.partitions {
        let path = processor_dir(&config.case_dir, part.rank).join("0").join(name);
        match read_field::<Vector3>(&path, &part.edge_layout(), options) {
            Ok(field) => partitions.push(field),
            Err(e) if e.is_not_found() => {
                log::warn!("no {} field, boundary edge addressing is used as decomposed", path.display());
                return Ok(None);
            }
            Err(e) => return Err(e),
        }
    }
    Ok(Some((global, partitions)))
}

/// Enabled fields, minus those absent from `latest` in `processor0`.
fn present_fields(config: &ReconstructConfig, latest: Option<&TimeDir>) -> Vec<FieldSpec> {
    let enabled = config.enabled_fields().cloned();
    let Some(latest) = latest else {
        return enabled.collect();
    };
    let dir = processor_dir(&config.case_dir, 0).join(&latest.name);
    let (present, absent): (Vec<_>, Vec<_>) = enabled.partition(|f| dir.join(&f.name).is_file());
    if !absent.is_empty() {
        log::warn!(
            "fields not found in {}, disabled: {}",
            dir.display(),
            absent.iter().map(|f| f.name.as_str()).join(", ")
        );
    }
    present
}

/// What a run did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub fields_written: usize,
    pub fields_skipped: usize,
    pub time_steps: usize,
    pub mean_step_time: Duration,
    pub unresolved_edges: usize,
    pub unmatched_centres: usize,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "reconstructed {} fields over {} time steps ({:.3} s per step)",
            self.fields_written,
            self.time_steps,
            self.mean_step_time.as_secs_f64()
        )?;
        if self.fields_skipped > 0 {
            write!(f, ", {} fields skipped", self.fields_skipped)?;
        }
        if self.unresolved_edges > 0 {
            write!(f, ", {} shared edges with unresolved owner", self.unresolved_edges)?;
        }
        if self.unmatched_centres > 0 {
            write!(f, ", {} boundary edges without centre match", self.unmatched_centres)?;
        }
        Ok(())
    }
}

/// Reconstruct a whole case.
pub fn run(config: &ReconstructConfig) -> Result<RunSummary, ReconstructError> {
    let ctx = Arc::new(CaseContext::open(config.clone())?);
    let workers = config.workers;
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .map_err(|e| ReconstructError::Config(format!("cannot start {workers} workers: {e}")))?;

    let slices: Vec<Result<SliceStats, ReconstructError>> = pool.install(|| {
        (0..workers)
            .into_par_iter()
            .map(|w| {
                let ctx = Arc::clone(&ctx);
                ctx.run_slice(w, workers)
            })
            .collect()
    });

    let mut total = SliceStats::default();
    for slice in slices {
        let slice = slice?;
        total.fields_written += slice.fields_written;
        total.fields_skipped += slice.fields_skipped;
        total.time_steps += slice.time_steps;
        total.elapsed += slice.elapsed;
    }

    let mean_step_time = match u32::try_from(total.time_steps) {
        Ok(0) | Err(_) => Duration::ZERO,
        Ok(n) => total.elapsed / n,
    };
    let summary = RunSummary {
        fields_written: total.fields_written,
        fields_skipped: total.fields_skipped,
        time_steps: total.time_steps,
        mean_step_time,
        unresolved_edges: ctx.shared.unresolved_count(),
        unmatched_centres: ctx.unmatched_centres,
    };
    log::info!("{summary}");
    Ok(summary)
}
