//! Run configuration.
//!
//! The record a front end (CLI, script) hands to [`crate::case::run`]. It can
//! be built in code or loaded from JSON:
//!
//! ```json
//! {
//!   "case_dir": "run/case",
//!   "output_dir": "run/case/reconstructed",
//!   "workers": 4,
//!   "fields": [
//!     { "name": "h", "location": "area", "kind": "scalar", "precision": 4 },
//!     { "name": "Q", "location": "edge", "kind": "scalar", "signed_flux": true }
//!   ]
//! }
//! ```

use crate::io::tokenizer::TokenizerOptions;
use crate::mesh_error::ReconstructError;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Mesh entity a field is defined on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldLocation {
    /// One value per face (`area*Field`).
    Area,
    /// One value per edge (`edge*Field`).
    Edge,
}

/// Element type of a field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Scalar,
    Vector,
}

/// One field to reconstruct.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub location: FieldLocation,
    pub kind: ValueKind,
    /// Decimal places written; `None` writes values exactly.
    #[serde(default)]
    pub precision: Option<usize>,
    /// Restore the owner -> neighbour sign on partition cuts.
    #[serde(default)]
    pub signed_flux: bool,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, location: FieldLocation, kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            location,
            kind,
            precision: None,
            signed_flux: false,
            enabled: true,
        }
    }

    pub fn area_scalar(name: impl Into<String>) -> Self {
        Self::new(name, FieldLocation::Area, ValueKind::Scalar)
    }

    pub fn area_vector(name: impl Into<String>) -> Self {
        Self::new(name, FieldLocation::Area, ValueKind::Vector)
    }

    pub fn edge_scalar(name: impl Into<String>) -> Self {
        Self::new(name, FieldLocation::Edge, ValueKind::Scalar)
    }

    pub fn with_precision(mut self, digits: usize) -> Self {
        self.precision = Some(digits);
        self
    }

    /// Mark as a flux whose sign depends on edge orientation.
    pub fn signed(mut self) -> Self {
        self.signed_flux = true;
        self
    }
}

/// Everything a reconstruction run needs.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ReconstructConfig {
    /// Decomposed case holding `processor<N>` directories and the
    /// undecomposed mesh description.
    pub case_dir: PathBuf,
    /// Root under which `<time>/<field>` files are written.
    pub output_dir: PathBuf,
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
    #[serde(default)]
    pub include_time_zero: bool,
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Fixed banner length to skip when reading; `None` strips comments instead.
    #[serde(default)]
    pub header_lines: Option<usize>,
    /// Decimal places edge centres are rounded to before matching.
    #[serde(default = "default_center_precision")]
    pub center_precision: usize,
    /// Name of the edge-centre field under `0/`.
    #[serde(default = "default_edge_centre_field")]
    pub edge_centre_field: String,
}

fn default_workers() -> usize {
    1
}

fn default_center_precision() -> usize {
    6
}

fn default_edge_centre_field() -> String {
    "ec".to_string()
}

impl ReconstructConfig {
    /// A configuration with no fields and default settings.
    pub fn new(case_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            case_dir: case_dir.into(),
            output_dir: output_dir.into(),
            fields: Vec::new(),
            include_time_zero: false,
            workers: default_workers(),
            header_lines: None,
            center_precision: default_center_precision(),
            edge_centre_field: default_edge_centre_field(),
        }
    }

    /// The field set written by the debris-flow solver.
    pub fn debris_flow_defaults(case_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        let mut config = Self::new(case_dir, output_dir);
        config.fields = vec![
            FieldSpec::area_scalar("h"),
            FieldSpec::area_scalar("Cv"),
            FieldSpec::area_scalar("pb"),
            FieldSpec::area_scalar("deltac0"),
            FieldSpec::area_scalar("deltah0"),
            FieldSpec::area_vector("Us"),
            FieldSpec::area_vector("tau"),
            FieldSpec::edge_scalar("Q").signed(),
            FieldSpec::edge_scalar("phi2s").signed(),
        ];
        config
    }

    pub fn with_field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn from_json_str(text: &str) -> Result<Self, ReconstructError> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| ReconstructError::Config(format!("invalid JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ReconstructError> {
        let text = std::fs::read_to_string(path).map_err(|e| ReconstructError::io(path, e))?;
        Self::from_json_str(&text)
    }

    pub fn to_json(&self) -> Result<String, ReconstructError> {
        serde_json::to_string_pretty(self).map_err(|e| ReconstructError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ReconstructError> {
        if self.workers == 0 {
            return Err(ReconstructError::Config("workers must be at least 1".into()));
        }
        if self.center_precision > 15 {
            return Err(ReconstructError::Config(format!(
                "center_precision {} exceeds f64 resolution",
                self.center_precision
            )));
        }
        let mut seen = HashSet::new();
        for field in &self.fields {
            if field.name.is_empty() || field.name.contains(['/', '\\']) {
                return Err(ReconstructError::Config(format!("invalid field name `{}`", field.name)));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(ReconstructError::Config(format!("field `{}` listed twice", field.name)));
            }
            if field.signed_flux && field.location == FieldLocation::Area {
                return Err(ReconstructError::Config(format!(
                    "field `{}`: signed_flux applies to edge fields only",
                    field.name
                )));
            }
        }
        Ok(())
    }

    pub fn enabled_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|f| f.enabled)
    }

    pub fn tokenizer_options(&self) -> TokenizerOptions {
        TokenizerOptions {
            skip_lines: self.header_lines,
        }
    }
}
