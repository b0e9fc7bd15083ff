//! Field encoder: serialize a [`Field`] in the solver's dictionary layout.
//!
//! Output is byte-compatible with files written by the solver's own
//! reconstruction utility: the C++ banner, a `FoamFile` header, the
//! `dimensions` line, the internal field as a `nonuniform List<T>` block with
//! one element per line, one `boundaryField` sub-dictionary per patch and the
//! closing footer.

use crate::data::field::{BoundaryValue, Field, FieldElement, FieldValues};
use crate::mesh_error::ReconstructError;
use std::fmt::Write as _;
use std::io::Write;
use std::path::Path;

const BANNER: &str = r"/*--------------------------------*- C++ -*----------------------------------*\
| =========                 |                                                 |
| \\      /  F ield         | OpenFOAM: The Open Source CFD Toolbox           |
|  \\    /   O peration     | Version:  v1812                                 |
|   \\  /    A nd           | Web:      www.OpenFOAM.com                      |
|    \\/     M anipulation  |                                                 |
\*---------------------------------------------------------------------------*/
";

const SEPARATOR: &str =
    "// * * * * * * * * * * * * * * * * * * * * * * * * * * * * * * * * * * * * * //\n";

const FOOTER: &str =
    "\n// ************************************************************************* //\n";

/// Number of lines occupied by banner, `FoamFile` block and separator.
pub const HEADER_LINES: usize = 16;

/// `FoamFile` header entries that vary per file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldHeader {
    /// e.g. `areaScalarField`, `edgeScalarField`.
    pub class: String,
    /// Time directory name.
    pub location: String,
    /// Field name.
    pub object: String,
}

impl FieldHeader {
    pub fn new(class: impl Into<String>, location: impl Into<String>, object: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            location: location.into(),
            object: object.into(),
        }
    }
}

/// Encoder for reconstructed fields.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FieldWriter {
    /// Decimal places values are rounded to; `None` writes the shortest exact form.
    pub precision: Option<usize>,
}

impl FieldWriter {
    pub fn new(precision: Option<usize>) -> Self {
        Self { precision }
    }

    /// Render the complete file text.
    pub fn render<T: FieldElement>(&self, header: &FieldHeader, field: &Field<T>) -> String {
        let mut out = String::new();
        out.push_str(BANNER);
        // writing into a String cannot fail
        let _ = write!(
            out,
            "FoamFile\n{{\n    version     2.0;\n    format      ascii;\n    class       {};\n    location    \"{}\";\n    object      {};\n}}\n",
            header.class, header.location, header.object
        );
        out.push_str(SEPARATOR);

        let _ = write!(out, "\ndimensions      {};\n\n", field.dimensions);

        out.push('\n');
        match &field.internal {
            FieldValues::Uniform(v) => {
                out.push_str("internalField   uniform ");
                v.render(self.precision, &mut out);
                out.push_str(";\n");
            }
            FieldValues::NonUniform(values) => {
                let _ = writeln!(out, "internalField   nonuniform List<{}>", T::TYPE_NAME);
                self.push_list(values, &mut out);
            }
        }
        out.push('\n');

        out.push_str("boundaryField\n{\n");
        for (name, patch) in &field.boundary {
            let _ = write!(out, "    {name}\n    {{\n");
            self.push_patch(patch, &mut out);
            out.push_str("    }\n");
        }
        out.push_str("}\n\n");

        out.push_str(FOOTER);
        out
    }

    /// Write the rendered text to `w`.
    pub fn write<T: FieldElement, W: Write>(
        &self,
        header: &FieldHeader,
        field: &Field<T>,
        mut w: W,
    ) -> std::io::Result<()> {
        w.write_all(self.render(header, field).as_bytes())?;
        w.flush()
    }

    /// Write to `path`, replacing any existing file.
    pub fn write_file<T: FieldElement>(
        &self,
        path: &Path,
        header: &FieldHeader,
        field: &Field<T>,
    ) -> Result<(), ReconstructError> {
        let file = std::fs::File::create(path).map_err(|e| ReconstructError::io(path, e))?;
        self.write(header, field, std::io::BufWriter::new(file))
            .map_err(|e| ReconstructError::io(path, e))
    }

    fn push_patch<T: FieldElement>(&self, patch: &BoundaryValue<T>, out: &mut String) {
        let _ = writeln!(out, "        type            {};", patch.kind.type_name());
        match &patch.value {
            None => {}
            Some(FieldValues::Uniform(v)) => {
                out.push_str("        value           uniform ");
                v.render(self.precision, out);
                out.push_str(";\n");
            }
            Some(FieldValues::NonUniform(values)) => {
                let _ = writeln!(out, "        value           nonuniform List<{}> ", T::TYPE_NAME);
                self.push_list(values, out);
            }
        }
    }

    fn push_list<T: FieldElement>(&self, values: &[T], out: &mut String) {
        let _ = write!(out, "{}\n(\n", values.len());
        for v in values {
            v.render(self.precision, out);
            out.push('\n');
        }
        out.push_str(")\n;\n");
    }
}

/// Class name for a field of element type `T` living on faces or edges.
pub fn class_name<T: FieldElement>(on_edges: bool) -> String {
    let mut kind = T::TYPE_NAME.to_string();
    if let Some(first) = kind.get_mut(..1) {
        first.make_ascii_uppercase();
    }
    let prefix = if on_edges { "edge" } else { "area" };
    format!("{prefix}{kind}Field")
}
