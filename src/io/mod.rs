//! Readers and writers for the solver's nested-dictionary text format.
//!
//! The reading pipeline is [`tokenizer`] -> [`legacy`] -> [`parser`], which
//! yields a [`value::Dict`]. [`writer`] goes the other way for reconstructed
//! fields. The helpers below wrap the pipeline with file access and attach
//! the offending path to every error.

pub mod legacy;
pub mod parser;
pub mod tokenizer;
pub mod value;
pub mod writer;

use crate::io::tokenizer::{Tokenizer, TokenizerOptions};
use crate::io::value::{Dict, Value};
use crate::mesh_error::{DecodeError, ReconstructError};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Read and parse a dictionary file.
pub fn read_dictionary(path: &Path, options: &TokenizerOptions) -> Result<Dict, ReconstructError> {
    let text = std::fs::read_to_string(path).map_err(|e| ReconstructError::io(path, e))?;
    parser::parse_dictionary(&text, options).map_err(|e| ReconstructError::parse(path, e))
}

/// Read a file holding a single counted list of labels, such as
/// `faceProcAddressing` or `edgeNeighbour`.
pub fn read_label_list(path: &Path, options: &TokenizerOptions) -> Result<Vec<usize>, ReconstructError> {
    let dict = read_dictionary(path, options)?;
    label_list(&dict).map_err(|e| ReconstructError::decode(path, e))
}

/// Decode the single counted label list of `dict`.
pub fn label_list(dict: &Dict) -> Result<Vec<usize>, DecodeError> {
    let (count, items) = dict
        .counted_list(None)
        .ok_or_else(|| DecodeError::MissingEntry("label list".into()))?;
    if count != items.len() {
        return Err(DecodeError::WrongElementCount {
            entry: "label list".into(),
            expected: count,
            found: items.len(),
        });
    }
    items
        .iter()
        .map(|v| {
            v.as_label().ok_or_else(|| DecodeError::InvalidValue {
                entry: "label list".into(),
                reason: format!("expected a non-negative label, found {}", describe(v)),
            })
        })
        .collect()
}

/// Read only the declared element count of a list file, stopping at the
/// first line that is a lone integer. Used for large arrays such as
/// `faFaces` where only the size matters.
pub fn read_list_count(path: &Path, options: &TokenizerOptions) -> Result<usize, ReconstructError> {
    let file = File::open(path).map_err(|e| ReconstructError::io(path, e))?;
    let mut tokenizer = Tokenizer::new(options);
    for line in BufReader::new(file).lines() {
        let line = line.map_err(|e| ReconstructError::io(path, e))?;
        let Some(tokens) = tokenizer.feed(&line) else {
            continue;
        };
        if tokens.tokens.len() == 1 {
            if let Ok(n) = tokens.first().parse::<usize>() {
                return Ok(n);
            }
        }
    }
    Err(ReconstructError::decode(
        path,
        DecodeError::MissingEntry("list count".into()),
    ))
}

pub(crate) fn describe(value: &Value) -> String {
    match value {
        Value::Scalar(v) => format!("{v}"),
        Value::Atom(a) => format!("`{a}`"),
        other => other.kind_name().to_string(),
    }
}
