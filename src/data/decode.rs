//! Field decoder: interpret a parsed dictionary as a typed [`Field`].
//!
//! `nonuniform` values are stored by the parser as a sibling entry keyed by
//! the declared element count (see [`Dict::counted_list`]). The decoder looks
//! that entry up with the element count the mesh expects and rejects any
//! disagreement between the declared count, the supplied elements and the
//! expected count.

use crate::data::field::{BoundaryKind, BoundaryValue, Field, FieldDimensions, FieldElement, FieldValues};
use crate::io::tokenizer::TokenizerOptions;
use crate::io::value::{Dict, Value};
use crate::io::{describe, read_dictionary};
use crate::mesh_error::{DecodeError, ReconstructError};
use indexmap::IndexMap;
use std::path::Path;

/// Element counts a field file must match: internal elements plus the size
/// of every boundary patch, in mesh order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldLayout {
    pub internal: usize,
    pub patches: IndexMap<String, usize>,
}

impl FieldLayout {
    pub fn new(internal: usize) -> Self {
        Self {
            internal,
            patches: IndexMap::new(),
        }
    }

    pub fn with_patch(mut self, name: impl Into<String>, size: usize) -> Self {
        self.patches.insert(name.into(), size);
        self
    }
}

/// Decode `dict` against `layout`.
///
/// Patches present in the file but absent from the layout are ignored; a
/// layout patch missing from the file is a [`DecodeError::MissingEntry`].
pub fn decode_field<T: FieldElement>(dict: &Dict, layout: &FieldLayout) -> Result<Field<T>, DecodeError> {
    let dimensions = dict
        .get("dimensions")
        .ok_or_else(|| DecodeError::MissingEntry("dimensions".into()))
        .and_then(FieldDimensions::from_value)?;

    let internal_value = dict
        .get("internalField")
        .ok_or_else(|| DecodeError::MissingEntry("internalField".into()))?;
    let internal = decode_values::<T>("internalField", internal_value, dict, layout.internal)?;

    let boundary_dict = dict
        .get_dict("boundaryField")
        .ok_or_else(|| DecodeError::MissingEntry("boundaryField".into()))?;
    let mut boundary = IndexMap::with_capacity(layout.patches.len());
    for (name, &size) in &layout.patches {
        let patch = boundary_dict
            .get_dict(name)
            .ok_or_else(|| DecodeError::MissingEntry(format!("boundaryField/{name}")))?;
        boundary.insert(name.clone(), decode_patch::<T>(name, patch, size)?);
    }

    Ok(Field {
        dimensions,
        internal,
        boundary,
    })
}

/// Read and decode a field file.
pub fn read_field<T: FieldElement>(
    path: &Path,
    layout: &FieldLayout,
    options: &TokenizerOptions,
) -> Result<Field<T>, ReconstructError> {
    let dict = read_dictionary(path, options)?;
    decode_field(&dict, layout).map_err(|e| ReconstructError::decode(path, e))
}

fn decode_patch<T: FieldElement>(name: &str, patch: &Dict, size: usize) -> Result<BoundaryValue<T>, DecodeError> {
    let kind = patch
        .get_atom("type")
        .map(BoundaryKind::from_type_name)
        .ok_or_else(|| DecodeError::MissingEntry(format!("boundaryField/{name}/type")))?;
    let value = match (patch.get("value"), &kind) {
        (_, BoundaryKind::ZeroGradient) => None,
        (Some(v), _) => Some(decode_values::<T>(&format!("boundaryField/{name}/value"), v, patch, size)?),
        (None, k) if k.requires_value() && size == 0 => Some(FieldValues::NonUniform(Vec::new())),
        (None, k) if k.requires_value() => {
            return Err(DecodeError::MissingEntry(format!("boundaryField/{name}/value")));
        }
        (None, _) => None,
    };
    Ok(BoundaryValue { kind, value })
}

/// Decode a `uniform ...` / `nonuniform List<T>` entry. `container` holds the
/// counted list sibling of a nonuniform entry.
fn decode_values<T: FieldElement>(
    entry: &str,
    value: &Value,
    container: &Dict,
    expected: usize,
) -> Result<FieldValues<T>, DecodeError> {
    let items = match value {
        Value::List(items) => items.as_slice(),
        other => std::slice::from_ref(other),
    };
    let invalid = |reason: String| DecodeError::InvalidValue {
        entry: entry.to_string(),
        reason,
    };

    match items.first().and_then(Value::as_atom) {
        Some("uniform") => T::from_uniform(&items[1..])
            .map(FieldValues::Uniform)
            .ok_or_else(|| invalid(format!("uniform value is not a {}", T::TYPE_NAME))),
        Some("nonuniform") => {
            if let Some(marker) = items.get(1) {
                let want = format!("List<{}>", T::TYPE_NAME);
                if marker.as_atom() != Some(want.as_str()) {
                    return Err(invalid(format!("expected `{want}`, found {}", describe(marker))));
                }
            }
            let (declared, body) = container
                .counted_list(Some(expected))
                .ok_or_else(|| DecodeError::MissingEntry(format!("{entry} list body")))?;
            if declared != body.len() {
                return Err(DecodeError::WrongElementCount {
                    entry: entry.to_string(),
                    expected: declared,
                    found: body.len(),
                });
            }
            if declared != expected {
                return Err(DecodeError::WrongElementCount {
                    entry: entry.to_string(),
                    expected,
                    found: declared,
                });
            }
            body.iter()
                .enumerate()
                .map(|(i, v)| {
                    T::from_element(v)
                        .ok_or_else(|| invalid(format!("element {i} ({}) is not a {}", describe(v), T::TYPE_NAME)))
                })
                .collect::<Result<Vec<_>, _>>()
                .map(FieldValues::NonUniform)
        }
        _ => Err(invalid("expected `uniform` or `nonuniform`".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::field::Vector3;
    use crate::io::parser::parse_dictionary;

    fn parse(text: &str) -> Dict {
        parse_dictionary(text, &TokenizerOptions::default()).unwrap()
    }

    const SCALAR: &str = "\
dimensions      [0 1 0 0 0 0 0];
internalField   nonuniform List<scalar>
3
(
0.1
0.2
0.3
)
;
boundaryField
{
    inlet
    {
        type            fixedValue;
        value           nonuniform List<scalar> 2(1 2);
    }
    outlet
    {
        type            zeroGradient;
    }
    procBoundary0to1
    {
        type            processor;
        value           nonuniform 0();
    }
}
";

    #[test]
    fn nonuniform_scalar_field() {
        let layout = FieldLayout::new(3)
            .with_patch("inlet", 2)
            .with_patch("outlet", 1)
            .with_patch("procBoundary0to1", 0);
        let field: Field<f64> = decode_field(&parse(SCALAR), &layout).unwrap();
        assert_eq!(field.dimensions, FieldDimensions([0, 1, 0, 0, 0, 0, 0]));
        assert_eq!(field.internal, FieldValues::NonUniform(vec![0.1, 0.2, 0.3]));
        assert_eq!(
            field.boundary["inlet"],
            BoundaryValue {
                kind: BoundaryKind::FixedValue,
                value: Some(FieldValues::NonUniform(vec![1.0, 2.0])),
            }
        );
        assert_eq!(field.boundary["outlet"].value, None);
        // empty is not missing
        assert_eq!(
            field.boundary["procBoundary0to1"].value,
            Some(FieldValues::NonUniform(vec![]))
        );
    }

    #[test]
    fn layout_order_wins_and_unknown_patches_are_dropped() {
        let layout = FieldLayout::new(3).with_patch("outlet", 1);
        let field: Field<f64> = decode_field(&parse(SCALAR), &layout).unwrap();
        assert_eq!(field.boundary.keys().collect::<Vec<_>>(), ["outlet"]);
    }

    #[test]
    fn missing_patch_is_reported() {
        let layout = FieldLayout::new(3).with_patch("wall", 4);
        let err = decode_field::<f64>(&parse(SCALAR), &layout).unwrap_err();
        assert_eq!(err, DecodeError::MissingEntry("boundaryField/wall".into()));
    }

    #[test]
    fn expected_count_disagreement() {
        let err = decode_field::<f64>(&parse(SCALAR), &FieldLayout::new(4)).unwrap_err();
        assert_eq!(
            err,
            DecodeError::WrongElementCount {
                entry: "internalField".into(),
                expected: 4,
                found: 3,
            }
        );
    }

    #[test]
    fn uniform_vector_field() {
        let text = "dimensions [0 1 -1 0 0 0 0];\ninternalField uniform (1 0 0);\n\
boundaryField\n{\n    wall\n    {\n        type fixedValue;\n        value uniform (0 0 0);\n    }\n}\n";
        let field: Field<Vector3> =
            decode_field(&parse(text), &FieldLayout::new(10).with_patch("wall", 3)).unwrap();
        assert_eq!(field.internal, FieldValues::Uniform(Vector3::new(1.0, 0.0, 0.0)));
        assert_eq!(field.internal.broadcast(10).len(), 10);
        assert_eq!(
            field.boundary["wall"].value,
            Some(FieldValues::Uniform(Vector3::default()))
        );
    }

    #[test]
    fn wrong_element_type() {
        let err = decode_field::<Vector3>(&parse(SCALAR), &FieldLayout::new(3)).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidValue { ref entry, .. } if entry == "internalField"));
    }

    #[test]
    fn required_value_missing() {
        let text = "dimensions [0 0 0 0 0 0 0];\ninternalField uniform 0;\n\
boundaryField\n{\n    inlet\n    {\n        type fixedValue;\n    }\n}\n";
        let err = decode_field::<f64>(&parse(text), &FieldLayout::new(1).with_patch("inlet", 2)).unwrap_err();
        assert_eq!(err, DecodeError::MissingEntry("boundaryField/inlet/value".into()));
    }
}
