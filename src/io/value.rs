//! Tagged value tree produced by the dictionary parser.

use crate::data::field::Vector3;
use indexmap::IndexMap;

/// A parsed dictionary value.
///
/// Named sub-dictionaries inside a list (as in `faBoundary`) appear as an
/// [`Value::Atom`] holding the name immediately followed by the [`Value::Dict`].
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Dict(Dict),
    List(Vec<Value>),
    Vector3(Vector3),
    Scalar(f64),
    DimensionedScalar {
        name: String,
        dims: [i8; 7],
        value: f64,
    },
    Atom(String),
}

impl Value {
    /// Interpret a single token: numbers become [`Value::Scalar`], anything else an atom.
    pub fn from_token(token: &str) -> Self {
        match parse_number(token) {
            Some(v) => Value::Scalar(v),
            None => Value::Atom(token.to_string()),
        }
    }

    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Value::Scalar(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_atom(&self) -> Option<&str> {
        match self {
            Value::Atom(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&Dict> {
        match self {
            Value::Dict(d) => Some(d),
            _ => None,
        }
    }

    /// Non-negative integral scalar, as used for labels and counts.
    pub fn as_label(&self) -> Option<usize> {
        match self {
            Value::Scalar(v) if *v >= 0.0 && v.fract() == 0.0 && *v <= usize::MAX as f64 => {
                Some(*v as usize)
            }
            _ => None,
        }
    }

    /// Short kind name used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Dict(_) => "dictionary",
            Value::List(_) => "list",
            Value::Vector3(_) => "vector",
            Value::Scalar(_) => "scalar",
            Value::DimensionedScalar { .. } => "dimensioned scalar",
            Value::Atom(_) => "word",
        }
    }
}

/// Parse a numeric token. Words such as `inf` or `nan` stay words.
pub fn parse_number(token: &str) -> Option<f64> {
    let first = token.chars().next()?;
    if !(first.is_ascii_digit() || matches!(first, '-' | '+' | '.')) {
        return None;
    }
    token.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Ordered dictionary; insertion order is source order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Dict {
    entries: IndexMap<String, Value>,
}

impl Dict {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry; a repeated key replaces the earlier value in place.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.entries.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn get_dict(&self, key: &str) -> Option<&Dict> {
        self.get(key).and_then(Value::as_dict)
    }

    pub fn get_atom(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_atom)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Lists whose key is a decimal count, i.e. the body of a `N ( ... )` block.
    pub fn counted_lists(&self) -> impl Iterator<Item = (usize, &[Value])> {
        self.entries.iter().filter_map(|(k, v)| {
            let count = k.parse::<usize>().ok()?;
            v.as_list().map(|items| (count, items))
        })
    }

    /// The counted list declared with `expected` elements, or the only counted
    /// list when there is exactly one.
    pub fn counted_list(&self, expected: Option<usize>) -> Option<(usize, &[Value])> {
        if let Some(n) = expected {
            if let Some(items) = self.get(&n.to_string()).and_then(Value::as_list) {
                return Some((n, items));
            }
        }
        let mut lists = self.counted_lists();
        let first = lists.next()?;
        match lists.next() {
            None => Some(first),
            Some(_) => None,
        }
    }
}

impl FromIterator<(String, Value)> for Dict {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
