//! Typed field values: the in-memory form of a decoded field file.

use crate::io::value::Value;
use crate::mesh_error::DecodeError;
use indexmap::IndexMap;
use std::fmt;
use std::ops::Neg;

/// Plain 3-component vector as written by the solver, `(x y z)`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

impl Neg for Vector3 {
    type Output = Vector3;

    fn neg(self) -> Self::Output {
        Vector3::new(-self.x, -self.y, -self.z)
    }
}

/// SI exponents in solver order: mass, length, time, temperature, moles,
/// current, luminous intensity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct FieldDimensions(pub [i8; 7]);

impl FieldDimensions {
    /// Decode the value of a `dimensions` entry.
    pub fn from_value(value: &Value) -> Result<Self, DecodeError> {
        let invalid = |reason: String| DecodeError::InvalidValue {
            entry: "dimensions".into(),
            reason,
        };
        let items = value
            .as_list()
            .ok_or_else(|| invalid(format!("expected 7 exponents, found a {}", value.kind_name())))?;
        if items.len() != 7 {
            return Err(DecodeError::WrongElementCount {
                entry: "dimensions".into(),
                expected: 7,
                found: items.len(),
            });
        }
        let mut dims = [0i8; 7];
        for (slot, item) in dims.iter_mut().zip(items) {
            *slot = item
                .as_scalar()
                .filter(|v| v.fract() == 0.0 && (i8::MIN as f64..=i8::MAX as f64).contains(v))
                .map(|v| v as i8)
                .ok_or_else(|| invalid(format!("`{item:?}` is not an integer exponent")))?;
        }
        Ok(Self(dims))
    }
}

impl fmt::Display for FieldDimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, d) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{d}")?;
        }
        write!(f, "]")
    }
}

/// Either one value for every element or one value per element.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValues<T> {
    Uniform(T),
    NonUniform(Vec<T>),
}

impl<T: Copy> FieldValues<T> {
    /// Value of element `i`; a uniform value answers for every index.
    pub fn get(&self, i: usize) -> Option<T> {
        match self {
            FieldValues::Uniform(v) => Some(*v),
            FieldValues::NonUniform(vs) => vs.get(i).copied(),
        }
    }

    /// Expand to `len` explicit values.
    pub fn broadcast(&self, len: usize) -> Vec<T> {
        match self {
            FieldValues::Uniform(v) => vec![*v; len],
            FieldValues::NonUniform(vs) => vs.clone(),
        }
    }

    /// Number of explicit values, `None` for a uniform value.
    pub fn explicit_len(&self) -> Option<usize> {
        match self {
            FieldValues::Uniform(_) => None,
            FieldValues::NonUniform(vs) => Some(vs.len()),
        }
    }
}

/// Boundary condition class of a patch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BoundaryKind {
    ZeroGradient,
    FixedValue,
    Calculated,
    /// Inter-partition link; only ever present in partition files.
    ProcessorLink,
    Other(String),
}

impl BoundaryKind {
    pub fn from_type_name(name: &str) -> Self {
        match name {
            "zeroGradient" => BoundaryKind::ZeroGradient,
            "fixedValue" => BoundaryKind::FixedValue,
            "calculated" => BoundaryKind::Calculated,
            "processor" => BoundaryKind::ProcessorLink,
            other => BoundaryKind::Other(other.to_string()),
        }
    }

    pub fn type_name(&self) -> &str {
        match self {
            BoundaryKind::ZeroGradient => "zeroGradient",
            BoundaryKind::FixedValue => "fixedValue",
            BoundaryKind::Calculated => "calculated",
            BoundaryKind::ProcessorLink => "processor",
            BoundaryKind::Other(name) => name,
        }
    }

    /// Kinds whose `value` entry is mandatory.
    pub fn requires_value(&self) -> bool {
        matches!(
            self,
            BoundaryKind::FixedValue | BoundaryKind::Calculated | BoundaryKind::ProcessorLink
        )
    }
}

/// Condition and (optional) values of one boundary patch.
#[derive(Clone, Debug, PartialEq)]
pub struct BoundaryValue<T> {
    pub kind: BoundaryKind,
    pub value: Option<FieldValues<T>>,
}

/// A decoded field: internal values, per-patch boundary values and units.
#[derive(Clone, Debug, PartialEq)]
pub struct Field<T> {
    pub dimensions: FieldDimensions,
    pub internal: FieldValues<T>,
    /// Patches in file order.
    pub boundary: IndexMap<String, BoundaryValue<T>>,
}

/// Element types a field can hold.
pub trait FieldElement: Copy + fmt::Debug + PartialEq + Send + Sync + 'static {
    /// Name used in `List<...>` markers and class names.
    const TYPE_NAME: &'static str;

    /// One element of a nonuniform list.
    fn from_element(value: &Value) -> Option<Self>;

    /// The values following a `uniform` marker.
    fn from_uniform(values: &[Value]) -> Option<Self>;

    fn negated(self) -> Self;

    /// Append the textual form, rounded to `precision` decimals if given.
    fn render(self, precision: Option<usize>, out: &mut String);
}

impl FieldElement for f64 {
    const TYPE_NAME: &'static str = "scalar";

    fn from_element(value: &Value) -> Option<Self> {
        value.as_scalar()
    }

    fn from_uniform(values: &[Value]) -> Option<Self> {
        match values {
            [v] => v.as_scalar(),
            _ => None,
        }
    }

    fn negated(self) -> Self {
        -self
    }

    fn render(self, precision: Option<usize>, out: &mut String) {
        out.push_str(&format_scalar(self, precision));
    }
}

impl FieldElement for Vector3 {
    const TYPE_NAME: &'static str = "vector";

    fn from_element(value: &Value) -> Option<Self> {
        match value {
            Value::Vector3(v) => Some(*v),
            Value::List(items) => Self::from_uniform(items),
            _ => None,
        }
    }

    fn from_uniform(values: &[Value]) -> Option<Self> {
        match values {
            [Value::Vector3(v)] => Some(*v),
            [x, y, z] => Some(Vector3::new(x.as_scalar()?, y.as_scalar()?, z.as_scalar()?)),
            _ => None,
        }
    }

    fn negated(self) -> Self {
        -self
    }

    fn render(self, precision: Option<usize>, out: &mut String) {
        out.push('(');
        out.push_str(&format_scalar(self.x, precision));
        out.push(' ');
        out.push_str(&format_scalar(self.y, precision));
        out.push(' ');
        out.push_str(&format_scalar(self.z, precision));
        out.push(')');
    }
}

/// Shortest decimal form of `value` after rounding to `precision` places.
/// Negative zero is written as `0`.
pub fn format_scalar(value: f64, precision: Option<usize>) -> String {
    let rounded = match precision {
        Some(p) if value.is_finite() => {
            let scale = 10f64.powi(p.min(15) as i32);
            let r = (value * scale).round() / scale;
            if r.is_finite() { r } else { value }
        }
        _ => value,
    };
    let normalized = if rounded == 0.0 { 0.0 } else { rounded };
    format!("{normalized}")
}
