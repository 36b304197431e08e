//! Raw field model and the flattener.
//!
//! A field is either a dense array (any rank, row-major) or a ragged list
//! of trajectories. Both flatten to one sequence in trajectory order.

use serde_json::Value;
use tracing::trace;

use edumeta_shared::{EduMetaError, Result};

// ---------------------------------------------------------------------------
// Scalar
// ---------------------------------------------------------------------------

/// A single numeric element as stored in the source dataset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    Int(i64),
    Float(f64),
}

impl Scalar {
    /// Interpret the element as an identifier.
    ///
    /// Integral finite floats are accepted; fractional, non-finite or
    /// out-of-range values are not.
    pub fn to_id(self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(v),
            Self::Float(v) => {
                // i64::MAX as f64 rounds up to 2^63, hence the strict upper bound.
                let in_range = v >= i64::MIN as f64 && v < i64::MAX as f64;
                (v.is_finite() && v.fract() == 0.0 && in_range).then_some(v as i64)
            }
        }
    }

    pub fn to_f64(self) -> f64 {
        match self {
            Self::Int(v) => v as f64,
            Self::Float(v) => v,
        }
    }

    /// Nonzero values are truthy (NaN included).
    pub fn is_truthy(self) -> bool {
        match self {
            Self::Int(v) => v != 0,
            Self::Float(v) => v != 0.0,
        }
    }

    /// Convert a JSON leaf; `None` for non-numeric values.
    pub(crate) fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(Self::Int(i64::from(*b))),
            Value::Number(n) => n
                .as_i64()
                .map(Self::Int)
                .or_else(|| n.as_f64().map(Self::Float)),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// RawField
// ---------------------------------------------------------------------------

/// Storage layout of a field as found in the source.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldLayout {
    /// Rectangular array of any rank, elements in row-major order.
    Dense { shape: Vec<usize>, values: Vec<Scalar> },
    /// One entry per trajectory; each may be a scalar or a nested array.
    Ragged(Vec<Value>),
}

/// A named field loaded from the source dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct RawField {
    pub name: String,
    pub layout: FieldLayout,
}

/// Summary of a field's layout, for `inspect`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutSummary {
    Dense { shape: Vec<usize> },
    Ragged { trajectories: usize, min_len: usize, max_len: usize },
}

impl std::fmt::Display for LayoutSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dense { shape } => {
                let dims: Vec<String> = shape.iter().map(usize::to_string).collect();
                write!(f, "dense ({})", dims.join(" x "))
            }
            Self::Ragged {
                trajectories,
                min_len,
                max_len,
            } => write!(
                f,
                "ragged ({trajectories} trajectories, {min_len}..={max_len} steps)"
            ),
        }
    }
}

impl RawField {
    pub fn dense(name: impl Into<String>, shape: Vec<usize>, values: Vec<Scalar>) -> Self {
        Self {
            name: name.into(),
            layout: FieldLayout::Dense { shape, values },
        }
    }

    pub fn ragged(name: impl Into<String>, trajectories: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            layout: FieldLayout::Ragged(trajectories),
        }
    }

    /// Flatten to a one-dimensional sequence in trajectory-major order.
    pub fn flatten(&self) -> Result<Vec<Scalar>> {
        match &self.layout {
            FieldLayout::Dense { values, .. } => Ok(values.clone()),
            FieldLayout::Ragged(trajectories) => {
                let mut out = Vec::new();
                for (index, trajectory) in trajectories.iter().enumerate() {
                    flatten_value(trajectory, &mut out).map_err(|leaf| {
                        EduMetaError::shape(
                            &self.name,
                            format!(
                                "trajectory {index} cannot be coerced to a flat numeric sequence (found {leaf})"
                            ),
                        )
                    })?;
                }
                trace!(field = %self.name, len = out.len(), "flattened ragged field");
                Ok(out)
            }
        }
    }

    pub fn summary(&self) -> LayoutSummary {
        match &self.layout {
            FieldLayout::Dense { shape, .. } => LayoutSummary::Dense {
                shape: shape.clone(),
            },
            FieldLayout::Ragged(trajectories) => {
                let lens: Vec<usize> = trajectories.iter().map(leaf_count).collect();
                LayoutSummary::Ragged {
                    trajectories: trajectories.len(),
                    min_len: lens.iter().copied().min().unwrap_or(0),
                    max_len: lens.iter().copied().max().unwrap_or(0),
                }
            }
        }
    }
}

/// Depth-first flatten of one trajectory. On failure returns a short
/// description of the offending leaf.
fn flatten_value(value: &Value, out: &mut Vec<Scalar>) -> std::result::Result<(), &'static str> {
    match value {
        Value::Array(items) => {
            for item in items {
                flatten_value(item, out)?;
            }
            Ok(())
        }
        Value::Null => Err("null"),
        Value::String(_) => Err("a string"),
        Value::Object(_) => Err("an object"),
        leaf => {
            out.push(Scalar::from_json(leaf).ok_or("a non-numeric value")?);
            Ok(())
        }
    }
}

fn leaf_count(value: &Value) -> usize {
    match value {
        Value::Array(items) => items.iter().map(leaf_count).sum(),
        _ => 1,
    }
}
