//! Field values of a partitioned store.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// State of a [`PartitionedStore`](super::PartitionedStore): a flat,
/// ordered map from field name to scalar.
pub type PartitionState = IndexMap<String, Scalar>;

/// A single top-level field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Number(f64),
    Bool(bool),
    Text(String),
}

impl Scalar {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(t) => Some(t),
            _ => None,
        }
    }

    /// Plain-text form written to a storage slot.
    ///
    /// Numbers use the shortest text that reads back to the same value.
    /// Magnitudes from `1e21` up and below `1e-6` switch to exponent form
    /// (`"1e+21"`, `"1e-7"`); everything else is plain decimal.
    pub fn to_stored(&self) -> String {
        self.to_string()
    }

    /// Whether this value should be written back over `stored`.
    ///
    /// The comparison is against the raw stored text without decoding it,
    /// so only text values can ever match. Numbers and booleans always
    /// count as dirty, even when the slot already holds their exact text.
    pub fn differs_from_stored(&self, stored: Option<&str>) -> bool {
        match self {
            Self::Text(text) => stored != Some(text.as_str()),
            Self::Number(_) | Self::Bool(_) => true,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) if n.is_nan() => f.write_str("NaN"),
            Self::Number(n) if n.is_infinite() => {
                f.write_str(if *n > 0.0 { "Infinity" } else { "-Infinity" })
            }
            // Also folds -0 into "0".
            Self::Number(n) if *n == 0.0 => f.write_str("0"),
            Self::Number(n) if n.abs() >= 1e21 || n.abs() < 1e-6 => {
                // Exponent form with an explicit sign, e.g. "1e+21" and "1.5e-7".
                let text = format!("{n:e}");
                match text.split_once('e') {
                    Some((mantissa, exp)) if !exp.starts_with('-') => {
                        write!(f, "{mantissa}e+{exp}")
                    }
                    _ => f.write_str(&text),
                }
            }
            Self::Number(n) => write!(f, "{n}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Text(t) => f.write_str(t),
        }
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for Scalar {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}
