//! Store configuration.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::scalar::Scalar;
use crate::error::{StateError, StateResult};

/// Default storage key.
pub const DEFAULT_KEY: &str = "state";

/// Options shared by [`Store`](super::Store) and
/// [`PartitionedStore`](super::PartitionedStore).
///
/// Deserializes from any serde format. Missing fields take their defaults:
///
/// ```rust
/// use tether_core::store::{Coercion, StoreOptions};
///
/// let text = r#"{ "persist": true, "fields": { "count": "text" } }"#;
/// let options = StoreOptions::from_json(text).unwrap();
/// assert_eq!(options.key, "state");
/// assert_eq!(options.fields["count"], Coercion::Text);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreOptions {
    /// Whether to back the store with storage.
    #[serde(alias = "useLocalStorage")]
    pub persist: bool,

    /// Storage key, or slot prefix for partitioned stores.
    pub key: String,

    /// Per-field decoding for partitioned stores. Fields not listed decode
    /// according to their initial value. Ignored by [`Store`](super::Store).
    pub fields: IndexMap<String, Coercion>,
}

impl StoreOptions {
    /// Persist under `key`.
    pub fn persisted(key: impl Into<String>) -> Self {
        Self {
            persist: true,
            key: key.into(),
            ..Self::default()
        }
    }

    /// Decode `field` with `coercion` instead of inferring it.
    pub fn with_field(mut self, field: impl Into<String>, coercion: Coercion) -> Self {
        self.fields.insert(field.into(), coercion);
        self
    }

    /// Parse options from JSON text.
    pub fn from_json(text: &str) -> StateResult<Self> {
        serde_json::from_str(text).map_err(|source| StateError::Decode {
            key: "store options".to_string(),
            source,
        })
    }
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            persist: false,
            key: DEFAULT_KEY.to_string(),
            fields: IndexMap::new(),
        }
    }
}

/// How stored text for one field is turned back into a [`Scalar`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Coercion {
    /// Parse as a number. Empty text is `0`; anything unparsable is `NaN`.
    ///
    /// Accepts decimal and exponent forms, `Infinity`/`NaN`, and unsigned
    /// `0x`/`0o`/`0b` integers. Prefixed literals wider than 128 bits are
    /// `NaN`.
    Number,

    /// Any non-empty text is `true`, including `"false"`. Only `""` is `false`.
    Boolean,

    /// Keep the text as is.
    Text,
}

impl Coercion {
    /// The coercion matching the kind of `value`.
    pub fn for_value(value: &Scalar) -> Self {
        match value {
            Scalar::Number(_) => Self::Number,
            Scalar::Bool(_) => Self::Boolean,
            Scalar::Text(_) => Self::Text,
        }
    }

    /// Decode `raw` stored text.
    pub fn coerce(self, raw: &str) -> Scalar {
        match self {
            Self::Number => Scalar::Number(parse_number(raw)),
            Self::Boolean => Scalar::Bool(!raw.is_empty()),
            Self::Text => Scalar::Text(raw.to_string()),
        }
    }
}

fn parse_number(raw: &str) -> f64 {
    let parsed = match raw.trim() {
        "" => Some(0.0),
        "NaN" => Some(f64::NAN),
        "Infinity" | "+Infinity" => Some(f64::INFINITY),
        "-Infinity" => Some(f64::NEG_INFINITY),
        text => parse_prefixed(text).or_else(|| parse_decimal(text)),
    };

    parsed.unwrap_or_else(|| {
        tracing::warn!(raw, "stored text is not a number, decoding as NaN");
        f64::NAN
    })
}

/// Unsigned `0x`, `0o`, or `0b` integer literal.
fn parse_prefixed(text: &str) -> Option<f64> {
    let radix = match text.get(..2)? {
        "0x" | "0X" => 16,
        "0o" | "0O" => 8,
        "0b" | "0B" => 2,
        _ => return None,
    };
    let digits = &text[2..];
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return None;
    }
    u128::from_str_radix(digits, radix).ok().map(|n| n as f64)
}

fn parse_decimal(text: &str) -> Option<f64> {
    // Rust also accepts "inf" and "nan"; stored text never contains them.
    let plain = text
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'+' | b'-'));
    if plain {
        text.parse().ok()
    } else {
        None
    }
}
