//! Payload decoding: raw message bytes → fixed-arity numeric vector.
//!
//! Two wire formats are supported:
//! - **Delimited**: `"23.5:60.2:24.1"`, one field per channel in a fixed order.
//! - **Structured**: a JSON object such as `{"ax": -10.0, "ay": 3.9, "az": -9.5}`,
//!   with one named key per channel. Extra keys are ignored.
//!
//! Decoding is pure and total: every input yields either a vector of exactly
//! [`Decoder::dimension`] finite values or a [`DecodeError`].

use thiserror::Error;

/// Why a payload was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Delimited payload did not split into the expected number of fields.
    #[error("expected {expected} fields, found {found}")]
    WrongArity { expected: usize, found: usize },
    /// A field could not be read as a finite floating-point number.
    #[error("field {field} is not a finite number: {raw:?}")]
    NonNumericValue { field: String, raw: String },
    /// Structured payload lacks a required key.
    #[error("missing field {key:?}")]
    MissingField { key: String },
    /// Payload is not a keyed structure at all.
    #[error("malformed payload: {reason}")]
    MalformedStructure { reason: String },
}

/// Wire format of incoming payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadFormat {
    /// Fields separated by `separator`, in channel order.
    Delimited { separator: char },
    /// JSON object; values are looked up by `keys`, in channel order.
    Structured { keys: Vec<String> },
}

/// Decoder bound to a format and a fixed channel count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoder {
    format: PayloadFormat,
    dimension: usize,
}

impl Decoder {
    /// Delimited decoder expecting exactly `dimension` fields.
    pub fn delimited(separator: char, dimension: usize) -> Self {
        Self {
            format: PayloadFormat::Delimited { separator },
            dimension,
        }
    }

    /// Structured decoder extracting `keys` in order. The dimension is the
    /// number of keys.
    pub fn structured<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keys: Vec<String> = keys.into_iter().map(Into::into).collect();
        let dimension = keys.len();
        Self {
            format: PayloadFormat::Structured { keys },
            dimension,
        }
    }

    /// Number of values every successful decode yields.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn decode(&self, payload: &[u8]) -> Result<Vec<f64>, DecodeError> {
        match &self.format {
            PayloadFormat::Delimited { separator } => {
                let text = String::from_utf8_lossy(payload);
                decode_delimited(&text, *separator, self.dimension)
            }
            PayloadFormat::Structured { keys } => decode_structured(payload, keys),
        }
    }
}

/// Decode a delimited payload such as `"23.5:60.2:24.1"`.
pub fn decode_delimited(
    text: &str,
    separator: char,
    dimension: usize,
) -> Result<Vec<f64>, DecodeError> {
    let fields: Vec<&str> = text.trim().split(separator).collect();
    if fields.len() != dimension {
        return Err(DecodeError::WrongArity {
            expected: dimension,
            found: fields.len(),
        });
    }

    fields
        .iter()
        .enumerate()
        .map(|(i, field)| {
            let raw = field.trim();
            match raw.parse::<f64>() {
                Ok(v) if v.is_finite() => Ok(v),
                _ => Err(DecodeError::NonNumericValue {
                    field: format!("#{}", i + 1),
                    raw: raw.to_string(),
                }),
            }
        })
        .collect()
}

/// Decode a JSON object payload, pulling `keys` out in order.
pub fn decode_structured<S: AsRef<str>>(
    payload: &[u8],
    keys: &[S],
) -> Result<Vec<f64>, DecodeError> {
    let value: serde_json::Value =
        serde_json::from_slice(payload).map_err(|e| DecodeError::MalformedStructure {
            reason: e.to_string(),
        })?;
    let object = value
        .as_object()
        .ok_or_else(|| DecodeError::MalformedStructure {
            reason: format!("expected a JSON object, found {}", json_kind(&value)),
        })?;

    keys.iter()
        .map(|key| {
            let key = key.as_ref();
            let field = object.get(key).ok_or_else(|| DecodeError::MissingField {
                key: key.to_string(),
            })?;
            match field.as_f64() {
                Some(v) if v.is_finite() => Ok(v),
                _ => Err(DecodeError::NonNumericValue {
                    field: key.to_string(),
                    raw: field.to_string(),
                }),
            }
        })
        .collect()
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
