//! Values and their binary encoding
//!
//! A value is an arbitrary serializable datum: scalars, text, byte strings,
//! ordered sequences, mappings with scalar-or-text keys, and dense numeric
//! arrays. Values are encoded to MessagePack via `rmp-serde`; the encoding
//! is deterministic for these types, which is what makes round-trip
//! correctness testable.
//!
//! Dense arrays carry their raw little-endian buffer (`serde_bytes`), so a
//! million-element f32 array costs four megabytes on the wire, not a
//! million individually tagged numbers.
//!
//! Producers in other runtimes may hold set-like or tuple-like containers;
//! those arrive here as [`Value::List`]. The degradation is deliberate and
//! covered by the test suite, not an error.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Version of the value encoding, recorded in the store header
///
/// Bumped whenever the wire shape of [`Value`] changes incompatibly.
pub const CODEC_VERSION: u16 = 1;

/// Element type of a dense numeric array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dtype {
    /// 8-bit signed integer
    I8,
    /// 16-bit signed integer
    I16,
    /// 32-bit signed integer
    I32,
    /// 64-bit signed integer
    I64,
    /// 8-bit unsigned integer
    U8,
    /// 16-bit unsigned integer
    U16,
    /// 32-bit unsigned integer
    U32,
    /// 64-bit unsigned integer
    U64,
    /// 32-bit float
    F32,
    /// 64-bit float
    F64,
}

impl Dtype {
    /// Size of one element in bytes
    pub fn size_bytes(&self) -> usize {
        match self {
            Dtype::I8 | Dtype::U8 => 1,
            Dtype::I16 | Dtype::U16 => 2,
            Dtype::I32 | Dtype::U32 | Dtype::F32 => 4,
            Dtype::I64 | Dtype::U64 | Dtype::F64 => 8,
        }
    }
}

/// Dense n-dimensional numeric array
///
/// The buffer holds elements in row-major order, little-endian.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NdArray {
    /// Element type
    pub dtype: Dtype,
    /// Dimension sizes, row-major
    pub shape: Vec<u64>,
    /// Raw little-endian element buffer
    #[serde(with = "serde_bytes")]
    pub data: Vec<u8>,
}

impl NdArray {
    /// Create an array, validating that the buffer matches the shape
    pub fn new(dtype: Dtype, shape: Vec<u64>, data: Vec<u8>) -> Result<Self> {
        let arr = Self { dtype, shape, data };
        arr.validate()?;
        Ok(arr)
    }

    /// Number of elements implied by the shape
    pub fn element_count(&self) -> u64 {
        self.shape.iter().product()
    }

    fn validate(&self) -> Result<()> {
        let expected = self
            .element_count()
            .checked_mul(self.dtype.size_bytes() as u64)
            .ok_or_else(|| Error::encoding("array shape overflows"))?;
        if expected != self.data.len() as u64 {
            return Err(Error::encoding(format!(
                "array buffer is {} bytes, shape {:?} of {:?} needs {}",
                self.data.len(),
                self.shape,
                self.dtype,
                expected
            )));
        }
        Ok(())
    }
}

/// A store value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Null value
    Null,
    /// Boolean value
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit floating point
    Float(f64),
    /// UTF-8 string
    Str(String),
    /// Raw bytes
    Bytes(#[serde(with = "serde_bytes")] Vec<u8>),
    /// Ordered sequence of values
    List(Vec<Value>),
    /// Mapping with scalar-or-text keys, in insertion order
    Map(Vec<(Value, Value)>),
    /// Dense numeric array
    Array(NdArray),
}

impl Value {
    /// Whether this value may be used as a mapping key
    pub fn is_scalar_key(&self) -> bool {
        matches!(
            self,
            Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::Str(_)
        )
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(v)
    }
}

impl From<NdArray> for Value {
    fn from(v: NdArray) -> Self {
        Value::Array(v)
    }
}

/// Encode a value to its MessagePack representation
///
/// # Errors
///
/// Returns `Error::Encoding` when a mapping key is not scalar-or-text or
/// an array buffer does not match its declared shape.
pub fn encode_value(value: &Value) -> Result<Vec<u8>> {
    validate_value(value)?;
    rmp_serde::to_vec(value).map_err(|e| Error::encoding(e.to_string()))
}

/// Decode a value from its MessagePack representation
pub fn decode_value(buf: &[u8]) -> Result<Value> {
    let value: Value = rmp_serde::from_slice(buf).map_err(|e| Error::encoding(e.to_string()))?;
    validate_value(&value)?;
    Ok(value)
}

fn validate_value(value: &Value) -> Result<()> {
    match value {
        Value::Null | Value::Bool(_) | Value::Int(_) | Value::Float(_) => Ok(()),
        Value::Str(_) | Value::Bytes(_) => Ok(()),
        Value::List(items) => {
            for item in items {
                validate_value(item)?;
            }
            Ok(())
        }
        Value::Map(entries) => {
            for (k, v) in entries {
                if !k.is_scalar_key() {
                    return Err(Error::encoding(format!(
                        "map key must be scalar or text, got {k:?}"
                    )));
                }
                validate_value(v)?;
            }
            Ok(())
        }
        Value::Array(arr) => arr.validate(),
    }
}
