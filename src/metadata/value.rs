//! Values stored against tag ids.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::charset::{guess_charset, Charset};
use crate::rational::Rational;

// =============================================================================
// StringValue
// =============================================================================

/// Raw text bytes plus the encoding they were declared with, if any.
///
/// Keeping the bytes lets callers re-decode when they know better than the
/// file did.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StringValue {
    bytes: Vec<u8>,
    charset: Option<Charset>,
}

impl StringValue {
    pub fn new(bytes: impl Into<Vec<u8>>, charset: Option<Charset>) -> Self {
        Self {
            bytes: bytes.into(),
            charset,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn charset(&self) -> Option<Charset> {
        self.charset
    }

    /// Decode with the declared charset, or a guess when none was declared.
    pub fn decode(&self) -> String {
        self.charset
            .unwrap_or_else(|| guess_charset(&self.bytes))
            .decode(&self.bytes)
    }

    pub fn decode_with(&self, charset: Charset) -> String {
        charset.decode(&self.bytes)
    }
}

impl fmt::Display for StringValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.decode())
    }
}

impl From<&str> for StringValue {
    fn from(s: &str) -> Self {
        Self::new(s.as_bytes(), Some(Charset::Utf8))
    }
}

impl From<String> for StringValue {
    fn from(s: String) -> Self {
        Self::new(s.into_bytes(), Some(Charset::Utf8))
    }
}

impl Serialize for StringValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.decode())
    }
}

// =============================================================================
// KeyValuePair
// =============================================================================

/// One keyword/text pair, as carried by PNG textual chunks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyValuePair {
    pub key: String,
    pub value: StringValue,
}

impl KeyValuePair {
    pub fn new(key: impl Into<String>, value: StringValue) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

// =============================================================================
// TagValue
// =============================================================================

/// Typed value of one tag.
///
/// Unsigned 32-bit quantities are stored as [`TagValue::Long`] so they never
/// lose range.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TagValue {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Boolean(bool),
    String(StringValue),
    StringArray(Vec<StringValue>),
    IntArray(Vec<i32>),
    LongArray(Vec<i64>),
    FloatArray(Vec<f32>),
    DoubleArray(Vec<f64>),
    Bytes(Vec<u8>),
    Rational(Rational),
    RationalArray(Vec<Rational>),
    KeyValuePairs(Vec<KeyValuePair>),
}

impl TagValue {
    /// Number of elements for array values, `None` for scalars.
    pub fn array_len(&self) -> Option<usize> {
        match self {
            TagValue::StringArray(v) => Some(v.len()),
            TagValue::IntArray(v) => Some(v.len()),
            TagValue::LongArray(v) => Some(v.len()),
            TagValue::FloatArray(v) => Some(v.len()),
            TagValue::DoubleArray(v) => Some(v.len()),
            TagValue::Bytes(v) => Some(v.len()),
            TagValue::RationalArray(v) => Some(v.len()),
            TagValue::KeyValuePairs(v) => Some(v.len()),
            _ => None,
        }
    }
}

fn join<T>(items: &[T], render: impl Fn(&T) -> String) -> String {
    items.iter().map(render).collect::<Vec<_>>().join(" ")
}

impl fmt::Display for TagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagValue::Int(v) => write!(f, "{v}"),
            TagValue::Long(v) => write!(f, "{v}"),
            TagValue::Float(v) => write!(f, "{v}"),
            TagValue::Double(v) => write!(f, "{v}"),
            TagValue::Boolean(v) => write!(f, "{v}"),
            TagValue::String(v) => write!(f, "{v}"),
            TagValue::Rational(v) => f.write_str(&v.to_simple_string(true)),
            TagValue::StringArray(v) => f.write_str(&join(v, |s| s.decode())),
            TagValue::IntArray(v) => f.write_str(&join(v, |x| x.to_string())),
            TagValue::LongArray(v) => f.write_str(&join(v, |x| x.to_string())),
            TagValue::FloatArray(v) => f.write_str(&join(v, |x| x.to_string())),
            TagValue::DoubleArray(v) => f.write_str(&join(v, |x| x.to_string())),
            TagValue::Bytes(v) => f.write_str(&join(v, |x| x.to_string())),
            TagValue::RationalArray(v) => f.write_str(&join(v, |r| r.to_simple_string(true))),
            TagValue::KeyValuePairs(v) => {
                let rendered = v
                    .iter()
                    .map(|kv| format!("{}: {}", kv.key, kv.value))
                    .collect::<Vec<_>>()
                    .join("; ");
                f.write_str(&rendered)
            }
        }
    }
}

macro_rules! impl_from {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$t> for TagValue {
                fn from(v: $t) -> Self {
                    TagValue::$variant(v.into())
                }
            }
        )*
    };
}

impl_from! {
    i32 => Int,
    u16 => Int,
    u8 => Int,
    i64 => Long,
    u32 => Long,
    f32 => Float,
    f64 => Double,
    bool => Boolean,
    StringValue => String,
    &str => String,
    String => String,
    Vec<StringValue> => StringArray,
    Vec<i32> => IntArray,
    Vec<i64> => LongArray,
    Vec<f32> => FloatArray,
    Vec<f64> => DoubleArray,
    Vec<u8> => Bytes,
    Rational => Rational,
    Vec<Rational> => RationalArray,
    Vec<KeyValuePair> => KeyValuePairs,
}
