//! A named group of tags with best-effort typed access.

use std::collections::HashMap;

use chrono::{DateTime, FixedOffset};
use serde::Serialize;

use super::date::parse_date;
use super::{DirectoryKind, StringValue, TagValue};
use crate::rational::Rational;

/// One stored tag.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tag {
    pub id: u32,
    pub value: TagValue,
}

/// Tags of one logical metadata group plus the problems met while reading
/// them.
///
/// Tags keep the order in which they were first set. Setting an existing
/// tag replaces its value in place. Every getter answers `None` for an
/// absent tag or a value that cannot be coerced.
#[derive(Debug, Clone, Serialize)]
pub struct Directory {
    kind: DirectoryKind,
    tags: Vec<Tag>,
    #[serde(skip)]
    index: HashMap<u32, usize>,
    errors: Vec<String>,
}

impl Directory {
    pub fn new(kind: DirectoryKind) -> Self {
        Self {
            kind,
            tags: Vec::new(),
            index: HashMap::new(),
            errors: Vec::new(),
        }
    }

    pub fn kind(&self) -> &DirectoryKind {
        &self.kind
    }

    pub fn name(&self) -> String {
        self.kind.name()
    }

    // =========================================================================
    // Storage
    // =========================================================================

    pub fn set(&mut self, tag: u32, value: impl Into<TagValue>) {
        let value = value.into();
        match self.index.get(&tag) {
            Some(&i) => self.tags[i].value = value,
            None => {
                self.index.insert(tag, self.tags.len());
                self.tags.push(Tag { id: tag, value });
            }
        }
    }

    pub fn get(&self, tag: u32) -> Option<&TagValue> {
        self.index.get(&tag).map(|&i| &self.tags[i].value)
    }

    pub fn get_mut(&mut self, tag: u32) -> Option<&mut TagValue> {
        let i = *self.index.get(&tag)?;
        Some(&mut self.tags[i].value)
    }

    pub fn contains_tag(&self, tag: u32) -> bool {
        self.index.contains_key(&tag)
    }

    pub fn tag_count(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Tags in first-set order.
    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    pub fn add_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    // =========================================================================
    // Typed Getters
    // =========================================================================

    pub fn get_int(&self, tag: u32) -> Option<i32> {
        match self.get(tag)? {
            TagValue::Int(v) => Some(*v),
            TagValue::Long(v) => Some(*v as i32),
            TagValue::Float(v) => Some(*v as i32),
            TagValue::Double(v) => Some(*v as i32),
            TagValue::Boolean(v) => Some(*v as i32),
            TagValue::Rational(r) => Some(r.to_i32()),
            TagValue::String(s) => Some(string_to_int(s) as i32),
            TagValue::IntArray(v) => single(v).copied(),
            TagValue::LongArray(v) => single(v).map(|x| *x as i32),
            TagValue::Bytes(v) => single(v).map(|x| *x as i32),
            TagValue::RationalArray(v) => single(v).map(Rational::to_i32),
            TagValue::StringArray(v) => single(v).map(|s| string_to_int(s) as i32),
            _ => None,
        }
    }

    pub fn get_long(&self, tag: u32) -> Option<i64> {
        match self.get(tag)? {
            TagValue::Int(v) => Some(*v as i64),
            TagValue::Long(v) => Some(*v),
            TagValue::Float(v) => Some(*v as i64),
            TagValue::Double(v) => Some(*v as i64),
            TagValue::Boolean(v) => Some(*v as i64),
            TagValue::Rational(r) => Some(r.to_i64()),
            TagValue::String(s) => Some(string_to_int(s)),
            TagValue::IntArray(v) => single(v).map(|x| *x as i64),
            TagValue::LongArray(v) => single(v).copied(),
            TagValue::Bytes(v) => single(v).map(|x| *x as i64),
            TagValue::RationalArray(v) => single(v).map(Rational::to_i64),
            _ => None,
        }
    }

    pub fn get_double(&self, tag: u32) -> Option<f64> {
        match self.get(tag)? {
            TagValue::Int(v) => Some(*v as f64),
            TagValue::Long(v) => Some(*v as f64),
            TagValue::Float(v) => Some(*v as f64),
            TagValue::Double(v) => Some(*v),
            TagValue::Boolean(v) => Some(if *v { 1.0 } else { 0.0 }),
            TagValue::Rational(r) => Some(r.to_f64()),
            TagValue::String(s) => s.decode().trim().parse().ok(),
            TagValue::IntArray(v) => single(v).map(|x| *x as f64),
            TagValue::LongArray(v) => single(v).map(|x| *x as f64),
            TagValue::FloatArray(v) => single(v).map(|x| *x as f64),
            TagValue::DoubleArray(v) => single(v).copied(),
            TagValue::Bytes(v) => single(v).map(|x| *x as f64),
            TagValue::RationalArray(v) => single(v).map(Rational::to_f64),
            _ => None,
        }
    }

    pub fn get_float(&self, tag: u32) -> Option<f32> {
        self.get_double(tag).map(|v| v as f32)
    }

    pub fn get_bool(&self, tag: u32) -> Option<bool> {
        match self.get(tag)? {
            TagValue::Boolean(v) => Some(*v),
            TagValue::String(s) => match s.decode().trim().to_ascii_lowercase().as_str() {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            },
            _ => self.get_double(tag).map(|v| v != 0.0),
        }
    }

    /// Any value rendered as text: integers as decimals, rationals in
    /// simple form, arrays space-separated.
    pub fn get_string(&self, tag: u32) -> Option<String> {
        self.get(tag).map(TagValue::to_string)
    }

    pub fn get_string_value(&self, tag: u32) -> Option<StringValue> {
        match self.get(tag)? {
            TagValue::String(s) => Some(s.clone()),
            TagValue::Bytes(b) => Some(StringValue::new(b.clone(), None)),
            TagValue::StringArray(v) => single(v).cloned(),
            other => Some(StringValue::from(other.to_string())),
        }
    }

    pub fn get_string_array(&self, tag: u32) -> Option<Vec<String>> {
        match self.get(tag)? {
            TagValue::StringArray(v) => Some(v.iter().map(StringValue::decode).collect()),
            TagValue::String(s) => Some(vec![s.decode()]),
            TagValue::IntArray(v) => Some(v.iter().map(i32::to_string).collect()),
            TagValue::LongArray(v) => Some(v.iter().map(i64::to_string).collect()),
            TagValue::RationalArray(v) => {
                Some(v.iter().map(|r| r.to_simple_string(false)).collect())
            }
            TagValue::Int(v) => Some(vec![v.to_string()]),
            TagValue::Long(v) => Some(vec![v.to_string()]),
            _ => None,
        }
    }

    pub fn get_int_array(&self, tag: u32) -> Option<Vec<i32>> {
        match self.get(tag)? {
            TagValue::IntArray(v) => Some(v.clone()),
            TagValue::LongArray(v) => Some(v.iter().map(|x| *x as i32).collect()),
            TagValue::Bytes(v) => Some(v.iter().map(|x| *x as i32).collect()),
            TagValue::RationalArray(v) => Some(v.iter().map(Rational::to_i32).collect()),
            TagValue::String(s) => Some(s.bytes().iter().map(|x| *x as i32).collect()),
            TagValue::Int(v) => Some(vec![*v]),
            TagValue::Long(v) => Some(vec![*v as i32]),
            _ => None,
        }
    }

    pub fn get_long_array(&self, tag: u32) -> Option<Vec<i64>> {
        match self.get(tag)? {
            TagValue::LongArray(v) => Some(v.clone()),
            TagValue::IntArray(v) => Some(v.iter().map(|x| *x as i64).collect()),
            TagValue::Bytes(v) => Some(v.iter().map(|x| *x as i64).collect()),
            TagValue::Int(v) => Some(vec![*v as i64]),
            TagValue::Long(v) => Some(vec![*v]),
            _ => None,
        }
    }

    pub fn get_byte_array(&self, tag: u32) -> Option<Vec<u8>> {
        match self.get(tag)? {
            TagValue::Bytes(v) => Some(v.clone()),
            TagValue::String(s) => Some(s.bytes().to_vec()),
            TagValue::IntArray(v) => Some(v.iter().map(|x| *x as u8).collect()),
            TagValue::LongArray(v) => Some(v.iter().map(|x| *x as u8).collect()),
            TagValue::Int(v) => Some(vec![*v as u8]),
            _ => None,
        }
    }

    pub fn get_rational(&self, tag: u32) -> Option<Rational> {
        match self.get(tag)? {
            TagValue::Rational(r) => Some(*r),
            TagValue::RationalArray(v) => single(v).copied(),
            TagValue::Int(v) => Some(Rational::new(*v as i64, 1)),
            TagValue::Long(v) => Some(Rational::new(*v, 1)),
            _ => None,
        }
    }

    pub fn get_rational_array(&self, tag: u32) -> Option<Vec<Rational>> {
        match self.get(tag)? {
            TagValue::RationalArray(v) => Some(v.clone()),
            TagValue::Rational(r) => Some(vec![*r]),
            _ => None,
        }
    }

    /// Parse a textual tag as a date. See [`parse_date`] for the accepted
    /// layouts and time-zone precedence.
    pub fn get_date(
        &self,
        tag: u32,
        sub_second: Option<&str>,
        time_zone: Option<FixedOffset>,
    ) -> Option<DateTime<FixedOffset>> {
        match self.get(tag)? {
            TagValue::String(s) => parse_date(&s.decode(), sub_second, time_zone),
            TagValue::StringArray(v) => parse_date(&single(v)?.decode(), sub_second, time_zone),
            _ => None,
        }
    }
}

fn single<T>(v: &[T]) -> Option<&T> {
    match v {
        [x] => Some(x),
        _ => None,
    }
}

/// Decimal text parses as a number; anything else is packed big-endian,
/// one byte per character, which is how four-character codes read as ints.
fn string_to_int(s: &StringValue) -> i64 {
    let text = s.decode();
    if let Ok(v) = text.trim().parse::<i64>() {
        return v;
    }
    s.bytes()
        .iter()
        .fold(0i64, |acc, b| acc.wrapping_shl(8) | *b as i64)
}
