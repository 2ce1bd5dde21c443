//! Plain application-level values
//!
//! [`Value`] is what callers hand to the codec and what decoding returns. Unlike
//! the wire representation it carries native numbers, dates and binaries.

use std::collections::BTreeMap;
use std::str::FromStr;

use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rust_decimal::Decimal;

use crate::error::{Error, Result};

/// Plain value of an attribute
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(Decimal),
    BigInt(i128),
    String(String),
    Date(DateTime<Utc>),
    Binary(Bytes),
    Set(Vec<Value>),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Build a map value from key/value pairs
    pub fn map<K, V, I>(entries: I) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        Value::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Build a list value
    pub fn list<V: Into<Value>, I: IntoIterator<Item = V>>(items: I) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }

    /// Build a set value
    pub fn set<V: Into<Value>, I: IntoIterator<Item = V>>(items: I) -> Self {
        Value::Set(items.into_iter().map(Into::into).collect())
    }

    /// Build a date value truncated to the millisecond precision stored on the wire
    pub fn date(dt: DateTime<Utc>) -> Self {
        Value::Date(dt.trunc_subsecs(3))
    }

    /// Name of the value's runtime type, for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::BigInt(_) => "bigint",
            Value::String(_) => "string",
            Value::Date(_) => "date",
            Value::Binary(_) => "binary",
            Value::Set(_) => "set",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Field of a map value
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.as_map().and_then(|m| m.get(name))
    }

    /// Convert a JSON document into a plain value
    ///
    /// Numbers keep their decimal representation. Dates and sets have no JSON
    /// form; they arrive as strings and arrays and are interpreted by the codec
    /// according to the schema.
    pub fn from_json(json: serde_json::Value) -> Result<Self> {
        Ok(match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(parse_decimal(&n.to_string()).ok_or_else(
                || Error::type_mismatch("<json>", "decimal number", n.to_string()),
            )?),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => Value::List(
                items
                    .into_iter()
                    .map(Value::from_json)
                    .collect::<Result<_>>()?,
            ),
            serde_json::Value::Object(fields) => Value::Map(
                fields
                    .into_iter()
                    .map(|(k, v)| Ok((k, Value::from_json(v)?)))
                    .collect::<Result<_>>()?,
            ),
        })
    }

    /// Convert into a JSON document
    ///
    /// Dates become ISO-8601 strings and binaries base64 strings.
    pub fn to_json(&self) -> serde_json::Value {
        use base64::Engine;

        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(d) => number_to_json(&d.normalize().to_string()),
            Value::BigInt(i) => number_to_json(&i.to_string()),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Date(dt) => serde_json::Value::String(format_date(dt)),
            Value::Binary(b) => serde_json::Value::String(
                base64::engine::general_purpose::STANDARD.encode(b),
            ),
            Value::Set(items) | Value::List(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Map(fields) => serde_json::Value::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

fn number_to_json(repr: &str) -> serde_json::Value {
    serde_json::Number::from_str(repr)
        .map(serde_json::Value::Number)
        .unwrap_or_else(|_| serde_json::Value::String(repr.to_string()))
}

/// Parse a decimal number string, accepting scientific notation
pub(crate) fn parse_decimal(repr: &str) -> Option<Decimal> {
    Decimal::from_str(repr)
        .or_else(|_| Decimal::from_scientific(repr))
        .ok()
}

/// Fixed ISO-8601 form used for dates on the wire: `2024-01-31T08:15:00.000Z`
pub(crate) fn format_date(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Whether a date survives the wire format unchanged
pub(crate) fn has_millis_precision(dt: &DateTime<Utc>) -> bool {
    dt.timestamp_subsec_nanos() % 1_000_000 == 0
}

pub(crate) fn parse_date(repr: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(repr)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

// ============================================================================
// Conversions
// ============================================================================

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(Decimal::from(n))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(Decimal::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Number(Decimal::from(n))
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::Number(Decimal::from(n))
    }
}

impl From<i128> for Value {
    fn from(n: i128) -> Self {
        Value::BigInt(n)
    }
}

impl From<Decimal> for Value {
    fn from(d: Decimal) -> Self {
        Value::Number(d)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(dt: DateTime<Utc>) -> Self {
        Value::date(dt)
    }
}

impl From<Bytes> for Value {
    fn from(b: Bytes) -> Self {
        Value::Binary(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(fields: BTreeMap<String, Value>) -> Self {
        Value::Map(fields)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}
