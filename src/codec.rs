//! Wire-value codec
//!
//! Schema-guided conversion between plain [`Value`]s and tagged [`WireValue`]s.
//! Both directions are recursive tree walks; the first failing node aborts the
//! whole conversion and its path is reported in the error.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};
use tracing::trace;

use crate::error::{Error, Result};
use crate::path::Path;
use crate::schema::Schema;
use crate::types::{Attribute, ScalarType, SetType};
use crate::value::{Value, format_date, has_millis_precision, parse_date, parse_decimal};
use crate::wire::{Item, WireValue};

/// How to treat a wire value whose tag disagrees with the schema
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DecodeMode {
    /// Fail with `DecodeTagMismatch`
    #[default]
    Strict,
    /// Decode the value untyped, as it appears on the wire
    Lenient,
}

// ============================================================================
// Encoding
// ============================================================================

/// Encode a plain value according to its attribute
pub fn encode(attribute: &Attribute, value: &Value) -> Result<WireValue> {
    encode_at(attribute, value, &Path::root())
}

/// Encode a whole item against an entity schema
///
/// The item must be a map. Fields absent from the schema are rejected, schema
/// fields absent from the item are left out.
pub fn encode_item(schema: &Schema, value: &Value) -> Result<Item> {
    let Value::Map(fields) = value else {
        return Err(Error::type_mismatch("<root>", "map", value.type_name()));
    };
    let item = encode_fields(schema, fields, &Path::root())?;
    trace!(attributes = item.len(), "encoded item");
    Ok(item)
}

pub(crate) fn encode_at(attribute: &Attribute, value: &Value, at: &Path) -> Result<WireValue> {
    match attribute {
        Attribute::PartitionKey { of } | Attribute::SortKey { of } => {
            if value.is_null() {
                return Err(Error::type_mismatch(
                    at.to_string(),
                    of.scalar_type().name(),
                    "null",
                ));
            }
            encode_scalar(of.scalar_type(), value, at)
        }
        _ if value.is_null() => Ok(WireValue::Null),
        Attribute::Scalar { of } => encode_scalar(*of, value, at),
        Attribute::Set { of } => encode_set(*of, value, at),
        Attribute::List { items } => {
            let item = items.as_deref().ok_or_else(|| Error::MissingListItemSchema {
                path: at.to_string(),
            })?;
            let Value::List(values) = value else {
                return Err(Error::type_mismatch(at.to_string(), "list", value.type_name()));
            };
            values
                .iter()
                .enumerate()
                .map(|(i, v)| encode_at(item, v, &at.join_index(i)))
                .collect::<Result<Vec<_>>>()
                .map(WireValue::L)
        }
        Attribute::Map { fields } => {
            let Value::Map(values) = value else {
                return Err(Error::type_mismatch(at.to_string(), "map", value.type_name()));
            };
            encode_fields(fields, values, at).map(WireValue::M)
        }
    }
}

fn encode_fields(
    schema: &Schema,
    values: &BTreeMap<String, Value>,
    at: &Path,
) -> Result<HashMap<String, WireValue>> {
    let mut encoded = HashMap::with_capacity(values.len());
    for (name, value) in values {
        let attribute = schema.get(name).ok_or_else(|| Error::UnknownField {
            path: at.to_string(),
            field: name.clone(),
        })?;
        encoded.insert(name.clone(), encode_at(attribute, value, &at.join_field(name))?);
    }
    Ok(encoded)
}

pub(crate) fn encode_scalar(scalar: ScalarType, value: &Value, at: &Path) -> Result<WireValue> {
    match (scalar, value) {
        (ScalarType::String, Value::String(s)) => Ok(WireValue::S(s.clone())),
        (ScalarType::Number, Value::Number(d)) => Ok(WireValue::N(d.to_string())),
        (ScalarType::BigInt, Value::BigInt(i)) => Ok(WireValue::N(i.to_string())),
        (ScalarType::Boolean, Value::Bool(b)) => Ok(WireValue::Bool(*b)),
        (ScalarType::Date, Value::Date(dt)) => encode_date(dt, at),
        // Dates coming from JSON documents arrive as RFC 3339 strings
        (ScalarType::Date, Value::String(s)) => match parse_date(s) {
            Some(dt) => encode_date(&dt, at),
            None => Err(Error::type_mismatch(at.to_string(), "ISO-8601 date", s.clone())),
        },
        _ => Err(Error::type_mismatch(
            at.to_string(),
            scalar.name(),
            value.type_name(),
        )),
    }
}

/// Dates are stored with millisecond precision; finer values would not round-trip
fn encode_date(dt: &DateTime<Utc>, at: &Path) -> Result<WireValue> {
    if !has_millis_precision(dt) {
        return Err(Error::type_mismatch(
            at.to_string(),
            "date with millisecond precision",
            dt.to_rfc3339(),
        ));
    }
    Ok(WireValue::S(format_date(dt)))
}

fn encode_set(of: SetType, value: &Value, at: &Path) -> Result<WireValue> {
    let (Value::Set(elements) | Value::List(elements)) = value else {
        return Err(Error::type_mismatch(at.to_string(), of.name(), value.type_name()));
    };
    if elements.is_empty() {
        return Err(Error::invalid_operand(at.to_string(), "sets cannot be empty"));
    }

    // Members are compared in their stored form, so 1 and 1.0 collapse
    let mut seen = HashSet::with_capacity(elements.len());
    let mut encoded = Vec::with_capacity(elements.len());
    for element in elements {
        let member = encode_set_element(of, element, at)?;
        if seen.insert(member_key(&member)) {
            encoded.push(member);
        }
    }

    Ok(match of {
        SetType::String => WireValue::Ss(encoded.into_iter().filter_map(into_string).collect()),
        SetType::Number => WireValue::Ns(encoded.into_iter().filter_map(into_string).collect()),
        SetType::Binary => WireValue::Bs(
            encoded
                .into_iter()
                .filter_map(|w| match w {
                    WireValue::B(b) => Some(b),
                    _ => None,
                })
                .collect(),
        ),
    })
}

fn member_key(wire: &WireValue) -> Vec<u8> {
    match wire {
        WireValue::N(n) => parse_decimal(n)
            .map(|d| d.normalize().to_string())
            .unwrap_or_else(|| n.clone())
            .into_bytes(),
        WireValue::S(s) => s.clone().into_bytes(),
        WireValue::B(b) => b.to_vec(),
        _ => Vec::new(),
    }
}

fn into_string(wire: WireValue) -> Option<String> {
    match wire {
        WireValue::S(s) | WireValue::N(s) => Some(s),
        _ => None,
    }
}

/// Encode a single set element as its scalar wire form
pub(crate) fn encode_set_element(of: SetType, value: &Value, at: &Path) -> Result<WireValue> {
    match (of, value) {
        (SetType::String, Value::String(s)) => Ok(WireValue::S(s.clone())),
        (SetType::Number, Value::Number(d)) => Ok(WireValue::N(d.to_string())),
        (SetType::Binary, Value::Binary(b)) => Ok(WireValue::B(b.clone())),
        _ => Err(Error::type_mismatch(
            at.to_string(),
            format!("{} element", of.name()),
            value.type_name(),
        )),
    }
}

// ============================================================================
// Decoding
// ============================================================================

/// Decode a wire value according to its attribute
///
/// An absent list decodes to an empty list and an absent map to an empty map;
/// an absent scalar decodes to `None`.
pub fn decode(
    attribute: &Attribute,
    wire: Option<&WireValue>,
    mode: DecodeMode,
) -> Result<Option<Value>> {
    Decoder::new(mode).decode(attribute, wire, &Path::root())
}

/// Decode a stored item against an entity schema
///
/// The item is the implicit top-level map. Attributes not described by the
/// schema are ignored.
pub fn decode_item(schema: &Schema, item: &Item, mode: DecodeMode) -> Result<Value> {
    let fields = Decoder::new(mode).decode_fields(schema, item, &Path::root())?;
    trace!(attributes = fields.len(), "decoded item");
    Ok(Value::Map(fields))
}

/// Decode a partial item, such as the `UPDATED_OLD`/`UPDATED_NEW` attributes of
/// an update
///
/// Only attributes present on the wire appear in the result; absent lists and
/// maps are left out instead of decoding to empty values.
pub fn decode_partial_item(schema: &Schema, item: &Item, mode: DecodeMode) -> Result<Value> {
    let decoder = Decoder {
        mode,
        fill_absent: false,
    };
    let fields = decoder.decode_fields(schema, item, &Path::root())?;
    trace!(attributes = fields.len(), "decoded partial item");
    Ok(Value::Map(fields))
}

struct Decoder {
    mode: DecodeMode,
    fill_absent: bool,
}

impl Decoder {
    fn new(mode: DecodeMode) -> Self {
        Self {
            mode,
            fill_absent: true,
        }
    }

    fn decode(
        &self,
        attribute: &Attribute,
        wire: Option<&WireValue>,
        at: &Path,
    ) -> Result<Option<Value>> {
        let Some(wire) = wire else {
            return Ok(match attribute {
                Attribute::List { .. } if self.fill_absent => Some(Value::List(Vec::new())),
                Attribute::Map { .. } if self.fill_absent => Some(Value::Map(BTreeMap::new())),
                _ => None,
            });
        };

        if matches!(wire, WireValue::Null) {
            return Ok(Some(Value::Null));
        }

        let decoded = match (attribute, wire) {
            (Attribute::PartitionKey { of } | Attribute::SortKey { of }, _) => {
                self.decode_scalar(of.scalar_type(), wire, at)?
            }
            (Attribute::Scalar { of }, _) => self.decode_scalar(*of, wire, at)?,
            (Attribute::Set { of }, _) => self.decode_set(*of, wire, at)?,
            (Attribute::List { items }, WireValue::L(elements)) => {
                let item = items.as_deref().ok_or_else(|| Error::MissingListItemSchema {
                    path: at.to_string(),
                })?;
                let mut values = Vec::with_capacity(elements.len());
                for (i, element) in elements.iter().enumerate() {
                    let value = self.decode(item, Some(element), &at.join_index(i))?;
                    values.push(value.unwrap_or(Value::Null));
                }
                Value::List(values)
            }
            (Attribute::Map { fields }, WireValue::M(entries)) => {
                Value::Map(self.decode_fields(fields, entries, at)?)
            }
            (Attribute::List { .. }, _) => self.mismatch("L", wire, at)?,
            (Attribute::Map { .. }, _) => self.mismatch("M", wire, at)?,
        };

        Ok(Some(decoded))
    }

    fn decode_fields(
        &self,
        schema: &Schema,
        entries: &HashMap<String, WireValue>,
        at: &Path,
    ) -> Result<BTreeMap<String, Value>> {
        let mut fields = BTreeMap::new();
        for (name, attribute) in schema.children() {
            if let Some(value) = self.decode(attribute, entries.get(name), &at.join_field(name))? {
                fields.insert(name.to_string(), value);
            }
        }
        Ok(fields)
    }

    fn decode_scalar(&self, scalar: ScalarType, wire: &WireValue, at: &Path) -> Result<Value> {
        match (scalar, wire) {
            (ScalarType::String, WireValue::S(s)) => Ok(Value::String(s.clone())),
            (ScalarType::Number, WireValue::N(n)) => match parse_decimal(n) {
                Some(d) => Ok(Value::Number(d)),
                None => self.unrepresentable("number", n, at),
            },
            (ScalarType::BigInt, WireValue::N(n)) => match n.parse::<i128>() {
                Ok(i) => Ok(Value::BigInt(i)),
                Err(_) => self.unrepresentable("bigint", n, at),
            },
            (ScalarType::Boolean, WireValue::Bool(b)) => Ok(Value::Bool(*b)),
            (ScalarType::Date, WireValue::S(s)) => parse_date(s)
                .map(Value::Date)
                .ok_or_else(|| Error::type_mismatch(at.to_string(), "ISO-8601 date", s.clone())),
            (ScalarType::String | ScalarType::Date, _) => self.mismatch("S", wire, at),
            (ScalarType::Number | ScalarType::BigInt, _) => self.mismatch("N", wire, at),
            (ScalarType::Boolean, _) => self.mismatch("BOOL", wire, at),
        }
    }

    fn decode_set(&self, of: SetType, wire: &WireValue, at: &Path) -> Result<Value> {
        match (of, wire) {
            (SetType::String, WireValue::Ss(items)) => Ok(Value::Set(
                items.iter().cloned().map(Value::String).collect(),
            )),
            (SetType::Number, WireValue::Ns(items)) => items
                .iter()
                .map(|n| match parse_decimal(n) {
                    Some(d) => Ok(Value::Number(d)),
                    None => self.unrepresentable("number", n, at),
                })
                .collect::<Result<Vec<_>>>()
                .map(Value::Set),
            (SetType::Binary, WireValue::Bs(items)) => Ok(Value::Set(
                items.iter().cloned().map(Value::Binary).collect(),
            )),
            (SetType::String, _) => self.mismatch("SS", wire, at),
            (SetType::Number, _) => self.mismatch("NS", wire, at),
            (SetType::Binary, _) => self.mismatch("BS", wire, at),
        }
    }

    /// An `N` string that the target type cannot hold
    ///
    /// Valid store numbers beyond the decimal range fail with `NumberOutOfRange`
    /// in strict mode and pass through as strings in lenient mode. Anything that
    /// is not a number at all is a type mismatch.
    fn unrepresentable(&self, expected: &str, repr: &str, at: &Path) -> Result<Value> {
        if !is_store_number(repr) {
            return Err(Error::type_mismatch(at.to_string(), expected, repr));
        }
        match self.mode {
            DecodeMode::Strict => Err(Error::NumberOutOfRange {
                path: at.to_string(),
                value: repr.to_string(),
            }),
            DecodeMode::Lenient => {
                trace!(path = %at, value = repr, "passing through out-of-range number");
                Ok(Value::String(repr.to_string()))
            }
        }
    }

    fn mismatch(&self, expected: &str, wire: &WireValue, at: &Path) -> Result<Value> {
        match self.mode {
            DecodeMode::Strict => Err(Error::DecodeTagMismatch {
                path: at.to_string(),
                expected: expected.to_string(),
                found: wire.tag().to_string(),
            }),
            DecodeMode::Lenient => {
                trace!(path = %at, expected, found = %wire.tag(), "passing through mismatched tag");
                Ok(untyped(wire))
            }
        }
    }
}

fn is_store_number(repr: &str) -> bool {
    repr.parse::<f64>().is_ok_and(f64::is_finite)
}

/// Decode a wire value without schema guidance
pub fn untyped(wire: &WireValue) -> Value {
    match wire {
        WireValue::S(s) => Value::String(s.clone()),
        WireValue::N(n) => parse_decimal(n)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(n.clone())),
        WireValue::B(b) => Value::Binary(b.clone()),
        WireValue::Bool(b) => Value::Bool(*b),
        WireValue::Null => Value::Null,
        WireValue::M(m) => Value::Map(m.iter().map(|(k, v)| (k.clone(), untyped(v))).collect()),
        WireValue::L(l) => Value::List(l.iter().map(untyped).collect()),
        WireValue::Ss(items) => Value::Set(items.iter().cloned().map(Value::String).collect()),
        WireValue::Ns(items) => Value::Set(
            items
                .iter()
                .map(|n| untyped(&WireValue::N(n.clone())))
                .collect(),
        ),
        WireValue::Bs(items) => Value::Set(items.iter().cloned().map(Value::Binary).collect()),
    }
}
