//! Wire representation of attribute values
//!
//! The store exchanges every attribute as a single-key tagged object such as
//! `{"S": "hello"}` or `{"L": [{"N": "1"}]}`. Numbers travel as strings so no
//! precision is lost; binaries are base64-encoded in JSON.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::Error;

/// A stored item: attribute name to wire value
pub type Item = HashMap<String, WireValue>;

/// Tag of a wire value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireTag {
    S,
    N,
    B,
    Bool,
    Null,
    M,
    L,
    Ss,
    Ns,
    Bs,
}

impl WireTag {
    pub const ALL: [&'static str; 10] = ["S", "N", "B", "BOOL", "NULL", "M", "L", "SS", "NS", "BS"];

    pub fn as_str(&self) -> &'static str {
        match self {
            WireTag::S => "S",
            WireTag::N => "N",
            WireTag::B => "B",
            WireTag::Bool => "BOOL",
            WireTag::Null => "NULL",
            WireTag::M => "M",
            WireTag::L => "L",
            WireTag::Ss => "SS",
            WireTag::Ns => "NS",
            WireTag::Bs => "BS",
        }
    }
}

impl fmt::Display for WireTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WireTag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "S" => WireTag::S,
            "N" => WireTag::N,
            "B" => WireTag::B,
            "BOOL" => WireTag::Bool,
            "NULL" => WireTag::Null,
            "M" => WireTag::M,
            "L" => WireTag::L,
            "SS" => WireTag::Ss,
            "NS" => WireTag::Ns,
            "BS" => WireTag::Bs,
            other => {
                return Err(Error::type_mismatch(
                    "<attribute_type>",
                    format!("one of {}", WireTag::ALL.join(", ")),
                    other,
                ));
            }
        })
    }
}

/// Tagged attribute value as exchanged with the store
#[derive(Debug, Clone, PartialEq)]
pub enum WireValue {
    S(String),
    /// Decimal number in its string form
    N(String),
    B(Bytes),
    Bool(bool),
    Null,
    M(HashMap<String, WireValue>),
    L(Vec<WireValue>),
    Ss(Vec<String>),
    Ns(Vec<String>),
    Bs(Vec<Bytes>),
}

impl WireValue {
    pub fn tag(&self) -> WireTag {
        match self {
            WireValue::S(_) => WireTag::S,
            WireValue::N(_) => WireTag::N,
            WireValue::B(_) => WireTag::B,
            WireValue::Bool(_) => WireTag::Bool,
            WireValue::Null => WireTag::Null,
            WireValue::M(_) => WireTag::M,
            WireValue::L(_) => WireTag::L,
            WireValue::Ss(_) => WireTag::Ss,
            WireValue::Ns(_) => WireTag::Ns,
            WireValue::Bs(_) => WireTag::Bs,
        }
    }

    pub fn as_s(&self) -> Option<&str> {
        match self {
            WireValue::S(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_n(&self) -> Option<&str> {
        match self {
            WireValue::N(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_m(&self) -> Option<&HashMap<String, WireValue>> {
        match self {
            WireValue::M(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_l(&self) -> Option<&[WireValue]> {
        match self {
            WireValue::L(l) => Some(l),
            _ => None,
        }
    }
}

impl fmt::Display for WireValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireValue::S(s) => write!(f, "{{S: {}}}", s),
            WireValue::N(n) => write!(f, "{{N: {}}}", n),
            WireValue::B(b) => write!(f, "{{B: {} bytes}}", b.len()),
            WireValue::Bool(b) => write!(f, "{{BOOL: {}}}", b),
            WireValue::Null => f.write_str("{NULL: true}"),
            WireValue::M(m) => write!(f, "{{M: {} keys}}", m.len()),
            WireValue::L(l) => write!(f, "{{L: {} items}}", l.len()),
            WireValue::Ss(v) => write!(f, "{{SS: {:?}}}", v),
            WireValue::Ns(v) => write!(f, "{{NS: {:?}}}", v),
            WireValue::Bs(v) => write!(f, "{{BS: {} items}}", v.len()),
        }
    }
}

impl Serialize for WireValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        let tag = self.tag().as_str();
        match self {
            WireValue::S(s) | WireValue::N(s) => map.serialize_entry(tag, s)?,
            WireValue::B(b) => map.serialize_entry(tag, &STANDARD.encode(b))?,
            WireValue::Bool(b) => map.serialize_entry(tag, b)?,
            WireValue::Null => map.serialize_entry(tag, &true)?,
            WireValue::M(m) => map.serialize_entry(tag, m)?,
            WireValue::L(l) => map.serialize_entry(tag, l)?,
            WireValue::Ss(v) | WireValue::Ns(v) => map.serialize_entry(tag, v)?,
            WireValue::Bs(v) => {
                let encoded: Vec<String> = v.iter().map(|b| STANDARD.encode(b)).collect();
                map.serialize_entry(tag, &encoded)?;
            }
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for WireValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(WireValueVisitor)
    }
}

struct WireValueVisitor;

impl<'de> Visitor<'de> for WireValueVisitor {
    type Value = WireValue;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("an attribute value object with exactly one type key")
    }

    fn visit_map<M: MapAccess<'de>>(self, mut map: M) -> Result<Self::Value, M::Error> {
        let Some(key) = map.next_key::<String>()? else {
            return Err(de::Error::custom("attribute value must have exactly one key"));
        };

        let value = match key.as_str() {
            "S" => WireValue::S(map.next_value()?),
            "N" => WireValue::N(map.next_value()?),
            "B" => {
                let encoded: String = map.next_value()?;
                WireValue::B(decode_base64(&encoded).map_err(de::Error::custom)?)
            }
            "BOOL" => WireValue::Bool(map.next_value()?),
            "NULL" => {
                let _: bool = map.next_value()?;
                WireValue::Null
            }
            "M" => WireValue::M(map.next_value()?),
            "L" => WireValue::L(map.next_value()?),
            "SS" => WireValue::Ss(map.next_value()?),
            "NS" => WireValue::Ns(map.next_value()?),
            "BS" => {
                let encoded: Vec<String> = map.next_value()?;
                let decoded = encoded
                    .iter()
                    .map(|e| decode_base64(e))
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(de::Error::custom)?;
                WireValue::Bs(decoded)
            }
            other => return Err(de::Error::unknown_field(other, &WireTag::ALL)),
        };

        if map.next_key::<String>()?.is_some() {
            return Err(de::Error::custom("attribute value must have exactly one key"));
        }

        Ok(value)
    }
}

fn decode_base64(encoded: &str) -> Result<Bytes, base64::DecodeError> {
    STANDARD.decode(encoded).map(Bytes::from)
}
