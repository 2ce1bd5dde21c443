//! Attribute model
//!
//! Describes the semantic kind of a single field: primary key components,
//! scalars, sets, lists and maps. Lists and maps own their nested schema.

use serde::{Deserialize, Serialize};

use crate::schema::Schema;

// ============================================================================
// Value types
// ============================================================================

/// Data type of a scalar attribute
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ScalarType {
    String,
    Number,
    /// Integer wider than the decimal range, stored as a number
    BigInt,
    Boolean,
    /// Timestamp stored as an ISO-8601 string
    Date,
}

impl ScalarType {
    pub fn name(&self) -> &'static str {
        match self {
            ScalarType::String => "string",
            ScalarType::Number => "number",
            ScalarType::BigInt => "bigint",
            ScalarType::Boolean => "boolean",
            ScalarType::Date => "date",
        }
    }

    /// Whether values of this type travel as strings on the wire
    pub fn is_string_like(&self) -> bool {
        matches!(self, ScalarType::String | ScalarType::Date)
    }
}

/// Data type of a primary key component
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum KeyType {
    String,
    Number,
    Boolean,
}

impl KeyType {
    pub fn scalar_type(&self) -> ScalarType {
        match self {
            KeyType::String => ScalarType::String,
            KeyType::Number => ScalarType::Number,
            KeyType::Boolean => ScalarType::Boolean,
        }
    }
}

/// Element type of a set attribute
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SetType {
    String,
    Number,
    Binary,
}

impl SetType {
    pub fn name(&self) -> &'static str {
        match self {
            SetType::String => "string set",
            SetType::Number => "number set",
            SetType::Binary => "binary set",
        }
    }
}

// ============================================================================
// Attribute
// ============================================================================

/// Semantic kind of a single attribute
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Attribute {
    /// Partition key (hash key) of the entity
    PartitionKey { of: KeyType },

    /// Sort key (range key) of the entity
    SortKey { of: KeyType },

    /// Plain scalar attribute
    Scalar { of: ScalarType },

    /// Set of unique scalar elements
    Set { of: SetType },

    /// List whose elements all share one item schema
    List {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        items: Option<Box<Attribute>>,
    },

    /// Map with a nested schema
    Map { fields: Schema },
}

impl Attribute {
    pub fn partition_key(of: KeyType) -> Self {
        Attribute::PartitionKey { of }
    }

    pub fn sort_key(of: KeyType) -> Self {
        Attribute::SortKey { of }
    }

    pub fn scalar(of: ScalarType) -> Self {
        Attribute::Scalar { of }
    }

    pub fn string() -> Self {
        Self::scalar(ScalarType::String)
    }

    pub fn number() -> Self {
        Self::scalar(ScalarType::Number)
    }

    pub fn bigint() -> Self {
        Self::scalar(ScalarType::BigInt)
    }

    pub fn boolean() -> Self {
        Self::scalar(ScalarType::Boolean)
    }

    pub fn date() -> Self {
        Self::scalar(ScalarType::Date)
    }

    pub fn set(of: SetType) -> Self {
        Attribute::Set { of }
    }

    pub fn list(items: Attribute) -> Self {
        Attribute::List {
            items: Some(Box::new(items)),
        }
    }

    pub fn map(fields: Schema) -> Self {
        Attribute::Map { fields }
    }

    pub fn is_key(&self) -> bool {
        matches!(self, Attribute::PartitionKey { .. } | Attribute::SortKey { .. })
    }

    /// Scalar data type of keys and scalars, `None` for composite kinds
    pub fn scalar_type(&self) -> Option<ScalarType> {
        match self {
            Attribute::PartitionKey { of } | Attribute::SortKey { of } => Some(of.scalar_type()),
            Attribute::Scalar { of } => Some(*of),
            _ => None,
        }
    }

    /// Human-readable kind used in error messages
    pub fn kind_name(&self) -> String {
        match self {
            Attribute::PartitionKey { of } => {
                format!("partition key ({})", of.scalar_type().name())
            }
            Attribute::SortKey { of } => format!("sort key ({})", of.scalar_type().name()),
            Attribute::Scalar { of } => of.name().to_string(),
            Attribute::Set { of } => of.name().to_string(),
            Attribute::List { .. } => "list".to_string(),
            Attribute::Map { .. } => "map".to_string(),
        }
    }
}
