//! Configuration for a Table
//!
//! Provides a builder pattern for configuring how requests against one table
//! are compiled and how responses are decoded.

use crate::codec::DecodeMode;
use crate::expression::compiler::{AliasAllocator, DEFAULT_NAME_PREFIX, DEFAULT_VALUE_PREFIX};
use crate::operation::ReturnConsumedCapacity;

/// Placeholder prefixes used in compiled expressions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasPrefixes {
    /// Prefix of attribute name aliases; must start with `#`
    pub name: String,
    /// Prefix of value aliases; must start with `:`
    pub value: String,
}

impl Default for AliasPrefixes {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME_PREFIX.to_string(),
            value: DEFAULT_VALUE_PREFIX.to_string(),
        }
    }
}

/// Configuration for a table
#[derive(Debug, Clone)]
pub struct TableConfig {
    /// Table name sent with every request
    pub table_name: String,
    /// Alias prefixes for compiled expressions
    pub aliases: AliasPrefixes,
    /// How tag mismatches are handled when decoding responses
    pub decode_mode: DecodeMode,
    /// Consumed-capacity level requested when an operation does not set one
    pub return_consumed_capacity: Option<ReturnConsumedCapacity>,
}

impl TableConfig {
    /// Create a new configuration builder
    pub fn builder(table_name: impl Into<String>) -> TableConfigBuilder {
        TableConfigBuilder::new(table_name)
    }

    /// Fresh alias allocator using the configured prefixes
    pub fn allocator(&self) -> AliasAllocator {
        AliasAllocator::with_prefixes(&self.aliases.name, &self.aliases.value)
    }
}

/// Builder for TableConfig
#[derive(Debug)]
pub struct TableConfigBuilder {
    table_name: String,
    aliases: AliasPrefixes,
    decode_mode: DecodeMode,
    return_consumed_capacity: Option<ReturnConsumedCapacity>,
}

impl TableConfigBuilder {
    /// Create a new builder with the table name
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            aliases: AliasPrefixes::default(),
            decode_mode: DecodeMode::Strict,
            return_consumed_capacity: None,
        }
    }

    /// Set the attribute name alias prefix (default: "#f")
    pub fn name_alias_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.aliases.name = prefix.into();
        self
    }

    /// Set the value alias prefix (default: ":v")
    pub fn value_alias_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.aliases.value = prefix.into();
        self
    }

    /// Enable or disable strict decoding (default: true)
    pub fn strict_decode(mut self, enabled: bool) -> Self {
        self.decode_mode = if enabled {
            DecodeMode::Strict
        } else {
            DecodeMode::Lenient
        };
        self
    }

    /// Set the decode mode directly
    pub fn decode_mode(mut self, mode: DecodeMode) -> Self {
        self.decode_mode = mode;
        self
    }

    /// Request consumed capacity on every operation unless overridden
    pub fn return_consumed_capacity(mut self, level: ReturnConsumedCapacity) -> Self {
        self.return_consumed_capacity = Some(level);
        self
    }

    /// Build the configuration
    pub fn build(self) -> TableConfig {
        TableConfig {
            table_name: self.table_name,
            aliases: self.aliases,
            decode_mode: self.decode_mode,
            return_consumed_capacity: self.return_consumed_capacity,
        }
    }
}
