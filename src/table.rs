//! Table handle binding an entity schema to its configuration
//!
//! A [`Table`] is immutable once created and can be shared between tasks. It is
//! the entry point for item encoding and for every operation builder.

use tracing::debug;

use crate::codec::{decode_item, decode_partial_item, encode_at, encode_item};
use crate::config::TableConfig;
use crate::error::{Error, Result};
use crate::expression::AliasAllocator;
use crate::operation::{
    DeleteBuilder, GetBuilder, PutBuilder, QueryBuilder, ScanBuilder, UpdateBuilder,
};
use crate::path::Path;
use crate::schema::Schema;
use crate::value::Value;
use crate::wire::Item;

/// A store table described by an entity schema
#[derive(Debug, Clone)]
pub struct Table {
    config: TableConfig,
    schema: Schema,
}

impl Table {
    /// Create a table handle, validating the schema and configuration
    pub fn new(config: TableConfig, schema: Schema) -> Result<Self> {
        if config.table_name.trim().is_empty() {
            return Err(Error::InvalidConfig("table name cannot be empty".to_string()));
        }
        validate_prefix(&config.aliases.name, '#')?;
        validate_prefix(&config.aliases.value, ':')?;
        schema.validate_entity()?;

        debug!(
            table = %config.table_name,
            attributes = schema.len(),
            keys = ?schema.key_names(),
            "table registered"
        );
        Ok(Self { config, schema })
    }

    pub fn name(&self) -> &str {
        &self.config.table_name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    /// Fresh alias allocator for one request
    pub fn allocator(&self) -> AliasAllocator {
        self.config.allocator()
    }

    /// Encode a whole item for writing
    pub fn encode_item(&self, value: &Value) -> Result<Item> {
        encode_item(&self.schema, value)
    }

    /// Decode a stored item using the configured decode mode
    pub fn decode_item(&self, item: &Item) -> Result<Value> {
        decode_item(&self.schema, item, self.config.decode_mode)
    }

    /// Decode the partial attributes returned by an update
    pub fn decode_partial_item(&self, item: &Item) -> Result<Value> {
        decode_partial_item(&self.schema, item, self.config.decode_mode)
    }

    /// Encode a primary key
    ///
    /// The value must be a map holding every key attribute and nothing else.
    pub fn encode_key(&self, key: &Value) -> Result<Item> {
        let Value::Map(fields) = key else {
            return Err(Error::type_mismatch("<key>", "map", key.type_name()));
        };

        if let Some(extra) = fields.keys().find(|name| !self.schema.is_primary_key(name)) {
            return Err(Error::UnknownField {
                path: "<key>".to_string(),
                field: extra.clone(),
            });
        }

        let mut item = Item::new();
        for (name, attribute) in self.schema.children().filter(|(_, a)| a.is_key()) {
            let value = fields.get(name).ok_or_else(|| {
                Error::invalid_operand(name, "key attribute is required")
            })?;
            item.insert(name.to_string(), encode_at(attribute, value, &Path::field(name))?);
        }
        Ok(item)
    }

    pub fn query(&self) -> QueryBuilder<'_> {
        QueryBuilder::new(self)
    }

    pub fn scan(&self) -> ScanBuilder<'_> {
        ScanBuilder::new(self)
    }

    pub fn get(&self) -> GetBuilder<'_> {
        GetBuilder::new(self)
    }

    pub fn put(&self) -> PutBuilder<'_> {
        PutBuilder::new(self)
    }

    pub fn update(&self) -> UpdateBuilder<'_> {
        UpdateBuilder::new(self)
    }

    pub fn delete(&self) -> DeleteBuilder<'_> {
        DeleteBuilder::new(self)
    }
}

fn validate_prefix(prefix: &str, marker: char) -> Result<()> {
    let valid = prefix.starts_with(marker)
        && prefix.len() > 1
        && prefix[1..]
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(Error::InvalidConfig(format!(
            "alias prefix '{}' must start with '{}' followed by letters, digits or '_'",
            prefix, marker
        )));
    }
    Ok(())
}
