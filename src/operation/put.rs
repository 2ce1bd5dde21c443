//! PutItem operation

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::expression::{Condition, ConditionBuilder, Operator, compile};
use crate::operation::{
    Aliases, OperationRequest, Pending, ReturnConsumedCapacity, ReturnItemCollectionMetrics,
    ReturnValues, StoreClient, check_return_values,
};
use crate::path::Path;
use crate::table::Table;
use crate::value::Value;
use crate::wire::{Item, WireValue};

/// Compiled `PutItem` request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PutRequest {
    pub table_name: String,

    pub item: Item,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition_expression: Option<String>,

    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_names: HashMap<String, String>,

    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_values: HashMap<String, WireValue>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_values: Option<ReturnValues>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_consumed_capacity: Option<ReturnConsumedCapacity>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_item_collection_metrics: Option<ReturnItemCollectionMetrics>,
}

/// Builder for a `PutItem` request
#[derive(Debug)]
pub struct PutBuilder<'a> {
    table: &'a Table,
    item: Option<Item>,
    condition: Option<Condition>,
    throw_if_exists: bool,
    return_values: Option<ReturnValues>,
    return_consumed_capacity: Option<ReturnConsumedCapacity>,
    return_item_collection_metrics: Option<ReturnItemCollectionMetrics>,
    pending: Pending,
}

impl<'a> PutBuilder<'a> {
    pub(crate) fn new(table: &'a Table) -> Self {
        Self {
            table,
            item: None,
            condition: None,
            throw_if_exists: false,
            return_values: None,
            return_consumed_capacity: table.config().return_consumed_capacity,
            return_item_collection_metrics: None,
            pending: Pending::default(),
        }
    }

    /// Item to write; it must contain the primary key
    pub fn item(mut self, item: impl Into<Value>) -> Self {
        let schema = self.table.schema();
        let encoded = self.table.encode_item(&item.into()).and_then(|item| {
            let missing = schema
                .key_names()
                .into_iter()
                .find(|name| !item.contains_key(*name));
            match missing {
                Some(name) => Err(Error::invalid_operand(name, "key attribute is required")),
                None => Ok(item),
            }
        });
        self.item = self.pending.keep(encoded);
        self
    }

    /// Condition the write on the stored item
    pub fn condition<F>(mut self, build: F) -> Self
    where
        F: FnOnce(&ConditionBuilder<'a>) -> Result<Condition>,
    {
        let eb = ConditionBuilder::new(self.table.schema().full_view());
        self.condition = self.pending.keep(build(&eb));
        self
    }

    /// Fail the write when an item with the same key already exists
    pub fn throw_if_exists(mut self) -> Self {
        self.throw_if_exists = true;
        self
    }

    /// `ALL_OLD` or `ALL_NEW`
    pub fn return_values(mut self, mode: ReturnValues) -> Self {
        let checked = check_return_values(
            "PutItem",
            mode,
            &[ReturnValues::AllOld, ReturnValues::AllNew],
        );
        self.return_values = self.pending.keep(checked).map(|_| mode);
        self
    }

    pub fn return_consumed_capacity(mut self, level: ReturnConsumedCapacity) -> Self {
        self.return_consumed_capacity = Some(level);
        self
    }

    pub fn return_item_collection_metrics(mut self, metrics: ReturnItemCollectionMetrics) -> Self {
        self.return_item_collection_metrics = Some(metrics);
        self
    }

    pub fn build(self) -> Result<PutRequest> {
        self.pending.check()?;
        let item = self
            .item
            .ok_or_else(|| Error::invalid_operand("<request>", "put requires an item"))?;

        let condition = if self.throw_if_exists {
            let pk = self.table.schema().partition_key().ok_or_else(|| {
                Error::invalid_schema("entity schema has no partition key")
            })?;
            // Key attributes only admit `=` in key conditions, so this is built directly
            let not_exists = Condition::Comparison {
                path: Path::field(pk),
                operator: Operator::AttributeNotExists,
                operands: Vec::new(),
            };
            match self.condition {
                Some(condition) => Some(Condition::and(vec![condition, not_exists])?),
                None => Some(not_exists),
            }
        } else {
            self.condition
        };

        let mut aliases = self.table.allocator();
        let condition_expression = condition
            .as_ref()
            .map(|c| compile(c, &mut aliases))
            .transpose()?;
        let Aliases { names, values } = aliases.into();

        debug!(
            table = %self.table.name(),
            condition = ?condition_expression,
            "built put"
        );
        Ok(PutRequest {
            table_name: self.table.name().to_string(),
            item,
            condition_expression,
            expression_attribute_names: names,
            expression_attribute_values: values,
            return_values: self.return_values,
            return_consumed_capacity: self.return_consumed_capacity,
            return_item_collection_metrics: self.return_item_collection_metrics,
        })
    }

    /// Write the item, returning the attributes requested by `return_values`
    pub async fn send<C: StoreClient>(self, client: &C) -> Result<Option<Value>> {
        let table = self.table;
        let request = self.build()?;
        let response = client.send(OperationRequest::PutItem(request)).await?;
        response
            .attributes
            .as_ref()
            .map(|item| table.decode_item(item))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TableConfig;
    use crate::schema::Schema;
    use crate::types::{Attribute, KeyType};

    fn table() -> Table {
        let schema = Schema::builder()
            .attribute("pk", Attribute::partition_key(KeyType::String))
            .attribute("version", Attribute::number())
            .build()
            .unwrap();
        Table::new(TableConfig::builder("docs").build(), schema).unwrap()
    }

    #[test]
    fn test_throw_if_exists() {
        let table = table();
        let request = table
            .put()
            .item(Value::map([("pk", Value::from("d#1")), ("version", Value::from(1))]))
            .throw_if_exists()
            .build()
            .unwrap();

        assert_eq!(
            request.condition_expression.as_deref(),
            Some("attribute_not_exists(#f0)")
        );
        assert_eq!(request.expression_attribute_names["#f0"], "pk");
        assert!(request.expression_attribute_values.is_empty());
    }

    #[test]
    fn test_condition_combined_with_throw_if_exists() {
        let table = table();
        let request = table
            .put()
            .item(Value::map([("pk", "d#1")]))
            .condition(|eb| eb.lt("version", 3))
            .throw_if_exists()
            .build()
            .unwrap();
        assert_eq!(
            request.condition_expression.as_deref(),
            Some("(#f0 < :v0 AND attribute_not_exists(#f1))")
        );
    }

    #[test]
    fn test_item_requires_key() {
        let table = table();
        let result = table.put().item(Value::map([("version", 1)])).build();
        assert!(matches!(result, Err(Error::InvalidOperand { ref path, .. }) if path == "pk"));
    }

    #[test]
    fn test_return_values_restricted() {
        let table = table();
        let result = table
            .put()
            .item(Value::map([("pk", "d#1")]))
            .return_values(ReturnValues::UpdatedNew)
            .build();
        assert!(matches!(result, Err(Error::InvalidOperand { .. })));

        let request = table
            .put()
            .item(Value::map([("pk", "d#1")]))
            .return_values(ReturnValues::AllOld)
            .build()
            .unwrap();
        assert_eq!(request.return_values, Some(ReturnValues::AllOld));
    }
}
