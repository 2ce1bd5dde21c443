//! DeleteItem operation

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::expression::{Condition, ConditionBuilder, compile};
use crate::operation::{
    Aliases, OperationRequest, Pending, ReturnConsumedCapacity, ReturnItemCollectionMetrics,
    ReturnValues, StoreClient, check_return_values,
};
use crate::table::Table;
use crate::value::Value;
use crate::wire::{Item, WireValue};

/// Compiled `DeleteItem` request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeleteRequest {
    pub table_name: String,

    pub key: Item,

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

/// Builder for a `DeleteItem` request
#[derive(Debug)]
pub struct DeleteBuilder<'a> {
    table: &'a Table,
    key: Option<Item>,
    condition: Option<Condition>,
    return_values: Option<ReturnValues>,
    return_consumed_capacity: Option<ReturnConsumedCapacity>,
    return_item_collection_metrics: Option<ReturnItemCollectionMetrics>,
    pending: Pending,
}

impl<'a> DeleteBuilder<'a> {
    pub(crate) fn new(table: &'a Table) -> Self {
        Self {
            table,
            key: None,
            condition: None,
            return_values: None,
            return_consumed_capacity: table.config().return_consumed_capacity,
            return_item_collection_metrics: None,
            pending: Pending::default(),
        }
    }

    pub fn key(mut self, key: impl Into<Value>) -> Self {
        self.key = self.pending.keep(self.table.encode_key(&key.into()));
        self
    }

    pub fn condition<F>(mut self, build: F) -> Self
    where
        F: FnOnce(&ConditionBuilder<'a>) -> Result<Condition>,
    {
        let eb = ConditionBuilder::new(self.table.schema().full_view());
        self.condition = self.pending.keep(build(&eb));
        self
    }

    /// Only `ALL_OLD` is supported
    pub fn return_values(mut self, mode: ReturnValues) -> Self {
        let checked = check_return_values("DeleteItem", mode, &[ReturnValues::AllOld]);
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

    pub fn build(self) -> Result<DeleteRequest> {
        self.pending.check()?;
        let key = self
            .key
            .ok_or_else(|| Error::invalid_operand("<request>", "delete requires a key"))?;

        let mut aliases = self.table.allocator();
        let condition_expression = self
            .condition
            .as_ref()
            .map(|c| compile(c, &mut aliases))
            .transpose()?;
        let Aliases { names, values } = aliases.into();

        debug!(
            table = %self.table.name(),
            condition = ?condition_expression,
            "built delete"
        );
        Ok(DeleteRequest {
            table_name: self.table.name().to_string(),
            key,
            condition_expression,
            expression_attribute_names: names,
            expression_attribute_values: values,
            return_values: self.return_values,
            return_consumed_capacity: self.return_consumed_capacity,
            return_item_collection_metrics: self.return_item_collection_metrics,
        })
    }

    /// Delete the item, returning its old attributes when `ALL_OLD` was requested
    pub async fn send<C: StoreClient>(self, client: &C) -> Result<Option<Value>> {
        let table = self.table;
        let request = self.build()?;
        let response = client.send(OperationRequest::DeleteItem(request)).await?;
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
            .attribute("status", Attribute::string())
            .build()
            .unwrap();
        Table::new(TableConfig::builder("jobs").build(), schema).unwrap()
    }

    #[test]
    fn test_conditional_delete() {
        let table = table();
        let request = table
            .delete()
            .key(Value::map([("pk", "j#1")]))
            .condition(|eb| eb.is_in("status", ["done", "failed"]))
            .return_values(ReturnValues::AllOld)
            .return_item_collection_metrics(ReturnItemCollectionMetrics::Size)
            .build()
            .unwrap();

        assert_eq!(
            request.condition_expression.as_deref(),
            Some("#f0 IN (:v0, :v1)")
        );
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["Key"], serde_json::json!({"pk": {"S": "j#1"}}));
        assert_eq!(json["ReturnValues"], "ALL_OLD");
        assert_eq!(json["ReturnItemCollectionMetrics"], "SIZE");
    }

    #[test]
    fn test_delete_only_returns_old_values() {
        let table = table();
        let result = table
            .delete()
            .key(Value::map([("pk", "j#1")]))
            .return_values(ReturnValues::AllNew)
            .build();
        assert!(matches!(result, Err(Error::InvalidOperand { .. })));
    }
}
