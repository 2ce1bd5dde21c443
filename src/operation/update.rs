//! UpdateItem operation

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::codec::encode_at;
use crate::error::{Error, Result};
use crate::expression::{Condition, ConditionBuilder, UpdateAction, compile, compile_update};
use crate::operation::{
    Aliases, OperationRequest, Pending, ReturnConsumedCapacity, ReturnItemCollectionMetrics,
    ReturnValues, StoreClient, check_return_values,
};
use crate::path::{IntoPath, Path};
use crate::table::Table;
use crate::types::Attribute;
use crate::value::Value;
use crate::wire::{Item, WireValue};

/// Compiled `UpdateItem` request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateRequest {
    pub table_name: String,

    pub key: Item,

    pub update_expression: String,

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

/// Builder for an `UpdateItem` request
#[derive(Debug)]
pub struct UpdateBuilder<'a> {
    table: &'a Table,
    key: Option<Item>,
    actions: Vec<UpdateAction>,
    condition: Option<Condition>,
    return_values: Option<ReturnValues>,
    return_consumed_capacity: Option<ReturnConsumedCapacity>,
    return_item_collection_metrics: Option<ReturnItemCollectionMetrics>,
    pending: Pending,
}

impl<'a> UpdateBuilder<'a> {
    pub(crate) fn new(table: &'a Table) -> Self {
        Self {
            table,
            key: None,
            actions: Vec::new(),
            condition: None,
            return_values: None,
            return_consumed_capacity: table.config().return_consumed_capacity,
            return_item_collection_metrics: None,
            pending: Pending::default(),
        }
    }

    /// Primary key of the item to update
    pub fn key(mut self, key: impl Into<Value>) -> Self {
        self.key = self.pending.keep(self.table.encode_key(&key.into()));
        self
    }

    /// `SET path = value`
    pub fn set(mut self, path: impl IntoPath, value: impl Into<Value>) -> Self {
        let value = value.into();
        let action = self.target(path).and_then(|(path, attribute)| {
            let value = encode_at(attribute, &value, &path)?;
            Ok(UpdateAction::Set { path, value })
        });
        if let Some(action) = self.pending.keep(action) {
            self.actions.push(action);
        }
        self
    }

    /// `REMOVE path`
    pub fn remove(mut self, path: impl IntoPath) -> Self {
        let action = self
            .target(path)
            .map(|(path, _)| UpdateAction::Remove { path });
        if let Some(action) = self.pending.keep(action) {
            self.actions.push(action);
        }
        self
    }

    /// `DELETE path value`; removes the given elements from a set attribute
    pub fn delete(mut self, path: impl IntoPath, elements: impl Into<Value>) -> Self {
        let elements = elements.into();
        let action = self.target(path).and_then(|(path, attribute)| {
            if !matches!(attribute, Attribute::Set { .. }) {
                return Err(Error::invalid_operand(
                    path.to_string(),
                    format!("DELETE applies to sets, not {}", attribute.kind_name()),
                ));
            }
            let value = encode_at(attribute, &elements, &path)?;
            Ok(UpdateAction::Delete { path, value })
        });
        if let Some(action) = self.pending.keep(action) {
            self.actions.push(action);
        }
        self
    }

    /// Condition the update on the stored item
    pub fn condition<F>(mut self, build: F) -> Self
    where
        F: FnOnce(&ConditionBuilder<'a>) -> Result<Condition>,
    {
        let eb = ConditionBuilder::new(self.table.schema().full_view());
        self.condition = self.pending.keep(build(&eb));
        self
    }

    pub fn return_values(mut self, mode: ReturnValues) -> Self {
        let checked = check_return_values(
            "UpdateItem",
            mode,
            &[
                ReturnValues::AllOld,
                ReturnValues::UpdatedOld,
                ReturnValues::AllNew,
                ReturnValues::UpdatedNew,
            ],
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

    /// Resolve an update target; key attributes are immutable
    fn target(&self, path: impl IntoPath) -> Result<(Path, &'a Attribute)> {
        let path = path.into_path()?;
        let table: &'a Table = self.table;
        let schema = table.schema();
        if path.first_field().is_some_and(|name| schema.is_primary_key(name)) {
            return Err(Error::invalid_operand(
                path.to_string(),
                "key attributes cannot be updated",
            ));
        }
        let attribute = schema.full_view().resolve(&path)?;
        Ok((path, attribute))
    }

    pub fn build(self) -> Result<UpdateRequest> {
        self.pending.check()?;
        let key = self
            .key
            .ok_or_else(|| Error::invalid_operand("<request>", "update requires a key"))?;
        if self.actions.is_empty() {
            return Err(Error::invalid_operand(
                "<request>",
                "update requires at least one action",
            ));
        }

        let mut aliases = self.table.allocator();
        let update_expression = compile_update(&self.actions, &mut aliases);
        let condition_expression = self
            .condition
            .as_ref()
            .map(|c| compile(c, &mut aliases))
            .transpose()?;
        let Aliases { names, values } = aliases.into();

        debug!(
            table = %self.table.name(),
            update = %update_expression,
            condition = ?condition_expression,
            "built update"
        );
        Ok(UpdateRequest {
            table_name: self.table.name().to_string(),
            key,
            update_expression,
            condition_expression,
            expression_attribute_names: names,
            expression_attribute_values: values,
            return_values: self.return_values,
            return_consumed_capacity: self.return_consumed_capacity,
            return_item_collection_metrics: self.return_item_collection_metrics,
        })
    }

    /// Apply the update, returning the attributes requested by `return_values`
    ///
    /// `UPDATED_OLD` and `UPDATED_NEW` responses hold only the touched
    /// attributes and are decoded as partial items.
    pub async fn send<C: StoreClient>(self, client: &C) -> Result<Option<Value>> {
        let table = self.table;
        let request = self.build()?;
        let partial = matches!(
            request.return_values,
            Some(ReturnValues::UpdatedOld | ReturnValues::UpdatedNew)
        );
        let response = client.send(OperationRequest::UpdateItem(request)).await?;
        response
            .attributes
            .as_ref()
            .map(|item| {
                if partial {
                    table.decode_partial_item(item)
                } else {
                    table.decode_item(item)
                }
            })
            .transpose()
    }
}
