//! GetItem operation

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::expression::compile_projection;
use crate::operation::{
    Aliases, OperationRequest, Pending, ReturnConsumedCapacity, StoreClient, projection_paths,
};
use crate::path::{IntoPath, Path};
use crate::table::Table;
use crate::value::Value;
use crate::wire::Item;

/// Compiled `GetItem` request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetRequest {
    pub table_name: String,

    pub key: Item,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub projection_expression: Option<String>,

    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_names: HashMap<String, String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_consumed_capacity: Option<ReturnConsumedCapacity>,
}

/// Builder for a `GetItem` request
#[derive(Debug)]
pub struct GetBuilder<'a> {
    table: &'a Table,
    key: Option<Item>,
    projection: Vec<Path>,
    return_consumed_capacity: Option<ReturnConsumedCapacity>,
    pending: Pending,
}

impl<'a> GetBuilder<'a> {
    pub(crate) fn new(table: &'a Table) -> Self {
        Self {
            table,
            key: None,
            projection: Vec::new(),
            return_consumed_capacity: table.config().return_consumed_capacity,
            pending: Pending::default(),
        }
    }

    /// Primary key of the item; every key attribute is required
    pub fn key(mut self, key: impl Into<Value>) -> Self {
        self.key = self.pending.keep(self.table.encode_key(&key.into()));
        self
    }

    pub fn projection<P, I>(mut self, paths: I) -> Self
    where
        P: IntoPath,
        I: IntoIterator<Item = P>,
    {
        let paths = projection_paths(self.table.schema().full_view(), paths);
        self.projection = self.pending.keep(paths).unwrap_or_default();
        self
    }

    pub fn return_consumed_capacity(mut self, level: ReturnConsumedCapacity) -> Self {
        self.return_consumed_capacity = Some(level);
        self
    }

    pub fn build(self) -> Result<GetRequest> {
        self.pending.check()?;
        let key = self
            .key
            .ok_or_else(|| Error::invalid_operand("<request>", "get requires a key"))?;

        let mut aliases = self.table.allocator();
        let projection_expression = (!self.projection.is_empty())
            .then(|| compile_projection(&self.projection, &mut aliases));
        let Aliases { names, .. } = aliases.into();

        debug!(table = %self.table.name(), "built get");
        Ok(GetRequest {
            table_name: self.table.name().to_string(),
            key,
            projection_expression,
            expression_attribute_names: names,
            return_consumed_capacity: self.return_consumed_capacity,
        })
    }

    /// Fetch the item; `None` when it does not exist
    pub async fn send<C: StoreClient>(self, client: &C) -> Result<Option<Value>> {
        let table = self.table;
        let request = self.build()?;
        let response = client.send(OperationRequest::GetItem(request)).await?;
        response
            .item
            .as_ref()
            .map(|item| table.decode_item(item))
            .transpose()
    }
}
