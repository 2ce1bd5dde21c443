//! Query operation

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::expression::{Condition, ConditionBuilder, compile, compile_projection};
use crate::operation::{
    Aliases, OperationRequest, Pending, ReturnConsumedCapacity, StoreClient, projection_paths,
    store_limit,
};
use crate::path::{IntoPath, Path};
use crate::table::Table;
use crate::value::Value;
use crate::wire::WireValue;

/// Compiled `Query` request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct QueryRequest {
    pub table_name: String,

    pub key_condition_expression: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_expression: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub projection_expression: Option<String>,

    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_names: HashMap<String, String>,

    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_values: HashMap<String, WireValue>,

    /// Items evaluated by the store; includes the skipped offset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_consumed_capacity: Option<ReturnConsumedCapacity>,

    /// Items dropped from the front of the result before returning it
    #[serde(skip)]
    pub offset: usize,
}

/// Builder for a `Query` request
#[derive(Debug)]
pub struct QueryBuilder<'a> {
    table: &'a Table,
    key_condition: Option<Condition>,
    filter: Option<Condition>,
    projection: Vec<Path>,
    offset: usize,
    limit: Option<usize>,
    return_consumed_capacity: Option<ReturnConsumedCapacity>,
    pending: Pending,
}

impl<'a> QueryBuilder<'a> {
    pub(crate) fn new(table: &'a Table) -> Self {
        Self {
            table,
            key_condition: None,
            filter: None,
            projection: Vec::new(),
            offset: 0,
            limit: None,
            return_consumed_capacity: table.config().return_consumed_capacity,
            pending: Pending::default(),
        }
    }

    /// Key condition, built over the primary key attributes only
    pub fn key_condition<F>(mut self, build: F) -> Self
    where
        F: FnOnce(&ConditionBuilder<'a>) -> Result<Condition>,
    {
        let eb = ConditionBuilder::new(self.table.schema().key_view());
        self.key_condition = self.pending.keep(build(&eb));
        self
    }

    /// Filter, built over the non-key attributes only
    pub fn filter<F>(mut self, build: F) -> Self
    where
        F: FnOnce(&ConditionBuilder<'a>) -> Result<Condition>,
    {
        let eb = ConditionBuilder::new(self.table.schema().non_key_view());
        self.filter = self.pending.keep(build(&eb));
        self
    }

    /// Attributes to return
    pub fn projection<P, I>(mut self, paths: I) -> Self
    where
        P: IntoPath,
        I: IntoIterator<Item = P>,
    {
        let paths = projection_paths(self.table.schema().full_view(), paths);
        self.projection = self.pending.keep(paths).unwrap_or_default();
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn return_consumed_capacity(mut self, level: ReturnConsumedCapacity) -> Self {
        self.return_consumed_capacity = Some(level);
        self
    }

    /// Compile the request
    pub fn build(self) -> Result<QueryRequest> {
        self.pending.check()?;
        let key_condition = self.key_condition.ok_or_else(|| {
            Error::invalid_operand("<request>", "query requires a key condition")
        })?;

        let mut aliases = self.table.allocator();
        let key_condition_expression = compile(&key_condition, &mut aliases)?;
        let filter_expression = self
            .filter
            .as_ref()
            .map(|f| compile(f, &mut aliases))
            .transpose()?;
        let projection_expression = (!self.projection.is_empty())
            .then(|| compile_projection(&self.projection, &mut aliases));
        let Aliases { names, values } = aliases.into();

        let request = QueryRequest {
            table_name: self.table.name().to_string(),
            key_condition_expression,
            filter_expression,
            projection_expression,
            expression_attribute_names: names,
            expression_attribute_values: values,
            limit: store_limit(self.limit, self.offset)?,
            return_consumed_capacity: self.return_consumed_capacity,
            offset: self.offset,
        };
        debug!(
            table = %request.table_name,
            key_condition = %request.key_condition_expression,
            filter = ?request.filter_expression,
            "built query"
        );
        Ok(request)
    }

    /// Send the query and decode the returned items
    pub async fn send<C: StoreClient>(self, client: &C) -> Result<Vec<Value>> {
        let table = self.table;
        let request = self.build()?;
        let offset = request.offset;
        let limit = request.limit.map(|l| l.saturating_sub(offset));

        let response = client.send(OperationRequest::Query(request)).await?;
        let items = response
            .items
            .iter()
            .skip(offset)
            .take(limit.unwrap_or(usize::MAX))
            .map(|item| table.decode_item(item))
            .collect::<Result<Vec<_>>>()?;
        debug!(table = %table.name(), items = items.len(), "query returned");
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TableConfig;
    use crate::schema::Schema;
    use crate::types::{Attribute, KeyType, SetType};

    fn table() -> Table {
        let schema = Schema::builder()
            .attribute("pk", Attribute::partition_key(KeyType::String))
            .attribute("sk", Attribute::sort_key(KeyType::String))
            .attribute("age", Attribute::number())
            .attribute("tags", Attribute::set(SetType::String))
            .build()
            .unwrap();
        Table::new(TableConfig::builder("users").build(), schema).unwrap()
    }

    #[test]
    fn test_build_key_condition_and_filter() {
        let table = table();
        let request = table
            .query()
            .key_condition(|eb| {
                eb.and(vec![eb.eq("pk", "users")?, eb.begins_with("sk", "2024-")?])
            })
            .filter(|eb| eb.gt("age", 30))
            .build()
            .unwrap();

        assert_eq!(
            request.key_condition_expression,
            "(#f0 = :v0 AND begins_with(#f1, :v1))"
        );
        assert_eq!(request.filter_expression.as_deref(), Some("#f2 > :v2"));
        assert_eq!(request.expression_attribute_names.len(), 3);
        assert_eq!(request.expression_attribute_values.len(), 3);
    }

    #[test]
    fn test_key_condition_required() {
        let table = table();
        let result = table.query().filter(|eb| eb.gt("age", 30)).build();
        assert!(matches!(result, Err(Error::InvalidOperand { .. })));
    }

    #[test]
    fn test_filter_cannot_use_keys() {
        let table = table();
        let result = table
            .query()
            .key_condition(|eb| eb.eq("pk", "users"))
            .filter(|eb| eb.eq("pk", "other"))
            .build();
        assert!(matches!(result, Err(Error::PathNotFound { .. })));
    }

    #[test]
    fn test_first_error_is_reported() {
        let table = table();
        let result = table
            .query()
            .key_condition(|eb| eb.condition("pk", "begins_with", "u"))
            .projection(["missing"])
            .build();
        assert!(matches!(
            result,
            Err(Error::IllegalOperatorForAttribute { .. })
        ));
    }

    #[test]
    fn test_projection_offset_and_limit() {
        let table = table();
        let request = table
            .query()
            .key_condition(|eb| eb.eq("pk", "users"))
            .projection(["age", "tags"])
            .offset(5)
            .limit(10)
            .return_consumed_capacity(ReturnConsumedCapacity::Total)
            .build()
            .unwrap();

        assert_eq!(request.projection_expression.as_deref(), Some("#f1, #f2"));
        assert_eq!(request.limit, Some(15));
        assert_eq!(request.offset, 5);

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["TableName"], "users");
        assert_eq!(json["ReturnConsumedCapacity"], "TOTAL");
        assert_eq!(json["ExpressionAttributeNames"]["#f0"], "pk");
        assert!(json.get("Offset").is_none());
    }

    #[test]
    fn test_zero_limit_rejected() {
        let result = table()
            .query()
            .key_condition(|eb| eb.eq("pk", "users"))
            .limit(0)
            .build();
        assert!(matches!(result, Err(Error::InvalidOperand { .. })));
    }

    #[test]
    fn test_limit_plus_offset_overflow_is_an_error() {
        let result = table()
            .query()
            .key_condition(|eb| eb.eq("pk", "users"))
            .offset(1)
            .limit(usize::MAX)
            .build();
        assert!(matches!(result, Err(Error::InvalidOperand { ref path, .. }) if path == "<request>"));
    }
}
