//! Scan operation

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::error::Result;
use crate::expression::{Condition, ConditionBuilder, compile, compile_projection};
use crate::operation::{
    Aliases, OperationRequest, Pending, ReturnConsumedCapacity, StoreClient, projection_paths,
    store_limit,
};
use crate::path::{IntoPath, Path};
use crate::table::Table;
use crate::value::Value;
use crate::wire::WireValue;

/// Compiled `Scan` request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ScanRequest {
    pub table_name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_expression: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub projection_expression: Option<String>,

    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_names: HashMap<String, String>,

    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_values: HashMap<String, WireValue>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_consumed_capacity: Option<ReturnConsumedCapacity>,

    #[serde(skip)]
    pub offset: usize,
}

/// Builder for a `Scan` request
#[derive(Debug)]
pub struct ScanBuilder<'a> {
    table: &'a Table,
    filter: Option<Condition>,
    projection: Vec<Path>,
    offset: usize,
    limit: Option<usize>,
    return_consumed_capacity: Option<ReturnConsumedCapacity>,
    pending: Pending,
}

impl<'a> ScanBuilder<'a> {
    pub(crate) fn new(table: &'a Table) -> Self {
        Self {
            table,
            filter: None,
            projection: Vec::new(),
            offset: 0,
            limit: None,
            return_consumed_capacity: table.config().return_consumed_capacity,
            pending: Pending::default(),
        }
    }

    /// Filter over every attribute, keys included
    pub fn filter<F>(mut self, build: F) -> Self
    where
        F: FnOnce(&ConditionBuilder<'a>) -> Result<Condition>,
    {
        let eb = ConditionBuilder::new(self.table.schema().full_view());
        self.filter = self.pending.keep(build(&eb));
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

    pub fn build(self) -> Result<ScanRequest> {
        self.pending.check()?;

        let mut aliases = self.table.allocator();
        let filter_expression = self
            .filter
            .as_ref()
            .map(|f| compile(f, &mut aliases))
            .transpose()?;
        let projection_expression = (!self.projection.is_empty())
            .then(|| compile_projection(&self.projection, &mut aliases));
        let Aliases { names, values } = aliases.into();

        let request = ScanRequest {
            table_name: self.table.name().to_string(),
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
            filter = ?request.filter_expression,
            "built scan"
        );
        Ok(request)
    }

    pub async fn send<C: StoreClient>(self, client: &C) -> Result<Vec<Value>> {
        let table = self.table;
        let request = self.build()?;
        let offset = request.offset;
        let limit = request.limit.map(|l| l.saturating_sub(offset));

        let response = client.send(OperationRequest::Scan(request)).await?;
        let items = response
            .items
            .iter()
            .skip(offset)
            .take(limit.unwrap_or(usize::MAX))
            .map(|item| table.decode_item(item))
            .collect::<Result<Vec<_>>>()?;
        debug!(table = %table.name(), items = items.len(), "scan returned");
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TableConfig;
    use crate::error::Error;
    use crate::schema::Schema;
    use crate::types::{Attribute, KeyType};

    fn table() -> Table {
        let schema = Schema::builder()
            .attribute("pk", Attribute::partition_key(KeyType::String))
            .attribute("age", Attribute::number())
            .build()
            .unwrap();
        Table::new(TableConfig::builder("users").build(), schema).unwrap()
    }

    #[test]
    fn test_scan_without_filter() {
        let request = table().scan().build().unwrap();
        assert!(request.filter_expression.is_none());
        assert!(request.expression_attribute_names.is_empty());

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json, serde_json::json!({"TableName": "users"}));
    }

    #[test]
    fn test_scan_filter_may_use_keys() {
        let request = table()
            .scan()
            .filter(|eb| eb.or(vec![eb.eq("pk", "a")?, eb.lt("age", 18)?]))
            .build()
            .unwrap();
        assert_eq!(
            request.filter_expression.as_deref(),
            Some("(#f0 = :v0 OR #f1 < :v1)")
        );
    }

    #[test]
    fn test_default_capacity_from_config() {
        let schema = Schema::builder()
            .attribute("pk", Attribute::partition_key(KeyType::String))
            .build()
            .unwrap();
        let config = TableConfig::builder("users")
            .return_consumed_capacity(ReturnConsumedCapacity::Indexes)
            .build();
        let table = Table::new(config, schema).unwrap();
        let request = table.scan().build().unwrap();
        assert_eq!(
            request.return_consumed_capacity,
            Some(ReturnConsumedCapacity::Indexes)
        );
    }

    #[test]
    fn test_invalid_limits_rejected() {
        assert!(matches!(
            table().scan().limit(0).build(),
            Err(Error::InvalidOperand { .. })
        ));
        assert!(matches!(
            table().scan().offset(usize::MAX).limit(2).build(),
            Err(Error::InvalidOperand { .. })
        ));
        assert_eq!(table().scan().offset(3).limit(2).build().unwrap().limit, Some(5));
    }
}
