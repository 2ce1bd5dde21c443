//! Operation builders and the store client seam
//!
//! Builders are obtained from a [`Table`](crate::table::Table). They collect
//! validated conditions and options, compile everything with one alias
//! allocator in `build()` and hand the request to a [`StoreClient`] in
//! `send()`. Errors raised while configuring a builder are kept and reported
//! by `build()`, so call chains stay fluent.

pub mod delete;
pub mod get;
pub mod put;
pub mod query;
pub mod scan;
pub mod update;

use std::collections::HashMap;
use std::fmt;
use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result, StoreError};
use crate::path::{IntoPath, Path};
use crate::schema::SchemaView;
use crate::wire::{Item, WireValue};

pub use delete::{DeleteBuilder, DeleteRequest};
pub use get::{GetBuilder, GetRequest};
pub use put::{PutBuilder, PutRequest};
pub use query::{QueryBuilder, QueryRequest};
pub use scan::{ScanBuilder, ScanRequest};
pub use update::{UpdateBuilder, UpdateRequest};

// ---------------------------------------------------------------------------
// Request options
// ---------------------------------------------------------------------------

/// Level of consumed-capacity detail returned by the store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReturnConsumedCapacity {
    Indexes,
    Total,
    #[default]
    None,
}

/// Which item attributes a write returns
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReturnValues {
    #[default]
    None,
    AllOld,
    UpdatedOld,
    AllNew,
    UpdatedNew,
}

impl ReturnValues {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReturnValues::None => "NONE",
            ReturnValues::AllOld => "ALL_OLD",
            ReturnValues::UpdatedOld => "UPDATED_OLD",
            ReturnValues::AllNew => "ALL_NEW",
            ReturnValues::UpdatedNew => "UPDATED_NEW",
        }
    }
}

impl fmt::Display for ReturnValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether item collection metrics are returned by writes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReturnItemCollectionMetrics {
    Size,
    #[default]
    None,
}

// ---------------------------------------------------------------------------
// Requests and responses
// ---------------------------------------------------------------------------

/// A compiled request ready to be sent
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OperationRequest {
    Query(QueryRequest),
    Scan(ScanRequest),
    GetItem(GetRequest),
    PutItem(PutRequest),
    UpdateItem(UpdateRequest),
    DeleteItem(DeleteRequest),
}

impl OperationRequest {
    /// Store operation name, as used in the `X-Amz-Target` header
    pub fn kind(&self) -> &'static str {
        match self {
            OperationRequest::Query(_) => "Query",
            OperationRequest::Scan(_) => "Scan",
            OperationRequest::GetItem(_) => "GetItem",
            OperationRequest::PutItem(_) => "PutItem",
            OperationRequest::UpdateItem(_) => "UpdateItem",
            OperationRequest::DeleteItem(_) => "DeleteItem",
        }
    }

    pub fn table_name(&self) -> &str {
        match self {
            OperationRequest::Query(r) => &r.table_name,
            OperationRequest::Scan(r) => &r.table_name,
            OperationRequest::GetItem(r) => &r.table_name,
            OperationRequest::PutItem(r) => &r.table_name,
            OperationRequest::UpdateItem(r) => &r.table_name,
            OperationRequest::DeleteItem(r) => &r.table_name,
        }
    }
}

/// Capacity consumed by a request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ConsumedCapacity {
    pub table_name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity_units: Option<f64>,
}

/// Raw response of the store; items are still wire-encoded
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StoreResponse {
    /// Items returned by `Query` and `Scan`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<Item>,

    /// Item returned by `GetItem`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<Item>,

    /// Attributes returned by writes, per `ReturnValues`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Item>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consumed_capacity: Option<ConsumedCapacity>,
}

/// Transport to the store
///
/// Implementations own retries, throttling and cancellation; the builders
/// only await the returned future.
pub trait StoreClient {
    fn send(
        &self,
        request: OperationRequest,
    ) -> impl Future<Output = std::result::Result<StoreResponse, StoreError>> + Send;
}

// ---------------------------------------------------------------------------
// Shared builder plumbing
// ---------------------------------------------------------------------------

/// First error raised while configuring a builder
#[derive(Debug, Default)]
pub(crate) struct Pending(Option<Error>);

impl Pending {
    /// Keep the value, or remember the error if none is remembered yet
    pub(crate) fn keep<T>(&mut self, result: Result<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                if self.0.is_none() {
                    self.0 = Some(err);
                }
                None
            }
        }
    }

    pub(crate) fn check(self) -> Result<()> {
        match self.0 {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Alias tables rendered into a request
#[derive(Debug, Default)]
pub(crate) struct Aliases {
    pub(crate) names: HashMap<String, String>,
    pub(crate) values: HashMap<String, WireValue>,
}

impl From<crate::expression::AliasAllocator> for Aliases {
    fn from(aliases: crate::expression::AliasAllocator) -> Self {
        let (names, values) = aliases.finish();
        Self { names, values }
    }
}

/// Parse projection paths, checking each one resolves in the view
pub(crate) fn projection_paths<P, I>(view: SchemaView<'_>, paths: I) -> Result<Vec<Path>>
where
    P: IntoPath,
    I: IntoIterator<Item = P>,
{
    paths
        .into_iter()
        .map(|p| {
            let path = p.into_path()?;
            view.resolve(&path)?;
            Ok(path)
        })
        .collect()
}

/// Reject a `ReturnValues` mode the operation does not support
pub(crate) fn check_return_values(
    operation: &str,
    requested: ReturnValues,
    allowed: &[ReturnValues],
) -> Result<()> {
    if requested == ReturnValues::None || allowed.contains(&requested) {
        return Ok(());
    }
    Err(Error::invalid_operand(
        "<request>",
        format!("{} does not support ReturnValues {}", operation, requested),
    ))
}

/// Store-side `Limit` for a page of `limit` items after skipping `offset`
pub(crate) fn store_limit(limit: Option<usize>, offset: usize) -> Result<Option<usize>> {
    let Some(limit) = limit else {
        return Ok(None);
    };
    if limit == 0 {
        return Err(Error::invalid_operand("<request>", "limit must be at least 1"));
    }
    limit.checked_add(offset).map(Some).ok_or_else(|| {
        Error::invalid_operand(
            "<request>",
            format!("limit {} plus offset {} overflows", limit, offset),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_enums_serialize_as_wire_strings() {
        assert_eq!(
            serde_json::to_string(&ReturnConsumedCapacity::Indexes).unwrap(),
            r#""INDEXES""#
        );
        assert_eq!(
            serde_json::to_string(&ReturnValues::UpdatedNew).unwrap(),
            r#""UPDATED_NEW""#
        );
        assert_eq!(
            serde_json::to_string(&ReturnItemCollectionMetrics::Size).unwrap(),
            r#""SIZE""#
        );
    }

    #[test]
    fn test_response_deserializes_pascal_case() {
        let response: StoreResponse = serde_json::from_str(
            r#"{"Items":[{"pk":{"S":"a"}}],"ConsumedCapacity":{"TableName":"t","CapacityUnits":0.5}}"#,
        )
        .unwrap();
        assert_eq!(response.items.len(), 1);
        assert!(response.item.is_none());
        assert_eq!(
            response.consumed_capacity.unwrap().capacity_units,
            Some(0.5)
        );
    }

    #[test]
    fn test_pending_keeps_first_error() {
        let mut pending = Pending::default();
        assert_eq!(pending.keep(Ok::<_, Error>(1)), Some(1));
        assert!(pending.keep::<()>(Err(Error::InvalidPath("first".into()))).is_none());
        assert!(pending.keep::<()>(Err(Error::InvalidPath("second".into()))).is_none());
        assert!(matches!(pending.check(), Err(Error::InvalidPath(ref m)) if m == "first"));
    }

    #[test]
    fn test_return_values_restriction() {
        assert!(check_return_values("PutItem", ReturnValues::AllOld, &[ReturnValues::AllOld]).is_ok());
        assert!(check_return_values("PutItem", ReturnValues::None, &[]).is_ok());
        assert!(matches!(
            check_return_values("DeleteItem", ReturnValues::AllNew, &[ReturnValues::AllOld]),
            Err(Error::InvalidOperand { .. })
        ));
    }

    #[test]
    fn test_store_limit_includes_offset() {
        assert_eq!(store_limit(None, 5).unwrap(), None);
        assert_eq!(store_limit(Some(10), 5).unwrap(), Some(15));
    }

    #[test]
    fn test_store_limit_rejects_zero_and_overflow() {
        assert!(matches!(store_limit(Some(0), 0), Err(Error::InvalidOperand { .. })));
        assert!(matches!(
            store_limit(Some(usize::MAX), 1),
            Err(Error::InvalidOperand { .. })
        ));
    }
}
