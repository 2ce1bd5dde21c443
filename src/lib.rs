//! # dynaschema
//!
//! A schema-driven condition expression builder and attribute-value codec for
//! DynamoDB-style key-value stores.
//!
//! An entity is described once as a [`Schema`]: partition and sort keys,
//! scalars, sets, lists and nested maps. Everything else is checked against it
//! at runtime: condition paths must resolve, operators must be legal for the
//! attribute they touch, operand values must have the attribute's type, and
//! items are encoded to and decoded from the store's tagged wire format.
//!
//! ## Features
//!
//! - **Schema Tree**: Nested maps and lists addressed by dotted paths (`cards[0].last4`)
//! - **Validated Conditions**: Per-attribute operator legality and operand type checks
//! - **Expression Compiler**: Aliased key conditions, filters, projections and updates
//! - **Wire Codec**: Plain values to tagged `S`/`N`/`M`/`L`/... values and back
//! - **Operation Builders**: Query, Scan, GetItem, PutItem, UpdateItem and DeleteItem
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dynaschema::{Attribute, KeyType, Schema, Table, TableConfig, Value};
//!
//! # fn main() -> dynaschema::Result<()> {
//! let schema = Schema::builder()
//!     .attribute("pk", Attribute::partition_key(KeyType::String))
//!     .attribute("sk", Attribute::sort_key(KeyType::String))
//!     .attribute("age", Attribute::number())
//!     .build()?;
//! let users = Table::new(TableConfig::builder("users").build(), schema)?;
//!
//! let request = users
//!     .query()
//!     .key_condition(|eb| eb.and(vec![eb.eq("pk", "users")?, eb.begins_with("sk", "2024-")?]))
//!     .filter(|eb| eb.gt("age", 30))
//!     .limit(10)
//!     .build()?;
//!
//! assert_eq!(request.key_condition_expression, "(#f0 = :v0 AND begins_with(#f1, :v1))");
//! assert_eq!(request.filter_expression.as_deref(), Some("#f2 > :v2"));
//!
//! let item = users.encode_item(&Value::map([
//!     ("pk", Value::from("users")),
//!     ("sk", Value::from("2024-01-01")),
//!     ("age", Value::from(42)),
//! ]))?;
//! assert_eq!(item.len(), 3);
//! # Ok(())
//! # }
//! ```
//!
//! Requests are sent through a [`StoreClient`] implementation supplied by the
//! caller; the crate performs no I/O of its own.
//!
//! ## Configuration
//!
//! Tables are configured using `TableConfig`:
//!
//! ```rust
//! use dynaschema::{ReturnConsumedCapacity, TableConfig};
//!
//! let config = TableConfig::builder("users")
//!     .name_alias_prefix("#f")     // Attribute name placeholders (default)
//!     .value_alias_prefix(":v")    // Value placeholders (default)
//!     .strict_decode(true)         // Fail on wire tags that disagree with the schema (default)
//!     .return_consumed_capacity(ReturnConsumedCapacity::Total)
//!     .build();
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod expression;
pub mod operation;
pub mod path;
pub mod schema;
pub mod table;
pub mod types;
pub mod value;
pub mod wire;

// Re-export main types for convenience
pub use codec::{DecodeMode, decode, decode_item, decode_partial_item, encode, encode_item};
pub use config::{AliasPrefixes, TableConfig, TableConfigBuilder};
pub use error::{Error, Result, StoreError};
pub use expression::{
    AliasAllocator, CompiledStatement, Comparator, Condition, ConditionBuilder, LogicalOperator,
    Operator, UpdateAction,
};
pub use operation::{
    OperationRequest, ReturnConsumedCapacity, ReturnItemCollectionMetrics, ReturnValues,
    StoreClient, StoreResponse,
};
pub use path::{IntoPath, Path, PathSegment};
pub use schema::{AttributeDefinition, Schema, SchemaBuilder, SchemaView, ViewScope};
pub use table::Table;
pub use types::{Attribute, KeyType, ScalarType, SetType};
pub use value::Value;
pub use wire::{Item, WireTag, WireValue};
