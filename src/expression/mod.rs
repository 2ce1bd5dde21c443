//! Condition expressions
//!
//! - [`operator`]: operators and the per-attribute legality table
//! - [`condition`]: condition trees and the schema-validated builder
//! - [`compiler`]: rendering into aliased store expressions

pub mod compiler;
pub mod condition;
pub mod operator;

pub use compiler::{
    AliasAllocator, CompiledStatement, UpdateAction, compile, compile_projection, compile_update,
};
pub use condition::{Condition, ConditionBuilder, MAX_IN_OPERANDS};
pub use operator::{
    Comparator, IntoOperator, LogicalOperator, Operator, is_legal, legal_operators,
};
