//! Condition trees and their schema-validated builder
//!
//! Every check happens while the tree is built: the path must resolve in the
//! builder's schema view, the operator must be legal for the resolved attribute
//! and the operands must match its type. A finished [`Condition`] therefore
//! always compiles.

use crate::codec::{encode_at, encode_scalar, encode_set_element};
use crate::error::{Error, Result};
use crate::expression::operator::{Comparator, IntoOperator, LogicalOperator, Operator, is_legal};
use crate::path::{IntoPath, Path};
use crate::schema::SchemaView;
use crate::types::{Attribute, ScalarType};
use crate::value::Value;
use crate::wire::{WireTag, WireValue};

/// Maximum number of candidates in an `IN` list accepted by the store
pub const MAX_IN_OPERANDS: usize = 100;

/// Node of a condition tree
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Predicate on a single attribute; operands are already wire-encoded
    Comparison {
        path: Path,
        operator: Operator,
        operands: Vec<WireValue>,
    },
    /// Logical combination of child conditions
    Logical {
        operator: LogicalOperator,
        children: Vec<Condition>,
    },
}

impl Condition {
    /// Conjunction of all children
    pub fn and(children: Vec<Condition>) -> Result<Condition> {
        Self::logical(LogicalOperator::And, children)
    }

    /// Disjunction of all children
    pub fn or(children: Vec<Condition>) -> Result<Condition> {
        Self::logical(LogicalOperator::Or, children)
    }

    /// Negation; takes exactly one child
    pub fn not(children: Vec<Condition>) -> Result<Condition> {
        Self::logical(LogicalOperator::Not, children)
    }

    fn logical(operator: LogicalOperator, children: Vec<Condition>) -> Result<Condition> {
        match operator {
            LogicalOperator::Not if children.len() != 1 => Err(Error::invalid_operand(
                "<condition>",
                format!("NOT takes exactly one condition, got {}", children.len()),
            )),
            _ if children.is_empty() => Err(Error::invalid_operand(
                "<condition>",
                format!("{} requires at least one condition", operator),
            )),
            _ => Ok(Condition::Logical { operator, children }),
        }
    }

    /// Depth of the tree; a single comparison has depth 1
    pub fn depth(&self) -> usize {
        match self {
            Condition::Comparison { .. } => 1,
            Condition::Logical { children, .. } => {
                1 + children.iter().map(Condition::depth).max().unwrap_or(0)
            }
        }
    }
}

/// Builds conditions against a schema view
#[derive(Debug, Clone, Copy)]
pub struct ConditionBuilder<'a> {
    view: SchemaView<'a>,
}

impl<'a> ConditionBuilder<'a> {
    pub fn new(view: SchemaView<'a>) -> Self {
        Self { view }
    }

    pub fn view(&self) -> SchemaView<'a> {
        self.view
    }

    /// Build a comparison condition
    ///
    /// `between` takes a two-element list (low, high), `in` a non-empty list,
    /// the existence checks take `Value::Null`.
    pub fn condition(
        &self,
        path: impl IntoPath,
        operator: impl IntoOperator,
        value: impl Into<Value>,
    ) -> Result<Condition> {
        let path = path.into_path()?;
        let operator = operator.into_operator()?;
        let value = value.into();

        let attribute = self.view.resolve(&path)?;
        if !is_legal(attribute, operator) {
            return Err(Error::IllegalOperatorForAttribute {
                path: path.to_string(),
                operator: operator.to_string(),
                kind: attribute.kind_name(),
            });
        }

        let operands = operands_for(attribute, operator, value, &path)?;
        Ok(Condition::Comparison {
            path,
            operator,
            operands,
        })
    }

    pub fn eq(&self, path: impl IntoPath, value: impl Into<Value>) -> Result<Condition> {
        self.condition(path, Comparator::Eq, value)
    }

    pub fn ne(&self, path: impl IntoPath, value: impl Into<Value>) -> Result<Condition> {
        self.condition(path, Comparator::Ne, value)
    }

    pub fn lt(&self, path: impl IntoPath, value: impl Into<Value>) -> Result<Condition> {
        self.condition(path, Comparator::Lt, value)
    }

    pub fn le(&self, path: impl IntoPath, value: impl Into<Value>) -> Result<Condition> {
        self.condition(path, Comparator::Le, value)
    }

    pub fn gt(&self, path: impl IntoPath, value: impl Into<Value>) -> Result<Condition> {
        self.condition(path, Comparator::Gt, value)
    }

    pub fn ge(&self, path: impl IntoPath, value: impl Into<Value>) -> Result<Condition> {
        self.condition(path, Comparator::Ge, value)
    }

    pub fn begins_with(&self, path: impl IntoPath, prefix: impl Into<String>) -> Result<Condition> {
        self.condition(path, Operator::BeginsWith, Value::String(prefix.into()))
    }

    /// `path BETWEEN low AND high`; bounds are kept in the given order
    pub fn between(
        &self,
        path: impl IntoPath,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> Result<Condition> {
        self.condition(path, Operator::Between, Value::List(vec![low.into(), high.into()]))
    }

    pub fn is_in<V, I>(&self, path: impl IntoPath, values: I) -> Result<Condition>
    where
        V: Into<Value>,
        I: IntoIterator<Item = V>,
    {
        self.condition(path, Operator::In, Value::list(values))
    }

    pub fn exists(&self, path: impl IntoPath) -> Result<Condition> {
        self.condition(path, Operator::AttributeExists, Value::Null)
    }

    pub fn not_exists(&self, path: impl IntoPath) -> Result<Condition> {
        self.condition(path, Operator::AttributeNotExists, Value::Null)
    }

    pub fn contains(&self, path: impl IntoPath, value: impl Into<Value>) -> Result<Condition> {
        self.condition(path, Operator::Contains, value)
    }

    pub fn attribute_type(&self, path: impl IntoPath, tag: WireTag) -> Result<Condition> {
        self.condition(path, Operator::AttributeType, tag.as_str())
    }

    /// `size(path) <cmp> value`
    pub fn size(
        &self,
        path: impl IntoPath,
        comparator: Comparator,
        value: impl Into<Value>,
    ) -> Result<Condition> {
        self.condition(path, Operator::Size(comparator), value)
    }

    pub fn and(&self, children: Vec<Condition>) -> Result<Condition> {
        Condition::and(children)
    }

    pub fn or(&self, children: Vec<Condition>) -> Result<Condition> {
        Condition::or(children)
    }

    pub fn not(&self, children: Vec<Condition>) -> Result<Condition> {
        Condition::not(children)
    }
}

fn operands_for(
    attribute: &Attribute,
    operator: Operator,
    value: Value,
    path: &Path,
) -> Result<Vec<WireValue>> {
    match operator {
        Operator::Compare(_) => Ok(vec![encode_at(attribute, &value, path)?]),
        Operator::BeginsWith => match value {
            Value::String(prefix) => Ok(vec![WireValue::S(prefix)]),
            other => Err(Error::type_mismatch(
                path.to_string(),
                "string prefix",
                other.type_name(),
            )),
        },
        Operator::Between => {
            let bounds = expect_list(value, path, "BETWEEN")?;
            if bounds.len() != 2 {
                return Err(Error::invalid_operand(
                    path.to_string(),
                    format!("BETWEEN takes exactly two values, got {}", bounds.len()),
                ));
            }
            bounds
                .iter()
                .map(|bound| encode_at(attribute, bound, path))
                .collect()
        }
        Operator::In => {
            let candidates = expect_list(value, path, "IN")?;
            if candidates.is_empty() || candidates.len() > MAX_IN_OPERANDS {
                return Err(Error::invalid_operand(
                    path.to_string(),
                    format!(
                        "IN takes between 1 and {} values, got {}",
                        MAX_IN_OPERANDS,
                        candidates.len()
                    ),
                ));
            }
            candidates
                .iter()
                .map(|candidate| encode_at(attribute, candidate, path))
                .collect()
        }
        Operator::AttributeExists | Operator::AttributeNotExists => {
            if !value.is_null() {
                return Err(Error::invalid_operand(
                    path.to_string(),
                    format!("{} takes no value", operator),
                ));
            }
            Ok(Vec::new())
        }
        Operator::AttributeType => {
            let Value::String(tag) = value else {
                return Err(Error::type_mismatch(
                    path.to_string(),
                    "attribute type tag",
                    value.type_name(),
                ));
            };
            let tag: WireTag = tag.parse().map_err(|_| {
                Error::type_mismatch(
                    path.to_string(),
                    format!("one of {}", WireTag::ALL.join(", ")),
                    tag.clone(),
                )
            })?;
            Ok(vec![WireValue::S(tag.as_str().to_string())])
        }
        Operator::Contains => {
            let operand = match attribute {
                Attribute::Set { of } => encode_set_element(*of, &value, path)?,
                Attribute::List { items: Some(item) } => encode_at(item, &value, path)?,
                Attribute::List { items: None } => {
                    return Err(Error::MissingListItemSchema {
                        path: path.to_string(),
                    });
                }
                _ => encode_scalar(ScalarType::String, &value, path)?,
            };
            Ok(vec![operand])
        }
        Operator::Size(_) => match value {
            Value::Number(_) => Ok(vec![encode_scalar(ScalarType::Number, &value, path)?]),
            Value::BigInt(_) => Ok(vec![encode_scalar(ScalarType::BigInt, &value, path)?]),
            other => Err(Error::type_mismatch(
                path.to_string(),
                "number",
                other.type_name(),
            )),
        },
    }
}

fn expect_list(value: Value, path: &Path, operator: &str) -> Result<Vec<Value>> {
    match value {
        Value::List(items) | Value::Set(items) => Ok(items),
        other => Err(Error::invalid_operand(
            path.to_string(),
            format!("{} takes a list of values, got {}", operator, other.type_name()),
        )),
    }
}
