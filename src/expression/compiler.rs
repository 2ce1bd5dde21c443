//! Rendering of condition trees into store expression strings
//!
//! Attribute names and values never appear inline. Every name segment becomes a
//! `#` alias and every operand a `:` alias; the allocator collects both tables
//! so several expressions of one request (key condition, filter, projection)
//! can share them without collisions.

use std::collections::HashMap;

use tracing::debug;

use crate::error::{Error, Result};
use crate::expression::condition::{Condition, MAX_IN_OPERANDS};
use crate::expression::operator::{LogicalOperator, Operator};
use crate::path::{Path, PathSegment};
use crate::wire::WireValue;

pub const DEFAULT_NAME_PREFIX: &str = "#f";
pub const DEFAULT_VALUE_PREFIX: &str = ":v";

/// Hands out placeholder aliases for one request
///
/// Name aliases are keyed by attribute name and reused; value aliases are
/// always fresh.
#[derive(Debug, Clone)]
pub struct AliasAllocator {
    name_prefix: String,
    value_prefix: String,
    names: HashMap<String, String>,
    values: Vec<(String, WireValue)>,
}

impl Default for AliasAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl AliasAllocator {
    pub fn new() -> Self {
        Self::with_prefixes(DEFAULT_NAME_PREFIX, DEFAULT_VALUE_PREFIX)
    }

    pub fn with_prefixes(name_prefix: impl Into<String>, value_prefix: impl Into<String>) -> Self {
        Self {
            name_prefix: name_prefix.into(),
            value_prefix: value_prefix.into(),
            names: HashMap::new(),
            values: Vec::new(),
        }
    }

    /// Alias for an attribute name, allocating one on first use
    pub fn name(&mut self, name: &str) -> String {
        if let Some(alias) = self.names.get(name) {
            return alias.clone();
        }
        let alias = format!("{}{}", self.name_prefix, self.names.len());
        self.names.insert(name.to_string(), alias.clone());
        alias
    }

    /// Fresh alias bound to `value`
    pub fn value(&mut self, value: WireValue) -> String {
        let alias = format!("{}{}", self.value_prefix, self.values.len());
        self.values.push((alias.clone(), value));
        alias
    }

    /// Aliased form of a path: `#f0.#f1[0].#f2`
    pub fn path_expression(&mut self, path: &Path) -> String {
        let mut out = String::new();
        for segment in path.segments() {
            match segment {
                PathSegment::Field(name) => {
                    if !out.is_empty() {
                        out.push('.');
                    }
                    out.push_str(&self.name(name));
                }
                PathSegment::Index(i) => {
                    out.push('[');
                    out.push_str(&i.to_string());
                    out.push(']');
                }
            }
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty() && self.values.is_empty()
    }

    /// Consume the allocator, returning the alias tables
    ///
    /// Names map alias to attribute name, values alias to wire value.
    pub fn finish(self) -> (HashMap<String, String>, HashMap<String, WireValue>) {
        let names = self
            .names
            .into_iter()
            .map(|(name, alias)| (alias, name))
            .collect();
        let values = self.values.into_iter().collect();
        (names, values)
    }
}

/// Render a condition tree, allocating aliases as it goes
///
/// Trees from [`ConditionBuilder`](crate::expression::ConditionBuilder) always
/// render. Hand-assembled trees with the wrong operand or child count fail with
/// `InvalidOperand`.
pub fn compile(condition: &Condition, aliases: &mut AliasAllocator) -> Result<String> {
    match condition {
        Condition::Comparison {
            path,
            operator,
            operands,
        } => compile_comparison(path, *operator, operands, aliases),
        Condition::Logical { operator, children } => {
            check_children(*operator, children.len())?;
            let rendered = children
                .iter()
                .map(|c| compile(c, aliases))
                .collect::<Result<Vec<_>>>()?;
            Ok(match operator {
                LogicalOperator::Not => format!("(NOT {})", rendered.join(" ")),
                LogicalOperator::And => format!("({})", rendered.join(" AND ")),
                LogicalOperator::Or => format!("({})", rendered.join(" OR ")),
            })
        }
    }
}

fn check_children(operator: LogicalOperator, count: usize) -> Result<()> {
    let ok = match operator {
        LogicalOperator::Not => count == 1,
        LogicalOperator::And | LogicalOperator::Or => count > 0,
    };
    if ok {
        Ok(())
    } else {
        Err(Error::invalid_operand(
            "<condition>",
            format!("{} cannot take {} conditions", operator, count),
        ))
    }
}

fn check_operands(path: &Path, operator: Operator, count: usize) -> Result<()> {
    let ok = match operator {
        Operator::AttributeExists | Operator::AttributeNotExists => count == 0,
        Operator::Between => count == 2,
        Operator::In => (1..=MAX_IN_OPERANDS).contains(&count),
        Operator::Compare(_)
        | Operator::BeginsWith
        | Operator::AttributeType
        | Operator::Contains
        | Operator::Size(_) => count == 1,
    };
    if ok {
        Ok(())
    } else {
        Err(Error::invalid_operand(
            path.to_string(),
            format!("{} cannot take {} operands", operator, count),
        ))
    }
}

fn compile_comparison(
    path: &Path,
    operator: Operator,
    operands: &[WireValue],
    aliases: &mut AliasAllocator,
) -> Result<String> {
    check_operands(path, operator, operands.len())?;
    let target = aliases.path_expression(path);
    let values: Vec<String> = operands
        .iter()
        .cloned()
        .map(|operand| aliases.value(operand))
        .collect();

    Ok(match operator {
        Operator::Compare(cmp) => format!("{} {} {}", target, cmp, values[0]),
        Operator::Between => format!("{} BETWEEN {} AND {}", target, values[0], values[1]),
        Operator::In => format!("{} IN ({})", target, values.join(", ")),
        Operator::AttributeExists | Operator::AttributeNotExists => {
            format!("{}({})", operator, target)
        }
        Operator::BeginsWith | Operator::AttributeType | Operator::Contains => {
            format!("{}({}, {})", operator, target, values[0])
        }
        Operator::Size(cmp) => format!("size({}) {} {}", target, cmp, values[0]),
    })
}

/// Render a projection list: `#f0, #f1.#f2`
pub fn compile_projection(paths: &[Path], aliases: &mut AliasAllocator) -> String {
    paths
        .iter()
        .map(|path| aliases.path_expression(path))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Single action of an update expression
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateAction {
    /// `SET path = value`
    Set { path: Path, value: WireValue },
    /// `REMOVE path`
    Remove { path: Path },
    /// `DELETE path value`; removes elements from a set
    Delete { path: Path, value: WireValue },
}

/// Render update actions grouped by clause: `SET a = :v0, b = :v1 REMOVE c DELETE d :v2`
pub fn compile_update(actions: &[UpdateAction], aliases: &mut AliasAllocator) -> String {
    let mut set = Vec::new();
    let mut remove = Vec::new();
    let mut delete = Vec::new();

    for action in actions {
        match action {
            UpdateAction::Set { path, value } => {
                let target = aliases.path_expression(path);
                set.push(format!("{} = {}", target, aliases.value(value.clone())));
            }
            UpdateAction::Remove { path } => remove.push(aliases.path_expression(path)),
            UpdateAction::Delete { path, value } => {
                let target = aliases.path_expression(path);
                delete.push(format!("{} {}", target, aliases.value(value.clone())));
            }
        }
    }

    let mut clauses = Vec::new();
    for (keyword, parts) in [("SET", set), ("REMOVE", remove), ("DELETE", delete)] {
        if !parts.is_empty() {
            clauses.push(format!("{} {}", keyword, parts.join(", ")));
        }
    }
    clauses.join(" ")
}

/// A rendered expression together with its alias tables
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledStatement {
    pub expression: String,
    pub names: HashMap<String, String>,
    pub values: HashMap<String, WireValue>,
}

impl CompiledStatement {
    /// Compile a standalone condition with a fresh allocator
    pub fn compile(condition: &Condition) -> Result<Self> {
        Self::compile_with(condition, AliasAllocator::new())
    }

    pub fn compile_with(condition: &Condition, mut aliases: AliasAllocator) -> Result<Self> {
        let expression = compile(condition, &mut aliases)?;
        let (names, values) = aliases.finish();
        debug!(
            expression = %expression,
            names = names.len(),
            values = values.len(),
            "compiled condition"
        );
        Ok(Self {
            expression,
            names,
            values,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::condition::ConditionBuilder;
    use crate::expression::operator::Comparator;
    use crate::schema::Schema;
    use crate::types::{Attribute, KeyType, SetType};
    use crate::wire::WireTag;

    fn users_schema() -> Schema {
        Schema::builder()
            .attribute("pk", Attribute::partition_key(KeyType::String))
            .attribute("sk", Attribute::sort_key(KeyType::String))
            .attribute("age", Attribute::number())
            .attribute("tags", Attribute::set(SetType::String))
            .attribute(
                "cards",
                Attribute::list(Attribute::map(
                    Schema::builder()
                        .attribute("last4", Attribute::number())
                        .attribute("type", Attribute::string())
                        .build()
                        .unwrap(),
                )),
            )
            .build()
            .unwrap()
    }

    // =========================================================================
    // Comparison Rendering
    // =========================================================================

    #[test]
    fn test_compile_equality() {
        let schema = users_schema();
        let eb = ConditionBuilder::new(schema.key_view());
        let statement = CompiledStatement::compile(&eb.eq("pk", "users#1").unwrap()).unwrap();

        assert_eq!(statement.expression, "#f0 = :v0");
        assert_eq!(statement.names["#f0"], "pk");
        assert_eq!(statement.values[":v0"], WireValue::S("users#1".to_string()));
    }

    #[test]
    fn test_compile_function_forms() {
        let schema = users_schema();
        let eb = ConditionBuilder::new(schema.full_view());
        let cases = [
            (eb.begins_with("sk", "2024").unwrap(), "begins_with(#f0, :v0)"),
            (eb.between("age", 1, 9).unwrap(), "#f0 BETWEEN :v0 AND :v1"),
            (eb.is_in("age", [1, 2, 3]).unwrap(), "#f0 IN (:v0, :v1, :v2)"),
            (eb.exists("tags").unwrap(), "attribute_exists(#f0)"),
            (eb.not_exists("tags").unwrap(), "attribute_not_exists(#f0)"),
            (eb.contains("tags", "x").unwrap(), "contains(#f0, :v0)"),
            (eb.attribute_type("age", WireTag::N).unwrap(), "attribute_type(#f0, :v0)"),
            (eb.size("cards", Comparator::Gt, 2).unwrap(), "size(#f0) > :v0"),
            (eb.ne("age", 3).unwrap(), "#f0 <> :v0"),
        ];
        for (condition, expected) in cases {
            assert_eq!(CompiledStatement::compile(&condition).unwrap().expression, expected);
        }
    }

    #[test]
    fn test_compile_nested_path() {
        let schema = users_schema();
        let eb = ConditionBuilder::new(schema.full_view());
        let statement = CompiledStatement::compile(&eb.eq("cards[0].last4", 1234).unwrap()).unwrap();

        assert_eq!(statement.expression, "#f0[0].#f1 = :v0");
        assert_eq!(statement.names["#f0"], "cards");
        assert_eq!(statement.names["#f1"], "last4");
    }

    // =========================================================================
    // Alias Allocation
    // =========================================================================

    #[test]
    fn test_same_name_reuses_alias() {
        let schema = users_schema();
        let eb = ConditionBuilder::new(schema.full_view());
        let condition = eb
            .or(vec![eb.eq("age", 1).unwrap(), eb.eq("age", 2).unwrap()])
            .unwrap();
        let statement = CompiledStatement::compile(&condition).unwrap();

        assert_eq!(statement.expression, "(#f0 = :v0 OR #f0 = :v1)");
        assert_eq!(statement.names.len(), 1);
        assert_eq!(statement.values.len(), 2);
    }

    #[test]
    fn test_shared_allocator_avoids_collisions() {
        let schema = users_schema();
        let keys = ConditionBuilder::new(schema.key_view());
        let filters = ConditionBuilder::new(schema.non_key_view());

        let mut aliases = AliasAllocator::new();
        let key = compile(&keys.eq("pk", "a").unwrap(), &mut aliases).unwrap();
        let filter = compile(&filters.gt("age", 30).unwrap(), &mut aliases).unwrap();
        let (names, values) = aliases.finish();

        assert_eq!(key, "#f0 = :v0");
        assert_eq!(filter, "#f1 > :v1");
        assert_eq!(names.len(), 2);
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn test_custom_prefixes() {
        let mut aliases = AliasAllocator::with_prefixes("#n", ":p");
        let rendered = aliases.path_expression(&Path::parse("cards[1].type").unwrap());
        assert_eq!(rendered, "#n0[1].#n1");
        assert_eq!(aliases.value(WireValue::Null), ":p0");
    }

    // =========================================================================
    // Logical Rendering
    // =========================================================================

    #[test]
    fn test_nested_logical_groups() {
        let schema = users_schema();
        let eb = ConditionBuilder::new(schema.full_view());
        let condition = eb
            .and(vec![
                eb.or(vec![eb.eq("age", 1).unwrap(), eb.eq("age", 2).unwrap()])
                    .unwrap(),
                eb.contains("tags", "x").unwrap(),
            ])
            .unwrap();

        assert_eq!(
            CompiledStatement::compile(&condition).unwrap().expression,
            "((#f0 = :v0 OR #f0 = :v1) AND contains(#f1, :v2))"
        );
    }

    #[test]
    fn test_deep_nesting_with_not() {
        let schema = users_schema();
        let eb = ConditionBuilder::new(schema.full_view());
        let inner = eb
            .and(vec![
                eb.exists("tags").unwrap(),
                eb.not(vec![eb.eq("age", 5).unwrap()]).unwrap(),
            ])
            .unwrap();
        let condition = eb.or(vec![inner, eb.lt("age", 2).unwrap()]).unwrap();

        assert_eq!(condition.depth(), 4);
        assert_eq!(
            CompiledStatement::compile(&condition).unwrap().expression,
            "((attribute_exists(#f0) AND (NOT #f1 = :v0)) OR #f1 < :v1)"
        );
    }

    #[test]
    fn test_hand_built_comparison_with_missing_operand() {
        let condition = Condition::Comparison {
            path: Path::field("age"),
            operator: Operator::Between,
            operands: vec![WireValue::N("1".to_string())],
        };
        let result = CompiledStatement::compile(&condition);
        assert!(matches!(result, Err(Error::InvalidOperand { ref path, .. }) if path == "age"));

        let condition = Condition::Comparison {
            path: Path::field("age"),
            operator: Operator::AttributeExists,
            operands: vec![WireValue::Null],
        };
        assert!(CompiledStatement::compile(&condition).is_err());
    }

    #[test]
    fn test_hand_built_logical_with_bad_child_count() {
        let empty = Condition::Logical {
            operator: LogicalOperator::And,
            children: vec![],
        };
        assert!(matches!(
            CompiledStatement::compile(&empty),
            Err(Error::InvalidOperand { .. })
        ));

        let leaf = Condition::Comparison {
            path: Path::field("tags"),
            operator: Operator::AttributeExists,
            operands: vec![],
        };
        let double_not = Condition::Logical {
            operator: LogicalOperator::Not,
            children: vec![leaf.clone(), leaf],
        };
        assert!(CompiledStatement::compile(&double_not).is_err());
    }

    // =========================================================================
    // Projection and Update Rendering
    // =========================================================================

    #[test]
    fn test_compile_projection() {
        let mut aliases = AliasAllocator::new();
        let paths = [
            Path::parse("age").unwrap(),
            Path::parse("cards[0].last4").unwrap(),
            Path::parse("age").unwrap(),
        ];
        assert_eq!(
            compile_projection(&paths, &mut aliases),
            "#f0, #f1[0].#f2, #f0"
        );
    }

    #[test]
    fn test_compile_update_groups_clauses() {
        let mut aliases = AliasAllocator::new();
        let actions = [
            UpdateAction::Set {
                path: Path::field("age"),
                value: WireValue::N("3".to_string()),
            },
            UpdateAction::Remove {
                path: Path::parse("cards[2]").unwrap(),
            },
            UpdateAction::Delete {
                path: Path::field("tags"),
                value: WireValue::Ss(vec!["old".to_string()]),
            },
            UpdateAction::Set {
                path: Path::parse("cards[0].type").unwrap(),
                value: WireValue::S("visa".to_string()),
            },
        ];
        let expression = compile_update(&actions, &mut aliases);
        assert_eq!(
            expression,
            "SET #f0 = :v0, #f1[0].#f3 = :v2 REMOVE #f1[2] DELETE #f2 :v1"
        );
    }
}
