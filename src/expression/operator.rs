//! Operators and the per-attribute legality table

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::types::{Attribute, ScalarType};

/// Binary comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Comparator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Comparator::Eq => "=",
            Comparator::Ne => "<>",
            Comparator::Lt => "<",
            Comparator::Le => "<=",
            Comparator::Gt => ">",
            Comparator::Ge => ">=",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "=" => Comparator::Eq,
            "<>" => Comparator::Ne,
            "<" => Comparator::Lt,
            "<=" => Comparator::Le,
            ">" => Comparator::Gt,
            ">=" => Comparator::Ge,
            _ => return None,
        })
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operator of a comparison condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// `path <cmp> value`
    Compare(Comparator),
    /// `begins_with(path, prefix)`
    BeginsWith,
    /// `path BETWEEN low AND high`
    Between,
    /// `path IN (v1, v2, ...)`
    In,
    /// `attribute_type(path, tag)`
    AttributeType,
    /// `attribute_exists(path)`
    AttributeExists,
    /// `attribute_not_exists(path)`
    AttributeNotExists,
    /// `contains(path, operand)`
    Contains,
    /// `size(path) <cmp> value`
    Size(Comparator),
}

impl Operator {
    pub const EQ: Operator = Operator::Compare(Comparator::Eq);

    /// Whether the operator renders as a function call
    pub fn is_function(&self) -> bool {
        matches!(
            self,
            Operator::BeginsWith
                | Operator::AttributeType
                | Operator::AttributeExists
                | Operator::AttributeNotExists
                | Operator::Contains
                | Operator::Size(_)
        )
    }

    /// Operator family used for table lookups; all `size` comparisons are one entry
    fn family(self) -> Operator {
        match self {
            Operator::Size(_) => Operator::Size(Comparator::Eq),
            other => other,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operator::Compare(cmp) => write!(f, "{}", cmp),
            Operator::BeginsWith => f.write_str("begins_with"),
            Operator::Between => f.write_str("between"),
            Operator::In => f.write_str("in"),
            Operator::AttributeType => f.write_str("attribute_type"),
            Operator::AttributeExists => f.write_str("attribute_exists"),
            Operator::AttributeNotExists => f.write_str("attribute_not_exists"),
            Operator::Contains => f.write_str("contains"),
            Operator::Size(Comparator::Eq) => f.write_str("size"),
            Operator::Size(cmp) => write!(f, "size {}", cmp),
        }
    }
}

impl FromStr for Operator {
    type Err = Error;

    /// Parse the wire spelling; `size` alone means `size =`, `size <` etc. pick a comparator
    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase();
        if let Some(cmp) = Comparator::parse(&normalized) {
            return Ok(Operator::Compare(cmp));
        }
        if let Some(rest) = normalized.strip_prefix("size") {
            let rest = rest.trim();
            if rest.is_empty() {
                return Ok(Operator::Size(Comparator::Eq));
            }
            if let Some(cmp) = Comparator::parse(rest) {
                return Ok(Operator::Size(cmp));
            }
        }
        Ok(match normalized.as_str() {
            "begins_with" => Operator::BeginsWith,
            "between" => Operator::Between,
            "in" => Operator::In,
            "attribute_type" => Operator::AttributeType,
            "attribute_exists" => Operator::AttributeExists,
            "attribute_not_exists" => Operator::AttributeNotExists,
            "contains" => Operator::Contains,
            _ => return Err(Error::UnknownOperator(s.to_string())),
        })
    }
}

/// Anything that names an operator
pub trait IntoOperator {
    fn into_operator(self) -> Result<Operator>;
}

impl IntoOperator for Operator {
    fn into_operator(self) -> Result<Operator> {
        Ok(self)
    }
}

impl IntoOperator for Comparator {
    fn into_operator(self) -> Result<Operator> {
        Ok(Operator::Compare(self))
    }
}

impl IntoOperator for &str {
    fn into_operator(self) -> Result<Operator> {
        self.parse()
    }
}

/// Logical combinators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalOperator {
    And,
    Or,
    Not,
}

impl fmt::Display for LogicalOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalOperator::And => f.write_str("AND"),
            LogicalOperator::Or => f.write_str("OR"),
            LogicalOperator::Not => f.write_str("NOT"),
        }
    }
}

// ============================================================================
// Legality table
// ============================================================================

const PARTITION_KEY_OPERATORS: &[Operator] = &[Operator::Compare(Comparator::Eq)];

const SORT_KEY_OPERATORS: &[Operator] = &[
    Operator::Compare(Comparator::Eq),
    Operator::Compare(Comparator::Lt),
    Operator::Compare(Comparator::Le),
    Operator::Compare(Comparator::Gt),
    Operator::Compare(Comparator::Ge),
    Operator::BeginsWith,
    Operator::Between,
];

const ATTRIBUTE_OPERATORS: &[Operator] = &[
    Operator::Compare(Comparator::Eq),
    Operator::Compare(Comparator::Ne),
    Operator::Compare(Comparator::Lt),
    Operator::Compare(Comparator::Le),
    Operator::Compare(Comparator::Gt),
    Operator::Compare(Comparator::Ge),
    Operator::BeginsWith,
    Operator::Between,
    Operator::In,
    Operator::AttributeType,
    Operator::AttributeExists,
    Operator::AttributeNotExists,
    Operator::Contains,
    Operator::Size(Comparator::Eq),
];

/// Operators the attribute kind admits
pub fn legal_operators(attribute: &Attribute) -> &'static [Operator] {
    match attribute {
        Attribute::PartitionKey { .. } => PARTITION_KEY_OPERATORS,
        Attribute::SortKey { .. } => SORT_KEY_OPERATORS,
        Attribute::Scalar { .. }
        | Attribute::Set { .. }
        | Attribute::List { .. }
        | Attribute::Map { .. } => ATTRIBUTE_OPERATORS,
    }
}

/// Whether `operator` may be applied to `attribute`
///
/// On top of the per-kind table, string predicates need string data:
/// `begins_with` applies to string and date values, `contains` to strings and
/// collections, `size` to strings and collections.
pub fn is_legal(attribute: &Attribute, operator: Operator) -> bool {
    if !legal_operators(attribute).contains(&operator.family()) {
        return false;
    }

    let scalar = attribute.scalar_type();
    match operator {
        Operator::BeginsWith => scalar.is_some_and(|s| s.is_string_like()),
        Operator::Contains => {
            scalar == Some(ScalarType::String)
                || matches!(attribute, Attribute::Set { .. } | Attribute::List { .. })
        }
        Operator::Size(_) => {
            scalar == Some(ScalarType::String)
                || matches!(
                    attribute,
                    Attribute::Set { .. } | Attribute::List { .. } | Attribute::Map { .. }
                )
        }
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Schema;
    use crate::types::{KeyType, SetType};

    // =========================================================================
    // Parsing Tests
    // =========================================================================

    #[test]
    fn test_parse_comparators() {
        assert_eq!("=".parse::<Operator>().unwrap(), Operator::EQ);
        assert_eq!(
            "<>".parse::<Operator>().unwrap(),
            Operator::Compare(Comparator::Ne)
        );
        assert_eq!(
            ">=".parse::<Operator>().unwrap(),
            Operator::Compare(Comparator::Ge)
        );
    }

    #[test]
    fn test_parse_functions_case_insensitive() {
        assert_eq!("BETWEEN".parse::<Operator>().unwrap(), Operator::Between);
        assert_eq!("begins_with".parse::<Operator>().unwrap(), Operator::BeginsWith);
        assert_eq!(
            "attribute_not_exists".parse::<Operator>().unwrap(),
            Operator::AttributeNotExists
        );
    }

    #[test]
    fn test_parse_size_variants() {
        assert_eq!(
            "size".parse::<Operator>().unwrap(),
            Operator::Size(Comparator::Eq)
        );
        assert_eq!(
            "size >".parse::<Operator>().unwrap(),
            Operator::Size(Comparator::Gt)
        );
        assert!("size ~".parse::<Operator>().is_err());
    }

    #[test]
    fn test_parse_unknown() {
        assert!(matches!(
            "like".parse::<Operator>(),
            Err(Error::UnknownOperator(ref op)) if op == "like"
        ));
    }

    #[test]
    fn test_display_roundtrips_through_parse() {
        for op in ATTRIBUTE_OPERATORS {
            assert_eq!(op.to_string().parse::<Operator>().unwrap(), *op);
        }
        assert_eq!(Operator::Size(Comparator::Le).to_string(), "size <=");
    }

    // =========================================================================
    // Legality Tests
    // =========================================================================

    #[test]
    fn test_partition_key_only_equality() {
        let pk = Attribute::partition_key(KeyType::String);
        assert!(is_legal(&pk, Operator::EQ));
        assert!(!is_legal(&pk, Operator::BeginsWith));
        assert!(!is_legal(&pk, Operator::Compare(Comparator::Ne)));
        assert!(!is_legal(&pk, Operator::AttributeExists));
    }

    #[test]
    fn test_sort_key_range_operators() {
        let sk = Attribute::sort_key(KeyType::String);
        assert!(is_legal(&sk, Operator::EQ));
        assert!(is_legal(&sk, Operator::Between));
        assert!(is_legal(&sk, Operator::BeginsWith));
        assert!(!is_legal(&sk, Operator::Compare(Comparator::Ne)));
        assert!(!is_legal(&sk, Operator::In));

        let numeric = Attribute::sort_key(KeyType::Number);
        assert!(!is_legal(&numeric, Operator::BeginsWith));
    }

    #[test]
    fn test_string_predicates_need_strings() {
        assert!(!is_legal(&Attribute::number(), Operator::BeginsWith));
        assert!(is_legal(&Attribute::string(), Operator::BeginsWith));
        assert!(is_legal(&Attribute::date(), Operator::BeginsWith));
        assert!(!is_legal(&Attribute::boolean(), Operator::Contains));
        assert!(is_legal(&Attribute::set(SetType::Number), Operator::Contains));
        assert!(!is_legal(&Attribute::number(), Operator::Size(Comparator::Gt)));
        assert!(is_legal(
            &Attribute::map(Schema::default()),
            Operator::Size(Comparator::Gt)
        ));
    }

    #[test]
    fn test_regular_attributes_take_full_set() {
        let attr = Attribute::number();
        for op in [
            Operator::Compare(Comparator::Ne),
            Operator::In,
            Operator::Between,
            Operator::AttributeExists,
            Operator::AttributeNotExists,
            Operator::AttributeType,
        ] {
            assert!(is_legal(&attr, op), "{} should be legal", op);
        }
    }
}
