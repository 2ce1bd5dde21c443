//! Schema tree
//!
//! A [`Schema`] is an ordered mapping from field name to [`Attribute`]. Maps own
//! a nested schema and lists own their item attribute, so the whole entity is a
//! tree of exclusively-owned nodes. Schemas are built once and read-only after
//! that; paths are resolved against them at runtime.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::path::{IntoPath, Path, PathSegment};
use crate::types::Attribute;

/// Named attribute inside a schema
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AttributeDefinition {
    /// Attribute name as stored in the item
    pub name: String,

    /// Attribute kind, flattened next to the name
    #[serde(flatten)]
    pub attribute: Attribute,
}

impl AttributeDefinition {
    pub fn new(name: impl Into<String>, attribute: Attribute) -> Self {
        Self {
            name: name.into(),
            attribute,
        }
    }
}

/// Ordered tree of named attributes
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Schema {
    fields: Vec<AttributeDefinition>,
}

impl Schema {
    /// Start building a schema
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// Parse a JSON schema definition and validate it as an entity schema
    pub fn from_json(json: &str) -> Result<Self> {
        let schema: Schema = serde_json::from_str(json)?;
        schema.validate_structure(&Path::root())?;
        schema.validate_entity()?;
        Ok(schema)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Direct child by name
    pub fn get(&self, name: &str) -> Option<&Attribute> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| &f.attribute)
    }

    /// Children in definition order
    pub fn children(&self) -> impl Iterator<Item = (&str, &Attribute)> {
        self.fields.iter().map(|f| (f.name.as_str(), &f.attribute))
    }

    pub fn is_primary_key(&self, name: &str) -> bool {
        self.get(name).is_some_and(Attribute::is_key)
    }

    /// Name of the partition key attribute
    pub fn partition_key(&self) -> Option<&str> {
        self.children()
            .find(|(_, a)| matches!(a, Attribute::PartitionKey { .. }))
            .map(|(name, _)| name)
    }

    /// Name of the sort key attribute
    pub fn sort_key(&self) -> Option<&str> {
        self.children()
            .find(|(_, a)| matches!(a, Attribute::SortKey { .. }))
            .map(|(name, _)| name)
    }

    /// Key attribute names, partition key first
    pub fn key_names(&self) -> Vec<&str> {
        self.partition_key().into_iter().chain(self.sort_key()).collect()
    }

    /// Resolve a dotted path such as `address.city` or `cards.[0].last4`
    pub fn resolve(&self, path: impl IntoPath) -> Result<&Attribute> {
        self.resolve_path(&path.into_path()?)
    }

    /// Resolve a parsed path
    ///
    /// Any index resolves to the list's item schema, since list items are uniform.
    pub fn resolve_path(&self, path: &Path) -> Result<&Attribute> {
        let mut current: Option<&Attribute> = None;

        for (i, segment) in path.segments().iter().enumerate() {
            let fields = match current {
                None => self,
                Some(Attribute::Map { fields }) => fields,
                Some(Attribute::List { items }) => {
                    if !matches!(segment, PathSegment::Index(_)) {
                        return Err(Error::invalid_segment(path.to_string(), segment.to_string()));
                    }
                    let item = items.as_deref().ok_or_else(|| Error::MissingListItemSchema {
                        path: path.prefix(i).to_string(),
                    })?;
                    current = Some(item);
                    continue;
                }
                Some(_) => {
                    return Err(Error::invalid_segment(path.to_string(), segment.to_string()));
                }
            };

            let PathSegment::Field(name) = segment else {
                return Err(Error::invalid_segment(path.to_string(), segment.to_string()));
            };
            current = Some(
                fields
                    .get(name)
                    .ok_or_else(|| Error::path_not_found(path.to_string()))?,
            );
        }

        current.ok_or_else(|| Error::path_not_found(path.to_string()))
    }

    /// View restricted to primary key attributes
    pub fn key_view(&self) -> SchemaView<'_> {
        SchemaView::new(self, ViewScope::KeysOnly)
    }

    /// View restricted to non-key attributes
    pub fn non_key_view(&self) -> SchemaView<'_> {
        SchemaView::new(self, ViewScope::NonKeys)
    }

    /// Unrestricted view
    pub fn full_view(&self) -> SchemaView<'_> {
        SchemaView::new(self, ViewScope::Full)
    }

    /// Check the key invariants of a top-level entity schema
    ///
    /// Exactly one partition key and at most one sort key.
    pub fn validate_entity(&self) -> Result<()> {
        let partition_keys = self
            .children()
            .filter(|(_, a)| matches!(a, Attribute::PartitionKey { .. }))
            .count();
        if partition_keys != 1 {
            return Err(Error::invalid_schema(format!(
                "entity schema must have exactly one partition key, found {}",
                partition_keys
            )));
        }
        Ok(())
    }

    /// Structural checks shared by entity and nested schemas
    fn validate_structure(&self, at: &Path) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for (name, attribute) in self.children() {
            if !seen.insert(name) {
                return Err(Error::invalid_schema(format!(
                    "duplicate attribute '{}'",
                    at.join_field(name)
                )));
            }
            if name.is_empty() {
                return Err(Error::invalid_schema("attribute name cannot be empty"));
            }
            validate_attribute(attribute, &at.join_field(name), at.is_root())?;
        }

        if !at.is_root() {
            return Ok(());
        }
        let sort_keys = self
            .children()
            .filter(|(_, a)| matches!(a, Attribute::SortKey { .. }))
            .count();
        let partition_keys = self
            .children()
            .filter(|(_, a)| matches!(a, Attribute::PartitionKey { .. }))
            .count();
        if partition_keys > 1 || sort_keys > 1 {
            return Err(Error::invalid_schema(format!(
                "schema declares {} partition keys and {} sort keys",
                partition_keys, sort_keys
            )));
        }
        Ok(())
    }
}

fn validate_attribute(attribute: &Attribute, at: &Path, top_level: bool) -> Result<()> {
    match attribute {
        Attribute::PartitionKey { .. } | Attribute::SortKey { .. } if !top_level => {
            Err(Error::invalid_schema(format!(
                "key attribute '{}' must be a top-level field",
                at
            )))
        }
        Attribute::List { items: None } => Err(Error::MissingListItemSchema {
            path: at.to_string(),
        }),
        Attribute::List { items: Some(item) } => {
            validate_attribute(item, &at.join_index(0), false)
        }
        Attribute::Map { fields } => fields.validate_structure(at),
        _ => Ok(()),
    }
}

/// Builder for [`Schema`]
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    fields: Vec<AttributeDefinition>,
}

impl SchemaBuilder {
    /// Append an attribute
    pub fn attribute(mut self, name: impl Into<String>, attribute: Attribute) -> Self {
        self.fields.push(AttributeDefinition::new(name, attribute));
        self
    }

    /// Build the schema, checking its structure
    ///
    /// Used for nested map schemas as well as entities; entity-level key
    /// requirements are checked by [`Schema::validate_entity`].
    pub fn build(self) -> Result<Schema> {
        let schema = Schema {
            fields: self.fields,
        };
        schema.validate_structure(&Path::root())?;
        Ok(schema)
    }
}

// ============================================================================
// Views
// ============================================================================

/// Which top-level attributes a view exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewScope {
    Full,
    KeysOnly,
    NonKeys,
}

/// Borrowed view over a schema limiting which top-level fields are reachable
#[derive(Debug, Clone, Copy)]
pub struct SchemaView<'a> {
    schema: &'a Schema,
    scope: ViewScope,
}

impl<'a> SchemaView<'a> {
    pub fn new(schema: &'a Schema, scope: ViewScope) -> Self {
        Self { schema, scope }
    }

    pub fn schema(&self) -> &'a Schema {
        self.schema
    }

    pub fn scope(&self) -> ViewScope {
        self.scope
    }

    /// Whether the named top-level attribute is visible
    pub fn contains(&self, name: &str) -> bool {
        match self.scope {
            ViewScope::Full => self.schema.get(name).is_some(),
            ViewScope::KeysOnly => self.schema.is_primary_key(name),
            ViewScope::NonKeys => self.schema.get(name).is_some_and(|a| !a.is_key()),
        }
    }

    /// Resolve a path, failing with `PathNotFound` when it starts outside the view
    pub fn resolve(&self, path: &Path) -> Result<&'a Attribute> {
        match path.first_field() {
            Some(name) if self.contains(name) => self.schema.resolve_path(path),
            _ => Err(Error::path_not_found(path.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{KeyType, ScalarType, SetType};

    fn users_schema() -> Schema {
        Schema::builder()
            .attribute("pk", Attribute::partition_key(KeyType::String))
            .attribute("sk", Attribute::sort_key(KeyType::Number))
            .attribute("age", Attribute::number())
            .attribute(
                "address",
                Attribute::map(
                    Schema::builder()
                        .attribute(
                            "city",
                            Attribute::map(
                                Schema::builder()
                                    .attribute("name", Attribute::string())
                                    .attribute("province", Attribute::string())
                                    .build()
                                    .unwrap(),
                            ),
                        )
                        .attribute("zip", Attribute::number())
                        .build()
                        .unwrap(),
                ),
            )
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
            .attribute("tags", Attribute::set(SetType::String))
            .build()
            .unwrap()
    }

    // =========================================================================
    // Resolution Tests
    // =========================================================================

    #[test]
    fn test_resolve_top_level() {
        let schema = users_schema();
        assert_eq!(schema.resolve("age").unwrap(), &Attribute::number());
    }

    #[test]
    fn test_resolve_nested_map() {
        let schema = users_schema();
        assert_eq!(
            schema.resolve("address.city.name").unwrap(),
            &Attribute::string()
        );
    }

    #[test]
    fn test_resolve_list_index_returns_item_schema() {
        let schema = users_schema();
        assert_eq!(schema.resolve("cards.[0].last4").unwrap(), &Attribute::number());
        assert_eq!(
            schema.resolve("cards.[0]").unwrap(),
            schema.resolve("cards.[41]").unwrap()
        );
    }

    #[test]
    fn test_resolve_is_pure() {
        let schema = users_schema();
        let first = schema.resolve("cards[3].type").unwrap();
        let second = schema.resolve("cards[3].type").unwrap();
        assert!(std::ptr::eq(first, second));
    }

    #[test]
    fn test_resolve_named_segment_on_list_fails() {
        let schema = users_schema();
        let err = schema.resolve("cards.foo").unwrap_err();
        assert!(matches!(err, Error::InvalidPathSegment { ref segment, .. } if segment == "foo"));
    }

    #[test]
    fn test_resolve_index_on_map_fails() {
        let schema = users_schema();
        assert!(matches!(
            schema.resolve("address.[0]"),
            Err(Error::InvalidPathSegment { .. })
        ));
    }

    #[test]
    fn test_resolve_into_scalar_or_set_fails() {
        let schema = users_schema();
        assert!(matches!(
            schema.resolve("age.value"),
            Err(Error::InvalidPathSegment { .. })
        ));
        assert!(matches!(
            schema.resolve("tags[0]"),
            Err(Error::InvalidPathSegment { .. })
        ));
    }

    #[test]
    fn test_resolve_missing_field() {
        let schema = users_schema();
        assert!(matches!(
            schema.resolve("address.country"),
            Err(Error::PathNotFound { ref path }) if path == "address.country"
        ));
        assert!(matches!(schema.resolve("nope"), Err(Error::PathNotFound { .. })));
    }

    #[test]
    fn test_resolve_list_without_item_schema() {
        let schema: Schema =
            serde_json::from_str(r#"[{"name":"items","type":"list"}]"#).unwrap();
        assert!(matches!(
            schema.resolve("items[0]"),
            Err(Error::MissingListItemSchema { ref path }) if path == "items"
        ));
    }

    // =========================================================================
    // Key Tests
    // =========================================================================

    #[test]
    fn test_primary_key_lookup() {
        let schema = users_schema();
        assert!(schema.is_primary_key("pk"));
        assert!(schema.is_primary_key("sk"));
        assert!(!schema.is_primary_key("age"));
        assert!(!schema.is_primary_key("missing"));
        assert_eq!(schema.partition_key(), Some("pk"));
        assert_eq!(schema.sort_key(), Some("sk"));
        assert_eq!(schema.key_names(), vec!["pk", "sk"]);
    }

    #[test]
    fn test_children_keep_definition_order() {
        let schema = users_schema();
        let names: Vec<_> = schema.children().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["pk", "sk", "age", "address", "cards", "tags"]);
    }

    // =========================================================================
    // View Tests
    // =========================================================================

    #[test]
    fn test_key_view_hides_non_keys() {
        let schema = users_schema();
        let view = schema.key_view();
        assert!(view.resolve(&Path::field("pk")).is_ok());
        assert!(matches!(
            view.resolve(&Path::field("age")),
            Err(Error::PathNotFound { .. })
        ));
    }

    #[test]
    fn test_non_key_view_hides_keys() {
        let schema = users_schema();
        let view = schema.non_key_view();
        assert!(view.resolve(&Path::parse("address.zip").unwrap()).is_ok());
        assert!(view.resolve(&Path::field("sk")).is_err());
    }

    // =========================================================================
    // Validation Tests
    // =========================================================================

    #[test]
    fn test_duplicate_attribute_rejected() {
        let result = Schema::builder()
            .attribute("a", Attribute::string())
            .attribute("a", Attribute::number())
            .build();
        assert!(matches!(result, Err(Error::InvalidSchema(_))));
    }

    #[test]
    fn test_two_partition_keys_rejected() {
        let result = Schema::builder()
            .attribute("a", Attribute::partition_key(KeyType::String))
            .attribute("b", Attribute::partition_key(KeyType::String))
            .build();
        assert!(matches!(result, Err(Error::InvalidSchema(_))));
    }

    #[test]
    fn test_nested_key_rejected() {
        let nested = Schema {
            fields: vec![AttributeDefinition::new(
                "id",
                Attribute::partition_key(KeyType::String),
            )],
        };
        let result = Schema::builder()
            .attribute("pk", Attribute::partition_key(KeyType::String))
            .attribute("meta", Attribute::map(nested))
            .build();
        assert!(matches!(result, Err(Error::InvalidSchema(_))));
    }

    #[test]
    fn test_entity_requires_partition_key() {
        let schema = Schema::builder()
            .attribute("age", Attribute::number())
            .build()
            .unwrap();
        assert!(schema.validate_entity().is_err());
        assert!(users_schema().validate_entity().is_ok());
    }

    #[test]
    fn test_from_json_reports_missing_list_items() {
        let result = Schema::from_json(
            r#"[{"name":"pk","type":"partitionKey","of":"string"},{"name":"tags","type":"list"}]"#,
        );
        assert!(matches!(result, Err(Error::MissingListItemSchema { .. })));
    }

    #[test]
    fn test_json_roundtrip() {
        let schema = users_schema();
        let json = serde_json::to_string(&schema).unwrap();
        assert!(json.contains(r#""name":"pk""#));
        let parsed = Schema::from_json(&json).unwrap();
        assert_eq!(parsed, schema);
        assert_eq!(
            parsed.resolve("address.zip").unwrap().scalar_type(),
            Some(ScalarType::Number)
        );
    }
}
