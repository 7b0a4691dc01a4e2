//! Search index schema definitions.
//!
//! An [`IndexSchema`] is the field layout of a search index. The wire shape
//! (`name`, `fields[].type`, boolean attributes) matches the search service's
//! REST representation, so the same struct is accepted from HTTP callers and
//! sent to the remote service.

use core::fmt;

use serde::{Deserialize, Serialize};

use super::name::ResourceName;

/// Data type of an index field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    #[serde(rename = "Edm.String")]
    String,
    #[serde(rename = "Edm.Int32")]
    Int32,
    #[serde(rename = "Edm.Int64")]
    Int64,
    #[serde(rename = "Edm.Double")]
    Double,
    #[serde(rename = "Edm.Boolean")]
    Boolean,
    #[serde(rename = "Edm.DateTimeOffset")]
    DateTimeOffset,
    #[serde(rename = "Edm.GeographyPoint")]
    GeographyPoint,
    #[serde(rename = "Collection(Edm.String)")]
    StringCollection,
}

impl FieldType {
    /// Returns the service's type identifier (e.g. `Edm.String`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "Edm.String",
            Self::Int32 => "Edm.Int32",
            Self::Int64 => "Edm.Int64",
            Self::Double => "Edm.Double",
            Self::Boolean => "Edm.Boolean",
            Self::DateTimeOffset => "Edm.DateTimeOffset",
            Self::GeographyPoint => "Edm.GeographyPoint",
            Self::StringCollection => "Collection(Edm.String)",
        }
    }

    /// Whether full-text search can be enabled on this type.
    #[must_use]
    pub const fn is_textual(self) -> bool {
        matches!(self, Self::String | Self::StringCollection)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const fn default_true() -> bool {
    true
}

/// A single field of an index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub key: bool,
    #[serde(default)]
    pub searchable: bool,
    #[serde(default)]
    pub filterable: bool,
    #[serde(default)]
    pub sortable: bool,
    #[serde(default)]
    pub facetable: bool,
    #[serde(default = "default_true")]
    pub retrievable: bool,
}

impl FieldDefinition {
    /// A retrievable field with no search attributes.
    #[must_use]
    pub fn simple(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            key: false,
            searchable: false,
            filterable: false,
            sortable: false,
            facetable: false,
            retrievable: true,
        }
    }

    /// A full-text searchable `Edm.String` field.
    #[must_use]
    pub fn searchable(name: impl Into<String>) -> Self {
        Self {
            searchable: true,
            ..Self::simple(name, FieldType::String)
        }
    }

    /// Mark this field as the document key.
    #[must_use]
    pub const fn key(mut self) -> Self {
        self.key = true;
        self
    }

    #[must_use]
    pub const fn filterable(mut self) -> Self {
        self.filterable = true;
        self
    }

    #[must_use]
    pub const fn sortable(mut self) -> Self {
        self.sortable = true;
        self
    }

    #[must_use]
    pub const fn facetable(mut self) -> Self {
        self.facetable = true;
        self
    }

    /// Describe how `self` differs from `other` (same name assumed).
    fn describe_difference(&self, other: &Self) -> Option<String> {
        if self.field_type != other.field_type {
            return Some(format!(
                "type changed from {} to {}",
                other.field_type, self.field_type
            ));
        }

        let attributes = [
            ("key", self.key, other.key),
            ("searchable", self.searchable, other.searchable),
            ("filterable", self.filterable, other.filterable),
            ("sortable", self.sortable, other.sortable),
            ("facetable", self.facetable, other.facetable),
            ("retrievable", self.retrievable, other.retrievable),
        ];

        attributes
            .iter()
            .find(|(_, new, old)| new != old)
            .map(|(attr, new, old)| format!("attribute '{attr}' changed from {old} to {new}"))
    }
}

/// Reasons an [`IndexSchema`] is rejected before reaching the service.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("schema has no fields")]
    NoFields,
    #[error("schema has no key field")]
    NoKeyField,
    #[error("schema has more than one key field: {}", .0.join(", "))]
    MultipleKeyFields(Vec<String>),
    #[error("duplicate field name '{0}'")]
    DuplicateField(String),
    #[error("invalid field name '{0}' (must start with a letter; letters, digits and '_' only)")]
    InvalidFieldName(String),
    #[error("key field '{field}' must be Edm.String (found {found})")]
    NonStringKey { field: String, found: FieldType },
    #[error("field '{0}' is searchable but not a string type")]
    SearchableNonString(String),
}

/// Result of comparing a desired schema against the one currently deployed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaChange {
    /// Same fields with the same attributes.
    Identical,
    /// Only new fields were added; every existing field is unchanged.
    Additive { added: Vec<String> },
    /// An existing field was removed or altered; requires a rebuild.
    Incompatible { field: String, reason: String },
}

/// Field layout of a named search index.
///
/// ## Constraints
///
/// - At least one field
/// - Exactly one field with `key = true`, of type `Edm.String`
/// - Field names unique, starting with a letter, `[A-Za-z0-9_]` only
/// - `searchable` only on string types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSchema {
    pub name: ResourceName,
    pub fields: Vec<FieldDefinition>,
}

impl IndexSchema {
    /// Create a schema from a name and an ordered field list.
    #[must_use]
    pub const fn new(name: ResourceName, fields: Vec<FieldDefinition>) -> Self {
        Self { name, fields }
    }

    /// Check every structural rule.
    ///
    /// # Errors
    ///
    /// Returns the first [`SchemaError`] found.
    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.fields.is_empty() {
            return Err(SchemaError::NoFields);
        }

        let mut seen = std::collections::HashSet::new();
        for field in &self.fields {
            if !is_valid_field_name(&field.name) {
                return Err(SchemaError::InvalidFieldName(field.name.clone()));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(SchemaError::DuplicateField(field.name.clone()));
            }
            if field.searchable && !field.field_type.is_textual() {
                return Err(SchemaError::SearchableNonString(field.name.clone()));
            }
        }

        let keys: Vec<&FieldDefinition> = self.fields.iter().filter(|f| f.key).collect();
        match keys.as_slice() {
            [] => Err(SchemaError::NoKeyField),
            [key] if key.field_type != FieldType::String => Err(SchemaError::NonStringKey {
                field: key.name.clone(),
                found: key.field_type,
            }),
            [_] => Ok(()),
            many => Err(SchemaError::MultipleKeyFields(
                many.iter().map(|f| f.name.clone()).collect(),
            )),
        }
    }

    /// The key field, if exactly one is declared.
    #[must_use]
    pub fn key_field(&self) -> Option<&FieldDefinition> {
        let mut keys = self.fields.iter().filter(|f| f.key);
        match (keys.next(), keys.next()) {
            (Some(key), None) => Some(key),
            _ => None,
        }
    }

    /// Look up a field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Compare this (desired) schema against the `existing` deployed one.
    ///
    /// Field order is not significant.
    #[must_use]
    pub fn compare(&self, existing: &Self) -> SchemaChange {
        for old in &existing.fields {
            let Some(new) = self.field(&old.name) else {
                return SchemaChange::Incompatible {
                    field: old.name.clone(),
                    reason: "field removed".to_string(),
                };
            };
            if let Some(reason) = new.describe_difference(old) {
                return SchemaChange::Incompatible {
                    field: old.name.clone(),
                    reason,
                };
            }
        }

        let added: Vec<String> = self
            .fields
            .iter()
            .filter(|f| existing.field(&f.name).is_none())
            .map(|f| f.name.clone())
            .collect();

        if added.is_empty() {
            SchemaChange::Identical
        } else {
            SchemaChange::Additive { added }
        }
    }
}

fn is_valid_field_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn docs_schema() -> IndexSchema {
        IndexSchema::new(
            ResourceName::parse("docs-01").unwrap(),
            vec![
                FieldDefinition::simple("id", FieldType::String).key(),
                FieldDefinition::searchable("title"),
                FieldDefinition::searchable("content"),
            ],
        )
    }

    #[test]
    fn test_valid_schema() {
        assert_eq!(docs_schema().validate(), Ok(()));
        assert_eq!(docs_schema().key_field().unwrap().name, "id");
    }

    #[test]
    fn test_no_key_field() {
        let mut schema = docs_schema();
        schema.fields[0].key = false;
        assert_eq!(schema.validate(), Err(SchemaError::NoKeyField));
        assert!(schema.key_field().is_none());
    }

    #[test]
    fn test_multiple_key_fields() {
        let mut schema = docs_schema();
        schema.fields[1].key = true;
        assert_eq!(
            schema.validate(),
            Err(SchemaError::MultipleKeyFields(vec![
                "id".to_string(),
                "title".to_string()
            ]))
        );
        assert!(schema.key_field().is_none());
    }

    #[test]
    fn test_empty_fields() {
        let schema = IndexSchema::new(ResourceName::parse("x").unwrap(), vec![]);
        assert_eq!(schema.validate(), Err(SchemaError::NoFields));
    }

    #[test]
    fn test_duplicate_field() {
        let mut schema = docs_schema();
        schema.fields.push(FieldDefinition::searchable("title"));
        assert_eq!(
            schema.validate(),
            Err(SchemaError::DuplicateField("title".to_string()))
        );
    }

    #[test]
    fn test_invalid_field_names() {
        for bad in ["", "1abc", "has space", "dash-ed"] {
            let mut schema = docs_schema();
            schema.fields.push(FieldDefinition::simple(bad, FieldType::Int32));
            assert!(matches!(
                schema.validate(),
                Err(SchemaError::InvalidFieldName(_))
            ));
        }
    }

    #[test]
    fn test_key_must_be_string() {
        let schema = IndexSchema::new(
            ResourceName::parse("x").unwrap(),
            vec![FieldDefinition::simple("id", FieldType::Int64).key()],
        );
        assert!(matches!(
            schema.validate(),
            Err(SchemaError::NonStringKey { .. })
        ));
    }

    #[test]
    fn test_searchable_requires_text() {
        let mut schema = docs_schema();
        let mut count = FieldDefinition::simple("count", FieldType::Int32);
        count.searchable = true;
        schema.fields.push(count);
        assert_eq!(
            schema.validate(),
            Err(SchemaError::SearchableNonString("count".to_string()))
        );
    }

    #[test]
    fn test_compare_identical_ignores_order() {
        let existing = docs_schema();
        let mut desired = docs_schema();
        desired.fields.reverse();
        assert_eq!(desired.compare(&existing), SchemaChange::Identical);
    }

    #[test]
    fn test_compare_additive() {
        let existing = docs_schema();
        let mut desired = docs_schema();
        desired
            .fields
            .push(FieldDefinition::searchable("category").filterable().facetable());
        assert_eq!(
            desired.compare(&existing),
            SchemaChange::Additive {
                added: vec!["category".to_string()]
            }
        );
    }

    #[test]
    fn test_compare_removed_field() {
        let existing = docs_schema();
        let mut desired = docs_schema();
        desired.fields.pop();
        assert!(matches!(
            desired.compare(&existing),
            SchemaChange::Incompatible { field, .. } if field == "content"
        ));
    }

    #[test]
    fn test_compare_changed_attribute() {
        let existing = docs_schema();
        let mut desired = docs_schema();
        desired.fields[1].sortable = true;
        match desired.compare(&existing) {
            SchemaChange::Incompatible { field, reason } => {
                assert_eq!(field, "title");
                assert!(reason.contains("sortable"));
            }
            other => panic!("expected incompatible, got {other:?}"),
        }
    }

    #[test]
    fn test_field_type_wire_names() {
        let field = FieldDefinition::simple("created_at", FieldType::DateTimeOffset);
        let json = serde_json::to_value(&field).unwrap();
        assert_eq!(json["type"], "Edm.DateTimeOffset");
        assert_eq!(json["retrievable"], true);

        let parsed: FieldDefinition =
            serde_json::from_str(r#"{"name":"tags","type":"Collection(Edm.String)"}"#).unwrap();
        assert_eq!(parsed.field_type, FieldType::StringCollection);
        assert!(parsed.retrievable);
        assert!(!parsed.key);
    }
}
