//! Index schema management.

use tracing::{debug, info, instrument};

use searchgate_core::{FieldDefinition, FieldType, IndexSchema, ResourceName, SchemaChange};

use super::error::SearchError;
use super::services::SearchIndexService;

/// The document index layout used when no schema is supplied.
///
/// `id` is the key; `title`, `content` and `category` are full-text fields;
/// `created_at` supports date filtering and ordering.
#[must_use]
pub fn default_schema(name: ResourceName) -> IndexSchema {
    IndexSchema::new(
        name,
        vec![
            FieldDefinition::simple("id", FieldType::String)
                .key()
                .filterable()
                .sortable(),
            FieldDefinition::searchable("title").filterable().sortable(),
            FieldDefinition::searchable("content"),
            FieldDefinition::searchable("category")
                .filterable()
                .facetable(),
            FieldDefinition::simple("created_at", FieldType::DateTimeOffset)
                .filterable()
                .sortable(),
        ],
    )
}

/// Creates or updates index definitions.
pub struct SchemaManager<'a> {
    indexes: &'a dyn SearchIndexService,
}

impl<'a> SchemaManager<'a> {
    pub const fn new(indexes: &'a dyn SearchIndexService) -> Self {
        Self { indexes }
    }

    /// Ensure an index exists with exactly this schema.
    ///
    /// Validates locally, then compares against the deployed definition.
    /// Identical schemas are a no-op, additive ones are pushed, and anything
    /// that removes or alters a field is refused.
    ///
    /// # Errors
    ///
    /// - [`SearchError::InvalidSchema`] if the schema breaks a structural rule
    /// - [`SearchError::SchemaConflict`] if the change cannot be applied in place
    /// - [`SearchError::Upstream`] if the search service fails
    #[instrument(skip(self, schema), fields(index = %schema.name))]
    pub async fn upsert_index(&self, schema: &IndexSchema) -> Result<ResourceName, SearchError> {
        schema
            .validate()
            .map_err(|e| SearchError::invalid_schema(e.to_string()))?;

        if let Some(existing) = self.indexes.get_index(&schema.name).await? {
            match schema.compare(&existing) {
                SchemaChange::Identical => {
                    debug!("Index schema unchanged");
                    return Ok(schema.name.clone());
                }
                SchemaChange::Additive { added } => {
                    info!(added = ?added, "Adding fields to index");
                }
                SchemaChange::Incompatible { field, reason } => {
                    return Err(SearchError::schema_conflict(format!(
                        "field '{field}' of index '{}': {reason}; the index must be recreated",
                        schema.name
                    )));
                }
            }
        }

        let name = self.indexes.upsert_index(schema).await?;
        info!("Index schema applied");
        Ok(name)
    }
}
