//! Index, data source, indexer and run commands.

use std::path::Path;

use tracing::info;

use searchgate_core::IndexSchema;
use searchgate_server::search::SearchPipeline;

use super::CommandError;

/// Read an index schema from a JSON file.
async fn read_schema(path: &Path) -> Result<IndexSchema, CommandError> {
    let content = tokio::fs::read(path).await.map_err(|source| CommandError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_slice(&content).map_err(|source| CommandError::Schema {
        path: path.to_path_buf(),
        source,
    })
}

async fn optional_schema(path: Option<&Path>) -> Result<Option<IndexSchema>, CommandError> {
    match path {
        Some(path) => Ok(Some(read_schema(path).await?)),
        None => Ok(None),
    }
}

/// Create the index and data source, then the indexer.
///
/// # Errors
///
/// Returns the first failing step's error.
pub async fn provision(
    pipeline: &SearchPipeline,
    schema: Option<&Path>,
) -> Result<(), CommandError> {
    let schema = optional_schema(schema).await?;
    let report = pipeline.provision(schema).await?;

    info!(
        index = %report.index,
        data_source = %report.data_source,
        indexer = %report.indexer,
        "Pipeline provisioned"
    );
    Ok(())
}

/// Create or update the index.
///
/// # Errors
///
/// Returns an error if the schema file is unreadable or the upsert fails.
pub async fn index(pipeline: &SearchPipeline, schema: Option<&Path>) -> Result<(), CommandError> {
    let schema = optional_schema(schema).await?;
    let name = pipeline.upsert_index(schema).await?;

    info!(index = %name, "Index created");
    Ok(())
}

/// Register the configured data source.
///
/// # Errors
///
/// Returns an error if the registration fails.
pub async fn data_source(pipeline: &SearchPipeline) -> Result<(), CommandError> {
    let name = pipeline.upsert_data_source().await?;

    info!(data_source = %name, "Data source registered");
    Ok(())
}

/// Register the data source, then define the indexer.
///
/// # Errors
///
/// Returns an error if either step fails.
pub async fn indexer(pipeline: &SearchPipeline) -> Result<(), CommandError> {
    let name = pipeline.register_indexer().await?;

    info!(indexer = %name, "Indexer created");
    Ok(())
}

/// Trigger an indexer run. Does not wait for completion.
///
/// # Errors
///
/// Returns an error if the run cannot be started.
pub async fn run(pipeline: &SearchPipeline) -> Result<(), CommandError> {
    let name = pipeline.run_indexer().await?;

    info!(indexer = %name, "Indexer started");
    Ok(())
}
