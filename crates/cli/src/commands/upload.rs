//! Document upload command.

use std::path::{Path, PathBuf};

use tracing::info;

use searchgate_server::search::SearchPipeline;

use super::CommandError;

/// Upload each file into the configured container, stopping at the first failure.
///
/// # Errors
///
/// Returns an error if a file is unreadable or its upload fails.
pub async fn files(pipeline: &SearchPipeline, paths: &[PathBuf]) -> Result<(), CommandError> {
    for path in paths {
        let handle = file(pipeline, path).await?;
        info!(
            container = %handle.container,
            blob = %handle.name,
            "Uploaded {}",
            path.display()
        );
    }

    info!(count = paths.len(), "Upload complete");
    Ok(())
}

async fn file(
    pipeline: &SearchPipeline,
    path: &Path,
) -> Result<searchgate_core::BlobHandle, CommandError> {
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| CommandError::NoFileName(path.to_path_buf()))?;

    let payload = tokio::fs::read(path).await.map_err(|source| CommandError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(pipeline.upload_document(filename, payload, None).await?)
}
