//! Blob handles for uploaded documents.

use serde::{Deserialize, Serialize};

use super::name::ContainerName;

/// Maximum blob name length accepted by blob storage.
const MAX_BLOB_NAME_LENGTH: usize = 1024;

/// Errors that can occur when deriving a blob name.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BlobNameError {
    #[error("filename '{0}' does not contain a usable file name")]
    Empty(String),
    #[error("blob name exceeds {MAX_BLOB_NAME_LENGTH} characters")]
    TooLong,
}

/// Stable reference to an uploaded document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlobHandle {
    pub container: ContainerName,
    pub name: String,
}

impl BlobHandle {
    #[must_use]
    pub const fn new(container: ContainerName, name: String) -> Self {
        Self { container, name }
    }
}

/// Derive a blob name from a client-supplied filename.
///
/// Directory components (either separator) are dropped so a caller cannot
/// address a virtual folder other than the container root.
///
/// ```
/// use searchgate_core::blob_name_from_filename;
///
/// assert_eq!(blob_name_from_filename("report.pdf").unwrap(), "report.pdf");
/// assert_eq!(blob_name_from_filename("C:\\tmp\\report.pdf").unwrap(), "report.pdf");
/// assert!(blob_name_from_filename("../").is_err());
/// ```
///
/// # Errors
///
/// Returns [`BlobNameError`] if nothing usable remains or the name is too long.
pub fn blob_name_from_filename(filename: &str) -> Result<String, BlobNameError> {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    if base.is_empty() || base == "." || base == ".." {
        return Err(BlobNameError::Empty(filename.to_string()));
    }

    if base.chars().count() > MAX_BLOB_NAME_LENGTH {
        return Err(BlobNameError::TooLong);
    }

    Ok(base.to_string())
}
