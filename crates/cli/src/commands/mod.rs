//! Subcommand implementations.
//!
//! # Environment Variables
//!
//! Read through `ServerConfig::from_env`; see the server crate for the
//! full list. The product database is not touched.

pub mod pipeline;
pub mod upload;

use std::path::PathBuf;

use thiserror::Error;

use searchgate_server::config::{ConfigError, ServerConfig};
use searchgate_server::search::{SearchError, SearchPipeline, build_pipeline};

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Environment could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A pipeline step failed.
    #[error(transparent)]
    Search(#[from] SearchError),

    /// A local file could not be read.
    #[error("Cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A schema file is not a valid index definition.
    #[error("Invalid schema file {path}: {source}")]
    Schema {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// A path has no usable file name.
    #[error("No file name in {0}")]
    NoFileName(PathBuf),
}

/// Load configuration and build the pipeline the server would use.
///
/// # Errors
///
/// Returns an error if the environment is invalid or credentials unusable.
pub fn load_pipeline() -> Result<SearchPipeline, CommandError> {
    let config = ServerConfig::from_env()?;
    Ok(build_pipeline(&config)?)
}
