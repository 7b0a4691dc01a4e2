//! Core types for SearchGate.
//!
//! This module provides type-safe wrappers for the search pipeline's resources.

pub mod blob;
pub mod datasource;
pub mod id;
pub mod indexer;
pub mod name;
pub mod schema;

pub use blob::{BlobHandle, BlobNameError, blob_name_from_filename};
pub use datasource::{
    ConnectionError, ConnectionString, DataSourceConnection, DataSourceContainer, DataSourceType,
};
pub use id::*;
pub use indexer::{IndexerDefinition, IndexerSchedule, IndexerStatus, ScheduleError};
pub use name::{ContainerName, NameError, ResourceName};
pub use schema::{FieldDefinition, FieldType, IndexSchema, SchemaChange, SchemaError};
