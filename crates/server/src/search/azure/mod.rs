//! REST clients for the hosted search and blob services.

mod blob;
mod search;
mod shared_key;
mod types;

pub use blob::AzureBlobClient;
pub use search::AzureSearchClient;
