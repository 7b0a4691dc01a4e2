//! SearchGate server library.
//!
//! Everything the `searchgate-server` binary serves lives here so the CLI and
//! the integration tests can build the same pipeline and router.
//!
//! - [`search`] - Schema, data source, indexer and blob operations
//! - [`llm`] - Chat completions against an Azure `OpenAI` deployment
//! - [`db`] - Product records on `SQLite`
//! - [`routes`] - HTTP surface

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod llm;
pub mod models;
pub mod routes;
pub mod search;
pub mod state;
