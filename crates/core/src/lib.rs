//! SearchGate Core - Shared types library.
//!
//! This crate provides the types shared by every SearchGate component:
//! - `server` - HTTP service driving the search pipeline, chat and products
//! - `cli` - Command-line tools for running pipeline steps by hand
//!
//! # Architecture
//!
//! The core crate contains only types and validation - no I/O, no database
//! access, no HTTP clients. Every external search resource is addressed by a
//! validated name, so the types here are the only handles the rest of the
//! workspace passes around.
//!
//! # Modules
//!
//! - [`types`] - Resource names, index schemas, data sources, indexers, blobs and ids

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
