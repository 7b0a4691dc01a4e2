//! Domain models.

pub mod product;

pub use product::{Product, ProductInput};
