//! Product route handlers.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;
use tracing::instrument;

use searchgate_core::ProductId;

use crate::db::{ProductRepository, RepositoryError};
use crate::error::AppError;
use crate::models::{Product, ProductInput};
use crate::state::AppState;

const NOT_FOUND: &str = "Product not found";

/// Response for a deletion.
#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub message: &'static str,
}

fn not_found(err: RepositoryError) -> AppError {
    match err {
        RepositoryError::NotFound => AppError::NotFound(NOT_FOUND.to_string()),
        other => other.into(),
    }
}

fn product_name(input: &ProductInput) -> Result<&str, AppError> {
    input
        .normalized_name()
        .ok_or_else(|| AppError::BadRequest("name must not be empty".to_string()))
}

/// List all products.
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<Product>>, AppError> {
    let products = ProductRepository::new(state.pool()).list().await?;
    Ok(Json(products))
}

/// Create a product.
#[instrument(skip(state, input))]
pub async fn create(
    State(state): State<AppState>,
    Json(input): Json<ProductInput>,
) -> Result<Json<Product>, AppError> {
    let name = product_name(&input)?;
    let product = ProductRepository::new(state.pool()).create(name).await?;
    Ok(Json(product))
}

/// Show one product.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Product>, AppError> {
    ProductRepository::new(state.pool())
        .get(ProductId::new(id))
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(NOT_FOUND.to_string()))
}

/// Rename a product.
#[instrument(skip(state, input))]
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<ProductInput>,
) -> Result<Json<Product>, AppError> {
    let name = product_name(&input)?;
    let product = ProductRepository::new(state.pool())
        .update(ProductId::new(id), name)
        .await
        .map_err(not_found)?;
    Ok(Json(product))
}

/// Delete a product.
#[instrument(skip(state))]
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<DeletedResponse>, AppError> {
    ProductRepository::new(state.pool())
        .delete(ProductId::new(id))
        .await
        .map_err(not_found)?;
    Ok(Json(DeletedResponse { message: "deleted" }))
}
