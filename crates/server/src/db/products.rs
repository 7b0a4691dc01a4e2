//! Product repository.

use sqlx::SqlitePool;

use searchgate_core::ProductId;

use super::RepositoryError;
use crate::models::Product;

/// Internal row type for product queries.
#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    name: String,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
        }
    }
}

/// Repository for product records.
pub struct ProductRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// List all products, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>("SELECT id, name FROM product ORDER BY id")
            .fetch_all(self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Insert a product and return it with its assigned id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, name: &str) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(
            "INSERT INTO product (name) VALUES (?) RETURNING id, name",
        )
        .bind(name)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// Get a product by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>("SELECT id, name FROM product WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(Into::into))
    }

    /// Rename a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no product has this id.
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn update(&self, id: ProductId, name: &str) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(
            "UPDATE product SET name = ? WHERE id = ? RETURNING id, name",
        )
        .bind(name)
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(Into::into).ok_or(RepositoryError::NotFound)
    }

    /// Delete a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no product has this id.
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM product WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use super::*;
    use crate::db::{create_pool, ensure_schema};

    async fn pool() -> SqlitePool {
        let pool = create_pool(&SecretString::from("sqlite::memory:"))
            .await
            .unwrap();
        ensure_schema(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let pool = pool().await;
        let repo = ProductRepository::new(&pool);

        let created = repo.create("Widget").await.unwrap();
        let fetched = repo.get(created.id).await.unwrap().unwrap();

        assert_eq!(fetched, created);
        assert_eq!(fetched.name, "Widget");
    }

    #[tokio::test]
    async fn test_list_is_ordered_by_id() {
        let pool = pool().await;
        let repo = ProductRepository::new(&pool);

        let a = repo.create("A").await.unwrap();
        let b = repo.create("B").await.unwrap();

        assert_eq!(repo.list().await.unwrap(), vec![a, b]);
    }

    #[tokio::test]
    async fn test_update() {
        let pool = pool().await;
        let repo = ProductRepository::new(&pool);
        let created = repo.create("Old").await.unwrap();

        let updated = repo.update(created.id, "New").await.unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.name, "New");
        assert_eq!(repo.get(created.id).await.unwrap().unwrap().name, "New");
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let pool = pool().await;
        let repo = ProductRepository::new(&pool);

        let result = repo.update(ProductId::new(999), "x").await;

        assert!(matches!(result, Err(RepositoryError::NotFound)));
    }

    #[tokio::test]
    async fn test_delete() {
        let pool = pool().await;
        let repo = ProductRepository::new(&pool);
        let created = repo.create("Gone").await.unwrap();

        repo.delete(created.id).await.unwrap();

        assert!(repo.get(created.id).await.unwrap().is_none());
        assert!(matches!(
            repo.delete(created.id).await,
            Err(RepositoryError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_ensure_schema_is_idempotent() {
        let pool = pool().await;
        ensure_schema(&pool).await.unwrap();
        assert!(repo_is_empty(&pool).await);
    }

    async fn repo_is_empty(pool: &SqlitePool) -> bool {
        ProductRepository::new(pool).list().await.unwrap().is_empty()
    }
}
