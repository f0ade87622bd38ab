use std::collections::BTreeMap;

use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::RwLock;
use tracing::debug;

use crate::products::repo_types::{NewProduct, Product};

const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("product {0} not found")]
    NotFound(i32),
    #[error("product {0} already exists")]
    Duplicate(i32),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Persistence seam for products. Handlers only ever see this trait.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Every product with `estado = true`, ordered by id.
    async fn find_active(&self) -> Result<Vec<Product>, RepoError>;

    async fn find_by_id(&self, id: i32) -> Result<Option<Product>, RepoError>;

    /// Like `find_by_id`, but absence is `RepoError::NotFound`.
    async fn get_by_id(&self, id: i32) -> Result<Product, RepoError> {
        self.find_by_id(id).await?.ok_or(RepoError::NotFound(id))
    }

    /// Fails with `RepoError::Duplicate` when the key is taken.
    async fn insert(&self, product: NewProduct) -> Result<Product, RepoError>;

    /// Overwrites the stored row with the same id.
    async fn save(&self, product: Product) -> Result<Product, RepoError>;

    /// No-op when the id is absent.
    async fn delete(&self, id: i32) -> Result<(), RepoError>;
}

#[derive(Clone)]
pub struct PgProductRepository {
    db: PgPool,
}

impl PgProductRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProductRepository for PgProductRepository {
    async fn find_active(&self) -> Result<Vec<Product>, RepoError> {
        let rows = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, nombre, precio, stock, categoria, estado
            FROM productos
            WHERE estado = TRUE
            ORDER BY id
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<Product>, RepoError> {
        let row = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, nombre, precio, stock, categoria, estado
            FROM productos
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn insert(&self, product: NewProduct) -> Result<Product, RepoError> {
        let id = product.id;
        sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO productos (id, nombre, precio, stock, categoria, estado)
            VALUES ($1, $2, $3, $4, $5, TRUE)
            RETURNING id, nombre, precio, stock, categoria, estado
            "#,
        )
        .bind(product.id)
        .bind(product.name)
        .bind(product.price)
        .bind(product.stock)
        .bind(product.category)
        .fetch_one(&self.db)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                debug!(id, "insert hit primary key conflict");
                RepoError::Duplicate(id)
            } else {
                RepoError::Database(e)
            }
        })
    }

    async fn save(&self, product: Product) -> Result<Product, RepoError> {
        let id = product.id;
        sqlx::query_as::<_, Product>(
            r#"
            UPDATE productos
            SET nombre = $2, precio = $3, stock = $4, categoria = $5, estado = $6
            WHERE id = $1
            RETURNING id, nombre, precio, stock, categoria, estado
            "#,
        )
        .bind(product.id)
        .bind(product.name)
        .bind(product.price)
        .bind(product.stock)
        .bind(product.category)
        .bind(product.active)
        .fetch_optional(&self.db)
        .await?
        .ok_or(RepoError::NotFound(id))
    }

    async fn delete(&self, id: i32) -> Result<(), RepoError> {
        sqlx::query("DELETE FROM productos WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(())
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some(UNIQUE_VIOLATION),
        _ => false,
    }
}

/// In-process store keyed by id. Used by tests and `PRODUCT_STORE=memory`.
#[derive(Default)]
pub struct MemoryProductRepository {
    rows: RwLock<BTreeMap<i32, Product>>,
}

impl MemoryProductRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        let rows = products.into_iter().map(|p| (p.id, p)).collect();
        Self {
            rows: RwLock::new(rows),
        }
    }
}

#[async_trait]
impl ProductRepository for MemoryProductRepository {
    async fn find_active(&self) -> Result<Vec<Product>, RepoError> {
        let rows = self.rows.read().await;
        Ok(rows.values().filter(|p| p.active).cloned().collect())
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<Product>, RepoError> {
        Ok(self.rows.read().await.get(&id).cloned())
    }

    async fn insert(&self, product: NewProduct) -> Result<Product, RepoError> {
        let mut rows = self.rows.write().await;
        if rows.contains_key(&product.id) {
            return Err(RepoError::Duplicate(product.id));
        }
        let product = Product::from(product);
        rows.insert(product.id, product.clone());
        Ok(product)
    }

    async fn save(&self, product: Product) -> Result<Product, RepoError> {
        let mut rows = self.rows.write().await;
        match rows.get_mut(&product.id) {
            Some(slot) => {
                *slot = product.clone();
                Ok(product)
            }
            None => Err(RepoError::NotFound(product.id)),
        }
    }

    async fn delete(&self, id: i32) -> Result<(), RepoError> {
        self.rows.write().await.remove(&id);
        Ok(())
    }
}
