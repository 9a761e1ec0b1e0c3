//! PostgreSQL saved-cart store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;

use boleteria_core::error::{AppError, ErrorKind};
use boleteria_core::result::AppResult;
use boleteria_core::types::{FunctionId, SavedCartId, SessionId};
use boleteria_entity::cart::{CartItem, CartProduct, CreateSavedCart, SavedCart};

use crate::saved_carts::SavedCartStore;

/// Row mapping with the JSONB collections wrapped for decoding.
#[derive(Debug, sqlx::FromRow)]
struct SavedCartRow {
    id: SavedCartId,
    session_id: SessionId,
    name: String,
    items: Json<Vec<CartItem>>,
    products: Json<Vec<CartProduct>>,
    total: f64,
    #[sqlx(rename = "funcion_id")]
    function_id: Option<FunctionId>,
    created_at: DateTime<Utc>,
}

impl From<SavedCartRow> for SavedCart {
    fn from(row: SavedCartRow) -> Self {
        Self {
            id: row.id,
            session_id: row.session_id,
            name: row.name,
            items: row.items.0,
            products: row.products.0,
            total: row.total,
            function_id: row.function_id,
            created_at: row.created_at,
        }
    }
}

/// PostgreSQL-backed saved-cart store.
#[derive(Debug, Clone)]
pub struct PgSavedCartStore {
    pool: PgPool,
}

impl PgSavedCartStore {
    /// Create a saved-cart store over an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SavedCartStore for PgSavedCartStore {
    async fn create(&self, data: CreateSavedCart) -> AppResult<SavedCart> {
        let saved = data.into_saved(Utc::now());
        let row = sqlx::query_as::<_, SavedCartRow>(
            "INSERT INTO saved_carts \
             (id, session_id, name, items, products, total, funcion_id, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING *",
        )
        .bind(saved.id)
        .bind(saved.session_id.as_str())
        .bind(&saved.name)
        .bind(Json(&saved.items))
        .bind(Json(&saved.products))
        .bind(saved.total)
        .bind(saved.function_id)
        .bind(saved.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create saved cart", e))?;

        Ok(row.into())
    }

    async fn find(&self, id: SavedCartId, session_id: &SessionId) -> AppResult<Option<SavedCart>> {
        let row = sqlx::query_as::<_, SavedCartRow>(
            "SELECT * FROM saved_carts WHERE id = $1 AND session_id = $2",
        )
        .bind(id)
        .bind(session_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find saved cart", e))?;

        Ok(row.map(Into::into))
    }

    async fn list(&self, session_id: &SessionId) -> AppResult<Vec<SavedCart>> {
        let rows = sqlx::query_as::<_, SavedCartRow>(
            "SELECT * FROM saved_carts WHERE session_id = $1 ORDER BY created_at DESC",
        )
        .bind(session_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list saved carts", e))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn delete(&self, id: SavedCartId, session_id: &SessionId) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM saved_carts WHERE id = $1 AND session_id = $2")
            .bind(id)
            .bind(session_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to delete saved cart", e)
            })?;

        Ok(result.rows_affected() > 0)
    }
}
