//! Repository for the `request_view_cache` table.

use sqlx::PgPool;

use prolong_core::types::DbId;

use crate::models::view_cache::RequestViewCache;

/// Column list for request_view_cache queries.
const COLUMNS: &str = "request_id, payload, computed_at";

/// Provides data access for the cached composite request view.
pub struct RequestViewCacheRepo;

impl RequestViewCacheRepo {
    /// Upsert a cache entry. Inserts or replaces on conflict.
    pub async fn upsert(
        pool: &PgPool,
        request_id: DbId,
        payload: &serde_json::Value,
    ) -> Result<RequestViewCache, sqlx::Error> {
        let query = format!(
            "INSERT INTO request_view_cache (request_id, payload, computed_at)
             VALUES ($1, $2, NOW())
             ON CONFLICT (request_id) DO UPDATE SET
                payload = EXCLUDED.payload,
                computed_at = NOW()
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, RequestViewCache>(&query)
            .bind(request_id)
            .bind(payload)
            .fetch_one(pool)
            .await
    }

    /// Find the cached view for a request.
    pub async fn find(
        pool: &PgPool,
        request_id: DbId,
    ) -> Result<Option<RequestViewCache>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM request_view_cache
             WHERE request_id = $1"
        );
        sqlx::query_as::<_, RequestViewCache>(&query)
            .bind(request_id)
            .fetch_optional(pool)
            .await
    }

    /// Delete the cache entry for a request. Returns `true` if a row was
    /// deleted.
    pub async fn delete(pool: &PgPool, request_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM request_view_cache WHERE request_id = $1")
            .bind(request_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
