//! Repository for the `request_items` table.

use sqlx::{PgExecutor, PgPool};

use prolong_core::types::{DbId, Timestamp};

use crate::models::request::RequestItem;
use crate::repositories::request_repo::ITEM_COLUMNS;

/// Provides CRUD operations for request items.
pub struct RequestItemRepo;

impl RequestItemRepo {
    /// Find an item by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<RequestItem>, sqlx::Error> {
        let query = format!("SELECT {ITEM_COLUMNS} FROM request_items WHERE id = $1");
        sqlx::query_as::<_, RequestItem>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find the item for an activity and owner, if any. At most one row
    /// exists per (activity, owner).
    pub async fn find_by_activity_and_user(
        pool: &PgPool,
        activity_id: DbId,
        user_id: DbId,
    ) -> Result<Option<RequestItem>, sqlx::Error> {
        let query = format!(
            "SELECT {ITEM_COLUMNS} FROM request_items
             WHERE activity_id = $1 AND user_id = $2"
        );
        sqlx::query_as::<_, RequestItem>(&query)
            .bind(activity_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// List the items of a request in creation order.
    pub async fn list_for_request(
        pool: &PgPool,
        request_id: DbId,
    ) -> Result<Vec<RequestItem>, sqlx::Error> {
        let query = format!(
            "SELECT {ITEM_COLUMNS} FROM request_items
             WHERE request_id = $1
             ORDER BY id ASC"
        );
        sqlx::query_as::<_, RequestItem>(&query)
            .bind(request_id)
            .fetch_all(pool)
            .await
    }

    /// Set an item's state. Returns `true` if the row existed.
    pub async fn update_state(
        executor: impl PgExecutor<'_>,
        id: DbId,
        state: i16,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE request_items SET state = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(state)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Move an item's requested due date, recomputing the stored length.
    /// Returns the updated row, or `None` if the id is gone.
    pub async fn update_requested_due(
        executor: impl PgExecutor<'_>,
        id: DbId,
        requested_due: Timestamp,
    ) -> Result<Option<RequestItem>, sqlx::Error> {
        let query = format!(
            "UPDATE request_items SET
                requested_due = $2,
                length_secs = EXTRACT(EPOCH FROM ($2 - original_due))::BIGINT,
                updated_at = NOW()
             WHERE id = $1
             RETURNING {ITEM_COLUMNS}"
        );
        sqlx::query_as::<_, RequestItem>(&query)
            .bind(id)
            .bind(requested_due)
            .fetch_optional(executor)
            .await
    }
}
