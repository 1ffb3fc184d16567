//! Repository for the `requests` table.

use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use prolong_core::state::RequestState;
use prolong_core::types::{DbId, Timestamp};

use crate::models::request::{CreateRequest, Request, RequestItem};

/// Column list for requests queries.
const COLUMNS: &str = "id, user_id, thread_key, submitted_at, last_modified_at";

/// Column list for request_items queries (shared with `RequestItemRepo`).
pub(crate) const ITEM_COLUMNS: &str = "id, request_id, course_id, category_id, user_id, \
    activity_id, activity_kind, activity_name, state, original_due, requested_due, \
    length_secs, created_at, updated_at";

/// Provides CRUD operations for extension requests.
pub struct RequestRepo;

impl RequestRepo {
    /// Create a request with its items (and optional opening comment) in
    /// one transaction.
    ///
    /// `submitted_at` is supplied by the caller so the elapsed-time rule
    /// conditions evaluate against the real submission instant.
    pub async fn create(
        pool: &PgPool,
        input: &CreateRequest,
        submitted_at: Timestamp,
    ) -> Result<(Request, Vec<RequestItem>), sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO requests (user_id, thread_key, submitted_at)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        let request = sqlx::query_as::<_, Request>(&query)
            .bind(input.user_id)
            .bind(Uuid::now_v7())
            .bind(submitted_at)
            .fetch_one(&mut *tx)
            .await?;

        let item_query = format!(
            "INSERT INTO request_items
                (request_id, course_id, category_id, user_id, activity_id,
                 activity_kind, activity_name, state, original_due, requested_due, length_secs)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             RETURNING {ITEM_COLUMNS}"
        );
        let mut items = Vec::with_capacity(input.items.len());
        for item in &input.items {
            let length_secs = (item.requested_due - item.original_due).num_seconds();
            let created = sqlx::query_as::<_, RequestItem>(&item_query)
                .bind(request.id)
                .bind(item.course_id)
                .bind(item.category_id)
                .bind(input.user_id)
                .bind(item.activity_id)
                .bind(&item.activity_kind)
                .bind(&item.activity_name)
                .bind(RequestState::New.as_i16())
                .bind(item.original_due)
                .bind(item.requested_due)
                .bind(length_secs)
                .fetch_one(&mut *tx)
                .await?;
            items.push(created);
        }

        if let Some(comment) = input.comment.as_deref().filter(|c| !c.is_empty()) {
            sqlx::query(
                "INSERT INTO request_comments (request_id, user_id, body) VALUES ($1, $2, $3)",
            )
            .bind(request.id)
            .bind(input.user_id)
            .bind(comment)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok((request, items))
    }

    /// Find a request by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Request>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM requests WHERE id = $1");
        sqlx::query_as::<_, Request>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// IDs of requests with at least one item still awaiting a decision,
    /// oldest first. This is the sweep's work list.
    pub async fn list_open_ids(pool: &PgPool) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT DISTINCT r.id FROM requests r
             JOIN request_items i ON i.request_id = r.id
             WHERE i.state = ANY($1)
             ORDER BY r.id ASC",
        )
        .bind(
            [RequestState::New, RequestState::Reopened]
                .map(RequestState::as_i16)
                .to_vec(),
        )
        .fetch_all(pool)
        .await
    }

    /// Delete a request; items, comments, subscriptions, and history rows
    /// cascade. Returns `true` if the row existed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM requests WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Update the request's last-modified stamp.
    pub async fn touch(executor: impl PgExecutor<'_>, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE requests SET last_modified_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(())
    }

    /// Distinct users with any subscription row on the request, in id
    /// order. Subscription rows are insert-only, so a user who appears
    /// here at all is subscribed (possibly downgraded, never removed).
    pub async fn subscriber_ids(pool: &PgPool, id: DbId) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT DISTINCT user_id FROM subscriptions
             WHERE request_id = $1
             ORDER BY user_id ASC",
        )
        .bind(id)
        .fetch_all(pool)
        .await
    }
}
