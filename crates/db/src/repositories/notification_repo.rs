//! Repository for the `notifications` table.

use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use prolong_core::types::DbId;

use crate::models::notification::Notification;

/// Column list for `notifications` queries.
const COLUMNS: &str =
    "id, request_id, user_id, subject, body, thread_key, is_delivered, delivered_at, created_at";

/// Provides CRUD operations for notifications.
pub struct NotificationRepo;

impl NotificationRepo {
    /// Record an outgoing message for a user, returning the generated ID.
    pub async fn insert(
        executor: impl PgExecutor<'_>,
        request_id: DbId,
        user_id: DbId,
        subject: &str,
        body: &str,
        thread_key: Uuid,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO notifications (request_id, user_id, subject, body, thread_key) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id",
        )
        .bind(request_id)
        .bind(user_id)
        .bind(subject)
        .bind(body)
        .bind(thread_key)
        .fetch_one(executor)
        .await
    }

    /// Mark a notification as delivered externally.
    pub async fn mark_delivered(
        executor: impl PgExecutor<'_>,
        id: DbId,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE notifications \
             SET is_delivered = true, delivered_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .execute(executor)
        .await?;
        Ok(())
    }

    /// List the notifications sent about a request, oldest first.
    pub async fn list_for_request(
        pool: &PgPool,
        request_id: DbId,
    ) -> Result<Vec<Notification>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM notifications
             WHERE request_id = $1
             ORDER BY id ASC"
        );
        sqlx::query_as::<_, Notification>(&query)
            .bind(request_id)
            .fetch_all(pool)
            .await
    }

    /// List a user's notifications, newest first.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Notification>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM notifications
             WHERE user_id = $1
             ORDER BY created_at DESC
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, Notification>(&query)
            .bind(user_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }
}
