//! Repository for the `request_comments` table.

use sqlx::{PgExecutor, PgPool};

use prolong_core::types::DbId;

use crate::models::comment::{CreateComment, RequestComment};

/// Column list for request_comments queries.
const COLUMNS: &str = "id, request_id, user_id, body, created_at";

/// Provides CRUD operations for request comments.
pub struct CommentRepo;

impl CommentRepo {
    /// Insert a comment, returning the created row.
    pub async fn insert(
        executor: impl PgExecutor<'_>,
        input: &CreateComment,
    ) -> Result<RequestComment, sqlx::Error> {
        let query = format!(
            "INSERT INTO request_comments (request_id, user_id, body)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, RequestComment>(&query)
            .bind(input.request_id)
            .bind(input.user_id)
            .bind(&input.body)
            .fetch_one(executor)
            .await
    }

    /// List a request's comments in posting order.
    pub async fn list_for_request(
        pool: &PgPool,
        request_id: DbId,
    ) -> Result<Vec<RequestComment>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM request_comments
             WHERE request_id = $1
             ORDER BY id ASC"
        );
        sqlx::query_as::<_, RequestComment>(&query)
            .bind(request_id)
            .fetch_all(pool)
            .await
    }
}
