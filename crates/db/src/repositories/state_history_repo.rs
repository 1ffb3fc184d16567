//! Repository for the `state_history` table.

use sqlx::{PgExecutor, PgPool};

use prolong_core::types::DbId;

use crate::models::history::StateHistory;

/// Column list for state_history queries.
const COLUMNS: &str = "id, request_id, item_id, actor_user_id, state, created_at";

/// Provides append/lookup operations for the manual state-change log.
pub struct StateHistoryRepo;

impl StateHistoryRepo {
    /// Append a state-change entry, returning the created row.
    pub async fn insert(
        executor: impl PgExecutor<'_>,
        request_id: DbId,
        item_id: DbId,
        actor_user_id: DbId,
        state: i16,
    ) -> Result<StateHistory, sqlx::Error> {
        let query = format!(
            "INSERT INTO state_history (request_id, item_id, actor_user_id, state)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, StateHistory>(&query)
            .bind(request_id)
            .bind(item_id)
            .bind(actor_user_id)
            .bind(state)
            .fetch_one(executor)
            .await
    }

    /// List the state changes of a request in order.
    pub async fn list_for_request(
        pool: &PgPool,
        request_id: DbId,
    ) -> Result<Vec<StateHistory>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM state_history
             WHERE request_id = $1
             ORDER BY id ASC"
        );
        sqlx::query_as::<_, StateHistory>(&query)
            .bind(request_id)
            .fetch_all(pool)
            .await
    }
}
