//! Repository for the `trigger_history` table.
//!
//! Rows are append-only and unique per (rule, item); the unique index is
//! what makes firing at-most-once under concurrent passes.

use sqlx::{PgExecutor, PgPool};

use prolong_core::access::AccessLevel;
use prolong_core::types::DbId;

use crate::models::history::TriggerHistory;

/// Column list for trigger_history queries.
const COLUMNS: &str = "id, rule_id, item_id, request_id, user_id, access, created_at";

/// Provides append/lookup operations for trigger history.
pub struct TriggerHistoryRepo;

impl TriggerHistoryRepo {
    /// Whether a rule has already fired for an item.
    pub async fn exists(
        executor: impl PgExecutor<'_>,
        rule_id: DbId,
        item_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS(
                SELECT 1 FROM trigger_history WHERE rule_id = $1 AND item_id = $2
             )",
        )
        .bind(rule_id)
        .bind(item_id)
        .fetch_one(executor)
        .await
    }

    /// Record that a rule fired for an item, returning the generated ID.
    pub async fn insert(
        executor: impl PgExecutor<'_>,
        rule_id: DbId,
        item_id: DbId,
        request_id: DbId,
        user_id: DbId,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO trigger_history (rule_id, item_id, request_id, user_id, access) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id",
        )
        .bind(rule_id)
        .bind(item_id)
        .bind(request_id)
        .bind(user_id)
        .bind(AccessLevel::Default.as_i16())
        .fetch_one(executor)
        .await
    }

    /// List the history rows for an item in firing order.
    pub async fn list_for_item(
        pool: &PgPool,
        item_id: DbId,
    ) -> Result<Vec<TriggerHistory>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM trigger_history
             WHERE item_id = $1
             ORDER BY id ASC"
        );
        sqlx::query_as::<_, TriggerHistory>(&query)
            .bind(item_id)
            .fetch_all(pool)
            .await
    }

    /// Number of history rows for a (rule, item) pair.
    pub async fn count_for_rule_item(
        pool: &PgPool,
        rule_id: DbId,
        item_id: DbId,
    ) -> Result<i64, sqlx::Error> {
        let count: Option<i64> = sqlx::query_scalar(
            "SELECT COUNT(*) FROM trigger_history WHERE rule_id = $1 AND item_id = $2",
        )
        .bind(rule_id)
        .bind(item_id)
        .fetch_one(pool)
        .await?;
        Ok(count.unwrap_or(0))
    }
}
