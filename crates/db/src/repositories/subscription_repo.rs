//! Repository for the `subscriptions` table.
//!
//! Subscriptions are insert-only: access changes append a new row rather
//! than updating in place, and the row with the greatest `id` per
//! (user, item) wins. Duplicate rows from concurrent writers are
//! harmless under that convention.

use sqlx::PgExecutor;

use prolong_core::types::DbId;

use crate::models::subscription::Subscription;

/// Column list for subscriptions queries.
const COLUMNS: &str = "id, user_id, item_id, request_id, rule_id, access, created_at";

/// Provides access operations for subscriptions.
pub struct SubscriptionRepo;

impl SubscriptionRepo {
    /// Append a subscription row, returning the generated ID.
    pub async fn insert(
        executor: impl PgExecutor<'_>,
        user_id: DbId,
        item_id: DbId,
        request_id: DbId,
        rule_id: DbId,
        access: i16,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO subscriptions (user_id, item_id, request_id, rule_id, access) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id",
        )
        .bind(user_id)
        .bind(item_id)
        .bind(request_id)
        .bind(rule_id)
        .bind(access)
        .fetch_one(executor)
        .await
    }

    /// The authoritative (last-inserted) row for a user on an item.
    pub async fn latest_for_item_user(
        executor: impl PgExecutor<'_>,
        item_id: DbId,
        user_id: DbId,
    ) -> Result<Option<Subscription>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM subscriptions
             WHERE item_id = $1 AND user_id = $2
             ORDER BY id DESC
             LIMIT 1"
        );
        sqlx::query_as::<_, Subscription>(&query)
            .bind(item_id)
            .bind(user_id)
            .fetch_optional(executor)
            .await
    }

    /// Users whose authoritative row on an item was written by the given
    /// rule. One row per user (their latest), in user order.
    pub async fn latest_tagged_with_rule(
        executor: impl PgExecutor<'_>,
        item_id: DbId,
        rule_id: DbId,
    ) -> Result<Vec<Subscription>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM subscriptions s
             WHERE s.item_id = $1
               AND s.rule_id = $2
               AND s.id = (
                   SELECT MAX(s2.id) FROM subscriptions s2
                   WHERE s2.item_id = s.item_id AND s2.user_id = s.user_id
               )
             ORDER BY s.user_id ASC"
        );
        sqlx::query_as::<_, Subscription>(&query)
            .bind(item_id)
            .bind(rule_id)
            .fetch_all(executor)
            .await
    }

    /// Every row for an item in insertion order. Exposed for the
    /// composite view and tests.
    pub async fn list_for_item(
        executor: impl PgExecutor<'_>,
        item_id: DbId,
    ) -> Result<Vec<Subscription>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM subscriptions
             WHERE item_id = $1
             ORDER BY id ASC"
        );
        sqlx::query_as::<_, Subscription>(&query)
            .bind(item_id)
            .fetch_all(executor)
            .await
    }
}
