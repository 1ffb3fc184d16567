//! Repository for the `rules` table.

use sqlx::PgPool;

use prolong_core::types::DbId;

use crate::models::rule::{CreateRule, RuleRow, UpdateRule};

/// Column list for rules queries.
const COLUMNS: &str = "id, name, activity_kind, role_id, action, priority, parent_id, \
    length_from_due_days, length_comparator, elapsed_from_request_days, elapsed_comparator, \
    templates, created_at, updated_at";

/// Provides CRUD operations for trigger rules.
pub struct RuleRepo;

impl RuleRepo {
    /// Insert a new rule, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateRule) -> Result<RuleRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO rules
                (name, activity_kind, role_id, action, priority, parent_id,
                 length_from_due_days, length_comparator,
                 elapsed_from_request_days, elapsed_comparator, templates)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, RuleRow>(&query)
            .bind(&input.name)
            .bind(&input.activity_kind)
            .bind(input.role_id)
            .bind(input.action)
            .bind(input.priority)
            .bind(input.parent_id)
            .bind(input.length_from_due_days)
            .bind(input.length_comparator)
            .bind(input.elapsed_from_request_days)
            .bind(input.elapsed_comparator)
            .bind(&input.templates)
            .fetch_one(pool)
            .await
    }

    /// Patch a rule. Returns the updated row, or `None` if the id is gone.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateRule,
    ) -> Result<Option<RuleRow>, sqlx::Error> {
        let query = format!(
            "UPDATE rules SET
                name = COALESCE($2, name),
                role_id = COALESCE($3, role_id),
                action = COALESCE($4, action),
                priority = COALESCE($5, priority),
                length_from_due_days = COALESCE($6, length_from_due_days),
                length_comparator = COALESCE($7, length_comparator),
                elapsed_from_request_days = COALESCE($8, elapsed_from_request_days),
                elapsed_comparator = COALESCE($9, elapsed_comparator),
                templates = COALESCE($10, templates),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, RuleRow>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(input.role_id)
            .bind(input.action)
            .bind(input.priority)
            .bind(input.length_from_due_days)
            .bind(input.length_comparator)
            .bind(input.elapsed_from_request_days)
            .bind(input.elapsed_comparator)
            .bind(&input.templates)
            .fetch_optional(pool)
            .await
    }

    /// Find a rule by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<RuleRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM rules WHERE id = $1");
        sqlx::query_as::<_, RuleRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List the rules for one activity kind, in evaluation order.
    pub async fn list_for_kind(
        pool: &PgPool,
        activity_kind: &str,
    ) -> Result<Vec<RuleRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM rules
             WHERE activity_kind = $1
             ORDER BY priority ASC, id ASC"
        );
        sqlx::query_as::<_, RuleRow>(&query)
            .bind(activity_kind)
            .fetch_all(pool)
            .await
    }

    /// List every rule regardless of activity kind.
    pub async fn list_all(pool: &PgPool) -> Result<Vec<RuleRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM rules ORDER BY priority ASC, id ASC");
        sqlx::query_as::<_, RuleRow>(&query).fetch_all(pool).await
    }

    /// Delete a rule and all of its descendants.
    ///
    /// Returns the number of rules removed.
    pub async fn delete_with_descendants(pool: &PgPool, id: DbId) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "WITH RECURSIVE doomed AS (
                SELECT id FROM rules WHERE id = $1
                UNION ALL
                SELECT r.id FROM rules r JOIN doomed d ON r.parent_id = d.id
             )
             DELETE FROM rules WHERE id IN (SELECT id FROM doomed)",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
