//! Repository for the `role_assignments` table.
//!
//! Assignments are scoped to a course, a category, or the whole site, and
//! scopes do not nest. The subscription manager queries each scope
//! separately and merges the results itself.

use sqlx::PgExecutor;

use prolong_core::roles::SCOPE_SITE;
use prolong_core::types::DbId;

/// Provides lookup operations for scoped role assignments.
pub struct RoleAssignmentRepo;

impl RoleAssignmentRepo {
    /// Distinct users holding a role at one course or category instance.
    pub async fn users_with_role(
        executor: impl PgExecutor<'_>,
        role_id: DbId,
        scope: &str,
        instance_id: DbId,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT DISTINCT user_id FROM role_assignments
             WHERE role_id = $1 AND scope = $2 AND instance_id = $3
             ORDER BY user_id ASC",
        )
        .bind(role_id)
        .bind(scope)
        .bind(instance_id)
        .fetch_all(executor)
        .await
    }

    /// Distinct users holding a role site-wide.
    pub async fn users_with_role_at_site(
        executor: impl PgExecutor<'_>,
        role_id: DbId,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT DISTINCT user_id FROM role_assignments
             WHERE role_id = $1 AND scope = $2
             ORDER BY user_id ASC",
        )
        .bind(role_id)
        .bind(SCOPE_SITE)
        .fetch_all(executor)
        .await
    }

    /// Assign a role to a user, returning the generated ID. `instance_id`
    /// must be `None` exactly when the scope is site-wide.
    pub async fn assign(
        executor: impl PgExecutor<'_>,
        user_id: DbId,
        role_id: DbId,
        scope: &str,
        instance_id: Option<DbId>,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO role_assignments (user_id, role_id, scope, instance_id) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id",
        )
        .bind(user_id)
        .bind(role_id)
        .bind(scope)
        .bind(instance_id)
        .fetch_one(executor)
        .await
    }
}
