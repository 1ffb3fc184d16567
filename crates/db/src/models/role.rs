//! Role and role-assignment models.
//!
//! User ids are owned by the host platform; this schema only records which
//! opaque user id holds which role at which scope.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use prolong_core::types::{DbId, Timestamp};

/// A row from the `roles` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Role {
    pub id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `role_assignments` table.
///
/// `scope` is one of the constants in `prolong_core::roles`; `instance_id`
/// is the course or category id, or `NULL` for site scope.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub id: DbId,
    pub user_id: DbId,
    pub role_id: DbId,
    pub scope: String,
    pub instance_id: Option<DbId>,
    pub created_at: Timestamp,
}
