//! Request comment models and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use prolong_core::types::{DbId, Timestamp};

/// A row from the `request_comments` table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct RequestComment {
    pub id: DbId,
    pub request_id: DbId,
    pub user_id: DbId,
    pub body: String,
    pub created_at: Timestamp,
}

/// DTO for adding a comment to a request.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateComment {
    pub request_id: DbId,
    pub user_id: DbId,
    #[validate(length(min = 1))]
    pub body: String,
}
