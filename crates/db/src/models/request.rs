//! Extension request and request item models and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use prolong_core::error::CoreError;
use prolong_core::state::RequestState;
use prolong_core::types::{DbId, Timestamp};

/// A row from the `requests` table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Request {
    pub id: DbId,
    /// Owner of the request (the student asking for extensions).
    pub user_id: DbId,
    /// Stable key used to thread every notification about this request.
    pub thread_key: Uuid,
    pub submitted_at: Timestamp,
    pub last_modified_at: Timestamp,
}

/// A row from the `request_items` table: one course activity within a
/// request. At most one item exists per (activity, owner).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct RequestItem {
    pub id: DbId,
    pub request_id: DbId,
    pub course_id: DbId,
    pub category_id: DbId,
    pub user_id: DbId,
    pub activity_id: DbId,
    pub activity_kind: String,
    pub activity_name: String,
    pub state: i16,
    pub original_due: Timestamp,
    pub requested_due: Timestamp,
    /// Requested due minus original due, in seconds. Signed: a request may
    /// ask to move a deadline earlier.
    pub length_secs: i64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl RequestItem {
    /// Decode the stored state column.
    pub fn request_state(&self) -> Result<RequestState, CoreError> {
        RequestState::from_i16(self.state).ok_or_else(|| {
            CoreError::Configuration(format!(
                "request item {}: unknown state {}",
                self.id, self.state
            ))
        })
    }
}

/// DTO for one activity inside a new request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRequestItem {
    pub course_id: DbId,
    pub category_id: DbId,
    pub activity_id: DbId,
    pub activity_kind: String,
    pub activity_name: String,
    pub original_due: Timestamp,
    pub requested_due: Timestamp,
}

/// DTO for creating a request together with its items.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateRequest {
    pub user_id: DbId,
    #[validate(length(min = 1))]
    pub items: Vec<CreateRequestItem>,
    /// Optional message attached as the first comment.
    pub comment: Option<String>,
}
