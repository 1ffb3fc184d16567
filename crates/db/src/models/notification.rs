//! Notification entity models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use prolong_core::types::{DbId, Timestamp};

/// A row from the `notifications` table: one rendered message for one
/// recipient, kept as delivery history. `thread_key` repeats the owning
/// request's key so every message about a request threads together.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Notification {
    pub id: DbId,
    pub request_id: DbId,
    pub user_id: DbId,
    pub subject: String,
    pub body: String,
    pub thread_key: Uuid,
    pub is_delivered: bool,
    pub delivered_at: Option<Timestamp>,
    pub created_at: Timestamp,
}
