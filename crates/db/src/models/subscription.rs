//! Subscription models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use prolong_core::access::AccessLevel;
use prolong_core::types::{DbId, Timestamp};

/// A row from the `subscriptions` table.
///
/// Rows are insert-only. A user may accumulate several rows per item; the
/// row with the greatest `id` is authoritative. Concurrent writers may
/// produce duplicates and that is tolerated, never repaired.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Subscription {
    pub id: DbId,
    pub user_id: DbId,
    pub item_id: DbId,
    pub request_id: DbId,
    /// Rule whose firing (or downgrade pass) produced this row.
    pub rule_id: DbId,
    pub access: i16,
    pub created_at: Timestamp,
}

impl Subscription {
    /// Decode the stored access column.
    pub fn access_level(&self) -> Option<AccessLevel> {
        AccessLevel::from_i16(self.access)
    }
}
