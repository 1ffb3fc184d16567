//! Trigger and state history models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use prolong_core::types::{DbId, Timestamp};

/// A row from the `trigger_history` table: an append-only marker that a
/// rule has fired for an item. Never updated, only inserted; its presence
/// is what keeps a rule from firing twice.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TriggerHistory {
    pub id: DbId,
    pub rule_id: DbId,
    pub item_id: DbId,
    pub request_id: DbId,
    /// Owner of the item at firing time.
    pub user_id: DbId,
    pub access: i16,
    pub created_at: Timestamp,
}

/// A row from the `state_history` table: the manual state-change log,
/// distinct from trigger history.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct StateHistory {
    pub id: DbId,
    pub request_id: DbId,
    pub item_id: DbId,
    pub actor_user_id: DbId,
    pub state: i16,
    pub created_at: Timestamp,
}
