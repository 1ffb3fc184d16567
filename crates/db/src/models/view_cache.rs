//! Cached composite request view model.

use serde::Serialize;
use sqlx::FromRow;

use prolong_core::types::{DbId, Timestamp};

/// A row from the `request_view_cache` table. The payload is the
/// serialized composite view; the cache is delete-on-write, so a row
/// either reflects the current request or does not exist.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RequestViewCache {
    pub request_id: DbId,
    pub payload: serde_json::Value,
    pub computed_at: Timestamp,
}
