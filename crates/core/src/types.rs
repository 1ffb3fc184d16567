//! Shared primitive type aliases.

use chrono::{DateTime, Utc};

/// Database row identifier (BIGSERIAL).
pub type DbId = i64;

/// UTC timestamp as stored in TIMESTAMPTZ columns.
pub type Timestamp = DateTime<Utc>;
