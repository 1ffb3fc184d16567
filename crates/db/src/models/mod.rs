//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A `Deserialize` create DTO for inserts
//!
//! Entity structs that appear in the cached composite request view also
//! derive `Deserialize` so the view round-trips through JSONB.

pub mod comment;
pub mod history;
pub mod notification;
pub mod request;
pub mod role;
pub mod rule;
pub mod subscription;
pub mod view_cache;
