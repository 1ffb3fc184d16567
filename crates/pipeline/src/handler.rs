//! Activity-kind handler seam.
//!
//! Each graded activity kind (assignment, quiz, ...) integrates with the
//! host platform through an [`ActivityHandler`]. Applying or revoking the
//! actual deadline extension happens on the host side of this trait;
//! everything else lives in this workspace.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use prolong_core::types::{DbId, Timestamp};
use prolong_db::models::request::RequestItem;

/// Host-platform integration for one activity kind.
#[async_trait]
pub trait ActivityHandler: Send + Sync {
    /// Activity kind key this handler serves, e.g. `"assignment"`.
    fn kind(&self) -> &str;

    /// Whether the activity behind this item currently accepts extension
    /// requests (has a due date, is not closed, etc.).
    async fn is_candidate(&self, item: &RequestItem) -> bool;

    /// Apply an extension on the host activity. Returns `false` when the
    /// host refuses.
    async fn submit_extension(&self, activity_id: DbId, user_id: DbId, new_due: Timestamp)
        -> bool;

    /// Revoke a previously applied extension. Returns `false` when the
    /// host refuses.
    async fn cancel_extension(&self, activity_id: DbId, user_id: DbId) -> bool;

    /// The extension currently applied on the host activity, if any.
    async fn current_extension(&self, item: &RequestItem) -> Option<Timestamp>;
}

/// Maps activity kinds to their handlers.
#[derive(Default, Clone)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn ActivityHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under its own kind key. A later registration
    /// for the same kind replaces the earlier one.
    pub fn register(&mut self, handler: Arc<dyn ActivityHandler>) {
        self.handlers.insert(handler.kind().to_string(), handler);
    }

    pub fn get(&self, kind: &str) -> Option<Arc<dyn ActivityHandler>> {
        self.handlers.get(kind).cloned()
    }

    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }
}
