//! Composite request view: cache-aside with delete-on-write invalidation.
//!
//! Every mutator — comments, state changes, length changes, trigger
//! firings — goes through [`invalidate`]; readers call
//! [`load_request_view`], which rebuilds and stores the view on a miss.
//! The cache is never updated in place.

use serde::{Deserialize, Serialize};

use prolong_core::types::DbId;
use prolong_db::models::comment::RequestComment;
use prolong_db::models::history::StateHistory;
use prolong_db::models::request::{Request, RequestItem};
use prolong_db::repositories::{
    CommentRepo, RequestItemRepo, RequestRepo, RequestViewCacheRepo, StateHistoryRepo,
};
use prolong_db::DbPool;

use crate::error::PipelineError;

/// Everything a request screen needs, assembled once and cached by
/// request id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestView {
    pub request: Request,
    pub items: Vec<RequestItem>,
    pub comments: Vec<RequestComment>,
    pub state_history: Vec<StateHistory>,
    /// Users with any subscription on the request, derived from the
    /// insert-only subscription log.
    pub subscriber_ids: Vec<DbId>,
}

/// Drop the cached view for a request.
pub async fn invalidate(pool: &DbPool, request_id: DbId) -> Result<(), sqlx::Error> {
    let dropped = RequestViewCacheRepo::delete(pool, request_id).await?;
    if dropped {
        tracing::debug!(request_id, "Invalidated cached request view");
    }
    Ok(())
}

/// Load the composite view, rebuilding and storing it on a cache miss.
pub async fn load_request_view(
    pool: &DbPool,
    request_id: DbId,
) -> Result<RequestView, PipelineError> {
    if let Some(cached) = RequestViewCacheRepo::find(pool, request_id).await? {
        match serde_json::from_value::<RequestView>(cached.payload) {
            Ok(view) => return Ok(view),
            Err(e) => {
                // Shape drift after an upgrade; fall through to a rebuild.
                tracing::warn!(request_id, error = %e, "Discarding undecodable cached view");
            }
        }
    }

    let view = build_view(pool, request_id).await?;
    match serde_json::to_value(&view) {
        Ok(payload) => {
            RequestViewCacheRepo::upsert(pool, request_id, &payload).await?;
        }
        Err(e) => {
            tracing::warn!(request_id, error = %e, "Failed to serialize request view");
        }
    }
    Ok(view)
}

async fn build_view(pool: &DbPool, request_id: DbId) -> Result<RequestView, PipelineError> {
    let request = RequestRepo::find_by_id(pool, request_id)
        .await?
        .ok_or(PipelineError::RequestNotFound(request_id))?;
    let items = RequestItemRepo::list_for_request(pool, request_id).await?;
    let comments = CommentRepo::list_for_request(pool, request_id).await?;
    let state_history = StateHistoryRepo::list_for_request(pool, request_id).await?;
    let subscriber_ids = RequestRepo::subscriber_ids(pool, request_id).await?;

    Ok(RequestView {
        request,
        items,
        comments,
        state_history,
        subscriber_ids,
    })
}
