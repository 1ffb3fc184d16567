//! Request-item state transitions.

use prolong_core::state::{self, RequestState};
use prolong_core::types::{DbId, Timestamp};
use prolong_db::models::history::StateHistory;
use prolong_db::repositories::{RequestItemRepo, RequestRepo, StateHistoryRepo};
use prolong_db::DbPool;
use prolong_events::FiredTrigger;

use crate::cache;
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::handler::HandlerRegistry;
use crate::subscriptions;
use crate::triggers::process_triggers;

/// Apply a state transition to a request item.
///
/// `approved` is the caller's authorization (force capability or
/// approval-capable subscription access; see [`actor_is_authorized`]).
/// The activity handler is consulted before anything is written and a
/// refusal aborts the whole transition. On success the item state, a
/// state-history entry, and the request's last-modified stamp land in one
/// transaction, the cached view is dropped, and the history entry is
/// returned. [`decide_item`] composes this with the follow-up trigger
/// pass.
pub async fn update_item_state(
    pool: &DbPool,
    registry: &HandlerRegistry,
    item_id: DbId,
    actor_user_id: DbId,
    new_state: RequestState,
    approved: bool,
) -> Result<StateHistory, PipelineError> {
    let item = RequestItemRepo::find_by_id(pool, item_id)
        .await?
        .ok_or(PipelineError::ItemNotFound(item_id))?;
    let current = item.request_state()?;

    if !state::state_is_possible(current, new_state, approved) {
        return Err(PipelineError::IllegalTransition {
            from: current,
            to: new_state,
            approved,
        });
    }

    let handler = registry
        .get(&item.activity_kind)
        .ok_or_else(|| PipelineError::MissingHandler(item.activity_kind.clone()))?;

    // External effect first: nothing is persisted when the host refuses.
    match new_state {
        RequestState::Approved => {
            if !handler
                .submit_extension(item.activity_id, item.user_id, item.requested_due)
                .await
            {
                return Err(PipelineError::HandlerFailure {
                    action: "submit extension",
                    item_id,
                });
            }
        }
        RequestState::Cancelled | RequestState::Denied => {
            // Only revoke when the host actually carries an extension.
            if handler.current_extension(&item).await.is_some()
                && !handler.cancel_extension(item.activity_id, item.user_id).await
            {
                return Err(PipelineError::HandlerFailure {
                    action: "cancel extension",
                    item_id,
                });
            }
        }
        RequestState::New | RequestState::Reopened => {}
    }

    let mut tx = pool.begin().await?;
    if !RequestItemRepo::update_state(&mut *tx, item_id, new_state.as_i16()).await? {
        tx.rollback().await?;
        return Err(PipelineError::ItemNotFound(item_id));
    }
    let entry = StateHistoryRepo::insert(
        &mut *tx,
        item.request_id,
        item.id,
        actor_user_id,
        new_state.as_i16(),
    )
    .await?;
    RequestRepo::touch(&mut *tx, item.request_id).await?;
    tx.commit().await?;

    cache::invalidate(pool, item.request_id).await?;

    tracing::info!(
        item_id,
        actor_user_id,
        from = current.as_str(),
        to = new_state.as_str(),
        "Request item state changed"
    );
    Ok(entry)
}

/// Decide an item and immediately re-process the request's triggers.
///
/// A decision changes what the next evaluation pass sees, so it runs
/// here instead of waiting for the sweep tick. Returns the history
/// entry together with any rules the pass fired.
#[allow(clippy::too_many_arguments)]
pub async fn decide_item(
    pool: &DbPool,
    config: &PipelineConfig,
    registry: &HandlerRegistry,
    item_id: DbId,
    actor_user_id: DbId,
    new_state: RequestState,
    approved: bool,
    now: Timestamp,
) -> Result<(StateHistory, Vec<FiredTrigger>), PipelineError> {
    let entry =
        update_item_state(pool, registry, item_id, actor_user_id, new_state, approved).await?;
    let fired = process_triggers(pool, config, entry.request_id, now).await?;
    Ok((entry, fired))
}

/// Whether an actor counts as authorized for the state table: either the
/// force flag is set (host-side capability, e.g. an administrator) or
/// their authoritative subscription on the item can approve.
pub async fn actor_is_authorized(
    pool: &DbPool,
    item_id: DbId,
    actor_user_id: DbId,
    force: bool,
) -> Result<bool, PipelineError> {
    if force {
        return Ok(true);
    }
    let mut conn = pool.acquire().await?;
    Ok(subscriptions::user_can_approve(&mut conn, item_id, actor_user_id).await?)
}
