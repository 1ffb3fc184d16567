use prolong_core::error::CoreError;
use prolong_core::state::RequestState;
use prolong_core::types::DbId;

/// Errors produced by the trigger pipeline and state service.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Request not found: {0}")]
    RequestNotFound(DbId),

    #[error("Request item not found: {0}")]
    ItemNotFound(DbId),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Illegal state transition: {from:?} -> {to:?} (approved: {approved})")]
    IllegalTransition {
        from: RequestState,
        to: RequestState,
        approved: bool,
    },

    #[error("No handler registered for activity kind '{0}'")]
    MissingHandler(String),

    #[error("Activity handler refused to {action} for item {item_id}")]
    HandlerFailure {
        action: &'static str,
        item_id: DbId,
    },

    #[error("Database error: {0}")]
    Db(#[from] sqlx::Error),
}
