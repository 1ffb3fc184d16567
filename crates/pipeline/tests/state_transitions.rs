//! State-service tests: role-gated transitions, the handler seam, and
//! failure atomicity.

mod common;

use std::sync::atomic::Ordering;

use assert_matches::assert_matches;
use sqlx::PgPool;

use common::*;
use prolong_core::access::AccessLevel;
use prolong_core::state::RequestState;
use prolong_db::repositories::{RequestItemRepo, StateHistoryRepo, SubscriptionRepo};
use prolong_pipeline::state::{actor_is_authorized, decide_item, update_item_state};
use prolong_pipeline::{PipelineConfig, PipelineError};

async fn current_state(pool: &PgPool, item_id: i64) -> RequestState {
    RequestItemRepo::find_by_id(pool, item_id)
        .await
        .unwrap()
        .expect("item exists")
        .request_state()
        .unwrap()
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn authorized_approval_submits_extension_and_logs(pool: PgPool) {
    let handler = RecordingHandler::new("assignment");
    let registry = registry_with(handler.clone());
    let (request, item) = create_request_with_item(&pool, 2).await;

    let entry = update_item_state(
        &pool,
        &registry,
        item.id,
        TEACHER_ID,
        RequestState::Approved,
        true,
    )
    .await
    .unwrap();

    assert_eq!(entry.state, RequestState::Approved.as_i16());
    assert_eq!(entry.actor_user_id, TEACHER_ID);
    assert_eq!(current_state(&pool, item.id).await, RequestState::Approved);
    assert_eq!(handler.submit_calls.load(Ordering::SeqCst), 1);

    let history = StateHistoryRepo::list_for_request(&pool, request.id).await.unwrap();
    assert_eq!(history.len(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unauthorized_caller_cannot_approve(pool: PgPool) {
    let handler = RecordingHandler::new("assignment");
    let registry = registry_with(handler.clone());
    let (_, item) = create_request_with_item(&pool, 2).await;

    let err = update_item_state(
        &pool,
        &registry,
        item.id,
        STUDENT_ID,
        RequestState::Approved,
        false,
    )
    .await
    .unwrap_err();

    assert_matches!(
        err,
        PipelineError::IllegalTransition {
            from: RequestState::New,
            to: RequestState::Approved,
            approved: false,
        }
    );
    assert_eq!(current_state(&pool, item.id).await, RequestState::New);
    assert_eq!(handler.submit_calls.load(Ordering::SeqCst), 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn owner_may_cancel_without_authorization(pool: PgPool) {
    let handler = RecordingHandler::new("assignment");
    let registry = registry_with(handler.clone());
    let (_, item) = create_request_with_item(&pool, 2).await;

    update_item_state(
        &pool,
        &registry,
        item.id,
        STUDENT_ID,
        RequestState::Cancelled,
        false,
    )
    .await
    .unwrap();

    assert_eq!(current_state(&pool, item.id).await, RequestState::Cancelled);
    // No extension exists on the host, so nothing was revoked.
    assert_eq!(handler.cancel_calls.load(Ordering::SeqCst), 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn handler_refusal_aborts_the_whole_transition(pool: PgPool) {
    let handler = RecordingHandler::new("assignment");
    handler.accept_submit.store(false, Ordering::SeqCst);
    let registry = registry_with(handler.clone());
    let (request, item) = create_request_with_item(&pool, 2).await;

    let err = update_item_state(
        &pool,
        &registry,
        item.id,
        TEACHER_ID,
        RequestState::Approved,
        true,
    )
    .await
    .unwrap_err();

    assert_matches!(err, PipelineError::HandlerFailure { action: "submit extension", .. });
    assert_eq!(current_state(&pool, item.id).await, RequestState::New);
    assert!(StateHistoryRepo::list_for_request(&pool, request.id)
        .await
        .unwrap()
        .is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn cancelling_an_applied_extension_revokes_it(pool: PgPool) {
    let handler = RecordingHandler::new("assignment");
    let registry = registry_with(handler.clone());
    let (_, item) = create_request_with_item(&pool, 2).await;

    update_item_state(&pool, &registry, item.id, TEACHER_ID, RequestState::Approved, true)
        .await
        .unwrap();
    handler.has_extension.store(true, Ordering::SeqCst);

    update_item_state(&pool, &registry, item.id, TEACHER_ID, RequestState::Cancelled, true)
        .await
        .unwrap();

    assert_eq!(current_state(&pool, item.id).await, RequestState::Cancelled);
    assert_eq!(handler.cancel_calls.load(Ordering::SeqCst), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn revocation_refusal_keeps_the_item_approved(pool: PgPool) {
    let handler = RecordingHandler::new("assignment");
    let registry = registry_with(handler.clone());
    let (_, item) = create_request_with_item(&pool, 2).await;

    update_item_state(&pool, &registry, item.id, TEACHER_ID, RequestState::Approved, true)
        .await
        .unwrap();
    handler.has_extension.store(true, Ordering::SeqCst);
    handler.accept_cancel.store(false, Ordering::SeqCst);

    let err = update_item_state(
        &pool,
        &registry,
        item.id,
        TEACHER_ID,
        RequestState::Denied,
        true,
    )
    .await
    .unwrap_err();

    assert_matches!(err, PipelineError::HandlerFailure { action: "cancel extension", .. });
    assert_eq!(current_state(&pool, item.id).await, RequestState::Approved);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn denied_items_can_be_reopened_by_an_approver(pool: PgPool) {
    let handler = RecordingHandler::new("assignment");
    let registry = registry_with(handler.clone());
    let (_, item) = create_request_with_item(&pool, 2).await;

    update_item_state(&pool, &registry, item.id, TEACHER_ID, RequestState::Denied, true)
        .await
        .unwrap();
    update_item_state(&pool, &registry, item.id, TEACHER_ID, RequestState::Reopened, true)
        .await
        .unwrap();

    let state = current_state(&pool, item.id).await;
    assert_eq!(state, RequestState::Reopened);
    assert!(state.is_open());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unregistered_kind_is_rejected(pool: PgPool) {
    let registry = registry_with(RecordingHandler::new("quiz"));
    let (_, item) = create_request_with_item(&pool, 2).await;

    let err = update_item_state(
        &pool,
        &registry,
        item.id,
        TEACHER_ID,
        RequestState::Approved,
        true,
    )
    .await
    .unwrap_err();

    assert_matches!(err, PipelineError::MissingHandler(kind) if kind == "assignment");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn deciding_an_item_reprocesses_triggers(pool: PgPool) {
    let teacher = role_id(&pool, prolong_core::roles::ROLE_TEACHER).await;
    assign_course_role(&pool, TEACHER_ID, teacher).await;
    insert_rule(&pool, &rule_spec(teacher)).await;

    let registry = registry_with(RecordingHandler::new("assignment"));
    let (_, item) = create_request_with_item(&pool, 2).await;

    let (entry, fired) = decide_item(
        &pool,
        &PipelineConfig::default(),
        &registry,
        item.id,
        TEACHER_ID,
        RequestState::Denied,
        true,
        days_after(1),
    )
    .await
    .unwrap();

    assert_eq!(entry.state, RequestState::Denied.as_i16());
    assert_eq!(fired.len(), 1);
    assert_eq!(fired[0].item.id, item.id);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn authorization_follows_the_latest_subscription(pool: PgPool) {
    let (request, item) = create_request_with_item(&pool, 2).await;

    assert!(!actor_is_authorized(&pool, item.id, TEACHER_ID, false).await.unwrap());
    assert!(actor_is_authorized(&pool, item.id, TEACHER_ID, true).await.unwrap());

    SubscriptionRepo::insert(
        &pool,
        TEACHER_ID,
        item.id,
        request.id,
        1,
        AccessLevel::Approve.as_i16(),
    )
    .await
    .unwrap();
    assert!(actor_is_authorized(&pool, item.id, TEACHER_ID, false).await.unwrap());

    // A later downgrade to observer removes decision rights.
    SubscriptionRepo::insert(
        &pool,
        TEACHER_ID,
        item.id,
        request.id,
        1,
        AccessLevel::Subscribe.as_i16(),
    )
    .await
    .unwrap();
    assert!(!actor_is_authorized(&pool, item.id, TEACHER_ID, false).await.unwrap());
}
