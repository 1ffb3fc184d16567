//! Shared fixtures for the pipeline integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use sqlx::PgPool;

use prolong_core::access::AccessLevel;
use prolong_core::roles::SCOPE_COURSE;
use prolong_core::types::{DbId, Timestamp};
use prolong_db::models::request::{CreateRequest, CreateRequestItem, Request, RequestItem};
use prolong_db::models::rule::CreateRule;
use prolong_db::repositories::{RequestRepo, RoleAssignmentRepo, RoleRepo, RuleRepo};
use prolong_pipeline::handler::{ActivityHandler, HandlerRegistry};

pub const COURSE_ID: DbId = 10;
pub const CATEGORY_ID: DbId = 20;
pub const STUDENT_ID: DbId = 1;
pub const TEACHER_ID: DbId = 50;
pub const COORDINATOR_ID: DbId = 60;

/// Thursday 2018-02-01 09:00 UTC.
pub fn submission_time() -> Timestamp {
    Utc.with_ymd_and_hms(2018, 2, 1, 9, 0, 0).unwrap()
}

/// `days` calendar days after the submission instant.
pub fn days_after(days: i64) -> Timestamp {
    submission_time() + Duration::days(days)
}

// ---------------------------------------------------------------------------
// Database fixtures
// ---------------------------------------------------------------------------

pub async fn role_id(pool: &PgPool, name: &str) -> DbId {
    RoleRepo::find_by_name(pool, name)
        .await
        .unwrap()
        .unwrap_or_else(|| panic!("role '{name}' should be seeded"))
        .id
}

/// Assign a role to a user at the fixture course.
pub async fn assign_course_role(pool: &PgPool, user_id: DbId, role_id: DbId) {
    RoleAssignmentRepo::assign(pool, user_id, role_id, SCOPE_COURSE, Some(COURSE_ID))
        .await
        .unwrap();
}

/// A permissive rule spec: applies to assignments, no conditions, grants
/// observer access. Tests tighten the fields they exercise.
pub fn rule_spec(role_id: DbId) -> CreateRule {
    CreateRule {
        name: "Test rule".to_string(),
        activity_kind: "assignment".to_string(),
        role_id,
        action: AccessLevel::Subscribe.as_i16(),
        priority: 0,
        parent_id: None,
        length_from_due_days: 0,
        length_comparator: 0,
        elapsed_from_request_days: 0,
        elapsed_comparator: 0,
        templates: serde_json::json!({}),
    }
}

pub async fn insert_rule(pool: &PgPool, spec: &CreateRule) -> DbId {
    RuleRepo::create(pool, spec).await.unwrap().id
}

/// Create a request holding one assignment item per `(activity_id,
/// length_days)` pair, submitted at the fixture instant.
pub async fn create_request(
    pool: &PgPool,
    items: &[(DbId, i64)],
) -> (Request, Vec<RequestItem>) {
    let original_due = submission_time() + Duration::days(3);
    let input = CreateRequest {
        user_id: STUDENT_ID,
        items: items
            .iter()
            .map(|(activity_id, length_days)| CreateRequestItem {
                course_id: COURSE_ID,
                category_id: CATEGORY_ID,
                activity_id: *activity_id,
                activity_kind: "assignment".to_string(),
                activity_name: format!("Assignment {activity_id}"),
                original_due,
                requested_due: original_due + Duration::days(*length_days),
            })
            .collect(),
        comment: None,
    };
    RequestRepo::create(pool, &input, submission_time())
        .await
        .unwrap()
}

/// Create a request with a single item for activity 100.
pub async fn create_request_with_item(
    pool: &PgPool,
    length_days: i64,
) -> (Request, RequestItem) {
    let (request, mut items) = create_request(pool, &[(100, length_days)]).await;
    (request, items.remove(0))
}

// ---------------------------------------------------------------------------
// Recording handler
// ---------------------------------------------------------------------------

/// An [`ActivityHandler`] that records calls and answers from switches,
/// standing in for the host platform.
pub struct RecordingHandler {
    kind: String,
    pub accept_submit: AtomicBool,
    pub accept_cancel: AtomicBool,
    pub is_candidate: AtomicBool,
    pub has_extension: AtomicBool,
    pub submit_calls: AtomicUsize,
    pub cancel_calls: AtomicUsize,
}

impl RecordingHandler {
    pub fn new(kind: &str) -> Arc<Self> {
        Arc::new(Self {
            kind: kind.to_string(),
            accept_submit: AtomicBool::new(true),
            accept_cancel: AtomicBool::new(true),
            is_candidate: AtomicBool::new(true),
            has_extension: AtomicBool::new(false),
            submit_calls: AtomicUsize::new(0),
            cancel_calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl ActivityHandler for RecordingHandler {
    fn kind(&self) -> &str {
        &self.kind
    }

    async fn is_candidate(&self, _item: &RequestItem) -> bool {
        self.is_candidate.load(Ordering::SeqCst)
    }

    async fn submit_extension(
        &self,
        _activity_id: DbId,
        _user_id: DbId,
        _new_due: Timestamp,
    ) -> bool {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        self.accept_submit.load(Ordering::SeqCst)
    }

    async fn cancel_extension(&self, _activity_id: DbId, _user_id: DbId) -> bool {
        self.cancel_calls.fetch_add(1, Ordering::SeqCst);
        self.accept_cancel.load(Ordering::SeqCst)
    }

    async fn current_extension(&self, _item: &RequestItem) -> Option<Timestamp> {
        self.has_extension
            .load(Ordering::SeqCst)
            .then(|| days_after(5))
    }
}

pub fn registry_with(handler: Arc<RecordingHandler>) -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();
    registry.register(handler);
    registry
}
