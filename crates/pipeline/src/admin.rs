//! Rule administration and request mutations.
//!
//! The admin UI itself lives in the host platform; these are the
//! validated operations behind it. Request mutations funnel their cache
//! invalidation through [`cache::invalidate`].

use validator::Validate;

use prolong_core::access::AccessLevel;
use prolong_core::error::CoreError;
use prolong_core::rules::Comparator;
use prolong_core::templates::TemplateSet;
use prolong_core::types::{DbId, Timestamp};
use prolong_db::models::comment::CreateComment;
use prolong_db::models::request::{CreateRequest, Request, RequestItem};
use prolong_db::models::rule::{CreateRule, RuleRow, UpdateRule};
use prolong_db::repositories::{
    CommentRepo, RequestItemRepo, RequestRepo, RoleRepo, RuleRepo,
};
use prolong_db::DbPool;
use prolong_events::FiredTrigger;

use crate::cache;
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::handler::HandlerRegistry;
use crate::triggers::process_triggers;

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// Create a trigger rule after validating the DTO, its enum fields, the
/// template keys, and the referenced role and parent.
pub async fn create_rule(pool: &DbPool, input: &CreateRule) -> Result<RuleRow, PipelineError> {
    input
        .validate()
        .map_err(|e| CoreError::Validation(e.to_string()))?;
    check_rule_fields(input.action, input.length_comparator, input.elapsed_comparator)?;
    TemplateSet::from_value(&input.templates)?;

    if RoleRepo::find_by_id(pool, input.role_id).await?.is_none() {
        return Err(CoreError::Configuration(format!(
            "rule references nonexistent role {}",
            input.role_id
        ))
        .into());
    }
    if let Some(parent_id) = input.parent_id {
        let parent = RuleRepo::find_by_id(pool, parent_id)
            .await?
            .ok_or_else(|| {
                CoreError::Configuration(format!("rule references missing parent {parent_id}"))
            })?;
        if parent.activity_kind != input.activity_kind {
            return Err(CoreError::Configuration(format!(
                "rule kind '{}' differs from parent kind '{}'",
                input.activity_kind, parent.activity_kind
            ))
            .into());
        }
    }

    let row = RuleRepo::create(pool, input).await?;
    tracing::info!(rule_id = row.id, name = %row.name, "Created trigger rule");
    Ok(row)
}

/// Patch a rule, re-validating any enum or template field it changes.
pub async fn update_rule(
    pool: &DbPool,
    id: DbId,
    input: &UpdateRule,
) -> Result<RuleRow, PipelineError> {
    if let Some(action) = input.action {
        check_access(action)?;
    }
    for comparator in [input.length_comparator, input.elapsed_comparator]
        .into_iter()
        .flatten()
    {
        check_comparator(comparator)?;
    }
    if let Some(templates) = &input.templates {
        TemplateSet::from_value(templates)?;
    }
    if let Some(role_id) = input.role_id {
        if RoleRepo::find_by_id(pool, role_id).await?.is_none() {
            return Err(CoreError::Configuration(format!(
                "rule references nonexistent role {role_id}"
            ))
            .into());
        }
    }

    RuleRepo::update(pool, id, input)
        .await?
        .ok_or_else(|| CoreError::NotFound { entity: "rule", id }.into())
}

/// Delete a rule together with its descendants. Returns how many rules
/// were removed.
pub async fn delete_rule(pool: &DbPool, id: DbId) -> Result<u64, PipelineError> {
    let removed = RuleRepo::delete_with_descendants(pool, id).await?;
    if removed == 0 {
        return Err(CoreError::NotFound { entity: "rule", id }.into());
    }
    tracing::info!(rule_id = id, removed, "Deleted trigger rule subtree");
    Ok(removed)
}

fn check_rule_fields(action: i16, length_cmp: i16, elapsed_cmp: i16) -> Result<(), PipelineError> {
    check_access(action)?;
    check_comparator(length_cmp)?;
    check_comparator(elapsed_cmp)
}

fn check_access(action: i16) -> Result<(), PipelineError> {
    AccessLevel::from_i16(action)
        .map(|_| ())
        .ok_or_else(|| CoreError::Configuration(format!("unknown action {action}")).into())
}

fn check_comparator(comparator: i16) -> Result<(), PipelineError> {
    Comparator::from_i16(comparator)
        .map(|_| ())
        .ok_or_else(|| CoreError::Configuration(format!("unknown comparator {comparator}")).into())
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Create a request from a student submission.
///
/// Each item's activity must have a registered handler that confirms the
/// activity still accepts extensions, and no item may duplicate an
/// existing (activity, owner) pair.
pub async fn submit_request(
    pool: &DbPool,
    registry: &HandlerRegistry,
    input: &CreateRequest,
    submitted_at: Timestamp,
) -> Result<(Request, Vec<RequestItem>), PipelineError> {
    input
        .validate()
        .map_err(|e| CoreError::Validation(e.to_string()))?;

    for item in &input.items {
        if registry.get(&item.activity_kind).is_none() {
            return Err(PipelineError::MissingHandler(item.activity_kind.clone()));
        }
        if RequestItemRepo::find_by_activity_and_user(pool, item.activity_id, input.user_id)
            .await?
            .is_some()
        {
            return Err(CoreError::Conflict(format!(
                "an extension request for activity {} already exists",
                item.activity_id
            ))
            .into());
        }
    }

    let (request, items) = RequestRepo::create(pool, input, submitted_at).await?;

    // Candidate checks need the stored rows; a refusal after insertion
    // would leave half a request behind, so verify before reporting
    // success and roll the whole submission back on refusal.
    for item in &items {
        let handler = registry
            .get(&item.activity_kind)
            .ok_or_else(|| PipelineError::MissingHandler(item.activity_kind.clone()))?;
        if !handler.is_candidate(item).await {
            RequestRepo::delete(pool, request.id).await?;
            return Err(CoreError::Validation(format!(
                "activity {} does not accept extension requests",
                item.activity_id
            ))
            .into());
        }
    }

    tracing::info!(
        request_id = request.id,
        user_id = request.user_id,
        items = items.len(),
        "Extension request submitted"
    );
    Ok((request, items))
}

/// Append a comment and refresh the request's modification stamp.
pub async fn add_comment(
    pool: &DbPool,
    input: &CreateComment,
) -> Result<prolong_db::models::comment::RequestComment, PipelineError> {
    input
        .validate()
        .map_err(|e| CoreError::Validation(e.to_string()))?;

    let comment = CommentRepo::insert(pool, input).await?;
    RequestRepo::touch(pool, input.request_id).await?;
    cache::invalidate(pool, input.request_id).await?;
    Ok(comment)
}

/// Move an item's requested due date, recomputing the stored length and
/// re-running the request's triggers.
///
/// The trigger pass happens synchronously because the new length can
/// satisfy rules that previously skipped, and fired rules reconcile
/// their subscriptions against it. Returns the updated item together
/// with any rules the pass fired.
pub async fn change_requested_due(
    pool: &DbPool,
    config: &PipelineConfig,
    item_id: DbId,
    requested_due: Timestamp,
    now: Timestamp,
) -> Result<(RequestItem, Vec<FiredTrigger>), PipelineError> {
    let item = RequestItemRepo::update_requested_due(pool, item_id, requested_due)
        .await?
        .ok_or(PipelineError::ItemNotFound(item_id))?;
    RequestRepo::touch(pool, item.request_id).await?;
    cache::invalidate(pool, item.request_id).await?;

    tracing::info!(
        item_id,
        requested_due = %requested_due,
        length_secs = item.length_secs,
        "Requested due date changed"
    );

    let fired = process_triggers(pool, config, item.request_id, now).await?;
    Ok((item, fired))
}
