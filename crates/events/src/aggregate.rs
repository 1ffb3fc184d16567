//! Batched notification assembly from fired triggers.
//!
//! Pure logic: given the request and the (rule, item) pairs that fired in
//! one processing pass, produce at most one message per recipient. Role
//! holders granted by a rule get its `notify` template; the request owner
//! gets the `user` template. Rules without templates fall back to the
//! built-in ones.

use std::collections::BTreeMap;

use uuid::Uuid;

use prolong_core::rules::{Rule, SECS_PER_DAY};
use prolong_core::templates;
use prolong_core::types::DbId;
use prolong_db::models::request::{Request, RequestItem};

/// Fallback template for subscribed role holders.
const DEFAULT_NOTIFY_TEMPLATE: &str =
    "Rule '{rule}' matched {activity}: extension until {requested_due} requested \
     ({length_days} days past the original deadline).";

/// Fallback template for the request owner.
const DEFAULT_USER_TEMPLATE: &str =
    "Your extension request for {activity} (until {requested_due}) is being reviewed.";

// ---------------------------------------------------------------------------
// Inputs and outputs
// ---------------------------------------------------------------------------

/// One rule that newly fired for one request item, as reported by the
/// trigger pipeline.
#[derive(Debug, Clone)]
pub struct FiredTrigger {
    pub rule: Rule,
    pub item: RequestItem,
    /// Users who received a new subscription grant from this firing.
    pub granted_user_ids: Vec<DbId>,
}

/// One outgoing message for one recipient, covering every trigger that
/// fired for them in this pass.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationMessage {
    pub user_id: DbId,
    pub request_id: DbId,
    pub thread_key: Uuid,
    pub subject: String,
    pub body: String,
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Merge the fired triggers of one pass into batched messages.
///
/// Recipients are ordered by user id and sections within a body follow
/// firing order, so the output is deterministic.
pub fn aggregate(request: &Request, fired: &[FiredTrigger]) -> Vec<NotificationMessage> {
    let mut sections: BTreeMap<DbId, Vec<String>> = BTreeMap::new();

    for fire in fired {
        let context = template_context(fire);
        let notify = fire
            .rule
            .templates
            .notify
            .as_deref()
            .unwrap_or(DEFAULT_NOTIFY_TEMPLATE);
        for user_id in &fire.granted_user_ids {
            // The owner gets the dedicated user template below, not the
            // role-holder one.
            if *user_id == request.user_id {
                continue;
            }
            sections
                .entry(*user_id)
                .or_default()
                .push(templates::render(notify, &context));
        }

        let user = fire
            .rule
            .templates
            .user
            .as_deref()
            .unwrap_or(DEFAULT_USER_TEMPLATE);
        sections
            .entry(request.user_id)
            .or_default()
            .push(templates::render(user, &context));
    }

    let subject = format!("Extension request #{}", request.id);
    sections
        .into_iter()
        .map(|(user_id, parts)| NotificationMessage {
            user_id,
            request_id: request.id,
            thread_key: request.thread_key,
            subject: subject.clone(),
            body: parts.join("\n\n"),
        })
        .collect()
}

/// Placeholder values available to rule templates.
fn template_context(fire: &FiredTrigger) -> BTreeMap<String, String> {
    let item = &fire.item;
    let mut context = BTreeMap::new();
    context.insert("rule".to_string(), fire.rule.name.clone());
    context.insert("activity".to_string(), item.activity_name.clone());
    context.insert("kind".to_string(), item.activity_kind.clone());
    context.insert("request_id".to_string(), item.request_id.to_string());
    context.insert("student_id".to_string(), item.user_id.to_string());
    context.insert(
        "original_due".to_string(),
        item.original_due.format("%Y-%m-%d %H:%M").to_string(),
    );
    context.insert(
        "requested_due".to_string(),
        item.requested_due.format("%Y-%m-%d %H:%M").to_string(),
    );
    context.insert(
        "length_days".to_string(),
        (item.length_secs / SECS_PER_DAY).to_string(),
    );
    context
}
