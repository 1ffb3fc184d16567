//! Trigger processing for a single request.

use std::collections::HashMap;

use prolong_core::rules::{self, EvaluationContext, RuleForest, TriggerOutcome};
use prolong_core::types::{DbId, Timestamp};
use prolong_core::workdays;
use prolong_db::models::request::RequestItem;
use prolong_db::repositories::{RequestItemRepo, RequestRepo, RuleRepo, TriggerHistoryRepo};
use prolong_db::DbPool;
use prolong_events::FiredTrigger;

use crate::cache;
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::subscriptions;

/// What applying one rule to one item did.
enum Applied {
    Fired(Vec<DbId>),
    Reconciled,
    Skipped,
}

/// Process every trigger rule against every item of a request.
///
/// The rule forest for each item's activity kind (or for all kinds, with
/// the ignore-kind escape hatch) is loaded fresh and walked in full;
/// children gate themselves on their parent's firing history. Each
/// rule's history check, evaluation, and side effects run in one
/// transaction, and the unique history index makes firing at-most-once
/// even when passes race. Returns the newly fired (rule, item) pairs for
/// notification.
pub async fn process_triggers(
    pool: &DbPool,
    config: &PipelineConfig,
    request_id: DbId,
    now: Timestamp,
) -> Result<Vec<FiredTrigger>, PipelineError> {
    let request = RequestRepo::find_by_id(pool, request_id)
        .await?
        .ok_or(PipelineError::RequestNotFound(request_id))?;
    let items = RequestItemRepo::list_for_request(pool, request_id).await?;
    let elapsed_weekdays = workdays::weekdays_elapsed(request.submitted_at, now);

    let mut forests: HashMap<String, RuleForest> = HashMap::new();
    let mut fired = Vec::new();
    let mut mutated = false;

    for item in &items {
        let forest = load_forest(pool, config, &mut forests, &item.activity_kind).await?;
        for rule_id in forest.depth_first_ids() {
            let Some(rule) = forest.get(rule_id) else {
                continue;
            };
            match apply_rule(pool, forest, rule, item, elapsed_weekdays).await? {
                Applied::Fired(granted_user_ids) => {
                    mutated = true;
                    fired.push(FiredTrigger {
                        rule: rule.clone(),
                        item: item.clone(),
                        granted_user_ids,
                    });
                }
                Applied::Reconciled => mutated = true,
                Applied::Skipped => {}
            }
        }
    }

    if mutated {
        cache::invalidate(pool, request_id).await?;
    }

    tracing::debug!(
        request_id,
        items = items.len(),
        fired = fired.len(),
        "Processed triggers"
    );
    Ok(fired)
}

/// Load (once per pass) the rule forest for an activity kind.
async fn load_forest<'a>(
    pool: &DbPool,
    config: &PipelineConfig,
    forests: &'a mut HashMap<String, RuleForest>,
    activity_kind: &str,
) -> Result<&'a RuleForest, PipelineError> {
    // With the escape hatch on, a single forest covers every kind.
    let key = if config.ignore_kind { "" } else { activity_kind };
    if !forests.contains_key(key) {
        let rows = if config.ignore_kind {
            RuleRepo::list_all(pool).await?
        } else {
            RuleRepo::list_for_kind(pool, activity_kind).await?
        };
        let rules = rows
            .into_iter()
            .map(|row| row.decode())
            .collect::<Result<Vec<_>, _>>()?;
        forests.insert(key.to_string(), RuleForest::build(rules)?);
    }
    Ok(&forests[key])
}

/// Evaluate one rule against one item and apply its side effects.
///
/// Runs in a single transaction so the history check and the writes are
/// atomic; a concurrent pass that fires first surfaces here as a unique
/// violation and is treated as "already fired".
async fn apply_rule(
    pool: &DbPool,
    forest: &RuleForest,
    rule: &prolong_core::rules::Rule,
    item: &RequestItem,
    elapsed_weekdays: i64,
) -> Result<Applied, PipelineError> {
    let mut tx = pool.begin().await?;

    let already_fired = TriggerHistoryRepo::exists(&mut *tx, rule.id, item.id).await?;
    let parent_fired = match rule.parent_id {
        Some(parent_id) => TriggerHistoryRepo::exists(&mut *tx, parent_id, item.id).await?,
        None => false,
    };
    let ctx = EvaluationContext {
        already_fired,
        parent_fired,
        length_secs: item.length_secs,
        elapsed_weekdays,
    };

    match rules::evaluate(rule, &ctx) {
        TriggerOutcome::Skip => {
            tx.rollback().await?;
            Ok(Applied::Skipped)
        }
        TriggerOutcome::Reconcile => {
            subscriptions::setup_subscription(&mut *tx, forest, rule, item).await?;
            tx.commit().await?;
            tracing::debug!(
                rule_id = rule.id,
                item_id = item.id,
                "Reconciled subscriptions after length change"
            );
            Ok(Applied::Reconciled)
        }
        TriggerOutcome::Fire => {
            match TriggerHistoryRepo::insert(&mut *tx, rule.id, item.id, item.request_id, item.user_id)
                .await
            {
                Ok(_) => {}
                Err(e) if is_unique_violation(&e) => {
                    // Another pass fired this rule between our check and
                    // the insert.
                    tx.rollback().await?;
                    return Ok(Applied::Skipped);
                }
                Err(e) => return Err(e.into()),
            }
            let granted = subscriptions::setup_subscription(&mut *tx, forest, rule, item).await?;
            tx.commit().await?;
            tracing::info!(
                rule_id = rule.id,
                rule_name = %rule.name,
                item_id = item.id,
                granted = granted.len(),
                "Trigger rule fired"
            );
            Ok(Applied::Fired(granted))
        }
    }
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    error
        .as_database_error()
        .map(|db| db.is_unique_violation())
        .unwrap_or(false)
}
