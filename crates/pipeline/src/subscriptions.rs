//! Subscription grants and ancestor downgrades for fired rules.
//!
//! All functions take an open connection so the trigger pipeline can run
//! them inside its per-(rule, item) transaction.

use sqlx::PgConnection;

use prolong_core::access::AccessLevel;
use prolong_core::roles::{SCOPE_CATEGORY, SCOPE_COURSE};
use prolong_core::rules::{Rule, RuleForest};
use prolong_core::types::DbId;
use prolong_db::models::request::RequestItem;
use prolong_db::repositories::{RoleAssignmentRepo, SubscriptionRepo};

/// Resolve the distinct users holding `role_id` for the item's course,
/// its category, and the site. Each scope is queried independently and
/// the union merged, since assignments do not nest across scopes.
async fn resolve_role_holders(
    conn: &mut PgConnection,
    role_id: DbId,
    item: &RequestItem,
) -> Result<Vec<DbId>, sqlx::Error> {
    let mut users =
        RoleAssignmentRepo::users_with_role(&mut *conn, role_id, SCOPE_COURSE, item.course_id)
            .await?;
    users.extend(
        RoleAssignmentRepo::users_with_role(&mut *conn, role_id, SCOPE_CATEGORY, item.category_id)
            .await?,
    );
    users.extend(RoleAssignmentRepo::users_with_role_at_site(&mut *conn, role_id).await?);
    users.sort_unstable();
    users.dedup();
    Ok(users)
}

/// Grant the rule's access level to every holder of its role, then
/// downgrade grantees of superseded ancestors.
///
/// Grants are idempotent: a user whose authoritative row already carries
/// the rule's access is left alone. Returns the users who received a new
/// row from this rule.
pub async fn setup_subscription(
    conn: &mut PgConnection,
    forest: &RuleForest,
    rule: &Rule,
    item: &RequestItem,
) -> Result<Vec<DbId>, sqlx::Error> {
    let holders = resolve_role_holders(&mut *conn, rule.role_id, item).await?;

    let mut granted = Vec::new();
    for user_id in holders {
        let current = SubscriptionRepo::latest_for_item_user(&mut *conn, item.id, user_id)
            .await?
            .and_then(|s| s.access_level())
            .unwrap_or(AccessLevel::Default);
        if current == rule.action {
            continue;
        }
        SubscriptionRepo::insert(
            &mut *conn,
            user_id,
            item.id,
            item.request_id,
            rule.id,
            rule.action.as_i16(),
        )
        .await?;
        granted.push(user_id);
    }

    downgrade_ancestors(conn, forest, rule, item).await?;
    Ok(granted)
}

/// Walk the rule's ancestor chain and revoke approval rights granted by
/// superseded ancestors: their grantees drop to observer access unless
/// the ancestor's action was ForceApprove, which is never revoked.
async fn downgrade_ancestors(
    conn: &mut PgConnection,
    forest: &RuleForest,
    rule: &Rule,
    item: &RequestItem,
) -> Result<(), sqlx::Error> {
    for ancestor_id in forest.ancestors(rule.id) {
        let Some(ancestor) = forest.get(ancestor_id) else {
            continue;
        };
        if ancestor.action == AccessLevel::ForceApprove {
            continue;
        }

        let holders = resolve_role_holders(&mut *conn, ancestor.role_id, item).await?;
        let tagged =
            SubscriptionRepo::latest_tagged_with_rule(&mut *conn, item.id, ancestor_id).await?;
        for subscription in tagged {
            if !holders.contains(&subscription.user_id) {
                continue;
            }
            if subscription.access == AccessLevel::Subscribe.as_i16() {
                continue;
            }
            SubscriptionRepo::insert(
                &mut *conn,
                subscription.user_id,
                item.id,
                item.request_id,
                ancestor_id,
                AccessLevel::Subscribe.as_i16(),
            )
            .await?;
            tracing::debug!(
                user_id = subscription.user_id,
                item_id = item.id,
                ancestor_rule_id = ancestor_id,
                "Downgraded superseded approver to subscriber"
            );
        }
    }
    Ok(())
}

/// Whether a user may currently decide an item: their authoritative
/// subscription row carries an approval-capable access level.
pub async fn user_can_approve(
    conn: &mut PgConnection,
    item_id: DbId,
    user_id: DbId,
) -> Result<bool, sqlx::Error> {
    Ok(
        SubscriptionRepo::latest_for_item_user(&mut *conn, item_id, user_id)
            .await?
            .and_then(|s| s.access_level())
            .map(AccessLevel::can_approve)
            .unwrap_or(false),
    )
}
