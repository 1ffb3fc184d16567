//! Trigger rule model, forest construction, and evaluation.
//!
//! Rules are admin-configured and loaded fresh for every processing pass.
//! They form a forest per activity kind: a child rule is only considered
//! once its parent has fired. Evaluation itself is pure — the pipeline
//! layer gathers the per-item facts into an [`EvaluationContext`] and acts
//! on the returned [`TriggerOutcome`].

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::access::AccessLevel;
use crate::error::CoreError;
use crate::templates::TemplateSet;
use crate::types::DbId;

pub const SECS_PER_DAY: i64 = 86_400;

// ---------------------------------------------------------------------------
// Comparator
// ---------------------------------------------------------------------------

/// Tri-state comparator for a rule's length and elapsed conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparator {
    /// Condition always holds.
    Any = 0,
    LessThan = 1,
    GreaterOrEqual = 2,
}

impl Comparator {
    /// Decode a stored SMALLINT value.
    pub fn from_i16(value: i16) -> Option<Self> {
        match value {
            0 => Some(Self::Any),
            1 => Some(Self::LessThan),
            2 => Some(Self::GreaterOrEqual),
            _ => None,
        }
    }

    pub fn as_i16(self) -> i16 {
        self as i16
    }

    /// Whether `actual` satisfies this comparator against `threshold`.
    pub fn satisfied(self, actual: i64, threshold: i64) -> bool {
        match self {
            Self::Any => true,
            Self::LessThan => actual < threshold,
            Self::GreaterOrEqual => actual >= threshold,
        }
    }
}

// ---------------------------------------------------------------------------
// Rule
// ---------------------------------------------------------------------------

/// A trigger rule, decoded from its stored row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub id: DbId,
    pub name: String,
    /// Activity kind this rule applies to, e.g. `"assignment"`.
    pub activity_kind: String,
    /// Role whose holders receive the rule's access level.
    pub role_id: DbId,
    pub action: AccessLevel,
    /// Evaluation order among siblings; ties broken by id.
    pub priority: i32,
    /// Parent rule id; `None` for roots.
    pub parent_id: Option<DbId>,
    /// Threshold for the requested-length condition, in days.
    pub length_from_due_days: i64,
    pub length_comparator: Comparator,
    /// Threshold for the time-since-request condition, in weekdays.
    pub elapsed_from_request_days: i64,
    pub elapsed_comparator: Comparator,
    pub templates: TemplateSet,
}

impl Rule {
    /// Whether an item's requested length (seconds) satisfies the length
    /// condition.
    pub fn length_satisfied(&self, length_secs: i64) -> bool {
        self.length_comparator
            .satisfied(length_secs, self.length_from_due_days * SECS_PER_DAY)
    }

    /// Whether the weekdays elapsed since submission satisfy the elapsed
    /// condition.
    pub fn elapsed_satisfied(&self, elapsed_weekdays: i64) -> bool {
        self.elapsed_comparator
            .satisfied(elapsed_weekdays, self.elapsed_from_request_days)
    }
}

// ---------------------------------------------------------------------------
// RuleForest
// ---------------------------------------------------------------------------

/// A node in the rule forest. Relations are stored as rule ids, not
/// references, so the structure is acyclic by construction and cheap to
/// clone.
#[derive(Debug, Clone)]
struct RuleNode {
    rule: Rule,
    children: Vec<DbId>,
}

/// Priority-ordered forest of rules, indexed by rule id.
#[derive(Debug, Clone, Default)]
pub struct RuleForest {
    nodes: HashMap<DbId, RuleNode>,
    roots: Vec<DbId>,
}

impl RuleForest {
    /// Build a forest from a flat rule set.
    ///
    /// Roots and sibling lists are ordered by (priority, id) ascending, so
    /// the same input set produces the same forest regardless of input
    /// order. A rule whose `parent_id` is not in the set, or a parent
    /// chain that loops, is a configuration error.
    pub fn build(rules: Vec<Rule>) -> Result<Self, CoreError> {
        let known: HashSet<DbId> = rules.iter().map(|r| r.id).collect();
        for rule in &rules {
            if let Some(parent_id) = rule.parent_id {
                if parent_id == rule.id {
                    return Err(CoreError::Configuration(format!(
                        "rule {} ({}) is its own parent",
                        rule.id, rule.name
                    )));
                }
                if !known.contains(&parent_id) {
                    return Err(CoreError::Configuration(format!(
                        "rule {} ({}) references missing parent {parent_id}",
                        rule.id, rule.name
                    )));
                }
            }
        }

        let mut nodes: HashMap<DbId, RuleNode> = rules
            .into_iter()
            .map(|rule| {
                (
                    rule.id,
                    RuleNode {
                        rule,
                        children: Vec::new(),
                    },
                )
            })
            .collect();

        let mut ordered: Vec<DbId> = nodes.keys().copied().collect();
        ordered.sort_by_key(|id| (nodes[id].rule.priority, *id));

        let mut roots = Vec::new();
        for id in ordered {
            let parent_id = nodes[&id].rule.parent_id;
            match parent_id {
                None => roots.push(id),
                Some(parent_id) => {
                    if let Some(parent) = nodes.get_mut(&parent_id) {
                        parent.children.push(id);
                    }
                }
            }
        }

        let forest = Self { nodes, roots };
        if forest.depth_first_ids().len() != forest.len() {
            return Err(CoreError::Configuration(
                "rule parent chain contains a cycle".to_string(),
            ));
        }
        Ok(forest)
    }

    pub fn get(&self, id: DbId) -> Option<&Rule> {
        self.nodes.get(&id).map(|node| &node.rule)
    }

    pub fn roots(&self) -> &[DbId] {
        &self.roots
    }

    pub fn children(&self, id: DbId) -> &[DbId] {
        self.nodes
            .get(&id)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Every rule id in depth-first, priority order. The trigger pass
    /// visits all of them; children gate themselves on their parent's
    /// firing history.
    pub fn depth_first_ids(&self) -> Vec<DbId> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<DbId> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            if let Some(node) = self.nodes.get(&id) {
                stack.extend(node.children.iter().rev());
            }
        }
        out
    }

    /// Ancestor rule ids of `id`, nearest parent first.
    pub fn ancestors(&self, id: DbId) -> Vec<DbId> {
        let mut out = Vec::new();
        let mut current = self.nodes.get(&id).and_then(|node| node.rule.parent_id);
        while let Some(parent_id) = current {
            if out.contains(&parent_id) {
                break;
            }
            out.push(parent_id);
            current = self
                .nodes
                .get(&parent_id)
                .and_then(|node| node.rule.parent_id);
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// What a rule should do for an item, decided by [`evaluate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// Conditions newly satisfied: grant subscriptions, record history,
    /// and notify.
    Fire,
    /// Already fired but the requested length has drifted out of range:
    /// repair subscriptions without a new notification.
    Reconcile,
    /// Nothing to do.
    Skip,
}

/// The per-(rule, item) facts `evaluate` needs.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationContext {
    /// A trigger-history row exists for this rule and item.
    pub already_fired: bool,
    /// A trigger-history row exists for the rule's parent and this item.
    /// Ignored for root rules.
    pub parent_fired: bool,
    /// Requested due minus original due, in seconds.
    pub length_secs: i64,
    /// Weekdays elapsed since the request was submitted.
    pub elapsed_weekdays: i64,
}

/// Decide what, if anything, a rule should do for an item.
///
/// A fired rule never notifies again; it only reconciles subscriptions
/// when the item's current length no longer satisfies it. An unfired
/// child is gated on its parent having fired first.
pub fn evaluate(rule: &Rule, ctx: &EvaluationContext) -> TriggerOutcome {
    if ctx.already_fired {
        if !rule.length_satisfied(ctx.length_secs) {
            return TriggerOutcome::Reconcile;
        }
        return TriggerOutcome::Skip;
    }
    if rule.parent_id.is_some() && !ctx.parent_fired {
        return TriggerOutcome::Skip;
    }
    if !rule.length_satisfied(ctx.length_secs) {
        return TriggerOutcome::Skip;
    }
    if !rule.elapsed_satisfied(ctx.elapsed_weekdays) {
        return TriggerOutcome::Skip;
    }
    TriggerOutcome::Fire
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(id: DbId, priority: i32, parent_id: Option<DbId>) -> Rule {
        Rule {
            id,
            name: format!("rule-{id}"),
            activity_kind: "assignment".to_string(),
            role_id: 1,
            action: AccessLevel::Subscribe,
            priority,
            parent_id,
            length_from_due_days: 0,
            length_comparator: Comparator::Any,
            elapsed_from_request_days: 0,
            elapsed_comparator: Comparator::Any,
            templates: TemplateSet::default(),
        }
    }

    fn ctx() -> EvaluationContext {
        EvaluationContext {
            already_fired: false,
            parent_fired: false,
            length_secs: 0,
            elapsed_weekdays: 0,
        }
    }

    // -----------------------------------------------------------------------
    // Comparator
    // -----------------------------------------------------------------------

    #[test]
    fn comparator_any_always_holds() {
        assert!(Comparator::Any.satisfied(i64::MIN, 0));
        assert!(Comparator::Any.satisfied(i64::MAX, 0));
    }

    #[test]
    fn comparator_less_than_is_strict() {
        assert!(Comparator::LessThan.satisfied(4, 5));
        assert!(!Comparator::LessThan.satisfied(5, 5));
    }

    #[test]
    fn comparator_greater_or_equal_includes_threshold() {
        assert!(Comparator::GreaterOrEqual.satisfied(5, 5));
        assert!(!Comparator::GreaterOrEqual.satisfied(4, 5));
    }

    #[test]
    fn comparator_i16_round_trip() {
        for cmp in [
            Comparator::Any,
            Comparator::LessThan,
            Comparator::GreaterOrEqual,
        ] {
            assert_eq!(Comparator::from_i16(cmp.as_i16()), Some(cmp));
        }
        assert_eq!(Comparator::from_i16(3), None);
    }

    // -----------------------------------------------------------------------
    // Forest construction
    // -----------------------------------------------------------------------

    #[test]
    fn roots_ordered_by_priority_then_id() {
        let forest = RuleForest::build(vec![rule(3, 10, None), rule(1, 20, None), rule(2, 10, None)])
            .unwrap();
        assert_eq!(forest.roots(), &[2, 3, 1]);
    }

    #[test]
    fn children_ordered_by_priority_then_id() {
        let forest = RuleForest::build(vec![
            rule(1, 0, None),
            rule(4, 5, Some(1)),
            rule(2, 9, Some(1)),
            rule(3, 5, Some(1)),
        ])
        .unwrap();
        assert_eq!(forest.children(1), &[3, 4, 2]);
    }

    #[test]
    fn build_is_deterministic_over_input_order() {
        let rules = vec![
            rule(5, 2, None),
            rule(1, 1, None),
            rule(3, 1, Some(1)),
            rule(2, 2, Some(1)),
            rule(4, 1, Some(5)),
        ];
        let forward = RuleForest::build(rules.clone()).unwrap();
        let mut reversed = rules;
        reversed.reverse();
        let backward = RuleForest::build(reversed).unwrap();
        assert_eq!(forward.roots(), backward.roots());
        assert_eq!(forward.depth_first_ids(), backward.depth_first_ids());
    }

    #[test]
    fn depth_first_visits_children_before_later_roots() {
        let forest = RuleForest::build(vec![
            rule(1, 1, None),
            rule(2, 2, None),
            rule(3, 1, Some(1)),
            rule(4, 1, Some(3)),
        ])
        .unwrap();
        assert_eq!(forest.depth_first_ids(), vec![1, 3, 4, 2]);
    }

    #[test]
    fn ancestors_walk_to_the_root() {
        let forest = RuleForest::build(vec![
            rule(1, 1, None),
            rule(2, 1, Some(1)),
            rule(3, 1, Some(2)),
        ])
        .unwrap();
        assert_eq!(forest.ancestors(3), vec![2, 1]);
        assert!(forest.ancestors(1).is_empty());
    }

    #[test]
    fn missing_parent_is_configuration_error() {
        let err = RuleForest::build(vec![rule(1, 1, Some(99))]).unwrap_err();
        assert!(err.to_string().contains("missing parent"));
    }

    #[test]
    fn self_parent_is_configuration_error() {
        assert!(RuleForest::build(vec![rule(1, 1, Some(1))]).is_err());
    }

    #[test]
    fn parent_cycle_is_configuration_error() {
        let err =
            RuleForest::build(vec![rule(1, 1, Some(2)), rule(2, 1, Some(1))]).unwrap_err();
        assert!(err.to_string().contains("cycle"));
    }

    #[test]
    fn empty_set_builds_empty_forest() {
        let forest = RuleForest::build(Vec::new()).unwrap();
        assert!(forest.is_empty());
        assert!(forest.roots().is_empty());
    }

    // -----------------------------------------------------------------------
    // Evaluation
    // -----------------------------------------------------------------------

    #[test]
    fn fires_when_all_conditions_hold() {
        let mut r = rule(1, 1, None);
        r.elapsed_comparator = Comparator::GreaterOrEqual;
        r.elapsed_from_request_days = 5;
        let context = EvaluationContext {
            elapsed_weekdays: 5,
            ..ctx()
        };
        assert_eq!(evaluate(&r, &context), TriggerOutcome::Fire);
    }

    #[test]
    fn skips_when_elapsed_condition_fails() {
        let mut r = rule(1, 1, None);
        r.elapsed_comparator = Comparator::GreaterOrEqual;
        r.elapsed_from_request_days = 5;
        let context = EvaluationContext {
            elapsed_weekdays: 4,
            ..ctx()
        };
        assert_eq!(evaluate(&r, &context), TriggerOutcome::Skip);
    }

    #[test]
    fn skips_when_length_condition_fails() {
        let mut r = rule(1, 1, None);
        r.length_comparator = Comparator::LessThan;
        r.length_from_due_days = 7;
        let context = EvaluationContext {
            length_secs: 7 * SECS_PER_DAY,
            ..ctx()
        };
        assert_eq!(evaluate(&r, &context), TriggerOutcome::Skip);
    }

    #[test]
    fn length_threshold_converts_days_to_seconds() {
        let mut r = rule(1, 1, None);
        r.length_comparator = Comparator::GreaterOrEqual;
        r.length_from_due_days = 2;
        assert!(r.length_satisfied(2 * SECS_PER_DAY));
        assert!(!r.length_satisfied(2 * SECS_PER_DAY - 1));
    }

    #[test]
    fn child_skips_until_parent_fired() {
        let r = rule(2, 1, Some(1));
        assert_eq!(evaluate(&r, &ctx()), TriggerOutcome::Skip);
        let context = EvaluationContext {
            parent_fired: true,
            ..ctx()
        };
        assert_eq!(evaluate(&r, &context), TriggerOutcome::Fire);
    }

    #[test]
    fn fired_rule_with_satisfied_length_is_steady() {
        let context = EvaluationContext {
            already_fired: true,
            ..ctx()
        };
        assert_eq!(evaluate(&rule(1, 1, None), &context), TriggerOutcome::Skip);
    }

    #[test]
    fn fired_rule_reconciles_when_length_drifts_out() {
        let mut r = rule(1, 1, None);
        r.length_comparator = Comparator::GreaterOrEqual;
        r.length_from_due_days = 7;
        let context = EvaluationContext {
            already_fired: true,
            length_secs: 3 * SECS_PER_DAY,
            ..ctx()
        };
        assert_eq!(evaluate(&r, &context), TriggerOutcome::Reconcile);
    }

    #[test]
    fn fired_rule_never_refires() {
        // Even with every condition satisfied, history wins.
        let context = EvaluationContext {
            already_fired: true,
            parent_fired: true,
            ..ctx()
        };
        assert_eq!(evaluate(&rule(1, 1, None), &context), TriggerOutcome::Skip);
    }
}
