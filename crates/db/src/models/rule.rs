//! Trigger rule models and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use prolong_core::access::AccessLevel;
use prolong_core::error::CoreError;
use prolong_core::rules::{Comparator, Rule};
use prolong_core::templates::TemplateSet;
use prolong_core::types::{DbId, Timestamp};

/// A row from the `rules` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RuleRow {
    pub id: DbId,
    pub name: String,
    pub activity_kind: String,
    pub role_id: DbId,
    pub action: i16,
    pub priority: i32,
    pub parent_id: Option<DbId>,
    pub length_from_due_days: i32,
    pub length_comparator: i16,
    pub elapsed_from_request_days: i32,
    pub elapsed_comparator: i16,
    pub templates: serde_json::Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl RuleRow {
    /// Decode the stored row into the domain rule, validating the enum
    /// discriminants and template keys.
    pub fn decode(self) -> Result<Rule, CoreError> {
        let action = AccessLevel::from_i16(self.action).ok_or_else(|| {
            CoreError::Configuration(format!("rule {}: unknown action {}", self.id, self.action))
        })?;
        let length_comparator = Comparator::from_i16(self.length_comparator).ok_or_else(|| {
            CoreError::Configuration(format!(
                "rule {}: unknown length comparator {}",
                self.id, self.length_comparator
            ))
        })?;
        let elapsed_comparator = Comparator::from_i16(self.elapsed_comparator).ok_or_else(|| {
            CoreError::Configuration(format!(
                "rule {}: unknown elapsed comparator {}",
                self.id, self.elapsed_comparator
            ))
        })?;
        let templates = TemplateSet::from_value(&self.templates)
            .map_err(|e| CoreError::Configuration(format!("rule {}: {e}", self.id)))?;

        Ok(Rule {
            id: self.id,
            name: self.name,
            activity_kind: self.activity_kind,
            role_id: self.role_id,
            action,
            priority: self.priority,
            parent_id: self.parent_id,
            length_from_due_days: i64::from(self.length_from_due_days),
            length_comparator,
            elapsed_from_request_days: i64::from(self.elapsed_from_request_days),
            elapsed_comparator,
            templates,
        })
    }
}

/// DTO for creating a trigger rule.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateRule {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(min = 1, max = 64))]
    pub activity_kind: String,
    pub role_id: DbId,
    pub action: i16,
    pub priority: i32,
    pub parent_id: Option<DbId>,
    #[validate(range(min = 0))]
    pub length_from_due_days: i32,
    pub length_comparator: i16,
    #[validate(range(min = 0))]
    pub elapsed_from_request_days: i32,
    pub elapsed_comparator: i16,
    #[serde(default)]
    pub templates: serde_json::Value,
}

/// DTO for updating a trigger rule; all fields optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateRule {
    pub name: Option<String>,
    pub role_id: Option<DbId>,
    pub action: Option<i16>,
    pub priority: Option<i32>,
    pub length_from_due_days: Option<i32>,
    pub length_comparator: Option<i16>,
    pub elapsed_from_request_days: Option<i32>,
    pub elapsed_comparator: Option<i16>,
    pub templates: Option<serde_json::Value>,
}
