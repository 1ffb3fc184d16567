//! Named notification templates attached to a trigger rule.
//!
//! A rule carries up to two message templates: `notify` for the role
//! holders it subscribes, and `user` for the request owner. They are
//! stored as a JSON object and validated against that fixed key set when
//! the rule is loaded, so an unknown key is a configuration error rather
//! than a silently ignored field.

use std::collections::BTreeMap;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;

/// Template sent to users subscribed by the rule.
pub const TEMPLATE_NOTIFY: &str = "notify";

/// Template sent to the owner of the request.
pub const TEMPLATE_USER: &str = "user";

/// All keys a rule's template object may contain.
pub const KNOWN_TEMPLATE_KEYS: &[&str] = &[TEMPLATE_NOTIFY, TEMPLATE_USER];

// ---------------------------------------------------------------------------
// TemplateSet
// ---------------------------------------------------------------------------

/// The named message templates of one rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateSet {
    pub notify: Option<String>,
    pub user: Option<String>,
}

impl TemplateSet {
    /// Decode a stored template object.
    ///
    /// Accepts JSON `null` (no templates) or an object whose keys all come
    /// from [`KNOWN_TEMPLATE_KEYS`] and whose values are strings.
    pub fn from_value(value: &Value) -> Result<Self, CoreError> {
        let map = match value {
            Value::Null => return Ok(Self::default()),
            Value::Object(map) => map,
            other => {
                return Err(CoreError::Configuration(format!(
                    "templates must be an object, got {other}"
                )))
            }
        };

        let mut set = Self::default();
        for (key, value) in map {
            let text = value.as_str().ok_or_else(|| {
                CoreError::Configuration(format!("template '{key}' must be a string"))
            })?;
            match key.as_str() {
                TEMPLATE_NOTIFY => set.notify = Some(text.to_string()),
                TEMPLATE_USER => set.user = Some(text.to_string()),
                unknown => {
                    return Err(CoreError::Configuration(format!(
                        "unknown template key '{unknown}', expected one of: {}",
                        KNOWN_TEMPLATE_KEYS.join(", ")
                    )))
                }
            }
        }
        Ok(set)
    }

    /// Encode back to the stored JSON object shape.
    pub fn to_value(&self) -> Value {
        let mut map = serde_json::Map::new();
        if let Some(notify) = &self.notify {
            map.insert(TEMPLATE_NOTIFY.to_string(), Value::String(notify.clone()));
        }
        if let Some(user) = &self.user {
            map.insert(TEMPLATE_USER.to_string(), Value::String(user.clone()));
        }
        Value::Object(map)
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Substitute `{placeholder}` tokens from the given context.
///
/// Unknown placeholders are left intact so a misconfigured template is
/// visible in the delivered message rather than silently blanked.
pub fn render(template: &str, context: &BTreeMap<String, String>) -> String {
    let re = match Regex::new(r"\{([a-z_]+)\}") {
        Ok(re) => re,
        Err(_) => return template.to_string(),
    };
    re.replace_all(template, |caps: &regex::Captures| {
        context
            .get(&caps[1])
            .cloned()
            .unwrap_or_else(|| caps[0].to_string())
    })
    .into_owned()
}
