//! Subscription access levels granted by fired trigger rules.

use serde::{Deserialize, Serialize};

/// What a fired rule grants a user on a request item.
///
/// Stored as a SMALLINT. The discriminants are bitmask-compatible, which
/// is why `ForceApprove` sits at 4 rather than 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    /// No access granted; the synthetic level for users with no
    /// subscription row.
    Default = 0,
    /// May approve or deny the item, revocable by a later rule.
    Approve = 1,
    /// Observer: receives notifications but cannot decide.
    Subscribe = 2,
    /// May approve or deny; never downgraded by descendant rules.
    ForceApprove = 4,
}

impl AccessLevel {
    /// Decode a stored SMALLINT value.
    pub fn from_i16(value: i16) -> Option<Self> {
        match value {
            0 => Some(Self::Default),
            1 => Some(Self::Approve),
            2 => Some(Self::Subscribe),
            4 => Some(Self::ForceApprove),
            _ => None,
        }
    }

    pub fn as_i16(self) -> i16 {
        self as i16
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Approve => "approve",
            Self::Subscribe => "subscribe",
            Self::ForceApprove => "force_approve",
        }
    }

    /// Whether this level lets the holder approve or deny request items.
    pub fn can_approve(self) -> bool {
        matches!(self, Self::Approve | Self::ForceApprove)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn i16_round_trip() {
        for level in [
            AccessLevel::Default,
            AccessLevel::Approve,
            AccessLevel::Subscribe,
            AccessLevel::ForceApprove,
        ] {
            assert_eq!(AccessLevel::from_i16(level.as_i16()), Some(level));
        }
    }

    #[test]
    fn unknown_value_rejected() {
        assert_eq!(AccessLevel::from_i16(3), None);
        assert_eq!(AccessLevel::from_i16(99), None);
        assert_eq!(AccessLevel::from_i16(-1), None);
    }

    #[test]
    fn only_approve_levels_can_approve() {
        assert!(AccessLevel::Approve.can_approve());
        assert!(AccessLevel::ForceApprove.can_approve());
        assert!(!AccessLevel::Subscribe.can_approve());
        assert!(!AccessLevel::Default.can_approve());
    }
}
