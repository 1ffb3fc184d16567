//! Request-item approval state machine.
//!
//! Transition legality depends on the current state and on whether the
//! caller is authorized to decide the item (holds approval access or a
//! force capability). The table is static; there is no instance state.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// RequestState
// ---------------------------------------------------------------------------

/// Lifecycle state of one request item, matching the `request_items.state`
/// column (1-based SMALLINT).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestState {
    New = 1,
    Approved = 2,
    Denied = 3,
    Reopened = 4,
    Cancelled = 5,
}

impl RequestState {
    /// Decode a stored SMALLINT value.
    pub fn from_i16(value: i16) -> Option<Self> {
        match value {
            1 => Some(Self::New),
            2 => Some(Self::Approved),
            3 => Some(Self::Denied),
            4 => Some(Self::Reopened),
            5 => Some(Self::Cancelled),
            _ => None,
        }
    }

    pub fn as_i16(self) -> i16 {
        self as i16
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Approved => "approved",
            Self::Denied => "denied",
            Self::Reopened => "reopened",
            Self::Cancelled => "cancelled",
        }
    }

    /// States in which an item still awaits a decision and the trigger
    /// sweep keeps evaluating it.
    pub fn is_open(self) -> bool {
        matches!(self, Self::New | Self::Reopened)
    }
}

// ---------------------------------------------------------------------------
// Transition table
// ---------------------------------------------------------------------------

/// Returns the set of states reachable from `current`.
///
/// `approved` is the caller's authorization: true when the caller can
/// force-change state or holds Approve/ForceApprove access on the item.
pub fn possible_states(current: RequestState, approved: bool) -> &'static [RequestState] {
    use RequestState::*;
    match (current, approved) {
        (New, false) => &[Cancelled],
        (New, true) => &[Cancelled, Approved, Denied],
        (Reopened, false) => &[Cancelled],
        (Reopened, true) => &[Cancelled, Denied, Approved],
        (Denied, false) => &[],
        (Denied, true) => &[Approved, Reopened, Cancelled],
        // Cancellation is undone by reopening, authorized or not.
        (Cancelled, _) => &[Reopened],
        (Approved, false) => &[],
        (Approved, true) => &[Cancelled, Denied],
    }
}

/// Check whether a transition from `current` to `requested` is allowed.
pub fn state_is_possible(current: RequestState, requested: RequestState, approved: bool) -> bool {
    possible_states(current, approved).contains(&requested)
}

/// Validate a transition, returning a descriptive error for illegal ones.
pub fn validate_transition(
    current: RequestState,
    requested: RequestState,
    approved: bool,
) -> Result<(), String> {
    if state_is_possible(current, requested, approved) {
        Ok(())
    } else {
        Err(format!(
            "Invalid transition: {} -> {} (approved: {approved})",
            current.as_str(),
            requested.as_str()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use RequestState::*;

    const ALL: [RequestState; 5] = [New, Approved, Denied, Reopened, Cancelled];

    /// The full legality table; everything not listed here must be refused.
    fn allowed(current: RequestState, requested: RequestState, approved: bool) -> bool {
        match (current, requested, approved) {
            (New, Cancelled, _) => true,
            (New, Approved, true) | (New, Denied, true) => true,
            (Reopened, Cancelled, _) => true,
            (Reopened, Approved, true) | (Reopened, Denied, true) => true,
            (Denied, Approved, true) | (Denied, Reopened, true) | (Denied, Cancelled, true) => true,
            (Cancelled, Reopened, _) => true,
            (Approved, Cancelled, true) | (Approved, Denied, true) => true,
            _ => false,
        }
    }

    #[test]
    fn transition_table_is_exhaustive() {
        for current in ALL {
            for requested in ALL {
                for approved in [false, true] {
                    assert_eq!(
                        state_is_possible(current, requested, approved),
                        allowed(current, requested, approved),
                        "mismatch for {current:?} -> {requested:?} (approved: {approved})"
                    );
                }
            }
        }
    }

    #[test]
    fn unauthorized_caller_can_only_cancel_new() {
        assert!(state_is_possible(New, Cancelled, false));
        assert!(!state_is_possible(New, Approved, false));
        assert!(!state_is_possible(New, Denied, false));
    }

    #[test]
    fn authorization_does_not_unlock_reopening_approved() {
        assert!(!state_is_possible(Approved, Reopened, true));
    }

    #[test]
    fn cancelled_can_be_reopened_without_authorization() {
        assert!(state_is_possible(Cancelled, Reopened, false));
        assert!(state_is_possible(Cancelled, Reopened, true));
        assert!(!state_is_possible(Cancelled, Approved, true));
    }

    #[test]
    fn denied_is_terminal_for_unauthorized_callers() {
        for requested in ALL {
            assert!(!state_is_possible(Denied, requested, false));
        }
    }

    #[test]
    fn no_self_transitions() {
        for state in ALL {
            for approved in [false, true] {
                assert!(!state_is_possible(state, state, approved));
            }
        }
    }

    #[test]
    fn validate_transition_err_names_both_states() {
        let err = validate_transition(Approved, Reopened, true).unwrap_err();
        assert!(err.contains("approved"));
        assert!(err.contains("reopened"));
    }

    #[test]
    fn i16_round_trip() {
        for state in ALL {
            assert_eq!(RequestState::from_i16(state.as_i16()), Some(state));
        }
        assert_eq!(RequestState::from_i16(0), None);
        assert_eq!(RequestState::from_i16(6), None);
    }

    #[test]
    fn open_states() {
        assert!(New.is_open());
        assert!(Reopened.is_open());
        assert!(!Approved.is_open());
        assert!(!Denied.is_open());
        assert!(!Cancelled.is_open());
    }
}
