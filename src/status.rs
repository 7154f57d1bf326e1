//! The access lifecycle status value type.
//!
//! Every decision that depends on the caller's position in the access
//! lifecycle matches exhaustively on [`AccessStatus`]. There is no implicit
//! default other than [`AccessStatus::None`]; any code path that cannot
//! determine a status must set `None` explicitly rather than fall through.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The caller's current position in the access lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessStatus {
    /// No registry record exists for this identity, or the identity is unknown.
    None,
    /// A signup request was just created locally; not yet confirmed server-side.
    Submitted,
    /// A registry record exists and awaits an administrator decision.
    Pending,
    /// Terminal-positive: admission granted by an administrator.
    Approved,
    /// Terminal-negative: admission denied. The caller may still contact an
    /// administrator or submit a fresh request.
    Rejected,
}

impl AccessStatus {
    /// Returns true for statuses the reconciliation poller treats as final.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }

    /// Returns true while an administrator decision is still outstanding.
    ///
    /// `Submitted` is the locally-created pre-state and collapses into
    /// `Pending` for every decision that cares about an outstanding request.
    pub fn awaits_decision(self) -> bool {
        matches!(self, Self::Submitted | Self::Pending)
    }
}

impl fmt::Display for AccessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::Submitted => "submitted",
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_statuses() {
        assert!(AccessStatus::Approved.is_terminal());
        assert!(AccessStatus::Rejected.is_terminal());
        assert!(!AccessStatus::Pending.is_terminal());
        assert!(!AccessStatus::Submitted.is_terminal());
        assert!(!AccessStatus::None.is_terminal());
    }

    #[test]
    fn test_submitted_collapses_into_pending() {
        assert!(AccessStatus::Submitted.awaits_decision());
        assert!(AccessStatus::Pending.awaits_decision());
        assert!(!AccessStatus::Approved.awaits_decision());
    }

    #[test]
    fn test_serde_snake_case() {
        let json = serde_json::to_string(&AccessStatus::Pending).unwrap();
        assert_eq!(json, "\"pending\"");
        let back: AccessStatus = serde_json::from_str("\"rejected\"").unwrap();
        assert_eq!(back, AccessStatus::Rejected);
    }
}
