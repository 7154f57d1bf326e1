//! Route-admission guards.
//!
//! A guard is a pure, synchronous decision over the current session: admit
//! the navigation or redirect it somewhere more useful. Guards never perform
//! I/O and produce at most one redirect per evaluation.

use crate::registry::RecordId;
use crate::session::SessionStore;
use crate::status::AccessStatus;
use serde::{Deserialize, Serialize};

/// The navigable surfaces of the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    /// Login / signup screen.
    Login,
    /// Access-status screen.
    Status,
    /// The protected application itself.
    Protected,
}

/// Parameters carried on a redirect so the destination screen can seed its
/// session without re-querying the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectParams {
    pub status: AccessStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_id: Option<RecordId>,
}

/// Outcome of one guard evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Admit,
    Redirect {
        to: Route,
        params: Option<RedirectParams>,
    },
}

impl GuardDecision {
    pub fn is_admit(&self) -> bool {
        matches!(self, Self::Admit)
    }
}

/// Guards the login/signup screen.
///
/// A caller whose request is still outstanding should not be asked to log in
/// again; they are sent to the status screen instead. Every other status
/// (including `rejected` and `approved`) renders the login form normally.
pub fn pre_auth_guard(store: &SessionStore) -> GuardDecision {
    let session = store.snapshot();
    if session.status.awaits_decision() {
        return GuardDecision::Redirect {
            to: Route::Status,
            params: Some(RedirectParams {
                status: AccessStatus::Pending,
                record_id: session.record_id,
            }),
        };
    }
    GuardDecision::Admit
}

/// Guards the protected application.
///
/// Admits only an explicitly admitted session. A denied caller with a known
/// status is sent to the status screen carrying that status; only a caller
/// with no status at all falls back to the login screen.
pub fn protected_guard(store: &SessionStore) -> GuardDecision {
    let session = store.snapshot();
    if session.admitted {
        return GuardDecision::Admit;
    }

    if session.status != AccessStatus::None {
        return GuardDecision::Redirect {
            to: Route::Status,
            params: Some(RedirectParams {
                status: session.status,
                record_id: session.record_id,
            }),
        };
    }

    GuardDecision::Redirect {
        to: Route::Login,
        params: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pre_auth_admits_empty_session() {
        let store = SessionStore::new();
        assert!(pre_auth_guard(&store).is_admit());
    }

    #[test]
    fn test_pre_auth_redirects_outstanding_request() {
        let store = SessionStore::new();
        store.seed(AccessStatus::Pending, Some(RecordId::new("r1")));
        assert_eq!(
            pre_auth_guard(&store),
            GuardDecision::Redirect {
                to: Route::Status,
                params: Some(RedirectParams {
                    status: AccessStatus::Pending,
                    record_id: Some(RecordId::new("r1")),
                }),
            }
        );
    }

    #[test]
    fn test_pre_auth_collapses_submitted_into_pending() {
        let store = SessionStore::new();
        store.seed(AccessStatus::Submitted, Some(RecordId::new("r1")));
        match pre_auth_guard(&store) {
            GuardDecision::Redirect { to, params } => {
                assert_eq!(to, Route::Status);
                assert_eq!(params.unwrap().status, AccessStatus::Pending);
            }
            GuardDecision::Admit => panic!("submitted request must not re-render login"),
        }
    }

    #[test]
    fn test_pre_auth_admits_rejected_and_approved() {
        let store = SessionStore::new();
        store.seed(AccessStatus::Rejected, Some(RecordId::new("r1")));
        assert!(pre_auth_guard(&store).is_admit());
        store.seed(AccessStatus::Approved, Some(RecordId::new("r1")));
        assert!(pre_auth_guard(&store).is_admit());
    }

    #[test]
    fn test_protected_requires_explicit_admission() {
        let store = SessionStore::new();
        store.seed(AccessStatus::Approved, Some(RecordId::new("r1")));
        // Approved but not admitted: status screen, not the application.
        match protected_guard(&store) {
            GuardDecision::Redirect { to, .. } => assert_eq!(to, Route::Status),
            GuardDecision::Admit => panic!("observation of approval must not admit"),
        }

        store.mark_admitted();
        assert!(protected_guard(&store).is_admit());
    }

    #[test]
    fn test_protected_fallback_prefers_status_screen() {
        let store = SessionStore::new();
        store.seed(AccessStatus::Rejected, Some(RecordId::new("r9")));
        assert_eq!(
            protected_guard(&store),
            GuardDecision::Redirect {
                to: Route::Status,
                params: Some(RedirectParams {
                    status: AccessStatus::Rejected,
                    record_id: Some(RecordId::new("r9")),
                }),
            }
        );
    }

    #[test]
    fn test_protected_falls_back_to_login_when_nothing_is_known() {
        let store = SessionStore::new();
        assert_eq!(
            protected_guard(&store),
            GuardDecision::Redirect {
                to: Route::Login,
                params: None,
            }
        );
    }

    #[test]
    fn test_logout_drops_back_to_login() {
        let store = SessionStore::new();
        store.seed_admitted(RecordId::new("r1"));
        assert!(protected_guard(&store).is_admit());

        store.clear();
        assert_eq!(
            protected_guard(&store),
            GuardDecision::Redirect {
                to: Route::Login,
                params: None,
            }
        );
    }
}
