//! Status-screen transition controller.
//!
//! Orchestrates one instance of the access-status screen: seeds the session
//! store from navigation parameters (or the store's own memory), decides
//! whether reconciliation polling is warranted, projects the session onto
//! human-facing copy, and owns the one deliberate place where admission is
//! granted.

use crate::guards::{RedirectParams, Route};
use crate::poller::{PollerHandle, StatusPoller};
use crate::registry::{IdentityProvider, RegistryKey};
use crate::session::{Session, SessionStore};
use crate::status::AccessStatus;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;

/// Navigation parameters seeding a status screen, as carried on a redirect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavParams {
    pub status: AccessStatus,
    #[serde(default)]
    pub record_id: Option<crate::registry::RecordId>,
}

impl From<RedirectParams> for NavParams {
    fn from(params: RedirectParams) -> Self {
        Self {
            status: params.status,
            record_id: params.record_id,
        }
    }
}

/// Where to reach the administrator when a request was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminContact {
    pub username: String,
    pub url: String,
}

impl Default for AdminContact {
    fn default() -> Self {
        Self {
            username: "admin".to_string(),
            url: "https://t.me/admin".to_string(),
        }
    }
}

/// Read-only projection of the session for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenView {
    pub status: AccessStatus,
    pub title: &'static str,
    pub description: &'static str,
    /// The proceed affordance is rendered only for an approved session.
    pub can_proceed: bool,
    /// The contact-admin affordance, rendered for a rejected session.
    pub contact: Option<AdminContact>,
}

/// One status-screen instance.
pub struct StatusScreen {
    store: SessionStore,
    poller: StatusPoller,
    identity: Arc<dyn IdentityProvider>,
    admin_contact: AdminContact,
    handle: Option<PollerHandle>,
}

impl StatusScreen {
    pub fn new(
        store: SessionStore,
        poller: StatusPoller,
        identity: Arc<dyn IdentityProvider>,
        admin_contact: AdminContact,
    ) -> Self {
        Self {
            store,
            poller,
            identity,
            admin_contact,
            handle: None,
        }
    }

    /// Activates the screen.
    ///
    /// An explicit navigation seed (the "just submitted" / "just logged in"
    /// entry points) wins over whatever the store already holds; with
    /// neither, the status is `none`. Polling starts only for an
    /// outstanding request.
    pub fn activate(&mut self, nav: Option<NavParams>) {
        let (status, record_id) = match nav {
            Some(nav) => (nav.status, nav.record_id),
            None => {
                let session = self.store.snapshot();
                (session.status, session.record_id)
            }
        };

        match status {
            AccessStatus::None => {
                // Dead end: a fresh submission is the only way forward.
                self.store.seed(AccessStatus::None, None);
            }
            AccessStatus::Submitted | AccessStatus::Pending => {
                self.store.seed(status, record_id.clone());
                let key = record_id
                    .map(RegistryKey::Record)
                    .or_else(|| self.identity.current_identity().map(RegistryKey::Identity));
                self.handle = self.poller.start(key);
            }
            AccessStatus::Rejected | AccessStatus::Approved => {
                // Already terminal; nothing left to reconcile.
                self.store.seed(status, record_id);
            }
        }
    }

    /// Projects the current session onto the screen copy.
    pub fn view(&self) -> ScreenView {
        let status = self.store.current_status();
        let (title, description) = copy_for(status);
        ScreenView {
            status,
            title,
            description,
            can_proceed: status == AccessStatus::Approved,
            contact: (status == AccessStatus::Rejected).then(|| self.admin_contact.clone()),
        }
    }

    /// The proceed affordance: grants admission and navigates into the
    /// protected area. Does nothing unless the session is approved.
    pub fn proceed(&mut self) -> Option<Route> {
        if self.store.current_status() != AccessStatus::Approved {
            return None;
        }
        self.store.mark_admitted();
        self.teardown();
        Some(Route::Protected)
    }

    /// Live session updates for the presentation layer.
    pub fn updates(&self) -> watch::Receiver<Session> {
        self.store.subscribe()
    }

    /// Whether a reconciliation task is currently running for this screen.
    pub fn is_polling(&self) -> bool {
        match &self.handle {
            Some(handle) => !handle.is_finished(),
            None => false,
        }
    }

    /// Releases the screen's resources. Runs on every exit path; also
    /// invoked by `Drop`, so navigating away can never leak the poller.
    pub fn teardown(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.stop();
        }
    }
}

impl Drop for StatusScreen {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn copy_for(status: AccessStatus) -> (&'static str, &'static str) {
    match status {
        AccessStatus::None => (
            "Access request not found",
            "No request exists for this account. Submit a new access request to continue.",
        ),
        AccessStatus::Submitted => (
            "Access request sent",
            "Your details were received. An administrator is reviewing your photo and access key.",
        ),
        AccessStatus::Pending => (
            "Request awaiting confirmation",
            "Your request is in the system and awaits an administrator decision.",
        ),
        AccessStatus::Approved => (
            "Access granted",
            "An administrator approved your request. You can proceed to the application.",
        ),
        AccessStatus::Rejected => (
            "Access not confirmed",
            "An administrator declined access for this key. If this is a mistake, contact the administrator.",
        ),
    }
}
