//! Signup and login flow against the request-submission endpoint and the
//! access registry.
//!
//! Each operation returns a [`FlowOutcome`] naming the route the caller
//! should land on next, with redirect parameters when the destination is the
//! status screen. I/O failures surface as retryable errors here and never
//! leave the session half-seeded.

use crate::guards::{RedirectParams, Route};
use crate::registry::{
    AccessRegistry, AccessRequests, IdentityProvider, PhotoStore, RegistryKey, SignupRequest,
};
use crate::session::SessionStore;
use crate::status::AccessStatus;
use anyhow::{bail, Context, Result};
use std::sync::Arc;

/// Where a flow operation lands the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowOutcome {
    pub route: Route,
    pub params: Option<RedirectParams>,
}

impl FlowOutcome {
    fn status_screen(status: AccessStatus, record_id: Option<crate::registry::RecordId>) -> Self {
        Self {
            route: Route::Status,
            params: Some(RedirectParams { status, record_id }),
        }
    }
}

/// Orchestrates signup, login, resume, and logout.
pub struct AuthFlow {
    identity: Arc<dyn IdentityProvider>,
    registry: Arc<dyn AccessRegistry>,
    requests: Arc<dyn AccessRequests>,
    photos: Arc<dyn PhotoStore>,
    store: SessionStore,
}

impl AuthFlow {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        registry: Arc<dyn AccessRegistry>,
        requests: Arc<dyn AccessRequests>,
        photos: Arc<dyn PhotoStore>,
        store: SessionStore,
    ) -> Self {
        Self {
            identity,
            registry,
            requests,
            photos,
            store,
        }
    }

    /// Submits a new access request.
    ///
    /// The optional photo is uploaded first; an upload failure aborts before
    /// anything is submitted. A submission failure clears the session back to
    /// `none` and surfaces a retryable error; nothing retries automatically.
    pub async fn signup(
        &self,
        display_name: &str,
        secret_key: &str,
        photo: Option<(Vec<u8>, &str)>,
    ) -> Result<FlowOutcome> {
        let identity = match self.identity.current_identity() {
            Some(identity) => identity,
            None => {
                self.store.clear();
                bail!("no caller identity; this screen must run inside the host application");
            }
        };

        let photo_ref = match photo {
            Some((bytes, extension)) => Some(
                self.photos
                    .store(bytes, extension)
                    .await
                    .context("failed to upload photo")?,
            ),
            None => None,
        };

        let created = match self
            .requests
            .submit(SignupRequest {
                identity,
                display_name: display_name.to_string(),
                secret_key: secret_key.to_string(),
                photo: photo_ref,
            })
            .await
        {
            Ok(created) => created,
            Err(err) => {
                self.store.clear();
                return Err(err).context("failed to submit access request");
            }
        };

        tracing::info!(record_id = %created.record_id, "access request submitted");
        self.store
            .seed(AccessStatus::Pending, Some(created.record_id.clone()));
        Ok(FlowOutcome::status_screen(
            AccessStatus::Pending,
            Some(created.record_id),
        ))
    }

    /// Logs in with the caller's secret key.
    ///
    /// An approved record is the one place login itself confirms admission:
    /// the caller already holds a valid key for an approved request, so the
    /// session is seeded admitted and routed straight into the application.
    pub async fn login(&self, secret_key: &str) -> Result<FlowOutcome> {
        let identity = match self.identity.current_identity() {
            Some(identity) => identity,
            None => {
                self.store.clear();
                bail!("no caller identity; this screen must run inside the host application");
            }
        };

        let record = self
            .registry
            .lookup_by_secret(identity, secret_key)
            .await
            .context("login lookup failed")?;

        let record = match record {
            Some(record) => record,
            None => {
                self.store.seed(AccessStatus::None, None);
                return Ok(FlowOutcome::status_screen(AccessStatus::None, None));
            }
        };

        match record.status {
            AccessStatus::Submitted | AccessStatus::Pending => {
                self.store
                    .seed(AccessStatus::Pending, Some(record.record_id.clone()));
                Ok(FlowOutcome::status_screen(
                    AccessStatus::Pending,
                    Some(record.record_id),
                ))
            }
            AccessStatus::Rejected => {
                self.store
                    .seed(AccessStatus::Rejected, Some(record.record_id.clone()));
                Ok(FlowOutcome::status_screen(
                    AccessStatus::Rejected,
                    Some(record.record_id),
                ))
            }
            AccessStatus::Approved => {
                self.store.seed_admitted(record.record_id);
                Ok(FlowOutcome {
                    route: Route::Protected,
                    params: None,
                })
            }
            AccessStatus::None => {
                self.store.seed(AccessStatus::None, None);
                Ok(FlowOutcome::status_screen(AccessStatus::None, None))
            }
        }
    }

    /// Pre-auth activation check: a caller with an outstanding request is
    /// sent to the status screen instead of the login form.
    ///
    /// Transient lookup errors are swallowed; the login form still renders.
    pub async fn resume_check(&self) -> Option<FlowOutcome> {
        let identity = self.identity.current_identity()?;

        let record = match self
            .registry
            .lookup(&RegistryKey::Identity(identity))
            .await
        {
            Ok(record) => record?,
            Err(err) => {
                tracing::warn!(error = %err, "resume check failed; rendering login form");
                return None;
            }
        };

        if !record.status.awaits_decision() {
            return None;
        }

        self.store
            .seed(AccessStatus::Pending, Some(record.record_id.clone()));
        Some(FlowOutcome::status_screen(
            AccessStatus::Pending,
            Some(record.record_id),
        ))
    }

    /// Clears the session and drops back to the login screen.
    pub fn logout(&self) -> FlowOutcome {
        self.store.clear();
        FlowOutcome {
            route: Route::Login,
            params: None,
        }
    }
}
