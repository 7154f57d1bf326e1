//! Access-status reconciliation for a gated application.
//!
//! A caller requests access, a human administrator approves or rejects the
//! request out-of-band, and the caller transitions into the application once
//! approved. The crate's core is the session/status state machine: a
//! process-wide [`session::SessionStore`] holding the current belief, a
//! [`poller::StatusPoller`] reconciling that belief against the
//! authoritative [`registry::AccessRegistry`], the [`guards`] gating route
//! entry, and the [`screen::StatusScreen`] controller driving the status
//! screen's transitions.

pub mod auth;
pub mod guards;
pub mod poller;
pub mod registry;
pub mod screen;
pub mod session;
pub mod status;

#[cfg(test)]
mod scenario_tests;

pub use auth::{AuthFlow, FlowOutcome};
pub use guards::{pre_auth_guard, protected_guard, GuardDecision, RedirectParams, Route};
pub use poller::{PollerConfig, PollerHandle, StatusPoller};
pub use session::{Session, SessionStore};
pub use status::AccessStatus;
