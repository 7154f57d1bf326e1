//! External collaborators of the access-status machine.
//!
//! The access registry, the request-submission endpoint, blob storage, and
//! the identity provider are all remote or host-owned services. This module
//! defines the traits the core components consume; real transports (HTTP,
//! SDK clients) plug in behind them. [`memory`] provides the in-memory
//! implementation used by the demo binary and the tests.

pub mod memory;

use crate::status::AccessStatus;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Numeric identifier supplied by the identity provider (e.g. an external
/// user id). Absent entirely for an unauthenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdentityId(i64);

impl IdentityId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn value(self) -> i64 {
        self.0
    }
}

impl fmt::Display for IdentityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque identifier correlating a local session to a registry record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Publicly resolvable reference to an uploaded photo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoRef(String);

impl PhotoRef {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// The key used to address one registry record.
///
/// Some entry points know only the caller's identity, others carry the
/// record id from an earlier response. Both address the same record; which
/// one a poller uses is configuration, not a separate design.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryKey {
    Identity(IdentityId),
    Record(RecordId),
}

/// Errors from the registry boundary.
///
/// Every variant is transient from the poller's point of view: a flaky read
/// must never look like a rejection or a disappeared record. "Record not
/// found" is not an error; lookups return `Ok(None)` for it.
#[derive(Debug, Clone)]
pub enum RegistryError {
    /// Network-level failure reaching the registry.
    Transport { message: String },
    /// The upstream-enforced timeout elapsed.
    Timeout,
    /// The registry answered with a server-side error.
    Upstream { message: String },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport { message } => write!(f, "transport failure: {}", message),
            Self::Timeout => write!(f, "registry request timed out"),
            Self::Upstream { message } => write!(f, "upstream failure: {}", message),
        }
    }
}

impl std::error::Error for RegistryError {}

/// One authoritative registry record, as returned by a lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusRecord {
    pub record_id: RecordId,
    pub status: AccessStatus,
    /// Timestamp of the administrator's last decision (RFC3339 format).
    pub updated_at: String,
}

/// Payload accepted by the request-submission endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignupRequest {
    pub identity: IdentityId,
    pub display_name: String,
    pub secret_key: String,
    pub photo: Option<PhotoRef>,
}

/// Result of a successful submission: a fresh record in the initial state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedRecord {
    pub record_id: RecordId,
    pub status: AccessStatus,
}

/// The remote, authoritative store of per-requester status.
///
/// Eventually consistent with administrator decisions made out-of-band.
#[async_trait]
pub trait AccessRegistry: Send + Sync {
    /// Fetches the record addressed by `key`. `Ok(None)` means the record
    /// was deleted or never existed, which is terminal for the caller.
    async fn lookup(&self, key: &RegistryKey) -> Result<Option<StatusRecord>, RegistryError>;

    /// Login lookup: finds the record matching both the caller's identity
    /// and their secret key.
    async fn lookup_by_secret(
        &self,
        identity: IdentityId,
        secret_key: &str,
    ) -> Result<Option<StatusRecord>, RegistryError>;
}

/// The request-submission endpoint. Creates a registry record in the
/// initial `pending` state.
#[async_trait]
pub trait AccessRequests: Send + Sync {
    async fn submit(&self, request: SignupRequest) -> Result<CreatedRecord, RegistryError>;
}

/// Blob storage for the optional signup photo.
#[async_trait]
pub trait PhotoStore: Send + Sync {
    /// Uploads the bytes and returns a publicly resolvable reference.
    async fn store(&self, bytes: Vec<u8>, extension: &str) -> Result<PhotoRef, RegistryError>;
}

/// Supplies the caller's identity synchronously, when one exists.
pub trait IdentityProvider: Send + Sync {
    /// `None` means the caller is unauthenticated (e.g. the host application
    /// did not inject a user).
    fn current_identity(&self) -> Option<IdentityId>;
}
