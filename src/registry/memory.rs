//! In-memory registry used by the demo binary and the test suite.
//!
//! Holds one row per identity and exposes the administrator-side mutations
//! (approve/reject/remove) that normally happen out-of-band, plus fault
//! injection knobs for exercising the poller's error handling.

use super::{
    AccessRegistry, AccessRequests, CreatedRecord, IdentityId, IdentityProvider, PhotoRef,
    PhotoStore, RecordId, RegistryError, RegistryKey, SignupRequest, StatusRecord,
};
use crate::status::AccessStatus;
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
struct ProfileRow {
    record_id: RecordId,
    identity: IdentityId,
    display_name: String,
    secret_key: String,
    photo: Option<PhotoRef>,
    status: AccessStatus,
    updated_at: String,
}

impl ProfileRow {
    fn to_record(&self) -> StatusRecord {
        StatusRecord {
            record_id: self.record_id.clone(),
            status: self.status,
            updated_at: self.updated_at.clone(),
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    rows: Vec<ProfileRow>,
    failing_lookups: usize,
    failing_submits: usize,
    lookup_delay: Duration,
    lookups: usize,
}

/// In-memory access registry, submission endpoint, and photo store.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    inner: Mutex<Inner>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a record directly, bypassing the submission endpoint.
    pub async fn insert(
        &self,
        identity: IdentityId,
        secret_key: &str,
        status: AccessStatus,
    ) -> RecordId {
        let record_id = RecordId::new(uuid::Uuid::new_v4().to_string());
        let mut inner = self.inner.lock().await;
        inner.rows.push(ProfileRow {
            record_id: record_id.clone(),
            identity,
            display_name: String::new(),
            secret_key: secret_key.to_string(),
            photo: None,
            status,
            updated_at: chrono::Utc::now().to_rfc3339(),
        });
        record_id
    }

    /// Administrator decision: grant access for `record_id`.
    pub async fn approve(&self, record_id: &RecordId) {
        self.set_status(record_id, AccessStatus::Approved).await;
    }

    /// Administrator decision: deny access for `record_id`.
    pub async fn reject(&self, record_id: &RecordId) {
        self.set_status(record_id, AccessStatus::Rejected).await;
    }

    /// Deletes the record, as an administrator purging a request would.
    pub async fn remove(&self, record_id: &RecordId) {
        let mut inner = self.inner.lock().await;
        inner.rows.retain(|row| &row.record_id != record_id);
    }

    /// Makes the next `n` lookups fail with an upstream error.
    pub async fn fail_next_lookups(&self, n: usize) {
        self.inner.lock().await.failing_lookups = n;
    }

    /// Makes the next `n` submissions fail with an upstream error.
    pub async fn fail_next_submits(&self, n: usize) {
        self.inner.lock().await.failing_submits = n;
    }

    /// Delays every lookup by `delay` before it resolves. Used to simulate
    /// an in-flight query outliving a `stop()` call.
    pub async fn set_lookup_delay(&self, delay: Duration) {
        self.inner.lock().await.lookup_delay = delay;
    }

    async fn set_status(&self, record_id: &RecordId, status: AccessStatus) {
        let mut inner = self.inner.lock().await;
        if let Some(row) = inner.rows.iter_mut().find(|row| &row.record_id == record_id) {
            row.status = status;
            row.updated_at = chrono::Utc::now().to_rfc3339();
        }
    }

    /// Number of status lookups issued so far (including failed ones).
    /// Login lookups by secret are not counted.
    pub async fn lookup_count(&self) -> usize {
        self.inner.lock().await.lookups
    }

    /// Returns the display name and photo stored for a record.
    pub async fn stored_profile(&self, record_id: &RecordId) -> Option<(String, Option<PhotoRef>)> {
        let inner = self.inner.lock().await;
        inner
            .rows
            .iter()
            .find(|row| &row.record_id == record_id)
            .map(|row| (row.display_name.clone(), row.photo.clone()))
    }

    async fn consume_lookup_fault(&self, count: bool) -> Result<Duration, RegistryError> {
        let mut inner = self.inner.lock().await;
        if count {
            inner.lookups += 1;
        }
        if inner.failing_lookups > 0 {
            inner.failing_lookups -= 1;
            return Err(RegistryError::Upstream {
                message: "injected lookup failure".to_string(),
            });
        }
        Ok(inner.lookup_delay)
    }
}

#[async_trait]
impl AccessRegistry for MemoryRegistry {
    async fn lookup(&self, key: &RegistryKey) -> Result<Option<StatusRecord>, RegistryError> {
        let delay = self.consume_lookup_fault(true).await?;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let inner = self.inner.lock().await;
        let row = inner.rows.iter().find(|row| match key {
            RegistryKey::Identity(id) => row.identity == *id,
            RegistryKey::Record(record_id) => row.record_id == *record_id,
        });
        Ok(row.map(ProfileRow::to_record))
    }

    async fn lookup_by_secret(
        &self,
        identity: IdentityId,
        secret_key: &str,
    ) -> Result<Option<StatusRecord>, RegistryError> {
        let delay = self.consume_lookup_fault(false).await?;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let inner = self.inner.lock().await;
        let row = inner
            .rows
            .iter()
            .find(|row| row.identity == identity && row.secret_key == secret_key);
        Ok(row.map(ProfileRow::to_record))
    }
}

#[async_trait]
impl AccessRequests for MemoryRegistry {
    async fn submit(&self, request: SignupRequest) -> Result<CreatedRecord, RegistryError> {
        let mut inner = self.inner.lock().await;
        if inner.failing_submits > 0 {
            inner.failing_submits -= 1;
            return Err(RegistryError::Upstream {
                message: "injected submission failure".to_string(),
            });
        }

        // A resubmission replaces the identity's previous request.
        inner.rows.retain(|row| row.identity != request.identity);

        let record_id = RecordId::new(uuid::Uuid::new_v4().to_string());
        inner.rows.push(ProfileRow {
            record_id: record_id.clone(),
            identity: request.identity,
            display_name: request.display_name,
            secret_key: request.secret_key,
            photo: request.photo,
            status: AccessStatus::Pending,
            updated_at: chrono::Utc::now().to_rfc3339(),
        });

        Ok(CreatedRecord {
            record_id,
            status: AccessStatus::Pending,
        })
    }
}

#[async_trait]
impl PhotoStore for MemoryRegistry {
    async fn store(&self, _bytes: Vec<u8>, extension: &str) -> Result<PhotoRef, RegistryError> {
        let name = uuid::Uuid::new_v4();
        Ok(PhotoRef::new(format!("memory://faces/{}.{}", name, extension)))
    }
}

/// Identity provider backed by a fixed value, standing in for the host
/// application's injected user.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedIdentity {
    id: Option<IdentityId>,
}

impl FixedIdentity {
    pub fn new(id: IdentityId) -> Self {
        Self { id: Some(id) }
    }

    /// An unauthenticated caller: the host supplied no user.
    pub fn anonymous() -> Self {
        Self { id: None }
    }
}

impl IdentityProvider for FixedIdentity {
    fn current_identity(&self) -> Option<IdentityId> {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_submit_then_lookup_by_identity() {
        let registry = MemoryRegistry::new();
        let created = registry
            .submit(SignupRequest {
                identity: IdentityId::new(42),
                display_name: "Test".to_string(),
                secret_key: "secret".to_string(),
                photo: None,
            })
            .await
            .unwrap();
        assert_eq!(created.status, AccessStatus::Pending);

        let found = registry
            .lookup(&RegistryKey::Identity(IdentityId::new(42)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.record_id, created.record_id);
        assert_eq!(found.status, AccessStatus::Pending);
    }

    #[tokio::test]
    async fn test_resubmission_replaces_previous_request() {
        let registry = MemoryRegistry::new();
        let first = registry
            .submit(SignupRequest {
                identity: IdentityId::new(7),
                display_name: "First".to_string(),
                secret_key: "a".to_string(),
                photo: None,
            })
            .await
            .unwrap();
        registry.reject(&first.record_id).await;

        let second = registry
            .submit(SignupRequest {
                identity: IdentityId::new(7),
                display_name: "Second".to_string(),
                secret_key: "b".to_string(),
                photo: None,
            })
            .await
            .unwrap();

        assert_ne!(first.record_id, second.record_id);
        // The rejected record is gone; only the new pending one remains.
        let old = registry
            .lookup(&RegistryKey::Record(first.record_id))
            .await
            .unwrap();
        assert!(old.is_none());
    }

    #[tokio::test]
    async fn test_injected_lookup_failure_is_consumed() {
        let registry = MemoryRegistry::new();
        registry.fail_next_lookups(1).await;

        let key = RegistryKey::Identity(IdentityId::new(1));
        assert!(registry.lookup(&key).await.is_err());
        assert!(registry.lookup(&key).await.is_ok());
    }

    #[tokio::test]
    async fn test_lookup_by_secret_requires_both_fields() {
        let registry = MemoryRegistry::new();
        registry
            .insert(IdentityId::new(9), "right", AccessStatus::Approved)
            .await;

        let wrong = registry
            .lookup_by_secret(IdentityId::new(9), "wrong")
            .await
            .unwrap();
        assert!(wrong.is_none());

        let right = registry
            .lookup_by_secret(IdentityId::new(9), "right")
            .await
            .unwrap();
        assert_eq!(right.unwrap().status, AccessStatus::Approved);
    }
}
