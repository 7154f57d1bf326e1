//! Process-wide session store: what we currently believe about the caller's
//! access state.
//!
//! The store is the ONLY shared mutable state in the crate. Every mutation
//! replaces the session wholesale, so a reader never observes a
//! status/record-id pair that did not co-occur in some server response or
//! local seed. Each mutation broadcasts a snapshot on a watch channel for
//! screens that render live updates.
//!
//! The store performs no I/O and never navigates; seeding it and acting on
//! it are the callers' jobs.

use crate::registry::RecordId;
use crate::status::AccessStatus;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;

/// The session triple.
///
/// Invariants, maintained by [`SessionStore`]:
/// - `admitted` implies `status == Approved`.
/// - `record_id` is present only when `status != None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub status: AccessStatus,
    pub record_id: Option<RecordId>,
    /// One-way "cleared to enter the protected area" flag. Distinct from
    /// merely observing `Approved`: only the explicit admission step sets it.
    pub admitted: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            status: AccessStatus::None,
            record_id: None,
            admitted: false,
        }
    }
}

struct Inner {
    session: Mutex<Session>,
    snapshot_tx: watch::Sender<Session>,
}

/// Cheap-clone handle to the process-wide session.
///
/// Created once at process start; passed into the poller, the guards, and
/// the screens rather than reached for as ambient state.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        let initial = Session::default();
        let (snapshot_tx, _) = watch::channel(initial.clone());
        Self {
            inner: Arc::new(Inner {
                session: Mutex::new(initial),
                snapshot_tx,
            }),
        }
    }

    /// Replaces the session wholesale with `status` and `record_id`.
    ///
    /// Plain seeding never implies admission, even for `Approved`: a poller
    /// tick that merely observes approval must stay distinct from the
    /// controlled "enter now" action.
    pub fn seed(&self, status: AccessStatus, record_id: Option<RecordId>) {
        // A record id without a status makes no sense; drop it rather than
        // store an inconsistent pair.
        let record_id = if status == AccessStatus::None {
            None
        } else {
            record_id
        };
        self.replace(Session {
            status,
            record_id,
            admitted: false,
        });
    }

    /// Seeds an already-admitted session in one step.
    ///
    /// This is the explicit confirmation path used when a login observes an
    /// approved record and routes straight into the protected area.
    pub fn seed_admitted(&self, record_id: RecordId) {
        self.replace(Session {
            status: AccessStatus::Approved,
            record_id: Some(record_id),
            admitted: true,
        });
    }

    /// Grants admission. Idempotent; forces `status = Approved` so the
    /// admitted-implies-approved invariant holds regardless of prior state.
    pub fn mark_admitted(&self) {
        let mut next = self.snapshot();
        next.admitted = true;
        next.status = AccessStatus::Approved;
        self.replace(next);
    }

    /// Resets to the initial triple. Used on logout and on an unrecoverable
    /// `none` (record deleted server-side).
    pub fn clear(&self) {
        self.replace(Session::default());
    }

    pub fn current_status(&self) -> AccessStatus {
        self.snapshot().status
    }

    pub fn current_record_id(&self) -> Option<RecordId> {
        self.snapshot().record_id
    }

    pub fn is_admitted(&self) -> bool {
        self.snapshot().admitted
    }

    /// Returns a copy of the current session.
    pub fn snapshot(&self) -> Session {
        self.lock().clone()
    }

    /// Subscribes to session snapshots; a fresh snapshot is broadcast after
    /// every mutation.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.inner.snapshot_tx.subscribe()
    }

    fn replace(&self, next: Session) {
        {
            let mut session = self.lock();
            if *session == next {
                return;
            }
            *session = next.clone();
        }
        let _ = self.inner.snapshot_tx.send(next);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Session> {
        // Mutations are whole-record swaps, so a poisoned lock cannot hold
        // a torn session.
        self.inner
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
