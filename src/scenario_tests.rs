//! End-to-end scenarios wiring the flow, the status screen, the poller, and
//! the guards together.

use crate::auth::AuthFlow;
use crate::guards::{pre_auth_guard, protected_guard, GuardDecision, Route};
use crate::poller::{PollerConfig, StatusPoller};
use crate::registry::memory::{FixedIdentity, MemoryRegistry};
use crate::registry::IdentityId;
use crate::screen::{AdminContact, NavParams, StatusScreen};
use crate::session::SessionStore;
use crate::status::AccessStatus;
use std::sync::Arc;
use std::time::Duration;

struct Harness {
    registry: Arc<MemoryRegistry>,
    store: SessionStore,
    flow: AuthFlow,
    identity: Arc<FixedIdentity>,
}

fn harness(identity: FixedIdentity) -> Harness {
    let registry = Arc::new(MemoryRegistry::new());
    let store = SessionStore::new();
    let identity = Arc::new(identity);
    let flow = AuthFlow::new(
        identity.clone(),
        registry.clone(),
        registry.clone(),
        registry.clone(),
        store.clone(),
    );
    Harness {
        registry,
        store,
        flow,
        identity,
    }
}

impl Harness {
    fn screen(&self) -> StatusScreen {
        let poller = StatusPoller::new(
            self.registry.clone(),
            self.store.clone(),
            PollerConfig::default(),
        );
        StatusScreen::new(
            self.store.clone(),
            poller,
            self.identity.clone(),
            AdminContact::default(),
        )
    }
}

#[tokio::test(start_paused = true)]
async fn test_signup_approval_proceed_scenario() {
    let h = harness(FixedIdentity::new(IdentityId::new(42)));

    // Submit a signup with no photo.
    let outcome = h.flow.signup("Test", "secret", None).await.unwrap();
    let params = outcome.params.unwrap();
    let record_id = params.record_id.clone().unwrap();

    let session = h.store.snapshot();
    assert_eq!(session.status, AccessStatus::Pending);
    assert_eq!(session.record_id, Some(record_id.clone()));
    assert!(!session.admitted);

    // Land on the status screen; polling starts.
    let mut screen = h.screen();
    screen.activate(Some(NavParams {
        status: params.status,
        record_id: params.record_id,
    }));
    assert!(screen.is_polling());

    // The administrator approves while the caller waits.
    let admin = h.registry.clone();
    let admin_record = record_id.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(12)).await;
        admin.approve(&admin_record).await;
    });

    let mut updates = screen.updates();
    loop {
        updates.changed().await.unwrap();
        if updates.borrow().status == AccessStatus::Approved {
            break;
        }
    }

    // Approval alone admits nothing.
    assert!(!h.store.is_admitted());
    assert!(!protected_guard(&h.store).is_admit());

    // The explicit proceed step is what opens the door.
    assert_eq!(screen.proceed(), Some(Route::Protected));
    let session = h.store.snapshot();
    assert_eq!(session.status, AccessStatus::Approved);
    assert_eq!(session.record_id, Some(record_id));
    assert!(session.admitted);
    assert!(protected_guard(&h.store).is_admit());
}

#[tokio::test(start_paused = true)]
async fn test_rejection_lingers_with_contact_affordance() {
    let h = harness(FixedIdentity::new(IdentityId::new(8)));

    let outcome = h.flow.signup("Test", "secret", None).await.unwrap();
    let params = outcome.params.unwrap();
    let record_id = params.record_id.clone().unwrap();

    let mut screen = h.screen();
    screen.activate(Some(NavParams {
        status: params.status,
        record_id: params.record_id,
    }));

    let admin = h.registry.clone();
    let admin_record = record_id.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(6)).await;
        admin.reject(&admin_record).await;
    });

    let mut updates = screen.updates();
    loop {
        updates.changed().await.unwrap();
        if updates.borrow().status == AccessStatus::Rejected {
            break;
        }
    }

    // The caller stays on the status screen with the contact affordance;
    // no navigation is forced and no admission is possible.
    let view = screen.view();
    assert!(view.contact.is_some());
    assert!(!view.can_proceed);
    assert_eq!(screen.proceed(), None);

    // The protected guard sends them back to the status screen, not login.
    match protected_guard(&h.store) {
        GuardDecision::Redirect { to, params } => {
            assert_eq!(to, Route::Status);
            let params = params.unwrap();
            assert_eq!(params.status, AccessStatus::Rejected);
            assert_eq!(params.record_id, Some(record_id));
        }
        GuardDecision::Admit => panic!("rejected session must not be admitted"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_login_with_unknown_key_does_not_trap_the_caller() {
    let h = harness(FixedIdentity::new(IdentityId::new(7)));

    let outcome = h.flow.login("secret").await.unwrap();
    assert_eq!(outcome.route, Route::Status);
    assert_eq!(h.store.current_status(), AccessStatus::None);

    // A `none` session is not an outstanding request: the next visit to the
    // login screen renders normally.
    assert!(pre_auth_guard(&h.store).is_admit());

    // And the status screen treats it as a dead end without polling.
    let mut screen = h.screen();
    screen.activate(None);
    assert!(!screen.is_polling());
    assert_eq!(h.registry.lookup_count().await, 0);
}

#[tokio::test(start_paused = true)]
async fn test_resumed_pending_session_skips_login_form() {
    let h = harness(FixedIdentity::new(IdentityId::new(9)));
    let record_id = h
        .registry
        .insert(IdentityId::new(9), "secret", AccessStatus::Pending)
        .await;

    // Fresh process: the store is empty, but the registry remembers.
    let outcome = h.flow.resume_check().await.unwrap();
    assert_eq!(outcome.route, Route::Status);

    // From here the pre-auth guard keeps bouncing login attempts.
    match pre_auth_guard(&h.store) {
        GuardDecision::Redirect { to, params } => {
            assert_eq!(to, Route::Status);
            assert_eq!(params.unwrap().record_id, Some(record_id));
        }
        GuardDecision::Admit => panic!("pending session must not re-render login"),
    }
}
