//! Demo driver: runs the full signup → poll → decision flow against the
//! in-memory registry, with a simulated administrator deciding after a
//! configurable delay.

use access_gate::guards::protected_guard;
use access_gate::poller::{PollerConfig, StatusPoller};
use access_gate::registry::memory::{FixedIdentity, MemoryRegistry};
use access_gate::registry::IdentityId;
use access_gate::screen::{AdminContact, NavParams, StatusScreen};
use access_gate::session::SessionStore;
use access_gate::status::AccessStatus;
use access_gate::AuthFlow;
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "access-gate")]
#[command(about = "Simulates the access-request lifecycle end to end")]
#[command(version)]
struct Cli {
    /// Caller identity id supplied by the host application
    #[arg(long, default_value = "42")]
    identity: i64,

    /// Display name on the signup form
    #[arg(long, default_value = "Test User")]
    name: String,

    /// Secret access key
    #[arg(long, default_value = "hunter2-hunter2")]
    secret: String,

    /// What the simulated administrator does with the request
    #[arg(long, value_enum, default_value_t = Decision::Approve)]
    decision: Decision,

    /// Seconds before the administrator decides
    #[arg(long, default_value = "7")]
    decide_after: u64,

    /// Poll interval in seconds
    #[arg(long, default_value = "2")]
    interval: u64,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Decision {
    Approve,
    Reject,
    /// Delete the record outright (the poller sees "not found")
    Remove,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let registry = Arc::new(MemoryRegistry::new());
    let store = SessionStore::new();
    let identity = Arc::new(FixedIdentity::new(IdentityId::new(cli.identity)));

    let flow = AuthFlow::new(
        identity.clone(),
        registry.clone(),
        registry.clone(),
        registry.clone(),
        store.clone(),
    );

    let outcome = flow
        .signup(&cli.name, &cli.secret, None)
        .await
        .context("signup failed")?;
    let params = outcome.params.context("signup outcome carried no params")?;
    let record_id = params
        .record_id
        .clone()
        .context("signup outcome carried no record id")?;
    tracing::info!(record_id = %record_id, "request submitted; routing to status screen");

    // The administrator decides out-of-band after a delay.
    let admin_registry = registry.clone();
    let decision = cli.decision;
    let decide_after = Duration::from_secs(cli.decide_after);
    let admin_record_id = record_id.clone();
    tokio::spawn(async move {
        tokio::time::sleep(decide_after).await;
        match decision {
            Decision::Approve => admin_registry.approve(&admin_record_id).await,
            Decision::Reject => admin_registry.reject(&admin_record_id).await,
            Decision::Remove => admin_registry.remove(&admin_record_id).await,
        }
        tracing::info!(decision = ?decision, "administrator decided");
    });

    let poller = StatusPoller::new(
        registry.clone(),
        store.clone(),
        PollerConfig {
            interval: Duration::from_secs(cli.interval),
        },
    );
    let mut screen = StatusScreen::new(store.clone(), poller, identity, AdminContact::default());
    screen.activate(Some(NavParams {
        status: params.status,
        record_id: params.record_id,
    }));

    let mut updates = screen.updates();
    loop {
        let view = screen.view();
        tracing::info!(status = %view.status, "{}: {}", view.title, view.description);
        if view.status.is_terminal() || view.status == AccessStatus::None {
            break;
        }
        if updates.changed().await.is_err() {
            break;
        }
    }

    match store.current_status() {
        AccessStatus::Approved => {
            let route = screen.proceed().context("proceed refused on approval")?;
            tracing::info!(?route, admitted = store.is_admitted(), "entering protected area");
            anyhow::ensure!(
                protected_guard(&store).is_admit(),
                "protected guard denied an admitted session"
            );
            println!("access granted: welcome in");
        }
        AccessStatus::Rejected => {
            let view = screen.view();
            if let Some(contact) = view.contact {
                println!(
                    "access rejected: contact {} at {}",
                    contact.username, contact.url
                );
            }
        }
        other => {
            println!(
                "request ended in state '{}'; submit a new request to continue",
                other
            );
        }
    }

    screen.teardown();
    Ok(())
}
