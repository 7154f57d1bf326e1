//! Reconciliation poller: repeatedly fetches the authoritative status for
//! one registry record and feeds it into the session store.
//!
//! One poller task owns at most one in-flight query; the inter-tick delay is
//! measured from the completion of a tick, not from its dispatch, so a slow
//! network call spaces out retries instead of piling up concurrent requests.
//!
//! Stopping the poller guarantees no further effect: an already-scheduled
//! sleep or an in-flight query is abandoned at its await point, and a query
//! result that resolves after `stop()` is discarded before it can touch the
//! session store.

use crate::registry::{AccessRegistry, RegistryError, RegistryKey, StatusRecord};
use crate::session::SessionStore;
use crate::status::AccessStatus;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Policy knobs for the reconciliation loop.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Fixed delay between the end of one tick and the start of the next.
    pub interval: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
        }
    }
}

/// What a completed tick tells the loop to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TickAction {
    Continue,
    Stop,
}

/// Spawns and configures reconciliation tasks against one registry.
pub struct StatusPoller {
    registry: Arc<dyn AccessRegistry>,
    store: SessionStore,
    config: PollerConfig,
}

impl StatusPoller {
    pub fn new(registry: Arc<dyn AccessRegistry>, store: SessionStore, config: PollerConfig) -> Self {
        Self {
            registry,
            store,
            config,
        }
    }

    /// Starts a reconciliation task for the record addressed by `key`.
    ///
    /// Returns `None` without spawning anything when no key is available:
    /// there is nothing to poll for an unauthenticated caller. The first
    /// query is issued immediately; subsequent ticks follow the configured
    /// interval.
    pub fn start(&self, key: Option<RegistryKey>) -> Option<PollerHandle> {
        let key = match key {
            Some(key) => key,
            None => {
                tracing::debug!("no registry key available; not polling");
                return None;
            }
        };

        let stopped = Arc::new(AtomicBool::new(false));
        let (stop_tx, stop_rx) = mpsc::channel(1);
        let task = PollTask {
            registry: self.registry.clone(),
            store: self.store.clone(),
            interval: self.config.interval,
            key,
            stopped: stopped.clone(),
            stop_rx,
        };
        let handle = tokio::spawn(task.run());

        Some(PollerHandle {
            stopped,
            stop_tx,
            handle: Some(handle),
        })
    }
}

/// Handle to one running reconciliation task.
///
/// Dropping the handle stops the task, so the teardown contract holds on
/// every exit path of the owning screen.
pub struct PollerHandle {
    stopped: Arc<AtomicBool>,
    stop_tx: mpsc::Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl PollerHandle {
    /// Stops the task. Idempotent: safe to call when already stopped or when
    /// the task has already finished on its own.
    pub fn stop(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        // The task may have exited already; a closed channel is fine.
        let _ = self.stop_tx.try_send(());
    }

    /// Whether `stop()` has been called on this handle.
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Whether the task has exited, either by reaching a terminal status or
    /// by being stopped.
    pub fn is_finished(&self) -> bool {
        match &self.handle {
            Some(handle) => handle.is_finished(),
            None => true,
        }
    }

    /// Waits for the task to exit.
    pub async fn finished(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

struct PollTask {
    registry: Arc<dyn AccessRegistry>,
    store: SessionStore,
    interval: Duration,
    key: RegistryKey,
    stopped: Arc<AtomicBool>,
    stop_rx: mpsc::Receiver<()>,
}

impl PollTask {
    async fn run(mut self) {
        loop {
            let result = tokio::select! {
                result = self.registry.lookup(&self.key) => result,
                _ = self.stop_rx.recv() => return,
            };

            // The query may have resolved in the same scheduling round as a
            // stop() call; a stopped poller must not touch the store.
            if self.stopped.load(Ordering::SeqCst) {
                return;
            }

            if apply_tick(&self.store, result) == TickAction::Stop {
                return;
            }

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = self.stop_rx.recv() => return,
            }
        }
    }
}

/// Maps one tick's result onto the session store and decides whether the
/// loop keeps going.
fn apply_tick(
    store: &SessionStore,
    result: Result<Option<StatusRecord>, RegistryError>,
) -> TickAction {
    match result {
        Err(err) => {
            // Transient: a flaky read must never look like a rejection or a
            // disappearance. The next tick retries.
            tracing::warn!(error = %err, "status poll failed; keeping previous status");
            TickAction::Continue
        }
        Ok(None) => {
            // The record was deleted or never existed; waiting will not
            // bring it back.
            tracing::info!("registry record not found; stopping poll");
            store.seed(AccessStatus::None, None);
            TickAction::Stop
        }
        Ok(Some(record)) => {
            tracing::debug!(status = %record.status, record_id = %record.record_id, "status poll tick");
            match record.status {
                AccessStatus::Submitted | AccessStatus::Pending => {
                    store.seed(AccessStatus::Pending, Some(record.record_id));
                    TickAction::Continue
                }
                AccessStatus::Approved => {
                    // Observing approval is not admission; the explicit
                    // proceed step grants that.
                    store.seed(AccessStatus::Approved, Some(record.record_id));
                    TickAction::Stop
                }
                AccessStatus::Rejected => {
                    store.seed(AccessStatus::Rejected, Some(record.record_id));
                    TickAction::Stop
                }
                AccessStatus::None => {
                    // A registry never answers `none` for an existing record;
                    // treat it the same as a missing one.
                    store.seed(AccessStatus::None, None);
                    TickAction::Stop
                }
            }
        }
    }
}
