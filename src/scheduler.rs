// Periodic sync scheduling - fires the reconciler once at startup, then
// on a fixed interval until shut down.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::catalog::Catalog;
use crate::reconciler::{Reconciler, SyncReport};
use crate::store::QuoteStore;

pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(60);

/// Outcome of one scheduled cycle, delivered to whoever is listening
/// (status line, watch loop).
#[derive(Debug, Clone)]
pub enum SyncEvent {
    Completed(SyncReport),
    Failed(String),
}

impl SyncEvent {
    pub fn message(&self) -> String {
        match self {
            SyncEvent::Completed(report) => report.summary(),
            SyncEvent::Failed(error) => format!("Failed to sync with server: {}", error),
        }
    }
}

/// Run one reconciliation cycle against the shared catalog and persist
/// the result. The fetch happens before the catalog lock is taken, so a
/// slow or hung remote never blocks other catalog users.
pub async fn run_cycle(
    reconciler: &Reconciler,
    catalog: &Mutex<Catalog>,
    store: &Mutex<QuoteStore>,
) -> SyncEvent {
    let snapshot = match reconciler.fetch().await {
        Ok(snapshot) => snapshot,
        Err(error) => {
            tracing::error!("sync cycle failed: {:#}", error);
            return SyncEvent::Failed(format!("{error:#}"));
        }
    };

    let (outcome, persisted) = {
        let mut catalog = catalog.lock().await;
        let outcome = reconciler.merge(&mut catalog, snapshot);
        let persisted = {
            let store = store.lock().await;
            store.save_quotes(catalog.quotes())
        };
        (outcome, persisted)
    };

    if let Err(error) = persisted {
        tracing::error!("could not persist synced quotes: {:#}", error);
        return SyncEvent::Failed(format!("could not persist synced quotes: {error:#}"));
    }

    let pushed = reconciler.push_local(&outcome.local_only).await;
    SyncEvent::Completed(SyncReport::new(outcome, pushed))
}

// ============================================================================
// SCHEDULER
// ============================================================================

pub struct SyncScheduler {
    interval: Duration,
}

impl SyncScheduler {
    pub fn new(interval: Duration) -> Self {
        SyncScheduler { interval }
    }

    /// Spawn the periodic task. The first cycle runs immediately, then one
    /// per interval. Cycles serialize on the catalog lock, so a cycle that
    /// outlives the interval delays the next tick instead of racing it.
    pub fn spawn(
        &self,
        reconciler: Arc<Reconciler>,
        catalog: Arc<Mutex<Catalog>>,
        store: Arc<Mutex<QuoteStore>>,
        events: mpsc::UnboundedSender<SyncEvent>,
    ) -> SchedulerHandle {
        let token = CancellationToken::new();
        let child = token.clone();
        let interval = self.interval;

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            tracing::info!(interval_secs = interval.as_secs(), "sync scheduler started");

            loop {
                tokio::select! {
                    _ = child.cancelled() => {
                        tracing::info!("sync scheduler stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        let event = run_cycle(&reconciler, &catalog, &store).await;
                        if events.send(event).is_err() {
                            tracing::debug!("sync event listener went away");
                        }
                    }
                }
            }
        });

        SchedulerHandle { token, handle }
    }
}

impl Default for SyncScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_SYNC_INTERVAL)
    }
}

/// Handle to a running scheduler task. Dropping the handle leaves the
/// task running; call `shutdown` for a clean stop.
pub struct SchedulerHandle {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Signal the task to stop without waiting for it.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Signal the task to stop and wait for it to finish.
    pub async fn shutdown(self) {
        self.token.cancel();
        let _ = self.handle.await;
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

// ============================================================================
// TESTS
// ============================================================================
