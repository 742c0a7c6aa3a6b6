use crate::document::DocumentHost;
use crate::engine::reconciler::{lock, SharedReconciler};
use crate::errors::EngineError;
use crate::events::{EngineEvent, ViewportEvent};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// A running resize watcher. Cancelling it also drops any pending pass.
pub(crate) struct ResizeSubscription {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl ResizeSubscription {
    /// Spawns the watcher on the current tokio runtime.
    pub(crate) fn spawn<D>(
        reconciler: SharedReconciler<D>,
        events: broadcast::Receiver<ViewportEvent>,
        quiet: Duration,
        event_tx: broadcast::Sender<EngineEvent>,
    ) -> Result<Self, EngineError>
    where
        D: DocumentHost + 'static,
    {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| EngineError::NoRuntime)?;

        let cancel = CancellationToken::new();
        let task = runtime.spawn(watch(reconciler, events, quiet, cancel.clone(), event_tx));

        Ok(Self { cancel, task })
    }

    pub(crate) fn cancel(self) {
        self.cancel.cancel();
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Waits until `quiet` has passed since the last resize, then runs one pass.
async fn watch<D>(
    reconciler: SharedReconciler<D>,
    mut events: broadcast::Receiver<ViewportEvent>,
    quiet: Duration,
    cancel: CancellationToken,
    event_tx: broadcast::Sender<EngineEvent>,
) where
    D: DocumentHost + 'static,
{
    let mut deadline: Option<Instant> = None;

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => break,

            received = events.recv() => match received {
                Ok(event) if event.is_resize() => {
                    deadline = Some(Instant::now() + quiet);
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    log::debug!("ResizeWatcher: skipped {} viewport events", skipped);
                    deadline = Some(Instant::now() + quiet);
                }
                Err(RecvError::Closed) => {
                    log::debug!("ResizeWatcher: viewport stream closed");
                    break;
                }
            },

            _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                deadline = None;
                run_pass(&reconciler, &event_tx);
            }
        }
    }

    log::trace!("ResizeWatcher: stopped");
}

fn run_pass<D: DocumentHost>(reconciler: &SharedReconciler<D>, event_tx: &broadcast::Sender<EngineEvent>) {
    let result = lock(reconciler).and_then(|mut r| r.run_pass());

    if let Err(e) = result {
        log::error!("ResizeWatcher: pass failed: {}", e);
        let _ = event_tx.send(EngineEvent::PassFailed { error: e.to_string() });
    }
}
