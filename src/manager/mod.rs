//! Download coordination — one worker per request, all events multiplexed
//! onto a single consumer-facing channel.
//!
//! The [`DownloadManager`] owns a registry of in-flight downloads keyed by
//! request identifier (the URL), launches each on its own worker task, and
//! relays progress, completion, failure, and cancellation events through an
//! unbounded FIFO channel. The consumer drains the channel with a
//! non-blocking [`drain`](DownloadManager::drain) call at its own cadence;
//! workers never block on the consumer and the consumer never blocks on
//! workers.

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::fetcher::{MediaFetcher, YtDlpFetcher};
use crate::task::DownloadTask;
use crate::types::{DownloadRequest, DownloadResult, ProgressEvent, TaskEvent};

/// Lock a mutex, recovering the guard if a worker panicked while holding it.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Coordinator for concurrent downloads.
///
/// Construct one per application and pass it to the consumer explicitly;
/// there is no ambient singleton. All state lives behind internal locks, so
/// `&self` methods can be called from the consumer context while workers run.
pub struct DownloadManager {
    /// Fetch boundary shared by every task this manager spawns
    fetcher: Arc<dyn MediaFetcher>,
    /// Registry of in-flight workers, keyed by request identifier
    active: Arc<Mutex<HashMap<String, JoinHandle<()>>>>,
    /// Producer half of the event channel, cloned into every worker
    event_tx: mpsc::UnboundedSender<TaskEvent>,
    /// Consumer half, drained by `drain`
    event_rx: Mutex<mpsc::UnboundedReceiver<TaskEvent>>,
    /// Global stop signal; replaced with a fresh token after `stop_all`
    stop: Mutex<CancellationToken>,
}

impl DownloadManager {
    /// Create a manager driving downloads through `fetcher`
    pub fn new(fetcher: Arc<dyn MediaFetcher>) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        Self {
            fetcher,
            active: Arc::new(Mutex::new(HashMap::new())),
            event_tx,
            event_rx: Mutex::new(event_rx),
            stop: Mutex::new(CancellationToken::new()),
        }
    }

    /// Create a manager from configuration, resolving the external tool
    pub fn from_config(config: &Config) -> Result<Self> {
        let fetcher = YtDlpFetcher::from_config(&config.tools)?;
        Ok(Self::new(Arc::new(fetcher)))
    }

    /// Launch a worker for `request`.
    ///
    /// The request URL is the identifier. A request whose identifier is
    /// already active is rejected with [`Error::DuplicateRequest`] — the
    /// original worker keeps running and keeps its registry entry.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self, request: DownloadRequest) -> Result<()> {
        let id = request.url.clone();
        let task = DownloadTask::from_request(&request, Arc::clone(&self.fetcher));
        let cancel = lock(&self.stop).clone();
        let tx = self.event_tx.clone();
        let registry = Arc::clone(&self.active);

        // Hold the registry lock across spawn + insert so the worker's
        // self-removal (which takes the same lock) cannot run first.
        let mut active = lock(&self.active);
        if active.contains_key(&id) {
            return Err(Error::DuplicateRequest(id));
        }

        let url = id.clone();
        let handle = tokio::spawn(async move {
            let hook_tx = tx.clone();
            let hook_cancel = cancel.clone();
            let hook_id = url.clone();
            let on_progress = move |progress: ProgressEvent| {
                // Best-effort suppression once the global stop is underway
                if hook_cancel.is_cancelled() {
                    return;
                }
                hook_tx
                    .send(TaskEvent::Progress {
                        id: hook_id.clone(),
                        progress,
                    })
                    .ok();
            };

            let outcome = task.run(&url, cancel.clone(), on_progress).await;
            let event = match outcome {
                Ok(result) => {
                    if cancel.is_cancelled() {
                        None
                    } else {
                        Some(TaskEvent::Complete {
                            id: url.clone(),
                            result,
                        })
                    }
                }
                // The terminal cancellation acknowledgment is delivered even
                // during a global stop so the consumer can tell cancelled
                // tasks apart from failed ones.
                Err(Error::Aborted) => Some(TaskEvent::Cancelled { id: url.clone() }),
                Err(error) => {
                    tracing::error!(url = %url, error = %error, "Download worker failed");
                    if cancel.is_cancelled() {
                        None
                    } else {
                        Some(TaskEvent::Failed {
                            id: url.clone(),
                            error: error.to_string(),
                        })
                    }
                }
            };
            if let Some(event) = event {
                tx.send(event).ok();
            }

            lock(&registry).remove(&url);
        });

        active.insert(id, handle);
        Ok(())
    }

    /// Dispatch every currently queued event to the matching handler.
    ///
    /// Non-blocking: pops events in FIFO order until the channel is empty and
    /// returns the number dispatched. Safe to call repeatedly from a single
    /// consumer context; never blocks the producer workers. Events from one
    /// task arrive in emission order; events from different tasks interleave
    /// in arrival order.
    pub fn drain(
        &self,
        mut on_progress: impl FnMut(&str, ProgressEvent),
        mut on_complete: impl FnMut(&str, DownloadResult),
        mut on_error: impl FnMut(&str, String),
        mut on_cancelled: impl FnMut(&str),
    ) -> usize {
        let mut rx = lock(&self.event_rx);
        let mut dispatched = 0;
        while let Ok(event) = rx.try_recv() {
            dispatched += 1;
            match event {
                TaskEvent::Progress { id, progress } => on_progress(&id, progress),
                TaskEvent::Complete { id, result } => on_complete(&id, result),
                TaskEvent::Failed { id, error } => on_error(&id, error),
                TaskEvent::Cancelled { id } => on_cancelled(&id),
            }
        }
        dispatched
    }

    /// Stop every active download and wait for the workers to terminate.
    ///
    /// Sets the global stop signal, joins every registered worker, clears the
    /// registry, and installs a fresh stop token so the manager can be used
    /// again. Workers observe the signal at their next progress-hook
    /// invocation; one that is blocked inside the external transfer with no
    /// callbacks pending cannot be interrupted before its next hook call.
    pub async fn stop_all(&self) {
        lock(&self.stop).cancel();

        let drained: Vec<(String, JoinHandle<()>)> = lock(&self.active).drain().collect();
        let worker_count = drained.len();
        for (id, handle) in drained {
            if let Err(error) = handle.await {
                tracing::error!(url = %id, error = %error, "Download worker panicked during shutdown");
            }
        }

        *lock(&self.stop) = CancellationToken::new();
        tracing::info!(worker_count, "Stopped all downloads");
    }

    /// Whether a download for `id` is currently registered
    pub fn is_active(&self, id: &str) -> bool {
        lock(&self.active).contains_key(id)
    }

    /// Number of currently registered downloads
    pub fn active_count(&self) -> usize {
        lock(&self.active).len()
    }
}
