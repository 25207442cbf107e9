// src/session/dispatch.rs
// =============================================================================
// Fans candidate links out to concurrent probe tasks and streams the
// outcomes back as they complete.
//
// Moving parts, all owned by one session (nothing is global):
// - a Semaphore caps how many probes are in flight at once
// - a JoinSet holds every spawned probe task; it is the completion barrier
// - an mpsc channel hands each ProbeOutcome from its task to the consumer
// - a CancellationToken stops dispatch and aborts in-flight probes
//
// The channel must close only after the last probe has finished, otherwise
// a consumer reading "until closed" hangs (closed too late) or misses
// outcomes (closed too early). The dispatcher task is the only place that
// closes it: after the dispatch loop it drains the JoinSet to empty, and
// only then drops its sender.
// =============================================================================

use crate::checker::{probe_link, ProbeMethod, ProbeOutcome};
use futures::Stream;
use reqwest::Client;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};
use url::Url;

/// Default number of probes in flight at once
pub const DEFAULT_CONCURRENCY: usize = 32;

/// How the probe phase behaves
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Upper bound on simultaneous probes (0 is treated as 1)
    pub concurrency: usize,
    pub method: ProbeMethod,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            method: ProbeMethod::Head,
        }
    }
}

/// Outcomes of one probe phase, in completion order
///
/// Yields exactly one `ProbeOutcome` per dispatched probe and then ends.
/// Dropping the stream aborts the dispatcher and every probe still running.
pub struct ProbeStream {
    outcomes: mpsc::Receiver<ProbeOutcome>,
    dispatched: Arc<AtomicUsize>,
    dispatcher: JoinHandle<()>,
}

impl ProbeStream {
    /// Waits for the next outcome, `None` once every probe has reported
    pub async fn next_outcome(&mut self) -> Option<ProbeOutcome> {
        self.outcomes.recv().await
    }

    /// Probes dispatched so far
    ///
    /// Final once the stream has ended.
    pub fn dispatched(&self) -> usize {
        self.dispatched.load(Ordering::Acquire)
    }
}

impl Stream for ProbeStream {
    type Item = ProbeOutcome;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.outcomes.poll_recv(cx)
    }
}

impl Drop for ProbeStream {
    fn drop(&mut self) {
        // Dropping the JoinSet inside the dispatcher aborts the probes too
        self.dispatcher.abort();
    }
}

// Starts probing `links` in the background and returns the outcome stream
//
// Candidates that don't parse as absolute URLs are skipped without a trace
// in the output: they are neither dispatched nor reported.
pub fn spawn_probes(
    client: Client,
    links: Vec<String>,
    config: &ProbeConfig,
    cancel: CancellationToken,
) -> ProbeStream {
    let concurrency = config.concurrency.max(1);
    let (tx, rx) = mpsc::channel(concurrency);
    let dispatched = Arc::new(AtomicUsize::new(0));

    let dispatcher = Dispatcher {
        client,
        method: config.method,
        limit: Arc::new(Semaphore::new(concurrency)),
        cancel,
        dispatched: Arc::clone(&dispatched),
    };
    let dispatcher = tokio::spawn(dispatcher.run(links, tx));

    ProbeStream {
        outcomes: rx,
        dispatched,
        dispatcher,
    }
}

struct Dispatcher {
    client: Client,
    method: ProbeMethod,
    limit: Arc<Semaphore>,
    cancel: CancellationToken,
    dispatched: Arc<AtomicUsize>,
}

impl Dispatcher {
    async fn run(self, links: Vec<String>, tx: mpsc::Sender<ProbeOutcome>) {
        let mut in_flight = JoinSet::new();

        for link in links {
            // Reap what already finished so the set only holds live probes
            while let Some(joined) = in_flight.try_join_next() {
                log_join_failure(joined);
            }

            // Checkpoint: no new probe once cancelled
            if self.cancel.is_cancelled() {
                debug!("cancelled, dispatch stopped");
                break;
            }

            let url = match Url::parse(&link) {
                Ok(url) => url,
                Err(e) => {
                    trace!(%link, error = %e, "not an absolute URL, skipped");
                    continue;
                }
            };

            let permit = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    debug!("cancelled while waiting for a probe slot");
                    break;
                }
                permit = Arc::clone(&self.limit).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    // The semaphore is never closed
                    Err(_) => break,
                },
            };

            let client = self.client.clone();
            let cancel = self.cancel.clone();
            let tx = tx.clone();
            let method = self.method;
            in_flight.spawn(async move {
                let _permit = permit;
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {}
                    outcome = probe_link(&client, link, url, method) => {
                        // Fails only if the consumer has gone away
                        let _ = tx.send(outcome).await;
                    }
                }
            });
            self.dispatched.fetch_add(1, Ordering::AcqRel);
        }

        // Completion barrier: wait for every dispatched probe
        while let Some(joined) = in_flight.join_next().await {
            log_join_failure(joined);
        }

        debug!(
            dispatched = self.dispatched.load(Ordering::Acquire),
            "all probes finished, closing outcome channel"
        );
        drop(tx);
    }
}

fn log_join_failure(joined: Result<(), JoinError>) {
    if let Err(e) = joined {
        if e.is_panic() {
            warn!(error = %e, "probe task panicked");
        }
    }
}
