//! Fixed-interval status poller
//!
//! Queries the detailed status protocol each cycle and degrades to the
//! coarse protocol for that cycle only when the detailed query fails.
//! Both failing in the same cycle means the monitoring channel itself is
//! broken and the poll loop stops with a `StatusCheckError`.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::errors::DeployError;
use crate::models::status::StatusSnapshot;
use crate::services::DeployApi;

/// Poll loop options
#[derive(Debug, Clone)]
pub struct PollOptions {
    /// Cycle interval, fixed at one second for the remote protocols
    pub interval: Duration,

    /// Poll budget. Callers pick the budget per deployment class; 60
    /// covers long test runs, 30 suits quick metadata-only deploys.
    pub max_attempts: u32,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_attempts: 60,
        }
    }
}

/// Terminal result of a poll loop
#[derive(Debug, Clone)]
pub enum PollTerminal {
    /// The remote reported a terminal snapshot
    Done(StatusSnapshot),

    /// Budget exhausted without a terminal snapshot
    TimedOut { last_seen: Option<StatusSnapshot> },
}

/// Run the poll loop until terminal, timeout, or a monitoring failure.
///
/// Exactly one status query cycle per interval; `on_snapshot` sees every
/// successfully fetched snapshot, terminal ones included, in receipt
/// order. With `max_attempts = N` and no terminal snapshot, exactly N
/// cycles run before `TimedOut` is returned.
pub async fn poll_job<A, C, S, F>(
    api: &A,
    job_id: &str,
    options: &PollOptions,
    mut on_snapshot: C,
    sleep_fn: S,
) -> Result<PollTerminal, DeployError>
where
    A: DeployApi + ?Sized,
    C: FnMut(u32, &StatusSnapshot),
    S: Fn(Duration) -> F,
    F: Future<Output = ()>,
{
    let mut last_seen: Option<StatusSnapshot> = None;

    for attempt in 1..=options.max_attempts {
        sleep_fn(options.interval).await;

        let snapshot = match api.query_detailed_status(job_id).await {
            Ok(snapshot) => snapshot,
            Err(detailed_err) => {
                debug!(
                    job_id,
                    attempt, "Detailed status failed, degrading to coarse protocol: {}", detailed_err
                );
                match api.query_status(job_id).await {
                    Ok(coarse) => coarse.into_snapshot(),
                    Err(fallback_err) => {
                        warn!(
                            job_id,
                            "Both status protocols failed: {} / {}", detailed_err, fallback_err
                        );
                        return Err(DeployError::StatusCheckError(fallback_err.to_string()));
                    }
                }
            }
        };

        on_snapshot(attempt, &snapshot);

        if snapshot.done {
            return Ok(PollTerminal::Done(snapshot));
        }
        last_seen = Some(snapshot);
    }

    Ok(PollTerminal::TimedOut { last_seen })
}

/// Event delivered by a running [`StatusPoller`]
#[derive(Debug)]
pub enum PollEvent {
    Snapshot(u32, StatusSnapshot),
    Terminal(Result<PollTerminal, DeployError>),
}

/// Owned handle around a spawned poll loop.
///
/// At most one loop runs per poller; `start` replaces a running loop and
/// `stop` is idempotent, safe to call when nothing was started.
#[derive(Debug)]
pub struct StatusPoller {
    options: PollOptions,
    handle: Option<JoinHandle<()>>,
}

impl StatusPoller {
    pub fn new(options: PollOptions) -> Self {
        Self {
            options,
            handle: None,
        }
    }

    /// Spawn the poll loop, stopping any previous one first. Events
    /// arrive on the returned receiver; a `Terminal` event is always the
    /// last one delivered.
    pub fn start(
        &mut self,
        api: Arc<dyn DeployApi>,
        job_id: String,
    ) -> mpsc::UnboundedReceiver<PollEvent> {
        self.stop();

        let (tx, rx) = mpsc::unbounded_channel();
        let options = self.options.clone();

        self.handle = Some(tokio::spawn(async move {
            let snapshot_tx = tx.clone();
            let result = poll_job(
                api.as_ref(),
                &job_id,
                &options,
                |attempt, snapshot| {
                    let _ = snapshot_tx.send(PollEvent::Snapshot(attempt, snapshot.clone()));
                },
                |wait| tokio::time::sleep(wait),
            )
            .await;
            let _ = tx.send(PollEvent::Terminal(result));
        }));

        rx
    }

    /// Cancel the running loop, if any
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for StatusPoller {
    fn drop(&mut self) {
        self.stop();
    }
}
