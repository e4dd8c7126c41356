//! Deployment job orchestrator
//!
//! Owns the full lifecycle: submit (direct or via the side channel),
//! poll to a terminal state, classify the result, refresh caches, and
//! emit notifications. All job state flows out through a watch channel;
//! presentation layers never see intermediate mutation.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::status::StatusCache;
use crate::deploy::channel::{self, ChannelEvent, ChannelWaitOptions};
use crate::deploy::classify;
use crate::deploy::job::{DeploymentJob, JobPhase};
use crate::deploy::poller::{PollEvent, PollOptions, PollTerminal, StatusPoller};
use crate::errors::DeployError;
use crate::mapping::ResolvedMappings;
use crate::models::card::{CardSummary, TargetOption};
use crate::models::status::{Outcome, StatusSnapshot};
use crate::notify::{Notification, Notifier, Severity};
use crate::services::DeployApi;

/// How the deployment request reaches the remote system
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SubmitMode {
    /// Direct async call returning the job handle immediately
    #[default]
    Direct,

    /// The deployment runs in a detached context; the handle arrives
    /// through side-channel probes or inbound events
    SideChannel,
}

/// Orchestrator configuration
#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    pub submit_mode: SubmitMode,

    pub poll: PollOptions,

    pub channel_wait: ChannelWaitOptions,

    /// Delay before the progress view auto-dismisses after success
    pub auto_dismiss: Duration,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            submit_mode: SubmitMode::Direct,
            poll: PollOptions::default(),
            channel_wait: ChannelWaitOptions::default(),
            auto_dismiss: Duration::from_millis(2000),
        }
    }
}

/// Deployment job orchestrator. One instance tracks at most one job at a
/// time; starting a deploy for a different target tears the current one
/// down first.
pub struct Orchestrator {
    api: Arc<dyn DeployApi>,
    notifier: Arc<dyn Notifier>,
    cache: Arc<StatusCache>,
    options: OrchestratorOptions,

    /// Published view model
    state: watch::Sender<DeploymentJob>,

    /// Bumped on every submit and on teardown; updates carrying an older
    /// generation are stale callbacks and get dropped.
    generation: AtomicU64,

    /// Handle of the running job task
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Orchestrator {
    pub fn new(
        api: Arc<dyn DeployApi>,
        notifier: Arc<dyn Notifier>,
        cache: Arc<StatusCache>,
        options: OrchestratorOptions,
    ) -> Arc<Self> {
        let (state, _) = watch::channel(DeploymentJob::default());
        Arc::new(Self {
            api,
            notifier,
            cache,
            options,
            state,
            generation: AtomicU64::new(0),
            task: Mutex::new(None),
        })
    }

    /// Current job view model
    pub fn job(&self) -> DeploymentJob {
        self.state.borrow().clone()
    }

    /// Subscribe to job view model updates
    pub fn subscribe(&self) -> watch::Receiver<DeploymentJob> {
        self.state.subscribe()
    }

    /// Start a deployment for a target.
    ///
    /// Rejected while a job for the same target is in flight. A deploy
    /// for a different target tears down the running job and its timers
    /// before starting.
    pub fn submit(self: &Arc<Self>, target_key: &str) -> Result<(), DeployError> {
        {
            let current = self.state.borrow();
            if current.phase.is_active() && current.target_key == target_key {
                return Err(DeployError::JobInFlight(target_key.to_string()));
            }
        }

        self.abort_task();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_replace(DeploymentJob::submitting(target_key));

        let this = Arc::clone(self);
        let key = target_key.to_string();
        let handle = tokio::spawn(async move {
            this.run_job(generation, key).await;
        });
        *self.task.lock().unwrap_or_else(|e| e.into_inner()) = Some(handle);
        Ok(())
    }

    /// Select the working target without starting a job (legacy
    /// single-select mode). Clears stale source and retry state.
    pub fn select_target(&self, target_key: &str) -> Result<(), DeployError> {
        let current = self.state.borrow().clone();
        if current.phase.is_active() {
            return Err(DeployError::JobInFlight(current.target_key));
        }
        self.state.send_replace(DeploymentJob {
            target_key: target_key.to_string(),
            ..DeploymentJob::default()
        });
        Ok(())
    }

    /// Re-submit the current target after a failure or timeout
    pub fn retry(self: &Arc<Self>) -> Result<(), DeployError> {
        let current = self.state.borrow().clone();
        if current.phase.is_active() {
            return Err(DeployError::JobInFlight(current.target_key));
        }
        if !current.can_retry() {
            return Err(DeployError::ValidationError(
                "nothing to retry for the current job".to_string(),
            ));
        }
        self.submit(&current.target_key)
    }

    /// Fetch the deployed source text for the current target, once.
    /// Failure surfaces a warning notification and leaves the phase alone.
    pub async fn view_source(&self) -> Result<(), DeployError> {
        let (target_key, already_loaded) = {
            let job = self.state.borrow();
            (job.target_key.clone(), job.source.is_some())
        };
        if target_key.is_empty() {
            return Err(DeployError::ValidationError("no target selected".to_string()));
        }
        if already_loaded {
            return Ok(());
        }

        let generation = self.generation.load(Ordering::SeqCst);
        match self.api.get_deployed_source_text(&target_key).await {
            Ok(source) => {
                self.update(generation, move |job| job.source = Some(source));
                Ok(())
            }
            Err(e) => {
                self.notifier.notify(Notification::new(
                    "Source Load Failed",
                    &e.to_string(),
                    Severity::Warning,
                ));
                Err(DeployError::SourceFetchError(e.to_string()))
            }
        }
    }

    /// Card summaries, cache-first
    pub async fn load_cards(&self) -> Result<Vec<CardSummary>, DeployError> {
        if let Some(cards) = self.cache.get_cards() {
            debug!("Serving card summaries from cache");
            return Ok(cards);
        }
        let cards = self.api.list_targets_with_stats().await?;
        self.cache.put_cards(cards.clone());
        Ok(cards)
    }

    /// Resolved field mappings for a target, cache-first
    pub async fn load_mappings(&self, target_key: &str) -> Result<ResolvedMappings, DeployError> {
        if let Some(bundle) = self.cache.get_mappings(target_key) {
            debug!(target = target_key, "Serving field mappings from cache");
            return Ok(bundle);
        }
        let raw = self.api.get_field_mappings(target_key).await?;
        let resolved = ResolvedMappings::from_bundle(raw);
        self.cache.put_mappings(target_key, resolved.clone());
        Ok(resolved)
    }

    /// Flat target listing (legacy single-select mode), never cached
    pub async fn load_targets(&self) -> Result<Vec<TargetOption>, DeployError> {
        self.api.list_targets().await
    }

    /// Apply an inbound side-channel event
    pub async fn handle_channel_event(self: &Arc<Self>, event: ChannelEvent) {
        let generation = self.generation.load(Ordering::SeqCst);
        match event {
            ChannelEvent::Progress { status } => {
                let attempt = self.state.borrow().attempts;
                self.apply_snapshot(generation, attempt, &status);
            }
            ChannelEvent::Complete { mut status } => {
                // The side channel settled the job; the poll loop is
                // obsolete and must not reach a second terminal.
                self.abort_task();
                status.done = true;
                self.finish(generation, status).await;
            }
        }
    }

    /// Hide the progress view
    pub fn dismiss_progress(&self) {
        self.state.send_modify(|job| {
            job.progress_visible = false;
            job.close_message.clear();
        });
    }

    /// Await the current job reaching a terminal phase
    pub async fn wait_terminal(&self) -> Result<DeploymentJob, DeployError> {
        let mut rx = self.subscribe();
        let job = rx
            .wait_for(|job| job.phase.is_terminal())
            .await
            .map_err(|e| DeployError::Internal(e.to_string()))?;
        Ok(job.clone())
    }

    /// Tear down: cancel the running job task and invalidate any
    /// still-pending callbacks.
    pub fn shutdown(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.abort_task();
    }

    // ------------------------------ internals ------------------------------ //

    async fn run_job(self: Arc<Self>, generation: u64, target_key: String) {
        info!(target = %target_key, "Submitting deployment...");

        let submit_result = match self.options.submit_mode {
            SubmitMode::Direct => self.api.submit_deployment(&target_key).await,
            SubmitMode::SideChannel => {
                channel::await_channel_result(
                    self.api.as_ref(),
                    &target_key,
                    &self.options.channel_wait,
                    |wait| tokio::time::sleep(wait),
                )
                .await
            }
        };

        let job_id = match submit_result {
            Ok(job_id) => job_id,
            Err(e) => {
                self.fail_submission(generation, e);
                return;
            }
        };

        info!(job_id = %job_id, "Deployment submitted, polling status...");
        self.update(generation, |job| {
            job.job_id = Some(job_id.clone());
            job.phase = JobPhase::Polling;
            job.progress_visible = true;
        });

        let mut poller = StatusPoller::new(self.options.poll.clone());
        let mut events = poller.start(Arc::clone(&self.api), job_id);

        while let Some(event) = events.recv().await {
            match event {
                PollEvent::Snapshot(attempt, snapshot) => {
                    self.apply_snapshot(generation, attempt, &snapshot);
                }
                PollEvent::Terminal(result) => {
                    poller.stop();
                    match result {
                        Ok(PollTerminal::Done(snapshot)) => self.finish(generation, snapshot).await,
                        Ok(PollTerminal::TimedOut { .. }) => self.finish_timeout(generation),
                        Err(e) => self.fail_status_check(generation, e),
                    }
                    return;
                }
            }
        }
    }

    /// Apply a state mutation unless it belongs to a superseded job
    fn update<F>(&self, generation: u64, f: F)
    where
        F: FnOnce(&mut DeploymentJob),
    {
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(generation, "Dropping stale job update");
            return;
        }
        self.state.send_modify(f);
    }

    fn apply_snapshot(&self, generation: u64, attempt: u32, snapshot: &StatusSnapshot) {
        self.update(generation, |job| {
            job.attempts = attempt;
            job.snapshot = Some(snapshot.clone());
            let progress = job.progress_message();
            if !progress.is_empty() {
                job.message = progress;
            } else if let Some(message) = &snapshot.message {
                job.message = format!("Status: {}", message);
            }
        });
    }

    async fn finish(self: &Arc<Self>, generation: u64, snapshot: StatusSnapshot) {
        if snapshot.outcome == Outcome::Succeeded {
            self.finish_success(generation, snapshot).await;
        } else {
            self.finish_failure(generation, snapshot);
        }
    }

    async fn finish_success(self: &Arc<Self>, generation: u64, snapshot: StatusSnapshot) {
        let target_key = self.state.borrow().target_key.clone();
        info!(target = %target_key, "Deployment succeeded");

        self.update(generation, |job| {
            job.phase = JobPhase::Succeeded;
            job.snapshot = Some(snapshot.clone());
            job.finished_at = Some(Utc::now());
            job.close_message = "Success! Closing automatically...".to_string();
        });

        // Deployed-artifact flags changed; the card list is stale now.
        self.refresh_cards().await;

        match self.api.get_deployed_source_text(&target_key).await {
            Ok(source) => self.update(generation, move |job| job.source = Some(source)),
            Err(e) => warn!("Failed to load deployed source: {}", e),
        }

        self.notifier.notify(Notification::new(
            "Deployment Successful",
            &format!(
                "Successfully deployed {} components for {}",
                snapshot.components_done, target_key
            ),
            Severity::Success,
        ));

        let this = Arc::clone(self);
        let delay = self.options.auto_dismiss;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            this.update(generation, |job| {
                job.progress_visible = false;
                job.close_message.clear();
            });
        });
    }

    fn finish_failure(&self, generation: u64, snapshot: StatusSnapshot) {
        let conflict = classify::has_conflict_marker(&snapshot);
        let message = if snapshot.test_errors > 0 {
            format!("{} test(s) failed. See details below.", snapshot.test_errors)
        } else if let Some(message) = snapshot.message.clone() {
            message
        } else {
            "Deployment failed. Check details below.".to_string()
        };
        warn!("Deployment failed: {}", message);

        self.update(generation, |job| {
            job.phase = JobPhase::Failed;
            job.message = message.clone();
            job.snapshot = Some(snapshot);
            job.finished_at = Some(Utc::now());
            job.close_message =
                "You can close this window when you're ready after reviewing the errors."
                    .to_string();
        });

        if conflict {
            self.notifier.notify(Notification::persistent(
                "Validation Rule Conflict",
                "Validation Rule Conflict detected. Please disable the rule and try again",
                Severity::Error,
            ));
        }
        self.notifier.notify(Notification::persistent(
            "Deployment Failed",
            &message,
            Severity::Error,
        ));
    }

    fn finish_timeout(&self, generation: u64) {
        let message = format!(
            "Stopped polling after {}s. Check status later.",
            self.options.poll.max_attempts
        );
        warn!("{}", message);

        self.update(generation, |job| {
            job.phase = JobPhase::TimedOut;
            job.message = message.clone();
            job.finished_at = Some(Utc::now());
        });

        self.notifier.notify(Notification::new(
            "Deployment Timed Out",
            &message,
            Severity::Warning,
        ));
    }

    fn fail_status_check(&self, generation: u64, err: DeployError) {
        let message = err.to_string();
        warn!("Status check failed for both protocols: {}", message);

        self.update(generation, |job| {
            job.phase = JobPhase::Failed;
            job.message = message.clone();
            job.finished_at = Some(Utc::now());
        });

        self.notifier.notify(Notification::persistent(
            "Status Check Error",
            &message,
            Severity::Error,
        ));
    }

    fn fail_submission(&self, generation: u64, err: DeployError) {
        warn!("Submission failed: {}", err);
        match err {
            DeployError::TimedOut(message) => {
                self.update(generation, |job| {
                    job.phase = JobPhase::TimedOut;
                    job.message = message;
                    job.finished_at = Some(Utc::now());
                });
                self.notifier.notify(Notification::new(
                    "Deployment Timed Out",
                    "No result arrived in time. Check the deployment status later.",
                    Severity::Warning,
                ));
            }
            other => {
                let message = match &other {
                    DeployError::SubmissionError(m) => m.clone(),
                    e => e.to_string(),
                };
                self.update(generation, |job| {
                    job.phase = JobPhase::Failed;
                    job.message = message.clone();
                    job.finished_at = Some(Utc::now());
                });
                self.notifier.notify(Notification::persistent(
                    "Deployment Failed",
                    &message,
                    Severity::Error,
                ));
            }
        }
    }

    async fn refresh_cards(&self) {
        self.cache.invalidate_cards();
        match self.api.list_targets_with_stats().await {
            Ok(cards) => self.cache.put_cards(cards),
            Err(e) => warn!("Failed to refresh card summaries: {}", e),
        }
    }

    fn abort_task(&self) {
        let mut task = self.task.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(handle) = task.take() {
            handle.abort();
        }
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        self.abort_task();
    }
}
