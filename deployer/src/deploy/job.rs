//! Deployment job view model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::status::StatusSnapshot;

/// Lifecycle phase of a deployment job
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobPhase {
    #[default]
    Idle,
    Submitting,
    Polling,
    Succeeded,
    Failed,
    TimedOut,
}

impl JobPhase {
    /// A submission or poll loop is currently in flight
    pub fn is_active(&self) -> bool {
        matches!(self, JobPhase::Submitting | JobPhase::Polling)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobPhase::Succeeded | JobPhase::Failed | JobPhase::TimedOut
        )
    }
}

/// One deployment attempt for a target, tracked start-to-terminal.
/// Mutated only by the orchestrator; presentation layers read it through
/// the watch channel.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeploymentJob {
    /// Identifier of the entity being deployed, immutable for the job's life
    pub target_key: String,

    /// Local correlation id, exists before the remote handle does
    pub local_id: Option<Uuid>,

    /// Opaque handle from the submission channel
    pub job_id: Option<String>,

    pub phase: JobPhase,

    /// Status queries issued for this job
    pub attempts: u32,

    /// Aggregate progress / status line
    pub message: String,

    /// Latest snapshot; no history is kept
    pub snapshot: Option<StatusSnapshot>,

    /// Deployed artifact source text, fetched best-effort on success
    pub source: Option<String>,

    /// Whether the progress view is showing
    pub progress_visible: bool,

    /// Hint shown next to the progress view's close control
    pub close_message: String,

    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl DeploymentJob {
    /// Fresh job entering submission
    pub fn submitting(target_key: &str) -> Self {
        Self {
            target_key: target_key.to_string(),
            local_id: Some(Uuid::new_v4()),
            phase: JobPhase::Submitting,
            started_at: Some(Utc::now()),
            ..Self::default()
        }
    }

    /// Retry is allowed from any failure-shaped terminal phase
    pub fn can_retry(&self) -> bool {
        matches!(self.phase, JobPhase::Failed | JobPhase::TimedOut)
    }

    pub fn component_percent(&self) -> u32 {
        self.snapshot
            .as_ref()
            .map(|s| percent(s.components_done, s.components_total))
            .unwrap_or(0)
    }

    pub fn test_percent(&self) -> u32 {
        self.snapshot
            .as_ref()
            .map(|s| percent(s.tests_done, s.tests_total))
            .unwrap_or(0)
    }

    /// Combined progress line, component and test parts each present only
    /// when the remote reported a total for them
    pub fn progress_message(&self) -> String {
        let Some(snapshot) = self.snapshot.as_ref() else {
            return String::new();
        };

        let mut message = String::new();
        if snapshot.components_total > 0 {
            message = format!(
                "Deploying: {}/{} components",
                snapshot.components_done, snapshot.components_total
            );
        }
        if snapshot.tests_total > 0 {
            if !message.is_empty() {
                message.push_str(" | ");
            }
            message.push_str(&format!(
                "Tests: {}/{}",
                snapshot.tests_done, snapshot.tests_total
            ));
        }
        message
    }
}

fn percent(done: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    ((done as f64 / total as f64) * 100.0).round() as u32
}
