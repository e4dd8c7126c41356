//! Deployment status models

use serde::{Deserialize, Serialize};

/// Terminal outcome of a deployment job
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Succeeded,
    Failed,
    #[default]
    Unknown,
}

/// Outcome of a single remote test run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TestOutcome {
    Pass,
    Fail,
}

/// One remote test result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub name: String,

    pub outcome: TestOutcome,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// One point-in-time read of a deployment job.
///
/// The side channel reports the same shape with legacy field names
/// (`componentFailures` / `testFailures`); the serde aliases normalize
/// both variants into this one model.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StatusSnapshot {
    pub components_total: u32,
    pub components_done: u32,
    pub tests_total: u32,
    pub tests_done: u32,
    pub test_errors: u32,

    /// Terminal flag
    pub done: bool,

    /// Only meaningful when `done` is set
    pub outcome: Outcome,

    /// Free-text message from the coarse protocol, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(alias = "componentFailures")]
    pub component_errors: Vec<String>,

    #[serde(alias = "testFailures")]
    pub test_results: Vec<TestResult>,
}

impl StatusSnapshot {
    /// Test results with a `Fail` outcome
    pub fn failed_tests(&self) -> impl Iterator<Item = &TestResult> {
        self.test_results
            .iter()
            .filter(|t| t.outcome == TestOutcome::Fail)
    }
}

/// Coarse status from the fallback protocol
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoarseStatus {
    pub state: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    pub done: bool,
}

impl CoarseStatus {
    /// Lift the coarse protocol into a snapshot. "Completed" is the only
    /// successful terminal state; any other terminal state is a failure.
    pub fn into_snapshot(self) -> StatusSnapshot {
        let outcome = if self.done {
            if self.state == "Completed" {
                Outcome::Succeeded
            } else {
                Outcome::Failed
            }
        } else {
            Outcome::Unknown
        };

        let message = match self.message {
            Some(m) if !m.is_empty() => format!("{} — {}", self.state, m),
            _ => self.state,
        };

        StatusSnapshot {
            done: self.done,
            outcome,
            message: Some(message),
            ..StatusSnapshot::default()
        }
    }
}
