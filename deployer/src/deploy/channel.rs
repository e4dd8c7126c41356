//! Indirect submission over an out-of-band side channel
//!
//! In this mode the deployment itself runs in a detached execution
//! context; the orchestrator only learns the job handle (or a failure)
//! by probing the channel, or through inbound typed events.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::DeployError;
use crate::models::status::StatusSnapshot;
use crate::services::DeployApi;

/// Opaque handle to an open side channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelHandle {
    pub id: String,
}

/// Result payload reported through the side channel
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChannelResult {
    pub success: bool,
    pub job_id: Option<String>,
    pub error: Option<String>,
}

/// One probe of the side channel
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelProbe {
    /// The channel closed without delivering a result
    pub closed: bool,

    pub result: Option<ChannelResult>,
}

/// Inbound event pushed by the side channel
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ChannelEvent {
    Progress { status: StatusSnapshot },
    Complete { status: StatusSnapshot },
}

/// Side-channel wait options
#[derive(Debug, Clone)]
pub struct ChannelWaitOptions {
    /// Probe interval
    pub interval: Duration,

    /// Overall budget for the handle to arrive
    pub timeout: Duration,
}

impl Default for ChannelWaitOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            timeout: Duration::from_secs(30),
        }
    }
}

impl ChannelWaitOptions {
    fn max_probes(&self) -> u32 {
        let interval = self.interval.as_millis().max(1);
        (self.timeout.as_millis() / interval) as u32
    }
}

/// Open a side channel and probe it until a job handle arrives, the
/// channel reports a failure, the channel closes, or the budget runs out.
///
/// A failed probe is ignored for that cycle; the channel may simply not
/// be reachable yet.
pub async fn await_channel_result<A, S, F>(
    api: &A,
    target_key: &str,
    options: &ChannelWaitOptions,
    sleep_fn: S,
) -> Result<String, DeployError>
where
    A: DeployApi + ?Sized,
    S: Fn(Duration) -> F,
    F: Future<Output = ()>,
{
    let handle = api.open_side_channel(target_key).await?;
    debug!(channel = %handle.id, "Side channel opened, waiting for result...");

    for _ in 0..options.max_probes() {
        sleep_fn(options.interval).await;

        let probe = match api.inspect_side_channel(&handle).await {
            Ok(probe) => probe,
            Err(e) => {
                debug!("Side channel probe failed, retrying: {}", e);
                continue;
            }
        };

        if let Some(result) = probe.result {
            if result.success {
                if let Some(job_id) = result.job_id {
                    return Ok(job_id);
                }
                return Err(DeployError::SubmissionError(
                    "side channel reported success without a job handle".to_string(),
                ));
            }
            return Err(DeployError::SubmissionError(
                result.error.unwrap_or_else(|| "Deployment failed".to_string()),
            ));
        }

        if probe.closed {
            return Err(DeployError::SubmissionError(
                "closed before result".to_string(),
            ));
        }
    }

    Err(DeployError::TimedOut(
        "side channel produced no result within the wait budget".to_string(),
    ))
}
