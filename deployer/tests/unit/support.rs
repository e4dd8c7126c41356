//! Shared test doubles

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use metadeploy::deploy::channel::{ChannelHandle, ChannelProbe};
use metadeploy::errors::DeployError;
use metadeploy::mapping::MappingBundle;
use metadeploy::models::card::{CardSummary, TargetOption};
use metadeploy::models::status::{CoarseStatus, Outcome, StatusSnapshot};
use metadeploy::notify::{Notification, Notifier};
use metadeploy::services::DeployApi;

/// Scripted DeployApi double. Responses are queued per endpoint and
/// popped in order; empty queues fall back to a per-endpoint default.
#[derive(Default)]
pub struct MockApi {
    pub submit_responses: Mutex<VecDeque<Result<String, DeployError>>>,
    pub detailed_responses: Mutex<VecDeque<Result<StatusSnapshot, DeployError>>>,
    pub coarse_responses: Mutex<VecDeque<Result<CoarseStatus, DeployError>>>,
    pub probe_responses: Mutex<VecDeque<Result<ChannelProbe, DeployError>>>,
    pub source_responses: Mutex<VecDeque<Result<String, DeployError>>>,
    pub cards: Mutex<Vec<CardSummary>>,
    pub targets: Mutex<Vec<TargetOption>>,
    pub bundle: Mutex<MappingBundle>,

    pub detailed_calls: AtomicU32,
    pub coarse_calls: AtomicU32,
    pub targets_calls: AtomicU32,
    pub stats_calls: AtomicU32,
    pub mapping_calls: AtomicU32,
    pub source_calls: AtomicU32,
}

impl MockApi {
    pub fn push_detailed(&self, response: Result<StatusSnapshot, DeployError>) {
        self.detailed_responses.lock().unwrap().push_back(response);
    }

    pub fn push_coarse(&self, response: Result<CoarseStatus, DeployError>) {
        self.coarse_responses.lock().unwrap().push_back(response);
    }

    pub fn push_submit(&self, response: Result<String, DeployError>) {
        self.submit_responses.lock().unwrap().push_back(response);
    }

    pub fn push_probe(&self, response: Result<ChannelProbe, DeployError>) {
        self.probe_responses.lock().unwrap().push_back(response);
    }

    pub fn push_source(&self, response: Result<String, DeployError>) {
        self.source_responses.lock().unwrap().push_back(response);
    }
}

#[async_trait]
impl DeployApi for MockApi {
    async fn submit_deployment(&self, _target_key: &str) -> Result<String, DeployError> {
        self.submit_responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("job-1".to_string()))
    }

    async fn open_side_channel(&self, _target_key: &str) -> Result<ChannelHandle, DeployError> {
        Ok(ChannelHandle {
            id: "chan-1".to_string(),
        })
    }

    async fn inspect_side_channel(
        &self,
        _handle: &ChannelHandle,
    ) -> Result<ChannelProbe, DeployError> {
        self.probe_responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(ChannelProbe::default()))
    }

    async fn query_detailed_status(&self, _job_id: &str) -> Result<StatusSnapshot, DeployError> {
        self.detailed_calls.fetch_add(1, Ordering::SeqCst);
        self.detailed_responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(DeployError::StatusCheckError(
                    "no scripted detailed response".to_string(),
                ))
            })
    }

    async fn query_status(&self, _job_id: &str) -> Result<CoarseStatus, DeployError> {
        self.coarse_calls.fetch_add(1, Ordering::SeqCst);
        self.coarse_responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(DeployError::StatusCheckError(
                    "no scripted coarse response".to_string(),
                ))
            })
    }

    async fn list_targets(&self) -> Result<Vec<TargetOption>, DeployError> {
        self.targets_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.targets.lock().unwrap().clone())
    }

    async fn list_targets_with_stats(&self) -> Result<Vec<CardSummary>, DeployError> {
        self.stats_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.cards.lock().unwrap().clone())
    }

    async fn get_field_mappings(&self, _target_key: &str) -> Result<MappingBundle, DeployError> {
        self.mapping_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.bundle.lock().unwrap().clone())
    }

    async fn get_deployed_source_text(&self, _target_key: &str) -> Result<String, DeployError> {
        self.source_calls.fetch_add(1, Ordering::SeqCst);
        self.source_responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("trigger AccountDates on Account (before insert) {}".to_string()))
    }
}

/// Notifier that records everything it is asked to show
#[derive(Default)]
pub struct RecordingNotifier {
    pub notifications: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn taken(&self) -> Vec<Notification> {
        self.notifications.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.notifications.lock().unwrap().push(notification);
    }
}

/// In-progress snapshot with component counts
pub fn progress_snapshot(done: u32, total: u32) -> StatusSnapshot {
    StatusSnapshot {
        components_total: total,
        components_done: done,
        ..StatusSnapshot::default()
    }
}

/// Terminal success snapshot
pub fn success_snapshot(components: u32) -> StatusSnapshot {
    StatusSnapshot {
        components_total: components,
        components_done: components,
        done: true,
        outcome: Outcome::Succeeded,
        ..StatusSnapshot::default()
    }
}

/// Terminal failure snapshot with component errors
pub fn failure_snapshot(errors: Vec<&str>) -> StatusSnapshot {
    StatusSnapshot {
        done: true,
        outcome: Outcome::Failed,
        component_errors: errors.into_iter().map(String::from).collect(),
        ..StatusSnapshot::default()
    }
}

pub fn card(target_key: &str, deployed: bool) -> CardSummary {
    CardSummary {
        target_key: target_key.to_string(),
        label: target_key.to_string(),
        field_count: 2,
        total_mappings: 4,
        has_deployed_artifact: deployed,
    }
}
