//! External service contracts
//!
//! The orchestrator never talks to the remote system directly; everything
//! goes through this trait so the transport can be swapped (and mocked).

use async_trait::async_trait;

use crate::deploy::channel::{ChannelHandle, ChannelProbe};
use crate::errors::DeployError;
use crate::mapping::MappingBundle;
use crate::models::card::{CardSummary, TargetOption};
use crate::models::status::{CoarseStatus, StatusSnapshot};

/// Remote deployment service contract
#[async_trait]
pub trait DeployApi: Send + Sync {
    /// Submit a deployment directly, returning the job handle
    async fn submit_deployment(&self, target_key: &str) -> Result<String, DeployError>;

    /// Open an out-of-band side channel that performs the deployment
    async fn open_side_channel(&self, target_key: &str) -> Result<ChannelHandle, DeployError>;

    /// Inspect a side channel for a result or closure
    async fn inspect_side_channel(
        &self,
        handle: &ChannelHandle,
    ) -> Result<ChannelProbe, DeployError>;

    /// Rich per-component, per-test status
    async fn query_detailed_status(&self, job_id: &str) -> Result<StatusSnapshot, DeployError>;

    /// Coarse fallback status
    async fn query_status(&self, job_id: &str) -> Result<CoarseStatus, DeployError>;

    /// Flat listing of deployable targets
    async fn list_targets(&self) -> Result<Vec<TargetOption>, DeployError>;

    /// Card listing with aggregate mapping stats
    async fn list_targets_with_stats(&self) -> Result<Vec<CardSummary>, DeployError>;

    /// Raw field-mapping configuration for one target
    async fn get_field_mappings(&self, target_key: &str) -> Result<MappingBundle, DeployError>;

    /// Source text of the deployed artifact
    async fn get_deployed_source_text(&self, target_key: &str) -> Result<String, DeployError>;
}
