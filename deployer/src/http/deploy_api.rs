//! Deployment API over HTTP

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::deploy::channel::{ChannelHandle, ChannelProbe};
use crate::errors::DeployError;
use crate::http::client::HttpClient;
use crate::mapping::MappingBundle;
use crate::models::card::{CardSummary, TargetOption};
use crate::models::status::{CoarseStatus, StatusSnapshot};
use crate::services::DeployApi;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DeployRequest<'a> {
    target_key: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeployResponse {
    job_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelResponse {
    channel_id: String,
}

#[derive(Debug, Deserialize)]
struct TargetListResponse {
    targets: Vec<TargetOption>,
}

#[derive(Debug, Deserialize)]
struct CardListResponse {
    cards: Vec<CardSummary>,
}

#[derive(Debug, Deserialize)]
struct SourceResponse {
    source: String,
}

#[async_trait]
impl DeployApi for HttpClient {
    async fn submit_deployment(&self, target_key: &str) -> Result<String, DeployError> {
        let response: DeployResponse = self
            .post("/deployments", &DeployRequest { target_key })
            .await
            .map_err(submission_error)?;
        Ok(response.job_id)
    }

    async fn open_side_channel(&self, target_key: &str) -> Result<ChannelHandle, DeployError> {
        let response: ChannelResponse = self
            .post("/deployments/channel", &DeployRequest { target_key })
            .await
            .map_err(submission_error)?;
        Ok(ChannelHandle {
            id: response.channel_id,
        })
    }

    async fn inspect_side_channel(
        &self,
        handle: &ChannelHandle,
    ) -> Result<ChannelProbe, DeployError> {
        self.get(&format!("/deployments/channel/{}", handle.id)).await
    }

    async fn query_detailed_status(&self, job_id: &str) -> Result<StatusSnapshot, DeployError> {
        self.get(&format!("/deployments/{}/status/detailed", job_id))
            .await
    }

    async fn query_status(&self, job_id: &str) -> Result<CoarseStatus, DeployError> {
        self.get(&format!("/deployments/{}/status", job_id)).await
    }

    async fn list_targets(&self) -> Result<Vec<TargetOption>, DeployError> {
        let response: TargetListResponse = self.get("/targets").await?;
        Ok(response.targets)
    }

    async fn list_targets_with_stats(&self) -> Result<Vec<CardSummary>, DeployError> {
        let response: CardListResponse = self.get("/targets/stats").await?;
        Ok(response.cards)
    }

    async fn get_field_mappings(&self, target_key: &str) -> Result<MappingBundle, DeployError> {
        self.get(&format!("/targets/{}/mappings", target_key)).await
    }

    async fn get_deployed_source_text(&self, target_key: &str) -> Result<String, DeployError> {
        let response: SourceResponse = self.get(&format!("/targets/{}/source", target_key)).await?;
        Ok(response.source)
    }
}

fn submission_error(err: DeployError) -> DeployError {
    match err {
        e @ DeployError::SubmissionError(_) => e,
        e => DeployError::SubmissionError(e.to_string()),
    }
}
