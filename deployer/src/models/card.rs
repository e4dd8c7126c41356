//! Deployable target models

use serde::{Deserialize, Serialize};

/// Aggregate stats for one deployable target
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardSummary {
    /// Identifier of the entity being deployed
    pub target_key: String,

    pub label: String,

    /// Number of distinct picklist fields with mappings
    pub field_count: u32,

    pub total_mappings: u32,

    /// Whether a deployed artifact already exists for this target
    #[serde(default)]
    pub has_deployed_artifact: bool,
}

/// Flat target listing entry (legacy single-select mode)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetOption {
    pub key: String,
    pub label: String,
}
