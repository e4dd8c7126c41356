//! Settings file management

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::deploy::orchestrator::SubmitMode;
use crate::errors::DeployError;
use crate::logs::LogLevel;

/// Deployer settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Backend configuration
    #[serde(default)]
    pub backend: BackendSettings,

    /// Submission mode: "direct" or "channel"
    #[serde(default = "default_submit_mode")]
    pub submit_mode: String,

    /// Poll budget in one-second attempts. 60 covers long test runs; 30
    /// suits quick metadata-only deployments.
    #[serde(default = "default_poll_max_attempts")]
    pub poll_max_attempts: u32,
}

fn default_submit_mode() -> String {
    "direct".to_string()
}

fn default_poll_max_attempts() -> u32 {
    60
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            backend: BackendSettings::default(),
            submit_mode: default_submit_mode(),
            poll_max_attempts: default_poll_max_attempts(),
        }
    }
}

impl Settings {
    /// Read settings from a JSON file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, DeployError> {
        let raw = tokio::fs::read(path).await?;
        let settings = serde_json::from_slice(&raw)?;
        Ok(settings)
    }

    pub fn submit_mode(&self) -> Result<SubmitMode, DeployError> {
        match self.submit_mode.as_str() {
            "direct" => Ok(SubmitMode::Direct),
            "channel" => Ok(SubmitMode::SideChannel),
            other => Err(DeployError::ConfigError(format!(
                "unknown submit mode: {}",
                other
            ))),
        }
    }
}

/// Backend API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendSettings {
    /// Base URL for the backend API
    #[serde(default = "default_backend_url")]
    pub base_url: String,

    /// Optional bearer token for the backend session
    #[serde(default)]
    pub session_token: Option<String>,
}

fn default_backend_url() -> String {
    "http://localhost:8000/api/v1".to_string()
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            base_url: default_backend_url(),
            session_token: None,
        }
    }
}
