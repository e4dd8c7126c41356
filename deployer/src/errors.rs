//! Error types for the deployment orchestrator

use thiserror::Error;

/// Main error type for the deployer
#[derive(Error, Debug)]
pub enum DeployError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// The submission channel rejected or lost the deployment request.
    #[error("Submission error: {0}")]
    SubmissionError(String),

    /// Both the detailed and the fallback status protocol failed in the
    /// same cycle. The monitoring channel is broken, not the deployment.
    #[error("Status check error: {0}")]
    StatusCheckError(String),

    /// The remote job completed with a failure outcome.
    #[error("Deployment failed: {0}")]
    DeploymentFailed(String),

    /// The poll budget ran out without a terminal result. The job may
    /// still be running remotely.
    #[error("Timed out: {0}")]
    TimedOut(String),

    #[error("Source fetch error: {0}")]
    SourceFetchError(String),

    /// A submission was rejected because one is already in flight.
    #[error("Job already in flight for {0}")]
    JobInFlight(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for DeployError {
    fn from(err: anyhow::Error) -> Self {
        DeployError::Internal(err.to_string())
    }
}
