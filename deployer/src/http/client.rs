//! HTTP client implementation

use reqwest::{header, Client};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error};
use url::Url;

use crate::errors::DeployError;

/// HTTP client for the deployment backend
pub struct HttpClient {
    client: Client,
    base_url: String,
    session_token: Option<String>,
}

impl HttpClient {
    /// Create a new HTTP client
    pub fn new(base_url: &str) -> Result<Self, DeployError> {
        let parsed = Url::parse(base_url)
            .map_err(|e| DeployError::ConfigError(format!("invalid base URL: {}", e)))?;

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
            session_token: None,
        })
    }

    /// Create a new HTTP client authenticating with a session token
    pub fn with_session_token(base_url: &str, session_token: String) -> Result<Self, DeployError> {
        let mut client = Self::new(base_url)?;
        client.session_token = Some(session_token);
        Ok(client)
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, DeployError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);

        let mut request = self.client.get(&url);
        if let Some(token) = &self.session_token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("HTTP GET failed: {} - {}", status, body);
            return Err(status_error(status, body));
        }

        let body = response.json().await?;
        Ok(body)
    }

    /// Make a POST request
    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, DeployError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("POST {}", url);

        let mut request = self.client.post(&url).json(body);
        if let Some(token) = &self.session_token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("HTTP POST failed: {} - {}", status, body);
            return Err(status_error(status, body));
        }

        let body = response.json().await?;
        Ok(body)
    }
}

fn status_error(status: reqwest::StatusCode, body: String) -> DeployError {
    if status == reqwest::StatusCode::NOT_FOUND {
        DeployError::NotFound(body)
    } else {
        DeployError::Internal(format!("{}: {}", status, body))
    }
}
