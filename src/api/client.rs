//! HTTP client for the console backend
//!
//! Wraps `reqwest` with the base URL and bearer token of one session and
//! exposes one method per endpoint the dashboard reads.

use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;

use super::{
    ClusterRecord, DeviceRecord, MqttInfoRecord, MqttStats, OrganizationRecord,
    OrganizationsResponse, ProfileResponse, TemplateRecord, TemplatesResponse, UserRecord,
};

/// Default backend location when nothing is configured
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Errors that can occur when calling the backend
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// Backend answered with a non-success status code
    #[error("{path} returned HTTP {status}")]
    Status { path: String, status: u16 },

    /// Failed to parse JSON response
    #[error("Failed to parse JSON response: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Backend answered but reported a failure in its envelope
    #[error("{path} reported status '{status}'")]
    Rejected { path: String, status: String },

    /// Envelope was successful but lacked a required field
    #[error("Missing expected field in response: {0}")]
    MissingField(String),
}

/// Client for the console's REST backend
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl Default for ApiClient {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl ApiClient {
    /// Create a new ApiClient for the given backend
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    /// Create a new ApiClient with a custom HTTP client
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        }
    }

    /// Create a new ApiClient whose requests give up after `timeout`
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    /// Attach a bearer token to every request
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = format!("{}{}", self.base_url, path);

        let mut request = self.client.get(&url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                path: path.to_string(),
                status: status.as_u16(),
            });
        }

        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Fetch the signed-in user's profile
    pub async fn fetch_profile(&self) -> Result<UserRecord, ApiError> {
        let path = "/api/profile/";
        let response: ProfileResponse = self.get_json(path).await?;
        ensure_success(path, &response.status)?;
        response
            .user
            .ok_or_else(|| ApiError::MissingField("user".to_string()))
    }

    /// Fetch the organizations the user belongs to
    pub async fn fetch_organizations(&self) -> Result<Vec<OrganizationRecord>, ApiError> {
        let path = "/api/organizations/";
        let response: OrganizationsResponse = self.get_json(path).await?;
        ensure_success(path, &response.status)?;
        Ok(response.organizations)
    }

    /// Fetch the user's dashboard templates
    pub async fn fetch_dashboard_templates(&self) -> Result<Vec<TemplateRecord>, ApiError> {
        let path = "/api/dashboard-templates/";
        let response: TemplatesResponse = self.get_json(path).await?;
        ensure_success(path, &response.status)?;
        Ok(response.templates)
    }

    /// Fetch every device visible to the user
    pub async fn fetch_devices(&self) -> Result<Vec<DeviceRecord>, ApiError> {
        self.get_json("/api/devices/").await
    }

    /// Fetch every MQTT cluster, hosted and external
    pub async fn fetch_mqtt_clusters(&self) -> Result<Vec<ClusterRecord>, ApiError> {
        self.get_json("/api/mqtt-clusters/").await
    }

    /// Fetch the user's MQTT connection info
    pub async fn fetch_mqtt_info(&self) -> Result<MqttInfoRecord, ApiError> {
        self.get_json("/api/mqtt/user-info/").await
    }

    /// Fetch broker-wide MQTT statistics
    pub async fn fetch_mqtt_stats(&self) -> Result<MqttStats, ApiError> {
        self.get_json("/api/mqtt/stats/").await
    }
}

fn ensure_success(path: &str, status: &str) -> Result<(), ApiError> {
    if status == "success" {
        Ok(())
    } else {
        Err(ApiError::Rejected {
            path: path.to_string(),
            status: status.to_string(),
        })
    }
}
