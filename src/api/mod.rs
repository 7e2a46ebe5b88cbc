//! Console backend API models and client
//!
//! This module contains the wire types returned by the console's REST backend
//! for the endpoints the dashboard reads: profile, organizations, dashboard
//! templates, devices, MQTT clusters, MQTT connection info and MQTT statistics.

mod client;

pub use client::{ApiClient, ApiError, DEFAULT_BASE_URL};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Response envelope for `/api/profile/`
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileResponse {
    pub status: String,
    pub user: Option<UserRecord>,
}

/// The signed-in user as returned by the backend
#[derive(Debug, Clone, Deserialize)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub subscription_type: Option<String>,
}

/// Response envelope for `/api/organizations/`
#[derive(Debug, Clone, Deserialize)]
pub struct OrganizationsResponse {
    pub status: String,
    #[serde(default)]
    pub organizations: Vec<OrganizationRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrganizationRecord {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Response envelope for `/api/dashboard-templates/`
#[derive(Debug, Clone, Deserialize)]
pub struct TemplatesResponse {
    pub status: String,
    #[serde(default)]
    pub templates: Vec<TemplateRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TemplateRecord {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// A registered device as listed by `/api/devices/`
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceRecord {
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub organization_name: Option<String>,
    #[serde(default)]
    pub project_count: Option<u32>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// An MQTT cluster (hosted or external) as listed by `/api/mqtt-clusters/`
#[derive(Debug, Clone, Deserialize)]
pub struct ClusterRecord {
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub username: Option<String>,
    /// Never copied into cached summaries
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub cluster_type: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// MQTT connection info from `/api/mqtt/user-info/`
#[derive(Debug, Clone, Deserialize)]
pub struct MqttInfoRecord {
    #[serde(rename = "hasPassword", default)]
    pub has_password: bool,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub broker: Option<Broker>,
    #[serde(default)]
    pub connected: bool,
}

/// Broker address advertised to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Broker {
    pub host: String,
    pub port: u16,
}

/// MQTT broker statistics from `/api/mqtt/stats/`
///
/// Statistics carry nothing sensitive, so unknown fields are kept and cached
/// as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MqttStats {
    #[serde(default)]
    pub topics: u64,
    #[serde(default)]
    pub messages: u64,
    #[serde(default)]
    pub subscriptions: u64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
