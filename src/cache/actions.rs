//! Named user actions and the cache keys they make stale

use std::fmt;

use super::CacheKey;

/// A user-initiated mutation that invalidates part of the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    TemplateCreated,
    TemplateUpdated,
    TemplateDeleted,
    DeviceCreated,
    DeviceUpdated,
    DeviceDeleted,
    ClusterCreated,
    ClusterDeleted,
    MqttCredentialsUpdated,
    AclUpdated,
    ProfileUpdated,
}

impl Action {
    pub const ALL: [Action; 11] = [
        Action::TemplateCreated,
        Action::TemplateUpdated,
        Action::TemplateDeleted,
        Action::DeviceCreated,
        Action::DeviceUpdated,
        Action::DeviceDeleted,
        Action::ClusterCreated,
        Action::ClusterDeleted,
        Action::MqttCredentialsUpdated,
        Action::AclUpdated,
        Action::ProfileUpdated,
    ];

    /// Parses an action from its snake_case name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|action| action.as_str() == name)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::TemplateCreated => "template_created",
            Action::TemplateUpdated => "template_updated",
            Action::TemplateDeleted => "template_deleted",
            Action::DeviceCreated => "device_created",
            Action::DeviceUpdated => "device_updated",
            Action::DeviceDeleted => "device_deleted",
            Action::ClusterCreated => "cluster_created",
            Action::ClusterDeleted => "cluster_deleted",
            Action::MqttCredentialsUpdated => "mqtt_credentials_updated",
            Action::AclUpdated => "acl_updated",
            Action::ProfileUpdated => "profile_updated",
        }
    }

    /// Keys whose cached values this action renders stale
    pub fn affected_keys(&self) -> &'static [CacheKey] {
        match self {
            Action::TemplateCreated | Action::TemplateUpdated | Action::TemplateDeleted => {
                &[CacheKey::DashboardTemplates]
            }
            Action::DeviceCreated | Action::DeviceUpdated | Action::DeviceDeleted => {
                &[CacheKey::Devices]
            }
            Action::ClusterCreated | Action::ClusterDeleted => {
                &[CacheKey::MqttClusters, CacheKey::MqttInfo]
            }
            Action::MqttCredentialsUpdated => &[CacheKey::MqttInfo, CacheKey::MqttStats],
            Action::AclUpdated => &[CacheKey::MqttStats],
            Action::ProfileUpdated => &[CacheKey::Profile],
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
