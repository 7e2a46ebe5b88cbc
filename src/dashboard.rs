//! Cached dashboard summaries
//!
//! `DashboardService` pairs an [`ApiClient`] with a [`CacheService`] and
//! exposes one typed accessor per cache key. Each accessor trims the backend
//! response down to the fields the dashboard tiles need, so tokens and
//! passwords never enter the cache.

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::warn;

use crate::api::{ApiClient, ApiError, Broker, MqttStats};
use crate::cache::{CacheError, CacheKey, CacheService};

/// Broker advertised when the backend can't tell us the user's broker
const FALLBACK_BROKER_HOST: &str = "13.203.165.247";
const FALLBACK_BROKER_PORT: u16 = 1883;

/// Subscription tier shown when the profile doesn't name one
const DEFAULT_SUBSCRIPTION: &str = "freemium";

/// Non-sensitive slice of the user profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileSummary {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub subscription_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganizationSummary {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrganizationsSummary {
    pub count: usize,
    pub organizations: Vec<OrganizationSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateSummary {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplatesSummary {
    pub count: usize,
    pub templates: Vec<TemplateSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceSummary {
    pub uuid: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub organization_name: Option<String>,
    pub project_count: u32,
    pub is_active: bool,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DevicesSummary {
    pub count: usize,
    pub devices: Vec<DeviceSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterSummary {
    pub uuid: Option<String>,
    pub name: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub cluster_type: Option<String>,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClustersSummary {
    pub count: usize,
    pub clusters: Vec<ClusterSummary>,
}

/// MQTT connection status without credentials
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MqttInfoSummary {
    pub has_password: bool,
    pub username: Option<String>,
    pub broker: Broker,
    pub connected: bool,
}

impl Default for MqttInfoSummary {
    fn default() -> Self {
        Self {
            has_password: false,
            username: None,
            broker: Broker {
                host: FALLBACK_BROKER_HOST.to_string(),
                port: FALLBACK_BROKER_PORT,
            },
            connected: false,
        }
    }
}

/// Counters written by callers into the untracked overview slot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewStats {
    pub connected_devices: u64,
    pub mqtt_clusters: u64,
}

/// Everything the dashboard landing page shows
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardData {
    pub profile: Option<ProfileSummary>,
    pub organizations: OrganizationsSummary,
    pub templates: TemplatesSummary,
    pub devices: DevicesSummary,
    pub clusters: ClustersSummary,
    pub mqtt_info: MqttInfoSummary,
    pub mqtt_stats: MqttStats,
}

/// Tile counters derived from [`DashboardData`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardSummary {
    pub organizations: usize,
    pub devices: usize,
    pub templates: usize,
    pub clusters: usize,
    pub messages: u64,
    pub subscription_type: String,
}

impl DashboardData {
    pub fn summary(&self) -> DashboardSummary {
        DashboardSummary {
            organizations: self.organizations.count,
            devices: self.devices.count,
            templates: self.templates.count,
            clusters: self.clusters.count,
            messages: self.mqtt_stats.messages,
            subscription_type: self
                .profile
                .as_ref()
                .and_then(|profile| profile.subscription_type.clone())
                .unwrap_or_else(|| DEFAULT_SUBSCRIPTION.to_string()),
        }
    }
}

/// Reads dashboard data through the cache
#[derive(Debug, Clone)]
pub struct DashboardService {
    api: ApiClient,
    cache: CacheService,
}

impl DashboardService {
    pub fn new(api: ApiClient, cache: CacheService) -> Self {
        Self { api, cache }
    }

    pub fn cache(&self) -> &CacheService {
        &self.cache
    }

    pub async fn profile(&self) -> Result<ProfileSummary, CacheError> {
        self.cache
            .get(CacheKey::Profile, || async {
                let user = self.api.fetch_profile().await?;
                Ok::<_, ApiError>(ProfileSummary {
                    id: user.id,
                    username: user.username,
                    email: user.email,
                    subscription_type: user.subscription_type,
                })
            })
            .await
    }

    pub async fn organizations(&self) -> Result<OrganizationsSummary, CacheError> {
        self.cache
            .get(CacheKey::Organizations, || async {
                let organizations: Vec<OrganizationSummary> = self
                    .api
                    .fetch_organizations()
                    .await?
                    .into_iter()
                    .map(|org| OrganizationSummary {
                        id: org.id,
                        name: org.name,
                        description: org.description,
                    })
                    .collect();
                Ok::<_, ApiError>(OrganizationsSummary {
                    count: organizations.len(),
                    organizations,
                })
            })
            .await
    }

    pub async fn dashboard_templates(&self) -> Result<TemplatesSummary, CacheError> {
        self.cache
            .get(CacheKey::DashboardTemplates, || async {
                let templates: Vec<TemplateSummary> = self
                    .api
                    .fetch_dashboard_templates()
                    .await?
                    .into_iter()
                    .map(|template| TemplateSummary {
                        id: template.id,
                        name: template.name,
                        description: template.description,
                        created_at: template.created_at,
                    })
                    .collect();
                Ok::<_, ApiError>(TemplatesSummary {
                    count: templates.len(),
                    templates,
                })
            })
            .await
    }

    /// Device summaries; a failed listing is cached as an empty list
    pub async fn devices(&self) -> Result<DevicesSummary, CacheError> {
        self.cache
            .get(CacheKey::Devices, || async {
                let devices = match self.api.fetch_devices().await {
                    Ok(devices) => devices,
                    Err(err) => {
                        warn!(error = %err, "failed to fetch devices, using empty list");
                        return Ok::<_, ApiError>(DevicesSummary::default());
                    }
                };
                let devices: Vec<DeviceSummary> = devices
                    .into_iter()
                    .map(|device| DeviceSummary {
                        uuid: device.uuid,
                        name: device.name,
                        description: device.description,
                        status: device.status,
                        organization_name: device.organization_name,
                        project_count: device.project_count.unwrap_or_default(),
                        is_active: device.is_active.unwrap_or_default(),
                        created_at: device.created_at,
                    })
                    .collect();
                Ok(DevicesSummary {
                    count: devices.len(),
                    devices,
                })
            })
            .await
    }

    /// Cluster summaries without passwords; a failed listing is cached as an
    /// empty list
    pub async fn mqtt_clusters(&self) -> Result<ClustersSummary, CacheError> {
        self.cache
            .get(CacheKey::MqttClusters, || async {
                let clusters = match self.api.fetch_mqtt_clusters().await {
                    Ok(clusters) => clusters,
                    Err(err) => {
                        warn!(error = %err, "failed to fetch MQTT clusters, using empty list");
                        return Ok::<_, ApiError>(ClustersSummary::default());
                    }
                };
                let clusters: Vec<ClusterSummary> = clusters
                    .into_iter()
                    .map(|cluster| ClusterSummary {
                        uuid: cluster.uuid,
                        name: cluster.name,
                        host: cluster.host,
                        port: cluster.port,
                        username: cluster.username,
                        cluster_type: cluster.cluster_type,
                        created_at: cluster.created_at,
                    })
                    .collect();
                Ok(ClustersSummary {
                    count: clusters.len(),
                    clusters,
                })
            })
            .await
    }

    /// MQTT connection status; a failed lookup is cached as the fallback broker
    pub async fn mqtt_info(&self) -> Result<MqttInfoSummary, CacheError> {
        self.cache
            .get(CacheKey::MqttInfo, || async {
                let info = match self.api.fetch_mqtt_info().await {
                    Ok(info) => info,
                    Err(err) => {
                        warn!(error = %err, "could not load MQTT info, using defaults");
                        return Ok::<_, ApiError>(MqttInfoSummary::default());
                    }
                };
                let fallback = MqttInfoSummary::default();
                Ok(MqttInfoSummary {
                    has_password: info.has_password,
                    username: info.username,
                    broker: info.broker.unwrap_or(fallback.broker),
                    connected: info.connected,
                })
            })
            .await
    }

    pub async fn mqtt_stats(&self) -> Result<MqttStats, CacheError> {
        self.cache
            .get(CacheKey::MqttStats, || self.api.fetch_mqtt_stats())
            .await
    }

    /// Reads every summary concurrently, substituting an empty value for any
    /// that fails
    pub async fn dashboard_data(&self) -> DashboardData {
        let (profile, organizations, templates, devices, clusters, mqtt_info, stats) =
            tokio::join!(
                self.profile(),
                self.organizations(),
                self.dashboard_templates(),
                self.devices(),
                self.mqtt_clusters(),
                self.mqtt_info(),
                self.mqtt_stats(),
            );

        DashboardData {
            profile: profile.map_err(log_failure).ok(),
            organizations: or_default(organizations),
            templates: or_default(templates),
            devices: or_default(devices),
            clusters: or_default(clusters),
            mqtt_info: or_default(mqtt_info),
            mqtt_stats: or_default(stats),
        }
    }

    /// Warms the cache in the background
    ///
    /// The returned handle may be dropped; failures are logged, never raised.
    pub fn preload(&self) -> JoinHandle<()> {
        let service = self.clone();
        tokio::spawn(async move {
            service.dashboard_data().await;
        })
    }

    /// Drops every cached entry and reads the dashboard again
    pub async fn refresh(&self) -> DashboardData {
        self.cache.clear_all();
        self.dashboard_data().await
    }

    /// Last overview counters stored, or zeros when none were stored
    pub fn overview_stats(&self) -> OverviewStats {
        let Some(value) = self.cache.raw_get(CacheKey::OverviewStats) else {
            return OverviewStats::default();
        };
        serde_json::from_value(value).unwrap_or_else(|err| {
            warn!(error = %err, "ignoring malformed overview stats");
            OverviewStats::default()
        })
    }

    pub fn set_overview_stats(&self, stats: OverviewStats) {
        match serde_json::to_value(stats) {
            Ok(value) => self.cache.raw_set(CacheKey::OverviewStats, value),
            Err(err) => warn!(error = %err, "failed to store overview stats"),
        }
    }
}

fn log_failure(err: CacheError) -> CacheError {
    warn!(error = %err, "dashboard item unavailable");
    err
}

fn or_default<T: Default>(result: Result<T, CacheError>) -> T {
    result.map_err(log_failure).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{ManualClock, TtlPolicy};
    use chrono::Utc;
    use serde_json::json;
    use std::sync::Arc;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn create_service(server: &MockServer) -> (DashboardService, ManualClock) {
        let clock = ManualClock::new(Utc::now());
        let cache = CacheService::with_clock(TtlPolicy::default(), Arc::new(clock.clone()));
        (DashboardService::new(ApiClient::new(server.uri()), cache), clock)
    }

    async fn mount_json(server: &MockServer, route: &str, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    async fn mount_full_backend(server: &MockServer) {
        mount_json(
            server,
            "/api/profile/",
            json!({
                "status": "success",
                "user": { "id": 1, "username": "ops", "email": "ops@example.com",
                          "subscription_type": "pro", "access_token": "tok" }
            }),
        )
        .await;
        mount_json(
            server,
            "/api/organizations/",
            json!({
                "status": "success",
                "organizations": [
                    { "id": 1, "name": "Acme", "description": "plant", "billing": "secret" },
                    { "id": 2, "name": "Globex" }
                ]
            }),
        )
        .await;
        mount_json(
            server,
            "/api/dashboard-templates/",
            json!({ "status": "success", "templates": [ { "id": 3, "name": "Line 1" } ] }),
        )
        .await;
        mount_json(
            server,
            "/api/devices/",
            json!([
                { "uuid": "d-1", "name": "Pump", "is_active": true, "token": "device-secret" },
                { "uuid": "d-2", "name": "Valve" },
                { "uuid": "d-3", "name": "Meter" }
            ]),
        )
        .await;
        mount_json(
            server,
            "/api/mqtt-clusters/",
            json!([
                { "uuid": "c-1", "name": "hosted", "host": "mq.local", "port": 1883,
                  "username": "u", "password": "hunter2", "cluster_type": "hosted" }
            ]),
        )
        .await;
        mount_json(
            server,
            "/api/mqtt/user-info/",
            json!({ "hasPassword": true, "username": "u", "connected": true,
                    "broker": { "host": "mq.local", "port": 1883 } }),
        )
        .await;
        mount_json(
            server,
            "/api/mqtt/stats/",
            json!({ "topics": 2, "messages": 512, "subscriptions": 4 }),
        )
        .await;
    }

    #[tokio::test]
    async fn test_dashboard_data_reads_every_summary() {
        let server = MockServer::start().await;
        mount_full_backend(&server).await;
        let (service, _clock) = create_service(&server);

        let data = service.dashboard_data().await;

        assert_eq!(data.profile.as_ref().map(|p| p.username.as_str()), Some("ops"));
        assert_eq!(data.organizations.count, 2);
        assert_eq!(data.templates.count, 1);
        assert_eq!(data.devices.count, 3);
        assert_eq!(data.clusters.count, 1);
        assert!(data.mqtt_info.connected);
        assert_eq!(data.mqtt_stats.messages, 512);

        let summary = data.summary();
        assert_eq!(summary.organizations, 2);
        assert_eq!(summary.devices, 3);
        assert_eq!(summary.messages, 512);
        assert_eq!(summary.subscription_type, "pro");

        for key in CacheKey::TRACKED {
            assert!(service.cache().is_cache_valid(key), "{key} should be cached");
        }
    }

    #[tokio::test]
    async fn test_lists_with_incomplete_records_keep_every_entry() {
        let server = MockServer::start().await;
        mount_json(
            &server,
            "/api/devices/",
            json!([
                { "uuid": "d-1", "name": "Pump" },
                { "uuid": "d-2", "name": null, "project_count": null }
            ]),
        )
        .await;
        mount_json(
            &server,
            "/api/mqtt-clusters/",
            json!([
                { "uuid": "c-1", "name": "hosted", "host": "mq.local", "port": 1883 },
                { "uuid": "c-2", "name": "external", "host": "mq.remote" }
            ]),
        )
        .await;
        let (service, _clock) = create_service(&server);

        let devices = service.devices().await.unwrap();
        let clusters = service.mqtt_clusters().await.unwrap();

        assert_eq!(devices.count, 2);
        assert_eq!(devices.devices[0].name.as_deref(), Some("Pump"));
        assert!(devices.devices[1].name.is_none());
        assert_eq!(devices.devices[1].project_count, 0);
        assert_eq!(clusters.count, 2);
        assert_eq!(clusters.clusters[0].port, Some(1883));
        assert!(clusters.clusters[1].port.is_none());
    }

    #[tokio::test]
    async fn test_incomplete_device_record_does_not_wipe_stale_list() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/devices/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([ { "uuid": "d-1", "name": "Pump" } ])),
            )
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/devices/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "uuid": "d-1", "name": "Pump" },
                { "uuid": "d-2" }
            ])))
            .mount(&server)
            .await;
        let (service, clock) = create_service(&server);

        assert_eq!(service.devices().await.unwrap().count, 1);
        clock.advance_millis(121_000);
        let devices = service.devices().await.unwrap();

        assert_eq!(devices.count, 2);
        assert_eq!(devices.devices[1].uuid.as_deref(), Some("d-2"));
    }

    #[tokio::test]
    async fn test_cached_summaries_exclude_secrets() {
        let server = MockServer::start().await;
        mount_full_backend(&server).await;
        let (service, _clock) = create_service(&server);

        service.dashboard_data().await;

        for key in CacheKey::TRACKED {
            let raw = service.cache().raw_get(key).unwrap().to_string();
            assert!(!raw.contains("hunter2"), "{key} leaked a password");
            assert!(!raw.contains("device-secret"), "{key} leaked a device token");
            assert!(!raw.contains("tok\""), "{key} leaked an access token");
            assert!(!raw.contains("billing"), "{key} leaked org details");
        }
    }

    #[tokio::test]
    async fn test_second_read_within_ttl_skips_backend() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/mqtt/stats/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "messages": 1 })))
            .expect(1)
            .mount(&server)
            .await;
        let (service, clock) = create_service(&server);

        service.mqtt_stats().await.unwrap();
        clock.advance_millis(10_000);
        let stats = service.mqtt_stats().await.unwrap();

        assert_eq!(stats.messages, 1);
    }

    #[tokio::test]
    async fn test_expired_stats_fall_back_to_stale_on_backend_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/mqtt/stats/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "messages": 42 })))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/mqtt/stats/"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        let (service, clock) = create_service(&server);

        service.mqtt_stats().await.unwrap();
        clock.advance_millis(31_000);
        let stats = service.mqtt_stats().await.unwrap();

        assert_eq!(stats.messages, 42);
    }

    #[tokio::test]
    async fn test_cold_profile_failure_propagates() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/profile/"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let (service, _clock) = create_service(&server);

        let err = service.profile().await.unwrap_err();

        assert!(matches!(err, CacheError::Fetch { key: CacheKey::Profile, .. }));
    }

    #[tokio::test]
    async fn test_device_and_info_failures_use_fallbacks() {
        let server = MockServer::start().await;
        let (service, _clock) = create_service(&server);

        let devices = service.devices().await.unwrap();
        let clusters = service.mqtt_clusters().await.unwrap();
        let info = service.mqtt_info().await.unwrap();

        assert_eq!(devices, DevicesSummary::default());
        assert_eq!(clusters, ClustersSummary::default());
        assert_eq!(info.broker.host, FALLBACK_BROKER_HOST);
        assert_eq!(info.broker.port, FALLBACK_BROKER_PORT);
        assert!(!info.connected);
    }

    #[tokio::test]
    async fn test_dashboard_data_survives_backend_outage() {
        let server = MockServer::start().await;
        let (service, _clock) = create_service(&server);

        let data = service.dashboard_data().await;

        assert!(data.profile.is_none());
        assert_eq!(data.organizations.count, 0);
        assert_eq!(data.mqtt_stats, MqttStats::default());
        assert_eq!(data.summary().subscription_type, DEFAULT_SUBSCRIPTION);
    }

    #[tokio::test]
    async fn test_refresh_refetches_everything() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/organizations/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "status": "success", "organizations": [] })),
            )
            .expect(2)
            .mount(&server)
            .await;
        let (service, _clock) = create_service(&server);

        service.dashboard_data().await;
        service.dashboard_data().await;
        service.refresh().await;
    }

    #[tokio::test]
    async fn test_preload_warms_cache() {
        let server = MockServer::start().await;
        mount_full_backend(&server).await;
        let (service, _clock) = create_service(&server);

        service.preload().await.unwrap();

        assert!(service.cache().is_cache_valid(CacheKey::Devices));
        assert!(service.cache().is_cache_valid(CacheKey::MqttStats));
    }

    #[tokio::test]
    async fn test_overview_stats_round_trip_and_default() {
        let server = MockServer::start().await;
        let (service, _clock) = create_service(&server);

        assert_eq!(service.overview_stats(), OverviewStats::default());

        let stats = OverviewStats {
            connected_devices: 5,
            mqtt_clusters: 2,
        };
        service.set_overview_stats(stats);

        assert_eq!(service.overview_stats(), stats);
        assert!(!service.cache().is_cache_valid(CacheKey::OverviewStats));
    }

    #[tokio::test]
    async fn test_device_action_refetches_only_devices() {
        let server = MockServer::start().await;
        mount_full_backend(&server).await;
        let (service, _clock) = create_service(&server);
        service.dashboard_data().await;

        service.cache().refresh_after_action("device_deleted");

        assert!(!service.cache().is_cache_valid(CacheKey::Devices));
        assert!(service.cache().is_cache_valid(CacheKey::Organizations));
    }
}
