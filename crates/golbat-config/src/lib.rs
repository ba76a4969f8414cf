// golbat-config - Runtime configuration
//
// Supports configuration from multiple sources:
// 1. Environment variables (highest priority, GOLBAT_ prefix)
// 2. Config file path from --config or GOLBAT_CONFIG
// 3. Config file contents from GOLBAT_CONFIG_CONTENT
// 4. ./config.toml
// 5. Built-in defaults (lowest priority)

use anyhow::Result;
use golbat_common::{parse_area_names, AreaName, Geofence, Geofences, Location};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub mod env_overrides;
mod sources;
mod validation;

pub use env_overrides::{EnvSource, ENV_PREFIX};

/// Main runtime configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub port: u16,
    /// 0 disables the gRPC listener.
    pub grpc_port: u16,
    pub raw_bearer: String,
    pub api_secret: String,
    pub in_memory: bool,
    pub webhooks: Vec<WebhookConfig>,
    pub database: DatabaseConfig,
    pub cleanup: CleanupConfig,
    pub tuning: TuningConfig,
    pub prometheus: PrometheusConfig,
    pub pyroscope: PyroscopeConfig,
    pub sentry: SentryConfig,
    pub logging: LoggingConfig,
    pub scan_rules: Vec<ScanRuleConfig>,
    pub geofences: Vec<GeofenceConfig>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            port: 9001,
            grpc_port: 0,
            raw_bearer: String::new(),
            api_secret: String::new(),
            in_memory: false,
            webhooks: Vec::new(),
            database: DatabaseConfig::default(),
            cleanup: CleanupConfig::default(),
            tuning: TuningConfig::default(),
            prometheus: PrometheusConfig::default(),
            pyroscope: PyroscopeConfig::default(),
            sentry: SentryConfig::default(),
            logging: LoggingConfig::default(),
            scan_rules: Vec::new(),
            geofences: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    pub url: String,
    pub types: Vec<String>,
    /// "Parent/Name", "Parent/*" or a bare fence name.
    pub areas: Vec<String>,
}

impl WebhookConfig {
    pub fn area_names(&self) -> Vec<AreaName> {
        parse_area_names(&self.areas)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub address: String,
    pub user: String,
    pub password: String,
    pub db: String,
    pub max_pool: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:3306".to_string(),
            user: String::new(),
            password: String::new(),
            db: "golbat".to_string(),
            max_pool: 50,
        }
    }
}

impl DatabaseConfig {
    pub fn url(&self) -> String {
        format!(
            "mysql://{}:{}@{}/{}",
            self.user, self.password, self.address, self.db
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanupConfig {
    pub pokemon: bool,
    pub quests: bool,
    pub incidents: bool,
    pub stats: bool,
    pub stats_days: u32,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            pokemon: false,
            quests: false,
            incidents: false,
            stats: false,
            stats_days: 7,
        }
    }
}

impl CleanupConfig {
    pub fn any_enabled(&self) -> bool {
        self.pokemon || self.quests || self.incidents
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TuningConfig {
    pub extended_timeout: bool,
    pub max_pokemon_results: usize,
    pub write_behind_startup_delay: u64,
    pub write_behind_batch_size: usize,
    pub write_behind_batch_timeout_ms: u64,
    pub write_behind_worker_count: usize,
    pub write_behind_rate_limit: f64,
    pub write_behind_burst_capacity: u32,
    pub webhook_interval_ms: u64,
    pub max_device_ttl_hours: u64,
    pub encounter_cache_ttl_minutes: u64,
    pub pokemon_write_delay_ms: u64,
    /// Seconds a fort may be absent from its cell listing before it is removed.
    pub fort_stale_threshold_seconds: u64,
}

impl Default for TuningConfig {
    fn default() -> Self {
        Self {
            extended_timeout: false,
            max_pokemon_results: 3000,
            write_behind_startup_delay: 0,
            write_behind_batch_size: 50,
            write_behind_batch_timeout_ms: 100,
            write_behind_worker_count: 50,
            write_behind_rate_limit: 0.0,
            write_behind_burst_capacity: 100,
            webhook_interval_ms: 1000,
            max_device_ttl_hours: 1,
            encounter_cache_ttl_minutes: 60,
            pokemon_write_delay_ms: 5000,
            fort_stale_threshold_seconds: 3600,
        }
    }
}

impl TuningConfig {
    /// Per-record decode budget.
    pub fn decode_timeout(&self) -> Duration {
        if self.extended_timeout {
            Duration::from_secs(30)
        } else {
            Duration::from_secs(5)
        }
    }

    pub fn startup_delay(&self) -> Duration {
        Duration::from_secs(self.write_behind_startup_delay)
    }

    pub fn batch_timeout(&self) -> Duration {
        Duration::from_millis(self.write_behind_batch_timeout_ms)
    }

    pub fn webhook_interval(&self) -> Duration {
        Duration::from_millis(self.webhook_interval_ms)
    }

    pub fn device_ttl(&self) -> Duration {
        Duration::from_secs(self.max_device_ttl_hours * 3600)
    }

    pub fn encounter_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.encounter_cache_ttl_minutes * 60)
    }

    pub fn pokemon_write_delay(&self) -> Duration {
        Duration::from_millis(self.pokemon_write_delay_ms)
    }

    pub fn fort_stale_threshold(&self) -> Duration {
        Duration::from_secs(self.fort_stale_threshold_seconds)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PrometheusConfig {
    pub enabled: bool,
    /// Bearer token required on /metrics when non-empty.
    pub token: String,
    /// Histogram buckets in seconds; empty keeps the built-in set.
    pub bucket_size: Vec<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PyroscopeConfig {
    pub server_address: String,
    pub application_name: String,
    pub api_key: String,
    pub mutex_profile_fraction: u32,
    pub block_profile_rate: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SentryConfig {
    pub dsn: String,
    pub sample_rate: f64,
}

impl Default for SentryConfig {
    fn default() -> Self {
        Self {
            dsn: String::new(),
            sample_rate: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub debug: bool,
    pub format: LogFormat,
    pub save_logs: bool,
    pub max_size: u32,
    pub max_backups: u32,
    pub max_age: u32,
    pub compress: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            debug: false,
            format: LogFormat::Text,
            save_logs: true,
            max_size: 50,
            max_backups: 10,
            max_age: 30,
            compress: true,
        }
    }
}

impl LoggingConfig {
    pub fn level(&self) -> &'static str {
        if self.debug {
            "debug"
        } else {
            "info"
        }
    }
}

/// One entry of `[[scan_rules]]`. Unset flags mean "process".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanRuleConfig {
    pub areas: Vec<String>,
    pub context: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pokemon: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wild_pokemon: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nearby_pokemon: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weather: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pokestops: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gyms: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stations: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cells: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tappables: Option<bool>,
    /// Accepted so existing files load; weather driven IV switching is not
    /// performed and validation warns when it is requested.
    pub proactive_iv_switching: bool,
    pub proactive_iv_switching_to_db: bool,
}

impl ScanRuleConfig {
    pub fn area_names(&self) -> Vec<AreaName> {
        parse_area_names(&self.areas)
    }

    /// Keys set on this rule that have no effect.
    pub fn unsupported_flags(&self) -> Vec<&'static str> {
        let mut flags = Vec::new();
        if self.proactive_iv_switching {
            flags.push("proactive_iv_switching");
        }
        if self.proactive_iv_switching_to_db {
            flags.push("proactive_iv_switching_to_db");
        }
        flags
    }
}

/// Inline polygon, points given as `[latitude, longitude]` pairs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeofenceConfig {
    pub name: String,
    pub parent: String,
    pub points: Vec<[f64; 2]>,
}

impl GeofenceConfig {
    pub fn to_geofence(&self) -> Geofence {
        let area = AreaName::new(&self.parent, &self.name);
        let points = self
            .points
            .iter()
            .map(|[lat, lon]| Location::new(*lat, *lon))
            .collect();
        Geofence::new(area, points)
    }
}

impl RuntimeConfig {
    /// Load configuration from all sources with priority
    pub fn load() -> Result<Self> {
        sources::load_config()
    }

    /// Load configuration from a specific file path (for the --config flag).
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        sources::load_from_file_path(path)
    }

    /// Parse TOML content and apply overrides from `env`. Used by tests and
    /// by callers that already hold the file contents.
    pub fn from_toml_with_env<E: EnvSource>(content: &str, env: &E) -> Result<Self> {
        sources::from_toml_with_env(content, env)
    }

    pub fn apply_env_overrides_from<E: EnvSource>(&mut self, env: &E) -> Result<()> {
        env_overrides::apply_env_overrides(self, env)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }

    pub fn geofences(&self) -> Geofences {
        Geofences::new(
            self.geofences
                .iter()
                .map(GeofenceConfig::to_geofence)
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_expectations() {
        let config = RuntimeConfig::default();
        assert_eq!(config.port, 9001);
        assert_eq!(config.grpc_port, 0);
        assert_eq!(config.database.max_pool, 50);
        assert_eq!(config.cleanup.stats_days, 7);
        assert!(config.logging.save_logs);
        assert_eq!(config.tuning.write_behind_batch_size, 50);
        assert_eq!(config.tuning.batch_timeout(), Duration::from_millis(100));
        assert_eq!(config.tuning.decode_timeout(), Duration::from_secs(5));
        assert_eq!(config.tuning.encounter_cache_ttl(), Duration::from_secs(3600));
    }

    #[test]
    fn extended_timeout_raises_decode_budget() {
        let tuning = TuningConfig {
            extended_timeout: true,
            ..Default::default()
        };
        assert_eq!(tuning.decode_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: RuntimeConfig = toml::from_str(
            r#"
            port = 9100

            [database]
            user = "golbat"

            [[webhooks]]
            url = "http://localhost:4200"
            types = ["raid", "pokemon_iv"]
            areas = ["London/*"]
            "#,
        )
        .unwrap();

        assert_eq!(config.port, 9100);
        assert_eq!(config.database.user, "golbat");
        assert_eq!(config.database.max_pool, 50);
        assert_eq!(config.webhooks.len(), 1);
        assert_eq!(config.webhooks[0].area_names()[0].parent, "London");
        assert_eq!(config.tuning.webhook_interval_ms, 1000);
    }

    #[test]
    fn geofence_config_builds_closed_polygon() {
        let fence = GeofenceConfig {
            name: "Chelsea".into(),
            parent: "London".into(),
            points: vec![[0.0, 0.0], [0.0, 1.0], [1.0, 1.0], [1.0, 0.0]],
        };
        let geofence = fence.to_geofence();
        assert!(geofence.is_closed());
        assert!(geofence.contains(Location::new(0.5, 0.5)));
        assert_eq!(geofence.area.to_string(), "London/Chelsea");
    }
}
