// Initialization utilities
//
// Logging/tracing setup, the Prometheus exporter, and startup notices for
// agents that are configured but not linked into this build.

use anyhow::Result;
use golbat_config::{LogFormat, LoggingConfig, PrometheusConfig, RuntimeConfig};
use metrics_exporter_prometheus::PrometheusHandle;
use tracing::{info, warn};

/// Initialize tracing/logging from the logging section
pub fn init_tracing(config: &LoggingConfig) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    // RUST_LOG overrides the configured level.
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.level()))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    // Try to set the global subscriber; ignore error if already set (idempotent)
    let _ = match config.format {
        LogFormat::Json => {
            tracing::subscriber::set_global_default(registry.with(fmt::layer().json()))
        }
        LogFormat::Text => tracing::subscriber::set_global_default(registry.with(fmt::layer())),
    };

    if config.save_logs {
        info!(
            "Log files requested (max_size={}MB max_backups={} max_age={}d compress={}); writing to stdout",
            config.max_size, config.max_backups, config.max_age, config.compress
        );
    }
}

/// Install the Prometheus recorder when metrics are enabled.
pub fn init_metrics(config: &PrometheusConfig) -> Result<Option<PrometheusHandle>> {
    if !config.enabled {
        return Ok(None);
    }
    let handle = golbat_stats::install_prometheus_recorder(&config.bucket_size)?;
    Ok(Some(handle))
}

pub(crate) fn log_external_agents(config: &RuntimeConfig) {
    if !config.pyroscope.server_address.is_empty() {
        warn!(
            "Pyroscope configured for {} ({}) but profiling is not available in this build",
            config.pyroscope.server_address, config.pyroscope.application_name
        );
    }
    if !config.sentry.dsn.is_empty() {
        warn!(
            "Sentry configured (sample_rate={}) but error reporting is not available in this build",
            config.sentry.sample_rate
        );
    }
}
