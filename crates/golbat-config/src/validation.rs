// Configuration validation
//
// Validates that required fields are present and values are sensible

use crate::*;
use anyhow::{bail, Result};
use std::collections::HashSet;
use tracing::{info, warn};

pub fn validate_config(config: &RuntimeConfig) -> Result<()> {
    if config.port == 0 {
        bail!("port must be greater than 0");
    }

    for (i, webhook) in config.webhooks.iter().enumerate() {
        validate_webhook(i, webhook)?;
    }

    validate_tuning(&config.tuning, &config.database)?;
    validate_geofences(&config.geofences)?;
    validate_scan_rules(&config.scan_rules, &config.geofences)?;
    validate_logging(&config.logging)?;
    validate_external(config);

    Ok(())
}

fn validate_webhook(index: usize, webhook: &WebhookConfig) -> Result<()> {
    if webhook.url.is_empty() {
        bail!("webhooks[{}].url must not be empty", index);
    }
    if !has_scheme(&webhook.url) {
        bail!("invalid webhook url '{}': no scheme", webhook.url);
    }
    Ok(())
}

fn has_scheme(url: &str) -> bool {
    match url.split_once("://") {
        Some((scheme, rest)) => {
            !scheme.is_empty()
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
                && !rest.is_empty()
        }
        None => false,
    }
}

fn validate_tuning(tuning: &TuningConfig, database: &DatabaseConfig) -> Result<()> {
    if tuning.write_behind_batch_size == 0 {
        bail!("tuning.write_behind_batch_size must be greater than 0");
    }
    if tuning.write_behind_worker_count == 0 {
        bail!("tuning.write_behind_worker_count must be greater than 0");
    }
    if tuning.write_behind_rate_limit < 0.0 {
        bail!("tuning.write_behind_rate_limit must not be negative");
    }
    if tuning.write_behind_rate_limit > 0.0 && tuning.write_behind_burst_capacity == 0 {
        bail!("tuning.write_behind_burst_capacity must be greater than 0 when rate limiting");
    }
    if tuning.webhook_interval_ms == 0 {
        bail!("tuning.webhook_interval_ms must be greater than 0");
    }

    if tuning.write_behind_worker_count > (database.max_pool as usize) / 2 {
        warn!(
            worker_count = tuning.write_behind_worker_count,
            max_pool = database.max_pool,
            "tuning.write_behind_worker_count exceeds half of database.max_pool; request-path queries may starve"
        );
    }

    Ok(())
}

fn validate_geofences(fences: &[GeofenceConfig]) -> Result<()> {
    for fence in fences {
        if fence.name.is_empty() {
            bail!("geofences entries must have a name");
        }
        if fence.points.len() < 3 {
            bail!(
                "geofence '{}' needs at least 3 points, has {}",
                fence.name,
                fence.points.len()
            );
        }
    }
    Ok(())
}

fn validate_scan_rules(rules: &[ScanRuleConfig], fences: &[GeofenceConfig]) -> Result<()> {
    let known: HashSet<&str> = fences.iter().map(|f| f.name.as_str()).collect();
    let parents: HashSet<&str> = fences.iter().map(|f| f.parent.as_str()).collect();

    for (i, rule) in rules.iter().enumerate() {
        for flag in rule.unsupported_flags() {
            warn!("scan_rules[{}].{} is not supported and will be ignored", i, flag);
        }
        for area in rule.area_names() {
            let name_ok = area.name == "*" || known.contains(area.name.as_str());
            let parent_ok = area.parent == "*" || parents.contains(area.parent.as_str());
            if !(name_ok && parent_ok) {
                bail!(
                    "scan_rules[{}] references unknown geofence '{}'",
                    i,
                    area
                );
            }
        }
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<()> {
    if logging.save_logs && logging.max_size == 0 {
        bail!("logging.max_size must be greater than 0 when save_logs is enabled");
    }
    Ok(())
}

fn validate_external(config: &RuntimeConfig) {
    if !config.pyroscope.server_address.is_empty() {
        info!(
            address = %config.pyroscope.server_address,
            "pyroscope configured; profiling agent is not linked in this build"
        );
    }
    if !config.sentry.dsn.is_empty() {
        info!("sentry configured; error reporting agent is not linked in this build");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fence(name: &str, parent: &str) -> GeofenceConfig {
        GeofenceConfig {
            name: name.into(),
            parent: parent.into(),
            points: vec![[0.0, 0.0], [0.0, 1.0], [1.0, 1.0]],
        }
    }

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&RuntimeConfig::default()).is_ok());
    }

    #[test]
    fn webhook_urls_need_a_scheme() {
        let mut config = RuntimeConfig::default();
        config.webhooks.push(WebhookConfig {
            url: "localhost:4200".into(),
            ..Default::default()
        });
        let err = validate_config(&config).unwrap_err();
        assert_eq!(err.to_string(), "invalid webhook url 'localhost:4200': no scheme");

        config.webhooks[0].url = "http://localhost:4200/hook".into();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn zero_sizes_rejected() {
        let mut config = RuntimeConfig::default();
        config.tuning.write_behind_batch_size = 0;
        assert!(validate_config(&config).is_err());

        let mut config = RuntimeConfig::default();
        config.tuning.write_behind_worker_count = 0;
        assert!(validate_config(&config).is_err());

        let mut config = RuntimeConfig::default();
        config.port = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn scan_rules_must_reference_known_fences() {
        let mut config = RuntimeConfig::default();
        config.geofences.push(fence("Chelsea", "London"));
        config.scan_rules.push(ScanRuleConfig {
            areas: vec!["London/Chelsea".into(), "Chelsea".into(), "London/*".into()],
            ..Default::default()
        });
        assert!(validate_config(&config).is_ok());

        config.scan_rules.push(ScanRuleConfig {
            areas: vec!["Paris/*".into()],
            ..Default::default()
        });
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("scan_rules[1]"));
    }

    #[test]
    fn proactive_iv_switching_is_flagged_not_fatal() {
        let rule = ScanRuleConfig {
            proactive_iv_switching: true,
            proactive_iv_switching_to_db: true,
            ..Default::default()
        };
        assert_eq!(
            rule.unsupported_flags(),
            vec!["proactive_iv_switching", "proactive_iv_switching_to_db"]
        );
        assert!(ScanRuleConfig::default().unsupported_flags().is_empty());

        let mut config = RuntimeConfig::default();
        config.scan_rules.push(rule);
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn geofences_need_three_points() {
        let mut config = RuntimeConfig::default();
        let mut small = fence("Tiny", "");
        small.points.pop();
        config.geofences.push(small);
        assert!(validate_config(&config).is_err());
    }
}
