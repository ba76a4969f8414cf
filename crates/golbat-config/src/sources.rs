// Configuration source loading.
//
// Priority order:
// 1. Environment variables (GOLBAT_* prefix)
// 2. Config file path from GOLBAT_CONFIG
// 3. Inline config content from GOLBAT_CONFIG_CONTENT
// 4. ./config.toml
// 5. Built-in defaults

use crate::env_overrides::{self, EnvSource, ENV_PREFIX};
use crate::RuntimeConfig;
use anyhow::{Context, Result};
use std::env;
use std::path::Path;

const DEFAULT_CONFIG_PATH: &str = "./config.toml";

pub fn load_config() -> Result<RuntimeConfig> {
    let env_source = StdEnvSource;
    let mut config = load_from_file(&env_source)?.unwrap_or_default();
    env_overrides::apply_env_overrides(&mut config, &env_source)?;
    config.validate()?;
    Ok(config)
}

fn load_from_file<E: EnvSource>(env_source: &E) -> Result<Option<RuntimeConfig>> {
    if let Some(path) = env_source.get("CONFIG") {
        return parse_file(Path::new(&path)).map(Some);
    }

    if let Some(content) = env_source.get("CONFIG_CONTENT") {
        let config: RuntimeConfig = toml::from_str(&content)
            .context("Failed to parse inline config from GOLBAT_CONFIG_CONTENT")?;
        return Ok(Some(config));
    }

    let default_path = Path::new(DEFAULT_CONFIG_PATH);
    if default_path.exists() {
        return parse_file(default_path).map(Some);
    }

    Ok(None)
}

fn parse_file(path: &Path) -> Result<RuntimeConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Load configuration from a specific file path (CLI --config flag).
/// Errors if the file is missing or malformed; env overrides still apply.
pub fn load_from_file_path(path: impl AsRef<Path>) -> Result<RuntimeConfig> {
    let mut config = parse_file(path.as_ref())?;
    env_overrides::apply_env_overrides(&mut config, &StdEnvSource)?;
    config.validate()?;
    Ok(config)
}

pub fn from_toml_with_env<E: EnvSource>(content: &str, env: &E) -> Result<RuntimeConfig> {
    let mut config: RuntimeConfig =
        toml::from_str(content).context("Failed to parse config content")?;
    env_overrides::apply_env_overrides(&mut config, env)?;
    config.validate()?;
    Ok(config)
}

struct StdEnvSource;

impl EnvSource for StdEnvSource {
    fn get(&self, key: &str) -> Option<String> {
        env::var(format!("{}{}", ENV_PREFIX, key)).ok()
    }

    fn prefixed_vars(&self) -> Vec<(String, String)> {
        env::vars()
            .filter_map(|(key, value)| {
                key.strip_prefix(ENV_PREFIX)
                    .map(|stripped| (stripped.to_string(), value))
            })
            .collect()
    }
}
