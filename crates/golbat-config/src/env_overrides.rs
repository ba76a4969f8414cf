// Environment overrides
//
// Any `GOLBAT_`-prefixed variable addresses a config path: segments are the
// TOML keys upper-cased and joined with `.`; list items are addressed by
// index. `GOLBAT_DATABASE.ADDRESS`, `GOLBAT_WEBHOOKS.0.URL`,
// `GOLBAT_SCAN_RULES.1.CONTEXT=ar,quest`.
//
// The config is round-tripped through a `serde_json::Value` so every field
// is reachable without a hand-maintained table.

use anyhow::{anyhow, bail, Context, Result};
use serde_json::{Map, Number, Value};

use crate::RuntimeConfig;

pub const ENV_PREFIX: &str = "GOLBAT_";

/// Variables consumed by the loader itself rather than mapped onto fields.
const RESERVED: &[&str] = &["CONFIG", "CONFIG_CONTENT"];

/// Abstraction over environment-variable lookups so tests can supply their
/// own source of overrides.
pub trait EnvSource {
    /// Lookup with the `GOLBAT_` prefix added.
    fn get(&self, key: &str) -> Option<String>;

    /// Every `GOLBAT_` variable with the prefix stripped.
    fn prefixed_vars(&self) -> Vec<(String, String)>;
}

/// Fixed set of variables, keyed without the prefix.
#[derive(Debug, Default, Clone)]
pub struct MapEnvSource {
    vars: Vec<(String, String)>,
}

impl MapEnvSource {
    pub fn new<K: Into<String>, V: Into<String>>(vars: impl IntoIterator<Item = (K, V)>) -> Self {
        Self {
            vars: vars
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl EnvSource for MapEnvSource {
    fn get(&self, key: &str) -> Option<String> {
        self.vars
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }

    fn prefixed_vars(&self) -> Vec<(String, String)> {
        self.vars.clone()
    }
}

/// Apply environment-variable overrides (highest priority) to the runtime config.
pub fn apply_env_overrides<E: EnvSource>(config: &mut RuntimeConfig, env: &E) -> Result<()> {
    let mut vars = env.prefixed_vars();
    vars.retain(|(key, _)| !RESERVED.contains(&key.as_str()));
    if vars.is_empty() {
        return Ok(());
    }
    // Deterministic order so `X.0.URL` creates the list item before `X.1.URL`.
    vars.sort();

    let mut tree = serde_json::to_value(&*config).context("Failed to serialize config")?;
    for (key, raw) in &vars {
        let path: Vec<String> = key.split('.').map(|s| s.to_ascii_lowercase()).collect();
        set_path(&mut tree, &path, raw)
            .with_context(|| format!("Invalid override {}{}", ENV_PREFIX, key))?;
    }

    *config = serde_json::from_value(tree).context("Environment overrides produced an invalid config")?;
    Ok(())
}

fn set_path(node: &mut Value, path: &[String], raw: &str) -> Result<()> {
    let Some((head, rest)) = path.split_first() else {
        bail!("empty key");
    };

    match node {
        Value::Object(map) => {
            if rest.is_empty() {
                let existing = map.get(head.as_str());
                let value = coerce(existing, head, raw)?;
                map.insert(head.clone(), value);
                return Ok(());
            }
            let child = map
                .entry(head.clone())
                .or_insert_with(|| placeholder_for(&rest[0]));
            set_path(child, rest, raw)
        }
        Value::Array(items) => {
            let index: usize = head
                .parse()
                .map_err(|_| anyhow!("'{}' is not a list index", head))?;
            if index > items.len() {
                bail!("list index {} skips past the end ({} items)", index, items.len());
            }
            if index == items.len() {
                items.push(Value::Object(Map::new()));
            }
            if rest.is_empty() {
                let value = coerce(Some(&items[index]), head, raw)?;
                items[index] = value;
                return Ok(());
            }
            set_path(&mut items[index], rest, raw)
        }
        _ => bail!("'{}' is not a table", head),
    }
}

fn placeholder_for(next: &str) -> Value {
    if next.parse::<usize>().is_ok() {
        Value::Array(Vec::new())
    } else {
        Value::Object(Map::new())
    }
}

/// Keys that hold string lists even when the list does not exist yet.
const LIST_KEYS: &[&str] = &["types", "areas", "context"];

/// Convert `raw` to the JSON type already present at the target, falling
/// back to a best guess when the field is new.
fn coerce(existing: Option<&Value>, key: &str, raw: &str) -> Result<Value> {
    let value = match existing {
        Some(Value::Bool(_)) => Value::Bool(parse_bool(raw)?),
        Some(Value::Number(n)) if n.is_u64() || n.is_i64() => {
            let parsed: i64 = raw
                .trim()
                .parse()
                .map_err(|e| anyhow!("expected integer, got '{}': {}", raw, e))?;
            Value::Number(Number::from(parsed))
        }
        Some(Value::Number(_)) => float(raw)?,
        Some(Value::Array(_)) => split_list(raw),
        Some(Value::String(_)) => Value::String(raw.to_string()),
        _ if LIST_KEYS.contains(&key) => split_list(raw),
        _ => guess(raw),
    };
    Ok(value)
}

fn parse_bool(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => bail!("expected bool, got '{}'", other),
    }
}

fn float(raw: &str) -> Result<Value> {
    let parsed: f64 = raw
        .trim()
        .parse()
        .map_err(|e| anyhow!("expected number, got '{}': {}", raw, e))?;
    Number::from_f64(parsed)
        .map(Value::Number)
        .ok_or_else(|| anyhow!("'{}' is not a finite number", raw))
}

fn split_list(raw: &str) -> Value {
    Value::Array(
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| Value::String(s.to_string()))
            .collect(),
    )
}

fn guess(raw: &str) -> Value {
    if let Ok(b) = parse_bool(raw) {
        if !raw.trim().chars().all(|c| c.is_ascii_digit()) {
            return Value::Bool(b);
        }
    }
    if let Ok(i) = raw.trim().parse::<i64>() {
        return Value::Number(Number::from(i));
    }
    if let Ok(v) = float(raw) {
        return v;
    }
    Value::String(raw.to_string())
}
