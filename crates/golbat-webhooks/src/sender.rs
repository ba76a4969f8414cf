// Periodic webhook sender
//
// Events accumulate in a WebhookCollection behind one mutex. Each tick swaps
// the collection for an empty one and POSTs every destination's share.

use crate::{WebhookCollection, WebhookConfigError, WebhookMessage, WebhookSink, WebhookType};
use golbat_common::{area_match_with_wildcards, AreaName};
use golbat_config::WebhookConfig;
use parking_lot::Mutex;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A configured receiver with its resolved filters.
#[derive(Debug, Clone)]
pub struct Destination {
    pub url: String,
    pub areas: Vec<AreaName>,
    pub types: Vec<WebhookType>,
}

impl Destination {
    pub fn from_config(config: &WebhookConfig) -> Result<Self, WebhookConfigError> {
        if let Err(e) = reqwest::Url::parse(&config.url) {
            return Err(WebhookConfigError::InvalidUrl {
                url: config.url.clone(),
                reason: e.to_string(),
            });
        }
        Ok(Self {
            url: config.url.clone(),
            areas: config.area_names(),
            types: WebhookType::resolve(&config.types)?,
        })
    }

    /// Messages this destination subscribed to, grouped by type in
    /// declaration order.
    pub fn select<'a>(&self, collection: &'a WebhookCollection) -> Vec<&'a WebhookMessage> {
        let mut selected = Vec::new();
        for kind in &self.types {
            let messages = collection.messages(*kind);
            if self.areas.is_empty() {
                selected.extend(messages.iter());
            } else {
                selected.extend(
                    messages
                        .iter()
                        .filter(|m| area_match_with_wildcards(&m.areas, &self.areas)),
                );
            }
        }
        selected
    }
}

pub struct WebhookSender {
    client: reqwest::Client,
    destinations: Vec<Destination>,
    collection: Mutex<WebhookCollection>,
    interval: Duration,
}

impl WebhookSender {
    pub fn new(configs: &[WebhookConfig], interval: Duration) -> Result<Self, WebhookConfigError> {
        let destinations = configs
            .iter()
            .map(Destination::from_config)
            .collect::<Result<Vec<_>, _>>()?;

        let mut headers = HeaderMap::new();
        headers.insert("X-Golbat", HeaderValue::from_static("hey!"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| WebhookConfigError::Client(e.to_string()))?;

        Ok(Self {
            client,
            destinations,
            collection: Mutex::new(WebhookCollection::new()),
            interval,
        })
    }

    pub fn destinations(&self) -> &[Destination] {
        &self.destinations
    }

    pub fn pending(&self) -> usize {
        self.collection.lock().len()
    }

    /// Tick until cancelled, sending each batch in its own task so a slow
    /// receiver never delays the next tick.
    pub async fn run(self: Arc<Self>, token: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {
                    let sender = Arc::clone(&self);
                    tokio::spawn(async move { sender.flush().await });
                }
            }
        }
        debug!("Webhook sender stopped");
    }

    /// Send everything collected so far. Also the shutdown path.
    pub async fn flush(&self) {
        let collection = std::mem::take(&mut *self.collection.lock());
        if self.destinations.is_empty() {
            return;
        }

        let mut handles = Vec::with_capacity(self.destinations.len());
        for destination in &self.destinations {
            let selected = destination.select(&collection);
            info!(
                "There are {} webhooks to send to {}",
                selected.len(),
                destination.url
            );
            if selected.is_empty() {
                continue;
            }

            let payload = match serde_json::to_vec(&selected) {
                Ok(payload) => payload,
                Err(e) => {
                    warn!(url = %destination.url, error = %e, "Failed to encode webhook payload");
                    continue;
                }
            };

            let client = self.client.clone();
            let url = destination.url.clone();
            handles.push(tokio::spawn(async move { post(client, url, payload).await }));
        }

        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "Webhook send task failed");
            }
        }
    }
}

async fn post(client: reqwest::Client, url: String, payload: Vec<u8>) {
    match client.post(&url).body(payload).send().await {
        Ok(response) => {
            let status = response.status();
            // Drain the body so the connection can be reused.
            let _ = response.bytes().await;
            debug!(url = %url, status = %status, "Webhook: Response");
        }
        Err(e) => {
            warn!(url = %url, error = %e, "Failed to send webhook");
        }
    }
}

impl WebhookSink for WebhookSender {
    fn add_message(&self, kind: WebhookType, message: serde_json::Value, areas: Vec<AreaName>) {
        self.collection.lock().push(kind, message, areas);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config(url: &str, types: &[&str], areas: &[&str]) -> WebhookConfig {
        WebhookConfig {
            url: url.into(),
            types: types.iter().map(|s| s.to_string()).collect(),
            areas: areas.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn rejects_unknown_type_at_build() {
        let result = WebhookSender::new(
            &[config("http://localhost/hook", &["pokemon", "nest"], &[])],
            DEFAULT_INTERVAL,
        );
        let err = result.err().expect("should fail");
        assert_eq!(err.to_string(), "unknown webhook type 'nest'");
    }

    #[test]
    fn rejects_unparseable_url() {
        let err = Destination::from_config(&config("not a url", &[], &[])).unwrap_err();
        assert!(err.to_string().starts_with("invalid webhook url 'not a url'"));
    }

    #[test]
    fn select_filters_by_type_and_area() {
        let mut collection = WebhookCollection::new();
        let chelsea = vec![AreaName::new("London", "Chelsea")];
        let soho = vec![AreaName::new("London", "Soho")];
        collection.push(WebhookType::PokemonIV, json!({"id": 1}), chelsea.clone());
        collection.push(WebhookType::Raid, json!({"id": 2}), soho);
        collection.push(WebhookType::GymDetails, json!({"id": 3}), chelsea);

        let everything = Destination::from_config(&config("http://a/", &[], &[])).unwrap();
        let ids: Vec<_> = everything
            .select(&collection)
            .iter()
            .map(|m| m.message["id"].as_i64().unwrap())
            .collect();
        assert_eq!(ids, vec![3, 2, 1]);

        let chelsea_only = Destination::from_config(&config("http://a/", &[], &["*/Chelsea"])).unwrap();
        assert_eq!(chelsea_only.select(&collection).len(), 2);

        let london_raids =
            Destination::from_config(&config("http://a/", &["raid"], &["London/*"])).unwrap();
        let selected = london_raids.select(&collection);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].kind, "raid");
    }

    #[test]
    fn messages_serialize_without_areas() {
        let mut collection = WebhookCollection::new();
        collection.push(
            WebhookType::PokemonNoIV,
            json!({"encounter_id": "7"}),
            vec![AreaName::new("A", "B")],
        );
        let encoded = serde_json::to_value(collection.messages(WebhookType::PokemonNoIV)).unwrap();
        assert_eq!(
            encoded,
            json!([{"type": "pokemon", "message": {"encounter_id": "7"}}])
        );
    }

    #[tokio::test]
    async fn flush_without_destinations_drains() {
        let sender = WebhookSender::new(&[], DEFAULT_INTERVAL).unwrap();
        sender.add_message(WebhookType::Weather, json!({}), vec![]);
        assert_eq!(sender.pending(), 1);
        sender.flush().await;
        assert_eq!(sender.pending(), 0);
    }
}
