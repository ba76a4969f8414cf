use crate::WebhookType;
use golbat_common::AreaName;
use serde::Serialize;

/// One buffered event, serialized as `{type, message}`.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookMessage {
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(skip)]
    pub areas: Vec<AreaName>,
    pub message: serde_json::Value,
}

/// Per-type lists of events waiting for the next flush.
#[derive(Debug, Default)]
pub struct WebhookCollection {
    lists: [Vec<WebhookMessage>; WebhookType::COUNT],
}

impl WebhookCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: WebhookType, message: serde_json::Value, areas: Vec<AreaName>) {
        self.lists[kind.index()].push(WebhookMessage {
            kind: kind.payload_type(),
            areas,
            message,
        });
    }

    pub fn messages(&self, kind: WebhookType) -> &[WebhookMessage] {
        &self.lists[kind.index()]
    }

    pub fn len(&self) -> usize {
        self.lists.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lists.iter().all(Vec::is_empty)
    }
}
