//! Raw ingest normalization.
//!
//! Both intake shapes end up as a [`ProtoGroup`]: an ordered list of
//! [`PogoProto`] records sharing a device, each carrying its own method code,
//! payloads and scan metadata.

pub mod grpc;
pub mod http;

use crate::error::PayloadError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use golbat_common::Location;

pub use grpc::decode_grpc;
pub use http::decode_http;

/// Account name forced onto pogodroid submissions.
pub const POGODROID_ACCOUNT: &str = "Pogodroid";

/// Trainer level assumed when a provider does not send one.
pub const DEFAULT_TRAINER_LEVEL: i32 = 30;

/// Scanner metadata shared by every record of one submission entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanMetadata {
    pub account: String,
    pub level: i32,
    pub device_id: String,
    pub scan_context: String,
    pub timestamp_ms: i64,
}

/// Payload bytes as the provider sent them.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Base64(String),
    Binary(Vec<u8>),
}

impl Payload {
    fn is_empty(&self) -> bool {
        match self {
            Payload::Base64(s) => s.is_empty(),
            Payload::Binary(b) => b.is_empty(),
        }
    }

    fn decode<M: prost::Message + Default>(&self, which: &'static str) -> Result<M, PayloadError> {
        match self {
            Payload::Base64(encoded) => {
                let bytes = STANDARD
                    .decode(encoded)
                    .map_err(|source| PayloadError::Base64 { which, source })?;
                Ok(M::decode(bytes.as_slice())?)
            }
            Payload::Binary(bytes) => Ok(M::decode(bytes.as_slice())?),
        }
    }
}

/// One captured request/response exchange, ready for the dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub struct PogoProto {
    pub metadata: ScanMetadata,
    pub method: i32,
    /// AR tri-state: `None` means unknown.
    pub have_ar: Option<bool>,
    pub location: Location,
    pub request: Option<Payload>,
    pub response: Payload,
}

impl PogoProto {
    pub fn account(&self) -> &str {
        &self.metadata.account
    }

    pub fn level(&self) -> i32 {
        self.metadata.level
    }

    pub fn device_id(&self) -> &str {
        &self.metadata.device_id
    }

    pub fn scan_context(&self) -> &str {
        &self.metadata.scan_context
    }

    pub fn timestamp_ms(&self) -> i64 {
        self.metadata.timestamp_ms
    }

    pub fn has_request(&self) -> bool {
        self.request.as_ref().is_some_and(|r| !r.is_empty())
    }

    pub fn decode_request<M: prost::Message + Default>(&self) -> Result<M, PayloadError> {
        match &self.request {
            Some(request) if !request.is_empty() => request.decode("request"),
            _ => Err(PayloadError::RequestNotAvailable),
        }
    }

    pub fn decode_response<M: prost::Message + Default>(&self) -> Result<M, PayloadError> {
        self.response.decode("response")
    }
}

/// Records from one submission entry, in arrival order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProtoGroup {
    pub protos: Vec<PogoProto>,
}

impl ProtoGroup {
    pub fn new(protos: Vec<PogoProto>) -> Self {
        Self { protos }
    }

    pub fn len(&self) -> usize {
        self.protos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.protos.is_empty()
    }

    pub fn last(&self) -> Option<&PogoProto> {
        self.protos.last()
    }

    pub fn last_location(&self) -> Location {
        self.protos.last().map(|p| p.location).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use golbat_proto::pogo::StartIncidentOutProto;
    use prost::Message;

    fn proto(request: Option<Payload>, response: Payload) -> PogoProto {
        PogoProto {
            metadata: ScanMetadata::default(),
            method: 1200,
            have_ar: None,
            location: Location::default(),
            request,
            response,
        }
    }

    #[test]
    fn base64_and_binary_payloads_decode_alike() {
        let message = StartIncidentOutProto {
            status: 1,
            incident: None,
        };
        let bytes = message.encode_to_vec();

        let from_b64 = proto(None, Payload::Base64(STANDARD.encode(&bytes)));
        let from_bin = proto(None, Payload::Binary(bytes));
        assert_eq!(from_b64.decode_response::<StartIncidentOutProto>().unwrap(), message);
        assert_eq!(from_bin.decode_response::<StartIncidentOutProto>().unwrap(), message);
    }

    #[test]
    fn missing_or_empty_request_is_not_available() {
        let none = proto(None, Payload::Binary(vec![]));
        assert!(!none.has_request());
        assert!(none
            .decode_request::<StartIncidentOutProto>()
            .unwrap_err()
            .is_request_not_available());

        let empty = proto(Some(Payload::Base64(String::new())), Payload::Binary(vec![]));
        assert!(empty
            .decode_request::<StartIncidentOutProto>()
            .unwrap_err()
            .is_request_not_available());
    }

    #[test]
    fn bad_base64_names_the_payload() {
        let bad = proto(None, Payload::Base64("***".into()));
        let err = bad.decode_response::<StartIncidentOutProto>().unwrap_err();
        assert!(err.to_string().starts_with("failed to base64 decode response proto"));
    }
}
