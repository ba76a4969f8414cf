//! Per-method handlers.
//!
//! Every handler decodes the response (and the request where the response
//! alone does not identify the object), checks the method's status code and
//! hands the message to the entity updaters.

pub(crate) mod contests;
pub(crate) mod encounters;
pub(crate) mod forts;
pub(crate) mod gmo;
pub(crate) mod invasions;
pub(crate) mod routes;
pub(crate) mod social;
pub(crate) mod stations;
pub(crate) mod tappables;

use crate::entities::EntityStore;
use crate::error::{HandlerError, PayloadError};
use crate::raw::PogoProto;
use crate::scan::ScanParameters;
use golbat_stats::StatsCollector;

/// What a handler did with a record it could read.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Processed(String),
    /// Readable but deliberately left alone.
    Skipped(String),
}

impl Outcome {
    pub fn message(&self) -> &str {
        match self {
            Outcome::Processed(m) | Outcome::Skipped(m) => m,
        }
    }

    pub fn is_processed(&self) -> bool {
        matches!(self, Outcome::Processed(_))
    }
}

pub type HandlerResult = Result<Outcome, HandlerError>;

/// Shared state a handler may touch.
pub(crate) struct HandlerContext<'a> {
    pub store: &'a EntityStore,
    pub stats: &'a dyn StatsCollector,
    pub scan: ScanParameters,
}

pub(crate) fn decode_response<M: prost::Message + Default>(
    proto: &PogoProto,
    what: &'static str,
) -> Result<M, HandlerError> {
    proto
        .decode_response()
        .map_err(|source| HandlerError::Parse { what, source })
}

pub(crate) fn decode_request<M: prost::Message + Default>(
    proto: &PogoProto,
    what: &'static str,
) -> Result<M, HandlerError> {
    proto.decode_request().map_err(|source| match source {
        PayloadError::RequestNotAvailable => HandlerError::RequestNotAvailable,
        source => HandlerError::Parse { what, source },
    })
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::raw::{Payload, ScanMetadata};
    use golbat_common::Location;
    use golbat_stats::NoopStatsCollector;
    use prost::Message;

    pub const NOW_MS: i64 = 1_700_000_000_000;

    pub fn record<R: Message, Q: Message>(method: i32, response: &R, request: Option<&Q>) -> PogoProto {
        PogoProto {
            metadata: ScanMetadata {
                account: "ash".into(),
                level: 35,
                device_id: "dev".into(),
                scan_context: String::new(),
                timestamp_ms: NOW_MS,
            },
            method,
            have_ar: None,
            location: Location::new(1.0, 2.0),
            request: request.map(|r| Payload::Binary(r.encode_to_vec())),
            response: Payload::Binary(response.encode_to_vec()),
        }
    }

    pub fn context(store: &EntityStore) -> HandlerContext<'_> {
        HandlerContext {
            store,
            stats: &NoopStatsCollector,
            scan: ScanParameters::default(),
        }
    }
}
