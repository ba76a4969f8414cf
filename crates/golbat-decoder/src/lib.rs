//! Decoding side of the ingest pipeline.
//!
//! Raw submissions are normalized into [`ProtoGroup`]s, dispatched per
//! method by the [`Decoder`], and folded into the in-memory entity caches of
//! the [`EntityStore`], which feed the write-behind queues and webhooks.

pub mod device_tracker;
pub mod dispatcher;
pub mod encounter_cache;
pub mod entities;
pub mod error;
pub mod handlers;
pub mod raw;
pub mod scan;
pub mod striped;
pub mod ttl;

pub use device_tracker::{DeviceLocation, DeviceTracker};
pub use dispatcher::{method_name, Decoder};
pub use encounter_cache::EncounterCache;
pub use entities::{EntityContext, EntityQueues, EntityStore, EntityWriters, QueueSettings};
pub use error::{HandlerError, PayloadError, RawDecodeError};
pub use handlers::Outcome;
pub use raw::{decode_grpc, decode_http, PogoProto, ProtoGroup};
pub use scan::{ScanParameters, ScanRules};
