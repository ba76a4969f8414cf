// golbat-proto - Protocol buffer definitions
//
// `raw` holds the ingest envelope and the generated RawProto service stubs
// (behind the `grpc` feature). `pogo` holds the subset of game messages the
// decoder understands, with the field numbers used by the scanner fleet.

pub mod pogo;
pub mod raw;

#[cfg(feature = "grpc")]
pub mod grpc {
    include!(concat!(env!("OUT_DIR"), "/golbat.RawProto.rs"));
}

pub use raw::{RawContent, RawProtoRequest, RawProtoResponse};
