// gRPC ingest
//
// golbat.RawProto/SubmitRawProto carries the same content as POST /raw, already
// in protobuf form. Auth is the `authorization` metadata value compared
// verbatim to the configured bearer.

use anyhow::{Context, Result};
use golbat_decoder::{decode_grpc, Decoder};
use golbat_proto::grpc::raw_proto_server::{RawProto, RawProtoServer};
use golbat_proto::{RawProtoRequest, RawProtoResponse};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tonic::{Request, Response, Status};
use tracing::{debug, warn};

pub struct RawProtoService {
    decoder: Arc<Decoder>,
    raw_bearer: String,
}

impl RawProtoService {
    pub fn new(decoder: Arc<Decoder>, raw_bearer: String) -> Self {
        Self {
            decoder,
            raw_bearer,
        }
    }

    fn authorised<T>(&self, request: &Request<T>) -> bool {
        if self.raw_bearer.is_empty() {
            return true;
        }
        request
            .metadata()
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == self.raw_bearer)
    }

    /// Accept one submission. Decoding continues in the background.
    pub fn submit(&self, request: Request<RawProtoRequest>) -> RawProtoResponse {
        if !self.authorised(&request) {
            warn!("gRPC raw: Incorrect authorisation received");
            return RawProtoResponse {
                message: "Incorrect authorisation received".to_string(),
            };
        }

        let received_ms = chrono::Utc::now().timestamp_millis();
        let group = decode_grpc(request.into_inner(), received_ms);
        debug!(records = group.protos.len(), "gRPC raw: accepted submission");
        self.decoder.spawn_group(group);

        RawProtoResponse {
            message: "Processed".to_string(),
        }
    }
}

#[tonic::async_trait]
impl RawProto for RawProtoService {
    async fn submit_raw_proto(
        &self,
        request: Request<RawProtoRequest>,
    ) -> Result<Response<RawProtoResponse>, Status> {
        Ok(Response::new(self.submit(request)))
    }
}

/// Serve RawProto on `addr` until `shutdown` fires.
pub(crate) async fn serve(
    addr: SocketAddr,
    service: RawProtoService,
    shutdown: CancellationToken,
) -> Result<()> {
    tonic::transport::Server::builder()
        .add_service(RawProtoServer::new(service))
        .serve_with_shutdown(addr, async move { shutdown.cancelled().await })
        .await
        .with_context(|| format!("Failed to serve gRPC on {}", addr))
}
