// gRPC `SubmitRawProto` normalizer. The envelope is already protobuf, so
// this only maps fields and applies defaults.

use super::{Payload, PogoProto, ProtoGroup, ScanMetadata};
use golbat_common::Location;
use golbat_proto::RawProtoRequest;

pub fn decode_grpc(request: RawProtoRequest, received_ms: i64) -> ProtoGroup {
    let metadata = ScanMetadata {
        account: request.username,
        level: request.trainer_level,
        device_id: request.device_id,
        scan_context: request.scan_context.unwrap_or_default(),
        timestamp_ms: if request.timestamp > 0 {
            request.timestamp
        } else {
            received_ms
        },
    };
    let location = Location::new(f64::from(request.lat_target), f64::from(request.lon_target));
    let have_ar = request.have_ar;

    let protos = request
        .contents
        .into_iter()
        .map(|content| PogoProto {
            metadata: metadata.clone(),
            method: content.method,
            have_ar: content.have_ar.or(have_ar),
            location,
            request: Some(Payload::Binary(content.request_payload)),
            response: Payload::Binary(content.response_payload),
        })
        .collect();

    ProtoGroup::new(protos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use golbat_proto::RawContent;

    #[test]
    fn maps_envelope_and_overrides_ar_per_content() {
        let group = decode_grpc(
            RawProtoRequest {
                device_id: "dev".into(),
                username: "ash".into(),
                trainer_level: 35,
                scan_context: None,
                lat_target: 1.5,
                lon_target: -2.25,
                have_ar: Some(false),
                timestamp: 0,
                contents: vec![
                    RawContent {
                        method: 106,
                        request_payload: vec![],
                        response_payload: vec![8, 1],
                        have_ar: None,
                    },
                    RawContent {
                        method: 101,
                        request_payload: vec![1],
                        response_payload: vec![],
                        have_ar: Some(true),
                    },
                ],
            },
            42,
        );

        assert_eq!(group.len(), 2);
        let first = &group.protos[0];
        assert_eq!(first.timestamp_ms(), 42);
        assert_eq!(first.scan_context(), "");
        assert_eq!(first.level(), 35);
        assert_eq!(first.location, Location::new(1.5, -2.25));
        assert_eq!(first.have_ar, Some(false));
        assert!(!first.has_request());

        assert_eq!(group.protos[1].have_ar, Some(true));
        assert!(group.protos[1].has_request());
    }
}
