// Build script for the RawProto gRPC service.
//
// Messages are defined with prost derives in src/raw.rs, so the service is
// described with tonic-build's manual builder and no .proto compilation (or
// protoc) is needed.

fn main() {
    let service = tonic_build::manual::Service::builder()
        .name("RawProto")
        .package("golbat")
        .method(
            tonic_build::manual::Method::builder()
                .name("submit_raw_proto")
                .route_name("SubmitRawProto")
                .input_type("crate::raw::RawProtoRequest")
                .output_type("crate::raw::RawProtoResponse")
                .codec_path("tonic::codec::ProstCodec")
                .build(),
        )
        .build();

    tonic_build::manual::Builder::new().compile(&[service]);

    println!("cargo:rerun-if-changed=build.rs");
}
