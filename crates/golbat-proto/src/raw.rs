// Messages of the `golbat.RawProto` ingest service.

/// One captured request/response exchange.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RawContent {
    #[prost(int32, tag = "1")]
    pub method: i32,
    #[prost(bytes = "vec", tag = "2")]
    pub request_payload: Vec<u8>,
    #[prost(bytes = "vec", tag = "3")]
    pub response_payload: Vec<u8>,
    /// Overrides the request-level value when present.
    #[prost(bool, optional, tag = "4")]
    pub have_ar: Option<bool>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RawProtoRequest {
    #[prost(string, tag = "1")]
    pub device_id: String,
    #[prost(string, tag = "2")]
    pub username: String,
    #[prost(int32, tag = "3")]
    pub trainer_level: i32,
    #[prost(string, optional, tag = "4")]
    pub scan_context: Option<String>,
    #[prost(float, tag = "5")]
    pub lat_target: f32,
    #[prost(float, tag = "6")]
    pub lon_target: f32,
    #[prost(bool, optional, tag = "7")]
    pub have_ar: Option<bool>,
    /// Milliseconds since the epoch; zero or negative means "now".
    #[prost(int64, tag = "8")]
    pub timestamp: i64,
    #[prost(message, repeated, tag = "9")]
    pub contents: Vec<RawContent>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RawProtoResponse {
    #[prost(string, tag = "1")]
    pub message: String,
}
