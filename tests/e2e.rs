// End-to-end tests for the HTTP and gRPC surfaces
//
// The router runs in memory over discarding writers; requests are driven with
// tower's oneshot.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use golbat::{build_pipeline, router, ApiSettings, AppState, RawProtoService};
use golbat_config::RuntimeConfig;
use golbat_proto::{RawContent, RawProtoRequest};
use golbat_stats::StatsCollector;
use golbat_webhooks::NoopWebhooks;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

#[derive(Default)]
struct RecordingStats {
    raw: Mutex<Vec<(String, String)>>,
}

impl StatsCollector for RecordingStats {
    fn inc_raw_requests(&self, status: &str, message: &str) {
        self.raw.lock().push((status.to_string(), message.to_string()));
    }
}

struct TestApp {
    app: Router,
    state: AppState,
    stats: Arc<RecordingStats>,
}

fn test_app(raw_bearer: &str, api_secret: &str) -> TestApp {
    let config = RuntimeConfig {
        in_memory: true,
        raw_bearer: raw_bearer.to_string(),
        api_secret: api_secret.to_string(),
        ..Default::default()
    };
    let stats = Arc::new(RecordingStats::default());
    let pipeline = build_pipeline(
        &config,
        golbat_db::discard_writers(),
        stats.clone(),
        Arc::new(NoopWebhooks),
    );
    let state = AppState {
        decoder: pipeline.decoder,
        stats: stats.clone(),
        pool: None,
        prometheus: None,
        settings: Arc::new(ApiSettings::from(&config)),
    };
    TestApp {
        app: router(state.clone()),
        state,
        stats,
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}

fn raw_body() -> String {
    json!({
        "uuid": "device-1",
        "username": "scanner",
        "trainerlvl": 35,
        "scan_context": "pokemon",
        "lat_target": 51.5,
        "lon_target": -0.12,
        "contents": [{"type": 2, "payload": ""}]
    })
    .to_string()
}

#[tokio::test]
async fn health_reports_healthy() {
    let t = test_app("", "");
    let (status, body) = send(
        &t.app,
        Request::get("/health").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body, json!({"status": "healthy"}));
}

#[tokio::test]
async fn raw_rejects_missing_bearer() {
    let t = test_app("secret", "");
    let (status, _) = send(
        &t.app,
        Request::post("/raw").body(Body::from(raw_body())).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &t.app,
        Request::post("/raw")
            .header("Authorization", "Bearer wrong")
            .body(Body::from(raw_body()))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        *t.stats.raw.lock(),
        vec![
            ("error".to_string(), "auth".to_string()),
            ("error".to_string(), "auth".to_string()),
        ]
    );
}

#[tokio::test]
async fn raw_rejects_unparseable_body() {
    let t = test_app("", "");
    let (status, _) = send(
        &t.app,
        Request::post("/raw").body(Body::from("{not json")).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = send(&t.app, Request::post("/raw").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        *t.stats.raw.lock(),
        vec![
            ("error".to_string(), "decode".to_string()),
            ("error".to_string(), "decode".to_string()),
        ]
    );
}

#[tokio::test]
async fn raw_accepts_submission_and_tracks_device() {
    let t = test_app("secret", "");
    let (status, _) = send(
        &t.app,
        Request::post("/raw")
            .header("Authorization", "Bearer secret")
            .body(Body::from(raw_body()))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(*t.stats.raw.lock(), vec![("ok".to_string(), String::new())]);

    let (status, body) = send(
        &t.app,
        Request::get("/api/devices/all").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    let device = &body["devices"]["device-1"];
    assert_eq!(device["latitude"], json!(51.5));
    assert_eq!(device["longitude"], json!(-0.12));
    assert_eq!(device["scan_context"], json!("pokemon"));
    assert!(device["last_update"].as_i64().unwrap() > 0);
}

#[tokio::test]
async fn raw_rejects_oversized_body() {
    let t = test_app("", "");
    let body = vec![b' '; golbat::MAX_RAW_BODY_BYTES + 1];
    let (status, _) = send(&t.app, Request::post("/raw").body(Body::from(body)).unwrap()).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn clear_quests_requires_secret_and_accepts() {
    let t = test_app("", "s3cret");
    let fence = json!({"fence": [
        {"lat": 51.0, "lon": -1.0},
        {"lat": 52.0, "lon": -1.0},
        {"lat": 52.0, "lon": 0.0},
        {"lat": 51.0, "lon": 0.0}
    ]})
    .to_string();

    let (status, _) = send(
        &t.app,
        Request::post("/api/clear-quests")
            .body(Body::from(fence.clone()))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(
        &t.app,
        Request::post("/api/clearQuests")
            .header("X-Golbat-Secret", "s3cret")
            .body(Body::from(fence))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body, json!({"status": "ok"}));
}

#[tokio::test]
async fn query_without_database_is_an_error() {
    let t = test_app("", "");
    let (status, body) = send(
        &t.app,
        Request::post("/api/queryPokemon")
            .body(Body::from("SELECT 1"))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert!(body["error"].as_str().unwrap().contains("in-memory"));
}

#[tokio::test]
async fn metrics_disabled_is_not_found() {
    let t = test_app("", "");
    let (status, _) = send(
        &t.app,
        Request::get("/metrics").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

fn grpc_request() -> RawProtoRequest {
    RawProtoRequest {
        device_id: "grpc-device".to_string(),
        username: "scanner".to_string(),
        trainer_level: 40,
        scan_context: Some("quest".to_string()),
        lat_target: 40.5,
        lon_target: -73.5,
        have_ar: None,
        timestamp: 0,
        contents: vec![RawContent {
            method: 2,
            request_payload: Vec::new(),
            response_payload: Vec::new(),
            have_ar: None,
        }],
    }
}

#[tokio::test]
async fn grpc_checks_authorization_metadata() {
    let t = test_app("token", "");
    let service = RawProtoService::new(t.state.decoder.clone(), "token".to_string());

    let response = service.submit(tonic::Request::new(grpc_request()));
    assert_eq!(response.message, "Incorrect authorisation received");
    assert!(t.state.decoder.devices().get("grpc-device").is_none());

    let mut request = tonic::Request::new(grpc_request());
    request
        .metadata_mut()
        .insert("authorization", "token".parse().unwrap());
    let response = service.submit(request);
    assert_eq!(response.message, "Processed");

    let device = t.state.decoder.devices().get("grpc-device").unwrap();
    assert_eq!(device.scan_context, "quest");
    assert_eq!(device.latitude, 40.5);
}
