// HTTP request handlers
//
// Raw ingest, the small admin API and the health/metrics endpoints.

use anyhow::{anyhow, Context};
use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use golbat_common::{AreaName, Geofence, Location};
use golbat_decoder::{decode_http, DeviceLocation};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::{AppError, AppState};

/// Budget for one background quest clear.
const CLEAR_QUESTS_TIMEOUT: Duration = Duration::from_secs(10);

const SECRET_HEADER: &str = "X-Golbat-Secret";

/// `Authorization: Bearer <token>` check. An empty token disables it.
fn bearer_matches(headers: &HeaderMap, token: &str) -> bool {
    if token.is_empty() {
        return true;
    }
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|v| v == token)
}

fn check_api_secret(state: &AppState, headers: &HeaderMap) -> Result<(), AppError> {
    let secret = &state.settings.api_secret;
    if secret.is_empty() {
        return Ok(());
    }
    let supplied = headers.get(SECRET_HEADER).and_then(|v| v.to_str().ok());
    if supplied == Some(secret.as_str()) {
        Ok(())
    } else {
        Err(AppError::unauthorized(anyhow!("Incorrect api secret")))
    }
}

/// POST /raw - scanner submissions
pub(crate) async fn handle_raw(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    if !bearer_matches(&headers, &state.settings.raw_bearer) {
        state.stats.inc_raw_requests("error", "auth");
        return Err(AppError::unauthorized(anyhow!(
            "Incorrect authorisation received"
        )));
    }

    let origin = headers.get("origin").and_then(|v| v.to_str().ok());
    let received_ms = chrono::Utc::now().timestamp_millis();

    let groups = match decode_http(origin, &body, received_ms) {
        Ok(groups) => groups,
        Err(e) => {
            state.stats.inc_raw_requests("error", e.metric_label());
            return Err(AppError::unprocessable(e));
        }
    };

    let records: usize = groups.iter().map(|g| g.protos.len()).sum();
    debug!(groups = groups.len(), records, "Raw: accepted submission");

    for group in groups {
        state.decoder.spawn_group(group);
    }
    state.stats.inc_raw_requests("ok", "");

    Ok(StatusCode::CREATED.into_response())
}

#[derive(Debug, Deserialize)]
struct FencePoint {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct ClearQuestsRequest {
    fence: Vec<FencePoint>,
}

/// POST /api/clear-quests - wipe quests inside a polygon
pub(crate) async fn clear_quests(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    check_api_secret(&state, &headers)?;

    let request: ClearQuestsRequest = serde_json::from_slice(&body)
        .context("Invalid clear quests request")
        .map_err(AppError::bad_request)?;
    if request.fence.is_empty() {
        return Err(AppError::bad_request(anyhow!("Fence has no points")));
    }
    let points = request
        .fence
        .iter()
        .map(|p| Location::new(p.lat, p.lon))
        .collect();
    let fence = Geofence::new(AreaName::new("", "api"), points);

    let decoder = state.decoder.clone();
    let pool = state.pool.clone();
    tokio::spawn(async move {
        let cached = decoder.store().clear_cached_quests(&fence);
        info!("Clear quests: {} cached pokestops cleared", cached);

        let Some(pool) = pool else {
            return;
        };
        match tokio::time::timeout(CLEAR_QUESTS_TIMEOUT, golbat_db::api::clear_quests(&pool, &fence))
            .await
        {
            Ok(Ok(rows)) => info!("Clear quests: {} pokestops cleared in database", rows),
            Ok(Err(e)) => warn!("Clear quests failed: {}", e),
            Err(_) => warn!("Clear quests timed out after {:?}", CLEAR_QUESTS_TIMEOUT),
        }
    });

    Ok((StatusCode::ACCEPTED, Json(json!({"status": "ok"}))).into_response())
}

/// POST /api/pokemon/query - SQL passthrough for diagnostics
pub(crate) async fn query_pokemon(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    check_api_secret(&state, &headers)?;

    let sql = std::str::from_utf8(&body)
        .context("Query is not valid UTF-8")
        .map_err(AppError::bad_request)?;
    let Some(pool) = &state.pool else {
        return Err(AppError::internal(anyhow!(
            "No database available in in-memory mode"
        )));
    };

    let rows = golbat_db::api::query_rows(pool, sql, state.settings.max_pokemon_results)
        .await
        .map_err(AppError::internal)?;

    Ok((StatusCode::ACCEPTED, Json(rows)).into_response())
}

#[derive(Debug, Serialize)]
struct DevicesResponse {
    devices: BTreeMap<String, DeviceLocation>,
}

/// GET /api/devices/all - last known position of every device
pub(crate) async fn devices(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    check_api_secret(&state, &headers)?;

    let mut devices = BTreeMap::new();
    state.decoder.devices().iterate(|id, location| {
        devices.insert(id.to_string(), location.clone());
    });

    Ok((StatusCode::OK, Json(DevicesResponse { devices })).into_response())
}

/// GET /health - Basic health check
pub(crate) async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"status": "healthy"})))
}

/// GET /metrics - Prometheus exposition
pub(crate) async fn metrics(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    if !bearer_matches(&headers, &state.settings.metrics_token) {
        return Err(AppError::unauthorized(anyhow!("Incorrect metrics token")));
    }
    let Some(handle) = &state.prometheus else {
        return Err(AppError::with_status(
            StatusCode::NOT_FOUND,
            anyhow!("Prometheus is disabled"),
        ));
    };

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        handle.render(),
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_requires_exact_token() {
        let mut headers = HeaderMap::new();
        assert!(bearer_matches(&headers, ""));
        assert!(!bearer_matches(&headers, "secret"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("secret"));
        assert!(!bearer_matches(&headers, "secret"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer secret"));
        assert!(bearer_matches(&headers, "secret"));
        assert!(!bearer_matches(&headers, "other"));
    }

    #[test]
    fn clear_request_parses_fence() {
        let request: ClearQuestsRequest =
            serde_json::from_str(r#"{"fence":[{"lat":1.0,"lon":2.0},{"lat":3.5,"lon":4.5}]}"#)
                .unwrap();
        assert_eq!(request.fence.len(), 2);
        assert_eq!(request.fence[1].lat, 3.5);
        assert_eq!(request.fence[1].lon, 4.5);
    }
}
