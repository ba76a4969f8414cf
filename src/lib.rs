// golbat server
//
// Wires the pipeline crates together behind an axum HTTP server and an
// optional tonic gRPC listener:
// - raw ingest on POST /raw and golbat.RawProto/SubmitRawProto
// - write-behind queues driven by the queue manager
// - periodic webhook fan-out
// - background cleanup of expired rows
// - graceful shutdown that drains every queue before exit

use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use golbat_config::RuntimeConfig;
use golbat_db::MySqlPool;
use golbat_decoder::{
    Decoder, DeviceTracker, EncounterCache, EntityContext, EntityQueues, EntityStore,
    EntityWriters, QueueSettings, ScanRules,
};
use golbat_stats::SharedStats;
use golbat_webhooks::{NoopWebhooks, SharedWebhooks, WebhookSender};
use golbat_writebehind::QueueManager;
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{debug, error, info};

mod grpc;
mod handlers;
mod init;

pub use grpc::RawProtoService;
pub use init::{init_metrics, init_tracing};

/// Largest accepted /raw body.
pub const MAX_RAW_BODY_BYTES: usize = 5 * 1024 * 1024;

/// How often expired entity cache entries are evicted.
const CACHE_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Shared secrets and limits read by the request handlers.
#[derive(Debug, Clone, Default)]
pub struct ApiSettings {
    pub raw_bearer: String,
    pub api_secret: String,
    pub metrics_token: String,
    pub max_pokemon_results: usize,
}

impl From<&RuntimeConfig> for ApiSettings {
    fn from(config: &RuntimeConfig) -> Self {
        Self {
            raw_bearer: config.raw_bearer.clone(),
            api_secret: config.api_secret.clone(),
            metrics_token: config.prometheus.token.clone(),
            max_pokemon_results: config.tuning.max_pokemon_results,
        }
    }
}

/// Application state shared across all requests
#[derive(Clone)]
pub struct AppState {
    pub decoder: Arc<Decoder>,
    pub stats: SharedStats,
    /// `None` when running in memory.
    pub pool: Option<MySqlPool>,
    pub prometheus: Option<PrometheusHandle>,
    pub settings: Arc<ApiSettings>,
}

/// Error type that implements IntoResponse
pub(crate) struct AppError {
    status: StatusCode,
    error: anyhow::Error,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        error!("Request error: {:?}", self.error);
        (
            self.status,
            Json(json!({
                "error": self.error.to_string(),
            })),
        )
            .into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(error: E) -> Self {
        Self::internal(error)
    }
}

impl AppError {
    pub fn with_status(status: StatusCode, error: anyhow::Error) -> Self {
        Self { status, error }
    }

    pub fn unauthorized<E>(error: E) -> Self
    where
        E: Into<anyhow::Error>,
    {
        Self {
            status: StatusCode::UNAUTHORIZED,
            error: error.into(),
        }
    }

    pub fn bad_request<E>(error: E) -> Self
    where
        E: Into<anyhow::Error>,
    {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: error.into(),
        }
    }

    pub fn unprocessable<E>(error: E) -> Self
    where
        E: Into<anyhow::Error>,
    {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            error: error.into(),
        }
    }

    pub fn internal<E>(error: E) -> Self
    where
        E: Into<anyhow::Error>,
    {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: error.into(),
        }
    }
}

/// Decoder, caches and queues assembled from configuration.
pub struct Pipeline {
    pub decoder: Arc<Decoder>,
    pub encounters: Arc<EncounterCache>,
    pub manager: QueueManager,
}

/// Build the decode pipeline over the given writers. Nothing is started.
pub fn build_pipeline(
    config: &RuntimeConfig,
    writers: EntityWriters,
    stats: SharedStats,
    webhooks: SharedWebhooks,
) -> Pipeline {
    let settings = QueueSettings::from(&config.tuning);
    let queues = EntityQueues::new(writers, &settings, &stats);
    let mut manager = QueueManager::new();
    queues.register(&mut manager);

    let encounters = Arc::new(EncounterCache::new(config.tuning.encounter_cache_ttl()));
    let ctx = EntityContext {
        webhooks,
        stats: Arc::clone(&stats),
        geofences: config.geofences(),
        encounters: Arc::clone(&encounters),
        pokemon_write_delay: config.tuning.pokemon_write_delay(),
        fort_stale_after: config.tuning.fort_stale_threshold(),
    };
    let store = Arc::new(EntityStore::new(queues, ctx));
    let scan_rules = Arc::new(ScanRules::new(&config.scan_rules, config.geofences()));
    let devices = Arc::new(DeviceTracker::new(config.tuning.device_ttl()));

    let decoder = Arc::new(Decoder::new(
        store,
        scan_rules,
        devices,
        stats,
        config.tuning.decode_timeout(),
    ));

    Pipeline {
        decoder,
        encounters,
        manager,
    }
}

/// Every HTTP route, with state attached.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/raw",
            post(handlers::handle_raw)
                .layer::<_, std::convert::Infallible>(DefaultBodyLimit::disable())
                .layer(RequestBodyLimitLayer::new(MAX_RAW_BODY_BYTES)),
        )
        .route("/api/clear-quests", post(handlers::clear_quests))
        .route("/api/clearQuests", post(handlers::clear_quests))
        .route("/api/pokemon/query", post(handlers::query_pokemon))
        .route("/api/queryPokemon", post(handlers::query_pokemon))
        .route("/api/devices/all", get(handlers::devices))
        .route("/api/devices", get(handlers::devices))
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics))
        .with_state(state)
}

/// Graceful shutdown handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown...");
        },
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown...");
        },
    }
}

/// Entry point (loads config automatically)
pub async fn run() -> Result<()> {
    let config = RuntimeConfig::load().context("Failed to load configuration")?;
    run_with_config(config).await
}

/// Entry point with pre-loaded configuration (for CLI usage)
pub async fn run_with_config(config: RuntimeConfig) -> Result<()> {
    init_tracing(&config.logging);
    config.validate().context("Invalid configuration")?;
    init::log_external_agents(&config);

    let prometheus = init_metrics(&config.prometheus)?;
    let stats = golbat_stats::stats_collector(config.prometheus.enabled);

    let sender = if config.webhooks.is_empty() {
        None
    } else {
        let sender = WebhookSender::new(&config.webhooks, config.tuning.webhook_interval())
            .context("Failed to configure webhooks")?;
        info!("Webhooks: {} destinations", sender.destinations().len());
        Some(Arc::new(sender))
    };
    let webhooks: SharedWebhooks = match &sender {
        Some(sender) => Arc::clone(sender) as SharedWebhooks,
        None => Arc::new(NoopWebhooks),
    };

    let (pool, writers) = if config.in_memory {
        info!("In-memory mode: entity writes are discarded");
        (None, golbat_db::discard_writers())
    } else {
        let pool = golbat_db::connect(&config.database)
            .await
            .context("Failed to connect to database")?;
        QueueManager::check_pool_budget(
            config.tuning.write_behind_worker_count,
            config.database.max_pool as usize,
        );
        let writers = golbat_db::entity_writers(&pool);
        (Some(pool), writers)
    };

    let Pipeline {
        decoder,
        encounters,
        manager,
    } = build_pipeline(&config, writers, Arc::clone(&stats), webhooks);

    // Background work lives under `pipeline`; the listeners under `shutdown`.
    let pipeline = CancellationToken::new();
    let shutdown = CancellationToken::new();
    manager.start(&pipeline);

    let mut background = Vec::new();
    {
        let devices = Arc::clone(decoder.devices());
        let token = pipeline.clone();
        background.push(tokio::spawn(async move { devices.run(token).await }));
    }
    {
        let token = pipeline.clone();
        background.push(tokio::spawn(async move { encounters.run(token).await }));
    }
    {
        let store = Arc::clone(decoder.store());
        let token = pipeline.clone();
        background.push(tokio::spawn(async move {
            sweep_entity_caches(store, token).await
        }));
    }
    if let Some(sender) = &sender {
        background.push(tokio::spawn(Arc::clone(sender).run(pipeline.clone())));
    }
    if let Some(pool) = &pool {
        if config.cleanup.any_enabled() {
            background.push(tokio::spawn(golbat_db::cleanup::run(
                pool.clone(),
                config.cleanup.clone(),
                pipeline.clone(),
            )));
        }
    }

    let state = AppState {
        decoder: Arc::clone(&decoder),
        stats,
        pool,
        prometheus,
        settings: Arc::new(ApiSettings::from(&config)),
    };

    let grpc_handle = if config.grpc_port != 0 {
        let addr = SocketAddr::from(([0, 0, 0, 0], config.grpc_port));
        let service = RawProtoService::new(Arc::clone(&decoder), config.raw_bearer.clone());
        info!("gRPC RawProto listening on {}", addr);
        Some(tokio::spawn(grpc::serve(addr, service, shutdown.clone())))
    } else {
        None
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Golbat listening on http://{}", addr);
    info!("Routes:");
    info!("  POST http://{}/raw                - Raw proto ingestion", addr);
    info!("  POST http://{}/api/clear-quests   - Clear quests in a fence", addr);
    info!("  POST http://{}/api/pokemon/query  - Query passthrough", addr);
    info!("  GET  http://{}/api/devices/all    - Device locations", addr);
    info!("  GET  http://{}/health             - Health check", addr);
    info!("  GET  http://{}/metrics            - Prometheus metrics", addr);
    info!("Press Ctrl+C or send SIGTERM to stop");

    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            shutdown.cancel();
        });
    }

    let server_shutdown = shutdown.clone();
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { server_shutdown.cancelled().await })
        .await
        .context("Server error")?;
    // Reaching here without a signal means the server stopped on its own.
    shutdown.cancel();

    if let Some(handle) = grpc_handle {
        match handle.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("gRPC server error: {:#}", e),
            Err(e) => error!("gRPC server task failed: {}", e),
        }
    }

    info!("Listeners stopped, draining write-behind queues");
    pipeline.cancel();
    manager.stop().await;
    manager.flush().await;
    for handle in background {
        if let Err(e) = handle.await {
            error!("Background task failed: {}", e);
        }
    }

    if let Some(sender) = &sender {
        sender.flush().await;
    }

    info!("Golbat exiting");
    Ok(())
}

/// Evict expired entries from the entity caches until cancelled.
async fn sweep_entity_caches(store: Arc<EntityStore>, token: CancellationToken) {
    let mut ticker = tokio::time::interval(CACHE_SWEEP_INTERVAL);
    ticker.tick().await;
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => {
                let evicted = store.sweep();
                if evicted > 0 {
                    debug!(evicted, "Swept entity caches");
                }
            }
        }
    }
}
