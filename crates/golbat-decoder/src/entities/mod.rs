//! In-memory entity state and the write-behind queues behind it.
//!
//! Updaters take the striped lock for the entity key, compare the fresh
//! snapshot against the cached one and enqueue it only when a tracked field
//! changed. The cache is authoritative for comparisons; a miss is treated as
//! a new record.

mod fort_tracker;
mod gym;
mod incident;
mod pokemon;
mod pokestop;
mod route;
mod s2cell;
mod spawnpoint;
mod station;
mod tappable;
mod weather;

pub use fort_tracker::DEFAULT_FORT_STALE_SECONDS;
pub use gym::GymRow;
pub use incident::IncidentRow;
pub use pokemon::{level_from_cp_multiplier, PokemonRow, SeenType};
pub use pokestop::{PokestopRow, QuestSlot};
pub use route::RouteRow;
pub use s2cell::S2CellRow;
pub use spawnpoint::SpawnpointRow;
pub use station::StationRow;
pub use tappable::TappableRow;
pub use weather::WeatherRow;

use crate::encounter_cache::EncounterCache;
use fort_tracker::FortTracker;
use crate::striped::StripedMutex;
use crate::ttl::TtlMap;
use golbat_common::{AreaName, Geofences, Location};
use golbat_config::TuningConfig;
use golbat_stats::SharedStats;
use golbat_webhooks::{SharedWebhooks, WebhookType};
use golbat_writebehind::{
    Accumulator, AccumulatorConfig, BatchWriter, QueueManager, SharedLimiter, TokenBucket,
    TypedQueue, TypedQueueConfig,
};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Cache retention for forts, stations and routes.
const FORT_CACHE_TTL: Duration = Duration::from_secs(60 * 60);
/// Cache retention for weather cells.
const WEATHER_CACHE_TTL: Duration = Duration::from_secs(2 * 60 * 60);
/// Cache retention for sightings; a sighting rarely outlives its hour.
const POKEMON_CACHE_TTL: Duration = Duration::from_secs(60 * 60);

const S2CELL_FLUSH_INTERVAL: Duration = Duration::from_secs(5);
const S2CELL_CHUNK_SIZE: usize = 100;

/// Batch writers for every persisted entity, provided by the storage layer.
#[derive(Clone)]
pub struct EntityWriters {
    pub pokemon: Arc<dyn BatchWriter<PokemonRow>>,
    pub pokestop: Arc<dyn BatchWriter<PokestopRow>>,
    pub gym: Arc<dyn BatchWriter<GymRow>>,
    pub spawnpoint: Arc<dyn BatchWriter<SpawnpointRow>>,
    pub incident: Arc<dyn BatchWriter<IncidentRow>>,
    pub station: Arc<dyn BatchWriter<StationRow>>,
    pub route: Arc<dyn BatchWriter<RouteRow>>,
    pub tappable: Arc<dyn BatchWriter<TappableRow>>,
    pub weather: Arc<dyn BatchWriter<WeatherRow>>,
    pub s2cell: Arc<dyn BatchWriter<S2CellRow>>,
}

/// Queue tuning shared by every entity queue.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueSettings {
    pub batch_size: usize,
    pub batch_timeout: Duration,
    pub startup_delay: Duration,
    pub worker_count: usize,
    pub rate_limit: f64,
    pub burst_capacity: u32,
}

impl From<&TuningConfig> for QueueSettings {
    fn from(tuning: &TuningConfig) -> Self {
        Self {
            batch_size: tuning.write_behind_batch_size,
            batch_timeout: tuning.batch_timeout(),
            startup_delay: tuning.startup_delay(),
            worker_count: tuning.write_behind_worker_count,
            rate_limit: tuning.write_behind_rate_limit,
            burst_capacity: tuning.write_behind_burst_capacity,
        }
    }
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self::from(&TuningConfig::default())
    }
}

/// One write-behind queue per entity plus the S2 cell accumulator.
#[derive(Clone)]
pub struct EntityQueues {
    pub pokemon: TypedQueue<u64, PokemonRow>,
    pub pokestop: TypedQueue<String, PokestopRow>,
    pub gym: TypedQueue<String, GymRow>,
    pub spawnpoint: TypedQueue<i64, SpawnpointRow>,
    pub incident: TypedQueue<String, IncidentRow>,
    pub station: TypedQueue<String, StationRow>,
    pub route: TypedQueue<String, RouteRow>,
    pub tappable: TypedQueue<u64, TappableRow>,
    pub weather: TypedQueue<i64, WeatherRow>,
    pub s2cell: Accumulator<u64, S2CellRow>,
}

struct QueueFactory<'a> {
    settings: &'a QueueSettings,
    limiter: SharedLimiter,
    stats: &'a SharedStats,
}

impl QueueFactory<'_> {
    fn build<K, T>(
        &self,
        name: &str,
        writer: Arc<dyn BatchWriter<T>>,
        key_fn: impl Fn(&T) -> K + Send + Sync + 'static,
    ) -> TypedQueue<K, T>
    where
        K: Ord + Clone + Debug + Send + Sync + 'static,
        T: Send + Sync + 'static,
    {
        let rate_limiter = (self.settings.rate_limit > 0.0).then(|| {
            Arc::new(TokenBucket::new(
                self.settings.rate_limit,
                self.settings.burst_capacity,
            ))
        });
        TypedQueue::new(TypedQueueConfig {
            name: name.to_string(),
            batch_size: self.settings.batch_size,
            batch_timeout: self.settings.batch_timeout,
            startup_delay: self.settings.startup_delay,
            limiter: Some(self.limiter.clone()),
            rate_limiter,
            writer,
            key_fn: Arc::new(key_fn),
            stats: Arc::clone(self.stats),
        })
    }
}

impl EntityQueues {
    pub fn new(writers: EntityWriters, settings: &QueueSettings, stats: &SharedStats) -> Self {
        let factory = QueueFactory {
            settings,
            limiter: SharedLimiter::new(settings.worker_count),
            stats,
        };

        Self {
            pokemon: factory.build("pokemon", writers.pokemon, |p: &PokemonRow| p.id),
            pokestop: factory.build("pokestop", writers.pokestop, |p: &PokestopRow| p.id.clone()),
            gym: factory.build("gym", writers.gym, |g: &GymRow| g.id.clone()),
            spawnpoint: factory.build("spawnpoint", writers.spawnpoint, |s: &SpawnpointRow| s.id),
            incident: factory.build("incident", writers.incident, |i: &IncidentRow| i.id.clone()),
            station: factory.build("station", writers.station, |s: &StationRow| s.id.clone()),
            route: factory.build("route", writers.route, |r: &RouteRow| r.id.clone()),
            tappable: factory.build("tappable", writers.tappable, |t: &TappableRow| t.id),
            weather: factory.build("weather", writers.weather, |w: &WeatherRow| w.id),
            s2cell: Accumulator::new(AccumulatorConfig {
                name: "s2cell".to_string(),
                chunk_size: S2CELL_CHUNK_SIZE,
                flush_interval: S2CELL_FLUSH_INTERVAL,
                startup_delay: settings.startup_delay,
                writer: writers.s2cell,
                key_fn: Arc::new(|c: &S2CellRow| c.id),
                updated_fn: Arc::new(|c: &S2CellRow| c.updated),
                stats: Arc::clone(stats),
            }),
        }
    }

    /// Hand every queue to the manager so it is driven and drained.
    pub fn register(&self, manager: &mut QueueManager) {
        manager.register(Arc::new(self.pokemon.clone()));
        manager.register(Arc::new(self.pokestop.clone()));
        manager.register(Arc::new(self.gym.clone()));
        manager.register(Arc::new(self.spawnpoint.clone()));
        manager.register(Arc::new(self.incident.clone()));
        manager.register(Arc::new(self.station.clone()));
        manager.register(Arc::new(self.route.clone()));
        manager.register(Arc::new(self.tappable.clone()));
        manager.register(Arc::new(self.weather.clone()));
        manager.register(Arc::new(self.s2cell.clone()));
    }
}

/// Everything an updater needs besides the decoded proto.
pub struct EntityContext {
    pub webhooks: SharedWebhooks,
    pub stats: SharedStats,
    pub geofences: Geofences,
    pub encounters: Arc<EncounterCache>,
    pub pokemon_write_delay: Duration,
    /// How long a fort may be missing from its cell listing before removal.
    pub fort_stale_after: Duration,
}

/// Entity caches, locks and queues.
pub struct EntityStore {
    pub(crate) queues: EntityQueues,
    pub(crate) pokemon: TtlMap<u64, PokemonRow>,
    pub(crate) pokestops: TtlMap<String, PokestopRow>,
    pub(crate) gyms: TtlMap<String, GymRow>,
    pub(crate) spawnpoints: TtlMap<i64, SpawnpointRow>,
    pub(crate) incidents: TtlMap<String, IncidentRow>,
    pub(crate) stations: TtlMap<String, StationRow>,
    pub(crate) routes: TtlMap<String, RouteRow>,
    pub(crate) tappables: TtlMap<u64, TappableRow>,
    pub(crate) weather: TtlMap<i64, WeatherRow>,
    /// Fort ids last seen in each map cell, for removal detection.
    pub(crate) fort_tracker: Mutex<FortTracker>,
    pub(crate) locks: StripedMutex,
    pub(crate) ctx: EntityContext,
}

impl EntityStore {
    pub fn new(queues: EntityQueues, ctx: EntityContext) -> Self {
        Self {
            queues,
            pokemon: TtlMap::new(POKEMON_CACHE_TTL),
            pokestops: TtlMap::new(FORT_CACHE_TTL),
            gyms: TtlMap::new(FORT_CACHE_TTL),
            spawnpoints: TtlMap::new(FORT_CACHE_TTL),
            incidents: TtlMap::new(FORT_CACHE_TTL),
            stations: TtlMap::new(FORT_CACHE_TTL),
            routes: TtlMap::new(FORT_CACHE_TTL),
            tappables: TtlMap::new(FORT_CACHE_TTL),
            weather: TtlMap::new(WEATHER_CACHE_TTL),
            fort_tracker: Mutex::new(FortTracker::new(ctx.fort_stale_after.as_secs() as i64)),
            locks: StripedMutex::default(),
            ctx,
        }
    }

    pub fn queues(&self) -> &EntityQueues {
        &self.queues
    }

    pub fn encounters(&self) -> &EncounterCache {
        &self.ctx.encounters
    }

    pub fn pokemon(&self, id: u64) -> Option<PokemonRow> {
        self.pokemon.get(&id)
    }

    pub fn pokestop(&self, id: &str) -> Option<PokestopRow> {
        self.pokestops.get(&id.to_string())
    }

    pub fn gym(&self, id: &str) -> Option<GymRow> {
        self.gyms.get(&id.to_string())
    }

    pub fn incident(&self, id: &str) -> Option<IncidentRow> {
        self.incidents.get(&id.to_string())
    }

    pub fn station(&self, id: &str) -> Option<StationRow> {
        self.stations.get(&id.to_string())
    }

    pub fn route(&self, id: &str) -> Option<RouteRow> {
        self.routes.get(&id.to_string())
    }

    pub fn tappable(&self, id: u64) -> Option<TappableRow> {
        self.tappables.get(&id)
    }

    pub fn weather(&self, id: i64) -> Option<WeatherRow> {
        self.weather.get(&id)
    }

    pub fn spawnpoint(&self, id: i64) -> Option<SpawnpointRow> {
        self.spawnpoints.get(&id)
    }

    /// Drop expired cache entries across all entity maps.
    pub fn sweep(&self) -> usize {
        self.pokemon.sweep()
            + self.pokestops.sweep()
            + self.gyms.sweep()
            + self.spawnpoints.sweep()
            + self.incidents.sweep()
            + self.stations.sweep()
            + self.routes.sweep()
            + self.tappables.sweep()
            + self.weather.sweep()
    }

    /// Apply the fort listing of `cell_id` seen at `now` (unix seconds).
    /// Forts missing from the cell for longer than the stale threshold are
    /// marked deleted. Returns how many were.
    pub async fn update_cell_forts(&self, cell_id: u64, seen: HashSet<String>, now: i64) -> usize {
        let stale = self.fort_tracker.lock().process_cell(cell_id, seen, now);

        let mut removed = 0;
        for id in &stale {
            let deleted = if self.pokestop(id).is_some() {
                self.mark_pokestop_deleted(id).await
            } else if self.gym(id).is_some() {
                self.mark_gym_deleted(id).await
            } else {
                false
            };
            if deleted {
                debug!("Fort {} removed from cell {}", id, cell_id);
                removed += 1;
            }
        }
        removed
    }

    pub(crate) fn areas(&self, latitude: f64, longitude: f64) -> Vec<AreaName> {
        self.ctx
            .geofences
            .match_areas(Location::new(latitude, longitude))
    }

    pub(crate) fn webhook(&self, kind: WebhookType, message: serde_json::Value, latitude: f64, longitude: f64) {
        let areas = self.areas(latitude, longitude);
        self.ctx.webhooks.add_message(kind, message, areas);
    }
}

/// Whether `new` differs from `old` in any persisted field other than the
/// `updated` stamp.
pub(crate) trait Tracked: Clone + PartialEq {
    fn updated(&self) -> i64;
    fn set_updated(&mut self, updated: i64);

    fn has_changes(&self, old: &Self) -> bool {
        let mut candidate = self.clone();
        candidate.set_updated(old.updated());
        candidate != *old
    }
}

pub(crate) fn now_seconds() -> i64 {
    chrono::Utc::now().timestamp()
}

/// `fort.lat`/`fort.lon` style float compare.
pub(crate) fn float_changed(a: f64, b: f64) -> bool {
    (a - b).abs() > 1e-6
}
