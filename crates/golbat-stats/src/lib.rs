//! Metric collection for the ingest pipeline.
//!
//! Every component receives an `Arc<dyn StatsCollector>` at construction.
//! [`PrometheusStatsCollector`] records through the `metrics` facade and is
//! rendered by the exporter installed with [`install_prometheus_recorder`];
//! [`NoopStatsCollector`] discards everything.

use golbat_common::AreaName;
use std::fmt;
use std::sync::Arc;

mod noop;
mod prometheus;

pub use noop::NoopStatsCollector;
pub use prometheus::{install_prometheus_recorder, PrometheusStatsCollector};

/// Per-handler decode counters, one metric family each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecodeKind {
    FortDetails,
    GetMapForts,
    GymGetInfo,
    Encounter,
    DiskEncounter,
    Quest,
    SocialAction,
    Gmo,
    StartIncident,
    OpenInvasion,
    Routes,
    Contest,
    StationDetails,
    Tappable,
    EventRsvp,
}

impl DecodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecodeKind::FortDetails => "fort_details",
            DecodeKind::GetMapForts => "get_map_forts",
            DecodeKind::GymGetInfo => "gym_get_info",
            DecodeKind::Encounter => "encounter",
            DecodeKind::DiskEncounter => "disk_encounter",
            DecodeKind::Quest => "quest",
            DecodeKind::SocialAction => "social_action",
            DecodeKind::Gmo => "gmo",
            DecodeKind::StartIncident => "start_incident",
            DecodeKind::OpenInvasion => "open_invasion",
            DecodeKind::Routes => "routes",
            DecodeKind::Contest => "contest",
            DecodeKind::StationDetails => "station_details",
            DecodeKind::Tappable => "tappable",
            DecodeKind::EventRsvp => "event_rsvp",
        }
    }
}

impl fmt::Display for DecodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sink for pipeline metrics. All methods default to doing nothing so test
/// doubles only override what they observe.
pub trait StatsCollector: Send + Sync {
    fn inc_raw_requests(&self, _status: &str, _message: &str) {}
    fn inc_decode_methods(&self, _status: &str, _message: &str, _method: &str) {}
    fn inc_decode(&self, _kind: DecodeKind, _status: &str, _message: &str) {}
    fn add_decode_gmo_type(&self, _kind: &str, _value: f64) {}

    fn inc_pokemon_count_new(&self, _areas: &[AreaName]) {}
    fn inc_pokemon_count_iv(&self, _areas: &[AreaName]) {}
    fn inc_pokemon_count_hundo(&self, _areas: &[AreaName]) {}
    fn inc_pokemon_count_nundo(&self, _areas: &[AreaName]) {}
    fn update_raid_count(&self, _areas: &[AreaName], _raid_level: i64) {}
    fn update_fort_count(&self, _areas: &[AreaName], _fort_type: &str, _change_type: &str) {}
    fn update_incident_count(&self, _areas: &[AreaName]) {}

    fn inc_write_behind_squashed(&self, _queue: &str) {}
    fn set_write_behind_queue_depth(&self, _queue: &str, _depth: f64) {}
    fn inc_write_behind_writes(&self, _queue: &str, _count: u64) {}
    fn inc_write_behind_errors(&self, _queue: &str) {}
    fn inc_write_behind_batches(&self, _queue: &str) {}
    fn observe_write_behind_batch_size(&self, _queue: &str, _size: f64) {}
    fn observe_write_behind_batch_time(&self, _queue: &str, _seconds: f64) {}
    fn observe_write_behind_latency(&self, _queue: &str, _seconds: f64) {}
}

pub type SharedStats = Arc<dyn StatsCollector>;

/// Pick the collector for the current settings.
pub fn stats_collector(prometheus_enabled: bool) -> SharedStats {
    if prometheus_enabled {
        tracing::info!("Prometheus init");
        Arc::new(PrometheusStatsCollector::new())
    } else {
        Arc::new(NoopStatsCollector)
    }
}
