// Prometheus-backed collector
//
// Records through the `metrics` facade; the exporter recorder installed by
// `install_prometheus_recorder` owns the registry and renders /metrics.

use anyhow::{Context, Result};
use golbat_common::AreaName;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::{DecodeKind, StatsCollector};

const LATENCY_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0,
];

/// Install the global Prometheus recorder and return the render handle.
/// An empty `buckets` slice selects the default latency buckets.
pub fn install_prometheus_recorder(buckets: &[f64]) -> Result<PrometheusHandle> {
    let buckets = if buckets.is_empty() {
        LATENCY_BUCKETS
    } else {
        buckets
    };
    PrometheusBuilder::new()
        .set_buckets(buckets)
        .context("Invalid histogram buckets")?
        .install_recorder()
        .context("Failed to install Prometheus recorder")
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PrometheusStatsCollector;

impl PrometheusStatsCollector {
    pub fn new() -> Self {
        Self
    }
}

impl StatsCollector for PrometheusStatsCollector {
    fn inc_raw_requests(&self, status: &str, message: &str) {
        counter!("golbat_raw_requests", 1, "status" => status.to_string(), "message" => message.to_string());
    }

    fn inc_decode_methods(&self, status: &str, message: &str, method: &str) {
        counter!(
            "golbat_decode_methods", 1,
            "status" => status.to_string(),
            "message" => message.to_string(),
            "method" => method.to_string()
        );
    }

    fn inc_decode(&self, kind: DecodeKind, status: &str, message: &str) {
        let status = status.to_string();
        let message = message.to_string();
        match kind {
            DecodeKind::FortDetails => {
                counter!("golbat_decode_fort_details", 1, "status" => status, "message" => message)
            }
            DecodeKind::GetMapForts => {
                counter!("golbat_decode_get_map_forts", 1, "status" => status, "message" => message)
            }
            DecodeKind::GymGetInfo => {
                counter!("golbat_decode_get_gym_info", 1, "status" => status, "message" => message)
            }
            DecodeKind::Encounter => {
                counter!("golbat_decode_encounter", 1, "status" => status, "message" => message)
            }
            DecodeKind::DiskEncounter => {
                counter!("golbat_decode_disk_encounter", 1, "status" => status, "message" => message)
            }
            DecodeKind::Quest => {
                counter!("golbat_decode_quest", 1, "status" => status, "message" => message)
            }
            DecodeKind::SocialAction => {
                counter!("golbat_decode_social_action_with_request", 1, "status" => status, "message" => message)
            }
            DecodeKind::Gmo => {
                counter!("golbat_decode_gmo", 1, "status" => status, "message" => message)
            }
            DecodeKind::StartIncident => {
                counter!("golbat_decode_start_incident", 1, "status" => status, "message" => message)
            }
            DecodeKind::OpenInvasion => {
                counter!("golbat_decode_open_invasion", 1, "status" => status, "message" => message)
            }
            DecodeKind::Routes => {
                counter!("golbat_decode_routes", 1, "status" => status, "message" => message)
            }
            DecodeKind::Contest => {
                counter!("golbat_decode_contest", 1, "status" => status, "message" => message)
            }
            DecodeKind::StationDetails => {
                counter!("golbat_decode_station_details", 1, "status" => status, "message" => message)
            }
            DecodeKind::Tappable => {
                counter!("golbat_decode_tappable", 1, "status" => status, "message" => message)
            }
            DecodeKind::EventRsvp => {
                counter!("golbat_decode_event_rsvp", 1, "status" => status, "message" => message)
            }
        }
    }

    fn add_decode_gmo_type(&self, kind: &str, value: f64) {
        counter!("golbat_decode_gmo_type", value as u64, "type" => kind.to_string());
    }

    fn inc_pokemon_count_new(&self, areas: &[AreaName]) {
        for area in areas {
            counter!("golbat_pokemon_count_new", 1, "area" => area.to_string());
        }
    }

    fn inc_pokemon_count_iv(&self, areas: &[AreaName]) {
        for area in areas {
            counter!("golbat_pokemon_count_iv", 1, "area" => area.to_string());
        }
    }

    fn inc_pokemon_count_hundo(&self, areas: &[AreaName]) {
        for area in areas {
            counter!("golbat_pokemon_count_hundo", 1, "area" => area.to_string());
        }
    }

    fn inc_pokemon_count_nundo(&self, areas: &[AreaName]) {
        for area in areas {
            counter!("golbat_pokemon_count_nundo", 1, "area" => area.to_string());
        }
    }

    fn update_raid_count(&self, areas: &[AreaName], raid_level: i64) {
        for area in areas {
            counter!(
                "golbat_raid_count", 1,
                "area" => area.to_string(),
                "level" => raid_level.to_string()
            );
        }
    }

    fn update_fort_count(&self, areas: &[AreaName], fort_type: &str, change_type: &str) {
        for area in areas {
            counter!(
                "golbat_fort_change", 1,
                "area" => area.to_string(),
                "type" => fort_type.to_string(),
                "change" => change_type.to_string()
            );
        }
    }

    fn update_incident_count(&self, areas: &[AreaName]) {
        for area in areas {
            counter!("golbat_incident_count", 1, "area" => area.to_string());
        }
    }

    fn inc_write_behind_squashed(&self, queue: &str) {
        counter!("golbat_write_behind_squashed", 1, "queue" => queue.to_string());
    }

    fn set_write_behind_queue_depth(&self, queue: &str, depth: f64) {
        gauge!("golbat_write_behind_queue_depth", depth, "queue" => queue.to_string());
    }

    fn inc_write_behind_writes(&self, queue: &str, count: u64) {
        counter!("golbat_write_behind_writes", count, "queue" => queue.to_string());
    }

    fn inc_write_behind_errors(&self, queue: &str) {
        counter!("golbat_write_behind_errors", 1, "queue" => queue.to_string());
    }

    fn inc_write_behind_batches(&self, queue: &str) {
        counter!("golbat_write_behind_batches", 1, "queue" => queue.to_string());
    }

    fn observe_write_behind_batch_size(&self, queue: &str, size: f64) {
        histogram!("golbat_write_behind_batch_size", size, "queue" => queue.to_string());
    }

    fn observe_write_behind_batch_time(&self, queue: &str, seconds: f64) {
        histogram!("golbat_write_behind_batch_time_seconds", seconds, "queue" => queue.to_string());
    }

    fn observe_write_behind_latency(&self, queue: &str, seconds: f64) {
        histogram!("golbat_write_behind_latency_seconds", seconds, "queue" => queue.to_string());
    }
}
