use super::{now_seconds, EntityStore};
use golbat_proto::pogo::WildPokemonProto;
use serde::Serialize;
use std::time::Duration;

/// A spawnpoint is re-written at most this often when nothing changed.
const LAST_SEEN_REFRESH: i64 = 60 * 60;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SpawnpointRow {
    pub id: i64,
    pub lat: f64,
    pub lon: f64,
    pub updated: i64,
    pub last_seen: i64,
    /// Second of the hour at which spawns here disappear.
    pub despawn_sec: Option<i32>,
}

impl EntityStore {
    /// Record a spawnpoint from a wild sighting. The map update is atomic, so
    /// no striped lock is taken.
    pub(crate) fn update_spawnpoint_from_wild(
        &self,
        spawn_id: i64,
        wild: &WildPokemonProto,
        timestamp_ms: i64,
    ) {
        let tth = wild.time_till_hidden_ms;
        let despawn_sec = (0..=90_000)
            .contains(&tth)
            .then(|| (((timestamp_ms + i64::from(tth)) / 1000).rem_euclid(3600)) as i32);
        let now = now_seconds();

        let write = self.spawnpoints.update(
            spawn_id,
            || SpawnpointRow {
                id: spawn_id,
                ..Default::default()
            },
            |row| {
                let is_new = row.updated == 0;
                let changed = is_new
                    || (despawn_sec.is_some() && row.despawn_sec != despawn_sec)
                    || now - row.last_seen >= LAST_SEEN_REFRESH;
                if !changed {
                    return None;
                }
                row.lat = wild.latitude;
                row.lon = wild.longitude;
                if despawn_sec.is_some() {
                    row.despawn_sec = despawn_sec;
                }
                row.last_seen = now;
                row.updated = now;
                Some((row.clone(), is_new))
            },
        );

        if let Some((row, is_new)) = write {
            self.queues.spawnpoint.enqueue(row, is_new, Duration::ZERO);
        }
    }
}
