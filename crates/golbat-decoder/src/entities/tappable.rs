// Tappables: map objects that yield items or an encounter when tapped.

use super::pokemon::parse_spawn_id;
use super::{now_seconds, EntityStore, Tracked};
use golbat_proto::pogo::{ProcessTappableOutProto, ProcessTappableProto};
use serde::Serialize;
use std::time::Duration;

/// Tappables do not report a lifetime; assume this one.
const TAPPABLE_LIFETIME: i64 = 15 * 60;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TappableRow {
    pub id: u64,
    pub lat: f64,
    pub lon: f64,
    pub fort_id: Option<String>,
    pub spawn_id: Option<i64>,
    pub type_id: i32,
    pub pokemon_id: Option<i32>,
    pub item_id: Option<i32>,
    pub count: Option<i32>,
    pub expire_timestamp: i64,
    pub expire_timestamp_verified: bool,
    pub updated: i64,
}

impl Tracked for TappableRow {
    fn updated(&self) -> i64 {
        self.updated
    }

    fn set_updated(&mut self, updated: i64) {
        self.updated = updated;
    }
}

impl EntityStore {
    pub async fn update_tappable(
        &self,
        request: &ProcessTappableProto,
        response: &ProcessTappableOutProto,
        timestamp_ms: i64,
    ) -> String {
        let id = request.encounter_id;
        let _guard = self.locks.lock(id).await;
        let old = self.tappables.get(&id);

        let mut row = old.clone().unwrap_or_else(|| TappableRow {
            id,
            expire_timestamp: timestamp_ms / 1000 + TAPPABLE_LIFETIME,
            ..Default::default()
        });
        row.lat = request.location_hint_lat;
        row.lon = request.location_hint_lng;
        row.type_id = request.tappable_type_id;
        row.fort_id = (!request.fort_id.is_empty()).then(|| request.fort_id.clone());
        row.spawn_id = (!request.spawnpoint_id.is_empty())
            .then(|| parse_spawn_id(&request.spawnpoint_id))
            .flatten();
        row.pokemon_id = response
            .encounter
            .as_ref()
            .and_then(|e| e.pokemon.as_ref())
            .and_then(|w| w.pokemon.as_ref())
            .map(|p| p.pokemon_id);
        let reward = response.reward.first();
        row.item_id = reward.map(|r| r.item);
        row.count = reward.map(|r| r.count);

        let changed = old.as_ref().map_or(true, |old| row.has_changes(old));
        if changed {
            row.updated = now_seconds();
            self.tappables.insert(id, row.clone());
            self.queues
                .tappable
                .enqueue(row.clone(), old.is_none(), Duration::ZERO);
        }

        match (row.pokemon_id, row.item_id) {
            (Some(pokemon), _) => format!("{} tappable pokemon {}", id, pokemon),
            (None, Some(item)) => format!("{} tappable item {} x{}", id, item, row.count.unwrap_or(0)),
            (None, None) => format!("{} tappable", id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::testing::store;
    use golbat_proto::pogo::LootItemProto;

    #[tokio::test]
    async fn item_tappable_is_recorded() {
        let (store, _) = store();
        let request = ProcessTappableProto {
            encounter_id: 9,
            location_hint_lat: 1.0,
            location_hint_lng: 2.0,
            spawnpoint_id: "ab".into(),
            tappable_type_id: 2,
            ..Default::default()
        };
        let response = ProcessTappableOutProto {
            status: 1,
            reward: vec![LootItemProto { item: 701, count: 3 }],
            encounter: None,
        };
        let message = store.update_tappable(&request, &response, 1_000_000).await;
        assert_eq!(message, "9 tappable item 701 x3");

        let row = store.tappable(9).unwrap();
        assert_eq!(row.spawn_id, Some(0xab));
        assert_eq!(row.expire_timestamp, 1000 + TAPPABLE_LIFETIME);
        assert!(!row.expire_timestamp_verified);
        assert_eq!(store.queues().tappable.size(), 1);
    }
}
