// Power spot stations and their max battles.

use super::{float_changed, now_seconds, EntityStore, Tracked};
use golbat_proto::pogo::{GetStationedPokemonDetailsOutProto, StationProto};
use serde::Serialize;
use serde_json::json;
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StationRow {
    pub id: String,
    pub lat: f64,
    pub lon: f64,
    pub name: String,
    pub cell_id: Option<i64>,
    pub start_time: i64,
    pub end_time: i64,
    pub cooldown_complete: i64,
    pub is_battle_available: bool,
    pub is_inactive: bool,
    pub updated: i64,
    pub battle_level: Option<i32>,
    pub battle_start: Option<i64>,
    pub battle_end: Option<i64>,
    pub battle_pokemon_id: Option<i32>,
    pub battle_pokemon_form: Option<i32>,
    pub battle_pokemon_costume: Option<i32>,
    pub battle_pokemon_gender: Option<i32>,
    pub battle_pokemon_alignment: Option<i32>,
    pub battle_pokemon_move_1: Option<i32>,
    pub battle_pokemon_move_2: Option<i32>,
    pub total_stationed_pokemon: Option<i32>,
    /// JSON encoded list of stationed pokemon.
    pub stationed_pokemon: Option<String>,
}

impl Tracked for StationRow {
    fn updated(&self) -> i64 {
        self.updated
    }

    fn set_updated(&mut self, updated: i64) {
        self.updated = updated;
    }
}

impl StationRow {
    fn reset_stationed_pokemon(&mut self) {
        self.total_stationed_pokemon = None;
        self.stationed_pokemon = None;
    }
}

impl EntityStore {
    async fn modify_station(
        &self,
        id: &str,
        f: impl FnOnce(&mut StationRow, bool) -> bool,
    ) -> Option<StationRow> {
        let _guard = self.locks.lock_str(id).await;
        let old = self.stations.get(&id.to_string());
        let mut row = old.clone().unwrap_or_else(|| StationRow {
            id: id.to_string(),
            ..Default::default()
        });
        if !f(&mut row, old.is_none()) {
            return None;
        }
        if let Some(old) = &old {
            if !row.has_changes(old) {
                return None;
            }
        }
        row.updated = now_seconds();
        self.stations.insert(row.id.clone(), row.clone());
        self.queues
            .station
            .enqueue(row.clone(), old.is_none(), Duration::ZERO);
        Some(row)
    }

    /// Station seen in a map cell. A new battle window discards the previous
    /// stationed pokemon list.
    pub async fn update_station_from_map(&self, station: &StationProto, cell_id: u64) -> Option<StationRow> {
        let now = now_seconds();
        self.modify_station(&station.id, |row, _| {
            if float_changed(row.lat, station.lat) || float_changed(row.lon, station.lng) {
                row.lat = station.lat;
                row.lon = station.lng;
            }
            row.name = station.name.clone();
            row.cell_id = Some(cell_id as i64);
            row.start_time = station.start_time_ms / 1000;
            row.end_time = station.end_time_ms / 1000;
            row.cooldown_complete = station.cooldown_complete_ms / 1000;
            row.is_inactive = station.is_inactive;

            match &station.battle_details {
                Some(battle) => {
                    let start = battle.battle_window_start_ms / 1000;
                    let end = battle.battle_window_end_ms / 1000;
                    if row.battle_start != Some(start) {
                        row.reset_stationed_pokemon();
                    }
                    row.battle_level = Some(battle.battle_level);
                    row.battle_start = Some(start);
                    row.battle_end = Some(end);
                    row.is_battle_available = start <= now && now < end;
                    let pokemon = battle.pokemon.as_ref();
                    let display = pokemon.and_then(|p| p.pokemon_display.as_ref());
                    row.battle_pokemon_id = pokemon.map(|p| p.pokemon_id);
                    row.battle_pokemon_move_1 = pokemon.map(|p| p.move1);
                    row.battle_pokemon_move_2 = pokemon.map(|p| p.move2);
                    row.battle_pokemon_form = display.map(|d| d.form);
                    row.battle_pokemon_costume = display.map(|d| d.costume);
                    row.battle_pokemon_gender = display.map(|d| d.gender);
                    row.battle_pokemon_alignment = display.map(|d| d.alignment);
                }
                None => {
                    row.is_battle_available = false;
                }
            }
            true
        })
        .await
    }

    pub async fn update_station_details(
        &self,
        station_id: &str,
        details: &GetStationedPokemonDetailsOutProto,
    ) -> String {
        let stationed: Vec<_> = details
            .stationed_pokemons
            .iter()
            .map(|p| {
                let display = p.pokemon_display.as_ref();
                json!({
                    "pokemon_id": p.pokemon_id,
                    "form": display.map(|d| d.form).unwrap_or(0),
                    "costume": display.map(|d| d.costume).unwrap_or(0),
                    "gender": display.map(|d| d.gender).unwrap_or(0),
                    "shiny": display.map(|d| d.shiny).unwrap_or(false),
                })
            })
            .collect();

        let updated = self
            .modify_station(station_id, |row, is_new| {
                if is_new {
                    return false;
                }
                row.total_stationed_pokemon = Some(details.total_num_stationed_pokemon);
                row.stationed_pokemon = Some(serde_json::Value::from(stationed).to_string());
                true
            })
            .await;
        match updated {
            Some(_) => format!("{} {} stationed", station_id, details.total_num_stationed_pokemon),
            None if self.station(station_id).is_none() => format!("{} station not found", station_id),
            None => format!("{} unchanged", station_id),
        }
    }
}
