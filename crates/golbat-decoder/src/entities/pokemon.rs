// Pokemon sightings and encounters.

use super::{float_changed, now_seconds, EntityStore, Tracked};
use golbat_common::S2Cell;
use golbat_proto::pogo::{
    DiskEncounterOutProto, EncounterOutProto, MapPokemonProto, NearbyPokemonProto,
    PokemonDisplayProto, PokemonProto, ProcessTappableProto, TappableEncounterProto,
    WildPokemonProto,
};
use golbat_webhooks::WebhookType;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, warn};

/// Despawn timers outside this window are not reported by the server.
const MAX_TIME_TILL_HIDDEN_MS: i32 = 90_000;
/// Expiry assumed for a first sighting with an unknown despawn.
const UNKNOWN_EXPIRY_FIRST: i64 = 20 * 60;
/// Extension applied when an unknown expiry has lapsed but the pokemon is still there.
const UNKNOWN_EXPIRY_EXTEND: i64 = 10 * 60;
/// Lured tappable encounters have no despawn information.
const TAPPABLE_LURE_EXPIRY: i64 = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeenType {
    NearbyCell,
    NearbyStop,
    Wild,
    Encounter,
    LureWild,
    LureEncounter,
    TappableEncounter,
    TappableLureEncounter,
}

impl SeenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeenType::NearbyCell => "nearby_cell",
            SeenType::NearbyStop => "nearby_stop",
            SeenType::Wild => "wild",
            SeenType::Encounter => "encounter",
            SeenType::LureWild => "lure_wild",
            SeenType::LureEncounter => "lure_encounter",
            SeenType::TappableEncounter => "tappable_encounter",
            SeenType::TappableLureEncounter => "tappable_lure_encounter",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PokemonRow {
    pub id: u64,
    pub pokestop_id: Option<String>,
    pub spawn_id: Option<i64>,
    pub lat: f64,
    pub lon: f64,
    pub weight: Option<f64>,
    pub size: Option<i32>,
    pub height: Option<f64>,
    pub expire_timestamp: Option<i64>,
    pub updated: i64,
    pub pokemon_id: i32,
    pub move_1: Option<i32>,
    pub move_2: Option<i32>,
    pub gender: Option<i32>,
    pub cp: Option<i32>,
    pub atk_iv: Option<i32>,
    pub def_iv: Option<i32>,
    pub sta_iv: Option<i32>,
    pub iv: Option<f64>,
    pub form: Option<i32>,
    pub level: Option<i32>,
    pub weather: Option<i32>,
    pub costume: Option<i32>,
    pub first_seen_timestamp: i64,
    pub changed: i64,
    pub cell_id: Option<i64>,
    pub expire_timestamp_verified: bool,
    pub display_pokemon_id: Option<i32>,
    pub seen_type: Option<String>,
    pub shiny: Option<bool>,
    pub username: Option<String>,
}

impl PokemonRow {
    fn new(id: u64, first_seen: i64) -> Self {
        Self {
            id,
            first_seen_timestamp: first_seen,
            ..Default::default()
        }
    }

    pub fn seen_type_is(&self, seen: SeenType) -> bool {
        self.seen_type.as_deref() == Some(seen.as_str())
    }

    fn set_seen_type(&mut self, seen: SeenType) {
        self.seen_type = Some(seen.as_str().to_string());
    }

    pub fn has_iv(&self) -> bool {
        self.atk_iv.is_some() && self.def_iv.is_some() && self.sta_iv.is_some()
    }

    fn set_display(&mut self, pokemon_id: i32, display: Option<&PokemonDisplayProto>) {
        self.pokemon_id = pokemon_id;
        if let Some(display) = display {
            self.form = Some(display.form);
            self.costume = Some(display.costume);
            self.gender = Some(display.gender);
            self.weather = Some(display.weather_boosted_condition);
            if display.display_id != 0 {
                self.display_pokemon_id = Some(display.display_id as i32);
            }
        }
    }

    /// Stats that are only valid for the exact species and weather they were
    /// read under.
    fn clear_encounter_details(&mut self) {
        self.cp = None;
        self.atk_iv = None;
        self.def_iv = None;
        self.sta_iv = None;
        self.iv = None;
        self.level = None;
        self.move_1 = None;
        self.move_2 = None;
        if self.seen_type_is(SeenType::Encounter) {
            self.set_seen_type(SeenType::Wild);
        } else if self.seen_type_is(SeenType::LureEncounter) {
            self.set_seen_type(SeenType::LureWild);
        }
    }

    fn add_encounter_details(&mut self, proto: &PokemonProto, username: &str) {
        self.username = Some(username.to_string());
        self.shiny = proto.pokemon_display.as_ref().map(|d| d.shiny);
        self.cp = Some(proto.cp);
        self.move_1 = Some(proto.move1);
        self.move_2 = Some(proto.move2);
        self.height = Some(f64::from(proto.height_m));
        self.weight = Some(f64::from(proto.weight_kg));
        self.size = Some(proto.size);
        self.level = Some(level_from_cp_multiplier(proto.cp_multiplier));

        let (a, d, s) = (
            proto.individual_attack,
            proto.individual_defense,
            proto.individual_stamina,
        );
        self.atk_iv = Some(a);
        self.def_iv = Some(d);
        self.sta_iv = Some(s);
        self.iv = Some(f64::from(a + d + s) / 0.45);
    }

    fn set_unknown_timestamp(&mut self, now: i64) {
        match self.expire_timestamp {
            None => self.expire_timestamp = Some(now + UNKNOWN_EXPIRY_FIRST),
            Some(expiry) if expiry < now => self.expire_timestamp = Some(now + UNKNOWN_EXPIRY_EXTEND),
            Some(_) => {}
        }
    }

    fn webhook_kind(&self) -> WebhookType {
        if self.has_iv() {
            WebhookType::PokemonIV
        } else {
            WebhookType::PokemonNoIV
        }
    }

    fn webhook(&self) -> serde_json::Value {
        json!({
            "spawnpoint_id": self
                .spawn_id
                .map(|id| format!("{:x}", id))
                .unwrap_or_else(|| "None".to_string()),
            "pokestop_id": self.pokestop_id.clone().unwrap_or_else(|| "None".to_string()),
            "encounter_id": self.id.to_string(),
            "pokemon_id": self.pokemon_id,
            "latitude": self.lat,
            "longitude": self.lon,
            "disappear_time": self.expire_timestamp.unwrap_or(0),
            "disappear_time_verified": self.expire_timestamp_verified,
            "first_seen": self.first_seen_timestamp,
            "last_modified_time": self.updated,
            "gender": self.gender,
            "cp": self.cp,
            "form": self.form,
            "costume": self.costume,
            "individual_attack": self.atk_iv,
            "individual_defense": self.def_iv,
            "individual_stamina": self.sta_iv,
            "pokemon_level": self.level,
            "move_1": self.move_1,
            "move_2": self.move_2,
            "weight": self.weight,
            "size": self.size,
            "height": self.height,
            "weather": self.weather,
            "shiny": self.shiny,
            "username": self.username,
            "display_pokemon_id": self.display_pokemon_id,
            "seen_type": self.seen_type,
        })
    }
}

impl Tracked for PokemonRow {
    fn updated(&self) -> i64 {
        self.updated
    }

    fn set_updated(&mut self, updated: i64) {
        self.updated = updated;
    }

    fn has_changes(&self, old: &Self) -> bool {
        self.pokemon_id != old.pokemon_id
            || self.form != old.form
            || self.costume != old.costume
            || self.gender != old.gender
            || self.cp != old.cp
            || self.atk_iv != old.atk_iv
            || self.def_iv != old.def_iv
            || self.sta_iv != old.sta_iv
            || self.move_1 != old.move_1
            || self.move_2 != old.move_2
            || self.weather != old.weather
            || float_changed(self.lat, old.lat)
            || float_changed(self.lon, old.lon)
            || self.expire_timestamp != old.expire_timestamp
            || self.spawn_id != old.spawn_id
            || self.pokestop_id != old.pokestop_id
            || self.seen_type != old.seen_type
    }
}

/// Trainer level from the server's CP multiplier.
pub fn level_from_cp_multiplier(cpm: f32) -> i32 {
    let cpm = f64::from(cpm);
    let level = if cpm < 0.734 {
        (58.215688455154954 * cpm - 2.7012478057856497) * cpm + 1.3220677708486794
    } else if cpm < 0.795 {
        171.34093607855277 * cpm - 94.95626666368578
    } else {
        199.99995231630976 * cpm - 117.55996066890287
    };
    level as i32
}

pub(crate) fn parse_spawn_id(spawn_point_id: &str) -> Option<i64> {
    match i64::from_str_radix(spawn_point_id, 16) {
        Ok(id) => Some(id),
        Err(e) => {
            warn!("[POKEMON] Invalid spawnpoint id '{}': {}", spawn_point_id, e);
            None
        }
    }
}

impl EntityStore {
    /// Apply `f` to the cached sighting under the encounter lock and persist
    /// the result. `f` returns false to abandon the update.
    async fn modify_pokemon(
        &self,
        id: u64,
        timestamp_ms: i64,
        f: impl FnOnce(&mut PokemonRow, bool) -> bool,
    ) -> Option<PokemonRow> {
        let _guard = self.locks.lock(id).await;
        let old = self.pokemon.get(&id);
        let mut row = old
            .clone()
            .unwrap_or_else(|| PokemonRow::new(id, timestamp_ms / 1000));
        if !f(&mut row, old.is_none()) {
            return None;
        }
        self.save_pokemon(old.as_ref(), row)
    }

    fn save_pokemon(&self, old: Option<&PokemonRow>, mut row: PokemonRow) -> Option<PokemonRow> {
        if let Some(old) = old {
            if !row.has_changes(old) {
                return None;
            }
        }

        let now = now_seconds();
        row.updated = now;
        if old.map_or(true, |o| o.pokemon_id != row.pokemon_id || o.cp != row.cp) {
            row.changed = now;
        }
        self.pokemon.insert(row.id, row.clone());

        let areas = self.areas(row.lat, row.lon);
        let stats = &self.ctx.stats;
        if old.is_none() {
            stats.inc_pokemon_count_new(&areas);
        }
        if row.has_iv() && !old.is_some_and(PokemonRow::has_iv) {
            stats.inc_pokemon_count_iv(&areas);
            match (row.atk_iv, row.def_iv, row.sta_iv) {
                (Some(15), Some(15), Some(15)) => stats.inc_pokemon_count_hundo(&areas),
                (Some(0), Some(0), Some(0)) => stats.inc_pokemon_count_nundo(&areas),
                _ => {}
            }
        }

        if old.map_or(true, |o| {
            o.pokemon_id != row.pokemon_id || o.weather != row.weather || o.cp != row.cp
        }) {
            self.ctx
                .webhooks
                .add_message(row.webhook_kind(), row.webhook(), areas);
        }

        let delay = if row.has_iv() {
            std::time::Duration::ZERO
        } else {
            self.ctx.pokemon_write_delay
        };
        self.queues.pokemon.enqueue(row.clone(), old.is_none(), delay);
        Some(row)
    }

    /// Expiry from the server's despawn timer, or from the spawnpoint's
    /// known despawn second.
    fn set_expiry_from_wild(&self, row: &mut PokemonRow, wild: &WildPokemonProto, timestamp_ms: i64) {
        let tth = wild.time_till_hidden_ms;
        if (0..=MAX_TIME_TILL_HIDDEN_MS).contains(&tth) {
            row.expire_timestamp = Some((timestamp_ms + i64::from(tth)) / 1000);
            row.expire_timestamp_verified = true;
            return;
        }
        if row.expire_timestamp_verified && row.expire_timestamp.is_some() {
            return;
        }

        let despawn = row
            .spawn_id
            .and_then(|id| self.spawnpoints.get(&id))
            .and_then(|s| s.despawn_sec);
        match despawn {
            Some(despawn_sec) => {
                let now = timestamp_ms / 1000;
                let second_of_hour = now.rem_euclid(3600);
                let mut offset = i64::from(despawn_sec) - second_of_hour;
                if offset < 0 {
                    offset += 3600;
                }
                row.expire_timestamp = Some(now + offset);
                row.expire_timestamp_verified = true;
            }
            None => {
                row.expire_timestamp_verified = false;
                row.set_unknown_timestamp(timestamp_ms / 1000);
            }
        }
    }

    /// A wild sighting from a map cell.
    pub async fn update_pokemon_from_wild(
        &self,
        wild: &WildPokemonProto,
        cell_id: u64,
        timestamp_ms: i64,
        username: &str,
    ) -> Option<PokemonRow> {
        let Some(pokemon) = wild.pokemon.as_ref() else {
            return None;
        };
        let spawn_id = parse_spawn_id(&wild.spawn_point_id);
        if let Some(spawn_id) = spawn_id {
            self.update_spawnpoint_from_wild(spawn_id, wild, timestamp_ms);
        }
        self.ctx.encounters.record_wild(wild.encounter_id, timestamp_ms / 1000);

        self.modify_pokemon(wild.encounter_id, timestamp_ms, |row, is_new| {
            if !is_new
                && row.pokemon_id != pokemon.pokemon_id
                && row.has_iv()
            {
                row.clear_encounter_details();
            }
            if row.seen_type.is_none()
                || row.seen_type_is(SeenType::NearbyCell)
                || row.seen_type_is(SeenType::NearbyStop)
            {
                row.set_seen_type(SeenType::Wild);
            }
            row.lat = wild.latitude;
            row.lon = wild.longitude;
            row.spawn_id = spawn_id;
            row.pokestop_id = None;
            row.set_display(pokemon.pokemon_id, pokemon.pokemon_display.as_ref());
            self.set_expiry_from_wild(row, wild, timestamp_ms);
            row.username = Some(username.to_string());
            row.cell_id = Some(cell_id as i64);
            true
        })
        .await
    }

    /// A nearby sighting. With a known pokestop the pokemon is placed there,
    /// otherwise at the centre of its map cell. Repeated cell sightings move
    /// towards the midpoint of the cells it was reported in.
    pub async fn update_pokemon_from_nearby(
        &self,
        nearby: &NearbyPokemonProto,
        cell_id: u64,
        timestamp_ms: i64,
        username: &str,
    ) -> Option<PokemonRow> {
        let stop = (!nearby.fort_id.is_empty())
            .then(|| self.pokestop(&nearby.fort_id))
            .flatten();
        let cell = S2Cell::from_id(cell_id);
        if stop.is_none() && cell.is_none() {
            debug!("Nearby pokemon {} in invalid cell {}", nearby.encounter_id, cell_id);
            return None;
        }

        self.modify_pokemon(nearby.encounter_id, timestamp_ms, |row, is_new| {
            let upgradeable = is_new
                || row.seen_type.is_none()
                || row.seen_type_is(SeenType::NearbyCell)
                || (stop.is_some() && row.seen_type_is(SeenType::NearbyStop));
            if !upgradeable {
                return false;
            }

            match (&stop, &cell) {
                (Some(stop), _) => {
                    row.set_seen_type(SeenType::NearbyStop);
                    row.pokestop_id = Some(stop.id.clone());
                    row.lat = stop.lat;
                    row.lon = stop.lon;
                }
                (None, Some(cell)) => {
                    let center = cell.center;
                    if is_new || !row.seen_type_is(SeenType::NearbyCell) {
                        row.lat = center.latitude;
                        row.lon = center.longitude;
                    } else {
                        row.lat = (row.lat + center.latitude) / 2.0;
                        row.lon = (row.lon + center.longitude) / 2.0;
                    }
                    row.set_seen_type(SeenType::NearbyCell);
                }
                (None, None) => return false,
            }
            row.set_display(nearby.pokedex_number, nearby.pokemon_display.as_ref());
            row.username = Some(username.to_string());
            row.cell_id = Some(cell_id as i64);
            row.set_unknown_timestamp(timestamp_ms / 1000);
            true
        })
        .await
    }

    /// A lured pokemon sitting at a pokestop. Only ever creates; a lure
    /// sighting never overwrites better information.
    pub async fn update_pokemon_from_map(
        &self,
        map: &MapPokemonProto,
        cell_id: u64,
        timestamp_ms: i64,
        username: &str,
    ) -> Option<PokemonRow> {
        let stop = self.pokestop(&map.spawnpoint_id)?;

        self.modify_pokemon(map.encounter_id, timestamp_ms, |row, is_new| {
            if !is_new {
                return false;
            }
            row.pokestop_id = Some(stop.id.clone());
            row.lat = stop.lat;
            row.lon = stop.lon;
            row.set_seen_type(SeenType::LureWild);
            row.set_display(map.pokedex_type_id, map.pokemon_display.as_ref());
            row.username = Some(username.to_string());
            if map.expiration_time_ms > 0 {
                row.expire_timestamp = Some(map.expiration_time_ms / 1000);
                row.expire_timestamp_verified = true;
            } else {
                row.expire_timestamp_verified = false;
                row.set_unknown_timestamp(timestamp_ms / 1000);
            }
            row.cell_id = Some(cell_id as i64);
            true
        })
        .await
    }

    pub async fn update_pokemon_from_encounter(
        &self,
        encounter: &EncounterOutProto,
        timestamp_ms: i64,
        username: &str,
    ) -> String {
        let Some(wild) = encounter.pokemon.as_ref() else {
            return "Encounter without pokemon".to_string();
        };
        let Some(pokemon) = wild.pokemon.as_ref() else {
            return "Encounter without pokemon".to_string();
        };
        let spawn_id = parse_spawn_id(&wild.spawn_point_id);
        let seen_before = self.ctx.encounters.set_account_seen(wild.encounter_id, username);
        self.ctx
            .encounters
            .record_encounter(wild.encounter_id, timestamp_ms / 1000);

        self.modify_pokemon(wild.encounter_id, timestamp_ms, |row, _| {
            row.lat = wild.latitude;
            row.lon = wild.longitude;
            row.spawn_id = spawn_id;
            row.set_display(pokemon.pokemon_id, pokemon.pokemon_display.as_ref());
            self.set_expiry_from_wild(row, wild, timestamp_ms);
            if !row.seen_type_is(SeenType::TappableEncounter)
                && !row.seen_type_is(SeenType::TappableLureEncounter)
            {
                row.set_seen_type(SeenType::Encounter);
            }
            row.add_encounter_details(pokemon, username);
            true
        })
        .await;

        format!(
            "{} {} Pokemon {} CP{}{}",
            wild.encounter_id,
            username,
            pokemon.pokemon_id,
            pokemon.cp,
            if seen_before { " (seen)" } else { "" }
        )
    }

    pub async fn update_pokemon_from_disk_encounter(
        &self,
        encounter: &DiskEncounterOutProto,
        timestamp_ms: i64,
        username: &str,
    ) -> String {
        let Some(pokemon) = encounter.pokemon.as_ref() else {
            return "Disk encounter without pokemon".to_string();
        };
        let display_id = pokemon
            .pokemon_display
            .as_ref()
            .map(|d| d.display_id as u64)
            .unwrap_or_default();
        // Lure encounters identify the pokemon by display id.
        let id = if display_id != 0 { display_id } else { pokemon.id };

        let updated = self
            .modify_pokemon(id, timestamp_ms, |row, is_new| {
                if is_new {
                    return false;
                }
                row.set_display(pokemon.pokemon_id, pokemon.pokemon_display.as_ref());
                row.set_seen_type(SeenType::LureEncounter);
                row.add_encounter_details(pokemon, username);
                true
            })
            .await;

        match updated {
            Some(_) => format!("{} Disk Pokemon {} CP{}", id, pokemon.pokemon_id, pokemon.cp),
            None => format!("{} Disk encounter without previous GMO - Skipped", id),
        }
    }

    pub async fn update_pokemon_from_tappable(
        &self,
        request: &ProcessTappableProto,
        encounter: &TappableEncounterProto,
        timestamp_ms: i64,
        username: &str,
    ) -> String {
        let Some(pokemon) = encounter.pokemon.as_ref().and_then(|w| w.pokemon.as_ref()) else {
            return "Tappable encounter without pokemon".to_string();
        };
        let id = request.encounter_id;
        let spawn_id = (!request.spawnpoint_id.is_empty())
            .then(|| parse_spawn_id(&request.spawnpoint_id))
            .flatten();

        self.modify_pokemon(id, timestamp_ms, |row, _| {
            row.lat = request.location_hint_lat;
            row.lon = request.location_hint_lng;
            if spawn_id.is_some() {
                row.set_seen_type(SeenType::TappableEncounter);
                row.spawn_id = spawn_id;
                row.set_unknown_timestamp(timestamp_ms / 1000);
            } else if !request.fort_id.is_empty() {
                row.set_seen_type(SeenType::TappableLureEncounter);
                row.pokestop_id = Some(request.fort_id.clone());
                row.expire_timestamp = Some(timestamp_ms / 1000 + TAPPABLE_LURE_EXPIRY);
                row.expire_timestamp_verified = false;
            }
            if row.username.is_none() {
                row.username = Some(username.to_string());
            }
            row.set_display(pokemon.pokemon_id, pokemon.pokemon_display.as_ref());
            row.add_encounter_details(pokemon, username);
            true
        })
        .await;

        format!("{} Tappable Pokemon {} CP{}", id, pokemon.pokemon_id, pokemon.cp)
    }
}
