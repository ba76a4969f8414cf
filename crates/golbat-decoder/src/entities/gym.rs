// Gyms, their raids, defenders and RSVP counts.

use super::pokestop::fort_update_webhook;
use super::{float_changed, now_seconds, EntityStore, Tracked};
use golbat_proto::pogo::{
    FortDetailsOutProto, GetEventRsvpsOutProto, GymGetInfoOutProto, MapFortProto, PokemonFortProto,
    RsvpCountDetailsProto,
};
use golbat_webhooks::WebhookType;
use serde::Serialize;
use serde_json::json;
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GymRow {
    pub id: String,
    pub lat: f64,
    pub lon: f64,
    pub name: Option<String>,
    pub url: Option<String>,
    pub description: Option<String>,
    pub last_modified_timestamp: Option<i64>,
    pub raid_end_timestamp: Option<i64>,
    pub raid_spawn_timestamp: Option<i64>,
    pub raid_battle_timestamp: Option<i64>,
    pub updated: i64,
    pub raid_pokemon_id: Option<i32>,
    pub guarding_pokemon_id: Option<i32>,
    pub available_slots: Option<i32>,
    pub team_id: Option<i32>,
    pub raid_level: Option<i32>,
    pub enabled: Option<bool>,
    pub ex_raid_eligible: Option<bool>,
    pub raid_pokemon_move_1: Option<i32>,
    pub raid_pokemon_move_2: Option<i32>,
    pub raid_pokemon_form: Option<i32>,
    pub raid_pokemon_costume: Option<i32>,
    pub raid_pokemon_cp: Option<i32>,
    pub raid_pokemon_gender: Option<i32>,
    pub raid_pokemon_alignment: Option<i32>,
    pub raid_is_exclusive: Option<bool>,
    pub raid_seed: Option<i64>,
    pub cell_id: Option<i64>,
    pub deleted: bool,
    pub total_cp: Option<i32>,
    pub first_seen_timestamp: i64,
    pub partner_id: Option<String>,
    pub power_up_level: Option<i32>,
    pub ar_scan_eligible: Option<bool>,
    /// JSON encoded defender list from the last gym info.
    pub defenders: Option<String>,
    /// JSON encoded RSVP timeslots for the current raid.
    pub rsvps: Option<String>,
}

impl Tracked for GymRow {
    fn updated(&self) -> i64 {
        self.updated
    }

    fn set_updated(&mut self, updated: i64) {
        self.updated = updated;
    }
}

impl GymRow {
    fn fort_webhook(&self) -> serde_json::Value {
        json!({
            "type": "gym",
            "name": self.name.clone().unwrap_or_default(),
            "description": self.description.clone().unwrap_or_default(),
            "image_url": self.url.clone().unwrap_or_default(),
            "latitude": self.lat,
            "longitude": self.lon,
        })
    }

    fn details_webhook(&self) -> serde_json::Value {
        json!({
            "id": self.id,
            "name": self.name.clone().unwrap_or_else(|| "Unknown".to_string()),
            "url": self.url.clone().unwrap_or_default(),
            "latitude": self.lat,
            "longitude": self.lon,
            "team": self.team_id.unwrap_or(0),
            "guard_pokemon_id": self.guarding_pokemon_id.unwrap_or(0),
            "slots_available": self.available_slots.unwrap_or(0),
            "ex_raid_eligible": self.ex_raid_eligible.unwrap_or(false),
            "in_battle": false,
            "partner_id": self.partner_id,
            "power_up_level": self.power_up_level.unwrap_or(0),
            "ar_scan_eligible": self.ar_scan_eligible.unwrap_or(false),
            "defenders": self.parsed(&self.defenders),
        })
    }

    fn raid_webhook(&self) -> serde_json::Value {
        json!({
            "gym_id": self.id,
            "gym_name": self.name.clone().unwrap_or_else(|| "Unknown".to_string()),
            "gym_url": self.url.clone().unwrap_or_default(),
            "latitude": self.lat,
            "longitude": self.lon,
            "team_id": self.team_id.unwrap_or(0),
            "spawn": self.raid_spawn_timestamp.unwrap_or(0),
            "start": self.raid_battle_timestamp.unwrap_or(0),
            "end": self.raid_end_timestamp.unwrap_or(0),
            "level": self.raid_level.unwrap_or(0),
            "pokemon_id": self.raid_pokemon_id.unwrap_or(0),
            "cp": self.raid_pokemon_cp.unwrap_or(0),
            "gender": self.raid_pokemon_gender.unwrap_or(0),
            "form": self.raid_pokemon_form.unwrap_or(0),
            "alignment": self.raid_pokemon_alignment.unwrap_or(0),
            "costume": self.raid_pokemon_costume.unwrap_or(0),
            "move_1": self.raid_pokemon_move_1.unwrap_or(0),
            "move_2": self.raid_pokemon_move_2.unwrap_or(0),
            "ex_raid_eligible": self.ex_raid_eligible.unwrap_or(false),
            "is_exclusive": self.raid_is_exclusive.unwrap_or(false),
            "partner_id": self.partner_id,
            "power_up_level": self.power_up_level.unwrap_or(0),
            "ar_scan_eligible": self.ar_scan_eligible.unwrap_or(false),
            "rsvps": self.parsed(&self.rsvps),
        })
    }

    fn parsed(&self, field: &Option<String>) -> serde_json::Value {
        field
            .as_deref()
            .and_then(|s| serde_json::from_str(s).ok())
            .unwrap_or(serde_json::Value::Null)
    }

    fn raid_changed(&self, old: Option<&GymRow>) -> bool {
        match old {
            None => self.raid_battle_timestamp.is_some(),
            Some(old) => {
                old.raid_battle_timestamp != self.raid_battle_timestamp
                    || old.raid_pokemon_id != self.raid_pokemon_id
                    || old.raid_pokemon_form != self.raid_pokemon_form
                    || old.rsvps != self.rsvps
            }
        }
    }

    fn details_changed(&self, old: Option<&GymRow>) -> bool {
        match old {
            None => true,
            Some(old) => {
                old.team_id != self.team_id
                    || old.available_slots != self.available_slots
                    || old.name != self.name
                    || old.url != self.url
                    || old.defenders != self.defenders
            }
        }
    }
}

impl EntityStore {
    async fn modify_gym(&self, id: &str, f: impl FnOnce(&mut GymRow, bool) -> bool) -> Option<GymRow> {
        let _guard = self.locks.lock_str(id).await;
        let old = self.gyms.get(&id.to_string());
        let mut row = old.clone().unwrap_or_else(|| GymRow {
            id: id.to_string(),
            first_seen_timestamp: now_seconds(),
            ..Default::default()
        });
        if !f(&mut row, old.is_none()) {
            return None;
        }
        self.save_gym(old.as_ref(), row)
    }

    fn save_gym(&self, old: Option<&GymRow>, mut row: GymRow) -> Option<GymRow> {
        if let Some(old) = old {
            if !row.has_changes(old) {
                return None;
            }
        }
        let now = now_seconds();
        row.updated = now;
        self.gyms.insert(row.id.clone(), row.clone());
        let areas = self.areas(row.lat, row.lon);

        match old {
            None => {
                self.ctx.stats.update_fort_count(&areas, "gym", "new");
                self.webhook(
                    WebhookType::FortUpdate,
                    fort_update_webhook("new", None, Some(row.fort_webhook())),
                    row.lat,
                    row.lon,
                );
            }
            Some(old) if row.deleted && !old.deleted => {
                self.ctx.stats.update_fort_count(&areas, "gym", "removal");
                self.webhook(
                    WebhookType::FortUpdate,
                    fort_update_webhook("removal", Some(old.fort_webhook()), None),
                    old.lat,
                    old.lon,
                );
            }
            Some(old) => {
                if old.name != row.name
                    || old.url != row.url
                    || old.description != row.description
                    || float_changed(old.lat, row.lat)
                    || float_changed(old.lon, row.lon)
                {
                    self.webhook(
                        WebhookType::FortUpdate,
                        fort_update_webhook("edit", Some(old.fort_webhook()), Some(row.fort_webhook())),
                        row.lat,
                        row.lon,
                    );
                }
            }
        }

        if row.details_changed(old) && !row.deleted {
            self.webhook(WebhookType::GymDetails, row.details_webhook(), row.lat, row.lon);
        }

        if row.raid_changed(old) && row.raid_end_timestamp.unwrap_or(0) > now {
            if old.map_or(true, |o| o.raid_battle_timestamp != row.raid_battle_timestamp) {
                self.ctx
                    .stats
                    .update_raid_count(&areas, i64::from(row.raid_level.unwrap_or(0)));
            }
            self.webhook(WebhookType::Raid, row.raid_webhook(), row.lat, row.lon);
        }

        self.queues.gym.enqueue(row.clone(), old.is_none(), Duration::ZERO);
        Some(row)
    }

    /// A gym fort from a map cell, raid included.
    pub async fn update_gym_from_fort(&self, fort: &PokemonFortProto, cell_id: u64) -> Option<GymRow> {
        self.modify_gym(&fort.fort_id, |row, _| {
            row.lat = fort.latitude;
            row.lon = fort.longitude;
            row.enabled = Some(fort.enabled);
            row.deleted = false;
            row.last_modified_timestamp = Some(fort.last_modified_ms / 1000);
            row.guarding_pokemon_id = Some(fort.guard_pokemon_id);
            row.team_id = Some(fort.team);
            row.available_slots = Some(fort.available_slots);
            row.ex_raid_eligible = Some(fort.is_ex_raid_eligible);
            row.ar_scan_eligible = Some(fort.is_ar_scan_eligible);
            row.power_up_level = Some(fort.power_up_level);
            row.partner_id = (!fort.partner_id.is_empty()).then(|| fort.partner_id.clone());
            row.cell_id = Some(cell_id as i64);
            if !fort.image_url.is_empty() {
                row.url = Some(fort.image_url.clone());
            }

            if let Some(raid) = &fort.raid_info {
                let battle = raid.raid_battle_ms / 1000;
                if row.raid_battle_timestamp != Some(battle) {
                    row.rsvps = None;
                }
                row.raid_seed = Some(raid.raid_seed);
                row.raid_spawn_timestamp = Some(raid.raid_spawn_ms / 1000);
                row.raid_battle_timestamp = Some(battle);
                row.raid_end_timestamp = Some(raid.raid_end_ms / 1000);
                row.raid_level = Some(raid.raid_level);
                row.raid_is_exclusive = Some(raid.is_exclusive);
                match &raid.raid_pokemon {
                    Some(boss) => {
                        let display = boss.pokemon_display.as_ref();
                        row.raid_pokemon_id = Some(boss.pokemon_id);
                        row.raid_pokemon_cp = Some(boss.cp);
                        row.raid_pokemon_move_1 = Some(boss.move1);
                        row.raid_pokemon_move_2 = Some(boss.move2);
                        row.raid_pokemon_form = display.map(|d| d.form);
                        row.raid_pokemon_costume = display.map(|d| d.costume);
                        row.raid_pokemon_gender = display.map(|d| d.gender);
                        row.raid_pokemon_alignment = display.map(|d| d.alignment);
                    }
                    None => {
                        row.raid_pokemon_id = Some(0);
                        row.raid_pokemon_cp = Some(0);
                        row.raid_pokemon_move_1 = Some(0);
                        row.raid_pokemon_move_2 = Some(0);
                        row.raid_pokemon_form = Some(0);
                        row.raid_pokemon_costume = Some(0);
                        row.raid_pokemon_gender = Some(0);
                        row.raid_pokemon_alignment = Some(0);
                    }
                }
            }
            true
        })
        .await
    }

    pub async fn update_gym_from_details(&self, details: &FortDetailsOutProto) -> String {
        self.modify_gym(&details.id, |row, _| {
            row.lat = details.latitude;
            row.lon = details.longitude;
            row.name = Some(details.name.clone());
            if let Some(url) = details.image_url.first() {
                row.url = Some(url.clone());
            }
            row.description = Some(details.description.clone());
            row.team_id = Some(details.team);
            row.deleted = false;
            true
        })
        .await;
        format!("{} {}", details.id, details.name)
    }

    /// Gym info carries the defender roster.
    pub async fn update_gym_from_gym_info(&self, info: &GymGetInfoOutProto) -> String {
        let Some(status) = &info.gym_status_and_defenders else {
            return "No gym status".to_string();
        };
        let Some(fort) = &status.pokemon_fort_proto else {
            return "No gym fort".to_string();
        };

        let defenders: Vec<_> = status
            .gym_defender
            .iter()
            .filter_map(|d| {
                let pokemon = d.pokemon.as_ref()?;
                let display = pokemon.pokemon_display.as_ref();
                Some(json!({
                    "pokemon_id": pokemon.pokemon_id,
                    "form": display.map(|d| d.form).unwrap_or(0),
                    "costume": display.map(|d| d.costume).unwrap_or(0),
                    "gender": display.map(|d| d.gender).unwrap_or(0),
                    "shiny": display.map(|d| d.shiny).unwrap_or(false),
                    "cp_when_deployed": pokemon.cp,
                    "cp_now": d.cp_now,
                    "deployed_ms": d.deployed_ms,
                }))
            })
            .collect();
        let total_cp: i32 = status.gym_defender.iter().map(|d| d.cp_now).sum();

        self.modify_gym(&fort.fort_id, |row, _| {
            row.lat = fort.latitude;
            row.lon = fort.longitude;
            row.name = Some(info.name.clone());
            if !info.url.is_empty() {
                row.url = Some(info.url.clone());
            }
            if !info.description.is_empty() {
                row.description = Some(info.description.clone());
            }
            row.team_id = Some(fort.team);
            row.guarding_pokemon_id = Some(fort.guard_pokemon_id);
            row.available_slots = Some(fort.available_slots);
            row.total_cp = Some(total_cp);
            row.defenders = Some(serde_json::Value::from(defenders).to_string());
            row.deleted = false;
            true
        })
        .await;
        format!("{} {}", fort.fort_id, info.name)
    }

    /// Name and image from GetMapForts. Returns false when the id is not a
    /// cached gym.
    pub async fn update_gym_from_map_fort(&self, fort: &MapFortProto) -> bool {
        if self.gym(&fort.id).is_none() {
            return false;
        }
        self.modify_gym(&fort.id, |row, is_new| {
            if is_new {
                return false;
            }
            row.name = Some(fort.name.clone());
            if let Some(image) = fort.image.first() {
                row.url = Some(image.url.clone());
            }
            true
        })
        .await;
        true
    }

    /// RSVP timeslots for the raid currently on `gym_id`.
    pub async fn update_gym_rsvps(&self, gym_id: &str, rsvps: &GetEventRsvpsOutProto) -> String {
        let mut slots: Vec<_> = rsvps
            .rsvp_timeslots
            .iter()
            .filter(|t| t.going_count > 0 || t.maybe_count > 0)
            .map(|t| {
                json!({
                    "timeslot": t.timeslot,
                    "going_count": t.going_count,
                    "maybe_count": t.maybe_count,
                })
            })
            .collect();
        slots.sort_by_key(|s| s["timeslot"].as_i64().unwrap_or(0));
        let encoded = (!slots.is_empty()).then(|| serde_json::Value::from(slots).to_string());

        let updated = self
            .modify_gym(gym_id, |row, is_new| {
                if is_new {
                    return false;
                }
                row.rsvps = encoded;
                true
            })
            .await;
        match updated {
            Some(_) => format!("{} rsvps updated", gym_id),
            None => format!("{} rsvps unchanged", gym_id),
        }
    }

    /// A zero count clears stored RSVPs for a gym.
    pub async fn update_gym_rsvp_count(&self, details: &RsvpCountDetailsProto) -> bool {
        if details.going_count > 0 || details.maybe_count > 0 {
            return false;
        }
        self.modify_gym(&details.location_id, |row, is_new| {
            if is_new || row.rsvps.is_none() {
                return false;
            }
            row.rsvps = None;
            true
        })
        .await
        .is_some()
    }

    pub(crate) async fn mark_gym_deleted(&self, id: &str) -> bool {
        self.modify_gym(id, |row, is_new| {
            if is_new || row.deleted {
                return false;
            }
            row.deleted = true;
            true
        })
        .await
        .is_some()
    }
}
