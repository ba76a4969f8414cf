// Invasions and other pokestop incidents.

use super::{now_seconds, EntityStore, Tracked};
use golbat_proto::pogo::{
    OpenInvasionCombatSessionOutProto, OpenInvasionCombatSessionProto, PokestopIncidentDisplayProto,
    StartIncidentOutProto,
};
use golbat_webhooks::WebhookType;
use serde::Serialize;
use serde_json::json;
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IncidentRow {
    pub id: String,
    pub pokestop_id: String,
    pub start: i64,
    pub expiration: i64,
    pub display_type: i32,
    pub style: i32,
    pub character: i32,
    pub updated: i64,
    pub confirmed: bool,
    pub slot_1_pokemon_id: Option<i32>,
    pub slot_1_form: Option<i32>,
    pub slot_2_pokemon_id: Option<i32>,
    pub slot_2_form: Option<i32>,
    pub slot_3_pokemon_id: Option<i32>,
    pub slot_3_form: Option<i32>,
}

impl Tracked for IncidentRow {
    fn updated(&self) -> i64 {
        self.updated
    }

    fn set_updated(&mut self, updated: i64) {
        self.updated = updated;
    }
}

impl IncidentRow {
    fn apply_display(&mut self, pokestop_id: &str, display: &PokestopIncidentDisplayProto) {
        self.pokestop_id = pokestop_id.to_string();
        self.start = display.incident_start_ms / 1000;
        self.expiration = display.incident_expiration_ms / 1000;
        self.display_type = display.incident_display_type;
        if let Some(character) = &display.character_display {
            if self.character != character.character {
                self.confirmed = false;
                self.clear_lineup();
            }
            self.character = character.character;
            self.style = character.style;
        }
    }

    fn clear_lineup(&mut self) {
        self.slot_1_pokemon_id = None;
        self.slot_1_form = None;
        self.slot_2_pokemon_id = None;
        self.slot_2_form = None;
        self.slot_3_pokemon_id = None;
        self.slot_3_form = None;
    }
}

impl EntityStore {
    async fn modify_incident(
        &self,
        id: &str,
        f: impl FnOnce(&mut IncidentRow, bool) -> bool,
    ) -> Option<IncidentRow> {
        let _guard = self.locks.lock_str(id).await;
        let old = self.incidents.get(&id.to_string());
        let mut row = old.clone().unwrap_or_else(|| IncidentRow {
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
        self.incidents.insert(row.id.clone(), row.clone());

        let (lat, lon, stop_name, stop_url) = match self.pokestop(&row.pokestop_id) {
            Some(stop) => (stop.lat, stop.lon, stop.name, stop.url),
            None => (0.0, 0.0, None, None),
        };
        if old.is_none() {
            self.ctx.stats.update_incident_count(&self.areas(lat, lon));
        }
        let notify = match &old {
            None => true,
            Some(old) => {
                old.character != row.character
                    || old.expiration != row.expiration
                    || (row.confirmed && !old.confirmed)
            }
        };
        if notify {
            let message = json!({
                "id": row.id,
                "pokestop_id": row.pokestop_id,
                "latitude": lat,
                "longitude": lon,
                "pokestop_name": stop_name.unwrap_or_else(|| "Unknown".to_string()),
                "url": stop_url.unwrap_or_default(),
                "enabled": true,
                "start": row.start,
                "incident_expire_timestamp": row.expiration,
                "expiration": row.expiration,
                "display_type": row.display_type,
                "style": row.style,
                "grunt_type": row.character,
                "character": row.character,
                "updated": row.updated,
                "confirmed": row.confirmed,
                "lineup": lineup_json(&row),
            });
            self.webhook(WebhookType::Invasion, message, lat, lon);
        }

        self.queues
            .incident
            .enqueue(row.clone(), old.is_none(), Duration::ZERO);
        Some(row)
    }

    /// Incident advertised on a pokestop in a map cell.
    pub async fn update_incident_from_display(
        &self,
        pokestop_id: &str,
        display: &PokestopIncidentDisplayProto,
    ) -> Option<IncidentRow> {
        self.modify_incident(&display.incident_id, |row, _| {
            row.apply_display(pokestop_id, display);
            true
        })
        .await
    }

    pub async fn update_incident_from_start(&self, start: &StartIncidentOutProto) -> String {
        let Some(incident) = &start.incident else {
            return "No incident".to_string();
        };
        let Some(display) = &incident.pokestop_display else {
            return format!("{} no display", incident.incident_id);
        };
        self.modify_incident(&incident.incident_id, |row, _| {
            row.apply_display(&incident.fort_id, display);
            true
        })
        .await;
        format!("{} {}", incident.fort_id, incident.incident_id)
    }

    /// Confirmed grunt lineup from opening an invasion battle.
    pub async fn update_incident_lineup(
        &self,
        request: &OpenInvasionCombatSessionProto,
        response: &OpenInvasionCombatSessionOutProto,
    ) -> String {
        let Some(lookup) = &request.incident_lookup else {
            return "No incident lookup".to_string();
        };
        let Some(opponent) = response.combat.as_ref().and_then(|c| c.opponent.as_ref()) else {
            return format!("{} no opponent", lookup.incident_id);
        };

        let lineup: Vec<(i32, i32)> = opponent
            .active_pokemon
            .iter()
            .chain(opponent.reserve_pokemon.iter())
            .map(|p| {
                (
                    p.pokedex_id,
                    p.pokemon_display.as_ref().map(|d| d.form).unwrap_or(0),
                )
            })
            .collect();

        self.modify_incident(&lookup.incident_id, |row, is_new| {
            if is_new {
                row.pokestop_id = lookup.fort_id.clone();
            }
            row.confirmed = true;
            let slot = |i: usize| lineup.get(i).copied().unzip();
            (row.slot_1_pokemon_id, row.slot_1_form) = slot(0);
            (row.slot_2_pokemon_id, row.slot_2_form) = slot(1);
            (row.slot_3_pokemon_id, row.slot_3_form) = slot(2);
            true
        })
        .await;
        format!("{} {} lineup", lookup.fort_id, lookup.incident_id)
    }
}

fn lineup_json(row: &IncidentRow) -> serde_json::Value {
    if !row.confirmed {
        return serde_json::Value::Null;
    }
    let slots = [
        (row.slot_1_pokemon_id, row.slot_1_form),
        (row.slot_2_pokemon_id, row.slot_2_form),
        (row.slot_3_pokemon_id, row.slot_3_form),
    ];
    slots
        .iter()
        .enumerate()
        .filter_map(|(i, (id, form))| {
            id.map(|id| json!({"slot": i + 1, "pokemon_id": id, "form": form.unwrap_or(0)}))
        })
        .collect::<Vec<_>>()
        .into()
}
