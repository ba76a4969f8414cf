// Pokestops: GMO forts, fort details, map forts, quests, lures and showcases.

use super::{float_changed, now_seconds, EntityStore, Tracked};
use golbat_common::Geofence;
use golbat_proto::pogo::{
    ContestProto, FortDetailsOutProto, FortSearchOutProto, GetPokemonSizeLeaderboardEntryOutProto,
    MapFortProto, PokemonFortProto, QuestProto,
};
use golbat_webhooks::WebhookType;
use serde::Serialize;
use serde_json::json;
use std::time::Duration;

/// Lure lifetime when the fort does not report an expiry.
const LURE_DURATION: i64 = 30 * 60;

/// One quest as stored in a pokestop's quest or alternative quest slot.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QuestSlot {
    pub quest_type: Option<i32>,
    pub timestamp: Option<i64>,
    pub target: Option<i32>,
    /// JSON encoded condition list.
    pub conditions: Option<String>,
    /// JSON encoded reward list.
    pub rewards: Option<String>,
    pub template: Option<String>,
    pub title: Option<String>,
    pub expiry: Option<i64>,
}

impl QuestSlot {
    fn from_proto(quest: &QuestProto, now: i64) -> Self {
        let rewards: Vec<_> = quest
            .rewards
            .iter()
            .map(|r| {
                json!({
                    "type": r.reward_type,
                    "info": {
                        "item_id": r.item_id,
                        "amount": r.amount,
                        "pokemon_id": r.pokemon_id,
                        "form_id": r.form,
                        "shiny": r.shiny,
                        "stardust": r.stardust,
                    }
                })
            })
            .collect();
        let conditions: Vec<_> = quest
            .conditions
            .iter()
            .map(|c| json!({"type": c.condition_type, "info": {"values": c.values}}))
            .collect();

        Self {
            quest_type: Some(quest.quest_type),
            timestamp: Some(now),
            target: Some(quest.goal_target),
            conditions: Some(serde_json::Value::from(conditions).to_string()),
            rewards: Some(serde_json::Value::from(rewards).to_string()),
            template: Some(quest.template_id.to_lowercase()),
            title: Some(quest.title.to_lowercase()),
            expiry: Some(end_of_day(now)),
        }
    }

    pub fn is_set(&self) -> bool {
        self.quest_type.is_some()
    }

    pub fn clear(&mut self) {
        *self = QuestSlot::default();
    }
}

/// Quests roll over at midnight; without a timezone lookup this is UTC midnight.
fn end_of_day(now: i64) -> i64 {
    now - now.rem_euclid(86_400) + 86_400
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PokestopRow {
    pub id: String,
    pub lat: f64,
    pub lon: f64,
    pub name: Option<String>,
    pub url: Option<String>,
    pub description: Option<String>,
    pub lure_expire_timestamp: Option<i64>,
    pub lure_id: i32,
    pub last_modified_timestamp: Option<i64>,
    pub updated: i64,
    pub enabled: Option<bool>,
    pub quest: QuestSlot,
    pub alternative_quest: QuestSlot,
    pub cell_id: Option<i64>,
    pub deleted: bool,
    pub first_seen_timestamp: i64,
    pub partner_id: Option<String>,
    pub ar_scan_eligible: Option<bool>,
    pub power_up_level: Option<i32>,
    pub showcase_focus: Option<String>,
    pub showcase_pokemon_id: Option<i32>,
    pub showcase_pokemon_form_id: Option<i32>,
    pub showcase_pokemon_type_id: Option<i32>,
    pub showcase_ranking_standard: Option<i32>,
    pub showcase_expiry: Option<i64>,
    /// JSON encoded leaderboard.
    pub showcase_rankings: Option<String>,
}

impl Tracked for PokestopRow {
    fn updated(&self) -> i64 {
        self.updated
    }

    fn set_updated(&mut self, updated: i64) {
        self.updated = updated;
    }
}

impl PokestopRow {
    fn fort_webhook(&self) -> serde_json::Value {
        json!({
            "type": "pokestop",
            "name": self.name.clone().unwrap_or_default(),
            "description": self.description.clone().unwrap_or_default(),
            "image_url": self.url.clone().unwrap_or_default(),
            "latitude": self.lat,
            "longitude": self.lon,
        })
    }

    fn lure_webhook(&self) -> serde_json::Value {
        json!({
            "pokestop_id": self.id,
            "latitude": self.lat,
            "longitude": self.lon,
            "name": self.name,
            "url": self.url,
            "lure_expiration": self.lure_expire_timestamp.unwrap_or(0),
            "last_modified": self.last_modified_timestamp.unwrap_or(0),
            "enabled": self.enabled.unwrap_or(false),
            "lure_id": self.lure_id,
            "ar_scan_eligible": self.ar_scan_eligible.unwrap_or(false),
            "power_up_level": self.power_up_level.unwrap_or(0),
            "updated": self.updated,
        })
    }

    fn quest_webhook(&self, slot: &QuestSlot, with_ar: bool) -> serde_json::Value {
        let parse = |s: &Option<String>| {
            s.as_deref()
                .and_then(|s| serde_json::from_str::<serde_json::Value>(s).ok())
                .unwrap_or_else(|| json!([]))
        };
        json!({
            "pokestop_id": self.id,
            "latitude": self.lat,
            "longitude": self.lon,
            "pokestop_name": self.name.clone().unwrap_or_else(|| "Unknown".to_string()),
            "pokestop_url": self.url.clone().unwrap_or_default(),
            "type": slot.quest_type,
            "target": slot.target,
            "template": slot.template,
            "title": slot.title,
            "conditions": parse(&slot.conditions),
            "rewards": parse(&slot.rewards),
            "updated": self.updated,
            "ar_scan_eligible": self.ar_scan_eligible.unwrap_or(false),
            "with_ar": with_ar,
        })
    }
}

pub(crate) fn fort_update_webhook(
    change: &str,
    old: Option<serde_json::Value>,
    new: Option<serde_json::Value>,
) -> serde_json::Value {
    match change {
        "new" => json!({"change_type": change, "new": new}),
        "removal" => json!({"change_type": change, "old": old}),
        _ => json!({"change_type": change, "old": old, "new": new}),
    }
}

impl EntityStore {
    async fn modify_pokestop(
        &self,
        id: &str,
        f: impl FnOnce(&mut PokestopRow, bool) -> bool,
    ) -> Option<PokestopRow> {
        let _guard = self.locks.lock_str(id).await;
        let old = self.pokestops.get(&id.to_string());
        let mut row = old.clone().unwrap_or_else(|| PokestopRow {
            id: id.to_string(),
            first_seen_timestamp: now_seconds(),
            ..Default::default()
        });
        if !f(&mut row, old.is_none()) {
            return None;
        }
        self.save_pokestop(old.as_ref(), row)
    }

    fn save_pokestop(&self, old: Option<&PokestopRow>, mut row: PokestopRow) -> Option<PokestopRow> {
        if let Some(old) = old {
            if !row.has_changes(old) {
                return None;
            }
        }
        row.updated = now_seconds();
        self.pokestops.insert(row.id.clone(), row.clone());

        match old {
            None => {
                self.ctx.stats.update_fort_count(&self.areas(row.lat, row.lon), "pokestop", "new");
                self.webhook(
                    WebhookType::FortUpdate,
                    fort_update_webhook("new", None, Some(row.fort_webhook())),
                    row.lat,
                    row.lon,
                );
            }
            Some(old) => {
                if row.deleted && !old.deleted {
                    self.ctx
                        .stats
                        .update_fort_count(&self.areas(old.lat, old.lon), "pokestop", "removal");
                    self.webhook(
                        WebhookType::FortUpdate,
                        fort_update_webhook("removal", Some(old.fort_webhook()), None),
                        old.lat,
                        old.lon,
                    );
                } else if old.name != row.name
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

        let lure_changed = old.map_or(row.lure_id != 0, |o| {
            o.lure_id != row.lure_id || o.lure_expire_timestamp != row.lure_expire_timestamp
        });
        if lure_changed && row.lure_id != 0 {
            self.webhook(WebhookType::Pokestop, row.lure_webhook(), row.lat, row.lon);
        }

        for (slot, with_ar) in [(&row.quest, true), (&row.alternative_quest, false)] {
            let old_slot = old.map(|o| if with_ar { &o.quest } else { &o.alternative_quest });
            if slot.is_set() && old_slot != Some(slot) {
                self.webhook(WebhookType::Quest, row.quest_webhook(slot, with_ar), row.lat, row.lon);
            }
        }

        self.queues
            .pokestop
            .enqueue(row.clone(), old.is_none(), Duration::ZERO);
        Some(row)
    }

    /// A checkpoint fort from a map cell.
    pub async fn update_pokestop_from_fort(&self, fort: &PokemonFortProto, cell_id: u64) -> Option<PokestopRow> {
        self.modify_pokestop(&fort.fort_id, |row, _| {
            row.lat = fort.latitude;
            row.lon = fort.longitude;
            row.enabled = Some(fort.enabled);
            row.deleted = false;
            row.last_modified_timestamp = Some(fort.last_modified_ms / 1000);
            row.partner_id = (!fort.partner_id.is_empty()).then(|| fort.partner_id.clone());
            if !fort.image_url.is_empty() {
                row.url = Some(fort.image_url.clone());
            }
            row.ar_scan_eligible = Some(fort.is_ar_scan_eligible);
            row.power_up_level = Some(fort.power_up_level);
            row.cell_id = Some(cell_id as i64);

            match fort.active_fort_modifier.first() {
                Some(&lure) => {
                    row.lure_id = lure;
                    row.lure_expire_timestamp = Some(if fort.lure_expiration_ms > 0 {
                        fort.lure_expiration_ms / 1000
                    } else {
                        fort.last_modified_ms / 1000 + LURE_DURATION
                    });
                }
                None => {
                    row.lure_id = 0;
                }
            }
            true
        })
        .await
    }

    pub async fn update_pokestop_from_details(&self, details: &FortDetailsOutProto) -> String {
        self.modify_pokestop(&details.id, |row, _| {
            row.lat = details.latitude;
            row.lon = details.longitude;
            row.name = Some(details.name.clone());
            if let Some(url) = details.image_url.first() {
                row.url = Some(url.clone());
            }
            row.description = Some(details.description.clone());
            row.deleted = false;
            true
        })
        .await;
        format!("{} {}", details.id, details.name)
    }

    /// Name and image from GetMapForts. Only known pokestops are touched;
    /// returns false when the id is not a cached pokestop.
    pub async fn update_pokestop_from_map_fort(&self, fort: &MapFortProto) -> bool {
        if self.pokestop(&fort.id).is_none() {
            return false;
        }
        self.modify_pokestop(&fort.id, |row, is_new| {
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

    /// Store a quest in the AR or non-AR slot.
    pub async fn update_pokestop_from_quest(&self, search: &FortSearchOutProto, have_ar: bool) -> String {
        let Some(quest) = search.challenge_quest.as_ref().and_then(|c| c.quest.as_ref()) else {
            return "No quest".to_string();
        };
        let now = now_seconds();
        let slot = QuestSlot::from_proto(quest, now);
        let fort_id = if search.fort_id.is_empty() {
            &quest.fort_id
        } else {
            &search.fort_id
        };

        let title = slot.title.clone().unwrap_or_default();
        self.modify_pokestop(fort_id, |row, _| {
            if have_ar {
                row.quest = slot;
            } else {
                row.alternative_quest = slot;
            }
            true
        })
        .await;
        format!("{} {}", fort_id, title)
    }

    /// Showcase definition from GetContestData.
    pub async fn update_pokestop_showcase(&self, fort_id: &str, contest: &ContestProto) -> Option<PokestopRow> {
        self.modify_pokestop(fort_id, |row, is_new| {
            if is_new {
                return false;
            }
            let metric = contest.metric.as_ref();
            row.showcase_focus = Some(
                json!({
                    "pokemon_id": contest.focus_pokemon_id,
                    "pokemon_form": contest.focus_pokemon_form,
                    "pokemon_type": contest.focus_pokemon_type,
                })
                .to_string(),
            );
            row.showcase_pokemon_id = (contest.focus_pokemon_id != 0).then_some(contest.focus_pokemon_id);
            row.showcase_pokemon_form_id = (contest.focus_pokemon_form != 0).then_some(contest.focus_pokemon_form);
            row.showcase_pokemon_type_id = (contest.focus_pokemon_type != 0).then_some(contest.focus_pokemon_type);
            row.showcase_ranking_standard = metric.map(|m| m.ranking_standard);
            row.showcase_expiry = Some(contest.end_time_ms / 1000);
            true
        })
        .await
    }

    /// Leaderboard from a size contest entry response.
    pub async fn update_pokestop_showcase_rankings(
        &self,
        fort_id: &str,
        leaderboard: &GetPokemonSizeLeaderboardEntryOutProto,
    ) -> Option<PokestopRow> {
        let entries: Vec<_> = leaderboard
            .contest_entries
            .iter()
            .map(|e| {
                let display = e.pokemon_display.as_ref();
                json!({
                    "rank": e.rank,
                    "score": e.score,
                    "pokemon_id": e.pokedex_id,
                    "form": display.map(|d| d.form).unwrap_or_default(),
                    "costume": display.map(|d| d.costume).unwrap_or_default(),
                    "gender": display.map(|d| d.gender).unwrap_or_default(),
                })
            })
            .collect();
        let rankings = json!({
            "total_entries": leaderboard.total_entries,
            "last_update": now_seconds(),
            "contest_entries": entries,
        })
        .to_string();

        self.modify_pokestop(fort_id, |row, is_new| {
            if is_new {
                return false;
            }
            row.showcase_rankings = Some(rankings);
            true
        })
        .await
    }

    pub(crate) async fn mark_pokestop_deleted(&self, id: &str) -> bool {
        self.modify_pokestop(id, |row, is_new| {
            if is_new || row.deleted {
                return false;
            }
            row.deleted = true;
            true
        })
        .await
        .is_some()
    }

    /// Forget cached quests for stops inside `fence`. Returns how many stops
    /// were touched; persistence is cleared separately.
    pub fn clear_cached_quests(&self, fence: &Geofence) -> usize {
        let mut cleared = 0;
        for (id, mut row) in self.pokestops.snapshot() {
            if !(row.quest.is_set() || row.alternative_quest.is_set()) {
                continue;
            }
            if fence.contains(golbat_common::Location::new(row.lat, row.lon)) {
                row.quest.clear();
                row.alternative_quest.clear();
                self.pokestops.insert(id, row);
                cleared += 1;
            }
        }
        cleared
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::testing::store;
    use crate::entities::DEFAULT_FORT_STALE_SECONDS;
    use golbat_common::{AreaName, Location};
    use golbat_proto::pogo::{ClientQuestProto, QuestRewardProto};

    fn fort(id: &str) -> PokemonFortProto {
        PokemonFortProto {
            fort_id: id.into(),
            latitude: 1.0,
            longitude: 2.0,
            fort_type: 1,
            enabled: true,
            last_modified_ms: 1_000_000,
            ..Default::default()
        }
    }

    fn search(fort_id: &str, quest_type: i32) -> FortSearchOutProto {
        FortSearchOutProto {
            result: 1,
            fort_id: fort_id.into(),
            challenge_quest: Some(ClientQuestProto {
                quest: Some(QuestProto {
                    quest_type,
                    template_id: "CHALLENGE_X".into(),
                    title: "QUEST_TITLE".into(),
                    goal_target: 3,
                    rewards: vec![QuestRewardProto {
                        reward_type: 2,
                        item_id: 1,
                        amount: 5,
                        ..Default::default()
                    }],
                    ..Default::default()
                }),
            }),
        }
    }

    #[tokio::test]
    async fn new_fort_then_lure_emits_fort_and_lure_hooks() {
        let (store, hooks) = store();
        store.update_pokestop_from_fort(&fort("s1"), 5).await.unwrap();
        assert_eq!(hooks.kinds(), vec![WebhookType::FortUpdate]);

        let mut lured = fort("s1");
        lured.active_fort_modifier = vec![501];
        let row = store.update_pokestop_from_fort(&lured, 5).await.unwrap();
        assert_eq!(row.lure_id, 501);
        assert_eq!(row.lure_expire_timestamp, Some(1000 + LURE_DURATION));
        assert_eq!(hooks.of(WebhookType::Pokestop).len(), 1);

        assert!(store.update_pokestop_from_fort(&lured, 5).await.is_none());
    }

    #[tokio::test]
    async fn quests_fill_ar_and_alternative_slots() {
        let (store, hooks) = store();
        store.update_pokestop_from_fort(&fort("s1"), 5).await;

        let message = store.update_pokestop_from_quest(&search("s1", 7), true).await;
        assert_eq!(message, "s1 quest_title");
        store.update_pokestop_from_quest(&search("s1", 8), false).await;

        let row = store.pokestop("s1").unwrap();
        assert_eq!(row.quest.quest_type, Some(7));
        assert_eq!(row.alternative_quest.quest_type, Some(8));
        assert_eq!(row.quest.template.as_deref(), Some("challenge_x"));

        let quests = hooks.of(WebhookType::Quest);
        assert_eq!(quests.len(), 2);
        assert_eq!(quests[0]["with_ar"], true);
        assert_eq!(quests[1]["with_ar"], false);
        assert_eq!(quests[0]["rewards"][0]["info"]["amount"], 5);
    }

    #[tokio::test]
    async fn details_edit_emits_fort_update() {
        let (store, hooks) = store();
        store.update_pokestop_from_fort(&fort("s1"), 5).await;
        store
            .update_pokestop_from_details(&FortDetailsOutProto {
                id: "s1".into(),
                name: "Fountain".into(),
                latitude: 1.0,
                longitude: 2.0,
                fort_type: 1,
                ..Default::default()
            })
            .await;
        let updates = hooks.of(WebhookType::FortUpdate);
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[1]["change_type"], "edit");
        assert_eq!(updates[1]["new"]["name"], "Fountain");
    }

    #[tokio::test]
    async fn clearing_quests_respects_fence() {
        let (store, _) = store();
        store.update_pokestop_from_fort(&fort("s1"), 5).await;
        store.update_pokestop_from_quest(&search("s1", 7), true).await;

        let far = Geofence::new(
            AreaName::new("x", "y"),
            vec![Location::new(10.0, 10.0), Location::new(10.0, 11.0), Location::new(11.0, 11.0)],
        );
        assert_eq!(store.clear_cached_quests(&far), 0);

        let near = Geofence::new(
            AreaName::new("x", "y"),
            vec![
                Location::new(0.0, 0.0),
                Location::new(0.0, 3.0),
                Location::new(3.0, 3.0),
                Location::new(3.0, 0.0),
            ],
        );
        assert_eq!(store.clear_cached_quests(&near), 1);
        assert!(!store.pokestop("s1").unwrap().quest.is_set());
    }

    #[tokio::test]
    async fn missing_fort_in_cell_is_deleted_once_stale() {
        let (store, hooks) = store();
        store.update_pokestop_from_fort(&fort("s1"), 5).await;
        store.update_pokestop_from_fort(&fort("s2"), 5).await;

        let both: std::collections::HashSet<String> = ["s1".to_string(), "s2".to_string()].into();
        let only_s1: std::collections::HashSet<String> = ["s1".to_string()].into();
        assert_eq!(store.update_cell_forts(5, both, 1_000).await, 0);

        // a single short listing inside the threshold leaves the fort alone
        assert_eq!(store.update_cell_forts(5, only_s1.clone(), 1_030).await, 0);
        assert!(!store.pokestop("s2").unwrap().deleted);
        assert!(hooks.of(WebhookType::FortUpdate).iter().all(|u| u["change_type"] != "removal"));

        let later = 1_000 + DEFAULT_FORT_STALE_SECONDS + 1;
        assert_eq!(store.update_cell_forts(5, only_s1, later).await, 1);
        assert!(store.pokestop("s2").unwrap().deleted);
        assert!(!store.pokestop("s1").unwrap().deleted);
        let updates = hooks.of(WebhookType::FortUpdate);
        assert_eq!(updates.last().unwrap()["change_type"], "removal");
    }
}
