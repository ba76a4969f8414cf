//! Batch upserts for the write-behind queues.
//!
//! Every entity maps onto one `INSERT ... VALUES (...), (...) ON DUPLICATE
//! KEY UPDATE` statement, so writers never need to know whether a row is new.

use crate::error::classify_write_error;
use async_trait::async_trait;
use golbat_decoder::entities::{
    GymRow, IncidentRow, PokemonRow, PokestopRow, QuestSlot, RouteRow, S2CellRow, SpawnpointRow, StationRow,
    TappableRow, WeatherRow,
};
use golbat_decoder::EntityWriters;
use golbat_writebehind::{BatchWriter, WriteError};
use sqlx::query_builder::Separated;
use sqlx::{MySql, MySqlPool, QueryBuilder};
use std::marker::PhantomData;
use std::sync::Arc;

type Values<'qb, 'args> = Separated<'qb, 'args, MySql, &'static str>;

/// Prepared statement placeholder limit in MySQL.
const MAX_PLACEHOLDERS: usize = 65_535;

/// A row that knows its table layout.
pub trait Upsert: Send + Sync + 'static {
    const TABLE: &'static str;
    /// Insert column order; the first column is the primary key.
    const COLUMNS: &'static [&'static str];
    /// Columns written on insert but never overwritten.
    const INSERT_ONLY: &'static [&'static str] = &[];

    fn bind<'args>(&'args self, values: &mut Values<'_, 'args>);
}

/// Build the multi-row upsert for `rows`.
pub fn upsert_query<T: Upsert>(rows: &[T]) -> QueryBuilder<'_, MySql> {
    let columns: Vec<String> = T::COLUMNS.iter().map(|c| format!("`{}`", c)).collect();
    let mut query = QueryBuilder::new(format!("INSERT INTO `{}` ({}) ", T::TABLE, columns.join(", ")));
    query.push_values(rows, |mut values, row| row.bind(&mut values));

    let updates: Vec<String> = T::COLUMNS
        .iter()
        .skip(1)
        .filter(|c| !T::INSERT_ONLY.contains(c))
        .map(|c| format!("`{0}` = VALUES(`{0}`)", c))
        .collect();
    query.push(" ON DUPLICATE KEY UPDATE ");
    query.push(updates.join(", "));
    query
}

/// Rows that fit in one statement without exceeding the placeholder limit.
pub fn rows_per_statement<T: Upsert>() -> usize {
    (MAX_PLACEHOLDERS / T::COLUMNS.len().max(1)).max(1)
}

pub struct MySqlWriter<T> {
    pool: MySqlPool,
    _rows: PhantomData<fn() -> T>,
}

impl<T> MySqlWriter<T> {
    pub fn new(pool: MySqlPool) -> Self {
        Self {
            pool,
            _rows: PhantomData,
        }
    }
}

#[async_trait]
impl<T: Upsert> BatchWriter<T> for MySqlWriter<T> {
    async fn write_batch(&self, entries: &[T]) -> Result<(), WriteError> {
        // Upserts are idempotent, so a retry after a partial write is safe.
        for chunk in entries.chunks(rows_per_statement::<T>()) {
            upsert_query(chunk)
                .build()
                .execute(&self.pool)
                .await
                .map_err(|e| classify_write_error(T::TABLE, e))?;
        }
        Ok(())
    }
}

/// Accepts every batch without writing it. Used when running in memory.
pub struct DiscardWriter;

#[async_trait]
impl<T: Send + Sync> BatchWriter<T> for DiscardWriter {
    async fn write_batch(&self, _entries: &[T]) -> Result<(), WriteError> {
        Ok(())
    }
}

pub fn entity_writers(pool: &MySqlPool) -> EntityWriters {
    EntityWriters {
        pokemon: Arc::new(MySqlWriter::<PokemonRow>::new(pool.clone())),
        pokestop: Arc::new(MySqlWriter::<PokestopRow>::new(pool.clone())),
        gym: Arc::new(MySqlWriter::<GymRow>::new(pool.clone())),
        spawnpoint: Arc::new(MySqlWriter::<SpawnpointRow>::new(pool.clone())),
        incident: Arc::new(MySqlWriter::<IncidentRow>::new(pool.clone())),
        station: Arc::new(MySqlWriter::<StationRow>::new(pool.clone())),
        route: Arc::new(MySqlWriter::<RouteRow>::new(pool.clone())),
        tappable: Arc::new(MySqlWriter::<TappableRow>::new(pool.clone())),
        weather: Arc::new(MySqlWriter::<WeatherRow>::new(pool.clone())),
        s2cell: Arc::new(MySqlWriter::<S2CellRow>::new(pool.clone())),
    }
}

pub fn discard_writers() -> EntityWriters {
    let discard = Arc::new(DiscardWriter);
    EntityWriters {
        pokemon: discard.clone(),
        pokestop: discard.clone(),
        gym: discard.clone(),
        spawnpoint: discard.clone(),
        incident: discard.clone(),
        station: discard.clone(),
        route: discard.clone(),
        tappable: discard.clone(),
        weather: discard.clone(),
        s2cell: discard,
    }
}

impl Upsert for PokemonRow {
    const TABLE: &'static str = "pokemon";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "pokemon_id",
        "lat",
        "lon",
        "spawn_id",
        "expire_timestamp",
        "atk_iv",
        "def_iv",
        "sta_iv",
        "iv",
        "move_1",
        "move_2",
        "gender",
        "form",
        "cp",
        "level",
        "weather",
        "costume",
        "weight",
        "height",
        "size",
        "display_pokemon_id",
        "pokestop_id",
        "updated",
        "first_seen_timestamp",
        "changed",
        "cell_id",
        "expire_timestamp_verified",
        "shiny",
        "username",
        "seen_type",
    ];

    fn bind<'args>(&'args self, values: &mut Values<'_, 'args>) {
        values
            .push_bind(self.id)
            .push_bind(self.pokemon_id)
            .push_bind(self.lat)
            .push_bind(self.lon)
            .push_bind(self.spawn_id)
            .push_bind(self.expire_timestamp)
            .push_bind(self.atk_iv)
            .push_bind(self.def_iv)
            .push_bind(self.sta_iv)
            .push_bind(self.iv)
            .push_bind(self.move_1)
            .push_bind(self.move_2)
            .push_bind(self.gender)
            .push_bind(self.form)
            .push_bind(self.cp)
            .push_bind(self.level)
            .push_bind(self.weather)
            .push_bind(self.costume)
            .push_bind(self.weight)
            .push_bind(self.height)
            .push_bind(self.size)
            .push_bind(self.display_pokemon_id)
            .push_bind(self.pokestop_id.as_deref())
            .push_bind(self.updated)
            .push_bind(self.first_seen_timestamp)
            .push_bind(self.changed)
            .push_bind(self.cell_id)
            .push_bind(self.expire_timestamp_verified)
            .push_bind(self.shiny)
            .push_bind(self.username.as_deref())
            .push_bind(self.seen_type.as_deref());
    }
}

fn bind_quest<'args>(values: &mut Values<'_, 'args>, quest: &'args QuestSlot) {
    values
        .push_bind(quest.quest_type)
        .push_bind(quest.timestamp)
        .push_bind(quest.target)
        .push_bind(quest.conditions.as_deref())
        .push_bind(quest.rewards.as_deref())
        .push_bind(quest.template.as_deref())
        .push_bind(quest.title.as_deref())
        .push_bind(quest.expiry);
}

impl Upsert for PokestopRow {
    const TABLE: &'static str = "pokestop";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "lat",
        "lon",
        "name",
        "url",
        "description",
        "enabled",
        "lure_expire_timestamp",
        "lure_id",
        "last_modified_timestamp",
        "quest_type",
        "quest_timestamp",
        "quest_target",
        "quest_conditions",
        "quest_rewards",
        "quest_template",
        "quest_title",
        "quest_expiry",
        "alternative_quest_type",
        "alternative_quest_timestamp",
        "alternative_quest_target",
        "alternative_quest_conditions",
        "alternative_quest_rewards",
        "alternative_quest_template",
        "alternative_quest_title",
        "alternative_quest_expiry",
        "cell_id",
        "deleted",
        "partner_id",
        "ar_scan_eligible",
        "power_up_level",
        "updated",
        "first_seen_timestamp",
        "showcase_focus",
        "showcase_pokemon_id",
        "showcase_pokemon_form_id",
        "showcase_pokemon_type_id",
        "showcase_ranking_standard",
        "showcase_expiry",
        "showcase_rankings",
    ];
    const INSERT_ONLY: &'static [&'static str] = &["first_seen_timestamp"];

    fn bind<'args>(&'args self, values: &mut Values<'_, 'args>) {
        values
            .push_bind(self.id.as_str())
            .push_bind(self.lat)
            .push_bind(self.lon)
            .push_bind(self.name.as_deref())
            .push_bind(self.url.as_deref())
            .push_bind(self.description.as_deref())
            .push_bind(self.enabled)
            .push_bind(self.lure_expire_timestamp)
            .push_bind(self.lure_id)
            .push_bind(self.last_modified_timestamp);
        bind_quest(values, &self.quest);
        bind_quest(values, &self.alternative_quest);
        values
            .push_bind(self.cell_id)
            .push_bind(self.deleted)
            .push_bind(self.partner_id.as_deref())
            .push_bind(self.ar_scan_eligible)
            .push_bind(self.power_up_level)
            .push_bind(self.updated)
            .push_bind(self.first_seen_timestamp)
            .push_bind(self.showcase_focus.as_deref())
            .push_bind(self.showcase_pokemon_id)
            .push_bind(self.showcase_pokemon_form_id)
            .push_bind(self.showcase_pokemon_type_id)
            .push_bind(self.showcase_ranking_standard)
            .push_bind(self.showcase_expiry)
            .push_bind(self.showcase_rankings.as_deref());
    }
}

impl Upsert for GymRow {
    const TABLE: &'static str = "gym";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "lat",
        "lon",
        "name",
        "url",
        "description",
        "last_modified_timestamp",
        "raid_end_timestamp",
        "raid_spawn_timestamp",
        "raid_battle_timestamp",
        "updated",
        "raid_pokemon_id",
        "guarding_pokemon_id",
        "available_slots",
        "team_id",
        "raid_level",
        "enabled",
        "ex_raid_eligible",
        "raid_pokemon_move_1",
        "raid_pokemon_move_2",
        "raid_pokemon_form",
        "raid_pokemon_costume",
        "raid_pokemon_cp",
        "raid_pokemon_gender",
        "raid_pokemon_alignment",
        "raid_is_exclusive",
        "raid_seed",
        "cell_id",
        "deleted",
        "total_cp",
        "first_seen_timestamp",
        "partner_id",
        "power_up_level",
        "ar_scan_eligible",
        "defenders",
        "rsvps",
    ];
    const INSERT_ONLY: &'static [&'static str] = &["first_seen_timestamp"];

    fn bind<'args>(&'args self, values: &mut Values<'_, 'args>) {
        values
            .push_bind(self.id.as_str())
            .push_bind(self.lat)
            .push_bind(self.lon)
            .push_bind(self.name.as_deref())
            .push_bind(self.url.as_deref())
            .push_bind(self.description.as_deref())
            .push_bind(self.last_modified_timestamp)
            .push_bind(self.raid_end_timestamp)
            .push_bind(self.raid_spawn_timestamp)
            .push_bind(self.raid_battle_timestamp)
            .push_bind(self.updated)
            .push_bind(self.raid_pokemon_id)
            .push_bind(self.guarding_pokemon_id)
            .push_bind(self.available_slots)
            .push_bind(self.team_id)
            .push_bind(self.raid_level)
            .push_bind(self.enabled)
            .push_bind(self.ex_raid_eligible)
            .push_bind(self.raid_pokemon_move_1)
            .push_bind(self.raid_pokemon_move_2)
            .push_bind(self.raid_pokemon_form)
            .push_bind(self.raid_pokemon_costume)
            .push_bind(self.raid_pokemon_cp)
            .push_bind(self.raid_pokemon_gender)
            .push_bind(self.raid_pokemon_alignment)
            .push_bind(self.raid_is_exclusive)
            .push_bind(self.raid_seed)
            .push_bind(self.cell_id)
            .push_bind(self.deleted)
            .push_bind(self.total_cp)
            .push_bind(self.first_seen_timestamp)
            .push_bind(self.partner_id.as_deref())
            .push_bind(self.power_up_level)
            .push_bind(self.ar_scan_eligible)
            .push_bind(self.defenders.as_deref())
            .push_bind(self.rsvps.as_deref());
    }
}

impl Upsert for SpawnpointRow {
    const TABLE: &'static str = "spawnpoint";
    const COLUMNS: &'static [&'static str] = &["id", "lat", "lon", "updated", "last_seen", "despawn_sec"];

    fn bind<'args>(&'args self, values: &mut Values<'_, 'args>) {
        values
            .push_bind(self.id)
            .push_bind(self.lat)
            .push_bind(self.lon)
            .push_bind(self.updated)
            .push_bind(self.last_seen)
            .push_bind(self.despawn_sec);
    }
}

impl Upsert for IncidentRow {
    const TABLE: &'static str = "incident";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "pokestop_id",
        "start",
        "expiration",
        "display_type",
        "style",
        "character",
        "updated",
        "confirmed",
        "slot_1_pokemon_id",
        "slot_1_form",
        "slot_2_pokemon_id",
        "slot_2_form",
        "slot_3_pokemon_id",
        "slot_3_form",
    ];

    fn bind<'args>(&'args self, values: &mut Values<'_, 'args>) {
        values
            .push_bind(self.id.as_str())
            .push_bind(self.pokestop_id.as_str())
            .push_bind(self.start)
            .push_bind(self.expiration)
            .push_bind(self.display_type)
            .push_bind(self.style)
            .push_bind(self.character)
            .push_bind(self.updated)
            .push_bind(self.confirmed)
            .push_bind(self.slot_1_pokemon_id)
            .push_bind(self.slot_1_form)
            .push_bind(self.slot_2_pokemon_id)
            .push_bind(self.slot_2_form)
            .push_bind(self.slot_3_pokemon_id)
            .push_bind(self.slot_3_form);
    }
}

impl Upsert for StationRow {
    const TABLE: &'static str = "station";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "lat",
        "lon",
        "name",
        "cell_id",
        "start_time",
        "end_time",
        "cooldown_complete",
        "is_battle_available",
        "is_inactive",
        "updated",
        "battle_level",
        "battle_start",
        "battle_end",
        "battle_pokemon_id",
        "battle_pokemon_form",
        "battle_pokemon_costume",
        "battle_pokemon_gender",
        "battle_pokemon_alignment",
        "battle_pokemon_move_1",
        "battle_pokemon_move_2",
        "total_stationed_pokemon",
        "stationed_pokemon",
    ];

    fn bind<'args>(&'args self, values: &mut Values<'_, 'args>) {
        values
            .push_bind(self.id.as_str())
            .push_bind(self.lat)
            .push_bind(self.lon)
            .push_bind(self.name.as_str())
            .push_bind(self.cell_id)
            .push_bind(self.start_time)
            .push_bind(self.end_time)
            .push_bind(self.cooldown_complete)
            .push_bind(self.is_battle_available)
            .push_bind(self.is_inactive)
            .push_bind(self.updated)
            .push_bind(self.battle_level)
            .push_bind(self.battle_start)
            .push_bind(self.battle_end)
            .push_bind(self.battle_pokemon_id)
            .push_bind(self.battle_pokemon_form)
            .push_bind(self.battle_pokemon_costume)
            .push_bind(self.battle_pokemon_gender)
            .push_bind(self.battle_pokemon_alignment)
            .push_bind(self.battle_pokemon_move_1)
            .push_bind(self.battle_pokemon_move_2)
            .push_bind(self.total_stationed_pokemon)
            .push_bind(self.stationed_pokemon.as_deref());
    }
}

impl Upsert for RouteRow {
    const TABLE: &'static str = "route";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "name",
        "description",
        "distance_meters",
        "duration_seconds",
        "start_fort_id",
        "start_lat",
        "start_lon",
        "start_image",
        "end_fort_id",
        "end_lat",
        "end_lon",
        "end_image",
        "image",
        "image_border_color",
        "reversible",
        "version",
        "waypoints",
        "updated",
    ];

    fn bind<'args>(&'args self, values: &mut Values<'_, 'args>) {
        values
            .push_bind(self.id.as_str())
            .push_bind(self.name.as_str())
            .push_bind(self.description.as_str())
            .push_bind(self.distance_meters)
            .push_bind(self.duration_seconds)
            .push_bind(self.start_fort_id.as_str())
            .push_bind(self.start_lat)
            .push_bind(self.start_lon)
            .push_bind(self.start_image.as_str())
            .push_bind(self.end_fort_id.as_str())
            .push_bind(self.end_lat)
            .push_bind(self.end_lon)
            .push_bind(self.end_image.as_str())
            .push_bind(self.image.as_str())
            .push_bind(self.image_border_color)
            .push_bind(self.reversible)
            .push_bind(self.version)
            .push_bind(self.waypoints.as_str())
            .push_bind(self.updated);
    }
}

impl Upsert for TappableRow {
    const TABLE: &'static str = "tappable";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "lat",
        "lon",
        "fort_id",
        "spawn_id",
        "type",
        "pokemon_id",
        "item_id",
        "count",
        "expire_timestamp",
        "expire_timestamp_verified",
        "updated",
    ];

    fn bind<'args>(&'args self, values: &mut Values<'_, 'args>) {
        values
            .push_bind(self.id)
            .push_bind(self.lat)
            .push_bind(self.lon)
            .push_bind(self.fort_id.as_deref())
            .push_bind(self.spawn_id)
            .push_bind(self.type_id)
            .push_bind(self.pokemon_id)
            .push_bind(self.item_id)
            .push_bind(self.count)
            .push_bind(self.expire_timestamp)
            .push_bind(self.expire_timestamp_verified)
            .push_bind(self.updated);
    }
}

impl Upsert for WeatherRow {
    const TABLE: &'static str = "weather";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "latitude",
        "longitude",
        "level",
        "gameplay_condition",
        "wind_direction",
        "cloud_level",
        "rain_level",
        "wind_level",
        "snow_level",
        "fog_level",
        "special_effect_level",
        "severity",
        "warn_weather",
        "updated",
    ];

    fn bind<'args>(&'args self, values: &mut Values<'_, 'args>) {
        values
            .push_bind(self.id)
            .push_bind(self.latitude)
            .push_bind(self.longitude)
            .push_bind(self.level)
            .push_bind(self.gameplay_condition)
            .push_bind(self.wind_direction)
            .push_bind(self.cloud_level)
            .push_bind(self.rain_level)
            .push_bind(self.wind_level)
            .push_bind(self.snow_level)
            .push_bind(self.fog_level)
            .push_bind(self.special_effect_level)
            .push_bind(self.severity)
            .push_bind(self.warn_weather)
            .push_bind(self.updated);
    }
}

impl Upsert for S2CellRow {
    const TABLE: &'static str = "s2cell";
    const COLUMNS: &'static [&'static str] = &["id", "level", "center_lat", "center_lon", "updated"];

    fn bind<'args>(&'args self, values: &mut Values<'_, 'args>) {
        values
            .push_bind(self.id)
            .push_bind(self.level)
            .push_bind(self.center_lat)
            .push_bind(self.center_lon)
            .push_bind(self.updated);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_has_one_tuple_per_row() {
        let rows = vec![
            SpawnpointRow {
                id: 1,
                ..Default::default()
            },
            SpawnpointRow {
                id: 2,
                ..Default::default()
            },
        ];
        let query = upsert_query(&rows);
        assert_eq!(
            query.sql(),
            "INSERT INTO `spawnpoint` (`id`, `lat`, `lon`, `updated`, `last_seen`, `despawn_sec`) \
             VALUES (?, ?, ?, ?, ?, ?), (?, ?, ?, ?, ?, ?) \
             ON DUPLICATE KEY UPDATE `lat` = VALUES(`lat`), `lon` = VALUES(`lon`), \
             `updated` = VALUES(`updated`), `last_seen` = VALUES(`last_seen`), \
             `despawn_sec` = VALUES(`despawn_sec`)"
        );
    }

    #[test]
    fn first_seen_is_insert_only_for_forts() {
        let rows = vec![PokestopRow::default()];
        let sql = upsert_query(&rows).into_sql();
        assert!(sql.contains("`first_seen_timestamp`, "));
        assert!(!sql.contains("`first_seen_timestamp` = VALUES"));
        assert!(sql.contains("`alternative_quest_expiry` = VALUES(`alternative_quest_expiry`)"));

        let placeholders = sql.matches('?').count();
        assert_eq!(placeholders, PokestopRow::COLUMNS.len());
    }

    #[test]
    fn large_batches_stay_under_placeholder_limit() {
        let per_statement = rows_per_statement::<PokemonRow>();
        assert!(per_statement * PokemonRow::COLUMNS.len() <= MAX_PLACEHOLDERS);
        assert!((per_statement + 1) * PokemonRow::COLUMNS.len() > MAX_PLACEHOLDERS);

        let rows = vec![PokemonRow::default(); per_statement + 1];
        let chunks: Vec<usize> = rows
            .chunks(rows_per_statement::<PokemonRow>())
            .map(|chunk| upsert_query(chunk).into_sql().matches('?').count())
            .collect();
        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().all(|&n| n <= MAX_PLACEHOLDERS));
        assert_eq!(chunks[1], PokemonRow::COLUMNS.len());
    }

    #[test]
    fn bind_counts_match_columns() {
        fn count<T: Upsert + Default>() -> usize {
            let rows = vec![T::default()];
            upsert_query(&rows).into_sql().matches('?').count()
        }
        assert_eq!(count::<PokemonRow>(), PokemonRow::COLUMNS.len());
        assert_eq!(count::<GymRow>(), GymRow::COLUMNS.len());
        assert_eq!(count::<IncidentRow>(), IncidentRow::COLUMNS.len());
        assert_eq!(count::<StationRow>(), StationRow::COLUMNS.len());
        assert_eq!(count::<RouteRow>(), RouteRow::COLUMNS.len());
        assert_eq!(count::<TappableRow>(), TappableRow::COLUMNS.len());
        assert_eq!(count::<WeatherRow>(), WeatherRow::COLUMNS.len());
        assert_eq!(count::<S2CellRow>(), S2CellRow::COLUMNS.len());
    }
}
