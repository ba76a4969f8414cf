//! Queries behind the HTTP API.

use crate::DbError;
use golbat_common::Geofence;
use serde_json::{Map, Value};
use sqlx::mysql::MySqlRow;
use sqlx::{Column, MySql, MySqlPool, QueryBuilder, Row, TypeInfo};
use tracing::info;

const UPDATE_CHUNK_SIZE: usize = 500;

const QUEST_COLUMNS: [&str; 8] = [
    "type",
    "timestamp",
    "target",
    "conditions",
    "rewards",
    "template",
    "title",
    "expiry",
];

/// `<prefix>_type = NULL, ...` for one quest slot.
pub(crate) fn slot_assignments(prefix: &str) -> String {
    QUEST_COLUMNS
        .iter()
        .map(|c| format!("{}_{} = NULL", prefix, c))
        .collect::<Vec<_>>()
        .join(", ")
}

fn clear_quest_assignments() -> String {
    format!("{}, {}", slot_assignments("quest"), slot_assignments("alternative_quest"))
}

/// WKT polygon in lon/lat order, as MySQL's `POINT(lon, lat)` expects.
pub fn fence_wkt(fence: &Geofence) -> String {
    let ring: Vec<String> = fence
        .points
        .iter()
        .map(|p| format!("{} {}", p.longitude, p.latitude))
        .collect();
    format!("POLYGON(({}))", ring.join(", "))
}

fn bounds(fence: &Geofence) -> (f64, f64, f64, f64) {
    fence.points.iter().fold(
        (f64::MAX, f64::MAX, f64::MIN, f64::MIN),
        |(min_lat, min_lon, max_lat, max_lon), p| {
            (
                min_lat.min(p.latitude),
                min_lon.min(p.longitude),
                max_lat.max(p.latitude),
                max_lon.max(p.longitude),
            )
        },
    )
}

fn clear_quests_query(ids: &[String]) -> QueryBuilder<'_, MySql> {
    let mut query = QueryBuilder::new(format!("UPDATE pokestop SET {} WHERE id IN (", clear_quest_assignments()));
    let mut separated = query.separated(", ");
    for id in ids {
        separated.push_bind(id.as_str());
    }
    separated.push_unseparated(")");
    query
}

/// Clear both quest slots of every enabled pokestop inside `fence`.
/// Returns the number of rows changed.
pub async fn clear_quests(pool: &MySqlPool, fence: &Geofence) -> Result<u64, DbError> {
    if fence.points.len() < 4 {
        return Err(DbError::InvalidFence(fence.points.len().saturating_sub(1)));
    }
    let (min_lat, min_lon, max_lat, max_lon) = bounds(fence);

    let ids: Vec<String> = sqlx::query_scalar(
        "SELECT id FROM pokestop \
         WHERE lat >= ? AND lon >= ? AND lat <= ? AND lon <= ? AND enabled = 1 \
         AND ST_CONTAINS(ST_GeomFromText(?), POINT(lon, lat))",
    )
    .bind(min_lat)
    .bind(min_lon)
    .bind(max_lat)
    .bind(max_lon)
    .bind(fence_wkt(fence))
    .fetch_all(pool)
    .await
    .map_err(DbError::query("select quest pokestops"))?;

    let mut cleared = 0;
    for chunk in ids.chunks(UPDATE_CHUNK_SIZE) {
        let result = clear_quests_query(chunk)
            .build()
            .execute(pool)
            .await
            .map_err(DbError::query("clear quests"))?;
        cleared += result.rows_affected();
    }
    info!(pokestops = ids.len(), cleared, "Cleared quests in fence");
    Ok(cleared)
}

fn column_value(row: &MySqlRow, index: usize) -> Value {
    let type_name = row.columns()[index].type_info().name().to_ascii_uppercase();
    let base = type_name.split_whitespace().next().unwrap_or_default();
    let unsigned = type_name.ends_with("UNSIGNED");

    let value = match base {
        "BOOLEAN" => row.try_get::<Option<bool>, _>(index).map(|v| v.map(Value::from)),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" if unsigned => {
            row.try_get::<Option<u64>, _>(index).map(|v| v.map(Value::from))
        }
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => {
            row.try_get::<Option<i64>, _>(index).map(|v| v.map(Value::from))
        }
        "FLOAT" | "DOUBLE" => row.try_get::<Option<f64>, _>(index).map(|v| v.map(Value::from)),
        _ => row.try_get::<Option<String>, _>(index).map(|v| v.map(Value::from)),
    };
    value.ok().flatten().unwrap_or(Value::Null)
}

/// Run a caller supplied query and render each row as a JSON object keyed by
/// column name. At most `max_results` rows are returned.
pub async fn query_rows(pool: &MySqlPool, sql: &str, max_results: usize) -> Result<Vec<Value>, DbError> {
    let rows = sqlx::query(sql)
        .fetch_all(pool)
        .await
        .map_err(DbError::query("query passthrough"))?;

    Ok(rows
        .iter()
        .take(max_results)
        .map(|row| {
            let object: Map<String, Value> = row
                .columns()
                .iter()
                .map(|c| (c.name().to_string(), column_value(row, c.ordinal())))
                .collect();
            Value::Object(object)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use golbat_common::{AreaName, Location};

    fn square() -> Geofence {
        Geofence::new(
            AreaName::new("", "fence"),
            vec![
                Location::new(1.0, 10.0),
                Location::new(2.0, 10.0),
                Location::new(2.0, 11.0),
                Location::new(1.0, 11.0),
            ],
        )
    }

    #[test]
    fn wkt_is_lon_lat_and_closed() {
        assert_eq!(
            fence_wkt(&square()),
            "POLYGON((10 1, 10 2, 11 2, 11 1, 10 1))"
        );
        assert_eq!(bounds(&square()), (1.0, 10.0, 2.0, 11.0));
    }

    #[test]
    fn clear_query_nulls_both_slots() {
        let ids = vec!["a".to_string(), "b".to_string()];
        let sql = clear_quests_query(&ids).into_sql();
        assert!(sql.starts_with("UPDATE pokestop SET quest_type = NULL, quest_timestamp = NULL"));
        assert!(sql.contains("alternative_quest_expiry = NULL WHERE id IN (?, ?)"));
    }
}
