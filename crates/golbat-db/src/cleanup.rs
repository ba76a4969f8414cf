// Periodic deletion of expired rows.

use crate::api::slot_assignments;
use golbat_config::CleanupConfig;
use sqlx::MySqlPool;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub const CLEANUP_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Pokemon are kept for an hour past their despawn.
const POKEMON_RETENTION_SECS: i64 = 3600;
const DELETE_CHUNK: u64 = 10_000;

async fn delete_in_chunks(pool: &MySqlPool, what: &str, sql: &str) -> u64 {
    let mut total = 0;
    loop {
        match sqlx::query(sql).bind(DELETE_CHUNK).execute(pool).await {
            Ok(result) => {
                total += result.rows_affected();
                if result.rows_affected() < DELETE_CHUNK {
                    break;
                }
            }
            Err(e) => {
                warn!(error = %e, "Cleanup of {} failed", what);
                break;
            }
        }
    }
    total
}

async fn clear_expired_quests(pool: &MySqlPool) -> u64 {
    let mut total = 0;
    for sql in expired_quest_queries() {
        match sqlx::query(&sql).execute(pool).await {
            Ok(result) => total += result.rows_affected(),
            Err(e) => warn!(error = %e, "Cleanup of expired quests failed"),
        }
    }
    total
}

/// One UPDATE per quest slot, each clearing only that slot.
pub(crate) fn expired_quest_queries() -> Vec<String> {
    ["quest", "alternative_quest"]
        .iter()
        .map(|prefix| {
            format!(
                "UPDATE pokestop SET {} WHERE {}_expiry < UNIX_TIMESTAMP()",
                slot_assignments(prefix),
                prefix
            )
        })
        .collect()
}

/// One cleanup pass over everything enabled in `config`.
pub async fn run_once(pool: &MySqlPool, config: &CleanupConfig) {
    if config.pokemon {
        let sql = format!(
            "DELETE FROM pokemon WHERE expire_timestamp < UNIX_TIMESTAMP() - {} LIMIT ?",
            POKEMON_RETENTION_SECS
        );
        let removed = delete_in_chunks(pool, "pokemon", &sql).await;
        info!(removed, "Cleanup: removed expired pokemon");
    }
    if config.incidents {
        let removed = delete_in_chunks(
            pool,
            "incidents",
            "DELETE FROM incident WHERE expiration < UNIX_TIMESTAMP() LIMIT ?",
        )
        .await;
        info!(removed, "Cleanup: removed expired incidents");
    }
    if config.quests {
        let cleared = clear_expired_quests(pool).await;
        info!(cleared, "Cleanup: cleared expired quests");
    }
}

/// Run [`run_once`] every [`CLEANUP_INTERVAL`] until cancelled.
pub async fn run(pool: MySqlPool, config: CleanupConfig, token: CancellationToken) {
    if !config.any_enabled() {
        return;
    }
    let mut ticker = tokio::time::interval(CLEANUP_INTERVAL);
    loop {
        tokio::select! {
            _ = token.cancelled() => return,
            _ = ticker.tick() => run_once(&pool, &config).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expired_queries_touch_only_their_slot() {
        let queries = expired_quest_queries();
        assert_eq!(queries.len(), 2);
        assert!(queries[0].starts_with("UPDATE pokestop SET quest_type = NULL"));
        assert!(!queries[0].contains("alternative_"));
        assert!(queries[0].ends_with("WHERE quest_expiry < UNIX_TIMESTAMP()"));
        assert!(queries[1].starts_with("UPDATE pokestop SET alternative_quest_type = NULL"));
        assert!(queries[1].ends_with("WHERE alternative_quest_expiry < UNIX_TIMESTAMP()"));
    }
}
