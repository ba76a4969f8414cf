// Per-encounter bookkeeping: when an id was first seen in the wild and
// encountered, and which accounts have encountered it.

use crate::ttl::TtlMap;
use std::collections::HashSet;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EncounterRecord {
    pub first_wild: Option<i64>,
    pub first_encounter: Option<i64>,
    pub accounts_seen: HashSet<String>,
}

pub struct EncounterCache {
    entries: TtlMap<u64, EncounterRecord>,
}

impl EncounterCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: TtlMap::new(ttl),
        }
    }

    pub fn get(&self, encounter_id: u64) -> Option<EncounterRecord> {
        self.entries.get(&encounter_id)
    }

    /// Mark `account` as having seen the encounter. Returns true when it had
    /// already been recorded.
    pub fn set_account_seen(&self, encounter_id: u64, account: &str) -> bool {
        self.entries.update(encounter_id, EncounterRecord::default, |record| {
            !record.accounts_seen.insert(account.to_string())
        })
    }

    /// First wild sighting timestamp, recording `timestamp` if none yet.
    pub fn record_wild(&self, encounter_id: u64, timestamp: i64) -> i64 {
        self.entries.update(encounter_id, EncounterRecord::default, |record| {
            *record.first_wild.get_or_insert(timestamp)
        })
    }

    /// First encounter timestamp, recording `timestamp` if none yet.
    pub fn record_encounter(&self, encounter_id: u64, timestamp: i64) -> i64 {
        self.entries.update(encounter_id, EncounterRecord::default, |record| {
            *record.first_encounter.get_or_insert(timestamp)
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub async fn run(&self, token: CancellationToken) {
        self.entries.run_sweeper(Duration::from_secs(60), token).await;
    }
}

impl Default for EncounterCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn account_seen_reports_repeat() {
        let cache = EncounterCache::default();
        assert!(!cache.set_account_seen(42, "alice"));
        assert!(cache.set_account_seen(42, "alice"));
        assert!(!cache.set_account_seen(42, "bob"));
        assert_eq!(cache.get(42).unwrap().accounts_seen.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn first_timestamps_stick_until_expiry() {
        let cache = EncounterCache::new(Duration::from_secs(60));
        assert_eq!(cache.record_wild(1, 100), 100);
        assert_eq!(cache.record_wild(1, 200), 100);
        assert_eq!(cache.record_encounter(1, 150), 150);

        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(cache.get(1).is_none());
        assert_eq!(cache.record_wild(1, 300), 300);
    }
}
