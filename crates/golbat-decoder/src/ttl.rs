// Expiring key/value map shared by the device tracker, the encounter cache
// and the entity caches.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

struct Slot<V> {
    value: V,
    expires_at: Instant,
}

pub struct TtlMap<K, V> {
    ttl: Duration,
    inner: Mutex<HashMap<K, Slot<V>>>,
}

impl<K, V> TtlMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            inner: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Live value for `key`. Reads do not extend the expiry.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        match inner.get(key) {
            Some(slot) if slot.expires_at > now => Some(slot.value.clone()),
            Some(_) => {
                inner.remove(key);
                None
            }
            None => None,
        }
    }

    /// Insert or replace, resetting the expiry.
    pub fn insert(&self, key: K, value: V) {
        let expires_at = Instant::now() + self.ttl;
        self.inner.lock().insert(key, Slot { value, expires_at });
    }

    /// Mutate the live entry for `key`, creating it with `init` when absent
    /// or expired. An existing entry keeps its expiry.
    pub fn update<R>(&self, key: K, init: impl FnOnce() -> V, f: impl FnOnce(&mut V) -> R) -> R {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        if inner.get(&key).is_some_and(|slot| slot.expires_at <= now) {
            inner.remove(&key);
        }
        let slot = inner.entry(key).or_insert_with(|| Slot {
            value: init(),
            expires_at: now + self.ttl,
        });
        f(&mut slot.value)
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.inner.lock().remove(key).map(|slot| slot.value)
    }

    /// Number of stored entries, expired ones included until the next sweep.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Copy of every live entry.
    pub fn snapshot(&self) -> Vec<(K, V)> {
        let now = Instant::now();
        self.inner
            .lock()
            .iter()
            .filter(|(_, slot)| slot.expires_at > now)
            .map(|(k, slot)| (k.clone(), slot.value.clone()))
            .collect()
    }

    /// Drop expired entries, returning how many were removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        let before = inner.len();
        inner.retain(|_, slot| slot.expires_at > now);
        before - inner.len()
    }

    /// Sweep every `interval` until cancelled.
    pub async fn run_sweeper(&self, interval: Duration, token: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = ticker.tick() => {
                    self.sweep();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn entries_expire_and_reads_do_not_refresh() {
        let map = TtlMap::new(Duration::from_secs(10));
        map.insert("a", 1);
        tokio::time::advance(Duration::from_secs(6)).await;
        assert_eq!(map.get(&"a"), Some(1));
        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(map.get(&"a"), None);
        assert!(map.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn update_keeps_expiry_and_sweep_evicts() {
        let map = TtlMap::new(Duration::from_secs(10));
        map.update("a", || 0, |v| *v += 1);
        tokio::time::advance(Duration::from_secs(8)).await;
        map.update("a", || 0, |v| *v += 1);
        map.insert("b", 5);
        assert_eq!(map.get(&"a"), Some(2));

        tokio::time::advance(Duration::from_secs(3)).await;
        assert_eq!(map.sweep(), 1);
        assert_eq!(map.snapshot(), vec![("b", 5)]);
    }
}
