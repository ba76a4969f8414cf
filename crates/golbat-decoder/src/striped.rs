use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use tokio::sync::{Mutex, MutexGuard};

pub const DEFAULT_STRIPES: usize = 1024;

/// Fixed set of locks selected by `key % stripes`. Serializes updates to the
/// same entity without a lock per entity.
pub struct StripedMutex {
    stripes: Vec<Mutex<()>>,
}

impl StripedMutex {
    pub fn new(stripes: usize) -> Self {
        let stripes = stripes.max(1);
        Self {
            stripes: (0..stripes).map(|_| Mutex::new(())).collect(),
        }
    }

    pub fn stripe_count(&self) -> usize {
        self.stripes.len()
    }

    pub fn stripe_index(&self, key: u64) -> usize {
        (key % self.stripes.len() as u64) as usize
    }

    pub async fn lock(&self, key: u64) -> MutexGuard<'_, ()> {
        self.stripes[self.stripe_index(key)].lock().await
    }

    pub async fn lock_str(&self, key: &str) -> MutexGuard<'_, ()> {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        self.lock(hasher.finish()).await
    }
}

impl Default for StripedMutex {
    fn default() -> Self {
        Self::new(DEFAULT_STRIPES)
    }
}
