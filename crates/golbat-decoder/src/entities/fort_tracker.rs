// Which forts each map cell listed, and when each fort was last listed.

use std::collections::{HashMap, HashSet};

/// Default for `FortTracker::new` when nothing is configured.
pub const DEFAULT_FORT_STALE_SECONDS: i64 = 60 * 60;

#[derive(Debug)]
pub(crate) struct FortTracker {
    cells: HashMap<u64, HashSet<String>>,
    last_seen: HashMap<String, i64>,
    stale_after: i64,
}

impl FortTracker {
    pub(crate) fn new(stale_after: i64) -> Self {
        Self {
            cells: HashMap::new(),
            last_seen: HashMap::new(),
            stale_after: stale_after.max(0),
        }
    }

    /// Apply a complete listing of `cell_id` at `now` (unix seconds) and
    /// return the forts that have been missing for longer than the stale
    /// threshold. Forts missing for less stay tracked so a later listing can
    /// still retire them.
    pub(crate) fn process_cell(&mut self, cell_id: u64, seen: HashSet<String>, now: i64) -> Vec<String> {
        for id in &seen {
            self.last_seen.insert(id.clone(), now);
        }

        let Some(previous) = self.cells.insert(cell_id, seen) else {
            return Vec::new();
        };

        let mut stale = Vec::new();
        for id in previous {
            if self.cells.get(&cell_id).is_some_and(|c| c.contains(&id)) {
                continue;
            }
            let last_seen = self.last_seen.get(&id).copied().unwrap_or(now);
            if now - last_seen > self.stale_after {
                self.last_seen.remove(&id);
                stale.push(id);
            } else if let Some(cell) = self.cells.get_mut(&cell_id) {
                cell.insert(id);
            }
        }
        stale.sort();
        stale
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(ids: &[&str]) -> HashSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn first_listing_retires_nothing() {
        let mut tracker = FortTracker::new(60);
        assert!(tracker.process_cell(1, ids(&["a"]), 1_000).is_empty());
    }

    #[test]
    fn missing_fort_retired_only_after_threshold() {
        let mut tracker = FortTracker::new(60);
        tracker.process_cell(1, ids(&["a", "b"]), 1_000);

        // one short listing is not enough
        assert!(tracker.process_cell(1, ids(&["a"]), 1_030).is_empty());
        assert!(tracker.process_cell(1, ids(&["a"]), 1_060).is_empty());
        assert_eq!(tracker.process_cell(1, ids(&["a"]), 1_061), vec!["b".to_string()]);

        // retired forts are not reported twice
        assert!(tracker.process_cell(1, ids(&["a"]), 2_000).is_empty());
    }

    #[test]
    fn reappearing_fort_resets_its_clock() {
        let mut tracker = FortTracker::new(60);
        tracker.process_cell(1, ids(&["a", "b"]), 1_000);
        tracker.process_cell(1, ids(&["a"]), 1_050);
        tracker.process_cell(1, ids(&["a", "b"]), 1_100);
        assert!(tracker.process_cell(1, ids(&["a"]), 1_150).is_empty());
        assert_eq!(tracker.process_cell(1, ids(&["a"]), 1_161), vec!["b".to_string()]);
    }

    #[test]
    fn cells_are_independent() {
        let mut tracker = FortTracker::new(0);
        tracker.process_cell(1, ids(&["a"]), 1_000);
        tracker.process_cell(2, ids(&["b"]), 1_000);
        assert!(tracker.process_cell(2, ids(&["b"]), 1_001).is_empty());
        assert_eq!(tracker.process_cell(1, ids(&[]), 1_001), vec!["a".to_string()]);
    }
}
