// Map cells seen by scanners. Written through the accumulator, last seen wins.

use super::EntityStore;
use golbat_common::S2Cell;
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct S2CellRow {
    pub id: u64,
    pub level: i32,
    pub center_lat: f64,
    pub center_lon: f64,
    pub updated: i64,
}

impl EntityStore {
    /// Record every cell id from a map response at `updated` (unix seconds).
    /// Returns how many were accumulated.
    pub fn update_cells(&self, cell_ids: &[u64], updated: i64) -> usize {
        let mut accepted = 0;
        for &id in cell_ids {
            let Some(cell) = S2Cell::from_id(id) else {
                debug!("Ignoring invalid map cell id {}", id);
                continue;
            };
            self.queues.s2cell.accumulate(S2CellRow {
                id,
                level: cell.level,
                center_lat: cell.center.latitude,
                center_lon: cell.center.longitude,
                updated,
            });
            accepted += 1;
        }
        accepted
    }
}

#[cfg(test)]
mod tests {
    use crate::entities::testing::store;
    use golbat_common::{Location, S2Cell, MAP_CELL_LEVEL};

    #[tokio::test]
    async fn repeated_cells_collapse() {
        let (store, _) = store();
        let a = S2Cell::containing(Location::new(1.0, 1.0), MAP_CELL_LEVEL).id;
        let b = S2Cell::containing(Location::new(1.1, 1.0), MAP_CELL_LEVEL).id;
        assert_eq!(store.update_cells(&[a, b, a], 100), 3);
        assert_eq!(store.queues().s2cell.len(), 2);
    }

    #[tokio::test]
    async fn invalid_ids_are_dropped() {
        let (store, _) = store();
        assert_eq!(store.update_cells(&[0, 42], 100), 0);
        assert!(store.queues().s2cell.is_empty());
    }
}
