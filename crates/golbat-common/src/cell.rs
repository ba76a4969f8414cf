// S2 cell geometry
//
// Map responses only carry cell ids. Level and centre come from the id itself.

use crate::Location;
use s2::cellid::CellID;
use s2::latlng::LatLng;

/// Level of the cells listed in a map response.
pub const MAP_CELL_LEVEL: i32 = 15;
/// Level of the cells weather is reported for.
pub const WEATHER_CELL_LEVEL: i32 = 10;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct S2Cell {
    pub id: u64,
    pub level: i32,
    pub center: Location,
}

impl S2Cell {
    /// `None` when `id` is not a valid cell id.
    pub fn from_id(id: u64) -> Option<Self> {
        let cell = CellID(id);
        if !cell.is_valid() {
            return None;
        }
        let center = LatLng::from(cell);
        Some(Self {
            id,
            level: cell.level() as i32,
            center: Location::new(center.lat.deg(), center.lng.deg()),
        })
    }

    /// The level `level` cell covering `location`.
    pub fn containing(location: Location, level: i32) -> Self {
        let leaf = CellID::from(LatLng::from_degrees(location.latitude, location.longitude));
        let cell = leaf.parent(level.clamp(0, 30) as u64);
        let center = LatLng::from(cell);
        Self {
            id: cell.0,
            level: cell.level() as i32,
            center: Location::new(center.lat.deg(), center.lng.deg()),
        }
    }
}
