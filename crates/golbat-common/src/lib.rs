//! Shared geographic types for golbat.

pub mod cell;
pub mod geo;

pub use cell::{S2Cell, MAP_CELL_LEVEL, WEATHER_CELL_LEVEL};
pub use geo::{area_match_with_wildcards, parse_area_names, AreaName, Geofence, Geofences, Location};
