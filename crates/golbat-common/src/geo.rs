// Locations, named areas and geofence matching
//
// Areas are addressed as `parent/name`. Filters may use `*` for either half:
// `London/*` matches every area under London, a bare `Chelsea` is stored as
// `*/Chelsea` and matches Chelsea under any parent.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.latitude == 0.0 && self.longitude == 0.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AreaName {
    pub parent: String,
    pub name: String,
}

impl AreaName {
    pub fn new(parent: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            parent: parent.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for AreaName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.parent, self.name)
    }
}

/// Parse configured area filters (`"London/*"`, `"London/Chelsea"`, `"Chelsea"`).
pub fn parse_area_names<S: AsRef<str>>(names: &[S]) -> Vec<AreaName> {
    names
        .iter()
        .map(|raw| {
            let raw = raw.as_ref();
            match raw.split_once('/') {
                Some((parent, name)) if !name.contains('/') => AreaName::new(parent, name),
                _ => AreaName::new("*", raw),
            }
        })
        .collect()
}

/// True if any of `areas` is matched by any filter in `filters`.
///
/// A filter with name `*` matches on parent only, a filter with parent `*`
/// matches on name only, otherwise both halves must be equal.
pub fn area_match_with_wildcards(areas: &[AreaName], filters: &[AreaName]) -> bool {
    filters.iter().any(|filter| {
        areas.iter().any(|area| {
            if filter.name == "*" {
                filter.parent == area.parent
            } else if filter.parent == "*" {
                filter.name == area.name
            } else {
                filter.parent == area.parent && filter.name == area.name
            }
        })
    })
}

/// Closed polygon with an area name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geofence {
    pub area: AreaName,
    pub points: Vec<Location>,
}

impl Geofence {
    /// Build a fence, closing the ring if the last point differs from the first.
    pub fn new(area: AreaName, mut points: Vec<Location>) -> Self {
        if let (Some(first), Some(last)) = (points.first().copied(), points.last().copied()) {
            if first != last {
                points.push(first);
            }
        }
        Self { area, points }
    }

    pub fn is_closed(&self) -> bool {
        matches!((self.points.first(), self.points.last()), (Some(a), Some(b)) if a == b)
    }

    /// Ray-casting point in polygon test.
    pub fn contains(&self, point: Location) -> bool {
        if self.points.len() < 4 {
            return false;
        }
        let mut inside = false;
        for edge in self.points.windows(2) {
            let (a, b) = (edge[0], edge[1]);
            let crosses = (a.latitude > point.latitude) != (b.latitude > point.latitude);
            if crosses {
                let lon_at = (b.longitude - a.longitude) * (point.latitude - a.latitude)
                    / (b.latitude - a.latitude)
                    + a.longitude;
                if point.longitude < lon_at {
                    inside = !inside;
                }
            }
        }
        inside
    }
}

/// Set of named fences used to attach areas to entities.
#[derive(Debug, Clone, Default)]
pub struct Geofences {
    fences: Vec<Geofence>,
}

impl Geofences {
    pub fn new(fences: Vec<Geofence>) -> Self {
        Self { fences }
    }

    pub fn is_empty(&self) -> bool {
        self.fences.is_empty()
    }

    pub fn match_areas(&self, point: Location) -> Vec<AreaName> {
        self.fences
            .iter()
            .filter(|fence| fence.contains(point))
            .map(|fence| fence.area.clone())
            .collect()
    }
}
