// Published routes.

use super::{now_seconds, EntityStore, Tracked};
use golbat_proto::pogo::{RoutePoiAnchor, SharedRouteProto};
use serde::Serialize;
use serde_json::json;
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RouteRow {
    pub id: String,
    pub name: String,
    pub description: String,
    pub distance_meters: i64,
    pub duration_seconds: i64,
    pub start_fort_id: String,
    pub start_lat: f64,
    pub start_lon: f64,
    pub start_image: String,
    pub end_fort_id: String,
    pub end_lat: f64,
    pub end_lon: f64,
    pub end_image: String,
    pub image: String,
    pub image_border_color: i32,
    pub reversible: bool,
    pub version: i64,
    /// JSON encoded waypoint list.
    pub waypoints: String,
    pub updated: i64,
}

impl Tracked for RouteRow {
    fn updated(&self) -> i64 {
        self.updated
    }

    fn set_updated(&mut self, updated: i64) {
        self.updated = updated;
    }
}

fn anchor(poi: Option<&RoutePoiAnchor>) -> (String, f64, f64, String) {
    let Some(poi) = poi else {
        return Default::default();
    };
    let waypoint = poi.anchor.clone().unwrap_or_default();
    (
        waypoint.fort_id,
        waypoint.lat_degrees,
        waypoint.lng_degrees,
        poi.image_url.clone(),
    )
}

impl EntityStore {
    pub async fn update_route(&self, route: &SharedRouteProto) -> Option<RouteRow> {
        let _guard = self.locks.lock_str(&route.id).await;
        let old = self.routes.get(&route.id);

        let (start_fort_id, start_lat, start_lon, start_image) = anchor(route.start_poi.as_ref());
        let (end_fort_id, end_lat, end_lon, end_image) = anchor(route.end_poi.as_ref());
        let waypoints: Vec<_> = route
            .waypoints
            .iter()
            .map(|w| json!({"lat_degrees": w.lat_degrees, "lng_degrees": w.lng_degrees}))
            .collect();
        let image = route.image.clone().unwrap_or_default();

        let mut row = RouteRow {
            id: route.id.clone(),
            name: route.name.clone(),
            description: route.description.clone(),
            distance_meters: route.route_distance_meters,
            duration_seconds: route.route_duration_seconds,
            start_fort_id,
            start_lat,
            start_lon,
            start_image,
            end_fort_id,
            end_lat,
            end_lon,
            end_image,
            image: image.image_url,
            image_border_color: image.border_color,
            reversible: route.reversible,
            version: route.version,
            waypoints: serde_json::Value::from(waypoints).to_string(),
            updated: 0,
        };

        if let Some(old) = &old {
            if old.version > row.version || !row.has_changes(old) {
                return None;
            }
        }
        row.updated = now_seconds();
        self.routes.insert(row.id.clone(), row.clone());
        self.queues
            .route
            .enqueue(row.clone(), old.is_none(), Duration::ZERO);
        Some(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::testing::store;
    use golbat_proto::pogo::RouteWaypointProto;

    fn route(version: i64, name: &str) -> SharedRouteProto {
        SharedRouteProto {
            id: "r1".into(),
            name: name.into(),
            version,
            start_poi: Some(RoutePoiAnchor {
                anchor: Some(RouteWaypointProto {
                    fort_id: "s1".into(),
                    lat_degrees: 1.0,
                    lng_degrees: 2.0,
                }),
                image_url: "http://img".into(),
            }),
            waypoints: vec![RouteWaypointProto::default(); 3],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn older_versions_are_ignored() {
        let (store, _) = store();
        let row = store.update_route(&route(2, "Loop")).await.unwrap();
        assert_eq!(row.start_fort_id, "s1");
        assert_eq!(row.end_fort_id, "");

        assert!(store.update_route(&route(2, "Loop")).await.is_none());
        assert!(store.update_route(&route(1, "Old loop")).await.is_none());
        assert_eq!(store.update_route(&route(3, "New loop")).await.unwrap().name, "New loop");
    }
}
