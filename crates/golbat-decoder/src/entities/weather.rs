// Weather per level-10 S2 cell.

use super::{now_seconds, EntityStore, Tracked};
use golbat_common::S2Cell;
use golbat_proto::pogo::ClientWeatherProto;
use golbat_webhooks::WebhookType;
use serde::Serialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WeatherRow {
    pub id: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub level: i32,
    pub gameplay_condition: i32,
    pub wind_direction: i32,
    pub cloud_level: i32,
    pub rain_level: i32,
    pub wind_level: i32,
    pub snow_level: i32,
    pub fog_level: i32,
    pub special_effect_level: i32,
    pub severity: i32,
    pub warn_weather: bool,
    pub updated: i64,
}

impl Tracked for WeatherRow {
    fn updated(&self) -> i64 {
        self.updated
    }

    fn set_updated(&mut self, updated: i64) {
        self.updated = updated;
    }
}

impl WeatherRow {
    fn webhook(&self) -> serde_json::Value {
        json!({
            "s2_cell_id": self.id,
            "latitude": self.latitude,
            "longitude": self.longitude,
            "gameplay_condition": self.gameplay_condition,
            "wind_direction": self.wind_direction,
            "cloud_level": self.cloud_level,
            "rain_level": self.rain_level,
            "wind_level": self.wind_level,
            "snow_level": self.snow_level,
            "fog_level": self.fog_level,
            "special_effect_level": self.special_effect_level,
            "severity": self.severity,
            "warn_weather": self.warn_weather,
            "updated": self.updated,
        })
    }
}

impl EntityStore {
    /// Weather for one cell, placed at the cell centre.
    pub async fn update_weather(&self, weather: &ClientWeatherProto) -> Option<WeatherRow> {
        let Some(cell) = S2Cell::from_id(weather.s2_cell_id as u64) else {
            debug!("Ignoring weather for invalid cell id {}", weather.s2_cell_id);
            return None;
        };
        let _guard = self.locks.lock(cell.id).await;
        let old = self.weather.get(&weather.s2_cell_id);

        let mut row = old.clone().unwrap_or_default();
        row.id = weather.s2_cell_id;
        row.latitude = cell.center.latitude;
        row.longitude = cell.center.longitude;
        row.level = cell.level;
        if let Some(display) = &weather.display_weather {
            row.cloud_level = display.cloud_level;
            row.rain_level = display.rain_level;
            row.wind_level = display.wind_level;
            row.snow_level = display.snow_level;
            row.fog_level = display.fog_level;
            row.wind_direction = display.wind_direction;
            row.special_effect_level = display.special_effect_level;
        }
        row.gameplay_condition = weather
            .gameplay_weather
            .as_ref()
            .map(|g| g.gameplay_condition)
            .unwrap_or(0);
        let alert = weather.alerts.first();
        row.severity = alert.map(|a| a.severity).unwrap_or(0);
        row.warn_weather = alert.map(|a| a.warn_weather).unwrap_or(false);

        if let Some(old) = &old {
            if !row.has_changes(old) {
                return None;
            }
        }
        row.updated = now_seconds();
        self.weather.insert(row.id, row.clone());

        if old.as_ref().map_or(true, |o| o.gameplay_condition != row.gameplay_condition) {
            self.webhook(WebhookType::Weather, row.webhook(), row.latitude, row.longitude);
        }
        self.queues
            .weather
            .enqueue(row.clone(), old.is_none(), Duration::ZERO);
        Some(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::testing::store;
    use golbat_common::{Location, WEATHER_CELL_LEVEL};
    use golbat_proto::pogo::GameplayWeatherProto;

    fn weather(cell_id: u64, condition: i32, cloud: i32) -> ClientWeatherProto {
        ClientWeatherProto {
            s2_cell_id: cell_id as i64,
            display_weather: Some(golbat_proto::pogo::DisplayWeatherProto {
                cloud_level: cloud,
                ..Default::default()
            }),
            gameplay_weather: Some(GameplayWeatherProto { gameplay_condition: condition }),
            alerts: vec![],
        }
    }

    #[tokio::test]
    async fn webhook_only_when_condition_changes() {
        let (store, hooks) = store();
        let cell = S2Cell::containing(Location::new(51.5, -0.12), WEATHER_CELL_LEVEL);
        store.update_weather(&weather(cell.id, 3, 1)).await.unwrap();
        store.update_weather(&weather(cell.id, 3, 2)).await.unwrap();
        assert!(store.update_weather(&weather(cell.id, 3, 2)).await.is_none());
        store.update_weather(&weather(cell.id, 4, 2)).await.unwrap();

        let hooks = hooks.of(WebhookType::Weather);
        assert_eq!(hooks.len(), 2);
        assert_eq!(hooks[1]["gameplay_condition"], 4);
        assert_eq!(hooks[1]["s2_cell_id"], cell.id as i64);
    }

    #[tokio::test]
    async fn rows_sit_at_their_own_cell_centre() {
        let (store, _) = store();
        let london = S2Cell::containing(Location::new(51.5, -0.12), WEATHER_CELL_LEVEL);
        let paris = S2Cell::containing(Location::new(48.86, 2.35), WEATHER_CELL_LEVEL);
        store.update_weather(&weather(london.id, 1, 0)).await.unwrap();
        store.update_weather(&weather(paris.id, 1, 0)).await.unwrap();

        let row = store.weather(london.id as i64).unwrap();
        assert_eq!(row.level, WEATHER_CELL_LEVEL);
        assert_eq!((row.latitude, row.longitude), (london.center.latitude, london.center.longitude));
        assert!((row.latitude - 51.5).abs() < 0.5);

        let row = store.weather(paris.id as i64).unwrap();
        assert_eq!((row.latitude, row.longitude), (paris.center.latitude, paris.center.longitude));
        assert!((row.longitude - 2.35).abs() < 0.5);
    }

    #[tokio::test]
    async fn invalid_cell_is_ignored() {
        let (store, hooks) = store();
        assert!(store.update_weather(&weather(42, 3, 1)).await.is_none());
        assert!(store.weather(42).is_none());
        assert!(hooks.of(WebhookType::Weather).is_empty());
    }
}
