// Last known position of every scanning device.

use crate::ttl::TtlMap;
use golbat_common::Location;
use serde::Serialize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceLocation {
    pub latitude: f64,
    pub longitude: f64,
    /// Unix seconds.
    pub last_update: i64,
    pub scan_context: String,
}

pub struct DeviceTracker {
    devices: TtlMap<String, DeviceLocation>,
}

impl DeviceTracker {
    pub fn new(ttl: Duration) -> Self {
        Self {
            devices: TtlMap::new(ttl),
        }
    }

    /// Record a device position. Empty ids and the null island are ignored.
    pub fn update_device_location(&self, device_id: &str, location: Location, scan_context: &str) {
        if device_id.is_empty() || location.is_zero() {
            return;
        }
        self.devices.insert(
            device_id.to_string(),
            DeviceLocation {
                latitude: location.latitude,
                longitude: location.longitude,
                last_update: chrono::Utc::now().timestamp(),
                scan_context: scan_context.to_string(),
            },
        );
    }

    pub fn get(&self, device_id: &str) -> Option<DeviceLocation> {
        self.devices.get(&device_id.to_string())
    }

    /// Visit every live device.
    pub fn iterate(&self, mut f: impl FnMut(&str, &DeviceLocation)) {
        for (id, location) in self.devices.snapshot() {
            f(&id, &location);
        }
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Evict expired devices until cancelled.
    pub async fn run(&self, token: CancellationToken) {
        self.devices.run_sweeper(SWEEP_INTERVAL, token).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn tracks_and_expires_devices() {
        let tracker = DeviceTracker::new(Duration::from_secs(3600));
        tracker.update_device_location("dev1", Location::new(51.5, -0.12), "quest");
        tracker.update_device_location("", Location::new(1.0, 1.0), "");
        tracker.update_device_location("dev2", Location::default(), "");

        let mut seen = Vec::new();
        tracker.iterate(|id, loc| seen.push((id.to_string(), loc.scan_context.clone())));
        assert_eq!(seen, vec![("dev1".to_string(), "quest".to_string())]);

        tokio::time::advance(Duration::from_secs(3601)).await;
        assert!(tracker.get("dev1").is_none());
    }
}
