//! Method dispatch.
//!
//! Every record is looked up in a static method table, gated on the trainer
//! level, and handed to its handler under a per-record timeout. Handler
//! failures end here as metrics and log lines; nothing propagates back to the
//! submitter.

use crate::device_tracker::DeviceTracker;
use crate::entities::EntityStore;
use crate::handlers::{
    contests, encounters, forts, gmo, invasions, routes, social, stations, tappables, HandlerContext,
    HandlerResult, Outcome,
};
use crate::raw::{PogoProto, ProtoGroup};
use crate::scan::ScanRules;
use golbat_proto::pogo::{Method, INTERNAL_PROXY_SOCIAL_ACTION};
use golbat_stats::{DecodeKind, SharedStats};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Handler {
    StartIncident,
    OpenInvasion,
    FortDetails,
    Gmo,
    GymInfo,
    Encounter,
    DiskEncounter,
    Quest,
    SocialAction,
    GetMapForts,
    Routes,
    ContestData,
    ContestEntry,
    StationDetails,
    Tappable,
    EventRsvps,
    EventRsvpCount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RouteEntry {
    handler: Handler,
    kind: DecodeKind,
    min_level: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lookup {
    Handle(RouteEntry),
    Ignore,
    Unknown,
}

const fn entry(handler: Handler, kind: DecodeKind, min_level: i32) -> Lookup {
    Lookup::Handle(RouteEntry {
        handler,
        kind,
        min_level,
    })
}

fn lookup(method: i32) -> Lookup {
    if method == INTERNAL_PROXY_SOCIAL_ACTION {
        return entry(Handler::SocialAction, DecodeKind::SocialAction, 0);
    }
    let Some(method) = Method::from_code(method) else {
        return Lookup::Unknown;
    };
    match method {
        Method::StartIncident => entry(Handler::StartIncident, DecodeKind::StartIncident, 30),
        Method::InvasionOpenCombatSession => entry(Handler::OpenInvasion, DecodeKind::OpenInvasion, 30),
        Method::FortDetails => entry(Handler::FortDetails, DecodeKind::FortDetails, 30),
        Method::GetMapObjects => entry(Handler::Gmo, DecodeKind::Gmo, 30),
        Method::GymGetInfo => entry(Handler::GymInfo, DecodeKind::GymGetInfo, 30),
        Method::Encounter => entry(Handler::Encounter, DecodeKind::Encounter, 30),
        Method::DiskEncounter => entry(Handler::DiskEncounter, DecodeKind::DiskEncounter, 30),
        Method::FortSearch => entry(Handler::Quest, DecodeKind::Quest, 10),
        Method::GetMapForts => entry(Handler::GetMapForts, DecodeKind::GetMapForts, 10),
        Method::GetRoutes => entry(Handler::Routes, DecodeKind::Routes, 30),
        Method::GetContestData => entry(Handler::ContestData, DecodeKind::Contest, 10),
        Method::GetPokemonSizeContestEntry => entry(Handler::ContestEntry, DecodeKind::Contest, 10),
        Method::GetStationDetails => entry(Handler::StationDetails, DecodeKind::StationDetails, 10),
        Method::ProcessTappable => entry(Handler::Tappable, DecodeKind::Tappable, 30),
        Method::GetEventRsvps => entry(Handler::EventRsvps, DecodeKind::EventRsvp, 10),
        Method::GetEventRsvpCount => entry(Handler::EventRsvpCount, DecodeKind::EventRsvp, 10),
        Method::GetPlayer | Method::GetHoloholoInventory | Method::CreateCombatChallenge => Lookup::Ignore,
    }
}

/// Metric name for a method code: the enum name without its `METHOD_`
/// prefix, or `#<code>` when unknown.
pub fn method_name(method: i32) -> String {
    if method == INTERNAL_PROXY_SOCIAL_ACTION {
        return "PROXY_SOCIAL_ACTION".to_string();
    }
    match Method::from_code(method) {
        Some(m) => {
            let name = m.as_str_name();
            name.strip_prefix("METHOD_").unwrap_or(name).to_string()
        }
        None => format!("#{}", method),
    }
}

pub struct Decoder {
    store: Arc<EntityStore>,
    scan_rules: Arc<ScanRules>,
    devices: Arc<DeviceTracker>,
    stats: SharedStats,
    timeout: Duration,
}

impl Decoder {
    pub fn new(
        store: Arc<EntityStore>,
        scan_rules: Arc<ScanRules>,
        devices: Arc<DeviceTracker>,
        stats: SharedStats,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            scan_rules,
            devices,
            stats,
            timeout,
        }
    }

    pub fn store(&self) -> &Arc<EntityStore> {
        &self.store
    }

    pub fn devices(&self) -> &Arc<DeviceTracker> {
        &self.devices
    }

    /// Record the submitting device and process the group in the background,
    /// one record after another.
    pub fn spawn_group(self: &Arc<Self>, group: ProtoGroup) -> Option<JoinHandle<()>> {
        let last = group.last()?;
        self.devices
            .update_device_location(last.device_id(), group.last_location(), last.scan_context());

        let decoder = Arc::clone(self);
        Some(tokio::spawn(async move { decoder.decode_group(&group).await }))
    }

    pub async fn decode_group(&self, group: &ProtoGroup) {
        for proto in &group.protos {
            self.decode(proto).await;
        }
    }

    /// Dispatch one record. Returns the handler outcome, or `None` when the
    /// record was ignored, gated or failed.
    pub async fn decode(&self, proto: &PogoProto) -> Option<Outcome> {
        let route = match lookup(proto.method) {
            Lookup::Handle(route) => route,
            Lookup::Ignore => return None,
            Lookup::Unknown => {
                debug!("Did not know hook type {}", proto.method);
                return None;
            }
        };

        let method = method_name(proto.method);
        if proto.level() < route.min_level {
            debug!(
                "Insufficient Level {} Did not process hook type {}",
                proto.level(),
                method
            );
            self.stats.inc_decode_methods("error", "low_level", &method);
            return None;
        }

        let cx = HandlerContext {
            store: &self.store,
            stats: self.stats.as_ref(),
            scan: self.scan_rules.find(proto.scan_context(), proto.location),
        };

        let result = match tokio::time::timeout(self.timeout, run(route.handler, &cx, proto)).await {
            Ok(result) => result,
            Err(_) => {
                debug!("{}/{} {} - timed out", proto.device_id(), proto.account(), method);
                self.stats.inc_decode(route.kind, "error", "timeout");
                self.stats.inc_decode_methods("error", "timeout", &method);
                return None;
            }
        };

        match result {
            Ok(outcome) => {
                if outcome.is_processed() {
                    self.stats.inc_decode(route.kind, "ok", "");
                    self.stats.inc_decode_methods("ok", "", &method);
                    debug!(
                        "{}/{} {} - {}",
                        proto.device_id(),
                        proto.account(),
                        method,
                        outcome.message()
                    );
                } else {
                    self.stats.inc_decode_methods("unprocessed", "", &method);
                    debug!(
                        "{}/{} {} - **Did not process** {}",
                        proto.device_id(),
                        proto.account(),
                        method,
                        outcome.message()
                    );
                }
                Some(outcome)
            }
            Err(e) => {
                let label = e.metric_label();
                self.stats.inc_decode(route.kind, "error", label);
                self.stats.inc_decode_methods("error", label, &method);
                debug!(
                    "{}/{} {} - **Did not process** {}",
                    proto.device_id(),
                    proto.account(),
                    method,
                    e
                );
                None
            }
        }
    }
}

async fn run(handler: Handler, cx: &HandlerContext<'_>, proto: &PogoProto) -> HandlerResult {
    match handler {
        Handler::StartIncident => invasions::handle_start_incident(cx, proto).await,
        Handler::OpenInvasion => invasions::handle_open_invasion(cx, proto).await,
        Handler::FortDetails => forts::handle_fort_details(cx, proto).await,
        Handler::Gmo => gmo::handle(cx, proto).await,
        Handler::GymInfo => forts::handle_gym_info(cx, proto).await,
        Handler::Encounter => encounters::handle_encounter(cx, proto).await,
        Handler::DiskEncounter => encounters::handle_disk_encounter(cx, proto).await,
        Handler::Quest => forts::handle_quest(cx, proto).await,
        Handler::SocialAction => social::handle(proto).await,
        Handler::GetMapForts => forts::handle_get_map_forts(cx, proto).await,
        Handler::Routes => routes::handle(cx, proto).await,
        Handler::ContestData => contests::handle_contest_data(cx, proto).await,
        Handler::ContestEntry => contests::handle_contest_entry(cx, proto).await,
        Handler::StationDetails => stations::handle(cx, proto).await,
        Handler::Tappable => tappables::handle(cx, proto).await,
        Handler::EventRsvps => forts::handle_event_rsvps(cx, proto).await,
        Handler::EventRsvpCount => forts::handle_event_rsvp_count(cx, proto).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::testing::store;
    use crate::handlers::testing::record;
    use crate::raw::Payload;
    use golbat_proto::pogo::{GetMapObjectsOutProto, GetMapObjectsStatus, GetRoutesOutProto, GetRoutesStatus};
    use golbat_stats::StatsCollector;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingStats {
        methods: Mutex<Vec<(String, String, String)>>,
        decodes: Mutex<Vec<(DecodeKind, String, String)>>,
    }

    impl StatsCollector for RecordingStats {
        fn inc_decode_methods(&self, status: &str, message: &str, method: &str) {
            self.methods
                .lock()
                .push((status.into(), message.into(), method.into()));
        }

        fn inc_decode(&self, kind: DecodeKind, status: &str, message: &str) {
            self.decodes.lock().push((kind, status.into(), message.into()));
        }
    }

    fn decoder() -> (Decoder, Arc<RecordingStats>) {
        let (store, _) = store();
        let stats = Arc::new(RecordingStats::default());
        let decoder = Decoder::new(
            Arc::new(store),
            Arc::new(ScanRules::default()),
            Arc::new(DeviceTracker::new(Duration::from_secs(3600))),
            stats.clone(),
            Duration::from_secs(5),
        );
        (decoder, stats)
    }

    fn methods(stats: &RecordingStats) -> Vec<(String, String, String)> {
        stats.methods.lock().clone()
    }

    fn row(status: &str, message: &str, method: &str) -> (String, String, String) {
        (status.into(), message.into(), method.into())
    }

    #[test]
    fn method_names_drop_prefix() {
        assert_eq!(method_name(Method::GetMapObjects.code()), "GET_MAP_OBJECTS");
        assert_eq!(method_name(INTERNAL_PROXY_SOCIAL_ACTION), "PROXY_SOCIAL_ACTION");
        assert_eq!(method_name(4242), "#4242");
    }

    #[test]
    fn table_levels() {
        let level = |m: Method| match lookup(m.code()) {
            Lookup::Handle(route) => route.min_level,
            other => panic!("{:?} not routed: {:?}", m, other),
        };
        assert_eq!(level(Method::GetMapObjects), 30);
        assert_eq!(level(Method::FortSearch), 10);
        assert_eq!(level(Method::GetStationDetails), 10);
        assert_eq!(lookup(Method::GetPlayer.code()), Lookup::Ignore);
        assert_eq!(lookup(1), Lookup::Unknown);
    }

    #[tokio::test]
    async fn low_level_is_gated() {
        let (decoder, stats) = decoder();
        let gmo = GetMapObjectsOutProto {
            status: GetMapObjectsStatus::Success as i32,
            ..Default::default()
        };
        let mut proto = record::<_, GetMapObjectsOutProto>(Method::GetMapObjects.code(), &gmo, None);
        proto.metadata.level = 29;

        assert_eq!(decoder.decode(&proto).await, None);
        assert_eq!(methods(&stats), vec![row("error", "low_level", "GET_MAP_OBJECTS")]);
        assert!(stats.decodes.lock().is_empty());
    }

    #[tokio::test]
    async fn outcomes_are_labelled() {
        let (decoder, stats) = decoder();

        let empty_gmo = GetMapObjectsOutProto {
            status: GetMapObjectsStatus::Success as i32,
            ..Default::default()
        };
        let proto = record::<_, GetMapObjectsOutProto>(Method::GetMapObjects.code(), &empty_gmo, None);
        let outcome = decoder.decode(&proto).await.unwrap();
        assert!(!outcome.is_processed());

        let routes = GetRoutesOutProto {
            status: GetRoutesStatus::Success as i32,
            route_map_cell: vec![],
        };
        let proto = record::<_, GetRoutesOutProto>(Method::GetRoutes.code(), &routes, None);
        assert!(decoder.decode(&proto).await.unwrap().is_processed());

        let mut broken = record::<_, GetRoutesOutProto>(Method::FortDetails.code(), &routes, None);
        broken.response = Payload::Binary(vec![0xff, 0xff, 0xff]);
        assert_eq!(decoder.decode(&broken).await, None);

        assert_eq!(
            methods(&stats),
            vec![
                row("unprocessed", "", "GET_MAP_OBJECTS"),
                row("ok", "", "GET_ROUTES"),
                row("error", "parse", "FORT_DETAILS"),
            ]
        );
        assert_eq!(
            *stats.decodes.lock(),
            vec![
                (DecodeKind::Routes, "ok".to_string(), String::new()),
                (DecodeKind::FortDetails, "error".to_string(), "parse".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn ignored_and_unknown_methods_leave_no_metrics() {
        let (decoder, stats) = decoder();
        let gmo = GetMapObjectsOutProto::default();
        for method in [Method::GetPlayer.code(), 777] {
            let proto = record::<_, GetMapObjectsOutProto>(method, &gmo, None);
            assert_eq!(decoder.decode(&proto).await, None);
        }
        assert!(methods(&stats).is_empty());
    }

    #[tokio::test]
    async fn spawned_group_updates_device_tracker() {
        let (decoder, _) = decoder();
        let decoder = Arc::new(decoder);
        let gmo = GetMapObjectsOutProto::default();
        let proto = record::<_, GetMapObjectsOutProto>(Method::GetPlayer.code(), &gmo, None);

        let handle = decoder.spawn_group(ProtoGroup::new(vec![proto])).unwrap();
        handle.await.unwrap();

        let device = decoder.devices().get("dev").unwrap();
        assert_eq!(device.latitude, 1.0);
        assert_eq!(device.longitude, 2.0);
        assert!(decoder.spawn_group(ProtoGroup::default()).is_none());
    }
}
