#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RouteWaypointProto {
    #[prost(string, tag = "1")]
    pub fort_id: String,
    #[prost(double, tag = "2")]
    pub lat_degrees: f64,
    #[prost(double, tag = "3")]
    pub lng_degrees: f64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RoutePoiAnchor {
    #[prost(message, optional, tag = "1")]
    pub anchor: Option<RouteWaypointProto>,
    #[prost(string, tag = "2")]
    pub image_url: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum RouteSubmissionStatus {
    Unset = 0,
    Pending = 1,
    UnderReview = 2,
    Published = 3,
    Decayed = 4,
    Removed = 5,
    Rejected = 6,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RouteSubmissionStatusProto {
    #[prost(enumeration = "RouteSubmissionStatus", tag = "1")]
    pub status: i32,
    #[prost(int64, tag = "2")]
    pub submission_status_update_time_ms: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RouteImageProto {
    #[prost(string, tag = "1")]
    pub image_url: String,
    #[prost(int32, tag = "2")]
    pub border_color: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SharedRouteProto {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(string, tag = "2")]
    pub name: String,
    #[prost(string, tag = "3")]
    pub description: String,
    #[prost(message, optional, tag = "4")]
    pub start_poi: Option<RoutePoiAnchor>,
    #[prost(message, optional, tag = "5")]
    pub end_poi: Option<RoutePoiAnchor>,
    #[prost(int64, tag = "6")]
    pub route_distance_meters: i64,
    #[prost(int64, tag = "7")]
    pub route_duration_seconds: i64,
    #[prost(int64, tag = "8")]
    pub version: i64,
    #[prost(message, repeated, tag = "9")]
    pub route_submission_status: Vec<RouteSubmissionStatusProto>,
    #[prost(bool, tag = "10")]
    pub reversible: bool,
    #[prost(message, optional, tag = "11")]
    pub image: Option<RouteImageProto>,
    #[prost(message, repeated, tag = "12")]
    pub waypoints: Vec<RouteWaypointProto>,
}

impl SharedRouteProto {
    pub fn is_published(&self) -> bool {
        self.route_submission_status
            .iter()
            .any(|s| s.status() == RouteSubmissionStatus::Published)
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RouteMapCellProto {
    #[prost(uint64, tag = "1")]
    pub s2_cell_id: u64,
    #[prost(message, repeated, tag = "2")]
    pub route: Vec<SharedRouteProto>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum GetRoutesStatus {
    Unset = 0,
    Success = 1,
    ErrorUnknown = 2,
}

impl GetRoutesStatus {
    pub fn as_str_name(&self) -> &'static str {
        match self {
            Self::Unset => "UNSET",
            Self::Success => "SUCCESS",
            Self::ErrorUnknown => "ERROR_UNKNOWN",
        }
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetRoutesOutProto {
    #[prost(message, repeated, tag = "1")]
    pub route_map_cell: Vec<RouteMapCellProto>,
    #[prost(enumeration = "GetRoutesStatus", tag = "2")]
    pub status: i32,
}
