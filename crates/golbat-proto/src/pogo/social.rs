// Social RPCs tunnelled through the platform proxy action.

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProxyRequestProto {
    #[prost(uint32, tag = "1")]
    pub action: u32,
    #[prost(string, tag = "2")]
    pub host: String,
    #[prost(bytes = "vec", tag = "3")]
    pub payload: Vec<u8>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum ProxyStatus {
    Unset = 0,
    Completed = 1,
    CompletedAndReassigned = 2,
    ActionNotFound = 3,
    AssignmentError = 4,
    ProxyUnauthorizedError = 5,
    InternalError = 6,
    BadRequest = 7,
    AccessDenied = 8,
    TimeoutError = 9,
    RateLimited = 10,
}

impl ProxyStatus {
    pub fn as_str_name(&self) -> &'static str {
        match self {
            Self::Unset => "UNSET",
            Self::Completed => "COMPLETED",
            Self::CompletedAndReassigned => "COMPLETED_AND_REASSIGNED",
            Self::ActionNotFound => "ACTION_NOT_FOUND",
            Self::AssignmentError => "ASSIGNMENT_ERROR",
            Self::ProxyUnauthorizedError => "PROXY_UNAUTHORIZED_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
            Self::BadRequest => "BAD_REQUEST",
            Self::AccessDenied => "ACCESS_DENIED",
            Self::TimeoutError => "TIMEOUT_ERROR",
            Self::RateLimited => "RATE_LIMITED",
        }
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProxyResponseProto {
    #[prost(enumeration = "ProxyStatus", tag = "1")]
    pub status: i32,
    #[prost(string, tag = "2")]
    pub assigned_host: String,
    #[prost(bytes = "vec", tag = "3")]
    pub payload: Vec<u8>,
}

/// Social actions carried inside a proxy request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum SocialAction {
    Unset = 0,
    SearchPlayer = 10000,
    ListFriendStatus = 10015,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SearchPlayerProto {
    #[prost(string, tag = "1")]
    pub friend_code: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PlayerSummaryProto {
    #[prost(string, tag = "1")]
    pub player_id: String,
    #[prost(string, tag = "2")]
    pub codename: String,
    #[prost(int32, tag = "3")]
    pub level: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SearchPlayerOutProto {
    #[prost(int32, tag = "1")]
    pub result: i32,
    #[prost(message, optional, tag = "2")]
    pub player: Option<PlayerSummaryProto>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ListFriendStatusOutProto {
    #[prost(int32, tag = "1")]
    pub result: i32,
    #[prost(message, repeated, tag = "2")]
    pub friend: Vec<PlayerSummaryProto>,
}
