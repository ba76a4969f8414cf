//! Game protocol messages.
//!
//! Only the methods the decoder handles are modelled, and only the fields the
//! entity updaters read. Unknown fields on the wire are skipped by prost.

mod contest;
mod encounter;
mod fort;
mod incident;
mod map;
mod route;
mod social;
mod station;
mod tappable;

pub use contest::*;
pub use encounter::*;
pub use fort::*;
pub use incident::*;
pub use map::*;
pub use route::*;
pub use social::*;
pub use station::*;
pub use tappable::*;

/// Client RPC method codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Method {
    GetPlayer,
    GetHoloholoInventory,
    FortSearch,
    Encounter,
    FortDetails,
    GetMapObjects,
    DiskEncounter,
    GymGetInfo,
    CreateCombatChallenge,
    StartIncident,
    InvasionOpenCombatSession,
    GetMapForts,
    GetRoutes,
    ProcessTappable,
    GetPokemonSizeContestEntry,
    GetContestData,
    GetEventRsvps,
    GetEventRsvpCount,
    GetStationDetails,
}

impl Method {
    const ALL: [Method; 19] = [
        Method::GetPlayer,
        Method::GetHoloholoInventory,
        Method::FortSearch,
        Method::Encounter,
        Method::FortDetails,
        Method::GetMapObjects,
        Method::DiskEncounter,
        Method::GymGetInfo,
        Method::CreateCombatChallenge,
        Method::StartIncident,
        Method::InvasionOpenCombatSession,
        Method::GetMapForts,
        Method::GetRoutes,
        Method::ProcessTappable,
        Method::GetPokemonSizeContestEntry,
        Method::GetContestData,
        Method::GetEventRsvps,
        Method::GetEventRsvpCount,
        Method::GetStationDetails,
    ];

    pub const fn code(self) -> i32 {
        match self {
            Method::GetPlayer => 2,
            Method::GetHoloholoInventory => 4,
            Method::FortSearch => 101,
            Method::Encounter => 102,
            Method::FortDetails => 104,
            Method::GetMapObjects => 106,
            Method::DiskEncounter => 145,
            Method::GymGetInfo => 156,
            Method::CreateCombatChallenge => 1000,
            Method::StartIncident => 1200,
            Method::InvasionOpenCombatSession => 1201,
            Method::GetMapForts => 1300,
            Method::GetRoutes => 1405,
            Method::ProcessTappable => 1408,
            Method::GetPokemonSizeContestEntry => 2104,
            Method::GetContestData => 2105,
            Method::GetEventRsvps => 3031,
            Method::GetEventRsvpCount => 3034,
            Method::GetStationDetails => 3700,
        }
    }

    pub fn from_code(code: i32) -> Option<Method> {
        Method::ALL.iter().copied().find(|m| m.code() == code)
    }

    pub const fn as_str_name(self) -> &'static str {
        match self {
            Method::GetPlayer => "METHOD_GET_PLAYER",
            Method::GetHoloholoInventory => "METHOD_GET_HOLOHOLO_INVENTORY",
            Method::FortSearch => "METHOD_FORT_SEARCH",
            Method::Encounter => "METHOD_ENCOUNTER",
            Method::FortDetails => "METHOD_FORT_DETAILS",
            Method::GetMapObjects => "METHOD_GET_MAP_OBJECTS",
            Method::DiskEncounter => "METHOD_DISK_ENCOUNTER",
            Method::GymGetInfo => "METHOD_GYM_GET_INFO",
            Method::CreateCombatChallenge => "METHOD_CREATE_COMBAT_CHALLENGE",
            Method::StartIncident => "METHOD_START_INCIDENT",
            Method::InvasionOpenCombatSession => "METHOD_INVASION_OPEN_COMBAT_SESSION",
            Method::GetMapForts => "METHOD_GET_MAP_FORTS",
            Method::GetRoutes => "METHOD_GET_ROUTES",
            Method::ProcessTappable => "METHOD_PROCESS_TAPPABLE",
            Method::GetPokemonSizeContestEntry => "METHOD_GET_POKEMON_SIZE_CONTEST_ENTRY",
            Method::GetContestData => "METHOD_GET_CONTEST_DATA",
            Method::GetEventRsvps => "METHOD_GET_EVENT_RSVPS",
            Method::GetEventRsvpCount => "METHOD_GET_EVENT_RSVP_COUNT",
            Method::GetStationDetails => "METHOD_GET_STATION_DETAILS",
        }
    }
}

/// Platform-client action carrying social RPCs. Not part of [`Method`].
pub const INTERNAL_PROXY_SOCIAL_ACTION: i32 = 5012;

/// Quest id reported in `quests_held` while the AR mapping task is active.
pub const QUEST_GEOTARGETED_AR_SCAN: i64 = 22;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum FortType {
    Gym = 0,
    Checkpoint = 1,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum Team {
    Unset = 0,
    Blue = 1,
    Red = 2,
    Yellow = 3,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PokemonDisplayProto {
    #[prost(int32, tag = "1")]
    pub costume: i32,
    #[prost(int32, tag = "2")]
    pub gender: i32,
    #[prost(bool, tag = "3")]
    pub shiny: bool,
    #[prost(int32, tag = "4")]
    pub form: i32,
    #[prost(int32, tag = "5")]
    pub weather_boosted_condition: i32,
    #[prost(int32, tag = "6")]
    pub alignment: i32,
    #[prost(int64, tag = "20")]
    pub display_id: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PokemonProto {
    #[prost(fixed64, tag = "1")]
    pub id: u64,
    #[prost(int32, tag = "2")]
    pub pokemon_id: i32,
    #[prost(int32, tag = "3")]
    pub cp: i32,
    #[prost(int32, tag = "4")]
    pub stamina: i32,
    #[prost(int32, tag = "5")]
    pub max_stamina: i32,
    #[prost(int32, tag = "6")]
    pub move1: i32,
    #[prost(int32, tag = "7")]
    pub move2: i32,
    #[prost(float, tag = "11")]
    pub height_m: f32,
    #[prost(float, tag = "12")]
    pub weight_kg: f32,
    #[prost(int32, tag = "22")]
    pub individual_attack: i32,
    #[prost(int32, tag = "23")]
    pub individual_defense: i32,
    #[prost(int32, tag = "24")]
    pub individual_stamina: i32,
    #[prost(float, tag = "25")]
    pub cp_multiplier: f32,
    #[prost(message, optional, tag = "34")]
    pub pokemon_display: Option<PokemonDisplayProto>,
    #[prost(int32, tag = "35")]
    pub size: i32,
}
