// Fort details, fort search (quests), gym info, map forts and raid RSVPs.

use super::{FortType, PokemonFortProto, PokemonProto, Team};

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FortDetailsOutProto {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(enumeration = "Team", tag = "2")]
    pub team: i32,
    #[prost(string, tag = "3")]
    pub name: String,
    #[prost(string, repeated, tag = "4")]
    pub image_url: Vec<String>,
    #[prost(enumeration = "FortType", tag = "5")]
    pub fort_type: i32,
    #[prost(double, tag = "6")]
    pub latitude: f64,
    #[prost(double, tag = "7")]
    pub longitude: f64,
    #[prost(string, tag = "8")]
    pub description: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum FortSearchResult {
    NoResultSet = 0,
    Success = 1,
    OutOfRange = 2,
    InCooldownPeriod = 3,
    InventoryFull = 4,
    ExceededDailyLimit = 5,
    PoiInaccessible = 6,
}

impl FortSearchResult {
    pub fn as_str_name(&self) -> &'static str {
        match self {
            Self::NoResultSet => "NO_RESULT_SET",
            Self::Success => "SUCCESS",
            Self::OutOfRange => "OUT_OF_RANGE",
            Self::InCooldownPeriod => "IN_COOLDOWN_PERIOD",
            Self::InventoryFull => "INVENTORY_FULL",
            Self::ExceededDailyLimit => "EXCEEDED_DAILY_LIMIT",
            Self::PoiInaccessible => "POI_INACCESSIBLE",
        }
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct QuestRewardProto {
    #[prost(int32, tag = "1")]
    pub reward_type: i32,
    #[prost(int32, tag = "2")]
    pub item_id: i32,
    #[prost(int32, tag = "3")]
    pub amount: i32,
    #[prost(int32, tag = "4")]
    pub pokemon_id: i32,
    #[prost(int32, tag = "5")]
    pub form: i32,
    #[prost(bool, tag = "6")]
    pub shiny: bool,
    #[prost(int32, tag = "7")]
    pub stardust: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct QuestConditionProto {
    #[prost(int32, tag = "1")]
    pub condition_type: i32,
    #[prost(int32, repeated, tag = "2")]
    pub values: Vec<i32>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct QuestProto {
    #[prost(int32, tag = "1")]
    pub quest_type: i32,
    #[prost(string, tag = "2")]
    pub template_id: String,
    #[prost(string, tag = "3")]
    pub fort_id: String,
    #[prost(int32, tag = "4")]
    pub goal_target: i32,
    #[prost(message, repeated, tag = "5")]
    pub rewards: Vec<QuestRewardProto>,
    #[prost(message, repeated, tag = "6")]
    pub conditions: Vec<QuestConditionProto>,
    #[prost(string, tag = "7")]
    pub title: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ClientQuestProto {
    #[prost(message, optional, tag = "1")]
    pub quest: Option<QuestProto>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FortSearchOutProto {
    #[prost(enumeration = "FortSearchResult", tag = "1")]
    pub result: i32,
    #[prost(message, optional, tag = "2")]
    pub challenge_quest: Option<ClientQuestProto>,
    #[prost(string, tag = "3")]
    pub fort_id: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GymDefenderProto {
    #[prost(message, optional, tag = "1")]
    pub pokemon: Option<PokemonProto>,
    #[prost(int32, tag = "2")]
    pub cp_now: i32,
    #[prost(int64, tag = "3")]
    pub deployed_ms: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GymStatusAndDefendersProto {
    #[prost(message, optional, tag = "1")]
    pub pokemon_fort_proto: Option<PokemonFortProto>,
    #[prost(message, repeated, tag = "2")]
    pub gym_defender: Vec<GymDefenderProto>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum GymGetInfoResult {
    Unset = 0,
    Success = 1,
    ErrorNotInRange = 2,
    ErrorGymDisabled = 3,
}

impl GymGetInfoResult {
    pub fn as_str_name(&self) -> &'static str {
        match self {
            Self::Unset => "UNSET",
            Self::Success => "SUCCESS",
            Self::ErrorNotInRange => "ERROR_NOT_IN_RANGE",
            Self::ErrorGymDisabled => "ERROR_GYM_DISABLED",
        }
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GymGetInfoOutProto {
    #[prost(message, optional, tag = "1")]
    pub gym_status_and_defenders: Option<GymStatusAndDefendersProto>,
    #[prost(string, tag = "2")]
    pub name: String,
    #[prost(string, tag = "3")]
    pub url: String,
    #[prost(enumeration = "GymGetInfoResult", tag = "4")]
    pub result: i32,
    #[prost(string, tag = "5")]
    pub description: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FortImageProto {
    #[prost(string, tag = "1")]
    pub url: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MapFortProto {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(string, tag = "2")]
    pub name: String,
    #[prost(double, tag = "3")]
    pub latitude: f64,
    #[prost(double, tag = "4")]
    pub longitude: f64,
    #[prost(message, repeated, tag = "5")]
    pub image: Vec<FortImageProto>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum GetMapFortsStatus {
    Unset = 0,
    Success = 1,
    Error = 2,
}

impl GetMapFortsStatus {
    pub fn as_str_name(&self) -> &'static str {
        match self {
            Self::Unset => "UNSET",
            Self::Success => "SUCCESS",
            Self::Error => "ERROR",
        }
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetMapFortsOutProto {
    #[prost(message, repeated, tag = "1")]
    pub fort: Vec<MapFortProto>,
    #[prost(enumeration = "GetMapFortsStatus", tag = "2")]
    pub status: i32,
}

pub mod get_event_rsvps_proto {
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct RaidDetails {
        #[prost(string, tag = "1")]
        pub gym_id: String,
        #[prost(int64, tag = "2")]
        pub raid_seed: i64,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct GmaxBattleDetails {
        #[prost(string, tag = "1")]
        pub station_id: String,
    }

    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum EventDetails {
        #[prost(message, tag = "1")]
        Raid(RaidDetails),
        #[prost(message, tag = "2")]
        GmaxBattle(GmaxBattleDetails),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetEventRsvpsProto {
    #[prost(oneof = "get_event_rsvps_proto::EventDetails", tags = "1, 2")]
    pub event_details: Option<get_event_rsvps_proto::EventDetails>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum RsvpStatus {
    Unset = 0,
    Success = 1,
    ErrorUnknown = 2,
    ErrorNotFound = 3,
}

impl RsvpStatus {
    pub fn as_str_name(&self) -> &'static str {
        match self {
            Self::Unset => "UNSET",
            Self::Success => "SUCCESS",
            Self::ErrorUnknown => "ERROR_UNKNOWN",
            Self::ErrorNotFound => "ERROR_NOT_FOUND",
        }
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RsvpTimeslotProto {
    #[prost(int64, tag = "1")]
    pub timeslot: i64,
    #[prost(int32, tag = "2")]
    pub going_count: i32,
    #[prost(int32, tag = "3")]
    pub maybe_count: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetEventRsvpsOutProto {
    #[prost(enumeration = "RsvpStatus", tag = "1")]
    pub status: i32,
    #[prost(message, repeated, tag = "2")]
    pub rsvp_timeslots: Vec<RsvpTimeslotProto>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RsvpCountDetailsProto {
    #[prost(string, tag = "1")]
    pub location_id: String,
    #[prost(int32, tag = "2")]
    pub going_count: i32,
    #[prost(int32, tag = "3")]
    pub maybe_count: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetEventRsvpCountOutProto {
    #[prost(enumeration = "RsvpStatus", tag = "1")]
    pub status: i32,
    #[prost(message, repeated, tag = "2")]
    pub rsvp_details: Vec<RsvpCountDetailsProto>,
}
