use super::PokemonDisplayProto;

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CharacterDisplayProto {
    #[prost(int32, tag = "1")]
    pub style: i32,
    #[prost(int32, tag = "2")]
    pub character: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PokestopIncidentDisplayProto {
    #[prost(string, tag = "1")]
    pub incident_id: String,
    #[prost(int64, tag = "2")]
    pub incident_start_ms: i64,
    #[prost(int64, tag = "3")]
    pub incident_expiration_ms: i64,
    #[prost(int32, tag = "4")]
    pub incident_display_type: i32,
    #[prost(message, optional, tag = "5")]
    pub character_display: Option<CharacterDisplayProto>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ClientIncidentProto {
    #[prost(string, tag = "1")]
    pub incident_id: String,
    #[prost(string, tag = "2")]
    pub fort_id: String,
    #[prost(message, optional, tag = "3")]
    pub pokestop_display: Option<PokestopIncidentDisplayProto>,
    #[prost(int32, tag = "4")]
    pub current_step: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum StartIncidentStatus {
    Unset = 0,
    Success = 1,
    ErrorNotInRange = 2,
    ErrorIncidentCompleted = 3,
    ErrorIncidentNotFound = 4,
    ErrorPlayerBelowMinLevel = 5,
    Error = 6,
}

impl StartIncidentStatus {
    pub fn as_str_name(&self) -> &'static str {
        match self {
            Self::Unset => "UNSET",
            Self::Success => "SUCCESS",
            Self::ErrorNotInRange => "ERROR_NOT_IN_RANGE",
            Self::ErrorIncidentCompleted => "ERROR_INCIDENT_COMPLETED",
            Self::ErrorIncidentNotFound => "ERROR_INCIDENT_NOT_FOUND",
            Self::ErrorPlayerBelowMinLevel => "ERROR_PLAYER_BELOW_MIN_LEVEL",
            Self::Error => "ERROR",
        }
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StartIncidentOutProto {
    #[prost(enumeration = "StartIncidentStatus", tag = "1")]
    pub status: i32,
    #[prost(message, optional, tag = "2")]
    pub incident: Option<ClientIncidentProto>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct IncidentLookupProto {
    #[prost(string, tag = "1")]
    pub incident_id: String,
    #[prost(string, tag = "2")]
    pub fort_id: String,
    #[prost(double, tag = "3")]
    pub fort_lat: f64,
    #[prost(double, tag = "4")]
    pub fort_lng: f64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct OpenInvasionCombatSessionProto {
    #[prost(message, optional, tag = "1")]
    pub incident_lookup: Option<IncidentLookupProto>,
    #[prost(int32, tag = "2")]
    pub step: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum InvasionStatus {
    Unset = 0,
    Success = 1,
    Error = 2,
    ErrorFortNotFound = 3,
    ErrorIncidentNotFound = 4,
    ErrorStepAlreadyCompleted = 5,
}

impl InvasionStatus {
    pub fn as_str_name(&self) -> &'static str {
        match self {
            Self::Unset => "UNSET",
            Self::Success => "SUCCESS",
            Self::Error => "ERROR",
            Self::ErrorFortNotFound => "ERROR_FORT_NOT_FOUND",
            Self::ErrorIncidentNotFound => "ERROR_INCIDENT_NOT_FOUND",
            Self::ErrorStepAlreadyCompleted => "ERROR_STEP_ALREADY_COMPLETED",
        }
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CombatPokemonProto {
    #[prost(int32, tag = "1")]
    pub pokedex_id: i32,
    #[prost(message, optional, tag = "2")]
    pub pokemon_display: Option<PokemonDisplayProto>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CombatPlayerProto {
    #[prost(message, optional, tag = "1")]
    pub active_pokemon: Option<CombatPokemonProto>,
    #[prost(message, repeated, tag = "2")]
    pub reserve_pokemon: Vec<CombatPokemonProto>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CombatProto {
    #[prost(message, optional, tag = "1")]
    pub opponent: Option<CombatPlayerProto>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct OpenInvasionCombatSessionOutProto {
    #[prost(enumeration = "InvasionStatus", tag = "1")]
    pub status: i32,
    #[prost(message, optional, tag = "2")]
    pub combat: Option<CombatProto>,
}
