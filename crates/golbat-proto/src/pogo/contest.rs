use super::PokemonDisplayProto;

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetContestDataProto {
    #[prost(string, tag = "1")]
    pub fort_id: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum ContestStatus {
    Unset = 0,
    Success = 1,
    Error = 2,
}

impl ContestStatus {
    pub fn as_str_name(&self) -> &'static str {
        match self {
            Self::Unset => "UNSET",
            Self::Success => "SUCCESS",
            Self::Error => "ERROR",
        }
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ContestMetricProto {
    #[prost(int32, tag = "1")]
    pub pokemon_metric: i32,
    #[prost(int32, tag = "2")]
    pub ranking_standard: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ContestProto {
    #[prost(string, tag = "1")]
    pub contest_id: String,
    #[prost(int64, tag = "2")]
    pub end_time_ms: i64,
    #[prost(int32, tag = "3")]
    pub focus_pokemon_id: i32,
    #[prost(int32, tag = "4")]
    pub focus_pokemon_form: i32,
    #[prost(int32, tag = "5")]
    pub focus_pokemon_type: i32,
    #[prost(message, optional, tag = "6")]
    pub metric: Option<ContestMetricProto>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ClientContestIncidentProto {
    #[prost(message, repeated, tag = "1")]
    pub contests: Vec<ContestProto>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetContestDataOutProto {
    #[prost(enumeration = "ContestStatus", tag = "1")]
    pub status: i32,
    #[prost(message, optional, tag = "2")]
    pub contest_incident: Option<ClientContestIncidentProto>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetPokemonSizeLeaderboardEntryProto {
    #[prost(string, tag = "1")]
    pub contest_id: String,
    #[prost(string, tag = "2")]
    pub fort_id: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ContestEntryProto {
    #[prost(int32, tag = "1")]
    pub rank: i32,
    #[prost(double, tag = "2")]
    pub score: f64,
    #[prost(int32, tag = "3")]
    pub pokedex_id: i32,
    #[prost(message, optional, tag = "4")]
    pub pokemon_display: Option<PokemonDisplayProto>,
    #[prost(string, tag = "5")]
    pub trainer_name: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetPokemonSizeLeaderboardEntryOutProto {
    #[prost(enumeration = "ContestStatus", tag = "1")]
    pub status: i32,
    #[prost(int32, tag = "2")]
    pub total_entries: i32,
    #[prost(message, repeated, tag = "3")]
    pub contest_entries: Vec<ContestEntryProto>,
}
