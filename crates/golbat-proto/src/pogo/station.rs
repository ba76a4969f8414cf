use super::PokemonDisplayProto;

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BreadBattleDetailProto {
    #[prost(int32, tag = "1")]
    pub battle_level: i32,
    #[prost(message, optional, tag = "2")]
    pub pokemon: Option<super::PokemonProto>,
    #[prost(int64, tag = "3")]
    pub battle_window_start_ms: i64,
    #[prost(int64, tag = "4")]
    pub battle_window_end_ms: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StationProto {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(string, tag = "2")]
    pub name: String,
    #[prost(double, tag = "3")]
    pub lat: f64,
    #[prost(double, tag = "4")]
    pub lng: f64,
    #[prost(int64, tag = "5")]
    pub start_time_ms: i64,
    #[prost(int64, tag = "6")]
    pub end_time_ms: i64,
    #[prost(int64, tag = "7")]
    pub cooldown_complete_ms: i64,
    #[prost(bool, tag = "8")]
    pub is_inactive: bool,
    #[prost(message, optional, tag = "9")]
    pub battle_details: Option<BreadBattleDetailProto>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetStationedPokemonDetailsProto {
    #[prost(string, tag = "1")]
    pub station_id: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum GetStationedPokemonDetailsResult {
    Unset = 0,
    Success = 1,
    StationNotFound = 2,
    Error = 3,
}

impl GetStationedPokemonDetailsResult {
    pub fn as_str_name(&self) -> &'static str {
        match self {
            Self::Unset => "UNSET",
            Self::Success => "SUCCESS",
            Self::StationNotFound => "STATION_NOT_FOUND",
            Self::Error => "ERROR",
        }
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StationedPokemonProto {
    #[prost(int32, tag = "1")]
    pub pokemon_id: i32,
    #[prost(message, optional, tag = "2")]
    pub pokemon_display: Option<PokemonDisplayProto>,
    #[prost(string, tag = "3")]
    pub trainer_name: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetStationedPokemonDetailsOutProto {
    #[prost(enumeration = "GetStationedPokemonDetailsResult", tag = "1")]
    pub result: i32,
    #[prost(message, repeated, tag = "2")]
    pub stationed_pokemons: Vec<StationedPokemonProto>,
    #[prost(int32, tag = "3")]
    pub total_num_stationed_pokemon: i32,
}
