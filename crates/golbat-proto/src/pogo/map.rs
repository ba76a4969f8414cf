// GetMapObjects and the objects it carries.

use super::{FortType, PokemonDisplayProto, PokemonProto, Team};
use super::{PokestopIncidentDisplayProto, StationProto};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum GetMapObjectsStatus {
    Unset = 0,
    Success = 1,
    LocationUnset = 2,
    Error = 3,
}

impl GetMapObjectsStatus {
    pub fn as_str_name(&self) -> &'static str {
        match self {
            GetMapObjectsStatus::Unset => "UNSET",
            GetMapObjectsStatus::Success => "SUCCESS",
            GetMapObjectsStatus::LocationUnset => "LOCATION_UNSET",
            GetMapObjectsStatus::Error => "ERROR",
        }
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetMapObjectsOutProto {
    #[prost(message, repeated, tag = "1")]
    pub map_cell: Vec<ClientMapCellProto>,
    #[prost(enumeration = "GetMapObjectsStatus", tag = "2")]
    pub status: i32,
    #[prost(message, repeated, tag = "3")]
    pub client_weather: Vec<ClientWeatherProto>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ClientMapCellProto {
    #[prost(uint64, tag = "1")]
    pub s2_cell_id: u64,
    #[prost(int64, tag = "2")]
    pub as_of_time_ms: i64,
    #[prost(message, repeated, tag = "3")]
    pub fort: Vec<PokemonFortProto>,
    #[prost(message, repeated, tag = "5")]
    pub wild_pokemon: Vec<WildPokemonProto>,
    #[prost(message, repeated, tag = "6")]
    pub nearby_pokemon: Vec<NearbyPokemonProto>,
    #[prost(message, repeated, tag = "7")]
    pub catchable_pokemon: Vec<MapPokemonProto>,
    #[prost(message, repeated, tag = "8")]
    pub stations: Vec<StationProto>,
}

impl ClientMapCellProto {
    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
            && self.fort.is_empty()
            && self.wild_pokemon.is_empty()
            && self.nearby_pokemon.is_empty()
            && self.catchable_pokemon.is_empty()
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RaidInfoProto {
    #[prost(int64, tag = "1")]
    pub raid_seed: i64,
    #[prost(int64, tag = "2")]
    pub raid_spawn_ms: i64,
    #[prost(int64, tag = "3")]
    pub raid_battle_ms: i64,
    #[prost(int64, tag = "4")]
    pub raid_end_ms: i64,
    #[prost(message, optional, tag = "5")]
    pub raid_pokemon: Option<PokemonProto>,
    #[prost(int32, tag = "6")]
    pub raid_level: i32,
    #[prost(bool, tag = "7")]
    pub is_exclusive: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PokemonFortProto {
    #[prost(string, tag = "1")]
    pub fort_id: String,
    #[prost(int64, tag = "2")]
    pub last_modified_ms: i64,
    #[prost(double, tag = "3")]
    pub latitude: f64,
    #[prost(double, tag = "4")]
    pub longitude: f64,
    #[prost(enumeration = "Team", tag = "5")]
    pub team: i32,
    #[prost(int32, tag = "6")]
    pub guard_pokemon_id: i32,
    #[prost(bool, tag = "7")]
    pub enabled: bool,
    #[prost(enumeration = "FortType", tag = "8")]
    pub fort_type: i32,
    #[prost(bool, tag = "9")]
    pub is_ex_raid_eligible: bool,
    #[prost(message, optional, tag = "10")]
    pub raid_info: Option<RaidInfoProto>,
    /// Active lure item ids.
    #[prost(int32, repeated, tag = "11")]
    pub active_fort_modifier: Vec<i32>,
    #[prost(message, repeated, tag = "12")]
    pub pokestop_displays: Vec<PokestopIncidentDisplayProto>,
    #[prost(message, optional, tag = "13")]
    pub active_pokemon: Option<MapPokemonProto>,
    #[prost(string, tag = "14")]
    pub image_url: String,
    #[prost(bool, tag = "15")]
    pub is_ar_scan_eligible: bool,
    #[prost(int32, tag = "16")]
    pub available_slots: i32,
    #[prost(string, tag = "17")]
    pub partner_id: String,
    #[prost(int32, tag = "18")]
    pub power_up_level: i32,
    #[prost(int64, tag = "19")]
    pub lure_expiration_ms: i64,
    #[prost(bool, tag = "20")]
    pub closed: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct WildPokemonProto {
    #[prost(fixed64, tag = "1")]
    pub encounter_id: u64,
    #[prost(int64, tag = "2")]
    pub last_modified_ms: i64,
    #[prost(double, tag = "3")]
    pub latitude: f64,
    #[prost(double, tag = "4")]
    pub longitude: f64,
    #[prost(string, tag = "5")]
    pub spawn_point_id: String,
    #[prost(message, optional, tag = "7")]
    pub pokemon: Option<PokemonProto>,
    /// Milliseconds until despawn; outside 0..=90000 the despawn time is unknown.
    #[prost(int32, tag = "11")]
    pub time_till_hidden_ms: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct NearbyPokemonProto {
    #[prost(int32, tag = "1")]
    pub pokedex_number: i32,
    #[prost(float, tag = "2")]
    pub distance_meters: f32,
    #[prost(fixed64, tag = "3")]
    pub encounter_id: u64,
    #[prost(string, tag = "4")]
    pub fort_id: String,
    #[prost(string, tag = "5")]
    pub fort_image_url: String,
    #[prost(message, optional, tag = "6")]
    pub pokemon_display: Option<PokemonDisplayProto>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MapPokemonProto {
    #[prost(string, tag = "1")]
    pub spawnpoint_id: String,
    #[prost(fixed64, tag = "2")]
    pub encounter_id: u64,
    #[prost(int32, tag = "3")]
    pub pokedex_type_id: i32,
    #[prost(int64, tag = "4")]
    pub expiration_time_ms: i64,
    #[prost(double, tag = "5")]
    pub latitude: f64,
    #[prost(double, tag = "6")]
    pub longitude: f64,
    #[prost(message, optional, tag = "7")]
    pub pokemon_display: Option<PokemonDisplayProto>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DisplayWeatherProto {
    #[prost(int32, tag = "1")]
    pub cloud_level: i32,
    #[prost(int32, tag = "2")]
    pub rain_level: i32,
    #[prost(int32, tag = "3")]
    pub wind_level: i32,
    #[prost(int32, tag = "4")]
    pub snow_level: i32,
    #[prost(int32, tag = "5")]
    pub fog_level: i32,
    #[prost(int32, tag = "6")]
    pub wind_direction: i32,
    #[prost(int32, tag = "7")]
    pub special_effect_level: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GameplayWeatherProto {
    #[prost(int32, tag = "1")]
    pub gameplay_condition: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct WeatherAlertProto {
    #[prost(int32, tag = "1")]
    pub severity: i32,
    #[prost(bool, tag = "2")]
    pub warn_weather: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ClientWeatherProto {
    /// Level-10 S2 cell id.
    #[prost(int64, tag = "1")]
    pub s2_cell_id: i64,
    #[prost(message, optional, tag = "2")]
    pub display_weather: Option<DisplayWeatherProto>,
    #[prost(message, optional, tag = "3")]
    pub gameplay_weather: Option<GameplayWeatherProto>,
    #[prost(message, repeated, tag = "4")]
    pub alerts: Vec<WeatherAlertProto>,
}
