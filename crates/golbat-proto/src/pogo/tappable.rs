use super::WildPokemonProto;

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProcessTappableProto {
    #[prost(fixed64, tag = "1")]
    pub encounter_id: u64,
    #[prost(double, tag = "2")]
    pub location_hint_lat: f64,
    #[prost(double, tag = "3")]
    pub location_hint_lng: f64,
    #[prost(string, tag = "4")]
    pub fort_id: String,
    #[prost(string, tag = "5")]
    pub spawnpoint_id: String,
    #[prost(int32, tag = "6")]
    pub tappable_type_id: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum ProcessTappableStatus {
    Unset = 0,
    Success = 1,
    Error = 2,
}

impl ProcessTappableStatus {
    pub fn as_str_name(&self) -> &'static str {
        match self {
            Self::Unset => "UNSET",
            Self::Success => "SUCCESS",
            Self::Error => "ERROR",
        }
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LootItemProto {
    #[prost(int32, tag = "1")]
    pub item: i32,
    #[prost(int32, tag = "2")]
    pub count: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TappableEncounterProto {
    #[prost(message, optional, tag = "1")]
    pub pokemon: Option<WildPokemonProto>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProcessTappableOutProto {
    #[prost(enumeration = "ProcessTappableStatus", tag = "1")]
    pub status: i32,
    #[prost(message, repeated, tag = "2")]
    pub reward: Vec<LootItemProto>,
    #[prost(message, optional, tag = "3")]
    pub encounter: Option<TappableEncounterProto>,
}
