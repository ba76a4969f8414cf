use super::{PokemonProto, WildPokemonProto};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum EncounterStatus {
    EncounterError = 0,
    EncounterSuccess = 1,
    EncounterNotFound = 2,
    EncounterClosed = 3,
    EncounterPokemonFled = 4,
    EncounterNotInRange = 5,
    EncounterAlreadyHappened = 6,
    PokemonInventoryFull = 7,
}

impl EncounterStatus {
    pub fn as_str_name(&self) -> &'static str {
        match self {
            Self::EncounterError => "ENCOUNTER_ERROR",
            Self::EncounterSuccess => "ENCOUNTER_SUCCESS",
            Self::EncounterNotFound => "ENCOUNTER_NOT_FOUND",
            Self::EncounterClosed => "ENCOUNTER_CLOSED",
            Self::EncounterPokemonFled => "ENCOUNTER_POKEMON_FLED",
            Self::EncounterNotInRange => "ENCOUNTER_NOT_IN_RANGE",
            Self::EncounterAlreadyHappened => "ENCOUNTER_ALREADY_HAPPENED",
            Self::PokemonInventoryFull => "POKEMON_INVENTORY_FULL",
        }
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EncounterOutProto {
    #[prost(message, optional, tag = "1")]
    pub pokemon: Option<WildPokemonProto>,
    #[prost(enumeration = "EncounterStatus", tag = "2")]
    pub status: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum DiskEncounterResult {
    Unknown = 0,
    Success = 1,
    NotAvailable = 2,
    NotInRange = 3,
    EncounterAlreadyFinished = 4,
    PokemonInventoryFull = 5,
}

impl DiskEncounterResult {
    pub fn as_str_name(&self) -> &'static str {
        match self {
            Self::Unknown => "UNKNOWN",
            Self::Success => "SUCCESS",
            Self::NotAvailable => "NOT_AVAILABLE",
            Self::NotInRange => "NOT_IN_RANGE",
            Self::EncounterAlreadyFinished => "ENCOUNTER_ALREADY_FINISHED",
            Self::PokemonInventoryFull => "POKEMON_INVENTORY_FULL",
        }
    }
}

/// Lure encounter. The encounter id is carried in the display id.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DiskEncounterOutProto {
    #[prost(enumeration = "DiskEncounterResult", tag = "1")]
    pub result: i32,
    #[prost(message, optional, tag = "2")]
    pub pokemon: Option<PokemonProto>,
}
