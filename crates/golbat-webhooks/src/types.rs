use thiserror::Error;

/// Outgoing event kinds. Declaration order is the order events are
/// concatenated in a destination's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WebhookType {
    GymDetails,
    Raid,
    Quest,
    Pokestop,
    Invasion,
    Weather,
    FortUpdate,
    PokemonIV,
    PokemonNoIV,
}

impl WebhookType {
    pub const COUNT: usize = 9;

    pub const ALL: [WebhookType; Self::COUNT] = [
        WebhookType::GymDetails,
        WebhookType::Raid,
        WebhookType::Quest,
        WebhookType::Pokestop,
        WebhookType::Invasion,
        WebhookType::Weather,
        WebhookType::FortUpdate,
        WebhookType::PokemonIV,
        WebhookType::PokemonNoIV,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    /// The `type` field receivers see.
    pub const fn payload_type(self) -> &'static str {
        match self {
            WebhookType::GymDetails => "gym_details",
            WebhookType::Raid => "raid",
            WebhookType::Quest => "quest",
            WebhookType::Pokestop => "pokestop",
            WebhookType::Invasion => "invasion",
            WebhookType::Weather => "weather",
            WebhookType::FortUpdate => "fort_update",
            WebhookType::PokemonIV | WebhookType::PokemonNoIV => "pokemon",
        }
    }

    /// Map a configured type name to the event kinds it subscribes to.
    pub fn from_config_name(name: &str) -> Result<&'static [WebhookType], WebhookConfigError> {
        let kinds: &'static [WebhookType] = match name {
            "gym" => &[WebhookType::GymDetails],
            "raid" => &[WebhookType::Raid],
            "quest" => &[WebhookType::Quest],
            "pokestop" => &[WebhookType::Pokestop],
            "invasion" => &[WebhookType::Invasion],
            "weather" => &[WebhookType::Weather],
            "fort_update" => &[WebhookType::FortUpdate],
            "pokemon_iv" => &[WebhookType::PokemonIV],
            "pokemon_no_iv" => &[WebhookType::PokemonNoIV],
            "pokemon" => &[WebhookType::PokemonIV, WebhookType::PokemonNoIV],
            other => return Err(WebhookConfigError::UnknownType(other.to_string())),
        };
        Ok(kinds)
    }

    /// Resolve a destination's type list. An empty list subscribes to
    /// everything. The result is deduplicated and in declaration order.
    pub fn resolve<S: AsRef<str>>(names: &[S]) -> Result<Vec<WebhookType>, WebhookConfigError> {
        let mut wanted = [false; Self::COUNT];
        for name in names {
            for kind in Self::from_config_name(name.as_ref())? {
                wanted[kind.index()] = true;
            }
        }
        let any = wanted.iter().any(|w| *w);
        Ok(Self::ALL
            .into_iter()
            .filter(|kind| !any || wanted[kind.index()])
            .collect())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WebhookConfigError {
    #[error("unknown webhook type '{0}'")]
    UnknownType(String),

    #[error("invalid webhook url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("failed to build webhook client: {0}")]
    Client(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_follow_declaration_order() {
        for (i, kind) in WebhookType::ALL.iter().enumerate() {
            assert_eq!(kind.index(), i);
        }
    }

    #[test]
    fn empty_type_list_wants_everything() {
        let none: [&str; 0] = [];
        assert_eq!(WebhookType::resolve(&none).unwrap(), WebhookType::ALL.to_vec());
    }

    #[test]
    fn pokemon_expands_to_both_kinds() {
        let kinds = WebhookType::resolve(&["pokemon", "raid", "pokemon_iv"]).unwrap();
        assert_eq!(
            kinds,
            vec![WebhookType::Raid, WebhookType::PokemonIV, WebhookType::PokemonNoIV]
        );
    }

    #[test]
    fn unknown_type_is_rejected() {
        let err = WebhookType::resolve(&["raid", "nests"]).unwrap_err();
        assert_eq!(err.to_string(), "unknown webhook type 'nests'");
    }
}
