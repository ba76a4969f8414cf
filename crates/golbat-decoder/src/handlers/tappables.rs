// ProcessTappable: the tappable itself and any pokemon it spawned.

use super::{decode_request, decode_response, HandlerContext, HandlerResult, Outcome};
use crate::error::HandlerError;
use crate::raw::PogoProto;
use golbat_proto::pogo::{ProcessTappableOutProto, ProcessTappableProto, ProcessTappableStatus};

pub(crate) async fn handle(cx: &HandlerContext<'_>, proto: &PogoProto) -> HandlerResult {
    let request: ProcessTappableProto = decode_request(proto, "ProcessTappableProto")?;
    let response: ProcessTappableOutProto = decode_response(proto, "ProcessTappableOutProto")?;
    if response.status != ProcessTappableStatus::Success as i32 {
        return Err(HandlerError::non_success(
            "ProcessTappableOutProto",
            response.status,
            ProcessTappableStatus::try_from(response.status).ok().map(|s| s.as_str_name()),
        ));
    }

    let mut messages = Vec::new();
    if cx.scan.process_tappables {
        messages.push(
            cx.store
                .update_tappable(&request, &response, proto.timestamp_ms())
                .await,
        );
    }
    if let Some(encounter) = &response.encounter {
        if cx.scan.process_pokemon {
            messages.push(
                cx.store
                    .update_pokemon_from_tappable(&request, encounter, proto.timestamp_ms(), proto.account())
                    .await,
            );
        }
    }

    if messages.is_empty() {
        return Ok(Outcome::Skipped("Tappable processing disabled".to_string()));
    }
    Ok(Outcome::Processed(messages.join(", ")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::testing::store;
    use crate::handlers::testing::{context, record};
    use golbat_proto::pogo::{Method, PokemonProto, TappableEncounterProto, WildPokemonProto};

    #[tokio::test]
    async fn tappable_with_encounter_records_both() {
        let (store, _) = store();
        let request = ProcessTappableProto {
            encounter_id: 5,
            location_hint_lat: 1.0,
            location_hint_lng: 2.0,
            spawnpoint_id: "3c".into(),
            ..Default::default()
        };
        let response = ProcessTappableOutProto {
            status: ProcessTappableStatus::Success as i32,
            reward: vec![],
            encounter: Some(TappableEncounterProto {
                pokemon: Some(WildPokemonProto {
                    pokemon: Some(PokemonProto {
                        pokemon_id: 133,
                        cp: 100,
                        ..Default::default()
                    }),
                    ..Default::default()
                }),
            }),
        };
        let proto = record(Method::ProcessTappable.code(), &response, Some(&request));
        let outcome = handle(&context(&store), &proto).await.unwrap();
        assert_eq!(
            outcome.message(),
            "5 tappable pokemon 133, 5 Tappable Pokemon 133 CP100"
        );
        assert_eq!(store.tappable(5).unwrap().pokemon_id, Some(133));
        assert_eq!(store.pokemon(5).unwrap().pokemon_id, 133);
    }
}
