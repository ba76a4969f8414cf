// Fort details, map forts, gym info, quests and raid RSVPs.

use super::{decode_request, decode_response, HandlerContext, HandlerResult, Outcome};
use crate::error::HandlerError;
use crate::raw::PogoProto;
use golbat_proto::pogo::get_event_rsvps_proto::EventDetails;
use golbat_proto::pogo::{
    FortDetailsOutProto, FortSearchOutProto, FortSearchResult, FortType, GetEventRsvpCountOutProto,
    GetEventRsvpsOutProto, GetEventRsvpsProto, GetMapFortsOutProto, GetMapFortsStatus,
    GymGetInfoOutProto, GymGetInfoResult, RsvpStatus,
};

pub(crate) async fn handle_fort_details(cx: &HandlerContext<'_>, proto: &PogoProto) -> HandlerResult {
    let details: FortDetailsOutProto = decode_response(proto, "FortDetailsOutProto")?;
    match FortType::try_from(details.fort_type) {
        Ok(FortType::Checkpoint) if cx.scan.process_pokestops => Ok(Outcome::Processed(
            cx.store.update_pokestop_from_details(&details).await,
        )),
        Ok(FortType::Gym) if cx.scan.process_gyms => Ok(Outcome::Processed(
            cx.store.update_gym_from_details(&details).await,
        )),
        Ok(FortType::Checkpoint) => Ok(Outcome::Skipped("Pokestop processing disabled".to_string())),
        Ok(FortType::Gym) => Ok(Outcome::Skipped("Gym processing disabled".to_string())),
        Err(_) => Err(HandlerError::Update(format!(
            "Unknown fort type {}",
            details.fort_type
        ))),
    }
}

pub(crate) async fn handle_get_map_forts(cx: &HandlerContext<'_>, proto: &PogoProto) -> HandlerResult {
    let forts: GetMapFortsOutProto = decode_response(proto, "GetMapFortsOutProto")?;
    if forts.status != GetMapFortsStatus::Success as i32 {
        return Err(HandlerError::non_success(
            "GetMapFortsOutProto",
            forts.status,
            GetMapFortsStatus::try_from(forts.status).ok().map(|s| s.as_str_name()),
        ));
    }

    let mut names = Vec::new();
    for fort in &forts.fort {
        let updated = (cx.scan.process_pokestops && cx.store.update_pokestop_from_map_fort(fort).await)
            || (cx.scan.process_gyms && cx.store.update_gym_from_map_fort(fort).await);
        if updated {
            names.push(fort.name.as_str());
        }
    }

    if names.is_empty() {
        return Ok(Outcome::Skipped("No forts updated".to_string()));
    }
    Ok(Outcome::Processed(format!(
        "Updated {} forts: {}",
        names.len(),
        names.join(", ")
    )))
}

pub(crate) async fn handle_gym_info(cx: &HandlerContext<'_>, proto: &PogoProto) -> HandlerResult {
    if !cx.scan.process_gyms {
        return Ok(Outcome::Skipped("Gym processing disabled".to_string()));
    }
    let info: GymGetInfoOutProto = decode_response(proto, "GymGetInfoOutProto")?;
    if info.result != GymGetInfoResult::Success as i32 {
        return Err(HandlerError::non_success(
            "GymGetInfoOutProto",
            info.result,
            GymGetInfoResult::try_from(info.result).ok().map(|s| s.as_str_name()),
        ));
    }
    Ok(Outcome::Processed(cx.store.update_gym_from_gym_info(&info).await))
}

/// Fort search results carry the quest. The AR state decides the slot, so an
/// unknown AR state makes the quest unusable.
pub(crate) async fn handle_quest(cx: &HandlerContext<'_>, proto: &PogoProto) -> HandlerResult {
    let Some(have_ar) = proto.have_ar else {
        return Err(HandlerError::MissingArInfo);
    };
    if !cx.scan.process_pokestops {
        return Ok(Outcome::Skipped("Pokestop processing disabled".to_string()));
    }

    let search: FortSearchOutProto = decode_response(proto, "FortSearchOutProto")?;
    if search.result != FortSearchResult::Success as i32 {
        return Err(HandlerError::non_success(
            "FortSearchOutProto",
            search.result,
            FortSearchResult::try_from(search.result).ok().map(|s| s.as_str_name()),
        ));
    }
    if search.challenge_quest.as_ref().and_then(|c| c.quest.as_ref()).is_none() {
        return Ok(Outcome::Skipped("No quest".to_string()));
    }
    Ok(Outcome::Processed(
        cx.store.update_pokestop_from_quest(&search, have_ar).await,
    ))
}

pub(crate) async fn handle_event_rsvps(cx: &HandlerContext<'_>, proto: &PogoProto) -> HandlerResult {
    let request: GetEventRsvpsProto = decode_request(proto, "GetEventRsvpsProto")?;
    let rsvps: GetEventRsvpsOutProto = decode_response(proto, "GetEventRsvpsOutProto")?;
    if rsvps.status != RsvpStatus::Success as i32 {
        return Err(HandlerError::non_success(
            "GetEventRsvpsOutProto",
            rsvps.status,
            RsvpStatus::try_from(rsvps.status).ok().map(|s| s.as_str_name()),
        ));
    }

    match request.event_details {
        Some(EventDetails::Raid(raid)) => Ok(Outcome::Processed(
            cx.store.update_gym_rsvps(&raid.gym_id, &rsvps).await,
        )),
        Some(EventDetails::GmaxBattle(battle)) => Ok(Outcome::Skipped(format!(
            "{} max battle rsvps not stored",
            battle.station_id
        ))),
        None => Ok(Outcome::Skipped("No event details".to_string())),
    }
}

pub(crate) async fn handle_event_rsvp_count(cx: &HandlerContext<'_>, proto: &PogoProto) -> HandlerResult {
    let counts: GetEventRsvpCountOutProto = decode_response(proto, "GetEventRsvpCountOutProto")?;
    if counts.status != RsvpStatus::Success as i32 {
        return Err(HandlerError::non_success(
            "GetEventRsvpCountOutProto",
            counts.status,
            RsvpStatus::try_from(counts.status).ok().map(|s| s.as_str_name()),
        ));
    }

    let mut cleared = 0;
    for details in &counts.rsvp_details {
        if cx.store.update_gym_rsvp_count(details).await {
            cleared += 1;
        }
    }
    Ok(Outcome::Processed(format!(
        "{} rsvp counts, {} cleared",
        counts.rsvp_details.len(),
        cleared
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::testing::store;
    use crate::handlers::testing::{context, record};
    use golbat_proto::pogo::{
        ClientQuestProto, FortImageProto, MapFortProto, Method, PokemonFortProto, QuestProto,
    };

    fn quest_record(have_ar: Option<bool>) -> PogoProto {
        let out = FortSearchOutProto {
            result: FortSearchResult::Success as i32,
            fort_id: "s1".into(),
            challenge_quest: Some(ClientQuestProto {
                quest: Some(QuestProto {
                    quest_type: 4,
                    title: "catch".into(),
                    ..Default::default()
                }),
            }),
        };
        let mut proto = record::<_, FortSearchOutProto>(Method::FortSearch.code(), &out, None);
        proto.have_ar = have_ar;
        proto
    }

    #[tokio::test]
    async fn quest_requires_ar_state() {
        let (store, _) = store();
        let cx = context(&store);

        let err = handle_quest(&cx, &quest_record(None)).await.unwrap_err();
        assert_eq!(err.metric_label(), "missing_ar_info");

        handle_quest(&cx, &quest_record(Some(false))).await.unwrap();
        let stop = store.pokestop("s1").unwrap();
        assert!(!stop.quest.is_set());
        assert_eq!(stop.alternative_quest.quest_type, Some(4));
    }

    #[tokio::test]
    async fn gym_info_is_gated_by_scan_rules() {
        let (store, _) = store();
        let mut cx = context(&store);
        cx.scan.process_gyms = false;
        let proto = record::<_, GymGetInfoOutProto>(
            Method::GymGetInfo.code(),
            &GymGetInfoOutProto::default(),
            None,
        );
        assert_eq!(
            handle_gym_info(&cx, &proto).await.unwrap(),
            Outcome::Skipped("Gym processing disabled".into())
        );
    }

    #[tokio::test]
    async fn map_forts_update_known_forts_only() {
        let (store, _) = store();
        store
            .update_pokestop_from_fort(
                &PokemonFortProto {
                    fort_id: "s1".into(),
                    fort_type: FortType::Checkpoint as i32,
                    ..Default::default()
                },
                1,
            )
            .await;

        let out = GetMapFortsOutProto {
            status: GetMapFortsStatus::Success as i32,
            fort: vec![
                MapFortProto {
                    id: "s1".into(),
                    name: "Mural".into(),
                    image: vec![FortImageProto { url: "http://mural".into() }],
                    ..Default::default()
                },
                MapFortProto {
                    id: "unknown".into(),
                    name: "Bench".into(),
                    ..Default::default()
                },
            ],
        };
        let proto = record::<_, GetMapFortsOutProto>(Method::GetMapForts.code(), &out, None);
        let outcome = handle_get_map_forts(&context(&store), &proto).await.unwrap();
        assert_eq!(outcome, Outcome::Processed("Updated 1 forts: Mural".into()));
        assert_eq!(store.pokestop("s1").unwrap().url.as_deref(), Some("http://mural"));
    }

    #[tokio::test]
    async fn map_forts_non_success_message() {
        let (store, _) = store();
        let out = GetMapFortsOutProto {
            status: GetMapFortsStatus::Error as i32,
            fort: vec![],
        };
        let proto = record::<_, GetMapFortsOutProto>(Method::GetMapForts.code(), &out, None);
        let err = handle_get_map_forts(&context(&store), &proto).await.unwrap_err();
        assert_eq!(err.to_string(), "GetMapFortsOutProto: Ignored non-success value 2:ERROR");
    }

    #[tokio::test]
    async fn rsvps_need_the_request() {
        let (store, _) = store();
        let out = GetEventRsvpsOutProto {
            status: RsvpStatus::Success as i32,
            rsvp_timeslots: vec![],
        };
        let proto = record::<_, GetEventRsvpsProto>(Method::GetEventRsvps.code(), &out, None);
        let err = handle_event_rsvps(&context(&store), &proto).await.unwrap_err();
        assert_eq!(err.to_string(), "request proto not available");
    }
}
