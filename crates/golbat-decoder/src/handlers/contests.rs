// Pokestop showcases: contest definitions and leaderboards.

use super::{decode_request, decode_response, HandlerContext, HandlerResult, Outcome};
use crate::error::HandlerError;
use crate::raw::PogoProto;
use golbat_proto::pogo::{
    ContestStatus, GetContestDataOutProto, GetContestDataProto, GetPokemonSizeLeaderboardEntryOutProto,
    GetPokemonSizeLeaderboardEntryProto,
};

pub(crate) async fn handle_contest_data(cx: &HandlerContext<'_>, proto: &PogoProto) -> HandlerResult {
    let request: GetContestDataProto = decode_request(proto, "GetContestDataProto")?;
    let data: GetContestDataOutProto = decode_response(proto, "GetContestDataOutProto")?;
    if data.status != ContestStatus::Success as i32 {
        return Err(HandlerError::non_success(
            "GetContestDataOutProto",
            data.status,
            ContestStatus::try_from(data.status).ok().map(|s| s.as_str_name()),
        ));
    }

    let Some(contest) = data.contest_incident.as_ref().and_then(|i| i.contests.first()) else {
        return Ok(Outcome::Skipped(format!("{} has no contest", request.fort_id)));
    };
    match cx.store.update_pokestop_showcase(&request.fort_id, contest).await {
        Some(_) => Ok(Outcome::Processed(format!(
            "{} showcase {}",
            request.fort_id, contest.contest_id
        ))),
        None => Ok(Outcome::Skipped(format!(
            "{} showcase unchanged or pokestop unknown",
            request.fort_id
        ))),
    }
}

pub(crate) async fn handle_contest_entry(cx: &HandlerContext<'_>, proto: &PogoProto) -> HandlerResult {
    let request: GetPokemonSizeLeaderboardEntryProto =
        decode_request(proto, "GetPokemonSizeLeaderboardEntryProto")?;
    let leaderboard: GetPokemonSizeLeaderboardEntryOutProto =
        decode_response(proto, "GetPokemonSizeLeaderboardEntryOutProto")?;
    if leaderboard.status != ContestStatus::Success as i32 {
        return Err(HandlerError::non_success(
            "GetPokemonSizeLeaderboardEntryOutProto",
            leaderboard.status,
            ContestStatus::try_from(leaderboard.status).ok().map(|s| s.as_str_name()),
        ));
    }

    match cx
        .store
        .update_pokestop_showcase_rankings(&request.fort_id, &leaderboard)
        .await
    {
        Some(_) => Ok(Outcome::Processed(format!(
            "{} rankings {} entries",
            request.fort_id, leaderboard.total_entries
        ))),
        None => Ok(Outcome::Skipped(format!("{} pokestop unknown", request.fort_id))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::testing::store;
    use crate::handlers::testing::{context, record};
    use golbat_proto::pogo::{
        ClientContestIncidentProto, ContestEntryProto, ContestProto, FortType, Method, PokemonFortProto,
    };

    async fn known_stop(store: &crate::entities::EntityStore) {
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
    }

    #[tokio::test]
    async fn contest_data_sets_showcase() {
        let (store, _) = store();
        known_stop(&store).await;
        let request = GetContestDataProto { fort_id: "s1".into() };
        let response = GetContestDataOutProto {
            status: ContestStatus::Success as i32,
            contest_incident: Some(ClientContestIncidentProto {
                contests: vec![ContestProto {
                    contest_id: "c1".into(),
                    end_time_ms: 5_000_000,
                    focus_pokemon_id: 129,
                    ..Default::default()
                }],
            }),
        };
        let proto = record(Method::GetContestData.code(), &response, Some(&request));
        let outcome = handle_contest_data(&context(&store), &proto).await.unwrap();
        assert_eq!(outcome, Outcome::Processed("s1 showcase c1".into()));
        let stop = store.pokestop("s1").unwrap();
        assert_eq!(stop.showcase_pokemon_id, Some(129));
        assert_eq!(stop.showcase_expiry, Some(5000));
    }

    #[tokio::test]
    async fn leaderboard_sets_rankings() {
        let (store, _) = store();
        known_stop(&store).await;
        let request = GetPokemonSizeLeaderboardEntryProto {
            contest_id: "c1".into(),
            fort_id: "s1".into(),
        };
        let response = GetPokemonSizeLeaderboardEntryOutProto {
            status: ContestStatus::Success as i32,
            total_entries: 12,
            contest_entries: vec![ContestEntryProto {
                rank: 1,
                score: 0.9,
                pokedex_id: 129,
                ..Default::default()
            }],
        };
        let proto = record(Method::GetPokemonSizeContestEntry.code(), &response, Some(&request));
        let outcome = handle_contest_entry(&context(&store), &proto).await.unwrap();
        assert_eq!(outcome.message(), "s1 rankings 12 entries");
        let rankings: serde_json::Value =
            serde_json::from_str(store.pokestop("s1").unwrap().showcase_rankings.as_deref().unwrap())
                .unwrap();
        assert_eq!(rankings["contest_entries"][0]["pokemon_id"], 129);
    }
}
