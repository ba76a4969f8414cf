// Stationed pokemon at a power spot.

use super::{decode_request, decode_response, HandlerContext, HandlerResult, Outcome};
use crate::error::HandlerError;
use crate::raw::PogoProto;
use golbat_proto::pogo::{
    GetStationedPokemonDetailsOutProto, GetStationedPokemonDetailsProto, GetStationedPokemonDetailsResult,
};

pub(crate) async fn handle(cx: &HandlerContext<'_>, proto: &PogoProto) -> HandlerResult {
    if !cx.scan.process_stations {
        return Ok(Outcome::Skipped("Station processing disabled".to_string()));
    }
    let request: GetStationedPokemonDetailsProto =
        decode_request(proto, "GetStationedPokemonDetailsProto")?;
    let details: GetStationedPokemonDetailsOutProto =
        decode_response(proto, "GetStationedPokemonDetailsOutProto")?;
    if details.result != GetStationedPokemonDetailsResult::Success as i32 {
        return Err(HandlerError::non_success(
            "GetStationedPokemonDetailsOutProto",
            details.result,
            GetStationedPokemonDetailsResult::try_from(details.result)
                .ok()
                .map(|s| s.as_str_name()),
        ));
    }
    Ok(Outcome::Processed(
        cx.store.update_station_details(&request.station_id, &details).await,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::testing::store;
    use crate::handlers::testing::{context, record};
    use golbat_proto::pogo::Method;

    #[tokio::test]
    async fn station_not_found_is_non_success() {
        let (store, _) = store();
        let request = GetStationedPokemonDetailsProto {
            station_id: "st".into(),
        };
        let response = GetStationedPokemonDetailsOutProto {
            result: GetStationedPokemonDetailsResult::StationNotFound as i32,
            ..Default::default()
        };
        let proto = record(Method::GetStationDetails.code(), &response, Some(&request));
        let err = handle(&context(&store), &proto).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "GetStationedPokemonDetailsOutProto: Ignored non-success value 2:STATION_NOT_FOUND"
        );
    }
}
