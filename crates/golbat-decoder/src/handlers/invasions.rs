// Rocket invasions: starting an incident and opening its battle.

use super::{decode_request, decode_response, HandlerContext, HandlerResult, Outcome};
use crate::error::HandlerError;
use crate::raw::PogoProto;
use golbat_proto::pogo::{
    InvasionStatus, OpenInvasionCombatSessionOutProto, OpenInvasionCombatSessionProto,
    StartIncidentOutProto, StartIncidentStatus,
};

pub(crate) async fn handle_start_incident(cx: &HandlerContext<'_>, proto: &PogoProto) -> HandlerResult {
    let start: StartIncidentOutProto = decode_response(proto, "StartIncidentOutProto")?;
    if start.status != StartIncidentStatus::Success as i32 {
        return Err(HandlerError::non_success(
            "StartIncidentOutProto",
            start.status,
            StartIncidentStatus::try_from(start.status).ok().map(|s| s.as_str_name()),
        ));
    }
    if start.incident.is_none() {
        return Err(HandlerError::Update("No incident in response".to_string()));
    }
    Ok(Outcome::Processed(cx.store.update_incident_from_start(&start).await))
}

pub(crate) async fn handle_open_invasion(cx: &HandlerContext<'_>, proto: &PogoProto) -> HandlerResult {
    let request: OpenInvasionCombatSessionProto =
        decode_request(proto, "OpenInvasionCombatSessionProto")?;
    let response: OpenInvasionCombatSessionOutProto =
        decode_response(proto, "OpenInvasionCombatSessionOutProto")?;
    if response.status != InvasionStatus::Success as i32 {
        return Err(HandlerError::non_success(
            "OpenInvasionCombatSessionOutProto",
            response.status,
            InvasionStatus::try_from(response.status).ok().map(|s| s.as_str_name()),
        ));
    }
    if request.incident_lookup.is_none() {
        return Err(HandlerError::Update("No incident lookup in request".to_string()));
    }
    Ok(Outcome::Processed(
        cx.store.update_incident_lineup(&request, &response).await,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::testing::store;
    use crate::handlers::testing::{context, record};
    use golbat_proto::pogo::{IncidentLookupProto, Method};

    #[tokio::test]
    async fn open_invasion_needs_request() {
        let (store, _) = store();
        let response = OpenInvasionCombatSessionOutProto {
            status: InvasionStatus::Success as i32,
            combat: None,
        };
        let proto = record::<_, OpenInvasionCombatSessionProto>(
            Method::InvasionOpenCombatSession.code(),
            &response,
            None,
        );
        let err = handle_open_invasion(&context(&store), &proto).await.unwrap_err();
        assert_eq!(err.metric_label(), "parse");

        let request = OpenInvasionCombatSessionProto {
            incident_lookup: Some(IncidentLookupProto {
                incident_id: "i1".into(),
                fort_id: "s1".into(),
                ..Default::default()
            }),
            step: 1,
        };
        let proto = record(Method::InvasionOpenCombatSession.code(), &response, Some(&request));
        let outcome = handle_open_invasion(&context(&store), &proto).await.unwrap();
        assert_eq!(outcome.message(), "i1 no opponent");
    }

    #[tokio::test]
    async fn failed_start_is_non_success() {
        let (store, _) = store();
        let start = StartIncidentOutProto {
            status: StartIncidentStatus::ErrorNotInRange as i32,
            incident: None,
        };
        let proto = record::<_, StartIncidentOutProto>(Method::StartIncident.code(), &start, None);
        let err = handle_start_incident(&context(&store), &proto).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "StartIncidentOutProto: Ignored non-success value 2:ERROR_NOT_IN_RANGE"
        );
    }
}
