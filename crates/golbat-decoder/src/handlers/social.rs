// Social RPCs tunnelled through the platform proxy. Only counted.

use super::{decode_request, decode_response, HandlerResult, Outcome};
use crate::error::{HandlerError, PayloadError};
use crate::raw::PogoProto;
use golbat_proto::pogo::{
    ListFriendStatusOutProto, ProxyRequestProto, ProxyResponseProto, ProxyStatus, SearchPlayerOutProto,
    SocialAction,
};
use prost::Message;

pub(crate) async fn handle(proto: &PogoProto) -> HandlerResult {
    let request: ProxyRequestProto = decode_request(proto, "ProxyRequestProto")?;
    let response: ProxyResponseProto = decode_response(proto, "ProxyResponseProto")?;
    let completed = response.status == ProxyStatus::Completed as i32
        || response.status == ProxyStatus::CompletedAndReassigned as i32;
    if !completed {
        return Err(HandlerError::non_success(
            "ProxyResponseProto",
            response.status,
            ProxyStatus::try_from(response.status).ok().map(|s| s.as_str_name()),
        ));
    }

    let parse_error = |what: &'static str| {
        move |e: prost::DecodeError| HandlerError::Parse {
            what,
            source: PayloadError::Proto(e),
        }
    };

    match SocialAction::try_from(request.action as i32) {
        Ok(SocialAction::SearchPlayer) => {
            let search = SearchPlayerOutProto::decode(response.payload.as_slice())
                .map_err(parse_error("SearchPlayerOutProto"))?;
            let name = search.player.map(|p| p.codename).unwrap_or_default();
            Ok(Outcome::Processed(format!("SearchPlayer {}", name)))
        }
        Ok(SocialAction::ListFriendStatus) => {
            let friends = ListFriendStatusOutProto::decode(response.payload.as_slice())
                .map_err(parse_error("ListFriendStatusOutProto"))?;
            Ok(Outcome::Processed(format!(
                "ListFriendStatus {} friends",
                friends.friend.len()
            )))
        }
        _ => Ok(Outcome::Skipped(format!(
            "Unsupported social action {}",
            request.action
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::testing::record;
    use golbat_proto::pogo::{PlayerSummaryProto, INTERNAL_PROXY_SOCIAL_ACTION};

    #[tokio::test]
    async fn search_player_is_decoded() {
        let inner = SearchPlayerOutProto {
            result: 1,
            player: Some(PlayerSummaryProto {
                codename: "misty".into(),
                ..Default::default()
            }),
        };
        let request = ProxyRequestProto {
            action: SocialAction::SearchPlayer as u32,
            ..Default::default()
        };
        let response = ProxyResponseProto {
            status: ProxyStatus::Completed as i32,
            payload: inner.encode_to_vec(),
            ..Default::default()
        };
        let proto = record(INTERNAL_PROXY_SOCIAL_ACTION, &response, Some(&request));
        assert_eq!(
            handle(&proto).await.unwrap(),
            Outcome::Processed("SearchPlayer misty".into())
        );
    }

    #[tokio::test]
    async fn unknown_action_is_skipped() {
        let request = ProxyRequestProto {
            action: 1,
            ..Default::default()
        };
        let response = ProxyResponseProto {
            status: ProxyStatus::Completed as i32,
            ..Default::default()
        };
        let proto = record(INTERNAL_PROXY_SOCIAL_ACTION, &response, Some(&request));
        assert!(!handle(&proto).await.unwrap().is_processed());
    }
}
