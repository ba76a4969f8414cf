// GetRoutes: every published route in the returned cells.

use super::{decode_response, HandlerContext, HandlerResult, Outcome};
use crate::error::HandlerError;
use crate::raw::PogoProto;
use golbat_proto::pogo::{GetRoutesOutProto, GetRoutesStatus};

pub(crate) async fn handle(cx: &HandlerContext<'_>, proto: &PogoProto) -> HandlerResult {
    let routes: GetRoutesOutProto = decode_response(proto, "GetRoutesOutProto")?;
    if routes.status != GetRoutesStatus::Success as i32 {
        return Err(HandlerError::non_success(
            "GetRoutesOutProto",
            routes.status,
            GetRoutesStatus::try_from(routes.status).ok().map(|s| s.as_str_name()),
        ));
    }

    let mut seen = 0;
    let mut updated = 0;
    for route in routes.route_map_cell.iter().flat_map(|c| c.route.iter()) {
        if !route.is_published() {
            continue;
        }
        seen += 1;
        if cx.store.update_route(route).await.is_some() {
            updated += 1;
        }
    }
    Ok(Outcome::Processed(format!("{} routes, {} updated", seen, updated)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::testing::store;
    use crate::handlers::testing::{context, record};
    use golbat_proto::pogo::{
        Method, RouteMapCellProto, RouteSubmissionStatus, RouteSubmissionStatusProto, SharedRouteProto,
    };

    fn route(id: &str, status: RouteSubmissionStatus) -> SharedRouteProto {
        SharedRouteProto {
            id: id.into(),
            version: 1,
            route_submission_status: vec![RouteSubmissionStatusProto {
                status: status as i32,
                submission_status_update_time_ms: 0,
            }],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn only_published_routes_are_stored() {
        let (store, _) = store();
        let out = GetRoutesOutProto {
            status: GetRoutesStatus::Success as i32,
            route_map_cell: vec![RouteMapCellProto {
                s2_cell_id: 1,
                route: vec![
                    route("a", RouteSubmissionStatus::Published),
                    route("b", RouteSubmissionStatus::Pending),
                ],
            }],
        };
        let proto = record::<_, GetRoutesOutProto>(Method::GetRoutes.code(), &out, None);
        let outcome = handle(&context(&store), &proto).await.unwrap();
        assert_eq!(outcome.message(), "1 routes, 1 updated");
        assert!(store.route("a").is_some());
        assert!(store.route("b").is_none());
    }
}
