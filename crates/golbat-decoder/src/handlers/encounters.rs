// Wild and lure encounters.

use super::{decode_response, HandlerContext, HandlerResult, Outcome};
use crate::error::HandlerError;
use crate::raw::PogoProto;
use golbat_proto::pogo::{DiskEncounterOutProto, DiskEncounterResult, EncounterOutProto, EncounterStatus};

pub(crate) async fn handle_encounter(cx: &HandlerContext<'_>, proto: &PogoProto) -> HandlerResult {
    if !cx.scan.process_pokemon {
        return Ok(Outcome::Skipped("Pokemon processing disabled".to_string()));
    }
    let encounter: EncounterOutProto = decode_response(proto, "EncounterOutProto")?;
    if encounter.status != EncounterStatus::EncounterSuccess as i32 {
        return Err(HandlerError::non_success(
            "EncounterOutProto",
            encounter.status,
            EncounterStatus::try_from(encounter.status).ok().map(|s| s.as_str_name()),
        ));
    }
    Ok(Outcome::Processed(
        cx.store
            .update_pokemon_from_encounter(&encounter, proto.timestamp_ms(), proto.account())
            .await,
    ))
}

pub(crate) async fn handle_disk_encounter(cx: &HandlerContext<'_>, proto: &PogoProto) -> HandlerResult {
    if !cx.scan.process_pokemon {
        return Ok(Outcome::Skipped("Pokemon processing disabled".to_string()));
    }
    let encounter: DiskEncounterOutProto = decode_response(proto, "DiskEncounterOutProto")?;
    if encounter.result != DiskEncounterResult::Success as i32 {
        return Err(HandlerError::non_success(
            "DiskEncounterOutProto",
            encounter.result,
            DiskEncounterResult::try_from(encounter.result).ok().map(|s| s.as_str_name()),
        ));
    }
    Ok(Outcome::Processed(
        cx.store
            .update_pokemon_from_disk_encounter(&encounter, proto.timestamp_ms(), proto.account())
            .await,
    ))
}
