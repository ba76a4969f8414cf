// HTTP `/raw` body normalizer.
//
// Three shapes are accepted: a single entry object, an array of entry
// objects, and the legacy pogodroid array selected by the `origin` header.
// Each entry object becomes one group.

use super::{Payload, PogoProto, ProtoGroup, ScanMetadata, DEFAULT_TRAINER_LEVEL, POGODROID_ACCOUNT};
use crate::error::RawDecodeError;
use golbat_common::Location;
use golbat_proto::pogo::QUEST_GEOTARGETED_AR_SCAN;
use serde_json::{Map, Value};
use tracing::error;

/// Normalize a `/raw` body into groups for the dispatcher.
pub fn decode_http(
    origin: Option<&str>,
    body: &[u8],
    received_ms: i64,
) -> Result<Vec<ProtoGroup>, RawDecodeError> {
    if body.is_empty() {
        return Err(RawDecodeError::EmptyBody);
    }

    if let Some(origin) = origin.filter(|o| !o.is_empty()) {
        let entries: Vec<Map<String, Value>> = serde_json::from_slice(body)?;
        return Ok(decode_pogodroid(origin, &entries).into_iter().collect());
    }

    if body.first() == Some(&b'[') {
        let entries: Vec<Value> = serde_json::from_slice(body)?;
        if entries.is_empty() {
            return Ok(Vec::new());
        }
        let mut groups = Vec::new();
        let mut decoded = false;
        for entry in &entries {
            match decode_entry(entry, received_ms) {
                Ok(group) => {
                    decoded = true;
                    groups.extend(group);
                }
                Err(e) => error!("failed to decode raw entry: {}", e),
            }
        }
        if !decoded {
            return Err(RawDecodeError::NoValidEntry);
        }
        return Ok(groups);
    }

    let entry: Value = serde_json::from_slice(body)?;
    Ok(decode_entry(&entry, received_ms)?.into_iter().collect())
}

fn decode_pogodroid(origin: &str, entries: &[Map<String, Value>]) -> Option<ProtoGroup> {
    if entries.is_empty() {
        return None;
    }

    let metadata = ScanMetadata {
        account: POGODROID_ACCOUNT.to_string(),
        level: DEFAULT_TRAINER_LEVEL,
        device_id: origin.to_string(),
        ..Default::default()
    };

    // Positions carry forward until an entry reports a new one.
    let mut location = Location::default();
    let protos = entries
        .iter()
        .map(|entry| {
            if let (Some(lat), Some(lng)) = (
                entry.get("lat").and_then(Value::as_f64),
                entry.get("lng").and_then(Value::as_f64),
            ) {
                if lat != 0.0 && lng != 0.0 {
                    location = Location::new(lat, lng);
                }
            }

            PogoProto {
                metadata: metadata.clone(),
                method: entry.get("type").and_then(as_method).unwrap_or(0),
                have_ar: entry
                    .get("quests_held")
                    .filter(|v| !v.is_null())
                    .and_then(quests_held_has_ar_task),
                location,
                request: None,
                response: Payload::Base64(
                    entry
                        .get("payload")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                ),
            }
        })
        .collect();

    Some(ProtoGroup::new(protos))
}

/// AR state from a pogodroid `quests_held` list. Anything malformed is
/// treated as unknown.
fn quests_held_has_ar_task(quests_held: &Value) -> Option<bool> {
    let Some(quests) = quests_held.as_array() else {
        error!("Raw: unexpected quests_held type in data: {}", quests_held);
        return None;
    };
    for quest in quests {
        match quest.as_f64() {
            Some(id) if id as i64 == QUEST_GEOTARGETED_AR_SCAN => return Some(true),
            Some(_) => continue,
            None => {
                error!("Raw: unexpected quest_id type in quests_held: {}", quest);
                return None;
            }
        }
    }
    Some(false)
}

fn as_method(value: &Value) -> Option<i32> {
    value.as_f64().map(|v| v as i32)
}

/// One entry object. `Ok(None)` for an empty `contents` list.
fn decode_entry(raw: &Value, received_ms: i64) -> Result<Option<ProtoGroup>, RawDecodeError> {
    let raw = raw.as_object().ok_or(RawDecodeError::NotAnObject)?;
    let contents = raw
        .get("contents")
        .and_then(Value::as_array)
        .ok_or(RawDecodeError::MissingContents)?;
    if contents.is_empty() {
        return Ok(None);
    }

    let string = |key: &str| {
        raw.get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    let mut metadata = ScanMetadata {
        account: string("username"),
        level: raw
            .get("trainerlvl")
            .and_then(Value::as_f64)
            .map(|l| l as i32)
            .unwrap_or(DEFAULT_TRAINER_LEVEL),
        device_id: string("uuid"),
        scan_context: string("scan_context"),
        timestamp_ms: raw
            .get("timestamp_ms")
            .and_then(Value::as_f64)
            .map(|t| t as i64)
            .unwrap_or(0),
    };
    if metadata.timestamp_ms <= 0 {
        metadata.timestamp_ms = received_ms;
    }

    let have_ar = raw.get("have_ar").and_then(Value::as_bool);
    let location = match (
        raw.get("lat_target").and_then(Value::as_f64),
        raw.get("lon_target").and_then(Value::as_f64),
    ) {
        (Some(lat), Some(lon)) => Location::new(lat, lon),
        _ => Location::default(),
    };

    let mut protos = Vec::with_capacity(contents.len());
    for content in contents {
        let Some(entry) = content.as_object() else {
            continue;
        };

        let data = first_present(entry, "data", "payload");
        let method = first_present(entry, "method", "type");
        let (Some(data), Some(method)) = (data, method) else {
            error!("Error decoding raw (no method or base64 data)");
            continue;
        };

        protos.push(PogoProto {
            metadata: metadata.clone(),
            method: as_method(method).unwrap_or(0),
            // Entry-level AR state wins over the envelope's.
            have_ar: entry.get("have_ar").and_then(Value::as_bool).or(have_ar),
            location,
            request: entry
                .get("request")
                .and_then(Value::as_str)
                .map(|r| Payload::Base64(r.to_string())),
            response: Payload::Base64(data.as_str().unwrap_or_default().to_string()),
        });
    }

    if protos.is_empty() {
        return Err(RawDecodeError::AllContentsMissing);
    }
    Ok(Some(ProtoGroup::new(protos)))
}

fn first_present<'a>(entry: &'a Map<String, Value>, key1: &str, key2: &str) -> Option<&'a Value> {
    entry
        .get(key1)
        .filter(|v| !v.is_null())
        .or_else(|| entry.get(key2).filter(|v| !v.is_null()))
}
