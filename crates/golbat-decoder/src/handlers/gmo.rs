// GetMapObjects: forts, stations, sightings, weather and cells.

use super::{decode_response, HandlerContext, HandlerResult, Outcome};
use crate::error::HandlerError;
use crate::raw::PogoProto;
use golbat_proto::pogo::{FortType, GetMapObjectsOutProto, GetMapObjectsStatus};
use std::collections::HashSet;

#[derive(Debug, Default)]
struct Counts {
    cells: usize,
    forts: usize,
    stations: usize,
    wild: usize,
    nearby: usize,
    weather: usize,
}

pub(crate) async fn handle(cx: &HandlerContext<'_>, proto: &PogoProto) -> HandlerResult {
    let gmo: GetMapObjectsOutProto = decode_response(proto, "GetMapObjectsOutProto")?;
    if gmo.status != GetMapObjectsStatus::Success as i32 {
        return Err(HandlerError::non_success(
            "GetMapObjectsOutProto",
            gmo.status,
            GetMapObjectsStatus::try_from(gmo.status).ok().map(|s| s.as_str_name()),
        ));
    }

    let cells: Vec<_> = gmo.map_cell.iter().filter(|c| !c.is_empty()).collect();
    if cells.is_empty() && gmo.client_weather.is_empty() {
        return Ok(Outcome::Skipped(
            "Skipping GetMapObjectsOutProto: No map cells found".to_string(),
        ));
    }

    let scan = cx.scan;
    let store = cx.store;
    let timestamp_ms = proto.timestamp_ms();
    let account = proto.account();
    let mut counts = Counts {
        cells: cells.len(),
        ..Default::default()
    };

    for cell in &cells {
        let cell_id = cell.s2_cell_id;

        if scan.process_pokestops || scan.process_gyms {
            let mut seen = HashSet::with_capacity(cell.fort.len());
            for fort in &cell.fort {
                seen.insert(fort.fort_id.clone());
                counts.forts += 1;
                match FortType::try_from(fort.fort_type) {
                    Ok(FortType::Checkpoint) if scan.process_pokestops => {
                        store.update_pokestop_from_fort(fort, cell_id).await;
                        for display in &fort.pokestop_displays {
                            store.update_incident_from_display(&fort.fort_id, display).await;
                        }
                        if let Some(lured) = &fort.active_pokemon {
                            if scan.process_pokemon {
                                store
                                    .update_pokemon_from_map(lured, cell_id, timestamp_ms, account)
                                    .await;
                            }
                        }
                    }
                    Ok(FortType::Gym) if scan.process_gyms => {
                        store.update_gym_from_fort(fort, cell_id).await;
                    }
                    _ => {}
                }
            }
            store.update_cell_forts(cell_id, seen, timestamp_ms / 1000).await;
        }

        if scan.process_stations {
            for station in &cell.stations {
                counts.stations += 1;
                store.update_station_from_map(station, cell_id).await;
            }
        }

        if scan.process_pokemon && scan.process_wild_pokemon {
            for wild in &cell.wild_pokemon {
                counts.wild += 1;
                store
                    .update_pokemon_from_wild(wild, cell_id, timestamp_ms, account)
                    .await;
            }
        }

        if scan.process_pokemon && scan.process_nearby_pokemon {
            for nearby in &cell.nearby_pokemon {
                counts.nearby += 1;
                store
                    .update_pokemon_from_nearby(nearby, cell_id, timestamp_ms, account)
                    .await;
            }
        }
    }

    if scan.process_weather {
        for weather in &gmo.client_weather {
            counts.weather += 1;
            store.update_weather(weather).await;
        }
    }

    if scan.process_cells {
        let ids: Vec<u64> = cells.iter().map(|c| c.s2_cell_id).collect();
        store.update_cells(&ids, timestamp_ms / 1000);
    }

    cx.stats.add_decode_gmo_type("cell", counts.cells as f64);
    cx.stats.add_decode_gmo_type("fort", counts.forts as f64);
    cx.stats.add_decode_gmo_type("station", counts.stations as f64);
    cx.stats.add_decode_gmo_type("wild_pokemon", counts.wild as f64);
    cx.stats.add_decode_gmo_type("nearby_pokemon", counts.nearby as f64);
    cx.stats.add_decode_gmo_type("weather", counts.weather as f64);

    Ok(Outcome::Processed(format!(
        "{} cells containing {} forts {} stations {} mon {} nearby",
        counts.cells, counts.forts, counts.stations, counts.wild, counts.nearby
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::testing::{null_writers, store, store_with, RecordingWriter};
    use crate::entities::S2CellRow;
    use crate::handlers::testing::{context, record};
    use golbat_common::{Location, S2Cell, MAP_CELL_LEVEL, WEATHER_CELL_LEVEL};
    use golbat_proto::pogo::{
        ClientMapCellProto, ClientWeatherProto, GameplayWeatherProto, Method, NearbyPokemonProto,
        PokemonFortProto, PokemonProto, WildPokemonProto,
    };
    use std::sync::Arc;

    fn cell(id: u64) -> ClientMapCellProto {
        ClientMapCellProto {
            s2_cell_id: id,
            fort: vec![
                PokemonFortProto {
                    fort_id: "stop".into(),
                    fort_type: FortType::Checkpoint as i32,
                    latitude: 1.0,
                    longitude: 2.0,
                    ..Default::default()
                },
                PokemonFortProto {
                    fort_id: "gym".into(),
                    fort_type: FortType::Gym as i32,
                    latitude: 1.0,
                    longitude: 2.0,
                    ..Default::default()
                },
            ],
            wild_pokemon: vec![WildPokemonProto {
                encounter_id: 11,
                latitude: 1.0,
                longitude: 2.0,
                spawn_point_id: "1a".into(),
                time_till_hidden_ms: 60_000,
                pokemon: Some(PokemonProto {
                    pokemon_id: 1,
                    ..Default::default()
                }),
                ..Default::default()
            }],
            nearby_pokemon: vec![NearbyPokemonProto {
                pokedex_number: 4,
                encounter_id: 12,
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    fn map_cell(latitude: f64, longitude: f64) -> u64 {
        S2Cell::containing(Location::new(latitude, longitude), MAP_CELL_LEVEL).id
    }

    fn weather_cell() -> u64 {
        S2Cell::containing(Location::new(1.0, 2.0), WEATHER_CELL_LEVEL).id
    }

    fn gmo(status: GetMapObjectsStatus, cells: Vec<ClientMapCellProto>) -> PogoProto {
        let out = GetMapObjectsOutProto {
            map_cell: cells,
            status: status as i32,
            client_weather: vec![ClientWeatherProto {
                s2_cell_id: weather_cell() as i64,
                gameplay_weather: Some(GameplayWeatherProto { gameplay_condition: 2 }),
                ..Default::default()
            }],
        };
        record::<_, GetMapObjectsOutProto>(Method::GetMapObjects.code(), &out, None)
    }

    #[tokio::test]
    async fn processes_every_object_kind() {
        let (store, _) = store();
        let cx = context(&store);
        let outcome = handle(&cx, &gmo(GetMapObjectsStatus::Success, vec![cell(map_cell(1.0, 2.0))]))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            Outcome::Processed("1 cells containing 2 forts 0 stations 1 mon 1 nearby".into())
        );
        assert!(store.pokestop("stop").is_some());
        assert!(store.gym("gym").is_some());
        assert!(store.pokemon(11).is_some());
        assert!(store.pokemon(12).is_some());
        assert_eq!(store.weather(weather_cell() as i64).unwrap().gameplay_condition, 2);
        assert_eq!(store.queues().s2cell.len(), 1);
    }

    #[tokio::test]
    async fn scan_rules_disable_object_kinds() {
        let (store, _) = store();
        let mut cx = context(&store);
        cx.scan.process_gyms = false;
        cx.scan.process_nearby_pokemon = false;
        cx.scan.process_cells = false;
        cx.scan.process_weather = false;

        let outcome = handle(&cx, &gmo(GetMapObjectsStatus::Success, vec![cell(map_cell(1.0, 2.0))]))
            .await
            .unwrap();
        assert!(outcome.message().ends_with("1 mon 0 nearby"));
        assert!(store.pokestop("stop").is_some());
        assert!(store.gym("gym").is_none());
        assert!(store.pokemon(12).is_none());
        assert!(store.weather(weather_cell() as i64).is_none());
        assert!(store.queues().s2cell.is_empty());
    }

    #[tokio::test]
    async fn each_cell_is_written_at_its_own_centre() {
        let cells = Arc::new(RecordingWriter::<S2CellRow>::default());
        let mut writers = null_writers();
        writers.s2cell = cells.clone();
        let (store, _) = store_with(writers);
        let cx = context(&store);

        let first = map_cell(1.0, 2.0);
        let second = map_cell(1.05, 2.05);
        assert_ne!(first, second);
        let mut other = cell(second);
        other.fort.clear();
        other.wild_pokemon.clear();
        other.nearby_pokemon[0].encounter_id = 13;

        handle(&cx, &gmo(GetMapObjectsStatus::Success, vec![cell(first), other]))
            .await
            .unwrap();
        store.queues().s2cell.flush_all().await;

        let rows = cells.rows.lock().clone();
        assert_eq!(rows.len(), 2);
        for id in [first, second] {
            let expected = S2Cell::from_id(id).unwrap();
            let row = rows.iter().find(|r| r.id == id).unwrap();
            assert_eq!(row.level, MAP_CELL_LEVEL);
            assert_eq!((row.center_lat, row.center_lon), (expected.center.latitude, expected.center.longitude));
        }
        assert_ne!(rows[0].center_lat, rows[1].center_lat);

        // nearby sightings follow their cell, not the scan location
        let a = store.pokemon(12).unwrap();
        let b = store.pokemon(13).unwrap();
        assert_eq!(a.cell_id, Some(first as i64));
        assert_eq!(b.cell_id, Some(second as i64));
        assert_ne!((a.lat, a.lon), (b.lat, b.lon));

        let weather = store.weather(weather_cell() as i64).unwrap();
        assert_eq!(weather.level, WEATHER_CELL_LEVEL);
        assert!((weather.latitude - 1.0).abs() < 0.2);
    }

    #[tokio::test]
    async fn rejects_non_success() {
        let (store, _) = store();
        let err = handle(&context(&store), &gmo(GetMapObjectsStatus::Error, vec![]))
            .await
            .unwrap_err();
        assert_eq!(err.metric_label(), "non_success");
        assert_eq!(
            err.to_string(),
            "GetMapObjectsOutProto: Ignored non-success value 3:ERROR"
        );
    }

    #[tokio::test]
    async fn empty_response_is_skipped() {
        let (store, _) = store();
        let out = GetMapObjectsOutProto {
            map_cell: vec![ClientMapCellProto::default()],
            status: GetMapObjectsStatus::Success as i32,
            client_weather: vec![],
        };
        let proto = record::<_, GetMapObjectsOutProto>(Method::GetMapObjects.code(), &out, None);
        let outcome = handle(&context(&store), &proto).await.unwrap();
        assert!(!outcome.is_processed());
    }
}
