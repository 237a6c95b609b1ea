use std::borrow::Cow;

use bevy::ecs::world::World;

use super::{Error, Source, do_load};
use crate::Conf;
use crate::controller::ControllerKind;
use crate::manager::{AtcManager, StationRef};
use crate::tests::{AIRPORT, prepare_store_airport};

fn prepare_world() -> World {
    let mut world = World::new();
    world.insert_resource(Conf::default());
    world.insert_resource(AtcManager::with_seed(1));
    world
}

fn encode(file: &store::File) -> Source {
    let mut bytes = Vec::new();
    ciborium::into_writer(file, &mut bytes).expect("encode fixture");
    Source::Raw(Cow::Owned(bytes))
}

#[test]
fn raw_file_staffs_all_stations() {
    let mut world = prepare_world();
    let file = store::File { airports: vec![prepare_store_airport()] };
    do_load(&mut world, &encode(&file)).expect("fixture loads");

    let manager = world.resource::<AtcManager>();
    let dynamics = manager.airport(AIRPORT).expect("airport is loaded");
    assert_eq!(dynamics.airport.name, "Testfield");
    assert_eq!(dynamics.airport.queues.len(), 2);
    assert_eq!(manager.stations().len(), 4);
    assert_eq!(
        manager.stations()[0],
        StationRef { airport: AIRPORT.into(), kind: ControllerKind::Startup }
    );
}

#[test]
fn garbage_is_rejected() {
    let mut world = prepare_world();
    let err = do_load(&mut world, &Source::Raw(Cow::Borrowed(b"\xff\x00not cbor")))
        .expect_err("garbage must not decode");
    assert!(matches!(err, Error::Serde(_)), "{err:?}");
    assert!(world.resource::<AtcManager>().stations().is_empty());
}

#[test]
fn duplicate_airport_in_file() {
    let mut world = prepare_world();
    let file = store::File { airports: vec![prepare_store_airport(), prepare_store_airport()] };
    let err = do_load(&mut world, &Source::Parsed(Box::new(file))).expect_err("duplicate");
    assert!(matches!(&err, Error::DuplicateAirport(code) if code == AIRPORT), "{err:?}");

    let manager = world.resource::<AtcManager>();
    assert!(manager.airport(AIRPORT).is_none(), "partial file must not be loaded");
}

#[test]
fn duplicate_airport_across_files() {
    let mut world = prepare_world();
    let file = store::File { airports: vec![prepare_store_airport()] };
    do_load(&mut world, &Source::Parsed(Box::new(file.clone()))).expect("first load");

    let err = do_load(&mut world, &Source::Parsed(Box::new(file))).expect_err("reload");
    assert!(matches!(&err, Error::DuplicateAirport(code) if code == AIRPORT), "{err:?}");
    assert_eq!(world.resource::<AtcManager>().stations().len(), 4);
}

#[test]
fn unresolved_preferred_runway() {
    let mut world = prepare_world();
    let mut airport = prepare_store_airport();
    airport.runway_preference.push(store::RunwayPreference {
        from_minute:  0,
        until_minute: 24 * 60,
        departure:    vec!["09".into()],
        arrival:      vec!["36".into()],
    });

    let err = do_load(&mut world, &Source::Parsed(Box::new(store::File { airports: vec![airport] })))
        .expect_err("36 does not exist");
    assert!(
        matches!(&err, Error::UnresolvedRunway { airport, runway } if airport == AIRPORT && runway == "36"),
        "{err:?}"
    );
}

#[test]
fn dangling_segment() {
    let mut world = prepare_world();
    let mut airport = prepare_store_airport();
    airport.ground_network.segments.push(store::GroundSegment { from: 1, to: 999 });

    let err = do_load(&mut world, &Source::Parsed(Box::new(store::File { airports: vec![airport] })))
        .expect_err("999 does not exist");
    assert!(
        matches!(err, Error::Ground { source: crate::ground::BuildError::UnknownNode(999), .. }),
        "{err:?}"
    );
}
