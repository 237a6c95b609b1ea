use math::{GeoPos, GeoRect, Heading, Length};

use super::{Error, GroundRadar, MAX_DEPTH, SPLIT_THRESHOLD};
use crate::flight_plan::{FlightPlan, FlightRules};
use crate::tests::{AIRPORT, ORIGIN, id, local, puppet};
use crate::traffic::{Arena, TrafficRecord};

fn prepare_radar() -> GroundRadar { GroundRadar::new(GeoRect::around(ORIGIN, 0.05)) }

fn prepare_record(raw: u32, position: GeoPos, heading: Heading) -> TrafficRecord {
    let mut plan = FlightPlan::new(AIRPORT, "EHAM", FlightRules::Ifr);
    plan.radius = Length::from_meters(30.);
    TrafficRecord::new(id(raw), puppet(&format!("TST{raw}"), position, heading), plan)
}

#[test]
fn add_contains_remove_round_trip() {
    let mut radar = prepare_radar();
    radar.add(id(1), local(10., 20.)).expect("inside coverage");
    assert!(radar.contains(id(1)));
    assert_eq!(radar.len(), 1);

    assert!(radar.remove(id(1)));
    assert!(!radar.contains(id(1)));
    assert!(radar.is_empty());
    assert!(radar.query(&radar.bounds()).is_empty());

    assert!(!radar.remove(id(1)), "second removal must report a miss");
}

#[test]
fn out_of_bounds_add_is_rejected() {
    let mut radar = prepare_radar();
    let far = GeoPos::new(ORIGIN.lat + 1., ORIGIN.lon);
    assert!(matches!(radar.add(id(1), far), Err(Error::OutOfBounds { .. })));
    assert!(!radar.contains(id(1)));
    radar.assert_invariants();
}

#[test]
fn moving_out_of_bounds_stops_tracking() {
    let mut radar = prepare_radar();
    radar.add(id(1), local(0., 0.)).expect("inside coverage");
    let far = GeoPos::new(ORIGIN.lat, ORIGIN.lon + 1.);
    assert!(matches!(radar.move_to(id(1), far), Err(Error::OutOfBounds { .. })));
    assert!(!radar.contains(id(1)));
    radar.assert_invariants();
}

#[test]
fn move_unknown_is_not_found() {
    let mut radar = prepare_radar();
    assert!(matches!(radar.move_to(id(7), ORIGIN), Err(Error::NotFound(_))));
}

#[test]
fn split_keeps_leaf_invariant() {
    let mut radar = prepare_radar();
    for i in 0..200u32 {
        let east = f64::from(i % 20) * 150. - 1500.;
        let north = f64::from(i / 20) * 150. - 700.;
        radar.add(id(i + 1), local(east, north)).expect("inside coverage");
    }
    radar.assert_invariants();
    assert!(radar.max_depth() > 0);
    assert_eq!(radar.query(&radar.bounds()).len(), 200);
}

#[test]
fn coincident_entries_stop_splitting_at_max_depth() {
    let mut radar = prepare_radar();
    let spot = local(123., 456.);
    for i in 0..(SPLIT_THRESHOLD as u32 * 2) {
        radar.add(id(i + 1), spot).expect("inside coverage");
    }
    radar.assert_invariants();
    assert_eq!(radar.max_depth(), MAX_DEPTH);
    assert_eq!(radar.query(&GeoRect::around(spot, 1e-6)).len(), SPLIT_THRESHOLD * 2);
}

#[test]
fn move_across_quadrants() {
    let mut radar = prepare_radar();
    let corners = [(-1., -1.), (1., -1.), (-1., 1.), (1., 1.)];
    for i in 0..SPLIT_THRESHOLD {
        let (east, north) = corners[i % 4];
        let scale = 500. + 100. * i as f64;
        radar.add(id(i as u32 + 1), local(east * scale, north * scale)).expect("inside coverage");
    }
    assert!(radar.max_depth() >= 1, "tenth insertion must split the root");

    let old = radar.position(id(1)).expect("tracked");
    let new = local(700., 700.);
    radar.move_to(id(1), new).expect("inside coverage");
    radar.assert_invariants();

    let at_new = radar.query(&GeoRect::around(new, 1e-5));
    assert!(at_new.iter().any(|entry| entry.id == id(1) && entry.position == new));
    let at_old = radar.query(&GeoRect::around(old, 1e-5));
    assert!(at_old.iter().all(|entry| entry.id != id(1)));
    assert_eq!(radar.len(), SPLIT_THRESHOLD);
}

#[test]
fn entry_on_center_line_stays_queryable() {
    let mut radar = prepare_radar();
    for i in 0..SPLIT_THRESHOLD as u32 {
        radar.add(id(i + 1), local(f64::from(i) * 100. + 50., 300.)).expect("inside coverage");
    }
    radar.add(id(99), radar.bounds().center()).expect("inside coverage");
    radar.assert_invariants();
    assert!(
        radar
            .query(&GeoRect::around(ORIGIN, 1e-6))
            .iter()
            .any(|entry| entry.id == id(99))
    );

    radar.move_to(id(99), local(-200., -200.)).expect("inside coverage");
    radar.assert_invariants();
    assert!(radar.query(&GeoRect::around(ORIGIN, 1e-6)).is_empty());
}

#[test]
fn blocker_chain() {
    let mut radar = prepare_radar();
    let mut arena = Arena::default();
    for (raw, east) in [(1, 200.), (2, 100.), (3, 0.)] {
        let record = prepare_record(raw, local(east, 0.), Heading::EAST);
        radar.add(record.id, record.position).expect("inside coverage");
        arena.insert(record);
    }

    let [front, middle, rear] = [id(1), id(2), id(3)];
    let blocked_by = |aircraft| radar.is_blocked_by(arena.get(aircraft).expect("inserted"), &arena);
    assert_eq!(blocked_by(middle), Some(front));
    assert_eq!(blocked_by(rear), Some(middle));
    assert_eq!(blocked_by(front), None);
}

#[test]
fn head_on_traffic_blocks_both() {
    let mut radar = prepare_radar();
    let mut arena = Arena::default();
    for record in [
        prepare_record(1, local(0., 0.), Heading::EAST),
        prepare_record(2, local(80., 0.), Heading::WEST),
    ] {
        radar.add(record.id, record.position).expect("inside coverage");
        arena.insert(record);
    }

    assert_eq!(radar.is_blocked_by(arena.get(id(1)).expect("inserted"), &arena), Some(id(2)));
    assert_eq!(radar.is_blocked_by(arena.get(id(2)).expect("inserted"), &arena), Some(id(1)));
}

#[test]
fn traffic_abeam_does_not_block() {
    let mut radar = prepare_radar();
    let mut arena = Arena::default();
    for record in [
        prepare_record(1, local(0., 0.), Heading::EAST),
        prepare_record(2, local(50., 0.), Heading::EAST),
        prepare_record(3, local(-10., 60.), Heading::NORTH),
    ] {
        radar.add(record.id, record.position).expect("inside coverage");
        arena.insert(record);
    }

    // #2 leads #1 on the same course, #3 is abeam and not ahead.
    assert_eq!(radar.is_blocked_by(arena.get(id(1)).expect("inserted"), &arena), Some(id(2)));
    assert_eq!(radar.is_blocked_by(arena.get(id(3)).expect("inserted"), &arena), None);
}
