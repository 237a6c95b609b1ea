use std::sync::Arc;

use math::{Heading, Length};
use strum::IntoEnumIterator;

use super::{AtcManager, Error, StationRef};
use crate::Conf;
use crate::context::MemoryContext;
use crate::controller::ControllerKind;
use crate::dynamics::{Airport, AirportDynamics};
use crate::flight_plan::{FlightPlan, FlightRules, Leg};
use crate::proxy::PuppetProxy;
use crate::tests::{AIRPORT, id, local, prepare_store_airport, puppet};
use crate::traffic::{AircraftId, TrafficRecord};

const T0: i64 = 1_000_000;

fn station(kind: ControllerKind) -> StationRef { StationRef { airport: AIRPORT.into(), kind } }

fn prepare_manager() -> AtcManager {
    let mut manager = AtcManager::with_seed(3);
    let airport = Airport::build(&prepare_store_airport(), &Conf::default()).expect("fixture builds");
    manager.add_airport(AirportDynamics::new(airport)).expect("first airport");
    for kind in ControllerKind::iter() {
        manager.add_controller(station(kind));
    }
    manager
}

fn spawn_departure(manager: &mut AtcManager, raw: u32) -> (AircraftId, Arc<PuppetProxy>) {
    let proxy = puppet("KLM1", local(-300., -400.), Heading::NORTH);
    let mut plan = FlightPlan::new(AIRPORT, "EHAM", FlightRules::Ifr);
    plan.departure_time = T0 + 600;
    plan.gate = Some("A1".into());
    manager.spawn_traffic(id(raw), proxy.clone(), plan, T0).expect("departure spawns");
    (id(raw), proxy)
}

fn spawn_inbound(manager: &mut AtcManager, raw: u32, east: f64) -> AircraftId {
    let proxy = puppet("DLH7", local(east, 0.), Heading::EAST);
    proxy.write(|state| state.altitude = Length::from_feet(5000.));
    let mut plan = FlightPlan::new("EDDF", AIRPORT, FlightRules::Ifr);
    plan.arrival_time = T0 + 900;
    assert!(plan.set_leg(Leg::Cruise));
    manager.spawn_traffic(id(raw), proxy, plan, T0).expect("cruise spawns");
    id(raw)
}

fn tick(manager: &mut AtcManager, now: i64) -> MemoryContext {
    let mut ctx = MemoryContext { now, comm_mhz: [Some(121.7), Some(119.05)], ..Default::default() };
    manager.tick(&mut ctx, &Conf::default());
    ctx
}

#[test]
fn staffing_needs_loaded_airport() {
    let mut manager = prepare_manager();
    assert_eq!(manager.stations().len(), 4);

    assert!(!manager.add_controller(StationRef { airport: "NOPE".into(), kind: ControllerKind::Tower }));
    assert!(!manager.add_controller(station(ControllerKind::Tower)), "already staffed");

    assert!(manager.remove_controller(&station(ControllerKind::Tower)));
    assert!(!manager.remove_controller(&station(ControllerKind::Tower)));
    assert_eq!(manager.stations().len(), 3);
}

#[test]
fn duplicate_airport_is_rejected() {
    let mut manager = prepare_manager();
    let airport = Airport::build(&prepare_store_airport(), &Conf::default()).expect("fixture builds");
    let err = manager.add_airport(AirportDynamics::new(airport)).expect_err("same code");
    assert!(matches!(&err, Error::DuplicateAirport(code) if code == AIRPORT), "{err:?}");
}

#[test]
fn spawn_validates_aircraft_and_airport() {
    let mut manager = prepare_manager();
    spawn_departure(&mut manager, 1);

    let plan = FlightPlan::new(AIRPORT, "EHAM", FlightRules::Ifr);
    let err = manager
        .spawn_traffic(id(1), puppet("KLM2", local(0., 0.), Heading::NORTH), plan, T0)
        .expect_err("id is taken");
    assert!(matches!(err, Error::DuplicateAircraft(dup) if dup == id(1)), "{err:?}");

    let plan = FlightPlan::new("NOPE", "EHAM", FlightRules::Ifr);
    let err = manager
        .spawn_traffic(id(2), puppet("KLM3", local(0., 0.), Heading::NORTH), plan, T0)
        .expect_err("airport is not loaded");
    assert!(matches!(&err, Error::UnknownAirport(code) if code == "NOPE"), "{err:?}");
    assert!(!manager.arena().contains(id(2)));
}

#[test]
fn spawned_departure_reserves_its_gate() {
    let mut manager = prepare_manager();
    let (klm, _) = spawn_departure(&mut manager, 1);

    let record = manager.arena().get(klm).expect("spawned");
    assert_eq!(record.station, Some(station(ControllerKind::Startup)));
    assert!(record.plan.requires_pushback);
    assert!(record.instruction.hold_position);

    let airport = &manager.airport(AIRPORT).expect("loaded").airport;
    assert_eq!(airport.parking("A1").expect("A1").occupant, Some(klm));
    assert!(airport.radar.contains(klm));
}

#[test]
fn closing_a_station_releases_its_aircraft() {
    let mut manager = prepare_manager();
    let (klm, _) = spawn_departure(&mut manager, 1);

    assert!(manager.remove_controller(&station(ControllerKind::Startup)));
    assert_eq!(manager.arena().get(klm).expect("still simulated").station, None);
    let dynamics = manager.airport(AIRPORT).expect("loaded");
    assert!(dynamics.controller(ControllerKind::Startup).active().is_empty());
    assert!(!dynamics.airport.radar.contains(klm));
}

#[test]
fn handover_to_closed_station_is_refused() {
    let mut manager = prepare_manager();
    let (klm, _) = spawn_departure(&mut manager, 1);
    manager.remove_controller(&station(ControllerKind::Ground));

    assert!(!manager.handover(klm, &station(ControllerKind::Ground), Leg::Taxi, T0));
    let record = manager.arena().get(klm).expect("still simulated");
    assert_eq!(record.station, Some(station(ControllerKind::Startup)));
    assert_eq!(record.leg(), Leg::ParkingTaxi);
}

#[test]
fn inbound_traffic_contacts_approach_within_range() {
    let mut manager = prepare_manager();
    let near = spawn_inbound(&mut manager, 1, -20_000.);
    let far = spawn_inbound(&mut manager, 2, -80_000.);
    assert_eq!(manager.arena().get(near).expect("spawned").station, None);

    tick(&mut manager, T0 + 1);

    let record = manager.arena().get(near).expect("spawned");
    assert_eq!(record.station, Some(station(ControllerKind::Approach)));
    assert_eq!(record.leg(), Leg::Approach);
    assert_eq!(record.runway.as_deref(), Some("09"));
    assert_eq!(record.runway_slot, Some(T0 + 900));

    let record = manager.arena().get(far).expect("spawned");
    assert_eq!(record.station, None);
    assert_eq!(record.leg(), Leg::Cruise);
}

#[test]
fn uncontrolled_dead_aircraft_are_removed() {
    let mut manager = prepare_manager();
    let proxy = puppet("DLH7", local(-80_000., 0.), Heading::EAST);
    let mut plan = FlightPlan::new("EDDF", AIRPORT, FlightRules::Ifr);
    assert!(plan.set_leg(Leg::Cruise));
    manager.spawn_traffic(id(1), proxy.clone(), plan, T0).expect("cruise spawns");

    proxy.write(|state| state.dead = true);
    tick(&mut manager, T0 + 1);
    assert!(!manager.arena().contains(id(1)));
}

#[test]
fn sign_off_forgets_aircraft() {
    let mut manager = prepare_manager();
    let (klm, _) = spawn_departure(&mut manager, 1);

    assert!(manager.sign_off(klm));
    assert!(!manager.sign_off(klm), "no longer controlled");

    let dynamics = manager.airport(AIRPORT).expect("loaded");
    assert_eq!(dynamics.owner_of(klm), None);
    assert!(!dynamics.airport.radar.contains(klm));
    assert_eq!(manager.arena().get(klm).expect("still simulated").station, None);
}

#[test]
fn parked_arrival_turns_around() {
    let mut manager = prepare_manager();
    let klm = id(1);
    let mut plan = FlightPlan::new("EHAM", AIRPORT, FlightRules::Ifr);
    plan.gate = Some("A1".into());
    assert!(plan.set_leg(Leg::Parking));
    let proxy = puppet("KLM1", local(-300., -400.), Heading::NORTH);
    manager.arena_mut().insert(TrafficRecord::new(klm, proxy, plan));

    manager.turn_around(klm, T0 + 900, T0 + 5000, T0).expect("parked");

    let record = manager.arena().get(klm).expect("still simulated");
    assert_eq!(record.leg(), Leg::ParkingTaxi);
    assert_eq!(record.plan.departure, AIRPORT);
    assert_eq!(record.plan.arrival, "EHAM");
    assert_eq!(record.plan.departure_time, T0 + 900);
    assert_eq!(record.plan.iteration(), 1);
    assert_eq!(record.station, Some(station(ControllerKind::Startup)));
    let airport = &manager.airport(AIRPORT).expect("loaded").airport;
    assert_eq!(airport.parking("A1").expect("A1").occupant, Some(klm));
}

#[test]
fn controlled_aircraft_cannot_turn_around() {
    let mut manager = prepare_manager();
    let (klm, _) = spawn_departure(&mut manager, 1);
    let err = manager.turn_around(klm, T0 + 900, T0 + 5000, T0).expect_err("still at startup");
    assert!(matches!(err, Error::NotParked(_)), "{err:?}");
}

#[test]
fn user_controller_history() {
    let mut manager = prepare_manager();
    let user = id(9);
    manager
        .init_user(user, puppet("PH-USR", local(-290., -400.), Heading::NORTH), AIRPORT, T0)
        .expect("user spawns");
    assert_eq!(manager.user_aircraft(), Some(user));
    assert_eq!(manager.user_controller(), Some(&station(ControllerKind::Ground)));
    assert_eq!(manager.previous_user_controller(), None);

    let record = manager.arena().get(user).expect("spawned");
    assert!(record.is_user);
    assert_eq!(record.plan.gate.as_deref(), Some("A1"));
    assert_eq!(record.plan.rules, FlightRules::Vfr);
    assert_eq!(record.leg(), Leg::Pushback);

    assert!(manager.handover(user, &station(ControllerKind::Tower), Leg::Takeoff, T0));
    tick(&mut manager, T0 + 1);
    assert_eq!(manager.user_controller(), Some(&station(ControllerKind::Tower)));
    assert_eq!(manager.previous_user_controller(), Some(&station(ControllerKind::Ground)));

    manager.reposition();
    assert_eq!(manager.user_aircraft(), None);
    assert_eq!(manager.user_controller(), None);
    assert!(!manager.arena().contains(user));
}

#[test]
fn user_is_not_routed_to_approach_after_take_off() {
    let mut manager = prepare_manager();
    let user = id(9);
    manager
        .init_user(user, puppet("PH-USR", local(-290., -400.), Heading::NORTH), AIRPORT, T0)
        .expect("user spawns");
    assert_eq!(manager.arena().get(user).expect("spawned").plan.arrival, "");

    assert!(manager.sign_off(user));
    assert!(manager.arena_mut().get_mut(user).expect("still simulated").plan.set_leg(Leg::Climb));
    tick(&mut manager, T0 + 1);

    let record = manager.arena().get(user).expect("still simulated");
    assert_eq!(record.station, None, "the user has no destination to be routed to");
    assert_eq!(record.leg(), Leg::Climb);
    let approach = manager.airport(AIRPORT).expect("loaded").controller(ControllerKind::Approach);
    assert!(approach.active().is_empty());
}

#[test]
fn shutdown_stops_all_traffic() {
    let mut manager = prepare_manager();
    let (klm, _) = spawn_departure(&mut manager, 1);

    manager.shutdown();
    assert!(manager.is_shutting_down());
    assert!(manager.arena().is_empty());
    assert!(manager.stations().is_empty());
    assert!(!manager.sign_off(klm));

    let ctx = tick(&mut manager, T0 + 1);
    assert!(ctx.outputs.is_empty());
    let dynamics = manager.airport(AIRPORT).expect("airports stay loaded");
    assert!(dynamics.controller(ControllerKind::Startup).active().is_empty());
    assert_eq!(dynamics.airport.parking("A1").expect("A1").occupant, None);
}
