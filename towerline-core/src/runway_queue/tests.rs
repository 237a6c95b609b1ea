use math::Heading;

use super::{RunwayQueue, SEPARATION};
use crate::comm::MessageState;
use crate::flight_plan::{FlightPlan, FlightRules};
use crate::tests::{AIRPORT, id, local, puppet};
use crate::traffic::{AircraftId, Arena, TrafficRecord};

const T: i64 = 1_000_000;

fn prepare_queue() -> RunwayQueue { RunwayQueue::new(AIRPORT, "09", SEPARATION) }

fn spawn(arena: &mut Arena, raw: u32, planned_time: i64) -> AircraftId {
    let plan = FlightPlan::new(AIRPORT, "EHAM", FlightRules::Ifr);
    let mut record = TrafficRecord::new(id(raw), puppet(&format!("TST{raw}"), local(0., 0.), Heading::EAST), plan);
    record.planned_time = planned_time;
    arena.insert(record);
    id(raw)
}

fn slots(queue: &RunwayQueue, arena: &Arena) -> Vec<i64> {
    queue
        .ids()
        .iter()
        .map(|&id| arena.get(id).expect("queued").runway_slot.expect("slot assigned"))
        .collect()
}

fn assert_separated(queue: &RunwayQueue, arena: &Arena) {
    let slots = slots(queue, arena);
    for pair in slots.windows(2) {
        assert!(pair[1] - pair[0] >= SEPARATION, "slots {slots:?} violate separation");
    }
}

#[test]
fn empty_queue_grants_planned_time() {
    let mut arena = Arena::default();
    let mut queue = prepare_queue();
    let a = spawn(&mut arena, 1, T);
    assert_eq!(queue.request_time_slot(a, &mut arena).expect("known"), T);
    assert_eq!(queue.first_in_departure_queue(), Some(a));
}

#[test]
fn second_aircraft_is_separated() {
    let mut arena = Arena::default();
    let mut queue = prepare_queue();
    let a = spawn(&mut arena, 1, T);
    let b = spawn(&mut arena, 2, T + 30);

    assert_eq!(queue.request_time_slot(a, &mut arena).expect("known"), T);
    assert_eq!(queue.request_time_slot(b, &mut arena).expect("known"), T + SEPARATION);
    assert_eq!(arena.get(a).expect("known").runway_slot, Some(T));
    assert_eq!(queue.ids(), [a, b]);
}

#[test]
fn request_is_idempotent() {
    let mut arena = Arena::default();
    let mut queue = prepare_queue();
    let a = spawn(&mut arena, 1, T);
    let b = spawn(&mut arena, 2, T);
    queue.request_time_slot(a, &mut arena).expect("known");
    let first = queue.request_time_slot(b, &mut arena).expect("known");
    let second = queue.request_time_slot(b, &mut arena).expect("known");
    assert_eq!(first, second);
    assert_eq!(queue.size(), 2);
}

#[test]
fn early_request_goes_before_head() {
    let mut arena = Arena::default();
    let mut queue = prepare_queue();
    let late = spawn(&mut arena, 1, T + 600);
    let early = spawn(&mut arena, 2, T);
    queue.request_time_slot(late, &mut arena).expect("known");
    assert_eq!(queue.request_time_slot(early, &mut arena).expect("known"), T);
    assert_eq!(queue.ids(), [early, late]);
    assert_separated(&queue, &arena);
}

#[test]
fn request_fills_gap() {
    let mut arena = Arena::default();
    let mut queue = prepare_queue();
    let a = spawn(&mut arena, 1, T);
    let c = spawn(&mut arena, 3, T + 1000);
    let b = spawn(&mut arena, 2, T + 10);
    queue.request_time_slot(a, &mut arena).expect("known");
    queue.request_time_slot(c, &mut arena).expect("known");

    assert_eq!(queue.request_time_slot(b, &mut arena).expect("known"), T + SEPARATION);
    assert_eq!(queue.ids(), [a, b, c]);
    assert_separated(&queue, &arena);
}

#[test]
fn narrow_gap_is_skipped() {
    let mut arena = Arena::default();
    let mut queue = prepare_queue();
    let a = spawn(&mut arena, 1, T);
    let b = spawn(&mut arena, 2, T + 200);
    let c = spawn(&mut arena, 3, T + 10);
    queue.request_time_slot(a, &mut arena).expect("known");
    queue.request_time_slot(b, &mut arena).expect("known");

    assert_eq!(queue.request_time_slot(c, &mut arena).expect("known"), T + 200 + SEPARATION);
    assert_eq!(queue.ids(), [a, b, c]);
    assert_separated(&queue, &arena);
}

#[test]
fn many_requests_stay_separated() {
    let mut arena = Arena::default();
    let mut queue = prepare_queue();
    let planned = [0, 500, 20, 40, 1200, 60, 900, 910, 0, 3000];
    for (raw, offset) in (1..).zip(planned) {
        let aircraft = spawn(&mut arena, raw, T + offset);
        let slot = queue.request_time_slot(aircraft, &mut arena).expect("known");
        assert!(slot >= T + offset, "slot {slot} before planned time");
    }
    assert_eq!(queue.size(), planned.len());
    assert_separated(&queue, &arena);
}

#[test]
fn update_first_shifts_all_slots() {
    let mut arena = Arena::default();
    let mut queue = prepare_queue();
    let a = spawn(&mut arena, 1, T);
    let b = spawn(&mut arena, 2, T);
    queue.request_time_slot(a, &mut arena).expect("known");
    queue.request_time_slot(b, &mut arena).expect("known");

    queue.update_first(T + 50, T, &mut arena).expect("known");
    assert_eq!(slots(&queue, &arena), [T + 50, T + 50 + SEPARATION]);

    // Slots in the past are clamped to now.
    queue.update_first(T, T + 100, &mut arena).expect("known");
    assert_eq!(slots(&queue, &arena), [T + 100, T + 100 + SEPARATION]);
}

#[test]
fn remove_clears_currently_cleared() {
    let mut arena = Arena::default();
    let mut queue = prepare_queue();
    let a = spawn(&mut arena, 1, T);
    let b = spawn(&mut arena, 2, T);
    queue.request_time_slot(a, &mut arena).expect("known");
    queue.request_time_slot(b, &mut arena).expect("known");
    queue.set_currently_cleared(Some(a));

    let c = spawn(&mut arena, 3, T - 500);
    queue.request_time_slot(c, &mut arena).expect("known");
    assert_eq!(queue.first_in_departure_queue(), Some(c));
    assert_eq!(queue.currently_cleared(), Some(a), "resort keeps the cleared aircraft");

    assert!(queue.remove_from_queue(a));
    assert_eq!(queue.currently_cleared(), None);
    assert!(!queue.remove_from_queue(a));
    assert_eq!(queue.get_by_id(b), Some(1));
}

#[test]
fn removing_another_aircraft_ends_clearance() {
    let mut arena = Arena::default();
    let mut queue = prepare_queue();
    let a = spawn(&mut arena, 1, T);
    let b = spawn(&mut arena, 2, T);
    queue.request_time_slot(a, &mut arena).expect("known");
    queue.request_time_slot(b, &mut arena).expect("known");
    queue.set_currently_cleared(Some(a));

    assert!(queue.remove_from_queue(b));
    assert_eq!(queue.currently_cleared(), None);
    assert_eq!(queue.ids(), [a]);
}

#[test]
fn first_of_status_skips_other_states() {
    let mut arena = Arena::default();
    let mut queue = prepare_queue();
    let a = spawn(&mut arena, 1, T);
    let b = spawn(&mut arena, 2, T);
    queue.request_time_slot(a, &mut arena).expect("known");
    queue.request_time_slot(b, &mut arena).expect("known");
    arena.get_mut(b).expect("known").state = MessageState::LineUpRunway;

    assert_eq!(queue.first_of_status(MessageState::LineUpRunway, &arena), Some(b));
    assert_eq!(queue.first_of_status(MessageState::ClearedTakeoff, &arena), None);
}

#[test]
fn unknown_aircraft_is_an_error() {
    let mut arena = Arena::default();
    let mut queue = prepare_queue();
    assert!(queue.request_time_slot(id(42), &mut arena).is_err());
    assert!(queue.is_empty());
}
