//! Ground control: push-back, taxi and hold-position.
//!
//! Departures are taxied from their gate to the runway holding point and handed to the tower.
//! Arrivals are taxied from the runway exit to their parking, where they sign off.
//!
//! While taxiing, a side dialogue holds an aircraft in front of conflicting traffic
//! and resumes taxi once the conflict clears.
//! An aircraft never holds for an aircraft that waits for it,
//! so two aircraft cannot hold for each other.

use bevy::log::{debug, info};
use ordered_float::OrderedFloat;

use super::{Controller, ControllerKind, Step, Tick, follow_plan_leg, hold};
use crate::comm::{Direction, MessageId, MessageState};
use crate::dynamics::Airport;
use crate::flight_plan::Leg;
use crate::traffic::{AircraftId, Arena};
use crate::{Conf, try_log_return};

/// Number of upcoming intended segments checked for oncoming traffic.
const ONCOMING_LOOKAHEAD_SEGMENTS: usize = 2;

pub(super) fn accept(arena: &mut Arena, id: AircraftId) {
    let record = try_log_return!(arena.get_mut(id), expect "Ground accepted unknown aircraft {id}");
    hold(record, true);
}

pub(super) fn update(controller: &mut Controller, airport: &mut Airport, tick: &mut Tick, id: AircraftId) {
    let record = try_log_return!(tick.arena.get_mut(id), expect "Ground update of unknown aircraft {id}");
    follow_plan_leg(record, Leg::Pushback..=Leg::Taxi);

    match record.leg() {
        Leg::ParkingTaxi | Leg::Pushback | Leg::Taxi => update_departure(controller, airport, tick, id),
        Leg::LandingTaxi => update_arrival(controller, airport, tick, id),
        leg => bevy::log::trace!("{} ignores {} on {leg:?}", controller.name(), record.callsign),
    }
}

fn update_departure(controller: &mut Controller, airport: &mut Airport, tick: &mut Tick, id: AircraftId) {
    let record = try_log_return!(tick.arena.get(id), expect "Ground update of unknown aircraft {id}");
    let state = record.state;
    let may_request = !record.is_user || record.proxy.taxi_clearance_requested();
    let left_gate = record.leg() >= Leg::Taxi;
    let at_hold_point = record
        .plan
        .last_of_leg(Leg::Taxi)
        .is_none_or(|waypoint| record.position.distance(waypoint.position) <= tick.conf.hold_short_distance);

    if left_gate {
        airport.release_parking(id);
    }

    match state {
        MessageState::Normal if may_request => {
            let step = Step::main(state, MessageId::RequestPushbackClearance, Direction::AirToGround);
            controller.check(airport, tick, id, &step);
        }
        MessageState::AckHold => {
            let step = Step::main(state, MessageId::PermitPushbackClearance, Direction::GroundToAir);
            if controller.check(airport, tick, id, &step) {
                set_state(tick.arena, id, MessageState::TaxiCleared);
            }
        }
        MessageState::TaxiCleared => {
            let step = Step::main(state, MessageId::IssueTaxiClearance, Direction::GroundToAir);
            controller.check(airport, tick, id, &step);
        }
        MessageState::AckTaxiCleared => {
            let step = Step::main(state, MessageId::AcknowledgeTaxiClearance, Direction::AirToGround);
            if controller.check(airport, tick, id, &step) {
                let record = try_log_return!(tick.arena.get_mut(id), expect "Ground update of unknown aircraft {id}");
                hold(record, false);
            }
        }
        MessageState::StartTaxi if at_hold_point => {
            let record = try_log_return!(tick.arena.get_mut(id), expect "Ground update of unknown aircraft {id}");
            hold(record, true);
            record.hold_state = MessageState::Normal;
            record.instruction.resume_taxi = false;

            let step = Step::main(state, MessageId::ReportRunwayHoldShort, Direction::AirToGround);
            controller.check(airport, tick, id, &step);
        }
        MessageState::StartTaxi => taxi_separation(controller, airport, tick, id),
        MessageState::ReportRunway => {
            let step = Step::main(state, MessageId::AcknowledgeReportRunwayHoldShort, Direction::GroundToAir);
            controller.check(airport, tick, id, &step);
        }
        MessageState::AckReportRunway => {
            let step = Step::main(state, MessageId::SwitchTowerFrequency, Direction::GroundToAir);
            controller.check(airport, tick, id, &step);
        }
        MessageState::SwitchGroundTower => {
            let step = Step::main(state, MessageId::AcknowledgeSwitchTowerFrequency, Direction::AirToGround);
            if controller.check(airport, tick, id, &step) {
                controller.queue_handover(tick.arena, id, ControllerKind::Tower, Leg::Takeoff);
            }
        }
        _ => {}
    }
}

fn update_arrival(controller: &mut Controller, airport: &mut Airport, tick: &mut Tick, id: AircraftId) {
    let record = try_log_return!(tick.arena.get(id), expect "Ground update of unknown aircraft {id}");
    let state = record.state;
    let gate = record.plan.gate.clone();
    let parking_position = gate
        .as_deref()
        .and_then(|gate| airport.parking(gate))
        .map(|slot| slot.parking.position)
        .or_else(|| record.plan.waypoints().last().map(|waypoint| waypoint.position));
    let parked = match parking_position {
        Some(position) => record.position.distance(position) <= tick.conf.parking_reached,
        None => record.plan.current().is_none(),
    };

    match state {
        MessageState::Normal => {
            let step = Step::main(state, MessageId::InitiateContact, Direction::AirToGround);
            controller.check(airport, tick, id, &step);
        }
        MessageState::AckHold => {
            let step = Step::main(state, MessageId::AcknowledgeInitiateContact, Direction::GroundToAir);
            if controller.check(airport, tick, id, &step) {
                let record = try_log_return!(tick.arena.get_mut(id), expect "Ground update of unknown aircraft {id}");
                record.set_state(MessageState::StartTaxi);
                hold(record, false);
            }
        }
        MessageState::StartTaxi if parked => {
            let record = try_log_return!(tick.arena.get_mut(id), expect "Ground update of unknown aircraft {id}");
            record.plan.set_leg(Leg::Parking);
            hold(record, true);
            info!("{} ({id}) parked at {}", record.callsign, gate.as_deref().unwrap_or("the end of its route"));

            if let Some(gate) = &gate
                && !airport.occupy_parking(gate, id)
            {
                bevy::log::warn!("{id} parked at {gate}, which is held by another aircraft");
            }
            controller.sign_off(airport, tick.arena, id);
        }
        MessageState::StartTaxi => taxi_separation(controller, airport, tick, id),
        _ => {}
    }
}

fn set_state(arena: &mut Arena, id: AircraftId, state: MessageState) {
    let record = try_log_return!(arena.get_mut(id), expect "Dialogue update of unknown aircraft {id}");
    record.set_state(state);
}

/// Runs the hold-position side dialogue of a taxiing aircraft.
fn taxi_separation(controller: &mut Controller, airport: &Airport, tick: &mut Tick, id: AircraftId) {
    let conflict = find_conflict(airport, tick.arena, tick.conf, tick.now, id);
    let record = try_log_return!(tick.arena.get_mut(id), expect "Taxi separation of unknown aircraft {id}");
    let hold_state = record.hold_state;

    match hold_state {
        MessageState::Normal => match conflict {
            Some(other) => {
                if record.instruction.waits_for != Some(other) {
                    debug!("{} ({id}) holds for {other}", record.callsign);
                }
                hold(record, true);
                record.instruction.waits_for = Some(other);
                record.wait_started.get_or_insert(tick.now);

                let step = Step::hold(hold_state, MessageId::HoldPosition, Direction::GroundToAir);
                controller.check(airport, tick, id, &step);
            }
            None if record.instruction.hold_position => hold(record, false),
            None => {}
        },
        MessageState::AckHold => {
            let step = Step::hold(hold_state, MessageId::AcknowledgeHoldPosition, Direction::AirToGround);
            if controller.check(airport, tick, id, &step) {
                let record = try_log_return!(tick.arena.get_mut(id), expect "Taxi separation of unknown aircraft {id}");
                record.hold_state = MessageState::HoldPosition;
            }
        }
        MessageState::HoldPosition => {
            let timed_out = record.wait_started.is_some_and(|since| tick.now - since >= tick.conf.resume_wait_timeout_s);
            if conflict.is_some() && !timed_out {
                record.instruction.waits_for = conflict;
                return;
            }

            let step = Step::hold(hold_state, MessageId::ResumeTaxi, Direction::GroundToAir);
            if controller.check(airport, tick, id, &step) {
                let record = try_log_return!(tick.arena.get_mut(id), expect "Taxi separation of unknown aircraft {id}");
                record.hold_state = MessageState::AckResumeTaxi;
                record.instruction.resume_taxi = true;
                hold(record, false);
            }
        }
        MessageState::AckResumeTaxi => {
            let step = Step::hold(hold_state, MessageId::AcknowledgeResumeTaxi, Direction::AirToGround);
            if controller.check(airport, tick, id, &step) {
                let record = try_log_return!(tick.arena.get_mut(id), expect "Taxi separation of unknown aircraft {id}");
                record.hold_state = MessageState::Normal;
                record.instruction.resume_taxi = false;
            }
        }
        _ => {}
    }
}

/// The aircraft `id` has to hold for, if any.
///
/// In order of precedence, this is
/// the aircraft blocking it on the ground radar,
/// an aircraft occupying the opposite direction of one of its next intended segments,
/// and the nearest aircraft it has to give way to.
/// Aircraft waiting for `id` are never returned.
pub(crate) fn find_conflict(
    airport: &Airport,
    arena: &Arena,
    conf: &Conf,
    now: i64,
    id: AircraftId,
) -> Option<AircraftId> {
    let me = arena.get(id).ok()?;
    let waits_for_me = |other: AircraftId| {
        arena.get(other).is_ok_and(|record| record.instruction.waits_for == Some(id))
    };

    if let Some(blocker) = airport.radar.is_blocked_by(me, arena)
        && !waits_for_me(blocker)
    {
        return Some(blocker);
    }

    for &segment in me.intentions.iter().take(ONCOMING_LOOKAHEAD_SEGMENTS) {
        let Some(opposite) = airport.network.segment(segment).and_then(|segment| segment.opposite) else {
            continue;
        };
        if let Some(other) = airport.blocks.blocker(opposite, id, now)
            && !waits_for_me(other)
        {
            return Some(other);
        }
    }

    arena
        .iter()
        .filter(|other| {
            airport.radar.contains(other.id)
                && other.check_position_and_intentions(me, conf.intentions_distance)
                && !waits_for_me(other.id)
        })
        .min_by_key(|other| OrderedFloat(other.position.distance(me.position).into_meters()))
        .map(|other| other.id)
}
