//! Clearance delivery: runway assignment, engine start and squawk.

use bevy::log::debug;

use super::{Controller, ControllerKind, Step, Tick, hold};
use crate::comm::{Direction, MessageId, MessageState, generate_transponder_code};
use crate::dynamics::{Airport, RunwayUse};
use crate::flight_plan::{Leg, builder};
use crate::traffic::{AircraftId, Arena};
use crate::try_log_return;

pub(super) fn accept(airport: &Airport, arena: &mut Arena, id: AircraftId) {
    let record = try_log_return!(arena.get_mut(id), expect "Startup accepted unknown aircraft {id}");
    hold(record, true);
    if record.plan.gate.is_none() {
        bevy::log::warn!("{} is at {} without a parking position", record.callsign, airport.code);
    }
}

pub(super) fn update(controller: &mut Controller, airport: &mut Airport, tick: &mut Tick, id: AircraftId) {
    let record = try_log_return!(tick.arena.get(id), expect "Startup update of unknown aircraft {id}");
    if record.runway.is_none() {
        assign_departure(airport, tick, id);
    }

    let record = try_log_return!(tick.arena.get(id), expect "Startup update of unknown aircraft {id}");
    let (state, departure_time) = (record.state, record.plan.departure_time);
    let conf = tick.conf;
    let now = tick.now;

    match state {
        MessageState::Normal if now >= departure_time - conf.startup_announce_lead_s => {
            let step = Step::main(state, MessageId::AnnounceEngineStart, Direction::AirToGround);
            controller.check(airport, tick, id, &step);
        }
        MessageState::AckHold if now >= departure_time - conf.startup_request_lead_s => {
            let step = Step::main(state, MessageId::RequestEngineStart, Direction::AirToGround);
            controller.check(airport, tick, id, &step);
        }
        MessageState::AckResumeTaxi => {
            assign_transponder(tick, id);
            let step = Step::main(state, MessageId::PermitEngineStart, Direction::GroundToAir);
            if controller.check(airport, tick, id, &step) {
                try_log_return!(tick.arena.get_mut(id), expect "Startup update of unknown aircraft {id}")
                    .set_state(MessageState::TaxiCleared);
            }
        }
        MessageState::TaxiCleared => {
            let step = Step::main(state, MessageId::AcknowledgeEngineStart, Direction::AirToGround);
            controller.check(airport, tick, id, &step);
        }
        MessageState::AckTaxiCleared if now >= departure_time - conf.startup_handoff_lead_s => {
            let step = Step::main(state, MessageId::AcknowledgeSwitchGroundFrequency, Direction::AirToGround);
            if controller.check(airport, tick, id, &step) {
                let leg = if departs_with_pushback(tick, id) { Leg::Pushback } else { Leg::Taxi };
                controller.queue_handover(tick.arena, id, ControllerKind::Ground, leg);
            }
        }
        _ => {}
    }
}

fn departs_with_pushback(tick: &Tick, id: AircraftId) -> bool {
    tick.arena.get(id).is_ok_and(|record| record.plan.waypoints().first().is_some_and(|wp| wp.leg == Leg::Pushback))
}

/// Picks the departure runway and builds the taxi route to it.
fn assign_departure(airport: &Airport, tick: &mut Tick, id: AircraftId) {
    let runway = try_log_return!(
        airport.active_runway(RunwayUse::Departure, tick.now),
        expect "{} has no runway for departures", airport.code
    );
    let record = try_log_return!(tick.arena.get_mut(id), expect "Runway assignment of unknown aircraft {id}");
    let performance = record.proxy.performance();
    if !builder::build_departure(&mut record.plan, &airport.network, airport.elevation, runway, &performance) {
        return;
    }

    record.runway = Some(runway.name.clone());
    record.planned_time = record.plan.departure_time;
    record.refresh_intentions();
    debug!(
        "{} departs {} from runway {} via {} waypoints",
        record.callsign,
        airport.code,
        runway.name,
        record.plan.waypoints().len()
    );
}

fn assign_transponder(tick: &mut Tick, id: AircraftId) {
    let record = try_log_return!(tick.arena.get_mut(id), expect "Squawk assignment of unknown aircraft {id}");
    if record.transponder.is_none() {
        let code = generate_transponder_code(record.plan.rules, tick.rng);
        record.proxy.set_transponder_code(&code);
        record.transponder = Some(code);
    }
}
