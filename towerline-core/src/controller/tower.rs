//! Tower control: line-up and take-off from the runway queue, and runway vacating after landing.

use bevy::log::{debug, info, warn};

use super::{Controller, ControllerKind, Step, Tick, follow_plan_leg, hold, is_on_ground};
use crate::comm::{Direction, MessageId, MessageState};
use crate::dynamics::Airport;
use crate::flight_plan::Leg;
use crate::traffic::{AircraftId, Arena};
use crate::{try_log, try_log_return};

pub(super) fn accept(airport: &mut Airport, arena: &mut Arena, id: AircraftId) {
    let record = try_log_return!(arena.get_mut(id), expect "Tower accepted unknown aircraft {id}");
    if record.leg() != Leg::Takeoff {
        return;
    }

    hold(record, true);
    let runway = try_log_return!(
        record.runway.clone(),
        expect "{} reached the tower of {} without a departure runway", record.callsign, airport.code
    );
    let queue = try_log_return!(
        airport.queues.get_mut(&runway),
        expect "{} has no runway {runway}", airport.code
    );
    if let Err(err) = queue.request_time_slot(id, arena) {
        warn!("Cannot queue {id} for runway {runway}: {err}");
    }
}

pub(super) fn update(controller: &mut Controller, airport: &mut Airport, tick: &mut Tick, id: AircraftId) {
    let record = try_log_return!(tick.arena.get_mut(id), expect "Tower update of unknown aircraft {id}");
    follow_plan_leg(record, Leg::Takeoff..=Leg::Climb);

    match record.leg() {
        Leg::Takeoff | Leg::Climb => update_departure(controller, airport, tick, id),
        Leg::LandingTaxi => update_arrival(controller, airport, tick, id),
        leg => bevy::log::trace!("{} ignores {} on {leg:?}", controller.name(), record.callsign),
    }
}

fn update_departure(controller: &mut Controller, airport: &mut Airport, tick: &mut Tick, id: AircraftId) {
    let now = tick.now;
    let record = try_log_return!(tick.arena.get(id), expect "Tower update of unknown aircraft {id}");
    let state = record.state;
    let slot = record.runway_slot.unwrap_or(record.planned_time);
    let airborne = record.leg() >= Leg::Climb
        || !is_on_ground(record, airport.elevation, tick.conf.airborne_height);
    let runway = try_log_return!(
        record.runway.clone(),
        expect "{} departs {} without a runway", record.callsign, airport.code
    );

    if state >= MessageState::AckClearedTakeoff {
        if airborne {
            info!("{} ({id}) is airborne from runway {runway} of {}", record.callsign, airport.code);
            let record = try_log_return!(tick.arena.get_mut(id), expect "Tower update of unknown aircraft {id}");
            record.plan.set_leg(Leg::Climb);
            controller.sign_off(airport, tick.arena, id);
        }
        return;
    }

    let queue = try_log_return!(airport.queues.get(&runway), expect "{} has no runway {runway}", airport.code);
    if queue.first_in_departure_queue() != Some(id) {
        let blocker = airport.radar.is_blocked_by(record, tick.arena);
        let record = try_log_return!(tick.arena.get_mut(id), expect "Tower update of unknown aircraft {id}");
        hold(record, true);
        record.instruction.waits_for = blocker;
        return;
    }

    let runway_free = queue.currently_cleared().is_none_or(|cleared| cleared == id);
    {
        let record = try_log_return!(tick.arena.get_mut(id), expect "Tower update of unknown aircraft {id}");
        hold(record, slot > now);
    }

    match state {
        MessageState::AckSwitchGroundTower => {
            let step = Step::main(state, MessageId::LineUpRwy, Direction::GroundToAir);
            controller.check(airport, tick, id, &step);
        }
        MessageState::LineUpRunway => {
            let step = Step::main(state, MessageId::AcknowledgeLineUpRwy, Direction::AirToGround);
            if controller.check(airport, tick, id, &step) {
                let record = try_log_return!(tick.arena.get_mut(id), expect "Tower update of unknown aircraft {id}");
                record.set_state(MessageState::ClearedTakeoff);
            }
        }
        MessageState::ClearedTakeoff if slot <= now && runway_free => {
            let step = Step::main(state, MessageId::ClearedForTakeoff, Direction::GroundToAir);
            if !controller.check(airport, tick, id, &step) {
                return;
            }

            let queue = try_log_return!(airport.queues.get_mut(&runway), expect "{} has no runway {runway}", airport.code);
            queue.set_currently_cleared(Some(id));
            if slot < now {
                debug!("{id} takes off {}s after its slot, shifting runway {runway}", now - slot);
                try_log!(
                    queue.update_first(now, now, tick.arena),
                    expect "Cannot shift runway {runway} of {}" (airport.code)
                    or return
                );
            }
        }
        _ => {}
    }
}

fn update_arrival(controller: &mut Controller, airport: &Airport, tick: &mut Tick, id: AircraftId) {
    let record = try_log_return!(tick.arena.get(id), expect "Tower update of unknown aircraft {id}");
    let state = record.state;

    match state {
        MessageState::LandingTaxi => {
            let step = Step::main(state, MessageId::SwitchGroundFrequencyArrival, Direction::GroundToAir);
            controller.check(airport, tick, id, &step);
        }
        MessageState::SwitchTowerToGround => {
            let step =
                Step::main(state, MessageId::AcknowledgeSwitchGroundFrequencyArrival, Direction::AirToGround);
            if controller.check(airport, tick, id, &step) {
                controller.queue_handover(tick.arena, id, ControllerKind::Ground, Leg::LandingTaxi);
            }
        }
        _ => {}
    }
}
