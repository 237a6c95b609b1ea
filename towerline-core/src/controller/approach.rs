//! Approach control: arrival scheduling, holding and landing clearance.

use bevy::log::{debug, info};

use super::{Controller, ControllerKind, Step, Tick, follow_plan_leg, is_on_ground};
use crate::comm::{Direction, MessageId, MessageState};
use crate::dynamics::{Airport, RunwayUse};
use crate::flight_plan::{Leg, builder};
use crate::runway_queue::APPROACH_DISTANCE_TO_FINAL;
use crate::traffic::{AircraftId, Arena, TrafficRecord};
use crate::try_log_return;

pub(super) fn accept(airport: &mut Airport, arena: &mut Arena, id: AircraftId, now: i64) {
    let record = try_log_return!(arena.get_mut(id), expect "Approach accepted unknown aircraft {id}");
    let runway = try_log_return!(
        airport.active_runway(RunwayUse::Arrival, now),
        expect "{} has no runway for arrivals", airport.code
    )
    .clone();

    if record.plan.gate.is_none() {
        let airline = record.plan.airline.clone();
        record.plan.gate = airport.assign_parking(id, airline.as_deref(), record.radius());
    }

    let performance = record.proxy.performance();
    builder::build_arrival(&mut record.plan, &airport.network, airport.elevation, &runway, &performance);
    record.runway = Some(runway.name.clone());
    record.planned_time = if record.plan.arrival_time > now {
        record.plan.arrival_time
    } else {
        let distance = record.position.distance(runway.threshold);
        now + distance.try_div(performance.approach_speed).map_or(0, |time| time.as_secs_f64().ceil() as i64)
    };
    set_hold_pattern(record, false);

    let queue = try_log_return!(
        airport.queues.get_mut(&runway.name),
        expect "{} has no runway {}", airport.code, runway.name
    );
    match queue.request_time_slot(id, arena) {
        Ok(slot) => debug!("{id} is scheduled to land on {} at {slot}", runway.name),
        Err(err) => bevy::log::warn!("Cannot schedule {id} on runway {}: {err}", runway.name),
    }
}

pub(super) fn update(controller: &mut Controller, airport: &mut Airport, tick: &mut Tick, id: AircraftId) {
    let record = try_log_return!(tick.arena.get_mut(id), expect "Approach update of unknown aircraft {id}");
    follow_plan_leg(record, Leg::Approach..=Leg::Landing);

    let state = record.state;
    let now = tick.now;
    let slot = record.runway_slot.unwrap_or(record.planned_time);
    let planned = record.planned_time;
    let lead = APPROACH_DISTANCE_TO_FINAL
        .try_div(record.proxy.performance().approach_speed)
        .map_or(0, |time| time.as_secs() as i64);
    let vacating = is_on_ground(record, airport.elevation, tick.conf.on_ground_height)
        && record.speed < tick.conf.vacate_speed;

    match state {
        MessageState::AnnounceArrival => {
            let step = Step::main(state, MessageId::Arrival, Direction::AirToGround);
            controller.check(airport, tick, id, &step);
        }
        MessageState::AckArrival => {
            let step = Step::main(state, MessageId::AcknowledgeArrival, Direction::GroundToAir);
            if controller.check(airport, tick, id, &step) {
                let record = try_log_return!(tick.arena.get_mut(id), expect "Approach update of unknown aircraft {id}");
                if slot > planned {
                    debug!("{} ({id}) holds for slot {slot}, {}s after its planned arrival", record.callsign, slot - planned);
                    set_hold_pattern(record, true);
                    record.set_state(MessageState::HoldPattern);
                } else {
                    record.set_state(MessageState::ClearedToLand);
                }
            }
        }
        MessageState::HoldPattern if now + lead >= slot => {
            debug!("{} ({id}) leaves the hold for slot {slot}", record.callsign);
            set_hold_pattern(record, false);
            record.set_state(MessageState::ClearedToLand);
        }
        MessageState::ClearedToLand => {
            let step = Step::main(state, MessageId::ClearedToLand, Direction::GroundToAir);
            controller.check(airport, tick, id, &step);
        }
        MessageState::AckClearedToLand => {
            let step = Step::main(state, MessageId::AcknowledgeClearedToLand, Direction::AirToGround);
            controller.check(airport, tick, id, &step);
        }
        MessageState::LandingTaxi if vacating => {
            info!("{} ({id}) landed at {}", record.callsign, airport.code);
            record.plan.set_leg(Leg::LandingTaxi);
            if let Some(runway) = record.runway.clone()
                && let Some(queue) = airport.queue_mut(&runway)
            {
                queue.remove_from_queue(id);
            }
            controller.queue_handover(tick.arena, id, ControllerKind::Tower, Leg::LandingTaxi);
        }
        _ => {}
    }
}

fn set_hold_pattern(record: &mut TrafficRecord, hold: bool) {
    if record.instruction.hold_pattern != hold {
        record.instruction.hold_pattern = hold;
        record.proxy.set_hold_pattern(hold);
    }
}
