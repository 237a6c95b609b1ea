//! Controllers and the dialogue logic they share.
//!
//! Every airport runs one controller of each [`ControllerKind`].
//! A controller keeps a list of active aircraft, polls them once per tick
//! and advances their dialogue by at most one transmission per
//! [`Conf::transmission_interval_s`](crate::Conf::transmission_interval_s).
//! The transitions specific to each kind live in the submodules.

use std::ops::RangeInclusive;
use std::sync::Arc;

use bevy::log::{debug, error, info, trace};
use math::{Length, Speed};
use rand::rngs::SmallRng;

use crate::comm::{Direction, Frequency, MessageId, MessageParams, MessageState, Transmission, format_message};
use crate::context::SimContext;
use crate::dynamics::Airport;
use crate::flight_plan::{FlightPlan, Leg};
use crate::manager::StationRef;
use crate::proxy::FlightProxy;
use crate::traffic::{AircraftId, Arena, Instruction, PositionReport, TrafficRecord};
use crate::{Conf, try_log, try_log_return};

mod approach;
mod ground;
mod startup;
mod tower;


/// Distance at which a waypoint in the air is considered reached.
pub const AIR_WAYPOINT_REACHED: Length<f64> = Length::from_nm(0.5);

/// The four stations staffed at every airport.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, enum_map::Enum, strum::EnumIter,
)]
pub enum ControllerKind {
    /// Clearance delivery, handling engine start at the gate.
    Startup,
    Ground,
    Tower,
    Approach,
}

impl ControllerKind {
    /// The dialogue state an aircraft handed over on `leg` starts in.
    #[must_use]
    pub fn entry_state(self, leg: Leg) -> MessageState {
        match (self, leg) {
            (Self::Startup | Self::Ground, _) => MessageState::Normal,
            (Self::Tower, Leg::LandingTaxi) => MessageState::LandingTaxi,
            (Self::Tower, _) => MessageState::AckSwitchGroundTower,
            (Self::Approach, _) => MessageState::AnnounceArrival,
        }
    }
}

/// A pending transfer of an aircraft to another station.
#[derive(Debug, Clone, PartialEq)]
pub struct Handover {
    pub id:  AircraftId,
    pub to:  StationRef,
    pub leg: Leg,
}

/// The plan and position of an aircraft reported to a controller.
pub struct Announcement {
    pub id:             AircraftId,
    pub proxy:          Arc<dyn FlightProxy>,
    pub plan:           FlightPlan,
    /// Index of the current waypoint in `plan`.
    pub waypoint_index: usize,
    pub leg:            Leg,
    pub radius:         Length<f64>,
    pub report:         PositionReport,
}

/// Which of the two dialogues of an aircraft a transmission belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialog {
    /// Tracked in [`TrafficRecord::state`].
    Main,
    /// The hold-position exchange while taxiing, tracked in [`TrafficRecord::hold_state`].
    Hold,
}

/// A transmission that advances a dialogue by one state.
#[derive(Debug, Clone)]
pub struct Step {
    /// The transmission is only made while the dialogue is within this window.
    pub window:    RangeInclusive<MessageState>,
    pub message:   MessageId,
    pub direction: Direction,
    pub dialog:    Dialog,
}

impl Step {
    #[must_use]
    pub fn main(state: MessageState, message: MessageId, direction: Direction) -> Self {
        Self { window: state..=state, message, direction, dialog: Dialog::Main }
    }

    #[must_use]
    pub fn hold(state: MessageState, message: MessageId, direction: Direction) -> Self {
        Self { window: state..=state, message, direction, dialog: Dialog::Hold }
    }
}

/// Everything a controller needs during one tick besides its airport.
pub struct Tick<'a> {
    pub arena: &'a mut Arena,
    pub ctx:   &'a mut dyn SimContext,
    pub conf:  &'a Conf,
    pub rng:   &'a mut SmallRng,
    /// Current time in epoch seconds.
    pub now:   i64,
}

pub struct Controller {
    station:           StationRef,
    name:              String,
    frequency:         Option<Frequency>,
    active:            Vec<AircraftId>,
    last_transmission: Option<i64>,
    available:         bool,
    pending:           Vec<Handover>,
}

impl Controller {
    #[must_use]
    pub fn new(station: StationRef, name: String, frequency: Option<Frequency>) -> Self {
        Self {
            station,
            name,
            frequency,
            active: Vec::new(),
            last_transmission: None,
            available: true,
            pending: Vec::new(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> ControllerKind { self.station.kind }

    #[must_use]
    pub fn station(&self) -> &StationRef { &self.station }

    #[must_use]
    pub fn name(&self) -> &str { &self.name }

    #[must_use]
    pub fn frequency(&self) -> Option<Frequency> { self.frequency }

    /// Aircraft owned by this controller, in order of acceptance.
    #[must_use]
    pub fn active(&self) -> &[AircraftId] { &self.active }

    #[must_use]
    pub fn contains(&self, id: AircraftId) -> bool { self.active.contains(&id) }

    /// Whether the controller may transmit now.
    #[must_use]
    pub fn is_available(&self) -> bool { self.available }

    #[must_use]
    pub fn last_transmission(&self) -> Option<i64> { self.last_transmission }

    /// Takes the handovers requested since the last call.
    pub fn take_handovers(&mut self) -> Vec<Handover> { std::mem::take(&mut self.pending) }

    /// Accepts `id` from another station, or from nowhere when it enters the simulation.
    pub fn handover(&mut self, airport: &mut Airport, arena: &mut Arena, id: AircraftId, leg: Leg, now: i64) {
        let kind = self.kind();
        {
            let record =
                try_log_return!(arena.get_mut(id), expect "{} cannot accept unknown aircraft {id}", self.name);
            record.plan.set_leg(leg);
            record.set_state(kind.entry_state(leg));
            record.hold_state = MessageState::Normal;
            record.instruction.waits_for = None;
            record.wait_started = None;
            record.station = Some(self.station.clone());

            if leg.is_surface()
                && let Err(err) = airport.radar.add(id, record.position)
            {
                error!("{} cannot track {}: {err}", self.name, record.callsign);
            }
            debug!("{} accepted {} ({id}) on {leg:?}", self.name, record.callsign);
        }

        if !self.active.contains(&id) {
            self.active.push(id);
        }

        match kind {
            ControllerKind::Startup => startup::accept(airport, arena, id),
            ControllerKind::Ground => ground::accept(arena, id),
            ControllerKind::Tower => tower::accept(airport, arena, id),
            ControllerKind::Approach => approach::accept(airport, arena, id, now),
        }
    }

    /// Takes control of the announced aircraft, or refreshes it if already controlled.
    ///
    /// An aircraft without a record gets one from the announced plan, waypoint index and radius.
    /// An uncontrolled record keeps its plan and only takes the report and radius.
    /// Either is then accepted on the announced leg.
    /// A controlled aircraft takes the report and radius and advances its dialogue.
    /// Aircraft controlled by another station are logged and ignored.
    pub fn announce_position(&mut self, airport: &mut Airport, tick: &mut Tick, announcement: Announcement) {
        let Announcement { id, proxy, mut plan, waypoint_index, leg, radius, report } = announcement;

        if self.contains(id) {
            let record =
                try_log_return!(tick.arena.get_mut(id), expect "{} has no record of active aircraft {id}", self.name);
            record.plan.radius = radius;
            self.update_aircraft_information(airport, tick, id, report);
            return;
        }

        match tick.arena.get_mut(id) {
            Ok(record) if record.station.is_some() => {
                error!("{} received a position report of {id}, which {:?} controls", self.name, record.station);
                return;
            }
            Ok(record) => {
                record.plan.radius = radius;
                record.set_report(report);
            }
            Err(_) => {
                plan.radius = radius;
                let mut record = TrafficRecord::new(id, proxy, plan);
                record.set_report(report);
                if let Err(err) = record.set_waypoint_index(waypoint_index) {
                    error!("{} cannot take {id}: {err}", self.name);
                    return;
                }
                tick.arena.insert(record);
            }
        }

        self.handover(airport, tick.arena, id, leg, tick.now);
    }

    /// Ticks one active aircraft.
    pub fn update_aircraft_information(
        &mut self,
        airport: &mut Airport,
        tick: &mut Tick,
        id: AircraftId,
        report: PositionReport,
    ) {
        let record = try_log_return!(tick.arena.get_mut(id), expect "{} has no record of active aircraft {id}", self.name);
        record.set_report(report);
        advance_waypoints(record, tick.conf);

        if record.leg().is_surface() {
            track_surface(airport, tick, id);
            adjust_speed_for_blocker(airport, tick.arena, id);
        }

        match self.kind() {
            ControllerKind::Startup => startup::update(self, airport, tick, id),
            ControllerKind::Ground => ground::update(self, airport, tick, id),
            ControllerKind::Tower => tower::update(self, airport, tick, id),
            ControllerKind::Approach => approach::update(self, airport, tick, id),
        }
    }

    /// Stops controlling `id` without touching the shared airport state.
    ///
    /// Returns whether `id` was controlled.
    pub fn release(&mut self, arena: &mut Arena, id: AircraftId) -> bool {
        let Some(index) = self.active.iter().position(|&active| active == id) else { return false };
        self.active.remove(index);
        if let Ok(record) = arena.get_mut(id)
            && record.station.as_ref() == Some(&self.station)
        {
            record.station = None;
        }
        true
    }

    /// Removes `id` from this controller and from the ground radar, runway queues and segment blocks.
    ///
    /// Aircraft waiting for `id` stop waiting.
    pub fn sign_off(&mut self, airport: &mut Airport, arena: &mut Arena, id: AircraftId) {
        self.release(arena, id);
        airport.forget(id);
        release_followers(arena, id);
        if let Ok(record) = arena.get(id) {
            debug!("{} signed off {} ({id}) on {:?}", self.name, record.callsign, record.leg());
        }
    }

    /// Transfers `id` to the station of `kind` at the same airport once the current tick completes.
    fn queue_handover(&mut self, arena: &mut Arena, id: AircraftId, kind: ControllerKind, leg: Leg) {
        self.release(arena, id);
        let to = StationRef { airport: self.station.airport.clone(), kind };
        self.pending.push(Handover { id, to, leg });
    }

    #[must_use]
    pub fn has_instruction(&self, arena: &Arena, id: AircraftId) -> bool {
        self.get_instruction(arena, id).is_some_and(|instruction| instruction.has_instruction())
    }

    #[must_use]
    pub fn get_instruction(&self, arena: &Arena, id: AircraftId) -> Option<Instruction> {
        if !self.contains(id) {
            return None;
        }
        let record = try_log!(arena.get(id), expect "{} has no record of active aircraft {id}" (self.name) or return None);
        Some(record.instruction)
    }

    /// Runs one tick over all active aircraft.
    pub fn tick(&mut self, airport: &mut Airport, tick: &mut Tick) {
        if self.last_transmission.is_none_or(|last| tick.now - last > tick.conf.transmission_interval_s) {
            self.available = true;
        }

        self.sweep_dead(airport, tick.arena);

        for id in self.active.clone() {
            // Earlier aircraft of this tick may have signed off or handed over.
            if !self.active.contains(&id) {
                continue;
            }
            let report = match tick.arena.get(id) {
                Ok(record) => PositionReport::poll(&*record.proxy),
                Err(err) => {
                    error!("{}: {err}", self.name);
                    continue;
                }
            };
            self.update_aircraft_information(airport, tick, id, report);
        }
    }

    /// Drops aircraft whose flight dynamics ended.
    fn sweep_dead(&mut self, airport: &mut Airport, arena: &mut Arena) {
        let (alive, dead): (Vec<_>, Vec<_>) = self
            .active
            .iter()
            .copied()
            .partition(|&id| arena.get(id).is_ok_and(|record| !record.proxy.is_dead()));
        if dead.is_empty() {
            return;
        }

        self.active = alive;
        for id in dead {
            airport.forget(id);
            airport.release_parking(id);
            release_followers(arena, id);
            if let Some(record) = arena.remove(id) {
                info!("{} ({id}) left the simulation while controlled by {}", record.callsign, self.name);
            }
        }
    }

    fn message_params<'a>(
        &'a self,
        airport: &'a Airport,
        record: &'a TrafficRecord,
        atis: &'static str,
    ) -> MessageParams<'a> {
        MessageParams {
            callsign:        &record.callsign,
            station:         &self.name,
            runway:          record.runway.as_deref(),
            gate:            record.plan.gate.as_deref(),
            destination:     (!record.plan.arrival.is_empty()).then_some(record.plan.arrival.as_str()),
            taxi_frequency:  airport.frequency(ControllerKind::Ground),
            tower_frequency: airport.frequency(ControllerKind::Tower),
            atis:            Some(atis),
            transponder:     record.transponder.as_deref(),
            sid:             record.plan.sid.as_deref(),
            rules:           Some(record.plan.rules),
            pushback:        record.plan.requires_pushback,
        }
    }

    /// Makes the transmission of `step` if the dialogue of `id` is within its window
    /// and the controller is available.
    ///
    /// On success, the dialogue advances by one state and the controller
    /// stays unavailable for the transmission interval.
    /// The text is only delivered if a comm radio is tuned to the station,
    /// but the dialogue advances either way.
    pub fn check(&mut self, airport: &Airport, tick: &mut Tick, id: AircraftId, step: &Step) -> bool {
        let record = try_log!(tick.arena.get_mut(id), expect "{} checks unknown aircraft {id}" (self.name) or return false);
        let state = match step.dialog {
            Dialog::Main => record.state,
            Dialog::Hold => record.hold_state,
        };
        if !step.window.contains(&state) || !self.available {
            return false;
        }

        let text = {
            let params = self.message_params(airport, record, airport.atis_letter(tick.now));
            try_log!(
                format_message(step.message, &params),
                expect "{} cannot transmit to {}" (self.name, record.callsign)
                or return false
            )
        };

        if step.direction == Direction::GroundToAir && record.is_user {
            match tick.ctx.transmission_num() {
                -1 => return false,
                0 => tick.ctx.reset_transmission_num(),
                selected => {
                    trace!("{} selected alternative message {selected}, delaying {:?}", record.callsign, step.message);
                    tick.ctx.reset_transmission_num();
                    return false;
                }
            }
        }

        debug!("{} [{:?}]: {text}", self.name, step.message);
        if record.allow_transmissions
            && let Some(frequency) = self.frequency
            && tick.ctx.is_tuned_to(frequency)
        {
            if tick.ctx.atc_sound_enabled() && tick.ctx.itm_attenuation() {
                let sender = match step.direction {
                    Direction::AirToGround => record.callsign.clone(),
                    Direction::GroundToAir => self.name.clone(),
                };
                tick.ctx.receive_atc(&Transmission { sender, frequency, text, direction: step.direction });
            } else {
                tick.ctx.publish_atc_message(&text);
            }
        }

        match step.dialog {
            Dialog::Main => record.advance_state(),
            Dialog::Hold => record.hold_state = record.hold_state.next(),
        }
        self.available = false;
        self.last_transmission = Some(tick.now);
        true
    }
}

/// Sets or releases the hold-position instruction of `record`.
///
/// Releasing also ends any wait for another aircraft.
pub(crate) fn hold(record: &mut TrafficRecord, hold: bool) {
    if record.instruction.hold_position != hold {
        record.instruction.hold_position = hold;
        record.proxy.set_hold_position(hold);
    }
    if !hold {
        record.instruction.waits_for = None;
        record.wait_started = None;
    }
}

/// Moves the plan to the leg of its current waypoint if that leg is within `legs`.
fn follow_plan_leg(record: &mut TrafficRecord, legs: RangeInclusive<Leg>) {
    if let Some(leg) = record.plan.current().map(|waypoint| waypoint.leg)
        && leg > record.leg()
        && legs.contains(&leg)
    {
        record.plan.set_leg(leg);
    }
}

/// Whether `record` is on the ground within `height` of the field elevation.
fn is_on_ground(record: &TrafficRecord, elevation: Length<f64>, height: Length<f64>) -> bool {
    record.altitude <= elevation + height
}

fn advance_waypoints(record: &mut TrafficRecord, conf: &Conf) {
    while let Some(waypoint) = record.plan.current() {
        let reach = if waypoint.on_ground { conf.waypoint_reached } else { AIR_WAYPOINT_REACHED };
        if record.position.distance(waypoint.position) > reach {
            break;
        }
        record.plan.increment(false);
    }
}

/// Updates the radar entry, occupied segment, intentions and segment block of a surface aircraft.
fn track_surface(airport: &mut Airport, tick: &mut Tick, id: AircraftId) {
    let record = try_log_return!(tick.arena.get_mut(id), expect "Surface update of unknown aircraft {id}");

    if airport.radar.contains(id) {
        if let Err(err) = airport.radar.move_to(id, record.position) {
            error!("{} left the ground radar of {}: {err}", record.callsign, airport.code);
        }
    } else if let Err(err) = airport.radar.add(id, record.position) {
        trace!("{} is still outside the ground radar of {}: {err}", record.callsign, airport.code);
    }

    record.current_segment = record
        .plan
        .current()
        .and_then(|waypoint| waypoint.segment)
        .or_else(|| airport.network.find_segment_ahead(record.position, record.heading));
    record.refresh_intentions();

    if let Some(segment) = record.current_segment {
        airport.blocks.block(segment, id, tick.now, tick.conf.segment_block_s);
    }
}

/// Slows `id` down behind the aircraft blocking it, or lifts a previous slowdown.
fn adjust_speed_for_blocker(airport: &Airport, arena: &mut Arena, id: AircraftId) {
    let adjustment = {
        let record = try_log_return!(arena.get(id), expect "Speed adjustment of unknown aircraft {id}");
        airport
            .radar
            .is_blocked_by(record, arena)
            .and_then(|blocker| arena.get(blocker).ok())
            .map(|blocker| (blocker.speed * (record.position.distance(blocker.position).into_meters() / 100.)).max(Speed::ZERO))
    };

    let record = try_log_return!(arena.get_mut(id), expect "Speed adjustment of unknown aircraft {id}");
    match adjustment {
        Some(speed) => {
            record.instruction.change_speed = true;
            record.instruction.speed = speed;
            record.proxy.set_speed_adjustment(Some(speed));
        }
        None if record.instruction.change_speed => {
            record.instruction.change_speed = false;
            record.proxy.set_speed_adjustment(None);
        }
        None => {}
    }
}

/// Clears `waits_for` of every aircraft waiting for `id`.
fn release_followers(arena: &mut Arena, id: AircraftId) {
    for record in arena.iter_mut() {
        if record.instruction.waits_for == Some(id) {
            record.instruction.waits_for = None;
        }
    }
}
