//! Composition root of traffic control.
//!
//! [`AtcManager`] owns every airport, the traffic arena and the list of staffed stations.
//! It ticks the stations in the order they were staffed,
//! applies the handovers they request
//! and hands uncontrolled inbound traffic to the approach of its destination.

use std::collections::BTreeMap;
use std::sync::Arc;

use bevy::app::{self, App, Plugin};
use bevy::ecs::message::{Message, MessageWriter};
use bevy::ecs::resource::Resource;
use bevy::ecs::schedule::IntoScheduleConfigs;
use bevy::ecs::system::{Res, ResMut};
use bevy::log::{debug, info, warn};
use bevy::time::{self, Time};
use ordered_float::OrderedFloat;
use rand::SeedableRng;
use rand::rngs::SmallRng;

use crate::context::{MemoryContext, Output, SimContext};
use crate::controller::{Announcement, ControllerKind, Tick};
use crate::dynamics::{Airport, AirportDynamics, RunwayUse};
use crate::flight_plan::{FlightPlan, FlightRules, Leg, builder};
use crate::proxy::FlightProxy;
use crate::traffic::{self, AircraftId, Arena, Instruction, PositionReport, TrafficRecord};
use crate::{Conf, SystemSets};

#[cfg(test)]
mod tests;

pub struct Plug;

impl Plugin for Plug {
    fn build(&self, app: &mut App) {
        app.init_resource::<AtcManager>();
        app.init_resource::<SimProperties>();
        app.add_message::<TransmissionMessage>();
        app.add_systems(app::Update, tick_system.in_set(SystemSets::Communicate));
        app.add_systems(app::Update, publish_system.in_set(SystemSets::Publish));
    }
}

/// Identifies one controller of one airport.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StationRef {
    pub airport: String,
    pub kind:    ControllerKind,
}

/// The simulator surface read and written by [`tick_system`].
#[derive(Resource, Default)]
pub struct SimProperties {
    pub context: MemoryContext,
}

/// A line published by a controller during the last tick.
#[derive(Message, Debug, Clone)]
pub struct TransmissionMessage(pub Output);

impl TransmissionMessage {
    #[must_use]
    pub fn text(&self) -> &str {
        match &self.0 {
            Output::Published(text) => text,
            Output::Received(transmission) => &transmission.text,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Airport {0:?} is not loaded")]
    UnknownAirport(String),
    #[error("Airport {0:?} is already loaded")]
    DuplicateAirport(String),
    #[error("{0} is already in traffic")]
    DuplicateAircraft(AircraftId),
    #[error("{0} is not parked")]
    NotParked(AircraftId),
    #[error(transparent)]
    Traffic(#[from] traffic::Error),
}

#[derive(Debug, Default)]
struct UserAircraft {
    id:              Option<AircraftId>,
    controller:      Option<StationRef>,
    prev_controller: Option<StationRef>,
}

#[derive(Resource)]
pub struct AtcManager {
    airports:      BTreeMap<String, AirportDynamics>,
    /// Staffed stations in tick order.
    stations:      Vec<StationRef>,
    arena:         Arena,
    user:          UserAircraft,
    shutting_down: bool,
    rng:           SmallRng,
}

impl Default for AtcManager {
    fn default() -> Self { Self::with_rng(SmallRng::from_rng(&mut rand::rng())) }
}

impl AtcManager {
    /// Creates a manager with deterministic transponder codes.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self { Self::with_rng(SmallRng::seed_from_u64(seed)) }

    fn with_rng(rng: SmallRng) -> Self {
        Self {
            airports: BTreeMap::new(),
            stations: Vec::new(),
            arena: Arena::default(),
            user: UserAircraft::default(),
            shutting_down: false,
            rng,
        }
    }

    pub fn add_airport(&mut self, dynamics: AirportDynamics) -> Result<(), Error> {
        let code = dynamics.code().to_owned();
        if self.airports.contains_key(&code) {
            return Err(Error::DuplicateAirport(code));
        }
        info!("Loaded airport {code} ({})", dynamics.airport.name);
        self.airports.insert(code, dynamics);
        Ok(())
    }

    #[must_use]
    pub fn airport(&self, code: &str) -> Option<&AirportDynamics> { self.airports.get(code) }

    pub fn airport_mut(&mut self, code: &str) -> Option<&mut AirportDynamics> { self.airports.get_mut(code) }

    /// Staffs `station`.
    ///
    /// Returns `false` if the station is already staffed or its airport is not loaded.
    pub fn add_controller(&mut self, station: StationRef) -> bool {
        if !self.airports.contains_key(&station.airport) {
            warn!("Cannot staff {station:?} of an unknown airport");
            return false;
        }
        if self.stations.contains(&station) {
            return false;
        }
        debug!("Staffing {station:?}");
        self.stations.push(station);
        true
    }

    /// Closes `station`, leaving its aircraft uncontrolled.
    ///
    /// Returns `false` if the station was not staffed.
    pub fn remove_controller(&mut self, station: &StationRef) -> bool {
        let Some(index) = self.stations.iter().position(|staffed| staffed == station) else { return false };
        self.stations.remove(index);

        if let Some(dynamics) = self.airports.get_mut(&station.airport) {
            let controller = &mut dynamics.controllers[station.kind];
            for id in controller.active().to_vec() {
                controller.release(&mut self.arena, id);
                dynamics.airport.forget(id);
            }
        }
        debug!("Closed {station:?}");
        true
    }

    #[must_use]
    pub fn stations(&self) -> &[StationRef] { &self.stations }

    #[must_use]
    pub fn arena(&self) -> &Arena { &self.arena }

    pub fn arena_mut(&mut self) -> &mut Arena { &mut self.arena }

    #[must_use]
    pub fn is_shutting_down(&self) -> bool { self.shutting_down }

    /// The station controlling the user aircraft.
    #[must_use]
    pub fn user_controller(&self) -> Option<&StationRef> { self.user.controller.as_ref() }

    /// The station that controlled the user aircraft before [`user_controller`](Self::user_controller).
    #[must_use]
    pub fn previous_user_controller(&self) -> Option<&StationRef> { self.user.prev_controller.as_ref() }

    #[must_use]
    pub fn user_aircraft(&self) -> Option<AircraftId> { self.user.id }

    /// Adds an aircraft to the simulation.
    ///
    /// Aircraft at the gate are accepted by the startup controller of their departure airport
    /// and aircraft on approach by the approach controller of their arrival airport.
    /// Other aircraft stay uncontrolled until they come within approach range of their destination.
    pub fn spawn_traffic(
        &mut self,
        id: AircraftId,
        proxy: Arc<dyn FlightProxy>,
        plan: FlightPlan,
        now: i64,
    ) -> Result<(), Error> {
        if self.arena.contains(id) {
            return Err(Error::DuplicateAircraft(id));
        }

        let mut record = TrafficRecord::new(id, proxy, plan);
        let leg = record.leg();
        let owner = match leg {
            Leg::ParkingTaxi => Some(StationRef { airport: record.plan.departure.clone(), kind: ControllerKind::Startup }),
            Leg::Approach => Some(StationRef { airport: record.plan.arrival.clone(), kind: ControllerKind::Approach }),
            _ => None,
        };

        if let Some(owner) = &owner {
            let dynamics = self.airports.get_mut(&owner.airport).ok_or_else(|| Error::UnknownAirport(owner.airport.clone()))?;
            if owner.kind == ControllerKind::Startup {
                park(&mut dynamics.airport, &mut record);
            }
        }

        debug!("{} ({id}) enters traffic on {leg:?}", record.callsign);
        self.arena.insert(record);
        if let Some(owner) = owner {
            self.handover(id, &owner, leg, now);
        }
        Ok(())
    }

    /// Removes an aircraft from every airport and from the arena.
    pub fn remove_traffic(&mut self, id: AircraftId) -> Option<TrafficRecord> {
        for dynamics in self.airports.values_mut() {
            dynamics.remove_aircraft(id, &mut self.arena);
        }
        if self.user.id == Some(id) {
            self.user = UserAircraft::default();
        }
        self.arena.remove(id)
    }

    /// Transfers `id` to `station` on `leg`.
    ///
    /// Returns `false` and leaves the aircraft uncontrolled if the station is not staffed.
    pub fn handover(&mut self, id: AircraftId, station: &StationRef, leg: Leg, now: i64) -> bool {
        if !self.stations.contains(station) {
            warn!("{station:?} is not staffed, {id} stays uncontrolled");
            return false;
        }

        if let Ok(record) = self.arena.get(id)
            && let Some(previous) = record.station.clone()
            && previous != *station
            && let Some(dynamics) = self.airports.get_mut(&previous.airport)
        {
            dynamics.controllers[previous.kind].release(&mut self.arena, id);
        }

        let Some(dynamics) = self.airports.get_mut(&station.airport) else { return false };
        dynamics.accept(station.kind, id, leg, &mut self.arena, now);
        true
    }

    /// Reports the plan and position of an aircraft to `station`,
    /// which takes control of it unless another station already does.
    ///
    /// Returns whether `station` controls the aircraft afterwards.
    pub fn announce_position(
        &mut self,
        station: &StationRef,
        announcement: Announcement,
        ctx: &mut dyn SimContext,
        conf: &Conf,
    ) -> bool {
        let id = announcement.id;
        if !self.stations.contains(station) {
            warn!("{station:?} is not staffed, ignoring the position report of {id}");
            return false;
        }
        if let Ok(record) = self.arena.get(id)
            && let Some(owner) = &record.station
            && owner != station
        {
            warn!("{station:?} received a position report of {id}, which {owner:?} controls");
            return false;
        }
        let Some(dynamics) = self.airports.get_mut(&station.airport) else { return false };

        let now = ctx.now();
        let mut tick = Tick { arena: &mut self.arena, ctx, conf, rng: &mut self.rng, now };
        dynamics.announce_position(station.kind, &mut tick, announcement);
        for handover in dynamics.controllers[station.kind].take_handovers() {
            self.handover(handover.id, &handover.to, handover.leg, now);
        }
        self.arena.get(id).is_ok_and(|record| record.station.as_ref() == Some(station))
    }

    /// Signs `id` off from its station.
    ///
    /// This is a no-op once the manager is shutting down.
    pub fn sign_off(&mut self, id: AircraftId) -> bool {
        if self.shutting_down {
            return false;
        }
        let Some(station) = self.arena.get(id).ok().and_then(|record| record.station.clone()) else { return false };
        let Some(dynamics) = self.airports.get_mut(&station.airport) else { return false };
        dynamics.sign_off(station.kind, id, &mut self.arena);
        true
    }

    /// Schedules the next departure of a parked aircraft from the airport it arrived at.
    pub fn turn_around(
        &mut self,
        id: AircraftId,
        departure_time: i64,
        arrival_time: i64,
        now: i64,
    ) -> Result<(), Error> {
        let record = self.arena.get_mut(id)?;
        if record.station.is_some() || !record.plan.wrap_for_next_departure(departure_time, arrival_time) {
            return Err(Error::NotParked(id));
        }
        record.runway = None;
        record.runway_slot = None;
        record.transponder = None;
        record.intentions.clear();
        record.current_segment = None;
        record.instruction = Instruction::default();
        let station = StationRef { airport: record.plan.departure.clone(), kind: ControllerKind::Startup };
        info!("{} ({id}) turns around for {} (iteration {})", record.callsign, record.plan.arrival, record.plan.iteration());

        let dynamics =
            self.airports.get_mut(&station.airport).ok_or_else(|| Error::UnknownAirport(station.airport.clone()))?;
        park(&mut dynamics.airport, record);
        self.handover(id, &station, Leg::ParkingTaxi, now);
        Ok(())
    }

    /// Places the user aircraft at the nearest parking of `airport` with a departure route
    /// from there to the active runway, under control of ground.
    ///
    /// Any previous user aircraft is removed.
    pub fn init_user(
        &mut self,
        id: AircraftId,
        proxy: Arc<dyn FlightProxy>,
        airport: &str,
        now: i64,
    ) -> Result<(), Error> {
        if let Some(previous) = self.user.id {
            self.remove_traffic(previous);
        }
        if self.arena.contains(id) {
            return Err(Error::DuplicateAircraft(id));
        }
        let dynamics = self.airports.get_mut(airport).ok_or_else(|| Error::UnknownAirport(airport.to_owned()))?;

        let position = proxy.position();
        let mut plan = FlightPlan::new(airport, "", FlightRules::Vfr);
        plan.departure_time = now;
        if let Some(slot) = dynamics
            .airport
            .parkings
            .iter()
            .min_by_key(|slot| OrderedFloat(slot.parking.position.distance(position).into_meters()))
        {
            plan.gate = Some(slot.parking.name.clone());
            plan.requires_pushback = slot.parking.pushback;
        }

        let mut record = TrafficRecord::new(id, proxy, plan);
        record.is_user = true;
        park(&mut dynamics.airport, &mut record);
        if let Some(runway) = dynamics.airport.active_runway(RunwayUse::Departure, now) {
            let performance = record.proxy.performance();
            if builder::build_departure(
                &mut record.plan,
                &dynamics.airport.network,
                dynamics.airport.elevation,
                runway,
                &performance,
            ) {
                record.runway = Some(runway.name.clone());
                record.planned_time = now;
                record.refresh_intentions();
            }
        }
        let leg = if record.plan.waypoints().first().is_some_and(|waypoint| waypoint.leg == Leg::Pushback) {
            Leg::Pushback
        } else {
            Leg::Taxi
        };

        info!("User aircraft {} ({id}) is at {airport} parking {:?}", record.callsign, record.plan.gate);
        self.arena.insert(record);
        self.user.id = Some(id);
        self.handover(id, &StationRef { airport: airport.to_owned(), kind: ControllerKind::Ground }, leg, now);
        self.track_user();
        Ok(())
    }

    /// Forgets the user aircraft, e.g. after the simulator moved it elsewhere.
    pub fn reposition(&mut self) {
        if let Some(id) = self.user.id {
            self.remove_traffic(id);
        }
        self.user = UserAircraft::default();
    }

    /// Releases all traffic and closes all stations.
    ///
    /// Subsequent ticks and sign-offs are no-ops.
    pub fn shutdown(&mut self) {
        self.shutting_down = true;
        for dynamics in self.airports.values_mut() {
            for id in self.arena.ids() {
                dynamics.remove_aircraft(id, &mut self.arena);
            }
        }
        self.arena = Arena::default();
        self.stations.clear();
        self.user = UserAircraft::default();
        info!("Traffic control shut down");
    }

    /// Runs one tick of every staffed station.
    pub fn tick(&mut self, ctx: &mut dyn SimContext, conf: &Conf) {
        if self.shutting_down {
            return;
        }
        let now = ctx.now();

        for index in 0..self.stations.len() {
            let station = self.stations[index].clone();
            let Some(dynamics) = self.airports.get_mut(&station.airport) else {
                warn!("{station:?} is staffed at an unknown airport");
                continue;
            };

            let mut tick = Tick { arena: &mut self.arena, ctx: &mut *ctx, conf, rng: &mut self.rng, now };
            dynamics.tick_controller(station.kind, &mut tick);
            let handovers = dynamics.controllers[station.kind].take_handovers();

            for handover in handovers {
                self.handover(handover.id, &handover.to, handover.leg, now);
            }
        }

        self.sweep_uncontrolled();
        self.route_arrivals(now, conf);
        self.track_user();
    }

    /// Polls uncontrolled aircraft and drops the dead ones.
    fn sweep_uncontrolled(&mut self) {
        let mut dead = Vec::new();
        for record in self.arena.iter_mut().filter(|record| record.station.is_none()) {
            if record.proxy.is_dead() {
                dead.push(record.id);
            } else {
                record.set_report(PositionReport::poll(&*record.proxy));
            }
        }
        for id in dead {
            if let Some(record) = self.remove_traffic(id) {
                info!("{} ({id}) left the simulation", record.callsign);
            }
        }
    }

    /// Hands uncontrolled airborne aircraft within approach range to the approach of their destination.
    fn route_arrivals(&mut self, now: i64, conf: &Conf) {
        let inbound: Vec<_> = self
            .arena
            .iter()
            .filter(|record| record.station.is_none() && matches!(record.leg(), Leg::Climb | Leg::Cruise))
            .filter_map(|record| {
                let dynamics = self.airports.get(&record.plan.arrival)?;
                let runway = dynamics.airport.active_runway(RunwayUse::Arrival, now)?;
                let station = StationRef { airport: record.plan.arrival.clone(), kind: ControllerKind::Approach };
                (record.position.distance(runway.threshold) <= conf.approach_range
                    && self.stations.contains(&station))
                .then_some((record.id, station))
            })
            .collect();

        for (id, station) in inbound {
            self.handover(id, &station, Leg::Approach, now);
        }
    }

    fn track_user(&mut self) {
        let Some(id) = self.user.id else { return };
        let current = self.arena.get(id).ok().and_then(|record| record.station.clone());
        if current != self.user.controller {
            debug!("User aircraft handed from {:?} to {current:?}", self.user.controller);
            self.user.prev_controller = std::mem::replace(&mut self.user.controller, current);
        }
    }
}

/// Reserves the parking of a departing aircraft, assigning one if its plan has none.
fn park(airport: &mut Airport, record: &mut TrafficRecord) {
    match record.plan.gate.clone() {
        Some(gate) => {
            if !airport.occupy_parking(&gate, record.id) {
                warn!("{} is at parking {gate} of {}, which is taken", record.callsign, airport.code);
            }
        }
        None => {
            record.plan.gate =
                airport.assign_parking(record.id, record.plan.airline.as_deref(), record.radius());
        }
    }

    if let Some(slot) = record.plan.gate.as_deref().and_then(|gate| airport.parking(gate)) {
        record.plan.requires_pushback |= slot.parking.pushback;
    }
}

fn tick_system(
    mut manager: ResMut<AtcManager>,
    mut props: ResMut<SimProperties>,
    conf: Res<Conf>,
    time: Res<Time<time::Virtual>>,
) {
    let elapsed = i64::try_from(time.elapsed().as_secs()).unwrap_or(i64::MAX);
    props.context.now = conf.epoch_offset_s.saturating_add(elapsed);
    manager.tick(&mut props.context, &conf);
}

fn publish_system(mut props: ResMut<SimProperties>, mut writer: MessageWriter<TransmissionMessage>) {
    for output in props.context.drain_outputs() {
        writer.write(TransmissionMessage(output));
    }
}
