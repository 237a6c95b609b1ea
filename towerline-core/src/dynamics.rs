//! Per-airport state shared by the controllers of an airport.

use std::collections::{BTreeMap, HashMap};

use enum_map::EnumMap;
use math::{GeoPos, Length};

use crate::comm::{self, Frequency};
use crate::controller::{Announcement, Controller, ControllerKind, Tick};
use crate::flight_plan::Leg;
use crate::ground::{self, GroundNetwork, SegmentId};
use crate::manager::StationRef;
use crate::radar::GroundRadar;
use crate::runway_queue::RunwayQueue;
use crate::traffic::{AircraftId, Arena};
use crate::{Conf, try_log};


/// Margin in degrees around the taxi network covered by the ground radar.
const RADAR_MARGIN_DEG: f64 = 0.02;
/// Radar coverage for airports without any taxi node or runway.
const FALLBACK_RADAR_HALF_SIZE_DEG: f64 = 0.1;

/// Whether a runway is used for departures or arrivals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunwayUse {
    Departure,
    Arrival,
}

/// A parking position and the aircraft occupying it.
#[derive(Clone)]
pub struct ParkingSlot {
    pub parking:  store::Parking,
    pub occupant: Option<AircraftId>,
}

impl ParkingSlot {
    fn accepts(&self, airline: Option<&str>, radius: Length<f64>) -> bool {
        self.occupant.is_none()
            && self.parking.radius >= radius
            && (self.parking.airlines.is_empty()
                || airline.is_some_and(|airline| self.parking.airlines.iter().any(|a| a == airline)))
    }
}

/// Reservation of a taxi segment by an aircraft.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    pub id:         AircraftId,
    /// The reservation lapses after this time.
    pub block_time: i64,
    /// Last time the aircraft was seen on the segment.
    pub last_touch: i64,
}

/// Reservations of taxi segments, kept apart from the immutable network.
#[derive(Debug, Default)]
pub struct SegmentBlocks {
    blocks: HashMap<SegmentId, Vec<Block>>,
}

impl SegmentBlocks {
    /// Reserves `segment` for `id` until `now + duration`.
    pub fn block(&mut self, segment: SegmentId, id: AircraftId, now: i64, duration: i64) {
        let blocks = self.blocks.entry(segment).or_default();
        if let Some(block) = blocks.iter_mut().find(|block| block.id == id) {
            block.last_touch = now;
            block.block_time = now + duration;
        } else {
            blocks.push(Block { id, block_time: now + duration, last_touch: now });
        }
    }

    /// An aircraft other than `except` holding a live reservation of `segment`.
    #[must_use]
    pub fn blocker(&self, segment: SegmentId, except: AircraftId, now: i64) -> Option<AircraftId> {
        self.blocks
            .get(&segment)?
            .iter()
            .find(|block| block.id != except && block.block_time >= now)
            .map(|block| block.id)
    }

    /// Drops lapsed reservations.
    pub fn prune(&mut self, now: i64) {
        self.blocks.retain(|_, blocks| {
            blocks.retain(|block| block.block_time >= now);
            !blocks.is_empty()
        });
    }

    /// Drops all reservations of `id`.
    pub fn release(&mut self, id: AircraftId) {
        self.blocks.retain(|_, blocks| {
            blocks.retain(|block| block.id != id);
            !blocks.is_empty()
        });
    }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.blocks.is_empty() }
}

/// Everything about an airport that its controllers share.
pub struct Airport {
    pub code:           String,
    pub name:           String,
    pub elevation:      Length<f64>,
    pub network:        GroundNetwork,
    pub frequencies:    EnumMap<ControllerKind, Option<Frequency>>,
    pub atis_frequency: Option<Frequency>,
    pub radar:          GroundRadar,
    /// Runway queues keyed by runway name.
    pub queues:         BTreeMap<String, RunwayQueue>,
    pub blocks:         SegmentBlocks,
    pub parkings:       Vec<ParkingSlot>,
    preferences:        Vec<store::RunwayPreference>,
}

impl Airport {
    /// Builds the airport from store data.
    pub fn build(airport: &store::Airport, conf: &Conf) -> Result<Self, ground::BuildError> {
        let network = GroundNetwork::build(&airport.ground_network, &airport.runways)?;

        let bounds = network.bounds(RADAR_MARGIN_DEG).unwrap_or_else(|| {
            let center = airport.parkings.first().map_or(GeoPos::default(), |parking| parking.position);
            math::GeoRect::around(center, FALLBACK_RADAR_HALF_SIZE_DEG)
        });

        let queues = network
            .runways()
            .iter()
            .map(|runway| {
                let queue = RunwayQueue::new(&airport.code, &runway.name, conf.runway_separation_s);
                (runway.name.clone(), queue)
            })
            .collect();

        let raw = &airport.frequencies;
        let frequencies = EnumMap::from_fn(|kind| {
            match kind {
                ControllerKind::Startup => raw.clearance.or(raw.ground),
                ControllerKind::Ground => raw.ground,
                ControllerKind::Tower => raw.tower,
                ControllerKind::Approach => raw.approach,
            }
            .map(Frequency::from_raw)
        });

        Ok(Self {
            code: airport.code.clone(),
            name: airport.name.clone(),
            elevation: airport.elevation,
            network,
            frequencies,
            atis_frequency: raw.atis.map(Frequency::from_raw),
            radar: GroundRadar::new(bounds),
            queues,
            blocks: SegmentBlocks::default(),
            parkings: airport
                .parkings
                .iter()
                .map(|parking| ParkingSlot { parking: parking.clone(), occupant: None })
                .collect(),
            preferences: airport.runway_preference.clone(),
        })
    }

    /// Radio name of the station of `kind`, e.g. "Schiphol Tower".
    #[must_use]
    pub fn station_name(&self, kind: ControllerKind) -> String {
        let suffix = match kind {
            ControllerKind::Startup => "Delivery",
            ControllerKind::Ground => "Ground",
            ControllerKind::Tower => "Tower",
            ControllerKind::Approach => "Approach",
        };
        format!("{} {suffix}", self.name)
    }

    #[must_use]
    pub fn frequency(&self, kind: ControllerKind) -> Option<Frequency> { self.frequencies[kind] }

    /// The ATIS information letter in effect at `now`.
    #[must_use]
    pub fn atis_letter(&self, now: i64) -> &'static str { comm::atis_letter(now) }

    /// The runway in use for `usage` at `now` (epoch seconds).
    ///
    /// The first active preference listing a known runway wins.
    /// Without any, the first runway of the airport is used.
    #[must_use]
    pub fn active_runway(&self, usage: RunwayUse, now: i64) -> Option<&ground::Runway> {
        let minute_of_day = (now.rem_euclid(math::SECONDS_PER_DAY) / math::SECONDS_PER_MINUTE) as u32;
        self.preferences
            .iter()
            .filter(|preference| preference.is_active(minute_of_day))
            .flat_map(|preference| match usage {
                RunwayUse::Departure => &preference.departure,
                RunwayUse::Arrival => &preference.arrival,
            })
            .find_map(|name| self.network.runway(name))
            .or_else(|| self.network.runways().first())
    }

    pub fn queue_mut(&mut self, runway: &str) -> Option<&mut RunwayQueue> { self.queues.get_mut(runway) }

    #[must_use]
    pub fn parking(&self, name: &str) -> Option<&ParkingSlot> {
        self.parkings.iter().find(|slot| slot.parking.name == name)
    }

    /// Picks a free parking for an aircraft of `radius` and reserves it for `id`.
    ///
    /// Parkings reserved for `airline` are preferred over unrestricted ones.
    pub fn assign_parking(&mut self, id: AircraftId, airline: Option<&str>, radius: Length<f64>) -> Option<String> {
        let candidates = || self.parkings.iter().enumerate().filter(|(_, slot)| slot.accepts(airline, radius));
        let index = candidates()
            .find(|(_, slot)| !slot.parking.airlines.is_empty())
            .or_else(|| candidates().next())
            .map(|(index, _)| index)?;

        let slot = &mut self.parkings[index];
        slot.occupant = Some(id);
        bevy::log::debug!("Assigned parking {} of {} to {id}", slot.parking.name, self.code);
        Some(slot.parking.name.clone())
    }

    /// Reserves the parking `name` for `id`.
    ///
    /// Returns `false` if it is unknown or occupied by another aircraft.
    pub fn occupy_parking(&mut self, name: &str, id: AircraftId) -> bool {
        let slot = try_log!(
            self.parkings.iter_mut().find(|slot| slot.parking.name == name),
            allow "Parking {name:?} does not exist at {}" (self.code)
            or return false
        );
        match slot.occupant {
            Some(occupant) if occupant != id => false,
            _ => {
                slot.occupant = Some(id);
                true
            }
        }
    }

    /// Frees every parking held by `id`.
    pub fn release_parking(&mut self, id: AircraftId) {
        for slot in &mut self.parkings {
            if slot.occupant == Some(id) {
                slot.occupant = None;
            }
        }
    }

    /// Removes `id` from the radar, all runway queues and all segment blocks.
    pub fn forget(&mut self, id: AircraftId) {
        self.radar.remove(id);
        for queue in self.queues.values_mut().filter(|queue| queue.contains(id)) {
            queue.remove_from_queue(id);
        }
        self.blocks.release(id);
    }
}

/// An airport together with its four controllers.
pub struct AirportDynamics {
    pub airport:     Airport,
    pub controllers: EnumMap<ControllerKind, Controller>,
}

impl AirportDynamics {
    #[must_use]
    pub fn new(airport: Airport) -> Self {
        let controllers = EnumMap::from_fn(|kind| {
            Controller::new(
                StationRef { airport: airport.code.clone(), kind },
                airport.station_name(kind),
                airport.frequency(kind),
            )
        });
        Self { airport, controllers }
    }

    #[must_use]
    pub fn code(&self) -> &str { &self.airport.code }

    #[must_use]
    pub fn controller(&self, kind: ControllerKind) -> &Controller { &self.controllers[kind] }

    /// Runs one tick of the controller of `kind`.
    pub fn tick_controller(&mut self, kind: ControllerKind, tick: &mut Tick) {
        let Self { airport, controllers } = self;
        airport.blocks.prune(tick.now);
        controllers[kind].tick(airport, tick);
    }

    /// Hands `id` over to the controller of `kind` on `leg`.
    pub fn accept(&mut self, kind: ControllerKind, id: AircraftId, leg: Leg, arena: &mut Arena, now: i64) {
        let Self { airport, controllers } = self;
        controllers[kind].handover(airport, arena, id, leg, now);
    }

    /// Reports an aircraft to the controller of `kind`.
    pub fn announce_position(&mut self, kind: ControllerKind, tick: &mut Tick, announcement: Announcement) {
        let Self { airport, controllers } = self;
        controllers[kind].announce_position(airport, tick, announcement);
    }

    /// Signs `id` off from the controller of `kind`.
    pub fn sign_off(&mut self, kind: ControllerKind, id: AircraftId, arena: &mut Arena) {
        let Self { airport, controllers } = self;
        controllers[kind].sign_off(airport, arena, id);
    }

    /// The controller currently owning `id`, if any.
    #[must_use]
    pub fn owner_of(&self, id: AircraftId) -> Option<ControllerKind> {
        self.controllers.iter().find(|(_, controller)| controller.contains(id)).map(|(kind, _)| kind)
    }

    /// Removes `id` from every controller and shared structure of the airport.
    pub fn remove_aircraft(&mut self, id: AircraftId, arena: &mut Arena) {
        for controller in self.controllers.values_mut() {
            controller.release(arena, id);
        }
        self.airport.forget(id);
        self.airport.release_parking(id);
    }
}
