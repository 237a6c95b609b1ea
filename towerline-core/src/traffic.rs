//! Per-aircraft traffic state.

use std::collections::HashMap;
use std::fmt;
use std::num::NonZero;
use std::sync::Arc;

use math::{GeoPos, Heading, Length, Speed};

use crate::comm::MessageState;
use crate::flight_plan::{FlightPlan, Leg};
use crate::ground::SegmentId;
use crate::manager::StationRef;
use crate::proxy::FlightProxy;


/// Maximum bearing difference between an aircraft's heading and the direction
/// from another aircraft on the same segment, for the other aircraft to be behind it.
const SAME_SEGMENT_TOLERANCE_DEG: f64 = 89.;

/// Stable identifier of a simulated aircraft.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AircraftId(NonZero<u32>);

impl AircraftId {
    /// Returns `None` for 0, which is reserved for "no aircraft".
    #[must_use]
    pub fn new(raw: u32) -> Option<Self> { NonZero::new(raw).map(Self) }

    #[must_use]
    pub fn get(self) -> u32 { self.0.get() }
}

impl fmt::Debug for AircraftId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "#{}", self.0) }
}

impl fmt::Display for AircraftId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "#{}", self.0) }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("No traffic record for {0}")]
    NotFound(AircraftId),
    #[error("Waypoint index {index} is out of bounds for flight plan of {len} waypoints")]
    InvalidFlightPlan { index: usize, len: usize },
}

/// Instructions currently in effect for an aircraft.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Instruction {
    pub hold_position:   bool,
    pub resume_taxi:     bool,
    pub change_speed:    bool,
    pub speed:           Speed<f64>,
    pub change_heading:  bool,
    pub heading:         Heading,
    pub change_altitude: bool,
    pub altitude:        Length<f64>,
    pub hold_pattern:    bool,
    /// The aircraft this one is waiting for.
    pub waits_for:       Option<AircraftId>,
}

impl Instruction {
    #[must_use]
    pub fn has_instruction(&self) -> bool {
        self.hold_position
            || self.resume_taxi
            || self.change_speed
            || self.change_heading
            || self.change_altitude
            || self.hold_pattern
    }
}

/// Kinematic state of an aircraft as polled from its proxy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionReport {
    pub position: GeoPos,
    pub heading:  Heading,
    pub speed:    Speed<f64>,
    pub altitude: Length<f64>,
}

impl PositionReport {
    #[must_use]
    pub fn poll(proxy: &dyn FlightProxy) -> Self {
        Self {
            position: proxy.position(),
            heading:  proxy.heading(),
            speed:    proxy.speed(),
            altitude: proxy.altitude(),
        }
    }
}

/// The state a controller keeps about one aircraft.
///
/// Records are owned by the [`Arena`] and referenced by id everywhere else.
/// At most one station owns a record at any time.
pub struct TrafficRecord {
    pub id:       AircraftId,
    pub callsign: String,
    pub proxy:    Arc<dyn FlightProxy>,
    pub plan:     FlightPlan,

    /// Taxi segments the aircraft intends to traverse.
    pub intentions:      Vec<SegmentId>,
    /// The taxi segment currently occupied.
    pub current_segment: Option<SegmentId>,

    /// Position in the main dialogue with the owning controller.
    pub state:      MessageState,
    /// Position in the hold-position side dialogue while taxiing.
    pub hold_state: MessageState,

    pub position:      GeoPos,
    pub altitude:      Length<f64>,
    pub heading:       Heading,
    pub speed:         Speed<f64>,
    /// Heading change in degrees since the previous update.
    pub heading_delta: f64,

    /// Assigned runway name.
    pub runway:       Option<String>,
    /// Time the aircraft plans to use the runway, in epoch seconds.
    pub planned_time: i64,
    /// Time slot assigned by the runway queue, never earlier than `planned_time`.
    pub runway_slot:  Option<i64>,

    pub instruction:         Instruction,
    /// Time at which the aircraft started waiting for a hold to be released.
    pub wait_started:        Option<i64>,
    pub transponder:         Option<String>,
    /// Whether the aircraft transmits on the radio at all.
    pub allow_transmissions: bool,
    pub is_user:             bool,
    /// The station currently owning this record.
    pub station:             Option<StationRef>,
}

impl TrafficRecord {
    #[must_use]
    pub fn new(id: AircraftId, proxy: Arc<dyn FlightProxy>, plan: FlightPlan) -> Self {
        let report = PositionReport::poll(&*proxy);
        Self {
            id,
            callsign: proxy.callsign(),
            proxy,
            plan,
            intentions: Vec::new(),
            current_segment: None,
            state: MessageState::Normal,
            hold_state: MessageState::Normal,
            position: report.position,
            altitude: report.altitude,
            heading: report.heading,
            speed: report.speed,
            heading_delta: 0.,
            runway: None,
            planned_time: 0,
            runway_slot: None,
            instruction: Instruction::default(),
            wait_started: None,
            transponder: None,
            allow_transmissions: true,
            is_user: false,
            station: None,
        }
    }

    #[must_use]
    pub fn leg(&self) -> Leg { self.plan.leg() }

    /// Index of the current waypoint.
    #[must_use]
    pub fn waypoint_index(&self) -> usize { self.plan.cursor() }

    /// Moves the plan cursor to `index`.
    pub fn set_waypoint_index(&mut self, index: usize) -> Result<(), Error> {
        let len = self.plan.waypoints().len();
        if index > len {
            return Err(Error::InvalidFlightPlan { index, len });
        }
        while self.plan.cursor() < index {
            self.plan.increment(false);
        }
        while self.plan.cursor() > index {
            self.plan.decrement();
        }
        Ok(())
    }

    #[must_use]
    pub fn radius(&self) -> Length<f64> { self.plan.radius }

    /// Applies a position report.
    pub fn set_report(&mut self, report: PositionReport) {
        self.heading_delta = report.heading - self.heading;
        self.position = report.position;
        self.heading = report.heading;
        self.speed = report.speed;
        self.altitude = report.altitude;
    }

    /// Moves to the next leg-local dialogue state.
    pub fn advance_state(&mut self) { self.set_state(self.state.next()); }

    pub fn set_state(&mut self, state: MessageState) {
        bevy::log::trace!("{} ({}) dialogue {:?} -> {state:?}", self.callsign, self.id, self.state);
        self.state = state;
    }

    /// Recomputes `intentions` from the unvisited taxi waypoints of the plan.
    pub fn refresh_intentions(&mut self) {
        self.intentions.clear();
        self.intentions.extend(self.plan.remaining_segments());
    }

    /// Checks whether `other` has to give way to this aircraft on the taxi network.
    ///
    /// This is the case if both occupy the same segment and `self` is ahead of `other`
    /// in the direction `self` is heading,
    /// or if `self` occupies a segment `other` intends to use
    /// and the two are closer than `intentions_distance`.
    #[must_use]
    pub fn check_position_and_intentions(
        &self,
        other: &TrafficRecord,
        intentions_distance: Length<f64>,
    ) -> bool {
        if other.id == self.id {
            return false;
        }

        if let (Some(own), Some(theirs)) = (self.current_segment, other.current_segment)
            && own == theirs
        {
            let bearing = other.position.course_to(self.position);
            return bearing.is_within(self.heading, SAME_SEGMENT_TOLERANCE_DEG);
        }

        self.current_segment.is_some_and(|own| other.intentions.contains(&own))
            && self.position.distance(other.position) < intentions_distance
    }
}

impl fmt::Debug for TrafficRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrafficRecord")
            .field("id", &self.id)
            .field("callsign", &self.callsign)
            .field("leg", &self.leg())
            .field("state", &self.state)
            .field("hold_state", &self.hold_state)
            .field("runway", &self.runway)
            .field("runway_slot", &self.runway_slot)
            .field("station", &self.station)
            .finish_non_exhaustive()
    }
}

/// Owner of all traffic records, keyed by aircraft id.
#[derive(Default)]
pub struct Arena {
    records: HashMap<AircraftId, TrafficRecord>,
}

impl Arena {
    pub fn get(&self, id: AircraftId) -> Result<&TrafficRecord, Error> {
        self.records.get(&id).ok_or(Error::NotFound(id))
    }

    pub fn get_mut(&mut self, id: AircraftId) -> Result<&mut TrafficRecord, Error> {
        self.records.get_mut(&id).ok_or(Error::NotFound(id))
    }

    #[must_use]
    pub fn contains(&self, id: AircraftId) -> bool { self.records.contains_key(&id) }

    /// Inserts a record, replacing and returning any record with the same id.
    pub fn insert(&mut self, record: TrafficRecord) -> Option<TrafficRecord> {
        self.records.insert(record.id, record)
    }

    pub fn remove(&mut self, id: AircraftId) -> Option<TrafficRecord> { self.records.remove(&id) }

    pub fn iter(&self) -> impl Iterator<Item = &TrafficRecord> { self.records.values() }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut TrafficRecord> {
        self.records.values_mut()
    }

    #[must_use]
    pub fn len(&self) -> usize { self.records.len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.records.is_empty() }

    /// Ids of all records in ascending order.
    #[must_use]
    pub fn ids(&self) -> Vec<AircraftId> {
        let mut ids: Vec<_> = self.records.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}
