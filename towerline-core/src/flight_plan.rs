//! Waypoint sequences followed by traffic.

use math::{GeoPos, Length, Speed};

use crate::ground::SegmentId;

pub mod builder;

/// Phase of a flight.
///
/// Legs only advance, except that the end of an arrival wraps to the next departure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, strum::EnumIter)]
pub enum Leg {
    ParkingTaxi,
    Pushback,
    Taxi,
    Takeoff,
    Climb,
    Cruise,
    Approach,
    Landing,
    LandingTaxi,
    Parking,
    End,
}

impl Leg {
    /// Whether aircraft on this leg move on the airport surface and are tracked by the ground radar.
    #[must_use]
    pub fn is_surface(self) -> bool {
        matches!(
            self,
            Leg::ParkingTaxi | Leg::Pushback | Leg::Taxi | Leg::Takeoff | Leg::LandingTaxi
        )
    }

    /// Whether aircraft on this leg use a runway slot.
    #[must_use]
    pub fn uses_runway(self) -> bool { matches!(self, Leg::Takeoff | Leg::Approach | Leg::Landing) }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Deserialize)]
pub enum FlightRules {
    #[default]
    Ifr,
    Vfr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Waypoint {
    pub name:         String,
    pub position:     GeoPos,
    pub altitude:     Length<f64>,
    pub speed:        Speed<f64>,
    pub on_ground:    bool,
    pub gear_down:    bool,
    /// Flaps setting between 0 (clean) and 1 (full).
    pub flaps:        f64,
    /// Expected arrival time in epoch seconds.
    pub arrival_time: Option<i64>,
    pub finished:     bool,
    /// The taxi segment leading to this waypoint.
    pub segment:      Option<SegmentId>,
    /// The leg this waypoint belongs to.
    pub leg:          Leg,
}

impl Waypoint {
    /// A waypoint on the airport surface.
    #[must_use]
    pub fn ground(
        name: impl Into<String>,
        position: GeoPos,
        elevation: Length<f64>,
        speed: Speed<f64>,
        segment: Option<SegmentId>,
        leg: Leg,
    ) -> Self {
        Self {
            name: name.into(),
            position,
            altitude: elevation,
            speed,
            on_ground: true,
            gear_down: true,
            flaps: 0.,
            arrival_time: None,
            finished: false,
            segment,
            leg,
        }
    }

    /// A waypoint in the air.
    #[must_use]
    pub fn air(
        name: impl Into<String>,
        position: GeoPos,
        altitude: Length<f64>,
        speed: Speed<f64>,
        leg: Leg,
    ) -> Self {
        let landing_configuration = matches!(leg, Leg::Approach | Leg::Landing);
        Self {
            name: name.into(),
            position,
            altitude,
            speed,
            on_ground: false,
            gear_down: landing_configuration,
            flaps: if landing_configuration { 1. } else { 0. },
            arrival_time: None,
            finished: false,
            segment: None,
            leg,
        }
    }
}

/// An editable waypoint sequence with a cursor.
///
/// `current` is `None` iff the cursor has been walked off the end.
/// `previous` is `None` iff the cursor is at the first waypoint.
#[derive(Debug, Clone)]
pub struct FlightPlan {
    waypoints: Vec<Waypoint>,
    cursor:    usize,
    leg:       Leg,
    iteration: u32,

    pub departure:         String,
    pub arrival:           String,
    /// Scheduled departure in epoch seconds.
    pub departure_time:    i64,
    /// Scheduled arrival in epoch seconds.
    pub arrival_time:      i64,
    pub rules:             FlightRules,
    pub sid:               Option<String>,
    pub gate:              Option<String>,
    pub airline:           Option<String>,
    /// Radius of the aircraft.
    pub radius:            Length<f64>,
    pub requires_pushback: bool,
}

impl FlightPlan {
    #[must_use]
    pub fn new(departure: impl Into<String>, arrival: impl Into<String>, rules: FlightRules) -> Self {
        Self {
            waypoints: Vec::new(),
            cursor: 0,
            leg: Leg::ParkingTaxi,
            iteration: 0,
            departure: departure.into(),
            arrival: arrival.into(),
            departure_time: 0,
            arrival_time: 0,
            rules,
            sid: None,
            gate: None,
            airline: None,
            radius: Length::from_meters(20.),
            requires_pushback: false,
        }
    }

    #[must_use]
    pub fn waypoints(&self) -> &[Waypoint] { &self.waypoints }

    /// Index of the current waypoint.
    #[must_use]
    pub fn cursor(&self) -> usize { self.cursor }

    #[must_use]
    pub fn current(&self) -> Option<&Waypoint> { self.waypoints.get(self.cursor) }

    #[must_use]
    pub fn next(&self) -> Option<&Waypoint> { self.waypoints.get(self.cursor + 1) }

    #[must_use]
    pub fn previous(&self) -> Option<&Waypoint> {
        self.cursor.checked_sub(1).and_then(|index| self.waypoints.get(index))
    }

    /// Marks the current waypoint as finished and moves to the next one.
    ///
    /// If `discard_passed` is set, all waypoints before the new previous waypoint are erased.
    /// Does nothing if the plan has already been walked off the end.
    pub fn increment(&mut self, discard_passed: bool) {
        let Some(current) = self.waypoints.get_mut(self.cursor) else { return };
        current.finished = true;
        self.cursor += 1;

        if discard_passed && self.cursor > 1 {
            let erased = self.cursor - 1;
            self.waypoints.drain(..erased);
            self.cursor -= erased;
        }
    }

    /// Moves back to the previous waypoint, if any.
    pub fn decrement(&mut self) {
        if let Some(cursor) = self.cursor.checked_sub(1) {
            self.cursor = cursor;
            if let Some(waypoint) = self.waypoints.get_mut(cursor) {
                waypoint.finished = false;
            }
        }
    }

    /// Moves the cursor back to the first waypoint and clears all finished marks.
    pub fn restart(&mut self) {
        self.cursor = 0;
        for waypoint in &mut self.waypoints {
            waypoint.finished = false;
        }
    }

    pub fn add_waypoint(&mut self, waypoint: Waypoint) { self.waypoints.push(waypoint); }

    /// Removes all waypoints and resets the cursor.
    pub fn clear_waypoints(&mut self) {
        self.waypoints.clear();
        self.cursor = 0;
    }

    /// Removes the unvisited waypoints of `leg` and everything after them.
    pub fn truncate_from_leg(&mut self, leg: Leg) {
        let start = self.waypoints[self.cursor.min(self.waypoints.len())..]
            .iter()
            .position(|waypoint| waypoint.leg >= leg)
            .map_or(self.waypoints.len(), |offset| self.cursor + offset);
        self.waypoints.truncate(start);
    }

    #[must_use]
    pub fn leg(&self) -> Leg { self.leg }

    /// Number of times the plan wrapped from an arrival to the next departure.
    #[must_use]
    pub fn iteration(&self) -> u32 { self.iteration }

    /// Moves the plan to `leg`.
    ///
    /// Legs may only advance, except that an arrival at `Parking` or `End`
    /// may wrap to `ParkingTaxi` of the next iteration.
    /// Returns `false` and leaves the leg unchanged if the transition is not allowed.
    pub fn set_leg(&mut self, leg: Leg) -> bool {
        if leg >= self.leg {
            self.leg = leg;
            true
        } else if leg == Leg::ParkingTaxi && self.leg >= Leg::Parking {
            self.leg = leg;
            self.iteration += 1;
            true
        } else {
            bevy::log::error!("Flight plan leg cannot move back from {:?} to {leg:?}", self.leg);
            false
        }
    }

    /// Taxi segments of unvisited waypoints, in order.
    pub fn remaining_segments(&self) -> impl Iterator<Item = SegmentId> + '_ {
        self.waypoints.get(self.cursor..).unwrap_or_default().iter().filter_map(|waypoint| waypoint.segment)
    }

    /// The last waypoint of `leg`, if any.
    #[must_use]
    pub fn last_of_leg(&self, leg: Leg) -> Option<&Waypoint> {
        self.waypoints.iter().rev().find(|waypoint| waypoint.leg == leg)
    }

    /// Turns the plan around for the next departure from the arrival airport.
    ///
    /// Waypoints are cleared; departure and arrival airports are swapped.
    pub fn wrap_for_next_departure(&mut self, departure_time: i64, arrival_time: i64) -> bool {
        if !self.set_leg(Leg::ParkingTaxi) {
            return false;
        }
        std::mem::swap(&mut self.departure, &mut self.arrival);
        self.departure_time = departure_time;
        self.arrival_time = arrival_time;
        self.clear_waypoints();
        true
    }
}
