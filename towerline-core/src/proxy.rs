//! Interface to the flight dynamics of a simulated aircraft.

use std::sync::{Mutex, PoisonError};

use math::{GeoPos, Heading, Length, Speed};

/// Performance profile of an aircraft type.
#[derive(Debug, Clone, Copy, PartialEq, serde::Deserialize)]
pub struct Performance {
    pub taxi_speed:     Speed<f64>,
    pub takeoff_speed:  Speed<f64>,
    pub climb_rate:     Speed<f64>,
    pub approach_speed: Speed<f64>,
    pub landing_speed:  Speed<f64>,
}

impl Default for Performance {
    fn default() -> Self {
        Self {
            taxi_speed:     Speed::from_knots(15.),
            takeoff_speed:  Speed::from_knots(150.),
            climb_rate:     Speed::from_fpm(2000.),
            approach_speed: Speed::from_knots(140.),
            landing_speed:  Speed::from_knots(130.),
        }
    }
}

/// Handle to the externally owned flight dynamics of one aircraft.
///
/// Controllers poll the getters every tick and steer the aircraft through the setters.
pub trait FlightProxy: Send + Sync {
    fn position(&self) -> GeoPos;
    fn heading(&self) -> Heading;
    fn speed(&self) -> Speed<f64>;
    fn altitude(&self) -> Length<f64>;
    /// Whether the aircraft has been removed from the simulation.
    fn is_dead(&self) -> bool;
    fn callsign(&self) -> String;
    /// Whether the pilot has asked for push-back or taxi clearance.
    ///
    /// Only consulted for the user aircraft.
    fn taxi_clearance_requested(&self) -> bool;
    fn performance(&self) -> Performance;

    fn set_transponder_code(&self, code: &str);
    /// Overrides the target speed, or releases the override if `None`.
    fn set_speed_adjustment(&self, speed: Option<Speed<f64>>);
    fn set_hold_position(&self, hold: bool);
    fn set_hold_pattern(&self, hold: bool);
}

/// Observable state of a [`PuppetProxy`].
#[derive(Debug, Clone, Default)]
pub struct PuppetState {
    pub position:                 GeoPos,
    pub heading:                  Heading,
    pub speed:                    Speed<f64>,
    pub altitude:                 Length<f64>,
    pub dead:                     bool,
    pub callsign:                 String,
    pub taxi_clearance_requested: bool,
    pub performance:              Performance,

    pub transponder_code: Option<String>,
    pub speed_adjustment: Option<Speed<f64>>,
    pub hold_position:    bool,
    pub hold_pattern:     bool,
}

/// A [`FlightProxy`] whose flight state is written by its owner
/// instead of being integrated from flight dynamics.
///
/// Used by hosts that drive aircraft from recorded tracks and by tests.
#[derive(Debug, Default)]
pub struct PuppetProxy {
    state: Mutex<PuppetState>,
}

impl PuppetProxy {
    #[must_use]
    pub fn new(state: PuppetState) -> Self { Self { state: Mutex::new(state) } }

    /// Reads the current state.
    pub fn read<R>(&self, f: impl FnOnce(&PuppetState) -> R) -> R {
        f(&self.state.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Mutates the current state.
    pub fn write<R>(&self, f: impl FnOnce(&mut PuppetState) -> R) -> R {
        f(&mut self.state.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl FlightProxy for PuppetProxy {
    fn position(&self) -> GeoPos { self.read(|state| state.position) }

    fn heading(&self) -> Heading { self.read(|state| state.heading) }

    fn speed(&self) -> Speed<f64> { self.read(|state| state.speed) }

    fn altitude(&self) -> Length<f64> { self.read(|state| state.altitude) }

    fn is_dead(&self) -> bool { self.read(|state| state.dead) }

    fn callsign(&self) -> String { self.read(|state| state.callsign.clone()) }

    fn taxi_clearance_requested(&self) -> bool {
        self.read(|state| state.taxi_clearance_requested)
    }

    fn performance(&self) -> Performance { self.read(|state| state.performance) }

    fn set_transponder_code(&self, code: &str) {
        self.write(|state| state.transponder_code = Some(code.to_owned()));
    }

    fn set_speed_adjustment(&self, speed: Option<Speed<f64>>) {
        self.write(|state| state.speed_adjustment = speed);
    }

    fn set_hold_position(&self, hold: bool) { self.write(|state| state.hold_position = hold); }

    fn set_hold_pattern(&self, hold: bool) { self.write(|state| state.hold_pattern = hold); }
}
