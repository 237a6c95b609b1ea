use math::{GeoPos, Heading, Length};
use serde::{Deserialize, Serialize};

use crate::GroundNetwork;

/// An airport with its surface layout and radio stations.
#[derive(Clone, Serialize, Deserialize)]
pub struct Airport {
    /// ICAO code of the airport, e.g. "EHAM".
    pub code:              String,
    /// Long display name.
    pub name:              String,
    /// Field elevation above mean sea level.
    pub elevation:         Length<f64>,
    /// Runways of the airport, one entry per direction.
    pub runways:           Vec<Runway>,
    /// Taxi nodes and segments.
    pub ground_network:    GroundNetwork,
    /// Parking positions.
    #[serde(default)]
    pub parkings:          Vec<Parking>,
    /// Radio frequencies of the airport stations.
    #[serde(default)]
    pub frequencies:       Frequencies,
    /// Time-of-day runway preference schedule.
    ///
    /// The first matching entry is used.
    /// If no entry matches, the runway most aligned with the wind is used.
    #[serde(default)]
    pub runway_preference: Vec<RunwayPreference>,
}

/// One direction of a runway.
#[derive(Clone, Serialize, Deserialize)]
pub struct Runway {
    /// Runway identifier, e.g. "27L".
    ///
    /// Should not include the airport code.
    pub name:      String,
    /// Position of the threshold, where take-off begins and landing aircraft touch down.
    pub threshold: GeoPos,
    /// Position of the far end of the runway.
    pub end:       GeoPos,
    /// Width of the runway.
    pub width:     Length<f64>,
    /// True heading of the runway direction.
    pub heading:   Heading,
}

/// A parking position.
#[derive(Clone, Serialize, Deserialize)]
pub struct Parking {
    /// Display name of the parking, e.g. "D7".
    pub name:     String,
    /// Position of the parked aircraft.
    pub position: GeoPos,
    /// Heading of the parked aircraft.
    pub heading:  Heading,
    /// Maximum radius of aircraft accepted.
    pub radius:   Length<f64>,
    /// Type of the parking.
    pub kind:     ParkingType,
    /// Airline codes allowed to use this parking.
    ///
    /// An empty list allows all airlines.
    #[serde(default)]
    pub airlines: Vec<String>,
    /// Whether aircraft must be pushed back before taxiing out.
    #[serde(default)]
    pub pushback: bool,
}

/// Type of a parking position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::EnumIter)]
pub enum ParkingType {
    /// Passenger gate.
    Gate,
    /// General parking ramp.
    Ramp,
    /// Cargo apron.
    Cargo,
    /// General aviation stand.
    GeneralAviation,
    /// Military stand.
    Military,
}

/// Radio frequencies of an airport.
///
/// Values are raw integers as published in airport data files:
/// 5-digit values are in units of 10 kHz (e.g. `11870` for 118.70 MHz),
/// 6-digit values are in kHz (e.g. `118725`).
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Frequencies {
    /// ATIS broadcast frequency.
    pub atis:      Option<u32>,
    /// Clearance delivery / startup frequency.
    pub clearance: Option<u32>,
    /// Ground control frequency.
    pub ground:    Option<u32>,
    /// Tower frequency.
    pub tower:     Option<u32>,
    /// Approach frequency.
    pub approach:  Option<u32>,
}

/// Active runways during a time-of-day window.
#[derive(Clone, Serialize, Deserialize)]
pub struct RunwayPreference {
    /// Start of the window in minutes after midnight UTC, inclusive.
    pub from_minute:  u32,
    /// End of the window in minutes after midnight UTC, exclusive.
    ///
    /// If `until_minute < from_minute`, the window wraps across midnight.
    pub until_minute: u32,
    /// Runways used for departures, most preferred first.
    pub departure:    Vec<String>,
    /// Runways used for arrivals, most preferred first.
    pub arrival:      Vec<String>,
}

impl RunwayPreference {
    /// Whether `minute_of_day` lies within this window.
    #[must_use]
    pub fn is_active(&self, minute_of_day: u32) -> bool {
        if self.from_minute <= self.until_minute {
            (self.from_minute..self.until_minute).contains(&minute_of_day)
        } else {
            minute_of_day >= self.from_minute || minute_of_day < self.until_minute
        }
    }
}
