//! Radio dialogue states, messages and their phraseology.

use std::fmt;

use rand::Rng;

use crate::flight_plan::FlightRules;


/// Position of an aircraft in its dialogue with the owning controller.
///
/// The ordering is the dialogue order.
/// Within one leg, the state of an aircraft never decreases.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, strum::FromRepr, strum::EnumIter,
)]
#[repr(u8)]
pub enum MessageState {
    #[default]
    Normal,
    AckHold,
    AckResumeTaxi,
    TaxiCleared,
    AckTaxiCleared,
    StartTaxi,
    ReportRunway,
    AckReportRunway,
    SwitchGroundTower,
    AckSwitchGroundTower,
    LineUpRunway,
    AckLineUpRunway,
    ClearedTakeoff,
    AckClearedTakeoff,
    AnnounceArrival,
    AckArrival,
    HoldPattern,
    ClearedToLand,
    AckClearedToLand,
    LandingTaxi,
    SwitchTowerToGround,
    HoldPosition,
}

impl MessageState {
    /// The following state in dialogue order, saturating at the last state.
    #[must_use]
    pub fn next(self) -> Self { Self::from_repr(self as u8 + 1).unwrap_or(self) }
}

/// A phrase spoken on the radio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumIter, strum::IntoStaticStr)]
pub enum MessageId {
    AnnounceEngineStart,
    RequestEngineStart,
    PermitEngineStart,
    AcknowledgeEngineStart,
    AcknowledgeSwitchGroundFrequency,
    RequestPushbackClearance,
    PermitPushbackClearance,
    IssueTaxiClearance,
    AcknowledgeTaxiClearance,
    HoldPosition,
    AcknowledgeHoldPosition,
    ResumeTaxi,
    AcknowledgeResumeTaxi,
    ReportRunwayHoldShort,
    AcknowledgeReportRunwayHoldShort,
    SwitchTowerFrequency,
    AcknowledgeSwitchTowerFrequency,
    LineUpRwy,
    AcknowledgeLineUpRwy,
    ClearedForTakeoff,
    Arrival,
    AcknowledgeArrival,
    ClearedToLand,
    AcknowledgeClearedToLand,
    SwitchGroundFrequencyArrival,
    AcknowledgeSwitchGroundFrequencyArrival,
    InitiateContact,
    AcknowledgeInitiateContact,
}

/// Who is speaking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    AirToGround,
    GroundToAir,
}

/// A radio frequency, stored in kHz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Frequency(pub u32);

impl Frequency {
    /// Interprets a frequency as written in airport data files.
    ///
    /// Values below 100000 are in units of 10 kHz, e.g. `11870` is 118.700 MHz.
    #[must_use]
    pub fn from_raw(raw: u32) -> Self { if raw < 100_000 { Self(raw * 10) } else { Self(raw) } }

    #[must_use]
    pub fn from_mhz(mhz: f64) -> Self { Self((mhz * 1000.).round() as u32) }

    #[must_use]
    pub fn khz(self) -> u32 { self.0 }

    #[must_use]
    pub fn mhz(self) -> f64 { f64::from(self.0) / 1000. }
}

/// Formats as `XXX.YY` for 25 kHz channels on a 10 kHz grid, otherwise `XXX.YYY`.
impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (mhz, khz) = (self.0 / 1000, self.0 % 1000);
        if khz % 10 == 0 { write!(f, "{mhz}.{:02}", khz / 10) } else { write!(f, "{mhz}.{khz:03}") }
    }
}

/// A formatted radio message.
#[derive(Debug, Clone, PartialEq)]
pub struct Transmission {
    /// Callsign of the aircraft or name of the station speaking.
    pub sender:    String,
    pub frequency: Frequency,
    pub text:      String,
    pub direction: Direction,
}

const PHONETIC: [&str; 26] = [
    "Alpha", "Bravo", "Charlie", "Delta", "Echo", "Foxtrot", "Golf", "Hotel", "India", "Juliet",
    "Kilo", "Lima", "Mike", "November", "Oscar", "Papa", "Quebec", "Romeo", "Sierra", "Tango",
    "Uniform", "Victor", "Whiskey", "X-ray", "Yankee", "Zulu",
];

/// The ATIS information letter in effect at `now` (epoch seconds).
///
/// The letter advances every hour and wraps after Zulu.
#[must_use]
pub fn atis_letter(now: i64) -> &'static str {
    let index = now.div_euclid(math::SECONDS_PER_HOUR).rem_euclid(PHONETIC.len() as i64);
    PHONETIC[index as usize]
}

/// Generates a transponder code.
///
/// VFR flights squawk 1200; IFR flights receive four random octal digits.
pub fn generate_transponder_code(rules: FlightRules, rng: &mut impl Rng) -> String {
    match rules {
        FlightRules::Vfr => "1200".into(),
        FlightRules::Ifr => (0..4).map(|_| char::from(b'0' + rng.random_range(0..8u8))).collect(),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{message:?} requires a {parameter}, but none is available")]
    MissingParameter { message: MessageId, parameter: &'static str },
}

/// Values substituted into message templates.
#[derive(Default)]
pub struct MessageParams<'a> {
    pub callsign:         &'a str,
    /// Name of the speaking or addressed station, e.g. "Schiphol Tower".
    pub station:          &'a str,
    pub runway:           Option<&'a str>,
    pub gate:             Option<&'a str>,
    pub destination:      Option<&'a str>,
    pub taxi_frequency:   Option<Frequency>,
    pub tower_frequency:  Option<Frequency>,
    pub atis:             Option<&'a str>,
    pub transponder:      Option<&'a str>,
    pub sid:              Option<&'a str>,
    pub rules:            Option<FlightRules>,
    /// Whether the aircraft must push back before taxiing.
    pub pushback:         bool,
}

impl MessageParams<'_> {
    fn require<T>(&self, message: MessageId, value: Option<T>, parameter: &'static str) -> Result<T, Error> {
        value.ok_or(Error::MissingParameter { message, parameter })
    }

    fn clearance_kind(&self) -> &'static str {
        if self.pushback { "push-back and taxi" } else { "taxi" }
    }
}

/// Formats the phrase of `message`.
///
/// # Errors
/// Returns an error if `message` requires a parameter missing in `params`.
pub fn format_message(message: MessageId, params: &MessageParams) -> Result<String, Error> {
    let callsign = params.callsign;
    let station = params.station;
    let runway = || params.require(message, params.runway, "runway");
    let taxi_frequency = || params.require(message, params.taxi_frequency, "ground frequency");
    let tower_frequency = || params.require(message, params.tower_frequency, "tower frequency");

    Ok(match message {
        MessageId::AnnounceEngineStart => {
            let gate = params.require(message, params.gate, "gate")?;
            let atis = params.require(message, params.atis, "ATIS letter")?;
            format!("{station}, {callsign}, at parking {gate}, with information {atis}, ready to start up")
        }
        MessageId::RequestEngineStart => {
            let destination = params.require(message, params.destination, "destination")?;
            let rules = match params.rules {
                Some(FlightRules::Vfr) => "VFR",
                _ => "IFR",
            };
            format!("{station}, {callsign}, request start-up for {rules} flight to {destination}")
        }
        MessageId::PermitEngineStart => {
            let destination = params.require(message, params.destination, "destination")?;
            let squawk = params.require(message, params.transponder, "transponder code")?;
            let departure = match params.sid {
                Some(sid) => format!("{sid} departure"),
                None => "runway heading departure".into(),
            };
            format!(
                "{callsign}, {station}, start-up approved, cleared to {destination}, {departure}, \
                 squawk {squawk}, contact ground on {}",
                taxi_frequency()?,
            )
        }
        MessageId::AcknowledgeEngineStart => {
            let destination = params.require(message, params.destination, "destination")?;
            let squawk = params.require(message, params.transponder, "transponder code")?;
            format!("Start-up approved, cleared to {destination}, squawk {squawk}, {callsign}")
        }
        MessageId::AcknowledgeSwitchGroundFrequency => {
            format!("Contact ground on {}, {callsign}", taxi_frequency()?)
        }
        MessageId::RequestPushbackClearance => {
            format!("{station}, {callsign}, request {} clearance", params.clearance_kind())
        }
        MessageId::PermitPushbackClearance => {
            format!(
                "{callsign}, {station}, {} approved, expect taxi instructions",
                params.clearance_kind()
            )
        }
        MessageId::IssueTaxiClearance => {
            format!("{callsign}, taxi to runway {}, hold short", runway()?)
        }
        MessageId::AcknowledgeTaxiClearance => {
            format!("Taxi to runway {}, hold short, {callsign}", runway()?)
        }
        MessageId::HoldPosition => format!("{callsign}, hold position"),
        MessageId::AcknowledgeHoldPosition => format!("Holding position, {callsign}"),
        MessageId::ResumeTaxi => format!("{callsign}, resume taxiing"),
        MessageId::AcknowledgeResumeTaxi => format!("Continuing taxi, {callsign}"),
        MessageId::ReportRunwayHoldShort => {
            format!("{station}, {callsign}, holding short runway {}", runway()?)
        }
        MessageId::AcknowledgeReportRunwayHoldShort => {
            format!("{callsign}, {station}, roger, hold short runway {}", runway()?)
        }
        MessageId::SwitchTowerFrequency => {
            format!("{callsign}, contact tower on {}", tower_frequency()?)
        }
        MessageId::AcknowledgeSwitchTowerFrequency => {
            format!("Contact tower on {}, {callsign}", tower_frequency()?)
        }
        MessageId::LineUpRwy => {
            format!("{callsign}, {station}, line up and wait runway {}", runway()?)
        }
        MessageId::AcknowledgeLineUpRwy => {
            format!("Line up and wait runway {}, {callsign}", runway()?)
        }
        MessageId::ClearedForTakeoff => {
            format!("{callsign}, runway {}, cleared for take-off", runway()?)
        }
        MessageId::Arrival => {
            let atis = params.require(message, params.atis, "ATIS letter")?;
            format!("{station}, {callsign}, inbound for landing with information {atis}")
        }
        MessageId::AcknowledgeArrival => {
            format!("{callsign}, {station}, expect runway {}", runway()?)
        }
        MessageId::ClearedToLand => format!("{callsign}, runway {}, cleared to land", runway()?),
        MessageId::AcknowledgeClearedToLand => {
            format!("Cleared to land runway {}, {callsign}", runway()?)
        }
        MessageId::SwitchGroundFrequencyArrival => {
            format!("{callsign}, vacate runway, contact ground on {}", taxi_frequency()?)
        }
        MessageId::AcknowledgeSwitchGroundFrequencyArrival => {
            format!("Contact ground on {}, {callsign}", taxi_frequency()?)
        }
        MessageId::InitiateContact => {
            let gate = params.require(message, params.gate, "gate")?;
            format!("{station}, {callsign}, runway vacated, request taxi to parking {gate}")
        }
        MessageId::AcknowledgeInitiateContact => {
            let gate = params.require(message, params.gate, "gate")?;
            format!("{callsign}, {station}, taxi to parking {gate}")
        }
    })
}
