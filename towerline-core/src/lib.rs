//! Airport ground and approach traffic control.
//!
//! Each airport runs four cooperating controllers
//! (startup, ground, tower, approach) sharing a ground radar and per-runway queues.
//! Aircraft are handed over between controllers as their flight plan legs advance.

#![warn(clippy::pedantic)]

use bevy::app::{self, App, Plugin};
use bevy::ecs::resource::Resource;
use bevy::ecs::schedule::{IntoScheduleConfigs, SystemSet};
use itertools::Itertools;
use math::{Length, Speed};
use strum::IntoEnumIterator;

pub mod comm;
pub mod context;
pub mod controller;
pub mod dynamics;
pub mod flight_plan;
pub mod ground;
pub mod load;
pub mod manager;
pub mod proxy;
pub mod radar;
pub mod runway_queue;
pub mod traffic;
pub mod try_log;
pub use try_log::TryLog;

#[cfg(test)]
mod tests;

pub struct Plug;

impl Plugin for Plug {
    fn build(&self, app: &mut App) {
        for set in SystemSets::iter() {
            app.configure_sets(app::Update, set.in_set(AllSystemSets));
        }

        for (before, after) in SystemSets::iter().tuple_windows() {
            app.configure_sets(app::Update, before.before(after));
        }

        app.init_resource::<Conf>();
        app.add_plugins(manager::Plug);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, SystemSet, strum::EnumIter)]
pub enum SystemSets {
    /// Systems that poll aircraft and advance controller dialogues.
    Communicate,
    /// Systems that forward transmissions to the rest of the simulator.
    Publish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, SystemSet)]
pub struct AllSystemSets;

/// Tunables of the traffic control subsystem.
///
/// All durations are in simulated seconds.
#[derive(Resource, Clone, serde::Deserialize)]
#[serde(default)]
pub struct Conf {
    /// Minimum interval between two transmissions of the same controller.
    pub transmission_interval_s: i64,
    /// Minimum interval between two runway slots of the same runway.
    pub runway_separation_s:     i64,
    /// Maximum distance at which another aircraft intending to use
    /// the segment currently occupied by an aircraft is considered in conflict.
    pub intentions_distance:     Length<f64>,

    /// Lead time before departure at which the engine start is announced.
    pub startup_announce_lead_s: i64,
    /// Lead time before departure at which the engine start is requested.
    pub startup_request_lead_s:  i64,
    /// Lead time before departure at which the aircraft switches to ground.
    pub startup_handoff_lead_s:  i64,

    /// Height above field elevation at which a departure is considered airborne.
    pub airborne_height:  Length<f64>,
    /// Height above field elevation below which an arrival is considered on the ground.
    pub on_ground_height: Length<f64>,
    /// Speed below which a landed aircraft is handed over to the tower for vacating.
    pub vacate_speed:     Speed<f64>,
    /// Distance from the arrival runway threshold at which an aircraft contacts approach.
    pub approach_range:   Length<f64>,

    /// Distance at which a taxi waypoint is considered reached.
    pub waypoint_reached:      Length<f64>,
    /// Distance from the runway holding point at which an aircraft reports holding short.
    pub hold_short_distance:   Length<f64>,
    /// Distance from the assigned parking at which an aircraft is considered parked.
    pub parking_reached:       Length<f64>,
    /// Maximum time an aircraft waits on hold before taxi is resumed regardless of the blocker.
    pub resume_wait_timeout_s: i64,
    /// Time a taxi segment stays reserved after the last touch of its occupant.
    pub segment_block_s:       i64,

    /// Epoch seconds corresponding to zero virtual time.
    pub epoch_offset_s: i64,
}

impl Default for Conf {
    fn default() -> Self {
        Self {
            transmission_interval_s: 15,
            runway_separation_s:     runway_queue::SEPARATION,
            intentions_distance:     Length::from_meters(400.),
            startup_announce_lead_s: 7 * math::SECONDS_PER_MINUTE,
            startup_request_lead_s:  6 * math::SECONDS_PER_MINUTE,
            startup_handoff_lead_s:  math::SECONDS_PER_MINUTE,
            airborne_height:         Length::from_feet(500.),
            on_ground_height:        Length::from_feet(30.),
            vacate_speed:            Speed::from_knots(40.),
            approach_range:          Length::from_nm(30.),
            waypoint_reached:        Length::from_meters(15.),
            hold_short_distance:     Length::from_meters(30.),
            parking_reached:         Length::from_meters(10.),
            resume_wait_timeout_s:   3 * math::SECONDS_PER_MINUTE,
            segment_block_s:         60,
            epoch_offset_s:          0,
        }
    }
}
