//! Generates the airport legs of a flight plan from the taxi network.

use math::{GeoPos, Length, Speed};

use super::{FlightPlan, Leg, Waypoint};
use crate::ground::{GroundNetwork, NodeId, RouteError, Runway};
use crate::proxy::Performance;
use crate::runway_queue::APPROACH_DISTANCE_TO_FINAL;

/// Distance beyond the runway end of the first climb waypoint.
const CLIMB_OUT_DISTANCE: Length<f64> = Length::from_nm(5.);
const CLIMB_OUT_HEIGHT: Length<f64> = Length::from_feet(3000.);
const FINAL_APPROACH_HEIGHT: Length<f64> = Length::from_feet(1500.);
const THRESHOLD_CROSSING_HEIGHT: Length<f64> = Length::from_feet(50.);
/// Distance beyond the threshold from which the runway exit is searched.
const EXIT_SEARCH_DISTANCE: Length<f64> = Length::from_nm(0.1);

/// Appends taxi waypoints along the shortest route from `from` to `to`.
///
/// If the network has no route, a single waypoint at `to` is appended
/// and the aircraft taxis in a straight line.
pub fn add_taxi_route(
    plan: &mut FlightPlan,
    network: &GroundNetwork,
    elevation: Length<f64>,
    from: NodeId,
    to: NodeId,
    speed: Speed<f64>,
    leg: Leg,
) {
    match network.shortest_route(from, to) {
        Ok(route) => {
            for (&node_id, &segment) in route.nodes.iter().skip(1).zip(&route.segments) {
                let Some(node) = network.node(node_id) else { continue };
                plan.add_waypoint(Waypoint::ground(
                    node.label.to_string(),
                    node.position,
                    elevation,
                    speed,
                    Some(segment),
                    leg,
                ));
            }
        }
        Err(RouteError::NoRoute) => {
            bevy::log::warn!("No taxi route from {from:?} to {to:?}, taxiing in a straight line");
            if let Some(node) = network.node(to) {
                plan.add_waypoint(Waypoint::ground(
                    node.label.to_string(),
                    node.position,
                    elevation,
                    speed,
                    None,
                    leg,
                ));
            }
        }
    }
}

/// The holding point in front of the runway entry used for departures from `runway`.
///
/// Falls back to the entry node itself if the entry has no hold point before it.
#[must_use]
pub fn departure_hold_point(network: &GroundNetwork, runway: &Runway) -> Option<NodeId> {
    let entry = network.find_nearest_node_on_runway_entry(runway.threshold, runway)?;
    let entry_node = network.node(entry)?;
    let hold_point = entry_node.incoming.iter().find_map(|&segment| {
        let from = network.node(network.segment(segment)?.from)?;
        (!from.on_runway).then_some(from.id)
    });
    Some(hold_point.unwrap_or(entry))
}

/// Replaces the waypoints of `plan` with a departure from its gate via `runway`.
///
/// Returns `false` if the gate is not in the network.
pub fn build_departure(
    plan: &mut FlightPlan,
    network: &GroundNetwork,
    elevation: Length<f64>,
    runway: &Runway,
    performance: &Performance,
) -> bool {
    let Some(gate) = plan.gate.clone() else {
        bevy::log::error!("Cannot build departure from {} without a gate", plan.departure);
        return false;
    };
    let Some(parking) = network.parking_node(&gate) else {
        bevy::log::error!("Gate {gate:?} is not in the ground network of {}", plan.departure);
        return false;
    };
    let Some(hold_point) = departure_hold_point(network, runway) else {
        bevy::log::error!("Runway {} of {} has no entry", runway.name, plan.departure);
        return false;
    };

    plan.clear_waypoints();
    let mut taxi_start = parking;
    if plan.requires_pushback
        && let Ok(route) = network.shortest_route(parking, hold_point)
        && let Some(&pushback_node) = route.nodes.get(1)
        && let Some(node) = network.node(pushback_node)
    {
        plan.add_waypoint(Waypoint::ground(
            "pushback",
            node.position,
            elevation,
            performance.taxi_speed / 3.,
            route.segments.first().copied(),
            Leg::Pushback,
        ));
        taxi_start = pushback_node;
    }

    add_taxi_route(
        plan,
        network,
        elevation,
        taxi_start,
        hold_point,
        performance.taxi_speed,
        Leg::Taxi,
    );

    plan.add_waypoint(Waypoint::ground(
        format!("{}-threshold", runway.name),
        runway.threshold,
        elevation,
        performance.takeoff_speed,
        None,
        Leg::Takeoff,
    ));
    plan.add_waypoint(Waypoint::air(
        format!("{}-end", runway.name),
        runway.end,
        elevation,
        performance.takeoff_speed,
        Leg::Takeoff,
    ));
    plan.add_waypoint(Waypoint::air(
        "climb",
        runway.end.destination(runway.heading, CLIMB_OUT_DISTANCE),
        elevation + CLIMB_OUT_HEIGHT,
        performance.takeoff_speed * 1.3,
        Leg::Climb,
    ));
    true
}

/// Replaces the unvisited arrival waypoints of `plan` with an approach to `runway`
/// followed by taxi-in to the gate.
///
/// Without a gate, the plan ends at the runway exit.
pub fn build_arrival(
    plan: &mut FlightPlan,
    network: &GroundNetwork,
    elevation: Length<f64>,
    runway: &Runway,
    performance: &Performance,
) {
    plan.truncate_from_leg(Leg::Approach);

    let final_fix: GeoPos = runway.threshold.destination(runway.heading.opposite(), APPROACH_DISTANCE_TO_FINAL);
    plan.add_waypoint(Waypoint::air(
        format!("{}-final", runway.name),
        final_fix,
        elevation + FINAL_APPROACH_HEIGHT,
        performance.approach_speed,
        Leg::Approach,
    ));
    plan.add_waypoint(Waypoint::air(
        format!("{}-threshold", runway.name),
        runway.threshold,
        elevation + THRESHOLD_CROSSING_HEIGHT,
        performance.landing_speed,
        Leg::Landing,
    ));

    let Some(exit) = network.find_nearest_node_on_runway_exit(
        runway.threshold.destination(runway.heading, EXIT_SEARCH_DISTANCE),
        runway,
    ) else {
        bevy::log::warn!("Runway {} of {} has no exit", runway.name, plan.arrival);
        return;
    };
    if let Some(node) = network.node(exit) {
        plan.add_waypoint(Waypoint::ground(
            node.label.to_string(),
            node.position,
            elevation,
            performance.taxi_speed * 2.,
            None,
            Leg::Landing,
        ));
    }

    let Some(gate) = plan.gate.clone() else { return };
    let Some(parking) = network.parking_node(&gate) else {
        bevy::log::error!("Gate {gate:?} is not in the ground network of {}", plan.arrival);
        return;
    };
    add_taxi_route(
        plan,
        network,
        elevation,
        exit,
        parking,
        performance.taxi_speed,
        Leg::LandingTaxi,
    );
    if let Some(last) = plan.waypoints.last_mut() {
        last.leg = Leg::Parking;
    }
}
