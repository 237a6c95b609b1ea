//! Shared fixtures and plugin-level tests.

use std::sync::Arc;
use std::time::Duration;

use bevy::app::App;
use bevy::time::{self, Time};
use math::{GeoPos, Heading, Length};
use store::{
    Frequencies, GroundNode, GroundSegment, HoldPointType, Parking, ParkingType,
};

use crate::controller::ControllerKind;
use crate::flight_plan::{FlightPlan, FlightRules, Leg};
use crate::ground::{GroundNetwork, NodeId};
use crate::manager::{AtcManager, SimProperties, StationRef, TransmissionMessage};
use crate::proxy::{PuppetProxy, PuppetState};
use crate::traffic::AircraftId;
use crate::{Conf, load};

pub(crate) const ORIGIN: GeoPos = GeoPos::new(52.0, 4.0);
pub(crate) const AIRPORT: &str = "TEST";

/// A position `east` and `north` meters from [`ORIGIN`].
pub(crate) fn local(east: f64, north: f64) -> GeoPos {
    ORIGIN.offset(Length::from_meters(east), Length::from_meters(north))
}

pub(crate) fn id(raw: u32) -> AircraftId { AircraftId::new(raw).expect("nonzero id") }

/// ```text
///                          N2(40)
///                            |
/// 09 ==R1(1)=============R2(2)=============R3(3)== 27
///       |                    |               |
///      H1(11)                |              H3(13)
///       |                    |               |
///      T1(21) ------------ T2(22) --------- T3(23)
///                       /        \
///                  P1(31) A1    P2(32) A2
///
///   Z(50) isolated
/// ```
///
/// Coordinates are meters east/north of [`ORIGIN`]:
/// the runway spans x = -1000..1000 at y = 0, the parallel taxiway lies at y = -200,
/// hold points at y = -100 and parkings at y = -400.
pub(crate) fn prepare_store_airport() -> store::Airport {
    let node = |index, east, north, on_runway, hold_point, parking: Option<&str>| GroundNode {
        index,
        position: local(east, north),
        on_runway,
        hold_point,
        pushback: false,
        parking: parking.map(Into::into),
    };
    let nodes = vec![
        node(1, -900., 0., true, HoldPointType::None, None),
        node(2, 0., 0., true, HoldPointType::None, None),
        node(3, 900., 0., true, HoldPointType::None, None),
        node(11, -900., -100., false, HoldPointType::Normal, None),
        node(13, 900., -100., false, HoldPointType::Normal, None),
        node(21, -900., -200., false, HoldPointType::None, None),
        node(22, 0., -200., false, HoldPointType::None, None),
        node(23, 900., -200., false, HoldPointType::None, None),
        node(31, -300., -400., false, HoldPointType::None, Some("A1")),
        node(32, 300., -400., false, HoldPointType::None, Some("A2")),
        node(40, 0., 200., false, HoldPointType::None, None),
        node(50, 0., -1500., false, HoldPointType::None, None),
    ];

    let mut segments = Vec::new();
    for (from, to) in [
        (21, 22),
        (22, 23),
        (31, 22),
        (32, 22),
        (21, 11),
        (11, 1),
        (23, 13),
        (13, 3),
        (1, 2),
        (2, 3),
        (22, 40),
    ] {
        segments.push(GroundSegment { from, to });
        segments.push(GroundSegment { from: to, to: from });
    }

    let west = local(-1000., 0.);
    let east = local(1000., 0.);
    store::Airport {
        code:              AIRPORT.into(),
        name:              "Testfield".into(),
        elevation:         Length::from_feet(10.),
        runways:           vec![
            store::Runway {
                name:      "09".into(),
                threshold: west,
                end:       east,
                width:     Length::from_meters(45.),
                heading:   west.course_to(east),
            },
            store::Runway {
                name:      "27".into(),
                threshold: east,
                end:       west,
                width:     Length::from_meters(45.),
                heading:   east.course_to(west),
            },
        ],
        ground_network:    store::GroundNetwork { nodes, segments },
        parkings:          vec![
            Parking {
                name:     "A1".into(),
                position: local(-300., -400.),
                heading:  Heading::NORTH,
                radius:   Length::from_meters(30.),
                kind:     ParkingType::Gate,
                airlines: Vec::new(),
                pushback: true,
            },
            Parking {
                name:     "A2".into(),
                position: local(300., -400.),
                heading:  Heading::NORTH,
                radius:   Length::from_meters(20.),
                kind:     ParkingType::Gate,
                airlines: vec!["KLM".into()],
                pushback: false,
            },
        ],
        frequencies:       Frequencies {
            atis:      Some(13200),
            clearance: Some(12170),
            ground:    Some(12190),
            tower:     Some(11870),
            approach:  Some(119_050),
        },
        runway_preference: Vec::new(),
    }
}

pub(crate) fn prepare_network() -> GroundNetwork {
    let airport = prepare_store_airport();
    GroundNetwork::build(&airport.ground_network, &airport.runways).expect("fixture is valid")
}

pub(crate) fn node_by_label(network: &GroundNetwork, label: u32) -> NodeId {
    network.nodes().iter().find(|node| node.label == label).expect("label exists").id
}

pub(crate) fn puppet(callsign: &str, position: GeoPos, heading: Heading) -> Arc<PuppetProxy> {
    Arc::new(PuppetProxy::new(PuppetState {
        position,
        heading,
        callsign: callsign.into(),
        altitude: Length::from_feet(10.),
        ..Default::default()
    }))
}

fn create_test_app() -> App {
    let mut app = App::new();
    app.add_plugins(crate::Plug);
    app.init_resource::<Time<time::Virtual>>();
    app
}

#[test]
fn plugin_loads_airport_and_announces_startup() {
    let mut app = create_test_app();
    app.world_mut().resource_mut::<Conf>().epoch_offset_s = 1_000_000;

    let file = store::File { airports: vec![prepare_store_airport()] };
    app.world_mut().commands().queue(load::Command {
        source:   load::Source::Parsed(Box::new(file)),
        on_error: Box::new(|_, err| panic!("load error: {err}")),
    });
    app.world_mut().flush();

    {
        let mut props = app.world_mut().resource_mut::<SimProperties>();
        props.context.comm_mhz[0] = Some(121.7);
    }

    let proxy = puppet("KLM123", local(-300., -400.), Heading::NORTH);
    {
        let mut manager = app.world_mut().resource_mut::<AtcManager>();
        assert!(manager.stations().contains(&StationRef {
            airport: AIRPORT.into(),
            kind:    ControllerKind::Startup,
        }));

        let mut plan = FlightPlan::new(AIRPORT, "EHAM", FlightRules::Ifr);
        plan.departure_time = 1_000_000 + 5 * 60;
        plan.gate = Some("A1".into());
        manager
            .spawn_traffic(id(1), proxy.clone(), plan, 1_000_000)
            .expect("departure airport is loaded");
        assert_eq!(manager.arena().get(id(1)).expect("spawned").leg(), Leg::ParkingTaxi);
    }

    app.world_mut().resource_mut::<Time<time::Virtual>>().advance_by(Duration::from_secs(1));
    app.update();

    let messages: Vec<_> = app
        .world_mut()
        .resource_mut::<bevy::ecs::message::Messages<TransmissionMessage>>()
        .drain()
        .collect();
    assert_eq!(messages.len(), 1, "{messages:?}");
    assert!(
        messages[0].text().contains("KLM123, at parking A1"),
        "unexpected text {:?}",
        messages[0].text()
    );
}
