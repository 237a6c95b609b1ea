//! Taxi network of an airport.
//!
//! The network is a directed multigraph of taxi nodes and segments,
//! built once from the store and immutable afterwards.
//! Reservations of segments by taxiing aircraft are tracked separately
//! in [`dynamics`](crate::dynamics).

use std::collections::HashMap;

use math::{GeoArc, GeoPos, GeoRect, Heading, Length};
use ordered_float::OrderedFloat;
use pathfinding::prelude::dijkstra;
use smallvec::SmallVec;
use store::HoldPointType;


/// Penalty added to a segment crossing a runway edge.
pub const RUNWAY_CROSSING_PENALTY: f64 = 100.;
/// Penalty for routing into a parking node.
pub const PARKING_PENALTY: f64 = 10_000.;
/// Penalty for routing into a hold point or onto a runway.
pub const HOLD_POINT_PENALTY: f64 = 1_000.;
/// Maximum angle between the runway heading and the bearing to a node considered ahead.
pub const RUNWAY_AHEAD_TOLERANCE_DEG: f64 = 75.;
/// Length of the ray cast by [`GroundNetwork::find_segment_ahead`].
pub const SEGMENT_AHEAD_RANGE: Length<f64> = Length::from_meters(500.);

/// Tolerance for a point to be considered on an arc.
const ARC_TOLERANCE: Length<f64> = Length::from_meters(1.);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SegmentId(pub u32);

#[derive(Debug, Clone)]
pub struct Node {
    pub id:         NodeId,
    /// Index of the node in the store, used in log messages.
    pub label:      u32,
    pub position:   GeoPos,
    pub on_runway:  bool,
    pub hold_point: HoldPointType,
    pub pushback:   bool,
    pub parking:    Option<String>,
    pub outgoing:   SmallVec<[SegmentId; 4]>,
    pub incoming:   SmallVec<[SegmentId; 4]>,
}

impl Node {
    #[must_use]
    pub fn is_hold_point(&self) -> bool { self.hold_point != HoldPointType::None }
}

#[derive(Debug, Clone)]
pub struct Segment {
    pub id:       SegmentId,
    pub from:     NodeId,
    pub to:       NodeId,
    pub length:   Length<f64>,
    pub heading:  Heading,
    /// Extra routing cost of the segment itself, e.g. for crossing a runway.
    pub penalty:  f64,
    /// The segment with swapped endpoints, if any.
    pub opposite: Option<SegmentId>,
}

/// One direction of a runway.
#[derive(Debug, Clone)]
pub struct Runway {
    pub name:      String,
    pub threshold: GeoPos,
    pub end:       GeoPos,
    pub width:     Length<f64>,
    pub heading:   Heading,
}

impl Runway {
    #[must_use]
    pub fn from_store(runway: &store::Runway) -> Self {
        Self {
            name:      runway.name.clone(),
            threshold: runway.threshold,
            end:       runway.end,
            width:     runway.width,
            heading:   runway.heading,
        }
    }

    #[must_use]
    pub fn length(&self) -> Length<f64> { self.threshold.distance(self.end) }

    /// The two long edges of the runway pavement.
    #[must_use]
    pub fn edges(&self) -> [GeoArc; 2] {
        let half_width = self.width / 2.;
        [self.heading - 90., self.heading + 90.].map(|side| {
            GeoArc::new(
                self.threshold.destination(side, half_width),
                self.end.destination(side, half_width),
            )
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Duplicate ground node index {0}")]
    DuplicateNode(u32),
    #[error("Segment refers to unknown ground node {0}")]
    UnknownNode(u32),
    #[error("Ground network has too many elements")]
    TooLarge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RouteError {
    #[error("No taxi route between the requested nodes")]
    NoRoute,
}

/// A path through the taxi network.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    /// Visited nodes, starting with the origin and ending with the destination.
    pub nodes:    Vec<NodeId>,
    /// Traversed segments; `segments[i]` connects `nodes[i]` to `nodes[i + 1]`.
    pub segments: Vec<SegmentId>,
    /// Sum of segment lengths.
    pub distance: Length<f64>,
    /// Sum of segment costs including penalties, in meter equivalents.
    pub score:    f64,
}

impl Route {
    /// Whether the route was penalized, i.e. it crosses a runway
    /// or passes through a hold point or parking.
    #[must_use]
    pub fn crosses_runway(&self) -> bool { self.score > self.distance.into_meters() }
}

#[derive(Debug, Clone)]
pub struct GroundNetwork {
    nodes:    Vec<Node>,
    segments: Vec<Segment>,
    runways:  Vec<Runway>,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
struct DijkstraVertex {
    node: NodeId,
    via:  Option<SegmentId>,
}

impl GroundNetwork {
    /// Builds the network from store data.
    ///
    /// Runways are used to penalize segments crossing their pavement.
    pub fn build(
        network: &store::GroundNetwork,
        runways: &[store::Runway],
    ) -> Result<Self, BuildError> {
        let mut label_to_id = HashMap::new();
        let mut nodes = Vec::with_capacity(network.nodes.len());
        for node in &network.nodes {
            let id = NodeId(u32::try_from(nodes.len()).map_err(|_| BuildError::TooLarge)?);
            if label_to_id.insert(node.index, id).is_some() {
                return Err(BuildError::DuplicateNode(node.index));
            }
            nodes.push(Node {
                id,
                label: node.index,
                position: node.position,
                on_runway: node.on_runway,
                hold_point: node.hold_point,
                pushback: node.pushback,
                parking: node.parking.clone(),
                outgoing: SmallVec::new(),
                incoming: SmallVec::new(),
            });
        }

        let runways: Vec<_> = runways.iter().map(Runway::from_store).collect();
        let runway_edges: Vec<_> = runways.iter().flat_map(Runway::edges).collect();

        let mut segments = Vec::with_capacity(network.segments.len());
        for segment in &network.segments {
            let id = SegmentId(u32::try_from(segments.len()).map_err(|_| BuildError::TooLarge)?);
            let from = *label_to_id.get(&segment.from).ok_or(BuildError::UnknownNode(segment.from))?;
            let to = *label_to_id.get(&segment.to).ok_or(BuildError::UnknownNode(segment.to))?;
            let arc = GeoArc::new(nodes[from.0 as usize].position, nodes[to.0 as usize].position);

            let crosses_runway = runway_edges
                .iter()
                .any(|edge| arc.arc_intersection(edge, ARC_TOLERANCE).is_some());

            nodes[from.0 as usize].outgoing.push(id);
            nodes[to.0 as usize].incoming.push(id);
            segments.push(Segment {
                id,
                from,
                to,
                length: arc.length(),
                heading: arc.course(),
                penalty: if crosses_runway { RUNWAY_CROSSING_PENALTY } else { 0. },
                opposite: None,
            });
        }

        for index in 0..segments.len() {
            let (from, to) = (segments[index].from, segments[index].to);
            segments[index].opposite = nodes[to.0 as usize]
                .outgoing
                .iter()
                .copied()
                .find(|&candidate| segments[candidate.0 as usize].to == from);
        }

        Ok(Self { nodes, segments, runways })
    }

    #[must_use]
    pub fn nodes(&self) -> &[Node] { &self.nodes }

    #[must_use]
    pub fn segments(&self) -> &[Segment] { &self.segments }

    #[must_use]
    pub fn runways(&self) -> &[Runway] { &self.runways }

    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&Node> { self.nodes.get(id.0 as usize) }

    #[must_use]
    pub fn segment(&self, id: SegmentId) -> Option<&Segment> { self.segments.get(id.0 as usize) }

    #[must_use]
    pub fn runway(&self, name: &str) -> Option<&Runway> {
        self.runways.iter().find(|runway| runway.name == name)
    }

    #[must_use]
    pub fn parking_node(&self, parking: &str) -> Option<NodeId> {
        self.nodes.iter().find(|node| node.parking.as_deref() == Some(parking)).map(|node| node.id)
    }

    /// The rectangle enclosing all nodes and runways, padded by `margin` degrees.
    #[must_use]
    pub fn bounds(&self, margin: f64) -> Option<GeoRect> {
        let runway_points = self.runways.iter().flat_map(|runway| [runway.threshold, runway.end]);
        GeoRect::enclosing(self.nodes.iter().map(|node| node.position).chain(runway_points), margin)
    }

    /// Cost of traversing `segment`, penalizing its target node.
    fn segment_cost(&self, segment: &Segment) -> f64 {
        let mut cost = segment.length.into_meters() + segment.penalty;
        if let Some(target) = self.node(segment.to) {
            if target.parking.is_some() {
                cost += PARKING_PENALTY;
            }
            if target.is_hold_point() || target.on_runway {
                cost += HOLD_POINT_PENALTY;
            }
        }
        cost
    }

    /// Finds the cheapest route from `start` to `end`.
    pub fn shortest_route(&self, start: NodeId, end: NodeId) -> Result<Route, RouteError> {
        if self.node(start).is_none() || self.node(end).is_none() {
            return Err(RouteError::NoRoute);
        }

        let (vertices, _) = dijkstra(
            &DijkstraVertex { node: start, via: None },
            |vertex| {
                self.nodes[vertex.node.0 as usize].outgoing.iter().map(move |&segment_id| {
                    let segment = &self.segments[segment_id.0 as usize];
                    (
                        DijkstraVertex { node: segment.to, via: Some(segment_id) },
                        OrderedFloat(self.segment_cost(segment)),
                    )
                })
            },
            |vertex| vertex.node == end,
        )
        .ok_or(RouteError::NoRoute)?;

        let segments: Vec<_> = vertices.iter().filter_map(|vertex| vertex.via).collect();
        let mut distance = Length::ZERO;
        let mut score = 0.;
        for &segment_id in &segments {
            let segment = &self.segments[segment_id.0 as usize];
            distance += segment.length;
            score += self.segment_cost(segment);
        }

        bevy::log::trace!(
            "Route {} -> {}: {} segments, {:.0}m, score {score:.0}",
            self.nodes[start.0 as usize].label,
            self.nodes[end.0 as usize].label,
            segments.len(),
            distance.into_meters(),
        );

        Ok(Route {
            nodes: vertices.into_iter().map(|vertex| vertex.node).collect(),
            segments,
            distance,
            score,
        })
    }

    fn nearest<'a>(
        &self,
        position: GeoPos,
        candidates: impl Iterator<Item = &'a Node>,
    ) -> Option<NodeId> {
        candidates
            .min_by_key(|node| OrderedFloat(node.position.cart_distance_squared(position)))
            .map(|node| node.id)
    }

    /// The node closest to `position`.
    #[must_use]
    pub fn find_nearest_node(&self, position: GeoPos) -> Option<NodeId> {
        self.nearest(position, self.nodes.iter())
    }

    /// The on-runway node closest to `position` ahead of it along the runway
    /// where an aircraft can enter the runway from a taxiway.
    #[must_use]
    pub fn find_nearest_node_on_runway_entry(
        &self,
        position: GeoPos,
        runway: &Runway,
    ) -> Option<NodeId> {
        self.find_nearest_runway_node(position, runway, |node| {
            node.incoming.iter().any(|&segment| self.is_off_runway_endpoint(segment, |s| s.from))
        })
    }

    /// The on-runway node closest to `position` ahead of it along the runway
    /// where an aircraft can leave the runway onto a taxiway.
    #[must_use]
    pub fn find_nearest_node_on_runway_exit(
        &self,
        position: GeoPos,
        runway: &Runway,
    ) -> Option<NodeId> {
        self.find_nearest_runway_node(position, runway, |node| {
            node.outgoing.iter().any(|&segment| self.is_off_runway_endpoint(segment, |s| s.to))
        })
    }

    fn is_off_runway_endpoint(&self, segment: SegmentId, endpoint: fn(&Segment) -> NodeId) -> bool {
        self.segment(segment)
            .and_then(|segment| self.node(endpoint(segment)))
            .is_some_and(|node| !node.on_runway)
    }

    fn find_nearest_runway_node(
        &self,
        position: GeoPos,
        runway: &Runway,
        is_junction: impl Fn(&Node) -> bool,
    ) -> Option<NodeId> {
        let on_runway = || self.nodes.iter().filter(|node| node.on_runway);
        let is_ahead = |node: &&Node| {
            runway.heading.is_within(position.course_to(node.position), RUNWAY_AHEAD_TOLERANCE_DEG)
        };

        self.nearest(position, on_runway().filter(is_ahead).filter(|node| is_junction(node)))
            .or_else(|| self.nearest(position, on_runway().filter(is_ahead)))
            .or_else(|| self.nearest(position, on_runway()))
    }

    /// The first segment hit by a ray cast from `position` towards `heading`.
    ///
    /// Only intersections whose bearing from `position` rounds to the same whole degree
    /// as `heading` are accepted, which rejects the antipodal intersection
    /// and intersections behind the aircraft.
    #[must_use]
    pub fn find_segment_ahead(&self, position: GeoPos, heading: Heading) -> Option<SegmentId> {
        let ray = GeoArc::new(position, position.destination(heading, SEGMENT_AHEAD_RANGE));
        self.segments.iter().find_map(|segment| {
            let arc = GeoArc::new(
                self.nodes[segment.from.0 as usize].position,
                self.nodes[segment.to.0 as usize].position,
            );
            let point = ray.circle_intersection(&arc)?;
            let hit = arc.contains(point, ARC_TOLERANCE)
                && ray.contains(point, ARC_TOLERANCE)
                && position.course_to(point).rounded() == heading.rounded();
            hit.then_some(segment.id)
        })
    }
}
