use math::GeoPos;
use serde::{Deserialize, Serialize};

/// Taxi nodes and directed taxi segments of an airport.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct GroundNetwork {
    /// Taxi nodes.
    pub nodes:    Vec<GroundNode>,
    /// Directed taxi segments between nodes.
    ///
    /// Bidirectional taxiways are represented by two segments in opposite directions.
    pub segments: Vec<GroundSegment>,
}

/// A node in the taxi network.
#[derive(Clone, Serialize, Deserialize)]
pub struct GroundNode {
    /// Identifier of the node, unique within the airport.
    pub index:      u32,
    /// Position of the node.
    pub position:   GeoPos,
    /// Whether the node lies on a runway.
    #[serde(default)]
    pub on_runway:  bool,
    /// Hold point type of the node.
    #[serde(default)]
    pub hold_point: HoldPointType,
    /// Whether the node is a push-back target.
    #[serde(default)]
    pub pushback:   bool,
    /// Name of the parking at this node, if any.
    #[serde(default)]
    pub parking:    Option<String>,
}

/// Hold point classification of a taxi node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HoldPointType {
    /// Not a hold point.
    #[default]
    None,
    /// A regular runway holding position.
    Normal,
    /// A CAT II/III holding position.
    CategoryTwoThree,
}

/// A directed taxi segment.
#[derive(Clone, Serialize, Deserialize)]
pub struct GroundSegment {
    /// Index of the source node.
    pub from: u32,
    /// Index of the target node.
    pub to:   u32,
}
