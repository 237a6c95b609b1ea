//! Spatial index of aircraft on the airport surface.
//!
//! The index is a depth-limited quad-tree over latitude/longitude degrees.
//! Entries lying exactly on the center lines of a node cannot be assigned
//! to a single quadrant and stay in the bucket of that node;
//! all other entries live in leaves.

use std::collections::HashMap;

use math::{GeoPos, GeoRect};
use ordered_float::OrderedFloat;

use crate::traffic::{AircraftId, Arena, TrafficRecord};

#[cfg(test)]
mod tests;

/// Number of entries at which a leaf splits.
pub const SPLIT_THRESHOLD: usize = 10;
/// Depth beyond which leaves never split.
pub const MAX_DEPTH: u8 = 8;
/// Half extent in degrees of the area searched for blockers.
pub const QUERY_BOX_SIZE: f64 = 0.1;
/// Separation in meters required per meter of aircraft radius.
pub const SEPARATION_PER_RADIUS: f64 = 4.;
/// Maximum angle between the heading of an aircraft and
/// the bearing of another aircraft for the latter to be considered ahead.
const AHEAD_TOLERANCE_DEG: f64 = 90.;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadarEntry {
    pub id:       AircraftId,
    pub position: GeoPos,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{id} at {position:?} is outside the ground radar coverage")]
    OutOfBounds { id: AircraftId, position: GeoPos },
    #[error("{0} is not tracked by the ground radar")]
    NotFound(AircraftId),
}

struct QuadNode {
    depth:    u8,
    bounds:   GeoRect,
    children: Option<Box<[QuadNode; 4]>>,
    bucket:   Vec<RadarEntry>,
}

impl QuadNode {
    fn new(depth: u8, bounds: GeoRect) -> Self {
        Self { depth, bounds, children: None, bucket: Vec::new() }
    }

    fn insert(&mut self, entry: RadarEntry) {
        if let Some(children) = &mut self.children {
            match self.bounds.quadrant_of(entry.position) {
                Some(quadrant) => children[quadrant.index()].insert(entry),
                None => self.bucket.push(entry),
            }
            return;
        }

        self.bucket.push(entry);
        if self.bucket.len() >= SPLIT_THRESHOLD && self.depth < MAX_DEPTH {
            self.split();
        }
    }

    fn split(&mut self) {
        let bounds = self.bounds;
        let depth = self.depth + 1;
        let quadrants = [
            math::Quadrant::SouthWest,
            math::Quadrant::SouthEast,
            math::Quadrant::NorthWest,
            math::Quadrant::NorthEast,
        ];
        self.children = Some(Box::new(quadrants.map(|quadrant| QuadNode::new(depth, bounds.quadrant(quadrant)))));

        for entry in std::mem::take(&mut self.bucket) {
            self.insert(entry);
        }
    }

    /// Removes the entry of `id` expected at `position`.
    fn remove_at(&mut self, id: AircraftId, position: GeoPos) -> Option<RadarEntry> {
        if let Some(children) = &mut self.children
            && let Some(quadrant) = self.bounds.quadrant_of(position)
        {
            return children[quadrant.index()].remove_at(id, position);
        }
        self.take_from_bucket(id)
    }

    fn take_from_bucket(&mut self, id: AircraftId) -> Option<RadarEntry> {
        let index = self.bucket.iter().position(|entry| entry.id == id)?;
        Some(self.bucket.swap_remove(index))
    }

    /// Removes the entry of `id` wherever it is.
    fn remove_scan(&mut self, id: AircraftId) -> Option<RadarEntry> {
        if let Some(entry) = self.take_from_bucket(id) {
            return Some(entry);
        }
        self.children.as_mut()?.iter_mut().find_map(|child| child.remove_scan(id))
    }

    /// Moves the entry of `id` from `old` to `new`, both within the bounds of `self`.
    ///
    /// Returns `false` if the entry was not found at `old`.
    fn move_entry(&mut self, id: AircraftId, old: GeoPos, new: GeoPos) -> bool {
        let Some(children) = &mut self.children else {
            return match self.bucket.iter_mut().find(|entry| entry.id == id) {
                Some(entry) => {
                    entry.position = new;
                    true
                }
                None => false,
            };
        };

        let old_quadrant = self.bounds.quadrant_of(old);
        let new_quadrant = self.bounds.quadrant_of(new);
        if let Some(quadrant) = old_quadrant
            && old_quadrant == new_quadrant
        {
            return children[quadrant.index()].move_entry(id, old, new);
        }

        let removed = match old_quadrant {
            Some(quadrant) => children[quadrant.index()].remove_at(id, old),
            None => self.take_from_bucket(id),
        };
        if removed.is_none() {
            return false;
        }
        self.insert(RadarEntry { id, position: new });
        true
    }

    fn query(&self, rect: &GeoRect, output: &mut Vec<RadarEntry>) {
        output.extend(self.bucket.iter().filter(|entry| rect.contains(entry.position)));
        if let Some(children) = &self.children {
            for child in children.iter() {
                if child.bounds.overlaps(rect) {
                    child.query(rect, output);
                }
            }
        }
    }

    fn for_each_leaf(&self, f: &mut impl FnMut(&QuadNode)) {
        match &self.children {
            Some(children) => children.iter().for_each(|child| child.for_each_leaf(f)),
            None => f(self),
        }
    }
}

/// Quad-tree index of aircraft on the airport surface.
pub struct GroundRadar {
    root:      QuadNode,
    positions: HashMap<AircraftId, GeoPos>,
}

impl GroundRadar {
    #[must_use]
    pub fn new(bounds: GeoRect) -> Self {
        Self { root: QuadNode::new(0, bounds), positions: HashMap::new() }
    }

    #[must_use]
    pub fn bounds(&self) -> GeoRect { self.root.bounds }

    #[must_use]
    pub fn len(&self) -> usize { self.positions.len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.positions.is_empty() }

    #[must_use]
    pub fn contains(&self, id: AircraftId) -> bool { self.positions.contains_key(&id) }

    #[must_use]
    pub fn position(&self, id: AircraftId) -> Option<GeoPos> { self.positions.get(&id).copied() }

    /// Starts tracking `id` at `position`.
    ///
    /// If `id` is already tracked, it is moved instead.
    pub fn add(&mut self, id: AircraftId, position: GeoPos) -> Result<(), Error> {
        if self.positions.contains_key(&id) {
            return self.move_to(id, position);
        }
        if !self.root.bounds.contains(position) {
            return Err(Error::OutOfBounds { id, position });
        }
        self.root.insert(RadarEntry { id, position });
        self.positions.insert(id, position);
        Ok(())
    }

    /// Updates the position of `id`.
    ///
    /// An aircraft moving out of coverage stops being tracked.
    pub fn move_to(&mut self, id: AircraftId, position: GeoPos) -> Result<(), Error> {
        let Some(&old) = self.positions.get(&id) else { return Err(Error::NotFound(id)) };
        if !self.root.bounds.contains(position) {
            self.remove(id);
            return Err(Error::OutOfBounds { id, position });
        }

        if !self.root.move_entry(id, old, position) {
            bevy::log::warn!("{id} was not found at its recorded radar position, rescanning");
            self.root.remove_scan(id);
            self.root.insert(RadarEntry { id, position });
        }
        self.positions.insert(id, position);
        Ok(())
    }

    /// Stops tracking `id`, returning whether it was tracked.
    pub fn remove(&mut self, id: AircraftId) -> bool {
        let Some(old) = self.positions.remove(&id) else { return false };
        if self.root.remove_at(id, old).is_none() && self.root.remove_scan(id).is_none() {
            bevy::log::warn!("{id} was indexed but missing from the radar tree");
        }
        true
    }

    /// All entries within `rect`, boundaries inclusive.
    #[must_use]
    pub fn query(&self, rect: &GeoRect) -> Vec<RadarEntry> {
        let mut output = Vec::new();
        self.root.query(rect, &mut output);
        output
    }

    /// Finds the nearest aircraft blocking `aircraft`.
    ///
    /// A candidate blocks if it is within the separation distance of `aircraft`,
    /// lies ahead of it, and either faces it or moves in the same direction.
    #[must_use]
    pub fn is_blocked_by(&self, aircraft: &TrafficRecord, arena: &Arena) -> Option<AircraftId> {
        let separation = aircraft.radius() * SEPARATION_PER_RADIUS;
        let area = GeoRect::around(aircraft.position, QUERY_BOX_SIZE);

        self.query(&area)
            .into_iter()
            .filter(|entry| entry.id != aircraft.id)
            .filter_map(|entry| {
                let candidate = arena.get(entry.id).ok()?;
                let distance = aircraft.position.distance(candidate.position);
                if distance > separation {
                    return None;
                }

                let bearing = aircraft.position.course_to(candidate.position);
                if !aircraft.heading.is_within(bearing, AHEAD_TOLERANCE_DEG) {
                    return None;
                }

                let faces = candidate
                    .heading
                    .is_within(candidate.position.course_to(aircraft.position), AHEAD_TOLERANCE_DEG);
                let leads = candidate.heading.is_within(aircraft.heading, AHEAD_TOLERANCE_DEG);
                (faces || leads).then_some((entry.id, distance.into_meters()))
            })
            .min_by_key(|&(_, distance)| OrderedFloat(distance))
            .map(|(id, _)| id)
    }

    /// Checks the structural invariants of the tree, panicking with a description on violation.
    #[cfg(test)]
    pub(crate) fn assert_invariants(&self) {
        let mut count = 0;
        self.root.for_each_leaf(&mut |leaf| {
            assert!(
                leaf.bucket.len() < SPLIT_THRESHOLD || leaf.depth == MAX_DEPTH,
                "leaf at depth {} holds {} entries",
                leaf.depth,
                leaf.bucket.len()
            );
            for entry in &leaf.bucket {
                assert!(leaf.bounds.contains(entry.position), "{entry:?} outside its leaf");
            }
        });
        fn count_entries(node: &QuadNode, count: &mut usize) {
            *count += node.bucket.len();
            for child in node.children.iter().flat_map(|children| children.iter()) {
                count_entries(child, count);
            }
        }
        count_entries(&self.root, &mut count);
        assert_eq!(count, self.positions.len(), "tree and index disagree");
    }

    #[cfg(test)]
    pub(crate) fn max_depth(&self) -> u8 {
        let mut depth = 0;
        self.root.for_each_leaf(&mut |leaf| depth = depth.max(leaf.depth));
        depth
    }
}
