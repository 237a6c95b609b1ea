//! Geodesy on the WGS84 earth.
//!
//! All positions are geodetic latitude/longitude in degrees.
//! Surface distances and courses use the haversine metric of the `geo` crate,
//! which is accurate to well below a meter over the extent of an airport.
//! Cartesian vectors are earth-centered earth-fixed coordinates from `nav_types`.

use std::fmt;

use bevy_math::DVec3;
use geo::algorithm::haversine_closest_point::HaversineClosestPoint;
use geo::{Bearing, Closest, Destination, Distance, Haversine, Line, Point};
use nav_types::{ECEF, WGS84};

use crate::{Heading, Length};

/// A geodetic position.
#[derive(Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct GeoPos {
    /// Latitude in degrees, positive north.
    pub lat: f64,
    /// Longitude in degrees, positive east.
    pub lon: f64,
}

impl GeoPos {
    #[must_use]
    pub const fn new(lat: f64, lon: f64) -> Self { Self { lat, lon } }

    #[must_use]
    pub fn to_point(self) -> Point { Point::new(self.lon, self.lat) }

    #[must_use]
    pub fn from_point(point: Point) -> Self { Self { lat: point.y(), lon: point.x() } }

    /// Great-circle distance to `other`.
    #[must_use]
    pub fn distance(self, other: GeoPos) -> Length<f64> {
        Length::from_meters(Haversine.distance(self.to_point(), other.to_point()))
    }

    /// Initial great-circle course from `self` towards `other`.
    ///
    /// Returns [`Heading::NORTH`] if both positions coincide.
    #[must_use]
    pub fn course_to(self, other: GeoPos) -> Heading {
        if self == other {
            return Heading::NORTH;
        }
        Heading::from_degrees(Haversine.bearing(self.to_point(), other.to_point()))
    }

    /// The position reached by travelling `distance` along the great circle
    /// starting at `self` with initial course `course`.
    #[must_use]
    pub fn destination(self, course: Heading, distance: Length<f64>) -> GeoPos {
        let point = Haversine.destination(self.to_point(), course.degrees(), distance.into_meters());
        GeoPos { lat: point.y(), lon: normalize_lon(point.x()) }
    }

    /// Earth-centered earth-fixed position in meters, on the ellipsoid surface.
    #[must_use]
    pub fn to_cart(self) -> DVec3 {
        let ecef = ECEF::from(WGS84::from_degrees_and_meters(self.lat, self.lon, 0.));
        DVec3::new(ecef.x(), ecef.y(), ecef.z())
    }

    /// Inverse of [`to_cart`](Self::to_cart).
    ///
    /// The altitude of `cart` above the ellipsoid is dropped.
    #[must_use]
    pub fn from_cart(cart: DVec3) -> GeoPos {
        let wgs84: WGS84<f64> = ECEF::new(cart.x, cart.y, cart.z).into();
        GeoPos { lat: wgs84.latitude_degrees(), lon: wgs84.longitude_degrees() }
    }

    /// Squared straight-line distance through the earth in square meters.
    ///
    /// Cheaper than [`distance`](Self::distance) and ordered identically for short distances.
    #[must_use]
    pub fn cart_distance_squared(self, other: GeoPos) -> f64 {
        self.to_cart().distance_squared(other.to_cart())
    }

    /// Offsets the position by a local east/north displacement.
    #[must_use]
    pub fn offset(self, east: Length<f64>, north: Length<f64>) -> GeoPos {
        let (east, north) = (east.into_meters(), north.into_meters());
        let distance = east.hypot(north);
        if distance == 0. {
            return self;
        }
        self.destination(
            Heading::from_degrees(east.atan2(north).to_degrees()),
            Length::from_meters(distance),
        )
    }
}

impl fmt::Debug for GeoPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeoPos").field("lat", &self.lat).field("lon", &self.lon).finish()
    }
}

fn normalize_lon(lon: f64) -> f64 { crate::normalize_periodic(-180., 180., lon) }

/// A minor great-circle arc between two positions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoArc {
    pub start: GeoPos,
    pub end:   GeoPos,
}

impl GeoArc {
    #[must_use]
    pub const fn new(start: GeoPos, end: GeoPos) -> Self { Self { start, end } }

    #[must_use]
    pub fn length(&self) -> Length<f64> { self.start.distance(self.end) }

    #[must_use]
    pub fn course(&self) -> Heading { self.start.course_to(self.end) }

    /// Checks whether `point` lies within `tolerance` of the arc.
    #[must_use]
    pub fn contains(&self, point: GeoPos, tolerance: Length<f64>) -> bool {
        let line = Line::new(self.start.to_point(), self.end.to_point());
        match line.haversine_closest_point(&point.to_point()) {
            Closest::Intersection(_) => true,
            Closest::SinglePoint(closest) => {
                GeoPos::from_point(closest).distance(point) <= tolerance
            }
            Closest::Indeterminate => false,
        }
    }

    /// Intersection of the two great circles through `self` and `other`.
    ///
    /// Two antipodal intersections exist;
    /// the one closer to the midpoint of `self` is returned.
    /// Returns `None` if either arc is degenerate or both lie on the same great circle.
    #[must_use]
    pub fn circle_intersection(&self, other: &GeoArc) -> Option<GeoPos> {
        let (self_start, self_end) = (self.start.to_cart(), self.end.to_cart());
        let self_normal = self_start.cross(self_end);
        let other_normal = other.start.to_cart().cross(other.end.to_cart());
        let candidate = self_normal.cross(other_normal).try_normalize()?;

        let midpoint = (self_start + self_end) * 0.5;
        let chosen = if candidate.dot(midpoint) >= 0. { candidate } else { -candidate };
        Some(GeoPos::from_cart(chosen * midpoint.length()))
    }

    /// Intersection point of both arcs, if it lies on both of them.
    #[must_use]
    pub fn arc_intersection(&self, other: &GeoArc, tolerance: Length<f64>) -> Option<GeoPos> {
        let point = self.circle_intersection(other)?;
        (self.contains(point, tolerance) && other.contains(point, tolerance)).then_some(point)
    }
}
