use std::{fmt, ops};

/// An absolute directional bearing in degrees.
#[derive(Clone, Copy, PartialEq, PartialOrd, Default, serde::Serialize, serde::Deserialize)]
#[serde(from = "f64", into = "f64")]
pub struct Heading(
    f64, // always 0 <= heading < 360
);

impl Heading {
    /// Heading north.
    pub const NORTH: Self = Self(0.);
    /// Heading east.
    pub const EAST: Self = Self(90.);
    /// Heading south.
    pub const SOUTH: Self = Self(180.);
    /// Heading west.
    pub const WEST: Self = Self(270.);

    /// Creates a heading from an absolute bearing in degrees.
    #[must_use]
    pub fn from_degrees(degrees: f64) -> Self { Self(normalize_periodic(0., 360., degrees)) }

    /// Returns the heading in degrees in the range 0..360.
    #[must_use]
    pub fn degrees(self) -> f64 { self.0 }

    #[must_use]
    pub fn radians(self) -> f64 { self.0.to_radians() }

    /// Returns the heading rounded to the nearest whole degree in 0..360.
    #[must_use]
    pub fn rounded(self) -> i32 { (self.0.round() as i32).rem_euclid(360) }

    /// Returns the signed angle in degrees closest to zero such that
    /// adding it to `self` approximately returns `other`.
    ///
    /// The output is in the range `(-180, 180]`.
    #[must_use]
    pub fn closest_distance(self, other: Heading) -> f64 {
        let delta = normalize_periodic(-180., 180., other.0 - self.0);
        if delta <= -180. { delta + 360. } else { delta }
    }

    /// Checks whether `other` is strictly less than `tolerance` degrees away from `self`
    /// in either direction.
    #[must_use]
    pub fn is_within(self, other: Heading, tolerance: f64) -> bool {
        self.closest_distance(other).abs() < tolerance
    }

    /// Returns the opposite direction of this heading.
    #[must_use]
    pub fn opposite(self) -> Self { self + 180. }
}

/// Wraps `value` into the half-open range `[min, max)`.
#[must_use]
pub fn normalize_periodic(min: f64, max: f64, value: f64) -> f64 {
    let range = max - min;
    let offset = (value - min).rem_euclid(range);
    min + offset
}

impl fmt::Debug for Heading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Heading").field(&self.0).finish()
    }
}

impl fmt::Display for Heading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{:03}", self.rounded()) }
}

impl From<f64> for Heading {
    fn from(degrees: f64) -> Self { Self::from_degrees(degrees) }
}

impl From<Heading> for f64 {
    fn from(heading: Heading) -> Self { heading.0 }
}

/// Returns the shortest bearing change in degrees such that
/// adding the return value to `other` approximately yields `self`.
impl ops::Sub for Heading {
    type Output = f64;
    fn sub(self, other: Self) -> f64 { other.closest_distance(self) }
}

impl ops::Add<f64> for Heading {
    type Output = Self;
    /// Offsets `self` by `degrees` clockwise.
    fn add(self, degrees: f64) -> Self { Self::from_degrees(self.0 + degrees) }
}

impl ops::AddAssign<f64> for Heading {
    /// Offsets `self` by `degrees` clockwise.
    fn add_assign(&mut self, degrees: f64) { *self = *self + degrees; }
}

impl ops::Sub<f64> for Heading {
    type Output = Self;
    /// Offsets `self` by `degrees` counter-clockwise.
    fn sub(self, degrees: f64) -> Self { self + (-degrees) }
}
