use crate::GeoPos;

/// An axis-aligned rectangle in latitude/longitude degrees.
///
/// Degrees are used directly as rectangle coordinates.
/// The distortion is negligible at airport scale.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GeoRect {
    /// South-west corner.
    pub min: GeoPos,
    /// North-east corner.
    pub max: GeoPos,
}

impl GeoRect {
    #[must_use]
    pub const fn new(min: GeoPos, max: GeoPos) -> Self { Self { min, max } }

    /// A square of `half_size` degrees around `center`.
    #[must_use]
    pub fn around(center: GeoPos, half_size: f64) -> Self {
        Self {
            min: GeoPos::new(center.lat - half_size, center.lon - half_size),
            max: GeoPos::new(center.lat + half_size, center.lon + half_size),
        }
    }

    /// The smallest rectangle containing all `points`, padded by `margin` degrees.
    ///
    /// Returns `None` if `points` is empty.
    pub fn enclosing(points: impl IntoIterator<Item = GeoPos>, margin: f64) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut rect = Self { min: first, max: first };
        for point in iter {
            rect.min.lat = rect.min.lat.min(point.lat);
            rect.min.lon = rect.min.lon.min(point.lon);
            rect.max.lat = rect.max.lat.max(point.lat);
            rect.max.lon = rect.max.lon.max(point.lon);
        }
        rect.min.lat -= margin;
        rect.min.lon -= margin;
        rect.max.lat += margin;
        rect.max.lon += margin;
        Some(rect)
    }

    #[must_use]
    pub fn center(&self) -> GeoPos {
        GeoPos::new(self.min.lat.midpoint(self.max.lat), self.min.lon.midpoint(self.max.lon))
    }

    /// Checks whether `point` is inside the rectangle, boundaries inclusive.
    #[must_use]
    pub fn contains(&self, point: GeoPos) -> bool {
        point.lat >= self.min.lat
            && point.lat <= self.max.lat
            && point.lon >= self.min.lon
            && point.lon <= self.max.lon
    }

    /// Checks whether the two rectangles share any point, boundaries inclusive.
    #[must_use]
    pub fn overlaps(&self, other: &GeoRect) -> bool {
        self.min.lat <= other.max.lat
            && other.min.lat <= self.max.lat
            && self.min.lon <= other.max.lon
            && other.min.lon <= self.max.lon
    }

    /// The quadrant of `self` strictly containing `point`.
    ///
    /// Returns `None` if `point` lies on either center line.
    /// The caller is responsible for checking [`contains`](Self::contains).
    #[must_use]
    pub fn quadrant_of(&self, point: GeoPos) -> Option<Quadrant> {
        let center = self.center();
        if point.lat == center.lat || point.lon == center.lon {
            return None;
        }
        Some(match (point.lat > center.lat, point.lon > center.lon) {
            (false, false) => Quadrant::SouthWest,
            (false, true) => Quadrant::SouthEast,
            (true, false) => Quadrant::NorthWest,
            (true, true) => Quadrant::NorthEast,
        })
    }

    /// The sub-rectangle covering `quadrant`.
    #[must_use]
    pub fn quadrant(&self, quadrant: Quadrant) -> GeoRect {
        let center = self.center();
        match quadrant {
            Quadrant::SouthWest => GeoRect::new(self.min, center),
            Quadrant::SouthEast => GeoRect::new(
                GeoPos::new(self.min.lat, center.lon),
                GeoPos::new(center.lat, self.max.lon),
            ),
            Quadrant::NorthWest => GeoRect::new(
                GeoPos::new(center.lat, self.min.lon),
                GeoPos::new(self.max.lat, center.lon),
            ),
            Quadrant::NorthEast => GeoRect::new(center, self.max),
        }
    }
}

/// One of the four sub-rectangles of a [`GeoRect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumIter)]
pub enum Quadrant {
    SouthWest,
    SouthEast,
    NorthWest,
    NorthEast,
}

impl Quadrant {
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Quadrant::SouthWest => 0,
            Quadrant::SouthEast => 1,
            Quadrant::NorthWest => 2,
            Quadrant::NorthEast => 3,
        }
    }
}
