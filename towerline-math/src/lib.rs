#![allow(
    clippy::excessive_precision,
    clippy::unreadable_literal,
    reason = "we don't really want to read the geodetic constants in this file."
)]

mod units;
pub use units::*;

mod heading;
pub use heading::{Heading, normalize_periodic};

mod geodesy;
pub use geodesy::{GeoArc, GeoPos};

mod rect;
pub use rect::{GeoRect, Quadrant};

#[cfg(test)]
mod tests;
