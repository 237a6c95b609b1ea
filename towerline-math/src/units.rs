use std::marker::PhantomData;
use std::time::Duration;
use std::{cmp, fmt, iter, ops};

/// Converts nautical miles to meters.
pub const METERS_PER_NM: f64 = 1852.;
/// Converts meters to feet.
pub const FEET_PER_METER: f64 = 3.28084;
/// Converts hours to seconds.
const SECONDS_PER_HOUR_F64: f64 = 3600.;
/// Converts minutes to seconds.
pub const SECONDS_PER_MINUTE: i64 = 60;
/// Converts hours to seconds.
pub const SECONDS_PER_HOUR: i64 = 3600;
/// Converts days to seconds.
pub const SECONDS_PER_DAY: i64 = 86400;

pub struct Quantity<T, Base, Dt>(pub T, pub PhantomData<(Base, Dt)>);

impl<T, Base, Dt> Quantity<T, Base, Dt> {
    pub const fn new(value: T) -> Self { Self(value, PhantomData) }

    pub fn into_raw(self) -> T { self.0 }
}

/// Used as `Dt` in `Quantity` to indicate that the unit is not a rate of change.
pub struct DtZero;
/// Used as `Dt` in `Quantity` to indicate that the unit is the rate of change of `Quantity<Dt=Dt>`.
pub struct Ddt<Dt>(Dt);

pub type DtOne = Ddt<DtZero>;

pub struct LengthBase;

/// A distance quantity. Internal representation is in meters.
pub type Length<T> = Quantity<T, LengthBase, DtZero>;

/// A linear speed (rate of [length](Length) change) quantity.
/// Internal representation is in meters per second.
pub type Speed<T> = Quantity<T, LengthBase, DtOne>;

impl<T: Default, Base, Dt> Default for Quantity<T, Base, Dt> {
    fn default() -> Self { Self(T::default(), PhantomData) }
}

impl<T: Clone, Base, Dt> Clone for Quantity<T, Base, Dt> {
    fn clone(&self) -> Self { Self(self.0.clone(), PhantomData) }
}

impl<T: Copy, Base, Dt> Copy for Quantity<T, Base, Dt> {}

impl<T: PartialEq, Base, Dt> PartialEq for Quantity<T, Base, Dt> {
    fn eq(&self, other: &Self) -> bool { self.0 == other.0 }
}

impl<T: PartialOrd, Base, Dt> PartialOrd for Quantity<T, Base, Dt> {
    fn partial_cmp(&self, other: &Self) -> Option<cmp::Ordering> { self.0.partial_cmp(&other.0) }
}

impl<T: ops::Add<Output = T>, Base, Dt> ops::Add for Quantity<T, Base, Dt> {
    type Output = Self;

    fn add(self, other: Self) -> Self { Self(self.0 + other.0, PhantomData) }
}

impl<T: ops::AddAssign, Base, Dt> ops::AddAssign for Quantity<T, Base, Dt> {
    fn add_assign(&mut self, other: Self) { self.0 += other.0; }
}

impl<T: ops::Sub<Output = T>, Base, Dt> ops::Sub for Quantity<T, Base, Dt> {
    type Output = Self;

    fn sub(self, other: Self) -> Self { Self(self.0 - other.0, PhantomData) }
}

impl<T: ops::Mul<f64, Output = T>, Base, Dt> ops::Mul<f64> for Quantity<T, Base, Dt> {
    type Output = Self;

    fn mul(self, other: f64) -> Self { Self(self.0 * other, PhantomData) }
}

impl<T: ops::Div<f64, Output = T>, Base, Dt> ops::Div<f64> for Quantity<T, Base, Dt> {
    type Output = Self;

    fn div(self, other: f64) -> Self { Self(self.0 / other, PhantomData) }
}

impl<T: ops::Div, Base, Dt> ops::Div for Quantity<T, Base, Dt> {
    type Output = T::Output;

    fn div(self, other: Self) -> Self::Output { self.0 / other.0 }
}

impl<T: ops::Neg<Output = T>, Base, Dt> ops::Neg for Quantity<T, Base, Dt> {
    type Output = Self;

    fn neg(self) -> Self { Self(-self.0, PhantomData) }
}

impl<T: Default + ops::Add<Output = T>, Base, Dt> iter::Sum for Quantity<T, Base, Dt> {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), |sum, value| sum + value)
    }
}

/// B / (B/T) = T
impl<Base, Dt> Quantity<f64, Base, Dt> {
    /// Time needed to cover `self` at `rate`.
    ///
    /// Returns `None` if the rate is not positive.
    #[must_use]
    pub fn try_div(self, rate: Quantity<f64, Base, Ddt<Dt>>) -> Option<Duration> {
        if rate.0 <= 0. {
            return None;
        }
        Duration::try_from_secs_f64(self.0 / rate.0).ok()
    }
}

impl<Base, Dt> Quantity<f64, Base, Dt> {
    pub const ZERO: Self = Self(0., PhantomData);

    #[must_use]
    pub fn is_positive(self) -> bool { self.0 > 0. }

    #[must_use]
    pub fn abs(self) -> Self { Self(self.0.abs(), PhantomData) }

    #[must_use]
    pub fn min(self, other: Self) -> Self { Self(self.0.min(other.0), PhantomData) }

    #[must_use]
    pub fn max(self, other: Self) -> Self { Self(self.0.max(other.0), PhantomData) }
}

impl Length<f64> {
    #[must_use]
    pub const fn from_meters(meters: f64) -> Self { Self(meters, PhantomData) }

    #[must_use]
    pub const fn into_meters(self) -> f64 { self.0 }

    #[must_use]
    pub const fn from_feet(feet: f64) -> Self { Self(feet / FEET_PER_METER, PhantomData) }

    #[must_use]
    pub const fn into_feet(self) -> f64 { self.0 * FEET_PER_METER }

    #[must_use]
    pub const fn from_nm(nm: f64) -> Self { Self(nm * METERS_PER_NM, PhantomData) }

    #[must_use]
    pub const fn into_nm(self) -> f64 { self.0 / METERS_PER_NM }
}

impl Speed<f64> {
    #[must_use]
    pub const fn from_meter_per_sec(mps: f64) -> Self { Self(mps, PhantomData) }

    #[must_use]
    pub const fn into_meter_per_sec(self) -> f64 { self.0 }

    #[must_use]
    pub const fn from_knots(knots: f64) -> Self {
        Self(knots * METERS_PER_NM / SECONDS_PER_HOUR_F64, PhantomData)
    }

    #[must_use]
    pub const fn into_knots(self) -> f64 { self.0 * SECONDS_PER_HOUR_F64 / METERS_PER_NM }

    /// Vertical speed in feet per minute.
    #[must_use]
    pub const fn from_fpm(fpm: f64) -> Self { Self(fpm / FEET_PER_METER / 60., PhantomData) }
}

impl fmt::Debug for Length<f64> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Length")
            .field("meters", &self.into_meters())
            .field("feet", &self.into_feet())
            .finish()
    }
}

impl fmt::Debug for Speed<f64> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Speed").field("knots", &self.into_knots()).finish()
    }
}

impl<T: serde::Serialize, Base, Dt> serde::Serialize for Quantity<T, Base, Dt> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de, Base, Dt> serde::Deserialize<'de> for Quantity<f64, Base, Dt> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::de::Deserializer<'de>,
    {
        let value = f64::deserialize(deserializer)?;

        if !value.is_finite() {
            return Err(<D::Error as serde::de::Error>::custom("non-finite quantity"));
        }

        Ok(Self(value, PhantomData))
    }
}
