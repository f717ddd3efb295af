//! Fixed-point time arithmetic
//!
//! Every offset and duration the engine handles is a whole number of minutes.
//! Callers speak hours (fractional allowed); conversion happens once, at
//! ingestion, so slack comparisons downstream are exact integer comparisons.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Sub};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum DurationError {
    #[error("Duration must be a finite number of hours, got {0}")]
    NotFinite(f64),

    #[error("Duration must not be negative, got {0}h")]
    Negative(f64),

    #[error("Duration must be at most {max}h, got {0}h", max = MAX_HOURS)]
    TooLarge(f64),
}

/// Largest duration accepted at ingestion (a little over a century)
pub const MAX_HOURS: f64 = 1_000_000.0;

/// A signed count of whole minutes
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Minutes(i64);

impl Minutes {
    pub const ZERO: Minutes = Minutes(0);

    pub const fn new(minutes: i64) -> Self {
        Self(minutes)
    }

    pub const fn from_hours_whole(hours: i64) -> Self {
        Self(hours * 60)
    }

    /// Converts a non-negative number of hours, rounding to the nearest minute
    pub fn from_hours(hours: f64) -> Result<Self, DurationError> {
        if !hours.is_finite() {
            return Err(DurationError::NotFinite(hours));
        }
        if hours < 0.0 {
            return Err(DurationError::Negative(hours));
        }
        if hours > MAX_HOURS {
            return Err(DurationError::TooLarge(hours));
        }
        Ok(Self((hours * 60.0).round() as i64))
    }

    /// Minutes from `from` to `to`, rounded towards negative infinity
    pub fn between(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self((to - from).num_seconds().div_euclid(60))
    }

    pub const fn get(self) -> i64 {
        self.0
    }

    pub fn as_hours(self) -> f64 {
        self.0 as f64 / 60.0
    }

    /// Scales by a ratio, rounding to the nearest minute
    pub fn scale(self, ratio: f64) -> Self {
        Self((self.0 as f64 * ratio).round() as i64)
    }
}

impl Add for Minutes {
    type Output = Minutes;

    fn add(self, rhs: Minutes) -> Minutes {
        Minutes(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Minutes {
    fn add_assign(&mut self, rhs: Minutes) {
        self.0 = self.0.saturating_add(rhs.0);
    }
}

impl Sub for Minutes {
    type Output = Minutes;

    fn sub(self, rhs: Minutes) -> Minutes {
        Minutes(self.0.saturating_sub(rhs.0))
    }
}

impl std::iter::Sum for Minutes {
    fn sum<I: Iterator<Item = Minutes>>(iter: I) -> Minutes {
        iter.fold(Minutes::ZERO, Add::add)
    }
}

impl fmt::Display for Minutes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let total = self.0.unsigned_abs();
        let (h, m) = (total / 60, total % 60);
        match (h, m) {
            (0, m) => write!(f, "{}{}m", sign, m),
            (h, 0) => write!(f, "{}{}h", sign, h),
            (h, m) => write!(f, "{}{}h{:02}m", sign, h, m),
        }
    }
}

/// Serde adapter for fields expressed in (fractional) hours on the wire
pub mod hours {
    use super::Minutes;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Minutes, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(value.as_hours())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Minutes, D::Error>
    where
        D: Deserializer<'de>,
    {
        let hours = f64::deserialize(deserializer)?;
        Minutes::from_hours(hours).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn hours_round_to_nearest_minute() {
        assert_eq!(Minutes::from_hours(1.5).unwrap(), Minutes::new(90));
        assert_eq!(Minutes::from_hours(0.0).unwrap(), Minutes::ZERO);
        assert_eq!(Minutes::from_hours(0.3333).unwrap(), Minutes::new(20));
    }

    #[test]
    fn invalid_hours_rejected() {
        assert_eq!(
            Minutes::from_hours(-1.0),
            Err(DurationError::Negative(-1.0))
        );
        assert!(matches!(
            Minutes::from_hours(f64::NAN),
            Err(DurationError::NotFinite(_))
        ));
        assert_eq!(
            Minutes::from_hours(1e17),
            Err(DurationError::TooLarge(1e17))
        );
        assert_eq!(
            Minutes::from_hours(MAX_HOURS).unwrap(),
            Minutes::new(60_000_000)
        );
    }

    #[test]
    fn arithmetic_saturates_instead_of_wrapping() {
        let huge = Minutes::new(i64::MAX - 1);
        assert_eq!(huge + Minutes::new(10), Minutes::new(i64::MAX));
        assert_eq!(Minutes::new(i64::MIN + 1) - Minutes::new(10), Minutes::new(i64::MIN));

        let mut total = huge;
        total += huge;
        assert_eq!(total, Minutes::new(i64::MAX));
    }

    #[test]
    fn between_floors_partial_minutes() {
        let from = Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2026, 5, 1, 14, 0, 30).unwrap();
        let earlier = Utc.with_ymd_and_hms(2026, 5, 1, 11, 59, 30).unwrap();

        assert_eq!(Minutes::between(from, later), Minutes::new(120));
        assert_eq!(Minutes::between(from, earlier), Minutes::new(-1));
    }

    #[test]
    fn display_formats() {
        assert_eq!(Minutes::new(45).to_string(), "45m");
        assert_eq!(Minutes::new(120).to_string(), "2h");
        assert_eq!(Minutes::new(150).to_string(), "2h30m");
        assert_eq!(Minutes::new(-90).to_string(), "-1h30m");
    }

    #[test]
    fn scale_rounds() {
        assert_eq!(Minutes::new(300).scale(0.1), Minutes::new(30));
        assert_eq!(Minutes::new(5).scale(0.5), Minutes::new(3));
    }

    #[test]
    fn serializes_as_integer_minutes() {
        assert_eq!(serde_json::to_string(&Minutes::new(90)).unwrap(), "90");
    }
}
