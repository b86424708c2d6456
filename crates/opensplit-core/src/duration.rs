//! Signed nanosecond durations as they travel on the wire

use core::fmt;
use core::iter::Sum;
use core::ops::{Add, AddAssign, Sub};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Signed duration in nanoseconds
///
/// Zero doubles as "no record yet" for best times, personal best and world
/// record. Negative values are meaningful for deltas (ahead of best).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Nanos(i64);

impl Nanos {
    pub const ZERO: Nanos = Nanos(0);

    pub const fn new(nanos: i64) -> Self {
        Self(nanos)
    }

    pub const fn from_millis(millis: i64) -> Self {
        Self(millis.saturating_mul(1_000_000))
    }

    pub const fn as_nanos(self) -> i64 {
        self.0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Whether `self` should replace `best`: the best is unset, or `self` is strictly lower
    pub fn improves_on(self, best: Nanos) -> bool {
        best.is_zero() || self < best
    }

    /// Coerce a JSON number into nanoseconds; floats are rounded and saturate
    pub fn from_json_number(value: &serde_json::Value) -> Option<Self> {
        if let Some(n) = value.as_i64() {
            return Some(Self(n));
        }
        if let Some(n) = value.as_u64() {
            return Some(Self(i64::try_from(n).unwrap_or(i64::MAX)));
        }
        // `as` saturates at the i64 bounds and maps NaN to zero
        value.as_f64().map(|f| Self(f.round() as i64))
    }
}

impl From<Duration> for Nanos {
    fn from(duration: Duration) -> Self {
        Self(i64::try_from(duration.as_nanos()).unwrap_or(i64::MAX))
    }
}

impl Add for Nanos {
    type Output = Nanos;

    fn add(self, rhs: Nanos) -> Nanos {
        Nanos(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Nanos {
    fn add_assign(&mut self, rhs: Nanos) {
        *self = *self + rhs;
    }
}

impl Sub for Nanos {
    type Output = Nanos;

    fn sub(self, rhs: Nanos) -> Nanos {
        Nanos(self.0.saturating_sub(rhs.0))
    }
}

impl Sum for Nanos {
    fn sum<I: Iterator<Item = Nanos>>(iter: I) -> Nanos {
        iter.fold(Nanos::ZERO, Add::add)
    }
}

/// `m:ss.mmm`, with a leading `-` for negative values
impl fmt::Display for Nanos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let total_millis = self.0.unsigned_abs() / 1_000_000;
        let minutes = total_millis / 60_000;
        let seconds = (total_millis / 1000) % 60;
        let millis = total_millis % 1000;
        write!(f, "{sign}{minutes}:{seconds:02}.{millis:03}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_improves_on_treats_zero_as_unset() {
        assert!(Nanos::new(5).improves_on(Nanos::ZERO));
        assert!(Nanos::new(5).improves_on(Nanos::new(6)));
        assert!(!Nanos::new(6).improves_on(Nanos::new(6)));
        assert!(!Nanos::new(7).improves_on(Nanos::new(6)));
    }

    #[test]
    fn test_json_number_coercion() {
        assert_eq!(Nanos::from_json_number(&json!(42)), Some(Nanos::new(42)));
        assert_eq!(Nanos::from_json_number(&json!(-3)), Some(Nanos::new(-3)));
        assert_eq!(Nanos::from_json_number(&json!(1.6)), Some(Nanos::new(2)));
        assert_eq!(
            Nanos::from_json_number(&json!(u64::MAX)),
            Some(Nanos::new(i64::MAX))
        );
        assert_eq!(Nanos::from_json_number(&json!("12")), None);
        assert_eq!(Nanos::from_json_number(&json!(null)), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Nanos::from_millis(83_456).to_string(), "1:23.456");
        assert_eq!(Nanos::from_millis(-1_500).to_string(), "-0:01.500");
        assert_eq!(Nanos::ZERO.to_string(), "0:00.000");
    }

    #[test]
    fn test_serializes_as_plain_integer() {
        let encoded = serde_json::to_string(&Nanos::new(1_500_000_000)).unwrap();
        assert_eq!(encoded, "1500000000");
    }
}
