//! SRT timestamp handling.
//!
//! Subtitle cues and clip boundaries use millisecond precision. The canonical
//! wire format is SRT's `HH:MM:SS,mmm`; the parser also accepts `HH:MM:SS.mmm`
//! and plain `HH:MM:SS`, which LLMs tend to emit.

use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;
use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Timestamp parsing error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimestampError {
    #[error("timestamp cannot be empty")]
    Empty,

    #[error("invalid timestamp format '{0}', expected HH:MM:SS,mmm")]
    InvalidFormat(String),

    #[error("invalid {component} value in timestamp '{value}'")]
    InvalidValue { component: &'static str, value: String },
}

/// A subtitle timestamp with millisecond precision.
///
/// Ordered, copyable and cheap to compare; serializes as the SRT string form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SrtTime {
    millis: u64,
}

impl SrtTime {
    /// Construct from a total millisecond count.
    pub const fn from_millis(millis: u64) -> Self {
        Self { millis }
    }

    /// Construct from whole seconds.
    pub const fn from_secs(secs: u64) -> Self {
        Self { millis: secs * 1000 }
    }

    /// Total milliseconds since 00:00:00,000.
    pub const fn as_millis(&self) -> u64 {
        self.millis
    }

    /// Total seconds as a float.
    pub fn as_secs_f64(&self) -> f64 {
        self.millis as f64 / 1000.0
    }

    /// Convert to a std `Duration`.
    pub const fn as_duration(&self) -> Duration {
        Duration::from_millis(self.millis)
    }

    /// Saturating subtraction, returning the span between two timestamps.
    pub fn saturating_sub(&self, other: SrtTime) -> Duration {
        Duration::from_millis(self.millis.saturating_sub(other.millis))
    }
}

impl Add<Duration> for SrtTime {
    type Output = SrtTime;

    fn add(self, rhs: Duration) -> SrtTime {
        SrtTime::from_millis(self.millis + rhs.as_millis() as u64)
    }
}

impl Sub<Duration> for SrtTime {
    type Output = SrtTime;

    fn sub(self, rhs: Duration) -> SrtTime {
        SrtTime::from_millis(self.millis.saturating_sub(rhs.as_millis() as u64))
    }
}

impl fmt::Display for SrtTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total_secs = self.millis / 1000;
        let hours = total_secs / 3600;
        let minutes = (total_secs % 3600) / 60;
        let seconds = total_secs % 60;
        let millis = self.millis % 1000;
        write!(f, "{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
    }
}

impl FromStr for SrtTime {
    type Err = TimestampError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(TimestampError::Empty);
        }

        // Split off the millisecond part, accepting both ',' and '.'.
        let (clock, millis) = match s.rsplit_once([',', '.']) {
            Some((clock, frac)) => {
                let frac = frac.trim();
                // Fractions shorter than 3 digits are right-padded ("5" -> 500ms).
                let padded = format!("{:0<3}", frac);
                let millis: u64 = padded[..3].parse().map_err(|_| TimestampError::InvalidValue {
                    component: "milliseconds",
                    value: frac.to_string(),
                })?;
                (clock, millis)
            }
            None => (s, 0),
        };

        let parts: Vec<&str> = clock.split(':').collect();
        let (h, m, sec): (&str, &str, &str) = match parts.as_slice() {
            [h, m, sec] => (h, m, sec),
            [m, sec] => ("0", m, sec),
            // Bare seconds, as LLMs sometimes emit ("4.8").
            [sec] => ("0", "0", sec),
            _ => return Err(TimestampError::InvalidFormat(s.to_string())),
        };

        let hours: u64 = h.trim().parse().map_err(|_| TimestampError::InvalidValue {
            component: "hours",
            value: h.to_string(),
        })?;
        let minutes: u64 = m.trim().parse().map_err(|_| TimestampError::InvalidValue {
            component: "minutes",
            value: m.to_string(),
        })?;
        let seconds: u64 = sec.trim().parse().map_err(|_| TimestampError::InvalidValue {
            component: "seconds",
            value: sec.to_string(),
        })?;

        // Clock components stay in range; the bare-seconds form may exceed 60.
        if parts.len() > 1 && (minutes >= 60 || seconds >= 60) {
            return Err(TimestampError::InvalidFormat(s.to_string()));
        }

        Ok(SrtTime::from_millis(
            (hours * 3600 + minutes * 60 + seconds) * 1000 + millis,
        ))
    }
}

impl Serialize for SrtTime {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for SrtTime {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl JsonSchema for SrtTime {
    fn schema_name() -> String {
        "SrtTime".to_string()
    }

    fn json_schema(gen: &mut schemars::gen::SchemaGenerator) -> schemars::schema::Schema {
        String::json_schema(gen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_srt_format() {
        let t: SrtTime = "00:01:30,500".parse().unwrap();
        assert_eq!(t.as_millis(), 90_500);
    }

    #[test]
    fn test_parse_dot_separator() {
        let t: SrtTime = "00:01:30.500".parse().unwrap();
        assert_eq!(t.as_millis(), 90_500);
    }

    #[test]
    fn test_parse_without_millis() {
        let t: SrtTime = "01:00:00".parse().unwrap();
        assert_eq!(t.as_millis(), 3_600_000);
    }

    #[test]
    fn test_parse_mm_ss() {
        let t: SrtTime = "05:30".parse().unwrap();
        assert_eq!(t.as_millis(), 330_000);
    }

    #[test]
    fn test_parse_short_fraction_pads() {
        let t: SrtTime = "00:00:01,5".parse().unwrap();
        assert_eq!(t.as_millis(), 1_500);
    }

    #[test]
    fn test_parse_bare_seconds() {
        let t: SrtTime = "4.8".parse().unwrap();
        assert_eq!(t.as_millis(), 4_800);
        let t: SrtTime = "90".parse().unwrap();
        assert_eq!(t.as_millis(), 90_000);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!("".parse::<SrtTime>(), Err(TimestampError::Empty));
        assert!("1:2:3:4".parse::<SrtTime>().is_err());
        assert!("00:99:00".parse::<SrtTime>().is_err());
        assert!("abc".parse::<SrtTime>().is_err());
    }

    #[test]
    fn test_display_round_trip() {
        let t = SrtTime::from_millis(3_661_123);
        assert_eq!(t.to_string(), "01:01:01,123");
        assert_eq!(t.to_string().parse::<SrtTime>().unwrap(), t);
    }

    #[test]
    fn test_ordering_and_arithmetic() {
        let a = SrtTime::from_secs(5);
        let b = SrtTime::from_secs(10);
        assert!(a < b);
        assert_eq!(b.saturating_sub(a), Duration::from_secs(5));
        assert_eq!(a + Duration::from_secs(5), b);
        assert_eq!(a - Duration::from_secs(10), SrtTime::from_millis(0));
    }

    #[test]
    fn test_serde_round_trip() {
        let t = SrtTime::from_millis(5_000);
        let json = serde_json::to_string(&t).unwrap();
        assert_eq!(json, "\"00:00:05,000\"");
        let back: SrtTime = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);
    }
}
