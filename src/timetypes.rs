// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use crate::formats::common::clock_timestamp;

use combine::combinator::{eof, parser as p};
use combine::primitives::Parser;

use std::fmt::{Display, Formatter, Result as FmtResult};

/// Largest representable time: 10^12 seconds. Later times clamp to this value.
pub const MAX_MSECS: i64 = 1_000_000_000_000_000;

/// `MAX_MSECS` in seconds.
pub const MAX_SECS: f64 = 1_000_000_000_000.0;

/// A non-negative point in time with millisecond resolution.
///
/// Every timestamp that leaves this crate (cue display strings, the scratch
/// `.srt` handed to the encoder) is produced by formatting a `TimePoint`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimePoint {
    /// number of milliseconds
    msecs: i64,
}

impl TimePoint {
    /// Create a time point from all time components.
    ///
    /// The components may exceed their natural limits, `from_components(0, 0, 61, 0)` is the
    /// same as `from_components(0, 1, 1, 0)`.
    pub fn from_components(hours: i64, mins: i64, secs: i64, ms: i64) -> TimePoint {
        let total_mins = hours.saturating_mul(60).saturating_add(mins);
        let total_secs = total_mins.saturating_mul(60).saturating_add(secs);
        Self::from_msecs(total_secs.saturating_mul(1000).saturating_add(ms))
    }

    /// Create a time point from a number of milliseconds, clamped to `0..=MAX_MSECS`.
    pub fn from_msecs(ms: i64) -> TimePoint {
        TimePoint {
            msecs: ms.max(0).min(MAX_MSECS),
        }
    }

    /// Create a time point from real-valued seconds, rounded to the nearest millisecond.
    ///
    /// Negative, `NaN` and infinite inputs clamp to zero, times past `MAX_SECS` to `MAX_MSECS`.
    pub fn from_secs_f64(secs: f64) -> TimePoint {
        TimePoint::from_msecs((clamp_secs(secs) * 1000.0).round() as i64)
    }

    /// Get the total number of milliseconds.
    pub fn msecs(&self) -> i64 {
        self.msecs
    }

    /// Get the total number of seconds as a real number.
    pub fn secs_f64(&self) -> f64 {
        self.msecs as f64 / 1000.0
    }

    /// Get the total number of hours (unbounded, not wrapped at 24).
    pub fn hours(&self) -> i64 {
        self.msecs / (60 * 60 * 1000)
    }

    /// Get the minute component in a range of [0, 59].
    pub fn mins_comp(&self) -> i64 {
        (self.msecs / (60 * 1000)) % 60
    }

    /// Get the seconds component in a range of [0, 59].
    pub fn secs_comp(&self) -> i64 {
        (self.msecs / 1000) % 60
    }

    /// Get the milliseconds component in a range of [0, 999].
    pub fn msecs_comp(&self) -> i64 {
        self.msecs % 1000
    }
}

impl Display for TimePoint {
    /// Writes the canonical `HH:MM:SS,mmm` form.
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(f, "{:02}:{:02}:{:02},{:03}", self.hours(), self.mins_comp(), self.secs_comp(), self.msecs_comp())
    }
}

/// Restricts seconds to the representable range `0.0..=MAX_SECS`.
///
/// `NaN` and infinities become zero, like negative values.
pub fn clamp_secs(secs: f64) -> f64 {
    if !secs.is_finite() || secs <= 0.0 {
        0.0
    } else {
        secs.min(MAX_SECS)
    }
}

/// Formats seconds as a canonical `HH:MM:SS,mmm` timestamp.
///
/// Hours are not clamped to 24 and may use more than two digits.
pub fn seconds_to_timestamp(secs: f64) -> String {
    TimePoint::from_secs_f64(secs).to_string()
}

/// Parses a `H:MM:SS,mmm` (or `H:MM:SS.mmm`) timestamp into total seconds.
///
/// Returns `None` if the whole string is not a timestamp. Surrounding whitespace is ignored.
pub fn timestamp_to_seconds(s: &str) -> Option<f64> {
    (p(clock_timestamp), eof()).map(|t| t.0).parse(s.trim()).ok().map(|(secs, _)| secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timepoint_display() {
        assert_eq!(TimePoint::from_components(12, 59, 29, 450).to_string(), "12:59:29,450");
        assert_eq!(TimePoint::from_msecs(0).to_string(), "00:00:00,000");
        assert_eq!(TimePoint::from_components(0, 0, 61, 0).to_string(), "00:01:01,000");
    }

    #[test]
    fn hours_are_not_wrapped() {
        assert_eq!(seconds_to_timestamp(100.0 * 3600.0 + 1.5), "100:00:01,500");
    }

    #[test]
    fn seconds_field_never_reaches_sixty() {
        assert_eq!(seconds_to_timestamp(59.9996), "00:01:00,000");
        assert_eq!(seconds_to_timestamp(59.9994), "00:00:59,999");
    }

    #[test]
    fn degenerate_inputs_clamp_to_zero() {
        assert_eq!(seconds_to_timestamp(-3.0), "00:00:00,000");
        assert_eq!(seconds_to_timestamp(::std::f64::NAN), "00:00:00,000");
        assert_eq!(seconds_to_timestamp(::std::f64::INFINITY), "00:00:00,000");
    }

    #[test]
    fn huge_times_saturate_consistently() {
        assert_eq!(clamp_secs(3.0e18), MAX_SECS);
        assert_eq!(TimePoint::from_secs_f64(3.0e18).msecs(), MAX_MSECS);
        assert_eq!(TimePoint::from_components(300_000_000_000_000, 0, 0, 0).msecs(), MAX_MSECS);
        assert_eq!(seconds_to_timestamp(MAX_SECS), "277777777:46:40,000");
        assert_eq!(timestamp_to_seconds("277777777:46:40,000"), Some(MAX_SECS));
    }

    #[test]
    fn parses_both_fraction_separators() {
        assert_eq!(timestamp_to_seconds("00:00:01,500"), Some(1.5));
        assert_eq!(timestamp_to_seconds("00:00:01.500"), Some(1.5));
        assert_eq!(timestamp_to_seconds("1:02:03,004"), Some(3723.004));
        // the fraction is a decimal fraction, not a millisecond count
        assert_eq!(timestamp_to_seconds("00:00:01,5"), Some(1.5));
    }

    #[test]
    fn rejects_malformed_timestamps() {
        assert_eq!(timestamp_to_seconds(""), None);
        assert_eq!(timestamp_to_seconds("00:01,000"), None);
        assert_eq!(timestamp_to_seconds("00:00:01"), None);
        assert_eq!(timestamp_to_seconds("00:00:01,000 trailing"), None);
        assert_eq!(timestamp_to_seconds("aa:00:01,000"), None);
    }

    #[test]
    fn round_trip_within_tolerance() {
        let mut s = 0.0;
        while s < 200_000.0 {
            let back = timestamp_to_seconds(&seconds_to_timestamp(s)).unwrap();
            assert!((back - s).abs() <= 0.0005 + 1e-9, "{} came back as {}", s, back);
            s = s * 1.37 + 0.0173;
        }
    }
}
