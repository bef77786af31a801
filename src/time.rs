//! Millisecond durations with 10ms granularity
//!
//! [`Time`] is the value type used for every split, segment and delta of a
//! run. Values built from raw milliseconds are truncated to the hundredth of a
//! second so that clock jitter below that resolution never makes two times
//! compare unequal.
use crate::Error;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub};
use std::str::FromStr;
use strum::{Display, EnumIter, EnumString};

/// Number of digits displayed after the seconds
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, EnumIter, Display, EnumString,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Accuracy {
    /// "1:05"
    Second,
    /// "1:05.3", rounded to the nearest tenth
    Tenth,
    /// "1:05.27"
    #[default]
    Hundredth,
}

/// Signed duration in milliseconds, always a multiple of 10
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Time {
    milliseconds: i64,
}

impl Time {
    pub const ZERO: Time = Time { milliseconds: 0 };

    /// Time rounded down (toward zero) to the nearest 10ms
    pub const fn from_milliseconds(ms: i64) -> Time {
        Time {
            milliseconds: (ms / 10) * 10,
        }
    }

    pub fn from_seconds(seconds: f64) -> Time {
        Time::from_milliseconds((seconds * 1000.0).round() as i64)
    }

    /// Parses "[[H:]M:]S[.fraction]"
    pub fn from_timestamp(timestamp: &str) -> Result<Time, Error> {
        let invalid = || Error::InvalidTimestamp(timestamp.to_string());
        let groups: Vec<&str> = timestamp.trim().split(':').collect();
        if groups.len() > 3 {
            return Err(invalid());
        }
        let (seconds, units) = groups.split_last().ok_or_else(invalid)?;

        // hours then minutes, from the left
        let mut milliseconds: i64 = 0;
        for unit in units {
            if unit.is_empty() || !unit.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            let value: i64 = unit.parse().map_err(|_| invalid())?;
            milliseconds = milliseconds
                .checked_mul(60)
                .and_then(|m| m.checked_add(value))
                .ok_or_else(invalid)?;
        }
        milliseconds = milliseconds.checked_mul(60_000).ok_or_else(invalid)?;

        let valid_seconds = !seconds.is_empty()
            && seconds.bytes().any(|b| b.is_ascii_digit())
            && seconds.bytes().all(|b| b.is_ascii_digit() || b == b'.')
            && seconds.bytes().filter(|b| *b == b'.').count() <= 1;
        if !valid_seconds {
            return Err(invalid());
        }
        let seconds: f64 = seconds.parse().map_err(|_| invalid())?;
        let seconds = (seconds * 1000.0).round();
        if !seconds.is_finite() || seconds > i64::MAX as f64 {
            return Err(invalid());
        }
        milliseconds = milliseconds
            .checked_add(seconds as i64)
            .ok_or_else(invalid)?;

        Ok(Time::from_milliseconds(milliseconds))
    }

    /// `a - b`, an absent operand counting as zero
    pub fn delta(a: Option<Time>, b: Option<Time>) -> Time {
        let a = a.unwrap_or(Time::ZERO);
        let b = b.unwrap_or(Time::ZERO);
        Time::from_milliseconds(a.milliseconds - b.milliseconds)
    }

    pub fn milliseconds(&self) -> i64 {
        self.milliseconds
    }

    /// In-place accumulation, `None` adds nothing
    pub fn accumulate(&mut self, other: Option<Time>) {
        if let Some(other) = other {
            self.milliseconds += other.milliseconds;
        }
    }

    /// Compares against a possibly absent time. An absent time sorts after
    /// every defined time, so this returns `Less` for `None`.
    ///
    /// Note that [`Time::delta`] treats an absent time as zero instead.
    pub fn compare_opt(&self, other: Option<Time>) -> Ordering {
        match other {
            Some(other) => self.cmp(&other),
            None => Ordering::Less,
        }
    }

    pub fn is_positive(&self) -> bool {
        self.milliseconds > 0
    }

    pub fn is_negative(&self) -> bool {
        self.milliseconds < 0
    }

    /// Formats to "H:MM:SS.ff", leaving out hours and minutes when they are
    /// zero. When `signed`, non negative values get a '+' (time loss) and
    /// negative ones a '-' (time save).
    pub fn format(&self, signed: bool, accuracy: Accuracy) -> String {
        let total = self.milliseconds.abs();
        let mut hundredths = (total % 1000) / 10;
        let mut seconds = (total / 1000) % 60;
        let mut minutes = (total / 60_000) % 60;
        let mut hours = total / 3_600_000;

        if accuracy == Accuracy::Tenth {
            hundredths = (hundredths + 5) / 10 * 10;
            if hundredths == 100 {
                hundredths = 0;
                seconds += 1;
                if seconds == 60 {
                    seconds = 0;
                    minutes += 1;
                    if minutes == 60 {
                        minutes = 0;
                        hours += 1;
                    }
                }
            }
        }

        let sign = if self.milliseconds < 0 {
            "-"
        } else if signed {
            "+"
        } else {
            ""
        };
        let whole = if hours > 0 {
            format!("{hours}:{minutes:02}:{seconds:02}")
        } else if minutes > 0 {
            format!("{minutes}:{seconds:02}")
        } else {
            format!("{seconds}")
        };
        match accuracy {
            Accuracy::Second => format!("{sign}{whole}"),
            Accuracy::Tenth => format!("{sign}{whole}.{}", hundredths / 10),
            Accuracy::Hundredth => format!("{sign}{whole}.{hundredths:02}"),
        }
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format(false, Accuracy::Hundredth))
    }
}

impl FromStr for Time {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Time::from_timestamp(s)
    }
}

impl TryFrom<String> for Time {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Time::from_timestamp(&value)
    }
}

impl From<Time> for String {
    fn from(time: Time) -> Self {
        time.to_string()
    }
}

impl Add for Time {
    type Output = Time;

    fn add(self, rhs: Time) -> Time {
        Time {
            milliseconds: self.milliseconds + rhs.milliseconds,
        }
    }
}

impl AddAssign for Time {
    fn add_assign(&mut self, rhs: Time) {
        self.milliseconds += rhs.milliseconds;
    }
}

impl Sub for Time {
    type Output = Time;

    fn sub(self, rhs: Time) -> Time {
        Time {
            milliseconds: self.milliseconds - rhs.milliseconds,
        }
    }
}

impl Neg for Time {
    type Output = Time;

    fn neg(self) -> Time {
        Time {
            milliseconds: -self.milliseconds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construction_truncates_to_hundredths() {
        assert_eq!(Time::from_milliseconds(1239).milliseconds(), 1230);
        assert_eq!(Time::from_milliseconds(-1239).milliseconds(), -1230);
        assert_eq!(Time::from_milliseconds(9), Time::ZERO);
        assert_eq!(Time::from_seconds(1.2345).milliseconds(), 1230);
        assert_eq!(Time::from_seconds(0.0199).milliseconds(), 20);
    }

    #[test]
    fn parses_timestamps() {
        assert_eq!(Time::from_timestamp("5").unwrap().milliseconds(), 5000);
        assert_eq!(Time::from_timestamp("5.5").unwrap().milliseconds(), 5500);
        assert_eq!(Time::from_timestamp("1:05.27").unwrap().milliseconds(), 65_270);
        assert_eq!(
            Time::from_timestamp("1:02:03.45").unwrap().milliseconds(),
            3_723_450
        );
        assert_eq!(Time::from_timestamp("0:90").unwrap().milliseconds(), 90_000);
        assert_eq!("12.345".parse::<Time>().unwrap().milliseconds(), 12_340);
    }

    #[test]
    fn rejects_malformed_timestamps() {
        for bad in ["", "1:2:3:4", "abc", "1:x", "1::2", ":5", "1.2.3", "5s", "-5", "1e3"] {
            assert_eq!(
                Time::from_timestamp(bad),
                Err(Error::InvalidTimestamp(bad.to_string())),
                "{bad} should not parse"
            );
        }
    }

    #[test]
    fn formats_collapsing_leading_units() {
        let t = Time::from_milliseconds(3_723_450);
        assert_eq!(t.format(false, Accuracy::Hundredth), "1:02:03.45");
        assert_eq!(t.format(false, Accuracy::Second), "1:02:03");
        assert_eq!(Time::from_milliseconds(65_270).to_string(), "1:05.27");
        assert_eq!(Time::from_milliseconds(5_070).to_string(), "5.07");
        assert_eq!(Time::ZERO.to_string(), "0.00");
    }

    #[test]
    fn tenth_accuracy_rounds_and_cascades() {
        assert_eq!(
            Time::from_milliseconds(5_240).format(false, Accuracy::Tenth),
            "5.2"
        );
        assert_eq!(
            Time::from_milliseconds(5_250).format(false, Accuracy::Tenth),
            "5.3"
        );
        assert_eq!(
            Time::from_milliseconds(59_960).format(false, Accuracy::Tenth),
            "1:00.0"
        );
        assert_eq!(
            Time::from_milliseconds(3_599_990).format(false, Accuracy::Tenth),
            "1:00:00.0"
        );
        // seconds accuracy truncates
        assert_eq!(
            Time::from_milliseconds(59_960).format(false, Accuracy::Second),
            "59"
        );
    }

    #[test]
    fn signed_format() {
        assert_eq!(
            Time::from_milliseconds(2_500).format(true, Accuracy::Hundredth),
            "+2.50"
        );
        assert_eq!(
            Time::from_milliseconds(-62_500).format(true, Accuracy::Tenth),
            "-1:02.5"
        );
        assert_eq!(Time::ZERO.format(true, Accuracy::Second), "+0");
        assert_eq!(Time::from_milliseconds(-1_000).to_string(), "-1.00");
    }

    #[test]
    fn hundredth_format_parses_back() {
        for ms in [0, 10, 990, 1_000, 59_990, 60_000, 61_010, 3_599_990, 3_600_000, 86_399_990] {
            let t = Time::from_milliseconds(ms);
            let parsed = Time::from_timestamp(&t.format(false, Accuracy::Hundredth)).unwrap();
            assert_eq!(parsed, t, "{ms}");
        }
        // unaligned input only loses the truncated part
        let t = Time::from_milliseconds(12_345);
        assert_eq!(Time::from_timestamp(&t.to_string()).unwrap().milliseconds(), 12_340);
    }

    #[test]
    fn delta_treats_absent_as_zero() {
        let x = Time::from_milliseconds(1_500);
        assert_eq!(Time::delta(None, Some(x)).milliseconds(), -1_500);
        assert_eq!(Time::delta(Some(x), None), x);
        assert_eq!(Time::delta(None, None), Time::ZERO);
        assert_eq!(
            Time::delta(Some(Time::from_milliseconds(500)), Some(x)).milliseconds(),
            -1_000
        );
    }

    #[test]
    fn absent_comparand_sorts_greater() {
        let x = Time::from_milliseconds(1_500);
        assert_eq!(x.compare_opt(None), Ordering::Less);
        assert_eq!(Time::ZERO.compare_opt(None), Ordering::Less);
        assert_eq!(x.compare_opt(Some(Time::ZERO)), Ordering::Greater);
        assert_eq!(x.compare_opt(Some(x)), Ordering::Equal);
    }

    #[test]
    fn accumulates_in_place() {
        let mut t = Time::from_milliseconds(1_000);
        t.accumulate(Some(Time::from_milliseconds(250)));
        t.accumulate(None);
        assert_eq!(t.milliseconds(), 1_250);
        t += Time::from_milliseconds(-2_000);
        assert!(t.is_negative());
        assert_eq!((-t).milliseconds(), 750);
    }

    #[test]
    fn serializes_as_timestamp_string() {
        #[derive(Serialize, Deserialize)]
        struct Wrapper {
            time: Time,
        }
        let s = toml::to_string(&Wrapper {
            time: Time::from_milliseconds(65_270),
        })
        .unwrap();
        assert_eq!(s.trim(), "time = \"1:05.27\"");
        let w: Wrapper = toml::from_str(&s).unwrap();
        assert_eq!(w.time.milliseconds(), 65_270);
        assert!(toml::from_str::<Wrapper>("time = \"nope\"").is_err());
    }
}
