//! Wall-clock time of day.
//!
//! A [`TimeOfDay`] is an immutable (hour, minute) pair with optional
//! second/millisecond and weekday parts. Values built from an absolute
//! timestamp carry all parts; values parsed from preferences only carry
//! hour and minute.
//!
//! Weekdays are numbered 1..=7 with 1 = Sunday.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, TimeZone, Timelike, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::TimeOfDayError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeOfDay {
    hour: u8,
    minute: u8,
    second: u8,
    millisecond: u16,
    weekday: Option<u8>,
}

impl TimeOfDay {
    pub fn new(hour: u32, minute: u32) -> Result<Self, TimeOfDayError> {
        if hour > 23 {
            return Err(TimeOfDayError::HourOutOfRange(hour));
        }
        if minute > 59 {
            return Err(TimeOfDayError::MinuteOutOfRange(minute));
        }
        Ok(Self {
            hour: hour as u8,
            minute: minute as u8,
            second: 0,
            millisecond: 0,
            weekday: None,
        })
    }

    /// In-range constants only: out-of-range values fail compilation in a
    /// const item and panic otherwise. Use [`TimeOfDay::new`] for input.
    pub(crate) const fn hm(hour: u8, minute: u8) -> Self {
        assert!(hour < 24 && minute < 60);
        Self {
            hour,
            minute,
            second: 0,
            millisecond: 0,
            weekday: None,
        }
    }

    pub fn with_weekday(hour: u32, minute: u32, weekday: u8) -> Result<Self, TimeOfDayError> {
        if !(1..=7).contains(&weekday) {
            return Err(TimeOfDayError::WeekdayOutOfRange(weekday));
        }
        Ok(Self {
            weekday: Some(weekday),
            ..Self::new(hour, minute)?
        })
    }

    /// Resolve a local date-time into its time-of-day parts, weekday included.
    pub fn from_datetime<Tz: TimeZone>(dt: &DateTime<Tz>) -> Self {
        Self {
            hour: dt.hour() as u8,
            minute: dt.minute() as u8,
            second: dt.second() as u8,
            // Leap seconds report nanos >= 1e9.
            millisecond: (dt.timestamp_subsec_millis().min(999)) as u16,
            weekday: Some(weekday_number(dt.weekday())),
        }
    }

    /// Resolve epoch milliseconds in the given zone. `None` only for
    /// timestamps outside chrono's representable range.
    pub fn from_millis<Tz: TimeZone>(millis: i64, tz: &Tz) -> Option<Self> {
        tz.timestamp_millis_opt(millis)
            .single()
            .map(|dt| Self::from_datetime(&dt))
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn hour(&self) -> u32 {
        self.hour as u32
    }

    pub fn minute(&self) -> u32 {
        self.minute as u32
    }

    pub fn second(&self) -> u32 {
        self.second as u32
    }

    pub fn millisecond(&self) -> u32 {
        self.millisecond as u32
    }

    pub fn weekday(&self) -> Option<u8> {
        self.weekday
    }

    /// True iff (hour, minute) sorts strictly before `other`. Weekday is ignored.
    pub fn is_before(&self, other: &TimeOfDay) -> bool {
        (self.hour, self.minute) < (other.hour, other.minute)
    }

    pub fn is_same_time(&self, other: &TimeOfDay) -> bool {
        self.hour == other.hour && self.minute == other.minute
    }

    /// Containment in `[start, end)`.
    ///
    /// When `start` is not before `end` the interval spans midnight, so
    /// `start == end` covers the whole day.
    pub fn is_in_interval(&self, start: &TimeOfDay, end: &TimeOfDay) -> bool {
        if start.is_same_time(self) {
            return true;
        }
        if start.is_before(end) {
            start.is_before(self) && self.is_before(end)
        } else {
            start.is_before(self) || self.is_before(end)
        }
    }

    pub fn is_active_on_day(&self, active: &ActiveWeekdays) -> Result<bool, TimeOfDayError> {
        let weekday = self.weekday.ok_or(TimeOfDayError::WeekdayUnset)?;
        Ok(active.contains(weekday))
    }

    /// `hour * 60 + minute`. Read as minutes for `HH:MM` values and as
    /// seconds for `MM:SS` values.
    pub fn interval(&self) -> u32 {
        self.hour as u32 * 60 + self.minute as u32
    }

    // ── Conversions ──────────────────────────────────────────────────

    /// Persisted form: zero-padded `HH:MM`.
    pub fn persist_string(&self) -> String {
        format!("{:02}:{:02}", self.hour, self.minute)
    }

    pub fn display_string(&self, use_24h_clock: bool) -> String {
        if use_24h_clock {
            return self.persist_string();
        }
        let suffix = if self.hour < 12 { "AM" } else { "PM" };
        let hour12 = match self.hour % 12 {
            0 => 12,
            h => h,
        };
        format!("{}:{:02} {}", hour12, self.minute, suffix)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.persist_string())
    }
}

impl FromStr for TimeOfDay {
    type Err = TimeOfDayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unparseable = || TimeOfDayError::Unparseable(s.to_string());
        let (hh, mm) = s.split_once(':').ok_or_else(unparseable)?;
        if hh.len() != 2 || mm.len() != 2 {
            return Err(unparseable());
        }
        let hour = hh.parse::<u32>().map_err(|_| unparseable())?;
        let minute = mm.parse::<u32>().map_err(|_| unparseable())?;
        Self::new(hour, minute)
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.persist_string())
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// 1 = Sunday .. 7 = Saturday.
pub fn weekday_number(weekday: Weekday) -> u8 {
    weekday.num_days_from_sunday() as u8 + 1
}

/// Set of weekdays (1..=7) on which the bell may ring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct ActiveWeekdays(BTreeSet<u8>);

impl ActiveWeekdays {
    pub fn new<I: IntoIterator<Item = u8>>(days: I) -> Result<Self, TimeOfDayError> {
        let mut set = BTreeSet::new();
        for day in days {
            if !(1..=7).contains(&day) {
                return Err(TimeOfDayError::WeekdayOutOfRange(day));
            }
            set.insert(day);
        }
        Ok(Self(set))
    }

    pub fn all() -> Self {
        Self((1..=7).collect())
    }

    /// Monday through Friday.
    pub fn workdays() -> Self {
        Self((2..=6).collect())
    }

    pub fn contains(&self, weekday: u8) -> bool {
        self.0.contains(&weekday)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        self.0.iter().copied()
    }
}

impl Default for ActiveWeekdays {
    fn default() -> Self {
        Self::all()
    }
}

impl TryFrom<Vec<u8>> for ActiveWeekdays {
    type Error = TimeOfDayError;

    fn try_from(days: Vec<u8>) -> Result<Self, Self::Error> {
        Self::new(days)
    }
}

impl From<ActiveWeekdays> for Vec<u8> {
    fn from(days: ActiveWeekdays) -> Self {
        days.0.into_iter().collect()
    }
}
