//! Read-only preferences snapshot consumed by the scheduling core.
//!
//! Built by [`Config::prefs`](crate::Config::prefs) in production and
//! constructed directly by tests. All durations are milliseconds.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::time_of_day::{ActiveWeekdays, TimeOfDay};

pub const ONE_MINUTE_MILLIS: u64 = 60 * 1000;
pub const ONE_HOUR_MILLIS: u64 = 60 * ONE_MINUTE_MILLIS;

/// Replaces any interval below [`MIN_INTERVAL_MILLIS`].
pub const FALLBACK_INTERVAL_MILLIS: u64 = ONE_HOUR_MILLIS;
pub const MIN_INTERVAL_MILLIS: u64 = ONE_MINUTE_MILLIS;

pub const DEFAULT_DAYTIME_START: TimeOfDay = TimeOfDay::hm(9, 0);
pub const DEFAULT_DAYTIME_END: TimeOfDay = TimeOfDay::hm(21, 0);

/// Snapshot of everything the core reads at decision time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prefs {
    /// Mean time between rings, at least one minute.
    pub interval_millis: u64,
    pub randomize: bool,
    /// Minutes past the hour to align rings on.
    pub normalize: Option<u8>,
    pub daytime_start: TimeOfDay,
    pub daytime_end: TimeOfDay,
    pub active_weekdays: ActiveWeekdays,
    /// Epoch millis until which the bell is manually muted.
    pub muted_till_millis: i64,
    pub mute_with_phone: bool,
    pub mute_off_hook: bool,
    pub mute_in_flight_mode: bool,
    /// Hand mute reasons to the notifier.
    pub show_mute_reason: bool,
    pub bell: BellPrefs,
    pub meditation: MeditationPrefs,
}

impl Prefs {
    /// Replace sub-minute intervals with the fallback.
    pub fn clamp_interval(interval_millis: u64) -> u64 {
        if interval_millis < MIN_INTERVAL_MILLIS {
            tracing::warn!(
                interval_millis,
                fallback = FALLBACK_INTERVAL_MILLIS,
                "ring interval below one minute, using fallback"
            );
            FALLBACK_INTERVAL_MILLIS
        } else {
            interval_millis
        }
    }

    /// Normalize offset in milliseconds, if normalizing.
    pub fn normalize_offset_millis(&self) -> Option<u64> {
        self.normalize.map(|v| v as u64 * ONE_MINUTE_MILLIS)
    }
}

impl Default for Prefs {
    fn default() -> Self {
        Self {
            interval_millis: FALLBACK_INTERVAL_MILLIS,
            randomize: true,
            normalize: None,
            daytime_start: DEFAULT_DAYTIME_START,
            daytime_end: DEFAULT_DAYTIME_END,
            active_weekdays: ActiveWeekdays::all(),
            muted_till_millis: 0,
            mute_with_phone: true,
            mute_off_hook: true,
            mute_in_flight_mode: false,
            show_mute_reason: true,
            bell: BellPrefs::default(),
            meditation: MeditationPrefs::default(),
        }
    }
}

/// How the bell sounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BellPrefs {
    pub sound: SoundRef,
    /// 0.0 ..= 1.0
    pub volume: f32,
    pub sound_enabled: bool,
    pub vibrate: bool,
    pub vibration_pattern: VibrationPattern,
}

impl Default for BellPrefs {
    fn default() -> Self {
        Self {
            sound: SoundRef::default(),
            volume: 0.5,
            sound_enabled: true,
            vibrate: false,
            vibration_pattern: VibrationPattern(vec![100, 200, 100, 600]),
        }
    }
}

/// Meditation session parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeditationPrefs {
    pub ramp_up_millis: u64,
    /// At least 1.
    pub number_of_periods: u32,
    pub meditation_duration_millis: u64,
}

impl MeditationPrefs {
    pub fn period_millis(&self) -> u64 {
        self.meditation_duration_millis / self.number_of_periods.max(1) as u64
    }
}

impl Default for MeditationPrefs {
    fn default() -> Self {
        Self {
            ramp_up_millis: 30 * 1000,
            number_of_periods: 1,
            meditation_duration_millis: 25 * ONE_MINUTE_MILLIS,
        }
    }
}

/// Opaque reference to a sound the playback provider understands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SoundRef(pub String);

impl Default for SoundRef {
    fn default() -> Self {
        SoundRef("bell10s".into())
    }
}

impl fmt::Display for SoundRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Alternating off/on vibration durations in milliseconds.
///
/// Persisted as `d1:d2:...:dn`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VibrationPattern(pub Vec<u64>);

impl VibrationPattern {
    pub fn total_millis(&self) -> u64 {
        self.0.iter().sum()
    }
}

impl fmt::Display for VibrationPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(u64::to_string).collect();
        f.write_str(&parts.join(":"))
    }
}

impl FromStr for VibrationPattern {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(VibrationPattern(Vec::new()));
        }
        s.split(':')
            .map(|part| {
                part.parse::<u64>()
                    .map_err(|_| format!("cannot parse '{part}' in vibration pattern '{s}'"))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(VibrationPattern)
    }
}

impl Serialize for VibrationPattern {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for VibrationPattern {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
