//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Ring interval, randomize/normalize flags and the daytime window
//! - Mute preferences and the manual mute deadline
//! - Bell sound, volume and vibration
//! - Meditation ramp-up, period count and duration
//!
//! Configuration is stored at `~/.config/mindbell/config.toml`.
//! Durations keep the persisted `HH:MM` form: `schedule.interval` and
//! `meditation.meditation_duration` read as hours:minutes,
//! `meditation.ramp_up_time` as minutes:seconds.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::ConfigError;
use crate::prefs::{
    BellPrefs, MeditationPrefs, Prefs, SoundRef, VibrationPattern, DEFAULT_DAYTIME_END,
    DEFAULT_DAYTIME_START, ONE_MINUTE_MILLIS,
};
use crate::time_of_day::{ActiveWeekdays, TimeOfDay};

/// Value of `schedule.normalize` meaning "do not normalize".
pub const NORMALIZE_NONE: i32 = -1;

/// Ring schedule configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Mean interval as `HH:MM`.
    #[serde(default = "default_interval")]
    pub interval: TimeOfDay,
    #[serde(default = "default_true")]
    pub randomize: bool,
    /// Minutes past the hour (0..=59) or -1.
    #[serde(default = "default_normalize")]
    pub normalize: i32,
    #[serde(default = "default_daytime_start")]
    pub daytime_start: TimeOfDay,
    #[serde(default = "default_daytime_end")]
    pub daytime_end: TimeOfDay,
    #[serde(default)]
    pub active_weekdays: ActiveWeekdays,
}

/// Mute configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MuteConfig {
    #[serde(default = "default_true")]
    pub with_phone: bool,
    #[serde(default = "default_true")]
    pub off_hook: bool,
    #[serde(default)]
    pub in_flight_mode: bool,
    /// Epoch milliseconds; 0 when not muted.
    #[serde(default)]
    pub muted_till: i64,
    #[serde(default = "default_true")]
    pub show_reason: bool,
}

/// Bell configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BellConfig {
    #[serde(default = "default_sound")]
    pub sound: String,
    #[serde(default = "default_volume")]
    pub volume: f32,
    #[serde(default = "default_true")]
    pub sound_enabled: bool,
    #[serde(default)]
    pub vibrate: bool,
    #[serde(default = "default_vibration_pattern")]
    pub vibration_pattern: VibrationPattern,
}

/// Meditation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeditationConfig {
    /// `MM:SS`.
    #[serde(default = "default_ramp_up_time")]
    pub ramp_up_time: TimeOfDay,
    #[serde(default = "default_number_of_periods")]
    pub number_of_periods: u32,
    /// `HH:MM`.
    #[serde(default = "default_meditation_duration")]
    pub meditation_duration: TimeOfDay,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/mindbell/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_true")]
    pub use_24h_clock: bool,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub mute: MuteConfig,
    #[serde(default)]
    pub bell: BellConfig,
    #[serde(default)]
    pub meditation: MeditationConfig,
}

// Default functions
fn default_true() -> bool {
    true
}
fn default_interval() -> TimeOfDay {
    TimeOfDay::hm(1, 0)
}
fn default_normalize() -> i32 {
    NORMALIZE_NONE
}
fn default_daytime_start() -> TimeOfDay {
    DEFAULT_DAYTIME_START
}
fn default_daytime_end() -> TimeOfDay {
    DEFAULT_DAYTIME_END
}
fn default_sound() -> String {
    SoundRef::default().0
}
fn default_volume() -> f32 {
    0.5
}
fn default_vibration_pattern() -> VibrationPattern {
    BellPrefs::default().vibration_pattern
}
fn default_ramp_up_time() -> TimeOfDay {
    TimeOfDay::hm(0, 30)
}
fn default_number_of_periods() -> u32 {
    1
}
fn default_meditation_duration() -> TimeOfDay {
    TimeOfDay::hm(0, 25)
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            randomize: true,
            normalize: NORMALIZE_NONE,
            daytime_start: default_daytime_start(),
            daytime_end: default_daytime_end(),
            active_weekdays: ActiveWeekdays::all(),
        }
    }
}

impl Default for MuteConfig {
    fn default() -> Self {
        Self {
            with_phone: true,
            off_hook: true,
            in_flight_mode: false,
            muted_till: 0,
            show_reason: true,
        }
    }
}

impl Default for BellConfig {
    fn default() -> Self {
        Self {
            sound: default_sound(),
            volume: default_volume(),
            sound_enabled: true,
            vibrate: false,
            vibration_pattern: default_vibration_pattern(),
        }
    }
}

impl Default for MeditationConfig {
    fn default() -> Self {
        Self {
            ramp_up_time: default_ramp_up_time(),
            number_of_periods: default_number_of_periods(),
            meditation_duration: default_meditation_duration(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            use_24h_clock: true,
            schedule: ScheduleConfig::default(),
            mute: MuteConfig::default(),
            bell: BellConfig::default(),
            meditation: MeditationConfig::default(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<i64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<f64>() {
                            serde_json::Number::from_f64(n)
                                .map(serde_json::Value::Number)
                                .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?
                        } else {
                            return Err(invalid(format!("cannot parse '{value}' as number")));
                        }
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk or return default.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let load_failed = |message: String| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message,
        };
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| load_failed(e.to_string())),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            // Unreadable files are left untouched.
            Err(err) => Err(load_failed(err.to_string())),
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Update a value by key without persisting. The whole config is
    /// validated before the change is applied.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        let mut json = serde_json::to_value(&*self).map_err(|e| invalid(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| invalid(e.to_string()))?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Set a config value by key and save.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// the result does not validate, or the config cannot be saved.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.apply(key, value)?;
        self.save()
    }

    /// Mean interval in milliseconds, sub-minute values replaced by the fallback.
    pub fn interval_millis(&self) -> u64 {
        Prefs::clamp_interval(self.schedule.interval.interval() as u64 * ONE_MINUTE_MILLIS)
    }

    /// Refuse combinations the scheduler cannot honour.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &str, message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let normalize = self.schedule.normalize;
        if normalize != NORMALIZE_NONE {
            if !(0..=59).contains(&normalize) {
                return Err(invalid(
                    "schedule.normalize",
                    format!("{normalize} is neither -1 nor a minute 0..=59"),
                ));
            }
            let minutes = self.interval_millis() / ONE_MINUTE_MILLIS;
            if minutes > 60 || 60 % minutes != 0 {
                return Err(invalid(
                    "schedule.normalize",
                    format!("interval of {minutes} minutes does not divide an hour"),
                ));
            }
        }
        if self.schedule.active_weekdays.is_empty() {
            return Err(invalid(
                "schedule.active_weekdays",
                "at least one weekday must be active".into(),
            ));
        }
        if self.meditation.number_of_periods == 0 {
            return Err(invalid(
                "meditation.number_of_periods",
                "at least one period is required".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.bell.volume) {
            return Err(invalid(
                "bell.volume",
                format!("{} is outside 0.0..=1.0", self.bell.volume),
            ));
        }
        Ok(())
    }

    /// Read-only snapshot for the scheduling core.
    pub fn prefs(&self) -> Result<Prefs, ConfigError> {
        self.validate()?;
        let schedule = &self.schedule;
        Ok(Prefs {
            interval_millis: self.interval_millis(),
            randomize: schedule.randomize,
            normalize: (schedule.normalize != NORMALIZE_NONE).then_some(schedule.normalize as u8),
            daytime_start: schedule.daytime_start,
            daytime_end: schedule.daytime_end,
            active_weekdays: schedule.active_weekdays.clone(),
            muted_till_millis: self.mute.muted_till,
            mute_with_phone: self.mute.with_phone,
            mute_off_hook: self.mute.off_hook,
            mute_in_flight_mode: self.mute.in_flight_mode,
            show_mute_reason: self.mute.show_reason,
            bell: BellPrefs {
                sound: SoundRef(self.bell.sound.clone()),
                volume: self.bell.volume,
                sound_enabled: self.bell.sound_enabled,
                vibrate: self.bell.vibrate,
                vibration_pattern: self.bell.vibration_pattern.clone(),
            },
            meditation: MeditationPrefs {
                ramp_up_millis: self.meditation.ramp_up_time.interval() as u64 * 1000,
                number_of_periods: self.meditation.number_of_periods,
                meditation_duration_millis: self.meditation.meditation_duration.interval() as u64
                    * ONE_MINUTE_MILLIS,
            },
        })
    }
}
