//! Core error types for mindbell-core.
//!
//! Each concern gets its own thiserror enum; [`CoreError`] aggregates them
//! for callers that do not care which layer failed.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for mindbell-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Time-of-day construction or parsing errors
    #[error("Time of day error: {0}")]
    TimeOfDay(#[from] TimeOfDayError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Scheduling errors
    #[error("Schedule error: {0}")]
    Schedule(#[from] ScheduleError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Rejections raised while building a [`TimeOfDay`](crate::TimeOfDay).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimeOfDayError {
    #[error("hour {0} out of range 0..=23")]
    HourOutOfRange(u32),

    #[error("minute {0} out of range 0..=59")]
    MinuteOutOfRange(u32),

    #[error("weekday {0} out of range 1..=7")]
    WeekdayOutOfRange(u8),

    /// Weekday-dependent query on a value built without one
    #[error("time of day carries no weekday")]
    WeekdayUnset,

    /// Input was not a zero-padded `HH:MM` string
    #[error("cannot parse '{0}' as HH:MM")]
    Unparseable(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Key does not exist in the configuration tree
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Home directory could not be resolved or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

/// Errors raised while computing a ring instant.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    /// The next-daytime-start scan would never terminate.
    #[error("no active weekday configured")]
    NoActiveWeekdays,

    /// A calendar candidate does not exist in the configured time zone.
    #[error("local time {0} cannot be resolved in the configured time zone")]
    UnresolvableLocalTime(String),
}

/// Playback backend failures. Never escapes the ringer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    #[error("sound '{0}' could not be started: {1}")]
    StartFailed(String, String),
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
