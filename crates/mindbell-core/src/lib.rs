//! # Mindbell Core Library
//!
//! This library provides the core logic for the Mindbell mindfulness bell.
//! A bell rings at (optionally randomized) intervals during configured daytime
//! hours on active weekdays. A meditation mode rings a bell sequence instead.
//! The CLI binary drives everything through the same core library.
//!
//! ## Architecture
//!
//! - **Time of day**: Clock values with optional weekday, interval checks
//!   that wrap past midnight
//! - **Scheduler**: Pure next-ring computation from now, preferences and a
//!   time zone, with an injectable random source
//! - **Mute**: Ordered mute-reason evaluation
//! - **Meditation**: Ramp-up, period and end step machine
//! - **Ringing**: Playback seam, ringer and completion watchdog
//! - **Dispatch**: Reacts to alarm and user triggers, persists schedule state
//! - **Storage**: TOML configuration and JSON schedule record
//!
//! ## Key Components
//!
//! - [`TimeOfDay`]: Clock value with weekday
//! - [`Scheduler`]: Next target time computation
//! - [`Ringer`]: Rings the bell unless muted
//! - [`Dispatcher`]: Trigger state machine
//! - [`Config`]: Application configuration management

pub mod time_of_day;
pub mod prefs;
pub mod scheduler;
pub mod mute;
pub mod meditation;
pub mod ringing;
pub mod events;
pub mod dispatch;
pub mod storage;
pub mod error;

pub use time_of_day::{ActiveWeekdays, TimeOfDay};
pub use prefs::{BellPrefs, MeditationPrefs, Prefs, SoundRef, VibrationPattern};
pub use scheduler::{IntervalRandomizer, Scheduler};
pub use mute::{MuteReason, PhoneSignals, StaticSignals};
pub use meditation::{MeditationCue, MeditationStep, MeditationTransition};
pub use ringing::{PlaybackProvider, RingOutcome, Ringer, WatchOutcome, Watchdog};
pub use events::Event;
pub use dispatch::{AlarmPayload, AlarmScheduler, Dispatcher, PendingAlarm, Trigger};
pub use storage::{Config, FileStore, MemoryStore, ScheduleMode, ScheduleRecord, ScheduleStore};
pub use error::{ConfigError, CoreError, PlaybackError, ScheduleError, TimeOfDayError};
