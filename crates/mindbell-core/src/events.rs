use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::meditation::MeditationCue;
use crate::mute::MuteReason;
use crate::ringing::{RingOutcome, WatchOutcome};

/// Every scheduling decision produces an Event.
/// Hosts log them; the CLI prints them as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// Regular bell requested from the alarm scheduler.
    BellScheduled {
        fire_at: DateTime<Utc>,
        is_reschedule: bool,
        at: DateTime<Utc>,
    },
    /// Regular alarm fired; the host should ring now.
    BellDue { at: DateTime<Utc> },
    MeditationStarted { periods: u32, at: DateTime<Utc> },
    MeditationScheduled {
        fire_at: DateTime<Utc>,
        period: u32,
        at: DateTime<Utc>,
    },
    /// Meditation firing with a sound to play.
    MeditationCue {
        cue: MeditationCue,
        at: DateTime<Utc>,
    },
    MeditationEnded { at: DateTime<Utc> },
    /// Bell switched off; pending alarms are ignored when they fire.
    SchedulingStopped { at: DateTime<Utc> },
    /// Alarm whose payload no longer matches the persisted schedule.
    StaleAlarmIgnored {
        scheduled_for: DateTime<Utc>,
        at: DateTime<Utc>,
    },
    BellRang {
        outcome: RingOutcome,
        watchdog: Option<WatchOutcome>,
        at: DateTime<Utc>,
    },
    BellMuted { reason: MuteReason, at: DateTime<Utc> },
}

impl Event {
    /// True for events asking the host to ring.
    pub fn wants_ring(&self) -> bool {
        matches!(self, Event::BellDue { .. } | Event::MeditationCue { .. })
    }
}

/// Epoch millis as UTC, saturating to the epoch for out-of-range values.
pub fn utc_from_millis(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or_default()
}
