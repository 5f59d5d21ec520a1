//! Meditation session state machine.
//!
//! ## State Transitions
//!
//! ```text
//! RampUp (0) -> Period(1) -> ... -> Period(N) -> Ended (N+1)
//! ```
//!
//! The machine keeps no state between firings: each alarm carries the
//! index it was scheduled with, [`advance`] turns it into the cue to play
//! now and the next firing to request.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::prefs::MeditationPrefs;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", content = "period", rename_all = "snake_case")]
pub enum MeditationStep {
    /// Silent lead-in before the first period.
    RampUp,
    /// Inside timed period k, 1-based.
    Period(u32),
    Ended,
}

impl MeditationStep {
    /// Interpret a round-tripped period index for a session of `periods`.
    /// Indexes past the end count as ended.
    pub fn from_index(index: u32, periods: u32) -> Self {
        let periods = periods.max(1);
        match index {
            0 => MeditationStep::RampUp,
            k if k <= periods => MeditationStep::Period(k),
            _ => MeditationStep::Ended,
        }
    }

    pub fn index(self, periods: u32) -> u32 {
        match self {
            MeditationStep::RampUp => 0,
            MeditationStep::Period(k) => k,
            MeditationStep::Ended => periods.max(1) + 1,
        }
    }
}

/// Sound to play at the firing being handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeditationCue {
    /// Bell marking the start of `period` (period 1 opens the session).
    Bell { period: u32 },
    /// Closing bell.
    Ending,
}

/// Next alarm to request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextFiring {
    pub at_millis: i64,
    pub period: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeditationTransition {
    pub fired: MeditationStep,
    pub cue: Option<MeditationCue>,
    /// `None` once the session is over.
    pub next: Option<NextFiring>,
}

impl MeditationTransition {
    pub fn is_terminal(&self) -> bool {
        self.next.is_none()
    }
}

/// Handle one firing carrying period `index`.
pub fn advance(index: u32, now_millis: i64, prefs: &MeditationPrefs) -> MeditationTransition {
    let periods = prefs.number_of_periods.max(1);
    if index > periods + 1 {
        warn!(index, periods, "meditation index past the end, ending session");
    }

    let fired = MeditationStep::from_index(index, periods);
    let transition = match fired {
        MeditationStep::RampUp => MeditationTransition {
            fired,
            cue: None,
            next: Some(NextFiring {
                at_millis: now_millis + prefs.ramp_up_millis as i64,
                period: 1,
            }),
        },
        MeditationStep::Period(k) => MeditationTransition {
            fired,
            cue: Some(MeditationCue::Bell { period: k }),
            next: Some(NextFiring {
                at_millis: now_millis + prefs.period_millis() as i64,
                period: k + 1,
            }),
        },
        MeditationStep::Ended => MeditationTransition {
            fired,
            cue: Some(MeditationCue::Ending),
            next: None,
        },
    };

    info!(index, ?fired, next = ?transition.next, "meditation advanced");
    transition
}
