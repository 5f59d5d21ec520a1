//! Mute decision.
//!
//! Decides at ring time whether the bell must stay silent and why.
//! Reasons are checked in a fixed order and the first match wins:
//!
//! 1. manual mute still running
//! 2. phone muted (if configured)
//! 3. phone off hook (if configured)
//! 4. flight mode (if configured)

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::prefs::Prefs;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MuteReason {
    ManuallyMuted,
    MutedWithPhone,
    MutedOffHook,
    MutedInFlightMode,
    None,
}

impl MuteReason {
    pub fn is_muted(self) -> bool {
        self != MuteReason::None
    }
}

impl fmt::Display for MuteReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            MuteReason::ManuallyMuted => "bell manually muted",
            MuteReason::MutedWithPhone => "bell muted with phone",
            MuteReason::MutedOffHook => "bell muted during phone call",
            MuteReason::MutedInFlightMode => "bell muted in flight mode",
            MuteReason::None => "bell not muted",
        };
        f.write_str(text)
    }
}

/// Phone state signals consulted by [`evaluate_signals`].
pub trait PhoneSignals {
    fn is_muted(&self) -> bool;
    fn is_off_hook(&self) -> bool;
    fn is_in_flight_mode(&self) -> bool;
}

/// Fixed signal values, for hosts without phone state and for tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticSignals {
    pub muted: bool,
    pub off_hook: bool,
    pub flight_mode: bool,
}

impl PhoneSignals for StaticSignals {
    fn is_muted(&self) -> bool {
        self.muted
    }

    fn is_off_hook(&self) -> bool {
        self.off_hook
    }

    fn is_in_flight_mode(&self) -> bool {
        self.flight_mode
    }
}

/// Pure precedence evaluation.
pub fn evaluate(
    now_millis: i64,
    manual_mute_until: i64,
    phone_muted: bool,
    phone_off_hook: bool,
    phone_flight_mode: bool,
    prefs: &Prefs,
) -> MuteReason {
    if now_millis < manual_mute_until {
        MuteReason::ManuallyMuted
    } else if prefs.mute_with_phone && phone_muted {
        MuteReason::MutedWithPhone
    } else if prefs.mute_off_hook && phone_off_hook {
        MuteReason::MutedOffHook
    } else if prefs.mute_in_flight_mode && phone_flight_mode {
        MuteReason::MutedInFlightMode
    } else {
        MuteReason::None
    }
}

/// [`evaluate`] with the manual mute taken from `prefs` and phone state
/// queried from `signals`.
pub fn evaluate_signals<S: PhoneSignals + ?Sized>(
    now_millis: i64,
    prefs: &Prefs,
    signals: &S,
) -> MuteReason {
    evaluate(
        now_millis,
        prefs.muted_till_millis,
        signals.is_muted(),
        signals.is_off_hook(),
        signals.is_in_flight_mode(),
        prefs,
    )
}
