//! Trigger dispatcher.
//!
//! Entry point for every external trigger (alarm firing, UI action). Reads
//! the persisted [`ScheduleRecord`], runs either the scheduler logic
//! (active mode) or the meditation state machine (meditating mode),
//! persists the decision and hands exactly one request to the
//! [`AlarmScheduler`].
//!
//! ## Modes
//!
//! ```text
//! Inactive --Activate--> Active --StartMeditation--> Meditating
//!    ^                     |  ^                          |
//!    +------Deactivate-----+  +--StopMeditation / end----+
//! ```
//!
//! A meditation started while inactive returns to Inactive when it ends.

use chrono::TimeZone;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::Result;
use crate::events::{utc_from_millis, Event};
use crate::meditation::{self, MeditationCue};
use crate::prefs::Prefs;
use crate::scheduler::Scheduler;
use crate::storage::{ScheduleMode, ScheduleRecord, ScheduleStore};

/// Data carried by a scheduled alarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmPayload {
    /// False for the first alarm after (re)activation.
    pub is_reschedule: bool,
    /// Reference time the next decision is computed from.
    pub now_millis: i64,
    pub meditation_period: Option<u32>,
}

/// Host one-shot timer. A new request replaces any pending one.
pub trait AlarmScheduler {
    fn schedule_once(&mut self, at_millis: i64, payload: AlarmPayload);
}

/// Keeps the last request; for hosts that poll and for tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingAlarm {
    pub pending: Option<(i64, AlarmPayload)>,
    pub requests: usize,
}

impl AlarmScheduler for PendingAlarm {
    fn schedule_once(&mut self, at_millis: i64, payload: AlarmPayload) {
        self.pending = Some((at_millis, payload));
        self.requests += 1;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "trigger", rename_all = "snake_case")]
pub enum Trigger {
    Activate,
    Deactivate,
    AlarmFired { payload: AlarmPayload },
    StartMeditation,
    StopMeditation,
}

pub struct Dispatcher<Tz: TimeZone, A: AlarmScheduler, S: ScheduleStore> {
    scheduler: Scheduler<Tz>,
    alarms: A,
    store: S,
}

impl<Tz: TimeZone, A: AlarmScheduler, S: ScheduleStore> Dispatcher<Tz, A, S> {
    pub fn new(scheduler: Scheduler<Tz>, alarms: A, store: S) -> Self {
        Self {
            scheduler,
            alarms,
            store,
        }
    }

    pub fn alarms(&self) -> &A {
        &self.alarms
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn record(&self) -> Result<ScheduleRecord> {
        self.store.load()
    }

    /// Handle one trigger at `now_millis`. Events with
    /// [`Event::wants_ring`] ask the host to ring now.
    pub fn on_trigger(
        &mut self,
        trigger: Trigger,
        now_millis: i64,
        prefs: &Prefs,
    ) -> Result<Vec<Event>> {
        debug!(?trigger, now_millis, "dispatching trigger");
        match trigger {
            Trigger::Activate => {
                let scheduled = self.schedule_bell(now_millis, now_millis, false, prefs)?;
                Ok(vec![scheduled])
            }
            Trigger::StopMeditation => {
                let record = self.store.load()?;
                if record.mode != ScheduleMode::Meditating {
                    debug!(mode = ?record.mode, "no meditation to stop");
                    return Ok(Vec::new());
                }
                info!("meditation stopped");
                let mut events = vec![Event::MeditationEnded {
                    at: utc_from_millis(now_millis),
                }];
                events.push(self.leave_meditation(record.resume_active, now_millis, prefs)?);
                Ok(events)
            }
            Trigger::Deactivate => {
                self.store.save(&ScheduleRecord::default())?;
                info!("bell deactivated");
                Ok(vec![Event::SchedulingStopped {
                    at: utc_from_millis(now_millis),
                }])
            }
            Trigger::StartMeditation => {
                let previous = self.store.load()?;
                let resume_active = match previous.mode {
                    ScheduleMode::Inactive => false,
                    ScheduleMode::Active => true,
                    ScheduleMode::Meditating => previous.resume_active,
                };
                self.store.save(&ScheduleRecord {
                    mode: ScheduleMode::Meditating,
                    next_fire_millis: Some(now_millis),
                    meditation_period: Some(0),
                    resume_active,
                })?;
                let mut events = vec![Event::MeditationStarted {
                    periods: prefs.meditation.number_of_periods.max(1),
                    at: utc_from_millis(now_millis),
                }];
                events.extend(self.advance_meditation(0, resume_active, now_millis, prefs)?);
                Ok(events)
            }
            Trigger::AlarmFired { payload } => self.alarm_fired(payload, now_millis, prefs),
        }
    }

    fn alarm_fired(
        &mut self,
        payload: AlarmPayload,
        now_millis: i64,
        prefs: &Prefs,
    ) -> Result<Vec<Event>> {
        let record = self.store.load()?;
        // Only the alarm the record points at is live; anything else was
        // superseded by a later decision.
        let matches_record = record.next_fire_millis == Some(payload.now_millis)
            && match record.mode {
                ScheduleMode::Inactive => false,
                ScheduleMode::Active => payload.meditation_period.is_none(),
                ScheduleMode::Meditating => {
                    payload.meditation_period.is_some()
                        && payload.meditation_period == record.meditation_period
                }
            };
        if !matches_record {
            info!(mode = ?record.mode, ?payload, "ignoring stale alarm");
            return Ok(vec![Event::StaleAlarmIgnored {
                scheduled_for: utc_from_millis(payload.now_millis),
                at: utc_from_millis(now_millis),
            }]);
        }

        match record.mode {
            ScheduleMode::Meditating => {
                let index = record.meditation_period.unwrap_or(0);
                self.advance_meditation(index, record.resume_active, now_millis, prefs)
            }
            _ => {
                let due = Event::BellDue {
                    at: utc_from_millis(now_millis),
                };
                let scheduled = self.schedule_bell(payload.now_millis, now_millis, true, prefs)?;
                Ok(vec![due, scheduled])
            }
        }
    }

    /// Compute the next regular bell from `reference_millis` and request it.
    fn schedule_bell(
        &mut self,
        reference_millis: i64,
        now_millis: i64,
        is_reschedule: bool,
        prefs: &Prefs,
    ) -> Result<Event> {
        let mut target = self
            .scheduler
            .next_target_time_millis(reference_millis, prefs)?;
        // A reference far in the past (device asleep) must not yield an
        // alarm that fires immediately in a burst.
        while target <= now_millis {
            target = self.scheduler.next_target_time_millis(target, prefs)?;
        }

        self.store.save(&ScheduleRecord {
            mode: ScheduleMode::Active,
            next_fire_millis: Some(target),
            meditation_period: None,
            resume_active: false,
        })?;
        self.alarms.schedule_once(
            target,
            AlarmPayload {
                is_reschedule,
                now_millis: target,
                meditation_period: None,
            },
        );
        info!(target, is_reschedule, "bell scheduled");
        Ok(Event::BellScheduled {
            fire_at: utc_from_millis(target),
            is_reschedule,
            at: utc_from_millis(now_millis),
        })
    }

    /// Back to the regular bell if it was on before the meditation,
    /// otherwise switch scheduling off.
    fn leave_meditation(
        &mut self,
        resume_active: bool,
        now_millis: i64,
        prefs: &Prefs,
    ) -> Result<Event> {
        if resume_active {
            return self.schedule_bell(now_millis, now_millis, false, prefs);
        }
        self.store.save(&ScheduleRecord::default())?;
        info!("meditation over, bell stays off");
        Ok(Event::SchedulingStopped {
            at: utc_from_millis(now_millis),
        })
    }

    fn advance_meditation(
        &mut self,
        index: u32,
        resume_active: bool,
        now_millis: i64,
        prefs: &Prefs,
    ) -> Result<Vec<Event>> {
        let transition = meditation::advance(index, now_millis, &prefs.meditation);
        let mut events = Vec::new();
        if let Some(cue) = transition.cue {
            events.push(Event::MeditationCue {
                cue,
                at: utc_from_millis(now_millis),
            });
        }

        match transition.next {
            Some(next) => {
                self.store.save(&ScheduleRecord {
                    mode: ScheduleMode::Meditating,
                    next_fire_millis: Some(next.at_millis),
                    meditation_period: Some(next.period),
                    resume_active,
                })?;
                self.alarms.schedule_once(
                    next.at_millis,
                    AlarmPayload {
                        is_reschedule: true,
                        now_millis: next.at_millis,
                        meditation_period: Some(next.period),
                    },
                );
                events.push(Event::MeditationScheduled {
                    fire_at: utc_from_millis(next.at_millis),
                    period: next.period,
                    at: utc_from_millis(now_millis),
                });
            }
            None => {
                debug_assert_eq!(transition.cue, Some(MeditationCue::Ending));
                events.push(Event::MeditationEnded {
                    at: utc_from_millis(now_millis),
                });
                events.push(self.leave_meditation(resume_active, now_millis, prefs)?);
            }
        }
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prefs::{MeditationPrefs, ONE_HOUR_MILLIS, ONE_MINUTE_MILLIS};
    use crate::scheduler::IntervalRandomizer;
    use crate::storage::MemoryStore;
    use crate::time_of_day::{ActiveWeekdays, TimeOfDay};
    use chrono::Utc;

    type TestDispatcher = Dispatcher<Utc, PendingAlarm, MemoryStore>;

    fn dispatcher() -> TestDispatcher {
        Dispatcher::new(
            Scheduler::new(Utc, IntervalRandomizer::seeded(5)),
            PendingAlarm::default(),
            MemoryStore::default(),
        )
    }

    fn millis(d: u32, h: u32, m: u32) -> i64 {
        Utc.with_ymd_and_hms(2024, 1, d, h, m, 0)
            .unwrap()
            .timestamp_millis()
    }

    fn prefs() -> Prefs {
        Prefs {
            interval_millis: ONE_HOUR_MILLIS,
            randomize: false,
            daytime_start: TimeOfDay::hm(9, 0),
            daytime_end: TimeOfDay::hm(21, 0),
            active_weekdays: ActiveWeekdays::workdays(),
            meditation: MeditationPrefs {
                ramp_up_millis: 60_000,
                number_of_periods: 2,
                meditation_duration_millis: 20 * ONE_MINUTE_MILLIS,
            },
            ..Prefs::default()
        }
    }

    fn fire(d: &mut TestDispatcher, now: i64) -> Vec<Event> {
        let (_, payload) = d.alarms().pending.expect("pending alarm");
        d.on_trigger(Trigger::AlarmFired { payload }, now, &prefs())
            .unwrap()
    }

    #[test]
    fn activation_schedules_without_ringing() {
        let mut d = dispatcher();
        let events = d.on_trigger(Trigger::Activate, millis(5, 5, 0), &prefs()).unwrap();
        assert!(!events.iter().any(Event::wants_ring));
        let (at, payload) = d.alarms().pending.unwrap();
        assert_eq!(at, millis(5, 9, 0));
        assert!(!payload.is_reschedule);
        assert_eq!(d.record().unwrap().next_fire_millis, Some(at));
    }

    #[test]
    fn firing_rings_and_reschedules_from_payload_reference() {
        let mut d = dispatcher();
        d.on_trigger(Trigger::Activate, millis(5, 5, 0), &prefs()).unwrap();
        // Alarm delivered a few seconds late.
        let events = fire(&mut d, millis(5, 9, 0) + 4_000);
        assert!(events[0].wants_ring());
        let (at, payload) = d.alarms().pending.unwrap();
        assert_eq!(at, millis(5, 10, 0));
        assert!(payload.is_reschedule);
        assert_eq!(d.alarms().requests, 2);
    }

    #[test]
    fn late_wakeup_never_schedules_in_the_past() {
        let mut d = dispatcher();
        d.on_trigger(Trigger::Activate, millis(5, 5, 0), &prefs()).unwrap();
        fire(&mut d, millis(5, 12, 30));
        let (at, _) = d.alarms().pending.unwrap();
        assert_eq!(at, millis(5, 13, 0));
    }

    #[test]
    fn meditation_runs_ramp_up_periods_and_returns_to_active() {
        let mut d = dispatcher();
        d.on_trigger(Trigger::Activate, millis(5, 9, 30), &prefs()).unwrap();
        let start = millis(5, 10, 0);
        let events = d.on_trigger(Trigger::StartMeditation, start, &prefs()).unwrap();
        assert!(!events.iter().any(Event::wants_ring));
        assert_eq!(d.record().unwrap().meditation_period, Some(1));

        let ramp_end = start + 60_000;
        let events = fire(&mut d, ramp_end);
        assert!(events.contains(&Event::MeditationCue {
            cue: MeditationCue::Bell { period: 1 },
            at: utc_from_millis(ramp_end),
        }));

        let second = ramp_end + 10 * ONE_MINUTE_MILLIS as i64;
        fire(&mut d, second);
        assert_eq!(d.record().unwrap().meditation_period, Some(3));

        let end = second + 10 * ONE_MINUTE_MILLIS as i64;
        let events = fire(&mut d, end);
        assert!(events.iter().any(|e| matches!(e, Event::MeditationEnded { .. })));
        assert!(events.contains(&Event::MeditationCue {
            cue: MeditationCue::Ending,
            at: utc_from_millis(end),
        }));
        let record = d.record().unwrap();
        assert_eq!(record.mode, ScheduleMode::Active);
        assert_eq!(record.meditation_period, None);
    }

    #[test]
    fn stale_alarm_after_deactivation_is_ignored() {
        let mut d = dispatcher();
        d.on_trigger(Trigger::Activate, millis(5, 5, 0), &prefs()).unwrap();
        d.on_trigger(Trigger::Deactivate, millis(5, 6, 0), &prefs()).unwrap();
        let events = fire(&mut d, millis(5, 9, 0));
        assert!(matches!(events.as_slice(), [Event::StaleAlarmIgnored { .. }]));
        assert_eq!(d.alarms().requests, 1);
    }

    #[test]
    fn regular_alarm_during_meditation_is_stale() {
        let mut d = dispatcher();
        d.on_trigger(Trigger::Activate, millis(5, 5, 0), &prefs()).unwrap();
        let regular = d.alarms().pending.unwrap().1;
        d.on_trigger(Trigger::StartMeditation, millis(5, 8, 0), &prefs()).unwrap();
        let events = d
            .on_trigger(Trigger::AlarmFired { payload: regular }, millis(5, 9, 0), &prefs())
            .unwrap();
        assert!(!events.iter().any(Event::wants_ring));
    }

    #[test]
    fn stopping_meditation_resumes_regular_bell() {
        let mut d = dispatcher();
        d.on_trigger(Trigger::Activate, millis(5, 9, 30), &prefs()).unwrap();
        d.on_trigger(Trigger::StartMeditation, millis(5, 10, 0), &prefs()).unwrap();
        let events = d
            .on_trigger(Trigger::StopMeditation, millis(5, 10, 5), &prefs())
            .unwrap();
        assert!(matches!(events[0], Event::MeditationEnded { .. }));
        assert_eq!(d.record().unwrap().mode, ScheduleMode::Active);
        assert_eq!(d.alarms().pending.unwrap().0, millis(5, 11, 5));
    }

    #[test]
    fn stop_without_meditation_does_nothing() {
        let mut d = dispatcher();
        let events = d
            .on_trigger(Trigger::StopMeditation, millis(5, 10, 0), &prefs())
            .unwrap();
        assert!(events.is_empty());
        assert_eq!(d.record().unwrap().mode, ScheduleMode::Inactive);
        assert_eq!(d.alarms().requests, 0);
    }

    #[test]
    fn meditation_started_while_inactive_leaves_bell_off() {
        let mut d = dispatcher();
        let start = millis(5, 10, 0);
        d.on_trigger(Trigger::StartMeditation, start, &prefs()).unwrap();
        fire(&mut d, start + 60_000);
        fire(&mut d, start + 60_000 + 10 * ONE_MINUTE_MILLIS as i64);
        let events = fire(&mut d, start + 60_000 + 20 * ONE_MINUTE_MILLIS as i64);

        assert!(matches!(events.last(), Some(Event::SchedulingStopped { .. })));
        assert_eq!(d.record().unwrap(), ScheduleRecord::default());

        // A leftover meditation alarm no longer matches the record.
        let events = fire(&mut d, start + 60_000 + 30 * ONE_MINUTE_MILLIS as i64);
        assert!(matches!(events.as_slice(), [Event::StaleAlarmIgnored { .. }]));
    }

    #[test]
    fn stopping_meditation_started_while_inactive_switches_off() {
        let mut d = dispatcher();
        d.on_trigger(Trigger::StartMeditation, millis(5, 10, 0), &prefs()).unwrap();
        let requests = d.alarms().requests;
        let events = d
            .on_trigger(Trigger::StopMeditation, millis(5, 10, 5), &prefs())
            .unwrap();
        assert!(matches!(
            events.as_slice(),
            [Event::MeditationEnded { .. }, Event::SchedulingStopped { .. }]
        ));
        assert_eq!(d.record().unwrap().mode, ScheduleMode::Inactive);
        assert_eq!(d.alarms().requests, requests);
    }

    #[test]
    fn alarm_superseded_by_reactivation_is_stale() {
        let mut d = dispatcher();
        d.on_trigger(Trigger::Activate, millis(5, 10, 0), &prefs()).unwrap();
        let superseded = d.alarms().pending.unwrap().1;
        d.on_trigger(Trigger::Deactivate, millis(5, 10, 10), &prefs()).unwrap();
        d.on_trigger(Trigger::Activate, millis(5, 10, 30), &prefs()).unwrap();
        assert_eq!(d.record().unwrap().next_fire_millis, Some(millis(5, 11, 30)));

        let events = d
            .on_trigger(
                Trigger::AlarmFired {
                    payload: superseded,
                },
                millis(5, 11, 0),
                &prefs(),
            )
            .unwrap();
        assert!(matches!(events.as_slice(), [Event::StaleAlarmIgnored { .. }]));
        assert_eq!(d.record().unwrap().next_fire_millis, Some(millis(5, 11, 30)));
        assert_eq!(d.alarms().pending.unwrap().0, millis(5, 11, 30));
    }
}
