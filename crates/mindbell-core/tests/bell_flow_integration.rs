//! Integration tests for the alarm -> dispatcher -> ringer flow.
//!
//! These tests verify the complete workflow of scheduling a bell,
//! persisting the decision, delivering the alarm and ringing.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use mindbell_core::prefs::ONE_HOUR_MILLIS;
use mindbell_core::ringing::{MemoryPlayback, WatchOutcome};
use mindbell_core::{
    ActiveWeekdays, AlarmPayload, Dispatcher, Event, FileStore, IntervalRandomizer, MuteReason,
    PendingAlarm, PlaybackProvider, Prefs, RingOutcome, Ringer, ScheduleMode, ScheduleStore, Scheduler,
    StaticSignals, Trigger, Watchdog,
};

fn millis(d: u32, h: u32, m: u32) -> i64 {
    // January 2024: the 5th is a Friday.
    Utc.with_ymd_and_hms(2024, 1, d, h, m, 0)
        .unwrap()
        .timestamp_millis()
}

fn prefs() -> Prefs {
    Prefs {
        interval_millis: ONE_HOUR_MILLIS,
        randomize: false,
        active_weekdays: ActiveWeekdays::workdays(),
        ..Prefs::default()
    }
}

fn file_dispatcher(path: &std::path::Path) -> Dispatcher<Utc, PendingAlarm, FileStore> {
    Dispatcher::new(
        Scheduler::new(Utc, IntervalRandomizer::seeded(11)),
        PendingAlarm::default(),
        FileStore::new(path),
    )
}

/// Payload a host would rebuild from the persisted record.
fn payload_from_store(store: &FileStore) -> AlarmPayload {
    let record = store.load().unwrap();
    AlarmPayload {
        is_reschedule: true,
        now_millis: record.next_fire_millis.unwrap(),
        meditation_period: record.meditation_period,
    }
}

#[test]
fn test_schedule_survives_process_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("schedule.json");

    let mut first = file_dispatcher(&path);
    first.on_trigger(Trigger::Activate, millis(5, 7, 0), &prefs()).unwrap();
    assert_eq!(first.alarms().pending.unwrap().0, millis(5, 9, 0));
    drop(first);

    let mut second = file_dispatcher(&path);
    let payload = payload_from_store(second.store());
    let events = second
        .on_trigger(Trigger::AlarmFired { payload }, millis(5, 9, 0), &prefs())
        .unwrap();
    assert!(events.iter().any(Event::wants_ring));
    assert_eq!(second.record().unwrap().next_fire_millis, Some(millis(5, 10, 0)));
}

#[test]
fn test_friday_night_alarm_moves_to_monday() {
    let dir = tempfile::tempdir().unwrap();
    let mut dispatcher = file_dispatcher(&dir.path().join("schedule.json"));
    dispatcher.on_trigger(Trigger::Activate, millis(5, 19, 30), &prefs()).unwrap();

    let payload = payload_from_store(dispatcher.store());
    dispatcher
        .on_trigger(Trigger::AlarmFired { payload }, millis(5, 20, 30), &prefs())
        .unwrap();
    assert_eq!(dispatcher.alarms().pending.unwrap().0, millis(8, 9, 0));
}

#[test]
fn test_deactivated_schedule_ignores_pending_alarm() {
    let dir = tempfile::tempdir().unwrap();
    let mut dispatcher = file_dispatcher(&dir.path().join("schedule.json"));
    dispatcher.on_trigger(Trigger::Activate, millis(5, 7, 0), &prefs()).unwrap();
    let payload = dispatcher.alarms().pending.unwrap().1;
    dispatcher.on_trigger(Trigger::Deactivate, millis(5, 8, 0), &prefs()).unwrap();

    let events = dispatcher
        .on_trigger(Trigger::AlarmFired { payload }, millis(5, 9, 0), &prefs())
        .unwrap();
    assert!(!events.iter().any(Event::wants_ring));
    assert_eq!(dispatcher.record().unwrap().mode, ScheduleMode::Inactive);
}

#[tokio::test(start_paused = true)]
async fn test_due_bell_rings_until_playback_completes() {
    let ringer = Arc::new(Ringer::new(MemoryPlayback::with_volume(0.25)));
    let completer = ringer.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(10)).await;
        completer.playback().complete_all();
    });

    let (outcome, watched) = ringer
        .ring_and_wait(millis(5, 9, 0), &prefs(), &StaticSignals::default(), &Watchdog::default())
        .await;

    assert_eq!(outcome, RingOutcome::Ringing);
    assert_eq!(watched, WatchOutcome::Completed);
    assert!(!ringer.is_ringing());
    assert_eq!(ringer.playback().volume(), 0.25);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_wait_leaves_ring_running() {
    let ringer = Ringer::new(MemoryPlayback::default());
    let watchdog = Watchdog::default();
    let cancel = watchdog.cancel_handle();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        cancel.cancel();
    });

    let (_, watched) = ringer
        .ring_and_wait(millis(5, 9, 0), &prefs(), &StaticSignals::default(), &watchdog)
        .await;

    assert_eq!(watched, WatchOutcome::Cancelled);
    assert!(ringer.is_ringing());
    ringer.finish_ringing();
    assert!(!ringer.is_ringing());
}

#[tokio::test]
async fn test_off_hook_mute_only_when_enabled() {
    let ringer = Ringer::new(MemoryPlayback::default());
    let on_call = StaticSignals {
        off_hook: true,
        ..StaticSignals::default()
    };

    let (outcome, _) = ringer
        .ring_and_wait(0, &prefs(), &on_call, &Watchdog::default())
        .await;
    assert_eq!(outcome, RingOutcome::Muted(MuteReason::MutedOffHook));

    let ignore_calls = Prefs {
        mute_off_hook: false,
        ..prefs()
    };
    let outcome = ringer.ring_bell(0, &ignore_calls, &on_call, Box::new(|| {}));
    assert_eq!(outcome, RingOutcome::Ringing);
}
