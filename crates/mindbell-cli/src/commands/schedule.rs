use chrono::{Local, TimeZone};
use mindbell_core::events::utc_from_millis;
use mindbell_core::{AlarmPayload, Event, ScheduleMode, ScheduleStore, TimeOfDay, Trigger};
use serde_json::json;

use super::{dispatcher, load_config, load_prefs, now_millis, print_events, ring, scheduler, CliResult};

/// Local clock rendering of `millis` honouring the 12/24h preference.
fn display_time(millis: i64, use_24h_clock: bool) -> Option<String> {
    TimeOfDay::from_millis(millis, &Local).map(|t| {
        let date = Local
            .timestamp_millis_opt(millis)
            .single()
            .map(|dt| dt.format("%Y-%m-%d ").to_string())
            .unwrap_or_default();
        format!("{date}{}", t.display_string(use_24h_clock))
    })
}

pub fn activate() -> CliResult {
    let config = load_config()?;
    let prefs = load_prefs(&config)?;
    let mut dispatcher = dispatcher()?;
    let events = dispatcher.on_trigger(Trigger::Activate, now_millis(None)?, &prefs)?;
    print_events(&events)
}

pub fn deactivate() -> CliResult {
    let config = load_config()?;
    let prefs = load_prefs(&config)?;
    let mut dispatcher = dispatcher()?;
    let events = dispatcher.on_trigger(Trigger::Deactivate, now_millis(None)?, &prefs)?;
    print_events(&events)
}

/// Computes without touching the persisted schedule.
pub fn next(now: Option<&str>) -> CliResult {
    let config = load_config()?;
    let prefs = load_prefs(&config)?;
    let now = now_millis(now)?;
    let target = scheduler().next_target_time_millis(now, &prefs)?;
    let out = json!({
        "next_ring": utc_from_millis(target),
        "next_ring_millis": target,
        "local": display_time(target, config.use_24h_clock),
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

pub fn status() -> CliResult {
    let config = load_config()?;
    let dispatcher = dispatcher()?;
    let record = dispatcher.record()?;
    let now = now_millis(None)?;
    let out = json!({
        "mode": record.mode,
        "next_fire": record.next_fire_millis.map(utc_from_millis),
        "local": record
            .next_fire_millis
            .and_then(|at| display_time(at, config.use_24h_clock)),
        "meditation_period": record.meditation_period,
        "muted_till": (config.mute.muted_till > now).then(|| utc_from_millis(config.mute.muted_till)),
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

/// Deliver the persisted alarm as if the host timer had fired.
pub fn tick(now: Option<&str>, silent: bool) -> CliResult {
    let config = load_config()?;
    let prefs = load_prefs(&config)?;
    let now = now_millis(now)?;
    let mut dispatcher = dispatcher()?;
    let record = dispatcher.store().load()?;

    let Some(fire_at) = record.next_fire_millis.filter(|_| record.mode != ScheduleMode::Inactive)
    else {
        return Err("bell is not active, run `mindbell on` first".into());
    };
    if now < fire_at {
        let out = json!({ "due": false, "next_fire": utc_from_millis(fire_at) });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    let payload = AlarmPayload {
        is_reschedule: true,
        now_millis: fire_at,
        meditation_period: record.meditation_period,
    };
    let mut events = dispatcher.on_trigger(Trigger::AlarmFired { payload }, now, &prefs)?;
    if !silent && events.iter().any(Event::wants_ring) {
        events.push(ring::ring_now(now, &prefs, true)?);
    }
    print_events(&events)
}
