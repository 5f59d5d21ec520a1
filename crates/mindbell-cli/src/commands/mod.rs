pub mod config;
pub mod meditate;
pub mod mute;
pub mod ring;
pub mod schedule;

use chrono::{DateTime, Local, Utc};
use mindbell_core::{
    Config, Dispatcher, Event, FileStore, IntervalRandomizer, PendingAlarm, Prefs, Scheduler,
};

pub type CliResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

pub type CliDispatcher = Dispatcher<Local, PendingAlarm, FileStore>;

/// Epoch millis for `--now`, or the wall clock.
pub fn now_millis(now: Option<&str>) -> CliResult<i64> {
    match now {
        Some(text) => Ok(DateTime::parse_from_rfc3339(text)
            .map_err(|e| format!("invalid --now '{text}': {e}"))?
            .timestamp_millis()),
        None => Ok(Utc::now().timestamp_millis()),
    }
}

pub fn load_config() -> CliResult<Config> {
    Ok(Config::load()?)
}

pub fn load_prefs(config: &Config) -> CliResult<Prefs> {
    Ok(config.prefs()?)
}

/// `MINDBELL_SEED` pins the random source for reproducible runs.
pub fn scheduler() -> Scheduler<Local> {
    let seed = std::env::var("MINDBELL_SEED")
        .ok()
        .and_then(|s| s.parse::<u64>().ok());
    Scheduler::new(Local, IntervalRandomizer::from_seed_option(seed))
}

pub fn dispatcher() -> CliResult<CliDispatcher> {
    Ok(Dispatcher::new(
        scheduler(),
        PendingAlarm::default(),
        FileStore::open_default()?,
    ))
}

pub fn print_events(events: &[Event]) -> CliResult {
    println!("{}", serde_json::to_string_pretty(events)?);
    Ok(())
}
