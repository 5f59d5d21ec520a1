mod daytime;
mod logic;
mod random;

pub use daytime::next_daytime_start;
pub use logic::next_target_time_millis;
pub use random::{IntervalRandomizer, STD_DEV_FACTOR};

use chrono::TimeZone;

use crate::error::ScheduleError;
use crate::prefs::Prefs;

/// Time zone plus random source, bundled for callers that schedule repeatedly.
#[derive(Debug, Clone)]
pub struct Scheduler<Tz: TimeZone> {
    tz: Tz,
    randomizer: IntervalRandomizer,
}

impl<Tz: TimeZone> Scheduler<Tz> {
    pub fn new(tz: Tz, randomizer: IntervalRandomizer) -> Self {
        Self { tz, randomizer }
    }

    pub fn time_zone(&self) -> &Tz {
        &self.tz
    }

    pub fn next_target_time_millis(
        &mut self,
        now_millis: i64,
        prefs: &Prefs,
    ) -> Result<i64, ScheduleError> {
        next_target_time_millis(now_millis, prefs, &self.tz, &mut self.randomizer)
    }
}
