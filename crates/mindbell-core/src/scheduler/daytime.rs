//! Next daytime start.

use chrono::{DateTime, Datelike, NaiveDate, TimeZone};

use crate::error::ScheduleError;
use crate::time_of_day::{weekday_number, ActiveWeekdays, TimeOfDay};

/// First daytime start on an active weekday strictly after `reference_millis`.
///
/// Scans forward day by day; `active` must be non-empty or
/// [`ScheduleError::NoActiveWeekdays`] is returned.
pub fn next_daytime_start<Tz: TimeZone>(
    reference_millis: i64,
    daytime_start: &TimeOfDay,
    active: &ActiveWeekdays,
    tz: &Tz,
) -> Result<i64, ScheduleError> {
    if active.is_empty() {
        return Err(ScheduleError::NoActiveWeekdays);
    }
    let reference = resolve_millis(reference_millis, tz)?;

    let mut date = reference.date_naive();
    let mut candidate = at_local_time(tz, date, daytime_start)?;
    if candidate <= reference_millis {
        date = next_day(date)?;
        candidate = at_local_time(tz, date, daytime_start)?;
    }
    while !active.contains(weekday_number(date.weekday())) {
        date = next_day(date)?;
        candidate = at_local_time(tz, date, daytime_start)?;
    }
    Ok(candidate)
}

pub(crate) fn resolve_millis<Tz: TimeZone>(
    millis: i64,
    tz: &Tz,
) -> Result<DateTime<Tz>, ScheduleError> {
    tz.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| ScheduleError::UnresolvableLocalTime(format!("epoch ms {millis}")))
}

fn next_day(date: NaiveDate) -> Result<NaiveDate, ScheduleError> {
    date.succ_opt()
        .ok_or_else(|| ScheduleError::UnresolvableLocalTime(format!("day after {date}")))
}

/// Epoch millis of `time` on `date`. A time skipped by a DST gap moves
/// forward one hour.
fn at_local_time<Tz: TimeZone>(
    tz: &Tz,
    date: NaiveDate,
    time: &TimeOfDay,
) -> Result<i64, ScheduleError> {
    let unresolvable = || ScheduleError::UnresolvableLocalTime(format!("{date} {time}"));
    let naive = date
        .and_hms_opt(time.hour(), time.minute(), 0)
        .ok_or_else(unresolvable)?;
    tz.from_local_datetime(&naive)
        .earliest()
        .or_else(|| {
            tz.from_local_datetime(&(naive + chrono::Duration::hours(1)))
                .earliest()
        })
        .map(|dt| dt.timestamp_millis())
        .ok_or_else(unresolvable)
}
