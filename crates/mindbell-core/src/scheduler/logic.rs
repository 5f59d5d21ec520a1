//! Next ring instant.
//!
//! ```text
//! now + interval (randomized?) -> normalized to minute? -> inside daytime?
//!                                                           |  no
//!                                                           v
//!                                               next daytime start (+ spread, + offset)
//! ```

use chrono::TimeZone;
use tracing::debug;

use super::daytime::{next_daytime_start, resolve_millis};
use super::random::IntervalRandomizer;
use crate::error::ScheduleError;
use crate::prefs::Prefs;
use crate::time_of_day::TimeOfDay;

/// Compute the absolute time of the next ring.
///
/// `prefs.interval_millis` is assumed to be at least one minute (the
/// config layer clamps it). The result is not checked against `now_millis`.
pub fn next_target_time_millis<Tz: TimeZone>(
    now_millis: i64,
    prefs: &Prefs,
    tz: &Tz,
    randomizer: &mut IntervalRandomizer,
) -> Result<i64, ScheduleError> {
    if prefs.active_weekdays.is_empty() {
        return Err(ScheduleError::NoActiveWeekdays);
    }

    let mean_interval = prefs.interval_millis;
    let randomized_interval = if prefs.randomize {
        randomizer.randomized_interval(mean_interval)
    } else {
        mean_interval
    };

    let mut target = now_millis + randomized_interval as i64;
    if let Some(offset) = prefs.normalize_offset_millis() {
        target = normalize(target, mean_interval, offset, tz)?;
    }

    if !is_daytime(target, prefs, tz)? {
        let night_target = target;
        target = next_daytime_start(
            target,
            &prefs.daytime_start,
            &prefs.active_weekdays,
            tz,
        )?;
        if prefs.randomize {
            target += randomized_interval as i64 - (mean_interval / 2) as i64;
        }
        if let Some(offset) = prefs.normalize_offset_millis() {
            target += offset as i64;
        }
        debug!(night_target, target, "target outside daytime, moved to next start");
    }

    debug!(now_millis, target, randomized_interval, "next ring computed");
    Ok(target)
}

/// Round the minute-of-hour part of `target` to the nearest multiple of
/// `interval` shifted by `offset`. Ties round up, also below the offset.
fn normalize<Tz: TimeZone>(
    target: i64,
    interval: u64,
    offset: u64,
    tz: &Tz,
) -> Result<i64, ScheduleError> {
    let local = TimeOfDay::from_datetime(&resolve_millis(target, tz)?);
    let into_hour = (local.minute() as i64 * 60 + local.second() as i64) * 1000
        + local.millisecond() as i64;
    let hour_start = target - into_hour;

    let interval = interval as i64;
    let offset = offset as i64;
    let steps = ((into_hour - offset) as f64 / interval as f64 + 0.5).floor() as i64;
    Ok(hour_start + steps * interval + offset)
}

fn is_daytime<Tz: TimeZone>(millis: i64, prefs: &Prefs, tz: &Tz) -> Result<bool, ScheduleError> {
    let time = TimeOfDay::from_datetime(&resolve_millis(millis, tz)?);
    let in_window = time.is_in_interval(&prefs.daytime_start, &prefs.daytime_end);
    Ok(in_window && matches!(time.is_active_on_day(&prefs.active_weekdays), Ok(true)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prefs::{ONE_HOUR_MILLIS, ONE_MINUTE_MILLIS};
    use crate::time_of_day::ActiveWeekdays;
    use chrono::{FixedOffset, Utc};

    fn millis(d: u32, h: u32, m: u32) -> i64 {
        Utc.with_ymd_and_hms(2024, 1, d, h, m, 0)
            .unwrap()
            .timestamp_millis()
    }

    fn workday_prefs(interval_millis: u64) -> Prefs {
        Prefs {
            interval_millis,
            randomize: false,
            normalize: None,
            daytime_start: TimeOfDay::hm(9, 0),
            daytime_end: TimeOfDay::hm(21, 0),
            active_weekdays: ActiveWeekdays::workdays(),
            ..Prefs::default()
        }
    }

    #[test]
    fn early_friday_starts_at_nine_then_hourly() {
        let prefs = workday_prefs(ONE_HOUR_MILLIS);
        let mut rnd = IntervalRandomizer::seeded(1);
        let first = next_target_time_millis(millis(5, 5, 0), &prefs, &Utc, &mut rnd).unwrap();
        assert_eq!(first, millis(5, 9, 0));
        let second = next_target_time_millis(first, &prefs, &Utc, &mut rnd).unwrap();
        assert_eq!(second, millis(5, 10, 0));
        let third = next_target_time_millis(second, &prefs, &Utc, &mut rnd).unwrap();
        assert_eq!(third, millis(5, 11, 0));
    }

    #[test]
    fn normalize_aligns_to_five_past() {
        let prefs = Prefs {
            normalize: Some(5),
            ..workday_prefs(5 * ONE_MINUTE_MILLIS)
        };
        let mut rnd = IntervalRandomizer::seeded(1);
        let a = next_target_time_millis(millis(5, 18, 52), &prefs, &Utc, &mut rnd).unwrap();
        assert_eq!(a, millis(5, 18, 55));
        let b = next_target_time_millis(a, &prefs, &Utc, &mut rnd).unwrap();
        assert_eq!(b, millis(5, 19, 0));
        let c = next_target_time_millis(b, &prefs, &Utc, &mut rnd).unwrap();
        assert_eq!(c, millis(5, 19, 5));
    }

    #[test]
    fn normalize_uses_local_hour_in_offset_zones() {
        // +05:30: the local hour starts half an hour off the UTC hour.
        let india = FixedOffset::east_opt(5 * 3600 + 1800).unwrap();
        let prefs = Prefs {
            normalize: Some(0),
            active_weekdays: ActiveWeekdays::all(),
            daytime_start: TimeOfDay::hm(0, 0),
            daytime_end: TimeOfDay::hm(0, 0),
            ..workday_prefs(15 * ONE_MINUTE_MILLIS)
        };
        let now = india
            .with_ymd_and_hms(2024, 1, 5, 10, 7, 0)
            .unwrap()
            .timestamp_millis();
        let mut rnd = IntervalRandomizer::seeded(1);
        let next = next_target_time_millis(now, &prefs, &india, &mut rnd).unwrap();
        let expected = india
            .with_ymd_and_hms(2024, 1, 5, 10, 15, 0)
            .unwrap()
            .timestamp_millis();
        assert_eq!(next, expected);
    }

    #[test]
    fn late_friday_moves_to_monday() {
        let prefs = workday_prefs(ONE_HOUR_MILLIS);
        let mut rnd = IntervalRandomizer::seeded(1);
        let next = next_target_time_millis(millis(5, 23, 0), &prefs, &Utc, &mut rnd).unwrap();
        assert_eq!(next, millis(8, 9, 0));
        let time = TimeOfDay::from_millis(next, &Utc).unwrap();
        assert_eq!(time.weekday(), Some(2));
        assert!(time.is_in_interval(&prefs.daytime_start, &prefs.daytime_end));
    }

    #[test]
    fn randomized_first_ring_after_night_is_spread_over_one_interval() {
        let prefs = Prefs {
            randomize: true,
            ..workday_prefs(ONE_HOUR_MILLIS)
        };
        let mut rnd = IntervalRandomizer::seeded(11);
        for _ in 0..200 {
            let next = next_target_time_millis(millis(5, 23, 0), &prefs, &Utc, &mut rnd).unwrap();
            assert!(next >= millis(8, 9, 0), "{next}");
            assert!(next <= millis(8, 10, 0), "{next}");
        }
    }

    #[test]
    fn normalized_first_ring_after_night_adds_offset() {
        let prefs = Prefs {
            normalize: Some(10),
            ..workday_prefs(30 * ONE_MINUTE_MILLIS)
        };
        let mut rnd = IntervalRandomizer::seeded(1);
        let next = next_target_time_millis(millis(5, 20, 50), &prefs, &Utc, &mut rnd).unwrap();
        assert_eq!(next, millis(8, 9, 10));
    }

    #[test]
    fn non_random_rescheduling_adds_two_intervals() {
        let prefs = workday_prefs(20 * ONE_MINUTE_MILLIS);
        let mut rnd = IntervalRandomizer::seeded(1);
        let t = millis(3, 12, 13);
        let once = next_target_time_millis(t, &prefs, &Utc, &mut rnd).unwrap();
        let twice = next_target_time_millis(once, &prefs, &Utc, &mut rnd).unwrap();
        assert_eq!(twice, t + 2 * 20 * ONE_MINUTE_MILLIS as i64);
    }

    #[test]
    fn window_spanning_midnight_keeps_night_rings() {
        let prefs = Prefs {
            daytime_start: TimeOfDay::hm(13, 0),
            daytime_end: TimeOfDay::hm(2, 0),
            active_weekdays: ActiveWeekdays::all(),
            ..workday_prefs(ONE_HOUR_MILLIS)
        };
        let mut rnd = IntervalRandomizer::seeded(1);
        let next = next_target_time_millis(millis(5, 23, 0), &prefs, &Utc, &mut rnd).unwrap();
        assert_eq!(next, millis(6, 0, 0));
        let after_end = next_target_time_millis(millis(6, 1, 30), &prefs, &Utc, &mut rnd).unwrap();
        assert_eq!(after_end, millis(6, 13, 0));
    }

    #[test]
    fn empty_weekdays_is_a_configuration_error() {
        let prefs = Prefs {
            active_weekdays: ActiveWeekdays::new([]).unwrap(),
            ..workday_prefs(ONE_HOUR_MILLIS)
        };
        let mut rnd = IntervalRandomizer::seeded(1);
        assert_eq!(
            next_target_time_millis(millis(5, 10, 0), &prefs, &Utc, &mut rnd),
            Err(ScheduleError::NoActiveWeekdays)
        );
    }

    #[test]
    fn normalize_tie_below_offset_rounds_up() {
        let prefs = Prefs {
            normalize: Some(15),
            ..workday_prefs(20 * ONE_MINUTE_MILLIS)
        };
        let mut rnd = IntervalRandomizer::seeded(1);
        // 14:45 + 20 min = 15:05, halfway between 14:55 and 15:15.
        let next = next_target_time_millis(millis(5, 14, 45), &prefs, &Utc, &mut rnd).unwrap();
        assert_eq!(next, millis(5, 15, 15));
    }

    #[test]
    fn randomized_normalized_target_always_after_now() {
        let prefs = Prefs {
            randomize: true,
            normalize: Some(15),
            ..workday_prefs(20 * ONE_MINUTE_MILLIS)
        };
        let now = millis(5, 14, 55);
        for seed in 0..2000 {
            let mut rnd = IntervalRandomizer::seeded(seed);
            let next = next_target_time_millis(now, &prefs, &Utc, &mut rnd).unwrap();
            assert!(next > now, "seed {seed}: {next} <= {now}");
        }
    }
}
