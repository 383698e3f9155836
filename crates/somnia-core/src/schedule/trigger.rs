//! Next-trigger calculation for the reality-check timer.
//!
//! The timer repeats every `interval` minutes while the user is awake. The
//! active window starts at `awake_time` and lasts until `sleep_time`; when
//! sleep comes before awake on the clock the window crosses midnight.
//!
//! ```text
//!   before window          inside window             after window
//! ----------------|=============================|----------------->
//!   AbsoluteDate(awake)   RelativeSeconds(n*60)   AbsoluteDate(next awake)
//! ```

use chrono::{Duration, NaiveDateTime};
use rand::Rng;

use super::{RealityCheckConfig, TimeOfDay};
use crate::notify::Trigger;

/// Lower bound of a randomized interval.
pub const MIN_RANDOM_INTERVAL_MINUTES: u32 = 5;

const MINUTES_PER_DAY: i64 = 24 * 60;

/// Interval to wait before the next check.
///
/// Random intervals are drawn uniformly from `5..=max(interval, 5)`, so a
/// configured interval under five minutes yields exactly five.
pub fn effective_interval_minutes<R: Rng + ?Sized>(
    config: &RealityCheckConfig,
    rng: &mut R,
) -> u32 {
    let interval = config.interval_minutes();
    if !config.is_random() {
        return interval;
    }
    let upper = interval.max(MIN_RANDOM_INTERVAL_MINUTES);
    rng.gen_range(MIN_RANDOM_INTERVAL_MINUTES..=upper)
}

/// Window length; equal awake and sleep times mean the whole day.
fn window_length(awake: TimeOfDay, sleep: TimeOfDay) -> Duration {
    let span = (i64::from(sleep.minutes_since_midnight())
        - i64::from(awake.minutes_since_midnight()))
    .rem_euclid(MINUTES_PER_DAY);
    if span == 0 {
        Duration::days(1)
    } else {
        Duration::minutes(span)
    }
}

/// Whether `now` falls inside an active window, both ends inclusive.
///
/// Windows anchored on today and on yesterday are checked, so an overnight
/// window that opened yesterday evening still covers the small hours.
pub fn window_contains(now: NaiveDateTime, awake: TimeOfDay, sleep: TimeOfDay) -> bool {
    let length = window_length(awake, sleep);
    let today = awake.on(now.date());
    [today - Duration::days(1), today]
        .into_iter()
        .any(|start| start <= now && now <= start + length)
}

/// The next time a window opens at or after `now`.
pub fn next_window_start(now: NaiveDateTime, awake: TimeOfDay) -> NaiveDateTime {
    let today = awake.on(now.date());
    if now < today {
        today
    } else {
        today + Duration::days(1)
    }
}

/// Compute when the next reality check should fire.
///
/// Never returns [`Trigger::RecurringDaily`]; repetition comes from
/// rescheduling on each delivery.
pub fn compute_next_trigger<R: Rng + ?Sized>(
    now: NaiveDateTime,
    config: &RealityCheckConfig,
    rng: &mut R,
) -> Trigger {
    let awake = config.awake_time();
    if window_contains(now, awake, config.sleep_time()) {
        let minutes = effective_interval_minutes(config, rng);
        Trigger::RelativeSeconds {
            seconds: u64::from(minutes) * 60,
        }
    } else {
        Trigger::AbsoluteDate {
            date: next_window_start(now, awake),
        }
    }
}
