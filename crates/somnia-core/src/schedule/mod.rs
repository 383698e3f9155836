//! Schedule kinds and their configuration values.
//!
//! There are exactly three schedules: the daily dream-journal reminder, the
//! wake-back-to-bed alarm and the repeating reality-check timer. Each kind
//! owns a stable notification identifier and a pair of persisted keys.

mod config;
pub mod settings;
pub mod trigger;

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub use config::{
    DailyConfig, RealityCheckConfig, DEFAULT_AWAKE_TIME, DEFAULT_INTERVAL_MINUTES,
    DEFAULT_SLEEP_TIME, MAX_INTERVAL_MINUTES, MIN_INTERVAL_MINUTES,
};
pub use trigger::{
    compute_next_trigger, effective_interval_minutes, next_window_start, window_contains,
    MIN_RANDOM_INTERVAL_MINUTES,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleKind {
    Reminder,
    WbtbAlarm,
    RealityCheckTimer,
}

impl ScheduleKind {
    pub const ALL: [ScheduleKind; 3] = [
        ScheduleKind::Reminder,
        ScheduleKind::WbtbAlarm,
        ScheduleKind::RealityCheckTimer,
    ];

    /// Notification identifier. At most one notification with this
    /// identifier is pending at any time.
    pub fn identifier(self) -> &'static str {
        match self {
            ScheduleKind::Reminder => "dream-reminder",
            ScheduleKind::WbtbAlarm => "wbtb-alarm",
            ScheduleKind::RealityCheckTimer => "reality-check",
        }
    }

    /// Key-value store key holding the persisted active flag.
    pub fn active_key(self) -> &'static str {
        match self {
            ScheduleKind::Reminder => "isReminderActive",
            ScheduleKind::WbtbAlarm => "isAlarmActive",
            ScheduleKind::RealityCheckTimer => "isTimerActive",
        }
    }

    /// Key-value store key holding the settings blob (JSON).
    pub fn settings_key(self) -> &'static str {
        match self {
            ScheduleKind::Reminder => "reminderTime",
            ScheduleKind::WbtbAlarm => "alarmTime",
            ScheduleKind::RealityCheckTimer => "realityCheckSettings",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ScheduleKind::Reminder => "Dream reminder",
            ScheduleKind::WbtbAlarm => "WBTB alarm",
            ScheduleKind::RealityCheckTimer => "Reality-check timer",
        }
    }

    pub fn from_identifier(identifier: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.identifier() == identifier)
    }
}

impl fmt::Display for ScheduleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The two schedules that fire once a day at a fixed wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DailyKind {
    Reminder,
    WbtbAlarm,
}

impl DailyKind {
    pub fn kind(self) -> ScheduleKind {
        match self {
            DailyKind::Reminder => ScheduleKind::Reminder,
            DailyKind::WbtbAlarm => ScheduleKind::WbtbAlarm,
        }
    }
}

impl From<DailyKind> for ScheduleKind {
    fn from(kind: DailyKind) -> Self {
        kind.kind()
    }
}

/// A wall-clock time with minute precision.
///
/// Serialized as `"HH:MM"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay {
    hour: u32,
    minute: u32,
}

impl TimeOfDay {
    pub fn new(hour: u32, minute: u32) -> Result<Self, ValidationError> {
        if hour > 23 {
            return Err(ValidationError::invalid("hour", format!("{hour} is not in 0..=23")));
        }
        if minute > 59 {
            return Err(ValidationError::invalid(
                "minute",
                format!("{minute} is not in 0..=59"),
            ));
        }
        Ok(Self { hour, minute })
    }

    /// Const constructor for known-good literals.
    pub(crate) const fn hm(hour: u32, minute: u32) -> Self {
        Self { hour, minute }
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn minute(&self) -> u32 {
        self.minute
    }

    pub fn minutes_since_midnight(&self) -> u32 {
        self.hour * 60 + self.minute
    }

    pub fn to_naive_time(self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour, self.minute, 0).unwrap_or(NaiveTime::MIN)
    }

    /// This time of day on the given calendar date.
    pub fn on(self, date: NaiveDate) -> NaiveDateTime {
        date.and_time(self.to_naive_time())
    }

    /// Drops seconds and below.
    pub fn from_time(time: NaiveTime) -> Self {
        Self {
            hour: time.hour(),
            minute: time.minute(),
        }
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl FromStr for TimeOfDay {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidTime(s.to_string());
        let (h, m) = s.trim().split_once(':').ok_or_else(invalid)?;
        let hour = h.parse::<u32>().map_err(|_| invalid())?;
        let minute = m.parse::<u32>().map_err(|_| invalid())?;
        Self::new(hour, minute).map_err(|_| invalid())
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeOfDay> for String {
    fn from(value: TimeOfDay) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_displays_hh_mm() {
        let t: TimeOfDay = "07:05".parse().unwrap();
        assert_eq!((t.hour(), t.minute()), (7, 5));
        assert_eq!(t.to_string(), "07:05");
        assert_eq!(t.minutes_since_midnight(), 425);
    }

    #[test]
    fn rejects_out_of_range_and_garbage() {
        assert!("24:00".parse::<TimeOfDay>().is_err());
        assert!("12:60".parse::<TimeOfDay>().is_err());
        assert!("noon".parse::<TimeOfDay>().is_err());
        assert!(TimeOfDay::new(23, 59).is_ok());
    }

    #[test]
    fn serializes_as_string() {
        let t = TimeOfDay::new(22, 0).unwrap();
        assert_eq!(serde_json::to_string(&t).unwrap(), "\"22:00\"");
        let back: TimeOfDay = serde_json::from_str("\"22:00\"").unwrap();
        assert_eq!(back, t);
        assert!(serde_json::from_str::<TimeOfDay>("\"25:00\"").is_err());
    }

    #[test]
    fn kinds_have_distinct_identifiers() {
        let ids: std::collections::HashSet<_> =
            ScheduleKind::ALL.iter().map(|k| k.identifier()).collect();
        assert_eq!(ids.len(), 3);
        assert_eq!(
            ScheduleKind::from_identifier("reality-check"),
            Some(ScheduleKind::RealityCheckTimer)
        );
        assert_eq!(ScheduleKind::from_identifier("other"), None);
    }
}
