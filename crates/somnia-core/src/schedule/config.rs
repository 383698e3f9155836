use serde::{Deserialize, Serialize};

use super::{DailyKind, TimeOfDay};
use crate::error::ValidationError;
use crate::notify::{NotificationContent, NotificationStyle};

pub const MIN_INTERVAL_MINUTES: u32 = 1;
pub const MAX_INTERVAL_MINUTES: u32 = 1440;

pub const DEFAULT_INTERVAL_MINUTES: u32 = 60;
pub const DEFAULT_AWAKE_TIME: TimeOfDay = TimeOfDay::hm(10, 0);
pub const DEFAULT_SLEEP_TIME: TimeOfDay = TimeOfDay::hm(22, 0);

const DEFAULT_REMINDER_TIME: TimeOfDay = TimeOfDay::hm(8, 0);
const DEFAULT_ALARM_TIME: TimeOfDay = TimeOfDay::hm(4, 30);

const REMINDER_TITLE: &str = "Dream journal";
const REMINDER_BODY: &str = "Write down your dreams before they fade.";
const ALARM_TITLE: &str = "Wake back to bed";
const ALARM_BODY: &str = "Stay awake briefly, then go back to sleep with a lucid intention.";
const REALITY_CHECK_TITLE: &str = "Reality check";
const REALITY_CHECK_BODY: &str = "Are you dreaming? Look at your hands and check again.";

/// Settings for a schedule that fires once a day (reminder, WBTB alarm).
///
/// Title and body are never blank. Deserializing rejects blank text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "DailySettingsFile", into = "DailySettingsFile")]
pub struct DailyConfig {
    time: TimeOfDay,
    title: String,
    body: String,
}

impl DailyConfig {
    pub fn new(
        time: TimeOfDay,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let content = NotificationContent::new(title, body)?;
        Ok(Self {
            time,
            title: content.title,
            body: content.body,
        })
    }

    /// Default settings for `kind` at `time`.
    pub fn at(kind: DailyKind, time: TimeOfDay) -> Self {
        let (title, body) = match kind {
            DailyKind::Reminder => (REMINDER_TITLE, REMINDER_BODY),
            DailyKind::WbtbAlarm => (ALARM_TITLE, ALARM_BODY),
        };
        Self {
            time,
            title: title.to_string(),
            body: body.to_string(),
        }
    }

    pub fn default_for(kind: DailyKind) -> Self {
        let time = match kind {
            DailyKind::Reminder => DEFAULT_REMINDER_TIME,
            DailyKind::WbtbAlarm => DEFAULT_ALARM_TIME,
        };
        Self::at(kind, time)
    }

    pub fn time(&self) -> TimeOfDay {
        self.time
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn content(&self, style: NotificationStyle) -> NotificationContent {
        NotificationContent::styled(&self.title, &self.body, style)
    }
}

/// On-disk shape of a daily settings blob.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct DailySettingsFile {
    time: TimeOfDay,
    title: String,
    body: String,
}

impl TryFrom<DailySettingsFile> for DailyConfig {
    type Error = ValidationError;

    fn try_from(file: DailySettingsFile) -> Result<Self, Self::Error> {
        Self::new(file.time, file.title, file.body)
    }
}

impl From<DailyConfig> for DailySettingsFile {
    fn from(config: DailyConfig) -> Self {
        Self {
            time: config.time,
            title: config.title,
            body: config.body,
        }
    }
}

/// Settings for the repeating reality-check timer.
///
/// Always valid: the interval is in `1..=1440` minutes and title and body
/// are non-blank. Deserializing rejects values that break these rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "RealityCheckSettingsFile",
    into = "RealityCheckSettingsFile"
)]
pub struct RealityCheckConfig {
    interval_minutes: u32,
    is_random: bool,
    awake_time: TimeOfDay,
    sleep_time: TimeOfDay,
    title: String,
    body: String,
}

impl RealityCheckConfig {
    pub fn new(
        interval_minutes: u32,
        is_random: bool,
        awake_time: TimeOfDay,
        sleep_time: TimeOfDay,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        if !(MIN_INTERVAL_MINUTES..=MAX_INTERVAL_MINUTES).contains(&interval_minutes) {
            return Err(ValidationError::invalid(
                "intervalMinutes",
                format!(
                    "{interval_minutes} is not in {MIN_INTERVAL_MINUTES}..={MAX_INTERVAL_MINUTES}"
                ),
            ));
        }
        let content = NotificationContent::new(title, body)?;
        Ok(Self {
            interval_minutes,
            is_random,
            awake_time,
            sleep_time,
            title: content.title,
            body: content.body,
        })
    }

    /// Default content with the given timing.
    pub fn with_timing(
        interval_minutes: u32,
        is_random: bool,
        awake_time: TimeOfDay,
        sleep_time: TimeOfDay,
    ) -> Result<Self, ValidationError> {
        Self::new(
            interval_minutes,
            is_random,
            awake_time,
            sleep_time,
            REALITY_CHECK_TITLE,
            REALITY_CHECK_BODY,
        )
    }

    pub fn interval_minutes(&self) -> u32 {
        self.interval_minutes
    }

    pub fn is_random(&self) -> bool {
        self.is_random
    }

    pub fn awake_time(&self) -> TimeOfDay {
        self.awake_time
    }

    pub fn sleep_time(&self) -> TimeOfDay {
        self.sleep_time
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn content(&self, style: NotificationStyle) -> NotificationContent {
        NotificationContent::styled(&self.title, &self.body, style)
    }
}

impl Default for RealityCheckConfig {
    fn default() -> Self {
        Self {
            interval_minutes: DEFAULT_INTERVAL_MINUTES,
            is_random: false,
            awake_time: DEFAULT_AWAKE_TIME,
            sleep_time: DEFAULT_SLEEP_TIME,
            title: REALITY_CHECK_TITLE.to_string(),
            body: REALITY_CHECK_BODY.to_string(),
        }
    }
}

/// On-disk shape of the reality-check settings blob.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RealityCheckSettingsFile {
    interval_minutes: u32,
    #[serde(default)]
    is_random: bool,
    awake_time: TimeOfDay,
    sleep_time: TimeOfDay,
    notification_title: String,
    notification_body: String,
}

impl TryFrom<RealityCheckSettingsFile> for RealityCheckConfig {
    type Error = ValidationError;

    fn try_from(file: RealityCheckSettingsFile) -> Result<Self, Self::Error> {
        Self::new(
            file.interval_minutes,
            file.is_random,
            file.awake_time,
            file.sleep_time,
            file.notification_title,
            file.notification_body,
        )
    }
}

impl From<RealityCheckConfig> for RealityCheckSettingsFile {
    fn from(config: RealityCheckConfig) -> Self {
        Self {
            interval_minutes: config.interval_minutes,
            is_random: config.is_random,
            awake_time: config.awake_time,
            sleep_time: config.sleep_time,
            notification_title: config.title,
            notification_body: config.body,
        }
    }
}
