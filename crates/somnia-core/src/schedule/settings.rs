//! Persisted schedule settings.
//!
//! The settings screens store one JSON blob per schedule kind in the
//! key-value store. Loading never fails: a missing, unreadable, malformed
//! or invalid blob yields the defaults.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use super::{DailyConfig, DailyKind, RealityCheckConfig, ScheduleKind};
use crate::error::Result;
use crate::storage::KeyValueStore;

fn load_or<T, F>(store: &dyn KeyValueStore, key: &str, fallback: F) -> T
where
    T: DeserializeOwned,
    F: FnOnce() -> T,
{
    match store.get_item(key) {
        Ok(Some(raw)) => match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(error) => {
                warn!(key, %error, "malformed settings, using defaults");
                fallback()
            }
        },
        Ok(None) => fallback(),
        Err(error) => {
            warn!(key, %error, "failed to read settings, using defaults");
            fallback()
        }
    }
}

fn save<T: Serialize>(store: &dyn KeyValueStore, key: &str, value: &T) -> Result<()> {
    let json = serde_json::to_string(value)?;
    store.set_item(key, &json)?;
    Ok(())
}

pub fn load_daily(store: &dyn KeyValueStore, kind: DailyKind) -> DailyConfig {
    load_or(store, kind.kind().settings_key(), || {
        DailyConfig::default_for(kind)
    })
}

pub fn save_daily(store: &dyn KeyValueStore, kind: DailyKind, config: &DailyConfig) -> Result<()> {
    save(store, kind.kind().settings_key(), config)
}

pub fn load_reality_check(store: &dyn KeyValueStore) -> RealityCheckConfig {
    load_or(
        store,
        ScheduleKind::RealityCheckTimer.settings_key(),
        RealityCheckConfig::default,
    )
}

pub fn save_reality_check(store: &dyn KeyValueStore, config: &RealityCheckConfig) -> Result<()> {
    save(store, ScheduleKind::RealityCheckTimer.settings_key(), config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn missing_settings_use_defaults() {
        let store = MemoryStore::new();
        assert_eq!(load_reality_check(&store), RealityCheckConfig::default());
        assert_eq!(
            load_daily(&store, DailyKind::WbtbAlarm),
            DailyConfig::default_for(DailyKind::WbtbAlarm)
        );
    }

    #[test]
    fn corrupted_json_falls_back() {
        let store = MemoryStore::new();
        store.set_item("realityCheckSettings", "{not json").unwrap();
        store.set_item("reminderTime", "\"7am\"").unwrap();
        assert_eq!(load_reality_check(&store), RealityCheckConfig::default());
        assert_eq!(
            load_daily(&store, DailyKind::Reminder),
            DailyConfig::default_for(DailyKind::Reminder)
        );
    }

    #[test]
    fn out_of_range_values_fall_back() {
        let store = MemoryStore::new();
        store
            .set_item(
                "realityCheckSettings",
                r#"{"intervalMinutes":5000,"isRandom":true,"awakeTime":"08:00",
                    "sleepTime":"23:00","notificationTitle":"t","notificationBody":"b"}"#,
            )
            .unwrap();
        store
            .set_item("alarmTime", r#"{"time":"03:00","title":"","body":"b"}"#)
            .unwrap();
        assert_eq!(load_reality_check(&store), RealityCheckConfig::default());
        assert_eq!(
            load_daily(&store, DailyKind::WbtbAlarm),
            DailyConfig::default_for(DailyKind::WbtbAlarm)
        );
    }

    #[test]
    fn saved_settings_load_back() {
        let store = MemoryStore::new();
        let rc = RealityCheckConfig::new(
            45,
            true,
            "07:30".parse().unwrap(),
            "23:15".parse().unwrap(),
            "Check",
            "Is this a dream?",
        )
        .unwrap();
        save_reality_check(&store, &rc).unwrap();
        assert_eq!(load_reality_check(&store), rc);

        let daily = DailyConfig::at(DailyKind::Reminder, "06:45".parse().unwrap());
        save_daily(&store, DailyKind::Reminder, &daily).unwrap();
        assert_eq!(load_daily(&store, DailyKind::Reminder), daily);
    }

    #[test]
    fn save_propagates_store_failure() {
        let store = MemoryStore::new();
        store.set_fail_writes(true);
        assert!(save_reality_check(&store, &RealityCheckConfig::default()).is_err());
    }
}
