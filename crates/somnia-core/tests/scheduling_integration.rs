//! Integration tests for the schedule service against the SQLite store and
//! the local notification center.

use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use somnia_core::{
    Database, FixedClock, KeyValueStore, LocalNotificationCenter, NotificationBackend,
    RealityCheckConfig, ScheduleService, TimeOfDay, ToggleOutcome, Trigger,
};

fn at(h: u32, m: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 9, 9)
        .unwrap()
        .and_hms_opt(h, m, 0)
        .unwrap()
}

fn t(s: &str) -> TimeOfDay {
    s.parse().unwrap()
}

#[test]
fn test_flags_survive_process_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("somnia.db");
    let clock = Arc::new(FixedClock::new(at(9, 30)));

    {
        let store = Arc::new(Database::open_at(&path).unwrap());
        let center = Arc::new(LocalNotificationCenter::new(clock.clone()));
        let mut service = ScheduleService::with_seed(store, center, clock.clone(), 3);
        service.initialize();
        assert!(service.toggle_reminder(true, None).is_success());
        assert!(service.toggle_reality_check(true, None).is_success());
    }

    // New process: fresh backend, same database.
    let store = Arc::new(Database::open_at(&path).unwrap());
    let center = Arc::new(LocalNotificationCenter::new(clock.clone()));
    let mut service = ScheduleService::with_seed(store, center.clone(), clock, 3);
    let status = service.initialize();

    assert!(status.reminder.active);
    assert!(!status.wbtb_alarm.active);
    assert!(status.reality_check.active);
    assert!(!status.reality_check.armed, "initialize must not re-arm");
    assert!(center.pending().unwrap().is_empty());

    let outcomes = service.restore();
    assert_eq!(outcomes.len(), 2);
    assert_eq!(center.pending().unwrap().len(), 2);
}

#[test]
fn test_arm_then_disarm_persists_false() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(Database::open_at(&dir.path().join("somnia.db")).unwrap());
    let clock = Arc::new(FixedClock::new(at(9, 30)));
    let center = Arc::new(LocalNotificationCenter::new(clock.clone()));
    let mut service = ScheduleService::with_seed(store.clone(), center.clone(), clock, 3);

    service.toggle_reality_check(true, None);
    service.toggle_reality_check(false, None);

    assert!(center.pending_for("reality-check").is_empty());
    assert_eq!(center.subscription_count(), 0);
    assert_eq!(store.get_item("isTimerActive").unwrap().as_deref(), Some("false"));
}

#[test]
fn test_concrete_scenario_inside_window() {
    let store = Arc::new(Database::open_memory().unwrap());
    let clock = Arc::new(FixedClock::new(at(9, 30)));
    let center = Arc::new(LocalNotificationCenter::new(clock.clone()));
    let mut service = ScheduleService::with_seed(store, center, clock, 3);

    let cfg = RealityCheckConfig::with_timing(60, false, t("08:00"), t("23:00")).unwrap();
    let outcome = service.toggle_reality_check(true, Some(&cfg));
    match outcome {
        ToggleOutcome::Armed { trigger, .. } => {
            assert_eq!(trigger, Trigger::RelativeSeconds { seconds: 3600 })
        }
        other => panic!("Expected Armed, got {other:?}"),
    }
    assert_eq!(service.reality_check_settings(), cfg);
}

#[test]
fn test_full_day_of_reality_checks() {
    let store = Arc::new(Database::open_memory().unwrap());
    let clock = Arc::new(FixedClock::new(at(6, 0)));
    let center = Arc::new(LocalNotificationCenter::new(clock.clone()));
    let mut service = ScheduleService::with_seed(store, center.clone(), clock.clone(), 3);

    let cfg = RealityCheckConfig::with_timing(120, false, t("08:00"), t("23:00")).unwrap();
    let outcome = service.toggle_reality_check(true, Some(&cfg));
    assert!(matches!(
        outcome,
        ToggleOutcome::Armed {
            trigger: Trigger::AbsoluteDate { .. },
            ..
        }
    ));

    // Walk the clock from one delivery to the next until the loop leaves
    // today.
    let mut fired = Vec::new();
    let midnight = loop {
        let next = center.pending_for("reality-check")[0].fire_at;
        if next.date() != at(0, 0).date() {
            break next;
        }
        clock.set(next);
        fired.extend(center.deliver_due().into_iter().map(|d| d.delivered_at));
        assert_eq!(center.subscription_count(), 1);
    };

    // 08:00, 10:00, ..., 22:00 fire inside the window. The 22:00 delivery
    // is still inside, so it books one more check two hours later.
    assert_eq!(fired.first(), Some(&at(8, 0)));
    assert_eq!(fired.last(), Some(&at(22, 0)));
    assert_eq!(fired.len(), 8);
    assert_eq!(midnight, at(0, 0) + Duration::days(1));

    // That check lands outside the window and waits for tomorrow's wake-up.
    clock.set(midnight);
    center.deliver_due();
    assert_eq!(
        center.pending_for("reality-check")[0].fire_at,
        at(8, 0) + Duration::days(1)
    );
}

#[test]
fn test_daily_and_timer_are_independent() {
    let store = Arc::new(Database::open_memory().unwrap());
    let clock = Arc::new(FixedClock::new(at(9, 0)));
    let center = Arc::new(LocalNotificationCenter::new(clock.clone()));
    let mut service = ScheduleService::with_seed(store, center.clone(), clock, 3);

    service.toggle_reminder(true, None);
    service.toggle_alarm(true, None);
    service.toggle_reality_check(true, None);
    service.toggle_reality_check(true, None);
    service.toggle_reality_check(false, None);

    assert_eq!(center.pending_for("dream-reminder").len(), 1);
    assert_eq!(center.pending_for("wbtb-alarm").len(), 1);
    assert!(center.pending_for("reality-check").is_empty());
}
