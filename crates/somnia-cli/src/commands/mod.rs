pub mod config;
pub mod daily;
pub mod reality_check;
pub mod status;
pub mod watch;

use std::sync::Arc;

use somnia_core::{
    Clock, Config, Database, LocalNotificationCenter, ScheduleService, SystemClock, ToggleOutcome,
};

/// A schedule service wired to the on-disk store and an in-process
/// notification center.
pub struct Session {
    pub service: ScheduleService,
    pub center: Arc<LocalNotificationCenter>,
}

pub fn open_session(config: &Config) -> Result<Session, Box<dyn std::error::Error>> {
    let store = Arc::new(Database::open()?);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let center = Arc::new(LocalNotificationCenter::new(Arc::clone(&clock)));
    let mut service =
        ScheduleService::new(store, center.clone(), clock).with_style(config.notification_style());
    service.initialize();
    Ok(Session { service, center })
}

/// Print the outcome as JSON, the message on stderr, and fail on refusal.
pub fn report(outcome: &ToggleOutcome) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(outcome)?);
    if outcome.is_success() {
        eprintln!("{}", outcome.message());
        Ok(())
    } else {
        Err(outcome.message().into())
    }
}
