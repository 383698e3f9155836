use chrono::{Local, NaiveDateTime};
use serde_json::json;
use somnia_core::schedule::window_contains;
use somnia_core::{compute_next_trigger, Config};

use super::open_session;

pub fn run(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let session = open_session(config)?;
    println!("{}", serde_json::to_string_pretty(&session.service.status())?);
    Ok(())
}

/// Print the trigger the reality-check timer would schedule at `at`.
pub fn next(at: Option<&str>, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let now = match at {
        Some(s) => NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M")
            .map_err(|e| format!("invalid --at '{s}': {e}"))?,
        None => Local::now().naive_local(),
    };

    let session = open_session(config)?;
    let settings = session.service.reality_check_settings();
    let trigger = compute_next_trigger(now, &settings, &mut rand::thread_rng());

    let out = json!({
        "now": now,
        "in_window": window_contains(now, settings.awake_time(), settings.sleep_time()),
        "trigger": trigger,
        "fire_at": trigger.first_fire_at(now),
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
