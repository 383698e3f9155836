use clap::{Args, Subcommand};
use somnia_core::{Config, RealityCheckConfig, TimeOfDay};

use super::{open_session, report, Session};

#[derive(Args)]
pub struct RealityCheckOptions {
    /// Minutes between checks (1-1440)
    #[arg(long)]
    interval: Option<u32>,
    /// Draw each interval at random between 5 minutes and the interval
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    random: Option<bool>,
    /// Start of the active window (HH:MM)
    #[arg(long)]
    awake: Option<String>,
    /// End of the active window (HH:MM)
    #[arg(long)]
    sleep: Option<String>,
    /// Notification title
    #[arg(long)]
    title: Option<String>,
    /// Notification body
    #[arg(long)]
    body: Option<String>,
}

#[derive(Subcommand)]
pub enum RealityCheckAction {
    /// Arm the timer; omitted options keep their saved values
    On(RealityCheckOptions),
    /// Save settings without arming or disarming
    Set(RealityCheckOptions),
    /// Disarm the timer
    Off,
    /// Print the timer's state as JSON
    Status,
}

fn parse_time(value: Option<String>, saved: TimeOfDay) -> Result<TimeOfDay, Box<dyn std::error::Error>> {
    match value {
        Some(v) => Ok(v.parse()?),
        None => Ok(saved),
    }
}

/// Saved settings with the given options applied on top.
fn settings(
    session: &Session,
    options: RealityCheckOptions,
) -> Result<RealityCheckConfig, Box<dyn std::error::Error>> {
    let saved = session.service.reality_check_settings();
    Ok(RealityCheckConfig::new(
        options.interval.unwrap_or(saved.interval_minutes()),
        options.random.unwrap_or(saved.is_random()),
        parse_time(options.awake, saved.awake_time())?,
        parse_time(options.sleep, saved.sleep_time())?,
        options.title.unwrap_or_else(|| saved.title().to_string()),
        options.body.unwrap_or_else(|| saved.body().to_string()),
    )?)
}

pub fn run(action: RealityCheckAction, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = open_session(config)?;

    match action {
        RealityCheckAction::On(options) => {
            let settings = settings(&session, options)?;
            let outcome = session.service.toggle_reality_check(true, Some(&settings));
            report(&outcome)?;
        }
        RealityCheckAction::Set(options) => {
            let settings = settings(&session, options)?;
            session.service.save_reality_check_settings(&settings)?;
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }
        RealityCheckAction::Off => {
            let outcome = session.service.toggle_reality_check(false, None);
            report(&outcome)?;
        }
        RealityCheckAction::Status => {
            let status = session.service.status();
            println!("{}", serde_json::to_string_pretty(&status.reality_check)?);
        }
    }
    Ok(())
}
