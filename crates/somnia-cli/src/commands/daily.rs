use clap::{Args, Subcommand};
use somnia_core::{Config, DailyConfig, DailyKind, TimeOfDay};

use super::{open_session, report, Session};

#[derive(Args)]
pub struct DailyOptions {
    /// Time of day (HH:MM); keeps the saved time when omitted
    #[arg(long)]
    time: Option<String>,
    /// Notification title
    #[arg(long)]
    title: Option<String>,
    /// Notification body
    #[arg(long)]
    body: Option<String>,
}

#[derive(Subcommand)]
pub enum DailyAction {
    /// Arm the schedule
    On(DailyOptions),
    /// Save settings without arming or disarming
    Set(DailyOptions),
    /// Disarm the schedule
    Off,
    /// Print the schedule's state as JSON
    Status,
}

/// Saved settings with the given options applied on top.
fn settings(
    session: &Session,
    kind: DailyKind,
    options: DailyOptions,
) -> Result<DailyConfig, Box<dyn std::error::Error>> {
    let saved = session.service.daily_settings(kind);
    let time = match options.time {
        Some(t) => t.parse::<TimeOfDay>()?,
        None => saved.time(),
    };
    Ok(DailyConfig::new(
        time,
        options.title.unwrap_or_else(|| saved.title().to_string()),
        options.body.unwrap_or_else(|| saved.body().to_string()),
    )?)
}

pub fn run(
    kind: DailyKind,
    action: DailyAction,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = open_session(config)?;

    match action {
        DailyAction::On(options) => {
            let settings = settings(&session, kind, options)?;
            let outcome = match kind {
                DailyKind::Reminder => session.service.toggle_reminder(true, Some(&settings)),
                DailyKind::WbtbAlarm => session.service.toggle_alarm(true, Some(&settings)),
            };
            report(&outcome)?;
        }
        DailyAction::Set(options) => {
            let settings = settings(&session, kind, options)?;
            session.service.save_daily_settings(kind, &settings)?;
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }
        DailyAction::Off => {
            let outcome = match kind {
                DailyKind::Reminder => session.service.toggle_reminder(false, None),
                DailyKind::WbtbAlarm => session.service.toggle_alarm(false, None),
            };
            report(&outcome)?;
        }
        DailyAction::Status => {
            let status = session.service.status();
            let daily = match kind {
                DailyKind::Reminder => status.reminder,
                DailyKind::WbtbAlarm => status.wbtb_alarm,
            };
            println!("{}", serde_json::to_string_pretty(&daily)?);
        }
    }
    Ok(())
}
