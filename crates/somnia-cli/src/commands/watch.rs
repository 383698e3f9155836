use std::time::Duration;

use somnia_core::{Config, NotificationBackend};
use tracing::info;

use super::{open_session, Session};

pub fn run(once: bool, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = open_session(config)?;
    for outcome in session.service.restore() {
        eprintln!("{}", outcome.message());
    }

    if once {
        return deliver(&session);
    }

    if session.center.pending()?.is_empty() {
        eprintln!("No active schedules. Turn one on with `somnia reminder on`.");
        return Ok(());
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(watch_loop(&session, config.watch.tick_secs.max(1)))
}

async fn watch_loop(session: &Session, tick_secs: u64) -> Result<(), Box<dyn std::error::Error>> {
    let mut interval = tokio::time::interval(Duration::from_secs(tick_secs));
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    info!(tick_secs, "watching for due notifications");
    loop {
        tokio::select! {
            _ = interval.tick() => deliver(session)?,
            _ = &mut ctrl_c => {
                info!("stopping watch");
                break;
            }
        }
    }
    Ok(())
}

fn deliver(session: &Session) -> Result<(), Box<dyn std::error::Error>> {
    for delivered in session.center.deliver_due() {
        println!("{}", serde_json::to_string(&delivered)?);
    }
    Ok(())
}
