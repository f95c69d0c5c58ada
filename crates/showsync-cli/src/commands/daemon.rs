use super::sync::{print_report, Engine};
use crate::output::Output;
use chrono::{DateTime, Utc};
use color_eyre::Result;
use showsync_core::{SyncError, SyncKind};
use std::time::Duration;
use tracing::{error, info};

/// Time to wait before the next pass: the interval, or longer while the
/// back-off after failed passes is in effect.
pub fn next_run_delay(interval: Duration, next_allowed: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Duration {
    let backoff = next_allowed
        .and_then(|next| (next - now).to_std().ok())
        .unwrap_or(Duration::ZERO);
    interval.max(backoff)
}

pub async fn run_daemon(interval_override: Option<u64>, no_startup_sync: bool, output: &Output) -> Result<()> {
    let engine = Engine::load(true, true)?;
    let interval_minutes = interval_override.unwrap_or(engine.config.scheduler.interval_minutes).max(1);
    let interval = Duration::from_secs(interval_minutes.saturating_mul(60));
    let run_on_startup = engine.config.scheduler.run_on_startup && !no_startup_sync;
    engine.cancel_on_ctrl_c();

    info!(
        operation = "daemon_started",
        interval_minutes,
        run_on_startup,
        "Daemon started"
    );
    output.info(format!("Syncing every {} minutes, press Ctrl-C to stop", interval_minutes));

    if run_on_startup && !run_pass(&engine, output).await {
        return Ok(());
    }

    loop {
        let next_allowed = engine.ctx.state.lock().next_allowed_sync();
        let wait = next_run_delay(interval, next_allowed, Utc::now());
        info!(operation = "daemon_wait", wait_secs = wait.as_secs(), "Waiting for next sync");
        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            _ = engine.ctx.cancel.cancelled() => break,
        }
        if !run_pass(&engine, output).await {
            break;
        }
    }

    info!(operation = "daemon_stopped", "Daemon stopped");
    output.info("Daemon stopped");
    Ok(())
}

/// Returns false once the daemon should stop.
async fn run_pass(engine: &Engine, output: &Output) -> bool {
    info!(operation = "scheduled_sync_start", "Starting scheduled sync");
    match engine.run(SyncKind::Delta).await {
        Ok(report) => {
            info!(
                operation = "scheduled_sync_complete",
                outcome = %report.outcome,
                "Scheduled sync completed"
            );
            print_report(&report, output);
            true
        }
        Err(SyncError::Interrupted) => false,
        Err(e) => {
            error!(operation = "scheduled_sync_error", error = %e, "Scheduled sync failed");
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_extends_interval() {
        let now = Utc::now();
        let interval = Duration::from_secs(600);
        assert_eq!(next_run_delay(interval, None, now), interval);
        assert_eq!(next_run_delay(interval, Some(now - chrono::Duration::hours(1)), now), interval);
        let later = next_run_delay(interval, Some(now + chrono::Duration::hours(1)), now);
        assert_eq!(later, Duration::from_secs(3600));
    }
}
