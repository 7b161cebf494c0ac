//! In-process scheduler for the daily jobs
//!
//! Runs recurring invoice generation and retention cleanup on a fixed
//! interval. The `/internal/*` endpoints stay available for an external cron.

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

use crate::handlers::{run_cleanup, run_recurring};
use crate::state::AppState;

/// Spawn the scheduler loop; the first tick runs immediately
pub fn spawn(state: AppState) -> JoinHandle<()> {
    let period = state.config.scheduler.interval;
    info!(interval_secs = period.as_secs(), "Starting job scheduler");

    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            run_jobs(&state).await;
        }
    })
}

/// Run each job once. Failures are logged and retried on the next tick.
pub async fn run_jobs(state: &AppState) {
    if let Err(e) = run_recurring(state).await {
        error!(error = %e, "Scheduled recurring invoice run failed");
    }
    if let Err(e) = run_cleanup(state).await {
        error!(error = %e, "Scheduled cleanup failed");
    }
}
