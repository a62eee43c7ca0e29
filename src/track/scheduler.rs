// src/track/scheduler.rs
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::error::CycleError;
use crate::track::{RunReport, Tracker};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SchedulerCfg {
    /// Minimum time between cycle starts.
    pub check_interval: Duration,
    /// How often the loop wakes up to look at the clock.
    pub poll_interval: Duration,
    pub run_on_start: bool,
}

impl SchedulerCfg {
    pub fn from_config(cfg: &crate::config::TrackerConfig) -> Self {
        Self {
            check_interval: cfg.check_interval(),
            poll_interval: cfg.poll_interval(),
            run_on_start: cfg.schedule.run_on_start,
        }
    }
}

/// Run the scheduled loop until `shutdown` resolves.
pub async fn run_until<F>(tracker: Arc<Tracker>, cfg: SchedulerCfg, shutdown: F)
where
    F: Future<Output = ()>,
{
    tokio::select! {
        _ = schedule_loop(tracker, cfg) => {}
        _ = shutdown => info!(target: "scheduler", "shutdown requested"),
    }
}

/// Spawn the scheduled loop as a background task.
pub fn spawn_scheduler(tracker: Arc<Tracker>, cfg: SchedulerCfg) -> JoinHandle<()> {
    tokio::spawn(schedule_loop(tracker, cfg))
}

/// Start a cycle on its own task. The result is `Err(CycleError::Busy)` if a
/// cycle is already running.
pub fn trigger_now(tracker: Arc<Tracker>) -> JoinHandle<Result<RunReport, CycleError>> {
    tokio::spawn(async move {
        info!(target: "scheduler", "on-demand check cycle requested");
        tracker.run_check_cycle().await
    })
}

async fn schedule_loop(tracker: Arc<Tracker>, cfg: SchedulerCfg) {
    let mut ticker = tokio::time::interval(cfg.poll_interval.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut last_start: Option<Instant> = if cfg.run_on_start {
        None
    } else {
        Some(Instant::now())
    };
    info!(
        target: "scheduler",
        check_interval_secs = cfg.check_interval.as_secs(),
        poll_interval_secs = cfg.poll_interval.as_secs(),
        run_on_start = cfg.run_on_start,
        "scheduler started"
    );

    loop {
        ticker.tick().await;
        let due = last_start.map_or(true, |t| t.elapsed() >= cfg.check_interval);
        if !due {
            continue;
        }
        last_start = Some(Instant::now());

        // A panicking cycle only takes its own task down.
        let cycle = tracker.clone();
        match tokio::spawn(async move { cycle.run_check_cycle().await }).await {
            Ok(Ok(report)) => info!(
                target: "scheduler",
                processed = report.items_processed(),
                errors = report.error_count(),
                "scheduled cycle done"
            ),
            Ok(Err(CycleError::Busy)) => {
                debug!(target: "scheduler", "tick skipped; cycle already running")
            }
            Ok(Err(e)) => error!(target: "scheduler", error = %e, "scheduled cycle failed"),
            Err(e) => error!(target: "scheduler", error = %e, "scheduled cycle panicked"),
        }
    }
}
