// src/track/mod.rs
//! Check cycles: sources -> collect -> dedup -> enrich -> store -> history.

pub mod history;
pub mod report;
pub mod scheduler;
pub mod sources;

use std::path::{Path, PathBuf};
use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};
use metrics::{counter, gauge};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

use crate::collect::CollectorSet;
use crate::config::{SourceListConfig, TrackerConfig};
use crate::enrich::Enricher;
use crate::error::{CollectError, CycleError};
use crate::model::{Item, Platform, Source, TrackingHistoryEntry};
use crate::pacing::Pacer;
use crate::store::RecordStore;
use crate::telemetry::ensure_metrics_described;

pub use history::{HistoryStats, TrackingHistory};
pub use report::{ProcessedItem, RunReport, SourceOutcome, SourceStatus};

/// Per-cycle knobs taken from [`TrackerConfig`].
#[derive(Debug, Clone)]
pub struct TrackerSettings {
    pub source_lists: Vec<SourceListConfig>,
    pub max_items: usize,
    pub youtube_max_items: usize,
    pub recency: Option<Duration>,
    pub history_file: PathBuf,
    pub results_dir: PathBuf,
}

impl TrackerSettings {
    pub fn from_config(cfg: &TrackerConfig) -> Self {
        Self {
            source_lists: cfg.source_lists(),
            max_items: cfg.collector.max_items,
            youtube_max_items: cfg.collector.youtube_max_items,
            recency: Some(Duration::hours(cfg.collector.recent_hours as i64)),
            history_file: cfg.history_path(),
            results_dir: cfg.results_path(),
        }
    }

    fn limit_for(&self, platform: Platform) -> usize {
        match platform {
            Platform::Youtube => self.youtube_max_items,
            _ => self.max_items,
        }
    }

    pub fn source_list_path(&self, platform: Platform) -> Option<&Path> {
        self.source_lists
            .iter()
            .find(|s| s.platform == platform)
            .map(|s| s.path.as_path())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CycleState {
    Idle,
    Checking,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackerStatus {
    pub state: CycleState,
    pub sources_tracked: usize,
    pub items_tracked: usize,
    pub cycles_run: u64,
    pub last_check: Option<DateTime<Utc>>,
    pub last_report: Option<PathBuf>,
}

/// Mutable state, only touched while the cycle lock is held.
struct CycleContext {
    history: TrackingHistory,
    cycles_run: u64,
    last_check: Option<DateTime<Utc>>,
    last_report: Option<PathBuf>,
}

impl CycleContext {
    fn snapshot(&self, state: CycleState) -> TrackerStatus {
        let stats = self.history.stats();
        TrackerStatus {
            state,
            sources_tracked: stats.sources,
            items_tracked: stats.items,
            cycles_run: self.cycles_run,
            last_check: self.last_check,
            last_report: self.last_report.clone(),
        }
    }
}

pub struct Tracker {
    settings: TrackerSettings,
    collectors: CollectorSet,
    enricher: Enricher,
    store: RecordStore,
    pacer: Pacer,
    ctx: Mutex<CycleContext>,
    status: RwLock<TrackerStatus>,
}

impl Tracker {
    /// Build a tracker, loading history from `settings.history_file`.
    pub fn new(
        settings: TrackerSettings,
        collectors: CollectorSet,
        enricher: Enricher,
        store: RecordStore,
        pacer: Pacer,
    ) -> anyhow::Result<Self> {
        ensure_metrics_described();
        let history = TrackingHistory::load(&settings.history_file)?;
        let ctx = CycleContext {
            last_check: history.last_checked(),
            history,
            cycles_run: 0,
            last_report: None,
        };
        let status = RwLock::new(ctx.snapshot(CycleState::Idle));
        info!(
            target: "track",
            sources = ctx.history.stats().sources,
            items = ctx.history.stats().items,
            "tracker ready"
        );
        Ok(Self {
            settings,
            collectors,
            enricher,
            store,
            pacer,
            ctx: Mutex::new(ctx),
            status,
        })
    }

    pub fn settings(&self) -> &TrackerSettings {
        &self.settings
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Current status. Never waits on a running cycle.
    pub fn status(&self) -> TrackerStatus {
        match self.status.read() {
            Ok(s) => s.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn publish_status(&self, snapshot: TrackerStatus) {
        match self.status.write() {
            Ok(mut s) => *s = snapshot,
            Err(poisoned) => *poisoned.into_inner() = snapshot,
        }
    }

    /// Sources in configured platform order, then file order.
    pub fn load_all_sources(&self) -> anyhow::Result<Vec<Source>> {
        let mut out = Vec::new();
        for list in &self.settings.source_lists {
            for handle in sources::load_sources(&list.path)? {
                out.push(Source::new(list.platform, handle));
            }
        }
        Ok(out)
    }

    /// Run one full check cycle. Rejected with [`CycleError::Busy`] while
    /// another cycle holds the lock.
    #[instrument(level = "info", skip(self))]
    pub async fn run_check_cycle(&self) -> Result<RunReport, CycleError> {
        let Ok(mut ctx) = self.ctx.try_lock() else {
            counter!("tracker_cycles_rejected_total").increment(1);
            warn!(target: "track", "check cycle already running; trigger rejected");
            return Err(CycleError::Busy);
        };
        self.publish_status(ctx.snapshot(CycleState::Checking));

        let result = self.cycle(&mut ctx).await;

        ctx.cycles_run += 1;
        counter!("tracker_cycles_total").increment(1);
        if let Err(e) = &result {
            error!(target: "track", error = %e, "check cycle aborted");
        }
        self.publish_status(ctx.snapshot(CycleState::Idle));
        result
    }

    async fn cycle(&self, ctx: &mut CycleContext) -> Result<RunReport, CycleError> {
        let started_at = Utc::now();
        ctx.last_check = Some(started_at);
        gauge!("tracker_last_cycle_ts").set(started_at.timestamp() as f64);

        let sources = self.load_all_sources()?;
        info!(target: "track", sources = sources.len(), "check cycle started");

        let total = sources.len();
        let mut outcomes = Vec::with_capacity(total);
        for (idx, source) in sources.into_iter().enumerate() {
            let outcome = self.check_source(&mut ctx.history, source).await;
            counter!("tracker_items_processed_total").increment(outcome.new_items.len() as u64);
            counter!("tracker_errors_total").increment(outcome.errors.len() as u64);
            if matches!(outcome.status, SourceStatus::Skipped(_)) {
                counter!("tracker_sources_skipped_total").increment(1);
            }
            outcomes.push(outcome);
            self.pacer.after_source(idx, total).await;
        }

        if let Err(e) = ctx.history.save(&self.settings.history_file) {
            error!(target: "track", error = %e, "failed to persist tracking history");
        }

        let mut report = RunReport {
            started_at,
            finished_at: Utc::now(),
            sources: outcomes,
            report_path: None,
        };
        match report.write_to(&self.settings.results_dir) {
            Ok(path) => {
                ctx.last_report = Some(path.clone());
                report.report_path = Some(path);
            }
            Err(e) => error!(target: "track", error = %e, "failed to write run report"),
        }

        info!(
            target: "track",
            checked = report.sources_checked(),
            skipped = report.sources_skipped(),
            processed = report.items_processed(),
            errors = report.error_count(),
            "check cycle finished"
        );
        Ok(report)
    }

    #[instrument(level = "info", skip(self, history, source), fields(source = %source))]
    async fn check_source(&self, history: &mut TrackingHistory, source: Source) -> SourceOutcome {
        let mut outcome = SourceOutcome::new(source.clone());
        let Some(collector) = self.collectors.get(source.platform) else {
            outcome
                .errors
                .push(format!("no collector configured for {}", source.platform));
            return outcome;
        };

        let limit = self.settings.limit_for(source.platform);
        let fetched = match collector
            .fetch_recent(&source.handle, limit, self.settings.recency)
            .await
        {
            Ok(fetched) => fetched,
            Err(CollectError::Permanent(reason)) => {
                warn!(target: "track", %reason, "source skipped");
                outcome.status = SourceStatus::Skipped(reason);
                return outcome;
            }
            Err(e) => {
                warn!(target: "track", error = %e, "collection failed");
                outcome.errors.push(e.to_string());
                return outcome;
            }
        };

        for e in fetched.errors {
            warn!(target: "track", error = %e, "item could not be collected");
            outcome.errors.push(e);
        }

        let key = source.key();
        let mut fresh: Vec<Item> = Vec::new();
        for item in fetched.items {
            if history.contains(&key, &item.item_id)
                || fresh.iter().any(|f| f.item_id == item.item_id)
            {
                continue;
            }
            fresh.push(item);
        }
        debug!(target: "track", new = fresh.len(), "new items after dedup");

        for (idx, item) in fresh.iter().enumerate() {
            self.pacer.before_request(idx).await;
            match self.process_item(item).await {
                Ok(processed) => {
                    history.record(
                        &key,
                        TrackingHistoryEntry {
                            item_id: item.item_id.clone(),
                            title: item.title.clone(),
                            checked_at: Utc::now(),
                            topic: processed.topic.clone(),
                        },
                    );
                    outcome.new_items.push(processed);
                }
                Err(e) => {
                    warn!(target: "track", item_id = %item.item_id, error = %e, "item dropped");
                    outcome.errors.push(format!("{}: {e}", item.item_id));
                }
            }
        }

        outcome
    }

    async fn process_item(&self, item: &Item) -> anyhow::Result<ProcessedItem> {
        let analysis = self
            .enricher
            .analyze(&item.analysis_text(), item.platform, &item.handle)
            .await
            .map_err(|e| anyhow::anyhow!("analysis failed: {e}"))?;
        let record_id = self
            .store
            .save(item, &analysis)
            .map_err(|e| anyhow::anyhow!("saving record failed: {e}"))?;
        Ok(ProcessedItem {
            item_id: item.item_id.clone(),
            title: item.title.clone(),
            url: item.url.clone(),
            topic: analysis.topic,
            summary: analysis.summary,
            record_id,
        })
    }
}
