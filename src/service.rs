// src/service.rs
//! Operations exposed to whatever sits on top (CLI today): trigger a cycle,
//! read/replace source lists, browse records, read status.

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::collect::providers::{InstagramCollector, TwitterCollector, YoutubeCollector};
use crate::collect::snapshot::SnapshotSession;
use crate::collect::CollectorSet;
use crate::config::TrackerConfig;
use crate::enrich::{build_analyzer, Enricher};
use crate::error::{CycleError, StoreError};
use crate::model::{Platform, Source};
use crate::store::{RecordStore, RecordSummary};
use crate::track::scheduler::trigger_now;
use crate::track::{sources, CycleState, RunReport, Tracker, TrackerSettings, TrackerStatus};

#[derive(Clone)]
pub struct TrackerService {
    tracker: Arc<Tracker>,
}

impl TrackerService {
    pub fn new(tracker: Arc<Tracker>) -> Self {
        Self { tracker }
    }

    /// Wire collectors, analyzer, store and tracker from configuration.
    pub fn from_config(cfg: &TrackerConfig) -> Result<Self> {
        let collectors = build_collectors(cfg)?;
        let enricher = Enricher::new(build_analyzer(&cfg.analyzer)?);
        let store = RecordStore::new(cfg.transcripts_path());
        info!(
            target: "service",
            platforms = ?collectors.platforms(),
            analyzer = enricher.provider_name(),
            records = %store.dir().display(),
            "tracker wired"
        );
        let tracker = Tracker::new(
            TrackerSettings::from_config(cfg),
            collectors,
            enricher,
            store,
            cfg.pacer(),
        )?;
        Ok(Self::new(Arc::new(tracker)))
    }

    pub fn tracker(&self) -> &Arc<Tracker> {
        &self.tracker
    }

    /// Run a cycle on the current task and wait for it.
    pub async fn check_now(&self) -> Result<RunReport, CycleError> {
        self.tracker.run_check_cycle().await
    }

    /// Start a cycle in the background. Rejected right away when one is
    /// already running.
    pub fn trigger_cycle_now(&self) -> Result<JoinHandle<Result<RunReport, CycleError>>, CycleError> {
        if self.tracker.status().state == CycleState::Checking {
            return Err(CycleError::Busy);
        }
        Ok(trigger_now(self.tracker.clone()))
    }

    /// Sources for one platform, or all configured ones in check order.
    pub fn list_sources(&self, platform: Option<Platform>) -> Result<Vec<Source>> {
        let all = self.tracker.load_all_sources()?;
        Ok(match platform {
            Some(p) => all.into_iter().filter(|s| s.platform == p).collect(),
            None => all,
        })
    }

    /// Replace a platform's source list; returns the cleaned handles.
    pub fn update_source_list<S: AsRef<str>>(
        &self,
        platform: Platform,
        handles: &[S],
    ) -> Result<Vec<String>> {
        let path = self
            .tracker
            .settings()
            .source_list_path(platform)
            .ok_or_else(|| anyhow!("no source list configured for {platform}"))?;
        sources::save_sources(path, platform, handles)
            .with_context(|| format!("updating {platform} sources"))
    }

    pub fn list_records(
        &self,
        platform: Option<Platform>,
        limit: usize,
    ) -> Result<Vec<RecordSummary>, StoreError> {
        self.tracker.store().list(platform, limit)
    }

    pub fn get_record(&self, id: &str) -> Result<String, StoreError> {
        self.tracker.store().get(id)
    }

    pub fn status(&self) -> TrackerStatus {
        self.tracker.status()
    }
}

fn build_collectors(cfg: &TrackerConfig) -> Result<CollectorSet> {
    let retry = cfg.retry_policy();
    let pacer = cfg.pacer();
    let mut set = CollectorSet::new();

    let youtube = match cfg.snapshot_path() {
        Some(dir) => YoutubeCollector::from_dir(dir.join(Platform::Youtube.as_str())),
        None => YoutubeCollector::http(
            &cfg.collector.youtube_feed_base,
            &cfg.collector.youtube_page_base,
            cfg.request_timeout(),
        )?,
    };
    set.insert(Arc::new(youtube.with_retry(retry).with_pacer(pacer)));

    match cfg.snapshot_path() {
        Some(dir) => {
            info!(target: "service", dir = %dir.display(), "using page snapshots for twitter/instagram");
            let session = Arc::new(SnapshotSession::new(dir));
            set.insert(Arc::new(TwitterCollector::new(session.clone(), retry)));
            set.insert(Arc::new(InstagramCollector::new(session, retry, pacer)));
        }
        None => warn!(
            target: "service",
            "no page session configured; twitter/instagram sources will report errors"
        ),
    }

    Ok(set)
}
