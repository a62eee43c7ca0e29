// src/config/mod.rs
//! Tracker configuration.
//!
//! Lookup order:
//! 1) $TRACKER_CONFIG_PATH
//! 2) config/tracker.toml
//! 3) built-in defaults
//!
//! `RECENT_HOURS` and `MAX_VIDEOS_TO_CHECK` override the collector section.

pub mod analyzer;

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::model::Platform;
use crate::pacing::{Pacer, RetryPolicy};

pub use analyzer::AnalyzerConfig;

const ENV_PATH: &str = "TRACKER_CONFIG_PATH";
const DEFAULT_PATH: &str = "config/tracker.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceListConfig {
    pub platform: Platform,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub check_interval_hours: u64,
    pub poll_interval_secs: u64,
    pub run_on_start: bool,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            check_interval_hours: 6,
            poll_interval_secs: 60,
            run_on_start: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    pub source_delay_secs: u64,
    pub item_delay_secs: u64,
    pub analyzer_delay_secs: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            source_delay_secs: 5,
            item_delay_secs: 2,
            analyzer_delay_secs: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    pub max_items: usize,
    pub youtube_max_items: usize,
    pub recent_hours: u64,
    pub retry_attempts: u32,
    pub retry_backoff_secs: u64,
    /// Page captures for the Twitter/Instagram session and YouTube feeds.
    pub snapshot_dir: Option<PathBuf>,
    pub youtube_feed_base: String,
    /// Serves `/@handle` channel pages for channel id lookup.
    pub youtube_page_base: String,
    /// Per-request timeout for platform HTTP calls.
    pub request_timeout_secs: u64,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            max_items: 10,
            youtube_max_items: 2,
            recent_hours: 48,
            retry_attempts: 3,
            retry_backoff_secs: 10,
            snapshot_dir: None,
            youtube_feed_base: crate::collect::providers::youtube::DEFAULT_FEED_BASE.to_string(),
            youtube_page_base: crate::collect::providers::youtube::DEFAULT_PAGE_BASE.to_string(),
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Base directory for every relative path below.
    pub data_dir: PathBuf,
    pub transcripts_dir: PathBuf,
    pub results_dir: PathBuf,
    pub history_file: PathBuf,
    /// Platforms are checked in this order.
    pub sources: Vec<SourceListConfig>,
    pub schedule: ScheduleConfig,
    pub pacing: PacingConfig,
    pub collector: CollectorConfig,
    pub analyzer: AnalyzerConfig,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            transcripts_dir: PathBuf::from("transcripts/social_media"),
            results_dir: PathBuf::from("tracking_results"),
            history_file: PathBuf::from("tracking_log.json"),
            sources: vec![
                SourceListConfig {
                    platform: Platform::Youtube,
                    path: PathBuf::from("channels.txt"),
                },
                SourceListConfig {
                    platform: Platform::Twitter,
                    path: PathBuf::from("handletwitter.txt"),
                },
                SourceListConfig {
                    platform: Platform::Instagram,
                    path: PathBuf::from("handleinstagram.txt"),
                },
            ],
            schedule: ScheduleConfig::default(),
            pacing: PacingConfig::default(),
            collector: CollectorConfig::default(),
            analyzer: AnalyzerConfig::default(),
        }
    }
}

impl TrackerConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let mut cfg: TrackerConfig =
            toml::from_str(&data).with_context(|| format!("parsing {}", path.display()))?;
        cfg.finish();
        info!(target: "config", path = %path.display(), "config loaded");
        Ok(cfg)
    }

    /// Load using env var + fallbacks (see module docs).
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = env::var(ENV_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from_file(&pb);
            }
            return Err(anyhow!("{ENV_PATH} points to non-existent path"));
        }
        let default_p = PathBuf::from(DEFAULT_PATH);
        if default_p.exists() {
            return Self::load_from_file(&default_p);
        }
        let mut cfg = Self::default();
        cfg.finish();
        Ok(cfg)
    }

    fn finish(&mut self) {
        self.apply_env_overrides();
        self.sanitize();
    }

    pub fn apply_env_overrides(&mut self) {
        if let Some(h) = env_number::<u64>("RECENT_HOURS") {
            self.collector.recent_hours = h;
        }
        if let Some(n) = env_number::<usize>("MAX_VIDEOS_TO_CHECK") {
            self.collector.youtube_max_items = n;
        }
    }

    /// Replace zero/empty values that would stall or disable the tracker.
    pub fn sanitize(&mut self) {
        let d = Self::default();
        if self.schedule.check_interval_hours == 0 {
            self.schedule.check_interval_hours = d.schedule.check_interval_hours;
        }
        if self.schedule.poll_interval_secs == 0 {
            self.schedule.poll_interval_secs = d.schedule.poll_interval_secs;
        }
        if self.collector.max_items == 0 {
            self.collector.max_items = d.collector.max_items;
        }
        if self.collector.youtube_max_items == 0 {
            self.collector.youtube_max_items = d.collector.youtube_max_items;
        }
        if self.collector.recent_hours == 0 {
            self.collector.recent_hours = d.collector.recent_hours;
        }
        if self.collector.retry_attempts == 0 {
            self.collector.retry_attempts = 1;
        }
        if self.collector.youtube_feed_base.trim().is_empty() {
            self.collector.youtube_feed_base = d.collector.youtube_feed_base;
        }
        if self.collector.youtube_page_base.trim().is_empty() {
            self.collector.youtube_page_base = d.collector.youtube_page_base;
        }
        if self.collector.request_timeout_secs == 0 {
            self.collector.request_timeout_secs = d.collector.request_timeout_secs;
        }
        self.analyzer.sanitize();
    }

    /// Resolve a configured path against `data_dir`.
    pub fn resolve(&self, p: &Path) -> PathBuf {
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.data_dir.join(p)
        }
    }

    pub fn transcripts_path(&self) -> PathBuf {
        self.resolve(&self.transcripts_dir)
    }

    pub fn results_path(&self) -> PathBuf {
        self.resolve(&self.results_dir)
    }

    pub fn history_path(&self) -> PathBuf {
        self.resolve(&self.history_file)
    }

    pub fn snapshot_path(&self) -> Option<PathBuf> {
        self.collector.snapshot_dir.as_deref().map(|p| self.resolve(p))
    }

    /// Source lists with resolved paths, in configured order.
    pub fn source_lists(&self) -> Vec<SourceListConfig> {
        self.sources
            .iter()
            .map(|s| SourceListConfig {
                platform: s.platform,
                path: self.resolve(&s.path),
            })
            .collect()
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.collector.retry_attempts,
            Duration::from_secs(self.collector.retry_backoff_secs),
        )
    }

    pub fn pacer(&self) -> Pacer {
        Pacer {
            between_sources: Duration::from_secs(self.pacing.source_delay_secs),
            between_items: Duration::from_secs(self.pacing.item_delay_secs),
            between_requests: Duration::from_secs(self.pacing.analyzer_delay_secs),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.collector.request_timeout_secs)
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.schedule.check_interval_hours * 3600)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.schedule.poll_interval_secs)
    }
}

fn env_number<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = env::var(key).ok()?;
    match raw.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(target: "config", key, value = %raw, "ignoring non-numeric override");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for k in [ENV_PATH, "RECENT_HOURS", "MAX_VIDEOS_TO_CHECK"] {
            env::remove_var(k);
        }
    }

    #[test]
    #[serial]
    fn partial_toml_keeps_defaults() {
        clear_env();
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("tracker.toml");
        fs::write(
            &path,
            r#"
data_dir = "/srv/tracker"

[[sources]]
platform = "twitter"
path = "lists/twitter.txt"

[schedule]
check_interval_hours = 0

[analyzer]
provider = "Mock"
"#,
        )
        .unwrap();

        let cfg = TrackerConfig::load_from_file(&path).unwrap();
        assert_eq!(cfg.sources.len(), 1);
        assert_eq!(cfg.schedule.check_interval_hours, 6);
        assert_eq!(cfg.schedule.poll_interval_secs, 60);
        assert_eq!(cfg.pacing.source_delay_secs, 5);
        assert_eq!(cfg.analyzer.provider, "mock");
        assert_eq!(
            cfg.source_lists()[0].path,
            PathBuf::from("/srv/tracker/lists/twitter.txt")
        );
        assert_eq!(
            cfg.history_path(),
            PathBuf::from("/srv/tracker/tracking_log.json")
        );
    }

    #[test]
    #[serial]
    fn request_timeout_is_separate_from_the_analyzer() {
        clear_env();
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("tracker.toml");
        fs::write(
            &path,
            "[collector]\nrequest_timeout_secs = 7\n\n[analyzer]\ntimeout_secs = 90\n",
        )
        .unwrap();
        let cfg = TrackerConfig::load_from_file(&path).unwrap();
        assert_eq!(cfg.request_timeout(), Duration::from_secs(7));
        assert_eq!(cfg.analyzer.timeout_secs, 90);

        fs::write(&path, "[collector]\nrequest_timeout_secs = 0\n").unwrap();
        let cfg = TrackerConfig::load_from_file(&path).unwrap();
        assert_eq!(cfg.request_timeout(), Duration::from_secs(30));
        assert_eq!(cfg.collector.youtube_page_base, "https://www.youtube.com");
    }

    #[test]
    #[serial]
    fn unknown_platform_is_rejected() {
        clear_env();
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("tracker.toml");
        fs::write(&path, "[[sources]]\nplatform = \"myspace\"\npath = \"x.txt\"\n").unwrap();
        assert!(TrackerConfig::load_from_file(&path).is_err());
    }

    #[test]
    #[serial]
    fn env_overrides_and_fallbacks() {
        clear_env();
        let old = env::current_dir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        env::set_current_dir(tmp.path()).unwrap();

        env::set_var("RECENT_HOURS", "12");
        env::set_var("MAX_VIDEOS_TO_CHECK", "lots");
        let cfg = TrackerConfig::load_default().unwrap();
        assert_eq!(cfg.collector.recent_hours, 12);
        assert_eq!(cfg.collector.youtube_max_items, 2);
        assert_eq!(cfg.sources.len(), 3);

        env::set_var(ENV_PATH, tmp.path().join("missing.toml").display().to_string());
        assert!(TrackerConfig::load_default().is_err());

        clear_env();
        env::set_current_dir(&old).unwrap();
    }
}
