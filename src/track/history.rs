//! Tracking history: processed item ids per source, persisted as JSON.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::TrackingHistoryEntry;

/// `source key -> entries`, in processing order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackingHistory {
    sources: BTreeMap<String, Vec<TrackingHistoryEntry>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HistoryStats {
    pub sources: usize,
    pub items: usize,
}

impl TrackingHistory {
    /// Load from `path`; a missing file is an empty history.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(s) if s.trim().is_empty() => Ok(Self::default()),
            Ok(s) => serde_json::from_str(&s)
                .with_context(|| format!("parsing tracking history {}", path.display())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e).with_context(|| format!("reading tracking history {}", path.display())),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).context("serializing tracking history")?;
        let tmp = path.with_extension("json.tmp");
        let mut f = fs::File::create(&tmp)
            .with_context(|| format!("creating {}", tmp.display()))?;
        f.write_all(json.as_bytes())?;
        fs::rename(&tmp, path).with_context(|| format!("replacing {}", path.display()))?;
        Ok(())
    }

    pub fn contains(&self, source_key: &str, item_id: &str) -> bool {
        self.sources
            .get(source_key)
            .is_some_and(|v| v.iter().any(|e| e.item_id == item_id))
    }

    /// Append an entry. Returns `false` when the id is already known.
    pub fn record(&mut self, source_key: &str, entry: TrackingHistoryEntry) -> bool {
        let list = self.sources.entry(source_key.to_string()).or_default();
        if list.iter().any(|e| e.item_id == entry.item_id) {
            return false;
        }
        list.push(entry);
        true
    }

    pub fn stats(&self) -> HistoryStats {
        HistoryStats {
            sources: self.sources.len(),
            items: self.sources.values().map(Vec::len).sum(),
        }
    }

    /// Most recent `checked_at` across all sources.
    pub fn last_checked(&self) -> Option<DateTime<Utc>> {
        self.sources
            .values()
            .flat_map(|v| v.iter().map(|e| e.checked_at))
            .max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str) -> TrackingHistoryEntry {
        TrackingHistoryEntry {
            item_id: id.into(),
            title: format!("title {id}"),
            checked_at: Utc::now(),
            topic: "t".into(),
        }
    }

    #[test]
    fn ids_are_unique_per_source() {
        let mut h = TrackingHistory::default();
        assert!(h.record("twitter:a", entry("1")));
        assert!(!h.record("twitter:a", entry("1")));
        assert!(h.record("twitter:b", entry("1")));
        assert!(h.contains("twitter:a", "1"));
        assert!(!h.contains("twitter:a", "2"));
        assert_eq!(h.stats(), HistoryStats { sources: 2, items: 2 });
    }

    #[test]
    fn persists_as_a_plain_map() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("tracking_log.json");
        assert_eq!(TrackingHistory::load(&path).unwrap(), TrackingHistory::default());

        let mut h = TrackingHistory::default();
        h.record("youtube:@chan", entry("vid"));
        h.save(&path).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["youtube:@chan"][0]["item_id"], "vid");
        assert_eq!(TrackingHistory::load(&path).unwrap(), h);
    }

    #[test]
    fn corrupt_history_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("tracking_log.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(TrackingHistory::load(&path).is_err());
    }
}
