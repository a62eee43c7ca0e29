//! Per-cycle run report.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::Source;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessedItem {
    pub item_id: String,
    pub title: String,
    pub url: String,
    pub topic: String,
    pub summary: String,
    pub record_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "lowercase")]
pub enum SourceStatus {
    Checked,
    /// Not found, private or otherwise permanently unavailable.
    Skipped(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceOutcome {
    pub source: Source,
    pub status: SourceStatus,
    pub new_items: Vec<ProcessedItem>,
    pub errors: Vec<String>,
}

impl SourceOutcome {
    pub fn new(source: Source) -> Self {
        Self {
            source,
            status: SourceStatus::Checked,
            new_items: Vec::new(),
            errors: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub sources: Vec<SourceOutcome>,
    /// Where the report file landed, if writing it succeeded.
    pub report_path: Option<PathBuf>,
}

impl RunReport {
    pub fn sources_checked(&self) -> usize {
        self.sources
            .iter()
            .filter(|s| s.status == SourceStatus::Checked)
            .count()
    }

    pub fn sources_skipped(&self) -> usize {
        self.sources.len() - self.sources_checked()
    }

    pub fn items_processed(&self) -> usize {
        self.sources.iter().map(|s| s.new_items.len()).sum()
    }

    pub fn error_count(&self) -> usize {
        self.sources.iter().map(|s| s.errors.len()).sum()
    }

    /// All errors, prefixed with their source.
    pub fn errors(&self) -> Vec<String> {
        self.sources
            .iter()
            .flat_map(|s| s.errors.iter().map(move |e| format!("{}: {e}", s.source)))
            .collect()
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Content Tracking Summary");
        let _ = writeln!(out, "Generated: {}", self.finished_at.format("%Y-%m-%d %H:%M:%S"));
        let _ = writeln!(out, "{}", "=".repeat(80));
        let _ = writeln!(out);
        let _ = writeln!(out, "Sources checked: {}", self.sources_checked());
        let _ = writeln!(out, "Sources skipped: {}", self.sources_skipped());
        let _ = writeln!(out, "Total new items found: {}", self.items_processed());
        let _ = writeln!(out, "Total processing errors: {}", self.error_count());

        for s in &self.sources {
            let _ = writeln!(out);
            let _ = writeln!(out, "{}", s.source);
            let _ = writeln!(out, "{}", "-".repeat(40));
            match &s.status {
                SourceStatus::Checked => {
                    let _ = writeln!(out, "Status: checked");
                }
                SourceStatus::Skipped(reason) => {
                    let _ = writeln!(out, "Status: skipped ({reason})");
                }
            }
            let _ = writeln!(out, "New items: {}", s.new_items.len());
            for item in &s.new_items {
                let _ = writeln!(out, "  - Title: {}", item.title);
                let _ = writeln!(out, "    ID: {}", item.item_id);
                let _ = writeln!(out, "    URL: {}", item.url);
                let _ = writeln!(out, "    Topic: {}", item.topic);
                let _ = writeln!(out, "    Summary: {}", item.summary);
                let _ = writeln!(out, "    Record: {}", item.record_id);
            }
            if !s.errors.is_empty() {
                let _ = writeln!(out, "Errors:");
                for e in &s.errors {
                    let _ = writeln!(out, "  - {e}");
                }
            }
        }
        out
    }

    /// Write `summary_YYYYmmdd_HHMMSS.txt` under `dir`.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        let path = dir.join(format!(
            "summary_{}.txt",
            self.finished_at.format("%Y%m%d_%H%M%S")
        ));
        fs::write(&path, self.render())
            .with_context(|| format!("writing report {}", path.display()))?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Platform;
    use chrono::TimeZone;

    fn report() -> RunReport {
        let ts = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();
        let mut ok = SourceOutcome::new(Source::new(Platform::Youtube, "@chan"));
        ok.new_items.push(ProcessedItem {
            item_id: "v1".into(),
            title: "Video".into(),
            url: "https://www.youtube.com/watch?v=v1".into(),
            topic: "Topic".into(),
            summary: "Summary".into(),
            record_id: "youtube_chan_v1".into(),
        });
        ok.errors.push("v2: analysis failed: empty response".into());
        let mut gone = SourceOutcome::new(Source::new(Platform::Twitter, "ghost"));
        gone.status = SourceStatus::Skipped("not found".into());
        RunReport {
            started_at: ts,
            finished_at: ts,
            sources: vec![ok, gone],
            report_path: None,
        }
    }

    #[test]
    fn counts_and_rendering() {
        let r = report();
        assert_eq!(r.sources_checked(), 1);
        assert_eq!(r.sources_skipped(), 1);
        assert_eq!(r.items_processed(), 1);
        assert_eq!(r.error_count(), 1);
        assert_eq!(
            r.errors(),
            vec!["YouTube @chan: v2: analysis failed: empty response"]
        );

        let text = r.render();
        assert!(text.contains("Generated: 2024-05-06 07:08:09"));
        assert!(text.contains("Total new items found: 1"));
        assert!(text.contains("Status: skipped (not found)"));
        assert!(text.contains("    Record: youtube_chan_v1"));
    }

    #[test]
    fn report_file_is_timestamped() {
        let tmp = tempfile::tempdir().unwrap();
        let path = report().write_to(tmp.path()).unwrap();
        assert_eq!(path.file_name().unwrap(), "summary_20240506_070809.txt");
        assert!(std::fs::read_to_string(path).unwrap().starts_with("Content Tracking Summary"));
    }
}
