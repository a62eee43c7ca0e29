// src/store/mod.rs
//! Flat-file record store. One text document per processed item; the
//! directory listing is the index.

pub mod document;

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use metrics::counter;
use serde::Serialize;
use tracing::{debug, warn};

use crate::collect::derive_item_id;
use crate::error::StoreError;
use crate::model::{AnalysisResult, Item, Platform};

const EXT: &str = "txt";

/// Listing entry for a stored record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordSummary {
    pub id: String,
    pub filename: String,
    /// Taken from the filename prefix; `None` for foreign files.
    pub platform: Option<Platform>,
    pub size_bytes: u64,
    pub modified: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct RecordStore {
    dir: PathBuf,
}

impl RecordStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Deterministic id: `{platform}_{handle}_{item_id}` with handle and id
    /// reduced to alphanumerics, `_` and `-`.
    pub fn record_id(item: &Item) -> String {
        let handle = sanitize(item.handle.trim_start_matches('@'));
        let mut id = sanitize(&item.item_id);
        if id.is_empty() {
            id = derive_item_id(&[&item.item_id]);
        }
        format!("{}_{}_{}", item.platform.as_str(), handle, id)
    }

    /// Write the record, replacing any previous one with the same id.
    pub fn save(&self, item: &Item, analysis: &AnalysisResult) -> Result<String, StoreError> {
        self.save_at(item, analysis, Utc::now())
    }

    pub fn save_at(
        &self,
        item: &Item,
        analysis: &AnalysisResult,
        processed_at: DateTime<Utc>,
    ) -> Result<String, StoreError> {
        fs::create_dir_all(&self.dir)?;
        let id = Self::record_id(item);
        let path = self.path_for(&id);
        let body = document::render(item, analysis, processed_at);
        write_atomic(&path, body.as_bytes())?;

        counter!("store_records_written_total").increment(1);
        debug!(target: "store", record = %id, bytes = body.len(), "record written");
        Ok(id)
    }

    /// Records sorted by modification time, newest first.
    pub fn list(
        &self,
        platform: Option<Platform>,
        limit: usize,
    ) -> Result<Vec<RecordSummary>, StoreError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(e) => e,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut out = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some(EXT) {
                continue;
            }
            let Some(id) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
                continue;
            };
            let record_platform = platform_of(&id);
            if platform.is_some() && record_platform != platform {
                continue;
            }
            let meta = match entry.metadata() {
                Ok(m) if m.is_file() => m,
                Ok(_) => continue,
                Err(e) => {
                    warn!(target: "store", path = %path.display(), error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            let modified = meta
                .modified()
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(|_| Utc::now());
            out.push(RecordSummary {
                filename: format!("{id}.{EXT}"),
                id,
                platform: record_platform,
                size_bytes: meta.len(),
                modified,
            });
        }

        out.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| a.id.cmp(&b.id)));
        out.truncate(limit);
        Ok(out)
    }

    /// Record content by id, with or without the `.txt` suffix.
    pub fn get(&self, id: &str) -> Result<String, StoreError> {
        let id = validate_id(id)?;
        match fs::read_to_string(self.path_for(id)) {
            Ok(s) => Ok(s),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.{EXT}"))
    }
}

fn sanitize(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}

fn platform_of(id: &str) -> Option<Platform> {
    let (prefix, _) = id.split_once('_')?;
    Platform::ALL.into_iter().find(|p| p.as_str() == prefix)
}

fn validate_id(id: &str) -> Result<&str, StoreError> {
    let trimmed = id.trim();
    let stem = trimmed.strip_suffix(".txt").unwrap_or(trimmed);
    if stem.is_empty()
        || stem.contains(['/', '\\', '\0'])
        || stem.contains("..")
    {
        return Err(StoreError::InvalidId(id.to_string()));
    }
    Ok(stem)
}

fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let tmp = path.with_extension("txt.tmp");
    let mut f = fs::File::create(&tmp)?;
    f.write_all(bytes)?;
    f.sync_all()?;
    fs::rename(tmp, path)
}
