// src/collect/snapshot.rs
//! File-backed [`PageSession`]: replays page captures stored as JSON under
//! `<dir>/<platform>/<handle>.json`. Used for offline runs and tests.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::collect::session::{PageSession, ProfilePage, RawEntry};
use crate::error::CollectError;
use crate::model::Platform;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotProfile {
    /// Optional forced outcome: `not_found`, `private`, `timeout`.
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub body_text: String,
    #[serde(default)]
    pub entries: Vec<RawEntry>,
    /// Item pages keyed by link.
    #[serde(default)]
    pub pages: BTreeMap<String, RawEntry>,
}

pub struct SnapshotSession {
    dir: PathBuf,
}

impl SnapshotSession {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, platform: Platform, handle: &str) -> PathBuf {
        self.dir
            .join(platform.as_str())
            .join(format!("{}.json", handle.trim_start_matches('@')))
    }

    async fn load(&self, platform: Platform, handle: &str) -> Result<SnapshotProfile, CollectError> {
        let path = self.path_for(platform, handle);
        let raw = read_snapshot(&path).await?;
        let profile: SnapshotProfile = serde_json::from_str(&raw).map_err(|e| {
            CollectError::Session(format!("bad snapshot {}: {e}", path.display()))
        })?;

        match profile.status.as_deref() {
            Some("not_found") => Err(CollectError::Permanent(format!(
                "{} profile @{handle} not found",
                platform.display_name()
            ))),
            Some("private") => Err(CollectError::Permanent(format!(
                "{} profile @{handle} is private",
                platform.display_name()
            ))),
            Some("timeout") => Err(CollectError::Transient(format!(
                "timed out loading @{handle}"
            ))),
            _ => Ok(profile),
        }
    }
}

async fn read_snapshot(path: &Path) -> Result<String, CollectError> {
    match fs::read_to_string(path).await {
        Ok(s) => Ok(s),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(CollectError::Permanent(
            format!("no snapshot at {}", path.display()),
        )),
        Err(e) => Err(CollectError::Transient(format!(
            "reading {}: {e}",
            path.display()
        ))),
    }
}

#[async_trait]
impl PageSession for SnapshotSession {
    async fn open_profile(
        &self,
        platform: Platform,
        handle: &str,
    ) -> Result<ProfilePage, CollectError> {
        let profile = self.load(platform, handle).await?;
        Ok(ProfilePage {
            body_text: profile.body_text,
            entries: profile.entries,
        })
    }

    async fn open_entry(
        &self,
        platform: Platform,
        handle: &str,
        link: &str,
    ) -> Result<RawEntry, CollectError> {
        let mut profile = self.load(platform, handle).await?;
        if let Some(page) = profile.pages.remove(link) {
            return Ok(page);
        }
        profile
            .entries
            .into_iter()
            .find(|e| e.link.as_deref() == Some(link))
            .ok_or_else(|| CollectError::Permanent(format!("no page captured for {link}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_snapshot_is_permanent() {
        let tmp = tempfile::tempdir().unwrap();
        let session = SnapshotSession::new(tmp.path());
        let err = session
            .open_profile(Platform::Twitter, "ghost")
            .await
            .unwrap_err();
        assert!(matches!(err, CollectError::Permanent(_)));
    }

    #[tokio::test]
    async fn forced_statuses_map_to_error_classes() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("instagram");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("slow.json"), r#"{"status":"timeout"}"#).unwrap();
        std::fs::write(dir.join("hidden.json"), r#"{"status":"private"}"#).unwrap();

        let session = SnapshotSession::new(tmp.path());
        let slow = session.open_profile(Platform::Instagram, "slow").await;
        assert!(matches!(slow, Err(CollectError::Transient(_))));
        let hidden = session.open_profile(Platform::Instagram, "@hidden").await;
        assert!(matches!(hidden, Err(CollectError::Permanent(_))));
    }

    #[tokio::test]
    async fn entry_pages_fall_back_to_listing_entries() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("instagram");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("alice.json"),
            r#"{
                "entries": [{"link": "/p/one/"}],
                "pages": {"/p/two/": {"link": "/p/two/", "texts": {"article h1": ["Second post caption"]}}}
            }"#,
        )
        .unwrap();

        let session = SnapshotSession::new(tmp.path());
        let two = session
            .open_entry(Platform::Instagram, "alice", "/p/two/")
            .await
            .unwrap();
        assert_eq!(
            two.texts_for("article h1").to_vec(),
            vec!["Second post caption".to_string()]
        );
        let one = session
            .open_entry(Platform::Instagram, "alice", "/p/one/")
            .await
            .unwrap();
        assert_eq!(one.link.as_deref(), Some("/p/one/"));
    }
}
