//! Opaque platform session capability.
//!
//! Browser automation lives outside this crate. Whatever drives the browser
//! hands back pages as [`RawEntry`] records: text found under named
//! selectors, media attribute values, accessibility labels. Adapters only
//! interpret those records.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CollectError;
use crate::model::Platform;

/// One candidate item as seen on a page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEntry {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    /// Inner text per selector, in document order.
    #[serde(default)]
    pub texts: BTreeMap<String, Vec<String>>,
    /// Media source URLs per element kind (`video`, `img`).
    #[serde(default)]
    pub media: BTreeMap<String, Vec<String>>,
    /// Accessibility labels of engagement buttons.
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl RawEntry {
    pub fn texts_for(&self, selector: &str) -> &[String] {
        self.texts.get(selector).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn media_for(&self, kind: &str) -> &[String] {
        self.media.get(kind).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// A loaded profile page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfilePage {
    /// Visible page text, used to detect "not found"/"private" banners.
    #[serde(default)]
    pub body_text: String,
    #[serde(default)]
    pub entries: Vec<RawEntry>,
}

#[async_trait]
pub trait PageSession: Send + Sync {
    /// Load the profile listing for `handle`.
    async fn open_profile(
        &self,
        platform: Platform,
        handle: &str,
    ) -> Result<ProfilePage, CollectError>;

    /// Load a single item page by link.
    async fn open_entry(
        &self,
        platform: Platform,
        handle: &str,
        link: &str,
    ) -> Result<RawEntry, CollectError>;
}

/// Case-insensitive check for any unavailability marker in page text.
pub fn find_marker<'a>(body: &str, markers: &[&'a str]) -> Option<&'a str> {
    let lower = body.to_lowercase();
    markers
        .iter()
        .copied()
        .find(|m| lower.contains(&m.to_lowercase()))
}
