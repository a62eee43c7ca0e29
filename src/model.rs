//! Core data model: sources, fetched items, analysis results and tracking history entries.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Platforms a source can live on. The lower-case name is used in record
/// filenames, history keys and list filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Youtube,
    Twitter,
    Instagram,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::Youtube, Platform::Twitter, Platform::Instagram];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Youtube => "youtube",
            Platform::Twitter => "twitter",
            Platform::Instagram => "instagram",
        }
    }

    /// Human-facing name used in prompts and report headers.
    pub fn display_name(&self) -> &'static str {
        match self {
            Platform::Youtube => "YouTube",
            Platform::Twitter => "Twitter",
            Platform::Instagram => "Instagram",
        }
    }

    /// What one unit of content is called on this platform.
    pub fn item_noun(&self) -> &'static str {
        match self {
            Platform::Youtube => "video",
            Platform::Twitter => "tweet",
            Platform::Instagram => "post",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "youtube" | "yt" => Ok(Platform::Youtube),
            "twitter" | "x" => Ok(Platform::Twitter),
            "instagram" | "ig" => Ok(Platform::Instagram),
            other => anyhow::bail!("unknown platform: {other}"),
        }
    }
}

/// A platform + handle pair being tracked.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Source {
    pub platform: Platform,
    pub handle: String,
}

impl Source {
    pub fn new(platform: Platform, handle: impl Into<String>) -> Self {
        Self {
            platform,
            handle: handle.into(),
        }
    }

    /// Key used by the tracking history, e.g. `twitter:alice`.
    pub fn key(&self) -> String {
        format!("{}:{}", self.platform, self.handle)
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} @{}",
            self.platform.display_name(),
            self.handle.trim_start_matches('@')
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Audio,
}

/// Reference to a piece of media attached to an item. Only the location is
/// kept; downloading is up to whoever consumes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef {
    pub kind: MediaKind,
    pub url: String,
}

/// Platform-specific extras rendered into the record's trailing block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemMetadata {
    #[serde(default)]
    pub hashtags: Vec<String>,
    #[serde(default)]
    pub mentions: Vec<String>,
    pub likes: Option<u64>,
    pub reposts: Option<u64>,
    pub replies: Option<u64>,
}

impl ItemMetadata {
    pub fn is_empty(&self) -> bool {
        self.hashtags.is_empty()
            && self.mentions.is_empty()
            && self.likes.is_none()
            && self.reposts.is_none()
            && self.replies.is_none()
    }
}

/// One unit of content fetched from a source. Never mutated after the
/// collector hands it out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub item_id: String,
    pub platform: Platform,
    pub handle: String,
    pub url: String,
    pub title: String,
    pub raw_text: String,
    #[serde(default)]
    pub media_refs: Vec<MediaRef>,
    /// Publication time as reported by the platform, when known.
    pub timestamp: Option<DateTime<Utc>>,
    pub fetched_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: ItemMetadata,
}

impl Item {
    pub fn has_content(&self) -> bool {
        !self.raw_text.trim().is_empty() || !self.media_refs.is_empty()
    }

    /// Text sent to the analyzer: the raw text plus hashtag/mention lines.
    pub fn analysis_text(&self) -> String {
        let mut text = self.raw_text.trim().to_string();
        if !self.metadata.hashtags.is_empty() && !text.contains(&self.metadata.hashtags[0]) {
            text.push_str("\n\nHashtags: ");
            text.push_str(&self.metadata.hashtags.join(" "));
        }
        if !self.metadata.mentions.is_empty() && !text.contains(&self.metadata.mentions[0]) {
            text.push_str("\nMentions: ");
            text.push_str(&self.metadata.mentions.join(" "));
        }
        text
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Sentiment {
    Positive,
    Negative,
    #[default]
    Neutral,
}

impl Sentiment {
    /// Accepts only the exact labels `Positive`, `Negative`, `Neutral`.
    pub fn from_label(s: &str) -> Option<Self> {
        match s {
            "Positive" => Some(Sentiment::Positive),
            "Negative" => Some(Sentiment::Negative),
            "Neutral" => Some(Sentiment::Neutral),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "Positive",
            Sentiment::Negative => "Negative",
            Sentiment::Neutral => "Neutral",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const DEFAULT_CONTENT_TYPE: &str = "Personal";
pub const DEFAULT_ENGAGEMENT: u8 = 5;

/// Structured output of enrichment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub summary: String,
    pub topic: String,
    pub sentiment: Sentiment,
    pub content_type: String,
    /// Always within `1..=10`.
    pub engagement_potential: u8,
    pub key_themes: Vec<String>,
}

/// One processed item as remembered by the tracker for deduplication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingHistoryEntry {
    pub item_id: String,
    #[serde(default)]
    pub title: String,
    pub checked_at: DateTime<Utc>,
    #[serde(default)]
    pub topic: String,
}
