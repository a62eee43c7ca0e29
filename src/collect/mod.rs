// src/collect/mod.rs
//! Collection: one [`Collector`] capability per platform, shared text helpers,
//! and the registry the tracker looks collectors up in.

pub mod providers;
pub mod session;
pub mod snapshot;
pub mod strategy;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use once_cell::sync::OnceCell;
use regex::Regex;

use crate::error::CollectError;
use crate::model::{Item, Platform};

/// Items collected for one handle, plus failures on individual items that
/// did not stop the rest of the listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fetched {
    pub items: Vec<Item>,
    /// `"<item ref>: <reason>"`, in listing order.
    pub errors: Vec<String>,
}

impl From<Vec<Item>> for Fetched {
    fn from(items: Vec<Item>) -> Self {
        Self {
            items,
            errors: Vec::new(),
        }
    }
}

/// Fetches and normalizes recent items for a handle.
///
/// Implementations apply the shared retry policy to transient failures and
/// return [`CollectError::Permanent`] for missing/private handles. Items with
/// neither text nor media are dropped before returning. Items that could not
/// be loaded at all are reported in [`Fetched::errors`].
#[async_trait]
pub trait Collector: Send + Sync {
    async fn fetch_recent(
        &self,
        handle: &str,
        limit: usize,
        recency: Option<Duration>,
    ) -> Result<Fetched, CollectError>;

    fn platform(&self) -> Platform;

    fn name(&self) -> &'static str;
}

/// Collectors keyed by platform.
#[derive(Clone, Default)]
pub struct CollectorSet {
    inner: HashMap<Platform, Arc<dyn Collector>>,
}

impl CollectorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, collector: Arc<dyn Collector>) -> Self {
        self.insert(collector);
        self
    }

    pub fn insert(&mut self, collector: Arc<dyn Collector>) {
        self.inner.insert(collector.platform(), collector);
    }

    pub fn get(&self, platform: Platform) -> Option<Arc<dyn Collector>> {
        self.inner.get(&platform).cloned()
    }

    pub fn platforms(&self) -> Vec<Platform> {
        let mut v: Vec<_> = self.inner.keys().copied().collect();
        v.sort();
        v
    }
}

/// Normalize scraped text: decode entities, strip tags, unify quotes,
/// collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[a-z][^>]*>").unwrap());
    out = re_tags.replace_all(&out, " ").to_string();

    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").unwrap());
    re_ws.replace_all(&out, " ").trim().to_string()
}

/// Words starting with `marker` (`#` or `@`), trailing punctuation trimmed.
pub fn extract_tags(text: &str, marker: char) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for word in text.split_whitespace() {
        if !word.starts_with(marker) {
            continue;
        }
        let tag = word.trim_end_matches(|c: char| !c.is_alphanumeric() && c != '_');
        if tag.chars().count() > 1 && !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    out
}

/// Parse engagement counts such as `"1,234 likes"`, `"1.2K"` or `"3M views"`.
pub fn parse_count(label: &str) -> Option<u64> {
    static RE: OnceCell<Regex> = OnceCell::new();
    let re = RE.get_or_init(|| Regex::new(r"(?i)(\d[\d,]*(?:\.\d+)?)\s*([KMB])?\b").unwrap());
    let caps = re.captures(label)?;
    let number: f64 = caps.get(1)?.as_str().replace(',', "").parse().ok()?;
    let scale = match caps.get(2).map(|m| m.as_str().to_ascii_uppercase()) {
        Some(ref s) if s == "K" => 1_000.0,
        Some(ref s) if s == "M" => 1_000_000.0,
        Some(ref s) if s == "B" => 1_000_000_000.0,
        _ => 1.0,
    };
    Some((number * scale).round() as u64)
}

/// Stable id for entries the platform did not label, derived from whatever
/// identifying parts are available.
pub fn derive_item_id(parts: &[&str]) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    for p in parts {
        hasher.update(p.as_bytes());
        hasher.update([0u8]);
    }
    let digest = hasher.finalize();
    let mut out = String::with_capacity(16);
    for b in digest.iter().take(8) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// Resolve a possibly relative link against a platform origin.
pub fn absolute_url(origin: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        href.to_string()
    } else {
        format!(
            "{}/{}",
            origin.trim_end_matches('/'),
            href.trim_start_matches('/')
        )
    }
}

pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// First line of `text`, cut to `max` characters.
pub fn title_from_text(text: &str, max: usize) -> String {
    let line = text.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or("");
    if line.chars().count() <= max {
        line.to_string()
    } else {
        let cut: String = line.chars().take(max).collect();
        format!("{}...", cut.trim_end())
    }
}
