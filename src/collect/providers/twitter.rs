//! Twitter adapter over a [`PageSession`].
//!
//! Text strategies, in order: `lang_span` (`div[lang] span`), `tweet_text`
//! (`div[data-testid='tweetText'] span`), `ltr_span` (`div[dir='ltr'] span`).
//! Each picks the longest non-empty text under its selector.
//!
//! Media strategies, in order: `video` (video sources), `photos` (status
//! photos from `pbs.twimg.com/media`, upgraded to the large rendition).

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use once_cell::sync::OnceCell;
use regex::Regex;
use tracing::{debug, info, instrument};

use crate::collect::session::{find_marker, PageSession, RawEntry};
use crate::collect::strategy::{non_empty, non_empty_vec, ExtractionChain, Strategy};
use crate::collect::{
    absolute_url, derive_item_id, extract_tags, normalize_text, parse_count, parse_timestamp,
    title_from_text, Collector, Fetched,
};
use crate::error::CollectError;
use crate::model::{Item, ItemMetadata, MediaKind, MediaRef, Platform};
use crate::pacing::RetryPolicy;

const ORIGIN: &str = "https://twitter.com";

pub const SEL_LANG_SPAN: &str = "div[lang] span";
pub const SEL_TWEET_TEXT: &str = "div[data-testid='tweetText'] span";
pub const SEL_LTR_SPAN: &str = "div[dir='ltr'] span";

const UNAVAILABLE_MARKERS: &[&str] = &[
    "this account doesn't exist",
    "user not found",
    "account suspended",
    "these posts are protected",
];

pub struct TwitterCollector {
    session: Arc<dyn PageSession>,
    retry: RetryPolicy,
    text: ExtractionChain<RawEntry, String>,
    media: ExtractionChain<RawEntry, Vec<MediaRef>>,
}

impl TwitterCollector {
    pub fn new(session: Arc<dyn PageSession>, retry: RetryPolicy) -> Self {
        Self {
            session,
            retry,
            text: text_chain(),
            media: media_chain(),
        }
    }

    fn to_item(&self, handle: &str, entry: &RawEntry) -> Option<Item> {
        let text = self
            .text
            .extract(entry)
            .map(|hit| {
                debug!(target: "collect", strategy = hit.strategy, "tweet text extracted");
                hit.value
            })
            .unwrap_or_default();
        let media_refs = self.media.extract(entry).map(|m| m.value).unwrap_or_default();

        if text.is_empty() && media_refs.is_empty() {
            return None;
        }

        let item_id = tweet_id(entry).unwrap_or_else(|| {
            derive_item_id(&[handle, entry.link.as_deref().unwrap_or_default(), &text])
        });
        let url = match entry.link.as_deref() {
            Some(link) => absolute_url(ORIGIN, link),
            None => format!("{ORIGIN}/{handle}/status/{item_id}"),
        };

        Some(Item {
            metadata: engagement(entry, &text),
            title: title_from_text(&text, 80),
            item_id,
            platform: Platform::Twitter,
            handle: handle.to_string(),
            url,
            raw_text: text,
            media_refs,
            timestamp: entry.timestamp.as_deref().and_then(parse_timestamp),
            fetched_at: Utc::now(),
        })
    }
}

#[async_trait]
impl Collector for TwitterCollector {
    #[instrument(level = "info", skip(self, _recency), fields(platform = "twitter"))]
    async fn fetch_recent(
        &self,
        handle: &str,
        limit: usize,
        _recency: Option<Duration>,
    ) -> Result<Fetched, CollectError> {
        let session = self.session.as_ref();
        let page = self
            .retry
            .run(&format!("twitter @{handle}"), move |_| {
                session.open_profile(Platform::Twitter, handle)
            })
            .await?;

        if let Some(marker) = find_marker(&page.body_text, UNAVAILABLE_MARKERS) {
            return Err(CollectError::Permanent(format!(
                "Twitter profile @{handle} unavailable ({marker})"
            )));
        }

        let mut seen = HashSet::new();
        let mut items = Vec::new();
        for entry in &page.entries {
            if items.len() >= limit {
                break;
            }
            let Some(item) = self.to_item(handle, entry) else {
                continue;
            };
            if seen.insert(item.item_id.clone()) {
                items.push(item);
            }
        }

        info!(target: "collect", handle, count = items.len(), "twitter entries collected");
        Ok(items.into())
    }

    fn platform(&self) -> Platform {
        Platform::Twitter
    }

    fn name(&self) -> &'static str {
        "twitter"
    }
}

pub fn text_chain() -> ExtractionChain<RawEntry, String> {
    ExtractionChain::new(vec![
        Strategy::new("lang_span", lang_span),
        Strategy::new("tweet_text", tweet_text),
        Strategy::new("ltr_span", ltr_span),
    ])
}

pub fn media_chain() -> ExtractionChain<RawEntry, Vec<MediaRef>> {
    ExtractionChain::new(vec![
        Strategy::new("video", videos),
        Strategy::new("photos", photos),
    ])
}

fn longest(texts: &[String]) -> Option<String> {
    texts
        .iter()
        .map(|t| normalize_text(t))
        .max_by_key(|t| t.chars().count())
        .and_then(non_empty)
}

fn lang_span(e: &RawEntry) -> Option<String> {
    longest(e.texts_for(SEL_LANG_SPAN))
}

fn tweet_text(e: &RawEntry) -> Option<String> {
    longest(e.texts_for(SEL_TWEET_TEXT))
}

fn ltr_span(e: &RawEntry) -> Option<String> {
    longest(e.texts_for(SEL_LTR_SPAN))
}

fn videos(e: &RawEntry) -> Option<Vec<MediaRef>> {
    non_empty_vec(
        e.media_for("video")
            .iter()
            .filter(|src| !src.is_empty())
            .map(|src| MediaRef {
                kind: MediaKind::Video,
                url: src.clone(),
            })
            .collect(),
    )
}

fn photos(e: &RawEntry) -> Option<Vec<MediaRef>> {
    non_empty_vec(
        e.media_for("img")
            .iter()
            .filter(|src| {
                src.contains("pbs.twimg.com/media")
                    && !src.contains("profile_images")
                    && !src.contains("emoji")
            })
            .map(|src| MediaRef {
                kind: MediaKind::Image,
                url: large_rendition(src),
            })
            .collect(),
    )
}

fn large_rendition(src: &str) -> String {
    static RE: OnceCell<Regex> = OnceCell::new();
    let re = RE.get_or_init(|| Regex::new(r"([?&])name=[^&]*").unwrap());
    if re.is_match(src) {
        re.replace(src, "${1}name=large").into_owned()
    } else if src.contains('?') {
        format!("{src}&name=large")
    } else {
        format!("{src}?name=large")
    }
}

fn tweet_id(entry: &RawEntry) -> Option<String> {
    if let Some(id) = entry.id.as_deref().filter(|s| !s.trim().is_empty()) {
        return Some(id.trim().to_string());
    }
    static RE: OnceCell<Regex> = OnceCell::new();
    let re = RE.get_or_init(|| Regex::new(r"/status/(\d+)").unwrap());
    let link = entry.link.as_deref()?;
    re.captures(link).map(|c| c[1].to_string())
}

fn engagement(entry: &RawEntry, text: &str) -> ItemMetadata {
    let mut meta = ItemMetadata {
        hashtags: extract_tags(text, '#'),
        mentions: extract_tags(text, '@'),
        ..Default::default()
    };
    for label in &entry.labels {
        let lower = label.to_lowercase();
        let count = parse_count(label);
        if lower.contains("like") {
            meta.likes = count.or(meta.likes);
        } else if lower.contains("retweet") || lower.contains("repost") {
            meta.reposts = count.or(meta.reposts);
        } else if lower.contains("repl") {
            meta.replies = count.or(meta.replies);
        }
    }
    meta
}
