//! YouTube adapter over the public channel Atom feed.
//!
//! The feed is newest-first. The adapter keeps the first `limit` entries,
//! then drops anything outside the recency window (or without a publish
//! date). Text strategies, in order: `transcript` (when a [`Transcriber`] is
//! configured), `description`, `title`.
//!
//! Feeds are addressed by `UC…` channel id only. Over HTTP an `@handle` is
//! first resolved by reading the channel page; resolved ids are cached for
//! the life of the collector.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use once_cell::sync::OnceCell;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::collect::strategy::{non_empty, ExtractionChain, Strategy};
use crate::collect::{
    derive_item_id, extract_tags, normalize_text, parse_timestamp, Collector, Fetched,
};
use crate::enrich::analyzer::Transcriber;
use crate::error::CollectError;
use crate::model::{Item, ItemMetadata, MediaKind, MediaRef, Platform};
use crate::pacing::{Pacer, RetryPolicy};

pub const DEFAULT_FEED_BASE: &str = "https://www.youtube.com/feeds/videos.xml";
pub const DEFAULT_PAGE_BASE: &str = "https://www.youtube.com";

/// One `<entry>` of a channel feed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedEntry {
    pub video_id: String,
    pub title: String,
    pub link: String,
    pub published: Option<DateTime<Utc>>,
    pub description: String,
    pub thumbnail: Option<String>,
}

enum Mode {
    /// Feed bodies keyed by normalized handle.
    Fixture(HashMap<String, String>),
    /// `<dir>/<handle>.xml` files.
    Dir(PathBuf),
    Http {
        client: reqwest::Client,
        feed_base: String,
        page_base: String,
        /// `@handle` -> channel id.
        channel_ids: RwLock<HashMap<String, String>>,
    },
}

pub struct YoutubeCollector {
    mode: Mode,
    transcriber: Option<Arc<dyn Transcriber>>,
    retry: RetryPolicy,
    pacer: Pacer,
    text: ExtractionChain<FeedEntry, String>,
}

impl YoutubeCollector {
    fn with_mode(mode: Mode) -> Self {
        Self {
            mode,
            transcriber: None,
            retry: RetryPolicy::default(),
            pacer: Pacer::none(),
            text: text_chain(),
        }
    }

    /// In-memory feeds keyed by handle (with or without `@`).
    pub fn from_fixtures<I, K, V>(feeds: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let map = feeds
            .into_iter()
            .map(|(k, v)| (normalize_handle(k.as_ref()), v.into()))
            .collect();
        Self::with_mode(Mode::Fixture(map))
    }

    /// Feeds stored as `<dir>/<handle>.xml`.
    pub fn from_dir(dir: impl Into<PathBuf>) -> Self {
        Self::with_mode(Mode::Dir(dir.into()))
    }

    /// Live feeds. `page_base` serves the `/@handle` channel pages used to
    /// look up channel ids.
    pub fn http(feed_base: &str, page_base: &str, timeout: StdDuration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("content-tracker/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self::with_client(client, feed_base, page_base))
    }

    pub fn with_client(client: reqwest::Client, feed_base: &str, page_base: &str) -> Self {
        Self::with_mode(Mode::Http {
            client,
            feed_base: feed_base.trim_end_matches('/').to_string(),
            page_base: page_base.trim_end_matches('/').to_string(),
            channel_ids: RwLock::new(HashMap::new()),
        })
    }

    pub fn with_transcriber(mut self, transcriber: Arc<dyn Transcriber>) -> Self {
        self.transcriber = Some(transcriber);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_pacer(mut self, pacer: Pacer) -> Self {
        self.pacer = pacer;
        self
    }

    async fn load_feed(&self, handle: &str) -> Result<String, CollectError> {
        match &self.mode {
            Mode::Fixture(map) => map.get(handle).cloned().ok_or_else(|| {
                CollectError::Permanent(format!("YouTube channel {handle} not found"))
            }),
            Mode::Dir(dir) => {
                let path = dir.join(format!("{}.xml", handle.trim_start_matches('@')));
                match tokio::fs::read_to_string(&path).await {
                    Ok(s) => Ok(s),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(
                        CollectError::Permanent(format!("no feed at {}", path.display())),
                    ),
                    Err(e) => Err(CollectError::Transient(format!(
                        "reading {}: {e}",
                        path.display()
                    ))),
                }
            }
            Mode::Http {
                client,
                feed_base,
                page_base,
                channel_ids,
            } => {
                let channel_id = if is_channel_id(handle) {
                    handle.to_string()
                } else {
                    resolve_channel_id(client, page_base, channel_ids, handle).await?
                };
                get_text(client, &feed_url(feed_base, &channel_id), handle).await
            }
        }
    }

    async fn text_for(&self, entry: &FeedEntry, index: usize) -> (String, &'static str) {
        if let Some(t) = &self.transcriber {
            self.pacer.before_request(index).await;
            let media = MediaRef {
                kind: MediaKind::Video,
                url: entry.link.clone(),
            };
            match t.transcribe(&media).await {
                Ok(text) if !text.trim().is_empty() => return (text.trim().to_string(), "transcript"),
                Ok(_) => debug!(target: "collect", video_id = %entry.video_id, "empty transcript"),
                Err(e) => {
                    warn!(target: "collect", video_id = %entry.video_id, error = %e, "transcription failed")
                }
            }
        }
        match self.text.extract(entry) {
            Some(hit) => (hit.value, hit.strategy),
            None => (String::new(), "none"),
        }
    }
}

#[async_trait]
impl Collector for YoutubeCollector {
    #[instrument(level = "info", skip(self), fields(platform = "youtube"))]
    async fn fetch_recent(
        &self,
        handle: &str,
        limit: usize,
        recency: Option<Duration>,
    ) -> Result<Fetched, CollectError> {
        let handle_key = normalize_handle(handle);
        let key = handle_key.as_str();
        let body = self
            .retry
            .run(&format!("youtube {key}"), move |_| self.load_feed(key))
            .await?;
        let entries = parse_feed(&body)?;

        let cutoff = recency.map(|w| Utc::now() - w);
        let recent: Vec<FeedEntry> = entries
            .into_iter()
            .take(limit)
            .filter(|e| match (cutoff, e.published) {
                (None, _) => true,
                (Some(c), Some(p)) => p >= c,
                (Some(_), None) => false,
            })
            .collect();

        let mut items = Vec::with_capacity(recent.len());
        for (idx, entry) in recent.iter().enumerate() {
            let (text, strategy) = self.text_for(entry, idx).await;
            debug!(target: "collect", video_id = %entry.video_id, strategy, "video text extracted");
            let item = to_item(handle.trim_start_matches('@'), entry, text);
            if item.has_content() {
                items.push(item);
            }
        }

        info!(target: "collect", handle = key, count = items.len(), "youtube videos collected");
        Ok(items.into())
    }

    fn platform(&self) -> Platform {
        Platform::Youtube
    }

    fn name(&self) -> &'static str {
        "youtube"
    }
}

pub fn text_chain() -> ExtractionChain<FeedEntry, String> {
    ExtractionChain::new(vec![
        Strategy::new("description", description),
        Strategy::new("title", title),
    ])
}

fn description(e: &FeedEntry) -> Option<String> {
    non_empty(e.description.trim().to_string())
}

fn title(e: &FeedEntry) -> Option<String> {
    non_empty(normalize_text(&e.title))
}

fn to_item(handle: &str, entry: &FeedEntry, text: String) -> Item {
    let item_id = if entry.video_id.is_empty() {
        derive_item_id(&[handle, &entry.link, &entry.title])
    } else {
        entry.video_id.clone()
    };
    let url = if entry.link.is_empty() {
        format!("https://www.youtube.com/watch?v={item_id}")
    } else {
        entry.link.clone()
    };

    let mut media_refs = vec![MediaRef {
        kind: MediaKind::Video,
        url: url.clone(),
    }];
    if let Some(thumb) = &entry.thumbnail {
        media_refs.push(MediaRef {
            kind: MediaKind::Image,
            url: thumb.clone(),
        });
    }

    Item {
        metadata: ItemMetadata {
            hashtags: extract_tags(&entry.description, '#'),
            ..Default::default()
        },
        item_id,
        platform: Platform::Youtube,
        handle: handle.to_string(),
        url,
        title: normalize_text(&entry.title),
        raw_text: text,
        media_refs,
        timestamp: entry.published,
        fetched_at: Utc::now(),
    }
}

/// Channel handles are kept with a leading `@`; `UC…` channel ids as-is.
pub fn normalize_handle(handle: &str) -> String {
    let h = handle.trim();
    if h.starts_with('@') || is_channel_id(h) {
        h.to_string()
    } else {
        format!("@{h}")
    }
}

fn is_channel_id(h: &str) -> bool {
    h.starts_with("UC") && h.len() == 24
}

pub fn feed_url(base: &str, channel_id: &str) -> String {
    format!("{base}?channel_id={channel_id}")
}

pub fn channel_page_url(base: &str, handle: &str) -> String {
    format!("{base}/@{}", handle.trim_start_matches('@'))
}

/// Channel id from a channel page: the canonical `/channel/UC…` link, else
/// the first `externalId`/`channelId` in the embedded page data.
pub fn channel_id_from_page(html: &str) -> Option<String> {
    static CANONICAL: OnceCell<Regex> = OnceCell::new();
    static EMBEDDED: OnceCell<Regex> = OnceCell::new();
    let canonical = CANONICAL.get_or_init(|| {
        Regex::new(r#"<link rel="canonical" href="[^"]*/channel/(UC[\w-]{22})""#).unwrap()
    });
    let embedded = EMBEDDED
        .get_or_init(|| Regex::new(r#""(?:externalId|channelId)":"(UC[\w-]{22})""#).unwrap());
    canonical
        .captures(html)
        .or_else(|| embedded.captures(html))
        .map(|c| c[1].to_string())
}

async fn resolve_channel_id(
    client: &reqwest::Client,
    page_base: &str,
    cache: &RwLock<HashMap<String, String>>,
    handle: &str,
) -> Result<String, CollectError> {
    if let Some(id) = cache.read().await.get(handle) {
        return Ok(id.clone());
    }
    let url = channel_page_url(page_base, handle);
    let page = get_text(client, &url, handle).await?;
    let id = channel_id_from_page(&page)
        .ok_or_else(|| CollectError::Session(format!("no channel id on {url}")))?;
    debug!(target: "collect", handle, channel_id = %id, "channel id resolved");
    cache.write().await.insert(handle.to_string(), id.clone());
    Ok(id)
}

async fn get_text(
    client: &reqwest::Client,
    url: &str,
    handle: &str,
) -> Result<String, CollectError> {
    let resp = client.get(url).send().await?;
    let status = resp.status();
    match status.as_u16() {
        200..=299 => Ok(resp.text().await?),
        403 | 404 | 410 => Err(CollectError::Permanent(format!(
            "YouTube channel {handle} unavailable (HTTP {status})"
        ))),
        429 | 500..=599 => Err(CollectError::Transient(format!(
            "{url} for {handle} returned HTTP {status}"
        ))),
        _ => Err(CollectError::Session(format!("unexpected HTTP {status} for {url}"))),
    }
}

#[derive(Clone, Copy)]
enum Field {
    VideoId,
    Title,
    Published,
    Description,
}

/// Parse an Atom channel feed into entries, in document order.
pub fn parse_feed(xml: &str) -> Result<Vec<FeedEntry>, CollectError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut out = Vec::new();
    let mut current: Option<FeedEntry> = None;
    let mut field: Option<Field> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| CollectError::Session(format!("unreadable feed: {e}")))?;
        match event {
            Event::Start(e) => {
                if e.local_name().as_ref() == b"entry" {
                    current = Some(FeedEntry::default());
                } else if let Some(entry) = current.as_mut() {
                    field = match e.local_name().as_ref() {
                        b"videoId" => Some(Field::VideoId),
                        b"title" => Some(Field::Title),
                        b"published" => Some(Field::Published),
                        b"description" => Some(Field::Description),
                        _ => {
                            read_attrs(&e, entry);
                            None
                        }
                    };
                }
            }
            Event::Empty(e) => {
                if let Some(entry) = current.as_mut() {
                    read_attrs(&e, entry);
                }
            }
            Event::Text(t) => {
                if let (Some(entry), Some(f)) = (current.as_mut(), field) {
                    let text = t
                        .unescape()
                        .map_err(|e| CollectError::Session(format!("unreadable feed: {e}")))?;
                    set_field(entry, f, &text);
                }
            }
            Event::CData(t) => {
                if let (Some(entry), Some(f)) = (current.as_mut(), field) {
                    set_field(entry, f, &String::from_utf8_lossy(&t.into_inner()));
                }
            }
            Event::End(e) => {
                field = None;
                if e.local_name().as_ref() == b"entry" {
                    if let Some(entry) = current.take() {
                        out.push(entry);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(out)
}

fn set_field(entry: &mut FeedEntry, field: Field, text: &str) {
    match field {
        Field::VideoId => entry.video_id = text.trim().to_string(),
        // media:title repeats the entry title
        Field::Title if entry.title.is_empty() => entry.title = text.trim().to_string(),
        Field::Title => {}
        Field::Published => entry.published = parse_timestamp(text),
        Field::Description => entry.description = text.trim().to_string(),
    }
}

fn read_attrs(e: &BytesStart<'_>, entry: &mut FeedEntry) {
    let attr = |name: &[u8]| {
        e.attributes()
            .flatten()
            .find(|a| a.key.local_name().as_ref() == name)
            .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
    };
    match e.local_name().as_ref() {
        b"link" => {
            let rel = attr(b"rel");
            if entry.link.is_empty() && rel.as_deref().unwrap_or("alternate") == "alternate" {
                if let Some(href) = attr(b"href") {
                    entry.link = href;
                }
            }
        }
        b"thumbnail" => {
            if entry.thumbnail.is_none() {
                entry.thumbnail = attr(b"url");
            }
        }
        _ => {}
    }
}
