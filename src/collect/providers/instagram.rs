//! Instagram adapter over a [`PageSession`].
//!
//! The profile grid only yields post links; each post is opened on its own
//! page (paced, retried) and read there. Caption strategies, in order:
//! `article_h1`, `post_text`, `word_wrap_span`, `article_div_span`. A
//! caption must be longer than 10 characters to count. Media: the post
//! video first, otherwise up to three post images.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use once_cell::sync::OnceCell;
use regex::Regex;
use tracing::{debug, info, instrument, warn};

use crate::collect::session::{find_marker, PageSession, RawEntry};
use crate::collect::strategy::{non_empty_vec, ExtractionChain, Strategy};
use crate::collect::{
    absolute_url, derive_item_id, extract_tags, normalize_text, parse_count, parse_timestamp,
    title_from_text, Collector, Fetched,
};
use crate::error::CollectError;
use crate::model::{Item, ItemMetadata, MediaKind, MediaRef, Platform};
use crate::pacing::{Pacer, RetryPolicy};

const ORIGIN: &str = "https://www.instagram.com";
const MIN_CAPTION_CHARS: usize = 10;
const MAX_IMAGES: usize = 3;

pub const SEL_ARTICLE_H1: &str = "article h1";
pub const SEL_POST_TEXT: &str = "div[data-testid='post-text'] span";
pub const SEL_WORD_WRAP: &str = "div span[style*='word-wrap']";
pub const SEL_ARTICLE_DIV_SPAN: &str = "article div span";

const UNAVAILABLE_MARKERS: &[&str] = &[
    "page not found",
    "sorry, this page isn't available",
    "this account is private",
];

pub struct InstagramCollector {
    session: Arc<dyn PageSession>,
    retry: RetryPolicy,
    pacer: Pacer,
    caption: ExtractionChain<RawEntry, String>,
    media: ExtractionChain<RawEntry, Vec<MediaRef>>,
}

impl InstagramCollector {
    pub fn new(session: Arc<dyn PageSession>, retry: RetryPolicy, pacer: Pacer) -> Self {
        Self {
            session,
            retry,
            pacer,
            caption: caption_chain(),
            media: media_chain(),
        }
    }

    fn to_item(&self, handle: &str, link: &str, post: &RawEntry) -> Option<Item> {
        let caption = self
            .caption
            .extract(post)
            .map(|hit| {
                debug!(target: "collect", strategy = hit.strategy, "caption extracted");
                hit.value
            })
            .unwrap_or_default();
        let media_refs = self.media.extract(post).map(|m| m.value).unwrap_or_default();

        if caption.is_empty() && media_refs.is_empty() {
            return None;
        }

        let item_id = post
            .id
            .clone()
            .filter(|s| !s.trim().is_empty())
            .or_else(|| shortcode(link))
            .unwrap_or_else(|| derive_item_id(&[handle, link]));

        let mut metadata = ItemMetadata {
            hashtags: extract_tags(&caption, '#'),
            mentions: extract_tags(&caption, '@'),
            ..Default::default()
        };
        metadata.likes = post
            .labels
            .iter()
            .filter(|l| l.to_lowercase().contains("like"))
            .find_map(|l| parse_count(l));

        let title = if caption.is_empty() {
            format!("Instagram post {item_id}")
        } else {
            title_from_text(&caption, 80)
        };

        Some(Item {
            url: absolute_url(ORIGIN, link),
            item_id,
            platform: Platform::Instagram,
            handle: handle.to_string(),
            title,
            raw_text: caption,
            media_refs,
            timestamp: post.timestamp.as_deref().and_then(parse_timestamp),
            fetched_at: Utc::now(),
            metadata,
        })
    }
}

#[async_trait]
impl Collector for InstagramCollector {
    #[instrument(level = "info", skip(self, _recency), fields(platform = "instagram"))]
    async fn fetch_recent(
        &self,
        handle: &str,
        limit: usize,
        _recency: Option<Duration>,
    ) -> Result<Fetched, CollectError> {
        let session = self.session.as_ref();
        let page = self
            .retry
            .run(&format!("instagram @{handle}"), move |_| {
                session.open_profile(Platform::Instagram, handle)
            })
            .await?;

        if let Some(marker) = find_marker(&page.body_text, UNAVAILABLE_MARKERS) {
            return Err(CollectError::Permanent(format!(
                "Instagram profile @{handle} unavailable ({marker})"
            )));
        }

        let mut links: Vec<String> = Vec::new();
        for entry in &page.entries {
            let Some(link) = entry.link.as_deref().filter(|l| !l.trim().is_empty()) else {
                continue;
            };
            if links.len() >= limit {
                break;
            }
            if !links.iter().any(|l| l == link) {
                links.push(link.to_string());
            }
        }

        let mut seen = HashSet::new();
        let mut fetched = Fetched::default();
        for (idx, link) in links.iter().enumerate() {
            self.pacer.before_item(idx).await;

            let link = link.as_str();
            let post = self
                .retry
                .run(&format!("instagram post {link}"), move |_| {
                    session.open_entry(Platform::Instagram, handle, link)
                })
                .await;
            let post = match post {
                Ok(p) => p,
                Err(e) => {
                    warn!(target: "collect", handle, link, error = %e, "skipping post");
                    fetched.errors.push(format!("{link}: {e}"));
                    continue;
                }
            };

            if let Some(item) = self.to_item(handle, link, &post) {
                if seen.insert(item.item_id.clone()) {
                    fetched.items.push(item);
                }
            }
        }

        info!(
            target: "collect",
            handle,
            count = fetched.items.len(),
            failed = fetched.errors.len(),
            "instagram posts collected"
        );
        Ok(fetched)
    }

    fn platform(&self) -> Platform {
        Platform::Instagram
    }

    fn name(&self) -> &'static str {
        "instagram"
    }
}

pub fn caption_chain() -> ExtractionChain<RawEntry, String> {
    ExtractionChain::new(vec![
        Strategy::new("article_h1", article_h1),
        Strategy::new("post_text", post_text),
        Strategy::new("word_wrap_span", word_wrap_span),
        Strategy::new("article_div_span", article_div_span),
    ])
}

pub fn media_chain() -> ExtractionChain<RawEntry, Vec<MediaRef>> {
    ExtractionChain::new(vec![
        Strategy::new("video", video),
        Strategy::new("images", images),
    ])
}

fn first_caption(texts: &[String]) -> Option<String> {
    texts
        .iter()
        .map(|t| normalize_text(t))
        .find(|t| t.chars().count() > MIN_CAPTION_CHARS)
}

fn article_h1(e: &RawEntry) -> Option<String> {
    first_caption(e.texts_for(SEL_ARTICLE_H1))
}

fn post_text(e: &RawEntry) -> Option<String> {
    first_caption(e.texts_for(SEL_POST_TEXT))
}

fn word_wrap_span(e: &RawEntry) -> Option<String> {
    first_caption(e.texts_for(SEL_WORD_WRAP))
}

fn article_div_span(e: &RawEntry) -> Option<String> {
    first_caption(e.texts_for(SEL_ARTICLE_DIV_SPAN))
}

fn video(e: &RawEntry) -> Option<Vec<MediaRef>> {
    e.media_for("video")
        .iter()
        .find(|src| !src.trim().is_empty())
        .map(|src| {
            vec![MediaRef {
                kind: MediaKind::Video,
                url: src.clone(),
            }]
        })
}

fn images(e: &RawEntry) -> Option<Vec<MediaRef>> {
    let mut out: Vec<MediaRef> = Vec::new();
    for src in e.media_for("img") {
        let is_post_image = src.contains("instagram.com/p/")
            || src.contains("instagram.com/reel/")
            || src.contains("scontent");
        if is_post_image && !out.iter().any(|m| &m.url == src) {
            out.push(MediaRef {
                kind: MediaKind::Image,
                url: src.clone(),
            });
        }
        if out.len() >= MAX_IMAGES {
            break;
        }
    }
    non_empty_vec(out)
}

/// Post shortcode from links like `/p/Cx1_ab/` or `/reel/Cx1_ab/`.
fn shortcode(link: &str) -> Option<String> {
    static RE: OnceCell<Regex> = OnceCell::new();
    let re = RE.get_or_init(|| Regex::new(r"/(?:p|reel|tv)/([A-Za-z0-9_-]+)").unwrap());
    re.captures(link).map(|c| c[1].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collect::session::ProfilePage;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn post(selector: &str, caption: &str, imgs: &[&str]) -> RawEntry {
        let mut texts = BTreeMap::new();
        texts.insert(selector.to_string(), vec![caption.to_string()]);
        let mut media = BTreeMap::new();
        media.insert(
            "img".to_string(),
            imgs.iter().map(|s| s.to_string()).collect(),
        );
        RawEntry {
            texts,
            media,
            ..Default::default()
        }
    }

    #[test]
    fn short_captions_fall_through_to_next_strategy() {
        let mut e = post(SEL_ARTICLE_H1, "too short", &[]);
        e.texts.insert(
            SEL_ARTICLE_DIV_SPAN.to_string(),
            vec!["Sunset over the harbour tonight".to_string()],
        );
        let hit = caption_chain().extract(&e).unwrap();
        assert_eq!(hit.strategy, "article_div_span");
        assert_eq!(hit.value, "Sunset over the harbour tonight");
    }

    #[test]
    fn video_wins_over_images_and_images_are_capped() {
        let imgs = [
            "https://scontent.cdninstagram.com/a.jpg",
            "https://static.cdninstagram.com/avatar.png",
            "https://scontent.cdninstagram.com/b.jpg",
            "https://scontent.cdninstagram.com/c.jpg",
            "https://scontent.cdninstagram.com/d.jpg",
        ];
        let e = post(SEL_ARTICLE_H1, "", &imgs);
        let hit = media_chain().extract(&e).unwrap();
        assert_eq!(hit.strategy, "images");
        assert_eq!(hit.value.len(), MAX_IMAGES);
        assert!(hit.value.iter().all(|m| m.url.contains("scontent")));

        let mut with_video = e.clone();
        with_video
            .media
            .insert("video".into(), vec!["https://scontent.cdninstagram.com/v.mp4".into()]);
        let hit = media_chain().extract(&with_video).unwrap();
        assert_eq!(hit.strategy, "video");
        assert_eq!(hit.value[0].kind, MediaKind::Video);
    }

    #[test]
    fn shortcodes_are_read_from_links() {
        assert_eq!(shortcode("/p/Cx1_ab-9/").as_deref(), Some("Cx1_ab-9"));
        assert_eq!(
            shortcode("https://www.instagram.com/reel/Zz9/").as_deref(),
            Some("Zz9")
        );
        assert_eq!(shortcode("/alice/"), None);
    }

    struct Grid {
        listing: ProfilePage,
        posts: BTreeMap<String, RawEntry>,
        opened: AtomicUsize,
    }

    #[async_trait]
    impl PageSession for Grid {
        async fn open_profile(&self, _: Platform, _: &str) -> Result<ProfilePage, CollectError> {
            Ok(self.listing.clone())
        }

        async fn open_entry(&self, _: Platform, _: &str, link: &str) -> Result<RawEntry, CollectError> {
            self.opened.fetch_add(1, Ordering::SeqCst);
            self.posts
                .get(link)
                .cloned()
                .ok_or_else(|| CollectError::Permanent(format!("gone: {link}")))
        }
    }

    fn link(l: &str) -> RawEntry {
        RawEntry {
            link: Some(l.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn posts_are_opened_individually_and_failures_reported() {
        let mut posts = BTreeMap::new();
        posts.insert(
            "/p/one/".to_string(),
            post(SEL_ARTICLE_H1, "First caption with #travel", &[]),
        );
        posts.insert(
            "/p/three/".to_string(),
            post(SEL_POST_TEXT, "Third caption is here", &[]),
        );
        let grid = Arc::new(Grid {
            listing: ProfilePage {
                body_text: String::new(),
                entries: vec![link("/p/one/"), link("/p/two/"), link("/p/three/"), link("/p/four/")],
            },
            posts,
            opened: AtomicUsize::new(0),
        });

        let c = InstagramCollector::new(
            grid.clone(),
            RetryPolicy::new(1, std::time::Duration::ZERO),
            Pacer::none(),
        );
        let fetched = c.fetch_recent("alice", 3, None).await.unwrap();

        assert_eq!(grid.opened.load(Ordering::SeqCst), 3);
        let items = &fetched.items;
        let ids: Vec<_> = items.iter().map(|i| i.item_id.as_str()).collect();
        assert_eq!(ids, vec!["one", "three"]);
        assert_eq!(items[0].url, "https://www.instagram.com/p/one/");
        assert_eq!(items[0].metadata.hashtags, vec!["#travel"]);
        assert_eq!(
            fetched.errors,
            vec!["/p/two/: source unavailable: gone: /p/two/".to_string()]
        );
    }

    /// Lists posts whose pages never load.
    struct Stalled {
        listing: ProfilePage,
        opened: AtomicUsize,
    }

    #[async_trait]
    impl PageSession for Stalled {
        async fn open_profile(&self, _: Platform, _: &str) -> Result<ProfilePage, CollectError> {
            Ok(self.listing.clone())
        }

        async fn open_entry(&self, _: Platform, _: &str, _: &str) -> Result<RawEntry, CollectError> {
            self.opened.fetch_add(1, Ordering::SeqCst);
            Err(CollectError::Transient("timeout loading post".into()))
        }
    }

    #[tokio::test]
    async fn posts_that_never_load_are_reported_after_retries() {
        let session = Arc::new(Stalled {
            listing: ProfilePage {
                body_text: String::new(),
                entries: vec![link("/p/one/"), link("/p/two/")],
            },
            opened: AtomicUsize::new(0),
        });
        let c = InstagramCollector::new(
            session.clone(),
            RetryPolicy::new(2, std::time::Duration::ZERO),
            Pacer::none(),
        );

        let fetched = c.fetch_recent("alice", 5, None).await.unwrap();
        assert!(fetched.items.is_empty());
        assert_eq!(session.opened.load(Ordering::SeqCst), 4);
        assert_eq!(fetched.errors.len(), 2);
        assert!(fetched.errors[0].starts_with("/p/one/: "));
        assert!(fetched.errors[0].contains("gave up after 2 attempts"));
        assert!(fetched.errors[1].starts_with("/p/two/: "));
    }

    #[tokio::test]
    async fn zero_limit_opens_nothing() {
        let session = Arc::new(Stalled {
            listing: ProfilePage {
                body_text: String::new(),
                entries: vec![link("/p/one/")],
            },
            opened: AtomicUsize::new(0),
        });
        let c = InstagramCollector::new(session.clone(), RetryPolicy::default(), Pacer::none());
        let fetched = c.fetch_recent("alice", 0, None).await.unwrap();
        assert_eq!(fetched, Fetched::default());
        assert_eq!(session.opened.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn private_profile_is_permanent() {
        let grid = Arc::new(Grid {
            listing: ProfilePage {
                body_text: "This Account is Private".into(),
                entries: vec![],
            },
            posts: BTreeMap::new(),
            opened: AtomicUsize::new(0),
        });
        let c = InstagramCollector::new(grid, RetryPolicy::default(), Pacer::none());
        let err = c.fetch_recent("hidden", 5, None).await.unwrap_err();
        assert!(matches!(err, CollectError::Permanent(_)));
    }
}
