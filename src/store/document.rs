//! Fixed human-readable record layout.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};

use crate::model::{AnalysisResult, Item, Platform};

pub const RULE_WIDTH: usize = 80;
const DATE_FMT: &str = "%Y-%m-%d %H:%M:%S";

fn rule() -> String {
    "-".repeat(RULE_WIDTH)
}

fn fmt_date(ts: &DateTime<Utc>) -> String {
    ts.format(DATE_FMT).to_string()
}

fn count(v: Option<u64>) -> String {
    v.map(|n| n.to_string()).unwrap_or_else(|| "N/A".to_string())
}

fn list(v: &[String]) -> String {
    if v.is_empty() {
        "None".to_string()
    } else {
        v.join(", ")
    }
}

/// Render one record. `processed_at` is passed in so output is deterministic.
pub fn render(item: &Item, analysis: &AnalysisResult, processed_at: DateTime<Utc>) -> String {
    let mut out = String::new();
    let rule = rule();

    // header
    let _ = writeln!(out, "Platform: {}", item.platform.as_str().to_uppercase());
    let _ = writeln!(out, "Handle: @{}", item.handle.trim_start_matches('@'));
    let _ = writeln!(out, "Post ID: {}", item.item_id);
    if !item.title.is_empty() {
        let _ = writeln!(out, "Title: {}", item.title);
    }
    let _ = writeln!(out, "URL: {}", item.url);
    let _ = writeln!(out, "Processing Date: {}", fmt_date(&processed_at));
    let _ = writeln!(
        out,
        "Published Date: {}",
        item.timestamp
            .as_ref()
            .map(fmt_date)
            .unwrap_or_else(|| "Unknown".to_string())
    );
    let _ = writeln!(out, "Scraped Date: {}", fmt_date(&item.fetched_at));
    let _ = writeln!(out, "{rule}");

    // analysis
    let _ = writeln!(out, "CONTENT TYPE: {}", analysis.content_type);
    let _ = writeln!(out, "TOPIC AND THEME: {}", analysis.topic);
    let _ = writeln!(out, "SENTIMENT ANALYSIS: {}", analysis.sentiment);
    let _ = writeln!(out, "KEY THEMES: {}", list(&analysis.key_themes));
    let _ = writeln!(
        out,
        "ENGAGEMENT POTENTIAL: {}/10",
        analysis.engagement_potential
    );
    let _ = writeln!(out, "{rule}");

    let _ = writeln!(out, "AI GENERATED SUMMARY:");
    let _ = writeln!(out, "{}", analysis.summary);
    let _ = writeln!(out, "{rule}");

    let _ = writeln!(out, "ORIGINAL CONTENT:");
    let _ = writeln!(out, "{}", item.raw_text);
    let _ = writeln!(out, "{rule}");

    if let Some(block) = platform_block(item) {
        out.push_str(&block);
    }

    out
}

fn platform_block(item: &Item) -> Option<String> {
    let meta = &item.metadata;
    if meta.is_empty() && item.media_refs.is_empty() {
        return None;
    }

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} SPECIFIC DATA:",
        item.platform.as_str().to_uppercase()
    );
    let _ = writeln!(out, "Hashtags: {}", list(&meta.hashtags));
    match item.platform {
        Platform::Twitter => {
            let _ = writeln!(out, "Mentions: {}", list(&meta.mentions));
            let _ = writeln!(out, "Media Count: {}", item.media_refs.len());
            let _ = writeln!(out, "Likes: {}", count(meta.likes));
            let _ = writeln!(out, "Retweets: {}", count(meta.reposts));
            let _ = writeln!(out, "Replies: {}", count(meta.replies));
        }
        Platform::Instagram => {
            let _ = writeln!(out, "Media Count: {}", item.media_refs.len());
            let _ = writeln!(out, "Likes: {}", count(meta.likes));
        }
        Platform::Youtube => {
            let _ = writeln!(out, "Media Count: {}", item.media_refs.len());
        }
    }
    Some(out)
}
