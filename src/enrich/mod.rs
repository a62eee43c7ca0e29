// src/enrich/mod.rs
//! Enrichment: turn an item's text into an [`AnalysisResult`].
//!
//! Rules, applied in order:
//! 1. blank text fails with [`EnrichError::NoContent`];
//! 2. fewer than [`SHORT_CONTENT_WORDS`] words bypasses the analyzer;
//! 3. otherwise the analyzer response is parsed, validated and missing
//!    summary/topic are filled in from the original text.

pub mod analyzer;
pub mod parser;
pub mod prompt;

use metrics::counter;
use tracing::{debug, instrument, warn};

use crate::error::EnrichError;
use crate::model::{AnalysisResult, Platform, Sentiment, DEFAULT_CONTENT_TYPE, DEFAULT_ENGAGEMENT};

pub use analyzer::{build_analyzer, Analyzer, DynAnalyzer, Transcriber};

/// Inputs with fewer words skip the analyzer.
pub const SHORT_CONTENT_WORDS: usize = 5;
pub const FALLBACK_SUMMARY_CHARS: usize = 100;
pub const FALLBACK_TOPIC: &str = "Social media post";

#[derive(Clone)]
pub struct Enricher {
    analyzer: DynAnalyzer,
}

impl Enricher {
    pub fn new(analyzer: DynAnalyzer) -> Self {
        Self { analyzer }
    }

    pub fn provider_name(&self) -> &'static str {
        self.analyzer.provider_name()
    }

    #[instrument(level = "debug", skip(self, text), fields(provider = self.analyzer.provider_name()))]
    pub async fn analyze(
        &self,
        text: &str,
        platform: Platform,
        handle: &str,
    ) -> Result<AnalysisResult, EnrichError> {
        let text = text.trim();
        if text.is_empty() {
            counter!("enrich_failures_total").increment(1);
            return Err(EnrichError::NoContent);
        }

        let words = text.split_whitespace().count();
        if words < SHORT_CONTENT_WORDS {
            counter!("enrich_bypass_total").increment(1);
            debug!(target: "enrich", words, "short content; analyzer bypassed");
            return Ok(short_content_result(text, platform));
        }

        let prompt = prompt::build_prompt(text, platform, handle);
        let response = self.analyzer.generate(&prompt).await.map_err(|e| {
            counter!("enrich_failures_total").increment(1);
            e
        })?;

        let parsed = match parser::parse_response(&response) {
            Ok(p) => p,
            Err(e) => {
                counter!("enrich_failures_total").increment(1);
                warn!(target: "enrich", error = %e, chars = response.len(), "analyzer response rejected");
                return Err(e);
            }
        };

        Ok(AnalysisResult {
            summary: parsed.summary.unwrap_or_else(|| fallback_summary(text)),
            topic: parsed.topic.unwrap_or_else(|| FALLBACK_TOPIC.to_string()),
            sentiment: parsed.sentiment,
            content_type: parsed.content_type,
            engagement_potential: parsed.engagement_potential,
            key_themes: parsed.key_themes,
        })
    }
}

fn short_content_result(text: &str, platform: Platform) -> AnalysisResult {
    AnalysisResult {
        summary: text.to_string(),
        topic: format!("Short {} {}", platform.display_name(), platform.item_noun()),
        sentiment: Sentiment::Neutral,
        content_type: DEFAULT_CONTENT_TYPE.to_string(),
        engagement_potential: DEFAULT_ENGAGEMENT,
        key_themes: Vec::new(),
    }
}

/// First characters of the text, marked when cut.
pub fn fallback_summary(text: &str) -> String {
    if text.chars().count() <= FALLBACK_SUMMARY_CHARS {
        text.to_string()
    } else {
        let cut: String = text.chars().take(FALLBACK_SUMMARY_CHARS).collect();
        format!("{cut}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrich::analyzer::{EnrichFuture, MockAnalyzer};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Counting {
        calls: AtomicUsize,
        reply: String,
    }

    impl Analyzer for Counting {
        fn generate<'a>(&'a self, _prompt: &'a str) -> EnrichFuture<'a> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let out = self.reply.clone();
            Box::pin(async move { Ok(out) })
        }

        fn provider_name(&self) -> &'static str {
            "counting"
        }
    }

    fn counting(reply: &str) -> Arc<Counting> {
        Arc::new(Counting {
            calls: AtomicUsize::new(0),
            reply: reply.to_string(),
        })
    }

    const LONG: &str = "The team shipped a new release with faster builds today";

    #[tokio::test]
    async fn short_text_bypasses_the_analyzer() {
        let a = counting("SUMMARY: never used");
        let e = Enricher::new(a.clone());
        let r = e.analyze("gm frens", Platform::Twitter, "alice").await.unwrap();
        assert_eq!(a.calls.load(Ordering::SeqCst), 0);
        assert_eq!(r.summary, "gm frens");
        assert_eq!(r.topic, "Short Twitter tweet");
        assert_eq!(r.sentiment, Sentiment::Neutral);
        assert_eq!(r.engagement_potential, 5);
        assert!(r.key_themes.is_empty());
    }

    #[tokio::test]
    async fn blank_text_is_no_content() {
        let a = counting("SUMMARY: x");
        let e = Enricher::new(a.clone());
        let err = e.analyze("  \n ", Platform::Instagram, "bob").await.unwrap_err();
        assert_eq!(err, EnrichError::NoContent);
        assert_eq!(a.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn parsed_sections_become_the_result() {
        let e = Enricher::new(Arc::new(MockAnalyzer::new("SUMMARY:\nfoo\n\nTOPIC:\nbar")));
        let r = e.analyze(LONG, Platform::Youtube, "chan").await.unwrap();
        assert_eq!(r.summary, "foo");
        assert_eq!(r.topic, "bar");
        assert_eq!(r.sentiment, Sentiment::Neutral);
        assert_eq!(r.content_type, DEFAULT_CONTENT_TYPE);
    }

    #[tokio::test]
    async fn missing_summary_or_topic_is_filled_in() {
        let e = Enricher::new(Arc::new(MockAnalyzer::new("TOPIC: Releases")));
        let r = e.analyze(LONG, Platform::Youtube, "chan").await.unwrap();
        assert_eq!(r.summary, LONG);

        let e = Enricher::new(Arc::new(MockAnalyzer::new("SUMMARY: Shipped.")));
        let r = e.analyze(LONG, Platform::Youtube, "chan").await.unwrap();
        assert_eq!(r.topic, FALLBACK_TOPIC);
    }

    #[tokio::test]
    async fn empty_and_unparseable_responses_fail() {
        let e = Enricher::new(Arc::new(MockAnalyzer::new("   ")));
        assert_eq!(
            e.analyze(LONG, Platform::Twitter, "a").await,
            Err(EnrichError::EmptyResponse)
        );

        let e = Enricher::new(Arc::new(MockAnalyzer::new("I cannot help with that.")));
        assert_eq!(
            e.analyze(LONG, Platform::Twitter, "a").await,
            Err(EnrichError::Unparseable)
        );
    }

    #[test]
    fn fallback_summary_is_truncated_with_marker() {
        let long = "x".repeat(150);
        let s = fallback_summary(&long);
        assert_eq!(s.len(), 103);
        assert!(s.ends_with("..."));
        assert_eq!(fallback_summary("short"), "short");
    }
}
