//! Analyzer / Transcriber capabilities and the concrete analyzers.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::AnalyzerConfig;
use crate::error::EnrichError;
use crate::model::MediaRef;

// ------------------------------------------------------------
// Public surface
// ------------------------------------------------------------

pub type EnrichFuture<'a> = Pin<Box<dyn Future<Output = Result<String, EnrichError>> + Send + 'a>>;

/// Text-generation capability. Takes a full prompt, returns the raw response.
pub trait Analyzer: Send + Sync {
    fn generate<'a>(&'a self, prompt: &'a str) -> EnrichFuture<'a>;
    /// Provider name for logs.
    fn provider_name(&self) -> &'static str;
}

/// Speech-to-text capability for audio/video media.
pub trait Transcriber: Send + Sync {
    fn transcribe<'a>(&'a self, media: &'a MediaRef) -> EnrichFuture<'a>;
    fn name(&self) -> &'static str;
}

pub type DynAnalyzer = Arc<dyn Analyzer>;

/// Build an analyzer according to config and environment.
///
/// * `AI_TEST_MODE=mock` forces [`MockAnalyzer`].
/// * `provider = "openai"` builds [`OpenAiAnalyzer`].
/// * `provider = "mock"` builds [`MockAnalyzer`].
/// * anything else yields [`DisabledAnalyzer`].
pub fn build_analyzer(config: &AnalyzerConfig) -> anyhow::Result<DynAnalyzer> {
    if std::env::var("AI_TEST_MODE")
        .map(|v| v == "mock")
        .unwrap_or(false)
    {
        return Ok(Arc::new(MockAnalyzer::default()));
    }

    match config.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiAnalyzer::new(config)?)),
        "mock" => Ok(Arc::new(MockAnalyzer::default())),
        _ => Ok(Arc::new(DisabledAnalyzer)),
    }
}

// ------------------------------------------------------------
// OpenAI-compatible chat completions
// ------------------------------------------------------------

pub struct OpenAiAnalyzer {
    http: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl OpenAiAnalyzer {
    pub fn new(config: &AnalyzerConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("content-tracker/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("building analyzer http client")?;
        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
        })
    }

    async fn generate_impl(&self, prompt: &str) -> Result<String, EnrichError> {
        if self.api_key.is_empty() {
            return Err(EnrichError::Analyzer("missing api key".into()));
        }

        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
        }
        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            #[serde(default)]
            content: Option<String>,
        }

        let req = Req {
            model: &self.model,
            messages: vec![Msg {
                role: "user",
                content: prompt,
            }],
            temperature: 0.3,
        };

        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .map_err(|e| EnrichError::Analyzer(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            warn!(target: "enrich", %status, model = %self.model, "analyzer http error");
            return Err(EnrichError::Analyzer(format!("http status {status}")));
        }

        let body: Resp = resp
            .json()
            .await
            .map_err(|e| EnrichError::Analyzer(format!("decoding response: {e}")))?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        debug!(target: "enrich", chars = content.len(), "analyzer responded");
        Ok(content)
    }
}

impl Analyzer for OpenAiAnalyzer {
    fn generate<'a>(&'a self, prompt: &'a str) -> EnrichFuture<'a> {
        Box::pin(self.generate_impl(prompt))
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}

// ------------------------------------------------------------
// Disabled / mock
// ------------------------------------------------------------

/// Fails every call; used when no provider is configured.
pub struct DisabledAnalyzer;

impl Analyzer for DisabledAnalyzer {
    fn generate<'a>(&'a self, _prompt: &'a str) -> EnrichFuture<'a> {
        Box::pin(async { Err(EnrichError::Analyzer("analyzer disabled".into())) })
    }

    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}

/// Returns a fixed response for local runs and tests.
#[derive(Debug, Clone)]
pub struct MockAnalyzer {
    pub fixed: String,
}

impl MockAnalyzer {
    pub fn new(fixed: impl Into<String>) -> Self {
        Self {
            fixed: fixed.into(),
        }
    }
}

impl Default for MockAnalyzer {
    fn default() -> Self {
        Self::new(
            "SUMMARY: Mock summary of the content.\n\
             TOPIC: Mock topic\n\
             SENTIMENT: Neutral\n\
             CONTENT_TYPE: Personal\n\
             ENGAGEMENT_POTENTIAL: 5\n\
             KEY_THEMES: mock, offline, testing",
        )
    }
}

impl Analyzer for MockAnalyzer {
    fn generate<'a>(&'a self, _prompt: &'a str) -> EnrichFuture<'a> {
        let out = self.fixed.clone();
        Box::pin(async move { Ok(out) })
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn cfg(provider: &str) -> AnalyzerConfig {
        AnalyzerConfig {
            provider: provider.to_string(),
            ..Default::default()
        }
    }

    #[test]
    #[serial]
    fn factory_picks_provider_by_name() {
        std::env::remove_var("AI_TEST_MODE");
        assert_eq!(build_analyzer(&cfg("mock")).unwrap().provider_name(), "mock");
        assert_eq!(build_analyzer(&cfg("disabled")).unwrap().provider_name(), "disabled");
        assert_eq!(build_analyzer(&cfg("openai")).unwrap().provider_name(), "openai");
    }

    #[test]
    #[serial]
    fn test_mode_env_forces_mock() {
        std::env::set_var("AI_TEST_MODE", "mock");
        let a = build_analyzer(&cfg("openai")).unwrap();
        std::env::remove_var("AI_TEST_MODE");
        assert_eq!(a.provider_name(), "mock");
    }

    #[tokio::test]
    async fn disabled_analyzer_fails_and_openai_needs_a_key() {
        let err = DisabledAnalyzer.generate("x").await.unwrap_err();
        assert!(matches!(err, EnrichError::Analyzer(_)));

        let openai = OpenAiAnalyzer::new(&AnalyzerConfig {
            api_key: String::new(),
            ..Default::default()
        })
        .unwrap();
        let err = openai.generate("x").await.unwrap_err();
        assert_eq!(err, EnrichError::Analyzer("missing api key".into()));
    }
}
