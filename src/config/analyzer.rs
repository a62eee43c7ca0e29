// src/config/analyzer.rs
use serde::{Deserialize, Serialize};
use std::env;
use tracing::warn;

fn default_provider() -> String {
    "openai".to_string()
}
fn default_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_api_key() -> String {
    "ENV".to_string()
}
fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// "openai" | "mock" | "disabled" (case-insensitive)
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// "ENV" means: read from OPENAI_API_KEY
    #[serde(default = "default_api_key")]
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            api_key: default_api_key(),
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl AnalyzerConfig {
    /// Normalize provider, resolve the "ENV" key, fix out-of-range values.
    pub fn sanitize(&mut self) {
        self.provider = self.provider.trim().to_lowercase();
        if self.provider.is_empty() {
            self.provider = default_provider();
        }

        if self.api_key.trim().eq_ignore_ascii_case("env") {
            self.api_key = match env::var("OPENAI_API_KEY") {
                Ok(k) => k.trim().to_string(),
                Err(_) => {
                    if self.provider == "openai" {
                        warn!(target: "config", "OPENAI_API_KEY not set; analyzer calls will fail");
                    }
                    String::new()
                }
            };
        }

        if self.model.trim().is_empty() {
            self.model = default_model();
        }
        if self.base_url.trim().is_empty() {
            self.base_url = default_base_url();
        }
        if self.timeout_secs == 0 {
            self.timeout_secs = default_timeout_secs();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn env_key_is_resolved() {
        env::set_var("OPENAI_API_KEY", " sk-test ");
        let mut cfg = AnalyzerConfig {
            provider: " OpenAI ".into(),
            timeout_secs: 0,
            ..Default::default()
        };
        cfg.sanitize();
        env::remove_var("OPENAI_API_KEY");

        assert_eq!(cfg.provider, "openai");
        assert_eq!(cfg.api_key, "sk-test");
        assert_eq!(cfg.timeout_secs, 60);
    }

    #[test]
    #[serial]
    fn missing_env_key_leaves_it_empty() {
        env::remove_var("OPENAI_API_KEY");
        let mut cfg = AnalyzerConfig::default();
        cfg.sanitize();
        assert!(cfg.api_key.is_empty());

        let mut literal = AnalyzerConfig {
            api_key: "sk-literal".into(),
            ..Default::default()
        };
        literal.sanitize();
        assert_eq!(literal.api_key, "sk-literal");
    }
}
