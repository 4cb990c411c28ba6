//! Engine configuration surface.
//!
//! Consumed, not interpreted: presence of an API key decides the translation
//! strategy, and the schema version keys the compiled-predicate cache.
//! Components never read the environment themselves.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Model credential; absent means the model path is never attempted.
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    /// Upper bound on the external model call.
    pub timeout: Duration,
    /// Number of retrieved examples per prompt.
    pub retrieval_k: usize,
    /// Cache-invalidation tag for compiled predicates.
    pub schema_version: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4".to_string(),
            timeout: Duration::from_secs(20),
            retrieval_k: 3,
            schema_version: "v1".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_key: std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty()),
            base_url: std::env::var("OPENAI_BASE_URL").unwrap_or(defaults.base_url),
            model: std::env::var("FLOATCHAT_MODEL").unwrap_or(defaults.model),
            timeout: std::env::var("FLOATCHAT_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            retrieval_k: std::env::var("FLOATCHAT_RETRIEVAL_K")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.retrieval_k),
            schema_version: std::env::var("FLOATCHAT_SCHEMA_VERSION")
                .unwrap_or(defaults.schema_version),
        }
    }

    pub fn model_configured(&self) -> bool {
        self.api_key.as_deref().map_or(false, |k| !k.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_have_no_credential() {
        let config = EngineConfig::default();
        assert!(!config.model_configured());
        assert_eq!(config.retrieval_k, 3);
    }

    #[test]
    fn test_empty_key_counts_as_unconfigured() {
        let config = EngineConfig {
            api_key: Some(String::new()),
            ..EngineConfig::default()
        };
        assert!(!config.model_configured());
    }
}
