//! Retrieval-Augmented Translator
//!
//! The model path. Retrieval, prompt construction, one bounded model call,
//! and a strict parse; every failure mode collapses into rule-based
//! fallback, recorded on the descriptor but never surfaced as an error.

use crate::descriptor::{FallbackReason, QueryDescriptor, TranslationSource};
use crate::llm::ChatBackend;
use crate::rag::response::ModelDescriptor;
use crate::rag::retriever::ExampleRetriever;
use crate::rules::RuleBasedTranslator;
use crate::schema::CanonicalSchema;
use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const SYSTEM_PROMPT: &str = "You are a query translator for an ARGO float profile database. \
    Always respond with a single JSON object and no other text.";

pub struct RetrievalTranslator {
    backend: Arc<dyn ChatBackend>,
    retriever: ExampleRetriever,
    fallback: RuleBasedTranslator,
    schema: Arc<CanonicalSchema>,
    timeout: Duration,
}

impl RetrievalTranslator {
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        retriever: ExampleRetriever,
        fallback: RuleBasedTranslator,
        schema: Arc<CanonicalSchema>,
        timeout: Duration,
    ) -> Self {
        Self {
            backend,
            retriever,
            fallback,
            schema,
            timeout,
        }
    }

    pub async fn translate(&self, text: &str, now: NaiveDate) -> QueryDescriptor {
        match self.try_model(text).await {
            Ok(descriptor) => descriptor,
            Err(reason) => {
                warn!("{}; falling back to rule-based translation", reason);
                let mut descriptor = self.fallback.translate(text, now);
                descriptor.source = TranslationSource::ModelFallback(reason);
                descriptor
            }
        }
    }

    async fn try_model(&self, text: &str) -> std::result::Result<QueryDescriptor, FallbackReason> {
        let prompt = self.build_prompt(text);

        let raw = tokio::time::timeout(self.timeout, self.backend.complete(SYSTEM_PROMPT, &prompt))
            .await
            .map_err(|_| FallbackReason::Timeout)?
            .map_err(|e| {
                debug!("model transport error: {}", e);
                FallbackReason::Transport
            })?;

        let json = extract_json(&raw).ok_or(FallbackReason::MalformedResponse)?;
        let parsed: ModelDescriptor =
            serde_json::from_str(json).map_err(|_| FallbackReason::MalformedResponse)?;
        parsed.into_descriptor().map_err(|e| {
            debug!("model descriptor rejected: {}", e);
            FallbackReason::InvalidDescriptor
        })
    }

    fn build_prompt(&self, text: &str) -> String {
        let mut parts = Vec::new();

        parts.push(self.schema.describe());

        parts.push("\nRESPONSE FORMAT:".to_string());
        parts.push("- intent: one of visualize | compare | locate | aggregate | tabulate".to_string());
        parts.push("- select: canonical field names to return, in order".to_string());
        parts.push("- filters: array of objects tagged by 'kind'".to_string());
        parts.push("  - {\"kind\": \"region\", \"name\", \"south\", \"north\", \"west\", \"east\"}".to_string());
        parts.push("  - {\"kind\": \"near\", \"lat\", \"lon\", \"radius_km\"}".to_string());
        parts.push("  - {\"kind\": \"time\", \"start\": \"YYYY-MM-DD\", \"end\": \"YYYY-MM-DD\"} (end exclusive)".to_string());
        parts.push("  - {\"kind\": \"threshold\", \"field\", \"op\": \"< <= > >= =\", \"value\"}".to_string());
        parts.push("  - {\"kind\": \"depth\", \"min\", \"max\"} (pressure in dbar, either side optional)".to_string());
        parts.push("- compare: only for compare intent, exactly two {\"label\", \"filter\"} groups".to_string());
        parts.push("- similarity: only for locate intent, {\"lat\", \"lon\", \"fields\"}".to_string());
        parts.push("Do not invent field names; use only the canonical names listed above.".to_string());

        let examples = self.retriever.retrieve(text);
        if !examples.is_empty() {
            parts.push("\nEXAMPLES:".to_string());
            for example in examples {
                parts.push(format!("Q: {}", example.question));
                match serde_json::to_string(&example.response) {
                    Ok(json) => parts.push(format!("A: {}", json)),
                    Err(_) => continue,
                }
            }
        }

        parts.push(format!("\nUSER QUESTION: {}", text));
        parts.push("Translate the user question into the JSON response format.".to_string());

        parts.join("\n")
    }
}

/// Slice out the JSON object from a response that may be wrapped in code
/// fences or prose.
fn extract_json(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&raw[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FloatChatError, Result};
    use crate::intent::QueryIntent;
    use crate::lexicon::DomainLexicon;
    use crate::rag::examples::builtin_examples;
    use async_trait::async_trait;

    struct StaticBackend(String);

    #[async_trait]
    impl ChatBackend for StaticBackend {
        async fn complete(&self, _system: &str, _user: &str) -> Result<String> {
            Ok(self.0.clone())
        }
    }

    struct SlowBackend;

    #[async_trait]
    impl ChatBackend for SlowBackend {
        async fn complete(&self, _system: &str, _user: &str) -> Result<String> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok("{}".to_string())
        }
    }

    struct FailingBackend;

    #[async_trait]
    impl ChatBackend for FailingBackend {
        async fn complete(&self, _system: &str, _user: &str) -> Result<String> {
            Err(FloatChatError::Llm("connection refused".to_string()))
        }
    }

    fn translator(backend: Arc<dyn ChatBackend>, timeout: Duration) -> RetrievalTranslator {
        let lexicon = Arc::new(DomainLexicon::builtin());
        let schema = Arc::new(CanonicalSchema::full("v1"));
        RetrievalTranslator::new(
            backend,
            ExampleRetriever::new(builtin_examples(), 3),
            RuleBasedTranslator::new(Arc::clone(&lexicon), Arc::clone(&schema)),
            schema,
            timeout,
        )
    }

    fn now() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
    }

    #[tokio::test]
    async fn test_valid_model_response_is_used() {
        let response = r#"{
            "intent": "tabulate",
            "select": ["FLOAT_ID", "LATITUDE", "LONGITUDE", "TIME", "PRES", "PSAL"],
            "filters": [{"kind": "region", "name": "Arabian Sea",
                         "south": 8, "north": 25, "west": 50, "east": 78}]
        }"#;
        let t = translator(
            Arc::new(StaticBackend(response.to_string())),
            Duration::from_secs(1),
        );
        let d = t.translate("Find salinity data in the Arabian Sea", now()).await;
        assert_eq!(d.source, TranslationSource::Model);
        assert_eq!(d.intent, QueryIntent::Tabulate);
        assert_eq!(d.filters.len(), 1);
    }

    #[tokio::test]
    async fn test_code_fenced_response_is_accepted() {
        let response = "```json\n{\"intent\": \"tabulate\", \"select\": [\"TEMP\"]}\n```";
        let t = translator(
            Arc::new(StaticBackend(response.to_string())),
            Duration::from_secs(1),
        );
        let d = t.translate("temperature data", now()).await;
        assert_eq!(d.source, TranslationSource::Model);
    }

    #[tokio::test]
    async fn test_malformed_response_falls_back() {
        let t = translator(
            Arc::new(StaticBackend("sorry, I can't do that".to_string())),
            Duration::from_secs(1),
        );
        let d = t.translate("Find salinity data in the Arabian Sea", now()).await;
        assert_eq!(
            d.source,
            TranslationSource::ModelFallback(FallbackReason::MalformedResponse)
        );
        // Fallback still produced a usable descriptor.
        assert!(!d.select.is_empty());
        assert!(d
            .filters
            .iter()
            .any(|f| matches!(f, crate::descriptor::FilterPredicate::BoundingBox { .. })));
    }

    #[tokio::test]
    async fn test_invalid_descriptor_falls_back() {
        let response = r#"{"intent": "tabulate", "select": ["wind_speed"]}"#;
        let t = translator(
            Arc::new(StaticBackend(response.to_string())),
            Duration::from_secs(1),
        );
        let d = t.translate("wind speed in the Arabian Sea", now()).await;
        assert_eq!(
            d.source,
            TranslationSource::ModelFallback(FallbackReason::InvalidDescriptor)
        );
    }

    #[tokio::test]
    async fn test_timeout_falls_back() {
        let t = translator(Arc::new(SlowBackend), Duration::from_millis(20));
        let d = t.translate("salinity in the Arabian Sea", now()).await;
        assert_eq!(
            d.source,
            TranslationSource::ModelFallback(FallbackReason::Timeout)
        );
        assert!(!d.select.is_empty());
    }

    #[tokio::test]
    async fn test_transport_error_falls_back() {
        let t = translator(Arc::new(FailingBackend), Duration::from_secs(1));
        let d = t.translate("salinity in the Arabian Sea", now()).await;
        assert_eq!(
            d.source,
            TranslationSource::ModelFallback(FallbackReason::Transport)
        );
    }

    #[tokio::test]
    async fn test_prompt_contains_schema_and_examples() {
        let t = translator(Arc::new(SlowBackend), Duration::from_secs(1));
        let prompt = t.build_prompt("Find salinity data in the Arabian Sea");
        assert!(prompt.contains("argo_profiles"));
        assert!(prompt.contains("EXAMPLES:"));
        assert!(prompt.contains("Find salinity data in the Arabian Sea"));
    }
}
