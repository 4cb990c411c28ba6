//! Query Engine
//!
//! The single entry point for callers. Chooses the retrieval-augmented
//! translator when a model is configured, otherwise the rule-based one,
//! revalidates whichever descriptor comes back against the current schema,
//! and compiles it to a parameterized query. A query never hard-fails here;
//! schema drift drops the offending fields with recorded warnings.

use crate::config::EngineConfig;
use crate::descriptor::QueryDescriptor;
use crate::error::Result;
use crate::lexicon::DomainLexicon;
use crate::llm::{ChatBackend, HttpChatBackend};
use crate::rag::examples::builtin_examples;
use crate::rag::retriever::ExampleRetriever;
use crate::rag::translator::RetrievalTranslator;
use crate::rules::RuleBasedTranslator;
use crate::schema::CanonicalSchema;
use crate::sql::{SqlBuilder, SqlQuery};
use chrono::NaiveDate;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Strategy tag: which translator answers, decided once at startup from
/// configuration presence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslatorChoice {
    Rules,
    Retrieval,
}

/// Everything a caller gets back for one question.
#[derive(Debug, Clone)]
pub struct AnswerResult {
    pub query_id: String,
    pub descriptor: QueryDescriptor,
    pub explanation: String,
    pub sql: Arc<SqlQuery>,
    pub warnings: Vec<String>,
}

pub struct QueryEngine {
    schema: Arc<CanonicalSchema>,
    rules: RuleBasedTranslator,
    retrieval: Option<RetrievalTranslator>,
    builder: SqlBuilder,
    cache: DashMap<String, Arc<SqlQuery>>,
}

impl QueryEngine {
    /// Build an engine from configuration, constructing the HTTP model
    /// backend only when a credential is present.
    pub fn new(
        config: &EngineConfig,
        lexicon: Arc<DomainLexicon>,
        schema: CanonicalSchema,
    ) -> Result<Self> {
        let backend: Option<Arc<dyn ChatBackend>> = match &config.api_key {
            Some(key) if !key.is_empty() => Some(Arc::new(HttpChatBackend::new(
                key.clone(),
                config.base_url.clone(),
                config.model.clone(),
                config.timeout,
            )?)),
            _ => None,
        };
        Self::with_backend(config, lexicon, schema, backend)
    }

    /// Same as [`QueryEngine::new`] but with an injected backend, used by
    /// tests to run the model path without a network.
    pub fn with_backend(
        config: &EngineConfig,
        lexicon: Arc<DomainLexicon>,
        schema: CanonicalSchema,
        backend: Option<Arc<dyn ChatBackend>>,
    ) -> Result<Self> {
        let schema = Arc::new(schema);
        let rules = RuleBasedTranslator::new(Arc::clone(&lexicon), Arc::clone(&schema));

        let retrieval = backend.map(|backend| {
            RetrievalTranslator::new(
                backend,
                ExampleRetriever::new(builtin_examples(), config.retrieval_k),
                RuleBasedTranslator::new(Arc::clone(&lexicon), Arc::clone(&schema)),
                Arc::clone(&schema),
                config.timeout,
            )
        });

        info!(
            "query engine ready: schema {} with {} fields, translator {:?}",
            schema.version(),
            schema.fields().len(),
            if retrieval.is_some() {
                TranslatorChoice::Retrieval
            } else {
                TranslatorChoice::Rules
            }
        );

        Ok(Self {
            schema,
            rules,
            retrieval,
            builder: SqlBuilder,
            cache: DashMap::new(),
        })
    }

    pub fn choice(&self) -> TranslatorChoice {
        if self.retrieval.is_some() {
            TranslatorChoice::Retrieval
        } else {
            TranslatorChoice::Rules
        }
    }

    pub fn schema(&self) -> &CanonicalSchema {
        &self.schema
    }

    /// Translate a question into a validated descriptor plus compiled query.
    /// Always returns a best-effort answer; ambiguity and model failures are
    /// resolved internally, never raised.
    pub async fn answer(&self, text: &str, now: NaiveDate) -> AnswerResult {
        let query_id = uuid::Uuid::new_v4().to_string();
        info!("[{}] translating: {}", query_id, text);

        let mut descriptor = match &self.retrieval {
            Some(translator) => translator.translate(text, now).await,
            None => self.rules.translate(text, now),
        };

        let mut warnings = Vec::new();
        self.revalidate(&mut descriptor, &mut warnings);
        descriptor.explanation = descriptor.summarize();

        let sql = self.compile_cached(text, &descriptor, &mut warnings);

        for warning in &warnings {
            warn!("[{}] {}", query_id, warning);
        }

        AnswerResult {
            query_id,
            explanation: descriptor.explanation.clone(),
            descriptor,
            sql,
            warnings,
        }
    }

    /// Defense in depth for both paths: drop anything the current schema no
    /// longer carries. The lexicon or the model may reference fields that
    /// were valid under an earlier schema version.
    fn revalidate(&self, descriptor: &mut QueryDescriptor, warnings: &mut Vec<String>) {
        let schema = &self.schema;

        descriptor.select.retain(|field| {
            let known = schema.contains(*field);
            if !known {
                warnings.push(format!(
                    "schema drift: dropped selected field {} not in schema {}",
                    field,
                    schema.version()
                ));
            }
            known
        });
        if descriptor.select.is_empty() {
            warnings.push("selection was empty after validation; selecting all columns".to_string());
            descriptor.select = schema.fields().to_vec();
        }

        descriptor.filters.retain(|filter| {
            match filter.measurement_field() {
                Some(field) if !schema.contains(field) => {
                    warnings.push(format!(
                        "schema drift: dropped predicate on {} not in schema {}",
                        field,
                        schema.version()
                    ));
                    false
                }
                _ => true,
            }
        });

        if let Some(similarity) = &mut descriptor.similarity {
            similarity.fields.retain(|field| {
                let known = schema.contains(*field);
                if !known {
                    warnings.push(format!(
                        "schema drift: dropped similarity field {} not in schema {}",
                        field,
                        schema.version()
                    ));
                }
                known
            });
        }
    }

    /// Compiled predicates are cached by (query text, schema version); the
    /// entries are immutable and last-write-wins races are harmless.
    fn compile_cached(
        &self,
        text: &str,
        descriptor: &QueryDescriptor,
        warnings: &mut Vec<String>,
    ) -> Arc<SqlQuery> {
        let fingerprint = format!("{}::{}", self.schema.version(), text);
        if let Some(hit) = self.cache.get(&fingerprint) {
            return Arc::clone(hit.value());
        }

        let compiled = match self.builder.compile(descriptor) {
            Ok(query) => query,
            Err(e) => {
                // Unreachable after revalidation, but a query must never
                // hard-fail: fall back to an unfiltered full selection.
                warnings.push(format!("compilation failed ({}); using bare query", e));
                let bare = QueryDescriptor {
                    select: self.schema.fields().to_vec(),
                    filters: Vec::new(),
                    comparison: None,
                    ..descriptor.clone()
                };
                self.builder
                    .compile(&bare)
                    .expect("bare descriptor always compiles")
            }
        };

        let compiled = Arc::new(compiled);
        self.cache.insert(fingerprint, Arc::clone(&compiled));
        compiled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::TranslationSource;
    use crate::error::Result as CrateResult;
    use crate::intent::QueryIntent;
    use crate::schema::CanonicalField;
    use async_trait::async_trait;

    struct StaticBackend(String);

    #[async_trait]
    impl ChatBackend for StaticBackend {
        async fn complete(&self, _system: &str, _user: &str) -> CrateResult<String> {
            Ok(self.0.clone())
        }
    }

    fn now() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
    }

    fn rules_engine() -> QueryEngine {
        QueryEngine::new(
            &EngineConfig::default(),
            Arc::new(DomainLexicon::builtin()),
            CanonicalSchema::full("v1"),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_no_credentials_uses_rules_path() {
        let engine = rules_engine();
        assert_eq!(engine.choice(), TranslatorChoice::Rules);
        let answer = engine
            .answer("Show me temperature profiles near the equator", now())
            .await;
        assert_eq!(answer.descriptor.source, TranslationSource::Rules);
        assert_eq!(answer.descriptor.intent, QueryIntent::Visualize);
        assert!(answer.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_answers_are_deterministic_on_rules_path() {
        let engine = rules_engine();
        let a = engine.answer("salinity in the Arabian Sea in 2023", now()).await;
        let b = engine.answer("salinity in the Arabian Sea in 2023", now()).await;
        assert_eq!(a.descriptor, b.descriptor);
        assert_eq!(a.sql.statement, b.sql.statement);
        assert_eq!(a.sql.params, b.sql.params);
    }

    #[tokio::test]
    async fn test_compiled_predicate_is_cached_by_fingerprint() {
        let engine = rules_engine();
        let a = engine.answer("temperature below 2 at 1000m", now()).await;
        let b = engine.answer("temperature below 2 at 1000m", now()).await;
        assert!(Arc::ptr_eq(&a.sql, &b.sql));
    }

    #[tokio::test]
    async fn test_schema_drift_drops_model_fields_with_warning() {
        // Schema without BGC fields; the model answers with DOXY anyway.
        let mut fields = CanonicalField::CORE.to_vec();
        fields.push(CanonicalField::Temperature);
        let schema = CanonicalSchema::new(fields, "v2").unwrap();

        let response = r#"{
            "intent": "tabulate",
            "select": ["FLOAT_ID", "LATITUDE", "LONGITUDE", "TIME", "PRES", "DOXY"],
            "filters": [
                {"kind": "threshold", "field": "DOXY", "op": "<", "value": 50},
                {"kind": "depth", "min": 500.0}
            ]
        }"#;
        let engine = QueryEngine::with_backend(
            &EngineConfig::default(),
            Arc::new(DomainLexicon::builtin()),
            schema,
            Some(Arc::new(StaticBackend(response.to_string()))),
        )
        .unwrap();
        assert_eq!(engine.choice(), TranslatorChoice::Retrieval);

        let answer = engine.answer("low oxygen below 500m", now()).await;
        assert_eq!(answer.descriptor.source, TranslationSource::Model);
        assert!(!answer.descriptor.select.contains(&CanonicalField::Oxygen));
        assert!(answer.warnings.iter().any(|w| w.contains("schema drift")));
        // The depth predicate survives the drop.
        assert!(answer.sql.predicate.contains("pres >= ?"));
        assert!(!answer.sql.predicate.contains("doxy"));
    }

    #[tokio::test]
    async fn test_unrecognizable_query_still_answers() {
        let engine = rules_engine();
        let answer = engine.answer("??", now()).await;
        assert_eq!(answer.descriptor.intent, QueryIntent::Tabulate);
        assert_eq!(answer.descriptor.select, CanonicalField::ALL.to_vec());
        assert!(answer.descriptor.filters.is_empty());
        assert!(!answer.explanation.is_empty());
        assert!(answer.sql.statement.starts_with("SELECT "));
    }
}
