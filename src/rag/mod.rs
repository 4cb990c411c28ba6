//! Retrieval-augmented translation.
//!
//! Builds a prompt from the user's question, the canonical schema, and a
//! small set of retrieved example translations; asks the external model for
//! a structured response; and falls back to the rule-based translator on any
//! failure, so callers never see the difference.

pub mod examples;
pub mod response;
pub mod retriever;
pub mod translator;

pub use examples::TranslationExample;
pub use response::ModelDescriptor;
pub use retriever::ExampleRetriever;
pub use translator::RetrievalTranslator;
