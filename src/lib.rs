//! Natural-language query engine for ARGO float profile data.
//!
//! Turns a free-form question into a classified intent, extracted entities,
//! and a schema-bound, parameterized query descriptor, using a
//! retrieval-augmented model path with a deterministic rule-based fallback.

pub mod config;
pub mod descriptor;
pub mod engine;
pub mod error;
pub mod extract;
pub mod intent;
pub mod lexicon;
pub mod llm;
pub mod rag;
pub mod rules;
pub mod schema;
pub mod sql;
