//! Example retriever.
//!
//! Ranks stored example translations by lexical similarity to the incoming
//! question. k is fixed at construction to keep prompt size predictable.

use crate::rag::examples::TranslationExample;
use strsim::jaro_winkler;

pub struct ExampleRetriever {
    examples: Vec<TranslationExample>,
    k: usize,
}

impl ExampleRetriever {
    pub fn new(examples: Vec<TranslationExample>, k: usize) -> Self {
        Self { examples, k }
    }

    /// The k most similar examples, best first.
    pub fn retrieve(&self, query: &str) -> Vec<&TranslationExample> {
        let query_norm = normalize(query);
        let mut scored: Vec<(f64, &TranslationExample)> = self
            .examples
            .iter()
            .map(|e| (similarity(&query_norm, &normalize(&e.question)), e))
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(self.k);
        scored.into_iter().map(|(_, e)| e).collect()
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }
}

/// Lowercase, strip punctuation, collapse whitespace.
fn normalize(s: &str) -> String {
    let filtered: String = s
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    filtered.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Blend of token overlap and Jaro-Winkler over the normalized strings.
/// Token overlap captures shared vocabulary; Jaro-Winkler keeps near-miss
/// spellings from scoring zero.
fn similarity(a: &str, b: &str) -> f64 {
    let tokens_a: std::collections::HashSet<&str> = a.split(' ').filter(|t| !t.is_empty()).collect();
    let tokens_b: std::collections::HashSet<&str> = b.split(' ').filter(|t| !t.is_empty()).collect();
    let overlap = if tokens_a.is_empty() || tokens_b.is_empty() {
        0.0
    } else {
        let shared = tokens_a.intersection(&tokens_b).count() as f64;
        let union = tokens_a.union(&tokens_b).count() as f64;
        shared / union
    };
    0.5 * overlap + 0.5 * jaro_winkler(a, b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::examples::builtin_examples;

    #[test]
    fn test_exact_question_ranks_first() {
        let retriever = ExampleRetriever::new(builtin_examples(), 3);
        let results = retriever.retrieve("Show me temperature profiles near the equator");
        assert_eq!(results.len(), 3);
        assert_eq!(
            results[0].question,
            "Show me temperature profiles near the equator"
        );
    }

    #[test]
    fn test_k_bounds_result_size() {
        let retriever = ExampleRetriever::new(builtin_examples(), 2);
        assert_eq!(retriever.retrieve("salinity").len(), 2);
    }

    #[test]
    fn test_related_vocabulary_ranks_higher() {
        let retriever = ExampleRetriever::new(builtin_examples(), 1);
        let results = retriever.retrieve("compare salinity between two seas");
        assert_eq!(
            results[0].question,
            "Compare salinity in the Arabian Sea and Bay of Bengal in 2023"
        );
    }

    #[test]
    fn test_normalize_strips_punctuation() {
        assert_eq!(normalize("Where are  the floats?!"), "where are the floats");
    }
}
