//! Intent Classifier
//!
//! Keyword rules with a fixed precedence order; ties never score, the first
//! matching rule wins. Defaults to Tabulate when no strong signal is found.

use crate::extract::ExtractedEntity;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryIntent {
    Visualize,
    Compare,
    Locate,
    Aggregate,
    Tabulate,
}

lazy_static! {
    static ref COMPARE_RE: Regex =
        Regex::new(r"\b(compare|compared|comparison|versus|vs|difference between)\b").unwrap();
    static ref LOCATE_RE: Regex =
        Regex::new(r"\b(where|locate|located|location|nearest|closest)\b").unwrap();
    static ref PLOT_RE: Regex =
        Regex::new(r"\b(plot|profile|profiles|trend|trends|visuali[sz]e|graph|chart|map)\b")
            .unwrap();
    static ref AGGREGATE_RE: Regex =
        Regex::new(r"\b(average|mean|count|how many|maximum|minimum|max|min|total|sum)\b").unwrap();
    static ref NEAR_RE: Regex = Regex::new(r"\bnear\b").unwrap();
}

/// Classify a query. Precedence: Compare, then Locate (when no plot language
/// is present), then Visualize, then Aggregate, then Tabulate.
pub fn classify(text: &str, entities: &[ExtractedEntity]) -> QueryIntent {
    let lower = text.to_lowercase();

    if COMPARE_RE.is_match(&lower) {
        return QueryIntent::Compare;
    }

    let has_plot_language = PLOT_RE.is_match(&lower);
    let near_point = entities
        .iter()
        .any(|e| matches!(e, ExtractedEntity::NearPoint { .. }));
    if (LOCATE_RE.is_match(&lower) || (NEAR_RE.is_match(&lower) && near_point))
        && !has_plot_language
    {
        return QueryIntent::Locate;
    }

    if has_plot_language {
        return QueryIntent::Visualize;
    }

    if AGGREGATE_RE.is_match(&lower) {
        return QueryIntent::Aggregate;
    }

    QueryIntent::Tabulate
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_language_is_visualize() {
        assert_eq!(
            classify("Show me temperature profiles near the equator", &[]),
            QueryIntent::Visualize
        );
    }

    #[test]
    fn test_compare_wins_over_plot() {
        assert_eq!(
            classify("Compare temperature profiles from different regions", &[]),
            QueryIntent::Compare
        );
    }

    #[test]
    fn test_locate_requires_no_plot_language() {
        assert_eq!(
            classify("Where are the nearest floats?", &[]),
            QueryIntent::Locate
        );
        assert_eq!(
            classify("Plot the nearest floats", &[]),
            QueryIntent::Visualize
        );
    }

    #[test]
    fn test_near_alone_is_not_locate() {
        // "near" only signals Locate together with an extracted point.
        assert_eq!(
            classify("salinity near the surface", &[]),
            QueryIntent::Tabulate
        );
        let point = ExtractedEntity::NearPoint {
            lat: 10.0,
            lon: 65.0,
            radius_km: 300.0,
        };
        assert_eq!(
            classify("floats near 10N 65E", std::slice::from_ref(&point)),
            QueryIntent::Locate
        );
    }

    #[test]
    fn test_aggregate_language() {
        assert_eq!(
            classify("average salinity in the Arabian Sea", &[]),
            QueryIntent::Aggregate
        );
        assert_eq!(
            classify("how many floats reported in 2023", &[]),
            QueryIntent::Aggregate
        );
    }

    #[test]
    fn test_default_is_tabulate() {
        assert_eq!(
            classify("temperature below 2 at 1000m", &[]),
            QueryIntent::Tabulate
        );
    }
}
