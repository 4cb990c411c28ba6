//! Seed example translations for retrieval.
//!
//! Each example pairs a question with the exact response shape the model is
//! asked to produce. The set covers every intent so retrieval always has a
//! relevant demonstration to offer.

use crate::rag::response::{ModelDescriptor, ModelFilter, ModelGroup, ModelSimilarity};

#[derive(Debug, Clone)]
pub struct TranslationExample {
    pub question: String,
    pub response: ModelDescriptor,
}

fn example(question: &str, response: ModelDescriptor) -> TranslationExample {
    TranslationExample {
        question: question.to_string(),
        response,
    }
}

fn descriptor(intent: &str, select: &[&str], filters: Vec<ModelFilter>) -> ModelDescriptor {
    ModelDescriptor {
        intent: intent.to_string(),
        select: select.iter().map(|s| s.to_string()).collect(),
        filters,
        compare: None,
        similarity: None,
    }
}

const CORE: [&str; 5] = ["FLOAT_ID", "LATITUDE", "LONGITUDE", "TIME", "PRES"];

fn with_core(extra: &[&str]) -> Vec<String> {
    let mut cols: Vec<String> = CORE.iter().map(|s| s.to_string()).collect();
    cols.extend(extra.iter().map(|s| s.to_string()));
    cols
}

/// The compiled-in example set, drawn from the questions the original
/// application shipped as suggestions.
pub fn builtin_examples() -> Vec<TranslationExample> {
    let mut examples = Vec::new();

    examples.push(example(
        "Show me temperature profiles near the equator",
        ModelDescriptor {
            select: with_core(&["TEMP"]),
            ..descriptor(
                "visualize",
                &[],
                vec![ModelFilter::Region {
                    name: "Equator".to_string(),
                    south: -5.0,
                    north: 5.0,
                    west: -180.0,
                    east: 180.0,
                }],
            )
        },
    ));

    examples.push(example(
        "Find salinity data in the Arabian Sea",
        ModelDescriptor {
            select: with_core(&["PSAL"]),
            ..descriptor(
                "tabulate",
                &[],
                vec![ModelFilter::Region {
                    name: "Arabian Sea".to_string(),
                    south: 8.0,
                    north: 25.0,
                    west: 50.0,
                    east: 78.0,
                }],
            )
        },
    ));

    examples.push(example(
        "Display oxygen levels in the Indian Ocean",
        ModelDescriptor {
            select: with_core(&["DOXY"]),
            ..descriptor(
                "tabulate",
                &[],
                vec![ModelFilter::Region {
                    name: "Indian Ocean".to_string(),
                    south: -45.0,
                    north: 25.0,
                    west: 20.0,
                    east: 120.0,
                }],
            )
        },
    ));

    examples.push(example(
        "Show me all data from the last 6 months",
        descriptor(
            "tabulate",
            &[
                "FLOAT_ID",
                "LATITUDE",
                "LONGITUDE",
                "TIME",
                "PRES",
                "TEMP",
                "PSAL",
            ],
            vec![ModelFilter::Time {
                start: "2024-12-01".to_string(),
                end: "2025-06-01".to_string(),
            }],
        ),
    ));

    examples.push(example(
        "Compare salinity in the Arabian Sea and Bay of Bengal in 2023",
        ModelDescriptor {
            intent: "compare".to_string(),
            select: with_core(&["PSAL"]),
            filters: vec![ModelFilter::Time {
                start: "2023-01-01".to_string(),
                end: "2024-01-01".to_string(),
            }],
            compare: Some(vec![
                ModelGroup {
                    label: "Arabian Sea".to_string(),
                    filter: ModelFilter::Region {
                        name: "Arabian Sea".to_string(),
                        south: 8.0,
                        north: 25.0,
                        west: 50.0,
                        east: 78.0,
                    },
                },
                ModelGroup {
                    label: "Bay of Bengal".to_string(),
                    filter: ModelFilter::Region {
                        name: "Bay of Bengal".to_string(),
                        south: 5.0,
                        north: 22.0,
                        west: 80.0,
                        east: 100.0,
                    },
                },
            ]),
            similarity: None,
        },
    ));

    examples.push(example(
        "Where are the floats nearest to 10N 65E?",
        ModelDescriptor {
            intent: "locate".to_string(),
            select: with_core(&[]),
            filters: vec![ModelFilter::Near {
                lat: 10.0,
                lon: 65.0,
                radius_km: Some(300.0),
            }],
            compare: None,
            similarity: Some(ModelSimilarity {
                lat: 10.0,
                lon: 65.0,
                fields: vec![],
            }),
        },
    ));

    examples.push(example(
        "Average temperature deeper than 500 dbar in the tropics",
        ModelDescriptor {
            select: with_core(&["TEMP"]),
            ..descriptor(
                "aggregate",
                &[],
                vec![
                    ModelFilter::Region {
                        name: "Tropics".to_string(),
                        south: -23.5,
                        north: 23.5,
                        west: -180.0,
                        east: 180.0,
                    },
                    ModelFilter::Depth {
                        min: Some(500.0),
                        max: None,
                    },
                ],
            )
        },
    ));

    examples
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::QueryIntent;

    #[test]
    fn test_builtin_examples_are_valid() {
        for example in builtin_examples() {
            let descriptor = example
                .response
                .clone()
                .into_descriptor()
                .unwrap_or_else(|e| panic!("bad example '{}': {}", example.question, e));
            assert!(!descriptor.select.is_empty());
        }
    }

    #[test]
    fn test_every_intent_is_covered() {
        let intents: Vec<QueryIntent> = builtin_examples()
            .into_iter()
            .map(|e| e.response.into_descriptor().unwrap().intent)
            .collect();
        for expected in [
            QueryIntent::Visualize,
            QueryIntent::Compare,
            QueryIntent::Locate,
            QueryIntent::Aggregate,
            QueryIntent::Tabulate,
        ] {
            assert!(intents.contains(&expected), "missing {:?}", expected);
        }
    }
}
