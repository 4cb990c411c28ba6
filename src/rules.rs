//! Rule-Based Translator
//!
//! Deterministic composition of the intent classifier and entity extractor
//! into a query descriptor. This is the baseline path: no randomness, no
//! external calls, and it never fails. An entity-free query yields a
//! descriptor selecting every canonical column with no filters.

use crate::descriptor::{
    ComparisonGroup, ComparisonSplit, FilterPredicate, QueryDescriptor, SimilarityRequest,
    TranslationSource,
};
use crate::extract::{EntityExtractor, ExtractedEntity};
use crate::intent::{classify, QueryIntent};
use crate::lexicon::{BoundingBox, DomainLexicon};
use crate::schema::{CanonicalField, CanonicalSchema};
use chrono::NaiveDate;
use std::sync::Arc;

pub struct RuleBasedTranslator {
    extractor: EntityExtractor,
    schema: Arc<CanonicalSchema>,
}

impl RuleBasedTranslator {
    pub fn new(lexicon: Arc<DomainLexicon>, schema: Arc<CanonicalSchema>) -> Self {
        Self {
            extractor: EntityExtractor::new(lexicon),
            schema,
        }
    }

    pub fn translate(&self, text: &str, now: NaiveDate) -> QueryDescriptor {
        let entities = self.extractor.extract(text, now);
        let mut intent = classify(text, &entities);

        let mentioned: Vec<CanonicalField> = entities
            .iter()
            .filter_map(|e| match e {
                ExtractedEntity::Variable { field } => Some(*field),
                _ => None,
            })
            .collect();

        // No variable mentions means the full canonical selection.
        let select = if mentioned.is_empty() {
            self.schema.fields().to_vec()
        } else {
            let mut cols = CanonicalField::CORE.to_vec();
            for field in &mentioned {
                if !cols.contains(field) {
                    cols.push(*field);
                }
            }
            cols
        };

        let mut filters: Vec<FilterPredicate> = Vec::new();
        let mut region_boxes: Vec<(String, BoundingBox)> = Vec::new();
        let mut time_windows: Vec<(NaiveDate, NaiveDate)> = Vec::new();
        let mut near: Option<(f64, f64, f64)> = None;

        for entity in &entities {
            match entity {
                ExtractedEntity::Region { name, bbox } => {
                    region_boxes.push((name.clone(), *bbox));
                    filters.push(FilterPredicate::BoundingBox {
                        region: name.clone(),
                        south: bbox.south,
                        north: bbox.north,
                        west: bbox.west,
                        east: bbox.east,
                    });
                }
                ExtractedEntity::NearPoint {
                    lat,
                    lon,
                    radius_km,
                } => {
                    near.get_or_insert((*lat, *lon, *radius_km));
                    filters.push(FilterPredicate::NearPoint {
                        lat: *lat,
                        lon: *lon,
                        radius_km: *radius_km,
                    });
                }
                ExtractedEntity::TimeRange { start, end, .. } => {
                    time_windows.push((*start, *end));
                    filters.push(FilterPredicate::TimeBetween {
                        start: *start,
                        end: *end,
                    });
                }
                ExtractedEntity::Threshold {
                    field, op, value, ..
                } => {
                    filters.push(FilterPredicate::Compare {
                        field: *field,
                        op: *op,
                        value: *value,
                    });
                }
                ExtractedEntity::DepthRange { min, max } => {
                    filters.push(FilterPredicate::PressureRange {
                        min: *min,
                        max: *max,
                    });
                }
                ExtractedEntity::Variable { .. } => {}
            }
        }

        // A comparison needs exactly two disjoint regions or time windows to
        // split on; anything else degrades to a plain table with all filters
        // merged.
        let mut comparison = None;
        if intent == QueryIntent::Compare {
            comparison = comparison_split(&region_boxes, &time_windows, &mut filters);
            if comparison.is_none() {
                intent = QueryIntent::Tabulate;
            }
        }

        // Nearest-neighbour questions anchor on an explicit point when one
        // was given, otherwise on the first named region's center.
        let similarity = if intent == QueryIntent::Locate {
            near.map(|(lat, lon, _)| SimilarityRequest {
                lat,
                lon,
                fields: mentioned.clone(),
            })
            .or_else(|| {
                region_boxes.first().map(|(_, bbox)| {
                    let (lat, lon) = bbox.center();
                    SimilarityRequest {
                        lat,
                        lon,
                        fields: mentioned.clone(),
                    }
                })
            })
        } else {
            None
        };

        let mut descriptor = QueryDescriptor {
            intent,
            select,
            filters,
            comparison,
            similarity,
            explanation: String::new(),
            source: TranslationSource::Rules,
        };
        descriptor.explanation = descriptor.summarize();
        descriptor
    }
}

fn comparison_split(
    regions: &[(String, BoundingBox)],
    times: &[(NaiveDate, NaiveDate)],
    filters: &mut Vec<FilterPredicate>,
) -> Option<ComparisonSplit> {
    if regions.len() == 2 && !regions[0].1.overlaps(&regions[1].1) {
        let groups = [
            region_group(&regions[0]),
            region_group(&regions[1]),
        ];
        filters.retain(|f| !matches!(f, FilterPredicate::BoundingBox { .. }));
        return Some(ComparisonSplit { groups });
    }

    if times.len() == 2 {
        let (a, b) = (times[0], times[1]);
        let disjoint = a.1 <= b.0 || b.1 <= a.0;
        if disjoint {
            let groups = [time_group(a), time_group(b)];
            filters.retain(|f| !matches!(f, FilterPredicate::TimeBetween { .. }));
            return Some(ComparisonSplit { groups });
        }
    }

    None
}

fn region_group((name, bbox): &(String, BoundingBox)) -> ComparisonGroup {
    ComparisonGroup {
        label: name.clone(),
        predicate: FilterPredicate::BoundingBox {
            region: name.clone(),
            south: bbox.south,
            north: bbox.north,
            west: bbox.west,
            east: bbox.east,
        },
    }
}

fn time_group((start, end): (NaiveDate, NaiveDate)) -> ComparisonGroup {
    ComparisonGroup {
        label: format!("{} to {}", start, end),
        predicate: FilterPredicate::TimeBetween { start, end },
    }
}
