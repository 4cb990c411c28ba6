//! Model response transport shape.
//!
//! The external model emits this JSON shape; it is parsed strictly (unknown
//! keys are rejected) and then validated field by field against the
//! canonical schema enum before it may become a `QueryDescriptor`. Any
//! violation aborts the model path and triggers rule-based fallback.

use crate::descriptor::{
    CompareOp, ComparisonGroup, ComparisonSplit, FilterPredicate, QueryDescriptor,
    SimilarityRequest, TranslationSource,
};
use crate::error::{FloatChatError, Result};
use crate::extract::DEFAULT_NEAR_RADIUS_KM;
use crate::intent::QueryIntent;
use crate::schema::CanonicalField;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelDescriptor {
    pub intent: String,
    pub select: Vec<String>,
    #[serde(default)]
    pub filters: Vec<ModelFilter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compare: Option<Vec<ModelGroup>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity: Option<ModelSimilarity>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum ModelFilter {
    Region {
        name: String,
        south: f64,
        north: f64,
        west: f64,
        east: f64,
    },
    Near {
        lat: f64,
        lon: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        radius_km: Option<f64>,
    },
    Time {
        start: String,
        end: String,
    },
    Threshold {
        field: String,
        op: String,
        value: f64,
    },
    Depth {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelGroup {
    pub label: String,
    pub filter: ModelFilter,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelSimilarity {
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub fields: Vec<String>,
}

impl ModelDescriptor {
    /// Validate and convert into the shared descriptor contract. Errors here
    /// are never surfaced to the caller; they only trigger fallback.
    pub fn into_descriptor(self) -> Result<QueryDescriptor> {
        let intent = parse_intent(&self.intent)?;

        if self.select.is_empty() {
            return Err(FloatChatError::Translation(
                "model selected no fields".to_string(),
            ));
        }
        let mut select = Vec::new();
        for name in &self.select {
            let field = parse_field(name)?;
            if !select.contains(&field) {
                select.push(field);
            }
        }

        let mut filters = Vec::new();
        for filter in self.filters {
            filters.push(convert_filter(filter)?);
        }

        let comparison = match self.compare {
            None => None,
            Some(groups) => {
                let [a, b]: [ModelGroup; 2] = groups.try_into().map_err(|_| {
                    FloatChatError::Translation(
                        "comparison must have exactly two groups".to_string(),
                    )
                })?;
                Some(ComparisonSplit {
                    groups: [
                        ComparisonGroup {
                            label: a.label,
                            predicate: convert_filter(a.filter)?,
                        },
                        ComparisonGroup {
                            label: b.label,
                            predicate: convert_filter(b.filter)?,
                        },
                    ],
                })
            }
        };

        let similarity = match self.similarity {
            None => None,
            Some(sim) => {
                check_lat_lon(sim.lat, sim.lon)?;
                let mut fields = Vec::new();
                for name in &sim.fields {
                    fields.push(parse_field(name)?);
                }
                Some(SimilarityRequest {
                    lat: sim.lat,
                    lon: sim.lon,
                    fields,
                })
            }
        };

        let mut descriptor = QueryDescriptor {
            intent,
            select,
            filters,
            comparison,
            similarity,
            explanation: String::new(),
            source: TranslationSource::Model,
        };
        descriptor.explanation = descriptor.summarize();
        Ok(descriptor)
    }
}

fn parse_intent(s: &str) -> Result<QueryIntent> {
    match s.trim().to_lowercase().as_str() {
        "visualize" => Ok(QueryIntent::Visualize),
        "compare" => Ok(QueryIntent::Compare),
        "locate" => Ok(QueryIntent::Locate),
        "aggregate" => Ok(QueryIntent::Aggregate),
        "tabulate" => Ok(QueryIntent::Tabulate),
        other => Err(FloatChatError::Translation(format!(
            "unknown intent '{}'",
            other
        ))),
    }
}

fn parse_field(name: &str) -> Result<CanonicalField> {
    CanonicalField::parse(name).ok_or_else(|| {
        FloatChatError::Translation(format!("non-canonical field '{}'", name))
    })
}

fn check_lat_lon(lat: f64, lon: f64) -> Result<()> {
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return Err(FloatChatError::Translation(format!(
            "coordinates out of range: ({}, {})",
            lat, lon
        )));
    }
    Ok(())
}

fn convert_filter(filter: ModelFilter) -> Result<FilterPredicate> {
    match filter {
        ModelFilter::Region {
            name,
            south,
            north,
            west,
            east,
        } => {
            if south >= north || !(-90.0..=90.0).contains(&south) || !(-90.0..=90.0).contains(&north)
            {
                return Err(FloatChatError::Translation(format!(
                    "malformed latitude band {}..{}",
                    south, north
                )));
            }
            if !(-180.0..=180.0).contains(&west) || !(-180.0..=180.0).contains(&east) {
                return Err(FloatChatError::Translation(format!(
                    "malformed longitude band {}..{}",
                    west, east
                )));
            }
            Ok(FilterPredicate::BoundingBox {
                region: name,
                south,
                north,
                west,
                east,
            })
        }
        ModelFilter::Near {
            lat,
            lon,
            radius_km,
        } => {
            check_lat_lon(lat, lon)?;
            let radius_km = radius_km.unwrap_or(DEFAULT_NEAR_RADIUS_KM);
            if radius_km <= 0.0 {
                return Err(FloatChatError::Translation(format!(
                    "non-positive radius {}",
                    radius_km
                )));
            }
            Ok(FilterPredicate::NearPoint {
                lat,
                lon,
                radius_km,
            })
        }
        ModelFilter::Time { start, end } => {
            let start = parse_date(&start)?;
            let end = parse_date(&end)?;
            if start >= end {
                return Err(FloatChatError::Translation(format!(
                    "malformed time range {}..{}",
                    start, end
                )));
            }
            Ok(FilterPredicate::TimeBetween { start, end })
        }
        ModelFilter::Threshold { field, op, value } => {
            let field = parse_field(&field)?;
            let op = CompareOp::parse(&op).ok_or_else(|| {
                FloatChatError::Translation(format!("unknown operator '{}'", op))
            })?;
            Ok(FilterPredicate::Compare { field, op, value })
        }
        ModelFilter::Depth { min, max } => {
            if min.is_none() && max.is_none() {
                return Err(FloatChatError::Translation(
                    "depth filter with no bounds".to_string(),
                ));
            }
            if let (Some(lo), Some(hi)) = (min, max) {
                if lo > hi {
                    return Err(FloatChatError::Translation(format!(
                        "malformed depth range {}..{}",
                        lo, hi
                    )));
                }
            }
            Ok(FilterPredicate::PressureRange { min, max })
        }
    }
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| FloatChatError::Translation(format!("bad date '{}': {}", s, e)))
}
