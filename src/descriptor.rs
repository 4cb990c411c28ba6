//! Query Descriptor
//!
//! The structured, validated representation of a translated query,
//! independent of whether the rule-based or the model path produced it.

use crate::intent::QueryIntent;
use crate::schema::CanonicalField;
use chrono::NaiveDate;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
}

impl CompareOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Eq => "=",
        }
    }

    pub fn parse(s: &str) -> Option<CompareOp> {
        match s.trim() {
            "<" => Some(CompareOp::Lt),
            "<=" => Some(CompareOp::Le),
            ">" => Some(CompareOp::Gt),
            ">=" => Some(CompareOp::Ge),
            "=" | "==" => Some(CompareOp::Eq),
            _ => None,
        }
    }
}

/// A single schema-bound filter. Every variant references canonical fields
/// only; raw query text never appears here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FilterPredicate {
    /// Latitude/longitude window of a named region.
    BoundingBox {
        region: String,
        south: f64,
        north: f64,
        west: f64,
        east: f64,
    },
    /// Proximity to a point, radius in kilometres.
    NearPoint { lat: f64, lon: f64, radius_km: f64 },
    /// Half-open timestamp window [start, end).
    TimeBetween { start: NaiveDate, end: NaiveDate },
    /// Comparison against a measured variable.
    Compare {
        field: CanonicalField,
        op: CompareOp,
        value: f64,
    },
    /// Pressure window, either side optional.
    PressureRange { min: Option<f64>, max: Option<f64> },
}

impl FilterPredicate {
    /// The measured field this predicate constrains, if it constrains one
    /// beyond the core position/time axes.
    pub fn measurement_field(&self) -> Option<CanonicalField> {
        match self {
            FilterPredicate::Compare { field, .. } => Some(*field),
            _ => None,
        }
    }

    fn summary(&self) -> String {
        match self {
            FilterPredicate::BoundingBox { region, .. } => format!("in the {}", region),
            FilterPredicate::NearPoint { lat, lon, radius_km } => {
                format!("within {:.0} km of ({:.2}, {:.2})", radius_km, lat, lon)
            }
            FilterPredicate::TimeBetween { start, end } => {
                format!("from {} to {}", start, end)
            }
            FilterPredicate::Compare { field, op, value } => {
                format!("{} {} {}", field, op.symbol(), value)
            }
            FilterPredicate::PressureRange { min, max } => match (min, max) {
                (Some(lo), Some(hi)) => format!("between {:.0} and {:.0} dbar", lo, hi),
                (Some(lo), None) => format!("deeper than {:.0} dbar", lo),
                (None, Some(hi)) => format!("shallower than {:.0} dbar", hi),
                (None, None) => "at any depth".to_string(),
            },
        }
    }
}

/// One side of a comparison request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonGroup {
    pub label: String,
    pub predicate: FilterPredicate,
}

/// Two-way split for Compare queries: shared filters stay on the descriptor,
/// the distinguishing predicate of each side lives here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonSplit {
    pub groups: [ComparisonGroup; 2],
}

/// Nearest-neighbour search request for "closest floats" style questions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityRequest {
    pub lat: f64,
    pub lon: f64,
    /// Variables whose values participate in the similarity metric.
    pub fields: Vec<CanonicalField>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FallbackReason {
    Timeout,
    Transport,
    MalformedResponse,
    InvalidDescriptor,
}

impl std::fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FallbackReason::Timeout => "model call timed out",
            FallbackReason::Transport => "model call failed",
            FallbackReason::MalformedResponse => "model response was malformed",
            FallbackReason::InvalidDescriptor => "model descriptor failed validation",
        };
        write!(f, "{}", s)
    }
}

/// Which path produced the descriptor. Informational only; callers get the
/// same contract either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TranslationSource {
    Rules,
    Model,
    ModelFallback(FallbackReason),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryDescriptor {
    pub intent: QueryIntent,
    /// Ordered column selection.
    pub select: Vec<CanonicalField>,
    pub filters: Vec<FilterPredicate>,
    pub comparison: Option<ComparisonSplit>,
    pub similarity: Option<SimilarityRequest>,
    pub explanation: String,
    pub source: TranslationSource,
}

impl QueryDescriptor {
    /// Short natural-language account of the interpreted intent and filters,
    /// shown to the user alongside results.
    pub fn summarize(&self) -> String {
        let variables: Vec<String> = self
            .select
            .iter()
            .filter(|f| f.is_measurement() && **f != CanonicalField::Pressure)
            .map(|f| f.to_string())
            .collect();
        let subject = if variables.is_empty() {
            "all measured variables".to_string()
        } else {
            variables.join(", ")
        };

        let intent_phrase = match self.intent {
            QueryIntent::Visualize => "a profile visualization",
            QueryIntent::Compare => "a side-by-side comparison",
            QueryIntent::Locate => "a float location search",
            QueryIntent::Aggregate => "an aggregation",
            QueryIntent::Tabulate => "a data table",
        };

        let mut clauses: Vec<String> = self.filters.iter().map(|f| f.summary()).collect();
        if let Some(split) = &self.comparison {
            clauses.push(format!(
                "comparing {} with {}",
                split.groups[0].label, split.groups[1].label
            ));
        }
        if let Some(sim) = &self.similarity {
            clauses.push(format!(
                "ranking nearest profiles around ({:.2}, {:.2})",
                sim.lat, sim.lon
            ));
        }

        if clauses.is_empty() {
            format!("Interpreted as {} of {}.", intent_phrase, subject)
        } else {
            format!(
                "Interpreted as {} of {}, {}.",
                intent_phrase,
                subject,
                clauses.iter().join(", ")
            )
        }
    }
}
