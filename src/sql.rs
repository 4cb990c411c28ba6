//! SQL Builder
//!
//! Compiles a validated query descriptor into a parameterized predicate over
//! the flat profile table. Literal values travel as bound parameters and
//! column identifiers come only from the canonical field enum, so free-text
//! never reaches the generated SQL on either side of an operator.

use crate::descriptor::{FilterPredicate, QueryDescriptor};
use crate::error::{FloatChatError, Result};
use crate::schema::CanonicalField;
use itertools::Itertools;
use serde::Serialize;

pub const TABLE: &str = "argo_profiles";

/// Result-set cap applied to every statement, matching the original
/// application's behaviour.
pub const RESULT_LIMIT: u32 = 1000;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SqlValue {
    Float(f64),
    Text(String),
}

impl std::fmt::Display for SqlValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SqlValue::Float(v) => write!(f, "{}", v),
            SqlValue::Text(s) => write!(f, "'{}'", s),
        }
    }
}

/// One side of a compiled comparison split.
#[derive(Debug, Clone, Serialize)]
pub struct GroupPredicate {
    pub label: String,
    pub predicate: String,
    pub params: Vec<SqlValue>,
}

/// A compiled, parameterized query ready for the storage collaborator.
#[derive(Debug, Clone, Serialize)]
pub struct SqlQuery {
    pub select: Vec<CanonicalField>,
    /// Shared WHERE body; empty when the descriptor has no filters.
    pub predicate: String,
    pub params: Vec<SqlValue>,
    /// Full statement over the shared predicate.
    pub statement: String,
    /// Present for Compare descriptors: one predicate per group, each to be
    /// ANDed with the shared predicate and tagged in the result rows.
    pub groups: Vec<GroupPredicate>,
}

pub struct SqlBuilder;

impl SqlBuilder {
    pub fn compile(&self, descriptor: &QueryDescriptor) -> Result<SqlQuery> {
        if descriptor.select.is_empty() {
            return Err(FloatChatError::Sql(
                "descriptor selects no columns".to_string(),
            ));
        }

        let mut fragments: Vec<String> = Vec::new();
        let mut params: Vec<SqlValue> = Vec::new();
        for filter in &descriptor.filters {
            let (fragment, mut values) = compile_filter(filter);
            fragments.push(fragment);
            params.append(&mut values);
        }

        let predicate = fragments.join(" AND ");
        let columns = descriptor.select.iter().map(|f| f.column()).join(", ");

        let mut statement = format!("SELECT {} FROM {}", columns, TABLE);
        if !predicate.is_empty() {
            statement.push_str(" WHERE ");
            statement.push_str(&predicate);
        }
        statement.push_str(&format!(
            " ORDER BY {} DESC LIMIT {}",
            CanonicalField::Time.column(),
            RESULT_LIMIT
        ));

        let groups = match &descriptor.comparison {
            None => Vec::new(),
            Some(split) => split
                .groups
                .iter()
                .map(|g| {
                    let (fragment, values) = compile_filter(&g.predicate);
                    GroupPredicate {
                        label: g.label.clone(),
                        predicate: fragment,
                        params: values,
                    }
                })
                .collect(),
        };

        Ok(SqlQuery {
            select: descriptor.select.clone(),
            predicate,
            params,
            statement,
            groups,
        })
    }
}

fn compile_filter(filter: &FilterPredicate) -> (String, Vec<SqlValue>) {
    let lat = CanonicalField::Latitude.column();
    let lon = CanonicalField::Longitude.column();
    match filter {
        FilterPredicate::BoundingBox {
            south,
            north,
            west,
            east,
            ..
        } => {
            if west > east {
                // Antimeridian-crossing box: two longitude intervals.
                (
                    format!(
                        "({lat} BETWEEN ? AND ? AND ({lon} >= ? OR {lon} <= ?))",
                    ),
                    vec![
                        SqlValue::Float(*south),
                        SqlValue::Float(*north),
                        SqlValue::Float(*west),
                        SqlValue::Float(*east),
                    ],
                )
            } else {
                (
                    format!("({lat} BETWEEN ? AND ? AND {lon} BETWEEN ? AND ?)"),
                    vec![
                        SqlValue::Float(*south),
                        SqlValue::Float(*north),
                        SqlValue::Float(*west),
                        SqlValue::Float(*east),
                    ],
                )
            }
        }
        FilterPredicate::NearPoint {
            lat: p_lat,
            lon: p_lon,
            radius_km,
        } => {
            // Degree-box approximation of the radius; 1° of latitude is
            // ~111 km. Boxes touching the poles or the antimeridian clamp.
            let dlat = radius_km / 111.0;
            let dlon = radius_km / (111.0 * p_lat.to_radians().cos().abs().max(0.01));
            (
                format!("({lat} BETWEEN ? AND ? AND {lon} BETWEEN ? AND ?)"),
                vec![
                    SqlValue::Float((p_lat - dlat).max(-90.0)),
                    SqlValue::Float((p_lat + dlat).min(90.0)),
                    SqlValue::Float((p_lon - dlon).max(-180.0)),
                    SqlValue::Float((p_lon + dlon).min(180.0)),
                ],
            )
        }
        FilterPredicate::TimeBetween { start, end } => {
            let time = CanonicalField::Time.column();
            (
                format!("({time} >= ? AND {time} < ?)"),
                vec![
                    SqlValue::Text(start.to_string()),
                    SqlValue::Text(end.to_string()),
                ],
            )
        }
        FilterPredicate::Compare { field, op, value } => (
            format!("{} {} ?", field.column(), op.symbol()),
            vec![SqlValue::Float(*value)],
        ),
        FilterPredicate::PressureRange { min, max } => {
            let pres = CanonicalField::Pressure.column();
            match (min, max) {
                (Some(lo), Some(hi)) => (
                    format!("({pres} >= ? AND {pres} <= ?)"),
                    vec![SqlValue::Float(*lo), SqlValue::Float(*hi)],
                ),
                (Some(lo), None) => (format!("{pres} >= ?"), vec![SqlValue::Float(*lo)]),
                (None, Some(hi)) => (format!("{pres} <= ?"), vec![SqlValue::Float(*hi)]),
                // An empty range compiles to a tautology rather than failing.
                (None, None) => ("1=1".to_string(), Vec::new()),
            }
        }
    }
}
