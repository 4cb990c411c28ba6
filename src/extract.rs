//! Entity Extractor
//!
//! Scans raw query text for temporal expressions, geographic names and
//! coordinates, variable mentions, numeric thresholds, and depth ranges.
//! Extraction never fails; a signal that is absent or unparseable simply
//! yields no entity of that kind. Relative time expressions resolve against
//! an injected `now`, never the wall clock.

use crate::descriptor::CompareOp;
use crate::lexicon::{BoundingBox, DomainLexicon};
use crate::schema::CanonicalField;
use chrono::{Datelike, Duration, Months, NaiveDate};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;
use std::sync::Arc;

/// Radius applied to "near <point>" phrasing when none is given.
pub const DEFAULT_NEAR_RADIUS_KM: f64 = 300.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeGranularity {
    Day,
    Month,
    Season,
    Year,
    Relative,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExtractedEntity {
    Region {
        name: String,
        bbox: BoundingBox,
    },
    NearPoint {
        lat: f64,
        lon: f64,
        radius_km: f64,
    },
    /// Half-open window [start, end).
    TimeRange {
        start: NaiveDate,
        end: NaiveDate,
        granularity: TimeGranularity,
    },
    Variable {
        field: CanonicalField,
    },
    Threshold {
        field: CanonicalField,
        op: CompareOp,
        value: f64,
        /// Raw unit token as written. Best effort only; values are not
        /// converted or checked against the variable's unit.
        unit: Option<String>,
    },
    DepthRange {
        min: Option<f64>,
        max: Option<f64>,
    },
}

lazy_static! {
    static ref DATE_SPAN_RE: Regex = Regex::new(
        r"\b(?:from|between)\s+(\d{4}-\d{2}-\d{2})\s+(?:to|and|until)\s+(\d{4}-\d{2}-\d{2})\b"
    )
    .unwrap();
    static ref DATE_RE: Regex = Regex::new(r"\b(\d{4}-\d{2}-\d{2})\b").unwrap();
    static ref YEAR_SPAN_RE: Regex = Regex::new(
        r"\b(?:from|between)\s+(19[5-9]\d|20\d{2})\s+(?:to|and|until)\s+(19[5-9]\d|20\d{2})\b"
    )
    .unwrap();
    static ref YEAR_RE: Regex = Regex::new(r"\b(19[5-9]\d|20\d{2})\b").unwrap();
    static ref MONTH_RE: Regex = Regex::new(
        r"\b(january|february|march|april|may|june|july|august|september|october|november|december)\b(?:\s+(?:of\s+)?(19[5-9]\d|20\d{2}))?"
    )
    .unwrap();
    static ref SEASON_RE: Regex = Regex::new(
        r"\b(winter|spring|summer|autumn|fall|monsoon)\b(?:\s+(?:of\s+)?(19[5-9]\d|20\d{2}))?"
    )
    .unwrap();
    static ref RELATIVE_RE: Regex =
        Regex::new(r"\b(?:last|past)\s+(\d+)\s+(day|week|month|year)s?\b").unwrap();
    static ref RELATIVE_ONE_RE: Regex =
        Regex::new(r"\b(?:last|past)\s+(day|week|month|year)\b").unwrap();
    static ref COORD_HEMI_RE: Regex = Regex::new(
        r"\b(\d+(?:\.\d+)?)\s*°?\s*([ns])\b[,;]?\s*(\d+(?:\.\d+)?)\s*°?\s*([ew])\b"
    )
    .unwrap();
    static ref COORD_PAIR_RE: Regex = Regex::new(
        r"\b(?:near|at|around)\s+\(?\s*(-?\d+(?:\.\d+)?)\s*,\s*(-?\d+(?:\.\d+)?)\s*\)?"
    )
    .unwrap();
    static ref RADIUS_RE: Regex = Regex::new(r"\bwithin\s+(\d+(?:\.\d+)?)\s*km\b").unwrap();
    static ref THRESHOLD_RE: Regex = Regex::new(
        r"^[\s,]*(?:is|are|was|were)?\s*(>=|<=|>|<|=|greater than|less than|more than|at least|at most|above|over|below|under|exceeding|warmer than|colder than|saltier than|fresher than|equal to|equals)\s*(-?\d+(?:\.\d+)?)\s*(°\s*[cf]|celsius|fahrenheit|psu|dbar|db|meters|metres|meter|metre|m|µmol/kg|umol/kg|mg/m3)?\b"
    )
    .unwrap();
    static ref DEPTH_SPAN_RE: Regex = Regex::new(
        r"\b(?:between\s+)?(\d+(?:\.\d+)?)\s*(?:-|to|and)\s*(\d+(?:\.\d+)?)\s*(?:m|meters|metres|meter|metre|dbar|db)\b"
    )
    .unwrap();
    static ref DEPTH_ONE_RE: Regex = Regex::new(
        r"\b(at|below|deeper than|under|beneath|above|shallower than|upper|top)\s+(\d+(?:\.\d+)?)\s*(?:m|meters|metres|meter|metre|dbar|db)\b"
    )
    .unwrap();
    static ref DEEP_RE: Regex = Regex::new(r"\bdeep\b").unwrap();
    static ref SHALLOW_RE: Regex = Regex::new(r"\bshallow\b").unwrap();
}

const DEPTH_UNITS: [&str; 7] = ["m", "meter", "meters", "metre", "metres", "dbar", "db"];

pub struct EntityExtractor {
    lexicon: Arc<DomainLexicon>,
}

impl EntityExtractor {
    pub fn new(lexicon: Arc<DomainLexicon>) -> Self {
        Self { lexicon }
    }

    /// Extract all recognizable entities from `text`. Relative temporal
    /// expressions resolve against `now`.
    pub fn extract(&self, text: &str, now: NaiveDate) -> Vec<ExtractedEntity> {
        let lower = text.to_lowercase();
        let mut entities = Vec::new();

        self.extract_geo(&lower, &mut entities);
        extract_time(&lower, now, &mut entities);

        let mentions = self.variable_mentions(&lower);
        extract_thresholds(&lower, &mentions, &mut entities);
        extract_depth(&lower, &mut entities);

        for (_, _, field) in &mentions {
            entities.push(ExtractedEntity::Variable { field: *field });
        }

        dedup(entities)
    }

    /// Variable mentions as (byte position, length, field), ordered by first
    /// appearance. Longer aliases shadow shorter ones on overlap.
    fn variable_mentions(&self, lower: &str) -> Vec<(usize, usize, CanonicalField)> {
        let mut mentions: Vec<(usize, usize, CanonicalField)> = Vec::new();
        for (alias, field) in self.lexicon.variable_aliases() {
            for (pos, _) in lower.match_indices(alias.as_str()) {
                if !word_bounded(lower, pos, alias.len()) {
                    continue;
                }
                let end = pos + alias.len();
                if mentions.iter().any(|(p, l, _)| pos < p + l && *p < end) {
                    continue;
                }
                mentions.push((pos, alias.len(), *field));
            }
        }
        mentions.sort_by_key(|(pos, _, _)| *pos);
        let mut seen = HashSet::new();
        mentions.retain(|(_, _, f)| seen.insert(*f));
        mentions
    }

    fn extract_geo(&self, lower: &str, out: &mut Vec<ExtractedEntity>) {
        // Named regions: exact and case-insensitive substring matches.
        for region in self.lexicon.regions() {
            let mut names = vec![region.name.to_lowercase()];
            names.extend(region.aliases.iter().map(|a| a.to_lowercase()));
            if names.iter().any(|n| lower.contains(n.as_str())) {
                out.push(ExtractedEntity::Region {
                    name: region.name.clone(),
                    bbox: region.bbox,
                });
            }
        }

        let radius = RADIUS_RE
            .captures(lower)
            .and_then(|c| c[1].parse::<f64>().ok())
            .unwrap_or(DEFAULT_NEAR_RADIUS_KM);

        // Hemisphere-suffixed coordinates, e.g. "10N 65E".
        for caps in COORD_HEMI_RE.captures_iter(lower) {
            let lat: f64 = match caps[1].parse() {
                Ok(v) => v,
                Err(_) => continue,
            };
            let lon: f64 = match caps[3].parse() {
                Ok(v) => v,
                Err(_) => continue,
            };
            let lat = if &caps[2] == "s" { -lat } else { lat };
            let lon = if &caps[4] == "w" { -lon } else { lon };
            push_point(out, lat, lon, radius);
        }

        // Signed decimal pairs after "near"/"at"/"around".
        for caps in COORD_PAIR_RE.captures_iter(lower) {
            if let (Ok(lat), Ok(lon)) = (caps[1].parse::<f64>(), caps[2].parse::<f64>()) {
                push_point(out, lat, lon, radius);
            }
        }
    }
}

/// Out-of-range pairs are discarded as non-geographic.
fn push_point(out: &mut Vec<ExtractedEntity>, lat: f64, lon: f64, radius_km: f64) {
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return;
    }
    out.push(ExtractedEntity::NearPoint {
        lat,
        lon,
        radius_km,
    });
}

fn word_bounded(text: &str, pos: usize, len: usize) -> bool {
    let before_ok = text[..pos]
        .chars()
        .last()
        .map_or(true, |c| !c.is_alphanumeric());
    let after_ok = text[pos + len..]
        .chars()
        .next()
        .map_or(true, |c| !c.is_alphanumeric());
    before_ok && after_ok
}

fn month_number(name: &str) -> u32 {
    match name {
        "january" => 1,
        "february" => 2,
        "march" => 3,
        "april" => 4,
        "may" => 5,
        "june" => 6,
        "july" => 7,
        "august" => 8,
        "september" => 9,
        "october" => 10,
        "november" => 11,
        "december" => 12,
        _ => 0,
    }
}

fn month_window(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let start = NaiveDate::from_ymd_opt(year, month, 1)?;
    let end = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some((start, end))
}

fn season_window(name: &str, year: i32) -> Option<(NaiveDate, NaiveDate)> {
    let (start, end) = match name {
        // Winter of a year runs from December of the previous one.
        "winter" => (
            NaiveDate::from_ymd_opt(year - 1, 12, 1)?,
            NaiveDate::from_ymd_opt(year, 3, 1)?,
        ),
        "spring" => (
            NaiveDate::from_ymd_opt(year, 3, 1)?,
            NaiveDate::from_ymd_opt(year, 6, 1)?,
        ),
        "summer" => (
            NaiveDate::from_ymd_opt(year, 6, 1)?,
            NaiveDate::from_ymd_opt(year, 9, 1)?,
        ),
        "autumn" | "fall" => (
            NaiveDate::from_ymd_opt(year, 9, 1)?,
            NaiveDate::from_ymd_opt(year, 12, 1)?,
        ),
        "monsoon" => (
            NaiveDate::from_ymd_opt(year, 6, 1)?,
            NaiveDate::from_ymd_opt(year, 10, 1)?,
        ),
        _ => return None,
    };
    Some((start, end))
}

fn spans_overlap(spans: &[(usize, usize)], start: usize, end: usize) -> bool {
    spans.iter().any(|(s, e)| start < *e && *s < end)
}

fn extract_time(lower: &str, now: NaiveDate, out: &mut Vec<ExtractedEntity>) {
    let mut consumed: Vec<(usize, usize)> = Vec::new();

    // Explicit date spans: "from 2023-01-05 to 2023-02-10" (inclusive end day).
    for caps in DATE_SPAN_RE.captures_iter(lower) {
        let m = caps.get(0).unwrap();
        let (Ok(a), Ok(b)) = (
            NaiveDate::parse_from_str(&caps[1], "%Y-%m-%d"),
            NaiveDate::parse_from_str(&caps[2], "%Y-%m-%d"),
        ) else {
            continue;
        };
        if a <= b {
            consumed.push((m.start(), m.end()));
            out.push(ExtractedEntity::TimeRange {
                start: a,
                end: b + Duration::days(1),
                granularity: TimeGranularity::Day,
            });
        }
    }

    // Standalone dates expand to a one-day window.
    for caps in DATE_RE.captures_iter(lower) {
        let m = caps.get(0).unwrap();
        if spans_overlap(&consumed, m.start(), m.end()) {
            continue;
        }
        if let Ok(d) = NaiveDate::parse_from_str(&caps[1], "%Y-%m-%d") {
            consumed.push((m.start(), m.end()));
            out.push(ExtractedEntity::TimeRange {
                start: d,
                end: d + Duration::days(1),
                granularity: TimeGranularity::Day,
            });
        }
    }

    // Year spans: "from 2020 to 2023".
    for caps in YEAR_SPAN_RE.captures_iter(lower) {
        let m = caps.get(0).unwrap();
        if spans_overlap(&consumed, m.start(), m.end()) {
            continue;
        }
        let (Ok(y1), Ok(y2)) = (caps[1].parse::<i32>(), caps[2].parse::<i32>()) else {
            continue;
        };
        if y1 <= y2 {
            consumed.push((m.start(), m.end()));
            if let (Some(start), Some(end)) = (
                NaiveDate::from_ymd_opt(y1, 1, 1),
                NaiveDate::from_ymd_opt(y2 + 1, 1, 1),
            ) {
                out.push(ExtractedEntity::TimeRange {
                    start,
                    end,
                    granularity: TimeGranularity::Year,
                });
            }
        }
    }

    // Month names, with or without a year. A bare month expands to the full
    // month window in the year of `now`.
    for caps in MONTH_RE.captures_iter(lower) {
        let m = caps.get(0).unwrap();
        if spans_overlap(&consumed, m.start(), m.end()) {
            continue;
        }
        let month = month_number(&caps[1]);
        let year = caps
            .get(2)
            .and_then(|y| y.as_str().parse::<i32>().ok())
            .unwrap_or_else(|| now.year());
        if let Some((start, end)) = month_window(year, month) {
            consumed.push((m.start(), m.end()));
            out.push(ExtractedEntity::TimeRange {
                start,
                end,
                granularity: TimeGranularity::Month,
            });
        }
    }

    // Seasons.
    for caps in SEASON_RE.captures_iter(lower) {
        let m = caps.get(0).unwrap();
        if spans_overlap(&consumed, m.start(), m.end()) {
            continue;
        }
        let year = caps
            .get(2)
            .and_then(|y| y.as_str().parse::<i32>().ok())
            .unwrap_or_else(|| now.year());
        if let Some((start, end)) = season_window(&caps[1], year) {
            consumed.push((m.start(), m.end()));
            out.push(ExtractedEntity::TimeRange {
                start,
                end,
                granularity: TimeGranularity::Season,
            });
        }
    }

    // Relative windows: "last 6 months", "past 2 years".
    for caps in RELATIVE_RE.captures_iter(lower) {
        let m = caps.get(0).unwrap();
        let Ok(n) = caps[1].parse::<u32>() else {
            continue;
        };
        if let Some(start) = relative_start(now, n, &caps[2]) {
            consumed.push((m.start(), m.end()));
            out.push(ExtractedEntity::TimeRange {
                start,
                end: now + Duration::days(1),
                granularity: TimeGranularity::Relative,
            });
        }
    }

    // "last month" / "past year" without a count.
    for caps in RELATIVE_ONE_RE.captures_iter(lower) {
        let m = caps.get(0).unwrap();
        if spans_overlap(&consumed, m.start(), m.end()) {
            continue;
        }
        if let Some(start) = relative_start(now, 1, &caps[1]) {
            consumed.push((m.start(), m.end()));
            out.push(ExtractedEntity::TimeRange {
                start,
                end: now + Duration::days(1),
                granularity: TimeGranularity::Relative,
            });
        }
    }

    // Bare years not already consumed by a more specific expression.
    for caps in YEAR_RE.captures_iter(lower) {
        let m = caps.get(0).unwrap();
        if spans_overlap(&consumed, m.start(), m.end()) {
            continue;
        }
        let Ok(year) = caps[1].parse::<i32>() else {
            continue;
        };
        if let (Some(start), Some(end)) = (
            NaiveDate::from_ymd_opt(year, 1, 1),
            NaiveDate::from_ymd_opt(year + 1, 1, 1),
        ) {
            out.push(ExtractedEntity::TimeRange {
                start,
                end,
                granularity: TimeGranularity::Year,
            });
        }
    }
}

fn relative_start(now: NaiveDate, n: u32, unit: &str) -> Option<NaiveDate> {
    match unit {
        "day" => Some(now - Duration::days(n as i64)),
        "week" => Some(now - Duration::weeks(n as i64)),
        "month" => now.checked_sub_months(Months::new(n)),
        "year" => now.checked_sub_months(Months::new(n * 12)),
        _ => None,
    }
}

fn extract_thresholds(
    lower: &str,
    mentions: &[(usize, usize, CanonicalField)],
    out: &mut Vec<ExtractedEntity>,
) {
    for (pos, len, field) in mentions {
        let window = window_after(lower, pos + len, 48);
        let Some(caps) = THRESHOLD_RE.captures(window) else {
            continue;
        };
        let Ok(value) = caps[2].parse::<f64>() else {
            continue;
        };
        let unit = caps.get(3).map(|u| u.as_str().to_string());
        // A depth unit after the number means this is a depth phrase, not a
        // variable threshold, unless the variable is pressure itself.
        if let Some(ref u) = unit {
            if DEPTH_UNITS.contains(&u.as_str()) && *field != CanonicalField::Pressure {
                continue;
            }
        }
        let Some(op) = comparison_op(&caps[1]) else {
            continue;
        };
        out.push(ExtractedEntity::Threshold {
            field: *field,
            op,
            value,
            unit,
        });
    }
}

fn comparison_op(word: &str) -> Option<CompareOp> {
    match word {
        ">" | "greater than" | "more than" | "above" | "over" | "exceeding" | "warmer than"
        | "saltier than" => Some(CompareOp::Gt),
        ">=" | "at least" => Some(CompareOp::Ge),
        "<" | "less than" | "below" | "under" | "colder than" | "fresher than" => {
            Some(CompareOp::Lt)
        }
        "<=" | "at most" => Some(CompareOp::Le),
        "=" | "equal to" | "equals" => Some(CompareOp::Eq),
        _ => None,
    }
}

fn extract_depth(lower: &str, out: &mut Vec<ExtractedEntity>) {
    let mut consumed: Vec<(usize, usize)> = Vec::new();

    // Two-sided ranges: "between 100 and 500 m", "100-500 dbar".
    for caps in DEPTH_SPAN_RE.captures_iter(lower) {
        let m = caps.get(0).unwrap();
        let (Ok(a), Ok(b)) = (caps[1].parse::<f64>(), caps[2].parse::<f64>()) else {
            continue;
        };
        consumed.push((m.start(), m.end()));
        out.push(ExtractedEntity::DepthRange {
            min: Some(a.min(b)),
            max: Some(a.max(b)),
        });
    }

    // One-sided phrases: "below 1000m", "at 1000 dbar", "upper 200 m".
    for caps in DEPTH_ONE_RE.captures_iter(lower) {
        let m = caps.get(0).unwrap();
        if spans_overlap(&consumed, m.start(), m.end()) {
            continue;
        }
        let Ok(value) = caps[2].parse::<f64>() else {
            continue;
        };
        let entity = match &caps[1] {
            "at" | "below" | "deeper than" | "under" | "beneath" => ExtractedEntity::DepthRange {
                min: Some(value),
                max: None,
            },
            _ => ExtractedEntity::DepthRange {
                min: None,
                max: Some(value),
            },
        };
        out.push(entity);
    }

    // Bare keywords, as in the original keyword shortcuts.
    if DEEP_RE.is_match(lower) {
        out.push(ExtractedEntity::DepthRange {
            min: Some(500.0),
            max: None,
        });
    }
    if SHALLOW_RE.is_match(lower) {
        out.push(ExtractedEntity::DepthRange {
            min: None,
            max: Some(100.0),
        });
    }
}

fn window_after(text: &str, start: usize, max: usize) -> &str {
    if start >= text.len() {
        return "";
    }
    let mut end = (start + max).min(text.len());
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[start..end]
}

/// Collapse duplicates by kind and field; the most specific entity wins.
fn dedup(entities: Vec<ExtractedEntity>) -> Vec<ExtractedEntity> {
    let mut regions_seen: HashSet<String> = HashSet::new();
    let mut variables_seen: HashSet<CanonicalField> = HashSet::new();
    let mut thresholds_seen: HashSet<(CanonicalField, CompareOp)> = HashSet::new();
    let mut points_seen: HashSet<(i64, i64)> = HashSet::new();

    let mut depth: Option<(Option<f64>, Option<f64>)> = None;
    let mut times: Vec<(NaiveDate, NaiveDate, TimeGranularity)> = Vec::new();
    let mut kept: Vec<ExtractedEntity> = Vec::new();

    for entity in entities {
        match entity {
            ExtractedEntity::Region { ref name, .. } => {
                if regions_seen.insert(name.clone()) {
                    kept.push(entity);
                }
            }
            ExtractedEntity::Variable { field } => {
                if variables_seen.insert(field) {
                    kept.push(entity);
                }
            }
            ExtractedEntity::Threshold { field, op, .. } => {
                if thresholds_seen.insert((field, op)) {
                    kept.push(entity);
                }
            }
            ExtractedEntity::NearPoint { lat, lon, .. } => {
                if points_seen.insert(((lat * 1e6) as i64, (lon * 1e6) as i64)) {
                    kept.push(entity);
                }
            }
            ExtractedEntity::DepthRange { min, max } => {
                // Multiple depth phrases merge; the tightest bounds win.
                let merged = depth.get_or_insert((None, None));
                merged.0 = match (merged.0, min) {
                    (Some(a), Some(b)) => Some(a.max(b)),
                    (a, b) => a.or(b),
                };
                merged.1 = match (merged.1, max) {
                    (Some(a), Some(b)) => Some(a.min(b)),
                    (a, b) => a.or(b),
                };
            }
            ExtractedEntity::TimeRange {
                start,
                end,
                granularity,
            } => {
                times.push((start, end, granularity));
            }
        }
    }

    // Drop a time window that strictly contains another: the narrower
    // expression is the more specific one ("March 2023" beats "2023").
    times.sort_by_key(|t| (t.0, t.1));
    times.dedup_by(|a, b| a.0 == b.0 && a.1 == b.1);
    let narrow: Vec<_> = times
        .iter()
        .filter(|(s, e, _)| {
            !times
                .iter()
                .any(|(s2, e2, _)| (s2, e2) != (s, e) && s <= s2 && e2 <= e)
        })
        .cloned()
        .collect();
    for (start, end, granularity) in narrow {
        kept.push(ExtractedEntity::TimeRange {
            start,
            end,
            granularity,
        });
    }

    if let Some((min, max)) = depth {
        kept.push(ExtractedEntity::DepthRange { min, max });
    }

    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> EntityExtractor {
        EntityExtractor::new(Arc::new(DomainLexicon::builtin()))
    }

    fn now() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
    }

    fn regions(entities: &[ExtractedEntity]) -> Vec<&str> {
        entities
            .iter()
            .filter_map(|e| match e {
                ExtractedEntity::Region { name, .. } => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    fn variables(entities: &[ExtractedEntity]) -> Vec<CanonicalField> {
        entities
            .iter()
            .filter_map(|e| match e {
                ExtractedEntity::Variable { field } => Some(*field),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_equator_region_and_variable() {
        let entities = extractor().extract("Show me temperature profiles near the equator", now());
        assert_eq!(regions(&entities), vec!["Equator"]);
        assert_eq!(variables(&entities), vec![CanonicalField::Temperature]);
        assert!(!entities
            .iter()
            .any(|e| matches!(e, ExtractedEntity::TimeRange { .. })));
    }

    #[test]
    fn test_two_regions_and_year() {
        let entities =
            extractor().extract("Compare salinity in the Arabian Sea and Bay of Bengal in 2023", now());
        let mut names = regions(&entities);
        names.sort();
        assert_eq!(names, vec!["Arabian Sea", "Bay of Bengal"]);
        assert_eq!(variables(&entities), vec![CanonicalField::Salinity]);
        let time = entities
            .iter()
            .find_map(|e| match e {
                ExtractedEntity::TimeRange { start, end, .. } => Some((*start, *end)),
                _ => None,
            })
            .unwrap();
        assert_eq!(time.0, NaiveDate::from_ymd_opt(2023, 1, 1).unwrap());
        assert_eq!(time.1, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    }

    #[test]
    fn test_threshold_and_one_sided_depth() {
        let entities = extractor().extract("temperature below 2 at 1000m", now());
        assert!(entities.iter().any(|e| matches!(
            e,
            ExtractedEntity::Threshold {
                field: CanonicalField::Temperature,
                op: CompareOp::Lt,
                value,
                ..
            } if *value == 2.0
        )));
        assert!(entities.iter().any(|e| matches!(
            e,
            ExtractedEntity::DepthRange {
                min: Some(min),
                max: None,
            } if *min == 1000.0
        )));
    }

    #[test]
    fn test_depth_unit_does_not_become_threshold() {
        // "pressure" is the only variable allowed to take a depth-unit threshold.
        let entities = extractor().extract("salinity below 200 m", now());
        assert!(!entities
            .iter()
            .any(|e| matches!(e, ExtractedEntity::Threshold { .. })));
        assert!(entities.iter().any(|e| matches!(
            e,
            ExtractedEntity::DepthRange {
                min: Some(min),
                ..
            } if *min == 200.0
        )));
    }

    #[test]
    fn test_relative_window_resolves_against_now() {
        let entities = extractor().extract("all data from the last 6 months", now());
        let (start, end) = entities
            .iter()
            .find_map(|e| match e {
                ExtractedEntity::TimeRange { start, end, .. } => Some((*start, *end)),
                _ => None,
            })
            .unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(2024, 12, 15).unwrap());
        assert_eq!(end, now() + Duration::days(1));
    }

    #[test]
    fn test_month_only_expands_to_full_month() {
        let entities = extractor().extract("salinity profiles in March", now());
        let (start, end) = entities
            .iter()
            .find_map(|e| match e {
                ExtractedEntity::TimeRange { start, end, .. } => Some((*start, *end)),
                _ => None,
            })
            .unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2025, 4, 1).unwrap());
    }

    #[test]
    fn test_month_with_year_beats_bare_year() {
        let entities = extractor().extract("temperature in March 2023", now());
        let times: Vec<_> = entities
            .iter()
            .filter_map(|e| match e {
                ExtractedEntity::TimeRange { start, end, .. } => Some((*start, *end)),
                _ => None,
            })
            .collect();
        assert_eq!(times.len(), 1);
        assert_eq!(times[0].0, NaiveDate::from_ymd_opt(2023, 3, 1).unwrap());
    }

    #[test]
    fn test_coordinates_with_hemispheres() {
        let entities = extractor().extract("floats near 10N 65E", now());
        assert!(entities.iter().any(|e| matches!(
            e,
            ExtractedEntity::NearPoint { lat, lon, radius_km }
                if *lat == 10.0 && *lon == 65.0 && *radius_km == DEFAULT_NEAR_RADIUS_KM
        )));
    }

    #[test]
    fn test_out_of_range_coordinates_discarded() {
        let entities = extractor().extract("profiles near 95.0, 200.0", now());
        assert!(!entities
            .iter()
            .any(|e| matches!(e, ExtractedEntity::NearPoint { .. })));
    }

    #[test]
    fn test_deep_and_shallow_keywords() {
        let entities = extractor().extract("show me deep temperature data", now());
        assert!(entities.iter().any(|e| matches!(
            e,
            ExtractedEntity::DepthRange {
                min: Some(min),
                max: None,
            } if *min == 500.0
        )));

        let entities = extractor().extract("shallow salinity measurements", now());
        assert!(entities.iter().any(|e| matches!(
            e,
            ExtractedEntity::DepthRange {
                min: None,
                max: Some(max),
            } if *max == 100.0
        )));
    }

    #[test]
    fn test_depth_span() {
        let entities = extractor().extract("oxygen between 100 and 500 dbar", now());
        assert!(entities.iter().any(|e| matches!(
            e,
            ExtractedEntity::DepthRange {
                min: Some(min),
                max: Some(max),
            } if *min == 100.0 && *max == 500.0
        )));
    }

    #[test]
    fn test_multiple_variables_ordered_by_appearance() {
        let entities = extractor().extract("plot salinity and temperature trends", now());
        assert_eq!(
            variables(&entities),
            vec![CanonicalField::Salinity, CanonicalField::Temperature]
        );
    }

    #[test]
    fn test_no_entities() {
        let entities = extractor().extract("hello there", now());
        assert!(entities.is_empty());
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let a = extractor().extract("Compare salinity in the Arabian Sea and Bay of Bengal in 2023", now());
        let b = extractor().extract("Compare salinity in the Arabian Sea and Bay of Bengal in 2023", now());
        assert_eq!(a, b);
    }
}
