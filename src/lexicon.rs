//! Domain Lexicon
//!
//! Static oceanographic reference data: named sea regions with bounding
//! boxes, and variable synonyms mapped to canonical schema fields. Loaded
//! once at startup and shared read-only across requests.

use crate::error::{FloatChatError, Result};
use crate::schema::CanonicalField;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Geographic bounding box in degrees. A box with `west > east` crosses the
/// antimeridian (e.g. the Pacific) and spans the two longitude intervals
/// [west, 180] and [-180, east].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub south: f64,
    pub north: f64,
    pub west: f64,
    pub east: f64,
}

impl BoundingBox {
    pub fn crosses_antimeridian(&self) -> bool {
        self.west > self.east
    }

    /// Longitude intervals covered by this box.
    pub fn lon_intervals(&self) -> Vec<(f64, f64)> {
        if self.crosses_antimeridian() {
            vec![(self.west, 180.0), (-180.0, self.east)]
        } else {
            vec![(self.west, self.east)]
        }
    }

    /// Geometric center, wrap-aware in longitude.
    pub fn center(&self) -> (f64, f64) {
        let lat = (self.south + self.north) / 2.0;
        let lon = if self.crosses_antimeridian() {
            let span = 360.0 - self.west + self.east;
            let mut mid = self.west + span / 2.0;
            if mid > 180.0 {
                mid -= 360.0;
            }
            mid
        } else {
            (self.west + self.east) / 2.0
        };
        (lat, lon)
    }

    pub fn overlaps(&self, other: &BoundingBox) -> bool {
        if self.south > other.north || other.south > self.north {
            return false;
        }
        for (w1, e1) in self.lon_intervals() {
            for (w2, e2) in other.lon_intervals() {
                if w1 <= e2 && w2 <= e1 {
                    return true;
                }
            }
        }
        false
    }
}

/// A named sea region. Aliases are matched case-insensitively as substrings
/// of the query text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamedRegion {
    pub name: String,
    pub aliases: Vec<String>,
    pub bbox: BoundingBox,
}

#[derive(Debug, Deserialize)]
struct VariableSpec {
    field: String,
    aliases: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct LexiconFile {
    regions: Vec<NamedRegion>,
    variables: Vec<VariableSpec>,
}

/// Process-wide, immutable oceanographic reference data.
pub struct DomainLexicon {
    regions: Vec<NamedRegion>,
    /// Variable aliases, longest first so "dissolved oxygen" wins over "oxygen".
    variable_aliases: Vec<(String, CanonicalField)>,
    region_by_alias: HashMap<String, usize>,
}

impl DomainLexicon {
    fn build(regions: Vec<NamedRegion>, mut variable_aliases: Vec<(String, CanonicalField)>) -> Self {
        let mut region_by_alias = HashMap::new();
        for (idx, region) in regions.iter().enumerate() {
            region_by_alias.insert(region.name.to_lowercase(), idx);
            for alias in &region.aliases {
                region_by_alias.insert(alias.to_lowercase(), idx);
            }
        }
        variable_aliases.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        Self {
            regions,
            variable_aliases,
            region_by_alias,
        }
    }

    /// The compiled-in region and synonym set.
    pub fn builtin() -> Self {
        let regions = vec![
            region("Equator", &["equatorial", "the equator"], -5.0, 5.0, -180.0, 180.0),
            region("Arabian Sea", &[], 8.0, 25.0, 50.0, 78.0),
            region("Bay of Bengal", &[], 5.0, 22.0, 80.0, 100.0),
            region("Indian Ocean", &[], -45.0, 25.0, 20.0, 120.0),
            region("North Atlantic", &["north atlantic ocean"], 0.0, 65.0, -80.0, 0.0),
            region("South Atlantic", &["south atlantic ocean"], -60.0, 0.0, -70.0, 20.0),
            region("Atlantic Ocean", &["the atlantic"], -60.0, 65.0, -80.0, 20.0),
            // The Pacific crosses the antimeridian; west > east is intentional.
            region("Pacific Ocean", &["the pacific"], -60.0, 60.0, 120.0, -70.0),
            region("Southern Ocean", &["antarctic ocean"], -90.0, -50.0, -180.0, 180.0),
            region("Mediterranean Sea", &["the mediterranean"], 30.0, 46.0, -6.0, 36.0),
            region("Red Sea", &[], 12.0, 30.0, 32.0, 44.0),
            region("Gulf of Mexico", &[], 18.0, 31.0, -98.0, -80.0),
            region("Tropics", &["tropical"], -23.5, 23.5, -180.0, 180.0),
        ];

        let variable_aliases = vec![
            alias("temperature", CanonicalField::Temperature),
            alias("water temperature", CanonicalField::Temperature),
            alias("sea temperature", CanonicalField::Temperature),
            alias("temp", CanonicalField::Temperature),
            alias("salinity", CanonicalField::Salinity),
            alias("practical salinity", CanonicalField::Salinity),
            alias("psal", CanonicalField::Salinity),
            alias("salt", CanonicalField::Salinity),
            alias("dissolved oxygen", CanonicalField::Oxygen),
            alias("oxygen", CanonicalField::Oxygen),
            alias("doxy", CanonicalField::Oxygen),
            alias("o2", CanonicalField::Oxygen),
            alias("chlorophyll-a", CanonicalField::Chlorophyll),
            alias("chlorophyll", CanonicalField::Chlorophyll),
            alias("chl-a", CanonicalField::Chlorophyll),
            alias("chla", CanonicalField::Chlorophyll),
            alias("pressure", CanonicalField::Pressure),
            alias("pres", CanonicalField::Pressure),
        ];

        Self::build(regions, variable_aliases)
    }

    /// Load a deployment-specific lexicon from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| FloatChatError::Lexicon(format!("Failed to read {}: {}", path.display(), e)))?;
        let file: LexiconFile = serde_json::from_str(&content)
            .map_err(|e| FloatChatError::Lexicon(format!("Failed to parse {}: {}", path.display(), e)))?;

        let mut variable_aliases = Vec::new();
        for spec in file.variables {
            let field = CanonicalField::parse(&spec.field).ok_or_else(|| {
                FloatChatError::Lexicon(format!("Unknown canonical field '{}'", spec.field))
            })?;
            for a in spec.aliases {
                variable_aliases.push((a.to_lowercase(), field));
            }
        }
        if file.regions.is_empty() {
            return Err(FloatChatError::Lexicon("lexicon has no regions".to_string()));
        }
        Ok(Self::build(file.regions, variable_aliases))
    }

    pub fn regions(&self) -> &[NamedRegion] {
        &self.regions
    }

    /// Variable aliases, longest first.
    pub fn variable_aliases(&self) -> &[(String, CanonicalField)] {
        &self.variable_aliases
    }

    pub fn resolve_region(&self, name: &str) -> Option<&NamedRegion> {
        self.region_by_alias
            .get(&name.trim().to_lowercase())
            .map(|idx| &self.regions[*idx])
    }
}

fn region(name: &str, aliases: &[&str], south: f64, north: f64, west: f64, east: f64) -> NamedRegion {
    NamedRegion {
        name: name.to_string(),
        aliases: aliases.iter().map(|a| a.to_string()).collect(),
        bbox: BoundingBox {
            south,
            north,
            west,
            east,
        },
    }
}

fn alias(text: &str, field: CanonicalField) -> (String, CanonicalField) {
    (text.to_string(), field)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_region_case_insensitive() {
        let lexicon = DomainLexicon::builtin();
        let region = lexicon.resolve_region("ARABIAN SEA").unwrap();
        assert_eq!(region.name, "Arabian Sea");
        assert_eq!(region.bbox.south, 8.0);
    }

    #[test]
    fn test_equator_band() {
        let lexicon = DomainLexicon::builtin();
        let equator = lexicon.resolve_region("equator").unwrap();
        assert_eq!(equator.bbox.south, -5.0);
        assert_eq!(equator.bbox.north, 5.0);
    }

    #[test]
    fn test_antimeridian_box() {
        let lexicon = DomainLexicon::builtin();
        let pacific = lexicon.resolve_region("pacific ocean").unwrap();
        assert!(pacific.bbox.crosses_antimeridian());
        assert_eq!(pacific.bbox.lon_intervals().len(), 2);

        let atlantic = lexicon.resolve_region("atlantic ocean").unwrap();
        assert!(!pacific.bbox.overlaps(&BoundingBox {
            south: 0.0,
            north: 10.0,
            west: 0.0,
            east: 10.0,
        }));
        assert!(atlantic.bbox.overlaps(&lexicon.resolve_region("north atlantic").unwrap().bbox));
    }

    #[test]
    fn test_disjoint_regions() {
        let lexicon = DomainLexicon::builtin();
        let arabian = lexicon.resolve_region("arabian sea").unwrap();
        let bengal = lexicon.resolve_region("bay of bengal").unwrap();
        assert!(!arabian.bbox.overlaps(&bengal.bbox));
    }

    #[test]
    fn test_longest_alias_first() {
        let lexicon = DomainLexicon::builtin();
        let first = &lexicon.variable_aliases()[0];
        assert!(first.0.len() >= lexicon.variable_aliases().last().unwrap().0.len());
    }
}
