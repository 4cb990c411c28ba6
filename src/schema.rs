//! Canonical Profile Schema
//!
//! The fixed set of flat output fields shared by every translator and the
//! storage collaborator. Column identifiers used in generated SQL come only
//! from this enum, never from raw query text.

use crate::error::{FloatChatError, Result};
use serde::{Deserialize, Serialize};

/// A column of the flat `argo_profiles` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CanonicalField {
    FloatId,
    Latitude,
    Longitude,
    Time,
    Pressure,
    Temperature,
    Salinity,
    Oxygen,
    Chlorophyll,
}

impl CanonicalField {
    /// All fields, in the column order of the flat table.
    pub const ALL: [CanonicalField; 9] = [
        CanonicalField::FloatId,
        CanonicalField::Latitude,
        CanonicalField::Longitude,
        CanonicalField::Time,
        CanonicalField::Pressure,
        CanonicalField::Temperature,
        CanonicalField::Salinity,
        CanonicalField::Oxygen,
        CanonicalField::Chlorophyll,
    ];

    /// The five fields every profile row carries.
    pub const CORE: [CanonicalField; 5] = [
        CanonicalField::FloatId,
        CanonicalField::Latitude,
        CanonicalField::Longitude,
        CanonicalField::Time,
        CanonicalField::Pressure,
    ];

    /// Canonical ARGO-style variable name.
    pub fn name(&self) -> &'static str {
        match self {
            CanonicalField::FloatId => "FLOAT_ID",
            CanonicalField::Latitude => "LATITUDE",
            CanonicalField::Longitude => "LONGITUDE",
            CanonicalField::Time => "TIME",
            CanonicalField::Pressure => "PRES",
            CanonicalField::Temperature => "TEMP",
            CanonicalField::Salinity => "PSAL",
            CanonicalField::Oxygen => "DOXY",
            CanonicalField::Chlorophyll => "CHLA",
        }
    }

    /// SQL column name in `argo_profiles`.
    pub fn column(&self) -> &'static str {
        match self {
            CanonicalField::FloatId => "float_id",
            CanonicalField::Latitude => "latitude",
            CanonicalField::Longitude => "longitude",
            CanonicalField::Time => "date_time",
            CanonicalField::Pressure => "pres",
            CanonicalField::Temperature => "temp",
            CanonicalField::Salinity => "psal",
            CanonicalField::Oxygen => "doxy",
            CanonicalField::Chlorophyll => "chla",
        }
    }

    /// Unit shown in schema descriptions. Not used for validation; threshold
    /// values are passed through as given.
    pub fn unit(&self) -> Option<&'static str> {
        match self {
            CanonicalField::Pressure => Some("dbar"),
            CanonicalField::Temperature => Some("°C"),
            CanonicalField::Salinity => Some("PSU"),
            CanonicalField::Oxygen => Some("µmol/kg"),
            CanonicalField::Chlorophyll => Some("mg/m³"),
            _ => None,
        }
    }

    /// Resolve a canonical variable name or column name, case-insensitively.
    pub fn parse(name: &str) -> Option<CanonicalField> {
        let lower = name.trim().to_lowercase();
        CanonicalField::ALL
            .iter()
            .copied()
            .find(|f| f.name().to_lowercase() == lower || f.column() == lower)
    }

    /// Measured variables, as opposed to identity/position/time axes.
    pub fn is_measurement(&self) -> bool {
        matches!(
            self,
            CanonicalField::Pressure
                | CanonicalField::Temperature
                | CanonicalField::Salinity
                | CanonicalField::Oxygen
                | CanonicalField::Chlorophyll
        )
    }
}

impl std::fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// The schema in force for the current deployment. Core fields are always
/// present; BGC fields may be absent when the ingested files lack them, which
/// is what descriptor revalidation guards against.
#[derive(Debug, Clone)]
pub struct CanonicalSchema {
    fields: Vec<CanonicalField>,
    version: String,
}

impl CanonicalSchema {
    pub fn new(fields: Vec<CanonicalField>, version: impl Into<String>) -> Result<Self> {
        if fields.is_empty() {
            return Err(FloatChatError::Schema(
                "canonical schema has no fields".to_string(),
            ));
        }
        for core in CanonicalField::CORE {
            if !fields.contains(&core) {
                return Err(FloatChatError::Schema(format!(
                    "canonical schema is missing core field {}",
                    core
                )));
            }
        }
        Ok(Self {
            fields,
            version: version.into(),
        })
    }

    /// Schema with every known field.
    pub fn full(version: impl Into<String>) -> Self {
        Self {
            fields: CanonicalField::ALL.to_vec(),
            version: version.into(),
        }
    }

    pub fn fields(&self) -> &[CanonicalField] {
        &self.fields
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn contains(&self, field: CanonicalField) -> bool {
        self.fields.contains(&field)
    }

    /// Plain-text description used as prompt context for the model path.
    pub fn describe(&self) -> String {
        let mut lines = vec![format!(
            "Table argo_profiles (one row per measurement level), schema version {}:",
            self.version
        )];
        for field in &self.fields {
            let unit = field
                .unit()
                .map(|u| format!(" [{}]", u))
                .unwrap_or_default();
            lines.push(format!("- {} (column {}){}", field.name(), field.column(), unit));
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_canonical_and_column_names() {
        assert_eq!(CanonicalField::parse("PSAL"), Some(CanonicalField::Salinity));
        assert_eq!(CanonicalField::parse("psal"), Some(CanonicalField::Salinity));
        assert_eq!(
            CanonicalField::parse("date_time"),
            Some(CanonicalField::Time)
        );
        assert_eq!(CanonicalField::parse("wind_speed"), None);
    }

    #[test]
    fn test_empty_schema_is_fatal() {
        assert!(CanonicalSchema::new(vec![], "v1").is_err());
    }

    #[test]
    fn test_schema_requires_core_fields() {
        let err = CanonicalSchema::new(vec![CanonicalField::Temperature], "v1");
        assert!(err.is_err());

        let mut fields = CanonicalField::CORE.to_vec();
        fields.push(CanonicalField::Temperature);
        let schema = CanonicalSchema::new(fields, "v1").unwrap();
        assert!(schema.contains(CanonicalField::Temperature));
        assert!(!schema.contains(CanonicalField::Oxygen));
    }
}
