use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::data::{
    field::{Conformance, EntryOptions},
    package::{CaptureUnit, DEFAULT_LANGUAGE, LangMap},
};

/// Name given to a step whose unit carries no meta name.
pub const UNNAMED_STEP: &str = "Unnamed Step";

/// Upper bound used when a cardinality has no usable maximum.
///
/// A finite sentinel keeps the value serializable.
pub const UNBOUNDED: u64 = 999_999_999_999_999_999;

/// Allowed number of values for an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cardinality {
    pub min: u64,
    pub max: u64,
}

impl Default for Cardinality {
    fn default() -> Self {
        Self {
            min: 0,
            max: UNBOUNDED,
        }
    }
}

impl Cardinality {
    /// Parse `"min-max"`. A missing or non-numeric min reads as 0, a
    /// missing or non-numeric max as [`UNBOUNDED`]. Never fails.
    pub fn parse(s: &str) -> Self {
        let mut parts = s.split('-');
        let min = parts
            .next()
            .and_then(|p| p.trim().parse::<u64>().ok())
            .unwrap_or(0);
        let max = parts
            .next()
            .and_then(|p| p.trim().parse::<u64>().ok())
            .unwrap_or(UNBOUNDED);
        Self { min, max }
    }

    pub fn is_bounded(&self) -> bool {
        self.max != UNBOUNDED
    }
}

/// Overlay data of one capture unit, normalised per attribute.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverlayProjection {
    /// `language -> attribute -> label`.
    pub labels: LangMap<BTreeMap<String, String>>,
    /// `language -> attribute -> options`.
    pub options: LangMap<BTreeMap<String, EntryOptions>>,
    /// `language -> attribute -> help text`.
    pub information: LangMap<BTreeMap<String, String>>,
    pub cardinality: BTreeMap<String, Cardinality>,
    pub conformance: BTreeMap<String, Conformance>,
    pub entry_codes: BTreeMap<String, Vec<String>>,
    pub character_encoding: BTreeMap<String, String>,
    pub format: BTreeMap<String, String>,
}

impl OverlayProjection {
    /// Collect every overlay of `unit`. Absent overlays give empty maps.
    pub fn project(unit: &CaptureUnit) -> Self {
        let overlays = &unit.overlays;
        let mut projection = OverlayProjection::default();

        for label in &overlays.label {
            projection
                .labels
                .insert(label.language.clone(), label.attribute_labels.clone());
        }
        for entry in &overlays.entry {
            projection
                .options
                .insert(entry.language.clone(), entry.attribute_entries.clone());
        }
        for info in &overlays.information {
            projection
                .information
                .insert(info.language.clone(), info.attribute_information.clone());
        }

        if let Some(card) = &overlays.cardinality {
            projection.cardinality = card
                .attribute_cardinality
                .iter()
                .map(|(attr, range)| (attr.clone(), Cardinality::parse(range)))
                .collect();
        }
        if let Some(conf) = &overlays.conformance {
            projection.conformance = conf
                .attribute_conformance
                .iter()
                .filter_map(|(attr, v)| Some((attr.clone(), Conformance::parse(v.as_deref()?))))
                .collect();
        }
        if let Some(codes) = &overlays.entry_code {
            projection.entry_codes = codes
                .attribute_entry_codes
                .iter()
                .map(|(attr, v)| (attr.clone(), v.clone().unwrap_or_default()))
                .collect();
        }
        if let Some(enc) = &overlays.character_encoding {
            projection.character_encoding = flatten(&enc.attribute_character_encoding);
        }
        if let Some(fmt) = &overlays.format {
            projection.format = flatten(&fmt.attribute_formats);
        }
        projection
    }
}

fn flatten(map: &BTreeMap<String, Option<String>>) -> BTreeMap<String, String> {
    map.iter()
        .filter_map(|(k, v)| Some((k.clone(), v.clone()?)))
        .filter(|(_, v)| !v.is_empty())
        .collect()
}

/// Display name and description of a step, per language.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepMeta {
    pub names: LangMap<String>,
    pub descriptions: LangMap<String>,
}

impl StepMeta {
    pub fn project(unit: &CaptureUnit) -> Self {
        let mut meta = StepMeta::default();
        for m in &unit.overlays.meta {
            let name = m
                .name
                .clone()
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| UNNAMED_STEP.to_string());
            meta.names.insert(m.language.clone(), name);
            meta.descriptions
                .insert(m.language.clone(), m.description.clone().unwrap_or_default());
        }
        if meta.names.is_empty() {
            meta.names
                .insert(DEFAULT_LANGUAGE.to_string(), UNNAMED_STEP.to_string());
        }
        meta
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn cardinality_ranges() {
        assert_eq!(Cardinality::parse("1-3"), Cardinality { min: 1, max: 3 });
        assert_eq!(
            Cardinality::parse("2-"),
            Cardinality {
                min: 2,
                max: UNBOUNDED
            }
        );
        assert_eq!(
            Cardinality::parse("2"),
            Cardinality {
                min: 2,
                max: UNBOUNDED
            }
        );
        assert_eq!(Cardinality::parse("-4"), Cardinality { min: 0, max: 4 });
    }

    #[test]
    fn malformed_cardinality_uses_default_range() {
        assert_eq!(Cardinality::parse(""), Cardinality::default());
        assert_eq!(Cardinality::parse("a-b"), Cardinality::default());
        assert_eq!(Cardinality::parse("1.5-x"), Cardinality::default());
        assert!(!Cardinality::parse("many").is_bounded());
    }

    #[test]
    fn projects_all_overlays() {
        let unit: CaptureUnit = serde_json::from_value(json!({
            "capture_base": { "d": "E1", "attributes": { "lang": "Text", "when": "DateTime" } },
            "overlays": {
                "label": [
                    { "language": "eng", "attribute_labels": { "lang": "Language" } },
                    { "language": "fra", "attribute_labels": { "lang": "Langue" } }
                ],
                "entry": [
                    { "language": "eng", "attribute_entries": { "lang": { "en": "English", "fr": "French" } } }
                ],
                "information": [
                    { "language": "eng", "attribute_information": { "when": "ISO date" } }
                ],
                "cardinality": { "attribute_cardinality": { "lang": "1-2" } },
                "conformance": { "attribute_conformance": { "lang": "M", "when": null } },
                "entry_code": { "attribute_entry_codes": { "lang": ["en", "fr"], "when": null } },
                "character_encoding": { "attribute_character_encoding": { "lang": "utf-8" } },
                "format": { "attribute_formats": { "when": "^\\d{4}$" } },
                "meta": [ { "language": "eng", "name": "Dataset" }, { "language": "fra" } ]
            }
        }))
        .unwrap();

        let p = OverlayProjection::project(&unit);
        assert_eq!(p.labels["fra"]["lang"], "Langue");
        assert_eq!(p.options["eng"]["lang"].len(), 2);
        assert_eq!(p.information["eng"]["when"], "ISO date");
        assert_eq!(p.cardinality["lang"], Cardinality { min: 1, max: 2 });
        assert_eq!(p.conformance["lang"], Conformance::Mandatory);
        assert!(!p.conformance.contains_key("when"));
        assert_eq!(p.entry_codes["lang"], ["en", "fr"]);
        assert!(p.entry_codes["when"].is_empty());
        assert_eq!(p.character_encoding["lang"], "utf-8");
        assert_eq!(p.format["when"], "^\\d{4}$");

        let meta = StepMeta::project(&unit);
        assert_eq!(meta.names["eng"], "Dataset");
        assert_eq!(meta.names["fra"], "Unnamed Step");
        assert_eq!(meta.descriptions["eng"], "");
    }

    #[test]
    fn no_overlays_gives_defaults() {
        let p = OverlayProjection::project(&CaptureUnit::default());
        assert_eq!(p, OverlayProjection::default());
        let meta = StepMeta::project(&CaptureUnit::default());
        assert_eq!(meta.names["eng"], UNNAMED_STEP);
        assert!(meta.descriptions.is_empty());
    }
}
