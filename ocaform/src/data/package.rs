//! Raw OCA package model.
//!
//! These types mirror the package JSON closely and are only read by the
//! compiler. Every overlay slot is deserialized leniently: a slot with an
//! unexpected shape is logged and replaced by its empty default, so a single
//! broken overlay never prevents the rest of the package from loading.

use std::{collections::BTreeMap, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

use crate::{data::field::EntryOptions, error::FormError};

/// Per-language text keyed by language code (`eng`, `fra`, ...).
pub type LangMap<T> = BTreeMap<String, T>;

/// Top-level package document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Package {
    /// Package digest.
    #[serde(default)]
    pub d: String,
    /// Package type tag.
    #[serde(default, rename = "type")]
    pub kind: String,
    /// Root bundle and its dependencies.
    #[serde(default)]
    pub oca_bundle: OcaBundle,
    /// Presentation documents.
    #[serde(default, deserialize_with = "lenient")]
    pub extensions: Extensions,
}

impl FromStr for Package {
    type Err = FormError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(serde_json::from_str(s)?)
    }
}

impl Package {
    /// Build a package from an already parsed JSON value.
    pub fn from_value(value: Value) -> Result<Self, FormError> {
        Ok(serde_json::from_value(value)?)
    }

    /// Digest of the main capture unit.
    pub fn main_capture_unit(&self) -> &str {
        &self.oca_bundle.bundle.capture_base.d
    }

    /// All presentations shipped with the package.
    pub fn presentations(&self) -> &[Presentation] {
        &self.extensions.form
    }
}

/// Root bundle plus the capture units it may reference.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OcaBundle {
    #[serde(default)]
    pub v: String,
    /// Main capture unit.
    #[serde(default)]
    pub bundle: CaptureUnit,
    /// Further capture units reachable through references.
    #[serde(default)]
    pub dependencies: Vec<CaptureUnit>,
}

/// One capture unit: attributes plus their overlays.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CaptureUnit {
    #[serde(default)]
    pub v: String,
    /// The unit's own digest, used as an alias target by `refs:` sentinels.
    #[serde(default)]
    pub d: String,
    #[serde(default)]
    pub capture_base: CaptureBase,
    #[serde(default, deserialize_with = "lenient")]
    pub overlays: Overlays,
}

/// Attribute declarations of a capture unit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CaptureBase {
    /// Capture-base digest; the canonical identifier of the unit.
    #[serde(default)]
    pub d: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    /// Attribute name to declared type or reference sentinel, in declaration order.
    #[serde(default, deserialize_with = "lenient")]
    pub attributes: Map<String, Value>,
    #[serde(default)]
    pub classification: String,
    #[serde(default, deserialize_with = "lenient")]
    pub flagged_attributes: Vec<Value>,
}

/// Metadata layers attached to a capture unit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Overlays {
    #[serde(default, deserialize_with = "lenient")]
    pub label: Vec<LabelOverlay>,
    #[serde(default, deserialize_with = "lenient")]
    pub entry: Vec<EntryOverlay>,
    #[serde(default, deserialize_with = "lenient")]
    pub information: Vec<InformationOverlay>,
    #[serde(default, deserialize_with = "lenient")]
    pub meta: Vec<MetaOverlay>,
    #[serde(default, deserialize_with = "lenient")]
    pub cardinality: Option<CardinalityOverlay>,
    #[serde(default, deserialize_with = "lenient")]
    pub conformance: Option<ConformanceOverlay>,
    #[serde(default, deserialize_with = "lenient")]
    pub entry_code: Option<EntryCodeOverlay>,
    #[serde(default, deserialize_with = "lenient")]
    pub character_encoding: Option<CharacterEncodingOverlay>,
    #[serde(default, deserialize_with = "lenient")]
    pub format: Option<FormatOverlay>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LabelOverlay {
    #[serde(default)]
    pub language: String,
    #[serde(default, deserialize_with = "lenient")]
    pub attribute_labels: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntryOverlay {
    #[serde(default)]
    pub language: String,
    #[serde(default, deserialize_with = "lenient")]
    pub attribute_entries: BTreeMap<String, EntryOptions>,
}

/// Per-language help text for attributes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InformationOverlay {
    #[serde(default)]
    pub language: String,
    #[serde(default, deserialize_with = "lenient")]
    pub attribute_information: BTreeMap<String, String>,
}

/// Per-language name and description of a capture unit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetaOverlay {
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CardinalityOverlay {
    #[serde(default, deserialize_with = "lenient")]
    pub attribute_cardinality: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConformanceOverlay {
    #[serde(default, deserialize_with = "lenient")]
    pub attribute_conformance: BTreeMap<String, Option<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntryCodeOverlay {
    /// `null` code lists are read as empty lists.
    #[serde(default, deserialize_with = "lenient")]
    pub attribute_entry_codes: BTreeMap<String, Option<Vec<String>>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CharacterEncodingOverlay {
    #[serde(default, deserialize_with = "lenient")]
    pub attribute_character_encoding: BTreeMap<String, Option<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FormatOverlay {
    #[serde(default, deserialize_with = "lenient")]
    pub attribute_formats: BTreeMap<String, Option<String>>,
}

/// Package extensions; only the presentation documents are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Extensions {
    #[serde(default, deserialize_with = "lenient")]
    pub form: Vec<Presentation>,
}

/// How one capture unit's attributes are grouped into pages and sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Presentation {
    #[serde(default)]
    pub d: String,
    /// Capture-base digest of the described unit.
    #[serde(default)]
    pub capture_base: String,
    /// Languages the presentation is written for.
    #[serde(default, deserialize_with = "lenient")]
    pub language: Vec<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub pages: Vec<PageDef>,
    #[serde(default, deserialize_with = "lenient")]
    pub page_order: Vec<String>,
    /// `language -> page or section key -> text`.
    #[serde(default, deserialize_with = "lenient")]
    pub page_labels: LangMap<BTreeMap<String, String>>,
    #[serde(default, deserialize_with = "lenient")]
    pub sidebar_label: LangMap<BTreeMap<String, String>>,
    #[serde(default, deserialize_with = "lenient")]
    pub subheading: LangMap<BTreeMap<String, String>>,
    /// Form title, only meaningful on the main unit's presentation.
    #[serde(default, deserialize_with = "lenient")]
    pub title: LangMap<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub interaction: Vec<Interaction>,
}

impl Presentation {
    /// Page definition declared under `key`.
    pub fn page(&self, key: &str) -> Option<&PageDef> {
        self.pages.iter().find(|p| p.named_section == key)
    }

    /// Interaction hint for `attribute`; the first interaction block naming
    /// it wins.
    pub fn hint(&self, attribute: &str) -> Option<&InteractionHint> {
        self.interaction
            .iter()
            .find_map(|i| i.arguments.get(attribute))
    }
}

/// One page of a presentation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageDef {
    pub named_section: String,
    #[serde(default)]
    pub attribute_order: Vec<OrderEntry>,
}

/// Entry of a page's `attribute_order`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OrderEntry {
    /// A bare attribute id.
    Attribute(String),
    /// A named sub-section listing attribute ids.
    Section {
        named_section: String,
        #[serde(default)]
        attribute_order: Vec<String>,
    },
}

/// UI hints for the attributes of one capture unit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Interaction {
    #[serde(default, deserialize_with = "lenient")]
    pub arguments: BTreeMap<String, InteractionHint>,
}

/// UI hint for a single attribute.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InteractionHint {
    #[serde(default, rename = "type", deserialize_with = "lenient")]
    pub kind: Option<HintKind>,
    #[serde(default, deserialize_with = "lenient")]
    pub orientation: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub value: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub reference_button_text: Option<LocalizedText>,
    #[serde(default, deserialize_with = "lenient")]
    pub showing_attribute: OneOrMany,
    #[serde(default, deserialize_with = "lenient")]
    pub placeholder: Option<LocalizedText>,
}

/// The `type` of an interaction hint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HintKind {
    Name(String),
    Names(Vec<String>),
    Reference {
        #[serde(rename = "type")]
        kind: String,
        #[serde(rename = "ref", default)]
        target: Option<String>,
    },
}

impl HintKind {
    /// The declared UI type name; for a list the first entry wins.
    pub fn name(&self) -> Option<&str> {
        match self {
            HintKind::Name(n) => Some(n),
            HintKind::Names(names) => names.first().map(String::as_str),
            HintKind::Reference { kind, .. } => Some(kind),
        }
    }
}

/// Text that is either language independent or given per language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LocalizedText {
    Plain(String),
    PerLanguage(LangMap<String>),
}

impl LocalizedText {
    /// Text for `lang`, falling back to English.
    pub fn get(&self, lang: &str) -> Option<&str> {
        match self {
            LocalizedText::Plain(s) => Some(s),
            LocalizedText::PerLanguage(map) => localized(map, lang),
        }
    }
}

/// A single string or a list of strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    #[default]
    None,
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::None => Vec::new(),
            OneOrMany::One(s) => vec![s],
            OneOrMany::Many(v) => v,
        }
    }
}

/// Fallback language for labels, names and options.
pub const DEFAULT_LANGUAGE: &str = "eng";

/// Look up `lang` in a per-language map, falling back to English. Empty
/// strings count as missing.
pub fn localized<'a>(map: &'a LangMap<String>, lang: &str) -> Option<&'a str> {
    map.get(lang)
        .filter(|s| !s.is_empty())
        .or_else(|| map.get(DEFAULT_LANGUAGE).filter(|s| !s.is_empty()))
        .map(String::as_str)
}

fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(T::default());
    }
    match serde_json::from_value(value) {
        Ok(v) => Ok(v),
        Err(e) => {
            warn!(
                "malformed overlay data for {}, using empty default: {e}",
                std::any::type_name::<T>()
            );
            Ok(T::default())
        }
    }
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => {
            warn!("ignoring non-scalar default value: {other}");
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn malformed_overlay_degrades_to_empty() {
        let unit: CaptureUnit = serde_json::from_value(json!({
            "d": "Edep",
            "capture_base": { "d": "Ecb", "attributes": { "name": "Text" } },
            "overlays": {
                "label": "not a list",
                "conformance": { "attribute_conformance": { "name": "M" } },
                "cardinality": { "attribute_cardinality": { "name": 12 } }
            }
        }))
        .unwrap();

        assert!(unit.overlays.label.is_empty());
        assert!(
            unit.overlays
                .cardinality
                .unwrap()
                .attribute_cardinality
                .is_empty()
        );
        let conformance = unit.overlays.conformance.unwrap();
        assert_eq!(
            conformance.attribute_conformance["name"].as_deref(),
            Some("M")
        );
    }

    #[test]
    fn null_entry_codes_read_as_missing() {
        let overlay: EntryCodeOverlay = serde_json::from_value(json!({
            "attribute_entry_codes": { "a": null, "b": ["x", "y"] }
        }))
        .unwrap();
        assert_eq!(overlay.attribute_entry_codes["a"], None);
        assert_eq!(
            overlay.attribute_entry_codes["b"],
            Some(vec!["x".to_string(), "y".to_string()])
        );
    }

    #[test]
    fn attribute_order_mixes_ids_and_sections() {
        let page: PageDef = serde_json::from_value(json!({
            "named_section": "page1",
            "attribute_order": ["title", { "named_section": "dates", "attribute_order": ["start", "end"] }]
        }))
        .unwrap();
        assert_eq!(page.attribute_order[0], OrderEntry::Attribute("title".into()));
        assert_eq!(
            page.attribute_order[1],
            OrderEntry::Section {
                named_section: "dates".into(),
                attribute_order: vec!["start".into(), "end".into()],
            }
        );
    }

    #[test]
    fn hint_kinds() {
        let hint: InteractionHint = serde_json::from_value(json!({
            "type": { "type": "reference", "ref": "Echild" },
            "value": 3,
            "showing_attribute": "name"
        }))
        .unwrap();
        assert_eq!(hint.kind.as_ref().and_then(HintKind::name), Some("reference"));
        assert_eq!(hint.value.as_deref(), Some("3"));
        assert_eq!(hint.showing_attribute.into_vec(), vec!["name".to_string()]);

        let hint: InteractionHint =
            serde_json::from_value(json!({ "type": ["select", "multiple"] })).unwrap();
        assert_eq!(hint.kind.as_ref().and_then(HintKind::name), Some("select"));
    }

    #[test]
    fn localized_falls_back_to_english() {
        let mut map = LangMap::new();
        map.insert("eng".to_string(), "Title".to_string());
        map.insert("fra".to_string(), String::new());
        assert_eq!(localized(&map, "fra"), Some("Title"));
        assert_eq!(localized(&map, "deu"), Some("Title"));
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!("{ not json".parse::<Package>().is_err());
    }
}
