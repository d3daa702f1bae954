use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::data::{
    overlay::{Cardinality, OverlayProjection},
    package::{DEFAULT_LANGUAGE, InteractionHint, LangMap, LocalizedText, localized},
};

/// Kind of input a field is rendered as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    #[serde(rename = "textarea")]
    Textarea,
    #[serde(rename = "text")]
    Text,
    #[serde(rename = "DateTime")]
    DateTime,
    #[serde(rename = "radio")]
    Radio,
    #[serde(rename = "select")]
    Select,
    #[serde(rename = "dropdown")]
    Dropdown,
    #[serde(rename = "checkbox")]
    Checkbox,
    #[serde(rename = "boolean")]
    Boolean,
    #[serde(rename = "enum")]
    Enum,
    #[serde(rename = "reference")]
    Reference,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Textarea => "textarea",
            FieldType::Text => "text",
            FieldType::DateTime => "DateTime",
            FieldType::Radio => "radio",
            FieldType::Select => "select",
            FieldType::Dropdown => "dropdown",
            FieldType::Checkbox => "checkbox",
            FieldType::Boolean => "boolean",
            FieldType::Enum => "enum",
            FieldType::Reference => "reference",
        }
    }

    /// Whether the field picks from the attribute's options.
    pub fn is_choice(&self) -> bool {
        matches!(
            self,
            FieldType::Radio
                | FieldType::Select
                | FieldType::Dropdown
                | FieldType::Checkbox
                | FieldType::Enum
        )
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown UI type name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownFieldType(pub String);

impl FromStr for FieldType {
    type Err = UnknownFieldType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "textarea" => FieldType::Textarea,
            "text" | "string" => FieldType::Text,
            "datetime" | "date" => FieldType::DateTime,
            "radio" => FieldType::Radio,
            "select" => FieldType::Select,
            "dropdown" => FieldType::Dropdown,
            "checkbox" => FieldType::Checkbox,
            "boolean" | "bool" => FieldType::Boolean,
            "enum" => FieldType::Enum,
            "reference" => FieldType::Reference,
            _ => return Err(UnknownFieldType(s.to_string())),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Vertical,
    Horizontal,
}

impl Orientation {
    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "vertical" => Some(Orientation::Vertical),
            "horizontal" => Some(Orientation::Horizontal),
            _ => None,
        }
    }
}

/// Whether a value must be supplied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Conformance {
    #[serde(rename = "M")]
    Mandatory,
    #[default]
    #[serde(rename = "O")]
    Optional,
}

impl Conformance {
    /// Only an explicit `M` is mandatory.
    pub fn parse(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("M") {
            Conformance::Mandatory
        } else {
            Conformance::Optional
        }
    }
}

/// One selectable option: stored code and displayed label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryOption {
    pub code: String,
    pub label: String,
}

/// Ordered options of an attribute in one language.
///
/// Reads OCA entry overlays in both shapes (`{code: label}` objects and plain
/// lists) as well as its own serialized form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct EntryOptions(Vec<EntryOption>);

impl EntryOptions {
    pub fn new(options: Vec<EntryOption>) -> Self {
        Self(options)
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntryOption> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether `value` is one of the codes or one of the labels.
    pub fn contains(&self, value: &str) -> bool {
        self.0.iter().any(|o| o.code == value || o.label == value)
    }

    /// Label shown for `code`.
    pub fn label_of(&self, code: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|o| o.code == code)
            .map(|o| o.label.as_str())
    }
}

impl<'de> Deserialize<'de> for EntryOptions {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Item {
            Plain(String),
            Pair(EntryOption),
        }

        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            List(Vec<Item>),
            Coded(Map<String, Value>),
        }

        let options = match Raw::deserialize(deserializer)? {
            Raw::List(items) => items
                .into_iter()
                .map(|item| match item {
                    Item::Plain(s) => EntryOption {
                        code: s.clone(),
                        label: s,
                    },
                    Item::Pair(pair) => pair,
                })
                .collect(),
            Raw::Coded(map) => map
                .into_iter()
                .map(|(code, label)| {
                    let label = match label {
                        Value::String(s) => s,
                        other => other.to_string(),
                    };
                    EntryOption { code, label }
                })
                .collect(),
        };
        Ok(EntryOptions(options))
    }
}

/// Resolved validation rules of a field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationRules {
    pub conformance: Conformance,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entry_codes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character_encoding: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cardinality: Option<Cardinality>,
}

/// One input of the compiled form, self-contained per attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Attribute name.
    pub id: String,
    /// `language -> label`.
    #[serde(default)]
    pub labels: LangMap<String>,
    /// `language -> options`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub options: LangMap<EntryOptions>,
    /// `language -> help text`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub information: LangMap<String>,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orientation: Option<Orientation>,
    /// Default value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Target step of a reference field.
    #[serde(default, rename = "ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_button_text: Option<LocalizedText>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub showing_attribute: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<LocalizedText>,
    #[serde(default)]
    pub validation: ValidationRules,
}

impl Field {
    /// Label in `lang`, falling back to English.
    pub fn label(&self, lang: &str) -> Option<&str> {
        localized(&self.labels, lang)
    }

    /// Label in `lang`, or the attribute id when no label exists.
    pub fn display_label(&self, lang: &str) -> &str {
        self.label(lang).unwrap_or(&self.id)
    }

    /// Options in `lang`, falling back to English.
    pub fn options(&self, lang: &str) -> Option<&EntryOptions> {
        self.options
            .get(lang)
            .filter(|o| !o.is_empty())
            .or_else(|| self.options.get(DEFAULT_LANGUAGE))
    }

    pub fn information(&self, lang: &str) -> Option<&str> {
        localized(&self.information, lang)
    }

    /// Target step when this is a reference field with a resolved target.
    pub fn reference_target(&self) -> Option<&str> {
        match self.field_type {
            FieldType::Reference => self.reference.as_deref(),
            _ => None,
        }
    }

    pub fn is_mandatory(&self) -> bool {
        self.validation.conformance == Conformance::Mandatory
    }
}

/// Merge overlay data, the attribute's interaction hint and the unit's
/// reference map into one [`Field`].
///
/// The type comes from the hint; without one it is `enum` when English
/// options exist and `textarea` otherwise. A reference field only receives a
/// target when `refs` resolves it.
pub fn synthesize_field(
    id: &str,
    overlays: &OverlayProjection,
    hint: Option<&InteractionHint>,
    refs: &BTreeMap<String, String>,
) -> Field {
    let declared = hint.and_then(|h| h.kind.as_ref()).and_then(|k| k.name());
    let field_type = match declared.map(str::parse::<FieldType>) {
        Some(Ok(t)) => t,
        Some(Err(UnknownFieldType(name))) => {
            warn!("field `{id}`: unknown type `{name}`, rendering as textarea");
            FieldType::Textarea
        }
        None => {
            let has_options = overlays
                .options
                .get(DEFAULT_LANGUAGE)
                .is_some_and(|o| o.contains_key(id));
            if has_options {
                FieldType::Enum
            } else {
                FieldType::Textarea
            }
        }
    };

    let reference = match field_type {
        FieldType::Reference => {
            let target = refs.get(id).cloned();
            if target.is_none() {
                warn!("reference field `{id}` has no resolvable target");
            }
            target
        }
        _ => None,
    };

    let labels = overlays
        .labels
        .iter()
        .filter_map(|(lang, l)| Some((lang.clone(), l.get(id)?.clone())))
        .collect();
    let options = overlays
        .options
        .iter()
        .filter_map(|(lang, o)| Some((lang.clone(), o.get(id)?.clone())))
        .collect();
    let information = overlays
        .information
        .iter()
        .filter_map(|(lang, i)| Some((lang.clone(), i.get(id)?.clone())))
        .collect();

    let validation = ValidationRules {
        conformance: overlays.conformance.get(id).copied().unwrap_or_default(),
        format: overlays.format.get(id).cloned(),
        entry_codes: overlays.entry_codes.get(id).cloned().unwrap_or_default(),
        character_encoding: overlays.character_encoding.get(id).cloned(),
        cardinality: overlays.cardinality.get(id).copied(),
    };

    let field = Field {
        id: id.to_string(),
        labels,
        options,
        information,
        field_type,
        orientation: hint
            .and_then(|h| h.orientation.as_deref())
            .and_then(Orientation::parse),
        value: hint.and_then(|h| h.value.clone()),
        reference,
        reference_button_text: hint.and_then(|h| h.reference_button_text.clone()),
        showing_attribute: hint
            .map(|h| h.showing_attribute.clone().into_vec())
            .unwrap_or_default(),
        placeholder: hint.and_then(|h| h.placeholder.clone()),
        validation,
    };

    if field.field_type.is_choice() && field.options.values().all(EntryOptions::is_empty) {
        debug!("choice field `{id}` has no options");
    }
    field
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn projection() -> OverlayProjection {
        let mut p = OverlayProjection::default();
        p.labels.insert(
            "eng".into(),
            BTreeMap::from([("kind".into(), "Kind".into()), ("note".into(), "Note".into())]),
        );
        p.labels
            .insert("fra".into(), BTreeMap::from([("kind".into(), "Genre".into())]));
        let opts: EntryOptions = serde_json::from_value(json!({ "a": "Alpha", "b": "Beta" })).unwrap();
        p.options
            .insert("eng".into(), BTreeMap::from([("kind".into(), opts)]));
        p.conformance.insert("kind".into(), Conformance::Mandatory);
        p.entry_codes.insert("kind".into(), vec!["a".into(), "b".into()]);
        p
    }

    fn hint(value: serde_json::Value) -> InteractionHint {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn type_defaults() {
        let p = projection();
        let refs = BTreeMap::new();
        assert_eq!(synthesize_field("kind", &p, None, &refs).field_type, FieldType::Enum);
        assert_eq!(synthesize_field("note", &p, None, &refs).field_type, FieldType::Textarea);

        let radio = hint(json!({ "type": "radio", "orientation": "vertical", "value": "a" }));
        let f = synthesize_field("kind", &p, Some(&radio), &refs);
        assert_eq!(f.field_type, FieldType::Radio);
        assert_eq!(f.orientation, Some(Orientation::Vertical));
        assert_eq!(f.value.as_deref(), Some("a"));
    }

    #[test]
    fn unknown_hint_type_degrades_to_textarea() {
        let p = projection();
        let f = synthesize_field("note", &p, Some(&hint(json!({ "type": "slider" }))), &BTreeMap::new());
        assert_eq!(f.field_type, FieldType::Textarea);
    }

    #[test]
    fn labels_and_options_are_narrowed() {
        let f = synthesize_field("kind", &projection(), None, &BTreeMap::new());
        assert_eq!(f.labels.len(), 2);
        assert_eq!(f.label("fra"), Some("Genre"));
        assert_eq!(f.options("fra").map(EntryOptions::len), Some(2));
        assert_eq!(f.options("eng").and_then(|o| o.label_of("b")), Some("Beta"));

        let note = synthesize_field("note", &projection(), None, &BTreeMap::new());
        assert_eq!(note.label("fra"), Some("Note"));
        assert!(note.options.is_empty());
    }

    #[test]
    fn validation_rules_resolved() {
        let f = synthesize_field("kind", &projection(), None, &BTreeMap::new());
        assert!(f.is_mandatory());
        assert_eq!(f.validation.entry_codes, ["a", "b"]);

        let note = synthesize_field("note", &projection(), None, &BTreeMap::new());
        assert_eq!(note.validation.conformance, Conformance::Optional);
        assert!(note.validation.entry_codes.is_empty());
    }

    #[test]
    fn reference_target_from_refs_map() {
        let p = OverlayProjection::default();
        let reference = hint(json!({ "type": "reference", "reference_button_text": { "eng": "Add creator" } }));
        let refs = BTreeMap::from([("creator".to_string(), "Ecreator".to_string())]);

        let f = synthesize_field("creator", &p, Some(&reference), &refs);
        assert_eq!(f.reference_target(), Some("Ecreator"));
        assert_eq!(
            f.reference_button_text.as_ref().and_then(|t| t.get("fra")),
            Some("Add creator")
        );

        let dangling = synthesize_field("funder", &p, Some(&reference), &refs);
        assert_eq!(dangling.field_type, FieldType::Reference);
        assert_eq!(dangling.reference, None);
        assert_eq!(dangling.reference_target(), None);
    }

    #[test]
    fn entry_options_shapes() {
        let listed: EntryOptions = serde_json::from_value(json!(["x", "y"])).unwrap();
        assert!(listed.contains("x"));
        assert_eq!(listed.label_of("y"), Some("y"));

        let coded: EntryOptions = serde_json::from_value(json!({ "z": "Zed", "a": "Ay" })).unwrap();
        let codes: Vec<&str> = coded.iter().map(|o| o.code.as_str()).collect();
        assert_eq!(codes, ["z", "a"]);
        assert!(coded.contains("Zed"));
        assert!(!coded.contains("b"));

        let again: EntryOptions =
            serde_json::from_value(serde_json::to_value(&coded).unwrap()).unwrap();
        assert_eq!(again, coded);
    }

    #[test]
    fn field_type_names() {
        assert_eq!("DateTime".parse::<FieldType>(), Ok(FieldType::DateTime));
        assert_eq!("Dropdown".parse::<FieldType>(), Ok(FieldType::Dropdown));
        assert!("slider".parse::<FieldType>().is_err());
        assert_eq!(
            serde_json::to_value(FieldType::DateTime).unwrap(),
            json!("DateTime")
        );
    }
}
