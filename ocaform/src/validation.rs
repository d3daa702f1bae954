//! Field value validation.
//!
//! [`validate_field`] is a pure predicate: the same field, value and
//! language always give the same answer, and nothing is recorded.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{data::field::Field, error::ValidationError};

/// A value entered for one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    /// Multi-select input.
    List(Vec<String>),
    /// Raw UTF-16 code units, possibly containing unpaired surrogates.
    Wide(Vec<u16>),
}

impl FieldValue {
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Text(s) => s.is_empty(),
            FieldValue::List(items) => items.is_empty(),
            FieldValue::Wide(units) => units.is_empty(),
        }
    }

    /// Individual values; a single value for scalars.
    pub fn items(&self) -> Vec<String> {
        match self {
            FieldValue::Text(s) => vec![s.clone()],
            FieldValue::List(items) => items.clone(),
            FieldValue::Wide(units) => vec![String::from_utf16_lossy(units)],
        }
    }

    /// Display form; list items are joined with `", "`.
    pub fn to_text(&self) -> String {
        self.items().join(", ")
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(items: Vec<String>) -> Self {
        FieldValue::List(items)
    }
}

/// Check `value` against the rules of `field`.
///
/// Rules run in order and the first failure wins: required, format, entry
/// codes, UTF-8 encoding, language options. An empty value only answers to
/// the required rule. List values are checked element by element.
pub fn validate_field(
    field: &Field,
    value: Option<&FieldValue>,
    lang: &str,
) -> Result<(), ValidationError> {
    let Some(value) = value.filter(|v| !v.is_empty()) else {
        return if field.is_mandatory() {
            Err(ValidationError::Required)
        } else {
            Ok(())
        };
    };

    let format = field.validation.format.as_deref().and_then(|pattern| {
        Regex::new(pattern)
            .inspect_err(|e| warn!("field `{}`: ignoring invalid format: {e}", field.id))
            .ok()
    });
    let rules = Rules { field, format, lang };

    match value {
        FieldValue::Text(s) => rules.check(s, true),
        FieldValue::List(items) => items.iter().try_for_each(|s| rules.check(s, true)),
        FieldValue::Wide(units) => {
            let well_formed = String::from_utf16(units).is_ok();
            rules.check(&String::from_utf16_lossy(units), well_formed)
        }
    }
}

struct Rules<'a> {
    field: &'a Field,
    format: Option<Regex>,
    lang: &'a str,
}

impl Rules<'_> {
    fn check(&self, value: &str, well_formed: bool) -> Result<(), ValidationError> {
        let rules = &self.field.validation;

        if let Some(format) = &self.format {
            if !format.is_match(value) {
                return Err(ValidationError::FormatMismatch);
            }
        }

        if !rules.entry_codes.is_empty() && !rules.entry_codes.iter().any(|c| c == value) {
            return Err(ValidationError::EntryCodeMismatch);
        }

        let utf8 = rules
            .character_encoding
            .as_deref()
            .is_some_and(|e| e.trim().eq_ignore_ascii_case("utf-8"));
        if utf8 && !well_formed {
            return Err(ValidationError::InvalidEncoding);
        }

        if let Some(options) = self.field.options(self.lang).filter(|o| !o.is_empty()) {
            if !options.contains(value) {
                return Err(ValidationError::OptionMismatch);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{
        field::{Conformance, EntryOptions, FieldType, ValidationRules},
        package::LangMap,
    };
    use serde_json::json;

    fn field(validation: ValidationRules) -> Field {
        Field {
            id: "f".to_string(),
            labels: LangMap::new(),
            options: LangMap::new(),
            information: LangMap::new(),
            field_type: FieldType::Text,
            orientation: None,
            value: None,
            reference: None,
            reference_button_text: None,
            showing_attribute: Vec::new(),
            placeholder: None,
            validation,
        }
    }

    fn text(s: &str) -> FieldValue {
        FieldValue::from(s)
    }

    #[test]
    fn required_only_for_mandatory() {
        let mandatory = field(ValidationRules {
            conformance: Conformance::Mandatory,
            ..Default::default()
        });
        assert_eq!(validate_field(&mandatory, None, "eng"), Err(ValidationError::Required));
        assert_eq!(
            validate_field(&mandatory, Some(&text("")), "eng"),
            Err(ValidationError::Required)
        );
        assert_eq!(
            validate_field(&mandatory, Some(&FieldValue::List(vec![])), "eng"),
            Err(ValidationError::Required)
        );
        assert_eq!(validate_field(&mandatory, Some(&text("x")), "eng"), Ok(()));

        let optional = field(ValidationRules {
            format: Some("^\\d+$".into()),
            ..Default::default()
        });
        assert_eq!(validate_field(&optional, None, "eng"), Ok(()));
        assert_eq!(validate_field(&optional, Some(&text("")), "eng"), Ok(()));
    }

    #[test]
    fn format_rule() {
        let f = field(ValidationRules {
            format: Some("^\\d{4}$".into()),
            ..Default::default()
        });
        assert_eq!(validate_field(&f, Some(&text("2024")), "eng"), Ok(()));
        assert_eq!(
            validate_field(&f, Some(&text("24")), "eng"),
            Err(ValidationError::FormatMismatch)
        );
    }

    #[test]
    fn invalid_format_is_skipped() {
        let f = field(ValidationRules {
            format: Some("([unclosed".into()),
            ..Default::default()
        });
        assert_eq!(validate_field(&f, Some(&text("anything")), "eng"), Ok(()));
    }

    #[test]
    fn entry_codes_per_element() {
        let f = field(ValidationRules {
            entry_codes: vec!["A".into(), "B".into()],
            ..Default::default()
        });
        let mixed = FieldValue::List(vec!["A".into(), "C".into()]);
        assert_eq!(
            validate_field(&f, Some(&mixed), "eng"),
            Err(ValidationError::EntryCodeMismatch)
        );
        let good = FieldValue::List(vec!["A".into(), "B".into()]);
        assert_eq!(validate_field(&f, Some(&good), "eng"), Ok(()));
    }

    #[test]
    fn utf8_rule() {
        let f = field(ValidationRules {
            character_encoding: Some("UTF-8".into()),
            ..Default::default()
        });
        assert_eq!(validate_field(&f, Some(&text("café")), "eng"), Ok(()));

        let wide: Vec<u16> = "café".encode_utf16().collect();
        assert_eq!(validate_field(&f, Some(&FieldValue::Wide(wide)), "eng"), Ok(()));

        let lone = FieldValue::Wide(vec![0x0061, 0xD800, 0x0062]);
        assert_eq!(
            validate_field(&f, Some(&lone), "eng"),
            Err(ValidationError::InvalidEncoding)
        );

        // other encodings are not checked
        let latin = field(ValidationRules {
            character_encoding: Some("iso-8859-1".into()),
            ..Default::default()
        });
        assert_eq!(validate_field(&latin, Some(&FieldValue::Wide(vec![0xDC00])), "eng"), Ok(()));
    }

    #[test]
    fn options_fall_back_to_english() {
        let mut f = field(ValidationRules::default());
        let eng: EntryOptions = serde_json::from_value(json!({ "eng": "English", "fra": "French" })).unwrap();
        f.options.insert("eng".into(), eng);

        assert_eq!(validate_field(&f, Some(&text("fra")), "fra"), Ok(()));
        assert_eq!(validate_field(&f, Some(&text("English")), "deu"), Ok(()));
        assert_eq!(
            validate_field(&f, Some(&text("deu")), "fra"),
            Err(ValidationError::OptionMismatch)
        );
    }

    #[test]
    fn first_failing_rule_wins() {
        let mut f = field(ValidationRules {
            format: Some("^[a-z]+$".into()),
            entry_codes: vec!["abc".into()],
            ..Default::default()
        });
        f.options.insert("eng".into(), EntryOptions::default());
        assert_eq!(
            validate_field(&f, Some(&text("ABC")), "eng"),
            Err(ValidationError::FormatMismatch)
        );
        assert_eq!(
            validate_field(&f, Some(&text("xyz")), "eng"),
            Err(ValidationError::EntryCodeMismatch)
        );
    }

    #[test]
    fn repeated_calls_agree() {
        let f = field(ValidationRules {
            conformance: Conformance::Mandatory,
            format: Some("^x".into()),
            ..Default::default()
        });
        for value in [None, Some(text("xy")), Some(text("yx"))] {
            let first = validate_field(&f, value.as_ref(), "eng");
            assert_eq!(first, validate_field(&f, value.as_ref(), "eng"));
        }
    }

    #[test]
    fn values_deserialize_untagged() {
        let v: FieldValue = serde_json::from_value(json!("a")).unwrap();
        assert_eq!(v, text("a"));
        let v: FieldValue = serde_json::from_value(json!(["a", "b"])).unwrap();
        assert_eq!(v.to_text(), "a, b");
        let v: FieldValue = serde_json::from_value(json!([97, 98])).unwrap();
        assert_eq!(v, FieldValue::Wide(vec![97, 98]));
    }
}
