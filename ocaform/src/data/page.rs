use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::data::{
    field::Field,
    package::{LangMap, OrderEntry, Presentation, localized},
};

/// Group of fields inside a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Named section key, or the attribute id for an anonymous section.
    pub key: String,
    /// Empty for anonymous sections.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub label: LangMap<String>,
    pub fields: Vec<Field>,
}

impl Section {
    pub fn label(&self, lang: &str) -> Option<&str> {
        localized(&self.label, lang)
    }
}

/// One page of a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub key: String,
    #[serde(default)]
    pub label: LangMap<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub sidebar_label: LangMap<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub subheading: LangMap<String>,
    pub sections: Vec<Section>,
    /// Capture unit the page belongs to.
    pub capture_unit: String,
}

impl Page {
    pub fn label(&self, lang: &str) -> Option<&str> {
        localized(&self.label, lang)
    }

    pub fn sidebar_label(&self, lang: &str) -> Option<&str> {
        localized(&self.sidebar_label, lang).or_else(|| self.label(lang))
    }

    pub fn subheading(&self, lang: &str) -> Option<&str> {
        localized(&self.subheading, lang)
    }

    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.sections.iter().flat_map(|s| s.fields.iter())
    }

    pub fn field(&self, id: &str) -> Option<&Field> {
        self.fields().find(|f| f.id == id)
    }
}

/// Text for `key` from a `language -> key -> text` map, per language.
fn labels_for(map: &LangMap<BTreeMap<String, String>>, key: &str) -> LangMap<String> {
    map.iter()
        .filter_map(|(lang, texts)| {
            let text = texts.get(key)?;
            (!text.is_empty()).then(|| (lang.clone(), text.clone()))
        })
        .collect()
}

/// Lay out `fields` following the presentation's page order.
///
/// Bare attribute ids become anonymous single-field sections, named
/// sub-sections collect their listed fields in order. Ids without a field
/// are dropped, as are pages listed in `page_order` without a definition.
pub fn materialize(presentation: &Presentation, fields: &[Field]) -> Vec<Page> {
    let find = |id: &str| fields.iter().find(|f| f.id == id);

    let mut pages = Vec::with_capacity(presentation.page_order.len());
    for page_key in &presentation.page_order {
        let Some(def) = presentation.page(page_key) else {
            warn!(
                "presentation for {} lists page `{page_key}` without a definition",
                presentation.capture_base
            );
            continue;
        };

        let mut sections = Vec::new();
        for entry in &def.attribute_order {
            match entry {
                OrderEntry::Attribute(id) => match find(id) {
                    Some(field) => sections.push(Section {
                        key: id.clone(),
                        label: LangMap::new(),
                        fields: vec![field.clone()],
                    }),
                    None => debug!("page `{page_key}`: no field for attribute `{id}`"),
                },
                OrderEntry::Section {
                    named_section,
                    attribute_order,
                } => {
                    let section_fields = attribute_order
                        .iter()
                        .filter_map(|id| {
                            let field = find(id);
                            if field.is_none() {
                                debug!("section `{named_section}`: no field for attribute `{id}`");
                            }
                            field.cloned()
                        })
                        .collect();
                    sections.push(Section {
                        key: named_section.clone(),
                        label: labels_for(&presentation.page_labels, named_section),
                        fields: section_fields,
                    });
                }
            }
        }

        pages.push(Page {
            key: page_key.clone(),
            label: labels_for(&presentation.page_labels, page_key),
            sidebar_label: labels_for(&presentation.sidebar_label, page_key),
            subheading: labels_for(&presentation.subheading, page_key),
            sections,
            capture_unit: presentation.capture_base.clone(),
        });
    }
    pages
}

/// Single page listing every field as an anonymous section, for units no
/// presentation describes.
pub fn default_page(capture_unit: &str, fields: &[Field]) -> Page {
    Page {
        key: capture_unit.to_string(),
        label: LangMap::new(),
        sidebar_label: LangMap::new(),
        subheading: LangMap::new(),
        sections: fields
            .iter()
            .map(|f| Section {
                key: f.id.clone(),
                label: LangMap::new(),
                fields: vec![f.clone()],
            })
            .collect(),
        capture_unit: capture_unit.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{field::synthesize_field, overlay::OverlayProjection};
    use serde_json::json;

    fn fields(ids: &[&str]) -> Vec<Field> {
        let p = OverlayProjection::default();
        ids.iter()
            .map(|id| synthesize_field(id, &p, None, &BTreeMap::new()))
            .collect()
    }

    fn presentation() -> Presentation {
        serde_json::from_value(json!({
            "capture_base": "Emain",
            "page_order": ["p1", "ghost", "p2"],
            "pages": [
                { "named_section": "p2", "attribute_order": ["c"] },
                { "named_section": "p1", "attribute_order": [
                    "a",
                    { "named_section": "s1", "attribute_order": ["b", "orphan", "c"] },
                    "orphan"
                ] }
            ],
            "page_labels": {
                "eng": { "p1": "First", "s1": "Details", "p2": "Second" },
                "fra": { "p1": "Premier" }
            },
            "sidebar_label": { "eng": { "p1": "Start" } },
            "subheading": { "eng": { "p2": "More" } }
        }))
        .unwrap()
    }

    #[test]
    fn follows_page_and_attribute_order() {
        let pages = materialize(&presentation(), &fields(&["a", "b", "c"]));
        let keys: Vec<&str> = pages.iter().map(|p| p.key.as_str()).collect();
        assert_eq!(keys, ["p1", "p2"]);

        let p1 = &pages[0];
        assert_eq!(p1.capture_unit, "Emain");
        assert_eq!(p1.label("fra"), Some("Premier"));
        assert_eq!(p1.sidebar_label("eng"), Some("Start"));
        assert_eq!(p1.sections.len(), 2);
        assert_eq!(p1.sections[0].key, "a");
        assert!(p1.sections[0].label.is_empty());
        assert_eq!(p1.sections[1].label("fra"), Some("Details"));

        let ids: Vec<&str> = p1.sections[1].fields.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, ["b", "c"]);

        assert_eq!(pages[1].subheading("eng"), Some("More"));
        assert_eq!(pages[1].sidebar_label("eng"), Some("Second"));
        assert!(pages[1].field("c").is_some());
    }

    #[test]
    fn default_page_lists_all_fields() {
        let page = default_page("Eunit", &fields(&["x", "y"]));
        assert_eq!(page.key, "Eunit");
        assert_eq!(page.fields().count(), 2);
    }
}
