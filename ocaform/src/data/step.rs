use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::data::{
    field::{Field, synthesize_field},
    overlay::{OverlayProjection, StepMeta, UNNAMED_STEP},
    package::{LangMap, Package, Presentation, localized},
    page::{Page, default_page, materialize},
    relation::RelationGraph,
    resolver::EntityResolver,
};

/// Compiled, navigable unit of the form; one per capture unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// Capture-base digest.
    pub id: String,
    #[serde(default)]
    pub names: LangMap<String>,
    #[serde(default)]
    pub descriptions: LangMap<String>,
    /// Form title; only set on the main unit's step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<LangMap<String>>,
    /// Unit through which this step was first reached.
    #[serde(default)]
    pub parent: Option<String>,
    pub pages: Vec<Page>,
}

impl Step {
    /// Name in `lang`, falling back to English.
    pub fn name(&self, lang: &str) -> &str {
        localized(&self.names, lang).unwrap_or(UNNAMED_STEP)
    }

    pub fn description(&self, lang: &str) -> Option<&str> {
        localized(&self.descriptions, lang)
    }

    pub fn title(&self, lang: &str) -> Option<&str> {
        self.title.as_ref().and_then(|t| localized(t, lang))
    }

    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.pages.iter().flat_map(Page::fields)
    }

    pub fn field(&self, id: &str) -> Option<&Field> {
        self.fields().find(|f| f.id == id)
    }

    /// Reference fields with a target, paired with that target id.
    pub fn references(&self) -> impl Iterator<Item = (&Field, &str)> {
        self.fields()
            .filter_map(|f| f.reference_target().map(|target| (f, target)))
    }

    pub fn references_step(&self, id: &str) -> bool {
        self.references().any(|(_, target)| target == id)
    }
}

/// Pages found for one capture unit in one presentation.
#[derive(Debug, Clone, Default)]
pub struct StepDraft {
    pub id: String,
    pub names: LangMap<String>,
    pub descriptions: LangMap<String>,
    pub parent: Option<String>,
    pub pages: Vec<Page>,
}

/// Merges drafts into one [`Step`] per capture unit.
///
/// The first draft for an id fixes the step's metadata; later drafts only
/// contribute pages whose key is not present yet, in first-seen order.
pub struct StepAssembler {
    main: String,
    title: LangMap<String>,
    steps: Vec<Step>,
    index: HashMap<String, usize>,
}

impl StepAssembler {
    pub fn new(main: impl Into<String>, title: LangMap<String>) -> Self {
        Self {
            main: main.into(),
            title,
            steps: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn add(&mut self, draft: StepDraft) {
        let idx = match self.index.get(&draft.id) {
            Some(&idx) => idx,
            None => {
                let title = (draft.id == self.main && !self.title.is_empty())
                    .then(|| self.title.clone());
                self.index.insert(draft.id.clone(), self.steps.len());
                self.steps.push(Step {
                    id: draft.id,
                    names: draft.names,
                    descriptions: draft.descriptions,
                    title,
                    parent: draft.parent,
                    pages: Vec::new(),
                });
                self.steps.len() - 1
            }
        };

        let step = &mut self.steps[idx];
        for page in draft.pages {
            if step.pages.iter().any(|p| p.key == page.key) {
                debug!("step {}: page `{}` already present", step.id, page.key);
                continue;
            }
            step.pages.push(page);
        }
    }

    /// Steps in discovery order.
    pub fn finish(self) -> Vec<Step> {
        self.steps
    }
}

/// Compile a package into its steps, in discovery order.
///
/// Presentations are processed with the main unit's first. Each one is
/// walked through its reference graph; every reachable unit becomes a step,
/// and the presentation's pages are attached to the unit it describes. A
/// unit no presentation describes gets a single default page. A package
/// without presentations compiles to nothing.
pub fn compile_steps(package: &Package) -> Vec<Step> {
    let main = package.main_capture_unit();
    let mut presentations: Vec<&Presentation> = package.presentations().iter().collect();
    if presentations.is_empty() {
        warn!("no presentations found in the package");
        return Vec::new();
    }
    presentations.sort_by_key(|p| p.capture_base != main);

    let resolver = EntityResolver::from_bundle(&package.oca_bundle);
    let describes = |p: &Presentation| -> String {
        resolver
            .canonical_id(&p.capture_base)
            .map(str::to_string)
            .unwrap_or_else(|_| p.capture_base.clone())
    };
    let described: Vec<(String, &Presentation)> =
        presentations.iter().map(|p| (describes(p), *p)).collect();

    let title = described
        .iter()
        .find(|(id, _)| id == main)
        .map(|(_, p)| p.title.clone())
        .unwrap_or_default();
    let mut assembler = StepAssembler::new(main, title);
    let mut fields_by_unit: HashMap<String, Vec<Field>> = HashMap::new();

    for (presented, presentation) in &described {
        let graph = RelationGraph::extract(&resolver, presented);
        if graph.is_empty() {
            warn!("presentation {} describes an unknown capture unit", presentation.capture_base);
            continue;
        }

        for node in graph.nodes() {
            let Ok(unit) = resolver.resolve(&node.id) else {
                continue;
            };
            let fields = fields_by_unit.entry(node.id.clone()).or_insert_with(|| {
                let overlays = OverlayProjection::project(unit);
                let hints = described
                    .iter()
                    .find(|(id, _)| *id == node.id)
                    .map(|(_, p)| *p);
                node.fields
                    .iter()
                    .map(|attr| {
                        let hint = hints.and_then(|p| p.hint(attr));
                        synthesize_field(attr, &overlays, hint, &node.refs)
                    })
                    .collect()
            });

            let pages = if node.id == *presented {
                materialize(presentation, fields)
            } else {
                Vec::new()
            };
            let meta = StepMeta::project(unit);
            assembler.add(StepDraft {
                id: node.id.clone(),
                names: meta.names,
                descriptions: meta.descriptions,
                parent: node.parent.clone(),
                pages,
            });
        }
    }

    let mut steps = assembler.finish();
    for step in steps.iter_mut().filter(|s| s.pages.is_empty()) {
        if let Some(fields) = fields_by_unit.get(&step.id) {
            warn!("no presentation pages for {}, using a default page", step.id);
            step.pages.push(default_page(&step.id, fields));
        }
    }
    steps
}
