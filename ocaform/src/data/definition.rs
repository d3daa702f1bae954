use std::collections::HashMap;

use crate::{
    data::{
        navigation::{self, StepNode},
        package::{DEFAULT_LANGUAGE, Package},
        sort::{SortOutcome, sort_steps},
        step::{Step, compile_steps},
    },
    error::{CyclicReferenceWarning, FormError, Result},
};

/// A package compiled once into ordered steps.
///
/// Immutable after construction; sessions share it behind an `Arc`.
#[derive(Debug, Clone)]
pub struct FormDefinition {
    steps: Vec<Step>,
    index: HashMap<String, usize>,
    parents: Vec<usize>,
    languages: Vec<String>,
    cycle: Option<CyclicReferenceWarning>,
}

impl FormDefinition {
    /// Compile and order the steps of `package`.
    pub fn compile(package: &Package) -> Self {
        let SortOutcome { steps, cycle } = sort_steps(compile_steps(package));

        let mut languages: Vec<String> = Vec::new();
        for lang in package.presentations().iter().flat_map(|p| &p.language) {
            if !languages.contains(lang) {
                languages.push(lang.clone());
            }
        }
        if languages.is_empty() {
            languages.push(DEFAULT_LANGUAGE.to_string());
        }

        Self::from_steps(steps, languages, cycle)
    }

    /// Wrap already ordered steps.
    pub fn from_steps(
        steps: Vec<Step>,
        languages: Vec<String>,
        cycle: Option<CyclicReferenceWarning>,
    ) -> Self {
        let mut index = HashMap::with_capacity(steps.len());
        for (i, step) in steps.iter().enumerate() {
            index.entry(step.id.clone()).or_insert(i);
        }
        let parents = steps
            .iter()
            .enumerate()
            .filter(|(_, s)| !steps.iter().any(|other| other.references_step(&s.id)))
            .map(|(i, _)| i)
            .collect();
        Self {
            steps,
            index,
            parents,
            languages,
            cycle,
        }
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn step(&self, id: &str) -> Option<&Step> {
        self.step_index(id).map(|i| &self.steps[i])
    }

    pub fn step_index(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn step_at(&self, index: usize) -> Result<&Step> {
        self.steps.get(index).ok_or(FormError::StepOutOfRange {
            index,
            len: self.steps.len(),
        })
    }

    /// Whether no reference field points at the step.
    pub fn is_parent(&self, index: usize) -> bool {
        self.parents.contains(&index)
    }

    /// Indices of the parent steps, in step order.
    pub fn parent_indices(&self) -> &[usize] {
        &self.parents
    }

    pub fn parent_steps(&self) -> impl Iterator<Item = &Step> {
        self.parents.iter().map(|&i| &self.steps[i])
    }

    /// Index of the first step referencing `child`.
    pub fn referencing_step(&self, child: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.references_step(child))
    }

    pub fn tree(&self) -> Vec<StepNode> {
        navigation::step_tree(&self.steps)
    }

    /// Languages offered by the presentations, first seen first.
    pub fn languages(&self) -> &[String] {
        &self.languages
    }

    /// Set when the steps could not be put in dependency order.
    pub fn cycle(&self) -> Option<&CyclicReferenceWarning> {
        self.cycle.as_ref()
    }
}
