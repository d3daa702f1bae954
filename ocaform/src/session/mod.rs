//! Form session state.
//!
//! A [`FormSession`] is the single source of truth for one user filling in
//! a compiled form: where they are, what they entered and which values were
//! rejected. Every method applies its whole change before returning, so a
//! UI event loop can call them one at a time without further locking.
//!
//! Edits land in a page draft first. Saving commits the draft into the
//! active scope: the child record being edited, or else the current step.
//! Moving between pages commits the draft as well.

mod record;

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

pub use record::{ChildRecord, FormData, Values};

use crate::{
    data::{definition::FormDefinition, field::Field, page::Page, package::DEFAULT_LANGUAGE, step::Step},
    error::{FormError, Result, ValidationError},
    validation::{FieldValue, validate_field},
};

/// Child record currently being edited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveChild {
    pub child_id: String,
    pub parent_field_id: String,
    /// Created by this activation rather than reopened.
    created: bool,
}

/// Runtime state of one form being filled in.
#[derive(Debug, Clone)]
pub struct FormSession {
    form: Arc<FormDefinition>,
    language: String,
    step: usize,
    /// Current page per step.
    pages: Vec<usize>,
    visited: BTreeSet<String>,
    data: FormData,
    draft: Values,
    /// Nested child edits, innermost last.
    active: Vec<ActiveChild>,
    /// Scope (child record id, else step id) to field id to failure.
    errors: BTreeMap<String, BTreeMap<String, ValidationError>>,
}

impl FormSession {
    pub fn new(form: Arc<FormDefinition>) -> Result<Self> {
        let Some(first) = form.steps().first() else {
            return Err(FormError::NothingToRender);
        };
        let visited = BTreeSet::from([first.id.clone()]);
        let pages = vec![0; form.len()];
        Ok(Self {
            form,
            language: DEFAULT_LANGUAGE.to_string(),
            step: 0,
            pages,
            visited,
            data: FormData::default(),
            draft: Values::new(),
            active: Vec::new(),
            errors: BTreeMap::new(),
        })
    }

    pub fn form(&self) -> &FormDefinition {
        &self.form
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn set_language(&mut self, language: impl Into<String>) {
        self.language = language.into();
    }

    pub fn step_index(&self) -> usize {
        self.step
    }

    pub fn current_step(&self) -> &Step {
        &self.form.steps()[self.step]
    }

    pub fn page_index(&self) -> usize {
        self.pages[self.step]
    }

    pub fn current_page(&self) -> Option<&Page> {
        self.current_step().pages.get(self.page_index())
    }

    pub fn is_first_page_of_step(&self) -> bool {
        self.page_index() == 0
    }

    pub fn is_last_page_of_step(&self) -> bool {
        self.page_index() + 1 >= self.current_step().pages.len()
    }

    /// Last page of the last parent step, outside any child record.
    pub fn is_final_page(&self) -> bool {
        self.active.is_empty()
            && self.is_last_page_of_step()
            && self.form.parent_indices().last() == Some(&self.step)
    }

    pub fn is_visited(&self, step_id: &str) -> bool {
        self.visited.contains(step_id)
    }

    pub fn visited(&self) -> impl Iterator<Item = &str> {
        self.visited.iter().map(String::as_str)
    }

    pub fn active_child(&self) -> Option<&ActiveChild> {
        self.active.last()
    }

    /// Validation failures recorded by the last edit or save of each field
    /// in the active scope.
    pub fn errors(&self) -> impl Iterator<Item = (&str, ValidationError)> {
        self.errors
            .get(self.scope_key())
            .into_iter()
            .flatten()
            .map(|(id, e)| (id.as_str(), *e))
    }

    pub fn error(&self, field_id: &str) -> Option<ValidationError> {
        self.errors
            .get(self.scope_key())
            .and_then(|scope| scope.get(field_id))
            .copied()
    }

    /// Committed answers.
    pub fn data(&self) -> &FormData {
        &self.data
    }

    /// Current value of a field in the active scope, draft first.
    pub fn value(&self, field_id: &str) -> Option<&FieldValue> {
        self.draft
            .get(field_id)
            .or_else(|| self.scope().and_then(|values| values.get(field_id)))
    }

    /// Store a value in the page draft and validate it.
    ///
    /// A rejected value is still stored; the failure is recorded and
    /// returned.
    pub fn edit_field(
        &mut self,
        field_id: &str,
        value: impl Into<FieldValue>,
    ) -> Result<Option<ValidationError>> {
        let field = self.field(field_id)?;
        let value = value.into();
        let outcome = validate_field(field, Some(&value), &self.language).err();
        self.record(field_id, outcome);
        self.draft.insert(field_id.to_string(), value);
        Ok(outcome)
    }

    /// Commit the draft and re-validate every field of the current page.
    pub fn save_page(&mut self) -> Vec<(String, ValidationError)> {
        self.commit();

        let Some(page) = self.current_page() else {
            return Vec::new();
        };
        let scope = self.scope();
        let outcomes: Vec<(String, Option<ValidationError>)> = page
            .fields()
            .map(|f| {
                let value = scope.and_then(|values| values.get(&f.id));
                (f.id.clone(), validate_field(f, value, &self.language).err())
            })
            .collect();

        let mut failures = Vec::new();
        for (id, outcome) in outcomes {
            self.record(&id, outcome);
            if let Some(e) = outcome {
                failures.push((id, e));
            }
        }
        failures
    }

    /// Move one page forward. At the end of a parent step this enters the
    /// next parent step; a child step never moves past its last page.
    pub fn next_page(&mut self) -> bool {
        self.commit();
        if !self.is_last_page_of_step() {
            self.pages[self.step] += 1;
            return true;
        }
        if !self.active.is_empty() || !self.form.is_parent(self.step) {
            return false;
        }
        match self.form.parent_indices().iter().find(|&&i| i > self.step) {
            Some(&next) => {
                self.enter(next, 0);
                true
            }
            None => false,
        }
    }

    /// Move one page back. At the start of a parent step this enters the
    /// last page of the previous parent step.
    pub fn previous_page(&mut self) -> bool {
        self.commit();
        if !self.is_first_page_of_step() {
            self.pages[self.step] -= 1;
            return true;
        }
        if !self.active.is_empty() || !self.form.is_parent(self.step) {
            return false;
        }
        match self.form.parent_indices().iter().rev().find(|&&i| i < self.step) {
            Some(&previous) => {
                let last = self.form.steps()[previous].pages.len().saturating_sub(1);
                self.enter(previous, last);
                true
            }
            None => false,
        }
    }

    /// Jump straight to a page. Leaving the step of the record being
    /// edited ends that edit.
    pub fn navigate(&mut self, step: usize, page: usize) -> Result<()> {
        let target = self.form.step_at(step)?;
        let last = target.pages.len().saturating_sub(1);
        if page > last {
            debug!("page {page} of {} out of range, using {last}", target.id);
        }
        self.commit();
        if step != self.step {
            self.active.clear();
        }
        self.enter(step, page.min(last));
        Ok(())
    }

    /// Create a record for the step `parent_field` references and start
    /// editing it.
    pub fn add_child(&mut self, parent_field: &str) -> Result<&ChildRecord> {
        let target = self
            .field(parent_field)?
            .reference_target()
            .ok_or_else(|| FormError::NotAReference(parent_field.to_string()))?
            .to_string();
        let step = self
            .form
            .step_index(&target)
            .ok_or_else(|| FormError::UnknownStep(target.clone()))?;

        self.commit();
        let owner = self.active.last().map(|a| a.child_id.clone());
        let id = self
            .data
            .create_child(parent_field, owner.as_deref(), &target)
            .id
            .clone();
        self.active.push(ActiveChild {
            child_id: id.clone(),
            parent_field_id: parent_field.to_string(),
            created: true,
        });
        self.enter(step, 0);
        self.data.child(&id).ok_or(FormError::UnknownChild(id))
    }

    /// Reopen an existing record.
    pub fn edit_child(&mut self, id: &str) -> Result<()> {
        let record = self
            .data
            .child(id)
            .ok_or_else(|| FormError::UnknownChild(id.to_string()))?;
        let step = self
            .form
            .step_index(&record.step_id)
            .ok_or_else(|| FormError::UnknownStep(record.step_id.clone()))?;
        let parent_field_id = record.parent_field_id.clone();

        self.commit();
        self.active.push(ActiveChild {
            child_id: id.to_string(),
            parent_field_id,
            created: false,
        });
        self.enter(step, 0);
        Ok(())
    }

    /// Delete a record and the records nested in it. Deleting a record that
    /// is being edited ends that edit.
    pub fn delete_child(&mut self, id: &str) -> Result<ChildRecord> {
        let mut removed = self.data.remove_child(id);
        if removed.is_empty() {
            return Err(FormError::UnknownChild(id.to_string()));
        }
        for record in &removed {
            self.errors.remove(&record.id);
        }
        if let Some(pos) = self
            .active
            .iter()
            .position(|a| removed.iter().any(|r| r.id == a.child_id))
        {
            self.active.truncate(pos);
            self.draft.clear();
            let step = self.owner_step();
            self.enter(step, self.pages[step]);
        }
        Ok(removed.remove(0))
    }

    /// Records owned by `parent_field` in the active scope.
    pub fn children_of<'a>(&'a self, parent_field: &'a str) -> impl Iterator<Item = &'a ChildRecord> {
        let owner = self.active.last().map(|a| a.child_id.as_str());
        self.data.children_of(parent_field, owner)
    }

    /// Save the page, leave the current step and return to the step that
    /// references it (or the first step).
    pub fn finish(&mut self) -> Vec<(String, ValidationError)> {
        let failures = self.save_page();
        let child_step = self.current_step().id.clone();
        if !self.form.is_parent(self.step) {
            self.visited.remove(&child_step);
        }
        self.active.pop();
        let step = self
            .active
            .last()
            .and_then(|a| self.data.child(&a.child_id))
            .and_then(|c| self.form.step_index(&c.step_id))
            .or_else(|| self.form.referencing_step(&child_step))
            .unwrap_or(0);
        self.enter(step, self.pages[step]);
        failures
    }

    /// Drop the draft and any record being created, and return to the
    /// start of the form.
    pub fn cancel(&mut self) {
        self.draft.clear();
        for active in std::mem::take(&mut self.active) {
            if active.created {
                self.data.remove_child(&active.child_id);
            }
        }
        self.errors.clear();
        self.pages[0] = 0;
        self.enter(0, 0);
    }

    fn field(&self, field_id: &str) -> Result<&Field> {
        let step = self.current_step();
        step.field(field_id).ok_or_else(|| FormError::UnknownField {
            step: step.id.clone(),
            field: field_id.to_string(),
        })
    }

    fn scope(&self) -> Option<&Values> {
        match self.active.last() {
            Some(active) => self.data.child(&active.child_id).map(|c| &c.data),
            None => self.data.steps.get(&self.current_step().id),
        }
    }

    fn commit(&mut self) {
        if self.draft.is_empty() {
            return;
        }
        let draft = std::mem::take(&mut self.draft);
        let scope = match self.active.last() {
            Some(active) => match self.data.child_mut(&active.child_id) {
                Some(child) => &mut child.data,
                None => {
                    warn!("active child record {} vanished", active.child_id);
                    return;
                }
            },
            None => {
                let step = self.form.steps()[self.step].id.clone();
                self.data.steps.entry(step).or_default()
            }
        };
        scope.extend(draft);
    }

    fn scope_key(&self) -> &str {
        match self.active.last() {
            Some(active) => active.child_id.as_str(),
            None => self.current_step().id.as_str(),
        }
    }

    fn record(&mut self, field_id: &str, outcome: Option<ValidationError>) {
        let key = self.scope_key().to_string();
        match outcome {
            Some(e) => {
                self.errors.entry(key).or_default().insert(field_id.to_string(), e);
            }
            None => {
                if let Some(scope) = self.errors.get_mut(&key) {
                    scope.remove(field_id);
                    if scope.is_empty() {
                        self.errors.remove(&key);
                    }
                }
            }
        }
    }

    fn enter(&mut self, step: usize, page: usize) {
        self.step = step;
        self.pages[step] = page;
        self.visited.insert(self.form.steps()[step].id.clone());
    }

    /// Step of the innermost remaining scope.
    fn owner_step(&self) -> usize {
        self.active
            .last()
            .and_then(|a| self.data.child(&a.child_id))
            .and_then(|c| self.form.step_index(&c.step_id))
            .or_else(|| {
                let current = &self.current_step().id;
                self.form.referencing_step(current)
            })
            .unwrap_or(0)
    }
}
