use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::validation::FieldValue;

/// Field id to value.
pub type Values = BTreeMap<String, FieldValue>;

/// One repeatable entry of a referenced step, owned by a reference field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildRecord {
    pub id: String,
    /// Reference field that owns the record.
    pub parent_field_id: String,
    /// Enclosing child record when the reference field itself belongs to a
    /// child step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_record_id: Option<String>,
    /// Step the record is filled in.
    pub step_id: String,
    #[serde(default)]
    pub data: Values,
}

/// Committed answers of a form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormData {
    /// Step id to its values.
    #[serde(default)]
    pub steps: BTreeMap<String, Values>,
    #[serde(default)]
    pub children: Vec<ChildRecord>,
}

impl FormData {
    pub fn step_values(&self, step: &str) -> Option<&Values> {
        self.steps.get(step)
    }

    pub fn child(&self, id: &str) -> Option<&ChildRecord> {
        self.children.iter().find(|c| c.id == id)
    }

    pub fn child_mut(&mut self, id: &str) -> Option<&mut ChildRecord> {
        self.children.iter_mut().find(|c| c.id == id)
    }

    /// Records owned by `field` inside `parent_record` (`None` for a
    /// top-level step), in creation order.
    pub fn children_of<'a>(
        &'a self,
        field: &'a str,
        parent_record: Option<&'a str>,
    ) -> impl Iterator<Item = &'a ChildRecord> {
        self.children
            .iter()
            .filter(move |c| c.parent_field_id == field && c.parent_record_id.as_deref() == parent_record)
    }

    pub(crate) fn create_child(
        &mut self,
        parent_field_id: &str,
        parent_record_id: Option<&str>,
        step_id: &str,
    ) -> &ChildRecord {
        let record = ChildRecord {
            id: Uuid::new_v4().to_string(),
            parent_field_id: parent_field_id.to_string(),
            parent_record_id: parent_record_id.map(str::to_string),
            step_id: step_id.to_string(),
            data: Values::new(),
        };
        debug!("child record {} for `{parent_field_id}`", record.id);
        let idx = self.children.len();
        self.children.push(record);
        &self.children[idx]
    }

    /// Remove a record together with every record nested inside it.
    pub(crate) fn remove_child(&mut self, id: &str) -> Vec<ChildRecord> {
        let mut doomed = vec![id.to_string()];
        let mut i = 0;
        while i < doomed.len() {
            let current = doomed[i].clone();
            doomed.extend(
                self.children
                    .iter()
                    .filter(|c| c.parent_record_id.as_deref() == Some(current.as_str()))
                    .map(|c| c.id.clone()),
            );
            i += 1;
        }

        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.children)
            .into_iter()
            .partition(|c| doomed.contains(&c.id));
        self.children = kept;
        removed
    }
}
