//! Flattened submission document.
//!
//! Turns the committed answers into an ordered list of questions for a
//! submission endpoint. Each question carries the field id, its label in
//! the chosen language, its type and the answer. Reference fields nest one
//! entry per child record, each with the questions of the referenced step.

use ocaform::{Field, FieldType, FieldValue, FormData, FormDefinition, session::Values};
use serde::{Deserialize, Serialize};

/// One answered (or unanswered) field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: FieldType,
    pub answer: Option<FieldValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ChildQuestions>,
}

/// Questions of one child record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildQuestions {
    /// Child record id.
    pub id: String,
    pub step: String,
    pub questions: Vec<Question>,
}

/// Questions of every parent step, in step order.
///
/// Records whose owner chain never reaches a parent step are left out.
pub fn questions(form: &FormDefinition, data: &FormData, lang: &str) -> Vec<Question> {
    let builder = Builder { form, data, lang };
    form.parent_steps()
        .flat_map(|step| {
            let values = data.step_values(&step.id);
            step.fields().map(move |field| builder.question(field, values, None))
        })
        .collect()
}

#[derive(Clone, Copy)]
struct Builder<'a> {
    form: &'a FormDefinition,
    data: &'a FormData,
    lang: &'a str,
}

impl<'a> Builder<'a> {
    /// `owner` is the child record the values belong to.
    fn question(&self, field: &Field, values: Option<&Values>, owner: Option<&str>) -> Question {
        Question {
            id: field.id.clone(),
            label: field.display_label(self.lang).to_string(),
            kind: field.field_type,
            answer: values.and_then(|v| v.get(&field.id)).cloned(),
            children: self.children(field, owner),
        }
    }

    fn children(&self, field: &Field, owner: Option<&str>) -> Vec<ChildQuestions> {
        let Some(target) = field.reference_target() else {
            return Vec::new();
        };
        let Some(step) = self.form.step(target) else {
            return Vec::new();
        };

        self.data
            .children_of(&field.id, owner)
            .filter(|record| record.step_id == target)
            .map(|record| ChildQuestions {
                id: record.id.clone(),
                step: record.step_id.clone(),
                questions: step
                    .fields()
                    .map(|f| self.question(f, Some(&record.data), Some(record.id.as_str())))
                    .collect(),
            })
            .collect()
    }
}
