//! Terminal reports: the form outline and answer checks.

use std::fmt::{self, Write};

use colored::Colorize;
use ocaform::{
    Field, FormData, FormDefinition, ValidationError,
    data::{navigation::StepNode, step::Step},
    session::Values,
    validate_field,
};

/// Coloured outline of a compiled form.
pub fn outline(form: &FormDefinition, lang: &str) -> String {
    let mut out = String::new();
    // writing into a String cannot fail
    let _ = write_outline(&mut out, form, lang);
    out
}

fn write_outline(out: &mut String, form: &FormDefinition, lang: &str) -> fmt::Result {
    if let Some(title) = form.steps().first().and_then(|s| s.title(lang)) {
        writeln!(out, "{}", title.bold().underline())?;
    }
    writeln!(out, "languages: {}", form.languages().join(", "))?;
    if let Some(cycle) = form.cycle() {
        writeln!(out, "{}", cycle.to_string().yellow())?;
    }

    writeln!(out, "\n{}", "Steps".bold())?;
    for node in form.tree() {
        write_node(out, form, &node, lang, 1)?;
    }

    for (i, step) in form.steps().iter().enumerate() {
        writeln!(out)?;
        write_step(out, form, i, step, lang)?;
    }
    Ok(())
}

fn write_node(
    out: &mut String,
    form: &FormDefinition,
    node: &StepNode,
    lang: &str,
    depth: usize,
) -> fmt::Result {
    let name = form.step(&node.id).map_or(node.id.as_str(), |s| s.name(lang));
    writeln!(out, "{}{}", "  ".repeat(depth), name)?;
    for child in &node.children {
        write_node(out, form, child, lang, depth + 1)?;
    }
    Ok(())
}

fn write_step(
    out: &mut String,
    form: &FormDefinition,
    index: usize,
    step: &Step,
    lang: &str,
) -> fmt::Result {
    let role = if form.is_parent(index) { "parent" } else { "child" };
    writeln!(
        out,
        "{} {} {}",
        format!("[{}]", index + 1).cyan(),
        step.name(lang).bold(),
        format!("({role}, {})", step.id).dimmed()
    )?;
    if let Some(description) = step.description(lang) {
        writeln!(out, "    {}", description.italic())?;
    }

    for page in &step.pages {
        writeln!(out, "  {} {}", "page".green(), page.label(lang).unwrap_or(&page.key))?;
        for section in &page.sections {
            let indent = match section.label(lang) {
                Some(label) => {
                    writeln!(out, "    {} {label}", "section".blue())?;
                    "      "
                }
                None => "    ",
            };
            for field in &section.fields {
                writeln!(out, "{indent}{}", describe_field(field, form, lang))?;
            }
        }
    }
    Ok(())
}

fn describe_field(field: &Field, form: &FormDefinition, lang: &str) -> String {
    let mut line = format!(
        "- {} {} {}",
        field.display_label(lang),
        format!("`{}`", field.id).dimmed(),
        field.field_type.as_str().cyan()
    );
    if field.is_mandatory() {
        line.push_str(&format!(" {}", "required".red()));
    }
    if let Some(options) = field.options(lang) {
        line.push_str(&format!(" ({} options)", options.len()));
    }
    if let Some(target) = field.reference_target() {
        let name = form.step(target).map_or(target, |s| s.name(lang));
        line.push_str(&format!(" -> {name}"));
    } else if field.field_type == ocaform::FieldType::Reference {
        line.push_str(&format!(" {}", "-> unresolved".yellow()));
    }
    line
}

/// One rejected answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub step: String,
    /// Child record the answer belongs to.
    pub record: Option<String>,
    pub field: String,
    pub error: ValidationError,
}

/// Validate an answers document against the form.
///
/// Parent steps are checked against their step values, child steps against
/// each child record filled for them.
pub fn check_answers(form: &FormDefinition, data: &FormData, lang: &str) -> Vec<Failure> {
    let mut failures = Vec::new();

    for step in form.parent_steps() {
        let values = data.step_values(&step.id);
        check_values(step, values, None, lang, &mut failures);
    }

    for record in &data.children {
        match form.step(&record.step_id) {
            Some(step) => check_values(step, Some(&record.data), Some(record.id.as_str()), lang, &mut failures),
            None => warn!("child record {} belongs to unknown step {}", record.id, record.step_id),
        }
    }
    failures
}

fn check_values(
    step: &Step,
    values: Option<&Values>,
    record: Option<&str>,
    lang: &str,
    failures: &mut Vec<Failure>,
) {
    if let Some(values) = values {
        for id in values.keys().filter(|id| step.field(id).is_none()) {
            warn!("answer `{id}` is not a field of step {}", step.id);
        }
    }

    for field in step.fields() {
        let value = values.and_then(|v| v.get(&field.id));
        if let Err(error) = validate_field(field, value, lang) {
            failures.push(Failure {
                step: step.id.clone(),
                record: record.map(str::to_string),
                field: field.id.clone(),
                error,
            });
        }
    }
}

/// Coloured listing of failures.
pub fn failures_report(form: &FormDefinition, failures: &[Failure], lang: &str) -> String {
    if failures.is_empty() {
        return format!("{}", "all answers are valid".green());
    }

    let mut out = String::new();
    for failure in failures {
        let step = form.step(&failure.step);
        let step_name = step.map_or(failure.step.as_str(), |s| s.name(lang));
        let field = step
            .and_then(|s| s.field(&failure.field))
            .map_or(failure.field.as_str(), |f| f.display_label(lang));
        let scope = match &failure.record {
            Some(record) => format!("{step_name} #{record}"),
            None => step_name.to_string(),
        };
        let _ = writeln!(
            out,
            "{} {}: {}",
            scope.bold(),
            field,
            failure.error.to_string().red()
        );
    }
    let _ = write!(out, "{}", format!("{} invalid answer(s)", failures.len()).red().bold());
    out
}
