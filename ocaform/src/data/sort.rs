use std::collections::{HashMap, VecDeque};

use crate::{data::step::Step, error::CyclicReferenceWarning};

/// Steps in dependency order, plus a warning when no such order exists.
#[derive(Debug, Clone)]
pub struct SortOutcome {
    pub steps: Vec<Step>,
    pub cycle: Option<CyclicReferenceWarning>,
}

/// Order steps so every referencing step comes before the steps it
/// references.
///
/// Uses Kahn's algorithm with a FIFO ready queue seeded in input order, so
/// the first step stays first whenever nothing references it. Edges to
/// unknown steps are ignored. When references form a cycle the input order
/// is returned unchanged together with the steps left unresolved.
pub fn sort_steps(steps: Vec<Step>) -> SortOutcome {
    let n = steps.len();
    let mut index: HashMap<&str, usize> = HashMap::with_capacity(n);
    for (i, step) in steps.iter().enumerate() {
        index.entry(step.id.as_str()).or_insert(i);
    }

    let mut edges: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut in_degree = vec![0usize; n];
    for (i, step) in steps.iter().enumerate() {
        for (field, target) in step.references() {
            let Some(&j) = index.get(target) else {
                debug!("{}: `{}` references unknown step {target}", step.id, field.id);
                continue;
            };
            if !edges[i].contains(&j) {
                edges[i].push(j);
                in_degree[j] += 1;
            }
        }
    }

    let mut ready: VecDeque<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(n);
    while let Some(i) = ready.pop_front() {
        order.push(i);
        for &j in &edges[i] {
            in_degree[j] -= 1;
            if in_degree[j] == 0 {
                ready.push_back(j);
            }
        }
    }

    if order.len() != n {
        let unresolved: Vec<String> = steps
            .iter()
            .enumerate()
            .filter(|(i, _)| in_degree[*i] > 0)
            .map(|(_, s)| s.id.clone())
            .collect();
        let warning = CyclicReferenceWarning { unresolved };
        warn!("{warning}, keeping discovery order");
        return SortOutcome {
            steps,
            cycle: Some(warning),
        };
    }

    let mut slots: Vec<Option<Step>> = steps.into_iter().map(Some).collect();
    let steps = order.into_iter().filter_map(|i| slots[i].take()).collect();
    SortOutcome { steps, cycle: None }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{
        field::{Field, FieldType, ValidationRules},
        package::LangMap,
        page::{Page, Section},
    };

    fn reference(id: &str, target: &str) -> Field {
        Field {
            id: id.to_string(),
            labels: LangMap::new(),
            options: LangMap::new(),
            information: LangMap::new(),
            field_type: FieldType::Reference,
            orientation: None,
            value: None,
            reference: Some(target.to_string()),
            reference_button_text: None,
            showing_attribute: Vec::new(),
            placeholder: None,
            validation: ValidationRules::default(),
        }
    }

    fn step(id: &str, targets: &[&str]) -> Step {
        let fields = targets
            .iter()
            .enumerate()
            .map(|(i, t)| reference(&format!("r{i}"), t))
            .collect();
        Step {
            id: id.to_string(),
            names: LangMap::new(),
            descriptions: LangMap::new(),
            title: None,
            parent: None,
            pages: vec![Page {
                key: "p".to_string(),
                label: LangMap::new(),
                sidebar_label: LangMap::new(),
                subheading: LangMap::new(),
                sections: vec![Section {
                    key: "s".to_string(),
                    label: LangMap::new(),
                    fields,
                }],
                capture_unit: id.to_string(),
            }],
        }
    }

    fn ids(outcome: &SortOutcome) -> Vec<&str> {
        outcome.steps.iter().map(|s| s.id.as_str()).collect()
    }

    #[test]
    fn referencing_steps_come_first() {
        let steps = vec![
            step("Org", &[]),
            step("Main", &["Creator", "Funder"]),
            step("Creator", &["Org"]),
            step("Funder", &[]),
        ];
        let outcome = sort_steps(steps);
        assert!(outcome.cycle.is_none());
        assert_eq!(ids(&outcome), ["Main", "Creator", "Funder", "Org"]);
    }

    #[test]
    fn first_step_stays_first() {
        let steps = vec![step("Main", &["A"]), step("B", &[]), step("A", &[])];
        assert_eq!(ids(&sort_steps(steps)), ["Main", "B", "A"]);
    }

    #[test]
    fn duplicate_and_unknown_edges_are_ignored() {
        let steps = vec![step("Main", &["A", "A", "Nowhere"]), step("A", &[])];
        let outcome = sort_steps(steps);
        assert!(outcome.cycle.is_none());
        assert_eq!(ids(&outcome), ["Main", "A"]);
    }

    #[test]
    fn cycle_keeps_input_order() {
        let steps = vec![step("Main", &["A"]), step("A", &["B"]), step("B", &["A"])];
        let outcome = sort_steps(steps);
        assert_eq!(ids(&outcome), ["Main", "A", "B"]);
        let cycle = outcome.cycle.unwrap();
        assert_eq!(cycle.unresolved, ["A", "B"]);
    }

    #[test]
    fn self_reference_is_a_cycle() {
        let outcome = sort_steps(vec![step("Main", &["Main"])]);
        assert!(outcome.cycle.is_some());
        assert_eq!(ids(&outcome), ["Main"]);
    }

    #[test]
    fn empty_input() {
        let outcome = sort_steps(Vec::new());
        assert!(outcome.steps.is_empty());
        assert!(outcome.cycle.is_none());
    }
}
