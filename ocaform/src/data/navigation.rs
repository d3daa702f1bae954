//! Read-only queries over compiled steps.

use serde::{Deserialize, Serialize};

use crate::data::step::Step;

/// Steps that no reference field points at, in step order.
pub fn parent_steps(steps: &[Step]) -> Vec<&Step> {
    steps
        .iter()
        .filter(|s| !steps.iter().any(|other| other.references_step(&s.id)))
        .collect()
}

/// First step holding a reference field to `child`.
pub fn referencing_step<'a>(child: &str, steps: &'a [Step]) -> Option<&'a Step> {
    steps.iter().find(|s| s.references_step(child))
}

/// Node of the parent to child step tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepNode {
    pub id: String,
    pub children: Vec<StepNode>,
}

/// Parent to child tree rooted at the parent steps.
///
/// A step appears under every step that references it, but never below
/// itself, so cycles terminate. When every step sits on a cycle the first
/// step is used as the only root.
pub fn step_tree(steps: &[Step]) -> Vec<StepNode> {
    let mut roots: Vec<&Step> = parent_steps(steps);
    if roots.is_empty() {
        roots.extend(steps.first());
    }
    let mut path = Vec::new();
    roots
        .into_iter()
        .map(|s| build_node(s, steps, &mut path))
        .collect()
}

fn build_node<'a>(step: &'a Step, steps: &'a [Step], path: &mut Vec<&'a str>) -> StepNode {
    path.push(&step.id);
    let mut children: Vec<StepNode> = Vec::new();
    for (_, target) in step.references() {
        if path.contains(&target) || children.iter().any(|c| c.id == target) {
            continue;
        }
        if let Some(child) = steps.iter().find(|s| s.id == target) {
            children.push(build_node(child, steps, path));
        }
    }
    path.pop();
    StepNode {
        id: step.id.clone(),
        children,
    }
}
