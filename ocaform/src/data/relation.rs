use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::data::resolver::EntityResolver;

/// One capture unit in a reference graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationNode {
    /// Capture-base digest.
    pub id: String,
    /// Whether the unit references at least one other unit.
    pub is_parent: bool,
    /// Unit through which this one was first reached.
    pub parent: Option<String>,
    /// Referenced units in attribute order, without repeats.
    pub children: Vec<String>,
    /// Attribute names in declaration order.
    pub fields: Vec<String>,
    /// Attribute name to referenced capture-base digest.
    pub refs: BTreeMap<String, String>,
}

/// Reference graph reachable from one capture unit.
///
/// Nodes are kept in depth-first discovery order. Every unit is expanded at
/// most once, so schemas with reference cycles are walked safely.
#[derive(Debug, Clone, Default)]
pub struct RelationGraph {
    nodes: Vec<RelationNode>,
    index: HashMap<String, usize>,
}

impl RelationGraph {
    /// Walk the references starting at `root`.
    ///
    /// A root that cannot be resolved yields an empty graph; a reference
    /// whose target is missing is logged and skipped.
    pub fn extract(resolver: &EntityResolver<'_>, root: &str) -> Self {
        let mut graph = RelationGraph::default();
        let mut seen: HashSet<String> = HashSet::new();
        let mut stack: Vec<(String, Option<String>)> = vec![(root.to_string(), None)];

        while let Some((id, parent)) = stack.pop() {
            let unit = match resolver.resolve(&id) {
                Ok(unit) => unit,
                Err(e) => {
                    warn!("skipping capture unit: {e}");
                    continue;
                }
            };
            let canonical = unit.capture_base.d.clone();
            if !seen.insert(canonical.clone()) {
                continue;
            }

            let mut children: Vec<String> = Vec::new();
            let mut refs = BTreeMap::new();
            for (attr, declared) in &unit.capture_base.attributes {
                let Some(target) = reference_target(declared) else {
                    continue;
                };
                match resolver.canonical_id(target) {
                    Ok(child) => {
                        refs.insert(attr.clone(), child.to_string());
                        if !children.iter().any(|c| c == child) {
                            children.push(child.to_string());
                        }
                    }
                    Err(e) => warn!("attribute `{attr}` of {canonical}: {e}"),
                }
            }
            debug!("{canonical}: {} child unit(s)", children.len());

            for child in children.iter().rev() {
                if !seen.contains(child) {
                    stack.push((child.clone(), Some(canonical.clone())));
                }
            }

            graph.index.insert(canonical.clone(), graph.nodes.len());
            graph.nodes.push(RelationNode {
                id: canonical,
                is_parent: !children.is_empty(),
                parent,
                children,
                fields: unit.capture_base.attributes.keys().cloned().collect(),
                refs,
            });
        }
        graph
    }

    /// Nodes in discovery order; the root comes first.
    pub fn nodes(&self) -> &[RelationNode] {
        &self.nodes
    }

    pub fn get(&self, id: &str) -> Option<&RelationNode> {
        self.index.get(id).map(|&idx| &self.nodes[idx])
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Target digest of a reference sentinel: `refs:<digest>` or
/// `Array[refs:<digest>]`.
pub fn reference_target(declared: &Value) -> Option<&str> {
    let s = declared.as_str()?.trim();
    let inner = s
        .strip_prefix("Array[")
        .and_then(|rest| rest.strip_suffix(']'))
        .unwrap_or(s);
    inner
        .strip_prefix("refs:")
        .map(str::trim)
        .filter(|target| !target.is_empty())
}
