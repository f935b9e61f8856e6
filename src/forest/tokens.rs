//! Per-line token views over the first derivation
//!
//! Editors tokenize line by line; they want the scanned leaves with their
//! line/column coordinates, not the tree. This view linearizes the first
//! derivation (option 0 at every ambiguous node) and buckets leaves by line.

use serde::Serialize;

use crate::forest::{ForestNodeKind, NodeId, ParseForest};
use crate::runtime::EMPTY_RULE;

/// One scanned leaf, located.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeafData {
    pub rule: String,
    pub text: String,
    pub start: usize,
    pub next_input_position: usize,
    pub line: usize,
    pub column: usize,
    pub is_skip: bool,
}

pub(crate) fn tokens_by_line(forest: &ParseForest, line: usize) -> Vec<LeafData> {
    let mut leaves = Vec::new();
    collect_first_derivation(forest, forest.root, &mut leaves, &mut Vec::new());
    leaves
        .into_iter()
        .filter(|(f, id)| touches_line(f, *id, line))
        .map(|(f, id)| {
            let node = f.store.node(id);
            let position = f.sentence.location_of(node.start);
            LeafData {
                rule: f.rule_name(node.rule).to_string(),
                text: f.text_of(id).to_string(),
                start: node.start,
                next_input_position: node.next_input_position,
                line: position.line,
                column: position.column,
                is_skip: f.store.node(id).is_skip(),
            }
        })
        .collect()
}

/// Collect leaves of the first derivation in text order. Embedded boundaries
/// descend into the inner forest; its leaves address the same sentence.
fn collect_first_derivation<'f>(
    forest: &'f ParseForest,
    id: NodeId,
    out: &mut Vec<(&'f ParseForest, NodeId)>,
    on_path: &mut Vec<NodeId>,
) {
    let node = forest.store.node(id);
    match &node.kind {
        ForestNodeKind::Leaf { .. } => {
            // Zero-length leaves carry no text to tokenize.
            if node.rule != EMPTY_RULE && !node.is_empty() {
                out.push((forest, id));
            }
        }
        ForestNodeKind::Embedded { forest: inner } => {
            collect_first_derivation(inner, inner.root, out, &mut Vec::new());
        }
        ForestNodeKind::Branch { alternatives, .. } => {
            if on_path.contains(&id) {
                return;
            }
            on_path.push(id);
            for &child in &alternatives[0].children {
                collect_first_derivation(forest, child, out, on_path);
            }
            on_path.pop();
        }
    }
}

fn touches_line(forest: &ParseForest, id: NodeId, line: usize) -> bool {
    let node = forest.store.node(id);
    let first = forest.sentence.location_of(node.start).line;
    let last = forest
        .sentence
        .location_of(node.next_input_position.saturating_sub(1).max(node.start))
        .line;
    (first..=last).contains(&line)
}
