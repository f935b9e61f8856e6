//! Depth-first traversal with explicit begin/end events
//!
//! The walker receives the forest as a flat event stream: begin/end for the
//! whole tree, for each branch and each embedded sub-parse boundary, plus
//! leaf and skip events. Every branch event carries its option index, child
//! count and alternative count, so a consumer can linearize any single parse
//! (take option 0 everywhere) or enumerate all parses deterministically
//! (alternatives arrive in insertion order).

use rustc_hash::FxHashSet;

use serde::Serialize;

use crate::forest::{ForestNodeKind, NodeId, ParseForest};

/// A branch or embedded-boundary event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BranchEvent<'a> {
    pub rule: &'a str,
    pub start: usize,
    pub next_input_position: usize,
    /// Which alternative children list this visit covers.
    pub option: usize,
    pub alternative_count: usize,
    pub child_count: usize,
}

/// A leaf or skip event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeafEvent<'a> {
    pub rule: &'a str,
    pub text: &'a str,
    pub start: usize,
    pub next_input_position: usize,
    pub is_skip: bool,
}

/// Downstream consumer contract. All methods default to no-ops so consumers
/// implement only the events they care about.
pub trait TreeWalker {
    fn begin_tree(&mut self) {}
    fn end_tree(&mut self) {}
    fn begin_branch(&mut self, _event: &BranchEvent<'_>) {}
    fn end_branch(&mut self, _event: &BranchEvent<'_>) {}
    fn leaf(&mut self, _event: &LeafEvent<'_>) {}
    fn skip(&mut self, _event: &LeafEvent<'_>) {}
    fn begin_embedded(&mut self, _event: &BranchEvent<'_>) {}
    fn end_embedded(&mut self, _event: &BranchEvent<'_>) {}
}

pub(crate) fn traverse(forest: &ParseForest, walker: &mut dyn TreeWalker, skip_data_as_tree: bool) {
    walker.begin_tree();
    let mut on_path = FxHashSet::default();
    visit(forest, forest.root, walker, skip_data_as_tree, &mut on_path);
    walker.end_tree();
}

fn visit(
    forest: &ParseForest,
    id: NodeId,
    walker: &mut dyn TreeWalker,
    skip_data_as_tree: bool,
    on_path: &mut FxHashSet<NodeId>,
) {
    let node = forest.store.node(id);
    match &node.kind {
        ForestNodeKind::Leaf { is_skip } => {
            let event = LeafEvent {
                rule: forest.rule_name(node.rule),
                text: forest.text_of(id),
                start: node.start,
                next_input_position: node.next_input_position,
                is_skip: *is_skip,
            };
            if *is_skip && !skip_data_as_tree {
                walker.skip(&event);
            } else {
                walker.leaf(&event);
            }
        }
        ForestNodeKind::Embedded { forest: inner } => {
            let event = BranchEvent {
                rule: forest.rule_name(node.rule),
                start: node.start,
                next_input_position: node.next_input_position,
                option: 0,
                alternative_count: 1,
                child_count: 1,
            };
            walker.begin_embedded(&event);
            // Node handles are store-local; the boundary starts a fresh path.
            let mut inner_path = FxHashSet::default();
            visit(inner, inner.root, walker, skip_data_as_tree, &mut inner_path);
            walker.end_embedded(&event);
        }
        ForestNodeKind::Branch { alternatives, .. } => {
            // Derivation cycles only arise over zero-length spans; visit
            // such a node once per path rather than recursing forever.
            if !on_path.insert(id) {
                return;
            }
            for (option, alternative) in alternatives.iter().enumerate() {
                let event = BranchEvent {
                    rule: forest.rule_name(node.rule),
                    start: node.start,
                    next_input_position: node.next_input_position,
                    option,
                    alternative_count: alternatives.len(),
                    child_count: alternative.children.len(),
                };
                walker.begin_branch(&event);
                for &child in &alternative.children {
                    visit(forest, child, walker, skip_data_as_tree, on_path);
                }
                walker.end_branch(&event);
            }
            on_path.remove(&id);
        }
    }
}
