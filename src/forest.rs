//! The shared packed parse forest
//!
//! Every completed span lives exactly once in a [`ForestStore`], keyed by
//! `(rule, start, length)`; ambiguity is alternative children lists on that
//! one node, never a second node. That sharing is what keeps the forest
//! polynomial where the raw derivation count is exponential.
//!
//! [`ParseForest`] is the consumer-facing view: depth-first traversal with
//! explicit begin/end events, per-line token extraction, tree counting and
//! a one-line-per-node text rendering for diagnostics and tests.

use std::sync::Arc;

use crate::runtime::{RuleId, RuntimeRuleSet};
use crate::sentence::Sentence;

pub mod node;
pub mod tokens;
pub mod treeviz;
pub mod walker;

pub use node::{ForestAlternative, ForestNode, ForestNodeKind, ForestStore, NodeId};
pub use tokens::LeafData;
pub use walker::{BranchEvent, LeafEvent, TreeWalker};

/// The result of a successful parse: every derivation of the sentence,
/// packed.
#[derive(Debug, Clone)]
pub struct ParseForest {
    pub(crate) sentence: Arc<Sentence>,
    pub(crate) rules: Arc<RuntimeRuleSet>,
    pub(crate) store: ForestStore,
    pub(crate) root: NodeId,
    pub(crate) max_num_heads: usize,
}

impl ParseForest {
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn store(&self) -> &ForestStore {
        &self.store
    }

    pub fn sentence(&self) -> &Sentence {
        &self.sentence
    }

    /// Resolve a rule name, including the per-parse goal wrapper, which is
    /// not part of the supplied rule set.
    pub fn rule_name(&self, id: RuleId) -> &str {
        if id.index() >= self.rules.len() {
            "<GOAL>"
        } else {
            self.rules.name(id)
        }
    }

    /// The text a node spans.
    pub fn text_of(&self, id: NodeId) -> &str {
        let node = self.store.node(id);
        self.sentence.slice(node.start..node.next_input_position)
    }

    /// Number of distinct derivations the forest represents.
    pub fn count_trees(&self) -> usize {
        self.store.count_trees(self.root)
    }

    /// Ambiguity diagnostic: the most growing heads the parse ever had in
    /// flight. Greater than one means multiple derivations were explored
    /// (though priority may have collapsed them again).
    pub fn max_num_heads(&self) -> usize {
        self.max_num_heads
    }

    /// Depth-first traversal with explicit begin/end events.
    ///
    /// With `skip_data_as_tree` set, skip leaves flow through the ordinary
    /// leaf event; otherwise they are reported via the dedicated skip event
    /// so structural consumers can ignore them without counting.
    pub fn traverse_depth_first(&self, walker: &mut dyn TreeWalker, skip_data_as_tree: bool) {
        walker::traverse(self, walker, skip_data_as_tree);
    }

    /// Leaves of the first derivation that touch the given 1-based line,
    /// skip leaves included; what an editor tokenizer wants.
    pub fn tokens_by_line(&self, line: usize) -> Vec<LeafData> {
        tokens::tokens_by_line(self, line)
    }

    /// One-line-per-node rendering of the whole forest, alternatives
    /// included.
    pub fn treeviz(&self) -> String {
        treeviz::to_treeviz_str(self)
    }

    /// Structural equality: same rules, spans, children and alternatives.
    pub fn structural_eq(&self, other: &ParseForest) -> bool {
        self.treeviz() == other.treeviz()
    }
}
