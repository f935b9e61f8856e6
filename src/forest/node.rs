//! Completed-node store and the disambiguation policy
//!
//! Node identity is exactly `(rule, start, length)`. `complete` is
//! insert-or-merge under the policy:
//!
//! - differing priority: the higher-priority children list replaces the
//!   lower (deterministic precedence, not recorded as ambiguity);
//! - equal priority, both substantial: appended as a true alternative;
//! - equal priority, bare-empty versus substantial: the substantial list
//!   wins and the bare-empty one is dropped, transitively across re-merges;
//!   a bare-empty list is kept only while nothing substantial exists at the
//!   span.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::forest::ParseForest;
use crate::runtime::{RuleId, EMPTY_RULE};
use crate::scanner::Leaf;

/// Handle of a node in one [`ForestStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// One alternative children list of a branch node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForestAlternative {
    pub priority: u32,
    pub children: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub enum ForestNodeKind {
    /// A scanned terminal span.
    Leaf { is_skip: bool },
    /// A completed rule with one or more alternative children lists.
    Branch {
        alternatives: Vec<ForestAlternative>,
        priority: u32,
        has_substantial: bool,
    },
    /// An embedded sub-parse behind an explicit grammar boundary; the inner
    /// forest keeps its own rule numbering.
    Embedded { forest: Box<ParseForest> },
}

/// An immutable completed span.
#[derive(Debug, Clone)]
pub struct ForestNode {
    pub rule: RuleId,
    pub start: usize,
    pub next_input_position: usize,
    pub kind: ForestNodeKind,
}

impl ForestNode {
    pub fn len(&self) -> usize {
        self.next_input_position - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_skip(&self) -> bool {
        matches!(self.kind, ForestNodeKind::Leaf { is_skip: true })
    }

    pub fn alternative_count(&self) -> usize {
        match &self.kind {
            ForestNodeKind::Branch { alternatives, .. } => alternatives.len(),
            _ => 1,
        }
    }
}

/// The canonical store of completed spans: one object per
/// `(rule, start, length)`.
#[derive(Debug, Clone, Default)]
pub struct ForestStore {
    nodes: Vec<ForestNode>,
    index: FxHashMap<(RuleId, usize, usize), NodeId>,
}

impl ForestStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, id: NodeId) -> &ForestNode {
        &self.nodes[id.index()]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn find_complete_node(&self, rule: RuleId, start: usize, length: usize) -> Option<NodeId> {
        self.index.get(&(rule, start, length)).copied()
    }

    /// Intern a scanned leaf.
    pub(crate) fn leaf(&mut self, leaf: &Leaf) -> NodeId {
        let key = (leaf.rule, leaf.start, leaf.len());
        if let Some(&id) = self.index.get(&key) {
            return id;
        }
        self.push(
            key,
            ForestNode {
                rule: leaf.rule,
                start: leaf.start,
                next_input_position: leaf.next_input_position,
                kind: ForestNodeKind::Leaf {
                    is_skip: leaf.is_skip,
                },
            },
        )
    }

    /// Insert-or-merge a completed derivation under the disambiguation
    /// policy. Returns the canonical node for the span either way.
    pub(crate) fn complete(
        &mut self,
        rule: RuleId,
        start: usize,
        next_input_position: usize,
        priority: u32,
        children: Vec<NodeId>,
    ) -> NodeId {
        let key = (rule, start, next_input_position - start);
        let substantial = !self.is_bare_empty(&children);
        let alternative = ForestAlternative { priority, children };
        let Some(&id) = self.index.get(&key) else {
            return self.push(
                key,
                ForestNode {
                    rule,
                    start,
                    next_input_position,
                    kind: ForestNodeKind::Branch {
                        alternatives: vec![alternative],
                        priority,
                        has_substantial: substantial,
                    },
                },
            );
        };

        let node = &mut self.nodes[id.index()];
        let ForestNodeKind::Branch {
            alternatives,
            priority: current,
            has_substantial,
        } = &mut node.kind
        else {
            panic!("completion collided with a non-branch node for rule {rule:?}");
        };

        if priority > *current {
            *alternatives = vec![alternative];
            *current = priority;
            *has_substantial = substantial;
        } else if priority == *current {
            if !substantial && *has_substantial {
                // Bare-empty never re-enters once something substantial is
                // recorded at the span.
            } else if substantial && !*has_substantial {
                *alternatives = vec![alternative];
                *has_substantial = true;
            } else if !alternatives.contains(&alternative) {
                alternatives.push(alternative);
            }
        }
        id
    }

    /// Intern an embedded sub-parse boundary node.
    pub(crate) fn embed(
        &mut self,
        rule: RuleId,
        start: usize,
        next_input_position: usize,
        forest: ParseForest,
    ) -> NodeId {
        let key = (rule, start, next_input_position - start);
        if let Some(&id) = self.index.get(&key) {
            return id;
        }
        self.push(
            key,
            ForestNode {
                rule,
                start,
                next_input_position,
                kind: ForestNodeKind::Embedded {
                    forest: Box::new(forest),
                },
            },
        )
    }

    fn push(&mut self, key: (RuleId, usize, usize), node: ForestNode) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        self.index.insert(key, id);
        id
    }

    /// A children list standing for "zero repetitions chosen": exactly the
    /// distinguished empty leaf.
    fn is_bare_empty(&self, children: &[NodeId]) -> bool {
        children.len() == 1 && self.node(children[0]).rule == EMPTY_RULE
    }

    /// Number of distinct derivations below `root`. Cyclic derivations
    /// (possible for pathological grammars over zero-length spans) count
    /// once rather than diverging.
    pub fn count_trees(&self, root: NodeId) -> usize {
        fn go(
            store: &ForestStore,
            id: NodeId,
            memo: &mut FxHashMap<NodeId, usize>,
            on_path: &mut FxHashSet<NodeId>,
        ) -> usize {
            if let Some(&count) = memo.get(&id) {
                return count;
            }
            if !on_path.insert(id) {
                return 1;
            }
            let count = match &store.node(id).kind {
                ForestNodeKind::Leaf { .. } => 1,
                ForestNodeKind::Embedded { forest } => forest.count_trees(),
                ForestNodeKind::Branch { alternatives, .. } => alternatives
                    .iter()
                    .map(|alt| {
                        alt.children
                            .iter()
                            .map(|&c| go(store, c, memo, on_path))
                            .product::<usize>()
                    })
                    .sum(),
            };
            on_path.remove(&id);
            memo.insert(id, count);
            count
        }
        go(self, root, &mut FxHashMap::default(), &mut FxHashSet::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::RuleId;

    fn leaf_at(store: &mut ForestStore, rule: u32, start: usize, end: usize) -> NodeId {
        store.leaf(&Leaf {
            rule: RuleId(rule),
            start,
            next_input_position: end,
            is_skip: false,
        })
    }

    #[test]
    fn test_identical_spans_share_one_node() {
        let mut store = ForestStore::new();
        let a = leaf_at(&mut store, 1, 0, 1);
        let b = leaf_at(&mut store, 1, 0, 1);
        assert_eq!(a, b);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_equal_priority_accumulates_alternatives() {
        let mut store = ForestStore::new();
        let x = leaf_at(&mut store, 1, 0, 1);
        let y = leaf_at(&mut store, 2, 0, 1);
        let n1 = store.complete(RuleId(5), 0, 1, 0, vec![x]);
        let n2 = store.complete(RuleId(5), 0, 1, 0, vec![y]);
        assert_eq!(n1, n2);
        assert_eq!(store.node(n1).alternative_count(), 2);
        // Re-merging the same children list is not a new alternative.
        store.complete(RuleId(5), 0, 1, 0, vec![x]);
        assert_eq!(store.node(n1).alternative_count(), 2);
    }

    #[test]
    fn test_higher_priority_replaces() {
        let mut store = ForestStore::new();
        let x = leaf_at(&mut store, 1, 0, 1);
        let y = leaf_at(&mut store, 2, 0, 1);
        let n = store.complete(RuleId(5), 0, 1, 1, vec![x]);
        store.complete(RuleId(5), 0, 1, 2, vec![y]);
        assert_eq!(store.node(n).alternative_count(), 1);
        let ForestNodeKind::Branch { alternatives, .. } = &store.node(n).kind else {
            unreachable!()
        };
        assert_eq!(alternatives[0].children, vec![y]);
        // A lower-priority latecomer changes nothing.
        store.complete(RuleId(5), 0, 1, 0, vec![x]);
        assert_eq!(store.node(n).alternative_count(), 1);
    }

    #[test]
    fn test_substantial_dominates_bare_empty() {
        let mut store = ForestStore::new();
        let empty = leaf_at(&mut store, 0, 3, 3);
        let real = leaf_at(&mut store, 1, 3, 3);
        let n = store.complete(RuleId(5), 3, 3, 0, vec![empty]);
        assert_eq!(store.node(n).alternative_count(), 1);
        // Substantial zero-length children replace the bare-empty list.
        store.complete(RuleId(5), 3, 3, 0, vec![real]);
        let ForestNodeKind::Branch { alternatives, .. } = &store.node(n).kind else {
            unreachable!()
        };
        assert_eq!(alternatives.len(), 1);
        assert_eq!(alternatives[0].children, vec![real]);
        // And the bare-empty one cannot re-enter.
        store.complete(RuleId(5), 3, 3, 0, vec![empty]);
        assert_eq!(store.node(n).alternative_count(), 1);
    }

    #[test]
    fn test_bare_empty_kept_while_alone() {
        let mut store = ForestStore::new();
        let empty = leaf_at(&mut store, 0, 3, 3);
        let n = store.complete(RuleId(5), 3, 3, 0, vec![empty]);
        assert_eq!(store.node(n).alternative_count(), 1);
    }

    #[test]
    fn test_count_trees_multiplies_and_sums() {
        let mut store = ForestStore::new();
        let a = leaf_at(&mut store, 1, 0, 1);
        let b = leaf_at(&mut store, 2, 0, 1);
        let c = leaf_at(&mut store, 1, 1, 2);
        let d = leaf_at(&mut store, 2, 1, 2);
        // Two ambiguous children, two alternatives each.
        let left = store.complete(RuleId(5), 0, 1, 0, vec![a]);
        store.complete(RuleId(5), 0, 1, 0, vec![b]);
        let right = store.complete(RuleId(5), 1, 2, 0, vec![c]);
        store.complete(RuleId(5), 1, 2, 0, vec![d]);
        let root = store.complete(RuleId(6), 0, 2, 0, vec![left, right]);
        assert_eq!(store.count_trees(root), 4);
    }
}
