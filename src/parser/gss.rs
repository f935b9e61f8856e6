//! Graph-structured stack arenas
//!
//! Nodes address each other by integer handle into per-parse vectors, never
//! by owned reference: previous-link graphs are cyclic after merges, and
//! handles make the whole graph droppable at once when the parse call
//! returns.
//!
//! Two arenas cooperate:
//!
//! - [`GrowingNode`]s are derivations under construction, one per
//!   `(rule, start, nextInputPosition, nextItemIndex)` key. A key collision
//!   IS the merge: the later arrival contributes its children list as an
//!   additional alternative on the existing node. This is what bounds node
//!   creation polynomially in sentence length.
//! - [`StackNode`]s hold, per `(rule, start)` instance, the previous edges
//!   (which growing nodes pushed this instance) and the completions recorded
//!   so far (pops). Pops are replayed when an edge arrives after completion
//!   already happened, so late merges lose nothing.

use rustc_hash::FxHashMap;

use crate::forest::NodeId;
use crate::runtime::RuleId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct GrowingId(u32);

impl GrowingId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct StackId(u32);

impl StackId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Identity of a derivation under construction. `item_index` of
/// [`COMPLETE`](crate::runtime::COMPLETE) means all mandatory children are
/// present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct GrowingKey {
    pub rule: RuleId,
    pub start: usize,
    pub next_input_position: usize,
    pub item_index: i32,
}

/// One children list of a growing node; `non_skip` counts the children that
/// participate in cursor arithmetic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct GrowingAlternative {
    pub priority: u32,
    pub children: Vec<NodeId>,
    pub non_skip: u32,
}

#[derive(Debug)]
pub(crate) struct GrowingNode {
    pub key: GrowingKey,
    pub stack: StackId,
    pub alternatives: Vec<GrowingAlternative>,
    /// Alternatives below this mark have been shifted/reduced already; a
    /// merge that adds a new alternative re-queues the node for the rest.
    pub processed: usize,
    pub queued: bool,
}

#[derive(Debug)]
pub(crate) struct StackNode {
    pub rule: RuleId,
    pub start: usize,
    pub edges: Vec<GrowingId>,
    pub pops: Vec<NodeId>,
}

#[derive(Debug, Default)]
pub(crate) struct Gss {
    growing: Vec<GrowingNode>,
    index: FxHashMap<GrowingKey, GrowingId>,
    stacks: Vec<StackNode>,
    stack_index: FxHashMap<(RuleId, usize), StackId>,
}

impl Gss {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn growing(&self, id: GrowingId) -> &GrowingNode {
        &self.growing[id.index()]
    }

    pub fn growing_mut(&mut self, id: GrowingId) -> &mut GrowingNode {
        &mut self.growing[id.index()]
    }

    pub fn stack(&self, id: StackId) -> &StackNode {
        &self.stacks[id.index()]
    }

    pub fn find_or_create_stack(&mut self, rule: RuleId, start: usize) -> (StackId, bool) {
        if let Some(&id) = self.stack_index.get(&(rule, start)) {
            return (id, false);
        }
        let id = StackId(self.stacks.len() as u32);
        self.stacks.push(StackNode {
            rule,
            start,
            edges: Vec::new(),
            pops: Vec::new(),
        });
        self.stack_index.insert((rule, start), id);
        (id, true)
    }

    /// Link a predecessor; returns false if the edge already existed.
    pub fn add_edge(&mut self, stack: StackId, predecessor: GrowingId) -> bool {
        let edges = &mut self.stacks[stack.index()].edges;
        if edges.contains(&predecessor) {
            return false;
        }
        edges.push(predecessor);
        true
    }

    /// Record a completion; returns false if this span was popped before.
    pub fn record_pop(&mut self, stack: StackId, node: NodeId) -> bool {
        let pops = &mut self.stacks[stack.index()].pops;
        if pops.contains(&node) {
            return false;
        }
        pops.push(node);
        true
    }

    /// The merge point: key-equal states are one node.
    pub fn find_or_create_growing(&mut self, key: GrowingKey, stack: StackId) -> GrowingId {
        if let Some(&id) = self.index.get(&key) {
            debug_assert_eq!(self.growing[id.index()].stack, stack);
            return id;
        }
        let id = GrowingId(self.growing.len() as u32);
        self.growing.push(GrowingNode {
            key,
            stack,
            alternatives: Vec::new(),
            processed: 0,
            queued: false,
        });
        self.index.insert(key, id);
        id
    }

    /// Fold a children list into a node; returns false on an exact
    /// duplicate.
    pub fn add_alternative(&mut self, id: GrowingId, alternative: GrowingAlternative) -> bool {
        let node = &mut self.growing[id.index()];
        if node.alternatives.contains(&alternative) {
            return false;
        }
        node.alternatives.push(alternative);
        true
    }

}
