//! The worklist that grows, merges and completes derivations
//!
//! One engine instance runs one parse call: a queue of growing heads is
//! drained round by round until it is empty, then the goal check decides
//! success. The transitions:
//!
//! 1. Shift: a head expecting a terminal asks the scanner for a leaf and,
//!    on a match, grows a successor with the leaf (plus any trailing skip
//!    run) appended.
//! 2. Grow: appending a child advances the cursor per rule kind;
//!    repetitions may fork into a completed and a continuing successor.
//! 3. Reduce: a head whose cursor hit the completion sentinel folds its
//!    children into the forest store and re-grows every predecessor with
//!    the completed node as their next child.
//! 4. Merge: successors land in the GSS by key; an existing key absorbs
//!    the new children list as an alternative instead of making a node.
//! 5. Goal check: after exhaustion, the longest completion of the goal
//!    wrapper at the start position must span the whole sentence.
//!
//! Every mutation is idempotent (keys, edges, pops and alternatives all
//! deduplicate), so replays triggered by late merges are harmless
//! repetitions rather than duplicated derivations.

use std::collections::{BTreeSet, VecDeque};
use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::forest::{ForestStore, NodeId, ParseForest};
use crate::parser::gss::{GrowingAlternative, GrowingId, GrowingKey, Gss};
use crate::parser::ParseOptions;
use crate::runtime::{RuleId, RuleKind, RuntimeRuleSet, COMPLETE, EMPTY_RULE};
use crate::scanner::Scanner;
use crate::sentence::Sentence;

/// What a finished worklist run hands back to the API layer.
pub(crate) struct RunOutcome {
    pub store: ForestStore,
    pub goal_candidates: Vec<NodeId>,
    pub max_heads: usize,
    pub furthest: usize,
    pub cancelled: bool,
    pub expected: BTreeSet<String>,
}

pub(crate) struct Engine {
    rules: Arc<RuntimeRuleSet>,
    sentence: Arc<Sentence>,
    options: ParseOptions,
    scanner: Box<dyn Scanner>,
    skip_terminals: Vec<RuleId>,
    gss: Gss,
    store: ForestStore,
    heads: VecDeque<GrowingId>,
    /// Synthetic wrapper around the designated goal rule; its id sits one
    /// past the rule table so it can never collide.
    goal_rule: RuleId,
    goal_kind: RuleKind,
    start_position: usize,
    /// Record every goal completion instead of only full-span ones; used by
    /// embedded sub-parses, which accept any parseable prefix.
    prefix_mode: bool,
    goal_candidates: Vec<NodeId>,
    furthest: usize,
    max_heads: usize,
    /// Position at which expected terminals are being collected, if any.
    probe: Option<usize>,
    expected: BTreeSet<String>,
}

impl Engine {
    pub fn new(
        rules: Arc<RuntimeRuleSet>,
        sentence: Arc<Sentence>,
        options: ParseOptions,
        user_goal: RuleId,
        start_position: usize,
        prefix_mode: bool,
        probe: Option<usize>,
    ) -> Self {
        let scanner = options.scanner.scanner(sentence.clone(), rules.clone());
        let skip_terminals = rules.skip_terminals().to_vec();
        let goal_rule = RuleId(rules.len() as u32);
        Self {
            rules,
            sentence,
            options,
            scanner,
            skip_terminals,
            gss: Gss::new(),
            store: ForestStore::new(),
            heads: VecDeque::new(),
            goal_rule,
            goal_kind: RuleKind::Goal { item: user_goal },
            start_position,
            prefix_mode,
            goal_candidates: Vec::new(),
            furthest: start_position,
            max_heads: 0,
            probe,
            expected: BTreeSet::new(),
        }
    }

    pub fn run(mut self) -> RunOutcome {
        self.start();
        while !self.heads.is_empty() {
            // Cancellation is observed between rounds only; a round never
            // leaves the GSS half-merged.
            if self.cancelled() {
                return self.outcome(true);
            }
            self.max_heads = self.max_heads.max(self.heads.len());
            for _ in 0..self.heads.len() {
                let Some(id) = self.heads.pop_front() else {
                    break;
                };
                self.process(id);
            }
        }
        self.outcome(false)
    }

    fn outcome(self, cancelled: bool) -> RunOutcome {
        RunOutcome {
            store: self.store,
            goal_candidates: self.goal_candidates,
            max_heads: self.max_heads,
            furthest: self.furthest,
            cancelled,
            expected: self.expected,
        }
    }

    fn cancelled(&self) -> bool {
        self.options
            .cancellation
            .as_ref()
            .map_or(false, |flag| flag.load(Ordering::Relaxed))
    }

    fn kind_of(&self, id: RuleId) -> &RuleKind {
        if id == self.goal_rule {
            &self.goal_kind
        } else {
            &self.rules.rule(id).kind
        }
    }

    fn priority_of(&self, id: RuleId) -> u32 {
        if id == self.goal_rule {
            0
        } else {
            self.rules.rule(id).priority
        }
    }

    fn start(&mut self) {
        let (stack, _) = self.gss.find_or_create_stack(self.goal_rule, self.start_position);
        let mut children = Vec::new();
        // The goal wrapper absorbs the leading skip run, so skip text ahead
        // of the first terminal has a parent.
        let nip = self.absorb_skips(self.start_position, &mut children);
        let key = GrowingKey {
            rule: self.goal_rule,
            start: self.start_position,
            next_input_position: nip,
            item_index: 0,
        };
        self.furthest = self.furthest.max(nip);
        self.add_head(
            key,
            stack,
            GrowingAlternative {
                priority: 0,
                children,
                non_skip: 0,
            },
        );
    }

    fn add_head(
        &mut self,
        key: GrowingKey,
        stack: crate::parser::gss::StackId,
        alternative: GrowingAlternative,
    ) {
        let id = self.gss.find_or_create_growing(key, stack);
        if self.gss.add_alternative(id, alternative) {
            let node = self.gss.growing_mut(id);
            if !node.queued {
                node.queued = true;
                self.heads.push_back(id);
            }
        }
    }

    fn process(&mut self, id: GrowingId) {
        let (key, range) = {
            let node = self.gss.growing_mut(id);
            node.queued = false;
            let range = node.processed..node.alternatives.len();
            node.processed = node.alternatives.len();
            (node.key, range)
        };
        if key.item_index == COMPLETE {
            for alternative in range {
                self.reduce(id, alternative);
            }
        } else {
            for alternative in range {
                self.extend(id, alternative);
            }
        }
    }

    /// Shift or push: act on one expecting alternative of a head.
    fn extend(&mut self, id: GrowingId, alternative: usize) {
        let key = self.gss.growing(id).key;
        let alt = self.gss.growing(id).alternatives[alternative].clone();
        let expected = self
            .kind_of(key.rule)
            .expected_items(key.item_index, alt.non_skip);
        if self.probe == Some(key.next_input_position) {
            self.collect_expected(&expected);
        }
        for item in expected {
            if matches!(self.kind_of(item), RuleKind::Terminal(_) | RuleKind::Empty) {
                if let Some(leaf) = self
                    .scanner
                    .find_or_try_create_leaf(key.next_input_position, item)
                {
                    let child = self.store.leaf(&leaf);
                    self.grow(id, &alt, child, item == EMPTY_RULE);
                }
            } else if let RuleKind::Embedded { grammar, goal } = self.kind_of(item) {
                let (grammar, goal) = (grammar.clone(), *goal);
                self.embed(id, &alt, item, grammar, goal);
            } else {
                self.push(id, &alt, item);
            }
        }
    }

    /// Append a completed child (leaf or node) to a predecessor alternative
    /// and enqueue every successor state the rule kind allows.
    fn grow(
        &mut self,
        pred: GrowingId,
        pred_alt: &GrowingAlternative,
        child: NodeId,
        via_empty: bool,
    ) {
        let key = self.gss.growing(pred).key;
        let stack = self.gss.growing(pred).stack;
        let (child_rule, child_end) = {
            let node = self.store.node(child);
            (node.rule, node.next_input_position)
        };
        let zero_length = child_end == key.next_input_position;
        // A zero-length child may appear once per derivation; pumping the
        // same empty span forever would never advance the parse.
        if zero_length && pred_alt.children.contains(&child) {
            return;
        }

        let priority = match self.kind_of(key.rule) {
            RuleKind::Choice { alternatives } => {
                let position = alternatives
                    .iter()
                    .position(|&a| a == child_rule)
                    .expect("completed child is not an alternative of its choice rule");
                self.priority_of(key.rule) + (alternatives.len() - position) as u32
            }
            _ => pred_alt.priority,
        };

        let mut children = pred_alt.children.clone();
        children.push(child);
        let non_skip = pred_alt.non_skip + 1;
        let nip = self.absorb_skips(child_end, &mut children);
        self.furthest = self.furthest.max(nip);

        let next_indexes =
            self.kind_of(key.rule)
                .next_indexes(key.item_index, non_skip, via_empty);
        for next in next_indexes {
            if next == key.item_index && zero_length {
                continue;
            }
            let successor = GrowingKey {
                rule: key.rule,
                start: key.start,
                next_input_position: nip,
                item_index: next,
            };
            self.add_head(
                successor,
                stack,
                GrowingAlternative {
                    priority,
                    children: children.clone(),
                    non_skip,
                },
            );
        }
    }

    /// Push a nonterminal instance: find-or-create its stack node, link the
    /// predecessor, and replay completions recorded before this edge
    /// existed.
    fn push(&mut self, pred: GrowingId, pred_alt: &GrowingAlternative, rule: RuleId) {
        let position = self.gss.growing(pred).key.next_input_position;
        let (stack, created) = self.gss.find_or_create_stack(rule, position);
        if created {
            let key = GrowingKey {
                rule,
                start: position,
                next_input_position: position,
                item_index: 0,
            };
            let alternative = GrowingAlternative {
                priority: self.priority_of(rule),
                children: Vec::new(),
                non_skip: 0,
            };
            self.add_head(key, stack, alternative);
        }
        self.gss.add_edge(stack, pred);
        let pops = self.gss.stack(stack).pops.clone();
        for node in pops {
            self.grow(pred, pred_alt, node, false);
        }
    }

    /// Complete one alternative of a finished head into the forest and
    /// re-grow every predecessor with the result.
    fn reduce(&mut self, id: GrowingId, alternative: usize) {
        let key = self.gss.growing(id).key;
        let stack = self.gss.growing(id).stack;
        let alt = self.gss.growing(id).alternatives[alternative].clone();
        let node = self.store.complete(
            key.rule,
            key.start,
            key.next_input_position,
            alt.priority,
            alt.children,
        );
        // An already-popped span merged in place; predecessors share the
        // node and need no re-growth.
        if !self.gss.record_pop(stack, node) {
            return;
        }
        if key.rule == self.goal_rule && key.start == self.start_position {
            self.goal_candidates.push(node);
            if !self.prefix_mode && key.next_input_position == self.sentence.len() {
                // Nothing stacks above the goal wrapper.
                return;
            }
        }
        let edges = self.gss.stack(stack).edges.clone();
        for pred in edges {
            let alternatives = self.gss.growing(pred).alternatives.clone();
            for pred_alt in &alternatives {
                self.grow(pred, pred_alt, node, false);
            }
        }
    }

    /// Run the embedded grammar as a nested prefix parse and graft each
    /// accepted prefix as an opaque boundary child.
    fn embed(
        &mut self,
        pred: GrowingId,
        pred_alt: &GrowingAlternative,
        rule: RuleId,
        grammar: Arc<RuntimeRuleSet>,
        goal: RuleId,
    ) {
        let start = self.gss.growing(pred).key.next_input_position;
        let nested = Engine::new(
            grammar.clone(),
            self.sentence.clone(),
            self.options.clone(),
            goal,
            start,
            true,
            None,
        );
        let outcome = nested.run();
        if outcome.cancelled {
            return;
        }
        for root in outcome.goal_candidates {
            let next_input_position = outcome.store.node(root).next_input_position;
            let inner = ParseForest {
                sentence: self.sentence.clone(),
                rules: grammar.clone(),
                store: outcome.store.clone(),
                root,
                max_num_heads: outcome.max_heads,
            };
            let child = self.store.embed(rule, start, next_input_position, inner);
            self.grow(pred, pred_alt, child, false);
        }
    }

    /// Greedily append the run of skip leaves starting at `position`.
    fn absorb_skips(&mut self, mut position: usize, children: &mut Vec<NodeId>) -> usize {
        loop {
            let mut advanced = false;
            for i in 0..self.skip_terminals.len() {
                let terminal = self.skip_terminals[i];
                if let Some(leaf) = self.scanner.find_or_try_create_leaf(position, terminal) {
                    if leaf.len() > 0 {
                        children.push(self.store.leaf(&leaf));
                        position = leaf.next_input_position;
                        advanced = true;
                        break;
                    }
                }
            }
            if !advanced {
                return position;
            }
        }
    }

    /// Union the first-terminal names of the expected items, expanding
    /// embedded rules across their grammar boundary.
    fn collect_expected(&mut self, expected: &[RuleId]) {
        let mut names: Vec<String> = Vec::new();
        for &item in expected {
            match self.kind_of(item) {
                RuleKind::Terminal(_) => names.push(self.rules.name(item).to_string()),
                RuleKind::Empty => {}
                RuleKind::Embedded { grammar, goal } => {
                    for &t in grammar.first_terminals(*goal) {
                        if t != EMPTY_RULE {
                            names.push(grammar.name(t).to_string());
                        }
                    }
                }
                RuleKind::Goal { .. }
                | RuleKind::Concatenation { .. }
                | RuleKind::Choice { .. }
                | RuleKind::Multi { .. }
                | RuleKind::SeparatedList { .. } => {
                    for &t in self.rules.first_terminals(item) {
                        if t == EMPTY_RULE {
                            continue;
                        }
                        match &self.rules.rule(t).kind {
                            RuleKind::Embedded { grammar, goal } => {
                                for &sub in grammar.first_terminals(*goal) {
                                    if sub != EMPTY_RULE {
                                        names.push(grammar.name(sub).to_string());
                                    }
                                }
                            }
                            _ => names.push(self.rules.name(t).to_string()),
                        }
                    }
                }
            }
        }
        self.expected.extend(names);
    }
}
