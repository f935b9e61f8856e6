//! Rule sets: the compiled grammar the engine executes
//!
//! A [`RuntimeRuleSet`] is the narrow interface between grammar compilation
//! (external) and the parse engine: a validated table of rules plus the two
//! derived tables the engine's lookahead needs, nullability and
//! first-terminal sets. Both are computed lazily once per rule set and
//! memoized.
//!
//! Construction goes through [`RuntimeRuleSetBuilder`], which lets rules
//! reference each other by name in any order (grammars are recursive) and
//! validates the whole table in `build()`: every reference resolves, every
//! pattern compiles and cannot match zero bytes, repetition bounds are sane.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use rustc_hash::FxHashMap;

use crate::runtime::matchable::Matchable;
use crate::runtime::rule::{RuleId, RuleKind, RuntimeRule, EMPTY_RULE};

/// A rule-set construction or validation error.
///
/// These signal an inconsistent grammar handed to the engine, not a malformed
/// sentence; they are raised at build time so a parse call never sees them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleSetError {
    InvalidPattern { pattern: String, message: String },
    /// A pattern terminal that can succeed on zero bytes; only the
    /// distinguished empty rule may produce zero-length leaves.
    ZeroLengthPattern { rule: String, pattern: String },
    UnknownRule { referenced: String, by: String },
    DuplicateRule { name: String },
    EmptyBody { rule: String },
    InvalidBounds { rule: String, min: u32, max: u32 },
    UnknownEmbeddedGoal { rule: String, goal: String },
}

impl fmt::Display for RuleSetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleSetError::InvalidPattern { pattern, message } => {
                write!(f, "invalid pattern '{pattern}': {message}")
            }
            RuleSetError::ZeroLengthPattern { rule, pattern } => {
                write!(f, "pattern terminal '{rule}' ('{pattern}') can match zero bytes")
            }
            RuleSetError::UnknownRule { referenced, by } => {
                write!(f, "rule '{by}' references unknown rule '{referenced}'")
            }
            RuleSetError::DuplicateRule { name } => write!(f, "duplicate rule '{name}'"),
            RuleSetError::EmptyBody { rule } => write!(f, "rule '{rule}' has no members"),
            RuleSetError::InvalidBounds { rule, min, max } => {
                write!(f, "rule '{rule}' has max {max} below min {min}")
            }
            RuleSetError::UnknownEmbeddedGoal { rule, goal } => {
                write!(f, "embedded rule '{rule}' names unknown goal '{goal}'")
            }
        }
    }
}

impl std::error::Error for RuleSetError {}

/// A validated, immutable grammar table.
#[derive(Debug)]
pub struct RuntimeRuleSet {
    rules: Vec<RuntimeRule>,
    by_name: FxHashMap<String, RuleId>,
    terminals: Vec<RuleId>,
    skip_terminals: Vec<RuleId>,
    nullable: OnceCell<Vec<bool>>,
    first_terminals: OnceCell<Vec<Vec<RuleId>>>,
}

impl RuntimeRuleSet {
    /// Look up a rule by handle. An out-of-range handle is an inconsistency
    /// in the supplied rule set and fails fast.
    pub fn rule(&self, id: RuleId) -> &RuntimeRule {
        &self.rules[id.index()]
    }

    pub fn rule_named(&self, name: &str) -> Option<RuleId> {
        self.by_name.get(name).copied()
    }

    pub fn name(&self, id: RuleId) -> &str {
        &self.rule(id).name
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn empty_rule(&self) -> RuleId {
        EMPTY_RULE
    }

    /// Non-skip terminal rules, in declaration order.
    pub fn terminals(&self) -> &[RuleId] {
        &self.terminals
    }

    /// Skip terminal rules, in declaration order.
    pub fn skip_terminals(&self) -> &[RuleId] {
        &self.skip_terminals
    }

    /// Whether `id` can derive zero bytes of input.
    pub fn is_nullable(&self, id: RuleId) -> bool {
        self.nullable_table()[id.index()]
    }

    /// Terminal rules that can start a derivation of `id`. An embedded rule
    /// stands for itself here; callers expand across the grammar boundary.
    pub fn first_terminals(&self, id: RuleId) -> &[RuleId] {
        &self.first_table()[id.index()]
    }

    fn nullable_table(&self) -> &Vec<bool> {
        self.nullable.get_or_init(|| {
            let mut nullable = vec![false; self.rules.len()];
            loop {
                let mut changed = false;
                for rule in &self.rules {
                    if nullable[rule.id.index()] {
                        continue;
                    }
                    let now = match &rule.kind {
                        RuleKind::Empty => true,
                        RuleKind::Terminal(_) => false,
                        RuleKind::Concatenation { items } => {
                            items.iter().all(|i| nullable[i.index()])
                        }
                        RuleKind::Choice { alternatives } => {
                            alternatives.iter().any(|a| nullable[a.index()])
                        }
                        RuleKind::Multi { item, min, .. } => {
                            *min == 0 || nullable[item.index()]
                        }
                        RuleKind::SeparatedList { item, min, .. } => {
                            *min == 0 || nullable[item.index()]
                        }
                        RuleKind::Embedded { grammar, goal } => grammar.is_nullable(*goal),
                        RuleKind::Goal { .. } => unreachable!("goal wrapper in rule set"),
                    };
                    if now {
                        nullable[rule.id.index()] = true;
                        changed = true;
                    }
                }
                if !changed {
                    return nullable;
                }
            }
        })
    }

    fn first_table(&self) -> &Vec<Vec<RuleId>> {
        self.first_terminals.get_or_init(|| {
            let nullable = self.nullable_table().clone();
            let mut first: Vec<Vec<RuleId>> = vec![Vec::new(); self.rules.len()];
            let mut add = |set: &mut Vec<RuleId>, ids: &[RuleId]| {
                let mut changed = false;
                for id in ids {
                    if !set.contains(id) {
                        set.push(*id);
                        changed = true;
                    }
                }
                changed
            };
            loop {
                let mut changed = false;
                for rule in &self.rules {
                    let mut gathered: Vec<RuleId> = Vec::new();
                    match &rule.kind {
                        RuleKind::Terminal(_) | RuleKind::Empty => gathered.push(rule.id),
                        RuleKind::Concatenation { items } => {
                            for item in items {
                                gathered.extend_from_slice(&first[item.index()]);
                                if !nullable[item.index()] {
                                    break;
                                }
                            }
                        }
                        RuleKind::Choice { alternatives } => {
                            for alt in alternatives {
                                gathered.extend_from_slice(&first[alt.index()]);
                            }
                        }
                        RuleKind::Multi { item, min, .. } => {
                            gathered.extend_from_slice(&first[item.index()]);
                            if *min == 0 {
                                gathered.push(EMPTY_RULE);
                            }
                        }
                        RuleKind::SeparatedList { item, min, .. } => {
                            gathered.extend_from_slice(&first[item.index()]);
                            if *min == 0 {
                                gathered.push(EMPTY_RULE);
                            }
                        }
                        // The boundary node stands for the whole sub-grammar.
                        RuleKind::Embedded { .. } => gathered.push(rule.id),
                        RuleKind::Goal { .. } => unreachable!("goal wrapper in rule set"),
                    }
                    let set = &mut first[rule.id.index()];
                    // Self-extension needs the gathered copy to avoid aliasing.
                    if add(set, &gathered) {
                        changed = true;
                    }
                }
                if !changed {
                    return first;
                }
            }
        })
    }
}

enum ProtoKind {
    Literal(String),
    Pattern(String),
    EndOfText,
    Concatenation(Vec<String>),
    Choice(Vec<String>),
    Multi {
        item: String,
        min: u32,
        max: Option<u32>,
    },
    SeparatedList {
        item: String,
        separator: String,
        min: u32,
        max: Option<u32>,
    },
    Embedded {
        grammar: Arc<RuntimeRuleSet>,
        goal: String,
    },
}

struct Proto {
    name: String,
    kind: ProtoKind,
    priority: u32,
    is_skip: bool,
}

/// Builds a [`RuntimeRuleSet`]; rules reference each other by name and are
/// resolved and validated in [`build`](Self::build).
#[derive(Default)]
pub struct RuntimeRuleSetBuilder {
    protos: Vec<Proto>,
}

impl RuntimeRuleSetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, name: &str, kind: ProtoKind) -> &mut Self {
        self.protos.push(Proto {
            name: name.to_string(),
            kind,
            priority: 0,
            is_skip: false,
        });
        self
    }

    pub fn literal(&mut self, name: &str, text: &str) -> &mut Self {
        self.push(name, ProtoKind::Literal(text.to_string()))
    }

    pub fn pattern(&mut self, name: &str, source: &str) -> &mut Self {
        self.push(name, ProtoKind::Pattern(source.to_string()))
    }

    pub fn end_of_text(&mut self, name: &str) -> &mut Self {
        self.push(name, ProtoKind::EndOfText)
    }

    pub fn skip_literal(&mut self, name: &str, text: &str) -> &mut Self {
        self.literal(name, text);
        self.protos.last_mut().unwrap().is_skip = true;
        self
    }

    pub fn skip_pattern(&mut self, name: &str, source: &str) -> &mut Self {
        self.pattern(name, source);
        self.protos.last_mut().unwrap().is_skip = true;
        self
    }

    pub fn concatenation(&mut self, name: &str, items: &[&str]) -> &mut Self {
        self.push(
            name,
            ProtoKind::Concatenation(items.iter().map(|s| s.to_string()).collect()),
        )
    }

    pub fn choice(&mut self, name: &str, alternatives: &[&str]) -> &mut Self {
        self.push(
            name,
            ProtoKind::Choice(alternatives.iter().map(|s| s.to_string()).collect()),
        )
    }

    pub fn multi(&mut self, name: &str, item: &str, min: u32, max: Option<u32>) -> &mut Self {
        self.push(
            name,
            ProtoKind::Multi {
                item: item.to_string(),
                min,
                max,
            },
        )
    }

    pub fn separated_list(
        &mut self,
        name: &str,
        item: &str,
        separator: &str,
        min: u32,
        max: Option<u32>,
    ) -> &mut Self {
        self.push(
            name,
            ProtoKind::SeparatedList {
                item: item.to_string(),
                separator: separator.to_string(),
                min,
                max,
            },
        )
    }

    pub fn embedded(&mut self, name: &str, grammar: Arc<RuntimeRuleSet>, goal: &str) -> &mut Self {
        self.push(
            name,
            ProtoKind::Embedded {
                grammar,
                goal: goal.to_string(),
            },
        )
    }

    /// Set the disambiguation priority of an already-declared rule.
    pub fn with_priority(&mut self, name: &str, priority: u32) -> &mut Self {
        if let Some(proto) = self.protos.iter_mut().find(|p| p.name == name) {
            proto.priority = priority;
        }
        self
    }

    pub fn build(self) -> Result<RuntimeRuleSet, RuleSetError> {
        let mut by_name = FxHashMap::default();
        by_name.insert("<EMPTY>".to_string(), EMPTY_RULE);
        for (i, proto) in self.protos.iter().enumerate() {
            let id = RuleId(i as u32 + 1);
            if by_name.insert(proto.name.clone(), id).is_some() {
                return Err(RuleSetError::DuplicateRule {
                    name: proto.name.clone(),
                });
            }
        }

        let resolve = |referenced: &str, by: &str| -> Result<RuleId, RuleSetError> {
            by_name
                .get(referenced)
                .copied()
                .ok_or_else(|| RuleSetError::UnknownRule {
                    referenced: referenced.to_string(),
                    by: by.to_string(),
                })
        };

        let mut rules = vec![RuntimeRule {
            id: EMPTY_RULE,
            name: "<EMPTY>".to_string(),
            kind: RuleKind::Empty,
            priority: 0,
            is_skip: false,
        }];

        for (i, proto) in self.protos.into_iter().enumerate() {
            let id = RuleId(i as u32 + 1);
            let name = proto.name;
            let kind = match proto.kind {
                ProtoKind::Literal(text) => RuleKind::Terminal(Matchable::literal(text)),
                ProtoKind::Pattern(source) => {
                    let matchable = Matchable::pattern(&source)?;
                    if matchable.can_match_empty() {
                        return Err(RuleSetError::ZeroLengthPattern {
                            rule: name,
                            pattern: source,
                        });
                    }
                    RuleKind::Terminal(matchable)
                }
                ProtoKind::EndOfText => RuleKind::Terminal(Matchable::EndOfText),
                ProtoKind::Concatenation(items) => {
                    if items.is_empty() {
                        return Err(RuleSetError::EmptyBody { rule: name });
                    }
                    let items = items
                        .iter()
                        .map(|n| resolve(n, &name))
                        .collect::<Result<Vec<_>, _>>()?;
                    RuleKind::Concatenation { items }
                }
                ProtoKind::Choice(alternatives) => {
                    if alternatives.is_empty() {
                        return Err(RuleSetError::EmptyBody { rule: name });
                    }
                    let alternatives = alternatives
                        .iter()
                        .map(|n| resolve(n, &name))
                        .collect::<Result<Vec<_>, _>>()?;
                    RuleKind::Choice { alternatives }
                }
                ProtoKind::Multi { item, min, max } => {
                    if let Some(m) = max {
                        if m < min {
                            return Err(RuleSetError::InvalidBounds {
                                rule: name,
                                min,
                                max: m,
                            });
                        }
                    }
                    RuleKind::Multi {
                        item: resolve(&item, &name)?,
                        min,
                        max,
                    }
                }
                ProtoKind::SeparatedList {
                    item,
                    separator,
                    min,
                    max,
                } => {
                    if let Some(m) = max {
                        if m < min {
                            return Err(RuleSetError::InvalidBounds {
                                rule: name,
                                min,
                                max: m,
                            });
                        }
                    }
                    RuleKind::SeparatedList {
                        item: resolve(&item, &name)?,
                        separator: resolve(&separator, &name)?,
                        min,
                        max,
                    }
                }
                ProtoKind::Embedded { grammar, goal } => {
                    let goal_id = grammar.rule_named(&goal).ok_or_else(|| {
                        RuleSetError::UnknownEmbeddedGoal {
                            rule: name.clone(),
                            goal: goal.clone(),
                        }
                    })?;
                    RuleKind::Embedded {
                        grammar,
                        goal: goal_id,
                    }
                }
            };
            rules.push(RuntimeRule {
                id,
                name,
                kind,
                priority: proto.priority,
                is_skip: proto.is_skip,
            });
        }

        let terminals = rules
            .iter()
            .filter(|r| matches!(r.kind, RuleKind::Terminal(_)) && !r.is_skip)
            .map(|r| r.id)
            .collect();
        let skip_terminals = rules
            .iter()
            .filter(|r| matches!(r.kind, RuleKind::Terminal(_)) && r.is_skip)
            .map(|r| r.id)
            .collect();

        Ok(RuntimeRuleSet {
            rules,
            by_name,
            terminals,
            skip_terminals,
            nullable: OnceCell::new(),
            first_terminals: OnceCell::new(),
        })
    }
}
