//! Runtime rule representation
//!
//! Grammar is data, not code: a compiled grammar arrives as a table of
//! [`RuntimeRule`]s whose [`RuleKind`] is a closed tagged union. The cursor
//! arithmetic that drives derivation growth lives here, next to the kinds, so
//! every kind is handled exhaustively in one place: what child rules a
//! derivation expects at a given cursor, and which cursor values are reachable
//! after one more child.

use std::sync::Arc;

use serde::Serialize;

use crate::runtime::matchable::Matchable;
use crate::runtime::ruleset::RuntimeRuleSet;

/// Numeric rule identity within one rule set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RuleId(pub u32);

impl RuleId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// The distinguished empty rule; present in every rule set at index 0.
pub const EMPTY_RULE: RuleId = RuleId(0);

/// Cursor sentinel: the derivation has all mandatory children.
pub const COMPLETE: i32 = -1;

/// One rule of a compiled grammar.
#[derive(Debug, Clone)]
pub struct RuntimeRule {
    pub id: RuleId,
    pub name: String,
    pub kind: RuleKind,
    /// Disambiguation weight; higher wins at the same span.
    pub priority: u32,
    /// Skip rules (whitespace, comments) are matched and retained but
    /// excluded from the non-skip child view.
    pub is_skip: bool,
}

impl RuntimeRule {
    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, RuleKind::Terminal(_) | RuleKind::Empty)
    }
}

/// The closed set of rule kinds the engine understands.
#[derive(Debug, Clone)]
pub enum RuleKind {
    /// A leaf matcher over the input text.
    Terminal(Matchable),
    /// Always matches zero bytes; the kind of [`EMPTY_RULE`].
    Empty,
    /// All items, in order.
    Concatenation { items: Vec<RuleId> },
    /// Exactly one of the alternatives. Earlier alternatives carry higher
    /// completion priority.
    Choice { alternatives: Vec<RuleId> },
    /// `item` repeated between `min` and `max` times; `None` is unbounded.
    Multi {
        item: RuleId,
        min: u32,
        max: Option<u32>,
    },
    /// Items interleaved with separators: `item (separator item)*`.
    SeparatedList {
        item: RuleId,
        separator: RuleId,
        min: u32,
        max: Option<u32>,
    },
    /// A complete sub-grammar parsed as one opaque child; the sub-forest is
    /// kept behind an explicit boundary and its rule numbers never mix with
    /// the host's.
    Embedded {
        grammar: Arc<RuntimeRuleSet>,
        goal: RuleId,
    },
    /// Internal wrapper created per parse call around the designated goal
    /// rule, so that leading skip text has a parent to live in.
    Goal { item: RuleId },
}

impl RuleKind {
    /// Child rules a derivation at cursor `index` with `count` non-skip
    /// children may take next. `index` is never [`COMPLETE`] here, and
    /// terminal-like kinds never become growing derivations.
    pub fn expected_items(&self, index: i32, count: u32) -> Vec<RuleId> {
        match self {
            RuleKind::Concatenation { items } => vec![items[index as usize]],
            RuleKind::Choice { alternatives } => alternatives.clone(),
            RuleKind::Multi { item, min, .. } => {
                let mut expected = vec![*item];
                if count == 0 && *min == 0 {
                    expected.push(EMPTY_RULE);
                }
                expected
            }
            RuleKind::SeparatedList {
                item,
                separator,
                min,
                ..
            } => {
                if index == 0 {
                    let mut expected = vec![*item];
                    if count == 0 && *min == 0 {
                        expected.push(EMPTY_RULE);
                    }
                    expected
                } else {
                    vec![*separator]
                }
            }
            RuleKind::Goal { item } => vec![*item],
            RuleKind::Terminal(_) | RuleKind::Empty | RuleKind::Embedded { .. } => {
                unreachable!("kind has no expected items")
            }
        }
    }

    /// Cursor values reachable after appending one more non-skip child.
    /// `new_count` includes the appended child; `via_empty` marks the child
    /// as the distinguished empty leaf (zero repetitions chosen).
    ///
    /// `Multi` and `SeparatedList` may return two cursors at once: the
    /// derivation forks into a completed state and a continuing one.
    pub fn next_indexes(&self, index: i32, new_count: u32, via_empty: bool) -> Vec<i32> {
        match self {
            RuleKind::Concatenation { items } => {
                let next = index + 1;
                if next as usize == items.len() {
                    vec![COMPLETE]
                } else {
                    vec![next]
                }
            }
            RuleKind::Choice { .. } | RuleKind::Goal { .. } => vec![COMPLETE],
            RuleKind::Multi { min, max, .. } => {
                if via_empty {
                    return vec![COMPLETE];
                }
                let mut next = Vec::with_capacity(2);
                if new_count >= *min {
                    next.push(COMPLETE);
                }
                if max.map_or(true, |m| new_count < m) {
                    next.push(0);
                }
                next
            }
            RuleKind::SeparatedList { min, max, .. } => {
                if via_empty {
                    return vec![COMPLETE];
                }
                if index == 0 {
                    // An item was appended; children alternate item/separator.
                    let items_so_far = (new_count + 1) / 2;
                    let mut next = Vec::with_capacity(2);
                    if items_so_far >= *min {
                        next.push(COMPLETE);
                    }
                    if max.map_or(true, |m| items_so_far < m) {
                        next.push(1);
                    }
                    next
                } else {
                    vec![0]
                }
            }
            RuleKind::Terminal(_) | RuleKind::Empty | RuleKind::Embedded { .. } => {
                unreachable!("kind has no cursor")
            }
        }
    }

    /// Position of `child` among a choice's alternatives.
    pub fn alternative_index_of(&self, child: RuleId) -> Option<usize> {
        match self {
            RuleKind::Choice { alternatives } => alternatives.iter().position(|&a| a == child),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn concat(n: usize) -> RuleKind {
        RuleKind::Concatenation {
            items: (1..=n as u32).map(RuleId).collect(),
        }
    }

    #[test]
    fn test_concatenation_cursor() {
        let k = concat(3);
        assert_eq!(k.expected_items(0, 0), vec![RuleId(1)]);
        assert_eq!(k.expected_items(2, 2), vec![RuleId(3)]);
        assert_eq!(k.next_indexes(0, 1, false), vec![1]);
        assert_eq!(k.next_indexes(2, 3, false), vec![COMPLETE]);
    }

    #[test]
    fn test_choice_completes_after_one_child() {
        let k = RuleKind::Choice {
            alternatives: vec![RuleId(1), RuleId(2)],
        };
        assert_eq!(k.expected_items(0, 0), vec![RuleId(1), RuleId(2)]);
        assert_eq!(k.next_indexes(0, 1, false), vec![COMPLETE]);
        assert_eq!(k.alternative_index_of(RuleId(2)), Some(1));
    }

    #[test]
    fn test_multi_forks_between_min_and_max() {
        let k = RuleKind::Multi {
            item: RuleId(1),
            min: 1,
            max: Some(3),
        };
        assert_eq!(k.next_indexes(0, 1, false), vec![COMPLETE, 0]);
        assert_eq!(k.next_indexes(0, 2, false), vec![COMPLETE, 0]);
        // At max: must complete.
        assert_eq!(k.next_indexes(0, 3, false), vec![COMPLETE]);
    }

    #[test]
    fn test_multi_zero_min_offers_empty() {
        let k = RuleKind::Multi {
            item: RuleId(1),
            min: 0,
            max: None,
        };
        assert_eq!(k.expected_items(0, 0), vec![RuleId(1), EMPTY_RULE]);
        assert_eq!(k.expected_items(0, 2), vec![RuleId(1)]);
        assert_eq!(k.next_indexes(0, 1, true), vec![COMPLETE]);
    }

    #[test]
    fn test_separated_list_alternates() {
        let k = RuleKind::SeparatedList {
            item: RuleId(1),
            separator: RuleId(2),
            min: 1,
            max: None,
        };
        assert_eq!(k.expected_items(0, 0), vec![RuleId(1)]);
        assert_eq!(k.expected_items(1, 1), vec![RuleId(2)]);
        // After the first item: complete or take a separator.
        assert_eq!(k.next_indexes(0, 1, false), vec![COMPLETE, 1]);
        // After a separator: an item is mandatory.
        assert_eq!(k.next_indexes(1, 2, false), vec![0]);
        // After the second item.
        assert_eq!(k.next_indexes(0, 3, false), vec![COMPLETE, 1]);
    }
}
