//! Classical eager longest-match scanning

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::runtime::{RuleId, RuleKind, RuntimeRuleSet, EMPTY_RULE};
use crate::scanner::{match_uncached, Leaf, Scanner};
use crate::sentence::Sentence;

/// Tokenizes the way a hand-written lexer would: at each position compute the
/// single longest match across all non-skip terminals and cache that one
/// leaf. Ties break literal-over-pattern, then longest text.
///
/// A terminal that matches but is not the position's winner is a miss; the
/// strategy trades generality for cache density and suits lexically
/// unambiguous grammars.
pub struct ClassicalScanner {
    sentence: Arc<Sentence>,
    rules: Arc<RuntimeRuleSet>,
    /// Winner per position among non-skip terminals.
    by_position: FxHashMap<usize, Option<Leaf>>,
    /// Skip terminals bypass the longest-match contest.
    skip_cache: FxHashMap<(RuleId, usize), Option<Leaf>>,
}

impl ClassicalScanner {
    pub fn new(sentence: Arc<Sentence>, rules: Arc<RuntimeRuleSet>) -> Self {
        Self {
            sentence,
            rules,
            by_position: FxHashMap::default(),
            skip_cache: FxHashMap::default(),
        }
    }

    fn best_at(&mut self, position: usize) -> Option<Leaf> {
        if let Some(cached) = self.by_position.get(&position) {
            return *cached;
        }
        let mut best: Option<Leaf> = None;
        for &terminal in self.rules.terminals() {
            let Some(leaf) = match_uncached(&self.sentence, &self.rules, position, terminal)
            else {
                continue;
            };
            let better = match best {
                None => true,
                Some(current) => {
                    let (new_len, cur_len) = (leaf.len(), current.len());
                    new_len > cur_len
                        || (new_len == cur_len
                            && is_literal(&self.rules, leaf.rule)
                            && !is_literal(&self.rules, current.rule))
                }
            };
            if better {
                best = Some(leaf);
            }
        }
        self.by_position.insert(position, best);
        best
    }
}

fn is_literal(rules: &RuntimeRuleSet, id: RuleId) -> bool {
    match &rules.rule(id).kind {
        RuleKind::Terminal(matchable) => matchable.is_literal(),
        _ => false,
    }
}

impl Scanner for ClassicalScanner {
    fn is_end(&self, position: usize) -> bool {
        self.sentence.is_end(position)
    }

    fn is_looking_at(&mut self, position: usize, terminal: RuleId) -> bool {
        self.find_or_try_create_leaf(position, terminal).is_some()
    }

    fn find_or_try_create_leaf(&mut self, position: usize, terminal: RuleId) -> Option<Leaf> {
        if terminal == EMPTY_RULE || self.rules.rule(terminal).is_skip {
            return *self
                .skip_cache
                .entry((terminal, position))
                .or_insert_with(|| {
                    match_uncached(&self.sentence, &self.rules, position, terminal)
                });
        }
        self.best_at(position).filter(|leaf| leaf.rule == terminal)
    }

    fn reset(&mut self) {
        self.by_position.clear();
        self.skip_cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::RuntimeRuleSetBuilder;

    fn scanner_for(text: &str) -> (ClassicalScanner, Arc<RuntimeRuleSet>) {
        let mut b = RuntimeRuleSetBuilder::new();
        b.literal("class", "class")
            .pattern("ident", "[a-zA-Z]+")
            .pattern("int", "[0-9]+")
            .skip_pattern("WS", r"\s+");
        let rules = Arc::new(b.build().unwrap());
        (
            ClassicalScanner::new(Arc::new(Sentence::new(text)), rules.clone()),
            rules,
        )
    }

    #[test]
    fn test_literal_beats_pattern_at_equal_length() {
        let (mut s, rules) = scanner_for("class");
        let kw = rules.rule_named("class").unwrap();
        let ident = rules.rule_named("ident").unwrap();
        let leaf = s.find_or_try_create_leaf(0, kw).unwrap();
        assert_eq!(leaf.rule, kw);
        // The pattern lost the position, so asking for it is a miss.
        assert!(s.find_or_try_create_leaf(0, ident).is_none());
    }

    #[test]
    fn test_longest_wins_across_kinds() {
        let (mut s, rules) = scanner_for("classes");
        let kw = rules.rule_named("class").unwrap();
        let ident = rules.rule_named("ident").unwrap();
        // "classes" as an identifier outlasts the "class" literal.
        let leaf = s.find_or_try_create_leaf(0, ident).unwrap();
        assert_eq!(leaf.next_input_position, 7);
        assert!(s.find_or_try_create_leaf(0, kw).is_none());
    }

    #[test]
    fn test_skip_terminal_bypasses_the_contest() {
        let (mut s, rules) = scanner_for("  12");
        let ws = rules.rule_named("WS").unwrap();
        let int = rules.rule_named("int").unwrap();
        assert_eq!(s.find_or_try_create_leaf(0, ws).unwrap().len(), 2);
        assert_eq!(s.find_or_try_create_leaf(2, int).unwrap().len(), 2);
    }

    #[test]
    fn test_no_match_position() {
        let (mut s, rules) = scanner_for("!");
        assert!(s
            .find_or_try_create_leaf(0, rules.rule_named("int").unwrap())
            .is_none());
    }
}
