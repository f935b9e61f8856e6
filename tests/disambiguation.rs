//! The disambiguation policy, observed end to end
//!
//! Priority is a deterministic override: the winning children list replaces
//! the losing one and no ambiguity is recorded. Equal priorities accumulate.
//! At equal priority a substantial derivation beats the bare-empty one,
//! transitively across re-merges.

use std::sync::Arc;

use glr::forest::BranchEvent;
use glr::{Parser, RuntimeRuleSetBuilder, TreeWalker};

#[derive(Default)]
struct MaxAlternatives(usize);

impl TreeWalker for MaxAlternatives {
    fn begin_branch(&mut self, event: &BranchEvent<'_>) {
        self.0 = self.0.max(event.alternative_count);
    }
}

#[test]
fn test_priority_selects_the_single_derivation() {
    // S = 'a' | S1 ; S1 = 'a' S must right-nest over "aaa".
    let mut b = RuntimeRuleSetBuilder::new();
    b.literal("a", "a")
        .choice("S", &["a", "S1"])
        .concatenation("S1", &["a", "S"]);
    let parser = Parser::new(Arc::new(b.build().unwrap()));
    let forest = parser.parse("S", "aaa").unwrap();
    assert_eq!(forest.count_trees(), 1);

    let rendered = forest.treeviz();
    // Right-nested: S1 under S1 under S, with the lone 'a' at depth three.
    assert_eq!(rendered.matches("§ S1").count(), 2);
    assert_eq!(rendered.matches("'a'").count(), 3);
}

#[test]
fn test_earlier_choice_alternative_overrides_later() {
    // Both alternatives cover "ab"; the literal is declared first and wins.
    let mut b = RuntimeRuleSetBuilder::new();
    b.literal("ab", "ab")
        .literal("a", "a")
        .literal("b", "b")
        .concatenation("AB", &["a", "b"])
        .choice("S", &["ab", "AB"]);
    let parser = Parser::new(Arc::new(b.build().unwrap()));
    let forest = parser.parse("S", "ab").unwrap();
    assert_eq!(forest.count_trees(), 1);

    let mut walk = MaxAlternatives::default();
    forest.traverse_depth_first(&mut walk, false);
    assert_eq!(walk.0, 1, "priority override must not record ambiguity");
    // The surviving derivation is the literal one.
    assert!(forest.treeviz().contains("'ab'"));
}

#[test]
fn test_rule_priority_breaks_same_span_ties() {
    // Two distinct nonterminal routes to the same span; the prioritized
    // choice alternative replaces the other.
    let mut b = RuntimeRuleSetBuilder::new();
    b.literal("a", "a")
        .multi("many", "a", 1, None)
        .concatenation("pair", &["a", "a"])
        .choice("S", &["many", "pair"]);
    let parser = Parser::new(Arc::new(b.build().unwrap()));
    let forest = parser.parse("S", "aa").unwrap();
    // "aa" derives through both alternatives, but S keeps only the earlier.
    assert_eq!(forest.count_trees(), 1);
    assert!(forest.treeviz().contains("§ many"));
    assert!(!forest.treeviz().contains("§ pair"));
}

#[test]
fn test_substantial_beats_bare_empty_at_a_zero_span() {
    // xs matches zero 'x' two ways at offset 0: by choosing zero
    // repetitions (bare empty) and through the nullable opt rule. The
    // substantial derivation must win the span.
    let mut b = RuntimeRuleSetBuilder::new();
    b.literal("x", "x")
        .literal("y", "y")
        .multi("opt", "x", 0, Some(1))
        .multi("xs", "opt", 0, None)
        .concatenation("S", &["xs", "y"]);
    let parser = Parser::new(Arc::new(b.build().unwrap()));
    let forest = parser.parse("S", "y").unwrap();
    assert_eq!(forest.count_trees(), 1);

    let mut walk = MaxAlternatives::default();
    forest.traverse_depth_first(&mut walk, false);
    assert_eq!(walk.0, 1, "empty-versus-substantial is not ambiguity");
}

#[test]
fn test_equal_priority_alternatives_are_both_kept() {
    let mut b = RuntimeRuleSetBuilder::new();
    b.literal("a", "a")
        .choice("S", &["SS", "a"])
        .concatenation("SS", &["S", "S"]);
    let parser = Parser::new(Arc::new(b.build().unwrap()));
    let forest = parser.parse("S", "aaa").unwrap();

    let mut walk = MaxAlternatives::default();
    forest.traverse_depth_first(&mut walk, false);
    assert_eq!(walk.0, 2, "true ambiguity must be preserved");
}
