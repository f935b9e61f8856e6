//! Packing keeps exponential ambiguity polynomial
//!
//! `S = S S S | S S | 'a'` has derivation counts that explode with input
//! length; the completed-node identities must not. Node identity is the
//! `(rule, start, length)` span, so the store grows at worst quadratically
//! here no matter how many derivations share those spans.

use std::sync::Arc;

use proptest::prelude::*;

use glr::{Parser, RuntimeRuleSetBuilder};

fn super_ambiguous_parser() -> Parser {
    let mut b = RuntimeRuleSetBuilder::new();
    b.literal("a", "a")
        .choice("S", &["SSS", "SS", "a"])
        .concatenation("SS", &["S", "S"])
        .concatenation("SSS", &["S", "S", "S"]);
    Parser::new(Arc::new(b.build().unwrap()))
}

#[test]
fn test_node_count_grows_polynomially() {
    let parser = super_ambiguous_parser();
    let mut previous_trees = 0usize;
    for n in 1..=10 {
        let text = "a".repeat(n);
        let forest = parser.parse("S", &text).unwrap();
        let nodes = forest.store().len();
        // Spans per rule are at most n * (n + 1) / 2; four span families
        // (leaves, S, SS, SSS) plus the goal wrapper stay under 3 n² + n.
        assert!(
            nodes <= 3 * n * n + n + 1,
            "n = {n}: {nodes} nodes exceeds the packing bound"
        );
        let trees = forest.count_trees();
        assert!(
            trees >= previous_trees,
            "derivation count must not shrink with longer input"
        );
        previous_trees = trees;
    }
    // Meanwhile the raw derivation count has exploded.
    assert!(previous_trees > 10_000);
}

#[test]
fn test_every_span_is_one_shared_object() {
    let parser = super_ambiguous_parser();
    let forest = parser.parse("S", "aaaa").unwrap();
    let store = forest.store();
    // Probing the index by identity: each (rule, start, length) that was
    // completed resolves to exactly the node the index already holds.
    let s = parser.rules().rule_named("S").unwrap();
    for start in 0..4 {
        for length in 1..=(4 - start) {
            if let Some(id) = store.find_complete_node(s, start, length) {
                assert_eq!(store.find_complete_node(s, start, length), Some(id));
            }
        }
    }
    assert!(store.find_complete_node(s, 0, 4).is_some());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// The packing bound holds for arbitrary lengths, not just the sampled
    /// ones.
    #[test]
    fn prop_packing_bound(n in 1usize..14) {
        let parser = super_ambiguous_parser();
        let forest = parser.parse("S", &"a".repeat(n)).unwrap();
        prop_assert!(forest.store().len() <= 3 * n * n + n + 1);
    }
}
