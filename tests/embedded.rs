//! Embedded grammars: nested parses behind explicit boundaries

use std::sync::Arc;

use glr::forest::{BranchEvent, LeafEvent};
use glr::runtime::RuntimeRuleSet;
use glr::{Parser, RuntimeRuleSetBuilder, TreeWalker};

fn number_grammar() -> Arc<RuntimeRuleSet> {
    let mut b = RuntimeRuleSetBuilder::new();
    b.pattern("digits", "[0-9]+")
        .literal("minus", "-")
        .concatenation("negative", &["minus", "digits"])
        .choice("E", &["digits", "negative"]);
    Arc::new(b.build().unwrap())
}

fn host_parser() -> Parser {
    let mut b = RuntimeRuleSetBuilder::new();
    b.literal("open", "(")
        .literal("close", ")")
        .embedded("number", number_grammar(), "E")
        .concatenation("S", &["open", "number", "close"]);
    Parser::new(Arc::new(b.build().unwrap()))
}

#[derive(Default)]
struct Boundaries {
    begins: Vec<String>,
    ends: Vec<String>,
    leaves: Vec<String>,
}

impl TreeWalker for Boundaries {
    fn begin_embedded(&mut self, event: &BranchEvent<'_>) {
        self.begins.push(format!(
            "{} [{}..{}]",
            event.rule, event.start, event.next_input_position
        ));
    }
    fn end_embedded(&mut self, event: &BranchEvent<'_>) {
        self.ends.push(event.rule.to_string());
    }
    fn leaf(&mut self, event: &LeafEvent<'_>) {
        self.leaves.push(format!("{}='{}'", event.rule, event.text));
    }
}

#[test]
fn test_embedded_parse_is_boundary_marked() {
    let parser = host_parser();
    let forest = parser.parse("S", "(42)").unwrap();
    assert_eq!(forest.count_trees(), 1);

    let mut walk = Boundaries::default();
    forest.traverse_depth_first(&mut walk, false);
    assert_eq!(walk.begins, vec!["number [1..3]"]);
    assert_eq!(walk.ends, vec!["number"]);
    // Inner leaves name the embedded grammar's own rules; the host's rule
    // numbering never leaks across the boundary.
    assert_eq!(
        walk.leaves,
        vec!["open='('", "digits='42'", "close=')'"]
    );
}

#[test]
fn test_embedded_sub_grammar_structure() {
    let parser = host_parser();
    let forest = parser.parse("S", "(-7)").unwrap();
    let mut walk = Boundaries::default();
    forest.traverse_depth_first(&mut walk, false);
    assert_eq!(
        walk.leaves,
        vec!["open='('", "minus='-'", "digits='7'", "close=')'"]
    );
}

#[test]
fn test_embedded_mismatch_fails_the_host_parse() {
    let parser = host_parser();
    assert!(parser.parse("S", "(x)").is_err());
    assert!(parser.parse("S", "()").is_err());
}

#[test]
fn test_embedded_prefix_length_is_arbitrated_by_the_host() {
    // The embedded list may stop after any item; only the prefix that lets
    // the host finish survives.
    let mut inner = RuntimeRuleSetBuilder::new();
    inner.literal("x", "x").multi("X", "x", 1, None);
    let inner = Arc::new(inner.build().unwrap());

    let mut b = RuntimeRuleSetBuilder::new();
    b.literal("tail", "xb")
        .embedded("xs", inner, "X")
        .concatenation("S", &["xs", "tail"]);
    let parser = Parser::new(Arc::new(b.build().unwrap()));

    let forest = parser.parse("S", "xxxb").unwrap();
    assert_eq!(forest.count_trees(), 1);
    let mut walk = Boundaries::default();
    forest.traverse_depth_first(&mut walk, false);
    assert_eq!(walk.begins, vec!["xs [0..2]"]);
    assert_eq!(walk.leaves, vec!["x='x'", "x='x'", "tail='xb'"]);
}

#[test]
fn test_tokens_by_line_crosses_the_boundary() {
    let parser = host_parser();
    let forest = parser.parse("S", "(42)").unwrap();
    let tokens = forest.tokens_by_line(1);
    let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
    assert_eq!(texts, vec!["(", "42", ")"]);
}
