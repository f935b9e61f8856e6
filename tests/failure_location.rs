//! Failure reporting: location accuracy and the partial forest

use std::sync::Arc;

use glr::{ParseError, Parser, Position, RuntimeRuleSetBuilder};

fn abc_parser() -> Parser {
    let mut b = RuntimeRuleSetBuilder::new();
    b.literal("a", "a")
        .literal("b", "b")
        .literal("c", "c")
        .concatenation("S", &["a", "b", "c"]);
    Parser::new(Arc::new(b.build().unwrap()))
}

fn failure_of(parser: &Parser, goal: &str, text: &str) -> glr::ParseFailure {
    match parser.parse(goal, text) {
        Err(ParseError::SentenceNotParsed(failure)) => *failure,
        other => panic!("expected a parse failure, got {other:?}"),
    }
}

#[test]
fn test_truncated_input_fails_past_the_last_match() {
    let failure = failure_of(&abc_parser(), "S", "ab");
    assert_eq!(failure.furthest_position, 2);
    assert_eq!(failure.location, Position::new(1, 3));
}

#[test]
fn test_wrong_terminal_fails_at_the_mismatch() {
    let failure = failure_of(&abc_parser(), "S", "axc");
    assert_eq!(failure.furthest_position, 1);
    assert_eq!(failure.location, Position::new(1, 2));
}

#[test]
fn test_failure_location_counts_lines() {
    let mut b = RuntimeRuleSetBuilder::new();
    b.literal("x", "x")
        .skip_pattern("WS", r"\s+")
        .multi("S", "x", 1, None);
    let parser = Parser::new(Arc::new(b.build().unwrap()));
    let failure = failure_of(&parser, "S", "x\nx\ny");
    assert_eq!(failure.location, Position::new(3, 1));
}

#[test]
fn test_trailing_garbage_fails_with_partial_goal() {
    let failure = failure_of(&abc_parser(), "S", "abcabc");
    // The goal completed over the prefix; the failure keeps it for
    // diagnostics.
    assert_eq!(failure.furthest_position, 3);
    let partial = failure.partial.as_forest().expect("partial goal");
    assert_eq!(partial.count_trees(), 1);
}

#[test]
fn test_failure_is_displayable() {
    let failure = failure_of(&abc_parser(), "S", "ab");
    assert_eq!(failure.to_string(), "parse failed at 1:3 (offset 2)");
}

#[test]
fn test_unknown_goal_rule() {
    let parser = abc_parser();
    assert!(matches!(
        parser.parse("missing", "abc"),
        Err(ParseError::UnknownGoalRule(name)) if name == "missing"
    ));
}

#[test]
fn test_empty_input_against_non_nullable_goal() {
    let failure = failure_of(&abc_parser(), "S", "");
    assert_eq!(failure.furthest_position, 0);
    assert_eq!(failure.location, Position::new(1, 1));
    assert!(failure.partial.as_forest().is_none());
}
