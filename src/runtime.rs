//! Runtime grammar representation: rules, matchers, rule sets.

pub mod matchable;
pub mod rule;
pub mod ruleset;

pub use matchable::Matchable;
pub use rule::{RuleId, RuleKind, RuntimeRule, COMPLETE, EMPTY_RULE};
pub use ruleset::{RuleSetError, RuntimeRuleSet, RuntimeRuleSetBuilder};
