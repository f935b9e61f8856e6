//! Terminal scanning: producing and caching leaves at text positions
//!
//! The engine never touches a [`Matchable`](crate::runtime::Matchable)
//! directly; it asks a [`Scanner`] for a leaf at a position and the scanner
//! decides how much work that costs. Two interchangeable strategies exist:
//!
//! - [`OnDemandScanner`] memoizes per `(terminal, position)` and only ever
//!   scans the terminals the engine's lookahead actually requests, with no wasted
//!   work on grammars with many terminals.
//! - [`ClassicalScanner`] eagerly computes one longest match per position
//!   across all non-skip terminals, the way an ordinary tokenizer would,
//!   suited to lexically unambiguous grammars probed repeatedly at the same
//!   offsets.
//!
//! Both agree bit-for-bit on definite lookups. A scan miss is not an error,
//! it just fails the branch that asked.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::runtime::{RuleId, RuntimeRuleSet, EMPTY_RULE};
use crate::sentence::Sentence;

pub mod classical;
pub mod on_demand;

pub use classical::ClassicalScanner;
pub use on_demand::OnDemandScanner;

/// A matched terminal span. The simplest node of the forest:
/// `(terminalRule, startPosition, nextInputPosition)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Leaf {
    pub rule: RuleId,
    pub start: usize,
    pub next_input_position: usize,
    pub is_skip: bool,
}

impl Leaf {
    pub fn len(&self) -> usize {
        self.next_input_position - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.next_input_position == self.start
    }
}

/// The scanning contract the engine parses against.
pub trait Scanner {
    /// True once `position` is at or past the end of the sentence.
    fn is_end(&self, position: usize) -> bool;

    /// Look-ahead probe: could `terminal` be scanned at `position`?
    fn is_looking_at(&mut self, position: usize, terminal: RuleId) -> bool;

    /// Produce (or recall) the leaf for `terminal` at `position`;
    /// `None` is a scan miss.
    fn find_or_try_create_leaf(&mut self, position: usize, terminal: RuleId) -> Option<Leaf>;

    /// Drop all cached leaves; required before reusing a scanner for a
    /// different parse of the same sentence.
    fn reset(&mut self);
}

/// Which scanning strategy a parser instance uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScannerKind {
    #[default]
    OnDemand,
    Classical,
}

impl ScannerKind {
    pub fn scanner(
        self,
        sentence: Arc<Sentence>,
        rules: Arc<RuntimeRuleSet>,
    ) -> Box<dyn Scanner> {
        match self {
            ScannerKind::OnDemand => Box::new(OnDemandScanner::new(sentence, rules)),
            ScannerKind::Classical => Box::new(ClassicalScanner::new(sentence, rules)),
        }
    }
}

/// Match `terminal` directly against the text, bypassing any cache.
///
/// The distinguished empty rule always matches zero-length without consulting
/// a matcher. Requesting a scan for a non-terminal rule means the supplied
/// rule set is inconsistent; that fails fast rather than failing the branch.
pub(crate) fn match_uncached(
    sentence: &Sentence,
    rules: &RuntimeRuleSet,
    position: usize,
    terminal: RuleId,
) -> Option<Leaf> {
    if terminal == EMPTY_RULE {
        return Some(Leaf {
            rule: terminal,
            start: position,
            next_input_position: position,
            is_skip: false,
        });
    }
    let rule = rules.rule(terminal);
    match &rule.kind {
        crate::runtime::RuleKind::Terminal(matchable) => matchable
            .matched_length(sentence.text(), position)
            .map(|len| Leaf {
                rule: terminal,
                start: position,
                next_input_position: position + len,
                is_skip: rule.is_skip,
            }),
        _ => panic!("scan requested for non-terminal rule '{}'", rule.name),
    }
}
