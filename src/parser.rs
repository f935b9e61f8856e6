//! The public parsing API
//!
//! A [`Parser`] owns a rule set and a strategy choice; each `parse` call
//! runs with fresh per-call state (scanner cache, stack arenas, forest
//! store), so one parser instance may be reused across sentences but a
//! single call is never shared. Whatever the call produces, forest or
//! failure, carries everything downstream consumers need; nothing is
//! reported through side channels.

use std::collections::BTreeSet;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::forest::ParseForest;
use crate::runtime::RuntimeRuleSet;
use crate::scanner::ScannerKind;
use crate::sentence::Sentence;

pub(crate) mod engine;
pub mod error;
pub(crate) mod gss;

pub use error::{ParseError, ParseFailure, PartialForest};

use engine::Engine;

/// Per-parser configuration; deserializable so applications can layer it
/// from their own configuration files.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    pub scanner: ScannerKind,
    /// Raise to abort between worklist rounds; checked once per round so
    /// the stack arenas are never observed half-merged.
    #[serde(skip)]
    pub cancellation: Option<Arc<AtomicBool>>,
}

/// A reusable parser over one rule set.
pub struct Parser {
    rules: Arc<RuntimeRuleSet>,
    options: ParseOptions,
}

impl Parser {
    pub fn new(rules: Arc<RuntimeRuleSet>) -> Self {
        Self::with_options(rules, ParseOptions::default())
    }

    pub fn with_options(rules: Arc<RuntimeRuleSet>, options: ParseOptions) -> Self {
        Self { rules, options }
    }

    pub fn rules(&self) -> &Arc<RuntimeRuleSet> {
        &self.rules
    }

    /// Parse `text` against the named goal rule, producing the packed
    /// forest of every derivation, or a failure locating how far any
    /// derivation got.
    pub fn parse(&self, goal: &str, text: &str) -> Result<ParseForest, ParseError> {
        let user_goal = self
            .rules
            .rule_named(goal)
            .ok_or_else(|| ParseError::UnknownGoalRule(goal.to_string()))?;
        let sentence = Arc::new(Sentence::new(text));
        let engine = Engine::new(
            self.rules.clone(),
            sentence.clone(),
            self.options.clone(),
            user_goal,
            0,
            false,
            None,
        );
        let outcome = engine.run();
        if outcome.cancelled {
            return Err(ParseError::Cancelled {
                furthest_position: outcome.furthest,
            });
        }
        // The longest goal completion wins; it must cover the whole
        // sentence for the parse to stand.
        let best = outcome
            .goal_candidates
            .iter()
            .copied()
            .max_by_key(|&c| outcome.store.node(c).next_input_position);
        let root =
            best.filter(|&c| outcome.store.node(c).next_input_position == sentence.len());
        match root {
            Some(root) => Ok(ParseForest {
                sentence,
                rules: self.rules.clone(),
                store: outcome.store,
                root,
                max_num_heads: outcome.max_heads,
            }),
            None => {
                let location = sentence.location_of(outcome.furthest);
                Err(ParseError::SentenceNotParsed(Box::new(ParseFailure {
                    furthest_position: outcome.furthest,
                    location,
                    partial: PartialForest {
                        sentence,
                        rules: self.rules.clone(),
                        store: outcome.store,
                        root: best,
                        max_num_heads: outcome.max_heads,
                    },
                })))
            }
        }
    }

    /// Run the lookahead machinery at `position` without requiring a full
    /// parse: the names of every terminal some derivation of the goal could
    /// accept there. Editor-completion support.
    pub fn expected_terminals_at(
        &self,
        text: &str,
        position: usize,
        goal: &str,
    ) -> Result<BTreeSet<String>, ParseError> {
        let user_goal = self
            .rules
            .rule_named(goal)
            .ok_or_else(|| ParseError::UnknownGoalRule(goal.to_string()))?;
        let sentence = Arc::new(Sentence::new(text));
        let engine = Engine::new(
            self.rules.clone(),
            sentence,
            self.options.clone(),
            user_goal,
            0,
            false,
            Some(position),
        );
        let outcome = engine.run();
        if outcome.cancelled {
            return Err(ParseError::Cancelled {
                furthest_position: outcome.furthest,
            });
        }
        Ok(outcome.expected)
    }
}
