//! Parse-level failure values
//!
//! Scan misses never surface here; they fail a single branch and the engine
//! moves on. What does surface is raised exactly once per parse call, after
//! the worklist is exhausted: either no derivation of the goal spans the
//! whole input, or the caller's request was inconsistent to begin with.

use std::fmt;
use std::sync::Arc;

use crate::forest::{ForestStore, NodeId, ParseForest};
use crate::runtime::RuntimeRuleSet;
use crate::sentence::{Position, Sentence};

/// The forest built before the parse gave up; diagnostics material.
#[derive(Debug, Clone)]
pub struct PartialForest {
    pub(crate) sentence: Arc<Sentence>,
    pub(crate) rules: Arc<RuntimeRuleSet>,
    pub(crate) store: ForestStore,
    /// The longest goal completion reached, if any goal completed at all.
    pub(crate) root: Option<NodeId>,
    pub(crate) max_num_heads: usize,
}

impl PartialForest {
    pub fn store(&self) -> &ForestStore {
        &self.store
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn max_num_heads(&self) -> usize {
        self.max_num_heads
    }

    /// View the partial result as an ordinary forest, when any goal
    /// completion exists to hang it from.
    pub fn as_forest(&self) -> Option<ParseForest> {
        self.root.map(|root| ParseForest {
            sentence: self.sentence.clone(),
            rules: self.rules.clone(),
            store: self.store.clone(),
            root,
            max_num_heads: self.max_num_heads,
        })
    }
}

/// No goal derivation spans the full input.
#[derive(Debug, Clone)]
pub struct ParseFailure {
    /// Furthest byte position any derivation reached; the error location.
    pub furthest_position: usize,
    pub location: Position,
    pub partial: PartialForest,
}

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "parse failed at {} (offset {})",
            self.location, self.furthest_position
        )
    }
}

impl std::error::Error for ParseFailure {}

/// Everything a parse call can fail with.
#[derive(Debug)]
pub enum ParseError {
    /// The sentence has no full-span goal derivation.
    SentenceNotParsed(Box<ParseFailure>),
    /// The named goal rule does not exist in the supplied rule set.
    UnknownGoalRule(String),
    /// The cancellation flag was raised between worklist rounds.
    Cancelled { furthest_position: usize },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::SentenceNotParsed(failure) => failure.fmt(f),
            ParseError::UnknownGoalRule(name) => write!(f, "unknown goal rule '{name}'"),
            ParseError::Cancelled { furthest_position } => {
                write!(f, "parse cancelled at offset {furthest_position}")
            }
        }
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ParseError::SentenceNotParsed(failure) => Some(failure.as_ref()),
            _ => None,
        }
    }
}
