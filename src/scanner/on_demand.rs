//! On-demand memoized scanning

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::runtime::{RuleId, RuntimeRuleSet};
use crate::scanner::{match_uncached, Leaf, Scanner};
use crate::sentence::Sentence;

/// Scans a terminal only when the engine asks for it, memoizing the outcome
/// (including misses) per `(terminal, position)`.
pub struct OnDemandScanner {
    sentence: Arc<Sentence>,
    rules: Arc<RuntimeRuleSet>,
    cache: FxHashMap<(RuleId, usize), Option<Leaf>>,
}

impl OnDemandScanner {
    pub fn new(sentence: Arc<Sentence>, rules: Arc<RuntimeRuleSet>) -> Self {
        Self {
            sentence,
            rules,
            cache: FxHashMap::default(),
        }
    }
}

impl Scanner for OnDemandScanner {
    fn is_end(&self, position: usize) -> bool {
        self.sentence.is_end(position)
    }

    fn is_looking_at(&mut self, position: usize, terminal: RuleId) -> bool {
        self.find_or_try_create_leaf(position, terminal).is_some()
    }

    fn find_or_try_create_leaf(&mut self, position: usize, terminal: RuleId) -> Option<Leaf> {
        *self
            .cache
            .entry((terminal, position))
            .or_insert_with(|| match_uncached(&self.sentence, &self.rules, position, terminal))
    }

    fn reset(&mut self) {
        self.cache.clear();
    }
}
