//! Terminal matchers: literals, anchored regex patterns, end-of-text
//!
//! A [`Matchable`] answers exactly two questions at a byte position: "could
//! this terminal start here" and "how many bytes does it cover". Patterns are
//! compiled once, anchored, at rule-set build time; the scanner never sees a
//! regex compile error at parse time.

use regex::Regex;

use crate::runtime::ruleset::RuleSetError;

/// How a terminal rule recognises text.
#[derive(Debug, Clone)]
pub enum Matchable {
    /// An exact byte sequence.
    Literal(String),
    /// An anchored regular expression; `source` is the user-supplied pattern.
    Pattern { source: String, regex: Regex },
    /// Matches zero bytes, only at the end of the input.
    EndOfText,
}

impl Matchable {
    pub fn literal(text: impl Into<String>) -> Self {
        Matchable::Literal(text.into())
    }

    /// Compile an anchored pattern matcher.
    pub fn pattern(source: impl Into<String>) -> Result<Self, RuleSetError> {
        let source = source.into();
        let regex = Regex::new(&format!(r"\A(?:{source})"))
            .map_err(|e| RuleSetError::InvalidPattern {
                pattern: source.clone(),
                message: e.to_string(),
            })?;
        Ok(Matchable::Pattern { source, regex })
    }

    /// Probe whether this terminal could be scanned at `position`.
    pub fn is_looking_at(&self, text: &str, position: usize) -> bool {
        self.matched_length(text, position).is_some()
    }

    /// Number of bytes matched at `position`, or `None` on a scan miss.
    pub fn matched_length(&self, text: &str, position: usize) -> Option<usize> {
        if position > text.len() {
            return None;
        }
        match self {
            Matchable::Literal(lit) => text[position..].starts_with(lit.as_str()).then(|| lit.len()),
            Matchable::Pattern { regex, .. } => regex.find(&text[position..]).map(|m| m.end()),
            Matchable::EndOfText => (position == text.len()).then_some(0),
        }
    }

    /// Whether the matcher can succeed on zero bytes of ordinary text.
    /// Such patterns are rejected at build time; only the distinguished empty
    /// rule and end-of-text may produce zero-length leaves.
    pub fn can_match_empty(&self) -> bool {
        match self {
            Matchable::Literal(lit) => lit.is_empty(),
            Matchable::Pattern { regex, .. } => regex.find("").is_some(),
            Matchable::EndOfText => false,
        }
    }

    /// Literal matches outrank pattern matches of the same length.
    pub fn is_literal(&self) -> bool {
        matches!(self, Matchable::Literal(_))
    }
}

impl PartialEq for Matchable {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Matchable::Literal(a), Matchable::Literal(b)) => a == b,
            (Matchable::Pattern { source: a, .. }, Matchable::Pattern { source: b, .. }) => a == b,
            (Matchable::EndOfText, Matchable::EndOfText) => true,
            _ => false,
        }
    }
}

impl Eq for Matchable {}
