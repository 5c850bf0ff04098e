//! Concept group matching.
//!
//! Compiles a `ConceptGroup` into a matcher for its `MatchMode`:
//! - `Contains`: literal substring search
//! - `WholeWord`: the variation bounded by `\b` on both sides, with regex
//!   metacharacters in the variation escaped

use assortcheck_model::{AnalysisError, ConceptGroup, MatchMode};
use regex::Regex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MatchError {
    #[error("Group {index} has no variations")]
    EmptyGroup { index: usize },
    #[error("Group {index} variation '{variation}' is not a valid pattern: {message}")]
    Pattern {
        index: usize,
        variation: String,
        message: String,
    },
}

impl From<MatchError> for AnalysisError {
    fn from(err: MatchError) -> Self {
        match err {
            MatchError::EmptyGroup { index } => AnalysisError::InvalidGroup { index },
            MatchError::Pattern { index, message, .. } => {
                AnalysisError::InvalidPattern { index, message }
            }
        }
    }
}

#[derive(Debug, Clone)]
enum Strategy {
    Contains(Vec<String>),
    WholeWord(Vec<Regex>),
}

/// A concept group prepared for repeated matching.
///
/// Compile once per run and reuse it for every product.
#[derive(Debug, Clone)]
pub struct GroupMatcher {
    index: usize,
    strategy: Strategy,
}

impl GroupMatcher {
    /// Compile the group at position `index` of the request.
    ///
    /// Blank variations are skipped; a group with nothing else is empty.
    pub fn compile(index: usize, group: &ConceptGroup) -> Result<Self, MatchError> {
        let variations: Vec<&String> = group
            .variations
            .iter()
            .filter(|v| !v.trim().is_empty())
            .collect();
        if variations.is_empty() {
            return Err(MatchError::EmptyGroup { index });
        }

        let strategy = match group.match_mode {
            MatchMode::Contains => {
                Strategy::Contains(variations.into_iter().cloned().collect())
            }
            MatchMode::WholeWord => Strategy::WholeWord(
                variations
                    .into_iter()
                    .map(|variation| whole_word_pattern(index, variation))
                    .collect::<Result<_, _>>()?,
            ),
        };

        Ok(Self { index, strategy })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// True if any variation matches `text`; stops at the first hit.
    pub fn is_match(&self, text: &str) -> bool {
        match &self.strategy {
            Strategy::Contains(variations) => variations.iter().any(|v| text.contains(v.as_str())),
            Strategy::WholeWord(patterns) => patterns.iter().any(|re| re.is_match(text)),
        }
    }
}

fn whole_word_pattern(index: usize, variation: &str) -> Result<Regex, MatchError> {
    let pattern = format!(r"\b{}\b", regex::escape(variation));
    Regex::new(&pattern).map_err(|e| MatchError::Pattern {
        index,
        variation: variation.to_string(),
        message: e.to_string(),
    })
}

/// Compile every group of a request, keeping index correspondence.
pub fn compile_groups(groups: &[ConceptGroup]) -> Result<Vec<GroupMatcher>, MatchError> {
    groups
        .iter()
        .enumerate()
        .map(|(index, group)| GroupMatcher::compile(index, group))
        .collect()
}

/// One-shot match of a single group against already normalized text.
pub fn matches(normalized_text: &str, group: &ConceptGroup) -> Result<bool, MatchError> {
    Ok(GroupMatcher::compile(0, group)?.is_match(normalized_text))
}
