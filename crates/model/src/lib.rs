//! Core domain model for assortment relevance checks.
//!
//! This crate defines the fundamental types used throughout the system:
//! - `ConceptGroup`: A set of equivalent variations plus its `MatchMode`
//! - `AnalysisRequest`: Shop, environment, keyword and groups for one run
//! - `Product`: An opaque product record as returned by the search API
//! - `ClassificationVerdict` / `AnalysisResult`: The output of a run
//! - `AnalysisError`: Failures surfaced to the presentation layer

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Default number of search results to analyze.
pub const DEFAULT_RESULT_SIZE: u32 = 500;

/// Largest result size the search API accepts.
pub const MAX_RESULT_SIZE: u32 = 1000;

/// Placeholder used when a product field is absent.
pub const MISSING_FIELD: &str = "N/A";

/// Errors produced while validating or running an analysis.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Check group {} has no usable variations", .index + 1)]
    InvalidGroup { index: usize },

    #[error("Check group {} could not be compiled: {message}", .index + 1)]
    InvalidPattern { index: usize, message: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("No products were returned for the search term '{keyword}'.")]
    NoResults { keyword: String },

    #[error("Failed to normalize product at position {position}: {message}")]
    Normalization { position: usize, message: String },
}

/// How the variations of a group are matched against product text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Literal substring match
    #[default]
    Contains,
    /// Match bounded by word boundaries on both sides
    WholeWord,
}

impl MatchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Contains => "contains",
            Self::WholeWord => "whole_word",
        }
    }
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "contains" | "text contains" => Ok(Self::Contains),
            "word" | "whole_word" | "whole-word" | "text equals" => Ok(Self::WholeWord),
            other => Err(format!(
                "unknown match mode '{}' (expected contains or whole_word)",
                other
            )),
        }
    }
}

/// Deployment environment of the search API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Prod,
    Staging,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Prod => "prod",
            Self::Staging => "staging",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "prod" | "production" => Ok(Self::Prod),
            "staging" => Ok(Self::Staging),
            other => Err(format!(
                "unknown environment '{}' (expected prod or staging)",
                other
            )),
        }
    }
}

/// A set of alternative spellings that count as the same concept.
///
/// A product satisfies the group when at least one variation matches
/// under the group's `match_mode`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptGroup {
    /// Lower-cased, trimmed variations in input order
    pub variations: Vec<String>,

    #[serde(default)]
    pub match_mode: MatchMode,
}

impl ConceptGroup {
    /// Build a group, trimming and lower-casing each variation and
    /// dropping blanks. The result may still be empty; see `validate`.
    pub fn new<I, S>(variations: I, match_mode: MatchMode) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let variations = variations
            .into_iter()
            .map(|v| v.as_ref().trim().to_lowercase())
            .filter(|v| !v.is_empty())
            .collect();

        Self {
            variations,
            match_mode,
        }
    }

    /// Parse a comma-separated list of variations, e.g. `"hdr10+, hdr 10+"`.
    pub fn parse(index: usize, input: &str, match_mode: MatchMode) -> Result<Self, AnalysisError> {
        let group = Self::new(input.split(','), match_mode);
        group.validate(index)?;
        Ok(group)
    }

    /// Check that the group has at least one usable variation.
    pub fn validate(&self, index: usize) -> Result<(), AnalysisError> {
        if self.variations.iter().all(|v| v.trim().is_empty()) {
            return Err(AnalysisError::InvalidGroup { index });
        }
        Ok(())
    }

    /// First variation, used to label the group in reports.
    pub fn label(&self) -> &str {
        self.variations.first().map(String::as_str).unwrap_or("")
    }
}

/// Parameters of a single analysis run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub shop_id: String,

    #[serde(default)]
    pub environment: Environment,

    /// Search term sent to the API
    pub keyword: String,

    /// Groups in display order; indices are used as stable identifiers
    pub groups: Vec<ConceptGroup>,

    #[serde(default = "default_result_size")]
    pub result_size: u32,
}

fn default_result_size() -> u32 {
    DEFAULT_RESULT_SIZE
}

impl AnalysisRequest {
    pub fn new(shop_id: impl Into<String>, keyword: impl Into<String>) -> Self {
        Self {
            shop_id: shop_id.into().trim().to_string(),
            environment: Environment::default(),
            keyword: keyword.into().trim().to_string(),
            groups: Vec::new(),
            result_size: DEFAULT_RESULT_SIZE,
        }
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    pub fn with_group(mut self, group: ConceptGroup) -> Self {
        self.groups.push(group);
        self
    }

    pub fn with_groups(mut self, groups: Vec<ConceptGroup>) -> Self {
        self.groups = groups;
        self
    }

    pub fn with_result_size(mut self, result_size: u32) -> Self {
        self.result_size = result_size;
        self
    }

    /// Validate the request before any search or matching happens.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.shop_id.trim().is_empty() {
            return Err(AnalysisError::InvalidRequest("shop id is empty".into()));
        }
        if self.keyword.trim().is_empty() {
            return Err(AnalysisError::InvalidRequest("search keyword is empty".into()));
        }
        if self.groups.is_empty() {
            return Err(AnalysisError::InvalidRequest(
                "at least one check group is required".into(),
            ));
        }
        if !(1..=MAX_RESULT_SIZE).contains(&self.result_size) {
            return Err(AnalysisError::InvalidRequest(format!(
                "result size {} is outside 1..={}",
                self.result_size, MAX_RESULT_SIZE
            )));
        }
        for (index, group) in self.groups.iter().enumerate() {
            group.validate(index)?;
        }
        Ok(())
    }
}

/// A product record as returned by the search API.
///
/// Only `product_id`, `title` and `description` are read by name; every
/// other field is kept so that matching can see it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Product(Map<String, Value>);

impl Product {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder used mostly by tests and canned backends.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Raw text of a field: strings as-is, other values as JSON text.
    ///
    /// An explicit `null` counts as absent.
    pub fn field_text(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    pub fn product_id(&self) -> String {
        self.field_or_missing("product_id")
    }

    pub fn title(&self) -> String {
        self.field_or_missing("title")
    }

    pub fn description(&self) -> String {
        self.field_or_missing("description")
    }

    fn field_or_missing(&self, key: &str) -> String {
        self.field_text(key)
            .unwrap_or_else(|| MISSING_FIELD.to_string())
    }
}

/// Outcome of classifying one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationVerdict {
    /// 1-based rank in the search response
    pub position: usize,

    pub product_id: String,

    pub title: String,

    pub is_relevant: bool,

    /// 0-based indices of groups that did not match; empty iff relevant
    #[serde(default)]
    pub failed_group_indices: Vec<usize>,
}

/// Summary of one analysis run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub total_products: usize,

    pub relevant: Vec<ClassificationVerdict>,

    pub irrelevant: Vec<ClassificationVerdict>,

    /// Group index -> number of irrelevant products that failed it
    pub failure_histogram: BTreeMap<usize, usize>,

    /// Titles and descriptions formatted for an external language model
    pub llm_export: String,
}

impl AnalysisResult {
    /// Share of relevant products in percent; 0 for an empty run.
    pub fn relevance_percentage(&self) -> f64 {
        if self.total_products == 0 {
            return 0.0;
        }
        self.relevant.len() as f64 / self.total_products as f64 * 100.0
    }

    pub fn all_relevant(&self) -> bool {
        self.irrelevant.is_empty() && self.total_products > 0
    }
}
