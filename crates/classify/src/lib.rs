//! Relevance classification for search results.
//!
//! Takes the products returned by the search API and checks each one
//! against every concept group of the request. A product is relevant only
//! if all groups match; failed groups are tallied into a histogram.

use assortcheck_features::normalize_product;
use assortcheck_matcher::{compile_groups, GroupMatcher};
use assortcheck_model::{
    AnalysisError, AnalysisRequest, AnalysisResult, ClassificationVerdict, ConceptGroup, Product,
};
use std::collections::BTreeMap;

/// Classifies products against a fixed, compiled set of concept groups.
#[derive(Debug, Clone)]
pub struct Classifier {
    matchers: Vec<GroupMatcher>,
}

impl Classifier {
    pub fn new(groups: &[ConceptGroup]) -> Result<Self, AnalysisError> {
        Ok(Self {
            matchers: compile_groups(groups)?,
        })
    }

    /// Indices of the groups that do not match `normalized_text`, ascending.
    pub fn failed_groups(&self, normalized_text: &str) -> Vec<usize> {
        self.matchers
            .iter()
            .filter(|m| !m.is_match(normalized_text))
            .map(GroupMatcher::index)
            .collect()
    }

    /// Classify the product found at 1-based `position`.
    pub fn classify(
        &self,
        position: usize,
        product: &Product,
    ) -> Result<ClassificationVerdict, AnalysisError> {
        let text = normalize_product(product).map_err(|e| AnalysisError::Normalization {
            position,
            message: e.to_string(),
        })?;

        let failed_group_indices = self.failed_groups(&text);

        Ok(ClassificationVerdict {
            position,
            product_id: product.product_id(),
            title: product.title(),
            is_relevant: failed_group_indices.is_empty(),
            failed_group_indices,
        })
    }
}

/// Classify a single product without keeping the compiled groups around.
pub fn classify(
    position: usize,
    product: &Product,
    groups: &[ConceptGroup],
) -> Result<ClassificationVerdict, AnalysisError> {
    Classifier::new(groups)?.classify(position, product)
}

/// Run a full analysis over the products returned for `request`.
///
/// Fails as a whole: an error on any product aborts the run.
pub fn analyze(
    request: &AnalysisRequest,
    products: &[Product],
) -> Result<AnalysisResult, AnalysisError> {
    request.validate()?;
    let classifier = Classifier::new(&request.groups)?;

    if products.is_empty() {
        return Err(AnalysisError::NoResults {
            keyword: request.keyword.clone(),
        });
    }

    let mut relevant = Vec::new();
    let mut irrelevant = Vec::new();
    let mut failure_histogram: BTreeMap<usize, usize> = BTreeMap::new();
    let mut fragments = Vec::with_capacity(products.len());

    for (i, product) in products.iter().enumerate() {
        let position = i + 1;
        fragments.push(llm_fragment(position, product));

        let verdict = classifier.classify(position, product)?;
        tracing::trace!(
            position,
            product_id = %verdict.product_id,
            failed = ?verdict.failed_group_indices,
            "Classified product"
        );

        if verdict.is_relevant {
            relevant.push(verdict);
        } else {
            for &index in &verdict.failed_group_indices {
                *failure_histogram.entry(index).or_insert(0) += 1;
            }
            irrelevant.push(verdict);
        }
    }

    tracing::debug!(
        keyword = %request.keyword,
        total = products.len(),
        relevant = relevant.len(),
        irrelevant = irrelevant.len(),
        "Analysis complete"
    );

    Ok(AnalysisResult {
        total_products: products.len(),
        relevant,
        irrelevant,
        failure_histogram,
        llm_export: llm_export(&request.keyword, &fragments),
    })
}

/// Title and description of one product, as raw text for the export.
pub fn llm_fragment(position: usize, product: &Product) -> String {
    format!(
        "prod {}:\ntitle: {}\ndescription: {}",
        position,
        product.title(),
        product.description()
    )
}

/// Join fragments under a `search term:` header, blank line between each.
pub fn llm_export(keyword: &str, fragments: &[String]) -> String {
    format!("search term: {}\n\n{}", keyword, fragments.join("\n\n"))
}
