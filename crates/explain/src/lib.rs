//! Report generation for relevance analysis.
//!
//! Converts an `AnalysisResult` into labeled rows and summary lines
//! suitable for display in a terminal or as JSON.

use assortcheck_model::{AnalysisRequest, AnalysisResult, ClassificationVerdict, ConceptGroup};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// One line of the failure analysis table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureRow {
    /// e.g. `Group 1: 'hdr10+...'`
    pub missing_concept_group: String,

    pub products_failed: usize,
}

/// A product as listed in the relevant/irrelevant tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRow {
    pub position: usize,
    pub product_id: String,
    pub product_name: String,

    /// Only set for irrelevant products
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing_concepts: Option<String>,
}

/// Everything the presentation layer shows for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub search_term: String,

    /// `"{relevant} / {total}"`
    pub relevance_score: String,

    pub relevance_percentage: f64,

    pub headline: String,

    pub failure_summary: Vec<FailureRow>,

    pub irrelevant: Vec<ProductRow>,

    pub relevant: Vec<ProductRow>,

    pub llm_export: String,
}

/// Label a group by its position and first variation.
pub fn group_label(index: usize, groups: &[ConceptGroup]) -> String {
    format!("Group {}: {}", index + 1, concept_label(index, groups))
}

fn concept_label(index: usize, groups: &[ConceptGroup]) -> String {
    let first = groups.get(index).map(ConceptGroup::label).unwrap_or("?");
    format!("'{}...'", first)
}

/// `Missing: 'a...', 'b...'` for an irrelevant product.
pub fn missing_concepts(verdict: &ClassificationVerdict, groups: &[ConceptGroup]) -> String {
    let labels: Vec<_> = verdict
        .failed_group_indices
        .iter()
        .map(|&idx| concept_label(idx, groups))
        .collect();
    format!("Missing: {}", labels.join(", "))
}

/// Failure counts per group, in ascending group order.
pub fn failure_summary(result: &AnalysisResult, groups: &[ConceptGroup]) -> Vec<FailureRow> {
    result
        .failure_histogram
        .iter()
        .map(|(&index, &count)| FailureRow {
            missing_concept_group: group_label(index, groups),
            products_failed: count,
        })
        .collect()
}

/// One-line outcome of a run.
pub fn headline(result: &AnalysisResult) -> String {
    if result.all_relevant() {
        "Perfect! All returned products were relevant.".to_string()
    } else {
        format!("Found {} irrelevant products", result.irrelevant.len())
    }
}

pub fn build_report(request: &AnalysisRequest, result: &AnalysisResult) -> Report {
    let groups = &request.groups;

    let row = |verdict: &ClassificationVerdict, missing: Option<String>| ProductRow {
        position: verdict.position,
        product_id: verdict.product_id.clone(),
        product_name: verdict.title.clone(),
        missing_concepts: missing,
    };

    Report {
        search_term: request.keyword.clone(),
        relevance_score: format!("{} / {}", result.relevant.len(), result.total_products),
        relevance_percentage: result.relevance_percentage(),
        headline: headline(result),
        failure_summary: failure_summary(result, groups),
        irrelevant: result
            .irrelevant
            .iter()
            .map(|v| row(v, Some(missing_concepts(v, groups))))
            .collect(),
        relevant: result.relevant.iter().map(|v| row(v, None)).collect(),
        llm_export: result.llm_export.clone(),
    }
}

/// Render a report as plain text tables.
pub fn render_text(report: &Report) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Search Term: {}", report.search_term);
    let _ = writeln!(out, "Relevance Score: {}", report.relevance_score);
    let _ = writeln!(out, "Relevance Percentage: {:.1}%", report.relevance_percentage);
    let _ = writeln!(out, "{}", report.headline);

    if !report.failure_summary.is_empty() {
        let _ = writeln!(out, "\nFailure Analysis");
        let _ = writeln!(out, "  {:<40} {}", "Missing Concept Group", "Number of Products Failed");
        for row in &report.failure_summary {
            let _ = writeln!(out, "  {:<40} {}", row.missing_concept_group, row.products_failed);
        }
    }

    if !report.irrelevant.is_empty() {
        let _ = writeln!(out, "\nIrrelevant Products ({})", report.irrelevant.len());
        write_rows(&mut out, &report.irrelevant);
    }

    if report.relevant.is_empty() {
        let _ = writeln!(out, "\nNo relevant products found.");
    } else {
        let _ = writeln!(out, "\nRelevant Products ({})", report.relevant.len());
        write_rows(&mut out, &report.relevant);
    }

    out
}

fn write_rows(out: &mut String, rows: &[ProductRow]) {
    for row in rows {
        let _ = write!(
            out,
            "  {:>4}. [{}] {}",
            row.position, row.product_id, row.product_name
        );
        if let Some(missing) = &row.missing_concepts {
            let _ = write!(out, "  ({})", missing);
        }
        out.push('\n');
    }
}
