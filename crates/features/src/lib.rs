//! Text normalization for relevance matching.
//!
//! Provides pure functions that turn a product record into the single
//! lower-cased string the matchers run against.

use assortcheck_model::Product;

const NBSP: char = '\u{00a0}';

/// Escaped form of a non-breaking space as it can appear inside text.
const ESCAPED_NBSP: &str = "\\u00a0";

/// Serialize every field of a product and normalize the result.
///
/// All values take part, not just title and description, so that a match
/// against any attribute of the product is found. Keys come out sorted with
/// compact `,` and `:` separators, so text spanning two fields or a
/// separator does not follow the API's own key order or spacing.
pub fn normalize_product(product: &Product) -> Result<String, serde_json::Error> {
    let serialized = serde_json::to_string(product)?;
    Ok(normalize_text(&serialized))
}

/// Lower-case text and fold known whitespace artifacts into plain spaces.
///
/// Double spaces are collapsed in a single pass, so runs of three or more
/// spaces are only shortened, not reduced to one.
pub fn normalize_text(text: &str) -> String {
    text.to_lowercase()
        .replace(NBSP, " ")
        .replace(ESCAPED_NBSP, " ")
        .replace("  ", " ")
}
