//! Domain variation generator

/// Normalize a keyword for use as a domain label
///
/// Lower-cases, trims and strips every internal whitespace character.
pub fn domain_label(keyword: &str) -> String {
    keyword
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect()
}

/// Expand a keyword into candidate domain names
///
/// Produces exactly one candidate per extension, in extension order, with no
/// deduplication. An empty label after normalization is the caller's
/// responsibility to reject (see [`crate::keywords::normalize_keyword`]).
pub fn generate_variations<S: AsRef<str>>(keyword: &str, extensions: &[S]) -> Vec<String> {
    let label = domain_label(keyword);
    extensions
        .iter()
        .map(|ext| format!("{}{}", label, ext.as_ref()))
        .collect()
}
