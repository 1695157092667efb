//! Keyword intake
//!
//! Normalization and bulk registration of monitored keywords.

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::model::KeywordId;
use crate::traits::Store;

/// Normalize keyword text for storage (lower-case, trimmed)
///
/// # Errors
///
/// [`Error::InvalidInput`] if nothing is left after trimming.
pub fn normalize_keyword(raw: &str) -> Result<String> {
    let text = raw.trim().to_lowercase();
    if text.is_empty() {
        return Err(Error::invalid_input("Keyword cannot be empty"));
    }
    Ok(text)
}

/// Split a comma-separated keyword list, dropping blank entries
pub fn parse_keyword_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Register one keyword
///
/// Returns the id of the existing keyword when the normalized text is
/// already known.
pub async fn add_keyword(store: &dyn Store, raw: &str) -> Result<KeywordId> {
    let text = normalize_keyword(raw)?;
    let id = store.add_keyword(&text).await?;
    debug!("Keyword '{}' registered as {}", text, id);
    Ok(id)
}

/// Register several keywords
///
/// Blank entries are skipped; store failures abort the import.
///
/// # Returns
///
/// The number of keywords accepted (new or already present).
pub async fn add_keywords<I, S>(store: &dyn Store, keywords: I) -> Result<usize>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut accepted = 0;
    for raw in keywords {
        match add_keyword(store, raw.as_ref()).await {
            Ok(_) => accepted += 1,
            Err(Error::InvalidInput(msg)) => warn!("Skipping keyword: {}", msg),
            Err(e) => return Err(e),
        }
    }
    Ok(accepted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::MemoryStore;

    #[test]
    fn normalize_lowercases_and_trims() {
        assert_eq!(normalize_keyword("  Rust Lang ").unwrap(), "rust lang");
        assert!(matches!(normalize_keyword("   "), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn list_parsing_drops_blanks() {
        assert_eq!(parse_keyword_list("foo, bar,,  ,baz "), vec!["foo", "bar", "baz"]);
    }

    #[tokio::test]
    async fn duplicate_keywords_share_an_id() {
        let store = MemoryStore::new();
        let first = add_keyword(&store, "Foo").await.unwrap();
        let second = add_keyword(&store, " foo ").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(store.active_keywords().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn bulk_add_counts_accepted_entries() {
        let store = MemoryStore::new();
        let accepted = add_keywords(&store, ["alpha", " ", "beta", "ALPHA"]).await.unwrap();
        assert_eq!(accepted, 3);
        assert_eq!(store.active_keywords().await.unwrap().len(), 2);
    }
}
