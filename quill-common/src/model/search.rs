use thiserror::Error;

/// A validated full-text search input.
///
/// The raw caller string is trimmed once at construction; an empty or
/// whitespace-only query is rejected here so no query ever reaches the store
/// matching everything.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub struct SearchQuery(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The search query is empty")]
pub struct InvalidSearchQueryError;

impl SearchQuery {
    pub fn new(query: &str) -> Result<Self, InvalidSearchQueryError> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            Err(InvalidSearchQueryError)
        } else {
            Ok(Self(trimmed.to_owned()))
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }

    /// The query as a `LIKE` substring pattern, with `%`, `_` and the escape
    /// character itself escaped so they match literally.
    #[must_use]
    pub fn like_pattern(&self) -> String {
        let mut pattern = String::with_capacity(self.0.len() + 2);
        pattern.push('%');
        for c in self.0.chars() {
            if matches!(c, '%' | '_' | '\\') {
                pattern.push('\\');
            }
            pattern.push(c);
        }
        pattern.push('%');
        pattern
    }

    /// The query normalized to a hashtag term: leading `#` stripped,
    /// lowercased.
    #[must_use]
    pub fn hashtag_term(&self) -> String {
        self.0.trim_start_matches('#').to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use crate::model::search::SearchQuery;

    #[test]
    fn rejects_blank_queries() {
        assert!(SearchQuery::new("").is_err());
        assert!(SearchQuery::new("   \t").is_err());
        assert!(SearchQuery::new(" hello ").is_ok());
    }

    #[test]
    fn trims_input() {
        assert_eq!(SearchQuery::new("  hello  ").unwrap().get(), "hello");
    }

    #[test]
    fn like_pattern_escapes_metacharacters() {
        assert_eq!(
            SearchQuery::new("50%_done\\").unwrap().like_pattern(),
            "%50\\%\\_done\\\\%"
        );
        assert_eq!(SearchQuery::new("plain").unwrap().like_pattern(), "%plain%");
    }

    #[test]
    fn hashtag_term_normalizes() {
        assert_eq!(SearchQuery::new("#Rust").unwrap().hashtag_term(), "rust");
        assert_eq!(SearchQuery::new("Rust").unwrap().hashtag_term(), "rust");
    }
}
