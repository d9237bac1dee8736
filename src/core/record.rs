use serde::{Deserialize, Serialize};

/// Prefix some dataset rows carry in front of the author list
const AUTHOR_PREFIX: &str = "By ";

/// A single book as seen by the filter engine and renderers.
///
/// `category` and `publisher` are empty when unknown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookRecord {
    pub title: String,
    pub authors: String,
    pub category: String,
    pub publisher: String,
    pub price: f64,
    pub publish_year: i32,
}

impl BookRecord {
    pub fn new(
        title: impl Into<String>,
        authors: impl Into<String>,
        price: f64,
        publish_year: i32,
    ) -> Self {
        Self {
            title: title.into(),
            authors: authors.into(),
            category: String::new(),
            publisher: String::new(),
            price,
            publish_year,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_publisher(mut self, publisher: impl Into<String>) -> Self {
        self.publisher = publisher.into();
        self
    }
}

/// Strip the literal `"By "` prefix from a raw author field
pub fn clean_authors(raw: &str) -> &str {
    raw.strip_prefix(AUTHOR_PREFIX).unwrap_or(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_authors_strips_prefix() {
        assert_eq!(clean_authors("By J.K. Rowling"), "J.K. Rowling");
        assert_eq!(clean_authors("Tolkien"), "Tolkien");
    }

    #[test]
    fn test_clean_authors_only_exact_prefix() {
        // lowercase or missing space is not the prefix
        assert_eq!(clean_authors("by Someone"), "by Someone");
        assert_eq!(clean_authors("Byron, Lord"), "Byron, Lord");
        assert_eq!(clean_authors("By "), "");
    }

    #[test]
    fn test_builder() {
        let book = BookRecord::new("Dune", "Frank Herbert", 9.99, 1965)
            .with_category("Fiction")
            .with_publisher("Chilton");
        assert_eq!(book.category, "Fiction");
        assert_eq!(book.publisher, "Chilton");
        assert_eq!(book.publish_year, 1965);
    }
}
