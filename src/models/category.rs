use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CategoryId(pub i64);

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Category grouping posts under a slug
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Unique identifier
    pub id: CategoryId,
    /// Display title
    pub title: String,
    /// Category description
    pub description: String,
    /// URL identifier, unique across categories
    pub slug: String,
    /// Unpublished categories hide their posts from public listings
    pub is_published: bool,
    /// When the category was created
    pub created_at: DateTime<Utc>,
}

impl Category {
    /// Creates an unsaved, published category
    pub fn new(title: String, slug: String) -> Self {
        Self {
            id: CategoryId(0),
            title,
            description: String::new(),
            slug,
            is_published: true,
            created_at: Utc::now(),
        }
    }

    /// Sets the category's description
    pub fn with_description(mut self, description: String) -> Self {
        self.description = description;
        self
    }

    /// Marks the category as hidden
    pub fn unpublished(mut self) -> Self {
        self.is_published = false;
        self
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title)
    }
}

/// Returns true if `slug` only holds letters, digits, hyphens and underscores
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_creation() {
        let category = Category::new("Travel".to_string(), "travel".to_string());

        assert_eq!(category.title, "Travel");
        assert_eq!(category.slug, "travel");
        assert!(category.description.is_empty());
        assert!(category.is_published);
    }

    #[test]
    fn test_category_builders() {
        let category = Category::new("Travel".to_string(), "travel".to_string())
            .with_description("Trips and places".to_string())
            .unpublished();

        assert_eq!(category.description, "Trips and places");
        assert!(!category.is_published);
        assert_eq!(category.to_string(), "Travel");
    }

    #[test]
    fn test_slug_validation() {
        assert!(is_valid_slug("travel"));
        assert!(is_valid_slug("long-reads_2024"));
        assert!(!is_valid_slug(""));
        assert!(!is_valid_slug("with space"));
        assert!(!is_valid_slug("slash/ed"));
    }
}
