use chrono::{DateTime, Utc};

use crate::models::{CategoryId, UserId};

/// Filter applied to post listings.
///
/// Every listing is ordered newest first. `visible_at` restricts the result to
/// posts anyone may read at that instant: published, in a published category
/// and not dated in the future.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostQuery {
    pub author: Option<UserId>,
    pub category: Option<CategoryId>,
    pub visible_at: Option<DateTime<Utc>>,
}

impl PostQuery {
    /// Matches every post
    pub fn all() -> Self {
        Self::default()
    }

    /// Matches the posts anyone may read at `now`
    pub fn visible(now: DateTime<Utc>) -> Self {
        Self::all().visible_at(now)
    }

    pub fn by_author(mut self, author: UserId) -> Self {
        self.author = Some(author);
        self
    }

    pub fn in_category(mut self, category: CategoryId) -> Self {
        self.category = Some(category);
        self
    }

    pub fn visible_at(mut self, now: DateTime<Utc>) -> Self {
        self.visible_at = Some(now);
        self
    }
}
