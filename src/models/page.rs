use serde::Serialize;

/// Splits a listing into fixed-size pages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    per_page: usize,
}

impl Paginator {
    /// Number of posts shown on every listing page
    pub const DEFAULT_PER_PAGE: usize = 10;

    pub fn new(per_page: usize) -> Self {
        Self {
            per_page: per_page.max(1),
        }
    }

    pub fn per_page(&self) -> usize {
        self.per_page
    }

    /// Page count for `count` items; an empty listing still has one page
    pub fn num_pages(&self, count: usize) -> usize {
        count.div_ceil(self.per_page).max(1)
    }

    /// Resolves the raw `page` query value to a page number.
    ///
    /// Missing or non-numeric values give the first page, values outside
    /// `1..=num_pages` give the last one.
    pub fn resolve(&self, raw: Option<&str>, count: usize) -> usize {
        let num_pages = self.num_pages(count);
        match raw.map(str::trim).map(str::parse::<i64>) {
            Some(Ok(number)) if number >= 1 && number as usize <= num_pages => number as usize,
            Some(Ok(_)) => num_pages,
            _ => 1,
        }
    }

    /// Row offset of the first item on page `number`
    pub fn offset(&self, number: usize) -> usize {
        self.per_page * number.saturating_sub(1)
    }
}

impl Default for Paginator {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PER_PAGE)
    }
}

/// One page of a listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: usize,
    pub num_pages: usize,
    /// Total items across all pages
    pub count: usize,
    pub has_previous: bool,
    pub has_next: bool,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, number: usize, count: usize, paginator: &Paginator) -> Self {
        let num_pages = paginator.num_pages(count);
        Self {
            items,
            number,
            num_pages,
            count,
            has_previous: number > 1,
            has_next: number < num_pages,
        }
    }
}
