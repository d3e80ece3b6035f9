use serde::Deserialize;

/// Fixed page size for todo listings.
pub const PAGE_SIZE: u32 = 10;

/// Raw query string of `GET /api/todos`. Kept as strings so a bad `page`
/// degrades to page 1 instead of rejecting the request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    pub search: Option<String>,
    pub page: Option<String>,
}

/// Owner-scoped listing criteria. The same value drives both the page query
/// and the total count, so the two can never disagree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoFilter {
    search: Option<String>,
    page: u32,
}

impl TodoFilter {
    pub fn new(search: Option<&str>, page: u32) -> Self {
        Self {
            search: search.filter(|s| !s.is_empty()).map(str::to_string),
            page: page.max(1),
        }
    }

    pub fn from_query(query: &ListQuery) -> Self {
        let page = query
            .page
            .as_deref()
            .and_then(|p| p.trim().parse::<u32>().ok())
            .unwrap_or(1);
        Self::new(query.search.as_deref(), page)
    }

    pub fn search(&self) -> Option<&str> {
        self.search.as_deref()
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn limit(&self) -> i64 {
        i64::from(PAGE_SIZE)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(PAGE_SIZE)
    }

    /// `ILIKE` pattern for the search term with `\`, `%` and `_` escaped,
    /// so the term is always matched as a literal substring.
    pub fn like_pattern(&self) -> Option<String> {
        self.search.as_deref().map(|term| {
            let mut pattern = String::with_capacity(term.len() + 2);
            pattern.push('%');
            for c in term.chars() {
                if matches!(c, '\\' | '%' | '_') {
                    pattern.push('\\');
                }
                pattern.push(c);
            }
            pattern.push('%');
            pattern
        })
    }

    /// In-process equivalent of the `ILIKE` predicate.
    pub fn matches(&self, title: &str) -> bool {
        match &self.search {
            Some(term) => title.to_lowercase().contains(&term.to_lowercase()),
            None => true,
        }
    }

    pub fn total_pages(total_items: i64) -> u32 {
        if total_items <= 0 {
            return 0;
        }
        let pages = (total_items + i64::from(PAGE_SIZE) - 1) / i64::from(PAGE_SIZE);
        u32::try_from(pages).unwrap_or(u32::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(search: Option<&str>, page: Option<&str>) -> ListQuery {
        ListQuery {
            search: search.map(str::to_string),
            page: page.map(str::to_string),
        }
    }

    #[test]
    fn page_defaults_to_one() {
        assert_eq!(TodoFilter::from_query(&query(None, None)).page(), 1);
        assert_eq!(TodoFilter::from_query(&query(None, Some("abc"))).page(), 1);
        assert_eq!(TodoFilter::from_query(&query(None, Some("0"))).page(), 1);
        assert_eq!(TodoFilter::from_query(&query(None, Some("-2"))).page(), 1);
        assert_eq!(TodoFilter::from_query(&query(None, Some("3"))).page(), 3);
    }

    #[test]
    fn page_is_not_read_from_search() {
        let filter = TodoFilter::from_query(&query(Some("4"), None));
        assert_eq!(filter.page(), 1);
        assert_eq!(filter.search(), Some("4"));
    }

    #[test]
    fn offset_follows_page() {
        assert_eq!(TodoFilter::new(None, 1).offset(), 0);
        assert_eq!(TodoFilter::new(None, 3).offset(), 20);
        assert_eq!(TodoFilter::new(None, 3).limit(), 10);
    }

    #[test]
    fn empty_search_matches_everything() {
        let filter = TodoFilter::new(Some(""), 1);
        assert_eq!(filter.search(), None);
        assert_eq!(filter.like_pattern(), None);
        assert!(filter.matches("anything"));
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        let filter = TodoFilter::new(Some("50%_off\\"), 1);
        assert_eq!(filter.like_pattern().as_deref(), Some("%50\\%\\_off\\\\%"));
    }

    #[test]
    fn matches_case_insensitively() {
        let filter = TodoFilter::new(Some("ABC"), 1);
        assert!(filter.matches("xxabcxx"));
        assert!(filter.matches("Abc"));
        assert!(!filter.matches("ab c"));
    }

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(TodoFilter::total_pages(0), 0);
        assert_eq!(TodoFilter::total_pages(1), 1);
        assert_eq!(TodoFilter::total_pages(10), 1);
        assert_eq!(TodoFilter::total_pages(11), 2);
        assert_eq!(TodoFilter::total_pages(30), 3);
    }
}
