//! Search criteria and result paging.

use serde::{Deserialize, Serialize};

/// Paging and date-range bounds passed into `list` operations.
///
/// Pages are 1-based. A page size of zero returns every match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchCriteria {
    /// 1-based page number.
    pub page_number: usize,
    /// Page size; zero means unbounded.
    pub page_size: usize,
    /// Inclusive lower bound on the family's date field, in millis.
    pub start_date: Option<u64>,
    /// Inclusive upper bound on the family's date field, in millis.
    pub end_date: Option<u64>,
}

impl Default for SearchCriteria {
    fn default() -> Self {
        Self {
            page_number: 1,
            page_size: 100,
            start_date: None,
            end_date: None,
        }
    }
}

impl SearchCriteria {
    /// One page of `page_size` results.
    #[must_use]
    pub const fn new(page_number: usize, page_size: usize) -> Self {
        Self {
            page_number,
            page_size,
            start_date: None,
            end_date: None,
        }
    }

    /// Every result, unpaged.
    #[must_use]
    pub const fn all() -> Self {
        Self::new(1, 0)
    }

    /// Restricts results to a date range.
    #[must_use]
    pub const fn in_date_range(mut self, start: Option<u64>, end: Option<u64>) -> Self {
        self.start_date = start;
        self.end_date = end;
        self
    }

    /// Returns true if `date` falls inside the date range.
    ///
    /// A record with no date only matches an unbounded range.
    #[must_use]
    pub fn matches_date(&self, date: Option<u64>) -> bool {
        match date {
            Some(date) => {
                self.start_date.map_or(true, |start| date >= start)
                    && self.end_date.map_or(true, |end| date <= end)
            }
            None => self.start_date.is_none() && self.end_date.is_none(),
        }
    }
}

/// One page of results plus the total number of matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResults<T> {
    /// Total matches across all pages.
    pub num_results: usize,
    /// The requested page.
    pub results: Vec<T>,
}

impl<T> SearchResults<T> {
    /// Returns true if nothing matched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.num_results == 0
    }
}

/// Accumulates scan matches into one page while counting all of them.
#[derive(Debug)]
pub struct Pager<T> {
    start: usize,
    end: Option<usize>,
    total: usize,
    results: Vec<T>,
}

impl<T> Pager<T> {
    /// Creates a pager for the criteria's page.
    #[must_use]
    pub fn new(criteria: &SearchCriteria) -> Self {
        let (start, end) = if criteria.page_size == 0 {
            (0, None)
        } else {
            let start = criteria
                .page_number
                .saturating_sub(1)
                .saturating_mul(criteria.page_size);
            (start, Some(start.saturating_add(criteria.page_size)))
        };
        Self {
            start,
            end,
            total: 0,
            results: Vec::new(),
        }
    }

    /// Counts a match, keeping it if it falls on the page.
    pub fn process(&mut self, record: T) {
        let on_page = self.total >= self.start && self.end.map_or(true, |end| self.total < end);
        if on_page {
            self.results.push(record);
        }
        self.total += 1;
    }

    /// Matches counted so far.
    #[must_use]
    pub fn total(&self) -> usize {
        self.total
    }

    /// Finishes paging.
    #[must_use]
    pub fn finish(self) -> SearchResults<T> {
        SearchResults {
            num_results: self.total,
            results: self.results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn page(criteria: SearchCriteria, n: usize) -> SearchResults<usize> {
        let mut pager = Pager::new(&criteria);
        (0..n).for_each(|i| pager.process(i));
        pager.finish()
    }

    #[test]
    fn second_page() {
        let results = page(SearchCriteria::new(2, 3), 10);
        assert_eq!(results.num_results, 10);
        assert_eq!(results.results, vec![3, 4, 5]);
    }

    #[test]
    fn zero_page_size_is_unbounded() {
        let results = page(SearchCriteria::all(), 7);
        assert_eq!(results.results.len(), 7);
    }

    #[test]
    fn page_past_end_is_empty() {
        let results = page(SearchCriteria::new(5, 10), 12);
        assert!(results.results.is_empty());
        assert_eq!(results.num_results, 12);
    }

    #[test]
    fn far_pages_do_not_overflow() {
        let results = page(SearchCriteria::new(usize::MAX, 2), 4);
        assert!(results.results.is_empty());
        assert_eq!(results.num_results, 4);

        let results = page(SearchCriteria::new(2, usize::MAX), 4);
        assert!(results.results.is_empty());
        assert_eq!(page(SearchCriteria::new(1, usize::MAX), 4).results, vec![0, 1, 2, 3]);
    }

    #[test]
    fn page_zero_is_treated_as_first_page() {
        assert_eq!(page(SearchCriteria::new(0, 2), 5).results, vec![0, 1]);
    }

    #[test]
    fn date_range_matching() {
        let criteria = SearchCriteria::all().in_date_range(Some(10), Some(20));
        assert!(criteria.matches_date(Some(10)));
        assert!(criteria.matches_date(Some(20)));
        assert!(!criteria.matches_date(Some(21)));
        assert!(!criteria.matches_date(None));
        assert!(SearchCriteria::all().matches_date(None));
    }

    proptest! {
        #[test]
        fn pages_partition_results(n in 0usize..200, size in 1usize..20) {
            let mut collected = Vec::new();
            let pages = n / size + 1;
            for number in 1..=pages {
                let results = page(SearchCriteria::new(number, size), n);
                prop_assert_eq!(results.num_results, n);
                prop_assert!(results.results.len() <= size);
                collected.extend(results.results);
            }
            prop_assert_eq!(collected, (0..n).collect::<Vec<_>>());
        }
    }
}
