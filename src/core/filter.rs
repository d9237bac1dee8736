//! Filter engine
//!
//! A conjunction of equality, range and substring predicates over
//! [`BookRecord`]s. Works the same for search results and browse mode.

use serde::{Deserialize, Serialize};

use super::record::BookRecord;

/// Inclusive `[min, max]` range
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange<T> {
    pub min: T,
    pub max: T,
}

impl<T: PartialOrd + Copy> ValueRange<T> {
    pub fn new(min: T, max: T) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: T) -> bool {
        self.min <= value && value <= self.max
    }

    /// Range from optional bounds, open on a missing side. `None` when
    /// both are missing.
    pub fn from_bounds(min: Option<T>, max: Option<T>, open_min: T, open_max: T) -> Option<Self> {
        match (min, max) {
            (None, None) => None,
            (min, max) => Some(Self::new(min.unwrap_or(open_min), max.unwrap_or(open_max))),
        }
    }
}

/// Filter criteria. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterCriteria {
    pub category: Option<String>,
    pub price_range: Option<ValueRange<f64>>,
    pub year_range: Option<ValueRange<i32>>,
    pub publisher: Option<String>,
    pub author_substring: Option<String>,
}

impl FilterCriteria {
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn price(mut self, min: f64, max: f64) -> Self {
        self.price_range = Some(ValueRange::new(min, max));
        self
    }

    pub fn years(mut self, min: i32, max: i32) -> Self {
        self.year_range = Some(ValueRange::new(min, max));
        self
    }

    pub fn publisher(mut self, publisher: impl Into<String>) -> Self {
        self.publisher = Some(publisher.into());
        self
    }

    pub fn author(mut self, substring: impl Into<String>) -> Self {
        self.author_substring = Some(substring.into());
        self
    }

    /// True when no predicate is set
    pub fn is_unbounded(&self) -> bool {
        self.category.is_none()
            && self.price_range.is_none()
            && self.year_range.is_none()
            && self.publisher.is_none()
            && self.author_needle().is_none()
    }

    /// Lowercased author needle; an empty substring counts as unset
    fn author_needle(&self) -> Option<String> {
        self.author_substring
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }

    fn matches_with(&self, record: &BookRecord, author_needle: Option<&str>) -> bool {
        self.category.as_ref().map_or(true, |c| record.category == *c)
            && self.price_range.map_or(true, |r| r.contains(record.price))
            && self.year_range.map_or(true, |r| r.contains(record.publish_year))
            && self.publisher.as_ref().map_or(true, |p| record.publisher == *p)
            && author_needle.map_or(true, |needle| {
                record.authors.to_lowercase().contains(needle)
            })
    }

    /// Evaluate the full predicate for one record
    pub fn matches(&self, record: &BookRecord) -> bool {
        let needle = self.author_needle();
        self.matches_with(record, needle.as_deref())
    }
}

/// Apply criteria to a record set, preserving relative order.
///
/// The input is left untouched; matches are cloned into a new vector.
pub fn apply(records: &[BookRecord], criteria: &FilterCriteria) -> Vec<BookRecord> {
    let needle = criteria.author_needle();
    records
        .iter()
        .filter(|r| criteria.matches_with(r, needle.as_deref()))
        .cloned()
        .collect()
}

/// Cap a record set to a display count
pub fn take(mut records: Vec<BookRecord>, n: usize) -> Vec<BookRecord> {
    records.truncate(n);
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn book(category: &str, price: f64, year: i32) -> BookRecord {
        BookRecord::new("Title", "Author", price, year).with_category(category)
    }

    #[test]
    fn test_range_from_bounds() {
        assert_eq!(ValueRange::from_bounds(None, None, 0, 10), None);
        assert_eq!(
            ValueRange::from_bounds(Some(3), None, 0, 10),
            Some(ValueRange::new(3, 10))
        );
        assert_eq!(
            ValueRange::from_bounds(None, Some(7), 0, 10),
            Some(ValueRange::new(0, 7))
        );
    }

    #[test]
    fn test_scenario_category_price_year() {
        let records = vec![
            book("Fiction", 10.0, 2000),
            book("Fiction", 50.0, 2010),
            book("Nonfiction", 10.0, 2000),
        ];
        let criteria = FilterCriteria::default()
            .category("Fiction")
            .price(0.0, 20.0)
            .years(1990, 2020);

        let result = apply(&records, &criteria);
        assert_eq!(result, vec![records[0].clone()]);
    }

    #[test]
    fn test_empty_input() {
        let criteria = FilterCriteria::default().category("Fiction").price(0.0, 1.0);
        assert!(apply(&[], &criteria).is_empty());
    }

    #[test]
    fn test_author_case_insensitive() {
        let records = vec![
            BookRecord::new("A", "John SMITH", 5.0, 2001),
            BookRecord::new("B", "Jane Doe", 5.0, 2001),
        ];
        let result = apply(&records, &FilterCriteria::default().author("smith"));
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].title, "A");
    }

    #[test]
    fn test_empty_author_substring_matches_all() {
        let records = vec![book("Fiction", 1.0, 2000), book("Poetry", 2.0, 2001)];
        let criteria = FilterCriteria::default().author("");
        assert!(criteria.is_unbounded());
        assert_eq!(apply(&records, &criteria), records);
    }

    #[test]
    fn test_ranges_are_inclusive() {
        let records = vec![book("X", 10.0, 1990), book("X", 20.0, 2020)];
        let criteria = FilterCriteria::default().price(10.0, 20.0).years(1990, 2020);
        assert_eq!(apply(&records, &criteria).len(), 2);
    }

    #[test]
    fn test_publisher_equality() {
        let records = vec![
            book("X", 1.0, 2000).with_publisher("Penguin"),
            book("X", 1.0, 2000).with_publisher("Penguin Books"),
            book("X", 1.0, 2000),
        ];
        let result = apply(&records, &FilterCriteria::default().publisher("Penguin"));
        assert_eq!(result, vec![records[0].clone()]);
    }

    #[test]
    fn test_take_is_separate_from_filtering() {
        let records: Vec<_> = (0..5).map(|i| book("X", i as f64, 2000)).collect();
        let matched = apply(&records, &FilterCriteria::default());
        assert_eq!(matched.len(), 5);
        let shown = take(matched, 2);
        assert_eq!(shown.len(), 2);
        assert_eq!(shown[1].price, 1.0);
    }

    fn arb_record() -> impl Strategy<Value = BookRecord> {
        (
            prop::sample::select(vec!["Fiction", "Nonfiction", "Poetry", ""]),
            prop::sample::select(vec!["Penguin", "Tor", ""]),
            prop::sample::select(vec!["John Smith", "By Ann Lee", "ursula le guin"]),
            0.0f64..100.0,
            1900i32..2030,
        )
            .prop_map(|(category, publisher, authors, price, year)| {
                BookRecord::new("T", authors, price, year)
                    .with_category(category)
                    .with_publisher(publisher)
            })
    }

    fn arb_criteria() -> impl Strategy<Value = FilterCriteria> {
        (
            prop::option::of(prop::sample::select(vec!["Fiction", "Poetry"])),
            prop::option::of((0.0f64..50.0, 50.0f64..100.0)),
            prop::option::of((1900i32..1980, 1980i32..2030)),
            prop::option::of(prop::sample::select(vec!["Penguin", "Tor"])),
            prop::option::of(prop::sample::select(vec!["smith", "LEE", "le"])),
        )
            .prop_map(|(category, price, years, publisher, author)| FilterCriteria {
                category: category.map(String::from),
                price_range: price.map(|(a, b)| ValueRange::new(a, b)),
                year_range: years.map(|(a, b)| ValueRange::new(a, b)),
                publisher: publisher.map(String::from),
                author_substring: author.map(String::from),
            })
    }

    fn is_subsequence(sub: &[BookRecord], full: &[BookRecord]) -> bool {
        let mut it = full.iter();
        sub.iter().all(|s| it.any(|f| f == s))
    }

    proptest! {
        #[test]
        fn prop_unset_criteria_is_identity(records in prop::collection::vec(arb_record(), 0..30)) {
            prop_assert_eq!(apply(&records, &FilterCriteria::default()), records);
        }

        #[test]
        fn prop_output_is_subsequence(
            records in prop::collection::vec(arb_record(), 0..30),
            criteria in arb_criteria(),
        ) {
            let out = apply(&records, &criteria);
            prop_assert!(out.len() <= records.len());
            prop_assert!(is_subsequence(&out, &records));
        }

        #[test]
        fn prop_idempotent(
            records in prop::collection::vec(arb_record(), 0..30),
            criteria in arb_criteria(),
        ) {
            let once = apply(&records, &criteria);
            let twice = apply(&once, &criteria);
            prop_assert_eq!(once, twice);
        }
    }
}
