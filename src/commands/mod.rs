pub mod browse;
pub mod index;
pub mod render;
pub mod search;
pub mod status;

use bookfinder::{FilterCriteria, ValueRange};
use clap::Args;

/// Filter flags shared by `search` and `browse`
#[derive(Args, Debug, Default)]
pub struct FilterArgs {
    #[arg(long, help = "Exact category")]
    pub category: Option<String>,
    #[arg(long, help = "Minimum price (inclusive)")]
    pub min_price: Option<f64>,
    #[arg(long, help = "Maximum price (inclusive)")]
    pub max_price: Option<f64>,
    #[arg(long, help = "Earliest publication year (inclusive)")]
    pub min_year: Option<i32>,
    #[arg(long, help = "Latest publication year (inclusive)")]
    pub max_year: Option<i32>,
    #[arg(long, help = "Exact publisher")]
    pub publisher: Option<String>,
    #[arg(long, help = "Author contains (case-insensitive)")]
    pub author: Option<String>,
}

impl FilterArgs {
    pub fn into_criteria(self) -> FilterCriteria {
        let price_range =
            ValueRange::from_bounds(self.min_price, self.max_price, f64::NEG_INFINITY, f64::INFINITY);
        let year_range = ValueRange::from_bounds(self.min_year, self.max_year, i32::MIN, i32::MAX);

        FilterCriteria {
            category: self.category,
            price_range,
            year_range,
            publisher: self.publisher,
            author_substring: self.author.filter(|a| !a.is_empty()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_flags_is_unbounded() {
        assert!(FilterArgs::default().into_criteria().is_unbounded());
    }

    #[test]
    fn test_half_open_ranges() {
        let criteria = FilterArgs {
            max_price: Some(20.0),
            min_year: Some(1990),
            ..FilterArgs::default()
        }
        .into_criteria();

        let price = criteria.price_range.unwrap();
        assert!(price.contains(0.0) && price.contains(20.0) && !price.contains(20.01));
        let years = criteria.year_range.unwrap();
        assert!(years.contains(2024) && !years.contains(1989));
    }
}
