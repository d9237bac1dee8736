//! Tabular book dataset (browse mode and ingestion source)

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use super::filter::ValueRange;
use super::record::{clean_authors, BookRecord};
use crate::error::{Result, SearchError};

/// Price bounds used when the catalog is empty
pub const FALLBACK_PRICE_RANGE: (f64, f64) = (0.0, 100.0);

/// Year bounds used when the catalog is empty
pub const FALLBACK_YEAR_RANGE: (i32, i32) = (1900, 2024);

/// One CSV row as it appears on disk
#[derive(Debug, Deserialize)]
struct RawRow {
    #[serde(rename = "Title", default)]
    title: Option<String>,
    #[serde(rename = "Authors", default)]
    authors: Option<String>,
    #[serde(rename = "Description", default)]
    description: Option<String>,
    #[serde(rename = "Category", default)]
    category: Option<String>,
    #[serde(rename = "Publisher", default)]
    publisher: Option<String>,
    #[serde(rename = "Price Starting With ($)", default)]
    price: Option<String>,
    #[serde(rename = "Publish Date (Month)", default)]
    month: Option<String>,
    #[serde(rename = "Publish Date (Year)", default)]
    year: Option<String>,
}

/// A catalog row with the columns only ingestion needs
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogRow {
    pub record: BookRecord,
    pub description: Option<String>,
    pub month: Option<String>,
}

/// Distinct values and bounds for building filter controls
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogFacets {
    pub categories: Vec<String>,
    pub publishers: Vec<String>,
    pub price: ValueRange<f64>,
    pub year: ValueRange<i32>,
}

/// The full book table, loaded once
#[derive(Debug, Clone)]
pub struct Catalog {
    path: PathBuf,
    rows: Vec<CatalogRow>,
    records: Vec<BookRecord>,
    skipped_rows: usize,
}

impl Catalog {
    /// Load a CSV dataset from disk
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(SearchError::dataset(format!(
                "dataset not found: {}",
                path.display()
            )));
        }

        let mut reader = csv::Reader::from_path(path)
            .map_err(|e| SearchError::dataset(format!("{}: {}", path.display(), e)))?;

        let mut rows = Vec::new();
        let mut skipped_rows = 0;

        for (line, raw) in reader.deserialize::<RawRow>().enumerate() {
            let raw = match raw {
                Ok(raw) => raw,
                Err(e) => {
                    tracing::warn!(row = line + 1, error = %e, "skipping unreadable dataset row");
                    skipped_rows += 1;
                    continue;
                }
            };
            match convert_row(raw) {
                Some(row) => rows.push(row),
                None => {
                    tracing::warn!(row = line + 1, "skipping dataset row without title, price or year");
                    skipped_rows += 1;
                }
            }
        }

        tracing::info!(
            path = %path.display(),
            rows = rows.len(),
            skipped = skipped_rows,
            "loaded book catalog"
        );

        Ok(Self::from_rows(path.to_path_buf(), rows, skipped_rows))
    }

    /// Build a catalog from already-parsed rows
    pub fn from_rows(path: PathBuf, rows: Vec<CatalogRow>, skipped_rows: usize) -> Self {
        let records = rows.iter().map(|r| r.record.clone()).collect();
        Self {
            path,
            rows,
            records,
            skipped_rows,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn records(&self) -> &[BookRecord] {
        &self.records
    }

    pub fn rows(&self) -> &[CatalogRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Rows dropped while loading because a required column was unusable
    pub fn skipped_rows(&self) -> usize {
        self.skipped_rows
    }

    /// Number of rows that carry a description (the indexable subset)
    pub fn described_count(&self) -> usize {
        self.rows.iter().filter(|r| r.description.is_some()).count()
    }

    pub fn facets(&self) -> CatalogFacets {
        let categories: BTreeSet<&str> = self
            .records
            .iter()
            .map(|r| r.category.as_str())
            .filter(|c| !c.is_empty())
            .collect();
        let publishers: BTreeSet<&str> = self
            .records
            .iter()
            .map(|r| r.publisher.as_str())
            .filter(|p| !p.is_empty())
            .collect();

        let price = self
            .records
            .iter()
            .map(|r| r.price)
            .fold(None, |acc: Option<(f64, f64)>, p| match acc {
                None => Some((p, p)),
                Some((lo, hi)) => Some((lo.min(p), hi.max(p))),
            })
            .unwrap_or(FALLBACK_PRICE_RANGE);
        let year = self
            .records
            .iter()
            .map(|r| r.publish_year)
            .fold(None, |acc: Option<(i32, i32)>, y| match acc {
                None => Some((y, y)),
                Some((lo, hi)) => Some((lo.min(y), hi.max(y))),
            })
            .unwrap_or(FALLBACK_YEAR_RANGE);

        CatalogFacets {
            categories: categories.into_iter().map(String::from).collect(),
            publishers: publishers.into_iter().map(String::from).collect(),
            price: ValueRange::new(price.0, price.1),
            year: ValueRange::new(year.0, year.1),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse a year column that may have been written as a float (`2004.0`)
pub(crate) fn parse_year(raw: &str) -> Option<i32> {
    let raw = raw.trim();
    if let Ok(year) = raw.parse::<i32>() {
        return Some(year);
    }
    let value = raw.parse::<f64>().ok()?;
    if value.is_finite() && value.fract() == 0.0 && value.abs() <= i32::MAX as f64 {
        Some(value as i32)
    } else {
        None
    }
}

/// Parse a price column; negative or non-finite prices are rejected
pub(crate) fn parse_price(raw: &str) -> Option<f64> {
    let value = raw.trim().trim_start_matches('$').parse::<f64>().ok()?;
    (value.is_finite() && value >= 0.0).then_some(value)
}

fn convert_row(raw: RawRow) -> Option<CatalogRow> {
    let title = non_empty(raw.title)?;
    let price = parse_price(raw.price.as_deref()?)?;
    let publish_year = parse_year(raw.year.as_deref()?)?;
    let authors = raw
        .authors
        .map(|a| clean_authors(&a).to_string())
        .unwrap_or_default();

    let record = BookRecord {
        title,
        authors,
        category: non_empty(raw.category).unwrap_or_default(),
        publisher: non_empty(raw.publisher).unwrap_or_default(),
        price,
        publish_year,
    };

    Some(CatalogRow {
        record,
        description: non_empty(raw.description),
        month: non_empty(raw.month),
    })
}
