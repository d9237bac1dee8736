//! Result normalizer
//!
//! Validates loosely typed hit metadata once and converts it into
//! [`BookRecord`]s. Bad hits are dropped individually; order is preserved.

use serde_json::Value;

use super::index::{Metadata, RetrievalHit};
use crate::core::catalog::{parse_price, parse_year};
use crate::core::record::BookRecord;
use crate::error::{Result, SearchError};

/// Normalized batch plus the number of hits that failed conversion
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Normalized {
    pub records: Vec<BookRecord>,
    pub dropped: usize,
}

pub fn normalize(hits: Vec<RetrievalHit>) -> Normalized {
    let mut out = Normalized {
        records: Vec::with_capacity(hits.len()),
        dropped: 0,
    };

    for (position, hit) in hits.into_iter().enumerate() {
        match to_record(&hit.metadata) {
            Ok(record) => out.records.push(record),
            Err(e) => {
                tracing::warn!(position, error = %e, "dropping search hit");
                out.dropped += 1;
            }
        }
    }

    out
}

/// Convert one metadata bag into a record
pub fn to_record(metadata: &Metadata) -> Result<BookRecord> {
    Ok(BookRecord {
        title: required_text(metadata, "title")?,
        authors: required_text(metadata, "authors")?,
        category: optional_text(metadata, "category"),
        publisher: optional_text(metadata, "publisher"),
        price: required(metadata, "price", as_price)?,
        publish_year: required(metadata, "publish_year", as_year)?,
    })
}

fn required<T>(metadata: &Metadata, key: &str, convert: fn(&Value) -> Option<T>) -> Result<T> {
    let value = metadata
        .get(key)
        .filter(|v| !v.is_null())
        .ok_or_else(|| SearchError::malformed(format!("missing field '{}'", key)))?;
    convert(value).ok_or_else(|| SearchError::malformed(format!("field '{}' has invalid value {}", key, value)))
}

fn required_text(metadata: &Metadata, key: &str) -> Result<String> {
    required(metadata, key, as_text)
}

fn optional_text(metadata: &Metadata, key: &str) -> String {
    metadata.get(key).and_then(as_text).unwrap_or_default()
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn as_price(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|p| p.is_finite() && *p >= 0.0),
        Value::String(s) => parse_price(s),
        _ => None,
    }
}

fn as_year(value: &Value) -> Option<i32> {
    match value {
        Value::Number(n) => match n.as_i64() {
            Some(i) => i32::try_from(i).ok(),
            None => parse_year(&n.to_string()),
        },
        Value::String(s) => parse_year(s),
        _ => None,
    }
}
