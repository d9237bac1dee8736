//! Populate a vector index from the book catalog

use serde::Serialize;
use serde_json::json;
use std::cmp::Ordering;

use super::embedding::EmbeddingProvider;
use super::index::{IndexDocument, Metadata, VectorIndex};
use crate::core::catalog::{Catalog, CatalogRow};
use crate::error::{Result, SearchError};

/// Documents embedded per batch
pub const BATCH_SIZE: usize = 64;

/// Indexing statistics
#[derive(Debug, Clone, Serialize)]
pub struct IngestStats {
    /// Rows in the catalog
    pub catalog_rows: usize,
    /// Rows with a description
    pub described: usize,
    /// Rows written to the index
    pub indexed: usize,
    pub duration_ms: u128,
}

#[derive(Debug, Clone, Copy)]
pub struct IngestOptions {
    pub sample_fraction: f64,
    pub rebuild: bool,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            sample_fraction: 1.0,
            rebuild: false,
        }
    }
}

/// Text embedded for a row
pub fn document_text(row: &CatalogRow) -> String {
    let category = if row.record.category.is_empty() {
        "N/A"
    } else {
        row.record.category.as_str()
    };
    format!(
        "Title: {} - Description: {} - Category: {}",
        row.record.title,
        row.description.as_deref().unwrap_or_default(),
        category
    )
}

/// Metadata bag the normalizer reads back
pub fn document_metadata(row: &CatalogRow) -> Metadata {
    let record = &row.record;
    let mut metadata = Metadata::new();
    metadata.insert("title".into(), json!(record.title));
    metadata.insert("authors".into(), json!(record.authors));
    metadata.insert("category".into(), json!(record.category));
    metadata.insert("publisher".into(), json!(record.publisher));
    metadata.insert("price".into(), json!(record.price));
    metadata.insert("publish_year".into(), json!(record.publish_year));
    metadata
}

/// Evenly spaced sample of described rows, sorted by category, year, price.
///
/// Returns `(catalog position, row)` pairs so ids stay stable across runs.
pub fn sample_rows(rows: &[CatalogRow], fraction: f64) -> Vec<(usize, &CatalogRow)> {
    let mut described: Vec<(usize, &CatalogRow)> = rows
        .iter()
        .enumerate()
        .filter(|(_, r)| r.description.is_some())
        .collect();

    // empty categories sort first; sort_by is stable
    described.sort_by(|(_, a), (_, b)| {
        a.record
            .category
            .cmp(&b.record.category)
            .then(a.record.publish_year.cmp(&b.record.publish_year))
            .then(
                a.record
                    .price
                    .partial_cmp(&b.record.price)
                    .unwrap_or(Ordering::Equal),
            )
    });

    let sample_size = (described.len() as f64 * fraction.clamp(0.0, 1.0)).floor() as usize;
    if sample_size == 0 {
        return Vec::new();
    }
    let step = (described.len() / sample_size).max(1);

    described
        .into_iter()
        .step_by(step)
        .take(sample_size)
        .collect()
}

/// Embed and write the sampled catalog into the index
pub fn ingest(
    catalog: &Catalog,
    embedder: &dyn EmbeddingProvider,
    index: &dyn VectorIndex,
    options: IngestOptions,
) -> Result<IngestStats> {
    let start = std::time::Instant::now();

    if options.rebuild {
        index.clear()?;
        tracing::info!("cleared existing index");
    }

    let described = catalog.described_count();
    let sample = sample_rows(catalog.rows(), options.sample_fraction);
    if sample.len() < described {
        tracing::warn!(
            sampled = sample.len(),
            described,
            "indexing a subset of the catalog; search will not see every browsable book"
        );
    }

    let mut indexed = 0;
    for batch in sample.chunks(BATCH_SIZE) {
        let texts: Vec<String> = batch.iter().map(|(_, row)| document_text(row)).collect();
        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let embeddings = embedder.embed_batch(&refs)?;
        if embeddings.len() != batch.len() {
            return Err(SearchError::unavailable(format!(
                "embedder returned {} vectors for {} documents",
                embeddings.len(),
                batch.len()
            )));
        }

        let docs: Vec<IndexDocument> = batch
            .iter()
            .zip(texts)
            .zip(embeddings)
            .map(|(((position, row), document), embedding)| IndexDocument {
                id: format!("book-{}", position),
                document,
                metadata: document_metadata(row),
                embedding,
            })
            .collect();

        indexed += index.add_documents(&docs)?;
        tracing::debug!(indexed, total = sample.len(), "indexed batch");
    }

    index.record_ingestion(embedder.model_name())?;

    let stats = IngestStats {
        catalog_rows: catalog.len(),
        described,
        indexed,
        duration_ms: start.elapsed().as_millis(),
    };
    tracing::info!(indexed = stats.indexed, ms = stats.duration_ms, "ingestion finished");
    Ok(stats)
}
