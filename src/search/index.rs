//! Vector index abstraction
//!
//! An index stores (embedding, metadata, document text) triples and answers
//! nearest-neighbor queries. MMR re-ranking runs client-side over the
//! `fetch_k` nearest candidates, so backends only implement `candidates`.

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use super::mmr::maximal_marginal_relevance;

/// Per-hit key/value metadata as stored in the index
pub type Metadata = Map<String, Value>;

#[derive(Debug, Error)]
pub enum IndexError {
    /// Backend could not be reached
    #[error("index unreachable: {0}")]
    Connection(String),

    /// Backend answered with an error status
    #[error("index request failed ({status}): {message}")]
    Status { status: u16, message: String },

    /// Backend answered with data we cannot interpret
    #[error("malformed index response: {0}")]
    Malformed(String),

    /// Embedding width does not match the index
    #[error("dimension mismatch: index has {expected}, got {actual}")]
    Dimension { expected: usize, actual: usize },

    /// `close` was already called
    #[error("index is closed")]
    Closed,

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type IndexResult<T> = Result<T, IndexError>;

/// One raw search hit; normalized into a `BookRecord` right away
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalHit {
    /// Cosine similarity to the query
    pub score: f32,
    pub metadata: Metadata,
    pub document: String,
}

/// A hit together with its stored embedding, input to MMR
#[derive(Debug, Clone)]
pub struct Candidate {
    pub hit: RetrievalHit,
    pub embedding: Vec<f32>,
}

/// A document to be written by ingestion
#[derive(Debug, Clone)]
pub struct IndexDocument {
    pub id: String,
    pub document: String,
    pub metadata: Metadata,
    pub embedding: Vec<f32>,
}

/// Summary for status output
#[derive(Debug, Clone, Serialize)]
pub struct IndexInfo {
    pub backend: String,
    pub location: String,
    pub documents: usize,
    pub embedding_model: Option<String>,
    pub last_indexed: Option<String>,
    /// Collections in the same remote database
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub collections: Vec<String>,
}

pub trait VectorIndex: Send + Sync {
    /// The `fetch_k` nearest stored documents, most similar first, with
    /// their embeddings
    fn candidates(&self, query: &[f32], fetch_k: usize) -> IndexResult<Vec<Candidate>>;

    fn add_documents(&self, docs: &[IndexDocument]) -> IndexResult<usize>;

    /// Remove every stored document
    fn clear(&self) -> IndexResult<()>;

    fn count(&self) -> IndexResult<usize>;

    fn describe(&self) -> IndexResult<IndexInfo>;

    /// Record which model produced the stored embeddings
    fn record_ingestion(&self, _model: &str) -> IndexResult<()> {
        Ok(())
    }

    /// Release the backend; later calls fail with [`IndexError::Closed`]
    fn close(&self) -> IndexResult<()> {
        Ok(())
    }

    /// Plain k-nearest-neighbor search (no diversity re-ranking)
    fn similarity_search(&self, query: &[f32], k: usize) -> IndexResult<Vec<RetrievalHit>> {
        Ok(self
            .candidates(query, k)?
            .into_iter()
            .take(k)
            .map(|c| c.hit)
            .collect())
    }

    /// Fetch `fetch_k` candidates, then keep `k` of them by MMR
    fn mmr_search(
        &self,
        query: &[f32],
        k: usize,
        fetch_k: usize,
        lambda: f32,
    ) -> IndexResult<Vec<RetrievalHit>> {
        let mut pool = self.candidates(query, fetch_k.max(k))?;
        let embeddings: Vec<Vec<f32>> = pool.iter_mut().map(|c| std::mem::take(&mut c.embedding)).collect();
        let order = maximal_marginal_relevance(query, &embeddings, k, lambda);

        let mut slots: Vec<Option<RetrievalHit>> = pool.into_iter().map(|c| Some(c.hit)).collect();
        Ok(order
            .into_iter()
            .filter_map(|i| slots.get_mut(i).and_then(Option::take))
            .collect())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory index for unit tests

    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;
    use crate::search::embedding::cosine_similarity;

    #[derive(Default)]
    pub struct MemoryIndex {
        docs: Mutex<Vec<IndexDocument>>,
        pub last_fetch_k: AtomicUsize,
        pub fail: AtomicBool,
    }

    impl MemoryIndex {
        pub fn failing() -> Self {
            let index = Self::default();
            index.fail.store(true, Ordering::SeqCst);
            index
        }
    }

    impl VectorIndex for MemoryIndex {
        fn candidates(&self, query: &[f32], fetch_k: usize) -> IndexResult<Vec<Candidate>> {
            self.last_fetch_k.store(fetch_k, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(IndexError::Connection("connection refused".to_string()));
            }
            let docs = self.docs.lock().unwrap();
            let mut pool: Vec<Candidate> = docs
                .iter()
                .map(|d| Candidate {
                    hit: RetrievalHit {
                        score: cosine_similarity(query, &d.embedding),
                        metadata: d.metadata.clone(),
                        document: d.document.clone(),
                    },
                    embedding: d.embedding.clone(),
                })
                .collect();
            pool.sort_by(|a, b| b.hit.score.total_cmp(&a.hit.score));
            pool.truncate(fetch_k);
            Ok(pool)
        }

        fn add_documents(&self, docs: &[IndexDocument]) -> IndexResult<usize> {
            self.docs.lock().unwrap().extend_from_slice(docs);
            Ok(docs.len())
        }

        fn clear(&self) -> IndexResult<()> {
            self.docs.lock().unwrap().clear();
            Ok(())
        }

        fn count(&self) -> IndexResult<usize> {
            Ok(self.docs.lock().unwrap().len())
        }

        fn describe(&self) -> IndexResult<IndexInfo> {
            Ok(IndexInfo {
                backend: "memory".to_string(),
                location: "memory".to_string(),
                documents: self.count()?,
                embedding_model: None,
                last_indexed: None,
                collections: Vec::new(),
            })
        }
    }
}
