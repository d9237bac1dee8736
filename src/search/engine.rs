//! Search pipeline - planner, normalizer and filter engine end to end

use serde::Serialize;
use std::sync::Arc;

use super::embedding::EmbeddingProvider;
use super::index::VectorIndex;
use super::normalizer::normalize;
use super::planner::{QueryPlanner, SearchRequest};
use super::session::SearchSession;
use crate::config::RetrievalSettings;
use crate::core::filter::{apply, take, FilterCriteria};
use crate::core::record::BookRecord;
use crate::error::{Result, SearchError};

/// Result of a semantic search
#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    /// Records to display, in MMR order
    pub records: Vec<BookRecord>,
    /// Hits returned by the index
    pub retrieved: usize,
    /// Hits dropped by the normalizer
    pub dropped: usize,
    /// Records that passed the filters before the display cap
    pub matched: usize,
}

/// Result of a browse over the full catalog
#[derive(Debug, Clone, Serialize)]
pub struct BrowseOutcome {
    pub records: Vec<BookRecord>,
    pub matched: usize,
}

/// Semantic book search over shared collaborators
pub struct BookSearch {
    planner: QueryPlanner,
}

impl BookSearch {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        settings: RetrievalSettings,
    ) -> Self {
        Self {
            planner: QueryPlanner::new(embedder, index, settings),
        }
    }

    pub fn planner(&self) -> &QueryPlanner {
        &self.planner
    }

    /// Retrieve, normalize, filter, then cap to `display` records
    pub fn search(
        &self,
        request: &SearchRequest,
        criteria: &FilterCriteria,
        display: usize,
    ) -> Result<SearchOutcome> {
        let hits = self.planner.plan_and_retrieve(request)?;
        let retrieved = hits.len();

        let normalized = normalize(hits);
        let matched = apply(&normalized.records, criteria);
        let matched_count = matched.len();

        tracing::debug!(
            retrieved,
            dropped = normalized.dropped,
            matched = matched_count,
            "search finished"
        );

        Ok(SearchOutcome {
            records: take(matched, display),
            retrieved,
            dropped: normalized.dropped,
            matched: matched_count,
        })
    }

    /// Like [`search`](Self::search), but discards the result when a newer
    /// request started in the same session meanwhile
    pub fn search_in_session(
        &self,
        session: &SearchSession,
        request: &SearchRequest,
        criteria: &FilterCriteria,
        display: usize,
    ) -> Result<SearchOutcome> {
        let ticket = session.begin();
        let outcome = self.search(request, criteria, display);
        if !ticket.is_current() {
            tracing::debug!(query = %request.query_text, "search superseded");
            return Err(SearchError::Superseded);
        }
        outcome
    }
}

/// Filter the full catalog without semantic search
pub fn browse(records: &[BookRecord], criteria: &FilterCriteria, display: usize) -> BrowseOutcome {
    let matched = apply(records, criteria);
    let count = matched.len();
    BrowseOutcome {
        records: take(matched, display),
        matched: count,
    }
}
