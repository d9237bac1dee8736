//! Query planner
//!
//! Validates a [`SearchRequest`], sizes the MMR candidate pool, embeds the
//! query once and runs retrieval against the index.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::embedding::EmbeddingProvider;
use super::index::{RetrievalHit, VectorIndex};
use crate::config::RetrievalSettings;
use crate::error::{Result, SearchError};

/// How the index is queried
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalMode {
    /// Diversity re-ranking over a `fetch_k` pool
    #[default]
    Mmr,
    /// Plain nearest neighbors
    Similarity,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub query_text: String,
    pub result_count: usize,
    pub fetch_multiplier: usize,
    pub mode: RetrievalMode,
}

impl SearchRequest {
    pub fn new(query_text: impl Into<String>, result_count: usize) -> Self {
        Self {
            query_text: query_text.into(),
            result_count,
            fetch_multiplier: crate::config::DEFAULT_FETCH_MULTIPLIER,
            mode: RetrievalMode::Mmr,
        }
    }

    pub fn with_fetch_multiplier(mut self, multiplier: usize) -> Self {
        self.fetch_multiplier = multiplier;
        self
    }

    pub fn with_mode(mut self, mode: RetrievalMode) -> Self {
        self.mode = mode;
        self
    }
}

/// Index query derived from a request
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RetrievalPlan {
    pub k: usize,
    pub fetch_k: usize,
    pub lambda: f32,
    pub mode: RetrievalMode,
}

pub struct QueryPlanner {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    settings: RetrievalSettings,
}

impl QueryPlanner {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        settings: RetrievalSettings,
    ) -> Self {
        Self {
            embedder,
            index,
            settings,
        }
    }

    pub fn settings(&self) -> &RetrievalSettings {
        &self.settings
    }

    /// Validate a request and size the candidate pool, without retrieving
    pub fn plan(&self, request: &SearchRequest) -> Result<RetrievalPlan> {
        if request.query_text.trim().is_empty() {
            return Err(SearchError::invalid_request("query text is empty"));
        }
        let max = self.settings.max_results;
        if request.result_count < 1 || request.result_count > max {
            return Err(SearchError::invalid_request(format!(
                "result count {} outside [1, {}]",
                request.result_count, max
            )));
        }
        if request.fetch_multiplier < 1 {
            return Err(SearchError::invalid_request("fetch multiplier must be at least 1"));
        }

        let fetch_k = request
            .result_count
            .checked_mul(request.fetch_multiplier)
            .ok_or_else(|| SearchError::invalid_request("fetch pool size overflows"))?;

        Ok(RetrievalPlan {
            k: request.result_count,
            fetch_k,
            lambda: self.settings.mmr_lambda,
            mode: request.mode,
        })
    }

    /// Embed the query once and retrieve hits in index order
    pub fn plan_and_retrieve(&self, request: &SearchRequest) -> Result<Vec<RetrievalHit>> {
        let plan = self.plan(request)?;
        tracing::debug!(
            k = plan.k,
            fetch_k = plan.fetch_k,
            lambda = plan.lambda,
            mode = ?plan.mode,
            "retrieving"
        );

        let query_vector = self.embedder.embed(&request.query_text)?;
        let hits = match plan.mode {
            RetrievalMode::Mmr => {
                self.index
                    .mmr_search(&query_vector, plan.k, plan.fetch_k, plan.lambda)?
            }
            RetrievalMode::Similarity => self.index.similarity_search(&query_vector, plan.k)?,
        };

        tracing::debug!(hits = hits.len(), "retrieval finished");
        Ok(hits)
    }
}
