//! Semantic retrieval for books
//!
//! Query planner -> embedding provider -> vector index (MMR) -> normalizer.
//! Filtering of the normalized records lives in [`crate::core::filter`].

pub mod chroma;
pub mod embedding;
pub mod engine;
pub mod index;
pub mod ingest;
pub mod mmr;
#[cfg(feature = "fastembed")]
pub mod neural;
pub mod normalizer;
pub mod planner;
pub mod session;
pub mod sqlite;

pub use embedding::{EmbeddingProvider, HtpEmbedding};
pub use engine::{browse, BookSearch, BrowseOutcome, SearchOutcome};
pub use index::{RetrievalHit, VectorIndex};
pub use planner::{QueryPlanner, RetrievalMode, SearchRequest};
pub use session::SearchSession;
