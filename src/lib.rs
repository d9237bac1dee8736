//! bookfinder library
//!
//! Semantic book search: embed a query, retrieve a diverse set of books from
//! a vector index, then filter by category, price, year, publisher and author.
//!
//! # Modules
//!
//! - `core`: Book records, the filter engine and the CSV catalog
//! - `search`: Embeddings, vector indexes, query planning and normalization
//! - `services`: One-time construction and teardown of shared collaborators

pub mod config;
pub mod core;
pub mod error;
pub mod search;
pub mod services;

// Re-exports for convenience
pub use config::Settings;
pub use core::catalog::{Catalog, CatalogFacets};
pub use core::filter::{apply, take, FilterCriteria, ValueRange};
pub use core::record::{clean_authors, BookRecord};
pub use error::{Result, SearchError};
pub use search::normalizer::{normalize, Normalized};
pub use search::{BookSearch, RetrievalMode, SearchRequest, SearchSession};
pub use services::Services;
