//! Process-wide collaborators
//!
//! The embedding model, index client and catalog are expensive, so they are
//! built once here and shared read-only. Call [`Services::shutdown`] before
//! exit to close the index.

use std::sync::Arc;

use crate::config::{IndexBackend, Settings};
use crate::core::catalog::Catalog;
use crate::error::{Result, SearchError};
use crate::search::chroma::ChromaIndex;
use crate::search::embedding::{provider_for, EmbeddingProvider};
use crate::search::engine::BookSearch;
use crate::search::index::VectorIndex;
use crate::search::sqlite::SqliteIndex;

pub struct Services {
    pub settings: Settings,
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub index: Arc<dyn VectorIndex>,
    pub search: BookSearch,
    catalog: Option<Arc<Catalog>>,
}

impl Services {
    /// Build every collaborator from settings.
    ///
    /// A configured dataset must load; a missing `DATASET_PATH` just leaves
    /// browse mode unavailable.
    pub fn init(settings: Settings) -> Result<Self> {
        let embedder = provider_for(&settings.embedding_model)
            .map_err(|e| SearchError::config(e.to_string()))?;
        let index = open_index(&settings.backend)?;
        let catalog = match &settings.dataset_path {
            Some(path) => Some(Arc::new(Catalog::load(path)?)),
            None => None,
        };

        tracing::info!(
            model = embedder.model_name(),
            dimension = embedder.dimension(),
            catalog = catalog.as_ref().map(|c| c.len()),
            "services ready"
        );

        Ok(Self::from_parts(settings, embedder, index, catalog))
    }

    /// Assemble from already-built collaborators
    pub fn from_parts(
        settings: Settings,
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        catalog: Option<Arc<Catalog>>,
    ) -> Self {
        let search = BookSearch::new(
            Arc::clone(&embedder),
            Arc::clone(&index),
            settings.retrieval.clone(),
        );
        Self {
            settings,
            embedder,
            index,
            search,
            catalog,
        }
    }

    /// The browse catalog, or a `Dataset` error when none is configured
    pub fn catalog(&self) -> Result<&Catalog> {
        self.catalog
            .as_deref()
            .ok_or_else(|| SearchError::dataset("DATASET_PATH is not set"))
    }

    /// Close the index connection
    pub fn shutdown(&self) -> Result<()> {
        self.index.close()?;
        tracing::info!("services shut down");
        Ok(())
    }
}

fn open_index(backend: &IndexBackend) -> Result<Arc<dyn VectorIndex>> {
    let index: Arc<dyn VectorIndex> = match backend {
        IndexBackend::Local { path } => Arc::new(SqliteIndex::open(path)?),
        IndexBackend::Chroma(chroma) => Arc::new(ChromaIndex::connect(chroma.clone())?),
    };
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetrievalSettings;
    use std::path::PathBuf;

    fn local_settings(dir: &std::path::Path, dataset: Option<PathBuf>) -> Settings {
        Settings {
            backend: IndexBackend::Local {
                path: dir.join("books.db"),
            },
            embedding_model: "htp".to_string(),
            dataset_path: dataset,
            retrieval: RetrievalSettings::default(),
            sample_fraction: 1.0,
        }
    }

    #[test]
    fn test_init_without_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let services = Services::init(local_settings(dir.path(), None)).unwrap();
        assert!(matches!(services.catalog(), Err(SearchError::Dataset(_))));
        assert_eq!(services.index.count().unwrap(), 0);
        services.shutdown().unwrap();
        assert!(services.index.count().is_err());
    }

    #[test]
    fn test_init_with_missing_dataset_fails() {
        let dir = tempfile::tempdir().unwrap();
        let settings = local_settings(dir.path(), Some(dir.path().join("missing.csv")));
        assert!(matches!(Services::init(settings), Err(SearchError::Dataset(_))));
    }

    #[test]
    fn test_unknown_model_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = local_settings(dir.path(), None);
        settings.embedding_model = "no-such-model".to_string();
        assert!(matches!(Services::init(settings), Err(SearchError::Config(_))));
    }
}
