//! Runtime settings read from the environment (and `.env`)

use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{Result, SearchError};

pub const DEFAULT_INDEX_PATH: &str = "data/books.db";
pub const DEFAULT_CHROMA_PORT: u16 = 8000;
pub const DEFAULT_COLLECTION: &str = "books";
pub const DEFAULT_TENANT: &str = "default_tenant";
pub const DEFAULT_DATABASE: &str = "default_database";
pub const DEFAULT_AUTH_HEADER: &str = "X-Chroma-Token";
pub const DEFAULT_EMBEDDING_MODEL: &str = "htp";
pub const DEFAULT_MAX_RESULTS: usize = 50;
pub const DEFAULT_FETCH_MULTIPLIER: usize = 4;
pub const DEFAULT_MMR_LAMBDA: f32 = 0.5;

/// Remote Chroma connection
#[derive(Debug, Clone, PartialEq)]
pub struct ChromaSettings {
    pub host: String,
    pub port: u16,
    pub auth_token: Option<String>,
    pub auth_header: String,
    pub tenant: String,
    pub database: String,
    pub collection: String,
}

impl ChromaSettings {
    pub fn base_url(&self) -> String {
        if self.host.starts_with("http://") || self.host.starts_with("https://") {
            format!("{}:{}", self.host.trim_end_matches('/'), self.port)
        } else {
            format!("http://{}:{}", self.host, self.port)
        }
    }
}

/// Which vector index backs search
#[derive(Debug, Clone, PartialEq)]
pub enum IndexBackend {
    Local { path: PathBuf },
    Chroma(ChromaSettings),
}

/// Retrieval tuning knobs
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalSettings {
    pub max_results: usize,
    pub fetch_multiplier: usize,
    pub mmr_lambda: f32,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            max_results: DEFAULT_MAX_RESULTS,
            fetch_multiplier: DEFAULT_FETCH_MULTIPLIER,
            mmr_lambda: DEFAULT_MMR_LAMBDA,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub backend: IndexBackend,
    pub embedding_model: String,
    pub dataset_path: Option<PathBuf>,
    pub retrieval: RetrievalSettings,
    pub sample_fraction: f64,
}

impl Settings {
    /// Load `.env` (if present) and read the process environment
    pub fn from_env() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "loaded .env");
        }
        Self::from_lookup(|key| dotenvy::var(key).ok())
    }

    /// Build settings from any key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let chroma_host = get("CHROMA_HOST");
        let backend_name = get("BOOKFINDER_BACKEND")
            .unwrap_or_else(|| if chroma_host.is_some() { "chroma" } else { "local" }.to_string());

        let backend = match backend_name.to_ascii_lowercase().as_str() {
            "local" | "sqlite" => IndexBackend::Local {
                path: get("BOOKFINDER_INDEX_PATH")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_INDEX_PATH)),
            },
            "chroma" => {
                let host = chroma_host.ok_or_else(|| {
                    SearchError::config("CHROMA_HOST must be set for the chroma backend")
                })?;
                IndexBackend::Chroma(ChromaSettings {
                    host,
                    port: parse_or("CHROMA_PORT", get("CHROMA_PORT"), DEFAULT_CHROMA_PORT)?,
                    auth_token: get("CHROMA_AUTH_TOKEN"),
                    auth_header: get("AUTH_HEADER")
                        .unwrap_or_else(|| DEFAULT_AUTH_HEADER.to_string()),
                    tenant: get("CHROMA_TENANT").unwrap_or_else(|| DEFAULT_TENANT.to_string()),
                    database: get("CHROMA_DATABASE")
                        .unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
                    collection: get("CHROMA_COLLECTION")
                        .unwrap_or_else(|| DEFAULT_COLLECTION.to_string()),
                })
            }
            other => {
                return Err(SearchError::config(format!(
                    "BOOKFINDER_BACKEND: unknown backend '{}' (expected local|chroma)",
                    other
                )))
            }
        };

        let retrieval = RetrievalSettings {
            max_results: parse_or(
                "BOOKFINDER_MAX_RESULTS",
                get("BOOKFINDER_MAX_RESULTS"),
                DEFAULT_MAX_RESULTS,
            )?,
            fetch_multiplier: parse_or(
                "BOOKFINDER_FETCH_MULTIPLIER",
                get("BOOKFINDER_FETCH_MULTIPLIER"),
                DEFAULT_FETCH_MULTIPLIER,
            )?,
            mmr_lambda: parse_or(
                "BOOKFINDER_MMR_LAMBDA",
                get("BOOKFINDER_MMR_LAMBDA"),
                DEFAULT_MMR_LAMBDA,
            )?,
        };
        if retrieval.max_results == 0 {
            return Err(SearchError::config("BOOKFINDER_MAX_RESULTS must be at least 1"));
        }
        if retrieval.fetch_multiplier == 0 {
            return Err(SearchError::config("BOOKFINDER_FETCH_MULTIPLIER must be at least 1"));
        }
        if !(0.0..=1.0).contains(&retrieval.mmr_lambda) {
            return Err(SearchError::config("BOOKFINDER_MMR_LAMBDA must be within [0, 1]"));
        }

        let sample_fraction = parse_or(
            "BOOKFINDER_SAMPLE_FRACTION",
            get("BOOKFINDER_SAMPLE_FRACTION"),
            1.0f64,
        )?;
        if !(sample_fraction > 0.0 && sample_fraction <= 1.0) {
            return Err(SearchError::config(
                "BOOKFINDER_SAMPLE_FRACTION must be within (0, 1]",
            ));
        }

        Ok(Self {
            backend,
            embedding_model: get("EMBEDDING_MODEL")
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            dataset_path: get("DATASET_PATH").map(PathBuf::from),
            retrieval,
            sample_fraction,
        })
    }
}

fn parse_or<T: FromStr>(key: &str, value: Option<String>, default: T) -> Result<T> {
    match value {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|_| SearchError::config(format!("{}: cannot parse '{}'", key, raw))),
    }
}
