//! Remote vector index over the Chroma v2 REST API

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use super::embedding::cosine_similarity;
use super::index::{
    Candidate, IndexDocument, IndexError, IndexInfo, IndexResult, Metadata, RetrievalHit,
    VectorIndex,
};
use crate::config::ChromaSettings;

const HTTP_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Deserialize)]
struct CollectionModel {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    ids: Vec<Vec<String>>,
    #[serde(default)]
    documents: Option<Vec<Vec<Option<String>>>>,
    #[serde(default)]
    metadatas: Option<Vec<Vec<Option<Metadata>>>>,
    #[serde(default)]
    embeddings: Option<Vec<Vec<Vec<f32>>>>,
}

/// Chroma collection client.
///
/// The collection id is resolved on first use and cached.
pub struct ChromaIndex {
    client: Client,
    settings: ChromaSettings,
    base_url: String,
    collection_id: Mutex<Option<String>>,
    closed: AtomicBool,
}

impl ChromaIndex {
    pub fn connect(settings: ChromaSettings) -> IndexResult<Self> {
        let mut headers = HeaderMap::new();
        if let Some(token) = &settings.auth_token {
            let (name, value) = auth_header(&settings.auth_header, token)?;
            headers.insert(name, value);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .user_agent(concat!("bookfinder/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()
            .map_err(|e| IndexError::Connection(format!("building http client: {}", e)))?;

        let base_url = settings.base_url();
        tracing::debug!(url = %base_url, collection = %settings.collection, "chroma client ready");

        Ok(Self {
            client,
            settings,
            base_url,
            collection_id: Mutex::new(None),
            closed: AtomicBool::new(false),
        })
    }

    fn collections_url(&self) -> String {
        format!(
            "{}/api/v2/tenants/{}/databases/{}/collections",
            self.base_url, self.settings.tenant, self.settings.database
        )
    }

    fn ensure_open(&self) -> IndexResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            Err(IndexError::Closed)
        } else {
            Ok(())
        }
    }

    fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> IndexResult<T> {
        self.ensure_open()?;
        let response = request
            .send()
            .map_err(|e| IndexError::Connection(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().unwrap_or_default();
            return Err(IndexError::Status {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<T>()
            .map_err(|e| IndexError::Malformed(e.to_string()))
    }

    /// Check that the server answers (`GET /api/v2/heartbeat`)
    pub fn heartbeat(&self) -> IndexResult<()> {
        let url = format!("{}/api/v2/heartbeat", self.base_url);
        let _: serde_json::Value = self.execute(self.client.get(url))?;
        Ok(())
    }

    /// Names of collections in the configured database
    pub fn list_collections(&self) -> IndexResult<Vec<String>> {
        let collections: Vec<CollectionModel> =
            self.execute(self.client.get(self.collections_url()))?;
        Ok(collections.into_iter().map(|c| c.name).collect())
    }

    /// Resolve the collection id, optionally creating the collection
    fn collection_id(&self, create: bool) -> IndexResult<String> {
        let mut cached = self
            .collection_id
            .lock()
            .map_err(|_| IndexError::Connection("collection lock poisoned".to_string()))?;
        if let Some(id) = cached.as_ref() {
            return Ok(id.clone());
        }

        let collection: CollectionModel = if create {
            self.execute(self.client.post(self.collections_url()).json(&json!({
                "name": self.settings.collection,
                "get_or_create": true,
                "metadata": { "hnsw:space": "cosine" },
            })))?
        } else {
            let url = format!("{}/{}", self.collections_url(), self.settings.collection);
            self.execute(self.client.get(url))?
        };

        tracing::debug!(collection = %collection.name, id = %collection.id, "resolved chroma collection");
        *cached = Some(collection.id.clone());
        Ok(collection.id)
    }

    fn collection_url(&self, create: bool, action: &str) -> IndexResult<String> {
        let id = self.collection_id(create)?;
        Ok(format!("{}/{}/{}", self.collections_url(), id, action))
    }
}

impl VectorIndex for ChromaIndex {
    fn candidates(&self, query: &[f32], fetch_k: usize) -> IndexResult<Vec<Candidate>> {
        if fetch_k == 0 {
            return Ok(Vec::new());
        }
        let url = self.collection_url(false, "query")?;
        let response: QueryResponse = self.execute(self.client.post(url).json(&json!({
            "query_embeddings": [query],
            "n_results": fetch_k,
            "include": ["metadatas", "documents", "embeddings"],
        })))?;
        parse_query_response(response, query)
    }

    fn add_documents(&self, docs: &[IndexDocument]) -> IndexResult<usize> {
        if docs.is_empty() {
            return Ok(0);
        }
        let url = self.collection_url(true, "upsert")?;
        let body = json!({
            "ids": docs.iter().map(|d| d.id.as_str()).collect::<Vec<_>>(),
            "embeddings": docs.iter().map(|d| d.embedding.as_slice()).collect::<Vec<_>>(),
            "metadatas": docs.iter().map(|d| &d.metadata).collect::<Vec<_>>(),
            "documents": docs.iter().map(|d| d.document.as_str()).collect::<Vec<_>>(),
        });
        let _: serde_json::Value = self.execute(self.client.post(url).json(&body))?;
        Ok(docs.len())
    }

    fn clear(&self) -> IndexResult<()> {
        let url = format!("{}/{}", self.collections_url(), self.settings.collection);
        self.ensure_open()?;
        let response = self
            .client
            .delete(url)
            .send()
            .map_err(|e| IndexError::Connection(e.to_string()))?;
        let status = response.status();
        // a missing collection is already clear
        if !status.is_success() && status.as_u16() != 404 {
            return Err(IndexError::Status {
                status: status.as_u16(),
                message: response.text().unwrap_or_default(),
            });
        }
        if let Ok(mut cached) = self.collection_id.lock() {
            *cached = None;
        }
        Ok(())
    }

    fn count(&self) -> IndexResult<usize> {
        let url = self.collection_url(false, "count")?;
        self.execute(self.client.get(url))
    }

    fn describe(&self) -> IndexResult<IndexInfo> {
        self.heartbeat()?;
        Ok(IndexInfo {
            backend: "chroma".to_string(),
            location: format!("{}/{}", self.base_url, self.settings.collection),
            documents: self.count()?,
            embedding_model: None,
            last_indexed: None,
            collections: self.list_collections()?,
        })
    }

    fn close(&self) -> IndexResult<()> {
        if !self.closed.swap(true, Ordering::SeqCst) {
            tracing::debug!(url = %self.base_url, "closed chroma client");
        }
        Ok(())
    }
}

/// Header carrying the auth token; `Authorization` gets a bearer scheme
fn auth_header(name: &str, token: &str) -> IndexResult<(HeaderName, HeaderValue)> {
    let header = HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| IndexError::Connection(format!("invalid auth header '{}': {}", name, e)))?;
    let value = if header == reqwest::header::AUTHORIZATION && !token.starts_with("Bearer ") {
        format!("Bearer {}", token)
    } else {
        token.to_string()
    };
    let mut value = HeaderValue::from_str(&value)
        .map_err(|e| IndexError::Connection(format!("invalid auth token: {}", e)))?;
    value.set_sensitive(true);
    Ok((header, value))
}

/// Turn the single-query response rows into MMR candidates
fn parse_query_response(response: QueryResponse, query: &[f32]) -> IndexResult<Vec<Candidate>> {
    let ids = response.ids.into_iter().next().unwrap_or_default();
    let n = ids.len();
    if n == 0 {
        return Ok(Vec::new());
    }

    let embeddings = response
        .embeddings
        .and_then(|rows| rows.into_iter().next())
        .ok_or_else(|| IndexError::Malformed("response has no embeddings".to_string()))?;
    if embeddings.len() != n {
        return Err(IndexError::Malformed(format!(
            "{} ids but {} embeddings",
            n,
            embeddings.len()
        )));
    }

    let documents = response
        .documents
        .and_then(|rows| rows.into_iter().next())
        .unwrap_or_default();
    let metadatas = response
        .metadatas
        .and_then(|rows| rows.into_iter().next())
        .unwrap_or_default();

    let mut documents = documents.into_iter();
    let mut metadatas = metadatas.into_iter();

    Ok(embeddings
        .into_iter()
        .map(|embedding| Candidate {
            hit: RetrievalHit {
                score: cosine_similarity(query, &embedding),
                metadata: metadatas.next().flatten().unwrap_or_default(),
                document: documents.next().flatten().unwrap_or_default(),
            },
            embedding,
        })
        .collect())
}
