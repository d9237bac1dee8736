//! Book search MCP server

use anyhow::Result;
use rmcp::{
    handler::server::{tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler, ServiceExt,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use bookfinder::search::browse;
use bookfinder::{FilterCriteria, SearchError, SearchRequest, SearchSession, Services, ValueRange};

/// Filters shared by search and browse
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct FilterParams {
    #[schemars(description = "Exact category, e.g. \"Fiction\"")]
    #[serde(default)]
    pub category: Option<String>,
    #[schemars(description = "Minimum price (inclusive)")]
    #[serde(default)]
    pub min_price: Option<f64>,
    #[schemars(description = "Maximum price (inclusive)")]
    #[serde(default)]
    pub max_price: Option<f64>,
    #[schemars(description = "Earliest publication year (inclusive)")]
    #[serde(default)]
    pub min_year: Option<i32>,
    #[schemars(description = "Latest publication year (inclusive)")]
    #[serde(default)]
    pub max_year: Option<i32>,
    #[schemars(description = "Exact publisher")]
    #[serde(default)]
    pub publisher: Option<String>,
    #[schemars(description = "Case-insensitive substring of the author list")]
    #[serde(default)]
    pub author: Option<String>,
}

impl FilterParams {
    fn criteria(&self) -> FilterCriteria {
        let price_range =
            ValueRange::from_bounds(self.min_price, self.max_price, f64::NEG_INFINITY, f64::INFINITY);
        let year_range = ValueRange::from_bounds(self.min_year, self.max_year, i32::MIN, i32::MAX);
        FilterCriteria {
            category: self.category.clone(),
            price_range,
            year_range,
            publisher: self.publisher.clone(),
            author_substring: self.author.clone().filter(|a| !a.is_empty()),
        }
    }
}

/// Parameters for book_search tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct SearchParams {
    #[schemars(description = "Natural language description of the book wanted")]
    pub query: String,
    #[schemars(description = "Number of books to retrieve (default: 10)")]
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(flatten)]
    pub filters: FilterParams,
}

/// Parameters for book_browse tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct BrowseParams {
    #[schemars(description = "Maximum books to return (default: 20)")]
    #[serde(default = "default_browse_limit")]
    pub limit: usize,
    #[serde(flatten)]
    pub filters: FilterParams,
}

fn default_limit() -> usize {
    10
}

fn default_browse_limit() -> usize {
    20
}

#[derive(Debug, Serialize)]
struct IndexStatusJson {
    embedding_model: String,
    documents: usize,
    backend: String,
    location: String,
    catalog_rows: Option<usize>,
}

fn to_mcp_error(e: SearchError) -> McpError {
    match e {
        SearchError::InvalidRequest(msg) => McpError::invalid_params(msg, None),
        other => McpError::internal_error(other.to_string(), None),
    }
}

fn json_result<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let output = serde_json::to_string_pretty(value).map_err(|e| {
        McpError::internal_error(format!("JSON serialization failed: {}", e), None)
    })?;
    Ok(CallToolResult::success(vec![Content::text(output)]))
}

/// Run blocking pipeline work off the async executor
async fn blocking<T, F>(services: &Arc<Services>, f: F) -> Result<T, McpError>
where
    T: Send + 'static,
    F: FnOnce(&Services) -> bookfinder::Result<T> + Send + 'static,
{
    let services = Arc::clone(services);
    tokio::task::spawn_blocking(move || f(&services))
        .await
        .map_err(|e| McpError::internal_error(format!("worker failed: {}", e), None))?
        .map_err(to_mcp_error)
}

/// Book search MCP service
///
/// One session per server: a newer `book_search` supersedes one still
/// in flight.
#[derive(Clone)]
pub struct BookService {
    services: Arc<Services>,
    session: SearchSession,
    tool_router: ToolRouter<Self>,
}

impl BookService {
    pub fn new(services: Arc<Services>) -> Self {
        Self {
            services,
            session: SearchSession::new(),
            tool_router: Self::tool_router(),
        }
    }
}

#[tool_router]
impl BookService {
    #[tool(description = "Find books by meaning. Retrieves a diverse set of books matching the query, then applies optional category, price, year, publisher and author filters.")]
    async fn book_search(
        &self,
        params: Parameters<SearchParams>,
    ) -> Result<CallToolResult, McpError> {
        let params = params.0;
        let session = self.session.clone();
        let outcome = blocking(&self.services, move |services| {
            let request = SearchRequest::new(params.query, params.limit)
                .with_fetch_multiplier(services.settings.retrieval.fetch_multiplier);
            services.search.search_in_session(
                &session,
                &request,
                &params.filters.criteria(),
                params.limit,
            )
        })
        .await?;
        json_result(&outcome)
    }

    #[tool(description = "List books from the full dataset matching the filters, without semantic search.")]
    async fn book_browse(
        &self,
        params: Parameters<BrowseParams>,
    ) -> Result<CallToolResult, McpError> {
        let params = params.0;
        let outcome = blocking(&self.services, move |services| {
            let catalog = services.catalog()?;
            Ok(browse(
                catalog.records(),
                &params.filters.criteria(),
                params.limit,
            ))
        })
        .await?;
        json_result(&outcome)
    }

    #[tool(description = "List the categories and publishers in the dataset and its price and year bounds.")]
    async fn book_facets(&self) -> Result<CallToolResult, McpError> {
        let facets = blocking(&self.services, |services| Ok(services.catalog()?.facets())).await?;
        json_result(&facets)
    }

    #[tool(description = "Report the vector index backend and how many books it holds.")]
    async fn index_status(&self) -> Result<CallToolResult, McpError> {
        let status = blocking(&self.services, |services| {
            let info = services.index.describe()?;
            Ok(IndexStatusJson {
                embedding_model: services.embedder.model_name().to_string(),
                documents: info.documents,
                backend: info.backend,
                location: info.location,
                catalog_rows: services.catalog().ok().map(|c| c.len()),
            })
        })
        .await?;
        json_result(&status)
    }
}

#[tool_handler]
impl ServerHandler for BookService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(
                "Book finder MCP server. Use book_search for descriptive queries, book_browse to filter the whole dataset, and book_facets to discover valid filter values.".to_string(),
            ),
            ..Default::default()
        }
    }
}

/// Run the MCP server over stdio until the client disconnects
pub async fn run_mcp_server(services: Arc<Services>) -> Result<()> {
    use tokio::io::{stdin, stdout};

    tracing::info!("starting MCP server on stdio");
    let service = BookService::new(services);
    let transport = (stdin(), stdout());
    let server = service.serve(transport).await?;
    server.waiting().await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_params_defaults_and_flattened_filters() {
        let params: SearchParams = serde_json::from_value(serde_json::json!({
            "query": "space opera",
            "category": "Fiction",
            "max_price": 15.0
        }))
        .unwrap();
        assert_eq!(params.limit, 10);

        let criteria = params.filters.criteria();
        assert_eq!(criteria.category.as_deref(), Some("Fiction"));
        let price = criteria.price_range.unwrap();
        assert!(price.contains(0.0) && price.contains(15.0) && !price.contains(15.5));
        assert!(criteria.year_range.is_none());
    }

    #[test]
    fn test_empty_author_is_unset() {
        let filters = FilterParams {
            author: Some(String::new()),
            ..FilterParams::default()
        };
        assert!(filters.criteria().is_unbounded());
    }

    #[test]
    fn test_invalid_request_maps_to_invalid_params() {
        let err = to_mcp_error(SearchError::invalid_request("empty query"));
        assert_eq!(err.code, rmcp::model::ErrorCode::INVALID_PARAMS);

        let err = to_mcp_error(SearchError::unavailable("down"));
        assert_eq!(err.code, rmcp::model::ErrorCode::INTERNAL_ERROR);
    }
}
