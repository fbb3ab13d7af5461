//! Search-engine wire protocol.
//!
//! [`SearchClient`] is the seam between the indexing/query layer and the
//! engine. The crate ships an Elasticsearch implementation behind the
//! `elasticsearch` feature; tests use in-memory doubles.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ClientError;
use crate::schema::IndexDefinition;

#[cfg(feature = "elasticsearch")]
mod elasticsearch;

#[cfg(feature = "elasticsearch")]
pub use self::elasticsearch::ElasticsearchClient;

/// A search request against one index, or every index when `index` is `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub index: Option<String>,
    pub from: Option<usize>,
    pub size: Option<usize>,
    pub body: Value,
    /// Treat a missing index as an empty result instead of an error.
    pub ignore_not_found: bool,
}

impl SearchRequest {
    /// Creates a request with only a body.
    pub fn new(index: Option<String>, body: Value) -> Self {
        Self {
            index,
            from: None,
            size: None,
            body,
            ignore_not_found: false,
        }
    }
}

/// A scripted update-by-query request.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateByQueryRequest {
    pub index: String,
    pub body: Value,
    /// Skip version conflicts instead of aborting.
    pub conflicts_proceed: bool,
    pub wait_for_completion: bool,
}

/// Operations the indexing and query layer needs from the engine.
#[async_trait]
pub trait SearchClient: Send + Sync {
    /// Runs a search and returns the raw response body.
    async fn search(&self, request: &SearchRequest) -> Result<Value, ClientError>;

    /// Submits a bulk body (alternating action and source lines).
    ///
    /// Returns the raw response, whose `errors` flag reports per-item failures.
    async fn bulk(&self, body: Vec<Value>) -> Result<Value, ClientError>;

    /// Deletes one document.
    async fn delete(&self, index: &str, id: &str) -> Result<(), ClientError>;

    async fn update_by_query(&self, request: &UpdateByQueryRequest) -> Result<Value, ClientError>;

    /// Creates an index from its definition.
    async fn create_index(&self, definition: &IndexDefinition) -> Result<(), ClientError>;

    /// Drops indices. Missing indices are ignored.
    async fn delete_indices(&self, indices: &[&str]) -> Result<Value, ClientError>;
}

/// Shared handle to a search client.
pub type DynSearchClient = Arc<dyn SearchClient>;

/// Reads `hits.total` from a search response.
///
/// Engines before 7.0 report a bare number, later ones `{ "value": n }`.
pub fn total_hits(response: &Value) -> u64 {
    match response.pointer("/hits/total") {
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
        Some(total) => total.get("value").and_then(Value::as_u64).unwrap_or(0),
        None => 0,
    }
}

/// Returns the `hits.hits` array of a search response.
pub fn hits(response: &Value) -> &[Value] {
    response
        .pointer("/hits/hits")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}
