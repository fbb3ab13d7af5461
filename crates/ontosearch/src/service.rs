//! Search service facade.
//!
//! [`SearchService`] ties the query compiler, the batch indexer and the
//! schema updater to one client and one routing table. It is the entry point
//! hosts use for querying, indexing and index administration.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, error, info};

use crate::client::{DynSearchClient, hits, total_hits};
use crate::config::SearchConfig;
use crate::document::IndexDocument;
use crate::error::{ClientError, QuerySyntaxError, SearchResult};
use crate::indexer::{BatchIndexer, IndexingStats};
use crate::query::{AccessControl, QueryCompiler, SortDirection};
use crate::schema::{IndexDefinition, default_index_definitions, load_index_definitions};
use crate::updater::IndexUpdater;

/// Default page size of [`Query`].
pub const DEFAULT_QUERY_LIMIT: usize = 1000;

/// A raw structured query against one index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub index: String,
    pub offset: usize,
    pub limit: usize,
    pub conditions: Vec<String>,
}

impl Query {
    pub fn new(index: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            offset: 0,
            limit: DEFAULT_QUERY_LIMIT,
            conditions: Vec::new(),
        }
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Adds a `query_string` condition; conditions are AND-ed.
    pub fn add_condition(mut self, condition: impl Into<String>) -> Self {
        self.conditions.push(condition.into());
        self
    }

    pub fn query_string(&self) -> String {
        self.conditions.join(" AND ")
    }
}

/// Documents returned by a search, with the engine's total hit count.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    pub documents: Vec<Value>,
    pub total: u64,
}

impl ResultSet {
    /// Reads a search response. Each document is its stored source with
    /// `id` set to the hit's `_id`.
    pub fn from_response(response: &Value) -> Self {
        let documents = hits(response)
            .iter()
            .map(|hit| {
                let mut source = hit
                    .get("_source")
                    .and_then(Value::as_object)
                    .cloned()
                    .unwrap_or_else(Map::new);
                if let Some(id) = hit.get("_id") {
                    source.insert("id".into(), id.clone());
                }
                Value::Object(source)
            })
            .collect();

        Self {
            documents,
            total: total_hits(response),
        }
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Identifiers of the returned documents.
    pub fn ids(&self) -> Vec<&str> {
        self.documents
            .iter()
            .filter_map(|d| d.get("id").and_then(Value::as_str))
            .collect()
    }
}

/// Facade over compilation, indexing and index administration.
#[derive(Clone)]
pub struct SearchService {
    client: DynSearchClient,
    config: Arc<SearchConfig>,
    compiler: QueryCompiler,
    indexer: BatchIndexer,
    updater: IndexUpdater,
}

impl std::fmt::Debug for SearchService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchService")
            .field("config", &self.config)
            .field("compiler", &self.compiler)
            .finish_non_exhaustive()
    }
}

impl SearchService {
    /// Creates a service on `client`.
    pub fn new(client: DynSearchClient, config: SearchConfig) -> Self {
        let routing = Arc::new(config.routing.clone());
        let compiler = QueryCompiler::new(routing.clone());
        let indexer = BatchIndexer::new(client.clone(), routing.clone()).with_batch_size(config.batch_size);
        let updater = IndexUpdater::new(client.clone(), routing);
        Self {
            client,
            config: Arc::new(config),
            compiler,
            indexer,
            updater,
        }
    }

    /// Creates a service with an Elasticsearch client built from `config`.
    #[cfg(feature = "elasticsearch")]
    pub fn from_config(config: SearchConfig) -> Result<Self, crate::error::ConfigError> {
        config.validate()?;
        let client = crate::client::ElasticsearchClient::new(&config)?;
        Ok(Self::new(Arc::new(client), config))
    }

    /// Filters access-controlled queries by the session user's principals.
    pub fn with_access_control(mut self, access: AccessControl) -> Self {
        self.compiler = self.compiler.with_access_control(access);
        self
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn compiler(&self) -> &QueryCompiler {
        &self.compiler
    }

    pub fn indexer(&self) -> &BatchIndexer {
        &self.indexer
    }

    pub fn updater(&self) -> &IndexUpdater {
        &self.updater
    }

    /// Runs a user query against the index serving `resource_type`.
    ///
    /// Every failure is reported as a [`QuerySyntaxError`]; an engine
    /// rejection carries the engine's reason.
    pub async fn query(
        &self,
        query: &str,
        resource_type: &str,
        start: usize,
        count: usize,
        order: &str,
        direction: SortDirection,
    ) -> Result<ResultSet, QuerySyntaxError> {
        let request = self
            .compiler
            .compile(query, resource_type, start, count, order, direction);

        match self.client.search(&request).await {
            Ok(response) => Ok(ResultSet::from_response(&response)),
            Err(e) => Err(Self::query_error(query, &e)),
        }
    }

    fn query_error(query: &str, e: &ClientError) -> QuerySyntaxError {
        let message = match e.status() {
            Some(400) => format!(
                "There is an error in your search query, system returned: {}",
                e.reason().unwrap_or_default()
            ),
            _ => "An unknown error occurred during search".to_string(),
        };
        error!(query = %query, error = %e, "Search failed: {}", message);
        QuerySyntaxError::new(query, message)
    }

    /// Runs a raw structured query.
    pub async fn search(&self, query: &Query) -> SearchResult<ResultSet> {
        let request = self.compiler.compile_raw(
            &query.index,
            &query.query_string(),
            query.offset,
            query.limit,
        );
        debug!(index = %query.index, body = %request.body, "Running structured query");
        let response = self.client.search(&request).await?;
        Ok(ResultSet::from_response(&response))
    }

    /// Indexes documents; returns how many were submitted.
    pub async fn index<I>(&self, documents: I) -> usize
    where
        I: IntoIterator<Item = IndexDocument>,
    {
        self.indexer.build_index(documents).await
    }

    pub async fn index_with_stats<I>(&self, documents: I) -> IndexingStats
    where
        I: IntoIterator<Item = IndexDocument>,
    {
        self.indexer.build_index_with_stats(documents).await
    }

    /// Removes a document; returns false when it is not indexed.
    pub async fn remove(&self, resource_id: &str) -> Result<bool, ClientError> {
        self.indexer.delete_document(resource_id).await
    }

    /// Creates the given indices, stopping at the first failure.
    pub async fn create_indexes(&self, definitions: &[IndexDefinition]) -> Result<(), ClientError> {
        for definition in definitions {
            self.client.create_index(definition).await?;
            info!(index = %definition.index, "Index created");
        }
        Ok(())
    }

    /// Creates the indices declared in a definition file.
    pub async fn create_indexes_from_file(&self, path: impl AsRef<Path>) -> SearchResult<usize> {
        let definitions = load_index_definitions(path).await?;
        self.create_indexes(&definitions).await?;
        Ok(definitions.len())
    }

    /// Creates the indices of the configured definition file, or the
    /// built-in definitions when no file is configured.
    pub async fn create_configured_indexes(&self) -> SearchResult<usize> {
        match self.config.index_file {
            Some(ref path) => self.create_indexes_from_file(path).await,
            None => {
                let definitions = default_index_definitions(&self.config);
                self.create_indexes(&definitions).await?;
                Ok(definitions.len())
            }
        }
    }

    /// Drops every physical index. Missing indices are ignored.
    pub async fn flush(&self) -> Result<Value, ClientError> {
        let indices = self.config.routing.physical_indices();
        info!(indices = %indices.join(","), "Dropping indices");
        self.client.delete_indices(&indices).await
    }

    pub fn supports_custom_index(&self) -> bool {
        true
    }
}
