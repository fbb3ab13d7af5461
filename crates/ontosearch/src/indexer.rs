//! Batch indexing.
//!
//! Documents are routed to their index by type and written with bulk
//! requests of a fixed size. Input is consumed in a single pass, so large
//! lazy iterators can be indexed without buffering more than one batch.

use std::sync::Arc;

use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::client::{DynSearchClient, SearchRequest, hits, total_hits};
use crate::document::IndexDocument;
use crate::error::{ClassificationError, ClientError};
use crate::routing::{RoutingTable, is_unclassified};

/// Default number of documents per bulk request.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Counters of one indexing run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexingStats {
    /// Documents read from the input.
    pub visited: usize,
    /// Documents routed to the unclassified sentinel.
    pub skipped: usize,
    /// Documents whose type could not be read.
    pub exceptions: usize,
    /// Documents submitted in a bulk request.
    pub queued: usize,
    /// Bulk requests sent.
    pub flushes: usize,
}

impl IndexingStats {
    /// Returns true when every visited document was queued.
    pub fn is_clean(&self) -> bool {
        self.queued == self.visited && self.skipped == 0 && self.exceptions == 0
    }
}

/// Writes documents to the engine in bulk batches.
#[derive(Clone)]
pub struct BatchIndexer {
    client: DynSearchClient,
    routing: Arc<RoutingTable>,
    batch_size: usize,
}

impl std::fmt::Debug for BatchIndexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchIndexer")
            .field("batch_size", &self.batch_size)
            .finish_non_exhaustive()
    }
}

impl BatchIndexer {
    pub fn new(client: DynSearchClient, routing: Arc<RoutingTable>) -> Self {
        Self {
            client,
            routing,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Sets the number of documents per bulk request. Zero is treated as one.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Resolves the index of a document from its types.
    pub fn index_for_document(&self, document: &IndexDocument) -> Result<&str, ClassificationError> {
        let types = document.types()?;
        Ok(self.routing.index_for_types(&types))
    }

    /// Indexes `documents` and returns how many were submitted.
    pub async fn build_index<I>(&self, documents: I) -> usize
    where
        I: IntoIterator<Item = IndexDocument>,
    {
        self.build_index_with_stats(documents).await.queued
    }

    /// Indexes `documents` and returns the run's counters.
    ///
    /// Unclassifiable documents are logged and counted, never fatal. Bulk
    /// failures are logged; documents of a failed batch still count as queued.
    pub async fn build_index_with_stats<I>(&self, documents: I) -> IndexingStats
    where
        I: IntoIterator<Item = IndexDocument>,
    {
        let mut stats = IndexingStats::default();
        let mut batch: Vec<Value> = Vec::with_capacity(self.batch_size.min(DEFAULT_BATCH_SIZE) * 2);
        let mut pending = 0usize;

        for document in documents {
            stats.visited += 1;

            let index = match self.index_for_document(&document) {
                Ok(index) => index,
                Err(e) => {
                    warn!(document_id = %document.id(), error = %e, "Caught classification error");
                    stats.exceptions += 1;
                    continue;
                }
            };

            info!(
                document_id = %document.id(),
                index = %index,
                types = %document.types_string(),
                "Using index for document types"
            );

            if is_unclassified(index) {
                warn!(
                    document_id = %document.id(),
                    types = %document.types_string(),
                    "No proper index for document"
                );
                self.log_mappings(&document);
                stats.skipped += 1;
                continue;
            }

            info!(document_id = %document.id(), "Queuing document");
            batch.push(json!({ "index": { "_index": index, "_id": document.id() } }));
            batch.push(Value::Object(document.merged_body()));
            pending += 1;

            if pending == self.batch_size {
                debug!(document_id = %document.id(), operations = batch.len(), "Flushing batch");
                self.flush(std::mem::take(&mut batch)).await;
                stats.queued += pending;
                stats.flushes += 1;
                pending = 0;
            }
        }

        if pending > 0 {
            debug!(operations = batch.len(), "Flushing batch");
            self.flush(batch).await;
            stats.queued += pending;
            stats.flushes += 1;
        }

        Self::log_completion(&stats);
        stats
    }

    /// Deletes the document with `id` from whichever index holds it.
    ///
    /// Returns false, without issuing a delete, when no index holds it.
    pub async fn delete_document(&self, id: &str) -> Result<bool, ClientError> {
        let Some(hit) = self.search_resource_by_ids(&[id]).await? else {
            debug!(document_id = %id, "Document not found, nothing to delete");
            return Ok(false);
        };

        let Some(index) = hit.get("_index").and_then(Value::as_str).filter(|i| !i.is_empty()) else {
            warn!(document_id = %id, hit = %hit, "Lookup hit carries no index, nothing to delete");
            return Ok(false);
        };
        let doc_id = hit.get("_id").and_then(Value::as_str).unwrap_or(id);
        self.client.delete(index, doc_id).await?;
        info!(document_id = %doc_id, index = %index, "Deleted document");
        Ok(true)
    }

    /// Returns the first hit of an identifier lookup across all indices.
    pub async fn search_resource_by_ids(&self, ids: &[&str]) -> Result<Option<Value>, ClientError> {
        let request = SearchRequest::new(None, json!({ "query": { "ids": { "values": ids } } }));
        let response = self.client.search(&request).await?;

        if total_hits(&response) == 0 {
            return Ok(None);
        }
        Ok(hits(&response).first().cloned())
    }

    async fn flush(&self, body: Vec<Value>) {
        match self.client.bulk(body).await {
            Ok(response) => {
                if response.get("errors").and_then(Value::as_bool).unwrap_or(false) {
                    warn!(response = %response, "Unexpected error response from client");
                }
            }
            Err(e) => {
                warn!(error = %e, "Bulk request failed");
            }
        }
    }

    fn log_mappings(&self, document: &IndexDocument) {
        for entry in self.routing.entries() {
            warn!(
                document_id = %document.id(),
                resource_type = %entry.resource_type,
                index = %entry.index,
                "Index mapping"
            );
        }
    }

    fn log_completion(stats: &IndexingStats) {
        if stats.is_clean() {
            debug!("Processed {} items (no exceptions, no skipped items)", stats.queued);
        } else {
            warn!(
                "{} / {} items were processed ({} skipped, {} exceptions)",
                stats.queued, stats.visited, stats.skipped, stats.exceptions
            );
        }
    }
}
