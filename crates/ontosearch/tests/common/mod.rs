//! Test infrastructure shared by the integration tests.
//!
//! [`MockSearchClient`] keeps indexed documents in memory, records every
//! request it receives and can be told to fail specific operations.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ontosearch::builder::ResourceSnapshot;
use ontosearch::schema::IndexDefinition;
use ontosearch::{ClientError, IndexDocument, SearchClient, SearchRequest, UpdateByQueryRequest};
use serde_json::{Map, Value, json};

#[derive(Debug, Default)]
pub struct MockState {
    pub documents: BTreeMap<(String, String), Value>,
    pub created_indices: Vec<IndexDefinition>,
    pub deleted_indices: Vec<Vec<String>>,
    pub bulk_calls: Vec<Vec<Value>>,
    pub search_calls: Vec<SearchRequest>,
    pub delete_calls: Vec<(String, String)>,
    pub update_calls: Vec<UpdateByQueryRequest>,
    pub fail_search: Option<ClientError>,
    pub fail_bulk: Option<ClientError>,
    pub fail_update: Option<ClientError>,
    pub fail_create: Option<ClientError>,
    pub report_bulk_errors: bool,
}

#[derive(Debug, Clone, Default)]
pub struct MockSearchClient {
    state: Arc<Mutex<MockState>>,
}

impl MockSearchClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    pub fn fail_search(&self, error: ClientError) {
        self.state().fail_search = Some(error);
    }

    pub fn fail_bulk(&self, error: ClientError) {
        self.state().fail_bulk = Some(error);
    }

    pub fn fail_update(&self, error: ClientError) {
        self.state().fail_update = Some(error);
    }

    pub fn fail_create(&self, error: ClientError) {
        self.state().fail_create = Some(error);
    }

    pub fn report_bulk_errors(&self) {
        self.state().report_bulk_errors = true;
    }

    /// Stores a document directly, bypassing bulk indexing.
    pub fn insert(&self, index: &str, id: &str, source: Value) {
        self.state()
            .documents
            .insert((index.to_string(), id.to_string()), source);
    }

    pub fn document(&self, index: &str, id: &str) -> Option<Value> {
        self.state()
            .documents
            .get(&(index.to_string(), id.to_string()))
            .cloned()
    }

    pub fn document_count(&self) -> usize {
        self.state().documents.len()
    }

    pub fn bulk_call_sizes(&self) -> Vec<usize> {
        self.state().bulk_calls.iter().map(|c| c.len() / 2).collect()
    }

    fn hit(index: &str, id: &str, source: &Value) -> Value {
        json!({ "_index": index, "_id": id, "_source": source })
    }
}

#[async_trait]
impl SearchClient for MockSearchClient {
    async fn search(&self, request: &SearchRequest) -> Result<Value, ClientError> {
        let mut state = self.state();
        state.search_calls.push(request.clone());
        if let Some(ref error) = state.fail_search {
            return Err(error.clone());
        }

        let ids: Option<BTreeSet<String>> = request
            .body
            .pointer("/query/ids/values")
            .and_then(Value::as_array)
            .map(|values| {
                values
                    .iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect()
            });

        let hits: Vec<Value> = state
            .documents
            .iter()
            .filter(|((index, _), _)| request.index.as_deref().is_none_or(|target| target == index.as_str()))
            .filter(|((_, id), _)| ids.as_ref().is_none_or(|ids| ids.contains(id)))
            .map(|((index, id), source)| Self::hit(index, id, source))
            .collect();

        Ok(json!({ "hits": { "total": { "value": hits.len() }, "hits": hits } }))
    }

    async fn bulk(&self, body: Vec<Value>) -> Result<Value, ClientError> {
        let mut state = self.state();
        state.bulk_calls.push(body.clone());
        if let Some(ref error) = state.fail_bulk {
            return Err(error.clone());
        }

        let mut items = Vec::new();
        for pair in body.chunks(2) {
            let action = &pair[0]["index"];
            let index = action["_index"].as_str().unwrap_or_default().to_string();
            let id = action["_id"].as_str().unwrap_or_default().to_string();
            state.documents.insert((index.clone(), id.clone()), pair[1].clone());
            items.push(json!({ "index": { "_index": index, "_id": id, "status": 201 } }));
        }

        Ok(json!({ "errors": state.report_bulk_errors, "items": items }))
    }

    async fn delete(&self, index: &str, id: &str) -> Result<(), ClientError> {
        let mut state = self.state();
        state.delete_calls.push((index.to_string(), id.to_string()));
        state
            .documents
            .remove(&(index.to_string(), id.to_string()))
            .map(|_| ())
            .ok_or_else(|| ClientError::NotFound(format!("{index}/{id}")))
    }

    async fn update_by_query(&self, request: &UpdateByQueryRequest) -> Result<Value, ClientError> {
        let mut state = self.state();
        state.update_calls.push(request.clone());
        if let Some(ref error) = state.fail_update {
            return Err(error.clone());
        }
        Ok(json!({ "updated": 0, "failures": [] }))
    }

    async fn create_index(&self, definition: &IndexDefinition) -> Result<(), ClientError> {
        let mut state = self.state();
        if let Some(ref error) = state.fail_create {
            return Err(error.clone());
        }
        state.created_indices.push(definition.clone());
        Ok(())
    }

    async fn delete_indices(&self, indices: &[&str]) -> Result<Value, ClientError> {
        let mut state = self.state();
        state
            .deleted_indices
            .push(indices.iter().map(|i| i.to_string()).collect());
        state
            .documents
            .retain(|(index, _), _| !indices.contains(&index.as_str()));
        Ok(json!({ "acknowledged": true }))
    }
}

/// Builds a document with the given type value.
pub fn document(id: &str, resource_type: Value) -> IndexDocument {
    let mut body = Map::new();
    body.insert("label".into(), json!(format!("label of {id}")));
    body.insert("type".into(), resource_type);
    IndexDocument::new(id, body)
}

/// Builds `count` documents of `resource_type`.
pub fn documents(count: usize, resource_type: &str) -> Vec<IndexDocument> {
    (0..count)
        .map(|i| document(&format!("urn:doc:{i}"), json!(resource_type)))
        .collect()
}

pub fn resource(uri: &str, resource_type: &str, label: &str) -> ResourceSnapshot {
    ResourceSnapshot {
        uri: uri.to_string(),
        label: label.to_string(),
        types: vec![resource_type.to_string()],
        class_label: "Class".to_string(),
        ..Default::default()
    }
}

pub fn rejected(status: u16, reason: &str) -> ClientError {
    ClientError::Rejected {
        status,
        body: json!({ "error": { "type": "query_shard_exception", "reason": reason }, "status": status })
            .to_string(),
    }
}
