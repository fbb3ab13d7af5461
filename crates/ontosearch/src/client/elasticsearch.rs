//! [`SearchClient`] on the official Elasticsearch client.

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use elasticsearch::auth::Credentials;
use elasticsearch::cert::CertificateValidation;
use elasticsearch::http::request::JsonBody;
use elasticsearch::http::response::Response;
use elasticsearch::http::transport::{SingleNodeConnectionPool, TransportBuilder};
use elasticsearch::indices::{IndicesCreateParts, IndicesDeleteParts};
use elasticsearch::params::Conflicts;
use elasticsearch::{BulkParts, DeleteParts, Elasticsearch, SearchParts, UpdateByQueryParts};
use serde_json::{Value, json};

use super::{SearchClient, SearchRequest, UpdateByQueryRequest};
use crate::config::{SearchAuth, SearchConfig};
use crate::error::{ClientError, ConfigError};
use crate::schema::IndexDefinition;

/// Elasticsearch-backed search client.
pub struct ElasticsearchClient {
    client: Elasticsearch,
    host: String,
}

impl Debug for ElasticsearchClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElasticsearchClient")
            .field("host", &self.host)
            .finish_non_exhaustive()
    }
}

impl ElasticsearchClient {
    /// Creates a client for the first host of `config`.
    pub fn new(config: &SearchConfig) -> Result<Self, ConfigError> {
        let host = config.primary_host().to_string();
        let client = Self::build_client(&host, config)?;
        Ok(Self { client, host })
    }

    fn build_client(host: &str, config: &SearchConfig) -> Result<Elasticsearch, ConfigError> {
        let parsed_url: elasticsearch::http::Url = host
            .parse()
            .map_err(|e| ConfigError::Invalid(format!("Invalid URL {host}: {e}")))?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);

        let mut builder = TransportBuilder::new(conn_pool)
            .timeout(Duration::from_millis(config.request_timeout_ms));

        if config.disable_certificate_validation {
            builder = builder.cert_validation(CertificateValidation::None);
        }

        if let Some(ref auth) = config.auth {
            builder = match auth {
                SearchAuth::Basic { username, password } => {
                    builder.auth(Credentials::Basic(username.clone(), password.clone()))
                }
                SearchAuth::Bearer { token } => builder.auth(Credentials::Bearer(token.clone())),
            };
        }

        let transport = builder
            .build()
            .map_err(|e| ConfigError::Invalid(format!("Failed to build transport: {e}")))?;

        Ok(Elasticsearch::new(transport))
    }

    pub fn host(&self) -> &str {
        &self.host
    }
}

fn transport_error(action: &str, e: elasticsearch::Error) -> ClientError {
    ClientError::Transport(format!("{action}: {e}"))
}

/// Turns a non-success response into [`ClientError::Rejected`].
async fn check_status(response: Response) -> Result<Response, ClientError> {
    let status = response.status_code();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ClientError::Rejected {
        status: status.as_u16(),
        body,
    })
}

async fn read_json(response: Response, action: &str) -> Result<Value, ClientError> {
    check_status(response)
        .await?
        .json::<Value>()
        .await
        .map_err(|e| ClientError::Transport(format!("Failed to parse {action} response: {e}")))
}

fn empty_hits() -> Value {
    json!({ "hits": { "total": { "value": 0 }, "hits": [] } })
}

#[async_trait]
impl SearchClient for ElasticsearchClient {
    async fn search(&self, request: &SearchRequest) -> Result<Value, ClientError> {
        let indices: Vec<&str> = request.index.iter().map(String::as_str).collect();
        let parts = if indices.is_empty() {
            SearchParts::None
        } else {
            SearchParts::Index(&indices)
        };

        let mut search = self.client.search(parts);
        if let Some(from) = request.from {
            search = search.from(from as i64);
        }
        if let Some(size) = request.size {
            search = search.size(size as i64);
        }
        if request.ignore_not_found {
            search = search.ignore_unavailable(true);
        }

        let response = search
            .body(request.body.clone())
            .send()
            .await
            .map_err(|e| transport_error("Search failed", e))?;

        match read_json(response, "search").await {
            Err(err) if request.ignore_not_found && err.status() == Some(404) => {
                tracing::debug!(index = ?request.index, "Search target missing, returning no hits");
                Ok(empty_hits())
            }
            other => other,
        }
    }

    async fn bulk(&self, body: Vec<Value>) -> Result<Value, ClientError> {
        let body: Vec<JsonBody<Value>> = body.into_iter().map(JsonBody::new).collect();
        let response = self
            .client
            .bulk(BulkParts::None)
            .body(body)
            .send()
            .await
            .map_err(|e| transport_error("Bulk request failed", e))?;
        read_json(response, "bulk").await
    }

    async fn delete(&self, index: &str, id: &str) -> Result<(), ClientError> {
        let response = self
            .client
            .delete(DeleteParts::IndexId(index, id))
            .send()
            .await
            .map_err(|e| transport_error("Failed to delete document", e))?;

        if response.status_code().as_u16() == 404 {
            return Err(ClientError::NotFound(format!("{index}/{id}")));
        }
        check_status(response).await?;
        Ok(())
    }

    async fn update_by_query(&self, request: &UpdateByQueryRequest) -> Result<Value, ClientError> {
        let indices = [request.index.as_str()];
        let mut update = self
            .client
            .update_by_query(UpdateByQueryParts::Index(&indices))
            .wait_for_completion(request.wait_for_completion);
        if request.conflicts_proceed {
            update = update.conflicts(Conflicts::Proceed);
        }

        let response = update
            .body(request.body.clone())
            .send()
            .await
            .map_err(|e| transport_error("Update by query failed", e))?;
        read_json(response, "update by query").await
    }

    async fn create_index(&self, definition: &IndexDefinition) -> Result<(), ClientError> {
        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(&definition.index))
            .body(definition.body.clone())
            .send()
            .await
            .map_err(|e| transport_error("Failed to create index", e))?;

        match check_status(response).await {
            Ok(_) => {
                tracing::debug!(index = %definition.index, "Created index");
                Ok(())
            }
            // An existing index is left untouched
            Err(ClientError::Rejected { body, .. })
                if body.contains("resource_already_exists_exception") =>
            {
                tracing::debug!(index = %definition.index, "Index already exists");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn delete_indices(&self, indices: &[&str]) -> Result<Value, ClientError> {
        let response = self
            .client
            .indices()
            .delete(IndicesDeleteParts::Index(indices))
            .ignore_unavailable(true)
            .send()
            .await
            .map_err(|e| transport_error("Failed to delete indices", e))?;

        let status = response.status_code();
        if status.as_u16() == 404 {
            return Ok(json!({ "acknowledged": true }));
        }
        read_json(response, "delete indices").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_with_valid_host() {
        let config = SearchConfig {
            auth: Some(SearchAuth::Bearer {
                token: "token".into(),
            }),
            disable_certificate_validation: true,
            ..Default::default()
        };
        let client = ElasticsearchClient::new(&config).unwrap();
        assert_eq!(client.host(), "http://localhost:9200");
    }

    #[test]
    fn test_new_with_invalid_host() {
        let config = SearchConfig {
            hosts: vec!["not a url".into()],
            ..Default::default()
        };
        assert!(matches!(
            ElasticsearchClient::new(&config),
            Err(ConfigError::Invalid(_))
        ));
    }
}
