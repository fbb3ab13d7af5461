//! Error types for the indexing and query layer.
//!
//! Errors are grouped by the part of the system that raises them: query
//! compilation and execution, document classification, schema evolution,
//! the search-engine client, and configuration loading.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use serde_json::Value;
use thiserror::Error;

/// The primary error type for all search operations.
#[derive(Error, Debug)]
pub enum SearchError {
    /// The engine rejected (or failed to run) a compiled user query.
    #[error(transparent)]
    QuerySyntax(#[from] QuerySyntaxError),

    /// A document's type could not be determined.
    #[error(transparent)]
    Classification(#[from] ClassificationError),

    /// A scripted update-by-query failed.
    #[error(transparent)]
    SchemaUpdate(#[from] SchemaUpdateError),

    /// The search-engine client failed.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// Configuration or index definitions could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for search operations.
pub type SearchResult<T> = Result<T, SearchError>;

/// A user query could not be executed.
///
/// Carries the query text exactly as the user typed it, so it can be echoed
/// back next to the diagnostic.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} (query: {query:?})")]
pub struct QuerySyntaxError {
    pub query: String,
    pub message: String,
}

impl QuerySyntaxError {
    /// Creates a new query syntax error.
    pub fn new(query: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            message: message.into(),
        }
    }
}

/// Errors raised while resolving the type of an index document.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClassificationError {
    #[error("type property is undefined on document {document_id}")]
    MissingType { document_id: String },

    #[error("type property of document {document_id} is not a type identifier or a list of them")]
    InvalidType { document_id: String },
}

impl ClassificationError {
    /// Returns the identifier of the offending document.
    pub fn document_id(&self) -> &str {
        match self {
            Self::MissingType { document_id } | Self::InvalidType { document_id } => document_id,
        }
    }
}

/// Errors raised by the schema evolution engine.
///
/// These are never swallowed: the host needs to know that stored documents
/// still carry the old property layout.
#[derive(Error, Debug)]
pub enum SchemaUpdateError {
    #[error(
        "failed to update properties by script `{script}` for type {resource_type}: {source}"
    )]
    FailedToUpdateProperties {
        script: String,
        resource_type: String,
        #[source]
        source: ClientError,
    },

    #[error("failed to remove property by script `{script}` for type {resource_type}: {source}")]
    FailedToRemoveProperty {
        script: String,
        resource_type: String,
        #[source]
        source: ClientError,
    },
}

impl SchemaUpdateError {
    /// Returns the script that was submitted.
    pub fn script(&self) -> &str {
        match self {
            Self::FailedToUpdateProperties { script, .. }
            | Self::FailedToRemoveProperty { script, .. } => script,
        }
    }

    /// Returns the resource type (or identifier) the update was scoped to.
    pub fn resource_type(&self) -> &str {
        match self {
            Self::FailedToUpdateProperties { resource_type, .. }
            | Self::FailedToRemoveProperty { resource_type, .. } => resource_type,
        }
    }
}

/// Errors returned by a [`SearchClient`](crate::client::SearchClient).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// The addressed index or document does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The engine answered with a non-success status.
    #[error("request rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    /// The request never produced a response (connection, timeout, decoding).
    #[error("transport failure: {0}")]
    Transport(String),
}

impl ClientError {
    /// Returns the HTTP status of a rejected request.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            Self::NotFound(_) => Some(404),
            Self::Transport(_) => None,
        }
    }

    /// Extracts `error.reason` from a rejected request's JSON body.
    pub fn reason(&self) -> Option<String> {
        let Self::Rejected { body, .. } = self else {
            return None;
        };
        let parsed: Value = serde_json::from_str(body).ok()?;
        parsed
            .get("error")
            .and_then(|e| e.get("reason"))
            .and_then(|r| r.as_str())
            .map(String::from)
    }
}

/// Errors raised while loading configuration or index definitions.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
