//! Ontosearch: resource indexing and query compilation for Elasticsearch
//!
//! This crate sits between an ontology-backed host application and an
//! Elasticsearch-compatible search engine. It converts host resources into
//! index documents, routes them to per-type indices, writes them in bulk,
//! evolves already-indexed documents when the host's schema changes, and
//! compiles a small user query language into `query_string` requests.
//!
//! # Features
//!
//! - `elasticsearch` (default) - [`client::ElasticsearchClient`], a
//!   [`SearchClient`] on the official Elasticsearch client
//!
//! # Architecture
//!
//! - [`routing`] - Resource type to index routing table
//! - [`document`] / [`builder`] - Index documents and the builders producing them
//! - [`query`] - Query parsing, compilation and read-access filtering
//! - [`indexer`] - Batched bulk indexing and document removal
//! - [`updater`] - Scripted property rename, revalue and removal
//! - [`schema`] - Index definitions
//! - [`client`] - The engine protocol seam
//! - [`service`] - Facade tying the above together
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//!
//! use ontosearch::query::{QueryCompiler, SortDirection};
//! use ontosearch::RoutingTable;
//!
//! let compiler = QueryCompiler::new(Arc::new(RoutingTable::default()));
//! let request = compiler.compile("label:intro", "items", 0, 10, "id", SortDirection::Descending);
//!
//! assert_eq!(request.index.as_deref(), Some("items"));
//! assert_eq!(
//!     request.body["query"]["query_string"]["query"],
//!     "(label:\"intro\")"
//! );
//! ```

#![warn(rustdoc::missing_crate_level_docs)]

pub mod access;
pub mod builder;
pub mod client;
pub mod config;
pub mod document;
pub mod error;
pub mod indexer;
pub mod query;
pub mod report;
pub mod routing;
pub mod schema;
pub mod script;
pub mod service;
pub mod updater;

// Re-export commonly used types at crate root
pub use client::{DynSearchClient, SearchClient, SearchRequest, UpdateByQueryRequest};
pub use config::{SearchAuth, SearchConfig};
pub use document::IndexDocument;
pub use error::{
    ClassificationError, ClientError, ConfigError, QuerySyntaxError, SchemaUpdateError,
    SearchError, SearchResult,
};
pub use indexer::{BatchIndexer, IndexingStats};
pub use report::{Report, ReportKind};
pub use routing::{RouteEntry, RoutingTable, UNCLASSIFIED_INDEX};
pub use service::{Query, ResultSet, SearchService};
pub use updater::{IndexUpdater, PropertyRemoval, PropertyRename};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
