//! Query compiler.
//!
//! Translates the user query language into an engine `query_string` request.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use crate::client::SearchRequest;
use crate::query::acl::{AccessControl, UseAcl, access_clause};
use crate::query::block::{QueryBlock, decode_identifier, is_identifier, parse_query};
use crate::routing::{DELIVERY_RESULTS_INDEX, RoutingTable};

/// Fields stored under their own name in every index.
pub const STANDARD_FIELDS: [&str; 14] = [
    "class",
    "parent_classes",
    "content",
    "label",
    "model",
    "login",
    "delivery",
    "test_taker",
    "test_taker_name",
    "delivery_execution",
    "custom_tag",
    "context_id",
    "context_label",
    "resource_link_id",
];

/// Widget prefixes of user-defined property fields (`<Widget>_<slug>`).
pub const WIDGET_PREFIXES: [&str; 8] = [
    "HTMLArea",
    "TextArea",
    "TextBox",
    "ComboBox",
    "CheckBox",
    "RadioBox",
    "SearchTextBox",
    "SearchDropdown",
];

/// Field that sorts by document identifier.
const ID_SORT_FIELD: &str = "id";

/// Sort direction of a compiled query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortDirection {
    #[serde(rename = "ASC")]
    Ascending,
    #[default]
    #[serde(rename = "DESC")]
    Descending,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortDirection::Ascending),
            "desc" | "descending" => Ok(SortDirection::Descending),
            _ => Err(format!("unknown sort direction: {s}")),
        }
    }
}

/// Normalizes a user field name into the slug used by widget-prefixed fields.
///
/// Lowercases, collapses every run of non-alphanumeric characters into one
/// `-` and trims `-` from both ends.
pub fn slugify(field: &str) -> String {
    let mut slug = String::with_capacity(field.len());
    let mut pending_dash = false;
    for c in field.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

/// Returns true when `field` is stored under its own name.
pub fn is_standard_field(field: &str) -> bool {
    let field = field.to_lowercase();
    STANDARD_FIELDS.contains(&field.as_str())
}

/// Compiles user queries into search requests.
#[derive(Debug, Clone)]
pub struct QueryCompiler {
    routing: Arc<RoutingTable>,
    access: Option<AccessControl>,
}

impl QueryCompiler {
    /// Creates a compiler without access control.
    pub fn new(routing: Arc<RoutingTable>) -> Self {
        Self {
            routing,
            access: None,
        }
    }

    /// Enables read-access filtering through the host's providers.
    pub fn with_access_control(mut self, access: AccessControl) -> Self {
        self.access = Some(access);
        self
    }

    pub fn routing(&self) -> &RoutingTable {
        &self.routing
    }

    /// Compiles `query` against the index serving `resource_type`.
    ///
    /// An unknown resource type targets the unclassified sentinel; the request
    /// is still well formed and matches nothing.
    pub fn compile(
        &self,
        query: &str,
        resource_type: &str,
        offset: usize,
        limit: usize,
        sort_field: &str,
        direction: SortDirection,
    ) -> SearchRequest {
        let index = self.routing.index_for_structure(resource_type);
        let blocks = parse_query(query);

        let mut conditions = if index == DELIVERY_RESULTS_INDEX {
            Self::results_conditions(&blocks)
        } else {
            Self::resource_conditions(&blocks)
        };

        if let Some(clause) = self.access_condition(index) {
            conditions.push(clause);
        }

        let sort_field = if sort_field == ID_SORT_FIELD {
            "_id"
        } else {
            sort_field
        };

        let body = json!({
            "query": {
                "query_string": {
                    "default_operator": "AND",
                    "query": conditions.join(" AND "),
                }
            },
            "sort": {
                sort_field: { "order": direction.as_str() }
            }
        });

        debug!(query = %query, resource_type = %resource_type, "Input query");
        debug!(index = %index, body = %body, from = offset, size = limit, "Compiled query");

        SearchRequest {
            index: Some(index.to_string()),
            from: Some(offset),
            size: Some(limit),
            body,
            ignore_not_found: true,
        }
    }

    /// Builds a request for a raw `query_string` expression.
    pub fn compile_raw(&self, index: &str, query_string: &str, offset: usize, limit: usize) -> SearchRequest {
        SearchRequest {
            index: Some(index.to_string()),
            from: None,
            size: None,
            body: json!({
                "query": {
                    "query_string": {
                        "default_operator": "AND",
                        "query": query_string,
                    }
                },
                "size": limit,
                "from": offset,
                "sort": [],
            }),
            ignore_not_found: false,
        }
    }

    fn resource_conditions(blocks: &[QueryBlock]) -> Vec<String> {
        blocks
            .iter()
            .map(|block| match block.field() {
                None => format!("(\"{}\")", block.term()),
                Some(field) if is_standard_field(field) => {
                    format!("({}:\"{}\")", field, block.term())
                }
                Some(field) => Self::custom_condition(field, block.term()),
            })
            .collect()
    }

    // Delivery results only carry plain text; field qualifiers are ignored.
    fn results_conditions(blocks: &[QueryBlock]) -> Vec<String> {
        blocks
            .iter()
            .filter(|block| block.field() != Some("parent_classes"))
            .map(|block| format!("(\"{}\")", block.term()))
            .collect()
    }

    // Encoded property identifiers are already field-safe and keep their case.
    fn custom_condition(field: &str, term: &str) -> String {
        let slug = if is_identifier(&decode_identifier(field)) {
            field.to_string()
        } else {
            slugify(field)
        };
        let alternatives: Vec<String> = WIDGET_PREFIXES
            .iter()
            .map(|prefix| format!("{prefix}_{slug}:\"{term}\""))
            .collect();
        format!("({})", alternatives.join(" OR "))
    }

    fn access_condition(&self, index: &str) -> Option<String> {
        let access = self.access.as_ref()?;
        let user = access.session.current_user();
        UseAcl
            .is_satisfied_by(&self.routing, index, access.permissions.as_ref(), &user)
            .then(|| access_clause(&user))
    }
}

/// Extracts the `query_string.query` expression of a compiled body.
pub fn query_string_of(body: &Value) -> Option<&str> {
    body.pointer("/query/query_string/query")
        .and_then(Value::as_str)
}
