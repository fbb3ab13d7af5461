//! Index documents.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ClassificationError;

/// Name of the body attribute holding the document's type(s).
pub const TYPE_FIELD: &str = "type";

/// Name of the access property listing principals allowed to read a document.
pub const READ_ACCESS_FIELD: &str = "read_access";

/// The unit of indexing.
///
/// Built once from a host resource by a
/// [`DocumentBuilder`](crate::builder::DocumentBuilder), consumed once by the
/// batch indexer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDocument {
    id: String,
    body: Map<String, Value>,
    #[serde(default)]
    dynamic_properties: Map<String, Value>,
    #[serde(default)]
    access_properties: Map<String, Value>,
}

impl IndexDocument {
    /// Creates a document with the given identifier and body.
    pub fn new(id: impl Into<String>, body: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            body,
            dynamic_properties: Map::new(),
            access_properties: Map::new(),
        }
    }

    /// Sets the widget-qualified custom fields.
    pub fn with_dynamic_properties(mut self, properties: Map<String, Value>) -> Self {
        self.dynamic_properties = properties;
        self
    }

    /// Sets the access-control fields.
    pub fn with_access_properties(mut self, properties: Map<String, Value>) -> Self {
        self.access_properties = properties;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn body(&self) -> &Map<String, Value> {
        &self.body
    }

    pub fn dynamic_properties(&self) -> &Map<String, Value> {
        &self.dynamic_properties
    }

    pub fn access_properties(&self) -> &Map<String, Value> {
        &self.access_properties
    }

    /// Returns the document's type identifiers.
    ///
    /// `body.type` may be a single identifier or a list of them; it must be
    /// present and non-empty.
    pub fn types(&self) -> Result<Vec<&str>, ClassificationError> {
        let missing = || ClassificationError::MissingType {
            document_id: self.id.clone(),
        };
        let invalid = || ClassificationError::InvalidType {
            document_id: self.id.clone(),
        };

        let types = match self.body.get(TYPE_FIELD) {
            None | Some(Value::Null) => return Err(missing()),
            Some(Value::String(s)) => vec![s.as_str()],
            Some(Value::Array(values)) => values
                .iter()
                .map(|v| v.as_str().ok_or_else(invalid))
                .collect::<Result<Vec<_>, _>>()?,
            Some(_) => return Err(invalid()),
        };

        if types.iter().all(|t| t.is_empty()) {
            return Err(missing());
        }
        Ok(types)
    }

    /// Renders `body.type` for log messages.
    pub fn types_string(&self) -> String {
        self.body
            .get(TYPE_FIELD)
            .map(Value::to_string)
            .unwrap_or_else(|| "null".to_string())
    }

    /// Returns the stored source: body, then dynamic, then access properties.
    ///
    /// Later maps overwrite keys of earlier ones.
    pub fn merged_body(&self) -> Map<String, Value> {
        let mut merged = self.body.clone();
        for (key, value) in self
            .dynamic_properties
            .iter()
            .chain(self.access_properties.iter())
        {
            merged.insert(key.clone(), value.clone());
        }
        merged
    }
}
