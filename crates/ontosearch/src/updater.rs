//! Schema evolution of already-indexed documents.
//!
//! Property renames, revalues and removals are applied in place with a
//! scripted update-by-query scoped to the documents of one resource type.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error};

use crate::client::{DynSearchClient, UpdateByQueryRequest};
use crate::document::TYPE_FIELD;
use crate::error::{ClientError, SchemaUpdateError};
use crate::routing::{RoutingTable, is_unclassified};
use crate::script;

/// One property rename.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PropertyRename {
    pub old_name: String,
    pub new_name: String,
    /// Resource type (or resource identifier) whose documents carry the property.
    pub resource_type: String,
    #[serde(default)]
    pub parent_classes: Vec<String>,
}

impl PropertyRename {
    fn is_complete(&self) -> bool {
        !self.old_name.is_empty() && !self.new_name.is_empty() && !self.resource_type.is_empty()
    }
}

/// One property removal.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PropertyRemoval {
    pub name: String,
    pub resource_type: String,
    #[serde(default)]
    pub parent_classes: Vec<String>,
}

/// Applies schema changes to indexed documents.
#[derive(Clone)]
pub struct IndexUpdater {
    client: DynSearchClient,
    routing: Arc<RoutingTable>,
}

impl std::fmt::Debug for IndexUpdater {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexUpdater")
            .field("routing", &self.routing)
            .finish_non_exhaustive()
    }
}

impl IndexUpdater {
    pub fn new(client: DynSearchClient, routing: Arc<RoutingTable>) -> Self {
        Self { client, routing }
    }

    /// Renames properties on every document of a resource type.
    ///
    /// Incomplete entries are ignored. The target index is resolved from the
    /// last complete entry; nothing happens when no entry is complete or the
    /// type is not routed.
    pub async fn update_properties_name(&self, renames: &[PropertyRename]) -> Result<(), SchemaUpdateError> {
        let complete: Vec<&PropertyRename> = renames.iter().filter(|r| r.is_complete()).collect();
        let Some(last) = complete.last() else {
            return Ok(());
        };

        let index = self.find_index(&last.resource_type, &last.parent_classes);
        if is_unclassified(index) {
            debug!(resource_type = %last.resource_type, "Skipping rename for unrouted type");
            return Ok(());
        }

        let script = complete
            .iter()
            .map(|r| script::copy_field(&r.old_name, &r.new_name))
            .chain(complete.iter().map(|r| script::remove_field(&r.old_name)))
            .collect::<Vec<_>>()
            .join(" ");

        self.execute(index, &last.resource_type, &script)
            .await
            .map_err(|source| SchemaUpdateError::FailedToUpdateProperties {
                script,
                resource_type: last.resource_type.clone(),
                source,
            })
    }

    /// Overwrites a property with a list of values.
    pub async fn update_property_value<S: AsRef<str>>(
        &self,
        type_or_id: &str,
        parent_classes: &[String],
        property_name: &str,
        values: &[S],
    ) -> Result<(), SchemaUpdateError> {
        let index = self.find_index(type_or_id, parent_classes);
        if is_unclassified(index) {
            debug!(resource_type = %type_or_id, "Skipping revalue for unrouted type");
            return Ok(());
        }

        let script = script::assign_values(property_name, values);

        self.execute(index, type_or_id, &script)
            .await
            .map_err(|source| SchemaUpdateError::FailedToUpdateProperties {
                script,
                resource_type: type_or_id.to_string(),
                source,
            })
    }

    /// Removes a property. A removal without name or type is a no-op.
    pub async fn delete_property(&self, removal: &PropertyRemoval) -> Result<(), SchemaUpdateError> {
        if removal.name.is_empty() || removal.resource_type.is_empty() {
            return Ok(());
        }

        let index = self.find_index(&removal.resource_type, &removal.parent_classes);
        if is_unclassified(index) {
            debug!(resource_type = %removal.resource_type, "Skipping removal for unrouted type");
            return Ok(());
        }

        let script = script::remove_field(&removal.name);

        self.execute(index, &removal.resource_type, &script)
            .await
            .map_err(|source| SchemaUpdateError::FailedToRemoveProperty {
                script,
                resource_type: removal.resource_type.clone(),
                source,
            })
    }

    /// Returns true when `class` is routed directly to an index.
    pub fn has_class_support(&self, class: &str) -> bool {
        self.routing.has_class_support(class)
    }

    fn find_index(&self, type_or_id: &str, parent_classes: &[String]) -> &str {
        self.routing.index_for_type_or_ancestors(type_or_id, parent_classes)
    }

    async fn execute(&self, index: &str, type_or_id: &str, source: &str) -> Result<(), ClientError> {
        let request = UpdateByQueryRequest {
            index: index.to_string(),
            body: json!({
                "query": {
                    "multi_match": {
                        "query": type_or_id,
                        "fields": [TYPE_FIELD, "_id"],
                    }
                },
                "script": { "source": source }
            }),
            conflicts_proceed: true,
            wait_for_completion: true,
        };

        debug!(index = %index, resource_type = %type_or_id, script = %source, "Updating documents by query");
        match self.client.update_by_query(&request).await {
            Ok(_) => Ok(()),
            Err(e) => {
                error!(index = %index, resource_type = %type_or_id, error = %e, "Update by query failed");
                Err(e)
            }
        }
    }
}
