//! Index definitions.
//!
//! An index definition is the body sent to the engine when creating an
//! index: explicit mappings for the standard fields, dynamic templates for
//! widget-prefixed custom fields, shard settings and the `autocomplete`
//! analyzer. Definitions come either from a host-supplied JSON file or from
//! [`default_index_definitions`].

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::config::SearchConfig;
use crate::document::{READ_ACCESS_FIELD, TYPE_FIELD};
use crate::error::ConfigError;
use crate::routing::{
    DELIVERIES_INDEX, DELIVERY_RESULTS_INDEX, ITEMS_INDEX, TEST_TAKERS_INDEX,
};

/// Creation body of one index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDefinition {
    pub index: String,
    #[serde(default)]
    pub body: Value,
}

impl IndexDefinition {
    pub fn new(index: impl Into<String>, body: Value) -> Self {
        Self {
            index: index.into(),
            body,
        }
    }
}

/// Accepted layouts of an index definition file.
#[derive(Deserialize)]
#[serde(untagged)]
enum DefinitionFile {
    List(Vec<IndexDefinition>),
    Keyed(BTreeMap<String, KeyedDefinition>),
}

#[derive(Deserialize)]
struct KeyedDefinition {
    #[serde(default)]
    index: Option<String>,
    #[serde(default)]
    body: Value,
}

/// Reads index definitions from a JSON file.
///
/// The file holds either a list of `{ "index", "body" }` objects or an object
/// keyed by index name (the key is used when `index` is omitted).
pub async fn load_index_definitions(path: impl AsRef<Path>) -> Result<Vec<IndexDefinition>, ConfigError> {
    let path = path.as_ref();
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
    let parsed: DefinitionFile = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })?;

    let definitions: Vec<IndexDefinition> = match parsed {
        DefinitionFile::List(definitions) => definitions,
        DefinitionFile::Keyed(entries) => entries
            .into_iter()
            .map(|(key, entry)| IndexDefinition::new(entry.index.unwrap_or(key), entry.body))
            .collect(),
    };

    if let Some(unnamed) = definitions.iter().position(|d| d.index.is_empty()) {
        return Err(ConfigError::Invalid(format!(
            "index definition #{unnamed} in {} has no index name",
            path.display()
        )));
    }

    tracing::debug!(path = %path.display(), count = definitions.len(), "Loaded index definitions");
    Ok(definitions)
}

/// Builds the definitions of every physical index of the routing table.
pub fn default_index_definitions(config: &SearchConfig) -> Vec<IndexDefinition> {
    let settings = index_settings(config);
    config
        .routing
        .physical_indices()
        .into_iter()
        .map(|index| {
            let mut properties = base_properties();
            properties.extend(index_properties(index));
            if config.routing.is_access_controlled(index) {
                properties.insert(READ_ACCESS_FIELD.to_string(), keyword());
            }
            IndexDefinition::new(
                index,
                json!({
                    "mappings": {
                        "properties": properties,
                        "dynamic_templates": dynamic_templates(),
                    },
                    "settings": settings,
                }),
            )
        })
        .collect()
}

/// Shard settings and the `autocomplete` analyzer.
pub fn index_settings(config: &SearchConfig) -> Value {
    json!({
        "index": {
            "number_of_shards": config.number_of_shards,
            "number_of_replicas": config.number_of_replicas,
        },
        "analysis": {
            "filter": {
                "autocomplete_filter": {
                    "type": "edge_ngram",
                    "min_gram": config.autocomplete.min_gram,
                    "max_gram": config.autocomplete.max_gram,
                }
            },
            "analyzer": {
                "autocomplete": {
                    "type": "custom",
                    "tokenizer": "standard",
                    "filter": ["lowercase", "autocomplete_filter"]
                }
            }
        }
    })
}

/// Dynamic templates mapping `<Widget>_*` fields.
///
/// Free-text widgets map to `text`, choice widgets to `keyword`.
pub fn dynamic_templates() -> Value {
    const TEXT_WIDGETS: [&str; 4] = ["HTMLArea", "TextArea", "TextBox", "SearchTextBox"];
    const KEYWORD_WIDGETS: [&str; 4] = ["CheckBox", "ComboBox", "RadioBox", "SearchDropdown"];

    let template = |widget: &str, mapping_type: &str| {
        json!({
            widget: {
                "match": format!("{widget}_*"),
                "match_mapping_type": "string",
                "mapping": { "type": mapping_type }
            }
        })
    };

    Value::Array(
        TEXT_WIDGETS
            .into_iter()
            .map(|w| template(w, "text"))
            .chain(KEYWORD_WIDGETS.into_iter().map(|w| template(w, "keyword")))
            .collect(),
    )
}

fn keyword() -> Value {
    json!({ "type": "keyword", "ignore_above": 256 })
}

fn base_properties() -> Map<String, Value> {
    let mut properties = Map::new();
    properties.insert("class".into(), keyword());
    properties.insert("parent_classes".into(), keyword());
    properties.insert(
        "label".into(),
        json!({
            "type": "text",
            "store": true,
            "fields": { "autocomplete": { "type": "text", "analyzer": "autocomplete" } }
        }),
    );
    properties.insert(TYPE_FIELD.into(), keyword());
    properties
}

fn index_properties(index: &str) -> Map<String, Value> {
    let mut properties = Map::new();
    match index {
        ITEMS_INDEX => {
            properties.insert("content".into(), json!({ "type": "text" }));
            properties.insert("model".into(), keyword());
        }
        TEST_TAKERS_INDEX => {
            properties.insert("login".into(), keyword());
        }
        DELIVERIES_INDEX => {
            properties.insert("comment".into(), json!({ "type": "text" }));
        }
        DELIVERY_RESULTS_INDEX => {
            for field in [
                "delivery",
                "test_taker",
                "delivery_execution",
                "custom_tag",
                "context_id",
                "resource_link_id",
            ] {
                properties.insert(field.into(), keyword());
            }
            properties.insert("test_taker_name".into(), json!({ "type": "text" }));
            properties.insert("context_label".into(), json!({ "type": "text" }));
        }
        _ => {}
    }
    properties
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::{ASSETS_INDEX, UNCLASSIFIED_INDEX};

    #[test]
    fn test_default_definitions_cover_physical_indices() {
        let config = SearchConfig::default();
        let definitions = default_index_definitions(&config);
        assert_eq!(definitions.len(), 8);
        assert!(definitions.iter().all(|d| d.index != UNCLASSIFIED_INDEX));

        let items = definitions.iter().find(|d| d.index == ITEMS_INDEX).unwrap();
        let properties = &items.body["mappings"]["properties"];
        assert_eq!(properties["model"]["type"], "keyword");
        assert_eq!(properties["read_access"]["type"], "keyword");
        assert_eq!(items.body["settings"]["index"]["number_of_shards"], 1);
    }

    #[test]
    fn test_read_access_only_on_controlled_indices() {
        let definitions = default_index_definitions(&SearchConfig::default());
        let get = |name: &str| definitions.iter().find(|d| d.index == name).unwrap();
        assert!(get(ASSETS_INDEX).body["mappings"]["properties"].get("read_access").is_some());
        assert!(get(DELIVERIES_INDEX).body["mappings"]["properties"].get("read_access").is_none());
        assert_eq!(
            get(TEST_TAKERS_INDEX).body["mappings"]["properties"]["login"]["type"],
            "keyword"
        );
    }

    #[test]
    fn test_autocomplete_analyzer_settings() {
        let settings = index_settings(&SearchConfig::default());
        let filter = &settings["analysis"]["filter"]["autocomplete_filter"];
        assert_eq!(filter["type"], "edge_ngram");
        assert_eq!(filter["min_gram"], 1);
        assert_eq!(filter["max_gram"], 100);
        assert_eq!(settings["analysis"]["analyzer"]["autocomplete"]["tokenizer"], "standard");
    }

    #[test]
    fn test_dynamic_templates_cover_all_widgets() {
        let templates = dynamic_templates();
        let templates = templates.as_array().unwrap();
        assert_eq!(templates.len(), 8);
        assert_eq!(templates[0]["HTMLArea"]["match"], "HTMLArea_*");
        assert_eq!(templates[0]["HTMLArea"]["mapping"]["type"], "text");
        assert_eq!(templates[4]["CheckBox"]["mapping"]["type"], "keyword");
    }

    #[tokio::test]
    async fn test_load_list_and_keyed_files() {
        let dir = tempfile::tempdir().unwrap();

        let list = dir.path().join("list.json");
        std::fs::write(
            &list,
            r#"[{"index": "items", "body": {"mappings": {}}}, {"index": "tests"}]"#,
        )
        .unwrap();
        let definitions = load_index_definitions(&list).await.unwrap();
        assert_eq!(definitions.len(), 2);
        assert_eq!(definitions[1].index, "tests");
        assert!(definitions[1].body.is_null());

        let keyed = dir.path().join("keyed.json");
        std::fs::write(&keyed, r#"{"items": {"body": {}}, "x": {"index": "tests"}}"#).unwrap();
        let definitions = load_index_definitions(&keyed).await.unwrap();
        let names: Vec<&str> = definitions.iter().map(|d| d.index.as_str()).collect();
        assert_eq!(names, vec!["items", "tests"]);
    }

    #[tokio::test]
    async fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_index_definitions(dir.path().join("missing.json")).await,
            Err(ConfigError::Io { .. })
        ));

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "42").unwrap();
        assert!(matches!(
            load_index_definitions(&bad).await,
            Err(ConfigError::Parse { .. })
        ));

        let unnamed = dir.path().join("unnamed.json");
        std::fs::write(&unnamed, r#"[{"index": ""}]"#).unwrap();
        assert!(matches!(
            load_index_definitions(&unnamed).await,
            Err(ConfigError::Invalid(_))
        ));
    }
}
