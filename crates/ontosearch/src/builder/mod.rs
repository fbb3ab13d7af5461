//! Conversion of host resources into index documents.
//!
//! A [`DocumentBuilderKind`] is picked from the resource's type; each kind
//! knows which attributes of the resource end up in the document body.

mod resources;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::document::IndexDocument;
use crate::routing::classes;

pub use self::resources::{
    GenericDocumentBuilder, ItemDocumentBuilder, TestTakerDocumentBuilder,
    UnclassifiedDocumentBuilder,
};

/// Property holding the item model of an item resource.
pub const ITEM_MODEL_PROPERTY: &str = "http://www.tao.lu/Ontologies/TAOItem.rdf#ItemModel";

/// Property holding the login of a user resource.
pub const LOGIN_PROPERTY: &str = "http://www.tao.lu/Ontologies/generis.rdf#login";

/// A resource of the host's object model.
pub trait Resource: Send + Sync {
    /// Resource identifier, used as document id.
    fn uri(&self) -> &str;

    fn label(&self) -> String;

    fn comment(&self) -> String {
        String::new()
    }

    /// Type identifiers of the resource, most specific first.
    fn types(&self) -> Vec<String>;

    /// Label of the class the resource is an instance of.
    fn class_label(&self) -> String;

    /// Ancestor classes of the resource's class.
    fn parent_classes(&self) -> Vec<String> {
        Vec::new()
    }

    /// First value of `property`, if any.
    fn property_value(&self, property: &str) -> Option<String>;

    /// Serialized content, for resources that have one (items).
    fn content(&self) -> Option<String> {
        None
    }

    /// Widget-qualified custom properties (`<Widget>_<slug>` → value).
    fn dynamic_properties(&self) -> Map<String, Value> {
        Map::new()
    }

    /// Principals allowed to read the resource.
    fn read_access(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Builds an index document from a resource.
pub trait DocumentBuilder: Send + Sync {
    /// Creates the document, or `None` when the resource cannot be indexed
    /// (no identifier, or no type to route it by).
    ///
    /// `root_type`, when given, replaces the resource's own types in the
    /// document's `type` attribute for builders that store a type list.
    fn create_document(&self, resource: &dyn Resource, root_type: Option<&str>) -> Option<IndexDocument>;
}

/// Available document builders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentBuilderKind {
    Generic,
    Item,
    TestTaker,
    Unclassified,
}

impl DocumentBuilderKind {
    /// Selects the builder for a resource type; unknown types are unclassified.
    pub fn for_resource_type(resource_type: &str) -> Self {
        match resource_type {
            classes::ITEM => Self::Item,
            classes::SUBJECT => Self::TestTaker,
            classes::TEST | classes::GROUP | classes::DELIVERY | classes::DELIVERY_RESULT => {
                Self::Generic
            }
            _ => Self::Unclassified,
        }
    }

    pub fn builder(self) -> &'static dyn DocumentBuilder {
        match self {
            Self::Generic => &GenericDocumentBuilder,
            Self::Item => &ItemDocumentBuilder,
            Self::TestTaker => &TestTakerDocumentBuilder,
            Self::Unclassified => &UnclassifiedDocumentBuilder,
        }
    }
}

/// Builds the document of `resource`, selecting the builder from `root_type`
/// or, when absent, from the resource's first type.
///
/// Returns `None` for resources that must not be indexed.
pub fn build_document(resource: &dyn Resource, root_type: Option<&str>) -> Option<IndexDocument> {
    let first_type = resource.types().into_iter().next().unwrap_or_default();
    let selector = root_type.unwrap_or(&first_type);
    DocumentBuilderKind::for_resource_type(selector)
        .builder()
        .create_document(resource, root_type)
}

/// A resource held as plain data.
///
/// Lets hosts hand exported resources (for instance read from JSON) to the
/// builders without implementing [`Resource`] themselves.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    pub uri: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub types: Vec<String>,
    #[serde(default)]
    pub class_label: String,
    #[serde(default)]
    pub parent_classes: Vec<String>,
    #[serde(default)]
    pub properties: Map<String, Value>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub dynamic_properties: Map<String, Value>,
    #[serde(default)]
    pub read_access: Vec<String>,
}

impl Resource for ResourceSnapshot {
    fn uri(&self) -> &str {
        &self.uri
    }

    fn label(&self) -> String {
        self.label.clone()
    }

    fn comment(&self) -> String {
        self.comment.clone()
    }

    fn types(&self) -> Vec<String> {
        self.types.clone()
    }

    fn class_label(&self) -> String {
        self.class_label.clone()
    }

    fn parent_classes(&self) -> Vec<String> {
        self.parent_classes.clone()
    }

    fn property_value(&self, property: &str) -> Option<String> {
        match self.properties.get(property)? {
            Value::String(s) => Some(s.clone()),
            Value::Array(values) => values.first().map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            }),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    fn content(&self) -> Option<String> {
        self.content.clone()
    }

    fn dynamic_properties(&self) -> Map<String, Value> {
        self.dynamic_properties.clone()
    }

    fn read_access(&self) -> Vec<String> {
        self.read_access.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_selection() {
        assert_eq!(DocumentBuilderKind::for_resource_type(classes::ITEM), DocumentBuilderKind::Item);
        assert_eq!(
            DocumentBuilderKind::for_resource_type(classes::SUBJECT),
            DocumentBuilderKind::TestTaker
        );
        assert_eq!(
            DocumentBuilderKind::for_resource_type(classes::DELIVERY_RESULT),
            DocumentBuilderKind::Generic
        );
        assert_eq!(
            DocumentBuilderKind::for_resource_type("http://example.org/onto#Other"),
            DocumentBuilderKind::Unclassified
        );
    }

    #[test]
    fn test_snapshot_property_value() {
        let snapshot = ResourceSnapshot {
            properties: json!({"a": "x", "b": ["y", "z"], "c": 3, "d": null})
                .as_object()
                .cloned()
                .unwrap(),
            ..Default::default()
        };
        assert_eq!(snapshot.property_value("a").as_deref(), Some("x"));
        assert_eq!(snapshot.property_value("b").as_deref(), Some("y"));
        assert_eq!(snapshot.property_value("c").as_deref(), Some("3"));
        assert_eq!(snapshot.property_value("d"), None);
        assert_eq!(snapshot.property_value("missing"), None);
    }

    #[test]
    fn test_build_document_uses_first_type() {
        let item = ResourceSnapshot {
            uri: "urn:i1".into(),
            types: vec![classes::ITEM.into()],
            ..Default::default()
        };
        let document = build_document(&item, None).unwrap();
        assert!(document.body().contains_key("model"));

        let other = ResourceSnapshot {
            uri: "urn:o1".into(),
            types: vec!["urn:custom".into()],
            comment: "note".into(),
            ..Default::default()
        };
        let document = build_document(&other, None).unwrap();
        assert_eq!(document.body()["comment"], "note");
    }

    #[test]
    fn test_build_document_skips_unindexable_resources() {
        let untyped = ResourceSnapshot {
            uri: "urn:u1".into(),
            label: "untyped".into(),
            ..Default::default()
        };
        assert!(build_document(&untyped, None).is_none());

        let anonymous = ResourceSnapshot {
            types: vec![classes::TEST.into()],
            ..Default::default()
        };
        assert!(build_document(&anonymous, None).is_none());

        let rooted = ResourceSnapshot {
            uri: "urn:u2".into(),
            ..Default::default()
        };
        let document = build_document(&rooted, Some(classes::TEST)).unwrap();
        assert_eq!(document.body()["type"], serde_json::json!([classes::TEST]));
    }
}
