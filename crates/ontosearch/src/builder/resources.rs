//! Per-kind document builders.

use serde_json::{Map, Value, json};

use super::{DocumentBuilder, ITEM_MODEL_PROPERTY, LOGIN_PROPERTY, Resource};
use crate::document::{IndexDocument, READ_ACCESS_FIELD, TYPE_FIELD};

fn first_type(resource: &dyn Resource) -> Value {
    resource
        .types()
        .into_iter()
        .find(|t| !t.is_empty())
        .map_or(Value::Null, Value::String)
}

/// `[root_type]` when given, otherwise every type of the resource.
fn type_list(resource: &dyn Resource, root_type: Option<&str>) -> Value {
    match root_type {
        Some(root) if !root.is_empty() => json!([root]),
        _ => json!(resource.types()),
    }
}

/// A resource is indexable when it has an identifier and a type, either its
/// own or the root type it is indexed under.
fn is_indexable(resource: &dyn Resource, root_type: Option<&str>) -> bool {
    !resource.uri().is_empty()
        && (root_type.is_some_and(|root| !root.is_empty())
            || resource.types().iter().any(|t| !t.is_empty()))
}

fn base_body(resource: &dyn Resource) -> Map<String, Value> {
    let mut body = Map::new();
    body.insert("class".into(), Value::String(resource.class_label()));
    body.insert("label".into(), Value::String(resource.label()));
    body
}

/// Builder for test, group, delivery and delivery result resources.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericDocumentBuilder;

impl DocumentBuilder for GenericDocumentBuilder {
    fn create_document(&self, resource: &dyn Resource, root_type: Option<&str>) -> Option<IndexDocument> {
        if !is_indexable(resource, root_type) {
            return None;
        }
        let mut body = base_body(resource);
        body.insert(TYPE_FIELD.into(), type_list(resource, root_type));

        let parent_classes = resource.parent_classes();
        if !parent_classes.is_empty() {
            body.insert("parent_classes".into(), json!(parent_classes));
        }

        let mut access = Map::new();
        let principals = resource.read_access();
        if !principals.is_empty() {
            access.insert(READ_ACCESS_FIELD.into(), json!(principals));
        }

        Some(
            IndexDocument::new(resource.uri(), body)
                .with_dynamic_properties(resource.dynamic_properties())
                .with_access_properties(access),
        )
    }
}

/// Builder for items: adds the serialized content and the item model.
#[derive(Debug, Clone, Copy, Default)]
pub struct ItemDocumentBuilder;

impl DocumentBuilder for ItemDocumentBuilder {
    fn create_document(&self, resource: &dyn Resource, _root_type: Option<&str>) -> Option<IndexDocument> {
        if !is_indexable(resource, None) {
            return None;
        }
        let mut body = Map::new();
        body.insert("class".into(), Value::String(resource.class_label()));
        body.insert(
            "content".into(),
            Value::String(resource.content().unwrap_or_default()),
        );
        body.insert("label".into(), Value::String(resource.label()));
        body.insert(
            "model".into(),
            resource
                .property_value(ITEM_MODEL_PROPERTY)
                .map_or(Value::Null, Value::String),
        );
        body.insert(TYPE_FIELD.into(), first_type(resource));

        Some(IndexDocument::new(resource.uri(), body))
    }
}

/// Builder for test takers: adds the login and the custom properties.
#[derive(Debug, Clone, Copy, Default)]
pub struct TestTakerDocumentBuilder;

impl DocumentBuilder for TestTakerDocumentBuilder {
    fn create_document(&self, resource: &dyn Resource, root_type: Option<&str>) -> Option<IndexDocument> {
        if !is_indexable(resource, root_type) {
            return None;
        }
        let mut body = base_body(resource);
        body.insert(
            "login".into(),
            Value::String(resource.property_value(LOGIN_PROPERTY).unwrap_or_default()),
        );
        body.insert(TYPE_FIELD.into(), type_list(resource, root_type));

        Some(IndexDocument::new(resource.uri(), body).with_dynamic_properties(resource.dynamic_properties()))
    }
}

/// Fallback builder for resources of unknown type.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnclassifiedDocumentBuilder;

impl DocumentBuilder for UnclassifiedDocumentBuilder {
    fn create_document(&self, resource: &dyn Resource, _root_type: Option<&str>) -> Option<IndexDocument> {
        if !is_indexable(resource, None) {
            return None;
        }
        let mut body = base_body(resource);
        body.insert("comment".into(), Value::String(resource.comment()));
        body.insert(TYPE_FIELD.into(), first_type(resource));

        Some(IndexDocument::new(resource.uri(), body))
    }
}
