//! Resource type to physical index routing.
//!
//! A [`RoutingTable`] is constructed once (usually from [`Default`] or from
//! configuration) and shared, immutable, by the query compiler, the batch
//! indexer and the schema updater.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Sentinel index for documents whose type cannot be resolved.
///
/// Never a physical index: documents routed here are skipped and queries
/// against it return nothing.
pub const UNCLASSIFIED_INDEX: &str = "unclassified";

pub const ITEMS_INDEX: &str = "items";
pub const TESTS_INDEX: &str = "tests";
pub const GROUPS_INDEX: &str = "groups";
pub const DELIVERIES_INDEX: &str = "deliveries";
pub const DELIVERY_RESULTS_INDEX: &str = "delivery-results";
pub const TEST_TAKERS_INDEX: &str = "test-takers";
pub const ASSETS_INDEX: &str = "assets";
pub const PROPERTY_LIST_INDEX: &str = "property-list";

/// Ontology class identifiers known to the built-in routing table.
pub mod classes {
    pub const ITEM: &str = "http://www.tao.lu/Ontologies/TAOItem.rdf#Item";
    pub const TEST: &str = "http://www.tao.lu/Ontologies/TAOTest.rdf#Test";
    pub const GROUP: &str = "http://www.tao.lu/Ontologies/TAOGroup.rdf#Group";
    pub const DELIVERY: &str = "http://www.tao.lu/Ontologies/TAODelivery.rdf#Delivery";
    pub const ASSEMBLED_DELIVERY: &str =
        "http://www.tao.lu/Ontologies/taoDeliveryRdf.rdf#AssembledDelivery";
    pub const DELIVERY_RESULT: &str = "http://www.tao.lu/Ontologies/TAOResult.rdf#DeliveryResult";
    pub const SUBJECT: &str = "http://www.tao.lu/Ontologies/TAOSubject.rdf#Subject";
    pub const MEDIA: &str = "http://www.tao.lu/Ontologies/TAOMedia.rdf#Media";
    pub const LIST: &str = "http://www.tao.lu/Ontologies/TAO.rdf#List";
}

/// One `type → index` routing entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteEntry {
    /// Resource type (ontology class) identifier.
    pub resource_type: String,
    /// Physical index name.
    pub index: String,
}

impl RouteEntry {
    /// Creates a new routing entry.
    pub fn new(resource_type: impl Into<String>, index: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            index: index.into(),
        }
    }
}

/// Static mapping from resource types to physical indices.
///
/// Class entries are kept in priority order: when a document carries several
/// types, the first entry of the table that matches any of them wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingTable {
    /// Ontology class → index, in priority order.
    classes: Vec<RouteEntry>,
    /// UI structure name → index, used to resolve query targets.
    #[serde(default)]
    structures: BTreeMap<String, String>,
    /// Indices whose documents carry a read-access field.
    #[serde(default)]
    access_controlled: BTreeSet<String>,
}

impl Default for RoutingTable {
    fn default() -> Self {
        let classes = vec![
            RouteEntry::new(classes::ITEM, ITEMS_INDEX),
            RouteEntry::new(classes::TEST, TESTS_INDEX),
            RouteEntry::new(classes::SUBJECT, TEST_TAKERS_INDEX),
            RouteEntry::new(classes::GROUP, GROUPS_INDEX),
            RouteEntry::new(classes::DELIVERY, DELIVERIES_INDEX),
            RouteEntry::new(classes::ASSEMBLED_DELIVERY, DELIVERIES_INDEX),
            RouteEntry::new(classes::DELIVERY_RESULT, DELIVERY_RESULTS_INDEX),
            RouteEntry::new(classes::MEDIA, ASSETS_INDEX),
            RouteEntry::new(classes::LIST, PROPERTY_LIST_INDEX),
        ];

        let structures = [
            ("results", DELIVERY_RESULTS_INDEX),
            ("delivery", DELIVERIES_INDEX),
            ("groups", GROUPS_INDEX),
            ("items", ITEMS_INDEX),
            ("tests", TESTS_INDEX),
            ("TestTaker", TEST_TAKERS_INDEX),
            ("taoMediaManager", ASSETS_INDEX),
            ("property-list", PROPERTY_LIST_INDEX),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let access_controlled = [
            ITEMS_INDEX,
            TESTS_INDEX,
            GROUPS_INDEX,
            TEST_TAKERS_INDEX,
            ASSETS_INDEX,
        ]
        .into_iter()
        .map(String::from)
        .collect();

        Self {
            classes,
            structures,
            access_controlled,
        }
    }
}

impl RoutingTable {
    /// Creates a routing table from class entries only.
    pub fn new(classes: Vec<RouteEntry>) -> Self {
        Self {
            classes,
            structures: BTreeMap::new(),
            access_controlled: BTreeSet::new(),
        }
    }

    /// Adds a structure-name route.
    pub fn with_structure(mut self, name: impl Into<String>, index: impl Into<String>) -> Self {
        self.structures.insert(name.into(), index.into());
        self
    }

    /// Marks an index as access-controlled.
    pub fn with_access_control(mut self, index: impl Into<String>) -> Self {
        self.access_controlled.insert(index.into());
        self
    }

    /// Returns the class entries in priority order.
    ///
    /// Used as the mapping snapshot in unclassified-document diagnostics.
    pub fn entries(&self) -> &[RouteEntry] {
        &self.classes
    }

    /// Resolves a single class identifier.
    pub fn index_for_class(&self, class: &str) -> Option<&str> {
        self.classes
            .iter()
            .find(|entry| entry.resource_type == class)
            .map(|entry| entry.index.as_str())
    }

    /// Resolves a document's type list.
    ///
    /// Table order decides between several matching types. Returns
    /// [`UNCLASSIFIED_INDEX`] when nothing matches.
    pub fn index_for_types<S: AsRef<str>>(&self, types: &[S]) -> &str {
        self.classes
            .iter()
            .find(|entry| types.iter().any(|t| t.as_ref() == entry.resource_type))
            .map(|entry| entry.index.as_str())
            .unwrap_or(UNCLASSIFIED_INDEX)
    }

    /// Resolves a type, falling back through its ancestor types in order.
    pub fn index_for_type_or_ancestors<S: AsRef<str>>(
        &self,
        type_or_id: &str,
        ancestors: &[S],
    ) -> &str {
        std::iter::once(type_or_id)
            .chain(ancestors.iter().map(AsRef::as_ref))
            .find_map(|candidate| self.index_for_class(candidate))
            .unwrap_or(UNCLASSIFIED_INDEX)
    }

    /// Resolves the target index of a user query.
    ///
    /// Accepts either a UI structure name (`items`, `TestTaker`, ...) or a
    /// class identifier.
    pub fn index_for_structure(&self, name: &str) -> &str {
        self.structures
            .get(name)
            .map(String::as_str)
            .or_else(|| self.index_for_class(name))
            .unwrap_or(UNCLASSIFIED_INDEX)
    }

    /// Returns true when queries against `index` must be filtered by principal.
    pub fn is_access_controlled(&self, index: &str) -> bool {
        self.access_controlled.contains(index)
    }

    /// Returns true when `class` has a direct routing entry.
    pub fn has_class_support(&self, class: &str) -> bool {
        self.index_for_class(class).is_some()
    }

    /// Returns every distinct physical index, in first-seen order.
    pub fn physical_indices(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        let all = self
            .classes
            .iter()
            .map(|e| e.index.as_str())
            .chain(self.structures.values().map(String::as_str));
        for index in all {
            if index != UNCLASSIFIED_INDEX && !seen.contains(&index) {
                seen.push(index);
            }
        }
        seen
    }
}

/// Returns true when `index` is the unclassified sentinel.
pub fn is_unclassified(index: &str) -> bool {
    index == UNCLASSIFIED_INDEX
}
