//! Knowledge graph data model and store.
//!
//! The graph is split into two tiers:
//!
//! - **Seed graph** ([`seed::SeedGraph`]): a bundled, immutable sample graph.
//!   Seed nodes are suppressed with tombstones, never deleted.
//! - **Generated graph**: nodes and edges produced by text imports, fully owned
//!   by the [`store::GraphStore`] and hard-deleted.
//!
//! Nodes and edges are tagged records with a fixed set of required fields plus
//! an open [`Properties`] map for provenance and extensible metadata.

pub mod seed;
pub mod snapshot;
pub mod store;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Entity type tag. Open-ended: unknown tags round-trip through [`EntityType::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EntityType {
    Person,
    Organization,
    Location,
    Technology,
    Concept,
    Food,
    Condition,
    Audio,
    Summary,
    Event,
    Unknown,
    Other(String),
}

impl EntityType {
    /// The canonical upper-case tag.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Person => "PERSON",
            Self::Organization => "ORGANIZATION",
            Self::Location => "LOCATION",
            Self::Technology => "TECHNOLOGY",
            Self::Concept => "CONCEPT",
            Self::Food => "FOOD",
            Self::Condition => "CONDITION",
            Self::Audio => "AUDIO",
            Self::Summary => "SUMMARY",
            Self::Event => "EVENT",
            Self::Unknown => "UNKNOWN",
            Self::Other(tag) => tag,
        }
    }
}

impl From<&str> for EntityType {
    fn from(tag: &str) -> Self {
        let upper = tag.trim().to_uppercase();
        match upper.as_str() {
            "PERSON" => Self::Person,
            "ORGANIZATION" | "ORG" => Self::Organization,
            "LOCATION" | "GPE" | "LOC" => Self::Location,
            "TECHNOLOGY" => Self::Technology,
            "CONCEPT" => Self::Concept,
            "FOOD" => Self::Food,
            "CONDITION" => Self::Condition,
            "AUDIO" => Self::Audio,
            "SUMMARY" => Self::Summary,
            "EVENT" => Self::Event,
            "" | "UNKNOWN" => Self::Unknown,
            _ => Self::Other(upper),
        }
    }
}

impl From<String> for EntityType {
    fn from(tag: String) -> Self {
        Self::from(tag.as_str())
    }
}

impl From<EntityType> for String {
    fn from(kind: EntityType) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A scalar property value. `Null` keeps explicit JSON `null`s loadable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Null,
}

impl PropertyValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for PropertyValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<usize> for PropertyValue {
    fn from(v: usize) -> Self {
        Self::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
            Self::Null => f.write_str("null"),
        }
    }
}

/// Open property map carried by nodes and edges.
pub type Properties = BTreeMap<String, PropertyValue>;

/// A graph node (entity).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: EntityType,
    #[serde(default)]
    pub properties: Properties,
}

impl Node {
    pub fn new(id: impl Into<String>, label: impl Into<String>, kind: EntityType) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            kind,
            properties: Properties::new(),
        }
    }

    /// Attach a property.
    pub fn with_property(mut self, key: &str, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }

    /// Text value of a property, if present and textual.
    pub fn property_text(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(PropertyValue::as_text)
    }
}

fn default_weight() -> f64 {
    1.0
}

/// A directed, typed edge. `source` and `target` are weak node id references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub rel_type: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default)]
    pub properties: Properties,
}

impl Edge {
    pub fn new(
        id: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
        rel_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            rel_type: rel_type.into(),
            weight: default_weight(),
            properties: Properties::new(),
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    /// Attach a property.
    pub fn with_property(mut self, key: &str, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }

    /// Whether this edge references `node_id` at either end.
    pub fn touches(&self, node_id: &str) -> bool {
        self.source == node_id || self.target == node_id
    }
}

/// A read view over the graph: node and edge lists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphView {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl GraphView {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// First node whose label matches case-insensitively.
    pub fn node_by_label(&self, label: &str) -> Option<&Node> {
        let wanted = label.to_lowercase();
        self.nodes.iter().find(|n| n.label.to_lowercase() == wanted)
    }
}
