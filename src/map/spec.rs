//! Mapping specification: the caller's configuration tree, compiled into typed nodes
//!
//! Nodes are compiled lazily. A [`NodeSet`] keeps the raw configuration of each
//! entry and turns it into a [`MappingNode`] the first time the walk reaches it,
//! caching the result. A malformed node therefore only fails a parse when at
//! least one record actually visits it.

use crate::error::{ConfigError, NodeKind};
use crate::map::types::ParentKeyConfig;
use crate::map::value::type_name;
use once_cell::unsync::OnceCell;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::rc::Rc;

/// Delimiter used to split source keys into path segments
pub const DEFAULT_DELIMITER: &str = ".";

/// Path into a decoded document, one segment per object key or list index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePath {
    segments: Vec<String>,
}

impl SourcePath {
    /// Split a source key on `delimiter`. Empty segments are dropped, so both
    /// `""` and `"."` address the current element itself.
    pub fn parse(key: &str, delimiter: &str) -> Self {
        let segments = if delimiter.is_empty() {
            vec![key.to_string()]
        } else {
            key.split(delimiter).map(str::to_string).collect()
        };

        SourcePath {
            segments: segments.into_iter().filter(|s| !s.is_empty()).collect(),
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// True when the path refers to the current element
    pub fn is_self(&self) -> bool {
        self.segments.is_empty()
    }
}

/// A column sourced from the record
#[derive(Debug, Clone)]
pub struct ColumnNode {
    pub path: SourcePath,
    pub destination: String,
    pub primary_key: bool,
    pub force_type: bool,
}

/// A nested table
#[derive(Debug, Clone)]
pub struct TableNode {
    pub path: SourcePath,
    pub destination: String,
    /// `None` when the node reuses the mapping that already owns `destination`
    pub children: Option<Rc<NodeSet>>,
    pub parent_key: ParentKeyConfig,
}

/// A column sourced from per-call user data instead of the record
#[derive(Debug, Clone)]
pub struct UserNode {
    pub destination: String,
    pub primary_key: bool,
    pub force_type: bool,
}

/// Compiled mapping node
#[derive(Debug, Clone)]
pub enum MappingNode {
    Column(ColumnNode),
    Table(TableNode),
    User(UserNode),
}

impl MappingNode {
    pub fn kind(&self) -> NodeKind {
        match self {
            MappingNode::Column(_) => NodeKind::Column,
            MappingNode::Table(_) => NodeKind::Table,
            MappingNode::User(_) => NodeKind::User,
        }
    }

    pub fn destination(&self) -> &str {
        match self {
            MappingNode::Column(node) => &node.destination,
            MappingNode::Table(node) => &node.destination,
            MappingNode::User(node) => &node.destination,
        }
    }

    /// Compile the configuration found under `key`
    pub fn compile(key: &str, raw: &Value) -> Result<Self, ConfigError> {
        let raw = match raw {
            Value::String(destination) => {
                if destination.is_empty() {
                    return Err(missing(key, NodeKind::Column, "mapping.destination"));
                }
                return Ok(MappingNode::Column(ColumnNode {
                    path: SourcePath::parse(key, DEFAULT_DELIMITER),
                    destination: destination.clone(),
                    primary_key: false,
                    force_type: false,
                }));
            }
            Value::Object(_) => RawNode::deserialize(raw).map_err(|e| ConfigError::Malformed {
                key: key.to_string(),
                message: e.to_string(),
            })?,
            other => {
                return Err(ConfigError::Malformed {
                    key: key.to_string(),
                    message: format!(
                        "expected a destination name or a node object, got {}",
                        type_name(other)
                    ),
                })
            }
        };

        let kind = match raw.node_type.as_deref() {
            None | Some("column") => NodeKind::Column,
            Some("table") => NodeKind::Table,
            Some("user") => NodeKind::User,
            Some(other) => {
                return Err(ConfigError::UnknownType {
                    key: key.to_string(),
                    node_type: other.to_string(),
                })
            }
        };
        let delimiter = raw.delimiter.as_deref().unwrap_or(DEFAULT_DELIMITER);

        match kind {
            NodeKind::Table => {
                let destination = non_empty(raw.destination)
                    .ok_or_else(|| missing(key, kind, "destination"))?;

                Ok(MappingNode::Table(TableNode {
                    path: SourcePath::parse(key, delimiter),
                    destination,
                    children: raw
                        .table_mapping
                        .map(|children| Rc::new(NodeSet::from_map(children))),
                    parent_key: raw.parent_key.unwrap_or_default(),
                }))
            }
            NodeKind::Column | NodeKind::User => {
                let mapping = raw.mapping.unwrap_or_default();
                let destination = non_empty(mapping.destination)
                    .ok_or_else(|| missing(key, kind, "mapping.destination"))?;

                if kind == NodeKind::User {
                    Ok(MappingNode::User(UserNode {
                        destination,
                        primary_key: mapping.primary_key,
                        force_type: raw.force_type,
                    }))
                } else {
                    Ok(MappingNode::Column(ColumnNode {
                        path: SourcePath::parse(key, delimiter),
                        destination,
                        primary_key: mapping.primary_key,
                        force_type: raw.force_type,
                    }))
                }
            }
        }
    }
}

fn missing(key: &str, kind: NodeKind, what: &'static str) -> ConfigError {
    ConfigError::MissingKey {
        key: key.to_string(),
        kind,
        missing: what,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawNode {
    #[serde(rename = "type")]
    node_type: Option<String>,
    mapping: Option<RawColumnMapping>,
    destination: Option<String>,
    #[serde(alias = "children")]
    table_mapping: Option<Map<String, Value>>,
    parent_key: Option<ParentKeyConfig>,
    delimiter: Option<String>,
    #[serde(default)]
    force_type: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawColumnMapping {
    destination: Option<String>,
    #[serde(default)]
    primary_key: bool,
}

#[derive(Debug)]
struct NodeEntry {
    key: String,
    raw: Value,
    compiled: OnceCell<MappingNode>,
}

/// Ordered set of sibling nodes, compiled on first access
#[derive(Debug)]
pub struct NodeSet {
    entries: Vec<NodeEntry>,
}

impl NodeSet {
    pub fn from_map(map: Map<String, Value>) -> Self {
        NodeSet {
            entries: map
                .into_iter()
                .map(|(key, raw)| NodeEntry {
                    key,
                    raw,
                    compiled: OnceCell::new(),
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Source keys in declaration order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.key.as_str())
    }

    /// Source key and compiled node at `index`, compiling it on first access
    pub fn node(&self, index: usize) -> Result<(&str, &MappingNode), ConfigError> {
        let entry = &self.entries[index];
        let node = entry
            .compiled
            .get_or_try_init(|| MappingNode::compile(&entry.key, &entry.raw))?;
        Ok((entry.key.as_str(), node))
    }
}

/// A compiled mapping, ready to drive a [`Mapper`](crate::map::Mapper)
#[derive(Debug, Clone)]
pub struct MappingSpec {
    root: Rc<NodeSet>,
}

impl MappingSpec {
    /// Wrap a configuration tree. Only the top-level shape is checked here;
    /// individual nodes are validated when first visited.
    pub fn compile(config: Value) -> Result<Self, ConfigError> {
        match config {
            Value::Object(map) => Ok(MappingSpec {
                root: Rc::new(NodeSet::from_map(map)),
            }),
            other => Err(ConfigError::NotAnObject {
                found: type_name(&other),
            }),
        }
    }

    pub fn root(&self) -> &Rc<NodeSet> {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn compile(key: &str, raw: Value) -> Result<MappingNode, ConfigError> {
        MappingNode::compile(key, &raw)
    }

    #[test]
    fn test_source_path_split() {
        assert_eq!(SourcePath::parse("user.id", ".").segments(), ["user", "id"]);
        assert_eq!(SourcePath::parse("user/id", "/").segments(), ["user", "id"]);
        assert!(SourcePath::parse("", ".").is_self());
        assert!(SourcePath::parse(".", ".").is_self());
    }

    #[test]
    fn test_shorthand_is_column() {
        let node = compile("title", json!("title")).unwrap();
        match node {
            MappingNode::Column(column) => {
                assert_eq!(column.destination, "title");
                assert!(!column.primary_key);
                assert!(!column.force_type);
            }
            other => panic!("expected column, got {:?}", other),
        }
    }

    #[test]
    fn test_column_without_type() {
        let node = compile(
            "id",
            json!({"mapping": {"destination": "post_id", "primaryKey": true}}),
        )
        .unwrap();
        assert_eq!(node.kind(), NodeKind::Column);
        assert_eq!(node.destination(), "post_id");
    }

    #[test]
    fn test_custom_delimiter() {
        let node = compile(
            "user/id",
            json!({"type": "column", "mapping": {"destination": "user_id"}, "delimiter": "/"}),
        )
        .unwrap();
        let MappingNode::Column(column) = node else {
            panic!("expected column");
        };
        assert_eq!(column.path.segments(), ["user", "id"]);
    }

    #[test]
    fn test_missing_column_destination() {
        let err = compile("timestamp", json!({"type": "column"})).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Key 'mapping.destination' is not set for column 'timestamp'."
        );
    }

    #[test]
    fn test_missing_table_destination() {
        let err = compile("arr", json!({"type": "table"})).unwrap_err();
        assert_eq!(err.to_string(), "Key 'destination' is not set for table 'arr'.");
    }

    #[test]
    fn test_table_children_optional_at_compile() {
        let node = compile("child", json!({"type": "table", "destination": "items"})).unwrap();
        let MappingNode::Table(table) = node else {
            panic!("expected table");
        };
        assert!(table.children.is_none());
    }

    #[test]
    fn test_unknown_type() {
        let err = compile("x", json!({"type": "matrix"})).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownType { .. }));
        assert_eq!(err.key(), Some("x"));
    }

    #[test]
    fn test_malformed_node() {
        let err = compile(
            "id",
            json!({"mapping": {"destination": "id", "primaryKey": "yes"}}),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Malformed { .. }));

        let err = compile("id", json!(42)).unwrap_err();
        assert!(err.to_string().contains("got number"));
    }

    #[test]
    fn test_node_set_is_lazy() {
        let set = NodeSet::from_map(
            json!({"ok": "ok", "broken": {"type": "column"}})
                .as_object()
                .cloned()
                .unwrap(),
        );
        assert_eq!(set.keys().collect::<Vec<_>>(), ["ok", "broken"]);
        assert!(set.node(0).is_ok());
        assert!(set.node(1).is_err());
    }

    #[test]
    fn test_spec_requires_object() {
        let err = MappingSpec::compile(json!(["id"])).unwrap_err();
        assert_eq!(err, ConfigError::NotAnObject { found: "array" });
    }
}
