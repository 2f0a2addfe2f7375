//! Error types for mapping documents into tables

use std::fmt;
use thiserror::Error;

/// The kind of mapping node an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Column,
    Table,
    User,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::Column => "column",
            NodeKind::Table => "table",
            NodeKind::User => "user",
        };
        f.write_str(name)
    }
}

/// Shape of a composite value that could not be written into a column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueShape {
    Array,
    Object,
}

impl fmt::Display for ValueShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueShape::Array => f.write_str("array"),
            ValueShape::Object => f.write_str("object"),
        }
    }
}

/// Structural problem in the mapping configuration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A required key is absent from a node
    #[error("Key '{missing}' is not set for {kind} '{key}'.")]
    MissingKey {
        key: String,
        kind: NodeKind,
        missing: &'static str,
    },

    /// The node's `type` is not one of `column`, `table` or `user`
    #[error("Unknown type '{node_type}' for node '{key}'.")]
    UnknownType { key: String, node_type: String },

    /// The node could not be decoded at all
    #[error("Invalid definition for node '{key}': {message}")]
    Malformed { key: String, message: String },

    /// The top level of a mapping must be a keyed object
    #[error("Mapping must be an object of source paths, got {found}.")]
    NotAnObject { found: &'static str },
}

impl ConfigError {
    /// Source key of the offending node, if the error concerns a single node
    pub fn key(&self) -> Option<&str> {
        match self {
            ConfigError::MissingKey { key, .. }
            | ConfigError::UnknownType { key, .. }
            | ConfigError::Malformed { key, .. } => Some(key),
            ConfigError::NotAnObject { .. } => None,
        }
    }
}

/// A value that cannot be represented in a single column
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Error writing '{column}' column: Cannot write data into column: {shape}")]
pub struct DataError {
    pub column: String,
    pub shape: ValueShape,
}

/// Fatal error aborting a parse call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MapError {
    #[error(transparent)]
    BadConfig(#[from] ConfigError),

    #[error(transparent)]
    BadData(#[from] DataError),
}

impl MapError {
    pub fn is_bad_config(&self) -> bool {
        matches!(self, MapError::BadConfig(_))
    }

    pub fn is_bad_data(&self) -> bool {
        matches!(self, MapError::BadData(_))
    }
}

/// Result type for mapping operations
pub type MapResult<T> = Result<T, MapError>;
