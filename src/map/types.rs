use csv::Terminator;
use serde::Deserialize;
use serde_json::{Map, Value};

/// Values injected into `user` nodes, supplied fresh on every parse call
pub type UserData = Map<String, Value>;

/// Construction options for a [`Mapper`](crate::map::Mapper)
#[derive(Debug, Clone)]
pub struct MapperConfig {
    /// Whether materialised output starts with a header line
    pub write_header: bool,

    /// Table receiving one row per top-level record
    pub root_destination: String,

    /// Line terminator used when rendering tables as text
    pub line_terminator: Terminator,
}

impl Default for MapperConfig {
    fn default() -> Self {
        MapperConfig {
            write_header: true,
            root_destination: String::from("root"),
            line_terminator: Terminator::Any(b'\n'),
        }
    }
}

impl MapperConfig {
    pub fn with_header(mut self, write_header: bool) -> Self {
        self.write_header = write_header;
        self
    }

    pub fn with_root_destination(mut self, destination: impl Into<String>) -> Self {
        self.root_destination = destination.into();
        self
    }

    pub fn with_line_terminator(mut self, terminator: Terminator) -> Self {
        self.line_terminator = terminator;
        self
    }

    /// The line terminator as text, for lines written outside a table
    pub fn line_terminator_str(&self) -> String {
        match self.line_terminator {
            Terminator::CRLF => String::from("\r\n"),
            Terminator::Any(byte) => char::from(byte).to_string(),
            _ => String::from("\n"),
        }
    }
}

/// How a child table links back to the row that owns it
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentKeyConfig {
    /// Column name override; defaults to `<parent destination>_pk`
    #[serde(default)]
    pub destination: Option<String>,

    /// Add the link column to the child table's primary key
    #[serde(default)]
    pub primary_key: bool,

    /// Do not emit a link column at all
    #[serde(default, alias = "disabled")]
    pub disable: bool,
}

impl ParentKeyConfig {
    /// Name of the link column for a child of `parent_destination`
    pub fn column_name(&self, parent_destination: &str) -> String {
        match &self.destination {
            Some(name) => name.clone(),
            None => format!("{}_pk", parent_destination),
        }
    }
}
