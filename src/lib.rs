//! # Casting - nested documents into relational tables
//!
//! Casting flattens decoded JSON records into named, flat tables driven by a
//! declarative mapping. Each mapping key is a source path; its value says
//! whether the path becomes a column, a nested table, or a column filled from
//! caller-supplied user data.
//!
//! ## Quick Start
//!
//! ```rust
//! use casting::{Mapper, MapperConfig, UserData};
//! use serde_json::json;
//!
//! # fn main() -> Result<(), casting::MapError> {
//! let mapping = json!({
//!     "id": {"mapping": {"destination": "post_id", "primaryKey": true}},
//!     "user.id": "user_id",
//!     "reactions": {
//!         "type": "table",
//!         "destination": "post_reactions",
//!         "tableMapping": {"user.id": "user_id"}
//!     }
//! });
//!
//! let records = vec![json!({
//!     "id": 1,
//!     "user": {"id": 123},
//!     "reactions": [{"user": {"id": 456}}, {"user": {"id": 789}}]
//! })];
//!
//! let mut mapper = Mapper::from_config(mapping, MapperConfig::default())?;
//! mapper.parse(&records, &UserData::new())?;
//!
//! assert_eq!(mapper.csv("root").unwrap(), "\"post_id\",\"user_id\"\n\"1\",\"123\"\n");
//! assert_eq!(
//!     mapper.csv("post_reactions").unwrap(),
//!     "\"user_id\",\"root_pk\"\n\"456\",\"1\"\n\"789\",\"1\"\n"
//! );
//! # Ok(())
//! # }
//! ```

use anyhow::{Context, Result};
use serde_json::Value;
use std::io::BufRead;

pub mod error;
pub mod map;

pub use error::{ConfigError, DataError, MapError, MapResult, NodeKind, ValueShape};
pub use map::{
    CsvWriter, Mapper, MapperConfig, MappingSpec, ParentKeyConfig, Table, TableRegistry, UserData,
};

/// Map a newline-delimited JSON stream into `mapper`'s tables.
///
/// Blank lines are skipped. Returns the number of records mapped.
pub fn map_json<R: BufRead>(reader: R, mapper: &mut Mapper, user_data: &UserData) -> Result<usize> {
    let mut count = 0;

    for (line_no, line) in reader.lines().enumerate() {
        let line = line.context("Failed to read line")?;
        if line.trim().is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(&line)
            .with_context(|| format!("Failed to parse JSON on line {}", line_no + 1))?;

        mapper
            .parse(std::slice::from_ref(&value), user_data)
            .with_context(|| format!("Failed to map record on line {}", line_no + 1))?;
        count += 1;
    }

    Ok(count)
}
