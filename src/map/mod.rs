//! Mapping nested documents into relational tables
//!
//! A [`MappingSpec`] describes which source paths become columns, which become
//! nested tables, and which columns are injected by the caller. A [`Mapper`]
//! walks every record against that spec and accumulates rows into a
//! [`TableRegistry`], one [`Table`] per destination name.
//!
//! Child tables carry a link column (by default `<parent>_pk`) holding the
//! parent row's primary key. Tables without a declared key get an MD5
//! surrogate key computed from the serialized source element.

pub mod keys;
pub mod mapper;
pub mod spec;
pub mod table;
pub mod types;
pub mod value;
pub mod writer;

pub use keys::{serialized_form, surrogate_key, ParentLink, PrimaryKey};
pub use mapper::Mapper;
pub use spec::{ColumnNode, MappingNode, MappingSpec, NodeSet, SourcePath, TableNode, UserNode};
pub use table::{Row, Table, TableRegistry};
pub use types::{MapperConfig, ParentKeyConfig, UserData};
pub use writer::{write_tables_to, CsvWriter};
