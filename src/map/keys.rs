//! Primary keys and parent-key links

use crate::map::table::Row;
use crate::map::types::ParentKeyConfig;
use md5::{Digest, Md5};
use serde_json::Value;
use std::fmt::{self, Write};

/// Key identifying one row, either declared in the mapping or derived from its content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrimaryKey {
    Declared {
        columns: Vec<String>,
        values: Vec<String>,
    },
    Surrogate(String),
}

impl PrimaryKey {
    /// Key for `row`, mapped from `element`. Uses `declared` columns in their
    /// declared order when there are any, otherwise hashes the whole element,
    /// nested data included.
    pub fn derive(row: &Row, declared: &[String], element: &Value) -> Self {
        if declared.is_empty() {
            return PrimaryKey::Surrogate(surrogate_key(element));
        }

        PrimaryKey::Declared {
            columns: declared.to_vec(),
            values: declared
                .iter()
                .map(|column| row.get(column).cloned().unwrap_or_default())
                .collect(),
        }
    }

    /// Declared key columns; empty for a surrogate key
    pub fn columns(&self) -> &[String] {
        match self {
            PrimaryKey::Declared { columns, .. } => columns,
            PrimaryKey::Surrogate(_) => &[],
        }
    }

    /// Single text value of the key, composite parts joined by `,`
    pub fn value(&self) -> String {
        match self {
            PrimaryKey::Declared { values, .. } => values.join(","),
            PrimaryKey::Surrogate(hash) => hash.clone(),
        }
    }
}

/// Lower-case hex MD5 of the element's [`serialized_form`]
pub fn surrogate_key(element: &Value) -> String {
    let mut hasher = Md5::new();
    hasher.update(serialized_form(element).as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Length-prefixed, type-tagged encoding of a decoded element, the hash input
/// for surrogate keys. Objects are written as `O:8:"stdClass":<n>:{...}`, lists
/// as `a:<n>:{i:<index>;...}` and strings as `s:<byte length>:"<text>";`, so
/// keys match those produced by existing extracts of the same data.
pub fn serialized_form(element: &Value) -> String {
    let mut out = String::new();
    // fmt::Write for String never fails
    let _ = write_serialized(&mut out, element);
    out
}

fn write_serialized(out: &mut String, value: &Value) -> fmt::Result {
    match value {
        Value::Null => out.write_str("N;"),
        Value::Bool(flag) => write!(out, "b:{};", u8::from(*flag)),
        Value::Number(number) => match number.as_i64() {
            Some(int) => write!(out, "i:{};", int),
            None => write!(
                out,
                "d:{};",
                format_float(number.as_f64().unwrap_or_default())
            ),
        },
        Value::String(text) => write_string(out, text),
        Value::Array(items) => {
            write!(out, "a:{}:{{", items.len())?;
            for (index, item) in items.iter().enumerate() {
                write!(out, "i:{};", index)?;
                write_serialized(out, item)?;
            }
            out.write_char('}')
        }
        Value::Object(fields) => {
            write!(out, "O:8:\"stdClass\":{}:{{", fields.len())?;
            for (name, field) in fields {
                write_string(out, name)?;
                write_serialized(out, field)?;
            }
            out.write_char('}')
        }
    }
}

fn write_string(out: &mut String, text: &str) -> fmt::Result {
    write!(out, "s:{}:\"{}\";", text.len(), text)
}

/// Shortest round-trip digits, switching to `1.5E+20` notation below 1e-4
/// and from 1e17 upwards. Whole numbers carry no fraction (`2`).
fn format_float(value: f64) -> String {
    let scientific = format!("{:e}", value);
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return value.to_string();
    };
    let exponent: i32 = exponent.parse().unwrap_or_default();

    if (-4..17).contains(&exponent) {
        return value.to_string();
    }

    let mantissa = if mantissa.contains('.') {
        mantissa.to_string()
    } else {
        format!("{}.0", mantissa)
    };
    let sign = if exponent < 0 { '-' } else { '+' };
    format!("{}E{}{}", mantissa, sign, exponent.abs())
}

/// Virtual column a child row carries to point at its parent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentLink {
    pub column: String,
    pub value: String,
    pub primary_key: bool,
}

impl ParentLink {
    /// Link to a parent stored in `parent_destination`, unless disabled
    pub fn new(
        parent_key: &PrimaryKey,
        parent_destination: &str,
        config: &ParentKeyConfig,
    ) -> Option<Self> {
        if config.disable {
            return None;
        }

        Some(ParentLink {
            column: config.column_name(parent_destination),
            value: parent_key.value(),
            primary_key: config.primary_key,
        })
    }
}
