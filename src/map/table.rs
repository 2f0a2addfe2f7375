use csv::{QuoteStyle, Terminator, WriterBuilder};
use indexmap::IndexMap;
use std::io::Write;
use tracing::debug;

/// One output row: column name to scalar text, in the order columns were produced
pub type Row = IndexMap<String, String>;

/// A flat output table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    name: String,
    header: Vec<String>,
    primary_key: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Table {
            name: name.into(),
            header: Vec::new(),
            primary_key: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Column names, fixed by the first row
    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Primary key columns in declaration order
    pub fn primary_key(&self) -> &[String] {
        &self.primary_key
    }

    /// Row values, aligned with [`header`](Self::header)
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append a row. The first row fixes the header and primary key; later
    /// rows are aligned to that header by column name.
    pub fn push(&mut self, mut row: Row, primary_key: &[String]) {
        if self.rows.is_empty() {
            self.header = row.keys().cloned().collect();
            self.primary_key = primary_key.to_vec();
        }

        let values = self
            .header
            .iter()
            .map(|column| row.swap_remove(column).unwrap_or_default())
            .collect();

        if !row.is_empty() {
            debug!(
                table = %self.name,
                columns = ?row.keys().collect::<Vec<_>>(),
                "dropping columns outside the established header"
            );
        }

        self.rows.push(values);
    }

    /// Render as quoted, comma separated text. A table that never received a
    /// row has no header line either.
    pub fn to_csv(&self, include_header: bool, terminator: Terminator) -> String {
        let mut buffer = Vec::new();
        self.write_csv(&mut buffer, include_header, terminator)
            .expect("writing CSV into memory cannot fail");
        String::from_utf8_lossy(&buffer).into_owned()
    }

    /// Stream the same text as [`to_csv`](Self::to_csv) into `writer`
    pub fn write_csv<W: Write>(
        &self,
        writer: W,
        include_header: bool,
        terminator: Terminator,
    ) -> csv::Result<()> {
        let mut csv_writer = WriterBuilder::new()
            .quote_style(QuoteStyle::Always)
            .terminator(terminator)
            .from_writer(writer);

        if include_header && !self.header.is_empty() {
            csv_writer.write_record(&self.header)?;
        }
        for row in &self.rows {
            csv_writer.write_record(row)?;
        }
        csv_writer.flush()?;
        Ok(())
    }
}

/// All output tables of a mapper, keyed by destination, in registration order
#[derive(Debug, Clone, Default)]
pub struct TableRegistry {
    tables: IndexMap<String, Table>,
}

impl TableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The table named `destination`, registering an empty one on first use
    pub fn get_or_create(&mut self, destination: &str) -> &mut Table {
        if !self.tables.contains_key(destination) {
            debug!(table = destination, "registering table");
        }
        self.tables
            .entry(destination.to_string())
            .or_insert_with(|| Table::new(destination))
    }

    pub fn append_row(&mut self, destination: &str, row: Row, primary_key: &[String]) {
        self.get_or_create(destination).push(row, primary_key);
    }

    pub fn get(&self, destination: &str) -> Option<&Table> {
        self.tables.get(destination)
    }

    pub fn contains(&self, destination: &str) -> bool {
        self.tables.contains_key(destination)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Table> {
        self.tables.values()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl IntoIterator for TableRegistry {
    type Item = Table;
    type IntoIter = indexmap::map::IntoValues<String, Table>;

    fn into_iter(self) -> Self::IntoIter {
        self.tables.into_values()
    }
}
