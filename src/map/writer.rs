use crate::map::table::TableRegistry;
use crate::map::types::MapperConfig;
use anyhow::{Context, Result};
use csv::Terminator;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Writes each table of a registry to its own `<destination>.csv` file
pub struct CsvWriter {
    output_dir: PathBuf,
    write_header: bool,
    line_terminator: Terminator,
}

impl CsvWriter {
    /// Create a writer targeting `output_dir`, creating the directory if needed
    pub fn new<P: AsRef<Path>>(output_dir: P, config: &MapperConfig) -> Result<Self> {
        std::fs::create_dir_all(&output_dir).context("Failed to create output directory")?;

        Ok(CsvWriter {
            output_dir: output_dir.as_ref().to_path_buf(),
            write_header: config.write_header,
            line_terminator: config.line_terminator,
        })
    }

    /// Write every table, returning the paths written in registration order
    pub fn write_tables(&self, registry: &TableRegistry) -> Result<Vec<PathBuf>> {
        let mut written = Vec::with_capacity(registry.len());

        for table in registry.iter() {
            let path = self.output_dir.join(format!("{}.csv", table.name()));
            let file = File::create(&path)
                .with_context(|| format!("Failed to open file: {}", path.display()))?;
            let mut writer = BufWriter::new(file);

            table
                .write_csv(&mut writer, self.write_header, self.line_terminator)
                .with_context(|| format!("Failed to write table: {}", table.name()))?;
            writer.flush().context("Failed to flush writer")?;

            debug!(table = table.name(), rows = table.len(), path = %path.display(), "table written");
            written.push(path);
        }

        Ok(written)
    }
}

/// Write every table to a single stream, each preceded by a `# <destination>` line
pub fn write_tables_to<W: Write>(
    writer: &mut W,
    registry: &TableRegistry,
    config: &MapperConfig,
) -> Result<()> {
    for table in registry.iter() {
        write!(writer, "# {}{}", table.name(), config.line_terminator_str())
            .context("Failed to write table name")?;
        table
            .write_csv(&mut *writer, config.write_header, config.line_terminator)
            .with_context(|| format!("Failed to write table: {}", table.name()))?;
    }
    writer.flush().context("Failed to flush writer")
}
