//! casting-map: Map nested JSON into relational CSV tables
//!
//! Usage:
//!   # Read records from a file, print every table to stdout
//!   casting-map mapping.json data.json
//!
//!   # Read NDJSON from stdin, write one CSV per table
//!   cat events.jsonl | casting-map mapping.json --ndjson --output-dir ./tables
//!
//!   # Inject a value for every `user` node keyed "source"
//!   casting-map mapping.json data.json --user-data source=search

// Use MiMalloc allocator for better performance (recommended by simd-json)
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{bail, Context, Result};
use casting::map::write_tables_to;
use casting::{CsvWriter, Mapper, MapperConfig, MappingSpec, UserData};
use clap::Parser;
use serde_json::Value;
use std::fs::File;
use std::io::{BufReader, Read};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "casting-map")]
#[command(about = "Map nested JSON into relational CSV tables", long_about = None)]
struct Args {
    /// Mapping configuration (JSON object of source paths to nodes)
    #[arg(value_name = "MAPPING")]
    mapping: String,

    /// Input file (use stdin if omitted)
    #[arg(value_name = "FILE")]
    input: Option<String>,

    /// Process newline-delimited JSON (one record per line)
    #[arg(long)]
    ndjson: bool,

    /// Output directory for one .csv file per table.
    /// If omitted, all tables are written to stdout, each after a `# <name>` line
    #[arg(long, short = 'o')]
    output_dir: Option<String>,

    /// Don't write a header line
    #[arg(long)]
    no_header: bool,

    /// Name of the table holding one row per top-level record
    #[arg(long, default_value = "root")]
    root: String,

    /// Value for `user` nodes, as KEY=VALUE (repeatable)
    #[arg(long = "user-data", value_name = "KEY=VALUE")]
    user_data: Vec<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let config = MapperConfig::default()
        .with_header(!args.no_header)
        .with_root_destination(args.root.clone());

    let mapping: Value = serde_json::from_reader(BufReader::new(
        File::open(&args.mapping)
            .with_context(|| format!("Failed to open mapping: {}", args.mapping))?,
    ))
    .context("Failed to parse mapping JSON")?;
    let spec = MappingSpec::compile(mapping)?;
    let user_data = parse_user_data(&args.user_data)?;

    let reader = if let Some(file_path) = &args.input {
        Box::new(BufReader::new(File::open(file_path)?)) as Box<dyn Read>
    } else {
        Box::new(std::io::stdin()) as Box<dyn Read>
    };
    let records = read_records(reader, args.ndjson)?;

    let mut mapper = Mapper::new(spec, config.clone());
    mapper.parse(&records, &user_data)?;
    info!(records = records.len(), tables = mapper.registry().len(), "mapped records");

    if let Some(output_dir) = args.output_dir {
        let writer = CsvWriter::new(&output_dir, &config)?;
        let paths = writer.write_tables(mapper.registry())?;
        info!(files = paths.len(), dir = %output_dir, "tables written");
    } else {
        let stdout = std::io::stdout();
        let mut lock = stdout.lock();
        write_tables_to(&mut lock, mapper.registry(), &config)?;
    }

    Ok(())
}

/// Parse repeated `KEY=VALUE` arguments into the user data map
fn parse_user_data(pairs: &[String]) -> Result<UserData> {
    let mut user_data = UserData::new();
    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            bail!("Invalid --user-data '{}', expected KEY=VALUE", pair);
        };
        user_data.insert(key.to_string(), Value::String(value.to_string()));
    }
    Ok(user_data)
}

/// Read records using SIMD-accelerated JSON parsing when possible.
/// A top-level array is a list of records; anything else is a single record.
fn read_records(reader: Box<dyn Read>, ndjson: bool) -> Result<Vec<Value>> {
    let mut content = Vec::new();
    let mut buf_reader = BufReader::new(reader);
    buf_reader.read_to_end(&mut content)?;

    if !ndjson {
        // Try SIMD parsing first, deserializing straight into serde_json so key order survives
        let mut simd_content = content.clone();
        if let Ok(value) = simd_json::serde::from_slice::<Value>(&mut simd_content) {
            return Ok(match value {
                Value::Array(records) => records,
                record => vec![record],
            });
        }
    }

    // Fallback to serde_json line by line for NDJSON
    let content_str = String::from_utf8_lossy(&content);
    let mut records = Vec::new();
    for (line_no, line) in content_str.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(line)
            .with_context(|| format!("Failed to parse JSON on line {}", line_no + 1))?;
        records.push(value);
    }
    Ok(records)
}
