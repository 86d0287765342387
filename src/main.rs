use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use log::info;
use par_window::utils::logging::console::{print_schema_info, print_table_summary};
use par_window::utils::logging::{create_spinner, finish_and_clear};
use par_window::{ReaderConfig, Table, WindowReader};

#[cfg(feature = "snmalloc")]
#[global_allocator]
static ALLOC: snmalloc_rs::SnMalloc = snmalloc_rs::SnMalloc;

const USAGE: &str = "usage: par-window <file> [offset] [count] [field,...]";
const DEFAULT_COUNT: u64 = 20;

struct Args {
    path: PathBuf,
    offset: u64,
    count: u64,
    fields: Option<Vec<String>>,
}

fn parse_args() -> Result<Args> {
    let mut args = std::env::args().skip(1);
    let Some(path) = args.next() else {
        bail!(USAGE);
    };
    let offset = match args.next() {
        Some(s) => s.parse().with_context(|| format!("invalid offset '{s}'"))?,
        None => 0,
    };
    let count = match args.next() {
        Some(s) => s.parse().with_context(|| format!("invalid count '{s}'"))?,
        None => DEFAULT_COUNT,
    };
    let fields = args.next().map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(String::from)
            .collect()
    });
    if args.next().is_some() {
        bail!(USAGE);
    }

    Ok(Args {
        path: PathBuf::from(path),
        offset,
        count,
        fields,
    })
}

/// Print each row as one JSON object keyed by column name
fn print_json_lines(table: &Table) -> Result<()> {
    let names = table.column_names();
    for row in table.rows() {
        let object = names
            .iter()
            .zip(row)
            .map(|(name, value)| -> Result<(String, serde_json::Value)> {
                Ok(((*name).to_string(), serde_json::to_value(value)?))
            })
            .collect::<Result<serde_json::Map<_, _>>>()?;
        println!("{}", serde_json::Value::Object(object));
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = parse_args()?;
    let mut reader = WindowReader::open(&args.path, ReaderConfig::with_available_parallelism())
        .with_context(|| format!("failed to open {}", args.path.display()))?;
    print_schema_info(reader.schema());

    let total = reader.row_count().await?;
    info!("{} holds {total} rows", args.path.display());

    let fields = args
        .fields
        .unwrap_or_else(|| reader.schema().field_names());

    let spinner = create_spinner(Some("Decoding window"));
    let start = Instant::now();
    let result = reader
        .materialize_window(&fields, args.offset, args.count)
        .await;
    finish_and_clear(&spinner);
    let table = result?;

    print_table_summary(&table, start.elapsed());
    print_json_lines(&table)?;

    Ok(())
}
