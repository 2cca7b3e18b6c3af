use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use arrow::csv::Writer as CsvWriter;
use arrow::json::LineDelimitedWriter;
use arrow::record_batch::RecordBatch;
use arrow::util::display::array_value_to_string;
use chrono::{DateTime, Local};
use colored::Colorize;
use comfy_table::{Cell, Color, Table as ComfyTable};
use qfetch_cache::{purge, CacheConfig, CacheKey, CacheManager, CacheStore, DEFAULT_CACHE_DIR};
use qfetch_core::result;
use qfetch_flight::{ConnectorConfig, Credentials, DeploymentMode, LazyConnector};

use crate::config::Config;

pub async fn run_query(
    config: &Config,
    sql: &str,
    max_age_hours: Option<u64>,
    refresh: bool,
    mode: &str,
    output: &str,
    cache_dir: Option<PathBuf>,
) -> Result<()> {
    let mode: DeploymentMode = mode.parse().map_err(|e: String| anyhow::anyhow!(e))?;
    let max_age = Duration::from_secs(
        max_age_hours.unwrap_or(config.default_max_age_hours) * 3600,
    );

    let credentials = Credentials::from_env()
        .context("engine credentials are required (QFETCH_USER / QFETCH_TOKEN)")?;
    let connector_config = ConnectorConfig::new(&config.engine.host, config.engine.port)
        .with_tls(config.engine.use_tls);

    // Connects on first live fetch only; a cache hit needs no session.
    let connector = Arc::new(LazyConnector::new(mode, connector_config, credentials));

    let cache_config =
        CacheConfig::new(cache_dir.unwrap_or_else(|| config.cache_dir.clone()))
            .with_default_max_age(max_age);
    let manager = CacheManager::new(cache_config, connector)?;

    let start = Instant::now();
    let batches = manager.get_data(sql, max_age, refresh).await?;
    let elapsed = start.elapsed();

    let source = if manager.stats().hits() > 0 {
        "cache"
    } else {
        "engine"
    };
    println!(
        "{} {} rows in {:.2}s (from {})",
        "✓".bright_green(),
        result::row_count(&batches),
        elapsed.as_secs_f64(),
        source
    );

    render_batches(&batches, output, config.max_rows)
}

fn render_batches(batches: &[RecordBatch], output: &str, max_rows: usize) -> Result<()> {
    if result::is_empty(batches) {
        println!("{}", "(no rows)".bright_black());
        return Ok(());
    }

    match output {
        "table" => render_table(batches, max_rows),
        "json" => {
            let mut writer = LineDelimitedWriter::new(std::io::stdout());
            writer.write_batches(&batches.iter().collect::<Vec<_>>())?;
            writer.finish()?;
            Ok(())
        }
        "csv" => {
            let mut writer = CsvWriter::new(std::io::stdout());
            for batch in batches {
                writer.write(batch)?;
            }
            Ok(())
        }
        other => anyhow::bail!("Unsupported output format: {other}. Use table, json or csv"),
    }
}

fn render_table(batches: &[RecordBatch], max_rows: usize) -> Result<()> {
    let Some(schema) = result::schema(batches) else {
        return Ok(());
    };

    let mut table = ComfyTable::new();
    table.set_header(
        schema
            .fields()
            .iter()
            .map(|field| Cell::new(field.name()).fg(Color::Cyan))
            .collect::<Vec<_>>(),
    );

    let mut printed = 0;
    'outer: for batch in batches {
        for row in 0..batch.num_rows() {
            if printed >= max_rows {
                break 'outer;
            }
            let mut cells = Vec::with_capacity(batch.num_columns());
            for col in 0..batch.num_columns() {
                cells.push(array_value_to_string(batch.column(col).as_ref(), row)?);
            }
            table.add_row(cells);
            printed += 1;
        }
    }

    println!("{table}");

    let total = result::row_count(batches);
    if total > printed {
        println!(
            "{}",
            format!("... {} more row(s) not shown", total - printed).bright_black()
        );
    }
    Ok(())
}

pub fn cache_info(
    config: &Config,
    inspect: Option<&str>,
    schema_only: bool,
    sample: Option<usize>,
    cache_dir: Option<PathBuf>,
) -> Result<()> {
    let dir = cache_dir.unwrap_or_else(|| config.cache_dir.clone());
    if !dir.is_dir() {
        println!("Cache directory not found: {}", dir.display());
        return Ok(());
    }
    let store = CacheStore::open(&dir)?;

    if let Some(hash_id) = inspect {
        return inspect_entry(&store, hash_id, config.max_rows);
    }

    let mut entries = store.list()?;
    if entries.is_empty() {
        println!("No cached results in {}", dir.display());
        return Ok(());
    }

    // Newest first.
    entries.sort_by(|a, b| b.modified.cmp(&a.modified));

    println!(
        "Found {} cached result(s) in {}:",
        entries.len(),
        dir.display()
    );

    let mut table = ComfyTable::new();
    table.set_header(vec![
        Cell::new("Hash ID").fg(Color::Cyan),
        Cell::new("Size (MB)").fg(Color::Yellow),
        Cell::new("Last Modified").fg(Color::Green),
    ]);
    for entry in &entries {
        table.add_row(vec![
            entry.key.to_string(),
            format!("{:.2}", entry.size_bytes as f64 / (1024.0 * 1024.0)),
            format_mtime(entry.modified),
        ]);
    }
    println!("{table}");

    if schema_only {
        let limit = sample.unwrap_or(entries.len());
        for entry in entries.iter().take(limit) {
            print_schema(&store, &entry.key)?;
        }
    }

    Ok(())
}

fn inspect_entry(store: &CacheStore, hash_id: &str, max_rows: usize) -> Result<()> {
    let key = CacheKey::from_hex(hash_id)
        .with_context(|| format!("not a valid cache id: {hash_id}"))?;
    let batches = store
        .load(&key)
        .with_context(|| format!("cannot read cache entry {hash_id}"))?;

    print_schema(store, &key)?;
    println!("Rows: {}", result::row_count(&batches));
    println!();
    render_table(&batches, max_rows.min(5))
}

fn print_schema(store: &CacheStore, key: &CacheKey) -> Result<()> {
    let schema = store.schema(key)?;

    println!();
    println!("{} {}", "Entry:".bright_yellow().bold(), key);

    let mut table = ComfyTable::new();
    table.set_header(vec![
        Cell::new("Column").fg(Color::Cyan),
        Cell::new("Type").fg(Color::Yellow),
        Cell::new("Nullable").fg(Color::Green),
    ]);
    for field in schema.fields() {
        table.add_row(vec![
            field.name().clone(),
            format!("{:?}", field.data_type()),
            (if field.is_nullable() { "YES" } else { "NO" }).to_string(),
        ]);
    }
    println!("{table}");
    Ok(())
}

pub fn cache_clear(
    config: &Config,
    root: &Path,
    cache_dir_name: Option<&str>,
    older_than_hours: Option<u64>,
    yes: bool,
) -> Result<()> {
    let dir_name = cache_dir_name.unwrap_or_else(|| {
        config
            .cache_dir
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or(DEFAULT_CACHE_DIR)
    });
    let older_than = older_than_hours.map(|hours| Duration::from_secs(hours * 3600));

    // Clearing everything is irreversible; require an explicit yes unless
    // an age filter bounds the damage.
    if older_than.is_none() && !yes && !confirm_clear(root, dir_name)? {
        println!("Operation cancelled.");
        return Ok(());
    }

    match older_than_hours {
        Some(hours) => println!(
            "{} Clearing cache entries older than {} hour(s) under {}...",
            "→".bright_blue(),
            hours,
            root.display()
        ),
        None => println!(
            "{} Clearing all cache entries under {}...",
            "→".bright_blue(),
            root.display()
        ),
    }

    let report = purge(root, dir_name, older_than);

    if report.is_empty() {
        println!("Folders cleared: (none)");
    } else {
        for (folder, count) in report.removed() {
            println!("  - {}: {} file(s) removed", folder.bright_cyan(), count);
        }
    }
    println!(
        "{} Total files deleted: {}",
        "✓".bright_green(),
        report.total()
    );
    Ok(())
}

fn format_mtime(modified: std::time::SystemTime) -> String {
    let local: DateTime<Local> = modified.into();
    local.format("%Y-%m-%d %H:%M:%S").to_string()
}

fn confirm_clear(root: &Path, dir_name: &str) -> Result<bool> {
    print!(
        "This will recursively delete ALL cached query results under {} (directory name \"{}\"). Continue? (y/n): ",
        root.display(),
        dir_name
    );
    std::io::stdout().flush()?;

    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    let answer = answer.trim().to_lowercase();
    Ok(answer == "y" || answer == "yes")
}
