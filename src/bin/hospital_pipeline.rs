//! Hospital pipeline entry point: ingests a standard-charge
//! CSV or JSON disclosure into a columnar charge file, or — given `--pg` —
//! reads that columnar file back and loads it into Postgres.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};

use chargefile_rs::columnar::ChargeRowWriter;
use chargefile_rs::loader::{LoaderOptions, RelationalLoader};
use chargefile_rs::readers::csv::CsvReader;
use chargefile_rs::readers::json::JsonReader;
use chargefile_rs::readers::{ChargeReader, NextBatch};
use chargefile_rs::row::ChargeRow;

/// Default batch size for the columnar write path.
const DEFAULT_WRITE_BATCH: usize = 10_000;
/// Default batch size for the relational load path.
const DEFAULT_LOAD_BATCH: usize = 500;

#[derive(Parser, Debug)]
#[command(name = "hospital-pipeline", about = "Ingest or load a hospital standard-charge disclosure")]
struct Args {
    /// Input file: a standard-charge CSV/JSON in ingest mode, or a columnar
    /// charge file when `--pg` selects load mode.
    #[arg(long = "file")]
    file: PathBuf,

    /// Destination columnar file, required in ingest mode.
    #[arg(long = "out")]
    out: Option<PathBuf>,

    /// Rows per write() call (ingest mode) or items per transaction (load
    /// mode). Defaults to 10000 / 500 respectively.
    #[arg(long = "batch")]
    batch: Option<usize>,

    /// Postgres connection string. Presence selects load mode over ingest.
    #[arg(long = "pg")]
    pg: Option<String>,

    /// Suppresses payer-charge and dimension writes; only meaningful with `--pg`.
    #[arg(long = "skip-payer-data", default_value_t = false)]
    skip_payer_data: bool,

    #[arg(short = 'v', long = "verbose", default_value_t = false)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse();
    install_logging(args.verbose);

    if let Err(e) = run(args).await {
        error!("{e}");
        std::process::exit(2);
    }
}

fn install_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    match &args.pg {
        Some(conn) => load(&args, conn).await,
        None => ingest(&args),
    }
}

fn ingest(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let out = args
        .out
        .as_ref()
        .ok_or("--out is required in ingest mode (no --pg given)")?;
    let batch_size = args.batch.unwrap_or(DEFAULT_WRITE_BATCH);

    let is_json = args
        .file
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let mut writer = ChargeRowWriter::create(out)?;
    let mut buffer: Vec<ChargeRow> = Vec::with_capacity(batch_size);
    let mut rows_read = 0u64;
    let start = std::time::Instant::now();

    macro_rules! drain_into_writer {
        ($reader:expr) => {
            loop {
                match $reader.next_batch()? {
                    NextBatch::Rows(mut rows) => {
                        rows_read += rows.len() as u64;
                        buffer.append(&mut rows);
                        if buffer.len() >= batch_size {
                            writer.write(&buffer)?;
                            buffer.clear();
                        }
                    }
                    NextBatch::End => break,
                }
            }
        };
    }

    if is_json {
        let mut reader = JsonReader::from_path(&args.file)?;
        drain_into_writer!(reader);
    } else {
        let mut reader = CsvReader::from_path(&args.file)?;
        drain_into_writer!(reader);
    }

    if !buffer.is_empty() {
        writer.write(&buffer)?;
    }
    let total = writer.close()?;

    info!(
        rows_read,
        rows_written = total,
        elapsed_secs = start.elapsed().as_secs_f64(),
        out = %out.display(),
        "columnar write complete"
    );
    Ok(())
}

async fn load(args: &Args, conn: &str) -> Result<(), Box<dyn std::error::Error>> {
    let options = LoaderOptions {
        batch_items: args.batch.unwrap_or(DEFAULT_LOAD_BATCH),
        skip_payer_data: args.skip_payer_data,
        progress_interval: Duration::from_secs(5),
        ..LoaderOptions::default()
    };
    let mut loader = RelationalLoader::connect(conn, options).await?;
    let summary = loader.load(&args.file).await?;

    info!(
        rows_scanned = summary.rows_scanned,
        items_inserted = summary.items_inserted,
        charges_inserted = summary.charges_inserted,
        payer_charges_inserted = summary.payer_charges_inserted,
        codes_cached = summary.codes_cached,
        plans_cached = summary.plans_cached,
        payers_cached = summary.payers_cached,
        elapsed_secs = summary.elapsed.as_secs_f64(),
        rows_per_sec = summary.rows_per_second(),
        "relational load complete"
    );
    Ok(())
}
