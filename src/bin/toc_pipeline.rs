//! Table-of-Contents pipeline entry point: streams a
//! multi-gigabyte TOC file, filters plans by market/HIOS-state/keyword, and
//! emits the normalized (plans, urls) pair as columnar or JSON-wrapper
//! output.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::PathBuf;

use clap::Parser;
use flate2::read::GzDecoder;
use tracing::{error, info};

use chargefile_rs::columnar::toc_writer::{to_json_wrapper, TocParquetWriter};
use chargefile_rs::toc::{TocFilter, TocReader, DEFAULT_KEYWORDS};
use chargefile_rs::types::common::MarketType;

#[derive(Parser, Debug)]
#[command(name = "toc-pipeline", about = "Filter and extract plans from a Table-of-Contents file")]
struct Args {
    /// Input TOC file, optionally gzip-compressed (`.gz` suffix).
    #[arg(long = "file")]
    file: PathBuf,

    /// Two-letter state code for the HIOS-state filter.
    #[arg(long = "state")]
    state: Option<String>,

    /// `individual` or `group`; unset matches either.
    #[arg(long = "market")]
    market: Option<String>,

    /// Disables the HIOS plan_id[5:7] state check.
    #[arg(long = "no-hios", default_value_t = false)]
    no_hios: bool,

    /// Disables the keyword-substring check.
    #[arg(long = "no-keywords", default_value_t = false)]
    no_keywords: bool,

    /// Comma-separated keyword override for the keyword filter.
    #[arg(long = "keywords")]
    keywords: Option<String>,

    /// Output path (extension-less base for the columnar pair, or a single
    /// JSON file with `--format json`).
    #[arg(long = "out")]
    out: PathBuf,

    #[arg(long = "format", default_value = "parquet")]
    format: String,

    /// Parses and filters without writing output.
    #[arg(long = "dry-run", default_value_t = false)]
    dry_run: bool,

    #[arg(short = 'v', long = "verbose", default_value_t = false)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();
    install_logging(args.verbose);

    if let Err(e) = run(args) {
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

fn build_filter(args: &Args) -> Result<TocFilter, Box<dyn std::error::Error>> {
    let market_type = match args.market.as_deref() {
        Some("individual") => Some(MarketType::Individual),
        Some("group") => Some(MarketType::Group),
        Some(other) => return Err(format!("unrecognized --market value {other:?}").into()),
        None => None,
    };

    let keywords = match &args.keywords {
        Some(csv) => csv.split(',').map(|s| s.trim().to_string()).collect(),
        None => DEFAULT_KEYWORDS.iter().map(|s| s.to_string()).collect(),
    };

    Ok(TocFilter {
        market_type,
        use_hios_state: !args.no_hios && args.state.is_some(),
        state_code: args.state.clone(),
        use_keywords: !args.no_keywords,
        keywords,
    })
}

fn open_input(path: &PathBuf) -> Result<Box<dyn Read>, std::io::Error> {
    let file = File::open(path)?;
    let buffered = BufReader::with_capacity(256 * 1024, file);
    if path.extension().and_then(|e| e.to_str()) == Some("gz") {
        Ok(Box::new(GzDecoder::new(buffered)))
    } else {
        Ok(Box::new(buffered))
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let filter = build_filter(&args)?;
    let input = open_input(&args.file)?;
    let mut reader = TocReader::from_reader(input, filter)?;

    let start = std::time::Instant::now();
    let mut structures_seen = 0u64;
    let mut plans_matched = 0u64;
    let mut urls_emitted = 0u64;

    let mut writer = if args.dry_run {
        None
    } else if args.format == "json" {
        None
    } else {
        Some(TocParquetWriter::create(&args.out)?)
    };

    let mut json_plans = Vec::new();
    let mut json_urls = Vec::new();

    while let Some(batch) = reader.next_structure()? {
        structures_seen += 1;
        plans_matched += batch.plans.len() as u64;
        urls_emitted += batch.urls.len() as u64;

        if let Some(w) = writer.as_mut() {
            w.write_plans(&batch.plans)?;
            w.write_urls(&batch.urls)?;
        } else if !args.dry_run && args.format == "json" {
            json_plans.extend(batch.plans);
            json_urls.extend(batch.urls);
        }
    }

    if let Some(w) = writer {
        w.close()?;
    } else if !args.dry_run && args.format == "json" {
        let json = to_json_wrapper(&json_plans, &json_urls);
        std::fs::write(&args.out, json)?;
    }

    info!(
        structures_seen,
        plans_matched,
        urls_emitted,
        elapsed_secs = start.elapsed().as_secs_f64(),
        dry_run = args.dry_run,
        "toc extraction complete"
    );
    Ok(())
}
