//! In-network rate converter entry point: streams a rates file
//! and emits the `RateRow`/`ProviderRow` columnar pair, optionally trimmed
//! by an NPI allowlist.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::PathBuf;

use clap::Parser;
use flate2::read::GzDecoder;
use tracing::{error, info};

use chargefile_rs::columnar::rates_writer::RatesParquetWriter;
use chargefile_rs::rates::{NpiAllowlist, RatesReader};

#[derive(Parser, Debug)]
#[command(name = "rates-pipeline", about = "Convert an in-network rates file to columnar output")]
struct Args {
    /// Input rates file, optionally gzip-compressed (`.gz` suffix).
    #[arg(long = "file")]
    file: PathBuf,

    /// Output base path; writes `<base>.rates.parquet` and
    /// `<base>.providers.parquet`.
    #[arg(long = "out")]
    out: PathBuf,

    /// Optional NPI allowlist JSON file (`[{"npi": "..."}]`).
    #[arg(long = "npi")]
    npi: Option<PathBuf>,

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
    let allowlist = match &args.npi {
        Some(path) => {
            let bytes = std::fs::read(path)?;
            Some(NpiAllowlist::from_json_slice(&bytes)?)
        }
        None => None,
    };

    let start = std::time::Instant::now();
    let input = open_input(&args.file)?;
    let mut reader = RatesReader::from_reader(input, allowlist);
    let batch = reader.extract()?;

    let mut writer = RatesParquetWriter::create(&args.out)?;
    writer.write_rates(&batch.rates)?;
    writer.write_providers(&batch.providers)?;
    let (rates_written, providers_written) = writer.close()?;

    info!(
        rates_written,
        providers_written,
        elapsed_secs = start.elapsed().as_secs_f64(),
        out = %args.out.display(),
        "in-network rate conversion complete"
    );
    Ok(())
}
