//! # Motorbill CLI
//!
//! Builds a quotation from a JSON quote file and exports it as a one-page
//! PDF, or prints its totals.
//!
//! ## Commands
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  motorbill export --input quote.json [--out-dir DIR] [--logo logo.ppm]  │
//! │                   [--config motorbill.toml] [--strict]                  │
//! │      → writes <DocumentType>_<Registration>_<Date>.pdf, prints receipt  │
//! │                                                                         │
//! │  motorbill totals --input quote.json                                    │
//! │      → prints { spares, labor, grand } as JSON                          │
//! │                                                                         │
//! │  motorbill template                                                     │
//! │      → prints a blank quote file                                        │
//! │                                                                         │
//! │  Logs go to stderr (RUST_LOG, default info,motorbill=debug).            │
//! │  Any error: logged, one line on stderr, exit code 1.                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod error;
mod quote;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use motorbill_core::{SurfaceErrors, Totals};
use motorbill_export::{DirectorySink, MotorbillConfig, QuoteSession};
use serde::Serialize;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::error::CliResult;
use crate::quote::QuoteFile;

#[derive(Debug, Parser)]
#[command(name = "motorbill", version, about = "Workshop quotations and invoices")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Export a quote file as a PDF.
    Export(ExportArgs),

    /// Print the totals of a quote file as JSON.
    Totals {
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Print a blank quote file.
    Template,
}

#[derive(Debug, Args)]
struct ExportArgs {
    /// Quote file (JSON).
    #[arg(short, long)]
    input: PathBuf,

    /// Directory for the PDF; overrides the configured output_dir.
    #[arg(short, long)]
    out_dir: Option<PathBuf>,

    /// Header logo as a binary PPM (P6) image.
    #[arg(long)]
    logo: Option<PathBuf>,

    /// Configuration file; defaults to the platform config directory.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Fail on the first rejected field value instead of dropping it.
    #[arg(long)]
    strict: bool,
}

/// Totals as printed by `motorbill totals`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TotalsReport {
    /// Amounts in paise.
    totals: Totals,
    spares: String,
    labor: String,
    grand: String,
    rows: usize,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();
    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Command failed");
            eprintln!("error: {}", e.user_message());
            ExitCode::FAILURE
        }
    }
}

/// Initializes tracing on stderr so stdout stays machine-readable.
///
/// ## Environment Variables
/// - `RUST_LOG=debug` - show all debug logs
/// - `RUST_LOG=motorbill_export=trace` - trace the export pipeline only
/// - Default: `info,motorbill=debug`
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,motorbill=debug"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}

async fn run(command: Command) -> CliResult<()> {
    match command {
        Command::Export(args) => export(args).await,
        Command::Totals { input } => totals(input),
        Command::Template => {
            println!("{}", serde_json::to_string_pretty(&QuoteFile::template())?);
            Ok(())
        }
    }
}

async fn export(args: ExportArgs) -> CliResult<()> {
    let mut config = MotorbillConfig::load(args.config)?;
    if let Some(dir) = args.out_dir {
        config.export.output_dir = dir;
    }
    info!(output_dir = %config.export.output_dir.display(), strict = args.strict, "Configuration loaded");

    let quote = QuoteFile::read(&args.input)?;
    let mut session = QuoteSession::new(&config);
    if args.strict {
        session = session.with_policy(SurfaceErrors);
    }
    quote.apply(&mut session)?;

    if let Some(logo) = args.logo {
        // the pipeline waits for the load to settle before capturing
        session.load_logo(logo);
    }

    let sink = DirectorySink::new(&config.export.output_dir);
    let receipt = session.export(&sink).await?;

    info!(file = %receipt.location, bytes = receipt.bytes, "Export complete");
    println!("{}", serde_json::to_string_pretty(&receipt)?);
    Ok(())
}

fn totals(input: PathBuf) -> CliResult<()> {
    let quote = QuoteFile::read(&input)?;
    let mut session = QuoteSession::new(&MotorbillConfig::load_or_default(None));
    quote.apply(&mut session)?;

    let totals = session.recalculate();
    let report = TotalsReport {
        totals,
        spares: totals.spares.to_string(),
        labor: totals.labor.to_string(),
        grand: totals.grand.to_string(),
        rows: session.snapshot().rows.len(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
