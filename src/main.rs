//! DevStats — developer statistics for a source tree.
//!
//! Thin binary entry point. All logic lives in the `devstats-core`
//! and `devstats-app` crates.

use anyhow::Context;
use clap::Parser;
use devstats_app::AppState;
use devstats_core::collector::source_files::DEFAULT_BUCKET_BUDGET;
use devstats_core::scanner::ScanConfig;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "devstats",
    version,
    about = "Scan a source tree and report file extension counts and size histograms"
)]
struct Cli {
    /// Folder to scan.
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Do not read `.gitignore` from the scanned folder.
    #[arg(long)]
    no_gitignore: bool,

    /// Extension whose file sizes are sampled into the histogram.
    #[arg(long, default_value = "cs")]
    extension: String,

    /// Maximum number of histogram buckets.
    #[arg(long, default_value_t = DEFAULT_BUCKET_BUDGET)]
    buckets: usize,

    /// Print the collected statistics as JSON instead of Markdown.
    #[arg(long)]
    json: bool,

    /// Enable debug logging.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialise structured logging on stderr; stdout carries the report.
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("DevStats starting");

    let mut state = AppState::new(&cli.extension, cli.buckets);
    let config = ScanConfig::new(&cli.path).with_ignore_file(!cli.no_gitignore);
    state
        .start_scan(config)
        .with_context(|| format!("cannot scan {}", cli.path.display()))?;
    state.wait_for_completion();

    if let Some(message) = &state.scan_error {
        anyhow::bail!("scan of {} failed: {message}", cli.path.display());
    }

    if cli.json {
        let output = serde_json::json!({
            "root": cli.path,
            "files_visited": state.scan_files_found,
            "extensions": state.extension_report(),
            "source_files": state.source_file_report(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print!("{}", state.markdown_report());
    }

    Ok(())
}
