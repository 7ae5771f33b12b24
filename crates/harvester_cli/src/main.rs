mod config;
mod run;

use std::path::PathBuf;

use clap::Parser;
use harvest_logging::{harvest_error, harvest_info, harvest_warn, LogDestination};
use log::LevelFilter;
use tokio_util::sync::CancellationToken;

use crate::config::{CliConfig, API_KEY_ENV, DEFAULT_CONFIG_FILE};

/// Harvest every page of a search query and export the results as CSV.
#[derive(Debug, Parser)]
#[command(name = "harvest", version)]
struct Args {
    /// Configuration file (RON). Missing file means built-in defaults.
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Filter expression (`fq`), replaces the configured one.
    #[arg(long)]
    filter: Option<String>,

    /// Directory for the CSV files.
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Stop after this many pages.
    #[arg(long)]
    max_pages: Option<u32>,

    /// Only report how many pages the query spans.
    #[arg(long)]
    estimate_only: bool,

    #[arg(long, default_value_t = LevelFilter::Info)]
    log_level: LevelFilter,
}

impl Args {
    fn apply(&self, config: &mut CliConfig) {
        if let Some(filter) = &self.filter {
            config.filter = filter.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if self.max_pages.is_some() {
            config.max_pages = self.max_pages;
        }
    }
}

fn log_destination(config: &CliConfig) -> LogDestination {
    match &config.log_file {
        Some(path) => LogDestination::Both(path.clone()),
        None => LogDestination::Terminal,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let mut config = CliConfig::load_or_default(&args.config)?;
    args.apply(&mut config);

    // The log file location comes from the config, so logging starts after loading it.
    if !harvest_logging::initialize(log_destination(&config), args.log_level) {
        eprintln!("Warning: logging is disabled; no logger could be installed");
    }
    if args.config.exists() {
        harvest_info!("loaded configuration from {}", args.config.display());
    } else {
        harvest_info!("no config file at {}, using defaults", args.config.display());
    }

    let api_key = config.resolve_api_key(std::env::var(API_KEY_ENV).ok())?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            harvest_warn!("interrupt received, stopping after the current page");
            on_signal.cancel();
        }
    });

    let summary = match run::run(&config, &api_key, args.estimate_only, cancel).await {
        Ok(summary) => summary,
        Err(err) => {
            harvest_error!("harvest failed: {err:#}");
            return Err(err);
        }
    };

    if args.estimate_only {
        println!("{} pages", summary.total_pages);
        return Ok(());
    }

    harvest_info!("{summary:?}");
    println!(
        "{} pages of {} requested, {} + {} records",
        summary.pages_requested, summary.total_pages, summary.primary_count, summary.secondary_count
    );
    for path in [&summary.primary_path, &summary.secondary_path].into_iter().flatten() {
        println!("wrote {}", path.display());
    }
    if !summary.failed_pages.is_empty() {
        println!("missing pages: {:?}", summary.failed_pages);
    }
    if summary.cancelled {
        println!("harvest was interrupted; output is partial");
    }
    Ok(())
}
