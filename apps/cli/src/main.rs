//! ms-find - mustSupport element finder
//!
//! Reads the Implementation Guide packages listed in `config/config.json` from the local FHIR
//! package cache, resolves every mustSupport element of their profiles, counts how often the
//! Bundles in the instances folder populate each one, and writes
//! `<rootdir>/reports/must_support_elements.tsv`.
//!
//! Usage:
//!   ms-find [--rootdir <dir>] [--config <file>] [--instances <dir>] [--json-logs]

mod logging;

use anyhow::Context;
use clap::Parser;
use msfind_core::config::DEFAULT_CONFIG_PATH;
use msfind_core::{run, Config, Diagnostics, RunOptions};
use std::fs;
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "ms-find", version)]
#[command(about = "Find mustSupport elements in FHIR Implementation Guides and count their use")]
struct Args {
    /// Root data folder for staged packages, reports and logs [default: $HOME/data/ms-find]
    #[arg(short, long)]
    rootdir: Option<PathBuf>,

    /// Configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Folder of instance Bundles (overrides the configured one)
    #[arg(short, long)]
    instances: Option<PathBuf>,

    /// Write the log file as JSON lines
    #[arg(long)]
    json_logs: bool,
}

fn default_rootdir() -> anyhow::Result<PathBuf> {
    let home = dirs::home_dir().context("Cannot determine the home directory, pass --rootdir")?;
    Ok(home.join("data").join("ms-find"))
}

fn main() -> anyhow::Result<()> {
    // A missing .env file is fine
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let rootdir = match args.rootdir {
        Some(dir) => dir,
        None => default_rootdir()?,
    };
    let mut options = RunOptions::new(&rootdir);
    options.instances = args.instances;

    fs::create_dir_all(options.reports_dir())
        .with_context(|| format!("Failed to create {}", options.reports_dir().display()))?;
    let _log_guard = logging::init_logging(&options.logs_dir(), args.json_logs)
        .context("Failed to initialize logging")?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        rootdir = %rootdir.display(),
        config = %args.config.display(),
        "Starting ms-find"
    );

    let config = Config::load(&args.config)
        .with_context(|| format!("Failed to load configuration from {}", args.config.display()))
        .inspect_err(|e| error!("{:#}", e))?;

    let mut diagnostics = Diagnostics::new();
    let summary = run(&config, &options, &mut diagnostics)
        .context("Run failed")
        .inspect_err(|e| error!("{:#}", e))?;

    println!(
        "{} mustSupport elements from {} profiles in {} packages, {} instance documents analyzed",
        summary.rows.len(),
        summary.profiles,
        summary.packages_loaded,
        summary.documents
    );
    if !diagnostics.is_empty() {
        println!("{} warnings, see the log for details", diagnostics.len());
    }
    println!("Report written to {}", summary.report_path.display());

    Ok(())
}
