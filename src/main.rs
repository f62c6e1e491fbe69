use std::io::{self, IsTerminal};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use jemallocator::Jemalloc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use salary_dashboard::config::{DATASET_ENV, DEFAULT_DATASET_PATH, DashboardConfig};
use salary_dashboard::dataset::Dataset;
use salary_dashboard::session::Session;

#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

/// Interactive dashboard over a salary dataset
#[derive(Parser, Debug)]
#[command(name = "salary-dashboard", version, about)]
struct Cli {
    /// Path to the salary CSV file
    #[arg(env = DATASET_ENV, default_value = DEFAULT_DATASET_PATH)]
    dataset: PathBuf,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = DashboardConfig::from_env(cli.dataset)?;

    let dataset = Dataset::open(&config.dataset_path, config.load).with_context(|| {
        format!("failed to load dataset {}", config.dataset_path.display())
    })?;
    info!(rows = dataset.len(), "dashboard ready");

    let stdin = io::stdin();
    let interactive = stdin.is_terminal();
    Session::new(&dataset, config.render).run(stdin.lock(), io::stdout().lock(), interactive)?;

    Ok(())
}
