use std::path::PathBuf;

use clap::Parser;
use salary_dashboard::dataset::{Dataset, LoadOptions};
use salary_dashboard::engine::{filter::FilterSelection, recompute};

#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

/// Heap profile of loading a dataset and recomputing the dashboard once
#[derive(Parser, Debug)]
struct Args {
    /// CSV to profile
    #[arg(default_value = "data/salaries_synthetic.csv")]
    dataset: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let _profiler = dhat::Profiler::new_heap();

    let dataset = Dataset::open(&args.dataset, LoadOptions::default())?;
    let snapshot = recompute(&dataset, &FilterSelection::all(&dataset));
    println!(
        "{} records, mean salary {:.0}",
        snapshot.kpis.record_count, snapshot.kpis.mean_salary_usd
    );

    println!("Memory benchmark finished. See dhat-heap.json for details");
    Ok(())
}
