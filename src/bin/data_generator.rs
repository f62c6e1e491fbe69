use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use salary_dashboard::dataset::write_csv;
use salary_dashboard::synthetic::generate_records;

/// Writes a synthetic salary CSV for benchmarks and profiling
#[derive(Parser, Debug)]
struct Args {
    /// Number of records to generate
    #[arg(short, long, default_value_t = 1_000_000)]
    rows: usize,

    /// Output CSV path
    #[arg(short, long, default_value = "data/salaries_synthetic.csv")]
    output: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if let Some(parent) = args.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::create(&args.output)
        .with_context(|| format!("cannot create {}", args.output.display()))?;
    let mut writer = BufWriter::new(file);

    let mut rng = rand::rng();
    let records = generate_records(args.rows, &mut rng);
    write_csv(&mut writer, &records)?;
    writer.flush()?;

    println!(
        "Sample CSV generated: {} ({} rows)",
        args.output.display(),
        args.rows
    );
    Ok(())
}
