//! # salary-dashboard
//!
//! An interactive dashboard over a tabular dataset of data-professional salaries.
//! It supports:
//!
//! - Memory-mapped CSV loading with parallel chunk parsing
//! - Columnar storage: typed numeric columns, text as spans into the CSV buffer
//! - Multi-select filtering on work year, experience level, job title and company size
//! - KPI summaries and chart inputs recomputed from scratch on every change
//! - SIMD-accelerated salary extent (AVX2 when available, scalar fallback)
//!
//! # Example
//!
//! ```rust,no_run
//! use salary_dashboard::dataset::{Dataset, LoadOptions};
//! use salary_dashboard::engine::{filter::FilterSelection, recompute};
//! use std::path::Path;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let dataset = Dataset::open(Path::new("data.csv"), LoadOptions::default())?;
//!
//!     let mut selection = FilterSelection::all(&dataset);
//!     selection.experience_levels.retain(|level| level == "SE");
//!
//!     let snapshot = recompute(&dataset, &selection);
//!     println!("Senior mean salary: {}", snapshot.kpis.mean_salary_usd);
//!     for entry in &snapshot.charts.top_job_titles {
//!         println!("{} => {}", entry.job_title, entry.salary_in_usd);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod dataset;
pub mod engine;
mod helpers;
pub mod report;
pub mod session;
pub mod synthetic;

pub use dataset::{Dataset, DatasetError, LoadOptions, Record};
pub use engine::{Snapshot, recompute};
