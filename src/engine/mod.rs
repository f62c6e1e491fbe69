//! The filter → summarize → chart pipeline.

use std::time::Instant;

use serde::Serialize;
use tracing::debug;

use crate::dataset::Dataset;

pub mod aggregate;
pub mod filter;

use aggregate::{ChartAggregates, KpiSummary, build_chart_aggregates, summarize};
use filter::{FilterSelection, FilteredView};

/// Everything the dashboard shows for one filter selection.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot<'a> {
    pub selection: FilterSelection,
    pub kpis: KpiSummary,
    pub charts: ChartAggregates,
    #[serde(rename = "records")]
    pub view: FilteredView<'a>,
}

/// Recomputes the filtered view, KPIs and chart inputs from scratch.
///
/// Pure: the same dataset and selection always give the same snapshot.
pub fn recompute<'a>(dataset: &'a Dataset, selection: &FilterSelection) -> Snapshot<'a> {
    let started = Instant::now();

    let view = filter::filter(dataset, selection);
    let kpis = summarize(&view);
    let charts = build_chart_aggregates(&view);

    debug!(
        matched = view.len(),
        total = dataset.len(),
        elapsed_us = started.elapsed().as_micros() as u64,
        "recomputed snapshot"
    );

    Snapshot {
        selection: selection.clone(),
        kpis,
        charts,
        view,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Record;

    fn dataset() -> Dataset {
        let records: Vec<Record> = [
            (2023, "SE", "Data Scientist", 150_000.0, "100", "US"),
            (2024, "MI", "Data Analyst", 70_000.0, "0", "BR"),
            (2024, "SE", "Data Scientist", 170_000.0, "50", "US"),
        ]
        .into_iter()
        .map(|(year, level, title, salary, remote, country)| Record {
            work_year: year,
            experience_level: level.into(),
            employment_type: "FT".into(),
            job_title: title.into(),
            salary_in_usd: salary,
            remote_ratio: remote.into(),
            company_size: "M".into(),
            employee_country: country.into(),
        })
        .collect();
        Dataset::from_records(&records).unwrap()
    }

    #[test]
    fn test_recompute_is_consistent() {
        let ds = dataset();
        let snapshot = recompute(&ds, &FilterSelection::all(&ds));

        assert_eq!(snapshot.kpis.record_count, snapshot.view.len());
        assert_eq!(snapshot.charts.salary_histogram.total(), 3);
        assert_eq!(snapshot.kpis.most_frequent_job_title, "Data Scientist");
        assert_eq!(snapshot.charts.countries.len(), 2);
    }

    #[test]
    fn test_recompute_is_idempotent() {
        let ds = dataset();
        let mut selection = FilterSelection::all(&ds);
        selection.years.remove(&2023);

        let a = recompute(&ds, &selection);
        let b = recompute(&ds, &selection);
        assert_eq!(a.view.rows(), b.view.rows());
        assert_eq!(a.kpis, b.kpis);
        assert_eq!(a.charts, b.charts);
        assert_eq!(a.kpis.mean_salary_usd, 120_000.0);
    }

    #[test]
    fn test_snapshot_json_shape() {
        let ds = dataset();
        let json = serde_json::to_value(recompute(&ds, &FilterSelection::all(&ds))).unwrap();

        assert_eq!(json["kpis"]["record_count"], 3);
        assert_eq!(json["records"].as_array().map(Vec::len), Some(3));
        assert_eq!(json["charts"]["salary_histogram"]["bins"].as_array().map(Vec::len), Some(30));
        assert_eq!(json["selection"]["years"], serde_json::json!([2023, 2024]));
    }
}
