//! KPI and chart aggregates over a [`FilteredView`].
//!
//! Every function here is total: an empty view produces the zero state
//! (zeros, an empty title, no groups, no bins) rather than an error.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::dataset::Field;
use crate::engine::filter::FilteredView;
use crate::helpers::simd_helpers::extent_f64;

/// Number of groups in the top job titles chart.
pub const TOP_JOB_TITLES: usize = 10;

/// Number of equal-width bins in the salary histogram.
pub const HISTOGRAM_BINS: usize = 30;

/// The four headline metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KpiSummary {
    pub mean_salary_usd: f64,
    pub max_salary_usd: f64,
    pub record_count: usize,
    pub most_frequent_job_title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobTitleSalary {
    pub job_title: String,
    /// Mean salary of the group
    pub salary_in_usd: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

/// Salary distribution. Bin `i` covers `[lower, upper)`; the last bin also includes
/// its upper bound.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SalaryHistogram {
    pub bins: Vec<HistogramBin>,
}

impl SalaryHistogram {
    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    pub fn total(&self) -> usize {
        self.bins.iter().map(|b| b.count).sum()
    }
}

/// Record count per `remote_ratio` value.
///
/// Serialised under the `employment_type` / `quantity` labels of the donut chart,
/// although the grouped field is `remote_ratio`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteRatioCount {
    #[serde(rename = "employment_type")]
    pub remote_ratio: String,
    pub quantity: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountryCount {
    pub employee_country: String,
    pub employee_count: usize,
}

/// Inputs for the four dashboard charts.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartAggregates {
    /// Ascending by mean salary, at most [`TOP_JOB_TITLES`] entries
    pub top_job_titles: Vec<JobTitleSalary>,
    pub salary_histogram: SalaryHistogram,
    /// Descending by count
    pub remote_ratio: Vec<RemoteRatioCount>,
    /// Ascending by country code
    pub countries: Vec<CountryCount>,
}

/// Running sum and count of one group.
#[derive(Debug, Clone, Copy, Default)]
struct GroupStats {
    sum: f64,
    count: usize,
}

impl GroupStats {
    fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    fn mean(&self) -> f64 {
        self.sum / self.count as f64
    }
}

/// Computes the headline metrics of `view`.
///
/// The most frequent job title breaks ties in favour of the title seen first
/// in the view.
pub fn summarize(view: &FilteredView<'_>) -> KpiSummary {
    let salaries: Vec<f64> = view.salaries().collect();
    let Some(extent) = extent_f64(&salaries) else {
        return KpiSummary::default();
    };

    KpiSummary {
        mean_salary_usd: extent.sum / salaries.len() as f64,
        max_salary_usd: extent.max,
        record_count: view.len(),
        most_frequent_job_title: first_mode(view.job_titles())
            .unwrap_or_default()
            .to_string(),
    }
}

/// The most common value; among equally common values, the one that occurred first.
fn first_mode<'a>(values: impl Iterator<Item = &'a str>) -> Option<&'a str> {
    // value -> (count, first position)
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for (pos, value) in values.enumerate() {
        counts.entry(value).or_insert((0, pos)).0 += 1;
    }

    counts
        .into_iter()
        .max_by(|(_, (count_a, pos_a)), (_, (count_b, pos_b))| {
            count_a.cmp(count_b).then(pos_b.cmp(pos_a))
        })
        .map(|(value, _)| value)
}

/// The `limit` job titles with the highest mean salary, returned in ascending
/// order of mean salary. Equal means are ranked by job title.
pub fn top_job_titles(view: &FilteredView<'_>, limit: usize) -> Vec<JobTitleSalary> {
    let mut groups: BTreeMap<&str, GroupStats> = BTreeMap::new();
    for (title, salary) in view.job_titles().zip(view.salaries()) {
        groups.entry(title).or_default().add(salary);
    }

    let mut means: Vec<(&str, f64)> = groups
        .into_iter()
        .map(|(title, stats)| (title, stats.mean()))
        .collect();

    // Both sorts are stable, so ties keep title order
    means.sort_by(|a, b| b.1.total_cmp(&a.1));
    means.truncate(limit);
    means.sort_by(|a, b| a.1.total_cmp(&b.1));

    means
        .into_iter()
        .map(|(title, mean)| JobTitleSalary {
            job_title: title.to_string(),
            salary_in_usd: mean,
        })
        .collect()
}

/// Splits the observed salary range into `bins` equal-width bins.
///
/// When every salary is the same the range is empty; a width of 1 is used so
/// all records fall into the first bin.
pub fn salary_histogram(view: &FilteredView<'_>, bins: usize) -> SalaryHistogram {
    let salaries: Vec<f64> = view.salaries().collect();
    let Some(extent) = extent_f64(&salaries) else {
        return SalaryHistogram::default();
    };
    if bins == 0 {
        return SalaryHistogram::default();
    }

    let range = extent.max - extent.min;
    let width = if range > 0.0 { range / bins as f64 } else { 1.0 };

    let mut counts = vec![0usize; bins];
    for salary in salaries {
        let idx = (((salary - extent.min) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }

    let bins = counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| {
            let lower = extent.min + i as f64 * width;
            let upper = if i == bins - 1 && range > 0.0 {
                extent.max
            } else {
                extent.min + (i + 1) as f64 * width
            };
            HistogramBin {
                lower,
                upper,
                count,
            }
        })
        .collect();

    SalaryHistogram { bins }
}

fn count_by<'a>(view: &FilteredView<'a>, field: Field) -> BTreeMap<&'a str, usize> {
    let mut counts = BTreeMap::new();
    for value in view.texts(field) {
        *counts.entry(value).or_insert(0) += 1;
    }
    counts
}

/// Record count per work arrangement, most common first.
pub fn remote_ratio_distribution(view: &FilteredView<'_>) -> Vec<RemoteRatioCount> {
    let mut counts: Vec<(&str, usize)> = count_by(view, Field::RemoteRatio).into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1));

    counts
        .into_iter()
        .map(|(value, quantity)| RemoteRatioCount {
            remote_ratio: value.to_string(),
            quantity,
        })
        .collect()
}

/// Record count per employee country, by country code.
pub fn country_counts(view: &FilteredView<'_>) -> Vec<CountryCount> {
    count_by(view, Field::EmployeeCountry)
        .into_iter()
        .map(|(country, count)| CountryCount {
            employee_country: country.to_string(),
            employee_count: count,
        })
        .collect()
}

/// Builds all four chart inputs.
pub fn build_chart_aggregates(view: &FilteredView<'_>) -> ChartAggregates {
    if view.is_empty() {
        return ChartAggregates::default();
    }

    ChartAggregates {
        top_job_titles: top_job_titles(view, TOP_JOB_TITLES),
        salary_histogram: salary_histogram(view, HISTOGRAM_BINS),
        remote_ratio: remote_ratio_distribution(view),
        countries: country_counts(view),
    }
}
