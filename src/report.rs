//! Terminal rendering of a [`Snapshot`]: KPI cards, the four charts as tables,
//! and the detail table of filtered records.

use std::collections::BTreeSet;

use comfy_table::{Cell, CellAlignment, Table, presets::UTF8_FULL};

use crate::engine::Snapshot;
use crate::engine::aggregate::{
    CountryCount, JobTitleSalary, KpiSummary, RemoteRatioCount, SalaryHistogram,
};
use crate::engine::filter::{FilterOptions, FilteredView};

pub const NO_JOB_TITLE_DATA: &str = "No data to display in the job titles chart.";
pub const NO_DISTRIBUTION_DATA: &str = "No data to display in the salary distribution chart.";
pub const NO_REMOTE_DATA: &str = "No data to display in the work arrangement chart.";
pub const NO_COUNTRY_DATA: &str = "No data to display in the countries chart.";

const BAR_WIDTH: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Maximum number of records printed in the detail table
    pub detail_rows: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions { detail_rows: 20 }
    }
}

/// `$1,234` style, rounded to whole dollars.
pub fn format_usd(value: f64) -> String {
    let rounded = value.round();
    let sign = if rounded < 0.0 { "-" } else { "" };
    format!("{sign}${}", group_thousands(rounded.abs() as u128))
}

pub fn format_count(value: usize) -> String {
    group_thousands(value as u128)
}

fn group_thousands(value: u128) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn bar(value: f64, max: f64) -> String {
    if max <= 0.0 || value <= 0.0 {
        return String::new();
    }
    let len = ((value / max) * BAR_WIDTH as f64).round() as usize;
    "█".repeat(len.clamp(1, BAR_WIDTH))
}

fn new_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table
}

fn right(text: impl std::fmt::Display) -> Cell {
    Cell::new(text).set_alignment(CellAlignment::Right)
}

pub fn render_kpis(kpis: &KpiSummary) -> Table {
    let mut table = new_table();
    table.set_header(vec![
        "Average salary",
        "Maximum salary",
        "Total records",
        "Most frequent job title",
    ]);
    table.add_row(vec![
        right(format_usd(kpis.mean_salary_usd)),
        right(format_usd(kpis.max_salary_usd)),
        right(format_count(kpis.record_count)),
        Cell::new(&kpis.most_frequent_job_title),
    ]);
    table
}

/// Highest mean first, the way the horizontal bar chart reads top to bottom.
pub fn render_top_job_titles(top: &[JobTitleSalary]) -> Option<Table> {
    if top.is_empty() {
        return None;
    }
    let max = top.iter().map(|t| t.salary_in_usd).fold(0.0, f64::max);

    let mut table = new_table();
    table.set_header(vec!["Job title", "Average annual salary (USD)", ""]);
    for entry in top.iter().rev() {
        table.add_row(vec![
            Cell::new(&entry.job_title),
            right(format_usd(entry.salary_in_usd)),
            Cell::new(bar(entry.salary_in_usd, max)),
        ]);
    }
    Some(table)
}

pub fn render_histogram(histogram: &SalaryHistogram) -> Option<Table> {
    if histogram.is_empty() {
        return None;
    }
    let max = histogram.bins.iter().map(|b| b.count).max().unwrap_or(0) as f64;

    let mut table = new_table();
    table.set_header(vec!["Salary range (USD)", "Records", ""]);
    for bin in &histogram.bins {
        table.add_row(vec![
            Cell::new(format!("{} - {}", format_usd(bin.lower), format_usd(bin.upper))),
            right(format_count(bin.count)),
            Cell::new(bar(bin.count as f64, max)),
        ]);
    }
    Some(table)
}

pub fn render_remote_ratio(counts: &[RemoteRatioCount]) -> Option<Table> {
    if counts.is_empty() {
        return None;
    }
    let total: usize = counts.iter().map(|c| c.quantity).sum();

    let mut table = new_table();
    table.set_header(vec!["Work arrangement", "Records", "Share"]);
    for entry in counts {
        let share = entry.quantity as f64 / total as f64 * 100.0;
        table.add_row(vec![
            Cell::new(&entry.remote_ratio),
            right(format_count(entry.quantity)),
            right(format!("{share:.1}%")),
        ]);
    }
    Some(table)
}

pub fn render_countries(counts: &[CountryCount]) -> Option<Table> {
    if counts.is_empty() {
        return None;
    }
    let max = counts.iter().map(|c| c.employee_count).max().unwrap_or(0) as f64;

    let mut table = new_table();
    table.set_header(vec!["Country", "Employees", ""]);
    for entry in counts {
        table.add_row(vec![
            Cell::new(&entry.employee_country),
            right(format_count(entry.employee_count)),
            Cell::new(bar(entry.employee_count as f64, max)),
        ]);
    }
    Some(table)
}

/// The filtered records, at most `limit` of them.
pub fn render_detail(view: &FilteredView<'_>, limit: usize) -> String {
    let mut table = new_table();
    table.set_header(vec![
        "work_year",
        "experience_level",
        "employment_type",
        "job_title",
        "salary_in_usd",
        "remote_ratio",
        "company_size",
        "employee_country",
    ]);
    for record in view.records().take(limit) {
        table.add_row(vec![
            Cell::new(record.work_year),
            Cell::new(record.experience_level),
            Cell::new(record.employment_type),
            Cell::new(record.job_title),
            right(format_usd(record.salary_in_usd)),
            Cell::new(record.remote_ratio),
            Cell::new(record.company_size),
            Cell::new(record.employee_country),
        ]);
    }

    let mut out = table.to_string();
    if view.len() > limit {
        out.push_str(&format!("\n… {} more rows", format_count(view.len() - limit)));
    }
    out
}

fn section(title: &str, body: Option<Table>, placeholder: &str) -> String {
    match body {
        Some(table) => format!("{title}\n{table}"),
        None => format!("{title}\n⚠ {placeholder}"),
    }
}

/// Renders the whole dashboard as text.
pub fn render_dashboard(snapshot: &Snapshot<'_>, options: &RenderOptions) -> String {
    let charts = &snapshot.charts;
    let sections = [
        "Salary data dashboard".to_string(),
        format!(
            "Overall metrics (annual salary in USD)\n{}",
            render_kpis(&snapshot.kpis)
        ),
        section(
            "Top 10 job titles by average salary",
            render_top_job_titles(&charts.top_job_titles),
            NO_JOB_TITLE_DATA,
        ),
        section(
            "Annual salary distribution",
            render_histogram(&charts.salary_histogram),
            NO_DISTRIBUTION_DATA,
        ),
        section(
            "Work arrangement share",
            render_remote_ratio(&charts.remote_ratio),
            NO_REMOTE_DATA,
        ),
        section(
            "Employees by country",
            render_countries(&charts.countries),
            NO_COUNTRY_DATA,
        ),
        format!(
            "Detailed data\n{}",
            render_detail(&snapshot.view, options.detail_rows)
        ),
    ];

    let mut out = sections.join("\n\n");
    out.push('\n');
    out
}

pub fn render_json(snapshot: &Snapshot<'_>) -> serde_json::Result<String> {
    serde_json::to_string_pretty(snapshot)
}

/// Quotes values containing a comma, the way the session expects them typed.
fn option_text(value: &str) -> String {
    if value.contains(',') {
        format!("\"{value}\"")
    } else {
        value.to_string()
    }
}

/// The values each filter dimension can take.
pub fn render_options(options: &FilterOptions) -> String {
    let join = |values: &BTreeSet<String>| {
        values
            .iter()
            .map(|v| option_text(v))
            .collect::<Vec<_>>()
            .join(", ")
    };
    let years = options
        .years
        .iter()
        .map(i64::to_string)
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "year:  {years}\nlevel: {}\ntitle: {}\nsize:  {}\n",
        join(&options.experience_levels),
        join(&options.job_titles),
        join(&options.company_sizes),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Dataset, Record};
    use crate::engine::filter::FilterSelection;
    use crate::engine::recompute;

    fn dataset() -> Dataset {
        let records: Vec<Record> = (0..25)
            .map(|i| Record {
                work_year: 2020 + i % 4,
                experience_level: ["EN", "MI", "SE"][(i % 3) as usize].into(),
                employment_type: "FT".into(),
                job_title: format!("Role {}", i % 12),
                salary_in_usd: 40_000.0 + 7_500.0 * i as f64,
                remote_ratio: ["0", "50", "100"][(i % 3) as usize].into(),
                company_size: "M".into(),
                employee_country: ["US", "BR", "DE"][(i % 3) as usize].into(),
            })
            .collect();
        Dataset::from_records(&records).unwrap()
    }

    #[test]
    fn test_format_usd() {
        assert_eq!(format_usd(0.0), "$0");
        assert_eq!(format_usd(999.4), "$999");
        assert_eq!(format_usd(1234.5), "$1,235");
        assert_eq!(format_usd(1_000_000.0), "$1,000,000");
    }

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(12), "12");
        assert_eq!(format_count(1234), "1,234");
        assert_eq!(format_count(123_456), "123,456");
    }

    #[test]
    fn test_bar_scales_to_width() {
        assert_eq!(bar(10.0, 10.0).chars().count(), BAR_WIDTH);
        assert_eq!(bar(0.0, 10.0), "");
        assert_eq!(bar(0.01, 10.0).chars().count(), 1);
    }

    #[test]
    fn test_dashboard_sections() {
        let ds = dataset();
        let snapshot = recompute(&ds, &FilterSelection::all(&ds));
        let text = render_dashboard(&snapshot, &RenderOptions { detail_rows: 5 });

        assert!(text.contains("Top 10 job titles by average salary"));
        assert!(text.contains("Most frequent job title"));
        assert!(text.contains("… 20 more rows"));
        assert!(!text.contains(NO_JOB_TITLE_DATA));
    }

    #[test]
    fn test_empty_snapshot_shows_placeholders() {
        let ds = dataset();
        let snapshot = recompute(&ds, &FilterSelection::default());
        let text = render_dashboard(&snapshot, &RenderOptions::default());

        for placeholder in [
            NO_JOB_TITLE_DATA,
            NO_DISTRIBUTION_DATA,
            NO_REMOTE_DATA,
            NO_COUNTRY_DATA,
        ] {
            assert!(text.contains(placeholder), "missing: {placeholder}");
        }
        assert!(text.contains("$0"));
    }

    #[test]
    fn test_top_titles_printed_highest_first() {
        let top = vec![
            JobTitleSalary { job_title: "Low".into(), salary_in_usd: 10.0 },
            JobTitleSalary { job_title: "High".into(), salary_in_usd: 90.0 },
        ];
        let text = render_top_job_titles(&top).unwrap().to_string();
        let high = text.find("High").unwrap();
        let low = text.find("Low").unwrap();
        assert!(high < low);
    }

    #[test]
    fn test_options_quote_values_with_commas() {
        let mut options = FilterOptions::default();
        options.job_titles.insert("Engineer, Data".into());
        options.job_titles.insert("ML Engineer".into());
        let text = render_options(&options);
        assert!(text.contains("title: \"Engineer, Data\", ML Engineer\n"));
    }

    #[test]
    fn test_options_listing() {
        let ds = dataset();
        let text = render_options(&FilterOptions::from_dataset(&ds));
        assert!(text.starts_with("year:  2020, 2021, 2022, 2023\n"));
        assert!(text.contains("level: EN, MI, SE"));
    }
}
