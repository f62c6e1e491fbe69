//! Random salary records for benchmarks and profiling.

use rand::Rng;

use crate::dataset::Record;

const EXPERIENCE_LEVELS: [&str; 4] = ["EN", "MI", "SE", "EX"];
const EMPLOYMENT_TYPES: [&str; 4] = ["FT", "PT", "CT", "FL"];
const REMOTE_RATIOS: [&str; 3] = ["0", "50", "100"];
const COMPANY_SIZES: [&str; 3] = ["S", "M", "L"];
const COUNTRIES: [&str; 12] = [
    "US", "GB", "CA", "DE", "FR", "ES", "IN", "BR", "PT", "NL", "AU", "JP",
];
const JOB_TITLES: [&str; 16] = [
    "Data Scientist",
    "Data Engineer",
    "Data Analyst",
    "Machine Learning Engineer",
    "Research Scientist",
    "Analytics Engineer",
    "Data Architect",
    "Applied Scientist",
    "Business Intelligence Analyst",
    "ML Ops Engineer",
    "Head of Data",
    "Data Manager",
    "AI Engineer",
    "Computer Vision Engineer",
    "NLP Engineer",
    "Data Science Manager",
];

fn pick<'a, R: Rng>(rng: &mut R, values: &[&'a str]) -> &'a str {
    values[rng.random_range(0..values.len())]
}

/// Generates `rows` records spread over 2020..=2025.
///
/// Salaries scale with the experience level so group means differ.
pub fn generate_records<R: Rng>(rows: usize, rng: &mut R) -> Vec<Record> {
    (0..rows)
        .map(|_| {
            let level = rng.random_range(0..EXPERIENCE_LEVELS.len());
            let base = 45_000.0 + 35_000.0 * level as f64;
            let salary = (base + rng.random_range(0.0..90_000.0)).round();

            Record {
                work_year: rng.random_range(2020..=2025),
                experience_level: EXPERIENCE_LEVELS[level].to_string(),
                employment_type: pick(rng, &EMPLOYMENT_TYPES).to_string(),
                job_title: pick(rng, &JOB_TITLES).to_string(),
                salary_in_usd: salary,
                remote_ratio: pick(rng, &REMOTE_RATIOS).to_string(),
                company_size: pick(rng, &COMPANY_SIZES).to_string(),
                employee_country: pick(rng, &COUNTRIES).to_string(),
            }
        })
        .collect()
}
