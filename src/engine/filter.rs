//! Set-membership filtering over the four dashboard dimensions.

use std::collections::BTreeSet;

use rayon::iter::{IndexedParallelIterator, IntoParallelRefIterator, ParallelIterator};
use serde::{Serialize, Serializer, ser::SerializeSeq};

use crate::dataset::{Dataset, Field, RecordRef};

/// The values selected on each filter dimension.
///
/// A record passes when its year, experience level, job title and company size
/// are all members of the corresponding set. An empty set matches nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterSelection {
    pub years: BTreeSet<i64>,
    pub experience_levels: BTreeSet<String>,
    pub job_titles: BTreeSet<String>,
    pub company_sizes: BTreeSet<String>,
}

impl FilterSelection {
    /// Every observed value selected, the dashboard's initial state.
    pub fn all(dataset: &Dataset) -> Self {
        FilterOptions::from_dataset(dataset).select_all()
    }

    pub fn has_empty_dimension(&self) -> bool {
        self.years.is_empty()
            || self.experience_levels.is_empty()
            || self.job_titles.is_empty()
            || self.company_sizes.is_empty()
    }
}

/// Distinct values present in a dataset per filter dimension, sorted ascending.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterOptions {
    pub years: BTreeSet<i64>,
    pub experience_levels: BTreeSet<String>,
    pub job_titles: BTreeSet<String>,
    pub company_sizes: BTreeSet<String>,
}

impl FilterOptions {
    pub fn from_dataset(dataset: &Dataset) -> Self {
        let distinct = |field: Field| -> BTreeSet<String> {
            let mut seen: BTreeSet<&str> = BTreeSet::new();
            for row in 0..dataset.len() {
                seen.insert(dataset.text(field, row));
            }
            seen.into_iter().map(str::to_string).collect()
        };

        FilterOptions {
            years: dataset.work_years().iter().copied().collect(),
            experience_levels: distinct(Field::ExperienceLevel),
            job_titles: distinct(Field::JobTitle),
            company_sizes: distinct(Field::CompanySize),
        }
    }

    pub fn select_all(&self) -> FilterSelection {
        FilterSelection {
            years: self.years.clone(),
            experience_levels: self.experience_levels.clone(),
            job_titles: self.job_titles.clone(),
            company_sizes: self.company_sizes.clone(),
        }
    }
}

/// The rows of a dataset that passed a filter, in dataset order.
#[derive(Debug, Clone)]
pub struct FilteredView<'a> {
    dataset: &'a Dataset,
    rows: Vec<usize>,
}

impl<'a> FilteredView<'a> {
    /// A view over every row of `dataset`.
    pub fn full(dataset: &'a Dataset) -> Self {
        FilteredView {
            dataset,
            rows: (0..dataset.len()).collect(),
        }
    }

    pub fn dataset(&self) -> &'a Dataset {
        self.dataset
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Ascending dataset row indices.
    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    pub fn records(&self) -> impl Iterator<Item = RecordRef<'a>> + '_ {
        let dataset = self.dataset;
        self.rows.iter().map(move |&row| dataset.record(row))
    }

    pub fn salaries(&self) -> impl Iterator<Item = f64> + '_ {
        let salaries = self.dataset.salaries();
        self.rows.iter().map(move |&row| salaries[row])
    }

    pub fn texts(&self, field: Field) -> impl Iterator<Item = &'a str> + '_ {
        let dataset = self.dataset;
        self.rows.iter().map(move |&row| dataset.text(field, row))
    }

    pub fn job_titles(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.texts(Field::JobTitle)
    }
}

impl Serialize for FilteredView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.len()))?;
        for record in self.records() {
            seq.serialize_element(&record)?;
        }
        seq.end()
    }
}

/// Applies `selection` to `dataset`.
///
/// Each dimension is scanned independently and the matching row lists are
/// intersected, so the result keeps dataset order. Never fails; values absent
/// from the dataset simply match nothing.
pub fn filter<'a>(dataset: &'a Dataset, selection: &FilterSelection) -> FilteredView<'a> {
    if dataset.is_empty() || selection.has_empty_dimension() {
        return FilteredView {
            dataset,
            rows: Vec::new(),
        };
    }

    let per_dimension = [
        matching_years(dataset, &selection.years),
        matching_text(dataset, Field::ExperienceLevel, &selection.experience_levels),
        matching_text(dataset, Field::JobTitle, &selection.job_titles),
        matching_text(dataset, Field::CompanySize, &selection.company_sizes),
    ];

    let rows = per_dimension
        .into_iter()
        .reduce(intersect_sorted_vecs)
        .unwrap_or_default();

    FilteredView { dataset, rows }
}

fn matching_years(dataset: &Dataset, years: &BTreeSet<i64>) -> Vec<usize> {
    dataset
        .work_years()
        .par_iter()
        .enumerate()
        .filter_map(|(i, year)| years.contains(year).then_some(i))
        .collect()
}

fn matching_text(dataset: &Dataset, field: Field, values: &BTreeSet<String>) -> Vec<usize> {
    dataset
        .column(field)
        .as_spans()
        .par_iter()
        .enumerate()
        .filter_map(|(i, _)| values.contains(dataset.text(field, i)).then_some(i))
        .collect()
}

/// Intersects two ascending row lists.
fn intersect_sorted_vecs(a: Vec<usize>, b: Vec<usize>) -> Vec<usize> {
    let mut result = Vec::with_capacity(a.len().min(b.len()));
    let mut i = 0;
    let mut j = 0;

    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Equal => {
                result.push(a[i]);
                i += 1;
                j += 1;
            }
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Record;

    fn record(year: i64, level: &str, title: &str, size: &str) -> Record {
        Record {
            work_year: year,
            experience_level: level.into(),
            employment_type: "FT".into(),
            job_title: title.into(),
            salary_in_usd: 100_000.0,
            remote_ratio: "0".into(),
            company_size: size.into(),
            employee_country: "US".into(),
        }
    }

    fn sample() -> Dataset {
        Dataset::from_records(&[
            record(2023, "SE", "Data Scientist", "M"),
            record(2024, "MI", "Data Engineer", "L"),
            record(2024, "SE", "Data Scientist", "S"),
            record(2022, "EN", "Data Analyst", "M"),
            record(2024, "SE", "Data Engineer", "M"),
        ])
        .unwrap()
    }

    fn set<T: Ord + Clone>(values: &[T]) -> BTreeSet<T> {
        values.iter().cloned().collect()
    }

    fn strings(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_options_are_sorted_distinct_values() {
        let options = FilterOptions::from_dataset(&sample());
        assert_eq!(options.years, set(&[2022, 2023, 2024]));
        assert_eq!(
            options.job_titles.iter().collect::<Vec<_>>(),
            vec!["Data Analyst", "Data Engineer", "Data Scientist"]
        );
        assert_eq!(options.company_sizes, strings(&["L", "M", "S"]));
    }

    #[test]
    fn test_full_selection_keeps_every_row() {
        let ds = sample();
        let view = filter(&ds, &FilterSelection::all(&ds));
        assert_eq!(view.rows(), &[0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_dimensions_are_anded() {
        let ds = sample();
        let mut selection = FilterSelection::all(&ds);
        selection.years = set(&[2024]);
        selection.experience_levels = strings(&["SE"]);

        let view = filter(&ds, &selection);
        assert_eq!(view.rows(), &[2, 4]);
        assert!(view.records().all(|r| r.work_year == 2024 && r.experience_level == "SE"));
    }

    #[test]
    fn test_empty_dimension_yields_empty_view() {
        let ds = sample();
        let mut selection = FilterSelection::all(&ds);
        selection.company_sizes.clear();
        assert!(filter(&ds, &selection).is_empty());
        assert!(filter(&ds, &FilterSelection::default()).is_empty());
    }

    #[test]
    fn test_unknown_values_match_nothing() {
        let ds = sample();
        let mut selection = FilterSelection::all(&ds);
        selection.job_titles = strings(&["Astronaut"]);
        assert!(filter(&ds, &selection).is_empty());

        selection.job_titles = strings(&["Astronaut", "Data Analyst"]);
        assert_eq!(filter(&ds, &selection).rows(), &[3]);
    }

    #[test]
    fn test_intersect_sorted_vecs() {
        assert_eq!(
            intersect_sorted_vecs(vec![0, 2, 4, 6], vec![1, 2, 3, 6, 7]),
            vec![2, 6]
        );
        assert!(intersect_sorted_vecs(vec![], vec![1]).is_empty());
    }

    #[test]
    fn test_view_serializes_as_records() {
        let ds = sample();
        let mut selection = FilterSelection::all(&ds);
        selection.years = set(&[2022]);
        let json = serde_json::to_value(filter(&ds, &selection)).unwrap();
        assert_eq!(json[0]["job_title"], "Data Analyst");
        assert_eq!(json.as_array().map(Vec::len), Some(1));
    }
}
