//! Runtime configuration of the dashboard binary.
//!
//! The dataset path comes from the command line (or `SALARY_DASHBOARD_DATA`);
//! everything else is read from the environment.

use std::path::PathBuf;

use thiserror::Error;

use crate::dataset::LoadOptions;
use crate::report::RenderOptions;

pub const DEFAULT_DATASET_PATH: &str = "./docs/data_imersao_2026.csv";
pub const DATASET_ENV: &str = "SALARY_DASHBOARD_DATA";
pub const LENIENT_ENV: &str = "SALARY_DASHBOARD_LENIENT";
pub const DETAIL_ROWS_ENV: &str = "SALARY_DASHBOARD_DETAIL_ROWS";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be a boolean, got {value:?}")]
    InvalidBool { name: &'static str, value: String },

    #[error("{name} must be a non-negative integer, got {value:?}")]
    InvalidNumber { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardConfig {
    pub dataset_path: PathBuf,
    pub load: LoadOptions,
    pub render: RenderOptions,
}

impl DashboardConfig {
    pub fn from_env(dataset_path: PathBuf) -> Result<Self, ConfigError> {
        Self::from_lookup(dataset_path, |key| std::env::var(key).ok())
    }

    /// Builds the configuration reading variables through `lookup`.
    pub fn from_lookup(
        dataset_path: PathBuf,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut load = LoadOptions::default();
        if let Some(value) = lookup(LENIENT_ENV) {
            load.strict = !parse_bool(LENIENT_ENV, &value)?;
        }

        let mut render = RenderOptions::default();
        if let Some(value) = lookup(DETAIL_ROWS_ENV) {
            render.detail_rows =
                value
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidNumber {
                        name: DETAIL_ROWS_ENV,
                        value,
                    })?;
        }

        Ok(DashboardConfig {
            dataset_path,
            load,
            render,
        })
    }
}

fn parse_bool(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            name,
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<DashboardConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        DashboardConfig::from_lookup(PathBuf::from("data.csv"), |key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = config(&[]).unwrap();
        assert!(cfg.load.strict);
        assert_eq!(cfg.render.detail_rows, 20);
        assert_eq!(cfg.dataset_path, PathBuf::from("data.csv"));
    }

    #[test]
    fn test_overrides() {
        let cfg = config(&[(LENIENT_ENV, "yes"), (DETAIL_ROWS_ENV, " 50 ")]).unwrap();
        assert!(!cfg.load.strict);
        assert_eq!(cfg.render.detail_rows, 50);
    }

    #[test]
    fn test_invalid_values() {
        assert_eq!(
            config(&[(LENIENT_ENV, "maybe")]).unwrap_err(),
            ConfigError::InvalidBool {
                name: LENIENT_ENV,
                value: "maybe".into()
            }
        );
        assert!(matches!(
            config(&[(DETAIL_ROWS_ENV, "-1")]),
            Err(ConfigError::InvalidNumber { .. })
        ));
    }
}
