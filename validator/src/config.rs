//! Runtime configuration.
//!
//! Values come from the process environment, optionally seeded from a
//! `.env` file. Command-line flags override them.
//!
//! | Variable | Meaning | Default |
//! |---|---|---|
//! | `ECB_RULES_SOURCE` | Rule source (path or URL) | published EBA workbook |
//! | `ECB_TABLE_FILTER` | Only validate sheets containing this text | none |
//! | `ECB_REPORT_MAX_ERRORS` | Errors listed per sheet in the report | 20 |

use serde::{Deserialize, Serialize};
use std::env;

use crate::error::ConfigError;
use crate::parser::SheetLayout;

/// Published overview of the RoI technical checks and validation rules.
pub const DEFAULT_RULES_URL: &str = "https://eba.europa.eu/sites/default/files/2025-04/10100a51-275f-4c98-96a1-f81342a8f57d/Overview%20of%20the%20RoI%20reporting%20technical%20checks%20and%20validation%20rules%20%28updated%2028%20April%202025%29%20%284%29.xlsx";

pub const DEFAULT_REPORT_MAX_ERRORS: usize = 20;

pub const ENV_RULES_SOURCE: &str = "ECB_RULES_SOURCE";
pub const ENV_TABLE_FILTER: &str = "ECB_TABLE_FILTER";
pub const ENV_REPORT_MAX_ERRORS: &str = "ECB_REPORT_MAX_ERRORS";

/// Options for one validation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationOptions {
    /// Only validate table sheets whose name contains this text.
    pub table_filter: Option<String>,
    /// Where codes and data sit in a table sheet.
    pub layout: SheetLayout,
    /// Errors listed per sheet in the Markdown report.
    pub report_max_errors: usize,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            table_filter: None,
            layout: SheetLayout::default(),
            report_max_errors: DEFAULT_REPORT_MAX_ERRORS,
        }
    }
}

/// Configuration loaded from the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatorConfig {
    pub rules_source: String,
    pub table_filter: Option<String>,
    pub report_max_errors: usize,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            rules_source: DEFAULT_RULES_URL.to_string(),
            table_filter: None,
            report_max_errors: DEFAULT_REPORT_MAX_ERRORS,
        }
    }
}

impl ValidatorConfig {
    /// Load from the environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        if let Some(source) = get(ENV_RULES_SOURCE) {
            config.rules_source = source;
        }
        config.table_filter = get(ENV_TABLE_FILTER);

        if let Some(raw) = get(ENV_REPORT_MAX_ERRORS) {
            config.report_max_errors = raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: ENV_REPORT_MAX_ERRORS.to_string(),
                value: raw.clone(),
            })?;
        }

        Ok(config)
    }

    pub fn with_rules_source(mut self, source: impl Into<String>) -> Self {
        self.rules_source = source.into();
        self
    }

    pub fn with_table_filter(mut self, filter: impl Into<String>) -> Self {
        self.table_filter = Some(filter.into());
        self
    }

    /// Options for a validation run.
    pub fn options(&self) -> ValidationOptions {
        ValidationOptions {
            table_filter: self.table_filter.clone(),
            report_max_errors: self.report_max_errors,
            ..Default::default()
        }
    }
}
