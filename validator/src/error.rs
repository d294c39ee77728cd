//! Error types for the rule mining and validation pipeline.
//!
//! This module defines the error hierarchy:
//!
//! - [`ConfigError`] - Invalid environment configuration
//! - [`IngestError`] - Reading sheets and workbooks
//! - [`FetchError`] - Downloading the rule source
//! - [`RuleError`] - Applying a single rule to a sheet
//! - [`SheetError`] - A whole sheet could not be validated
//! - [`PipelineError`] - Top-level orchestration errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.
//!
//! Note that row-level findings are *not* errors in this sense: they are
//! [`crate::models::ValidationError`] values produced by the rule engine.

use thiserror::Error;

// =============================================================================
// Config Errors
// =============================================================================

/// Errors while loading configuration from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },
}

// =============================================================================
// Ingest Errors
// =============================================================================

/// Errors while reading sheets and workbooks.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Failed to read file or directory.
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Invalid CSV content.
    #[error("Invalid CSV in sheet '{sheet}': {message}")]
    Csv { sheet: String, message: String },

    /// Workbook has no sheet.
    #[error("No sheets found in {0}")]
    EmptyWorkbook(String),

    /// Sheet name requested but not present in the workbook.
    #[error("Sheet not found: {0}")]
    SheetNotFound(String),

    /// Two CSV files map to the same sheet name.
    #[error("Duplicate sheet: {0}")]
    DuplicateSheet(String),

    /// A spreadsheet file or one of its sheets could not be decoded.
    #[error("Failed to read spreadsheet {name}: {message}")]
    Spreadsheet { name: String, message: String },
}

impl IngestError {
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

// =============================================================================
// Fetch Errors
// =============================================================================

/// Errors while downloading a rule source.
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP transport failure.
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    /// Server answered with a non-success status.
    #[error("Server returned {status} for {url}")]
    Status { status: u16, url: String },
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        FetchError::RequestFailed(e.to_string())
    }
}

// =============================================================================
// Rule Errors
// =============================================================================

/// A failure while applying one rule.
///
/// The engine turns each of these into exactly one `RULE_PROCESSING_ERROR`
/// finding and moves on to the next rule.
#[derive(Debug, Error)]
pub enum RuleError {
    /// The quoted pattern of a regex rule is not a valid regular expression.
    #[error("Invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },
}

// =============================================================================
// Sheet Errors
// =============================================================================

/// A failure that prevents a whole sheet from being validated.
#[derive(Debug, Error)]
pub enum SheetError {
    /// Reading the sheet failed.
    #[error(transparent)]
    Ingest(#[from] IngestError),
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline orchestration errors.
///
/// This is the main error type returned by [`crate::pipeline::extract_rules`]
/// and [`crate::pipeline::validate_workbook_dir`].
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Configuration could not be loaded.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Reading sheets failed.
    #[error("Ingest error: {0}")]
    Ingest(#[from] IngestError),

    /// Downloading the rule source failed.
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// The rule source produced no rules.
    #[error("No validation rules found in {0}")]
    NoRules(String),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for ingest operations.
pub type IngestResult<T> = Result<T, IngestError>;

/// Result type for fetch operations.
pub type FetchResult<T> = Result<T, FetchError>;

/// Result type for single rule application.
pub type RuleResult<T> = Result<T, RuleError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;
