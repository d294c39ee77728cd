//! # ECB Validator - rule mining and validation for ECB/EBA reporting tables
//!
//! Reads the free-text validation rules published alongside the ECB/EBA
//! Register of Information templates, turns them into structured rules and
//! applies them to the table sheets of a submission workbook.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ Rule source │────▶│   Mining    │────▶│   Engine    │────▶│   Report    │
//! │ (xlsx / URL)│     │ (scan+parse)│     │ (per sheet) │     │ (MD + JSON) │
//! └─────────────┘     └─────────────┘     └──────▲──────┘     └─────────────┘
//!                                                │
//!                                         ┌──────┴──────┐
//!                                         │  Workbook   │
//!                                         │ (xlsx / CSV)│
//!                                         └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ecb_validator::{extract_rules, validate_workbook_dir, RulesSource, ValidationOptions};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() {
//!     let rules = extract_rules(&RulesSource::parse("rules.csv")).await.unwrap();
//!     let run = validate_workbook_dir(&rules, Path::new("submission/"), &ValidationOptions::default()).unwrap();
//!     println!("{}", run.report);
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Rules, sheet data, findings and results
//! - [`mining`] - Expression scanner and rule classifier
//! - [`engine`] - Column resolution and rule application
//! - [`parser`] - Spreadsheet and CSV workbooks with auto-detection
//! - [`fetch`] - Rule source retrieval (path or URL)
//! - [`report`] - Markdown report and JSON envelope
//! - [`config`] - Environment configuration
//! - [`logs`] - Progress logging on stderr

// Core modules
pub mod error;
pub mod logs;
pub mod models;

// Rules
pub mod engine;
pub mod mining;

// Input
pub mod fetch;
pub mod parser;

// Output
pub mod report;

pub mod config;
pub mod pipeline;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ConfigError, FetchError, IngestError, PipelineError, PipelineResult, RuleError, SheetError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    CellValue, ColumnRef, DataRow, ErrorType, OverallStatus, RuleType, Schema, SheetData,
    SheetStatus, SheetValidationResult, ValidationError, ValidationResults, ValidationRule,
};

// =============================================================================
// Re-exports - Mining
// =============================================================================

pub use mining::{
    classify_rule_type, is_rule_expression, mine_rules, parse_rule, scan_cells, CellSheet,
    RawCell, RuleSetSummary,
};

// =============================================================================
// Re-exports - Engine
// =============================================================================

pub use engine::{apply_rule, resolve, validate_sheet, validate_sheets};

// =============================================================================
// Re-exports - Input
// =============================================================================

pub use fetch::RulesSource;
pub use parser::{
    decode_content, detect_delimiter, detect_encoding, is_table_sheet, GridSheet, SheetFormat,
    SheetLayout, Workbook,
};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use config::{ValidationOptions, ValidatorConfig};
pub use pipeline::{extract_rules, validate_workbook, validate_workbook_dir, ValidationRun};
pub use report::{render_markdown, ReportEnvelope};
