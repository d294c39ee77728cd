//! High-level pipeline API.
//!
//! Combines every step of a run: reading the rule source, mining rules,
//! selecting and reading table sheets, applying rules and rendering the
//! report.
//!
//! # Example
//!
//! ```rust,ignore
//! use ecb_validator::pipeline::{extract_rules, validate_workbook_dir};
//! use ecb_validator::{RulesSource, ValidationOptions};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let rules = extract_rules(&RulesSource::parse("rules/")).await?;
//!     let run = validate_workbook_dir(&rules, Path::new("submission/"), &ValidationOptions::default())?;
//!     println!("{}: {} errors", run.results.overall_status, run.results.total_errors);
//!     Ok(())
//! }
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;

use crate::config::ValidationOptions;
use crate::engine::validate_sheets;
use crate::error::{PipelineError, PipelineResult, SheetError};
use crate::fetch::RulesSource;
use crate::logs::{log_info, log_success, log_warning};
use crate::mining::{self, RuleSetSummary};
use crate::models::{SheetData, ValidationResults, ValidationRule};
use crate::parser::Workbook;
use crate::report::{render_markdown, ReportEnvelope};

pub use crate::mining::mine_rules;

/// Outcome of a validation run.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationRun {
    /// Rules the workbook was checked against.
    pub rules: Vec<ValidationRule>,
    pub summary: RuleSetSummary,
    pub results: ValidationResults,
    /// Rendered Markdown report.
    pub report: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip)]
    report_max_errors: usize,
}

impl ValidationRun {
    fn new(rules: &[ValidationRule], results: ValidationResults, options: &ValidationOptions) -> Self {
        let timestamp = Utc::now();
        Self {
            rules: rules.to_vec(),
            summary: RuleSetSummary::from_rules(rules),
            report: render_markdown(&results, options.report_max_errors, timestamp),
            results,
            timestamp,
            report_max_errors: options.report_max_errors,
        }
    }

    pub fn envelope(&self) -> ReportEnvelope {
        ReportEnvelope::new(&self.results, &self.summary, self.report_max_errors, self.timestamp)
    }

    /// JSON envelope of the run.
    pub fn to_json(&self) -> PipelineResult<String> {
        Ok(self.envelope().to_json()?)
    }

    pub fn is_pass(&self) -> bool {
        self.results.is_pass()
    }
}

/// Read a rule source and mine its rules.
///
/// Fails when the source yields no rule at all.
pub async fn extract_rules(source: &RulesSource) -> PipelineResult<Vec<ValidationRule>> {
    log_info(format!("Loading rule source: {}", source));
    let sheets = source.load().await?;
    log_success(format!("Read {} rule sheet(s)", sheets.len()));

    let rules = mining::mine_rules(&sheets);
    if rules.is_empty() {
        return Err(PipelineError::NoRules(source.to_string()));
    }
    Ok(rules)
}

/// Validate the table sheets of a workbook.
///
/// A sheet that cannot be read is reported with status `ERROR`; the other
/// sheets are still validated.
pub fn validate_workbook(
    rules: &[ValidationRule],
    workbook: &Workbook,
    options: &ValidationOptions,
) -> ValidationRun {
    let names = workbook.table_sheets(options.table_filter.as_deref());
    if names.is_empty() {
        log_warning("No table sheets to validate");
    } else {
        log_info(format!("Validating {} table sheet(s)", names.len()));
    }

    let sheets = names.into_iter().map(|name| {
        let data: Result<SheetData, SheetError> = workbook
            .read_sheet(name)
            .map(|sheet| sheet.to_sheet_data(&options.layout))
            .map_err(SheetError::from);
        (name.to_string(), data)
    });

    let results = validate_sheets(sheets, rules);
    log_success(format!(
        "Validation finished: {} ({} errors)",
        results.overall_status, results.total_errors
    ));

    ValidationRun::new(rules, results, options)
}

/// Open a workbook (spreadsheet file or CSV directory) and validate it.
pub fn validate_workbook_dir(
    rules: &[ValidationRule],
    dir: &Path,
    options: &ValidationOptions,
) -> PipelineResult<ValidationRun> {
    let workbook = Workbook::open(dir)?;
    Ok(validate_workbook(rules, &workbook, options))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ErrorType, OverallStatus, SheetStatus};
    use std::fs;
    use tempfile::TempDir;

    const RULES: &str = "\
Rule id;Table;Expression
v1;tB_01.02;with {tB_01.02, c0020}: not(isnull({c0020}))
v2;tB_01.02;with {tB_01.02, c0030}: match({c0030}, \"^ENT[0-9]{3}$\")
v3;tB_01.02;with {tB_01.02, c0040}: {c0040} >= 0
v4;tB_01.02;Amounts are reported in EUR
v5;tB_02.01;with {tB_02.01, c0020}: not(isnull({c0020}))
";

    const ENTITIES: &str = "\
Entities,,,,,
,,,,,
,,,,,
,,,,,
,,,LEI,Code,Amount
,,,0020,0030,0040
,,,,,
,,,,ENT001,100
,,,1001,ENT002,-50
,,,1002,INVALID,200
";

    fn write_rules(dir: &TempDir) -> RulesSource {
        let path = dir.path().join("rules.csv");
        fs::write(&path, RULES).unwrap();
        RulesSource::Path(path)
    }

    fn write_workbook(dir: &TempDir) -> std::path::PathBuf {
        let root = dir.path().join("workbook");
        fs::create_dir(&root).unwrap();
        fs::write(root.join("tB_01.02.csv"), ENTITIES).unwrap();
        fs::write(root.join("tB_02.01.csv"), "Empty\n").unwrap();
        fs::write(root.join("Cover.csv"), "Submission,2025\n").unwrap();
        root
    }

    #[tokio::test]
    async fn test_extract_rules_from_csv() {
        let dir = TempDir::new().unwrap();
        let rules = extract_rules(&write_rules(&dir)).await.unwrap();

        assert_eq!(rules.len(), 4);
        assert_eq!(rules[0].id, "ECB_RULE_001");
        assert_eq!(rules[0].source_row, 2);
        assert_eq!(rules[3].table_references, vec!["tB_02.01"]);
    }

    #[tokio::test]
    async fn test_extract_rules_none_found() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.csv");
        fs::write(&path, "a,b\nplain,text\n").unwrap();

        let err = extract_rules(&RulesSource::Path(path)).await.unwrap_err();
        assert!(matches!(err, PipelineError::NoRules(_)));
    }

    #[tokio::test]
    async fn test_end_to_end_run() {
        let dir = TempDir::new().unwrap();
        let rules = extract_rules(&write_rules(&dir)).await.unwrap();
        let root = write_workbook(&dir);

        let run = validate_workbook_dir(&rules, &root, &ValidationOptions::default()).unwrap();

        assert_eq!(run.results.processed_sheets, vec!["tB_01.02", "tB_02.01"]);
        assert_eq!(run.results.overall_status, OverallStatus::Fail);
        assert_eq!(run.results.total_errors, 3);

        let entities = &run.results.sheet_results["tB_01.02"];
        let kinds: Vec<ErrorType> = entities.errors.iter().map(|e| e.error_type).collect();
        assert_eq!(
            kinds,
            vec![
                ErrorType::MandatoryFieldNull,
                ErrorType::RegexPatternMismatch,
                ErrorType::ValueConstraintViolation,
            ]
        );

        let empty = &run.results.sheet_results["tB_02.01"];
        assert_eq!(empty.status, SheetStatus::Pass);
        assert_eq!(empty.data_rows, 0);

        assert_eq!(run.summary.total, 4);
        assert_eq!(run.rules.len(), 4);
        assert!(run.report.contains("## Sheet: tB_01.02"));
        assert!(!run.is_pass());
    }

    #[tokio::test]
    async fn test_table_filter() {
        let dir = TempDir::new().unwrap();
        let rules = extract_rules(&write_rules(&dir)).await.unwrap();
        let root = write_workbook(&dir);

        let options = ValidationOptions {
            table_filter: Some("tb_02".into()),
            ..Default::default()
        };
        let run = validate_workbook_dir(&rules, &root, &options).unwrap();

        assert_eq!(run.results.processed_sheets, vec!["tB_02.01"]);
        assert!(run.is_pass());
    }

    #[test]
    fn test_json_envelope() {
        let dir = TempDir::new().unwrap();
        let root = write_workbook(&dir);
        let run = validate_workbook_dir(&[], &root, &ValidationOptions::default()).unwrap();

        let value: serde_json::Value = serde_json::from_str(&run.to_json().unwrap()).unwrap();
        assert_eq!(value["Status"], "PASS");
        assert_eq!(value["TotalErrors"], 0);
        assert_eq!(value["RuleSummary"]["Total"], 0);
    }

    #[test]
    fn test_missing_workbook_dir() {
        let err = validate_workbook_dir(&[], Path::new("/nonexistent/workbook"), &ValidationOptions::default())
            .unwrap_err();
        assert!(matches!(err, PipelineError::Ingest(_)));
    }
}
