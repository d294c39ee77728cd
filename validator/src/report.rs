//! Report rendering.
//!
//! Two outputs for a finished run: a Markdown report meant for people and
//! a JSON envelope meant for callers.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write;

use crate::mining::RuleSetSummary;
use crate::models::{OverallStatus, SheetValidationResult, ValidationError, ValidationResults};

/// JSON result of a validation run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReportEnvelope {
    pub status: OverallStatus,
    pub total_errors: usize,
    /// Markdown report.
    pub report: String,
    pub processed_sheets: Vec<String>,
    pub timestamp: DateTime<Utc>,
    pub sheet_results: BTreeMap<String, SheetValidationResult>,
    pub rule_summary: RuleSetSummary,
}

impl ReportEnvelope {
    pub fn new(
        results: &ValidationResults,
        summary: &RuleSetSummary,
        max_errors: usize,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            status: results.overall_status,
            total_errors: results.total_errors,
            report: render_markdown(results, max_errors, timestamp),
            processed_sheets: results.processed_sheets.clone(),
            timestamp,
            sheet_results: results.sheet_results.clone(),
            rule_summary: summary.clone(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Render the Markdown report.
///
/// Each sheet lists at most `max_errors` findings, followed by a count of
/// the ones left out.
pub fn render_markdown(
    results: &ValidationResults,
    max_errors: usize,
    generated: DateTime<Utc>,
) -> String {
    let mut out = String::new();

    // Writing into a String cannot fail
    let _ = writeln!(out, "# ECB Excel Validation Report");
    let _ = writeln!(out, "**Generated:** {} UTC", generated.format("%Y-%m-%d %H:%M:%S"));
    let _ = writeln!(out, "**Status:** {}", results.overall_status);
    let _ = writeln!(out, "**Total Errors:** {}", results.total_errors);
    let _ = writeln!(out, "**Sheets Processed:** {}", results.processed_sheets.len());
    out.push('\n');

    for sheet in results.sheets() {
        let _ = writeln!(out, "## Sheet: {}", sheet.sheet_name);
        let _ = writeln!(out, "- **Status:** {}", sheet.status);
        let _ = writeln!(out, "- **Data Rows:** {}", sheet.data_rows);
        let _ = writeln!(out, "- **Errors:** {}", sheet.error_count);

        if !sheet.errors.is_empty() {
            let _ = writeln!(out, "### Validation Errors:");
            for error in sheet.errors.iter().take(max_errors) {
                let _ = writeln!(out, "- {}", error_line(error));
            }
            if sheet.errors.len() > max_errors {
                let _ = writeln!(
                    out,
                    "- ... and {} more errors",
                    sheet.errors.len() - max_errors
                );
            }
        }
        out.push('\n');
    }

    out
}

fn error_line(error: &ValidationError) -> String {
    let rule = error.rule_id.as_deref().unwrap_or("-");
    match (error.row_index, error.column.as_deref()) {
        (Some(row), Some(column)) => format!(
            "**Row {}, Column {}:** {} (Rule: {})",
            row, column, error.message, rule
        ),
        _ => format!("**{}:** {} (Rule: {})", error.error_type, error.message, rule),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ErrorType, RuleType, ValidationRule};
    use chrono::TimeZone;

    fn generated() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 4, 28, 9, 30, 0).unwrap()
    }

    fn rule() -> ValidationRule {
        ValidationRule {
            id: "ECB_RULE_001".into(),
            expression: "with {tB_01.02, c0020}: not(isnull({c0020}))".into(),
            source_row: 4,
            table_references: vec!["tB_01.02".into()],
            column_references: vec!["c0020".into()],
            rule_type: RuleType::MandatoryField,
        }
    }

    fn results_with(errors: usize) -> ValidationResults {
        let r = rule();
        let findings = (0..errors)
            .map(|i| {
                ValidationError::at(
                    &r,
                    8 + i,
                    "c0020",
                    ErrorType::MandatoryFieldNull,
                    "Required field c0020 is null or empty",
                )
            })
            .collect();

        let mut results = ValidationResults::new();
        results.push(SheetValidationResult::from_errors("tB_01.02", errors, findings));
        results
    }

    #[test]
    fn test_header_and_sheet_section() {
        let report = render_markdown(&results_with(1), 20, generated());

        assert!(report.starts_with("# ECB Excel Validation Report\n"));
        assert!(report.contains("**Generated:** 2025-04-28 09:30:00 UTC"));
        assert!(report.contains("**Status:** FAIL"));
        assert!(report.contains("**Total Errors:** 1"));
        assert!(report.contains("**Sheets Processed:** 1"));
        assert!(report.contains("## Sheet: tB_01.02"));
        assert!(report.contains(
            "- **Row 8, Column c0020:** Required field c0020 is null or empty (Rule: ECB_RULE_001)"
        ));
        assert!(!report.contains("more errors"));
    }

    #[test]
    fn test_error_list_is_truncated() {
        let report = render_markdown(&results_with(25), 20, generated());
        assert_eq!(report.matches("**Row ").count(), 20);
        assert!(report.contains("- ... and 5 more errors"));
    }

    #[test]
    fn test_sheet_failure_line() {
        let mut results = ValidationResults::new();
        results.push(SheetValidationResult::failed("tB_02.01", "Invalid CSV"));

        let report = render_markdown(&results, 20, generated());
        assert!(report.contains("- **Status:** ERROR"));
        assert!(report.contains(
            "- **PROCESSING_ERROR:** Error processing sheet: Invalid CSV (Rule: -)"
        ));
    }

    #[test]
    fn test_passing_sheet_has_no_error_list() {
        let report = render_markdown(&results_with(0), 20, generated());
        assert!(report.contains("**Status:** PASS"));
        assert!(!report.contains("### Validation Errors:"));
    }

    #[test]
    fn test_envelope_shape() {
        let results = results_with(2);
        let summary = RuleSetSummary::from_rules(&[rule()]);
        let envelope = ReportEnvelope::new(&results, &summary, 20, generated());
        let value: serde_json::Value = serde_json::from_str(&envelope.to_json().unwrap()).unwrap();

        assert_eq!(value["Status"], "FAIL");
        assert_eq!(value["TotalErrors"], 2);
        assert_eq!(value["ProcessedSheets"], serde_json::json!(["tB_01.02"]));
        assert_eq!(value["Timestamp"], "2025-04-28T09:30:00Z");
        assert_eq!(value["SheetResults"]["tB_01.02"]["ErrorCount"], 2);
        assert_eq!(value["RuleSummary"]["Total"], 1);
        assert_eq!(value["RuleSummary"]["ByType"]["mandatory_field"], 1);
        assert!(value["Report"].as_str().unwrap().contains("## Sheet: tB_01.02"));
    }
}
