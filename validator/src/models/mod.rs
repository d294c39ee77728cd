//! Domain models for rule mining and validation.
//!
//! This module contains the core data structures used throughout the pipeline:
//!
//! - [`ValidationRule`] - A mined rule with its table/column references
//! - [`RuleType`] - Closed classification of rule shapes
//! - [`ColumnRef`] - Symbolic column reference (`c0020`, `c0020-0090`, `c*`)
//! - [`CellValue`] / [`DataRow`] / [`Schema`] / [`SheetData`] - Sheet contents
//! - [`ValidationError`] - A single finding produced by the rule engine
//! - [`SheetValidationResult`] / [`ValidationResults`] - Aggregated status

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

// =============================================================================
// Rule Type
// =============================================================================

/// Shape of a mined rule, decided from its expression text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleType {
    /// `match({cNNNN}, "pattern")`
    RegexValidation,
    /// `not(isnull({cNNNN}))`
    MandatoryField,
    /// `{cNNNN} >= 0` and friends
    ValueConstraint,
    /// `if ... then ... endif`
    ConditionalRule,
    /// `{a} = {b}`
    EqualityCheck,
    /// Anything else (aggregates, dates, nested logic)
    ComplexValidation,
}

impl RuleType {
    /// Every rule type, in classification priority order.
    pub const ALL: [RuleType; 6] = [
        Self::RegexValidation,
        Self::MandatoryField,
        Self::ValueConstraint,
        Self::ConditionalRule,
        Self::EqualityCheck,
        Self::ComplexValidation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RegexValidation => "regex_validation",
            Self::MandatoryField => "mandatory_field",
            Self::ValueConstraint => "value_constraint",
            Self::ConditionalRule => "conditional_rule",
            Self::EqualityCheck => "equality_check",
            Self::ComplexValidation => "complex_validation",
        }
    }

    /// Whether the engine has a validator for this type.
    ///
    /// Conditional, equality and complex rules are mined and counted but
    /// never produce findings.
    pub fn is_enforced(&self) -> bool {
        matches!(
            self,
            Self::RegexValidation | Self::MandatoryField | Self::ValueConstraint
        )
    }
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Column References
// =============================================================================

static RANGE_REF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^c(\d{4})-(\d{4})$").expect("valid range regex"));

/// A symbolic column reference as stored in [`ValidationRule::column_references`].
///
/// List tokens such as `{(c0020, c0030)}` never appear here: they are
/// expanded into [`ColumnRef::Single`] entries when the rule is parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnRef {
    /// A concrete column name, e.g. `c0020`.
    Single(String),
    /// An inclusive range `cSTART-END`, enumerated in steps of 10.
    Range { start: u32, end: u32 },
    /// `c*`: every numeric column.
    Wildcard,
}

impl ColumnRef {
    /// Classify a stored reference string.
    pub fn parse(raw: &str) -> Self {
        if raw == "c*" {
            return Self::Wildcard;
        }
        if let Some(caps) = RANGE_REF.captures(raw) {
            // Four ASCII digits always fit in u32
            if let (Ok(start), Ok(end)) = (caps[1].parse(), caps[2].parse()) {
                return Self::Range { start, end };
            }
        }
        Self::Single(raw.to_string())
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(name) => f.write_str(name),
            Self::Range { start, end } => write!(f, "c{:04}-{:04}", start, end),
            Self::Wildcard => f.write_str("c*"),
        }
    }
}

// =============================================================================
// Rules
// =============================================================================

/// A text cell that looked like a rule during scanning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleCandidate {
    /// Raw cell text.
    pub text: String,
    /// 1-based row of the cell in its source sheet.
    pub row: usize,
}

/// A structured validation rule mined from free text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ValidationRule {
    /// `ECB_RULE_001`, `ECB_RULE_002`, ...
    pub id: String,
    /// Trimmed original expression.
    pub expression: String,
    /// Row of the source cell.
    pub source_row: usize,
    /// Table identifiers (`tB_01.02`), first-occurrence order.
    pub table_references: Vec<String>,
    /// Symbolic column references, first-occurrence order.
    pub column_references: Vec<String>,
    pub rule_type: RuleType,
}

impl ValidationRule {
    /// Column references as typed values.
    pub fn column_refs(&self) -> impl Iterator<Item = ColumnRef> + '_ {
        self.column_references.iter().map(|r| ColumnRef::parse(r))
    }

    /// Whether this rule applies to the named sheet.
    ///
    /// Rules without table references are global. Otherwise any reference
    /// must occur in the sheet name, ignoring case.
    pub fn applies_to(&self, sheet_name: &str) -> bool {
        if self.table_references.is_empty() {
            return true;
        }
        let sheet = sheet_name.to_lowercase();
        self.table_references
            .iter()
            .any(|t| sheet.contains(&t.to_lowercase()))
    }
}

// =============================================================================
// Sheet Data
// =============================================================================

/// A typed cell value.
///
/// A column missing from a [`DataRow`] is "absent"; a present but empty cell
/// is [`CellValue::Null`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Number(f64),
    Text(String),
}

impl CellValue {
    /// Type a raw cell string.
    ///
    /// Empty text is null. Text is numeric only if formatting the parsed
    /// number gives back the same text, so codes like `007` stay text.
    pub fn from_raw(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Self::Null;
        }
        match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() && format_number(n) == trimmed => Self::Number(n),
            _ => Self::Text(trimmed.to_string()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Text form of the value, `None` for null.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Number(n) => Some(format_number(*n)),
            Self::Text(s) => Some(s.clone()),
        }
    }

    /// Numeric reading of the value, if it has one.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Null => None,
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse::<f64>().ok(),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Number(n) => f.write_str(&format_number(*n)),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

/// Format a number without a trailing `.0` for integral values.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// One data row of a sheet.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DataRow {
    /// 1-based spreadsheet row number.
    pub index: usize,
    values: HashMap<String, CellValue>,
}

impl DataRow {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            values: HashMap::new(),
        }
    }

    /// Builder-style insert.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<CellValue>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<CellValue>) {
        self.values.insert(column.into(), value.into());
    }

    /// Value of a column; `None` when the column is absent from the row.
    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.values.get(column)
    }

    /// Whether at least one column holds a non-null value.
    pub fn has_data(&self) -> bool {
        self.values.values().any(|v| !v.is_null())
    }
}

/// Ordered set of column names present in a sheet.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Schema {
    columns: Vec<String>,
    lookup: HashSet<String>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a column, keeping the first position of duplicates.
    pub fn insert(&mut self, column: impl Into<String>) {
        let column = column.into();
        if self.lookup.insert(column.clone()) {
            self.columns.push(column);
        }
    }

    pub fn contains(&self, column: &str) -> bool {
        self.lookup.contains(column)
    }

    /// Columns in sheet order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for Schema {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut schema = Schema::new();
        for column in iter {
            schema.insert(column);
        }
        schema
    }
}

/// Row data and schema for one data table sheet.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SheetData {
    pub name: String,
    pub schema: Schema,
    pub rows: Vec<DataRow>,
}

// =============================================================================
// Findings
// =============================================================================

/// Kind of a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorType {
    MandatoryFieldNull,
    ValueConstraintViolation,
    RegexPatternMismatch,
    /// One rule failed while being applied.
    RuleProcessingError,
    /// A whole sheet could not be read or validated.
    ProcessingError,
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MandatoryFieldNull => "MANDATORY_FIELD_NULL",
            Self::ValueConstraintViolation => "VALUE_CONSTRAINT_VIOLATION",
            Self::RegexPatternMismatch => "REGEX_PATTERN_MISMATCH",
            Self::RuleProcessingError => "RULE_PROCESSING_ERROR",
            Self::ProcessingError => "PROCESSING_ERROR",
        }
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single validation finding.
///
/// Row-level findings always carry a row index and a column that exists in
/// the sheet schema. Rule and sheet failures leave those fields empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ValidationError {
    pub rule_id: Option<String>,
    pub rule_type: Option<RuleType>,
    pub row_index: Option<usize>,
    pub column: Option<String>,
    pub error_type: ErrorType,
    pub message: String,
    pub expression: Option<String>,
}

impl ValidationError {
    /// A finding on one cell.
    pub fn at(
        rule: &ValidationRule,
        row_index: usize,
        column: &str,
        error_type: ErrorType,
        message: impl Into<String>,
    ) -> Self {
        Self {
            rule_id: Some(rule.id.clone()),
            rule_type: Some(rule.rule_type),
            row_index: Some(row_index),
            column: Some(column.to_string()),
            error_type,
            message: message.into(),
            expression: Some(rule.expression.clone()),
        }
    }

    /// The single finding recorded when a rule fails to apply.
    pub fn rule_failure(rule: &ValidationRule, reason: impl fmt::Display) -> Self {
        Self {
            rule_id: Some(rule.id.clone()),
            rule_type: Some(rule.rule_type),
            row_index: None,
            column: None,
            error_type: ErrorType::RuleProcessingError,
            message: format!("Error processing rule {}: {}", rule.id, reason),
            expression: Some(rule.expression.clone()),
        }
    }

    /// The single finding recorded when a whole sheet fails.
    pub fn sheet_failure(reason: impl fmt::Display) -> Self {
        Self {
            rule_id: None,
            rule_type: None,
            row_index: None,
            column: None,
            error_type: ErrorType::ProcessingError,
            message: format!("Error processing sheet: {}", reason),
            expression: None,
        }
    }
}

// =============================================================================
// Results
// =============================================================================

/// Status of one sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SheetStatus {
    Pass,
    Fail,
    /// The sheet could not be read or validated.
    Error,
}

/// Status of a whole run. There is no overall error state: a sheet in
/// [`SheetStatus::Error`] makes the run fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OverallStatus {
    Pass,
    Fail,
}

impl fmt::Display for SheetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Self::Pass => "PASS",
            Self::Fail => "FAIL",
            Self::Error => "ERROR",
        })
    }
}

impl fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Self::Pass => "PASS",
            Self::Fail => "FAIL",
        })
    }
}

/// Validation outcome for one sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SheetValidationResult {
    pub sheet_name: String,
    pub status: SheetStatus,
    /// Always `errors.len()`.
    pub error_count: usize,
    pub data_rows: usize,
    pub errors: Vec<ValidationError>,
}

impl SheetValidationResult {
    /// Result of a sheet that was read and validated.
    pub fn from_errors(
        sheet_name: impl Into<String>,
        data_rows: usize,
        errors: Vec<ValidationError>,
    ) -> Self {
        let status = if errors.is_empty() {
            SheetStatus::Pass
        } else {
            SheetStatus::Fail
        };
        Self {
            sheet_name: sheet_name.into(),
            status,
            error_count: errors.len(),
            data_rows,
            errors,
        }
    }

    /// Result of a sheet whose reading or validation failed.
    pub fn failed(sheet_name: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self {
            sheet_name: sheet_name.into(),
            status: SheetStatus::Error,
            error_count: 1,
            data_rows: 0,
            errors: vec![ValidationError::sheet_failure(reason)],
        }
    }
}

/// Validation outcome for a whole workbook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ValidationResults {
    pub overall_status: OverallStatus,
    pub total_errors: usize,
    /// Sheet names in processing order.
    pub processed_sheets: Vec<String>,
    pub sheet_results: BTreeMap<String, SheetValidationResult>,
}

impl ValidationResults {
    pub fn new() -> Self {
        Self {
            overall_status: OverallStatus::Pass,
            total_errors: 0,
            processed_sheets: Vec::new(),
            sheet_results: BTreeMap::new(),
        }
    }

    /// Add a sheet result and refresh the totals.
    ///
    /// A second result for the same sheet replaces the first one.
    pub fn push(&mut self, result: SheetValidationResult) {
        let name = result.sheet_name.clone();
        match self.sheet_results.insert(name.clone(), result) {
            Some(previous) => self.total_errors -= previous.error_count,
            None => self.processed_sheets.push(name.clone()),
        }
        self.total_errors += self.sheet_results[&name].error_count;
        self.overall_status = if self.total_errors == 0 {
            OverallStatus::Pass
        } else {
            OverallStatus::Fail
        };
    }

    /// Results in processing order.
    pub fn sheets(&self) -> impl Iterator<Item = &SheetValidationResult> {
        self.processed_sheets
            .iter()
            .filter_map(|name| self.sheet_results.get(name))
    }

    pub fn is_pass(&self) -> bool {
        self.overall_status == OverallStatus::Pass
    }
}

impl Default for ValidationResults {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rule(tables: &[&str]) -> ValidationRule {
        ValidationRule {
            id: "ECB_RULE_001".into(),
            expression: "with {tB_01.02}: not(isnull({c0020}))".into(),
            source_row: 1,
            table_references: tables.iter().map(|t| t.to_string()).collect(),
            column_references: vec!["c0020".into()],
            rule_type: RuleType::MandatoryField,
        }
    }

    #[test]
    fn test_column_ref_parse() {
        assert_eq!(ColumnRef::parse("c*"), ColumnRef::Wildcard);
        assert_eq!(
            ColumnRef::parse("c0020-0090"),
            ColumnRef::Range { start: 20, end: 90 }
        );
        assert_eq!(ColumnRef::parse("c0020"), ColumnRef::Single("c0020".into()));
        assert_eq!(ColumnRef::parse("c0020-0090").to_string(), "c0020-0090");
    }

    #[test]
    fn test_cell_value_typing() {
        assert_eq!(CellValue::from_raw(""), CellValue::Null);
        assert_eq!(CellValue::from_raw("  "), CellValue::Null);
        assert_eq!(CellValue::from_raw("-50"), CellValue::Number(-50.0));
        assert_eq!(CellValue::from_raw("12.5"), CellValue::Number(12.5));
        assert_eq!(CellValue::from_raw("007"), CellValue::Text("007".into()));
        assert_eq!(CellValue::from_raw("ENT001"), CellValue::Text("ENT001".into()));
    }

    #[test]
    fn test_cell_value_text_form() {
        assert_eq!(CellValue::Number(1000.0).as_text().as_deref(), Some("1000"));
        assert_eq!(CellValue::Number(-0.5).as_text().as_deref(), Some("-0.5"));
        assert_eq!(CellValue::Null.as_text(), None);
        assert_eq!(CellValue::Text(" 42 ".into()).as_number(), Some(42.0));
    }

    #[test]
    fn test_rule_applicability() {
        assert!(rule(&[]).applies_to("Anything"));
        assert!(rule(&["tB_01.02"]).applies_to("TB_01.02 Entities"));
        assert!(!rule(&["tB_01.02"]).applies_to("tB_01.03"));
        assert!(rule(&["tB_02.01", "tB_01.03"]).applies_to("tB_01.03"));
    }

    #[test]
    fn test_schema_keeps_first_position() {
        let schema: Schema = ["c0030", "c0020", "c0030"].into_iter().collect();
        assert_eq!(schema.columns(), &["c0030".to_string(), "c0020".to_string()]);
        assert!(schema.contains("c0020"));
        assert!(!schema.contains("c0040"));
    }

    #[test]
    fn test_results_totals() {
        let mut results = ValidationResults::new();
        results.push(SheetValidationResult::from_errors("tB_01.01", 3, vec![]));
        assert!(results.is_pass());

        results.push(SheetValidationResult::failed("tB_01.02", "unreadable"));
        assert_eq!(results.total_errors, 1);
        assert_eq!(results.overall_status, OverallStatus::Fail);
        assert_eq!(results.processed_sheets, vec!["tB_01.01", "tB_01.02"]);

        let failed = &results.sheet_results["tB_01.02"];
        assert_eq!(failed.status, SheetStatus::Error);
        assert_eq!(failed.error_count, failed.errors.len());
    }

    #[test]
    fn test_repeated_sheet_counted_once() {
        let mut results = ValidationResults::new();
        results.push(SheetValidationResult::failed("tB_01.02", "unreadable"));
        results.push(SheetValidationResult::failed("tB_01.02", "unreadable"));

        assert_eq!(results.total_errors, 1);
        assert_eq!(results.processed_sheets, vec!["tB_01.02"]);

        results.push(SheetValidationResult::from_errors("tB_01.02", 2, vec![]));
        assert_eq!(results.total_errors, 0);
        assert!(results.is_pass());
    }

    #[test]
    fn test_serialized_shape() {
        let r = rule(&["tB_01.02"]);
        let err = ValidationError::at(&r, 8, "c0020", ErrorType::MandatoryFieldNull, "missing");
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(
            value,
            json!({
                "RuleId": "ECB_RULE_001",
                "RuleType": "mandatory_field",
                "RowIndex": 8,
                "Column": "c0020",
                "ErrorType": "MANDATORY_FIELD_NULL",
                "Message": "missing",
                "Expression": "with {tB_01.02}: not(isnull({c0020}))"
            })
        );
    }
}
