//! Rule application engine.
//!
//! Applies mined rules to the rows of data sheets:
//! - `resolver`: symbolic column references to concrete sheet columns
//! - `validators`: one checker per enforced rule type
//!
//! A failing rule never aborts its sheet, and a failing sheet never aborts
//! the run. Each is recorded as a single finding instead.

pub mod resolver;
pub mod validators;

use crate::error::{RuleResult, SheetError};
use crate::logs::{log_error, log_info, log_info_indent, log_success, log_warning_indent};
use crate::models::{
    DataRow, RuleType, Schema, SheetData, SheetStatus, SheetValidationResult, ValidationError,
    ValidationResults, ValidationRule,
};

pub use resolver::{resolve, resolve_rule_columns, resolve_str, RANGE_STEP};
pub use validators::{
    check_mandatory, check_regex, check_value_constraint, extract_constraint, extract_pattern,
    ComparisonOp, Constraint,
};

/// Apply one rule to the rows of a sheet.
///
/// Returns the findings of the rule. A rule that cannot be applied yields
/// a single `RULE_PROCESSING_ERROR` finding.
pub fn apply_rule(rule: &ValidationRule, schema: &Schema, rows: &[DataRow]) -> Vec<ValidationError> {
    match try_apply_rule(rule, schema, rows) {
        Ok(errors) => errors,
        Err(e) => vec![ValidationError::rule_failure(rule, e)],
    }
}

fn try_apply_rule(
    rule: &ValidationRule,
    schema: &Schema,
    rows: &[DataRow],
) -> RuleResult<Vec<ValidationError>> {
    let columns = resolve_rule_columns(rule, schema);

    match rule.rule_type {
        RuleType::MandatoryField => Ok(check_mandatory(rule, &columns, rows)),
        RuleType::ValueConstraint => Ok(check_value_constraint(rule, &columns, rows)),
        RuleType::RegexValidation => check_regex(rule, &columns, rows),
        // Recognized but not evaluated
        RuleType::ConditionalRule | RuleType::EqualityCheck | RuleType::ComplexValidation => {
            Ok(Vec::new())
        }
    }
}

/// Rules that apply to the named sheet, in rule order.
pub fn applicable_rules<'a>(
    rules: &'a [ValidationRule],
    sheet_name: &str,
) -> Vec<&'a ValidationRule> {
    rules.iter().filter(|r| r.applies_to(sheet_name)).collect()
}

/// Validate one sheet against a rule set.
///
/// A sheet without data rows passes without any rule being applied.
pub fn validate_sheet(sheet: &SheetData, rules: &[ValidationRule]) -> SheetValidationResult {
    if sheet.rows.is_empty() {
        log_info_indent(format!("{}: no data rows", sheet.name), 1);
        return SheetValidationResult::from_errors(&sheet.name, 0, Vec::new());
    }

    let applicable = applicable_rules(rules, &sheet.name);
    log_info_indent(
        format!(
            "{}: {} data rows, {} applicable rules",
            sheet.name,
            sheet.rows.len(),
            applicable.len()
        ),
        1,
    );

    let mut errors = Vec::new();
    for rule in applicable {
        errors.extend(apply_rule(rule, &sheet.schema, &sheet.rows));
    }

    let result = SheetValidationResult::from_errors(&sheet.name, sheet.rows.len(), errors);
    match result.status {
        SheetStatus::Pass => log_success(format!("{}: PASS", sheet.name)),
        _ => log_warning_indent(
            format!("{}: {} ({} errors)", sheet.name, result.status, result.error_count),
            1,
        ),
    }
    result
}

/// Validate a sequence of sheets and aggregate the outcome.
///
/// Sheets are given as they were read: a sheet that could not be read is
/// recorded with status `ERROR` and the run continues.
pub fn validate_sheets<I>(sheets: I, rules: &[ValidationRule]) -> ValidationResults
where
    I: IntoIterator<Item = (String, Result<SheetData, SheetError>)>,
{
    let mut results = ValidationResults::new();

    for (name, sheet) in sheets {
        log_info(format!("Validating sheet: {}", name));
        let result = match sheet {
            Ok(data) => validate_sheet(&data, rules),
            Err(e) => {
                log_error(format!("{}: {}", name, e));
                SheetValidationResult::failed(name, e)
            }
        };
        results.push(result);
    }

    results
}
