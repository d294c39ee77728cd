//! Per-type rule validators.
//!
//! Each validator walks resolved columns × rows and reports one finding per
//! offending cell. Validators that need something out of the expression (a
//! constraint, a pattern) yield no findings when it cannot be found.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{RuleError, RuleResult};
use crate::models::{format_number, DataRow, ErrorType, ValidationError, ValidationRule};

static QUOTED_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""([^"]+)""#).expect("valid quoted pattern regex"));

/// Operators with their constant, in priority order.
static CONSTRAINTS: Lazy<Vec<(ComparisonOp, Regex)>> = Lazy::new(|| {
    ComparisonOp::ALL
        .iter()
        .map(|op| {
            let pattern = format!(r"{}\s*(-?\d+(?:\.\d+)?)", regex::escape(op.symbol()));
            (*op, Regex::new(&pattern).expect("valid constraint regex"))
        })
        .collect()
});

// =============================================================================
// Mandatory fields
// =============================================================================

/// Report every cell that is absent, null or empty.
pub fn check_mandatory(
    rule: &ValidationRule,
    columns: &[String],
    rows: &[DataRow],
) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    for column in columns {
        for row in rows {
            let missing = row
                .get(column)
                .and_then(|v| v.as_text())
                .map_or(true, |text| text.is_empty());

            if missing {
                errors.push(ValidationError::at(
                    rule,
                    row.index,
                    column,
                    ErrorType::MandatoryFieldNull,
                    format!("Required field {} is null or empty", column),
                ));
            }
        }
    }

    errors
}

// =============================================================================
// Value constraints
// =============================================================================

/// Comparison operator of a value constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    GreaterOrEqual,
    LessOrEqual,
    Greater,
    Less,
    NotEqual,
}

impl ComparisonOp {
    /// Priority order used when looking for a constraint.
    pub const ALL: [ComparisonOp; 5] = [
        Self::GreaterOrEqual,
        Self::LessOrEqual,
        Self::Greater,
        Self::Less,
        Self::NotEqual,
    ];

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::GreaterOrEqual => ">=",
            Self::LessOrEqual => "<=",
            Self::Greater => ">",
            Self::Less => "<",
            Self::NotEqual => "!=",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::GreaterOrEqual => "greater than or equal to",
            Self::LessOrEqual => "less than or equal to",
            Self::Greater => "greater than",
            Self::Less => "less than",
            Self::NotEqual => "not equal to",
        }
    }

    /// Whether `value` breaks `value <op> constant`.
    pub fn is_violated_by(&self, value: f64, constant: f64) -> bool {
        match self {
            Self::GreaterOrEqual => value < constant,
            Self::LessOrEqual => value > constant,
            Self::Greater => value <= constant,
            Self::Less => value >= constant,
            Self::NotEqual => value == constant,
        }
    }
}

/// Operator and constant of a value constraint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Constraint {
    pub op: ComparisonOp,
    pub constant: f64,
}

/// Find the first operator directly followed by a numeric literal.
pub fn extract_constraint(expression: &str) -> Option<Constraint> {
    let expr = expression.to_lowercase();

    CONSTRAINTS.iter().find_map(|(op, re)| {
        let constant = re.captures(&expr)?[1].parse::<f64>().ok()?;
        Some(Constraint { op: *op, constant })
    })
}

/// Report every numeric cell that breaks the rule's constraint.
pub fn check_value_constraint(
    rule: &ValidationRule,
    columns: &[String],
    rows: &[DataRow],
) -> Vec<ValidationError> {
    let Some(constraint) = extract_constraint(&rule.expression) else {
        return Vec::new();
    };

    let mut errors = Vec::new();
    for column in columns {
        for row in rows {
            let Some(value) = row.get(column).and_then(|v| v.as_number()) else {
                continue;
            };

            if constraint.op.is_violated_by(value, constraint.constant) {
                errors.push(ValidationError::at(
                    rule,
                    row.index,
                    column,
                    ErrorType::ValueConstraintViolation,
                    format!(
                        "Value {} in {} must be {} {}",
                        format_number(value),
                        column,
                        constraint.op.description(),
                        format_number(constraint.constant)
                    ),
                ));
            }
        }
    }

    errors
}

// =============================================================================
// Regex patterns
// =============================================================================

/// First double-quoted string of the expression.
pub fn extract_pattern(expression: &str) -> Option<&str> {
    QUOTED_PATTERN
        .captures(expression)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Report every non-empty cell with no match of the rule's pattern.
///
/// The pattern is searched anywhere in the value; only anchors written in
/// the pattern itself pin it to the start or end.
pub fn check_regex(
    rule: &ValidationRule,
    columns: &[String],
    rows: &[DataRow],
) -> RuleResult<Vec<ValidationError>> {
    let Some(pattern) = extract_pattern(&rule.expression) else {
        return Ok(Vec::new());
    };

    let re = Regex::new(pattern).map_err(|e| RuleError::InvalidPattern {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })?;

    let mut errors = Vec::new();
    for column in columns {
        for row in rows {
            let Some(text) = row.get(column).and_then(|v| v.as_text()) else {
                continue;
            };

            if !text.is_empty() && !re.is_match(&text) {
                errors.push(ValidationError::at(
                    rule,
                    row.index,
                    column,
                    ErrorType::RegexPatternMismatch,
                    format!(
                        "Value '{}' in {} does not match required pattern {}",
                        text, column, pattern
                    ),
                ));
            }
        }
    }

    Ok(errors)
}
