//! Rule mining: free-text spreadsheet cells to structured rules.
//!
//! This module provides:
//! - `scanner`: heuristic filter from raw cells to rule candidates
//! - `classifier`: candidate to [`ValidationRule`] (id, references, type)
//!
//! ## Usage Flow
//!
//! ```text
//! sheet cells → scanner::scan_cells → candidates → classifier::parse_rule → rules
//! ```
//!
//! Rule ids are numbered across the whole mining pass, so the counter is
//! threaded explicitly from one sheet to the next.

pub mod classifier;
pub mod scanner;

use serde::Serialize;
use std::collections::BTreeMap;

use crate::logs::{log_info, log_info_indent, log_success, log_warning};
use crate::models::{RuleType, ValidationRule};

pub use classifier::{
    classify_rule_type, extract_column_references, extract_table_references, parse_rule, rule_id,
};
pub use scanner::{is_rule_expression, marker_count, scan_cells, RawCell};

/// Raw cells of one sheet of a rule source.
#[derive(Debug, Clone, Default)]
pub struct CellSheet {
    pub name: String,
    pub cells: Vec<RawCell>,
}

/// Mine the rules of one sheet.
///
/// `first_counter` is the number the first rule of this sheet receives.
/// The caller continues with `first_counter + rules.len()`.
pub fn mine_sheet(cells: &[RawCell], first_counter: usize) -> Vec<ValidationRule> {
    let mut rules = Vec::new();
    for candidate in scan_cells(cells) {
        if let Some(rule) = parse_rule(&candidate, first_counter + rules.len()) {
            rules.push(rule);
        }
    }
    rules
}

/// Mine every sheet of a rule source, in order.
pub fn mine_rules(sheets: &[CellSheet]) -> Vec<ValidationRule> {
    let mut rules: Vec<ValidationRule> = Vec::new();

    for sheet in sheets {
        log_info(format!("Scanning worksheet: {}", sheet.name));
        let mined = mine_sheet(&sheet.cells, rules.len() + 1);
        log_info_indent(format!("Found {} expressions in {}", mined.len(), sheet.name), 1);
        rules.extend(mined);
    }

    if rules.is_empty() {
        log_warning("No validation rules found");
    } else {
        log_success(format!("Extracted {} validation rules total", rules.len()));
    }
    rules
}

/// Rule counts per type, so callers can see how much of a rule set is
/// actually enforced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RuleSetSummary {
    pub total: usize,
    /// Rules of a type with a validator.
    pub enforced: usize,
    /// Rules that are mined and counted but never evaluated.
    pub recognized_only: usize,
    pub by_type: BTreeMap<RuleType, usize>,
}

impl RuleSetSummary {
    pub fn from_rules(rules: &[ValidationRule]) -> Self {
        let mut by_type: BTreeMap<RuleType, usize> =
            RuleType::ALL.iter().map(|t| (*t, 0)).collect();
        for rule in rules {
            *by_type.entry(rule.rule_type).or_default() += 1;
        }

        let enforced = rules.iter().filter(|r| r.rule_type.is_enforced()).count();
        Self {
            total: rules.len(),
            enforced,
            recognized_only: rules.len() - enforced,
            by_type,
        }
    }

    pub fn count(&self, rule_type: RuleType) -> usize {
        self.by_type.get(&rule_type).copied().unwrap_or(0)
    }
}
