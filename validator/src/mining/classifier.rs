//! Rule classifier.
//!
//! Turns a rule candidate into a [`ValidationRule`]: assigns its id, pulls
//! out table and column references and decides its [`RuleType`].

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

use crate::models::{RuleCandidate, RuleType, ValidationRule};

static TABLE_REF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"tB_\d{2}\.\d{2}").expect("valid table regex"));
static SINGLE_COLUMN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{c(\d{4})\}").expect("valid column regex"));
static COLUMN_RANGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{c(\d{4})-(\d{4})\}").expect("valid range regex"));
static COLUMN_LIST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\([^)]+\)\}").expect("valid list regex"));
static LIST_MEMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"c(\d{4})").expect("valid list member regex"));

/// Comparison operators, in the order they are tested.
pub const COMPARISON_OPERATORS: [&str; 5] = [">=", "<=", ">", "<", "!="];

/// Rule id for the n-th mined rule (1-based).
pub fn rule_id(counter: usize) -> String {
    format!("ECB_RULE_{:03}", counter)
}

/// Parse a candidate into a rule.
///
/// `counter` is the 1-based position of this rule in the whole mining pass.
/// Returns `None` for candidates that carry no expression once trimmed.
pub fn parse_rule(candidate: &RuleCandidate, counter: usize) -> Option<ValidationRule> {
    let expression = candidate.text.trim();
    if expression.is_empty() {
        return None;
    }

    Some(ValidationRule {
        id: rule_id(counter),
        expression: expression.to_string(),
        source_row: candidate.row,
        table_references: extract_table_references(expression),
        column_references: extract_column_references(expression),
        rule_type: classify_rule_type(expression),
    })
}

/// Table identifiers like `tB_01.02`, deduplicated in first-seen order.
pub fn extract_table_references(expression: &str) -> Vec<String> {
    dedup_in_order(
        TABLE_REF
            .find_iter(expression)
            .map(|m| m.as_str().to_string()),
    )
}

/// Symbolic column references, deduplicated in first-seen order.
///
/// Collected in a fixed order: single columns, ranges (kept unexpanded),
/// the `c*` wildcard, then the members of every `{(...)}` list.
pub fn extract_column_references(expression: &str) -> Vec<String> {
    let mut refs = Vec::new();

    for caps in SINGLE_COLUMN.captures_iter(expression) {
        refs.push(format!("c{}", &caps[1]));
    }

    for caps in COLUMN_RANGE.captures_iter(expression) {
        refs.push(format!("c{}-{}", &caps[1], &caps[2]));
    }

    if expression.contains("{c*}") {
        refs.push("c*".to_string());
    }

    for list in COLUMN_LIST.find_iter(expression) {
        for caps in LIST_MEMBER.captures_iter(list.as_str()) {
            refs.push(format!("c{}", &caps[1]));
        }
    }

    dedup_in_order(refs)
}

/// Decide the rule type of an expression. First match wins.
pub fn classify_rule_type(expression: &str) -> RuleType {
    let expr = expression.to_lowercase();

    if expr.contains("match(") {
        RuleType::RegexValidation
    } else if expr.contains("isnull") && expr.contains("not") {
        RuleType::MandatoryField
    } else if COMPARISON_OPERATORS.iter().any(|op| expr.contains(op)) {
        RuleType::ValueConstraint
    } else if expr.contains("if") && expr.contains("then") {
        RuleType::ConditionalRule
    } else if expr.contains('=') && !expr.contains("if") {
        RuleType::EqualityCheck
    } else {
        RuleType::ComplexValidation
    }
}

fn dedup_in_order<I: IntoIterator<Item = String>>(items: I) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(text: &str) -> RuleCandidate {
        RuleCandidate {
            text: text.to_string(),
            row: 7,
        }
    }

    #[test]
    fn test_rule_id_padding() {
        assert_eq!(rule_id(1), "ECB_RULE_001");
        assert_eq!(rule_id(42), "ECB_RULE_042");
        assert_eq!(rule_id(1234), "ECB_RULE_1234");
    }

    #[test]
    fn test_parse_mandatory_rule() {
        let rule = parse_rule(
            &candidate("  with {tB_01.02, c0020}: not(isnull({c0020}))  "),
            3,
        )
        .unwrap();

        assert_eq!(rule.id, "ECB_RULE_003");
        assert_eq!(rule.expression, "with {tB_01.02, c0020}: not(isnull({c0020}))");
        assert_eq!(rule.source_row, 7);
        assert_eq!(rule.table_references, vec!["tB_01.02"]);
        assert_eq!(rule.column_references, vec!["c0020"]);
        assert_eq!(rule.rule_type, RuleType::MandatoryField);
    }

    #[test]
    fn test_blank_candidate_dropped() {
        assert!(parse_rule(&candidate("   "), 1).is_none());
    }

    #[test]
    fn test_table_references_deduplicated() {
        let refs = extract_table_references(
            "with {tB_05.01}: match({tB_05.01, c0020}, \"x\") and tB_01.02 and tB_05.01",
        );
        assert_eq!(refs, vec!["tB_05.01", "tB_01.02"]);
    }

    #[test]
    fn test_column_reference_order() {
        let refs = extract_column_references(
            "with {tB_01.01, c*}: {c0050} and {c0020-0090} and {(c0010, c0050, c0030)} and {c*} and {c0040}",
        );
        assert_eq!(
            refs,
            vec!["c0050", "c0040", "c0020-0090", "c*", "c0010", "c0030"]
        );
    }

    #[test]
    fn test_list_wrapper_discarded() {
        let refs = extract_column_references("sum({(c0100, c0110)}) > 0");
        assert_eq!(refs, vec!["c0100", "c0110"]);
    }

    #[test]
    fn test_classification_priority() {
        // match( beats every other marker
        assert_eq!(
            classify_rule_type("match({c0030}, \"^A\") and {c0040} >= 0"),
            RuleType::RegexValidation
        );
        // isnull+not beats comparison operators and if/then
        assert_eq!(
            classify_rule_type("if {c0020} > 1000 then not(isnull({c0030})) endif"),
            RuleType::MandatoryField
        );
        assert_eq!(classify_rule_type("{c0040} >= 0"), RuleType::ValueConstraint);
        assert_eq!(
            classify_rule_type("{c0040} <> 0"),
            RuleType::ValueConstraint
        );
        assert_eq!(
            classify_rule_type("if {c0040} = 1 then {c0050} = 2 endif"),
            RuleType::ConditionalRule
        );
        assert_eq!(classify_rule_type("{c0040} = {c0050}"), RuleType::EqualityCheck);
        assert_eq!(
            classify_rule_type("sum({c0040}) in {c0050}"),
            RuleType::ComplexValidation
        );
    }

    #[test]
    fn test_classification_ignores_case() {
        assert_eq!(
            classify_rule_type("MATCH({c0030}, \"^ENT\")"),
            RuleType::RegexValidation
        );
        assert_eq!(
            classify_rule_type("NOT(ISNULL({c0020}))"),
            RuleType::MandatoryField
        );
    }

    #[test]
    fn test_if_blocks_equality() {
        // Contains '=' and 'if' but no 'then'
        assert_eq!(
            classify_rule_type("iff {c0040} = {c0050}"),
            RuleType::ComplexValidation
        );
    }
}
