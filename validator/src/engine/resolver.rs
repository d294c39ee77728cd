//! Column reference resolution.
//!
//! Expands symbolic references (`c0020`, `c0020-0090`, `c*`) into the
//! concrete columns of one sheet. References that match nothing resolve to
//! an empty list; they are never an error.

use crate::models::{ColumnRef, Schema, ValidationRule};

/// Column codes in reporting templates are numbered in steps of ten.
pub const RANGE_STEP: usize = 10;

/// Resolve one reference against a sheet schema.
pub fn resolve(reference: &ColumnRef, schema: &Schema) -> Vec<String> {
    match reference {
        ColumnRef::Single(name) => {
            if schema.contains(name) {
                vec![name.clone()]
            } else {
                Vec::new()
            }
        }
        ColumnRef::Wildcard => schema
            .columns()
            .iter()
            .filter(|c| is_numbered_column(c))
            .cloned()
            .collect(),
        ColumnRef::Range { start, end } => (*start..=*end)
            .step_by(RANGE_STEP)
            .map(|n| format!("c{:04}", n))
            .filter(|name| schema.contains(name))
            .collect(),
    }
}

/// Resolve a stored reference string.
pub fn resolve_str(raw: &str, schema: &Schema) -> Vec<String> {
    resolve(&ColumnRef::parse(raw), schema)
}

/// All columns a rule touches in this sheet.
///
/// Each reference is resolved on its own, in rule order. A column reached
/// through two references appears twice and is checked twice.
pub fn resolve_rule_columns(rule: &ValidationRule, schema: &Schema) -> Vec<String> {
    rule.column_refs()
        .flat_map(|r| resolve(&r, schema))
        .collect()
}

/// `c` followed by a digit.
fn is_numbered_column(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next() == Some('c') && chars.next().is_some_and(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RuleType;

    fn schema() -> Schema {
        ["c0020", "c0030", "c0040", "c0050", "c0060"].into_iter().collect()
    }

    #[test]
    fn test_single_present_and_missing() {
        assert_eq!(resolve_str("c0030", &schema()), vec!["c0030"]);
        assert!(resolve_str("c0070", &schema()).is_empty());
    }

    #[test]
    fn test_range_steps_by_ten() {
        assert_eq!(
            resolve_str("c0020-0050", &schema()),
            vec!["c0020", "c0030", "c0040", "c0050"]
        );
    }

    #[test]
    fn test_range_skips_off_step_columns() {
        let schema: Schema = ["c0020", "c0025", "c0030"].into_iter().collect();
        assert_eq!(resolve_str("c0020-0030", &schema), vec!["c0020", "c0030"]);
    }

    #[test]
    fn test_inverted_range_is_empty() {
        assert!(resolve_str("c0050-0020", &schema()).is_empty());
    }

    #[test]
    fn test_wildcard_shape() {
        let schema: Schema = ["c0020", "code", "c", "C0030", "c0100", "_row_index"]
            .into_iter()
            .collect();
        assert_eq!(resolve_str("c*", &schema), vec!["c0020", "c0100"]);
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let schema = schema();
        let first = resolve_str("c0020-0060", &schema);
        let second = resolve_str("c0020-0060", &schema);
        assert_eq!(first, second);
    }

    #[test]
    fn test_rule_columns_follow_each_reference() {
        let rule = ValidationRule {
            id: "ECB_RULE_001".into(),
            expression: String::new(),
            source_row: 1,
            table_references: vec![],
            column_references: vec!["c0040".into(), "c0020-0040".into(), "c0090".into()],
            rule_type: RuleType::MandatoryField,
        };
        assert_eq!(
            resolve_rule_columns(&rule, &schema()),
            vec!["c0040", "c0020", "c0030", "c0040"]
        );
    }
}
