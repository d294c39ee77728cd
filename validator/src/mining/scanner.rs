//! Expression scanner.
//!
//! Picks rule-like text out of arbitrary spreadsheet cells. A cell is a
//! candidate when it is long enough and shows at least two independent
//! structural markers of the rule language.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::RuleCandidate;

/// Shortest text that can be a rule.
pub const MIN_EXPRESSION_LEN: usize = 10;

/// Number of distinct markers a candidate must show.
pub const MIN_MARKER_MATCHES: usize = 2;

/// Marker patterns of the rule language, all case-insensitive.
static MARKERS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)with\s*\{[^}]+\}.*:",     // with {tB_01.02, ...}:
        r"(?i)match\s*\(\s*\{[^}]+\}",  // match({c0030}, ...
        r"(?i)\{c\d{4}\}",              // {c0020}
        r"(?i)tB_\d{2}\.\d{2}",         // tB_01.02
        r"(?i)isnull\s*\(",             // isnull(
        r"(?i)not\s*\(\s*isnull",       // not(isnull
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid marker regex"))
    .collect()
});

/// A raw text cell of a sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCell {
    /// 1-based row.
    pub row: usize,
    /// 1-based column.
    pub column: usize,
    /// Cell text, `None` for an empty cell.
    pub text: Option<String>,
}

impl RawCell {
    pub fn new(row: usize, column: usize, text: impl Into<String>) -> Self {
        Self {
            row,
            column,
            text: Some(text.into()),
        }
    }
}

/// Number of marker patterns found in `text`.
pub fn marker_count(text: &str) -> usize {
    MARKERS.iter().filter(|re| re.is_match(text)).count()
}

/// Whether `text` looks like a validation rule.
pub fn is_rule_expression(text: &str) -> bool {
    if text.chars().count() < MIN_EXPRESSION_LEN {
        return false;
    }
    marker_count(text) >= MIN_MARKER_MATCHES
}

/// Scan the cells of one sheet, in order, for rule candidates.
pub fn scan_cells<'a, I>(cells: I) -> Vec<RuleCandidate>
where
    I: IntoIterator<Item = &'a RawCell>,
{
    cells
        .into_iter()
        .filter_map(|cell| {
            let text = cell.text.as_deref()?;
            is_rule_expression(text).then(|| RuleCandidate {
                text: text.to_string(),
                row: cell.row,
            })
        })
        .collect()
}
