//! Spreadsheet workbooks (xlsx, xlsm, xlsb, xls, ods) via calamine.
//!
//! Every worksheet becomes a [`GridSheet`] whose grid starts at A1, so row
//! and column numbers match the ones shown by a spreadsheet application.

use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};
use std::io::Cursor;
use std::path::Path;

use super::{GridSheet, SheetFormat, Workbook};
use crate::error::{IngestError, IngestResult};
use crate::models::format_number;

/// File extensions read as spreadsheets.
pub const SPREADSHEET_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// Zip local file header (xlsx, xlsm, xlsb, ods).
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// OLE compound document header (legacy xls).
const OLE_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0];

pub fn is_spreadsheet_path(path: &Path) -> bool {
    path.extension()
        .map(|ext| {
            let ext = ext.to_string_lossy();
            SPREADSHEET_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

/// Whether raw bytes start like a spreadsheet container.
pub fn looks_like_spreadsheet(bytes: &[u8]) -> bool {
    bytes.starts_with(ZIP_MAGIC) || bytes.starts_with(OLE_MAGIC)
}

/// Decode a spreadsheet held in memory.
///
/// A sheet that fails to decode does not fail the workbook; the error is
/// kept and returned when that sheet is read.
pub fn read_workbook(origin: &str, bytes: Vec<u8>) -> IngestResult<Workbook> {
    let mut reader = open_workbook_auto_from_rs(Cursor::new(bytes)).map_err(|e| IngestError::Spreadsheet {
        name: origin.to_string(),
        message: e.to_string(),
    })?;

    let names = reader.sheet_names().to_vec();
    if names.is_empty() {
        return Err(IngestError::EmptyWorkbook(origin.to_string()));
    }

    let sheets = names
        .into_iter()
        .map(|name| {
            let sheet = reader
                .worksheet_range(&name)
                .map(|range| GridSheet {
                    name: name.clone(),
                    format: SheetFormat::Spreadsheet,
                    grid: range_to_grid(&range),
                })
                .map_err(|e| e.to_string());
            (name, sheet)
        })
        .collect();

    Ok(Workbook::with_loaded(origin.to_string(), sheets))
}

/// Lay a used range out from A1, filling the rows and columns above and
/// left of it with empty cells.
pub fn range_to_grid(range: &Range<Data>) -> Vec<Vec<String>> {
    let Some((top, left)) = range.start() else {
        return Vec::new();
    };

    let mut grid: Vec<Vec<String>> = vec![Vec::new(); top as usize];
    for row in range.rows() {
        let mut cells = vec![String::new(); left as usize];
        cells.extend(row.iter().map(cell_text));
        while cells.last().is_some_and(|c| c.is_empty()) {
            cells.pop();
        }
        grid.push(cells);
    }
    grid
}

/// Text of one cell as the CSV export would show it.
pub fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) => format_number(*f),
        Data::Int(i) => i.to_string(),
        Data::Bool(true) => "TRUE".to_string(),
        Data::Bool(false) => "FALSE".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spreadsheet_extensions() {
        assert!(is_spreadsheet_path(Path::new("rules/overview.XLSX")));
        assert!(is_spreadsheet_path(Path::new("checks.ods")));
        assert!(!is_spreadsheet_path(Path::new("tB_01.02.csv")));
        assert!(!is_spreadsheet_path(Path::new("README")));
    }

    #[test]
    fn test_container_signatures() {
        assert!(looks_like_spreadsheet(b"PK\x03\x04rest"));
        assert!(looks_like_spreadsheet(&[0xD0, 0xCF, 0x11, 0xE0, 0xA1]));
        assert!(!looks_like_spreadsheet(b"id;rule\n"));
    }

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(&Data::Empty), "");
        assert_eq!(cell_text(&Data::Float(20.0)), "20");
        assert_eq!(cell_text(&Data::Float(-1.5)), "-1.5");
        assert_eq!(cell_text(&Data::Int(40)), "40");
        assert_eq!(cell_text(&Data::String("0020".into())), "0020");
        assert_eq!(cell_text(&Data::Bool(true)), "TRUE");
    }

    #[test]
    fn test_range_keeps_sheet_positions() {
        // Used range B2:C3
        let mut range = Range::new((1, 1), (2, 2));
        range.set_value((1, 1), Data::String("with {tB_01.02, c0020}: not(isnull({c0020}))".into()));
        range.set_value((2, 2), Data::Float(100.0));

        let sheet = GridSheet {
            name: "Overview".into(),
            format: SheetFormat::Spreadsheet,
            grid: range_to_grid(&range),
        };
        assert_eq!(sheet.row_count(), 3);
        assert_eq!(
            sheet.cell(2, 2),
            Some("with {tB_01.02, c0020}: not(isnull({c0020}))")
        );
        assert_eq!(sheet.cell(3, 3), Some("100"));

        let positions: Vec<(usize, usize)> = sheet.cells().iter().map(|c| (c.row, c.column)).collect();
        assert_eq!(positions, vec![(2, 2), (3, 3)]);
    }

    #[test]
    fn test_empty_range() {
        let range: Range<Data> = Range::empty();
        assert!(range_to_grid(&range).is_empty());
    }

    #[test]
    fn test_corrupt_container_is_rejected() {
        let err = read_workbook("rules.xlsx", b"PK\x03\x04not-a-zip".to_vec()).unwrap_err();
        assert!(matches!(err, IngestError::Spreadsheet { .. }));
    }
}
