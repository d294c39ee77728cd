//! Sheet and workbook reader.
//!
//! A workbook is either a spreadsheet file (xlsx, xlsm, xlsb, xls, ods), a
//! single CSV file, or a directory of CSV exports with one file per sheet
//! named after the file stem. Every sheet is kept as a raw grid of strings
//! laid out like the spreadsheet. It can then be viewed either as a stream
//! of text cells (for rule mining) or as a data table (for validation).

pub mod spreadsheet;

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{IngestError, IngestResult};
use crate::mining::{CellSheet, RawCell};
use crate::models::{CellValue, DataRow, Schema, SheetData};

pub use spreadsheet::{is_spreadsheet_path, looks_like_spreadsheet};

static TABLE_SHEET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)tB_\d{2}\.\d{2}").expect("valid table sheet regex"));

/// Candidate delimiters, in tie-break order.
const DELIMITERS: [char; 4] = [';', ',', '\t', '|'];

/// Lines looked at when guessing the delimiter.
const DELIMITER_SAMPLE_LINES: usize = 20;

// =============================================================================
// Encoding & delimiter detection
// =============================================================================

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let charset = chardet::detect(bytes).0;

    match charset.to_lowercase().as_str() {
        "" | "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        other => other.to_string(),
    }
}

/// Decode bytes with the given encoding, falling back to lossy UTF-8.
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    match encoding.to_lowercase().as_str() {
        // windows-1252 is a superset of the printable latin-1 range
        "iso-8859-1" | "latin-1" | "latin1" | "windows-1252" | "cp1252" => {
            encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned()
        }
        _ => {
            let (text, _, _) = encoding_rs::UTF_8.decode(bytes);
            text.into_owned()
        }
    }
}

/// Pick the delimiter that occurs most over the first lines.
///
/// Layout sheets often start with a title line that has no delimiter at
/// all, so more than the first line is sampled. Defaults to `,`.
pub fn detect_delimiter(content: &str) -> char {
    let sample: Vec<&str> = content
        .lines()
        .filter(|l| !l.trim().is_empty())
        .take(DELIMITER_SAMPLE_LINES)
        .collect();

    let mut best = ',';
    let mut best_count = 0;
    for &sep in &DELIMITERS {
        let count: usize = sample.iter().map(|l| l.matches(sep).count()).sum();
        if count > best_count {
            best_count = count;
            best = sep;
        }
    }
    best
}

/// Parse decoded CSV content into a grid of strings.
///
/// The grid keeps spreadsheet rows: a blank line is an empty row, and a
/// record whose quoted fields span several lines is still one row.
pub fn read_grid(content: &str, delimiter: char, sheet: &str) -> IngestResult<Vec<Vec<String>>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter as u8)
        .from_reader(content.as_bytes());

    let mut grid: Vec<Vec<String>> = Vec::new();
    // Lines taken up by line breaks inside quoted fields so far
    let mut embedded_lines = 0usize;

    for record in reader.records() {
        let record = record.map_err(|e| IngestError::Csv {
            sheet: sheet.to_string(),
            message: e.to_string(),
        })?;

        // Blank lines yield no record; the start line tells where it sits
        let start_line = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(grid.len() + 1 + embedded_lines);
        let row = start_line.saturating_sub(embedded_lines).max(grid.len() + 1);
        grid.resize_with(row - 1, Vec::new);

        let fields: Vec<String> = record.iter().map(|f| f.to_string()).collect();
        embedded_lines += fields.iter().map(|f| f.matches('\n').count()).sum::<usize>();
        grid.push(fields);
    }
    Ok(grid)
}

// =============================================================================
// Sheets
// =============================================================================

/// Position of the column codes and the data block in a table sheet.
///
/// Rows and columns are 1-based, as in the spreadsheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SheetLayout {
    /// Row holding the column codes.
    pub header_row: usize,
    /// First column that can hold a column code (D).
    pub first_column: usize,
    /// First data row.
    pub first_data_row: usize,
}

impl Default for SheetLayout {
    fn default() -> Self {
        Self {
            header_row: 6,
            first_column: 4,
            first_data_row: 8,
        }
    }
}

/// Column name for a header code. Only all-digit codes name a column.
pub fn column_name(code: &str) -> Option<String> {
    let code = code.trim();
    if code.is_empty() || !code.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(format!("c{:0>4}", code))
}

/// How a sheet was read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetFormat {
    Csv { encoding: String, delimiter: char },
    Spreadsheet,
}

impl fmt::Display for SheetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Csv {
                encoding,
                delimiter: '\t',
            } => write!(f, "CSV ({}, tab)", encoding),
            Self::Csv {
                encoding,
                delimiter,
            } => write!(f, "CSV ({}, '{}')", encoding, delimiter),
            Self::Spreadsheet => f.write_str("spreadsheet"),
        }
    }
}

/// One sheet as a raw grid.
#[derive(Debug, Clone, PartialEq)]
pub struct GridSheet {
    pub name: String,
    pub format: SheetFormat,
    /// `grid[r][c]` is the cell at spreadsheet row `r + 1`, column `c + 1`.
    pub grid: Vec<Vec<String>>,
}

impl GridSheet {
    /// Parse CSV bytes with auto-detection.
    pub fn from_csv_bytes(name: impl Into<String>, bytes: &[u8]) -> IngestResult<Self> {
        let name = name.into();
        let encoding = detect_encoding(bytes);
        let content = decode_content(bytes, &encoding);
        let delimiter = detect_delimiter(&content);
        let grid = read_grid(&content, delimiter, &name)?;

        Ok(Self {
            name,
            format: SheetFormat::Csv {
                encoding,
                delimiter,
            },
            grid,
        })
    }

    /// Read a CSV file; the sheet is named after the file stem.
    pub fn read_csv_file(path: &Path) -> IngestResult<Self> {
        let bytes = std::fs::read(path).map_err(|e| IngestError::io(path.display().to_string(), e))?;
        Self::from_csv_bytes(sheet_name(path), &bytes)
    }

    /// Number of rows, trailing empty rows included.
    pub fn row_count(&self) -> usize {
        self.grid.len()
    }

    /// Widest row.
    pub fn column_count(&self) -> usize {
        self.grid.iter().map(|r| r.len()).max().unwrap_or(0)
    }

    /// Cell text at a 1-based position, `None` when outside the grid.
    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        if row == 0 || column == 0 {
            return None;
        }
        self.grid
            .get(row - 1)
            .and_then(|r| r.get(column - 1))
            .map(|s| s.as_str())
    }

    /// Every non-empty cell, row by row.
    pub fn cells(&self) -> Vec<RawCell> {
        let mut cells = Vec::new();
        for (r, row) in self.grid.iter().enumerate() {
            for (c, text) in row.iter().enumerate() {
                if !text.trim().is_empty() {
                    cells.push(RawCell::new(r + 1, c + 1, text.clone()));
                }
            }
        }
        cells
    }

    /// The sheet as a cell stream for rule mining.
    pub fn to_cell_sheet(&self) -> CellSheet {
        CellSheet {
            name: self.name.clone(),
            cells: self.cells(),
        }
    }

    /// The sheet as a data table.
    ///
    /// Sheets shorter than the first data row, or without any column code,
    /// yield no rows. Rows whose mapped cells are all empty are omitted.
    pub fn to_sheet_data(&self, layout: &SheetLayout) -> SheetData {
        let mut data = SheetData {
            name: self.name.clone(),
            ..Default::default()
        };

        if self.row_count() < layout.first_data_row {
            return data;
        }

        let mapping: Vec<(usize, String)> = (layout.first_column..=self.column_count())
            .filter_map(|col| {
                let code = self.cell(layout.header_row, col)?;
                column_name(code).map(|name| (col, name))
            })
            .collect();

        if mapping.is_empty() {
            return data;
        }

        data.schema = mapping.iter().map(|(_, name)| name.clone()).collect::<Schema>();

        for row in layout.first_data_row..=self.row_count() {
            let mut record = DataRow::new(row);
            for (col, name) in &mapping {
                let value = self
                    .cell(row, *col)
                    .map(CellValue::from_raw)
                    .unwrap_or(CellValue::Null);
                record.insert(name.clone(), value);
            }
            if record.has_data() {
                data.rows.push(record);
            }
        }

        data
    }
}

/// Sheet name of a file: its stem.
pub fn sheet_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Whether a sheet name has the shape of a data table (`tB_01.02`).
pub fn is_table_sheet(name: &str) -> bool {
    TABLE_SHEET.is_match(name)
}

// =============================================================================
// Workbooks
// =============================================================================

#[derive(Debug, Clone)]
enum SheetSource {
    /// CSV file, read on demand.
    CsvFile(PathBuf),
    /// Sheet already decoded from a spreadsheet, or the reason it could not be.
    Loaded(Result<GridSheet, String>),
}

/// A named, ordered collection of sheets.
#[derive(Debug, Clone)]
pub struct Workbook {
    /// Path or URL the workbook came from.
    pub origin: String,
    sheets: Vec<(String, SheetSource)>,
}

impl Workbook {
    /// Open a spreadsheet file, a CSV file, or a directory of CSV files.
    pub fn open(path: &Path) -> IngestResult<Self> {
        if path.is_dir() {
            return Self::open_csv_dir(path);
        }

        let bytes = std::fs::read(path).map_err(|e| IngestError::io(path.display().to_string(), e))?;
        if is_spreadsheet_path(path) || looks_like_spreadsheet(&bytes) {
            spreadsheet::read_workbook(&path.display().to_string(), bytes)
        } else {
            let sheet = GridSheet::from_csv_bytes(sheet_name(path), &bytes)?;
            Ok(Self::from_sheets(path.display().to_string(), vec![sheet]))
        }
    }

    /// Workbook from downloaded bytes: a spreadsheet, or else one CSV sheet
    /// called `name`.
    pub fn from_bytes(origin: &str, name: &str, bytes: Vec<u8>) -> IngestResult<Self> {
        if looks_like_spreadsheet(&bytes) {
            spreadsheet::read_workbook(origin, bytes)
        } else {
            let sheet = GridSheet::from_csv_bytes(name, &bytes)?;
            Ok(Self::from_sheets(origin, vec![sheet]))
        }
    }

    /// Workbook over sheets already in memory.
    pub fn from_sheets(origin: impl Into<String>, sheets: Vec<GridSheet>) -> Self {
        Self {
            origin: origin.into(),
            sheets: sheets
                .into_iter()
                .map(|s| (s.name.clone(), SheetSource::Loaded(Ok(s))))
                .collect(),
        }
    }

    /// List the CSV files of a directory, sorted by file name.
    ///
    /// Two files with the same stem (`a.csv`, `a.CSV`) are rejected.
    fn open_csv_dir(dir: &Path) -> IngestResult<Self> {
        let entries = std::fs::read_dir(dir).map_err(|e| IngestError::io(dir.display().to_string(), e))?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| IngestError::io(dir.display().to_string(), e))?;
            let path = entry.path();
            if path.is_file() && is_csv(&path) {
                paths.push(path);
            }
        }

        if paths.is_empty() {
            return Err(IngestError::EmptyWorkbook(dir.display().to_string()));
        }
        paths.sort();

        let mut seen = HashSet::new();
        let mut sheets = Vec::with_capacity(paths.len());
        for path in paths {
            let name = sheet_name(&path);
            if !seen.insert(name.clone()) {
                return Err(IngestError::DuplicateSheet(name));
            }
            sheets.push((name, SheetSource::CsvFile(path)));
        }

        Ok(Self {
            origin: dir.display().to_string(),
            sheets,
        })
    }

    pub(crate) fn with_loaded(origin: String, sheets: Vec<(String, Result<GridSheet, String>)>) -> Self {
        Self {
            origin,
            sheets: sheets
                .into_iter()
                .map(|(name, sheet)| (name, SheetSource::Loaded(sheet)))
                .collect(),
        }
    }

    /// Sheet names in workbook order.
    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Data table sheets, optionally narrowed to names containing `filter`
    /// (ignoring case). Workbook order is kept.
    pub fn table_sheets(&self, filter: Option<&str>) -> Vec<&str> {
        let filter = filter.map(|f| f.trim().to_lowercase()).filter(|f| !f.is_empty());
        self.sheet_names()
            .into_iter()
            .filter(|name| is_table_sheet(name))
            .filter(|name| {
                filter
                    .as_ref()
                    .map_or(true, |f| name.to_lowercase().contains(f.as_str()))
            })
            .collect()
    }

    /// Read one sheet by name.
    pub fn read_sheet(&self, name: &str) -> IngestResult<GridSheet> {
        let (_, source) = self
            .sheets
            .iter()
            .find(|(n, _)| n == name)
            .ok_or_else(|| IngestError::SheetNotFound(name.to_string()))?;
        self.load(name, source)
    }

    /// Read every sheet, in order.
    pub fn read_all(&self) -> IngestResult<Vec<GridSheet>> {
        self.sheets
            .iter()
            .map(|(name, source)| self.load(name, source))
            .collect()
    }

    fn load(&self, name: &str, source: &SheetSource) -> IngestResult<GridSheet> {
        match source {
            SheetSource::CsvFile(path) => GridSheet::read_csv_file(path),
            SheetSource::Loaded(Ok(sheet)) => Ok(sheet.clone()),
            SheetSource::Loaded(Err(message)) => Err(IngestError::Spreadsheet {
                name: format!("{} [{}]", self.origin, name),
                message: message.clone(),
            }),
        }
    }
}

fn is_csv(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case("csv"))
        .unwrap_or(false)
}
