use std::io::Read;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};

use crate::coerce;
use crate::error::ImportError;
use crate::models::YearlyPlacementRecord;

const YEAR: &str = "year";
const ELIGIBLE: &str = "eligible";
const PLACED: &str = "placed";
const HIGHER_STUDIES: &str = "higher studies";

#[derive(Debug, Default, PartialEq)]
pub struct ParsedImport {
    pub records: Vec<YearlyPlacementRecord>,
    /// Rows without a year; they cannot be keyed and are dropped.
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy)]
struct ColumnMap {
    year: usize,
    eligible: usize,
    placed: usize,
    higher_studies: usize,
}

fn normalize_header(header: &str) -> String {
    header
        .trim_start_matches('\u{feff}')
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_lowercase()
}

impl ColumnMap {
    fn from_headers<S: AsRef<str>>(headers: &[S]) -> Result<Self, ImportError> {
        let normalized: Vec<String> = headers
            .iter()
            .map(|h| normalize_header(h.as_ref()))
            .collect();
        let find = |name: &str| normalized.iter().position(|h| h == name);

        let columns = [
            ("Year", find(YEAR)),
            ("Eligible", find(ELIGIBLE)),
            ("Placed", find(PLACED)),
            ("Higher Studies", find(HIGHER_STUDIES)),
        ];

        let missing: Vec<&str> = columns
            .iter()
            .filter(|(_, position)| position.is_none())
            .map(|(label, _)| *label)
            .collect();

        match columns.map(|(_, position)| position) {
            [Some(year), Some(eligible), Some(placed), Some(higher_studies)] => Ok(Self {
                year,
                eligible,
                placed,
                higher_studies,
            }),
            _ => Err(ImportError::MissingColumns {
                missing: missing.join(", "),
            }),
        }
    }

    fn map_row<S: AsRef<str>>(&self, row: &[S]) -> Option<YearlyPlacementRecord> {
        let cell = |index: usize| row.get(index).map(|c| c.as_ref()).unwrap_or("");

        let year = cell(self.year).trim();
        if year.is_empty() {
            return None;
        }

        Some(YearlyPlacementRecord::new(
            year,
            coerce::count_from_str(cell(self.eligible)),
            coerce::count_from_str(cell(self.placed)),
            coerce::count_from_str(cell(self.higher_studies)),
        ))
    }
}

/// Maps a header row plus data rows. Each row stands alone: a bad number only
/// zeroes that field, and a later row for the same year replaces an earlier one.
pub fn parse_rows<S, R>(headers: &[S], rows: R) -> Result<ParsedImport, ImportError>
where
    S: AsRef<str>,
    R: IntoIterator,
    R::Item: AsRef<[String]>,
{
    let columns = ColumnMap::from_headers(headers)?;
    let mut parsed = ParsedImport::default();

    for row in rows {
        let row = row.as_ref();
        if row.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }

        match columns.map_row(row) {
            Some(record) => match parsed.records.iter_mut().find(|r| r.year == record.year) {
                Some(existing) => {
                    tracing::debug!(year = %record.year, "repeated year in import, later row wins");
                    *existing = record;
                }
                None => parsed.records.push(record),
            },
            None => parsed.skipped += 1,
        }
    }

    Ok(parsed)
}

/// Cells are decoded one at a time so a stray non-UTF-8 byte (common in
/// cp1252 exports) only garbles its own cell.
fn lossy_cell(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

pub fn parse_csv<R: Read>(reader: R, source: &str) -> Result<ParsedImport, ImportError> {
    let unreadable = |e: csv::Error| ImportError::Unreadable {
        path: source.to_string(),
        message: e.to_string(),
    };

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .byte_headers()
        .map_err(unreadable)?
        .iter()
        .map(lossy_cell)
        .collect();

    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(ImportError::Empty);
    }

    let mut rows = Vec::new();
    for result in reader.byte_records() {
        let record = result.map_err(unreadable)?;
        rows.push(record.iter().map(lossy_cell).collect::<Vec<String>>());
    }

    parse_rows(&headers, rows)
}

/// Renders a spreadsheet cell the way it reads on screen; whole floats drop the
/// trailing `.0` so a year typed as `2023` stays `2023`.
pub fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(text) => text.clone(),
        Data::Int(value) => value.to_string(),
        Data::Float(value) if value.fract() == 0.0 && value.abs() < 1e15 => {
            format!("{}", *value as i64)
        }
        Data::Float(value) => value.to_string(),
        Data::Bool(value) => value.to_string(),
        other => other.to_string(),
    }
}

pub fn parse_workbook(path: &Path) -> Result<ParsedImport, ImportError> {
    let source = path.display().to_string();
    let unreadable = |message: String| ImportError::Unreadable {
        path: source.clone(),
        message,
    };

    let mut workbook = open_workbook_auto(path).map_err(|e| unreadable(e.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(ImportError::Empty)?
        .map_err(|e| unreadable(e.to_string()))?;

    let mut rows = range
        .rows()
        .map(|row| row.iter().map(cell_text).collect::<Vec<String>>());

    let headers = rows.next().ok_or(ImportError::Empty)?;
    parse_rows(&headers, rows)
}

pub fn read_file(path: &Path) -> Result<ParsedImport, ImportError> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "csv" => {
            let file = std::fs::File::open(path).map_err(|e| ImportError::Unreadable {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
            parse_csv(file, &path.display().to_string())
        }
        "xlsx" | "xlsm" | "xls" | "ods" => parse_workbook(path),
        other => Err(ImportError::UnsupportedExtension(other.to_string())),
    }
}
