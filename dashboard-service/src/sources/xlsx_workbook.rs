use std::{fs::File, io::BufReader, path::PathBuf};

use calamine::{open_workbook_auto, Data, Range, Reader, Sheets};
use grid_model::{table::parse_timestamp, Cell, Table};
use time::{macros::datetime, Duration, PrimitiveDateTime};

use crate::sources::{LoadError, Source};

/// Excel/LibreOffice workbook source (`.xlsx`, `.xlsm`, `.xls`, `.ods`).
///
/// The first non-empty row of each sheet is its header row.
pub struct XlsxWorkbookSource {
    path: PathBuf,
    workbook: Sheets<BufReader<File>>,
}

impl XlsxWorkbookSource {
    pub fn open<P: Into<PathBuf>>(path: P) -> Result<Self, LoadError> {
        let path = path.into();
        let workbook = open_workbook_auto(&path).map_err(|e| LoadError::Open {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self { path, workbook })
    }
}

// Day zero of the 1900 date system, as the serial numbers are counted.
const EXCEL_EPOCH: PrimitiveDateTime = datetime!(1899-12-30 0:00);

/// Convert an Excel serial date (days since 1899-12-30, fraction = time of
/// day) to a timestamp, rounded to the nearest second.
pub(crate) fn excel_serial_to_datetime(serial: f64) -> Option<PrimitiveDateTime> {
    if !serial.is_finite() {
        return None;
    }
    let seconds = (serial * 86_400.0).round() as i64;
    EXCEL_EPOCH.checked_add(Duration::seconds(seconds))
}

fn convert_cell(data: &Data) -> Cell {
    match data {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::Int(v) => Cell::Number(*v as f64),
        Data::Float(v) => Cell::Number(*v),
        Data::Bool(b) => Cell::Bool(*b),
        Data::String(s) => Cell::Text(s.clone()),
        Data::DateTime(dt) => excel_serial_to_datetime(dt.as_f64()).map_or(Cell::Empty, Cell::DateTime),
        Data::DateTimeIso(s) => parse_timestamp(s).map_or_else(|| Cell::Text(s.clone()), Cell::DateTime),
        Data::DurationIso(s) => Cell::Text(s.clone()),
    }
}

pub(crate) fn range_to_table(sheet: &str, range: &Range<Data>) -> Result<Table, LoadError> {
    let mut rows = range.rows();
    let header = rows.next().ok_or_else(|| LoadError::Empty(sheet.to_string()))?;
    let headers = header.iter().map(|c| c.to_string().trim().to_string()).collect();

    let mut table = Table::new(sheet, headers);
    for row in rows {
        table.push_row(row.iter().map(convert_cell).collect());
    }
    Ok(table)
}

fn require_sheet(names: &[String], sheet: &str) -> Result<(), LoadError> {
    if names.iter().any(|name| name == sheet) {
        Ok(())
    } else {
        Err(LoadError::MissingSheet(sheet.to_string()))
    }
}

impl Source for XlsxWorkbookSource {
    fn describe(&self) -> String {
        format!("workbook {}", self.path.display())
    }

    fn fingerprint(&self) -> Result<String, LoadError> {
        let mut file = File::open(&self.path).map_err(|e| LoadError::Open {
            path: self.path.display().to_string(),
            reason: e.to_string(),
        })?;
        let mut hasher = blake3::Hasher::new();
        std::io::copy(&mut file, &mut hasher).map_err(|e| LoadError::Open {
            path: self.path.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(hasher.finalize().to_hex().to_string())
    }

    fn read_table(&mut self, sheet: &str) -> Result<Table, LoadError> {
        require_sheet(&self.workbook.sheet_names(), sheet)?;

        let range = self.workbook.worksheet_range(sheet).map_err(|e| LoadError::Open {
            path: self.path.display().to_string(),
            reason: format!("sheet '{sheet}': {e}"),
        })?;
        range_to_table(sheet, &range)
    }
}
