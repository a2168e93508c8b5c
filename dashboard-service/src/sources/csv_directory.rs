use std::{
    fs::{self, File},
    path::PathBuf,
};

use csv::StringRecord;
use grid_model::{table::parse_timestamp, Cell, Table};

use crate::sources::{LoadError, Source};

/// Directory of per-sheet exports: sheet `Timedata` is read from
/// `<dir>/Timedata.csv`, and so on.
///
/// Each file has a header row. Fields are typed on read: blank fields are
/// empty, numeric fields are numbers, timestamp-looking fields are timestamps
/// and anything else stays text.
pub struct CsvDirectorySource {
    dir: PathBuf,
    delimiter: u8,
}

impl CsvDirectorySource {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self {
            dir: dir.into(),
            delimiter: b',',
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    fn sheet_path(&self, sheet: &str) -> PathBuf {
        self.dir.join(format!("{sheet}.csv"))
    }

    fn open_error(&self, e: impl std::fmt::Display) -> LoadError {
        LoadError::Open {
            path: self.dir.display().to_string(),
            reason: e.to_string(),
        }
    }
}

fn parse_field(raw: &str) -> Cell {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Cell::Empty;
    }
    if let Ok(v) = trimmed.parse::<f64>() {
        return Cell::Number(v);
    }
    if let Some(ts) = parse_timestamp(trimmed) {
        return Cell::DateTime(ts);
    }
    Cell::Text(trimmed.to_string())
}

fn record_to_cells(record: &StringRecord) -> Vec<Cell> {
    record.iter().map(parse_field).collect()
}

impl Source for CsvDirectorySource {
    fn describe(&self) -> String {
        format!("csv directory {}", self.dir.display())
    }

    fn fingerprint(&self) -> Result<String, LoadError> {
        let mut files: Vec<PathBuf> = fs::read_dir(&self.dir)
            .map_err(|e| self.open_error(e))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "csv"))
            .collect();
        files.sort();

        let mut hasher = blake3::Hasher::new();
        for path in files {
            let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
            hasher.update(&(name.len() as u32).to_le_bytes());
            hasher.update(name.as_bytes());
            let mut file = File::open(&path).map_err(|e| self.open_error(e))?;
            std::io::copy(&mut file, &mut hasher).map_err(|e| self.open_error(e))?;
        }
        Ok(hasher.finalize().to_hex().to_string())
    }

    fn read_table(&mut self, sheet: &str) -> Result<Table, LoadError> {
        if !self.dir.is_dir() {
            return Err(self.open_error("not a directory"));
        }
        let path = self.sheet_path(sheet);
        if !path.is_file() {
            return Err(LoadError::MissingSheet(sheet.to_string()));
        }

        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .flexible(true)
            .from_path(&path)
            .map_err(|e| LoadError::Open {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        let headers = rdr
            .headers()
            .map_err(|e| LoadError::Open {
                path: path.display().to_string(),
                reason: format!("failed to read CSV headers: {e}"),
            })?
            .clone();
        if headers.is_empty() {
            return Err(LoadError::Empty(sheet.to_string()));
        }

        let mut table = Table::new(sheet, headers.iter().map(|h| h.trim().to_string()).collect());
        for result in rdr.records() {
            let record = result.map_err(|e| LoadError::Open {
                path: path.display().to_string(),
                reason: format!("failed to read CSV record: {e}"),
            })?;
            table.push_row(record_to_cells(&record));
        }

        Ok(table)
    }
}
