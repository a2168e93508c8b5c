pub mod csv_directory;
pub mod dataset;
pub mod xlsx_workbook;

pub use csv_directory::CsvDirectorySource;
pub use dataset::{load_dataset, Dataset};
pub use xlsx_workbook::XlsxWorkbookSource;

use grid_model::{Table, TableError};

use crate::config::{DatasetConfig, DatasetKind};

/// Startup failure while reading the measurement workbook. Always fatal.
#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("failed to open {path}: {reason}")]
    Open { path: String, reason: String },
    #[error("sheet '{0}' not found")]
    MissingSheet(String),
    #[error("sheet '{sheet}' has no column '{column}'")]
    MissingColumn { sheet: String, column: String },
    /// `row` is the 1-based spreadsheet row, header included.
    #[error("sheet '{sheet}' row {row} column '{column}': {reason}")]
    InvalidCell {
        sheet: String,
        row: usize,
        column: String,
        reason: String,
    },
    #[error("sheet '{0}' has no header row")]
    Empty(String),
}

impl From<TableError> for LoadError {
    fn from(e: TableError) -> Self {
        match e {
            TableError::MissingColumn { sheet, column } => LoadError::MissingColumn { sheet, column },
        }
    }
}

/// A workbook-like store that yields whole sheets by name.
pub trait Source {
    /// Human-readable location, for logs.
    fn describe(&self) -> String;

    /// Content hash of the underlying file(s); stable while the data is.
    fn fingerprint(&self) -> Result<String, LoadError>;

    fn read_table(&mut self, sheet: &str) -> Result<Table, LoadError>;
}

/// Open the configured source and load it.
pub fn load_from_config(cfg: &DatasetConfig) -> Result<Dataset, LoadError> {
    match cfg.kind {
        DatasetKind::Xlsx => {
            let mut source = XlsxWorkbookSource::open(&cfg.path)?;
            load_dataset(&mut source, &cfg.layout)
        }
        DatasetKind::CsvDir => {
            let mut source = CsvDirectorySource::new(&cfg.path).with_delimiter(cfg.csv_delimiter as u8);
            load_dataset(&mut source, &cfg.layout)
        }
    }
}
