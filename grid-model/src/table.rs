//! Sheet-shaped data as read from a workbook: a header row plus typed cells.

use std::{collections::HashMap, fmt};

use time::{
    format_description::well_known::Rfc3339,
    macros::format_description,
    OffsetDateTime, PrimitiveDateTime,
};

use crate::domain::StationCode;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum TableError {
    #[error("sheet '{sheet}' has no column '{column}'")]
    MissingColumn { sheet: String, column: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Number(f64),
    Text(String),
    Bool(bool),
    DateTime(PrimitiveDateTime),
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Numeric value; text is parsed, blanks and non-numbers are `None`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Number(v) => Some(*v),
            Cell::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<PrimitiveDateTime> {
        match self {
            Cell::DateTime(ts) => Some(*ts),
            Cell::Text(s) => parse_timestamp(s),
            _ => None,
        }
    }

    pub fn station_code(&self) -> Option<StationCode> {
        match self {
            Cell::Number(v) => StationCode::from_number(*v),
            Cell::Text(s) => StationCode::parse(s),
            _ => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Number(v) => write!(f, "{v}"),
            Cell::Text(s) => f.write_str(s),
            Cell::Bool(b) => write!(f, "{b}"),
            Cell::DateTime(ts) => write!(f, "{ts}"),
        }
    }
}

/// Parse a wall-clock timestamp. Accepts `YYYY-MM-DD HH:MM[:SS]`, the same
/// with a `T` separator, and RFC 3339 (the offset is dropped, the local
/// wall-clock time is kept).
pub fn parse_timestamp(raw: &str) -> Option<PrimitiveDateTime> {
    let s = raw.trim();
    let formats = [
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
        format_description!("[year]-[month]-[day] [hour]:[minute]"),
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
        format_description!("[year]-[month]-[day]T[hour]:[minute]"),
    ];

    for format in formats {
        if let Ok(ts) = PrimitiveDateTime::parse(s, format) {
            return Some(ts);
        }
    }

    OffsetDateTime::parse(s, &Rfc3339)
        .ok()
        .map(|odt| PrimitiveDateTime::new(odt.date(), odt.time()))
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    name: String,
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(name: impl Into<String>, headers: Vec<String>) -> Self {
        Self {
            name: name.into(),
            headers,
            rows: Vec::new(),
        }
    }

    /// Append a row, padding short rows with empty cells and dropping cells
    /// beyond the header width.
    pub fn push_row(&mut self, mut row: Vec<Cell>) {
        row.resize(self.headers.len(), Cell::Empty);
        self.rows.push(row);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == column)
    }

    pub fn require_column(&self, column: &str) -> Result<usize, TableError> {
        self.column_index(column)
            .ok_or_else(|| TableError::MissingColumn {
                sheet: self.name.clone(),
                column: column.to_string(),
            })
    }

    /// Inner join on a station-code column present in both tables.
    ///
    /// Output rows follow the left table's order; a left row matching several
    /// right rows is repeated once per match. Keys compare after
    /// [`StationCode`] normalization, and rows without a usable key never
    /// match. Columns are the left headers followed by the right headers that
    /// the left side does not already have.
    pub fn inner_join_on_station(&self, right: &Table, key: &str) -> Result<Table, TableError> {
        let left_key = self.require_column(key)?;
        let right_key = right.require_column(key)?;

        let mut index: HashMap<StationCode, Vec<usize>> = HashMap::new();
        for (i, row) in right.rows.iter().enumerate() {
            if let Some(code) = row[right_key].station_code() {
                index.entry(code).or_default().push(i);
            }
        }

        let extra: Vec<usize> = right
            .headers
            .iter()
            .enumerate()
            .filter(|(_, h)| self.column_index(h).is_none())
            .map(|(i, _)| i)
            .collect();

        let mut headers = self.headers.clone();
        headers.extend(extra.iter().map(|&i| right.headers[i].clone()));
        let mut joined = Table::new(self.name.clone(), headers);

        for row in &self.rows {
            let Some(code) = row[left_key].station_code() else {
                continue;
            };
            let Some(matches) = index.get(&code) else {
                continue;
            };
            for &r in matches {
                let mut out = row.clone();
                out.extend(extra.iter().map(|&i| right.rows[r][i].clone()));
                joined.push_row(out);
            }
        }

        Ok(joined)
    }
}
