use std::fmt;

use serde::Serialize;

/// Grid-station code as used to join the station registry, the building
/// registry and the classification sheet.
///
/// Workbooks store the code as an integer, as a float with a zero fraction or
/// as text. All of them normalize to the same integer-valued string, once, at
/// ingestion; nothing downstream compares raw cell values.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct StationCode(String);

impl StationCode {
    /// Normalize a textual code. `"4711"`, `" 4711 "`, `"4711.0"` and
    /// `"04711"` all produce `4711`. Non-numeric codes are kept verbatim
    /// (trimmed). Blank input and fractional numbers have no code, exactly as
    /// for [`StationCode::from_number`].
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }

        if let Ok(n) = trimmed.parse::<i64>() {
            return Some(Self(n.to_string()));
        }

        if let Ok(f) = trimmed.parse::<f64>() {
            return Self::from_number(f);
        }

        Some(Self(trimmed.to_string()))
    }

    /// Normalize a numeric cell. Only finite, integral values are codes.
    pub fn from_number(value: f64) -> Option<Self> {
        if value.is_finite() && value.fract() == 0.0 {
            Some(Self(format!("{}", value as i64)))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A distribution transformer ("nettstasjon").
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridStation {
    pub code: StationCode,
    /// Display name; also the name of the station's load column in the
    /// hourly sheet.
    pub name: String,
    pub capacity_kw: u32,
}
