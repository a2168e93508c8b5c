use serde::Serialize;

use crate::domain::StationCode;

/// A measurement point ("målepunkt") joined with its station classification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Building {
    pub station_code: StationCode,
    pub latitude: f64,
    pub longitude: f64,
    /// Today's load as a fraction of capacity, nominally 0..=1.
    pub load_fraction_today: f64,
    pub max_load_kw: f64,
    pub installed_capacity_kw: f64,
}

impl Building {
    pub fn has_capacity(&self) -> bool {
        self.installed_capacity_kw != 0.0
    }
}
