use grid_model::{Building, GridStation, StationCode};
use serde::{Deserialize, Serialize};

/// Coordinate of the last marker the user clicked.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Click {
    pub lat: f64,
    pub lng: f64,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SelectionError {
    #[error("no measurement point within {half_width}° of ({lat}, {lng})")]
    EmptySelection { lat: f64, lng: f64, half_width: f64 },
    #[error("grid station {0} is not in the station registry")]
    UnknownStation(StationCode),
    #[error("grid station '{0}' has no hourly series")]
    MissingSeries(String),
}

/// Inclusive lat/lon box around a click.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    pub fn around(click: Click, half_width: f64) -> Self {
        Self {
            min_lat: click.lat - half_width,
            max_lat: click.lat + half_width,
            min_lon: click.lng - half_width,
            max_lon: click.lng + half_width,
        }
    }

    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat >= self.min_lat && lat <= self.max_lat && lon >= self.min_lon && lon <= self.max_lon
    }
}

/// First building (in registry order) inside the box around `click`.
///
/// Overlapping markers resolve to whichever comes first in the building
/// registry.
pub fn resolve_building(buildings: &[Building], click: Click, half_width: f64) -> Result<&Building, SelectionError> {
    let bbox = BoundingBox::around(click, half_width);
    buildings
        .iter()
        .find(|b| bbox.contains(b.latitude, b.longitude))
        .ok_or(SelectionError::EmptySelection {
            lat: click.lat,
            lng: click.lng,
            half_width,
        })
}

pub fn resolve_station<'a>(stations: &'a [GridStation], code: &StationCode) -> Result<&'a GridStation, SelectionError> {
    stations
        .iter()
        .find(|s| &s.code == code)
        .ok_or_else(|| SelectionError::UnknownStation(code.clone()))
}
