use grid_model::{Building, StationCode};
use serde::Serialize;

const LOW_LOAD_RGB: (f64, f64, f64) = (0.0, 128.0, 0.0); // green
const HIGH_LOAD_RGB: (f64, f64, f64) = (255.0, 255.0, 0.0); // yellow
pub const NO_CAPACITY_COLOR: &str = "#808080";

const ZOOM_START: u8 = 15;
const MAX_ZOOM: u8 = 22;
const MARKER_RADIUS: u8 = 10;
const MARKER_FILL_OPACITY: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub position: LatLng,
    pub station_code: StationCode,
    pub fill_color: String,
    pub fill_opacity: f64,
    pub radius: u8,
    pub tooltip: String,
}

/// Input for the browser map: one marker per building.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapModel {
    /// Mean building position; `None` when there are no buildings.
    pub center: Option<LatLng>,
    pub zoom_start: u8,
    pub max_zoom: u8,
    pub markers: Vec<Marker>,
}

/// Linear green-to-yellow ramp over `0..=1`, clamped.
pub fn load_color(fraction: f64) -> String {
    let t = if fraction.is_nan() { 0.0 } else { fraction.clamp(0.0, 1.0) };
    let lerp = |a: f64, b: f64| (a + (b - a) * t).round() as u8;
    format!(
        "#{:02x}{:02x}{:02x}",
        lerp(LOW_LOAD_RGB.0, HIGH_LOAD_RGB.0),
        lerp(LOW_LOAD_RGB.1, HIGH_LOAD_RGB.1),
        lerp(LOW_LOAD_RGB.2, HIGH_LOAD_RGB.2),
    )
}

pub fn marker_color(b: &Building) -> String {
    if b.has_capacity() {
        load_color(b.load_fraction_today)
    } else {
        NO_CAPACITY_COLOR.to_string()
    }
}

fn format_kw(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}

fn tooltip(b: &Building) -> String {
    format!(
        "Max load: {} kW<br>Installed capacity {} kW",
        b.max_load_kw as i64,
        format_kw(b.installed_capacity_kw)
    )
}

fn mean_position(buildings: &[Building]) -> Option<LatLng> {
    if buildings.is_empty() {
        return None;
    }
    let n = buildings.len() as f64;
    Some(LatLng {
        lat: buildings.iter().map(|b| b.latitude).sum::<f64>() / n,
        lng: buildings.iter().map(|b| b.longitude).sum::<f64>() / n,
    })
}

pub fn map_model(buildings: &[Building]) -> MapModel {
    MapModel {
        center: mean_position(buildings),
        zoom_start: ZOOM_START,
        max_zoom: MAX_ZOOM,
        markers: buildings
            .iter()
            .map(|b| Marker {
                position: LatLng {
                    lat: b.latitude,
                    lng: b.longitude,
                },
                station_code: b.station_code.clone(),
                fill_color: marker_color(b),
                fill_opacity: MARKER_FILL_OPACITY,
                radius: MARKER_RADIUS,
                tooltip: tooltip(b),
            })
            .collect(),
    }
}
