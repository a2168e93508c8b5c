pub mod reshape;
pub mod selection;
pub mod station_filter;

pub use reshape::{duration_curve, reshape_by_year, ReshapedSeries, YearTable};
pub use selection::{resolve_building, resolve_station, BoundingBox, Click, SelectionError};
pub use station_filter::{retain_measured_stations, retain_served_buildings};
