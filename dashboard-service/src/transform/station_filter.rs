use std::collections::HashSet;

use grid_model::{Building, GridStation, HourlyTable, StationCode};

/// Keep the stations whose display name is a load column of the hourly table.
pub fn retain_measured_stations(stations: Vec<GridStation>, hourly: &HourlyTable) -> Vec<GridStation> {
    stations
        .into_iter()
        .filter(|s| hourly.has_station(&s.name))
        .collect()
}

/// Keep the buildings served by one of `stations`.
///
/// Codes are already normalized [`StationCode`]s, so this is a plain set
/// lookup.
pub fn retain_served_buildings(buildings: Vec<Building>, stations: &[GridStation]) -> Vec<Building> {
    let codes: HashSet<&StationCode> = stations.iter().map(|s| &s.code).collect();
    buildings
        .into_iter()
        .filter(|b| codes.contains(&b.station_code))
        .collect()
}
