use std::collections::BTreeMap;

use grid_model::{Building, Cell, GridStation, HourlyTable, StationCode, Table};

use crate::{
    config::SheetLayout,
    sources::{LoadError, Source},
    transform::{retain_measured_stations, retain_served_buildings},
};

/// Everything read from the workbook, after the station filter has run.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub hourly: HourlyTable,
    pub stations: Vec<GridStation>,
    pub buildings: Vec<Building>,
    pub fingerprint: String,
}

// Data rows start below the header, and spreadsheets count from 1.
fn sheet_row(index: usize) -> usize {
    index + 2
}

fn invalid(table: &Table, index: usize, column: &str, reason: impl Into<String>) -> LoadError {
    LoadError::InvalidCell {
        sheet: table.name().to_string(),
        row: sheet_row(index),
        column: column.to_string(),
        reason: reason.into(),
    }
}

fn required_f64(table: &Table, index: usize, col: usize) -> Result<f64, LoadError> {
    let column = &table.headers()[col];
    let cell = &table.rows()[index][col];
    cell.as_f64()
        .filter(|v| v.is_finite())
        .ok_or_else(|| invalid(table, index, column, format!("expected a number, found '{cell}'")))
}

/// Blank cells read as zero; anything else must be numeric.
fn f64_or_zero(table: &Table, index: usize, col: usize) -> Result<f64, LoadError> {
    if table.rows()[index][col].is_empty() {
        Ok(0.0)
    } else {
        required_f64(table, index, col)
    }
}

fn station_code(table: &Table, index: usize, col: usize) -> Result<StationCode, LoadError> {
    let column = &table.headers()[col];
    let cell = &table.rows()[index][col];
    cell.station_code()
        .ok_or_else(|| invalid(table, index, column, format!("expected a station code, found '{cell}'")))
}

fn load_value(cell: &Cell) -> Option<f64> {
    cell.as_f64().filter(|v| v.is_finite())
}

pub(crate) fn hourly_from_table(table: &Table, layout: &SheetLayout) -> Result<HourlyTable, LoadError> {
    let ts_col = table.require_column(&layout.timestamp_column)?;
    let temp_col = table.require_column(&layout.temperature_column)?;

    let station_cols: Vec<(usize, &String)> = table
        .headers()
        .iter()
        .enumerate()
        .filter(|(i, h)| *i != ts_col && *i != temp_col && !h.is_empty())
        .collect();

    let mut timestamps = Vec::with_capacity(table.len());
    let mut temperature = Vec::with_capacity(table.len());
    let mut loads: BTreeMap<String, Vec<Option<f64>>> = station_cols
        .iter()
        .map(|(_, name)| ((*name).clone(), Vec::with_capacity(table.len())))
        .collect();
    let mut missing = 0usize;

    for (index, row) in table.rows().iter().enumerate() {
        // Trailing blank rows are common at the end of exported sheets.
        if row.iter().all(Cell::is_empty) {
            continue;
        }

        let ts = row[ts_col].as_datetime().ok_or_else(|| {
            invalid(
                table,
                index,
                &layout.timestamp_column,
                format!("expected a timestamp, found '{}'", row[ts_col]),
            )
        })?;
        timestamps.push(ts);
        temperature.push(load_value(&row[temp_col]));

        for (col, name) in &station_cols {
            let value = load_value(&row[*col]);
            if value.is_none() {
                missing += 1;
            }
            if let Some(values) = loads.get_mut(*name) {
                values.push(value);
            }
        }
    }

    if missing > 0 {
        tracing::debug!(sheet = table.name(), missing, "hourly load cells without a numeric value");
    }

    // Column lengths are equal by construction.
    HourlyTable::new(timestamps, temperature, loads).map_err(|e| LoadError::InvalidCell {
        sheet: table.name().to_string(),
        row: 0,
        column: String::new(),
        reason: e.to_string(),
    })
}

fn station_row(table: &Table, index: usize, cols: [usize; 3]) -> Result<GridStation, LoadError> {
    let [code_col, name_col, cap_col] = cols;
    let code = station_code(table, index, code_col)?;
    let name = table.rows()[index][name_col].to_string().trim().to_string();
    let capacity = f64_or_zero(table, index, cap_col)?;
    if capacity < 0.0 {
        return Err(invalid(table, index, &table.headers()[cap_col], "capacity must not be negative"));
    }

    Ok(GridStation {
        code,
        name,
        capacity_kw: capacity as u32,
    })
}

fn building_row(table: &Table, index: usize, cols: [usize; 6]) -> Result<Building, LoadError> {
    let [code_col, lat_col, lon_col, fraction_col, max_col, cap_col] = cols;
    Ok(Building {
        station_code: station_code(table, index, code_col)?,
        latitude: required_f64(table, index, lat_col)?,
        longitude: required_f64(table, index, lon_col)?,
        load_fraction_today: f64_or_zero(table, index, fraction_col)?,
        max_load_kw: f64_or_zero(table, index, max_col)?,
        installed_capacity_kw: f64_or_zero(table, index, cap_col)?,
    })
}

/// Registry rows that cannot be read are left out, the same way rows without
/// a partner are left out by the joins and filters that follow.
fn collect_rows<T>(
    table: &Table,
    mut read: impl FnMut(usize) -> Result<T, LoadError>,
) -> Vec<T> {
    let mut out = Vec::with_capacity(table.len());
    let mut skipped = 0usize;
    for (index, row) in table.rows().iter().enumerate() {
        if row.iter().all(Cell::is_empty) {
            continue;
        }
        match read(index) {
            Ok(item) => out.push(item),
            Err(e) => {
                skipped += 1;
                tracing::debug!(error = %e, "skipping unreadable registry row");
            }
        }
    }
    if skipped > 0 {
        tracing::debug!(sheet = table.name(), skipped, "registry rows skipped");
    }
    out
}

pub(crate) fn stations_from_table(table: &Table, layout: &SheetLayout) -> Result<Vec<GridStation>, LoadError> {
    let cols = [
        table.require_column(&layout.station_code_column)?,
        table.require_column(&layout.station_name_column)?,
        table.require_column(&layout.capacity_column)?,
    ];
    Ok(collect_rows(table, |index| station_row(table, index, cols)))
}

pub(crate) fn buildings_from_table(table: &Table, layout: &SheetLayout) -> Result<Vec<Building>, LoadError> {
    let cols = [
        table.require_column(&layout.station_code_column)?,
        table.require_column(&layout.latitude_column)?,
        table.require_column(&layout.longitude_column)?,
        table.require_column(&layout.load_fraction_column)?,
        table.require_column(&layout.max_load_column)?,
        table.require_column(&layout.capacity_column)?,
    ];
    Ok(collect_rows(table, |index| building_row(table, index, cols)))
}

/// Read the four sheets, join buildings with the classification sheet on the
/// station code, and drop stations and buildings that have no hourly data.
pub fn load_dataset<S: Source + ?Sized>(source: &mut S, layout: &SheetLayout) -> Result<Dataset, LoadError> {
    tracing::info!(source = %source.describe(), "loading dataset");

    let fingerprint = source.fingerprint()?;
    let hourly_table = source.read_table(&layout.hourly_sheet)?;
    let station_table = source.read_table(&layout.station_sheet)?;
    let building_table = source.read_table(&layout.building_sheet)?;
    let classification_table = source.read_table(&layout.classification_sheet)?;

    let joined = building_table.inner_join_on_station(&classification_table, &layout.station_code_column)?;

    let hourly = hourly_from_table(&hourly_table, layout)?;
    let all_stations = stations_from_table(&station_table, layout)?;
    let all_buildings = buildings_from_table(&joined, layout)?;

    let station_total = all_stations.len();
    let building_total = all_buildings.len();
    let stations = retain_measured_stations(all_stations, &hourly);
    let buildings = retain_served_buildings(all_buildings, &stations);

    tracing::info!(
        hourly_rows = hourly.len(),
        hourly_stations = hourly.station_count(),
        stations = stations.len(),
        stations_dropped = station_total - stations.len(),
        buildings = buildings.len(),
        buildings_unjoined = building_table.len().saturating_sub(building_total),
        buildings_dropped = building_total - buildings.len(),
        fingerprint = %fingerprint,
        "dataset loaded"
    );

    Ok(Dataset {
        hourly,
        stations,
        buildings,
        fingerprint,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::sources::CsvDirectorySource;
    use std::{fs, path::Path};

    /// Three years of hourly data for station "Alpha" (code 101, 100 kW) and
    /// one day of data for "Beta" (code 102, no capacity). Station 103 has no
    /// hourly column; building at code 104 has no classification row.
    pub(crate) fn write_fixture(dir: &Path) {
        let mut hourly = String::from("Dato,TEMPERATUR,Alpha,Beta\n");
        for year in [2021, 2022, 2023] {
            for hour in 0..3 {
                let load = (year - 2020) * 10 + hour;
                hourly.push_str(&format!("{year}-01-01 {hour:02}:00:00,-{hour},{load},1\n"));
            }
        }
        hourly.push_str("2022-07-01 12:00:00,18.5,95,\n");
        fs::write(dir.join("Timedata.csv"), hourly).unwrap();

        fs::write(
            dir.join("Nettstasjon.csv"),
            "Driftsmerking,Nettstasjonsnavn,Installert trafoytelse\n\
             101,Alpha,100\n\
             102.0,Beta,0\n\
             103,Gamma,500\n",
        )
        .unwrap();

        fs::write(
            dir.join("Målepunkt.csv"),
            "Driftsmerking,Geografisk nord (grader),Geografisk øst (grader)\n\
             101,63.4700,10.9100\n\
             102,63.4800,10.9200\n\
             103,63.4900,10.9300\n\
             104,63.5000,10.9400\n",
        )
        .unwrap();

        fs::write(
            dir.join("NS.csv"),
            "Driftsmerking,%-belastning per i dag,Maks belastning [kWh/h],Installert trafoytelse\n\
             101,0.95,95,100\n\
             102,,3,0\n\
             103,0.1,50,500\n",
        )
        .unwrap();
    }

    pub(crate) fn fixture_dataset() -> Dataset {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path());
        let mut source = CsvDirectorySource::new(dir.path());
        load_dataset(&mut source, &SheetLayout::default()).unwrap()
    }

    #[test]
    fn loads_joins_and_filters_the_fixture() {
        let ds = fixture_dataset();

        assert_eq!(ds.hourly.len(), 10);
        assert!(ds.hourly.has_station("Alpha"));
        assert!(!ds.hourly.has_station("TEMPERATUR"));

        let names: Vec<_> = ds.stations.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "Beta"]);
        assert_eq!(ds.stations[1].code.as_str(), "102");

        let codes: Vec<_> = ds.buildings.iter().map(|b| b.station_code.as_str()).collect();
        assert_eq!(codes, vec!["101", "102"]);
        assert_eq!(ds.buildings[0].installed_capacity_kw, 100.0);
        assert_eq!(ds.buildings[1].load_fraction_today, 0.0);
        assert!(!ds.fingerprint.is_empty());
    }

    #[test]
    fn blank_load_cells_stay_missing() {
        let ds = fixture_dataset();
        let beta = ds.hourly.station_series("Beta").unwrap();
        assert_eq!(beta.load.last(), Some(&None));
    }

    #[test]
    fn missing_sheet_fails_the_load() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path());
        fs::remove_file(dir.path().join("NS.csv")).unwrap();

        let mut source = CsvDirectorySource::new(dir.path());
        let err = load_dataset(&mut source, &SheetLayout::default()).unwrap_err();
        assert!(matches!(err, LoadError::MissingSheet(ref s) if s == "NS"));
    }

    #[test]
    fn missing_column_fails_the_load() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path());
        let layout = SheetLayout {
            temperature_column: "Utetemperatur".to_string(),
            ..SheetLayout::default()
        };

        let mut source = CsvDirectorySource::new(dir.path());
        let err = load_dataset(&mut source, &layout).unwrap_err();
        assert!(matches!(err, LoadError::MissingColumn { ref column, .. } if column == "Utetemperatur"));
    }

    #[test]
    fn unreadable_registry_rows_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path());
        fs::write(
            dir.path().join("Nettstasjon.csv"),
            "Driftsmerking,Nettstasjonsnavn,Installert trafoytelse\n\
             101,Alpha,100\n\
             102.0,Beta,0\n\
             ,Delta,50\n\
             105.5,Epsilon,50\n\
             106,Zeta,lots\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("Målepunkt.csv"),
            "Driftsmerking,Geografisk nord (grader),Geografisk øst (grader)\n\
             101,63.4700,10.9100\n\
             102,63.4800,10.9200\n\
             103,unknown,10.9300\n",
        )
        .unwrap();

        let mut source = CsvDirectorySource::new(dir.path());
        let ds = load_dataset(&mut source, &SheetLayout::default()).unwrap();

        let names: Vec<_> = ds.stations.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "Beta"]);
        assert_eq!(ds.buildings.len(), 2);
    }

    #[test]
    fn registry_row_errors_name_the_cell() {
        let mut table = Table::new(
            "Nettstasjon",
            vec!["Driftsmerking".into(), "Nettstasjonsnavn".into(), "Installert trafoytelse".into()],
        );
        table.push_row(vec![Cell::Empty, Cell::Text("Delta".into()), Cell::Number(50.0)]);
        table.push_row(vec![Cell::Number(7.0), Cell::Text("Seven".into()), Cell::Number(-1.0)]);

        assert!(stations_from_table(&table, &SheetLayout::default()).unwrap().is_empty());
        assert!(matches!(
            station_row(&table, 0, [0, 1, 2]),
            Err(LoadError::InvalidCell { row: 2, ref column, .. }) if column == "Driftsmerking"
        ));
        assert!(matches!(
            station_row(&table, 1, [0, 1, 2]),
            Err(LoadError::InvalidCell { row: 3, ref column, .. }) if column == "Installert trafoytelse"
        ));
    }

    #[test]
    fn unparsable_timestamp_reports_the_spreadsheet_row() {
        let mut table = Table::new("Timedata", vec!["Dato".into(), "TEMPERATUR".into(), "A".into()]);
        table.push_row(vec![Cell::Text("2022-01-01 00:00".into()), Cell::Number(1.0), Cell::Number(2.0)]);
        table.push_row(vec![Cell::Text("soon".into()), Cell::Number(1.0), Cell::Number(2.0)]);

        let err = hourly_from_table(&table, &SheetLayout::default()).unwrap_err();
        assert!(matches!(err, LoadError::InvalidCell { row: 3, .. }));
    }
}
