//! Per-interaction view pipeline.
//!
//! Every user interaction is answered by one call to [`render_view`] against
//! the immutable [`DataContext`] built at startup; nothing carries over from
//! one request to the next.

use std::collections::BTreeSet;

use grid_model::StationCode;
use serde::Serialize;

use crate::{
    config::{SelectionConfig, ViewConfig},
    render::{build_chart, map_model, metrics_panel, ChartModel, ChartOptions, MapModel, MetricsPanel},
    sources::Dataset,
    transform::{reshape_by_year, resolve_building, resolve_station, Click, SelectionError},
};

/// Read-only state shared by all requests.
pub struct DataContext {
    dataset: Dataset,
    map: MapModel,
    selection_half_width: f64,
    /// Years offered by the controls; the only years a view ever shows.
    year_options: BTreeSet<i32>,
}

impl DataContext {
    pub fn new(dataset: Dataset, selection: &SelectionConfig, view: &ViewConfig) -> Self {
        let map = map_model(&dataset.buildings);
        Self {
            dataset,
            map,
            selection_half_width: selection.bbox_deg,
            year_options: view.year_options.iter().copied().collect(),
        }
    }

    pub fn year_options(&self) -> &BTreeSet<i32> {
        &self.year_options
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn map(&self) -> &MapModel {
        &self.map
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewOptions {
    pub years: BTreeSet<i32>,
    pub temperature: bool,
    pub duration_curve: bool,
}

impl ViewOptions {
    pub fn from_config(cfg: &ViewConfig) -> Self {
        Self {
            years: cfg.default_years.iter().copied().collect(),
            temperature: cfg.temperature,
            duration_curve: cfg.duration_curve,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewRequest {
    /// Last clicked marker, if any.
    pub click: Option<Click>,
    pub options: ViewOptions,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ViewError {
    #[error("no measurement point has been clicked yet")]
    NoClick,
    #[error(transparent)]
    Selection(#[from] SelectionError),
}

impl ViewError {
    /// Message shown to the user in place of the chart.
    pub fn prompt(&self) -> String {
        match self {
            ViewError::NoClick => "Click a measurement point on the map to show its data.".to_string(),
            ViewError::Selection(SelectionError::EmptySelection { .. }) => {
                "No measurement point at that spot. Click directly on a marker.".to_string()
            }
            ViewError::Selection(e) => format!("The selected measurement point cannot be shown: {e}."),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationSummary {
    pub code: StationCode,
    pub name: String,
    pub capacity_kw: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewModel {
    pub station: StationSummary,
    pub years: Vec<i32>,
    pub chart: ChartModel,
    pub metrics: MetricsPanel,
}

/// Outcome of one interaction as delivered to the page.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ViewResponse {
    Ready { view: Box<ViewModel> },
    Prompt { message: String },
}

impl From<Result<ViewModel, ViewError>> for ViewResponse {
    fn from(result: Result<ViewModel, ViewError>) -> Self {
        match result {
            Ok(view) => ViewResponse::Ready { view: Box::new(view) },
            Err(e) => {
                if matches!(e, ViewError::Selection(SelectionError::EmptySelection { .. })) {
                    metrics::counter!("dashboard_empty_selections_total").increment(1);
                }
                tracing::debug!(error = %e, "view request answered with a prompt");
                ViewResponse::Prompt { message: e.prompt() }
            }
        }
    }
}

pub fn render_view(ctx: &DataContext, request: &ViewRequest) -> Result<ViewModel, ViewError> {
    let click = request.click.ok_or(ViewError::NoClick)?;
    let ds = &ctx.dataset;

    let building = resolve_building(&ds.buildings, click, ctx.selection_half_width)?;
    let station = resolve_station(&ds.stations, &building.station_code)?;
    let series = ds
        .hourly
        .station_series(&station.name)
        .ok_or_else(|| SelectionError::MissingSeries(station.name.clone()))?;

    let reshaped = reshape_by_year(&series, &ctx.year_options);
    let options = ChartOptions {
        selected_years: request.options.years.clone(),
        temperature: request.options.temperature,
        duration_curve: request.options.duration_curve,
    };
    let chart = build_chart(&reshaped, station.capacity_kw, &options);
    let metrics = metrics_panel(&reshaped.load, station.capacity_kw);

    tracing::info!(
        station = %station.code,
        name = %station.name,
        rows = reshaped.load.len(),
        duration_curve = options.duration_curve,
        "view rendered"
    );

    Ok(ViewModel {
        station: StationSummary {
            code: station.code.clone(),
            name: station.name.clone(),
            capacity_kw: station.capacity_kw,
        },
        years: reshaped.load.years().to_vec(),
        chart,
        metrics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::SheetLayout,
        render::Trace,
        sources::{
            dataset::tests::{fixture_dataset, write_fixture},
            load_dataset, CsvDirectorySource,
        },
    };
    use std::fs;

    fn context() -> DataContext {
        DataContext::new(fixture_dataset(), &SelectionConfig::default(), &ViewConfig::default())
    }

    fn request(click: Option<Click>, years: &[i32], duration_curve: bool) -> ViewRequest {
        ViewRequest {
            click,
            options: ViewOptions {
                years: years.iter().copied().collect(),
                temperature: true,
                duration_curve,
            },
        }
    }

    const ALPHA: Click = Click {
        lat: 63.4700,
        lng: 10.9100,
    };

    #[test]
    fn no_click_is_a_prompt() {
        let ctx = context();
        let err = render_view(&ctx, &request(None, &[2022], false)).unwrap_err();
        assert_eq!(err, ViewError::NoClick);

        let response = ViewResponse::from(Err(err));
        assert!(matches!(response, ViewResponse::Prompt { .. }));
    }

    #[test]
    fn click_between_markers_is_a_prompt_not_a_crash() {
        let ctx = context();
        let click = Click { lat: 63.4750, lng: 10.9150 };

        let result = render_view(&ctx, &request(Some(click), &[2022], false));
        assert!(matches!(result, Err(ViewError::Selection(SelectionError::EmptySelection { .. }))));

        let json = serde_json::to_value(ViewResponse::from(result)).unwrap();
        assert_eq!(json["status"], "prompt");
    }

    #[test]
    fn click_on_alpha_renders_three_aligned_years() {
        let ctx = context();
        let view = render_view(&ctx, &request(Some(ALPHA), &[2022], false)).unwrap();

        assert_eq!(view.station.name, "Alpha");
        assert_eq!(view.station.capacity_kw, 100);
        assert_eq!(view.years, vec![2021, 2022, 2023]);

        // 01.01.00..02 from every year plus 07.01.12 from 2022 only.
        let bars: Vec<&Trace> = view.chart.traces.iter().filter(|t| matches!(t, Trace::Bar { .. })).collect();
        assert_eq!(bars.len(), 3);
        assert_eq!(bars[0].y(), &[10.0, 11.0, 12.0, 0.0]);
        assert_eq!(bars[1].y(), &[20.0, 21.0, 22.0, 95.0]);
        assert_eq!(bars[2].y(), &[30.0, 31.0, 32.0, 0.0]);

        assert_eq!(view.metrics.capacity.value, "100 kW");
        assert_eq!(view.metrics.years.len(), 3);
        assert_eq!(view.metrics.details[1].max_load_kw, 95);
        assert_eq!(view.metrics.details[1].percent_of_capacity, Some(95));

        let y_max = view.chart.y_max.unwrap();
        assert!(view.metrics.details.iter().all(|m| m.max_load_kw as f64 <= y_max));
    }

    #[test]
    fn duration_curve_keeps_each_years_total() {
        let ctx = context();
        let plain = render_view(&ctx, &request(Some(ALPHA), &[2021, 2022, 2023], false)).unwrap();
        let curve = render_view(&ctx, &request(Some(ALPHA), &[2021, 2022, 2023], true)).unwrap();

        let bar_sums: Vec<f64> = plain
            .chart
            .traces
            .iter()
            .filter(|t| matches!(t, Trace::Bar { .. }))
            .map(|t| t.y().iter().sum())
            .collect();
        let curve_sums: Vec<f64> = curve.chart.traces.iter().map(|t| t.y().iter().sum()).collect();

        assert_eq!(bar_sums, curve_sums);
        assert_eq!(curve.chart.traces[1].y(), &[95.0, 22.0, 21.0, 20.0]);
    }

    #[test]
    fn zero_capacity_station_renders_without_percentages() {
        let ctx = context();
        let beta = Click { lat: 63.4800, lng: 10.9200 };
        let view = render_view(&ctx, &request(Some(beta), &[2022], false)).unwrap();

        assert_eq!(view.station.name, "Beta");
        assert!(view.chart.y_max.is_none());
        assert!(view.metrics.details.iter().all(|m| m.percent_of_capacity.is_none()));
        assert_eq!(view.metrics.years[0].value, "1 kW (- %)");
    }

    #[test]
    fn stray_year_outside_the_options_does_not_displace_a_card() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path());
        let hourly = dir.path().join("Timedata.csv");
        let mut content = fs::read_to_string(&hourly).unwrap();
        content.push_str("2020-12-31 23:00:00,-5,7,1\n");
        fs::write(&hourly, content).unwrap();

        let mut source = CsvDirectorySource::new(dir.path());
        let dataset = load_dataset(&mut source, &SheetLayout::default()).unwrap();
        let ctx = DataContext::new(dataset, &SelectionConfig::default(), &ViewConfig::default());

        let view = render_view(&ctx, &request(Some(ALPHA), &[2022], false)).unwrap();

        assert_eq!(view.years, vec![2021, 2022, 2023]);
        let labels: Vec<_> = view.metrics.years.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["2021", "2022", "2023"]);
        assert_eq!(view.chart.traces.iter().filter(|t| matches!(t, Trace::Bar { .. })).count(), 3);
        assert_eq!(view.chart.traces[0].y().len(), 4);
    }

    #[test]
    fn map_is_built_once_from_filtered_buildings() {
        let ctx = context();
        assert_eq!(ctx.map().markers.len(), 2);
        assert_eq!(ctx.map().markers[1].fill_color, crate::render::map::NO_CAPACITY_COLOR);
    }
}
