//! Chart description handed to the browser's plotting library.
//!
//! Field names follow Plotly's trace/layout vocabulary so the page can pass
//! traces through unchanged.

use std::collections::BTreeSet;

use serde::{Serialize, Serializer};

use crate::transform::{duration_curve, ReshapedSeries};

const YEAR_COLORS: [&str; 4] = [
    "rgba(29,60,52,0.8)",
    "rgba(183,220,143,0.8)",
    "rgba(72,162,63,0.8)",
    "rgba(0,0,0,0.8)",
];
const TEMPERATURE_COLORS: [&str; 4] = [
    "rgba(29,60,52,1.0)",
    "rgba(183,220,143,1)",
    "rgba(72,162,63,1)",
    "rgba(0,0,0,1)",
];

const LOAD_AXIS_TITLE: &str = "Hourly mean power (kWh/h)";
const TEMPERATURE_AXIS_TITLE: &str = "Temperature (°C)";
const Y_RANGE_HEADROOM: f64 = 1.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartMode {
    TimeSeries,
    DurationCurve,
}

/// Plotly's `visible`: `true`, or `"legendonly"` to collapse into the legend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Shown,
    LegendOnly,
}

impl Serialize for Visibility {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Visibility::Shown => serializer.serialize_bool(true),
            Visibility::LegendOnly => serializer.serialize_str("legendonly"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum XValues {
    Keys(Vec<String>),
    Ranks(Vec<usize>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum XValue {
    Key(String),
    Rank(usize),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineStyle {
    pub color: String,
    pub width: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dash: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerStyle {
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Trace {
    Bar {
        name: String,
        x: XValues,
        y: Vec<f64>,
        visible: Visibility,
        marker: MarkerStyle,
    },
    Scatter {
        name: String,
        x: XValues,
        y: Vec<f64>,
        mode: &'static str,
        visible: Visibility,
        yaxis: &'static str,
        line: LineStyle,
    },
}

impl Trace {
    pub fn name(&self) -> &str {
        match self {
            Trace::Bar { name, .. } | Trace::Scatter { name, .. } => name,
        }
    }

    pub fn visible(&self) -> Visibility {
        match self {
            Trace::Bar { visible, .. } | Trace::Scatter { visible, .. } => *visible,
        }
    }

    pub fn y(&self) -> &[f64] {
        match self {
            Trace::Bar { y, .. } | Trace::Scatter { y, .. } => y,
        }
    }
}

/// Horizontal dashed line at the installed capacity, plus its legend label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CapacityLine {
    pub y: f64,
    pub x0: XValue,
    pub x1: XValue,
    pub label: String,
    pub line: LineStyle,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartModel {
    pub mode: ChartMode,
    pub traces: Vec<Trace>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity_line: Option<CapacityLine>,
    /// Upper bound of the load axis; `None` leaves it to autoscale.
    pub y_max: Option<f64>,
    pub y_title: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y2_title: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartOptions {
    pub selected_years: BTreeSet<i32>,
    pub temperature: bool,
    pub duration_curve: bool,
}

fn visibility(options: &ChartOptions, year: i32) -> Visibility {
    if options.selected_years.contains(&year) {
        Visibility::Shown
    } else {
        Visibility::LegendOnly
    }
}

pub fn y_axis_max(capacity_kw: u32) -> Option<f64> {
    (capacity_kw > 0).then(|| f64::from(capacity_kw) * Y_RANGE_HEADROOM)
}

fn capacity_line(capacity_kw: u32, x0: XValue, x1: XValue) -> CapacityLine {
    CapacityLine {
        y: f64::from(capacity_kw),
        x0,
        x1,
        label: format!("Capacity {capacity_kw} kW"),
        line: LineStyle {
            color: "black".to_string(),
            width: 2.0,
            dash: Some("dash"),
        },
    }
}

pub fn build_chart(series: &ReshapedSeries, capacity_kw: u32, options: &ChartOptions) -> ChartModel {
    let load = &series.load;
    let mut traces = Vec::new();

    let (mode, x_extent) = if options.duration_curve {
        let n = load.len();
        for (i, (year, values)) in load.columns().enumerate() {
            traces.push(Trace::Scatter {
                name: year.to_string(),
                x: XValues::Ranks((0..n).collect()),
                y: duration_curve(values),
                mode: "lines",
                visible: visibility(options, year),
                yaxis: "y",
                line: LineStyle {
                    color: YEAR_COLORS[i % YEAR_COLORS.len()].to_string(),
                    width: 1.5,
                    dash: None,
                },
            });
        }
        let extent = (n > 0).then(|| (XValue::Rank(0), XValue::Rank(n - 1)));
        (ChartMode::DurationCurve, extent)
    } else {
        let keys: Vec<String> = load.keys().iter().map(ToString::to_string).collect();
        for (i, (year, values)) in load.columns().enumerate() {
            let visible = visibility(options, year);
            traces.push(Trace::Bar {
                name: year.to_string(),
                x: XValues::Keys(keys.clone()),
                y: values.to_vec(),
                visible,
                marker: MarkerStyle {
                    color: YEAR_COLORS[i % YEAR_COLORS.len()].to_string(),
                },
            });
            if options.temperature {
                let temperature = series.temperature.column(year).unwrap_or_default();
                traces.push(Trace::Scatter {
                    name: format!("Outdoor temperature {year}"),
                    x: XValues::Keys(keys.clone()),
                    y: temperature.to_vec(),
                    mode: "lines",
                    visible,
                    yaxis: "y2",
                    line: LineStyle {
                        color: TEMPERATURE_COLORS[i % TEMPERATURE_COLORS.len()].to_string(),
                        width: 0.5,
                        dash: Some("dot"),
                    },
                });
            }
        }
        let extent = match (keys.first(), keys.last()) {
            (Some(first), Some(last)) => Some((XValue::Key(first.clone()), XValue::Key(last.clone()))),
            _ => None,
        };
        (ChartMode::TimeSeries, extent)
    };

    let capacity_line = match x_extent {
        Some((x0, x1)) if capacity_kw > 0 => Some(capacity_line(capacity_kw, x0, x1)),
        _ => None,
    };

    ChartModel {
        mode,
        traces,
        capacity_line,
        y_max: y_axis_max(capacity_kw),
        y_title: LOAD_AXIS_TITLE,
        y2_title: (mode == ChartMode::TimeSeries && options.temperature).then_some(TEMPERATURE_AXIS_TITLE),
    }
}
