pub mod chart;
pub mod map;
pub mod metrics;

pub use chart::{build_chart, ChartMode, ChartModel, ChartOptions, Trace, Visibility};
pub use map::{map_model, MapModel, Marker};
pub use metrics::{metrics_panel, MetricCard, MetricsPanel, YearMetrics};
