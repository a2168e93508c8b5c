pub mod building;
pub mod hourly;
pub mod station;

pub use building::Building;
pub use hourly::{CompositeKey, HourlySample, HourlyShapeError, HourlyTable, StationSeries};
pub use station::{GridStation, StationCode};
