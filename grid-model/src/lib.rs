pub mod domain;
pub mod table;

pub use domain::{Building, CompositeKey, GridStation, HourlyTable, StationCode, StationSeries};
pub use table::{Cell, Table, TableError};
