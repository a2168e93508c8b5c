use std::{collections::BTreeMap, fmt};

use serde::Serialize;
use time::PrimitiveDateTime;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum HourlyShapeError {
    #[error("temperature column has {actual} rows, expected {expected}")]
    Temperature { expected: usize, actual: usize },
    #[error("load column '{station}' has {actual} rows, expected {expected}")]
    Load {
        station: String,
        expected: usize,
        actual: usize,
    },
}

/// Wide hourly measurement table: one timestamp column, one outdoor
/// temperature column and one load column per grid station.
///
/// Immutable once built; requests only ever slice it.
#[derive(Debug, Clone, Default)]
pub struct HourlyTable {
    timestamps: Vec<PrimitiveDateTime>,
    temperature: Vec<Option<f64>>,
    loads: BTreeMap<String, Vec<Option<f64>>>,
}

impl HourlyTable {
    pub fn new(
        timestamps: Vec<PrimitiveDateTime>,
        temperature: Vec<Option<f64>>,
        loads: BTreeMap<String, Vec<Option<f64>>>,
    ) -> Result<Self, HourlyShapeError> {
        let expected = timestamps.len();
        if temperature.len() != expected {
            return Err(HourlyShapeError::Temperature {
                expected,
                actual: temperature.len(),
            });
        }
        for (station, values) in &loads {
            if values.len() != expected {
                return Err(HourlyShapeError::Load {
                    station: station.clone(),
                    expected,
                    actual: values.len(),
                });
            }
        }

        Ok(Self {
            timestamps,
            temperature,
            loads,
        })
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn has_station(&self, name: &str) -> bool {
        self.loads.contains_key(name)
    }

    pub fn station_count(&self) -> usize {
        self.loads.len()
    }

    /// Timestamp, temperature and the named station's load column.
    pub fn station_series(&self, name: &str) -> Option<StationSeries<'_>> {
        let (name, load) = self.loads.get_key_value(name)?;
        Some(StationSeries {
            name,
            timestamps: &self.timestamps,
            temperature: &self.temperature,
            load,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HourlySample {
    pub ts: PrimitiveDateTime,
    pub temperature: Option<f64>,
    pub load: Option<f64>,
}

/// Three-column view into an [`HourlyTable`].
#[derive(Debug, Clone, Copy)]
pub struct StationSeries<'a> {
    pub name: &'a str,
    pub timestamps: &'a [PrimitiveDateTime],
    pub temperature: &'a [Option<f64>],
    pub load: &'a [Option<f64>],
}

impl<'a> StationSeries<'a> {
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn samples(&self) -> impl Iterator<Item = HourlySample> + 'a {
        let timestamps = self.timestamps;
        let temperature = self.temperature;
        let load = self.load;
        timestamps
            .iter()
            .enumerate()
            .map(move |(i, ts)| HourlySample {
                ts: *ts,
                temperature: temperature[i],
                load: load[i],
            })
    }
}

/// Calendar position of an hourly sample with the year dropped, rendered as
/// `MM.DD.HH`. Orders chronologically within a year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CompositeKey {
    pub month: u8,
    pub day: u8,
    pub hour: u8,
}

impl CompositeKey {
    pub fn from_datetime(ts: &PrimitiveDateTime) -> Self {
        Self {
            month: u8::from(ts.month()),
            day: ts.day(),
            hour: ts.hour(),
        }
    }
}

impl fmt::Display for CompositeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}.{:02}.{:02}", self.month, self.day, self.hour)
    }
}

impl Serialize for CompositeKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
