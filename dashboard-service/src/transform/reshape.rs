//! Year-over-year pivot of one station's hourly series.
//!
//! Rows from different years are aligned on their [`CompositeKey`]
//! (`MM.DD.HH`) so that, say, 1 March 08:00 of every year sits on the same
//! row. Only the requested years become columns; samples from other years
//! (a stray New Year's Eve hour in a shifted export, say) are ignored. The key
//! set is the union over the kept years; a year with no sample for a key reads
//! as zero there, as does a sample with no value.

use std::collections::{BTreeMap, BTreeSet};

use grid_model::{CompositeKey, StationSeries};
use time::PrimitiveDateTime;

/// Values keyed by [`CompositeKey`], one column per calendar year.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct YearTable {
    years: Vec<i32>,
    keys: Vec<CompositeKey>,
    columns: Vec<Vec<f64>>,
}

impl YearTable {
    pub fn years(&self) -> &[i32] {
        &self.years
    }

    pub fn keys(&self) -> &[CompositeKey] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn column(&self, year: i32) -> Option<&[f64]> {
        let idx = self.years.iter().position(|y| *y == year)?;
        Some(&self.columns[idx])
    }

    pub fn columns(&self) -> impl Iterator<Item = (i32, &[f64])> {
        self.years.iter().copied().zip(self.columns.iter().map(Vec::as_slice))
    }
}

/// Load and temperature pivots of the same station, sharing one key set.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReshapedSeries {
    pub load: YearTable,
    pub temperature: YearTable,
    /// Samples dropped because an earlier sample of the same year already
    /// held their key (e.g. the repeated hour at the end of daylight saving).
    pub duplicate_keys: usize,
}

fn pivot<I>(samples: I) -> (YearTable, usize)
where
    I: IntoIterator<Item = (PrimitiveDateTime, Option<f64>)>,
{
    let mut by_year: BTreeMap<i32, BTreeMap<CompositeKey, Option<f64>>> = BTreeMap::new();
    let mut all_keys: BTreeSet<CompositeKey> = BTreeSet::new();
    let mut duplicates = 0;

    for (ts, value) in samples {
        let key = CompositeKey::from_datetime(&ts);
        all_keys.insert(key);
        let year = by_year.entry(ts.year()).or_default();
        if year.contains_key(&key) {
            duplicates += 1;
        } else {
            year.insert(key, value);
        }
    }

    let keys: Vec<CompositeKey> = all_keys.into_iter().collect();
    let mut years = Vec::with_capacity(by_year.len());
    let mut columns = Vec::with_capacity(by_year.len());
    for (year, values) in by_year {
        years.push(year);
        columns.push(
            keys.iter()
                .map(|k| values.get(k).copied().flatten().unwrap_or(0.0))
                .collect(),
        );
    }

    (YearTable { years, keys, columns }, duplicates)
}

pub fn reshape_by_year(series: &StationSeries<'_>, years: &BTreeSet<i32>) -> ReshapedSeries {
    let in_range = |ts: &PrimitiveDateTime| years.contains(&ts.year());
    let (load, duplicate_keys) = pivot(
        series
            .samples()
            .filter(|s| in_range(&s.ts))
            .map(|s| (s.ts, s.load)),
    );
    let (temperature, _) = pivot(
        series
            .samples()
            .filter(|s| in_range(&s.ts))
            .map(|s| (s.ts, s.temperature)),
    );

    if duplicate_keys > 0 {
        tracing::debug!(station = series.name, duplicate_keys, "dropped hourly samples with repeated MM.DD.HH");
    }

    ReshapedSeries {
        load,
        temperature,
        duplicate_keys,
    }
}

/// Values sorted from highest to lowest, to be plotted against rank.
pub fn duration_curve(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| b.total_cmp(a));
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use grid_model::HourlyTable;
    use time::macros::datetime;

    fn key(month: u8, day: u8, hour: u8) -> CompositeKey {
        CompositeKey { month, day, hour }
    }

    fn all_years() -> BTreeSet<i32> {
        BTreeSet::from([2021, 2022, 2023])
    }

    fn value(table: &YearTable, year: i32, key: &CompositeKey) -> Option<f64> {
        let row = table.keys().binary_search(key).ok()?;
        table.column(year).map(|c| c[row])
    }

    fn table(rows: Vec<(PrimitiveDateTime, Option<f64>, Option<f64>)>) -> HourlyTable {
        let timestamps = rows.iter().map(|r| r.0).collect();
        let temperature = rows.iter().map(|r| r.1).collect();
        let mut loads = BTreeMap::new();
        loads.insert("A".to_string(), rows.iter().map(|r| r.2).collect());
        HourlyTable::new(timestamps, temperature, loads).unwrap()
    }

    #[test]
    fn years_align_on_month_day_hour() {
        let t = table(vec![
            (datetime!(2021-01-01 00:00), Some(-1.0), Some(10.0)),
            (datetime!(2021-01-01 01:00), Some(-2.0), Some(11.0)),
            (datetime!(2022-01-01 00:00), Some(-3.0), Some(20.0)),
            (datetime!(2023-01-01 01:00), Some(-4.0), Some(31.0)),
        ]);

        let reshaped = reshape_by_year(&t.station_series("A").unwrap(), &all_years());

        assert_eq!(reshaped.load.years(), &[2021, 2022, 2023]);
        assert_eq!(reshaped.load.keys(), &[key(1, 1, 0), key(1, 1, 1)]);
        assert_eq!(reshaped.load.column(2021), Some(&[10.0, 11.0][..]));
        assert_eq!(reshaped.load.column(2022), Some(&[20.0, 0.0][..]));
        assert_eq!(reshaped.load.column(2023), Some(&[0.0, 31.0][..]));
        assert_eq!(value(&reshaped.temperature, 2023, &key(1, 1, 1)), Some(-4.0));
        assert_eq!(reshaped.temperature.keys(), reshaped.load.keys());
    }

    #[test]
    fn merged_value_matches_source_or_zero() {
        let rows = vec![
            (datetime!(2021-06-01 12:00), Some(15.0), Some(42.0)),
            (datetime!(2022-06-01 12:00), Some(16.0), None),
            (datetime!(2022-06-02 12:00), None, Some(7.5)),
        ];
        let t = table(rows.clone());
        let reshaped = reshape_by_year(&t.station_series("A").unwrap(), &all_years());

        for (ts, _, load) in rows {
            let k = CompositeKey::from_datetime(&ts);
            assert_eq!(value(&reshaped.load, ts.year(), &k), Some(load.unwrap_or(0.0)));
        }
        assert_eq!(value(&reshaped.load, 2021, &key(6, 2, 12)), Some(0.0));
        assert_eq!(value(&reshaped.temperature, 2022, &key(6, 2, 12)), Some(0.0));
    }

    #[test]
    fn years_outside_the_requested_set_are_ignored() {
        let t = table(vec![
            (datetime!(2020-12-31 23:00), Some(-5.0), Some(7.0)),
            (datetime!(2021-01-01 00:00), Some(-1.0), Some(10.0)),
            (datetime!(2022-01-01 00:00), Some(-2.0), Some(20.0)),
        ]);

        let reshaped = reshape_by_year(&t.station_series("A").unwrap(), &all_years());

        assert_eq!(reshaped.load.years(), &[2021, 2022]);
        assert_eq!(reshaped.load.keys(), &[key(1, 1, 0)]);
        assert_eq!(reshaped.temperature.years(), reshaped.load.years());
        assert!(reshaped.load.column(2020).is_none());
    }

    #[test]
    fn repeated_key_within_a_year_keeps_the_first_sample() {
        let t = table(vec![
            (datetime!(2022-10-30 02:00), None, Some(5.0)),
            (datetime!(2022-10-30 02:00), None, Some(6.0)),
        ]);

        let reshaped = reshape_by_year(&t.station_series("A").unwrap(), &all_years());

        assert_eq!(reshaped.duplicate_keys, 1);
        assert_eq!(reshaped.load.len(), 1);
        assert_eq!(reshaped.load.column(2022), Some(&[5.0][..]));
    }

    #[test]
    fn duration_curve_sorts_descending_and_keeps_the_sum() {
        let values = [3.0, 9.0, 0.0, 4.5];
        let curve = duration_curve(&values);

        assert_eq!(curve, vec![9.0, 4.5, 3.0, 0.0]);
        assert_eq!(curve.iter().sum::<f64>(), values.iter().sum::<f64>());
    }
}
