use serde::Serialize;

use crate::transform::YearTable;

/// The panel shows the capacity card plus this many year cards.
pub const MAX_YEAR_CARDS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct YearMetrics {
    pub year: i32,
    pub max_load_kw: i64,
    /// Sum of the hourly mean power samples, i.e. energy in kWh.
    pub total_energy_kwh: i64,
    /// `None` when the station has no installed capacity.
    pub percent_of_capacity: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricCard {
    pub label: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsPanel {
    pub capacity: MetricCard,
    pub years: Vec<MetricCard>,
    pub details: Vec<YearMetrics>,
}

pub fn percent_of_capacity(max_load_kw: i64, capacity_kw: u32) -> Option<i64> {
    if capacity_kw == 0 {
        return None;
    }
    Some((max_load_kw as f64 * 100.0 / f64::from(capacity_kw)) as i64)
}

pub fn year_metrics(year: i32, values: &[f64], capacity_kw: u32) -> YearMetrics {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let max_load_kw = if max.is_finite() { max as i64 } else { 0 };
    let total_energy_kwh = values.iter().sum::<f64>() as i64;

    YearMetrics {
        year,
        max_load_kw,
        total_energy_kwh,
        percent_of_capacity: percent_of_capacity(max_load_kw, capacity_kw),
    }
}

/// `1234567` -> `"1 234 567"`.
pub fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(' ');
        }
        out.push(ch);
    }
    out
}

fn year_card(m: &YearMetrics) -> MetricCard {
    let percent = m
        .percent_of_capacity
        .map_or_else(|| "-".to_string(), |p| p.to_string());
    MetricCard {
        label: m.year.to_string(),
        value: format!("{} kW ({percent} %)", group_thousands(m.max_load_kw)),
        delta: Some(format!("{} kWh", group_thousands(m.total_energy_kwh))),
    }
}

pub fn metrics_panel(load: &YearTable, capacity_kw: u32) -> MetricsPanel {
    let details: Vec<YearMetrics> = load
        .columns()
        .take(MAX_YEAR_CARDS)
        .map(|(year, values)| year_metrics(year, values, capacity_kw))
        .collect();

    MetricsPanel {
        capacity: MetricCard {
            label: "Capacity".to_string(),
            value: format!("{} kW", group_thousands(i64::from(capacity_kw))),
            delta: None,
        },
        years: details.iter().map(year_card).collect(),
        details,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_capacity_has_no_percentage() {
        assert_eq!(percent_of_capacity(80, 0), None);

        let m = year_metrics(2022, &[10.0, 80.0], 0);
        assert_eq!(m.percent_of_capacity, None);
        assert_eq!(year_card(&m).value, "80 kW (- %)");
    }

    #[test]
    fn metrics_truncate_like_integer_casts() {
        let m = year_metrics(2021, &[10.5, 99.75, 0.25], 315);

        assert_eq!(m.max_load_kw, 99);
        assert_eq!(m.total_energy_kwh, 110);
        assert_eq!(m.percent_of_capacity, Some(31));

        // Multiplying first keeps exact ratios exact.
        assert_eq!(percent_of_capacity(29, 100), Some(29));
        assert_eq!(percent_of_capacity(57, 100), Some(57));
    }

    #[test]
    fn empty_column_reads_as_zero() {
        let m = year_metrics(2023, &[], 100);
        assert_eq!(m.max_load_kw, 0);
        assert_eq!(m.total_energy_kwh, 0);
        assert_eq!(m.percent_of_capacity, Some(0));
    }

    #[test]
    fn thousands_are_separated_by_spaces() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1 000");
        assert_eq!(group_thousands(1234567), "1 234 567");
        assert_eq!(group_thousands(-12345), "-12 345");
    }

    #[test]
    fn year_card_formats_value_and_energy() {
        let card = year_card(&YearMetrics {
            year: 2022,
            max_load_kw: 1250,
            total_energy_kwh: 4_321_000,
            percent_of_capacity: Some(125),
        });

        assert_eq!(card.label, "2022");
        assert_eq!(card.value, "1 250 kW (125 %)");
        assert_eq!(card.delta.as_deref(), Some("4 321 000 kWh"));
    }
}
