use serde::Deserialize;
use std::{fs, path::PathBuf};

use anyhow::{bail, Context};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetKind {
    /// A single workbook with one sheet per table.
    Xlsx,
    /// A directory holding `<sheet>.csv` per table.
    CsvDir,
}

/// Sheet and column names of the measurement workbook.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SheetLayout {
    pub hourly_sheet: String,
    pub station_sheet: String,
    pub building_sheet: String,
    pub classification_sheet: String,
    pub timestamp_column: String,
    pub temperature_column: String,
    pub station_code_column: String,
    pub station_name_column: String,
    pub capacity_column: String,
    pub latitude_column: String,
    pub longitude_column: String,
    pub load_fraction_column: String,
    pub max_load_column: String,
}

impl Default for SheetLayout {
    fn default() -> Self {
        Self {
            hourly_sheet: "Timedata".to_string(),
            station_sheet: "Nettstasjon".to_string(),
            building_sheet: "Målepunkt".to_string(),
            classification_sheet: "NS".to_string(),
            timestamp_column: "Dato".to_string(),
            temperature_column: "TEMPERATUR".to_string(),
            station_code_column: "Driftsmerking".to_string(),
            station_name_column: "Nettstasjonsnavn".to_string(),
            capacity_column: "Installert trafoytelse".to_string(),
            latitude_column: "Geografisk nord (grader)".to_string(),
            longitude_column: "Geografisk øst (grader)".to_string(),
            load_fraction_column: "%-belastning per i dag".to_string(),
            max_load_column: "Maks belastning [kWh/h]".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    pub path: PathBuf,
    pub kind: DatasetKind,
    pub csv_delimiter: char,
    pub layout: SheetLayout,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/grid-measurements.xlsx"),
            kind: DatasetKind::Xlsx,
            csv_delimiter: ',',
            layout: SheetLayout::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub stylesheet: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8050".to_string(),
            stylesheet: PathBuf::from("main.css"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Half-width in degrees of the box searched around a click.
    pub bbox_deg: f64,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self { bbox_deg: 0.001 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    pub year_options: Vec<i32>,
    pub default_years: Vec<i32>,
    pub temperature: bool,
    pub duration_curve: bool,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            year_options: vec![2021, 2022, 2023],
            default_years: vec![2022],
            temperature: true,
            duration_curve: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub dataset: DatasetConfig,
    pub server: ServerConfig,
    pub selection: SelectionConfig,
    pub view: ViewConfig,
    pub metrics: Option<MetricsConfig>,
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        use std::env;

        let path = env::var("DASHBOARD_CONFIG").unwrap_or_else(|_| "dashboard-config.toml".to_string());
        let contents =
            fs::read_to_string(&path).with_context(|| format!("failed to read config file {path}"))?;
        Self::from_toml_str(&contents).with_context(|| format!("invalid config file {path}"))
    }

    pub fn from_toml_str(contents: &str) -> anyhow::Result<Self> {
        let cfg: AppConfig = toml::from_str(contents)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if !(self.selection.bbox_deg.is_finite() && self.selection.bbox_deg > 0.0) {
            bail!("selection.bbox_deg must be a positive number");
        }
        if !self.dataset.csv_delimiter.is_ascii() {
            bail!("dataset.csv_delimiter must be a single ASCII character");
        }
        if self.view.year_options.is_empty() {
            bail!("view.year_options must list at least one year");
        }
        if let Some(year) = self
            .view
            .default_years
            .iter()
            .find(|y| !self.view.year_options.contains(y))
        {
            bail!("view.default_years contains {year}, which is not in view.year_options");
        }
        Ok(())
    }
}
