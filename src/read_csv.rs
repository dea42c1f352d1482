use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, Trim};
use log::debug;
use serde::Deserialize;

use crate::error::{AnalysisError, Result};

pub const MONTH: &str = "Month";
pub const DAY: &str = "Day";

/// One day of data center energy figures, as found in the source CSV
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct EnergyRecord {
    #[serde(rename = "Month", default)]
    pub month: Option<String>,
    #[serde(rename = "Day", default)]
    pub day: Option<u32>,
    #[serde(rename = "Grid_Energy_Use_kWh", default)]
    pub grid_energy_use_kwh: Option<f64>,
    #[serde(rename = "Dedicated_Solar_Output_kWh", default)]
    pub dedicated_solar_output_kwh: Option<f64>,
    #[serde(rename = "Total_Energy_Use_kWh", default)]
    pub total_energy_use_kwh: Option<f64>,
    #[serde(rename = "Battery_Storage_Used_kWh", default)]
    pub battery_storage_used_kwh: Option<f64>,
    #[serde(rename = "PUE", default)]
    pub pue: Option<f64>,
    #[serde(rename = "IT_Equipment_kWh", default)]
    pub it_equipment_kwh: Option<f64>,
    #[serde(rename = "Cooling_kWh", default)]
    pub cooling_kwh: Option<f64>,
    #[serde(rename = "Lighting_KWh", default)]
    pub lighting_kwh: Option<f64>,
    #[serde(rename = "CO2_Emissions_US_avg", default)]
    pub co2_emissions_us_avg: Option<f64>,
    #[serde(rename = "CO2_Emissions_VT_avg", default)]
    pub co2_emissions_vt_avg: Option<f64>,
    #[serde(rename = "Cost_from_Grid_$", default)]
    pub cost_from_grid: Option<f64>,
    #[serde(rename = "Percent_Renewable", default)]
    pub percent_renewable: Option<f64>,
}

/// Numeric columns of the dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    GridEnergyUse,
    DedicatedSolarOutput,
    TotalEnergyUse,
    BatteryStorageUsed,
    Pue,
    ItEquipment,
    Cooling,
    Lighting,
    Co2EmissionsUs,
    Co2EmissionsVt,
    CostFromGrid,
    PercentRenewable,
}

impl Column {
    pub const ALL: [Column; 12] = [
        Column::GridEnergyUse,
        Column::DedicatedSolarOutput,
        Column::TotalEnergyUse,
        Column::BatteryStorageUsed,
        Column::Pue,
        Column::ItEquipment,
        Column::Cooling,
        Column::Lighting,
        Column::Co2EmissionsUs,
        Column::Co2EmissionsVt,
        Column::CostFromGrid,
        Column::PercentRenewable,
    ];

    /// The exact CSV header of the column
    pub fn header(self) -> &'static str {
        match self {
            Column::GridEnergyUse => "Grid_Energy_Use_kWh",
            Column::DedicatedSolarOutput => "Dedicated_Solar_Output_kWh",
            Column::TotalEnergyUse => "Total_Energy_Use_kWh",
            Column::BatteryStorageUsed => "Battery_Storage_Used_kWh",
            Column::Pue => "PUE",
            Column::ItEquipment => "IT_Equipment_kWh",
            Column::Cooling => "Cooling_kWh",
            Column::Lighting => "Lighting_KWh",
            Column::Co2EmissionsUs => "CO2_Emissions_US_avg",
            Column::Co2EmissionsVt => "CO2_Emissions_VT_avg",
            Column::CostFromGrid => "Cost_from_Grid_$",
            Column::PercentRenewable => "Percent_Renewable",
        }
    }

    /// Header with underscores replaced by spaces, used for axis labels
    pub fn label(self) -> String {
        self.header().replace('_', " ")
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header())
    }
}

impl EnergyRecord {
    pub fn get(&self, column: Column) -> Option<f64> {
        match column {
            Column::GridEnergyUse => self.grid_energy_use_kwh,
            Column::DedicatedSolarOutput => self.dedicated_solar_output_kwh,
            Column::TotalEnergyUse => self.total_energy_use_kwh,
            Column::BatteryStorageUsed => self.battery_storage_used_kwh,
            Column::Pue => self.pue,
            Column::ItEquipment => self.it_equipment_kwh,
            Column::Cooling => self.cooling_kwh,
            Column::Lighting => self.lighting_kwh,
            Column::Co2EmissionsUs => self.co2_emissions_us_avg,
            Column::Co2EmissionsVt => self.co2_emissions_vt_avg,
            Column::CostFromGrid => self.cost_from_grid,
            Column::PercentRenewable => self.percent_renewable,
        }
    }

    pub fn set(&mut self, column: Column, value: Option<f64>) {
        let slot = match column {
            Column::GridEnergyUse => &mut self.grid_energy_use_kwh,
            Column::DedicatedSolarOutput => &mut self.dedicated_solar_output_kwh,
            Column::TotalEnergyUse => &mut self.total_energy_use_kwh,
            Column::BatteryStorageUsed => &mut self.battery_storage_used_kwh,
            Column::Pue => &mut self.pue,
            Column::ItEquipment => &mut self.it_equipment_kwh,
            Column::Cooling => &mut self.cooling_kwh,
            Column::Lighting => &mut self.lighting_kwh,
            Column::Co2EmissionsUs => &mut self.co2_emissions_us_avg,
            Column::Co2EmissionsVt => &mut self.co2_emissions_vt_avg,
            Column::CostFromGrid => &mut self.cost_from_grid,
            Column::PercentRenewable => &mut self.percent_renewable,
        };
        *slot = value;
    }

    /// Value of a column, failing when the cell is empty. `row` is the 1-based data row.
    pub fn require(&self, column: Column, row: usize) -> Result<f64> {
        self.get(column).ok_or_else(|| AnalysisError::MissingValue {
            column: column.header().to_string(),
            row,
        })
    }
}

/// A loaded CSV file, kept in file order
#[derive(Debug, Clone)]
pub struct Dataset {
    pub source: PathBuf,
    pub records: Vec<EnergyRecord>,
}

impl Dataset {
    pub fn from_records<P: Into<PathBuf>>(source: P, records: Vec<EnergyRecord>) -> Self {
        Dataset { source: source.into(), records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Column values with empty cells as None
    pub fn values(&self, column: Column) -> Vec<Option<f64>> {
        self.records.iter().map(|r| r.get(column)).collect()
    }

    /// Column values with empty cells dropped
    pub fn present(&self, column: Column) -> Vec<f64> {
        self.records.iter().filter_map(|r| r.get(column)).collect()
    }

    /// Column values, failing on the first empty cell
    pub fn require(&self, column: Column) -> Result<Vec<f64>> {
        self.records.iter().enumerate().map(|(i, r)| r.require(column, i + 1)).collect()
    }
}

/// Reads the energy CSV file after checking that every required header is present
///
/// # Arguments
///
/// * 'path' - CSV file to read
/// * 'required' - headers the caller needs, checked before any row is parsed
pub fn load_dataset<P: AsRef<Path>>(path: P, required: &[&str]) -> Result<Dataset> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| AnalysisError::FileAccess {
        path: path.to_path_buf(),
        source,
    })?;

    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(BufReader::new(file));

    let headers = rdr.headers()?.clone();
    let missing: Vec<String> = required
        .iter()
        .filter(|name| !headers.iter().any(|h| h == **name))
        .map(|name| name.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(AnalysisError::Schema { path: path.to_path_buf(), missing });
    }

    let mut records = Vec::new();
    for result in rdr.deserialize() {
        let record: EnergyRecord = result?;
        records.push(record);
    }
    debug!("read {} rows from {}", records.len(), path.display());

    Ok(Dataset::from_records(path, records))
}
