//! Global simulation parameters from the instruction file.

use serde::{Deserialize, Serialize};

use crate::error::MegafaunaError;

/// Algorithm for distributing available forage among herbivores.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ForageDistributionAlgorithm {
    /// Proportional sharing without direct competition.
    Equally,
}

/// Which herbivore representation the populations use.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum HerbivoreType {
    /// Density-based cohorts, one per (HFT, age, sex).
    Cohort,
    /// Discrete individual animals.
    Individual,
}

/// Time interval for aggregating output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputInterval {
    /// Write every day without aggregation.
    Daily,
    Monthly,
    Annual,
    /// Ten-year intervals.
    Decadal,
}

/// Selector for the output writer implementation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Tab-separated plaintext files, one per output variable.
    TextTables,
}

/// Options for the text-table writer. Every boolean enables one table; the
/// file is named after the field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextTableOptions {
    /// Directory where the output files are placed; created if missing.
    pub directory: String,
    /// Figures after the decimal point.
    pub precision: usize,
    /// Available forage per forage type [kgDM/km²].
    pub available_forage: bool,
    /// Digestibility of the available forage per forage type.
    pub digestibility: bool,
    /// Body fat fraction per HFT.
    pub body_fat: bool,
    /// Individual density per HFT [ind/km²].
    pub individual_density: bool,
    /// Mass density per HFT [kg/km²].
    pub mass_density: bool,
    /// Eaten forage per individual, per HFT and forage type [kgDM/ind/day].
    pub eaten_forage_per_ind: bool,
    /// Ingested nitrogen per individual per HFT [kgN/ind/day].
    pub eaten_nitrogen_per_ind: bool,
}

impl Default for TextTableOptions {
    fn default() -> Self {
        Self {
            directory: "./".to_string(),
            precision: 3,
            available_forage: false,
            digestibility: false,
            body_fat: false,
            individual_density: false,
            mass_density: true,
            eaten_forage_per_ind: false,
            eaten_nitrogen_per_ind: false,
        }
    }
}

/// Global parameters of one megafauna simulation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Parameters {
    /// How available forage is split among the herbivores.
    pub forage_distribution: ForageDistributionAlgorithm,
    /// Habitat area [km²]; only relevant in individual mode.
    pub habitat_area_km2: f64,
    /// Days between re-establishment checks; zero disables
    /// re-establishment.
    pub establish_interval: u32,
    pub herbivore_type: HerbivoreType,
    /// Seed for the per-unit random number streams.
    pub seed: u64,
    pub output_format: OutputFormat,
    pub output_interval: OutputInterval,
    pub text_tables: TextTableOptions,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            forage_distribution: ForageDistributionAlgorithm::Equally,
            habitat_area_km2: 1.0,
            establish_interval: 0,
            herbivore_type: HerbivoreType::Cohort,
            seed: 42,
            output_format: OutputFormat::TextTables,
            output_interval: OutputInterval::Annual,
            text_tables: TextTableOptions::default(),
        }
    }
}

impl Parameters {
    pub fn validate(&self) -> Result<(), MegafaunaError> {
        if !(self.habitat_area_km2 > 0.0 && self.habitat_area_km2.is_finite()) {
            return Err(MegafaunaError::OutOfRange {
                key: "simulation.habitat_area_km2".into(),
                reason: format!("must be positive and finite, got {}", self.habitat_area_km2),
            });
        }
        if self.text_tables.precision > 15 {
            return Err(MegafaunaError::OutOfRange {
                key: "output.text_tables.precision".into(),
                reason: format!("must be at most 15, got {}", self.text_tables.precision),
            });
        }
        Ok(())
    }
}
