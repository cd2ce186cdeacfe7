//! Tab-separated plaintext output tables, one file per enabled variable.
//!
//! Each row is one reporting interval of one aggregation unit, dated at the
//! midpoint of the aggregation window. Missing data is written as `NaN`,
//! except for the count-like densities, which are zero when a population is
//! absent.

use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::MegafaunaError;
use crate::forage::ForageType;
use crate::hft::Hft;
use crate::output::Datapoint;
use crate::parameters::TextTableOptions;

/// Character separating the columns.
const FIELD_SEPARATOR: char = '\t';

/// File extension of all output tables.
const FILE_EXTENSION: &str = ".tsv";

/// The variable one table file holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Variable {
    /// Per forage type [kgDM/km²].
    AvailableForage,
    /// Per forage type, fraction; NaN when no forage stands.
    Digestibility,
    /// Per HFT, fraction; NaN when the HFT is absent.
    BodyFat,
    /// Per HFT [ind/km²]; zero when the HFT is absent.
    IndividualDensity,
    /// Per HFT [kg/km²]; zero when the HFT is absent.
    MassDensity,
    /// Per HFT and forage type [kgDM/ind/day]; NaN when the HFT is absent.
    EatenForagePerInd,
    /// Per HFT [kgN/ind/day]; NaN when the HFT is absent.
    EatenNitrogenPerInd,
}

impl Variable {
    fn file_stem(self) -> &'static str {
        match self {
            Variable::AvailableForage => "available_forage",
            Variable::Digestibility => "digestibility",
            Variable::BodyFat => "body_fat",
            Variable::IndividualDensity => "individual_density",
            Variable::MassDensity => "mass_density",
            Variable::EatenForagePerInd => "eaten_forage_per_ind",
            Variable::EatenNitrogenPerInd => "eaten_nitrogen_per_ind",
        }
    }

    fn is_per_hft(self) -> bool {
        !matches!(self, Variable::AvailableForage | Variable::Digestibility)
    }

    fn is_per_forage(self) -> bool {
        matches!(
            self,
            Variable::AvailableForage | Variable::Digestibility | Variable::EatenForagePerInd
        )
    }
}

struct TableFile {
    variable: Variable,
    writer: BufWriter<File>,
}

/// Writes aggregated datapoints to tabular plaintext files.
///
/// One file per variable enabled in [`TextTableOptions`], named after the
/// option. All files live in the configured output directory, which is
/// created if missing.
pub struct TextTableWriter {
    tables: Vec<TableFile>,
    hft_names: Vec<String>,
    precision: usize,
}

impl TextTableWriter {
    /// Create all enabled table files and write their headers.
    pub fn new(
        options: &TextTableOptions,
        _interval: crate::parameters::OutputInterval,
        hfts: &[Arc<Hft>],
    ) -> Result<Self, MegafaunaError> {
        let directory = PathBuf::from(&options.directory);
        create_dir_all(&directory)?;

        let hft_names: Vec<String> = hfts.iter().map(|hft| hft.name.clone()).collect();

        let enabled = [
            (options.available_forage, Variable::AvailableForage),
            (options.digestibility, Variable::Digestibility),
            (options.body_fat, Variable::BodyFat),
            (options.individual_density, Variable::IndividualDensity),
            (options.mass_density, Variable::MassDensity),
            (options.eaten_forage_per_ind, Variable::EatenForagePerInd),
            (
                options.eaten_nitrogen_per_ind,
                Variable::EatenNitrogenPerInd,
            ),
        ];

        let mut tables = Vec::new();
        for (on, variable) in enabled {
            if !on {
                continue;
            }
            let path = directory.join(format!("{}{FILE_EXTENSION}", variable.file_stem()));
            let file = File::create(&path)?;
            let mut table = TableFile {
                variable,
                writer: BufWriter::new(file),
            };
            write_header(&mut table, &hft_names)?;
            tables.push(table);
        }

        Ok(Self {
            tables,
            hft_names,
            precision: options.precision,
        })
    }

    /// Append one aggregated datapoint as a row to every enabled table.
    pub fn write_datapoint(&mut self, datapoint: &Datapoint) -> Result<(), MegafaunaError> {
        let midpoint = datapoint.interval.midpoint();
        for table in &mut self.tables {
            let mut row = format!(
                "{}{FIELD_SEPARATOR}{}{FIELD_SEPARATOR}{}",
                midpoint.year(),
                midpoint.julian_day(),
                datapoint.aggregation_unit
            );
            let precision = self.precision;
            for value in row_values(table.variable, datapoint, &self.hft_names) {
                row.push(FIELD_SEPARATOR);
                row.push_str(&format!("{value:.precision$}"));
            }
            writeln!(table.writer, "{row}")?;
            table.writer.flush()?;
        }
        Ok(())
    }
}

/// Header: date and unit columns, then data columns — per-HFT tables one
/// column per HFT; HFT-forage tables loop HFTs outside, forage types
/// inside.
fn write_header(table: &mut TableFile, hft_names: &[String]) -> Result<(), MegafaunaError> {
    let mut header = format!("year{FIELD_SEPARATOR}day{FIELD_SEPARATOR}agg_unit");
    for column in column_names(table.variable, hft_names) {
        header.push(FIELD_SEPARATOR);
        header.push_str(&column);
    }
    writeln!(table.writer, "{header}")?;
    table.writer.flush()?;
    Ok(())
}

fn column_names(variable: Variable, hft_names: &[String]) -> Vec<String> {
    match (variable.is_per_hft(), variable.is_per_forage()) {
        (false, true) => ForageType::EDIBLE
            .into_iter()
            .map(|ft| ft.name().to_string())
            .collect(),
        (true, false) => hft_names.to_vec(),
        (true, true) => hft_names
            .iter()
            .flat_map(|name| {
                ForageType::EDIBLE
                    .into_iter()
                    .map(move |ft| format!("{name}_{}", ft.name()))
            })
            .collect(),
        (false, false) => unreachable!("every table is keyed by HFT or forage type"),
    }
}

fn row_values(variable: Variable, datapoint: &Datapoint, hft_names: &[String]) -> Vec<f64> {
    let habitat = &datapoint.data.habitat_data;
    match variable {
        Variable::AvailableForage => ForageType::EDIBLE
            .into_iter()
            .map(|ft| habitat.available_forage.mass().get(ft))
            .collect(),
        Variable::Digestibility => ForageType::EDIBLE
            .into_iter()
            .map(|ft| {
                if habitat.available_forage.mass().get(ft) > 0.0 {
                    habitat.available_forage.digestibility().get(ft)
                } else {
                    f64::NAN
                }
            })
            .collect(),
        Variable::BodyFat => per_hft(datapoint, hft_names, f64::NAN, |data| data.bodyfat),
        Variable::IndividualDensity => per_hft(datapoint, hft_names, 0.0, |data| data.inddens),
        Variable::MassDensity => per_hft(datapoint, hft_names, 0.0, |data| data.massdens),
        Variable::EatenNitrogenPerInd => {
            per_hft(datapoint, hft_names, f64::NAN, |data| {
                data.eaten_nitrogen_per_ind
            })
        }
        Variable::EatenForagePerInd => hft_names
            .iter()
            .flat_map(|name| {
                let data = datapoint.data.hft_data.get(name);
                ForageType::EDIBLE.into_iter().map(move |ft| match data {
                    Some(data) => data.eaten_forage_per_ind.get(ft),
                    None => f64::NAN,
                })
            })
            .collect(),
    }
}

fn per_hft(
    datapoint: &Datapoint,
    hft_names: &[String],
    missing: f64,
    select: impl Fn(&crate::output::HerbivoreData) -> f64,
) -> Vec<f64> {
    hft_names
        .iter()
        .map(|name| match datapoint.data.hft_data.get(name) {
            Some(data) => select(data),
            None => missing,
        })
        .collect()
}
