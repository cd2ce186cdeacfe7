//! The simulation driver owning all simulation units, the shared HFT list,
//! and the output pipeline.

use std::path::Path;
use std::sync::Arc;

use crate::date::{Date, MONTH_LENGTH};
use crate::error::MegafaunaError;
use crate::habitat::Habitat;
use crate::hft::Hft;
use crate::instruction::{read_instruction_file, InstructionContent};
use crate::output::{Aggregator, TextTableWriter};
use crate::parameters::{OutputFormat, OutputInterval, Parameters};
use crate::population::Population;
use crate::rng::derive_unit_rng;
use crate::simulation_unit::SimulationUnit;

/// Central object composing habitats and herbivore populations into one
/// megafauna simulation.
pub struct World {
    params: Parameters,
    hfts: Vec<Arc<Hft>>,
    units: Vec<SimulationUnit>,
    /// Days since the last establishment check.
    days_since_establishment: u32,
    last_date: Option<Date>,
    aggregator: Aggregator,
    writer: Option<TextTableWriter>,
}

impl World {
    /// Read global parameters and HFTs from a TOML instruction file and set
    /// up the output writer.
    pub fn new(instruction_file: impl AsRef<Path>) -> Result<Self, MegafaunaError> {
        let content = read_instruction_file(instruction_file.as_ref())?;
        tracing::info!(
            hft_count = content.hfts.len(),
            "megafauna instruction file loaded"
        );
        Self::from_content(content)
    }

    /// Compose a world from already-parsed instruction content.
    pub fn from_content(content: InstructionContent) -> Result<Self, MegafaunaError> {
        let InstructionContent { params, hfts } = content;
        let writer = match params.output_format {
            OutputFormat::TextTables => Some(TextTableWriter::new(
                &params.text_tables,
                params.output_interval,
                &hfts,
            )?),
        };
        Ok(Self {
            // The first simulated day performs an establishment check.
            days_since_establishment: params.establish_interval,
            params,
            hfts,
            units: Vec::new(),
            last_date: None,
            aggregator: Aggregator::new(),
            writer,
        })
    }

    /// A world without an output writer, for hosts that read the aggregated
    /// data themselves.
    pub fn without_output(params: Parameters, hfts: Vec<Arc<Hft>>) -> Self {
        Self {
            days_since_establishment: params.establish_interval,
            params,
            hfts,
            units: Vec::new(),
            last_date: None,
            aggregator: Aggregator::new(),
            writer: None,
        }
    }

    pub fn params(&self) -> &Parameters {
        &self.params
    }

    pub fn hfts(&self) -> &[Arc<Hft>] {
        &self.hfts
    }

    pub fn simulation_units(&self) -> &[SimulationUnit] {
        &self.units
    }

    /// Compose a new simulation unit from an externally implemented
    /// habitat, with one (empty) population per HFT.
    pub fn create_simulation_unit(&mut self, habitat: Box<dyn Habitat>) {
        let populations = self
            .hfts
            .iter()
            .map(|hft| {
                Population::new(
                    Arc::clone(hft),
                    self.params.herbivore_type,
                    self.params.habitat_area_km2,
                )
            })
            .collect();
        let rng = derive_unit_rng(self.params.seed, self.units.len());
        tracing::debug!(unit_index = self.units.len(), "simulation unit created");
        self.units
            .push(SimulationUnit::new(habitat, populations, rng));
    }

    /// Advance all simulation units by one day.
    ///
    /// `date` must be the successor of the previously simulated date. With
    /// `do_herbivores == false` only the habitats are initialized and their
    /// output recorded.
    pub fn simulate_day(
        &mut self,
        date: Date,
        do_herbivores: bool,
    ) -> Result<(), MegafaunaError> {
        if let Some(last) = self.last_date {
            assert!(
                last.is_successive(&date),
                "simulate_day() must be called with successive dates"
            );
        }
        self.last_date = Some(date);

        // Establishment policy: the very first herbivore day always
        // establishes; afterwards checks fire on a fixed cadence, and each
        // firing resets the counter.
        let mut establish = self
            .units
            .iter()
            .any(|unit| !unit.is_initial_establishment_done());
        if self.params.establish_interval > 0
            && self.days_since_establishment >= self.params.establish_interval
        {
            establish = true;
        }
        if establish {
            self.days_since_establishment = 0;
        }
        self.days_since_establishment += 1;

        let day_of_year = date.julian_day();
        for unit in &mut self.units {
            let output = unit.simulate_day(
                day_of_year,
                do_herbivores,
                do_herbivores && establish,
                &self.params,
            );
            self.aggregator
                .add(date, unit.habitat().aggregation_unit(), &output);
        }

        if is_interval_boundary(date, self.params.output_interval) {
            self.flush_output()?;
        }
        Ok(())
    }

    /// Write out and reset whatever the aggregator currently holds.
    ///
    /// Called automatically at each reporting-interval boundary; call once
    /// more after the final simulated day if the run ends mid-interval.
    /// Without a writer the data stays in the aggregator for the host to
    /// retrieve.
    pub fn flush_output(&mut self) -> Result<(), MegafaunaError> {
        let Some(writer) = &mut self.writer else {
            return Ok(());
        };
        let datapoints = self.aggregator.retrieve();
        if datapoints.is_empty() {
            return Ok(());
        }
        tracing::debug!(datapoints = datapoints.len(), "writing output interval");
        for datapoint in &datapoints {
            writer.write_datapoint(datapoint)?;
        }
        Ok(())
    }

    /// Read-only access to the currently accumulating output.
    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    /// Take the accumulated output instead of writing it; for host models
    /// with their own output pipeline.
    pub fn retrieve_output(&mut self) -> Vec<crate::output::Datapoint> {
        self.aggregator.retrieve()
    }
}

/// Whether `date` is the last day of the reporting interval.
fn is_interval_boundary(date: Date, interval: OutputInterval) -> bool {
    match interval {
        OutputInterval::Daily => true,
        OutputInterval::Monthly => {
            let month = date.month();
            let last_of_month: u16 = MONTH_LENGTH[..=month].iter().sum::<u16>() - 1;
            date.julian_day() == last_of_month
        }
        OutputInterval::Annual => date.julian_day() == 364,
        OutputInterval::Decadal => date.julian_day() == 364 && (date.year() + 1) % 10 == 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_boundaries() {
        assert!(is_interval_boundary(Date::new(5, 0), OutputInterval::Daily));
        assert!(is_interval_boundary(
            Date::new(30, 0),
            OutputInterval::Monthly
        ));
        assert!(!is_interval_boundary(
            Date::new(31, 0),
            OutputInterval::Monthly
        ));
        assert!(is_interval_boundary(
            Date::new(364, 0),
            OutputInterval::Monthly
        ));
        assert!(is_interval_boundary(
            Date::new(364, 2),
            OutputInterval::Annual
        ));
        assert!(!is_interval_boundary(
            Date::new(363, 2),
            OutputInterval::Annual
        ));
        assert!(is_interval_boundary(
            Date::new(364, 9),
            OutputInterval::Decadal
        ));
        assert!(!is_interval_boundary(
            Date::new(364, 5),
            OutputInterval::Decadal
        ));
    }
}
