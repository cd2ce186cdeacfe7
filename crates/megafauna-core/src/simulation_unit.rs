//! One habitat together with the herbivore populations living in it.

use rand_chacha::ChaCha12Rng;

use crate::distribution::{corrected_forage, feed_herbivores};
use crate::habitat::Habitat;
use crate::herbivore::Herbivore;
use crate::output::{CombinedData, HabitatData, HerbivoreData};
use crate::parameters::Parameters;
use crate::population::Population;

/// A habitat plus its populations: the unit the driver advances day by
/// day. Owns its RNG stream, so different units stay independent.
pub struct SimulationUnit {
    habitat: Box<dyn Habitat>,
    populations: Vec<Population>,
    rng: ChaCha12Rng,
    initial_establishment_done: bool,
}

impl SimulationUnit {
    pub fn new(habitat: Box<dyn Habitat>, populations: Vec<Population>, rng: ChaCha12Rng) -> Self {
        Self {
            habitat,
            populations,
            rng,
            initial_establishment_done: false,
        }
    }

    pub fn habitat(&self) -> &dyn Habitat {
        self.habitat.as_ref()
    }

    pub fn populations(&self) -> &[Population] {
        &self.populations
    }

    pub fn is_initial_establishment_done(&self) -> bool {
        self.initial_establishment_done
    }

    /// Advance this unit by one day and return the day's output.
    ///
    /// The order is observable: habitat init, establishment, per-herbivore
    /// physiology (which yields offspring and mortality), demand gathering
    /// and feeding, output aggregation, nitrogen return, offspring
    /// insertion, and finally removal of the dead.
    pub fn simulate_day(
        &mut self,
        day_of_year: u16,
        do_herbivores: bool,
        establish_as_needed: bool,
        params: &Parameters,
    ) -> CombinedData {
        assert!(
            day_of_year < 365,
            "day_of_year must be within [0,364], got {day_of_year}"
        );
        self.habitat.init_day(day_of_year);

        let environment = self.habitat.environment();
        let forage_before_feeding = corrected_forage(&self.habitat.available_forage());

        let mut excreted_nitrogen = 0.0;
        let mut total_offspring = vec![0.0; self.populations.len()];
        let mut eaten_today = Default::default();

        if do_herbivores {
            if establish_as_needed {
                self.establish_extinct_populations();
            }

            for (pop_index, population) in self.populations.iter_mut().enumerate() {
                for herbivore in population.members_mut() {
                    // A herbivore that died since yesterday only hands back
                    // its nitrogen before it is purged below.
                    if herbivore.is_dead() {
                        excreted_nitrogen += herbivore.take_nitrogen_excreta();
                        continue;
                    }
                    total_offspring[pop_index] +=
                        herbivore.simulate_day(day_of_year, &environment, &mut self.rng);
                    excreted_nitrogen += herbivore.take_nitrogen_excreta();
                }
            }

            let mut working_forage = forage_before_feeding.clone();
            let mut herbivores: Vec<&mut Herbivore> = self
                .populations
                .iter_mut()
                .flat_map(|p| p.members_mut().iter_mut())
                .collect();
            eaten_today = feed_herbivores(
                params.forage_distribution,
                &mut working_forage,
                &mut herbivores,
            );
            self.habitat.remove_eaten_forage(&eaten_today);
        }

        self.habitat.add_excreted_nitrogen(excreted_nitrogen);

        let output = self.todays_output(&forage_before_feeding, &eaten_today, excreted_nitrogen);

        for (pop_index, population) in self.populations.iter_mut().enumerate() {
            if total_offspring[pop_index] > 0.0 {
                population.create_offspring(total_offspring[pop_index]);
            }
            population.purge_dead();
        }

        output
    }

    /// Re-seed every extinct population at its establishment density and
    /// mark initial establishment as done.
    fn establish_extinct_populations(&mut self) {
        for population in &mut self.populations {
            if population.is_extinct() {
                population.purge_dead();
                tracing::info!(
                    hft = population.hft().name.as_str(),
                    habitat = self.habitat.aggregation_unit(),
                    density = population.hft().establishment.density,
                    "establishing herbivore population"
                );
                population.establish();
            }
        }
        self.initial_establishment_done = true;
    }

    fn todays_output(
        &self,
        forage_before_feeding: &crate::habitat::HabitatForage,
        eaten_today: &crate::forage::ForageMass,
        excreted_nitrogen: f64,
    ) -> CombinedData {
        let mut output = CombinedData {
            habitat_data: HabitatData {
                available_forage: forage_before_feeding.clone(),
                eaten_forage: *eaten_today,
                excreted_nitrogen,
                environment: self.habitat.environment(),
            },
            datapoint_count: 1,
            ..CombinedData::default()
        };
        for population in &self.populations {
            let records: Vec<HerbivoreData> = population
                .members()
                .iter()
                .map(|h| h.todays_output().clone())
                .collect();
            if !records.is_empty() {
                output.hft_data.insert(
                    population.hft().name.clone(),
                    HerbivoreData::create_datapoint(&records),
                );
            }
        }
        output
    }
}
