//! Output data containers and their aggregation over herbivores, habitats,
//! and time.
//!
//! Aggregation happens in two steps: the data of all cohorts of one HFT in
//! one habitat on one day are combined into a single datapoint
//! ([`HerbivoreData::create_datapoint`], summing per-area flows), and
//! datapoints are then merged across days and habitats by weighted
//! averaging over their [`CombinedData::datapoint_count`]. Both operations
//! are associative, and merging with an empty object is the identity.

mod text_tables;

pub use text_tables::TextTableWriter;

use std::collections::BTreeMap;

use crate::average::average;
use crate::date::{Date, DateInterval};
use crate::forage::{ForageEnergy, ForageEnergyContent, ForageMass, ForageType};
use crate::habitat::{HabitatEnvironment, HabitatForage};
use crate::hft::MortalityFactor;

/// Herbivore output data of one HFT for one time unit.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HerbivoreData {
    /// Age in years (per individual).
    pub age_years: f64,
    /// Body fat fraction (per individual).
    pub bodyfat: f64,
    /// Energy expenditure [MJ/ind/day].
    pub expenditure: f64,
    /// Nitrogen bound in the herbivores [kgN/km²].
    pub bound_nitrogen: f64,
    /// Individual density [ind/km²].
    pub inddens: f64,
    /// Mass density [kg/km²].
    pub massdens: f64,
    /// Newborns [ind/km²/day].
    pub offspring: f64,
    /// Daily mortality per applied factor [ind/ind/day].
    pub mortality: BTreeMap<MortalityFactor, f64>,
    /// Eaten forage per individual [kgDM/ind/day].
    pub eaten_forage_per_ind: ForageMass,
    /// Eaten forage per body mass [kgDM/kg/day].
    pub eaten_forage_per_mass: ForageMass,
    /// Ingested nitrogen per individual [kgN/ind/day].
    pub eaten_nitrogen_per_ind: f64,
    /// Net energy content of the available forage [MJ/kgDM].
    pub energy_content: ForageEnergyContent,
    /// Net energy intake per individual [MJ/ind/day].
    pub energy_intake_per_ind: ForageEnergy,
    /// Net energy intake per body mass [MJ/kg/day].
    pub energy_intake_per_mass: ForageEnergy,
}

impl HerbivoreData {
    /// Reset to zero values.
    pub fn reset(&mut self) {
        *self = HerbivoreData::default();
    }

    /// Merge with another datapoint by weighted averaging.
    ///
    /// Per-individual fields are additionally weighted by individual
    /// density. The mortality map keeps only factors present in *both*
    /// objects, because the statistical weight must be the same for all
    /// variables.
    pub fn merge(&mut self, other: &HerbivoreData, this_weight: f64, other_weight: f64) {
        assert!(
            this_weight >= 0.0 && other_weight >= 0.0,
            "merge weights must not be negative"
        );
        assert!(
            this_weight + other_weight > 0.0,
            "at least one merge weight must be positive"
        );
        if std::ptr::eq(self, other) || other_weight == 0.0 {
            return;
        }
        if this_weight == 0.0 {
            *self = other.clone();
            return;
        }

        if other.inddens > 0.0 {
            let this_weight_ind = this_weight * self.inddens;
            let other_weight_ind = other_weight * other.inddens;
            if this_weight_ind + other_weight_ind > 0.0 {
                self.age_years = average(
                    self.age_years,
                    other.age_years,
                    this_weight_ind,
                    other_weight_ind,
                );
                self.bodyfat = average(
                    self.bodyfat,
                    other.bodyfat,
                    this_weight_ind,
                    other_weight_ind,
                );
                self.expenditure = average(
                    self.expenditure,
                    other.expenditure,
                    this_weight_ind,
                    other_weight_ind,
                );
            }
            self.eaten_nitrogen_per_ind = average(
                self.eaten_nitrogen_per_ind,
                other.eaten_nitrogen_per_ind,
                this_weight,
                other_weight,
            );
        }

        let mut intersection = BTreeMap::new();
        for (factor, other_rate) in &other.mortality {
            if let Some(this_rate) = self.mortality.get(factor) {
                intersection.insert(
                    *factor,
                    average(*this_rate, *other_rate, this_weight, other_weight),
                );
            }
        }
        self.mortality = intersection;

        self.bound_nitrogen = average(
            self.bound_nitrogen,
            other.bound_nitrogen,
            this_weight,
            other_weight,
        );
        self.inddens = average(self.inddens, other.inddens, this_weight, other_weight);
        self.massdens = average(self.massdens, other.massdens, this_weight, other_weight);
        self.offspring = average(self.offspring, other.offspring, this_weight, other_weight);

        self.eaten_forage_per_ind
            .merge(&other.eaten_forage_per_ind, this_weight, other_weight);
        self.eaten_forage_per_mass
            .merge(&other.eaten_forage_per_mass, this_weight, other_weight);
        self.energy_intake_per_ind
            .merge(&other.energy_intake_per_ind, this_weight, other_weight);
        self.energy_intake_per_mass
            .merge(&other.energy_intake_per_mass, this_weight, other_weight);

        merge_energy_content(
            &mut self.energy_content,
            &other.energy_content,
            this_weight,
            other_weight,
        );
    }

    /// Combine the data of all cohorts of one HFT in one habitat on one day
    /// into a single datapoint.
    ///
    /// Per-individual variables become the density-weighted average;
    /// per-area variables (densities, offspring, bound nitrogen) are summed.
    /// All mortality factors are included since every entry carries the same
    /// temporal weight.
    pub fn create_datapoint(data: &[HerbivoreData]) -> HerbivoreData {
        assert!(
            !data.is_empty(),
            "create_datapoint() requires at least one herbivore data record"
        );
        let mut result = HerbivoreData::default();
        for other in data {
            if result.inddens > 0.0 || other.inddens > 0.0 {
                result.age_years = average(
                    result.age_years,
                    other.age_years,
                    result.inddens,
                    other.inddens,
                );
                result.bodyfat = average(
                    result.bodyfat,
                    other.bodyfat,
                    result.inddens,
                    other.inddens,
                );
                result.eaten_nitrogen_per_ind = average(
                    result.eaten_nitrogen_per_ind,
                    other.eaten_nitrogen_per_ind,
                    result.inddens,
                    other.inddens,
                );
                result.expenditure = average(
                    result.expenditure,
                    other.expenditure,
                    result.inddens,
                    other.inddens,
                );
                result
                    .eaten_forage_per_ind
                    .merge(&other.eaten_forage_per_ind, result.inddens, other.inddens);
                result
                    .eaten_forage_per_mass
                    .merge(&other.eaten_forage_per_mass, result.inddens, other.inddens);
                merge_energy_content(
                    &mut result.energy_content,
                    &other.energy_content,
                    result.inddens,
                    other.inddens,
                );
                result
                    .energy_intake_per_ind
                    .merge(&other.energy_intake_per_ind, result.inddens, other.inddens);
                result
                    .energy_intake_per_mass
                    .merge(&other.energy_intake_per_mass, result.inddens, other.inddens);
                for (factor, rate) in &other.mortality {
                    let entry = result.mortality.entry(*factor).or_insert(0.0);
                    *entry = average(*entry, *rate, result.inddens, other.inddens);
                }
            }

            result.bound_nitrogen += other.bound_nitrogen;
            result.inddens += other.inddens;
            result.massdens += other.massdens;
            result.offspring += other.offspring;
        }
        result
    }
}

/// Weighted mean for net energy content that skips zero values, which stem
/// from zero available forage rather than from a real measurement.
fn merge_energy_content(
    this: &mut ForageEnergyContent,
    other: &ForageEnergyContent,
    this_weight: f64,
    other_weight: f64,
) {
    for ft in ForageType::EDIBLE {
        if other.get(ft) != 0.0 {
            if this.get(ft) != 0.0 {
                this.set(
                    ft,
                    average(this.get(ft), other.get(ft), this_weight, other_weight),
                );
            } else {
                this.set(ft, other.get(ft));
            }
        }
    }
}

/// Habitat output data for one time unit.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HabitatData {
    /// Available forage before feeding.
    pub available_forage: HabitatForage,
    /// Forage eaten by all herbivores [kgDM/km²/day].
    pub eaten_forage: ForageMass,
    /// Nitrogen returned to the habitat [kgN/km²/day].
    pub excreted_nitrogen: f64,
    /// Abiotic conditions.
    pub environment: HabitatEnvironment,
}

impl HabitatData {
    /// Merge with another datapoint by weighted averaging of all variables.
    pub fn merge(&mut self, other: &HabitatData, this_weight: f64, other_weight: f64) {
        assert!(
            this_weight >= 0.0 && other_weight >= 0.0,
            "merge weights must not be negative"
        );
        assert!(
            this_weight + other_weight > 0.0,
            "at least one merge weight must be positive"
        );
        if std::ptr::eq(self, other) || other_weight == 0.0 {
            return;
        }
        if this_weight == 0.0 {
            *self = other.clone();
            return;
        }
        self.available_forage
            .merge(&other.available_forage, this_weight, other_weight);
        self.eaten_forage
            .merge(&other.eaten_forage, this_weight, other_weight);
        self.excreted_nitrogen = average(
            self.excreted_nitrogen,
            other.excreted_nitrogen,
            this_weight,
            other_weight,
        );
        self.environment.air_temperature = average(
            self.environment.air_temperature,
            other.environment.air_temperature,
            this_weight,
            other_weight,
        );
        self.environment.snow_depth = average(
            self.environment.snow_depth,
            other.environment.snow_depth,
            this_weight,
            other_weight,
        );
    }
}

/// Habitat plus herbivore output combined, with the statistical weight of
/// the contained data.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CombinedData {
    pub habitat_data: HabitatData,
    /// One datapoint per HFT, keyed by HFT name.
    pub hft_data: BTreeMap<String, HerbivoreData>,
    /// Weight for merging; zero marks an empty object.
    pub datapoint_count: u32,
}

impl CombinedData {
    /// Merge another object into this one, weighted by the datapoint counts.
    pub fn merge(&mut self, other: &CombinedData) {
        if other.datapoint_count == 0 {
            return;
        }
        if self.datapoint_count == 0 {
            *self = other.clone();
            return;
        }
        let this_weight = self.datapoint_count as f64;
        let other_weight = other.datapoint_count as f64;
        self.habitat_data
            .merge(&other.habitat_data, this_weight, other_weight);

        // HFTs missing on either side merge against an empty record.
        for name in other.hft_data.keys() {
            self.hft_data.entry(name.clone()).or_default();
        }
        let empty = HerbivoreData::default();
        for (name, data) in &mut self.hft_data {
            let other_data = other.hft_data.get(name).unwrap_or(&empty);
            data.merge(other_data, this_weight, other_weight);
        }

        self.datapoint_count += other.datapoint_count;
    }
}

/// Spatially and temporally aggregated output with its metadata.
#[derive(Clone, Debug, PartialEq)]
pub struct Datapoint {
    /// Identifier of the spatial aggregation unit.
    pub aggregation_unit: String,
    /// The aggregated data.
    pub data: CombinedData,
    /// The time span covered.
    pub interval: DateInterval,
}

/// Collects daily output from all simulation units until one reporting
/// interval is complete.
///
/// All datapoints share the same date interval so that one consistent set
/// can be retrieved and handed to the output writer.
#[derive(Debug, Default)]
pub struct Aggregator {
    datapoints: Vec<Datapoint>,
    interval: Option<DateInterval>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the output of one simulation unit for one completed day.
    pub fn add(&mut self, today: Date, aggregation_unit: &str, output: &CombinedData) {
        match &mut self.interval {
            Some(interval) => interval.extend(today),
            None => self.interval = Some(DateInterval::new(today, today)),
        }
        let interval = self.interval.unwrap();
        match self
            .datapoints
            .iter_mut()
            .find(|dp| dp.aggregation_unit == aggregation_unit)
        {
            Some(datapoint) => {
                datapoint.data.merge(output);
                datapoint.interval = interval;
            }
            None => self.datapoints.push(Datapoint {
                aggregation_unit: aggregation_unit.to_string(),
                data: output.clone(),
                interval,
            }),
        }
        for datapoint in &mut self.datapoints {
            datapoint.interval = interval;
        }
    }

    /// The time span covered by the currently added data.
    pub fn interval(&self) -> Option<&DateInterval> {
        self.interval.as_ref()
    }

    /// Take the aggregated data out and reset. One datapoint per
    /// aggregation unit; empty if nothing was added.
    pub fn retrieve(&mut self) -> Vec<Datapoint> {
        self.interval = None;
        std::mem::take(&mut self.datapoints)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn herbivore_data(inddens: f64, bodyfat: f64, offspring: f64) -> HerbivoreData {
        HerbivoreData {
            inddens,
            massdens: inddens * 50.0,
            bodyfat,
            offspring,
            ..HerbivoreData::default()
        }
    }

    #[test]
    fn merge_with_empty_is_identity() {
        let mut data = herbivore_data(2.0, 0.2, 0.1);
        let reference = data.clone();
        data.merge(&HerbivoreData::default(), 1.0, 0.0);
        assert_eq!(data, reference);

        let mut combined = CombinedData {
            datapoint_count: 1,
            ..CombinedData::default()
        };
        combined
            .hft_data
            .insert("deer".into(), herbivore_data(1.0, 0.1, 0.0));
        let reference = combined.clone();
        combined.merge(&CombinedData::default());
        assert_eq!(combined, reference);
    }

    #[test]
    fn datapoint_sums_densities_and_averages_bodyfat() {
        let a = herbivore_data(1.0, 0.1, 0.2);
        let b = herbivore_data(3.0, 0.3, 0.4);
        let point = HerbivoreData::create_datapoint(&[a, b]);
        assert!((point.inddens - 4.0).abs() < 1e-12);
        assert!((point.offspring - 0.6).abs() < 1e-12);
        // Density-weighted mean: (0.1*1 + 0.3*3) / 4
        assert!((point.bodyfat - 0.25).abs() < 1e-12);
    }

    #[test]
    fn combined_merge_is_associative() {
        let make = |count: u32, inddens: f64, bodyfat: f64| {
            let mut combined = CombinedData {
                datapoint_count: count,
                ..CombinedData::default()
            };
            combined
                .hft_data
                .insert("deer".into(), herbivore_data(inddens, bodyfat, 0.0));
            combined
        };
        let (a, b, c) = (make(1, 1.0, 0.1), make(2, 3.0, 0.3), make(3, 2.0, 0.2));

        let mut left = a.clone();
        left.merge(&b);
        left.merge(&c);

        let mut right_tail = b.clone();
        right_tail.merge(&c);
        let mut right = a.clone();
        right.merge(&right_tail);

        assert_eq!(left.datapoint_count, right.datapoint_count);
        let left_deer = &left.hft_data["deer"];
        let right_deer = &right.hft_data["deer"];
        assert!((left_deer.inddens - right_deer.inddens).abs() < 1e-9);
        assert!((left_deer.bodyfat - right_deer.bodyfat).abs() < 1e-9);
    }

    #[test]
    fn mortality_merge_keeps_only_shared_factors() {
        let mut a = herbivore_data(1.0, 0.1, 0.0);
        a.mortality.insert(MortalityFactor::Background, 0.1);
        a.mortality.insert(MortalityFactor::Lifespan, 0.0);
        let mut b = herbivore_data(1.0, 0.1, 0.0);
        b.mortality.insert(MortalityFactor::Background, 0.3);

        a.merge(&b, 1.0, 1.0);
        assert_eq!(a.mortality.len(), 1);
        assert!((a.mortality[&MortalityFactor::Background] - 0.2).abs() < 1e-12);
    }

    #[test]
    fn zero_energy_content_does_not_dilute_the_average() {
        let mut a = herbivore_data(1.0, 0.1, 0.0);
        a.energy_content.set(ForageType::Grass, 4.0);
        let b = herbivore_data(1.0, 0.1, 0.0); // zero energy content
        a.merge(&b, 1.0, 1.0);
        assert!((a.energy_content.get(ForageType::Grass) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn aggregator_groups_by_aggregation_unit() {
        let mut aggregator = Aggregator::new();
        let data = CombinedData {
            datapoint_count: 1,
            ..CombinedData::default()
        };
        aggregator.add(Date::new(0, 0), "north", &data);
        aggregator.add(Date::new(0, 0), "south", &data);
        aggregator.add(Date::new(1, 0), "north", &data);

        let points = aggregator.retrieve();
        assert_eq!(points.len(), 2);
        let north = points
            .iter()
            .find(|dp| dp.aggregation_unit == "north")
            .unwrap();
        assert_eq!(north.data.datapoint_count, 2);
        assert_eq!(*north.interval.first(), Date::new(0, 0));
        assert_eq!(*north.interval.last(), Date::new(1, 0));

        assert!(aggregator.retrieve().is_empty());
    }
}
