//! Per-HFT containers of herbivores: establishment, offspring insertion,
//! and removal of the dead.

use std::sync::Arc;

use crate::herbivore::{Herbivore, HerbivoreKind, Sex};
use crate::hft::Hft;
use crate::parameters::HerbivoreType;

/// All herbivores of one functional type in one habitat, in stable
/// insertion order.
///
/// No two live cohorts of the same (age, sex) coexist: newborns merge into
/// an existing age-zero cohort.
pub struct Population {
    hft: Arc<Hft>,
    herbivore_type: HerbivoreType,
    /// Habitat area [km²]; relevant for individual mode only.
    habitat_area_km2: f64,
    list: Vec<Herbivore>,
    /// Fractional offspring counts carried over between days (individual
    /// mode), per sex.
    incomplete_offspring: [f64; 2],
}

impl Population {
    pub fn new(hft: Arc<Hft>, herbivore_type: HerbivoreType, habitat_area_km2: f64) -> Self {
        assert!(
            habitat_area_km2 > 0.0,
            "habitat area must be positive, got {habitat_area_km2}"
        );
        Self {
            hft,
            herbivore_type,
            habitat_area_km2,
            list: Vec::new(),
            incomplete_offspring: [0.0; 2],
        }
    }

    pub fn hft(&self) -> &Arc<Hft> {
        &self.hft
    }

    /// Seed the population at the HFT's establishment density, split 50:50
    /// between the sexes and evenly across the establishment age range.
    ///
    /// Panics on a non-empty population.
    pub fn establish(&mut self) {
        assert!(
            self.list.iter().all(|h| h.is_dead()),
            "cannot establish into a population with live members"
        );
        if self.hft.establishment.density == 0.0 {
            return;
        }
        let (youngest, oldest) = self.hft.establishment.age_range;
        match self.herbivore_type {
            HerbivoreType::Cohort => self.establish_cohorts(youngest, oldest),
            HerbivoreType::Individual => self.establish_individuals(youngest, oldest),
        }
    }

    fn establish_cohorts(&mut self, youngest: u16, oldest: u16) {
        // One male and one female cohort for each age class, established
        // with full fat reserves.
        let cohort_count = 2.0 * (oldest - youngest + 1) as f64;
        let cohort_density = self.hft.establishment.density / cohort_count;
        for age_years in youngest..=oldest {
            for sex in [Sex::Male, Sex::Female] {
                let kind = HerbivoreKind::Cohort {
                    ind_per_km2: cohort_density,
                };
                let herbivore = if age_years == 0 {
                    Herbivore::newborn(Arc::clone(&self.hft), sex, kind)
                } else {
                    Herbivore::with_age(
                        Arc::clone(&self.hft),
                        sex,
                        kind,
                        age_years as u32 * 365,
                        1.0,
                    )
                };
                self.list.push(herbivore);
            }
        }
    }

    fn establish_individuals(&mut self, youngest: u16, oldest: u16) {
        let ind_count =
            (self.hft.establishment.density * self.habitat_area_km2).ceil() as usize;
        let age_class_count = (oldest - youngest + 1) as usize;
        let per_age = ind_count / age_class_count;
        let mut remainder = ind_count % age_class_count;

        for age_years in youngest..=oldest {
            let mut count = per_age;
            if remainder > 0 {
                count += 1;
                remainder -= 1;
            }
            // Alternate the sexes for an even ratio.
            for i in 1..=count {
                let sex = if i % 2 == 0 { Sex::Female } else { Sex::Male };
                let kind = HerbivoreKind::Individual {
                    area_km2: self.habitat_area_km2,
                    dead: false,
                };
                let herbivore = if age_years == 0 {
                    Herbivore::newborn(Arc::clone(&self.hft), sex, kind)
                } else {
                    Herbivore::with_age(
                        Arc::clone(&self.hft),
                        sex,
                        kind,
                        age_years as u32 * 365,
                        1.0,
                    )
                };
                self.list.push(herbivore);
            }
        }
    }

    /// Insert today's newborns [ind/km²] at an even sex ratio, merging into
    /// an existing age-zero cohort when one exists.
    pub fn create_offspring(&mut self, ind_per_km2: f64) {
        assert!(
            ind_per_km2 >= 0.0,
            "offspring density must not be negative, got {ind_per_km2}"
        );
        if ind_per_km2 == 0.0 {
            return;
        }
        match self.herbivore_type {
            HerbivoreType::Cohort => {
                for sex in [Sex::Male, Sex::Female] {
                    self.create_offspring_cohort(sex, ind_per_km2 / 2.0);
                }
            }
            HerbivoreType::Individual => {
                for sex in [Sex::Male, Sex::Female] {
                    self.create_offspring_individuals(sex, ind_per_km2 / 2.0);
                }
            }
        }
    }

    fn create_offspring_cohort(&mut self, sex: Sex, ind_per_km2: f64) {
        let newborn = Herbivore::newborn(
            Arc::clone(&self.hft),
            sex,
            HerbivoreKind::Cohort { ind_per_km2 },
        );
        let existing = self
            .list
            .iter_mut()
            .find(|h| h.sex() == sex && h.age_days() == 0);
        match existing {
            Some(cohort) => cohort.merge(newborn),
            None => self.list.push(newborn),
        }
    }

    fn create_offspring_individuals(&mut self, sex: Sex, ind_per_km2: f64) {
        let slot = match sex {
            Sex::Male => 0,
            Sex::Female => 1,
        };
        // Convert density to a discrete count, carrying the remainder over
        // to the next day.
        let count_continuous =
            ind_per_km2 * self.habitat_area_km2 + self.incomplete_offspring[slot];
        let count = count_continuous.floor() as usize;
        self.incomplete_offspring[slot] = count_continuous - count as f64;
        for _ in 0..count {
            self.list.push(Herbivore::newborn(
                Arc::clone(&self.hft),
                sex,
                HerbivoreKind::Individual {
                    area_km2: self.habitat_area_km2,
                    dead: false,
                },
            ));
        }
    }

    /// Drop every herbivore that counts as dead.
    pub fn purge_dead(&mut self) {
        self.list.retain(|h| !h.is_dead());
    }

    /// Whether no live herbivore is left.
    pub fn is_extinct(&self) -> bool {
        self.list.iter().all(|h| h.is_dead())
    }

    /// All members, including dead ones awaiting purge, in insertion order.
    pub fn members(&self) -> &[Herbivore] {
        &self.list
    }

    pub fn members_mut(&mut self) -> &mut [Herbivore] {
        &mut self.list
    }

    /// Total individual density [ind/km²] of the live members.
    pub fn ind_per_km2(&self) -> f64 {
        self.list.iter().map(|h| h.ind_per_km2()).sum()
    }

    /// Total mass density [kg/km²] of the live members.
    pub fn kg_per_km2(&self) -> f64 {
        self.list.iter().map(|h| h.kg_per_km2()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn population(hft: Hft) -> Population {
        Population::new(Arc::new(hft), HerbivoreType::Cohort, 1.0)
    }

    fn test_hft() -> Hft {
        let mut hft = Hft::default();
        hft.mortality.factors.clear();
        hft.establishment.density = 10.0;
        hft.establishment.age_range = (1, 5);
        hft
    }

    #[test]
    fn establishment_splits_density_across_ages_and_sexes() {
        let mut population = population(test_hft());
        population.establish();

        // 5 age classes, two sexes each.
        assert_eq!(population.members().len(), 10);
        assert!((population.ind_per_km2() - 10.0).abs() < 1e-9);
        let females = population
            .members()
            .iter()
            .filter(|h| h.sex() == Sex::Female)
            .map(|h| h.ind_per_km2())
            .sum::<f64>();
        assert!((females - 5.0).abs() < 1e-9);
    }

    #[test]
    #[should_panic]
    fn establishing_twice_panics() {
        let mut population = population(test_hft());
        population.establish();
        population.establish();
    }

    #[test]
    fn offspring_merges_into_existing_age_zero_cohort() {
        let mut population = population(test_hft());
        population.create_offspring(1.0);
        assert_eq!(population.members().len(), 2);
        population.create_offspring(3.0);
        // Still one cohort per sex, now holding the summed density.
        assert_eq!(population.members().len(), 2);
        assert!((population.ind_per_km2() - 4.0).abs() < 1e-9);
    }

    #[test]
    fn equal_cohorts_merge_preserving_body_condition() {
        let hft = Arc::new(test_hft());
        let make = |density: f64| {
            Herbivore::with_age(
                Arc::clone(&hft),
                Sex::Female,
                HerbivoreKind::Cohort {
                    ind_per_km2: density,
                },
                3 * 365,
                1.0,
            )
        };
        let mut a = make(1.0);
        let condition_before = a.body_condition();
        a.merge(make(3.0));
        assert!((a.ind_per_km2() - 4.0).abs() < 1e-12);
        assert!((a.body_condition() - condition_before).abs() < 1e-12);
    }

    #[test]
    fn purge_removes_dead_members_only() {
        let mut population = population(test_hft());
        population.establish();
        let count_before = population.members().len();
        population.members_mut()[0].kill();
        population.members_mut()[3].kill();
        population.purge_dead();
        assert_eq!(population.members().len(), count_before - 2);
        assert!(!population.is_extinct());
    }

    #[test]
    fn extinction_after_killing_everything() {
        let mut population = population(test_hft());
        population.establish();
        for herbivore in population.members_mut() {
            herbivore.kill();
        }
        assert!(population.is_extinct());
        population.purge_dead();
        assert!(population.members().is_empty());
        assert!(population.is_extinct());
    }

    #[test]
    fn individual_offspring_accumulates_fractions() {
        let mut population = Population::new(
            Arc::new(test_hft()),
            HerbivoreType::Individual,
            1.0,
        );
        // Half an individual per sex per call: every second call yields one
        // discrete newborn per sex.
        population.create_offspring(1.0);
        assert_eq!(population.members().len(), 0);
        population.create_offspring(1.0);
        assert_eq!(population.members().len(), 2);
    }
}
