//! The herbivore agent: shared per-individual physiology with a tagged
//! variant selecting the density bookkeeping.
//!
//! All calculations run per individual. A [`HerbivoreKind::Cohort`] scales
//! them by its density; a [`HerbivoreKind::Individual`] represents one
//! discrete animal on a known habitat area.

use std::sync::Arc;

use rand::Rng;
use rand_chacha::ChaCha12Rng;
use serde::{Deserialize, Serialize};

use crate::average::PeriodAverage;
use crate::energetics::{
    conductance_bradley_deavers_1980, conductance_cuyler_oeritsland_2004, expenditure_taylor_1981,
    expenditure_zhu_et_al_2018, thermoregulatory_expenditure, FatmassEnergyBudget, FurSeason,
};
use crate::forage::{Digestibility, ForageMass};
use crate::foraging::ForageDemands;
use crate::habitat::{HabitatEnvironment, HabitatForage};
use crate::hft::{
    ConductanceModel, ExpenditureComponent, Hft, MortalityFactor, ReproductionModel,
};
use crate::mortality::{
    lifespan_mortality, starvation_threshold_mortality, BackgroundMortality,
    StarvationIlliusOConnor2000,
};
use crate::net_energy::net_energy_content;
use crate::nitrogen::{retention_time, NitrogenPool};
use crate::output::HerbivoreData;
use crate::reproduction::{
    BreedingSeason, ReproductionConstMax, ReproductionIlliusOConnor2000, ReproductionLinear,
};

/// The sex of a herbivore. Set at construction, immutable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sex {
    Female,
    Male,
}

/// Selects how a herbivore object tracks its numbers and dies.
#[derive(Clone, Debug, PartialEq)]
pub enum HerbivoreKind {
    /// A density of identical individuals [ind/km²]. Mortality scales the
    /// density down.
    Cohort { ind_per_km2: f64 },
    /// One discrete animal on `area_km2` of habitat. Mortality is a
    /// Bernoulli draw.
    Individual { area_km2: f64, dead: bool },
}

/// One herbivore agent (cohort or individual).
#[derive(Clone, Debug)]
pub struct Herbivore {
    hft: Arc<Hft>,
    sex: Sex,
    kind: HerbivoreKind,
    age_days: u32,
    energy_budget: FatmassEnergyBudget,
    nitrogen: NitrogenPool,
    /// Day of year; `None` until the first `simulate_day()` call.
    today: Option<u16>,
    environment: HabitatEnvironment,
    /// Body condition over the past gestation period (females only).
    body_condition_gestation: PeriodAverage,
    demands: ForageDemands,
    output: HerbivoreData,
}

impl Herbivore {
    /// Establishment constructor: an animal of the given age [days] with
    /// the given fat reserve as a fraction of its physiological maximum.
    ///
    /// Panics on `age_days == 0` (use [`Herbivore::newborn`]), on a body
    /// condition outside [0,1], and on an age beyond the lifespan if the
    /// lifespan mortality factor is selected.
    pub fn with_age(
        hft: Arc<Hft>,
        sex: Sex,
        kind: HerbivoreKind,
        age_days: u32,
        body_condition: f64,
    ) -> Self {
        assert!(
            age_days > 0,
            "the establishment constructor needs age_days > 0; use Herbivore::newborn()"
        );
        assert!(
            (0.0..=1.0).contains(&body_condition),
            "body condition must be within [0,1], got {body_condition}"
        );
        if hft.mortality.factors.contains(&MortalityFactor::Lifespan) {
            assert!(
                age_days <= hft.life_history.lifespan as u32 * 365,
                "age_days ({age_days}) exceeds the lifespan of HFT \"{}\"",
                hft.name
            );
        }
        check_kind(&kind);

        let max_fatmass =
            potential_body_mass(&hft, sex, age_days) * hft.body_fat.maximum;
        let gestation_days = (hft.reproduction.gestation_months as usize * 30).max(1);
        Self {
            energy_budget: FatmassEnergyBudget::new(body_condition * max_fatmass, max_fatmass),
            body_condition_gestation: PeriodAverage::new(gestation_days),
            hft,
            sex,
            kind,
            age_days,
            nitrogen: NitrogenPool::new(),
            today: None,
            environment: HabitatEnvironment::default(),
            demands: ForageDemands::new(),
            output: HerbivoreData::default(),
        }
    }

    /// Birth constructor: age zero, fat reserves at the birth fat fraction.
    pub fn newborn(hft: Arc<Hft>, sex: Sex, kind: HerbivoreKind) -> Self {
        check_kind(&kind);
        let max_fatmass = potential_body_mass(&hft, sex, 0) * hft.body_fat.maximum;
        let birth_fatmass = (hft.body_fat.birth * hft.body_mass.birth).min(max_fatmass);
        let gestation_days = (hft.reproduction.gestation_months as usize * 30).max(1);
        Self {
            energy_budget: FatmassEnergyBudget::new(birth_fatmass, max_fatmass),
            body_condition_gestation: PeriodAverage::new(gestation_days),
            hft,
            sex,
            kind,
            age_days: 0,
            nitrogen: NitrogenPool::new(),
            today: None,
            environment: HabitatEnvironment::default(),
            demands: ForageDemands::new(),
            output: HerbivoreData::default(),
        }
    }

    pub fn hft(&self) -> &Arc<Hft> {
        &self.hft
    }

    pub fn sex(&self) -> Sex {
        self.sex
    }

    pub fn kind(&self) -> &HerbivoreKind {
        &self.kind
    }

    pub fn age_days(&self) -> u32 {
        self.age_days
    }

    pub fn age_years(&self) -> f64 {
        self.age_days as f64 / 365.0
    }

    /// Individual density [ind/km²]. One individual contributes
    /// `1 / area_km2` while alive.
    pub fn ind_per_km2(&self) -> f64 {
        match &self.kind {
            HerbivoreKind::Cohort { ind_per_km2 } => *ind_per_km2,
            HerbivoreKind::Individual { area_km2, dead } => {
                if *dead {
                    0.0
                } else {
                    1.0 / area_km2
                }
            }
        }
    }

    /// Mass density [kg/km²].
    pub fn kg_per_km2(&self) -> f64 {
        self.body_mass() * self.ind_per_km2()
    }

    /// A cohort is dead below the HFT's minimum density threshold; an
    /// individual carries a discrete flag.
    pub fn is_dead(&self) -> bool {
        match &self.kind {
            HerbivoreKind::Cohort { ind_per_km2 } => {
                *ind_per_km2 <= 0.0
                    || *ind_per_km2 < self.hft.mortality.minimum_density_threshold
            }
            HerbivoreKind::Individual { dead, .. } => *dead,
        }
    }

    pub fn kill(&mut self) {
        match &mut self.kind {
            HerbivoreKind::Cohort { ind_per_km2 } => *ind_per_km2 = 0.0,
            HerbivoreKind::Individual { dead, .. } => *dead = true,
        }
    }

    /// Current fat mass [kg/ind].
    pub fn fatmass(&self) -> f64 {
        self.energy_budget.fatmass()
    }

    /// Physiological maximum fat mass [kg/ind].
    pub fn max_fatmass(&self) -> f64 {
        self.potential_body_mass() * self.hft.body_fat.maximum
    }

    /// Proportional body fat: fat mass per live body mass.
    pub fn bodyfat(&self) -> f64 {
        self.fatmass() / self.body_mass()
    }

    /// Body condition: fat mass per maximum fat mass.
    pub fn body_condition(&self) -> f64 {
        (self.fatmass() / self.max_fatmass()).clamp(0.0, 1.0)
    }

    /// Live body mass [kg/ind].
    pub fn body_mass(&self) -> f64 {
        self.lean_body_mass() + self.fatmass()
    }

    /// Fat-free body mass [kg/ind].
    pub fn lean_body_mass(&self) -> f64 {
        self.potential_body_mass() * (1.0 - self.hft.body_fat.maximum)
    }

    /// The maximum body mass [kg/ind] with full fat reserves, interpolating
    /// linearly from birth to physical maturity.
    pub fn potential_body_mass(&self) -> f64 {
        potential_body_mass(&self.hft, self.sex, self.age_days)
    }

    /// Adult body mass [kg/ind] for this sex.
    pub fn body_mass_adult(&self) -> f64 {
        self.hft.adult_body_mass(self.sex == Sex::Male)
    }

    /// Whole-body conductance [W/°C] under the selected model.
    pub fn conductance(&self) -> f64 {
        match self.hft.thermoregulation.conductance {
            ConductanceModel::BradleyDeavers1980 => {
                conductance_bradley_deavers_1980(self.body_mass())
            }
            // Currently always winter fur.
            ConductanceModel::CuylerOeritsland2004 => {
                conductance_cuyler_oeritsland_2004(self.body_mass(), FurSeason::Winter)
            }
        }
    }

    /// Day of year as set by the last `simulate_day()` call.
    ///
    /// Panics before the first call.
    pub fn today(&self) -> u16 {
        self.today
            .expect("herbivore day not initialized; simulate_day() must be called first")
    }

    /// Today's output record.
    pub fn todays_output(&self) -> &HerbivoreData {
        &self.output
    }

    pub fn energy_budget(&self) -> &FatmassEnergyBudget {
        &self.energy_budget
    }

    /// Simulate one day; returns the offspring produced today [ind/km²].
    ///
    /// Must not be called on a dead herbivore. `rng` backs the stochastic
    /// mortality of individuals; cohort mortality is deterministic.
    pub fn simulate_day(
        &mut self,
        day: u16,
        environment: &HabitatEnvironment,
        rng: &mut ChaCha12Rng,
    ) -> f64 {
        assert!(day < 365, "day must be within [0,364], got {day}");
        assert!(
            !self.is_dead(),
            "simulate_day() must not be called on a dead herbivore"
        );
        self.environment = *environment;

        // Digest yesterday's nitrogen with a retention time derived from
        // body mass.
        self.nitrogen
            .digest_today(retention_time(self.body_mass()), self.kg_per_km2());

        self.today = Some(day);
        self.age_days += 1;

        if self.sex == Sex::Female {
            let condition = self.body_condition();
            self.body_condition_gestation.add_value(condition);
        }

        let max_fatmass = self.max_fatmass();
        let max_gain = self.hft.body_fat.maximum_daily_gain * self.body_mass();
        self.energy_budget.set_max_fatmass(max_fatmass, max_gain);

        self.output.reset();
        self.output.age_years = self.age_years();
        self.output.bodyfat = self.bodyfat();
        self.output.bound_nitrogen = self.nitrogen.unavailable();
        self.output.inddens = self.ind_per_km2();
        self.output.massdens = self.kg_per_km2();

        // Cover needs carried over from yesterday out of the fat reserves.
        self.energy_budget.catabolize_fat();

        let expenditure = self.todays_expenditure();
        self.energy_budget.add_energy_needs(expenditure);
        self.output.expenditure = expenditure;

        let offspring = self.todays_offspring_proportion() * self.ind_per_km2();
        self.output.offspring = offspring;

        self.apply_mortality_factors(rng);

        offspring
    }

    /// Consume the allocated forage [kgDM/km²] with the given digestibility
    /// and the nitrogen carried by it [kgN/km²].
    ///
    /// The allocation must not exceed today's previously computed demand;
    /// a violation is a logic error in the feeding pipeline.
    pub fn eat(
        &mut self,
        kg_per_km2: &ForageMass,
        digestibility: &Digestibility,
        nitrogen_kg_per_km2: &ForageMass,
    ) {
        let ind_per_km2 = self.ind_per_km2();
        assert!(
            ind_per_km2 > 0.0,
            "herbivore without individuals cannot be fed"
        );
        let body_mass = self.body_mass();
        let kg_per_ind = *kg_per_km2 / ind_per_km2;
        let nitrogen_per_ind = *nitrogen_kg_per_km2 / ind_per_km2;

        // Net energy in the eaten forage [MJ/ind].
        let energy_content = net_energy_content(
            self.hft.foraging.net_energy_model,
            self.hft.digestion.digestion_type,
            digestibility,
        );
        let mj_per_ind = kg_per_ind * &energy_content;

        // Deduct from today's remaining intake capacity; this also checks
        // the ingestion constraints.
        self.demands.record_eaten(&kg_per_ind);

        self.energy_budget.metabolize_energy(mj_per_ind.sum());

        self.output.eaten_forage_per_ind += &kg_per_ind;
        self.output.eaten_forage_per_mass += &(kg_per_ind / body_mass);
        self.output.energy_intake_per_ind += &mj_per_ind;
        self.output.energy_intake_per_mass += &(mj_per_ind / body_mass);
        self.output.eaten_nitrogen_per_ind += nitrogen_per_ind.sum();

        self.nitrogen.ingest(nitrogen_per_ind.sum() * ind_per_km2);
    }

    /// The cohort's offered demand for today [kgDM/km²], memoized per day.
    pub fn get_forage_demands(&mut self, available_forage: &HabitatForage) -> ForageMass {
        if self.is_dead() {
            return ForageMass::default();
        }
        let today = self.today();
        if !self.demands.is_day_initialized(today) {
            let energy_content = net_energy_content(
                self.hft.foraging.net_energy_model,
                self.hft.digestion.digestion_type,
                &available_forage.digestibility(),
            );
            let body_mass = self.body_mass();
            let body_mass_adult = self.body_mass_adult();
            let hft = Arc::clone(&self.hft);
            self.demands.init_today(
                today,
                available_forage,
                &energy_content,
                body_mass,
                body_mass_adult,
                &hft,
            );
            self.output.energy_content = energy_content;
        }

        // Energy demand for expenditure plus today's possible fat anabolism.
        let energy_demand =
            self.energy_budget.energy_needs() + self.energy_budget.max_anabolism_per_day();
        self.demands.demand(energy_demand) * self.ind_per_km2()
    }

    /// Nitrogen to return to the habitat [kgN/km²]. A dead herbivore
    /// releases everything, including tissue nitrogen.
    pub fn take_nitrogen_excreta(&mut self) -> f64 {
        if self.is_dead() {
            self.nitrogen.reset_total()
        } else {
            self.nitrogen.reset_excreta()
        }
    }

    /// Merge another cohort of the same HFT, sex, and age into this one by
    /// density-weighted averaging; the other cohort is consumed.
    ///
    /// Panics for individuals and for non-mergeable cohorts.
    pub fn merge(&mut self, other: Herbivore) {
        assert_eq!(
            self.hft.name, other.hft.name,
            "cannot merge cohorts of different HFTs"
        );
        assert_eq!(self.sex, other.sex, "cannot merge cohorts of different sex");
        assert_eq!(
            self.age_days, other.age_days,
            "cannot merge cohorts of different age"
        );
        let (self_density, other_density) = match (&self.kind, &other.kind) {
            (
                HerbivoreKind::Cohort { ind_per_km2: a },
                HerbivoreKind::Cohort { ind_per_km2: b },
            ) => (*a, *b),
            _ => panic!("only cohorts can be merged"),
        };

        if self_density + other_density > 0.0 {
            self.energy_budget
                .merge(&other.energy_budget, self_density, other_density);
        }
        self.nitrogen.merge(&other.nitrogen);
        self.kind = HerbivoreKind::Cohort {
            ind_per_km2: self_density + other_density,
        };
    }

    /// Today's energy needs [MJ/ind/day] as the sum of the selected
    /// expenditure components.
    fn todays_expenditure(&self) -> f64 {
        let mut result = 0.0;
        let mut add_thermoregulation = false;
        for component in &self.hft.expenditure.components {
            match component {
                ExpenditureComponent::Allometric => {
                    result += self.hft.expenditure.allometric.calc(self.body_mass());
                }
                ExpenditureComponent::Taylor1981 => {
                    result += expenditure_taylor_1981(self.body_mass(), self.body_mass_adult());
                }
                ExpenditureComponent::Zhu2018 => {
                    result += expenditure_zhu_et_al_2018(
                        self.body_mass(),
                        self.environment.air_temperature,
                    );
                }
                ExpenditureComponent::Thermoregulation => add_thermoregulation = true,
            }
        }
        // Thermoregulation comes on top: all other energy burning already
        // heats the body passively.
        if add_thermoregulation {
            result += thermoregulatory_expenditure(
                result,
                self.conductance(),
                self.hft.thermoregulation.core_temperature,
                self.environment.air_temperature,
            );
        }
        debug_assert!(result >= 0.0);
        result
    }

    /// Offspring per individual today [ind/ind/day]. Zero for males and for
    /// females below sexual maturity.
    fn todays_offspring_proportion(&self) -> f64 {
        if self.sex == Sex::Male
            || self.age_years() < self.hft.life_history.sexual_maturity as f64
        {
            return 0.0;
        }
        let season = BreedingSeason::new(
            self.hft.breeding_season.start,
            self.hft.breeding_season.length,
        );
        let condition = self.body_condition_gestation.get_average();
        match self.hft.reproduction.model {
            ReproductionModel::None => 0.0,
            ReproductionModel::ConstantMaximum => {
                ReproductionConstMax::new(season, self.hft.reproduction.annual_maximum)
                    .offspring_density(self.today())
            }
            ReproductionModel::Linear => {
                ReproductionLinear::new(season, self.hft.reproduction.annual_maximum)
                    .offspring_density(self.today(), condition)
            }
            ReproductionModel::IlliusOConnor2000 => {
                ReproductionIlliusOConnor2000::new(season, self.hft.reproduction.annual_maximum)
                    .offspring_density(self.today(), condition)
            }
        }
    }

    /// Sum all selected mortality factors, record them in the output, and
    /// apply the total.
    fn apply_mortality_factors(&mut self, rng: &mut ChaCha12Rng) {
        let mut mortality_sum = 0.0;
        let factors = self.hft.mortality.factors.clone();
        for factor in &factors {
            let mortality = match factor {
                MortalityFactor::Background => BackgroundMortality::new(
                    self.hft.mortality.juvenile_rate,
                    self.hft.mortality.adult_rate,
                )
                .rate(self.age_days),
                MortalityFactor::Lifespan => {
                    lifespan_mortality(self.hft.life_history.lifespan, self.age_days)
                }
                MortalityFactor::StarvationThreshold => {
                    starvation_threshold_mortality(self.bodyfat().clamp(0.0, 1.0))
                }
                MortalityFactor::StarvationIlliusOConnor2000 => {
                    // No body fat variation in the first year of life, so
                    // that low birth fat creates no artificial deaths.
                    let deviation = if self.age_years() >= 1.0 {
                        self.hft.body_fat.deviation
                    } else {
                        0.0
                    };
                    let model = StarvationIlliusOConnor2000::new(
                        deviation,
                        self.hft.mortality.shift_body_condition_for_starvation,
                    );
                    let condition = self.body_condition();
                    let (mortality, new_condition) = model.mortality(condition);
                    if new_condition != condition {
                        self.energy_budget.force_body_condition(new_condition);
                    }
                    mortality
                }
            };
            mortality_sum += mortality;
            self.output.mortality.insert(*factor, mortality);
        }
        self.apply_mortality(mortality_sum.min(1.0), rng);
    }

    /// Apply a fractional mortality [0,1] according to the variant.
    fn apply_mortality(&mut self, mortality: f64, rng: &mut ChaCha12Rng) {
        assert!(
            (0.0..=1.0).contains(&mortality),
            "mortality must be within [0,1], got {mortality}"
        );
        match &mut self.kind {
            HerbivoreKind::Cohort { ind_per_km2 } => {
                *ind_per_km2 = (*ind_per_km2 * (1.0 - mortality)).max(0.0);
            }
            HerbivoreKind::Individual { dead, .. } => {
                if mortality == 1.0 || (mortality > 0.0 && rng.random::<f64>() < mortality) {
                    *dead = true;
                }
            }
        }
    }
}

fn check_kind(kind: &HerbivoreKind) {
    match kind {
        HerbivoreKind::Cohort { ind_per_km2 } => {
            assert!(
                *ind_per_km2 >= 0.0 && ind_per_km2.is_finite(),
                "cohort density must be finite and not negative, got {ind_per_km2}"
            );
        }
        HerbivoreKind::Individual { area_km2, .. } => {
            assert!(
                *area_km2 > 0.0 && area_km2.is_finite(),
                "habitat area must be finite and positive, got {area_km2}"
            );
        }
    }
}

/// Potential (maximum) body mass [kg/ind] with full fat reserves,
/// interpolating linearly from birth to adult mass over the physical
/// maturity age.
fn potential_body_mass(hft: &Hft, sex: Sex, age_days: u32) -> f64 {
    let maturity_years = match sex {
        Sex::Male => hft.life_history.physical_maturity_male,
        Sex::Female => hft.life_history.physical_maturity_female,
    } as f64;
    let adult = hft.adult_body_mass(sex == Sex::Male);
    if age_days as f64 / 365.0 >= maturity_years {
        return adult;
    }
    // Potential full mass at birth, derived from the lean birth mass.
    let birth_lean = hft.body_mass.birth * (1.0 - hft.body_fat.birth);
    debug_assert!(1.0 - hft.body_fat.maximum > 0.0);
    let birth_potential = birth_lean / (1.0 - hft.body_fat.maximum);

    let fraction = age_days as f64 / (maturity_years * 365.0);
    birth_potential + fraction * (adult - birth_potential)
}
