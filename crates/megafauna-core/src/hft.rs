//! Herbivore functional types: the immutable parameter bundle defining a
//! species-like group, shared by reference across all of its populations.

use serde::{Deserialize, Serialize};

use crate::error::MegafaunaError;

/// How the herbivore ferments its forage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DigestionType {
    Ruminant,
    Hindgut,
}

/// Algorithm for the daily digestive capacity of a herbivore.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DigestiveLimit {
    /// No digestive limit.
    None,
    /// Dry matter intake limited to `coefficient * M^exponent`.
    Allometric,
    /// Dry matter intake limited to a fixed fraction of body mass.
    FixedFraction,
    /// Energy intake limited by gut size and retention time after
    /// Illius & Gordon (1992).
    IlliusGordon1992,
}

/// A factor limiting the daily forage harvest, independent of digestion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ForagingLimit {
    /// Holling type II functional response on the grass sward density; an
    /// artificial smooth feedback from forage to intake.
    GeneralFunctionalResponse,
    /// Functional response toward the digestive limit, on whole-habitat
    /// grass density, after Illius & O'Connor (2000).
    IlliusOConnor2000,
}

/// How forage net energy content is calculated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetEnergyModel {
    /// Metabolizable energy from digestibility, net energy after
    /// Illius & Gordon (1992).
    Default,
}

/// One additive component of daily energy expenditure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ExpenditureComponent {
    /// `coefficient * M^exponent`.
    Allometric,
    /// Cattle-derived field metabolic rate, Taylor et al. (1981).
    Taylor1981,
    /// Temperature-dependent field metabolic rate, Zhu et al. (2018).
    Zhu2018,
    /// Heat loss below the lower critical ambient temperature.
    Thermoregulation,
}

/// Algorithm for whole-body conductance in thermoregulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConductanceModel {
    /// Allometric formula from data by Bradley & Deavers (1980).
    BradleyDeavers1980,
    /// Extrapolation from reindeer winter fur, Cuyler & Øritsland (2004).
    CuylerOeritsland2004,
}

/// Algorithm for herbivore reproduction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReproductionModel {
    /// No reproduction. Also disables the juvenile growth phase.
    None,
    /// Constant maximum rate across the breeding season.
    ConstantMaximum,
    /// Rate proportional to body condition.
    Linear,
    /// Logistic response to body condition, Illius & O'Connor (2000).
    IlliusOConnor2000,
}

/// One way a herbivore can die. Factors apply independently and are summed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MortalityFactor {
    /// Constant background mortality, split juvenile/adult.
    Background,
    /// Death when the maximum age is reached.
    Lifespan,
    /// Starvation of the normal-distribution tail below zero body
    /// condition, Illius & O'Connor (2000).
    StarvationIlliusOConnor2000,
    /// Death when body fat drops below a fixed threshold.
    StarvationThreshold,
}

/// How the herbivore composes its diet from the forage types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DietComposer {
    /// Eat exclusively grass.
    PureGrazer,
}

/// Coefficient and exponent for an allometric relationship `x = c * M^e`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Allometry {
    pub coefficient: f64,
    pub exponent: f64,
}

impl Allometry {
    pub fn calc(&self, bodymass: f64) -> f64 {
        self.coefficient * bodymass.powf(self.exponent)
    }
}

/// Body fat parameters [kg fat / kg body mass].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BodyFatParams {
    /// Proportional fat mass at birth.
    pub birth: f64,
    /// Maximum proportional fat mass.
    pub maximum: f64,
    /// Maximum fat gain [kg fat per kg body mass per day]; zero = no limit.
    pub maximum_daily_gain: f64,
    /// Standard deviation of body condition within a cohort, for the
    /// starvation model. Zero for juveniles regardless of this value.
    pub deviation: f64,
}

/// Live body mass [kg/ind].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BodyMassParams {
    /// Body mass at birth, both sexes.
    pub birth: f64,
    /// Adult female body mass.
    pub female: f64,
    /// Adult male body mass.
    pub male: f64,
}

/// The yearly window in which parturition occurs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BreedingSeasonParams {
    /// Julian day of the season start (0 = Jan 1st).
    pub start: u16,
    /// Length in days [1, 365].
    pub length: u16,
}

/// Digestion-related parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DigestionParams {
    #[serde(rename = "type")]
    pub digestion_type: DigestionType,
    pub limit: DigestiveLimit,
    /// Parameters for [`DigestiveLimit::Allometric`].
    pub allometric: Allometry,
    /// Daily dry matter intake per kg body mass for
    /// [`DigestiveLimit::FixedFraction`].
    pub fixed_fraction: f64,
}

/// Spawning new herbivores in an empty habitat.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EstablishmentParams {
    /// Total population density for establishment in one habitat [ind/km²].
    pub density: f64,
    /// Youngest and oldest age [years] of the establishment cohorts.
    pub age_range: (u16, u16),
}

/// Energy expenditure parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExpenditureParams {
    /// Components summing up to the daily expenditure.
    pub components: Vec<ExpenditureComponent>,
    /// Parameters for [`ExpenditureComponent::Allometric`].
    pub allometric: Allometry,
}

/// Parameters regulating food intake.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ForagingParams {
    pub diet_composer: DietComposer,
    /// Constraints for the daily forage harvest.
    pub limits: Vec<ForagingLimit>,
    /// Grass density [gDM/m²] where the intake rate is half its maximum.
    pub half_max_intake_density: f64,
    pub net_energy_model: NetEnergyModel,
}

/// Life stages of the herbivores [years].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LifeHistoryParams {
    /// Maximum age.
    pub lifespan: u16,
    /// Age of physical maturity of females.
    pub physical_maturity_female: u16,
    /// Age of physical maturity of males.
    pub physical_maturity_male: u16,
    /// Age of female sexual maturity.
    pub sexual_maturity: u16,
}

/// Parameters defining death of herbivores.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MortalityParams {
    pub factors: Vec<MortalityFactor>,
    /// Annual background mortality after the first year of life [0,1).
    pub adult_rate: f64,
    /// Annual background mortality in the first year of life [0,1).
    pub juvenile_rate: f64,
    /// Density [ind/km²] below which one cohort counts as dead.
    pub minimum_density_threshold: f64,
    /// Whether starvation mortality shifts the surviving cohort's mean body
    /// condition upward.
    pub shift_body_condition_for_starvation: bool,
}

/// Parameters for annual reproduction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReproductionParams {
    pub model: ReproductionModel,
    /// Maximum offspring count per female per year.
    pub annual_maximum: f64,
    /// Duration of pregnancy [months].
    pub gestation_months: u16,
}

/// Expenditure through heat loss.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ThermoregulationParams {
    pub conductance: ConductanceModel,
    /// Body core temperature [°C].
    pub core_temperature: f64,
}

/// One herbivore functional type (i.e. one species).
///
/// Field and sub-struct names spell the keys of the TOML instruction file;
/// each sub-struct corresponds to one TOML table. Instances are immutable
/// after validation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Hft {
    /// Unique name of the herbivore type.
    pub name: String,
    pub body_fat: BodyFatParams,
    pub body_mass: BodyMassParams,
    pub breeding_season: BreedingSeasonParams,
    pub digestion: DigestionParams,
    pub establishment: EstablishmentParams,
    pub expenditure: ExpenditureParams,
    pub foraging: ForagingParams,
    pub life_history: LifeHistoryParams,
    pub mortality: MortalityParams,
    pub reproduction: ReproductionParams,
    pub thermoregulation: ThermoregulationParams,
}

impl Default for Hft {
    /// Plausible values for a medium-sized wild ungulate; valid as a whole.
    fn default() -> Self {
        Self {
            name: "example".to_string(),
            body_fat: BodyFatParams {
                birth: 0.2,
                maximum: 0.25,
                maximum_daily_gain: 0.05,
                deviation: 0.125,
            },
            body_mass: BodyMassParams {
                birth: 5.0,
                female: 50.0,
                male: 70.0,
            },
            breeding_season: BreedingSeasonParams {
                start: 121,
                length: 30,
            },
            digestion: DigestionParams {
                digestion_type: DigestionType::Ruminant,
                limit: DigestiveLimit::FixedFraction,
                allometric: Allometry {
                    coefficient: 0.05,
                    exponent: 0.75,
                },
                fixed_fraction: 0.05,
            },
            establishment: EstablishmentParams {
                density: 1.0,
                age_range: (1, 15),
            },
            expenditure: ExpenditureParams {
                components: vec![ExpenditureComponent::Taylor1981],
                allometric: Allometry {
                    coefficient: 0.4,
                    exponent: 0.75,
                },
            },
            foraging: ForagingParams {
                diet_composer: DietComposer::PureGrazer,
                limits: Vec::new(),
                half_max_intake_density: 20.0,
                net_energy_model: NetEnergyModel::Default,
            },
            life_history: LifeHistoryParams {
                lifespan: 16,
                physical_maturity_female: 3,
                physical_maturity_male: 3,
                sexual_maturity: 2,
            },
            mortality: MortalityParams {
                factors: vec![
                    MortalityFactor::Background,
                    MortalityFactor::Lifespan,
                    MortalityFactor::StarvationIlliusOConnor2000,
                ],
                adult_rate: 0.1,
                juvenile_rate: 0.3,
                minimum_density_threshold: 1e-4,
                shift_body_condition_for_starvation: true,
            },
            reproduction: ReproductionParams {
                model: ReproductionModel::ConstantMaximum,
                annual_maximum: 1.0,
                gestation_months: 9,
            },
            thermoregulation: ThermoregulationParams {
                conductance: ConductanceModel::BradleyDeavers1980,
                core_temperature: 38.0,
            },
        }
    }
}

impl Hft {
    /// Check all parameters for consistency.
    pub fn validate(&self) -> Result<(), MegafaunaError> {
        let fail = |reason: String| {
            Err(MegafaunaError::InvalidHft {
                hft: self.name.clone(),
                reason,
            })
        };

        if self.name.is_empty() {
            return fail("the HFT name must not be empty".into());
        }
        if !(self.body_fat.birth > 0.0 && self.body_fat.birth <= self.body_fat.maximum) {
            return fail(format!(
                "body_fat.birth ({}) must be positive and not exceed body_fat.maximum ({})",
                self.body_fat.birth, self.body_fat.maximum
            ));
        }
        if !(self.body_fat.maximum > 0.0 && self.body_fat.maximum < 1.0) {
            return fail(format!(
                "body_fat.maximum must be within (0,1), got {}",
                self.body_fat.maximum
            ));
        }
        if self.body_fat.maximum_daily_gain < 0.0 {
            return fail("body_fat.maximum_daily_gain must not be negative".into());
        }
        if !(0.0..=1.0).contains(&self.body_fat.deviation) {
            return fail(format!(
                "body_fat.deviation must be within [0,1], got {}",
                self.body_fat.deviation
            ));
        }
        if !(self.body_mass.birth > 0.0
            && self.body_mass.birth <= self.body_mass.female
            && self.body_mass.birth <= self.body_mass.male)
        {
            return fail("body_mass.birth must be positive and below the adult masses".into());
        }
        if self.body_mass.female <= 0.0 || self.body_mass.male <= 0.0 {
            return fail("adult body masses must be positive".into());
        }
        // The growth curve interpolates from the potential mass at birth up
        // to the adult mass; it must not run backwards.
        let birth_potential =
            self.body_mass.birth * (1.0 - self.body_fat.birth) / (1.0 - self.body_fat.maximum);
        if birth_potential > self.body_mass.female.min(self.body_mass.male) {
            return fail(format!(
                "the potential body mass at birth ({birth_potential:.1} kg) exceeds the adult \
                 body mass"
            ));
        }
        if self.breeding_season.start >= 365 {
            return fail(format!(
                "breeding_season.start must be within [0,364], got {}",
                self.breeding_season.start
            ));
        }
        if !(1..=365).contains(&self.breeding_season.length) {
            return fail(format!(
                "breeding_season.length must be within [1,365], got {}",
                self.breeding_season.length
            ));
        }
        if self.digestion.limit == DigestiveLimit::FixedFraction
            && !(self.digestion.fixed_fraction > 0.0 && self.digestion.fixed_fraction < 1.0)
        {
            return fail(format!(
                "digestion.fixed_fraction must be within (0,1), got {}",
                self.digestion.fixed_fraction
            ));
        }
        if self.digestion.limit == DigestiveLimit::Allometric
            && self.digestion.allometric.coefficient <= 0.0
        {
            return fail("digestion.allometric.coefficient must be positive".into());
        }
        if self.digestion.limit == DigestiveLimit::IlliusGordon1992
            && self.foraging.diet_composer != DietComposer::PureGrazer
        {
            return fail(
                "digestion.limit \"IlliusGordon1992\" works only for pure grazers".into(),
            );
        }
        if self.establishment.density < 0.0 {
            return fail("establishment.density must not be negative".into());
        }
        if self.establishment.age_range.0 > self.establishment.age_range.1 {
            return fail(format!(
                "establishment.age_range must be ordered, got ({}, {})",
                self.establishment.age_range.0, self.establishment.age_range.1
            ));
        }
        if self.establishment.age_range.1 > self.life_history.lifespan {
            return fail("establishment.age_range exceeds the lifespan".into());
        }
        if self.expenditure.components.is_empty() {
            return fail("expenditure.components must not be empty".into());
        }
        if self
            .expenditure
            .components
            .contains(&ExpenditureComponent::Allometric)
            && self.expenditure.allometric.coefficient <= 0.0
        {
            return fail("expenditure.allometric.coefficient must be positive".into());
        }
        if self.expenditure.components == [ExpenditureComponent::Thermoregulation] {
            return fail(
                "expenditure.components must contain a thermoneutral component besides \
                 \"Thermoregulation\""
                    .into(),
            );
        }
        if !self.foraging.limits.is_empty() && self.foraging.half_max_intake_density <= 0.0 {
            return fail(format!(
                "foraging.half_max_intake_density must be positive, got {}",
                self.foraging.half_max_intake_density
            ));
        }
        if self
            .foraging
            .limits
            .contains(&ForagingLimit::IlliusOConnor2000)
            && self.foraging.diet_composer != DietComposer::PureGrazer
        {
            return fail(
                "foraging limit \"IlliusOConnor2000\" works only for pure grazers".into(),
            );
        }
        if self.life_history.lifespan == 0 {
            return fail("life_history.lifespan must be at least one year".into());
        }
        if self.life_history.physical_maturity_female == 0
            || self.life_history.physical_maturity_male == 0
        {
            return fail("physical maturity must be at least one year".into());
        }
        if self.life_history.physical_maturity_female >= self.life_history.lifespan
            || self.life_history.physical_maturity_male >= self.life_history.lifespan
            || self.life_history.sexual_maturity >= self.life_history.lifespan
        {
            return fail("maturity ages must lie below the lifespan".into());
        }
        for (key, rate) in [
            ("mortality.adult_rate", self.mortality.adult_rate),
            ("mortality.juvenile_rate", self.mortality.juvenile_rate),
        ] {
            if !(0.0..1.0).contains(&rate) {
                return fail(format!("{key} must be within [0,1), got {rate}"));
            }
        }
        if self.mortality.minimum_density_threshold < 0.0 {
            return fail("mortality.minimum_density_threshold must not be negative".into());
        }
        if self.reproduction.annual_maximum < 0.0 {
            return fail("reproduction.annual_maximum must not be negative".into());
        }
        if self.reproduction.model != ReproductionModel::None
            && self.reproduction.gestation_months == 0
        {
            return fail("reproduction.gestation_months must be at least one month".into());
        }
        if self.thermoregulation.core_temperature <= 0.0 {
            return fail("thermoregulation.core_temperature must be positive".into());
        }
        Ok(())
    }

    /// Body mass [kg/ind] of an adult of the given sex.
    pub fn adult_body_mass(&self, male: bool) -> f64 {
        if male {
            self.body_mass.male
        } else {
            self.body_mass.female
        }
    }
}
