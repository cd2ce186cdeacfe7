//! Energy accounting of one herbivore: fat reserves, expenditure components,
//! and thermoregulation.

use crate::average::average;

/// Gross (combustion) energy of body fat [MJ/kg].
const FAT_GROSS_ENERGY: f64 = 39.3;

/// Efficiency of converting fat gross energy to net energy on catabolism.
const CATABOLISM_EFFICIENCY: f64 = 0.8;

/// Net energy released per kg of burned fat [MJ/kg].
pub const FACTOR_CATABOLISM: f64 = FAT_GROSS_ENERGY * CATABOLISM_EFFICIENCY;

/// Net energy required to deposit one kg of fat [MJ/kg]. Higher than
/// [`FACTOR_CATABOLISM`]: the difference is lost as heat increment.
pub const FACTOR_ANABOLISM: f64 = 54.6;

/// A herbivore's energy budget with fat reserves.
///
/// Terminology:
/// - Anabolism  = build up fat mass
/// - Catabolism = burn fat mass
/// - Metabolism = burn food energy directly and use surplus for anabolism
#[derive(Clone, Debug, PartialEq)]
pub struct FatmassEnergyBudget {
    energy_needs: f64,      // MJ/ind
    fatmass: f64,           // kg/ind
    max_fatmass: f64,       // kg/ind
    max_fatmass_gain: f64,  // kg/ind/day, 0.0 = no limit
}

impl FatmassEnergyBudget {
    /// Panics unless `0 <= initial_fatmass <= maximum_fatmass` and
    /// `maximum_fatmass > 0`.
    pub fn new(initial_fatmass: f64, maximum_fatmass: f64) -> Self {
        assert!(
            initial_fatmass >= 0.0,
            "initial fat mass must not be negative, got {initial_fatmass}"
        );
        assert!(
            maximum_fatmass > 0.0,
            "maximum fat mass must be positive, got {maximum_fatmass}"
        );
        assert!(
            initial_fatmass <= maximum_fatmass,
            "initial fat mass ({initial_fatmass}) exceeds maximum ({maximum_fatmass})"
        );
        Self {
            energy_needs: 0.0,
            fatmass: initial_fatmass,
            max_fatmass: maximum_fatmass,
            max_fatmass_gain: 0.0,
        }
    }

    /// Unmet energy needs [MJ/ind].
    pub fn energy_needs(&self) -> f64 {
        self.energy_needs
    }

    /// Current fat mass [kg/ind].
    pub fn fatmass(&self) -> f64 {
        self.fatmass
    }

    /// Maximum fat mass [kg/ind].
    pub fn max_fatmass(&self) -> f64 {
        self.max_fatmass
    }

    /// Accumulate energy needs [MJ/ind].
    pub fn add_energy_needs(&mut self, energy: f64) {
        assert!(
            energy >= 0.0 && energy.is_finite(),
            "added energy needs must be finite and not negative, got {energy}"
        );
        self.energy_needs += energy;
    }

    /// Burn fat reserves to cover unmet energy needs, clamped to the
    /// available fat.
    pub fn catabolize_fat(&mut self) {
        debug_assert!(self.energy_needs >= 0.0);
        debug_assert!(self.fatmass >= 0.0);
        if self.energy_needs == 0.0 || self.fatmass == 0.0 {
            return;
        }
        let burned = (self.energy_needs / FACTOR_CATABOLISM).min(self.fatmass);
        self.fatmass -= burned;
        self.energy_needs = (self.energy_needs - burned * FACTOR_CATABOLISM).max(0.0);
    }

    /// The maximum energy [MJ/ind/day] that could be anabolized today,
    /// bounded by the remaining fat headroom and the daily gain limit.
    pub fn max_anabolism_per_day(&self) -> f64 {
        let headroom = (self.max_fatmass - self.fatmass).max(0.0) * FACTOR_ANABOLISM;
        if self.max_fatmass_gain > 0.0 {
            headroom.min(self.max_fatmass_gain * FACTOR_ANABOLISM)
        } else {
            headroom
        }
    }

    /// Receive net energy from feeding: first meet today's needs, then store
    /// the surplus as fat.
    ///
    /// Panics if the surplus exceeds what may be anabolized today; the
    /// forage-demand computation must never offer more than that.
    pub fn metabolize_energy(&mut self, energy: f64) {
        assert!(
            energy >= 0.0 && energy.is_finite(),
            "metabolized energy must be finite and not negative, got {energy}"
        );
        if energy <= self.energy_needs {
            self.energy_needs -= energy;
            return;
        }
        let surplus = energy - self.energy_needs;
        self.energy_needs = 0.0;
        assert!(
            surplus <= self.max_anabolism_per_day() * (1.0 + 1e-9) + 1e-12,
            "received energy ({surplus} MJ surplus) exceeds maximum allowed fat anabolism"
        );
        self.fatmass = (self.fatmass + surplus / FACTOR_ANABOLISM).min(self.max_fatmass);
    }

    /// Overwrite the proportional fat reserves; used by the starvation model
    /// after redistributing the fat of starved cohort members.
    pub fn force_body_condition(&mut self, body_condition: f64) {
        assert!(
            (0.0..=1.0).contains(&body_condition),
            "body condition must be within [0,1], got {body_condition}"
        );
        self.fatmass = body_condition * self.max_fatmass;
    }

    /// Update the fat mass cap [kg/ind] and the daily gain limit
    /// [kg/ind/day]; a gain limit of zero means no limit.
    ///
    /// Panics if the new maximum is below the current fat mass.
    pub fn set_max_fatmass(&mut self, max_fatmass: f64, max_gain: f64) {
        assert!(
            max_fatmass > 0.0,
            "maximum fat mass must be positive, got {max_fatmass}"
        );
        assert!(max_gain >= 0.0, "maximum fat gain must not be negative");
        assert!(
            max_fatmass >= self.fatmass,
            "maximum fat mass ({max_fatmass}) is below current fat mass ({})",
            self.fatmass
        );
        self.max_fatmass = max_fatmass;
        self.max_fatmass_gain = max_gain;
    }

    /// Merge with another budget by density-weighted averaging of all state.
    pub fn merge(&mut self, other: &FatmassEnergyBudget, this_weight: f64, other_weight: f64) {
        self.energy_needs = average(
            self.energy_needs,
            other.energy_needs,
            this_weight,
            other_weight,
        );
        self.fatmass = average(self.fatmass, other.fatmass, this_weight, other_weight);
        self.max_fatmass = average(
            self.max_fatmass,
            other.max_fatmass,
            this_weight,
            other_weight,
        );
    }
}

/// Energy expenditure [MJ/ind/day] for cattle from Taylor et al. (1981):
/// `0.4 * M^0.75 * (M/M_ad)^-0.27`.
pub fn expenditure_taylor_1981(current_bodymass: f64, adult_bodymass: f64) -> f64 {
    0.4 * current_bodymass.powf(0.75) * (current_bodymass / adult_bodymass).powf(-0.27)
}

/// Temperature-dependent field metabolic rate [MJ/ind/day] after
/// Zhu et al. (2018): `0.36 * e^(-0.0079*T) * M^0.75`.
pub fn expenditure_zhu_et_al_2018(bodymass: f64, ambient_temperature: f64) -> f64 {
    assert!(bodymass > 0.0, "bodymass must be positive, got {bodymass}");
    0.36 / (0.0079 * ambient_temperature).exp() * bodymass.powf(0.75)
}

/// Convert Watts (J/s) to MJ/day.
pub fn watts_to_mj_per_day(watts: f64) -> f64 {
    watts * 24.0 * 3600.0 * 1e-6
}

/// Selector for winter or summer pelt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FurSeason {
    Summer,
    Winter,
}

/// Whole-body conductance [W/°C] after Bradley & Deavers (1980):
/// `0.224 * M^0.574`, from 230 conductance values of 192 mammal species.
pub fn conductance_bradley_deavers_1980(bodymass: f64) -> f64 {
    assert!(bodymass > 0.0, "bodymass must be positive, got {bodymass}");
    0.224 * bodymass.powf(0.574)
}

/// Whole-body conductance [W/°C] extrapolated from reindeer pelts
/// (Cuyler & Øritsland 2004): `0.29 * M^0.57` in summer, `0.08 * M^0.57`
/// in winter fur.
pub fn conductance_cuyler_oeritsland_2004(bodymass: f64, season: FurSeason) -> f64 {
    assert!(bodymass > 0.0, "bodymass must be positive, got {bodymass}");
    let coefficient = match season {
        FurSeason::Summer => 0.29,
        FurSeason::Winter => 0.08,
    };
    coefficient * bodymass.powf(0.57)
}

/// Additional energy requirement [MJ/ind/day] to keep the body core
/// temperature against heat loss.
///
/// Heat loss occurs below the lower critical temperature, which is where
/// the thermoneutral expenditure no longer suffices to replace the heat
/// conducted to the environment.
pub fn thermoregulatory_expenditure(
    thermoneutral_rate: f64,
    conductance: f64,
    core_temperature: f64,
    ambient_temperature: f64,
) -> f64 {
    assert!(
        thermoneutral_rate >= 0.0,
        "thermoneutral rate must not be negative"
    );
    assert!(conductance > 0.0, "conductance must be positive");
    assert!(
        core_temperature >= 0.0,
        "core temperature must not be negative"
    );
    let conductance_mj = watts_to_mj_per_day(conductance);
    let critical_temperature = core_temperature - thermoneutral_rate / conductance_mj;
    conductance_mj * (critical_temperature - ambient_temperature).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const INIT_FATMASS: f64 = 1.0;
    const MAX_FATMASS: f64 = 2.0;

    fn budget() -> FatmassEnergyBudget {
        FatmassEnergyBudget::new(INIT_FATMASS, MAX_FATMASS)
    }

    #[test]
    #[should_panic]
    fn initial_fat_above_maximum_is_rejected() {
        let _ = FatmassEnergyBudget::new(3.0, 2.0);
    }

    #[test]
    fn catabolism_covers_needs_from_fat() {
        let mut budget = budget();
        let needs = 10.0;
        budget.add_energy_needs(needs);
        budget.catabolize_fat();
        assert_eq!(budget.energy_needs(), 0.0);
        assert!(
            (budget.fatmass() - (INIT_FATMASS - needs / FACTOR_CATABOLISM)).abs() < 1e-12
        );
    }

    #[test]
    fn catabolism_clamps_to_available_fat() {
        let mut budget = budget();
        let enormous = 10.0 * MAX_FATMASS * FACTOR_CATABOLISM;
        budget.add_energy_needs(enormous);
        budget.catabolize_fat();
        assert_eq!(budget.fatmass(), 0.0);
        assert!(
            (budget.energy_needs() - (enormous - INIT_FATMASS * FACTOR_CATABOLISM)).abs()
                < 1e-9
        );
    }

    #[test]
    fn metabolism_meets_needs_before_anabolism() {
        let mut budget = budget();
        budget.add_energy_needs(10.0);
        budget.metabolize_energy(4.0);
        assert!((budget.energy_needs() - 6.0).abs() < 1e-12);
        assert_eq!(budget.fatmass(), INIT_FATMASS);
    }

    #[test]
    fn surplus_energy_anabolizes_into_fat() {
        let mut budget = budget();
        budget.add_energy_needs(2.0);
        let surplus = 5.0;
        budget.metabolize_energy(2.0 + surplus);
        assert_eq!(budget.energy_needs(), 0.0);
        assert!(
            (budget.fatmass() - (INIT_FATMASS + surplus / FACTOR_ANABOLISM)).abs() < 1e-12
        );
        assert!(budget.fatmass() <= budget.max_fatmass());
    }

    #[test]
    #[should_panic]
    fn surplus_beyond_anabolism_limit_panics() {
        let mut budget = budget();
        budget.metabolize_energy(10.0 * MAX_FATMASS * FACTOR_ANABOLISM);
    }

    #[test]
    fn daily_gain_limits_anabolism() {
        let mut budget = budget();
        budget.set_max_fatmass(MAX_FATMASS, 0.1);
        assert!((budget.max_anabolism_per_day() - 0.1 * FACTOR_ANABOLISM).abs() < 1e-12);
        budget.set_max_fatmass(MAX_FATMASS, 0.0);
        assert!(
            (budget.max_anabolism_per_day() - (MAX_FATMASS - INIT_FATMASS) * FACTOR_ANABOLISM)
                .abs()
                < 1e-12
        );
    }

    #[test]
    fn merge_with_different_weights() {
        let mut budget = budget();
        budget.add_energy_needs(5.0);
        let mut other = FatmassEnergyBudget::new(3.0, 4.0);
        other.add_energy_needs(13.0);
        let (w1, w2) = (0.4, 1.2);
        budget.merge(&other, w1, w2);
        assert!(
            (budget.energy_needs() - (5.0 * w1 + 13.0 * w2) / (w1 + w2)).abs() < 1e-12
        );
        assert!((budget.fatmass() - (1.0 * w1 + 3.0 * w2) / (w1 + w2)).abs() < 1e-12);
        assert!((budget.max_fatmass() - (2.0 * w1 + 4.0 * w2) / (w1 + w2)).abs() < 1e-12);
    }

    #[test]
    fn force_body_condition_rescales_fat() {
        let mut budget = budget();
        budget.force_body_condition(0.25);
        assert!((budget.fatmass() - 0.25 * MAX_FATMASS).abs() < 1e-12);
    }

    #[test]
    fn taylor_1981_formula() {
        let current: f64 = 90.0;
        let adult: f64 = 100.0;
        let expected = 0.4 * current.powf(0.75) * (current / adult).powf(-0.27);
        assert!((expenditure_taylor_1981(current, adult) - expected).abs() < 1e-12);
    }

    #[test]
    fn zhu_2018_increases_in_cold() {
        let m: f64 = 100.0;
        let t: f64 = 20.0;
        let expected = 0.36 / (0.0079 * t).exp() * m.powf(0.75);
        assert!((expenditure_zhu_et_al_2018(m, t) - expected).abs() < 1e-12);
        assert!(expenditure_zhu_et_al_2018(m, t) < expenditure_zhu_et_al_2018(m, t - 20.0));
    }

    #[test]
    fn conductance_formulas() {
        let m = 60.0;
        assert!((conductance_bradley_deavers_1980(m) - 0.224 * m.powf(0.574)).abs() < 1e-12);
        assert!(
            conductance_cuyler_oeritsland_2004(m, FurSeason::Winter)
                < conductance_cuyler_oeritsland_2004(m, FurSeason::Summer)
        );
    }

    #[test]
    fn no_thermoregulation_cost_above_critical_temperature() {
        let cost = thermoregulatory_expenditure(10.0, 1.0, 38.0, 30.0);
        assert_eq!(cost, 0.0);
    }

    #[test]
    fn thermoregulation_cost_grows_with_cold() {
        let mild = thermoregulatory_expenditure(0.5, 1.0, 38.0, 0.0);
        let cold = thermoregulatory_expenditure(0.5, 1.0, 38.0, -20.0);
        assert!(mild > 0.0);
        assert!(cold > mild);
    }
}
