//! Foraging models: digestive constraints, intake-rate limits, and the
//! per-day forage-demand computation of one herbivore.

use crate::forage::{
    convert_mj_to_kg_proportionally, Digestibility, ForageEnergy, ForageEnergyContent,
    ForageFraction, ForageMass, ForageType,
};
use crate::habitat::HabitatForage;
use crate::hft::{DietComposer, DigestionType, DigestiveLimit, ForagingLimit, Hft};

/// Working upper bound for daily intake [kgDM/ind/day] that the limit
/// algorithms whittle down. Not `f64::MAX`, because converting that to
/// energy must stay finite.
const UNLIMITED_INTAKE: f64 = 10_000.0;

/// Digestion-limited daily net energy intake [MJ/day/ind] after
/// Illius & Gordon (1992).
///
/// `I_dig = i * e^(j*d) * M_ad^(k*e^d + 0.73) * (M/M_ad)^0.75`
///
/// with `d` = digestibility, `M` = current and `M_ad` = adult body mass.
/// The parameters (i, j, k) come from regression analysis over 12 mammalian
/// herbivores (Shipley et al. 1999) and are specific to the digestion type.
/// Zero digestibility yields zero energy. Only grass is parameterized.
pub fn digestive_limit_illius_gordon_1992(
    bodymass_adult: f64,
    digestion_type: DigestionType,
    bodymass: f64,
    digestibility: &Digestibility,
) -> ForageEnergy {
    assert!(
        bodymass_adult > 0.0,
        "adult body mass must be positive, got {bodymass_adult}"
    );
    assert!(bodymass > 0.0, "body mass must be positive, got {bodymass}");
    assert!(
        bodymass <= bodymass_adult * (1.0 + 1e-9),
        "body mass ({bodymass}) exceeds adult body mass ({bodymass_adult})"
    );

    let (i, j, k) = match digestion_type {
        DigestionType::Ruminant => (0.034, 3.565, 0.077),
        DigestionType::Hindgut => (0.108, 3.284, 0.080),
    };
    let gut_capacity = (bodymass / bodymass_adult).powf(0.75);

    let mut result = ForageEnergy::default();
    for ft in ForageType::EDIBLE {
        let d = digestibility.get(ft);
        let energy = match ft {
            ForageType::Grass if d > 0.0 => {
                i * (j * d).exp() * bodymass_adult.powf(k * d.exp() + 0.73) * gut_capacity
            }
            _ => 0.0,
        };
        result.set(ft, energy);
    }
    result
}

/// Ingestion rate as Holling's type II functional response:
/// `I = I_max * V / (V_half + V)`.
///
/// `V_half` is a species-specific half-saturation density that does not
/// generally scale with body mass; Illius & O'Connor (2000) call it β.
pub struct HalfMaxIntake {
    half_max_density: f64,
    max_intake: f64,
}

impl HalfMaxIntake {
    /// Units of `half_max_density` and `max_intake` are free but must match
    /// the later calls to [`HalfMaxIntake::intake_rate`]. Both must be
    /// positive.
    pub fn new(half_max_density: f64, max_intake: f64) -> Self {
        assert!(
            half_max_density > 0.0,
            "half_max_density must be positive, got {half_max_density}"
        );
        assert!(
            max_intake > 0.0,
            "max_intake must be positive, got {max_intake}"
        );
        Self {
            half_max_density,
            max_intake,
        }
    }

    /// Realized feeding rate at the given forage density.
    pub fn intake_rate(&self, density: f64) -> f64 {
        assert!(density >= 0.0, "density must not be negative, got {density}");
        self.max_intake * density / (self.half_max_density + density)
    }
}

/// Maximum intake per forage type [kgDM/day] when the total dry matter is
/// bounded by `kg_total` and the diet keeps the given energy proportions.
pub fn max_intake_as_total_mass(
    mj_proportions: &ForageFraction,
    mj_per_kg: &ForageEnergyContent,
    kg_total: f64,
) -> ForageMass {
    assert!(kg_total >= 0.0, "kg_total must not be negative, got {kg_total}");
    if kg_total == 0.0 {
        return ForageMass::default();
    }
    let mass_proportions = convert_mj_to_kg_proportionally(mj_per_kg, mj_proportions);
    let sum = mass_proportions.sum();
    if sum == 0.0 {
        return ForageMass::default();
    }
    mass_proportions.to_values() * (kg_total / sum)
}

/// Per-herbivore, per-day forage demand memo.
///
/// Reset at the start of each day with [`ForageDemands::init_today`]; the
/// eaten forage is booked back with [`ForageDemands::record_eaten`] so that
/// repeated demand queries within one day shrink accordingly.
#[derive(Clone, Debug)]
pub struct ForageDemands {
    today: Option<u16>,
    available_forage: HabitatForage,
    bodymass: f64,
    diet_composition: ForageFraction,
    digestibility: Digestibility,
    energy_content: ForageEnergyContent,
    /// Remaining maximum intake today [kgDM/ind/day].
    max_intake: ForageMass,
}

impl ForageDemands {
    pub fn new() -> Self {
        Self {
            today: None,
            available_forage: HabitatForage::default(),
            bodymass: 0.0,
            diet_composition: ForageFraction::default(),
            digestibility: Digestibility::default(),
            energy_content: ForageEnergyContent::default(),
            max_intake: ForageMass::default(),
        }
    }

    /// Whether [`ForageDemands::init_today`] ran for the given day already.
    pub fn is_day_initialized(&self, day: u16) -> bool {
        self.today == Some(day)
    }

    /// Prepare foraging for a new day: compose the diet and set the intake
    /// ceiling to the elementwise minimum of all foraging and digestive
    /// constraints.
    pub fn init_today(
        &mut self,
        day: u16,
        available_forage: &HabitatForage,
        energy_content: &ForageEnergyContent,
        bodymass: f64,
        bodymass_adult: f64,
        hft: &Hft,
    ) {
        assert!(day < 365, "day must be within [0,364], got {day}");
        assert!(bodymass > 0.0, "body mass must be positive, got {bodymass}");
        assert!(
            bodymass <= bodymass_adult * (1.0 + 1e-9),
            "body mass ({bodymass}) exceeds adult body mass ({bodymass_adult})"
        );

        self.today = Some(day);
        self.available_forage = available_forage.clone();
        self.bodymass = bodymass;
        self.digestibility = available_forage.digestibility();
        self.energy_content = *energy_content;
        self.diet_composition = diet_composition(hft.foraging.diet_composer);

        self.max_intake = ForageMass::filled(UNLIMITED_INTAKE)
            .min(&self.max_foraging(hft, bodymass_adult))
            .min(&self.max_digestion(hft, bodymass_adult));
    }

    /// Today's demanded forage [kgDM/ind/day] to satisfy the given energy
    /// needs [MJ/ind] under the intake ceiling and the diet composition.
    ///
    /// Panics unless [`ForageDemands::init_today`] ran for today.
    pub fn demand(&self, energy_needs: f64) -> ForageMass {
        assert!(
            self.today.is_some(),
            "ForageDemands::demand() called before init_today()"
        );
        assert!(
            energy_needs >= 0.0,
            "energy needs must not be negative, got {energy_needs}"
        );
        if energy_needs == 0.0 {
            return ForageMass::default();
        }

        // The maximum intake of each forage type as net energy [MJ/ind].
        let max_energy_intake = self.max_intake * &self.energy_content;
        let max_energy_sum = max_energy_intake.sum();
        if max_energy_sum == 0.0 {
            return ForageMass::default();
        }

        // Find the forage type limiting the preferred composition the most.
        // Types that cannot be eaten at all are skipped; their share may be
        // covered by other types when the demand is queried again.
        let mut min_fraction = 1.0_f64;
        for ft in ForageType::EDIBLE {
            if self.diet_composition.get(ft) > 0.0 && max_energy_intake.get(ft) > 0.0 {
                min_fraction = min_fraction.min(
                    self.diet_composition.get(ft) * max_energy_sum / max_energy_intake.get(ft),
                );
            }
        }

        // The possible energy intake composed in the preferred fractions.
        let composed = max_energy_intake.times_fraction(
            &ForageFraction::from_values(
                &(self.diet_composition.to_values() * min_fraction),
                1e-9,
            ),
        );
        if composed.sum() == 0.0 {
            return ForageMass::default();
        }

        // Reduce to the actual hunger.
        let reduction = (energy_needs / composed.sum()).min(1.0);
        let actual_energy = composed * reduction;

        actual_energy.divide_safely(&self.energy_content, 0.0)
    }

    /// Book eaten forage [kgDM/ind] against today's remaining maximum.
    ///
    /// Eating more than the previously computed demand allows is a logic
    /// error in the feeding pipeline and panics.
    pub fn record_eaten(&mut self, eaten: &ForageMass) {
        assert!(
            self.today.is_some(),
            "ForageDemands::record_eaten() called before init_today()"
        );
        let mut remaining = ForageMass::default();
        for ft in ForageType::EDIBLE {
            let max = self.max_intake.get(ft);
            assert!(
                eaten.get(ft) <= max * (1.0 + 1e-6) + 1e-9,
                "herbivore ate {} kgDM/ind of \"{}\", exceeding today's maximum intake {}",
                eaten.get(ft),
                ft.name(),
                max
            );
            remaining.set(ft, (max - eaten.get(ft)).max(0.0));
        }
        self.max_intake = remaining;
    }

    /// Maximum potentially harvested dry matter [kgDM/ind/day], considering
    /// only the intake-rate limits, not digestion or hunger.
    fn max_foraging(&self, hft: &Hft, bodymass_adult: f64) -> ForageMass {
        let mut result = ForageMass::filled(UNLIMITED_INTAKE);

        for limit in &hft.foraging.limits {
            match limit {
                ForagingLimit::IlliusOConnor2000 => {
                    // The functional response saturates toward the digestive
                    // limit; grass only. Like Pachzelt et al. (2013), the
                    // whole-habitat grass density is used, not the sward
                    // density.
                    let max_energy = digestive_limit_illius_gordon_1992(
                        bodymass_adult,
                        hft.digestion.digestion_type,
                        self.bodymass,
                        &self.digestibility,
                    )
                    .get(ForageType::Grass);
                    let limit_kg = self.functional_response_kg(
                        hft,
                        max_energy,
                        self.available_forage.grass.mass(),
                    );
                    result.set(
                        ForageType::Grass,
                        result.get(ForageType::Grass).min(limit_kg),
                    );
                }
                ForagingLimit::GeneralFunctionalResponse => {
                    // Same functional response, but on the sward density:
                    // the grass density within the covered area.
                    let max_energy = digestive_limit_illius_gordon_1992(
                        bodymass_adult,
                        hft.digestion.digestion_type,
                        self.bodymass,
                        &self.digestibility,
                    )
                    .get(ForageType::Grass);
                    let limit_kg = self.functional_response_kg(
                        hft,
                        max_energy,
                        self.available_forage.grass.sward_density(),
                    );
                    result.set(
                        ForageType::Grass,
                        result.get(ForageType::Grass).min(limit_kg),
                    );
                }
            }
        }
        result
    }

    fn functional_response_kg(&self, hft: &Hft, max_energy: f64, grass_density: f64) -> f64 {
        if max_energy <= 0.0 {
            return 0.0;
        }
        let response = HalfMaxIntake::new(
            // gDM/m² converts to kgDM/km² by a factor of 1000.
            hft.foraging.half_max_intake_density * 1000.0,
            max_energy,
        );
        let limit_mj = response.intake_rate(grass_density);
        let energy_content = self.energy_content.get(ForageType::Grass);
        if energy_content > 0.0 {
            limit_mj / energy_content
        } else {
            0.0
        }
    }

    /// Maximum digestible dry matter today [kgDM/ind/day] under the
    /// selected digestive limit.
    fn max_digestion(&self, hft: &Hft, bodymass_adult: f64) -> ForageMass {
        match hft.digestion.limit {
            DigestiveLimit::None => ForageMass::filled(UNLIMITED_INTAKE),
            DigestiveLimit::Allometric => max_intake_as_total_mass(
                &self.diet_composition,
                &self.energy_content,
                hft.digestion.allometric.calc(self.bodymass),
            ),
            DigestiveLimit::FixedFraction => max_intake_as_total_mass(
                &self.diet_composition,
                &self.energy_content,
                hft.digestion.fixed_fraction * self.bodymass,
            ),
            DigestiveLimit::IlliusGordon1992 => {
                let limit_mj = digestive_limit_illius_gordon_1992(
                    bodymass_adult,
                    hft.digestion.digestion_type,
                    self.bodymass,
                    &self.digestibility,
                );
                // Zero energy content keeps zero mass on division.
                limit_mj.divide_safely(&self.energy_content, 0.0)
            }
        }
    }
}

impl Default for ForageDemands {
    fn default() -> Self {
        Self::new()
    }
}

/// Energy-wise fractions of the forage types composing the diet; sums to 1.
fn diet_composition(composer: DietComposer) -> ForageFraction {
    let mut result = ForageFraction::default();
    match composer {
        DietComposer::PureGrazer => result.set(ForageType::Grass, 1.0),
    }
    debug_assert!((result.sum() - 1.0).abs() < 1e-3);
    result
}
