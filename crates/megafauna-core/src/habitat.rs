//! Forage in a habitat and the boundary to the external vegetation model.

use crate::average::average;
use crate::forage::{Digestibility, ForageFraction, ForageMass, ForageType};

/// Grass forage in a habitat.
///
/// Mass and nitrogen mass are per area [kgDM/km², kgN/km²]; digestibility
/// and FPC (foliar percentage cover) are fractions.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GrassForage {
    mass: f64,
    digestibility: f64,
    nitrogen_mass: f64,
    fpc: f64,
}

impl GrassForage {
    /// Dry matter mass [kgDM/km²].
    pub fn mass(&self) -> f64 {
        self.mass
    }

    /// Set the dry matter mass [kgDM/km²].
    ///
    /// Panics if negative or smaller than the current nitrogen mass.
    pub fn set_mass(&mut self, kg_per_km2: f64) {
        assert!(
            kg_per_km2 >= 0.0 && kg_per_km2.is_finite(),
            "grass mass must be finite and not negative, got {kg_per_km2}"
        );
        assert!(
            self.nitrogen_mass <= kg_per_km2,
            "grass mass must not drop below the contained nitrogen mass; \
             decrease nitrogen mass first"
        );
        self.mass = kg_per_km2;
    }

    /// Proportional digestibility of the grass dry matter.
    pub fn digestibility(&self) -> f64 {
        self.digestibility
    }

    pub fn set_digestibility(&mut self, fraction: f64) {
        assert!(
            (0.0..=1.0).contains(&fraction),
            "digestibility must be within [0,1], got {fraction}"
        );
        self.digestibility = fraction;
    }

    /// Nitrogen contained in the grass dry matter [kgN/km²].
    pub fn nitrogen_mass(&self) -> f64 {
        self.nitrogen_mass
    }

    pub fn set_nitrogen_mass(&mut self, kg_per_km2: f64) {
        assert!(
            kg_per_km2 >= 0.0 && kg_per_km2.is_finite(),
            "nitrogen mass must be finite and not negative, got {kg_per_km2}"
        );
        assert!(
            kg_per_km2 <= self.mass,
            "nitrogen mass must not exceed the grass dry matter mass; \
             increase dry matter first"
        );
        self.nitrogen_mass = kg_per_km2;
    }

    /// Foliar percentage cover: grass-covered fraction of the habitat.
    ///
    /// Panics if mass and FPC are in an illogical state (only one of them
    /// zero).
    pub fn fpc(&self) -> f64 {
        if self.mass == 0.0 {
            assert!(
                self.fpc == 0.0,
                "grass mass is zero, but FPC is not zero"
            );
        } else {
            assert!(
                self.fpc != 0.0,
                "grass mass is not zero, but FPC is zero"
            );
        }
        self.fpc
    }

    /// Set the FPC. Call [`GrassForage::set_mass`] first so that mass and
    /// cover stay consistent.
    pub fn set_fpc(&mut self, fraction: f64) {
        assert!(
            (0.0..=1.0).contains(&fraction),
            "FPC must be within [0,1], got {fraction}"
        );
        if self.mass == 0.0 {
            assert!(fraction == 0.0, "FPC must be zero if grass mass is zero");
        } else {
            assert!(
                fraction != 0.0,
                "FPC cannot be zero if there is grass mass"
            );
        }
        self.fpc = fraction;
    }

    /// Dry matter density in the area actually covered by grass [kgDM/km²].
    ///
    /// Always at least as high as [`GrassForage::mass`].
    pub fn sward_density(&self) -> f64 {
        if self.fpc() == 0.0 {
            return 0.0;
        }
        self.mass / self.fpc
    }

    /// Weighted mean of mass, digestibility, nitrogen, and FPC.
    pub fn merge(&mut self, other: &GrassForage, this_weight: f64, other_weight: f64) {
        self.digestibility = average(
            self.digestibility,
            other.digestibility,
            this_weight,
            other_weight,
        );
        let merged_nitrogen = average(
            self.nitrogen_mass,
            other.nitrogen_mass,
            this_weight,
            other_weight,
        );
        self.nitrogen_mass = 0.0;
        self.set_mass(average(self.mass, other.mass, this_weight, other_weight));
        self.set_nitrogen_mass(merged_nitrogen.min(self.mass));
        self.fpc = average(self.fpc, other.fpc, this_weight, other_weight);
    }
}

/// All forage of one habitat, keyed by forage type.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HabitatForage {
    /// The grass forage in the habitat.
    pub grass: GrassForage,
}

impl HabitatForage {
    /// Dry matter mass per edible forage type [kgDM/km²].
    pub fn mass(&self) -> ForageMass {
        let mut result = ForageMass::default();
        result.set(ForageType::Grass, self.grass.mass());
        result
    }

    /// Digestibility per edible forage type. Undefined (zero) where mass is
    /// zero.
    pub fn digestibility(&self) -> Digestibility {
        let mut result = Digestibility::default();
        result.set(ForageType::Grass, self.grass.digestibility());
        result
    }

    /// Fraction of nitrogen in dry matter [kgN/kgDM] per forage type.
    pub fn nitrogen_content(&self) -> ForageFraction {
        let mut result = ForageFraction::default();
        if self.grass.mass() > 0.0 {
            result.set(
                ForageType::Grass,
                self.grass.nitrogen_mass() / self.grass.mass(),
            );
        }
        result
    }

    /// Total dry matter mass over all forage types [kgDM/km²].
    pub fn total_mass(&self) -> f64 {
        self.mass().sum()
    }

    /// Mass-weighted mean digestibility over all forage types. Zero if no
    /// forage at all.
    pub fn average_digestibility(&self) -> f64 {
        let total = self.total_mass();
        if total == 0.0 {
            return 0.0;
        }
        let mass = self.mass();
        let digestibility = self.digestibility();
        ForageType::EDIBLE
            .into_iter()
            .map(|ft| mass.get(ft) * digestibility.get(ft))
            .sum::<f64>()
            / total
    }

    /// Weighted mean over all member forage objects.
    pub fn merge(&mut self, other: &HabitatForage, this_weight: f64, other_weight: f64) {
        self.grass.merge(&other.grass, this_weight, other_weight);
    }
}

/// Abiotic conditions of a habitat.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HabitatEnvironment {
    /// Ambient air temperature near ground [°C], whole-day average.
    pub air_temperature: f64,

    /// Depth of snow cover [cm].
    pub snow_depth: f64,
}

impl Default for HabitatEnvironment {
    fn default() -> Self {
        Self {
            air_temperature: 20.0,
            snow_depth: 0.0,
        }
    }
}

/// The boundary the external vegetation model implements.
///
/// The core guarantees that it never removes more forage than the habitat
/// previously reported available, and that excreted nitrogen is returned
/// exactly once per herbivore per day.
pub trait Habitat {
    /// Identifier for spatial aggregation of output. Habitats with the same
    /// aggregation unit are averaged together.
    fn aggregation_unit(&self) -> &str;

    /// Called once per simulated day before any herbivore simulation.
    fn init_day(&mut self, day_of_year: u16);

    /// The forage currently standing in the habitat.
    fn available_forage(&self) -> HabitatForage;

    /// Today's abiotic conditions.
    fn environment(&self) -> HabitatEnvironment;

    /// Decrement the habitat's forage stock by what the herbivores ate
    /// [kgDM/km²].
    fn remove_eaten_forage(&mut self, eaten: &ForageMass);

    /// Return nitrogen excreted by the herbivores to the habitat [kgN/km²].
    fn add_excreted_nitrogen(&mut self, kg_per_km2: f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grass(mass: f64, digestibility: f64, fpc: f64) -> GrassForage {
        let mut g = GrassForage::default();
        g.set_mass(mass);
        g.set_digestibility(digestibility);
        g.set_fpc(fpc);
        g
    }

    #[test]
    fn sward_density_scales_with_cover() {
        let g = grass(100.0, 0.5, 0.25);
        assert!((g.sward_density() - 400.0).abs() < 1e-12);
        assert!(g.sward_density() >= g.mass());
    }

    #[test]
    #[should_panic]
    fn fpc_zero_with_mass_is_rejected() {
        let mut g = GrassForage::default();
        g.set_mass(10.0);
        g.set_fpc(0.0);
    }

    #[test]
    #[should_panic]
    fn nitrogen_above_dry_matter_is_rejected() {
        let mut g = GrassForage::default();
        g.set_mass(1.0);
        g.set_nitrogen_mass(2.0);
    }

    #[test]
    fn nitrogen_content_fraction() {
        let mut habitat = HabitatForage::default();
        habitat.grass = grass(100.0, 0.5, 0.5);
        habitat.grass.set_nitrogen_mass(2.0);
        let content = habitat.nitrogen_content();
        assert!((content.get(ForageType::Grass) - 0.02).abs() < 1e-12);
    }

    #[test]
    fn average_digestibility_of_empty_habitat_is_zero() {
        let habitat = HabitatForage::default();
        assert_eq!(habitat.average_digestibility(), 0.0);
    }

    #[test]
    fn average_digestibility_matches_single_type() {
        let mut habitat = HabitatForage::default();
        habitat.grass = grass(100.0, 0.6, 0.5);
        assert!((habitat.average_digestibility() - 0.6).abs() < 1e-12);
    }
}
