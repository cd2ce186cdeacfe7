//! A self-contained demo habitat with logistic grass regrowth.

use serde::{Deserialize, Serialize};

use megafauna_core::forage::{ForageMass, ForageType};
use megafauna_core::habitat::{Habitat, HabitatEnvironment, HabitatForage};

/// Parameters of the logistic grass model.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimpleHabitatConfig {
    /// Initial standing grass [kgDM/km²].
    pub initial_mass: f64,
    /// Carrying capacity [kgDM/km²].
    pub saturation_mass: f64,
    /// Daily relative growth rate.
    pub growth_rate: f64,
    /// Constant grass digestibility [0,1].
    pub digestibility: f64,
    /// Constant foliar percentage cover [0,1].
    pub fpc: f64,
    /// Fraction of nitrogen in grass dry matter [kgN/kgDM].
    pub nitrogen_content: f64,
    /// Mean annual air temperature [°C].
    pub mean_temperature: f64,
    /// Seasonal temperature amplitude [°C].
    pub temperature_amplitude: f64,
}

impl Default for SimpleHabitatConfig {
    fn default() -> Self {
        Self {
            initial_mass: 2e5,
            saturation_mass: 2e5,
            growth_rate: 0.05,
            digestibility: 0.5,
            fpc: 0.5,
            nitrogen_content: 0.01,
            mean_temperature: 10.0,
            temperature_amplitude: 15.0,
        }
    }
}

/// Grass habitat with logistic daily regrowth and a sinusoidal annual
/// temperature cycle.
pub struct SimpleHabitat {
    config: SimpleHabitatConfig,
    name: String,
    grass_mass: f64,
    day_of_year: u16,
    /// Nitrogen returned by the herbivores, accumulated as a soil pool.
    soil_nitrogen: f64,
}

impl SimpleHabitat {
    pub fn new(name: String, config: SimpleHabitatConfig) -> Self {
        Self {
            grass_mass: config.initial_mass,
            config,
            name,
            day_of_year: 0,
            soil_nitrogen: 0.0,
        }
    }

    pub fn grass_mass(&self) -> f64 {
        self.grass_mass
    }

    pub fn soil_nitrogen(&self) -> f64 {
        self.soil_nitrogen
    }
}

impl Habitat for SimpleHabitat {
    fn aggregation_unit(&self) -> &str {
        &self.name
    }

    fn init_day(&mut self, day_of_year: u16) {
        self.day_of_year = day_of_year;
        let relative = self.grass_mass / self.config.saturation_mass;
        self.grass_mass += self.config.growth_rate * self.grass_mass * (1.0 - relative);
        self.grass_mass = self.grass_mass.min(self.config.saturation_mass);
    }

    fn available_forage(&self) -> HabitatForage {
        let mut forage = HabitatForage::default();
        forage.grass.set_mass(self.grass_mass);
        forage.grass.set_digestibility(self.config.digestibility);
        if self.grass_mass > 0.0 {
            forage.grass.set_fpc(self.config.fpc);
            forage
                .grass
                .set_nitrogen_mass(self.grass_mass * self.config.nitrogen_content);
        }
        forage
    }

    fn environment(&self) -> HabitatEnvironment {
        // Coldest around New Year, warmest around midsummer.
        let phase = (self.day_of_year as f64 / 365.0 - 0.5) * std::f64::consts::TAU;
        HabitatEnvironment {
            air_temperature: self.config.mean_temperature
                + self.config.temperature_amplitude * phase.cos(),
            snow_depth: 0.0,
        }
    }

    fn remove_eaten_forage(&mut self, eaten: &ForageMass) {
        let eaten_grass = eaten.get(ForageType::Grass);
        assert!(
            eaten_grass <= self.grass_mass * (1.0 + 1e-9),
            "herbivores ate more grass than the habitat offered"
        );
        self.grass_mass = (self.grass_mass - eaten_grass).max(0.0);
    }

    fn add_excreted_nitrogen(&mut self, kg_per_km2: f64) {
        self.soil_nitrogen += kg_per_km2;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grass_grows_toward_saturation() {
        let config = SimpleHabitatConfig {
            initial_mass: 1e4,
            ..SimpleHabitatConfig::default()
        };
        let mut habitat = SimpleHabitat::new("unit0".into(), config.clone());
        for day in 0..3650 {
            habitat.init_day(day % 365);
        }
        assert!((habitat.grass_mass() - config.saturation_mass).abs() < 1.0);
    }

    #[test]
    fn eaten_grass_is_removed_from_the_stock() {
        let mut habitat = SimpleHabitat::new("unit0".into(), SimpleHabitatConfig::default());
        let before = habitat.grass_mass();
        let mut eaten = ForageMass::default();
        eaten.set(ForageType::Grass, 1000.0);
        habitat.remove_eaten_forage(&eaten);
        assert!((habitat.grass_mass() - (before - 1000.0)).abs() < 1e-9);
    }

    #[test]
    fn temperature_follows_the_seasons() {
        let mut habitat = SimpleHabitat::new("unit0".into(), SimpleHabitatConfig::default());
        habitat.init_day(0);
        let winter = habitat.environment().air_temperature;
        habitat.init_day(182);
        let summer = habitat.environment().air_temperature;
        assert!(summer > winter);
    }
}
