//! Distributing the habitat's finite forage across all herbivores, and the
//! feeding loop handing the portions out.

use crate::forage::{ForageMass, ForageType};
use crate::habitat::HabitatForage;
use crate::herbivore::Herbivore;
use crate::parameters::ForageDistributionAlgorithm;

/// Forage masses below roughly 10 g/m² count as nothing to eat; this
/// absorbs rounding residue left over from previous feeding.
const NEGLIGIBLE_FORAGE_MASS: f64 = 10_000.0; // kgDM/km²

/// Compute a feasible allocation from per-herbivore demands.
///
/// `demands` maps an opaque herbivore key to its offered demand
/// [kgDM/km²]; the returned portions satisfy, per forage type:
/// `Σ portions == min(available, Σ demands)`, no portion exceeds its
/// demand, and nothing beyond the available mass is handed out.
pub fn distribute_forage(
    algorithm: ForageDistributionAlgorithm,
    available: &ForageMass,
    demands: Vec<(usize, ForageMass)>,
) -> Vec<(usize, ForageMass)> {
    match algorithm {
        ForageDistributionAlgorithm::Equally => distribute_equally(available, demands),
    }
}

/// Equal distribution: everyone gets its full demand if possible; under
/// scarcity every demand is scaled by `available / total_demand`, so each
/// herbivore receives its proportional share without direct competition.
fn distribute_equally(
    available: &ForageMass,
    mut demands: Vec<(usize, ForageMass)>,
) -> Vec<(usize, ForageMass)> {
    if demands.is_empty() {
        return demands;
    }
    let mut demand_sum = ForageMass::default();
    for (_, demand) in &demands {
        demand_sum += demand;
    }

    for ft in ForageType::EDIBLE {
        let total = demand_sum.get(ft);
        let avail = available.get(ft);
        if total <= avail || total == 0.0 {
            continue;
        }
        let scale = avail / total;
        for (_, portion) in &mut demands {
            portion.set(ft, portion.get(ft) * scale);
        }
    }
    demands
}

/// Feed the herbivores from the habitat's available forage.
///
/// Runs up to one distribution round per forage type so that herbivores
/// whose preferred forage ran out can re-demand from what is left. Updates
/// `available` in place and returns the total eaten mass [kgDM/km²].
pub fn feed_herbivores(
    algorithm: ForageDistributionAlgorithm,
    available: &mut HabitatForage,
    herbivores: &mut [&mut Herbivore],
) -> ForageMass {
    let mut eaten_total = ForageMass::default();

    for _ in 0..ForageType::EDIBLE.len() {
        if available.total_mass() <= 1e-5 {
            break;
        }

        let mut demands: Vec<(usize, ForageMass)> = Vec::with_capacity(herbivores.len());
        for (index, herbivore) in herbivores.iter_mut().enumerate() {
            if herbivore.is_dead() {
                continue;
            }
            let demand = herbivore.get_forage_demands(available);
            if !demand.is_zero() {
                demands.push((index, demand));
            }
        }
        if demands.is_empty() {
            break;
        }

        let portions = distribute_forage(algorithm, &available.mass(), demands);

        let digestibility = available.digestibility();
        let nitrogen_content = available.nitrogen_content();

        for (index, portion) in portions {
            let herbivore = &mut *herbivores[index];
            if herbivore.ind_per_km2() <= 0.0 {
                continue;
            }
            let nitrogen = portion.times_fraction(&nitrogen_content);
            herbivore.eat(&portion, &digestibility, &nitrogen);

            let remaining_mass =
                (available.grass.mass() - portion.get(ForageType::Grass)).max(0.0);
            let remaining_nitrogen = (available.grass.nitrogen_mass()
                - nitrogen.get(ForageType::Grass))
            .clamp(0.0, remaining_mass);
            available.grass.set_nitrogen_mass(remaining_nitrogen);
            available.grass.set_mass(remaining_mass);

            eaten_total += &portion;
        }
    }
    eaten_total
}

/// Zero out forage types with only a negligible remnant standing, before
/// any demand is computed.
pub fn corrected_forage(habitat_forage: &HabitatForage) -> HabitatForage {
    let mut corrected = habitat_forage.clone();
    if corrected.grass.mass() <= NEGLIGIBLE_FORAGE_MASS {
        corrected.grass.set_nitrogen_mass(0.0);
        corrected.grass.set_mass(0.0);
        corrected.grass.set_fpc(0.0);
    }
    corrected
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grass_mass(kg: f64) -> ForageMass {
        let mut mass = ForageMass::default();
        mass.set(ForageType::Grass, kg);
        mass
    }

    #[test]
    fn full_demand_when_enough_is_available() {
        let available = grass_mass(1000.0);
        let portions = distribute_forage(
            ForageDistributionAlgorithm::Equally,
            &available,
            vec![(0, grass_mass(100.0)), (1, grass_mass(200.0))],
        );
        assert_eq!(portions[0].1.get(ForageType::Grass), 100.0);
        assert_eq!(portions[1].1.get(ForageType::Grass), 200.0);
    }

    #[test]
    fn scarcity_scales_demands_proportionally() {
        // Two herbivores demanding 100 kg each with only 60 kg available
        // receive 30 kg each.
        let available = grass_mass(60.0);
        let portions = distribute_forage(
            ForageDistributionAlgorithm::Equally,
            &available,
            vec![(0, grass_mass(100.0)), (1, grass_mass(100.0))],
        );
        assert!((portions[0].1.get(ForageType::Grass) - 30.0).abs() < 1e-9);
        assert!((portions[1].1.get(ForageType::Grass) - 30.0).abs() < 1e-9);
        let total: f64 = portions
            .iter()
            .map(|(_, p)| p.get(ForageType::Grass))
            .sum();
        assert!((total - 60.0).abs() < 1e-9);
    }

    #[test]
    fn allocation_sum_is_min_of_available_and_demand() {
        let available = grass_mass(500.0);
        let demands = vec![
            (0, grass_mass(120.0)),
            (1, grass_mass(80.0)),
            (2, grass_mass(50.0)),
        ];
        let portions =
            distribute_forage(ForageDistributionAlgorithm::Equally, &available, demands);
        let total: f64 = portions
            .iter()
            .map(|(_, p)| p.get(ForageType::Grass))
            .sum();
        assert!((total - 250.0).abs() < 1e-9);

        let scarce = grass_mass(100.0);
        let demands = vec![
            (0, grass_mass(120.0)),
            (1, grass_mass(80.0)),
            (2, grass_mass(50.0)),
        ];
        let portions =
            distribute_forage(ForageDistributionAlgorithm::Equally, &scarce, demands);
        let total: f64 = portions
            .iter()
            .map(|(_, p)| p.get(ForageType::Grass))
            .sum();
        assert!((total - 100.0).abs() < 1e-9);
        for (_, portion) in &portions {
            assert!(portion.get(ForageType::Grass) <= 120.0);
        }
    }

    #[test]
    fn no_portion_exceeds_its_demand() {
        let available = grass_mass(90.0);
        let portions = distribute_forage(
            ForageDistributionAlgorithm::Equally,
            &available,
            vec![(0, grass_mass(100.0)), (1, grass_mass(20.0))],
        );
        assert!(portions[0].1.get(ForageType::Grass) <= 100.0);
        assert!(portions[1].1.get(ForageType::Grass) <= 20.0);
    }

    #[test]
    fn negligible_forage_is_zeroed() {
        let mut habitat = HabitatForage::default();
        habitat.grass.set_mass(NEGLIGIBLE_FORAGE_MASS / 2.0);
        habitat.grass.set_fpc(0.1);
        let corrected = corrected_forage(&habitat);
        assert_eq!(corrected.grass.mass(), 0.0);

        let mut rich = HabitatForage::default();
        rich.grass.set_mass(10.0 * NEGLIGIBLE_FORAGE_MASS);
        rich.grass.set_fpc(0.1);
        let corrected = corrected_forage(&rich);
        assert_eq!(corrected.grass.mass(), 10.0 * NEGLIGIBLE_FORAGE_MASS);
    }
}
