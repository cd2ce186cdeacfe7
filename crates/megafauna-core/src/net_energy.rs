//! Net energy content of forage.

use crate::forage::{Digestibility, ForageEnergyContent, ForageType};
use crate::hft::{DigestionType, NetEnergyModel};

/// Metabolizable energy coefficient of grass [MJ/kgDM].
///
/// ME may be calculated from digestible organic matter content as
/// `ME = 15 * DOMD` (Givens et al. 1989, citing MAFF et al. 1984).
pub const ME_COEFFICIENT_GRASS: f64 = 15.0;

/// Digestion efficiency factor of hindgut fermenters relative to ruminants,
/// from the model of Illius & Gordon (1992).
pub const DIGESTION_EFFICIENCY_HINDGUT: f64 = 0.93;

/// Net energy content [MJ/kgDM] of the forage for one herbivore type.
///
/// The default model multiplies digestibility with a forage-specific ME
/// coefficient and converts to net energy with the formula for ruminants of
/// Illius & Gordon (1992, citing ARC 1980):
/// `NE = ME * (0.019 * ME + 0.503) * e`, where `e` is 1.0 for ruminants and
/// 0.93 for hindgut fermenters. Inedible forage has zero energy.
pub fn net_energy_content(
    model: NetEnergyModel,
    digestion_type: DigestionType,
    digestibility: &Digestibility,
) -> ForageEnergyContent {
    match model {
        NetEnergyModel::Default => {
            let efficiency = match digestion_type {
                DigestionType::Ruminant => 1.0,
                DigestionType::Hindgut => DIGESTION_EFFICIENCY_HINDGUT,
            };
            let mut result = ForageEnergyContent::default();
            for ft in ForageType::EDIBLE {
                let me = match ft {
                    ForageType::Grass => digestibility.get(ft) * ME_COEFFICIENT_GRASS,
                    ForageType::Inedible => unreachable!(),
                };
                result.set(ft, me * (0.019 * me + 0.503) * efficiency);
            }
            result
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digestibility(value: f64) -> Digestibility {
        let mut d = Digestibility::default();
        d.set(ForageType::Grass, value);
        d
    }

    #[test]
    fn zero_digestibility_gives_zero_energy() {
        let content = net_energy_content(
            NetEnergyModel::Default,
            DigestionType::Ruminant,
            &digestibility(0.0),
        );
        assert_eq!(content.get(ForageType::Grass), 0.0);
    }

    #[test]
    fn ruminant_grass_formula() {
        let d = 0.5;
        let me = d * ME_COEFFICIENT_GRASS;
        let expected = me * (0.019 * me + 0.503);
        let content = net_energy_content(
            NetEnergyModel::Default,
            DigestionType::Ruminant,
            &digestibility(d),
        );
        assert!((content.get(ForageType::Grass) - expected).abs() < 1e-12);
    }

    #[test]
    fn hindgut_gets_less_energy_than_ruminant() {
        let d = digestibility(0.6);
        let ruminant = net_energy_content(NetEnergyModel::Default, DigestionType::Ruminant, &d);
        let hindgut = net_energy_content(NetEnergyModel::Default, DigestionType::Hindgut, &d);
        assert!(
            hindgut.get(ForageType::Grass)
                < ruminant.get(ForageType::Grass)
        );
        assert!(
            (hindgut.get(ForageType::Grass)
                - ruminant.get(ForageType::Grass) * DIGESTION_EFFICIENCY_HINDGUT)
                .abs()
                < 1e-12
        );
    }

    #[test]
    fn energy_content_rises_with_digestibility() {
        let low = net_energy_content(
            NetEnergyModel::Default,
            DigestionType::Ruminant,
            &digestibility(0.3),
        );
        let high = net_energy_content(
            NetEnergyModel::Default,
            DigestionType::Ruminant,
            &digestibility(0.7),
        );
        assert!(high.get(ForageType::Grass) > low.get(ForageType::Grass));
    }
}
