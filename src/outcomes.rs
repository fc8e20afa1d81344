//! Luck effects on crafting and farming: alchemy success and quality,
//! harvest quantity and crop mutation.

use crate::catalog::{RarityTier, WeightedCatalog};
use crate::core::balance::{combine_rates, floor_gain, is_unit_rate};
use crate::core::constants::LUCK_PIVOT;
use crate::error::{EngineError, Result};
use crate::luck::{LuckBand, LuckPolicy};
use rand::Rng;
use serde::{Deserialize, Serialize};

const QUALITY_LADDER: [RarityTier; 5] = [
    RarityTier::Common,
    RarityTier::Uncommon,
    RarityTier::Rare,
    RarityTier::Epic,
    RarityTier::Legendary,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationTier {
    None,
    Mutated,
    Exalted,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutcomeRules {
    pub alchemy_realm_bonus: f64,
    pub alchemy_luck_bonus: f64,
    pub alchemy_abode_bonus: f64,
    /// Abode levels at or below this give no alchemy bonus.
    pub alchemy_abode_threshold: u32,
    pub alchemy_min_rate: f64,
    pub alchemy_max_rate: f64,
    pub quality_steps: WeightedCatalog<u8>,
    pub fortunate_quality_steps: WeightedCatalog<u8>,
    pub mutation: WeightedCatalog<MutationTier>,
    pub fortunate_mutation: WeightedCatalog<MutationTier>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlchemyOutcome {
    pub band: LuckBand,
    pub success_rate: f64,
    pub rolled_value: f64,
    pub succeeded: bool,
    /// Final quality on success.
    pub quality: Option<RarityTier>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarvestOutcome {
    pub band: LuckBand,
    pub quantity: u64,
    pub mutation: MutationTier,
}

/// Who is brewing: the inputs to the success rate.
#[derive(Debug, Clone, Copy)]
pub struct Brewer {
    pub realm: u32,
    pub luck: i64,
    pub abode_level: u32,
}

/// Success rate for a recipe, clamped to the configured bounds.
pub fn alchemy_success_rate(rules: &OutcomeRules, base_rate: f64, brewer: &Brewer) -> Result<f64> {
    if !is_unit_rate(base_rate) {
        return Err(EngineError::InvalidRate {
            context: "alchemy base rate",
            value: base_rate,
        });
    }
    crate::luck::check_luck(brewer.luck)?;

    let abode_levels = brewer.abode_level.saturating_sub(rules.alchemy_abode_threshold);
    Ok(combine_rates(
        base_rate,
        [
            rules.alchemy_realm_bonus * brewer.realm as f64,
            rules.alchemy_luck_bonus * (brewer.luck - LUCK_PIVOT) as f64,
            rules.alchemy_abode_bonus * abode_levels as f64,
        ],
        rules.alchemy_min_rate,
        rules.alchemy_max_rate,
    ))
}

/// Roll one alchemy session. Quality steps are drawn only on success.
pub fn brew<R: Rng + ?Sized>(
    rules: &OutcomeRules,
    luck: &LuckPolicy,
    base_rate: f64,
    base_quality: RarityTier,
    brewer: &Brewer,
    rng: &mut R,
) -> Result<AlchemyOutcome> {
    let band = luck.classify(brewer.luck)?;
    let success_rate = alchemy_success_rate(rules, base_rate, brewer)?;
    let rolled_value = rng.gen::<f64>();
    let succeeded = rolled_value < success_rate;

    let quality = if succeeded {
        let table = if band.is_fortunate() {
            &rules.fortunate_quality_steps
        } else {
            &rules.quality_steps
        };
        Some(upgrade_quality(base_quality, *table.draw(rng)))
    } else {
        None
    };

    Ok(AlchemyOutcome {
        band,
        success_rate,
        rolled_value,
        succeeded,
        quality,
    })
}

/// Harvest a plot yielding `min..=max` before the luck multiplier.
pub fn harvest<R: Rng + ?Sized>(
    rules: &OutcomeRules,
    luck: &LuckPolicy,
    luck_value: i64,
    min: u64,
    max: u64,
    rng: &mut R,
) -> Result<HarvestOutcome> {
    if min > max {
        return Err(EngineError::InvalidConfig(format!(
            "harvest range {}..={} is empty",
            min, max
        )));
    }
    let reading = luck.read(luck_value)?;
    let raw = rng.gen_range(min..=max);
    let quantity = floor_gain(raw as f64 * reading.effect.harvest_multiplier);

    let table = if reading.band.is_fortunate() {
        &rules.fortunate_mutation
    } else {
        &rules.mutation
    };

    Ok(HarvestOutcome {
        band: reading.band,
        quantity,
        mutation: *table.draw(rng),
    })
}

fn upgrade_quality(base: RarityTier, steps: u8) -> RarityTier {
    let start = QUALITY_LADDER
        .iter()
        .position(|tier| *tier == base)
        .unwrap_or(0);
    let index = (start + steps as usize).min(QUALITY_LADDER.len() - 1);
    QUALITY_LADDER[index]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FixedRoll;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn rules() -> OutcomeRules {
        OutcomeRules {
            alchemy_realm_bonus: 0.02,
            alchemy_luck_bonus: 0.001,
            alchemy_abode_bonus: 0.05,
            alchemy_abode_threshold: 2,
            alchemy_min_rate: 0.10,
            alchemy_max_rate: 0.95,
            quality_steps: WeightedCatalog::new(vec![(0, 85), (1, 12), (2, 3)]).unwrap(),
            fortunate_quality_steps: WeightedCatalog::new(vec![(0, 60), (1, 28), (2, 12)])
                .unwrap(),
            mutation: WeightedCatalog::new(vec![
                (MutationTier::None, 95),
                (MutationTier::Mutated, 4),
                (MutationTier::Exalted, 1),
            ])
            .unwrap(),
            fortunate_mutation: WeightedCatalog::new(vec![
                (MutationTier::None, 80),
                (MutationTier::Mutated, 15),
                (MutationTier::Exalted, 5),
            ])
            .unwrap(),
        }
    }

    #[test]
    fn test_alchemy_rate_components() {
        let brewer = Brewer {
            realm: 5,
            luck: 70,
            abode_level: 4,
        };
        // 0.5 + 0.10 + 0.02 + 0.10
        assert_eq!(alchemy_success_rate(&rules(), 0.5, &brewer).unwrap(), 0.72);
    }

    #[test]
    fn test_alchemy_rate_clamped() {
        let low = Brewer {
            realm: 0,
            luck: 0,
            abode_level: 0,
        };
        assert_eq!(alchemy_success_rate(&rules(), 0.0, &low).unwrap(), 0.10);

        let high = Brewer {
            realm: 30,
            luck: 100,
            abode_level: 9,
        };
        assert_eq!(alchemy_success_rate(&rules(), 0.9, &high).unwrap(), 0.95);
    }

    #[test]
    fn test_failed_brew_has_no_quality() {
        let brewer = Brewer {
            realm: 0,
            luck: 50,
            abode_level: 0,
        };
        let outcome = brew(
            &rules(),
            &LuckPolicy::standard(),
            0.5,
            RarityTier::Common,
            &brewer,
            &mut FixedRoll::new(0.9),
        )
        .unwrap();
        assert!(!outcome.succeeded);
        assert!(outcome.quality.is_none());
    }

    #[test]
    fn test_quality_never_drops() {
        let brewer = Brewer {
            realm: 10,
            luck: 95,
            abode_level: 5,
        };
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        for _ in 0..500 {
            let outcome = brew(
                &rules(),
                &LuckPolicy::standard(),
                0.7,
                RarityTier::Rare,
                &brewer,
                &mut rng,
            )
            .unwrap();
            if let Some(quality) = outcome.quality {
                assert!(matches!(
                    quality,
                    RarityTier::Rare | RarityTier::Epic | RarityTier::Legendary
                ));
            }
        }
    }

    #[test]
    fn test_upgrade_caps_at_legendary() {
        assert_eq!(upgrade_quality(RarityTier::Epic, 2), RarityTier::Legendary);
        assert_eq!(upgrade_quality(RarityTier::Common, 1), RarityTier::Uncommon);
    }

    #[test]
    fn test_harvest_scaled_by_band() {
        let policy = LuckPolicy::standard();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        for _ in 0..200 {
            let neutral = harvest(&rules(), &policy, 50, 10, 10, &mut rng).unwrap();
            assert_eq!(neutral.quantity, 10);
            let insight = harvest(&rules(), &policy, 95, 10, 10, &mut rng).unwrap();
            assert_eq!(insight.quantity, 15);
            let backlash = harvest(&rules(), &policy, 5, 10, 10, &mut rng).unwrap();
            assert_eq!(backlash.quantity, 5);
        }
    }

    #[test]
    fn test_harvest_rejects_empty_range() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        assert!(harvest(&rules(), &LuckPolicy::standard(), 50, 5, 4, &mut rng).is_err());
    }
}
