use super::types::{check_luck, LuckPolicy};
use crate::catalog::RarityTier;
use crate::core::balance::{floor_gain, rate_to_ppm, ppm_to_rate};
use crate::core::constants::{LUCK_PIVOT, MAX_LUCK_VALUE, SECONDS_PER_DAY};
use crate::error::Result;
use crate::progression::CharacterProgressionState;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Outcome of a daily luck refresh request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LuckRefresh {
    Refreshed { previous: u8, current: u8 },
    AlreadyRefreshed { current: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PillTier {
    Minor,
    Standard,
    Greater,
    Supreme,
}

impl PillTier {
    pub fn base_bonus(&self) -> f64 {
        match self {
            PillTier::Minor => 5.0,
            PillTier::Standard => 10.0,
            PillTier::Greater => 20.0,
            PillTier::Supreme => 50.0,
        }
    }
}

pub fn quality_multiplier(quality: RarityTier) -> f64 {
    match quality {
        RarityTier::Common => 1.0,
        RarityTier::Uncommon => 1.5,
        RarityTier::Rare => 2.0,
        RarityTier::Epic => 3.0,
        RarityTier::Legendary => 5.0,
    }
}

/// A stack of luck pills consumed at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LuckConsumable {
    pub tier: PillTier,
    pub quality: RarityTier,
    pub quantity: u32,
}

impl LuckConsumable {
    pub fn luck_bonus(&self) -> u64 {
        floor_gain(self.tier.base_bonus() * quality_multiplier(self.quality) * self.quantity as f64)
    }
}

/// Whole UTC days since the epoch.
pub fn utc_day(timestamp: i64) -> i64 {
    timestamp.div_euclid(SECONDS_PER_DAY)
}

pub fn roll_daily_luck<R: Rng + ?Sized>(policy: &LuckPolicy, rng: &mut R) -> u8 {
    let (min, max) = policy.daily_range();
    rng.gen_range(min..=max)
}

/// Re-roll luck once per UTC day. A second request on the same day is a no-op.
pub fn refresh_daily_luck<R: Rng + ?Sized>(
    state: &mut CharacterProgressionState,
    now: i64,
    policy: &LuckPolicy,
    rng: &mut R,
) -> LuckRefresh {
    if let Some(last) = state.last_luck_refresh {
        if utc_day(last) == utc_day(now) {
            return LuckRefresh::AlreadyRefreshed {
                current: state.luck_value,
            };
        }
    }

    let previous = state.luck_value;
    state.luck_value = roll_daily_luck(policy, rng);
    state.last_luck_refresh = Some(now);
    LuckRefresh::Refreshed {
        previous,
        current: state.luck_value,
    }
}

/// Raise luck by a consumable, capped at the domain maximum.
/// Returns `(previous, current)`.
pub fn apply_luck_consumable(
    state: &mut CharacterProgressionState,
    consumable: &LuckConsumable,
) -> (u8, u8) {
    let previous = state.luck_value;
    let raised = (previous as u64)
        .saturating_add(consumable.luck_bonus())
        .min(MAX_LUCK_VALUE as u64);
    state.luck_value = raised as u8;
    (previous, state.luck_value)
}

/// Breakthrough delta from luck: a per-point slope around the pivot plus the
/// band's flat adjustment, summed in fixed point.
pub fn luck_breakthrough_bonus(policy: &LuckPolicy, luck: i64, per_point: f64) -> Result<f64> {
    let band = policy.classify(luck)?;
    let luck = check_luck(luck)? as i64;
    let slope_ppm = (luck - LUCK_PIVOT) * rate_to_ppm(per_point);
    let adjustment_ppm = rate_to_ppm(policy.effect(band).breakthrough_adjustment);
    Ok(ppm_to_rate(slope_ppm + adjustment_ppm))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progression::AttributeKind;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use uuid::Uuid;

    fn state_with_luck(luck: u8) -> CharacterProgressionState {
        let mut state = CharacterProgressionState::new(Uuid::new_v4(), "triple", 0);
        state.luck_value = luck;
        state.focus = AttributeKind::Vitality;
        state
    }

    #[test]
    fn test_pill_bonus_table() {
        let pill = LuckConsumable {
            tier: PillTier::Standard,
            quality: RarityTier::Uncommon,
            quantity: 3,
        };
        assert_eq!(pill.luck_bonus(), 45);

        let pill = LuckConsumable {
            tier: PillTier::Supreme,
            quality: RarityTier::Legendary,
            quantity: 1,
        };
        assert_eq!(pill.luck_bonus(), 250);
    }

    #[test]
    fn test_consumable_caps_at_max() {
        let mut state = state_with_luck(80);
        let pill = LuckConsumable {
            tier: PillTier::Greater,
            quality: RarityTier::Rare,
            quantity: 1,
        };
        assert_eq!(apply_luck_consumable(&mut state, &pill), (80, 100));
    }

    #[test]
    fn test_refresh_once_per_day() {
        let policy = LuckPolicy::standard();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut state = state_with_luck(50);
        let morning = 20_000 * SECONDS_PER_DAY + 3_600;

        let first = refresh_daily_luck(&mut state, morning, &policy, &mut rng);
        assert!(matches!(first, LuckRefresh::Refreshed { previous: 50, .. }));
        let rolled = state.luck_value;

        let again = refresh_daily_luck(&mut state, morning + 7_200, &policy, &mut rng);
        assert_eq!(again, LuckRefresh::AlreadyRefreshed { current: rolled });

        let tomorrow = refresh_daily_luck(&mut state, morning + SECONDS_PER_DAY, &policy, &mut rng);
        assert!(matches!(tomorrow, LuckRefresh::Refreshed { .. }));
        assert_eq!(state.last_luck_refresh, Some(morning + SECONDS_PER_DAY));
    }

    #[test]
    fn test_daily_roll_stays_in_range() {
        let policy = LuckPolicy::standard();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        for _ in 0..1000 {
            assert!(roll_daily_luck(&policy, &mut rng) <= MAX_LUCK_VALUE);
        }
    }

    #[test]
    fn test_luck_breakthrough_bonus() {
        let policy = LuckPolicy::standard();
        assert_eq!(luck_breakthrough_bonus(&policy, 50, 0.005).unwrap(), 0.0);
        assert_eq!(luck_breakthrough_bonus(&policy, 80, 0.005).unwrap(), 0.15);
        // insight band adds +0.20 on top of the slope
        assert_eq!(luck_breakthrough_bonus(&policy, 100, 0.005).unwrap(), 0.45);
        // backlash band subtracts 0.10
        assert_eq!(luck_breakthrough_bonus(&policy, 0, 0.005).unwrap(), -0.35);
        assert!(luck_breakthrough_bonus(&policy, 120, 0.005).is_err());
    }

    #[test]
    fn test_utc_day_handles_negative_timestamps() {
        assert_eq!(utc_day(-1), -1);
        assert_eq!(utc_day(0), 0);
        assert_eq!(utc_day(SECONDS_PER_DAY - 1), 0);
    }
}
