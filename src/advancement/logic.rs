use super::types::{AttemptOutcome, BonusSource, BreakthroughAttempt, BreakthroughRules};
use crate::catalog::AffinityClass;
use crate::core::balance::{combine_rates, is_unit_rate, rate_to_ppm};
use crate::core::constants::RATE_SCALE;
use crate::error::{EngineError, Result};
use crate::luck::{luck_breakthrough_bonus, LuckPolicy};
use crate::progression::CharacterProgressionState;
use rand::Rng;
use uuid::Uuid;

/// Resolve a breakthrough with one uniform draw in `[0, 1)`.
///
/// `final_rate = clamp(base_rate + sum(bonuses), 0, 1)` and the attempt
/// succeeds iff `rolled < final_rate`, so a rate of 0 never succeeds and a
/// rate of 1 always does.
pub fn evaluate<R: Rng + ?Sized>(
    character_id: Uuid,
    target_realm: u32,
    base_rate: f64,
    bonuses: Vec<BonusSource>,
    rng: &mut R,
) -> Result<BreakthroughAttempt> {
    if !is_unit_rate(base_rate) {
        return Err(EngineError::InvalidRate {
            context: "breakthrough base rate",
            value: base_rate,
        });
    }
    if let Some(bad) = bonuses.iter().find(|bonus| !bonus.delta.is_finite()) {
        return Err(EngineError::InvalidRate {
            context: "breakthrough bonus",
            value: bad.delta,
        });
    }

    let final_rate = combine_rates(base_rate, bonuses.iter().map(|b| b.delta), 0.0, 1.0);
    let rolled_value = rng.gen::<f64>();

    Ok(BreakthroughAttempt {
        character_id,
        target_realm,
        base_rate,
        bonus_sources: bonuses,
        final_rate,
        succeeded: rolled_value < final_rate,
        rolled_value,
        experience_before: 0,
    })
}

/// Check that `target_realm` may be attempted now and return its requirement.
pub fn check_attempt(
    state: &CharacterProgressionState,
    target_realm: u32,
    rules: &BreakthroughRules,
) -> Result<u64> {
    let current = state.cultivation_realm;
    if current >= rules.realms.max_realm() {
        return Err(EngineError::RealmCapReached(current));
    }
    if target_realm != current + 1 {
        return Err(EngineError::InvalidTargetRealm {
            current,
            target: target_realm,
        });
    }
    let required = rules
        .realms
        .requirement(target_realm)
        .ok_or(EngineError::RealmCapReached(current))?;
    if state.experience < required {
        return Err(EngineError::InsufficientExperience {
            realm: target_realm,
            required,
            available: state.experience,
        });
    }
    Ok(required)
}

/// Bonus sources in audit order: affinity, luck, consumed items, abode, toxin.
pub fn assemble_bonuses(
    state: &CharacterProgressionState,
    affinity: &AffinityClass,
    luck: &LuckPolicy,
    rules: &BreakthroughRules,
    consumed: &[BonusSource],
) -> Result<Vec<BonusSource>> {
    let mut bonuses = Vec::with_capacity(consumed.len() + 4);
    bonuses.push(BonusSource::new("affinity", affinity.breakthrough_bonus));
    bonuses.push(BonusSource::new(
        "luck",
        luck_breakthrough_bonus(luck, state.luck_value as i64, rules.luck_per_point)?,
    ));
    bonuses.extend(consumed.iter().cloned());
    if state.abode_level > 0 {
        bonuses.push(BonusSource::new(
            "abode",
            rules.abode_bonus_per_level * state.abode_level as f64,
        ));
    }
    if state.toxin_level > 0 {
        bonuses.push(BonusSource::new(
            "toxin",
            -(rules.toxin_penalty_per_point * state.toxin_level as f64),
        ));
    }
    Ok(bonuses)
}

/// Check, assemble and roll a breakthrough for `state`. Does not mutate it.
pub fn attempt_breakthrough<R: Rng + ?Sized>(
    state: &CharacterProgressionState,
    target_realm: u32,
    affinity: &AffinityClass,
    luck: &LuckPolicy,
    rules: &BreakthroughRules,
    consumed: &[BonusSource],
    rng: &mut R,
) -> Result<BreakthroughAttempt> {
    check_attempt(state, target_realm, rules)?;
    let bonuses = assemble_bonuses(state, affinity, luck, rules, consumed)?;
    let mut attempt = evaluate(
        state.character_id,
        target_realm,
        rules.base_rate_for(target_realm),
        bonuses,
        rng,
    )?;
    attempt.experience_before = state.experience;
    Ok(attempt)
}

/// Apply a resolved attempt to the state it was rolled for.
///
/// The state must still hold the realm and experience the attempt was rolled
/// against. Both change on every applied outcome that costs anything, so a
/// second application of the same attempt is rejected.
pub fn apply_attempt(
    state: &mut CharacterProgressionState,
    attempt: &BreakthroughAttempt,
    rules: &BreakthroughRules,
) -> Result<AttemptOutcome> {
    if attempt.character_id != state.character_id
        || attempt.experience_before != state.experience
    {
        return Err(EngineError::StaleAttempt(attempt.character_id));
    }
    let realm_before = state.cultivation_realm;
    let required = check_target(state, attempt.target_realm, rules)?;

    if attempt.succeeded {
        state.experience = state.experience.saturating_sub(required);
        state.cultivation_realm = attempt.target_realm;
        Ok(AttemptOutcome {
            realm_before,
            realm_after: state.cultivation_realm,
            experience_spent: required,
            experience_lost: 0,
        })
    } else {
        let loss_ppm = rate_to_ppm(rules.failure_loss_rate_for(state.abode_level)).max(0) as u128;
        let lost = (required as u128 * loss_ppm / RATE_SCALE as u128) as u64;
        let lost = lost.min(state.experience);
        state.experience -= lost;
        Ok(AttemptOutcome {
            realm_before,
            realm_after: realm_before,
            experience_spent: 0,
            experience_lost: lost,
        })
    }
}

fn check_target(
    state: &CharacterProgressionState,
    target_realm: u32,
    rules: &BreakthroughRules,
) -> Result<u64> {
    if target_realm != state.cultivation_realm + 1 {
        return Err(EngineError::InvalidTargetRealm {
            current: state.cultivation_realm,
            target: target_realm,
        });
    }
    rules
        .realms
        .requirement(target_realm)
        .ok_or(EngineError::RealmCapReached(state.cultivation_realm))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advancement::types::RealmTable;
    use crate::catalog::RarityTier;
    use crate::testing::FixedRoll;

    fn rules() -> BreakthroughRules {
        BreakthroughRules {
            realms: RealmTable::new(vec![100, 250, 450]),
            base_rate: 0.5,
            realm_difficulty: 0.01,
            luck_per_point: 0.005,
            abode_bonus_per_level: 0.01,
            toxin_penalty_per_point: 0.001,
            failure_loss_rate: 0.20,
            abode_loss_reduction: 0.02,
        }
    }

    fn affinity(bonus: f64) -> AffinityClass {
        AffinityClass {
            id: "single".to_string(),
            display_name: "Single".to_string(),
            training_multiplier: 1.2,
            breakthrough_bonus: bonus,
            rarity: RarityTier::Rare,
            weight: 20,
        }
    }

    fn state(experience: u64) -> CharacterProgressionState {
        let mut state = CharacterProgressionState::new(Uuid::new_v4(), "single", 0);
        state.experience = experience;
        state
    }

    #[test]
    fn test_evaluate_sums_and_rolls() {
        let mut rng = FixedRoll::new(0.10);
        let attempt = evaluate(
            Uuid::nil(),
            1,
            0.05,
            vec![BonusSource::new("affinity", 0.15), BonusSource::new("pill", 0.05)],
            &mut rng,
        )
        .unwrap();
        assert_eq!(attempt.final_rate, 0.25);
        assert!(attempt.succeeded);
        assert_eq!(attempt.bonus_sources[0].name, "affinity");
        assert_eq!(attempt.bonus_sources[1].name, "pill");
    }

    #[test]
    fn test_equal_roll_fails() {
        let mut rng = FixedRoll::new(0.25);
        let attempt = evaluate(Uuid::nil(), 1, 0.25, vec![], &mut rng).unwrap();
        assert!(!attempt.succeeded);
    }

    #[test]
    fn test_evaluate_rejects_bad_rates() {
        let mut rng = FixedRoll::new(0.5);
        assert!(evaluate(Uuid::nil(), 1, 1.5, vec![], &mut rng).is_err());
        assert!(evaluate(Uuid::nil(), 1, -0.1, vec![], &mut rng).is_err());
        assert!(evaluate(
            Uuid::nil(),
            1,
            0.5,
            vec![BonusSource::new("bad", f64::NAN)],
            &mut rng
        )
        .is_err());
    }

    #[test]
    fn test_final_rate_clamped() {
        let mut rng = FixedRoll::new(0.999);
        let attempt = evaluate(
            Uuid::nil(),
            1,
            0.9,
            vec![BonusSource::new("pill", 0.9)],
            &mut rng,
        )
        .unwrap();
        assert_eq!(attempt.final_rate, 1.0);
        assert!(attempt.succeeded);
    }

    #[test]
    fn test_check_attempt_rules() {
        let rules = rules();
        let s = state(99);
        assert!(matches!(
            check_attempt(&s, 1, &rules),
            Err(EngineError::InsufficientExperience { required: 100, .. })
        ));
        assert!(matches!(
            check_attempt(&s, 2, &rules),
            Err(EngineError::InvalidTargetRealm { current: 0, target: 2 })
        ));

        let mut top = state(10_000);
        top.cultivation_realm = 3;
        assert!(matches!(
            check_attempt(&top, 4, &rules),
            Err(EngineError::RealmCapReached(3))
        ));
    }

    #[test]
    fn test_bonus_order() {
        let rules = rules();
        let mut s = state(100);
        s.luck_value = 60;
        s.abode_level = 3;
        s.toxin_level = 20;
        let bonuses = assemble_bonuses(
            &s,
            &affinity(0.05),
            &LuckPolicy::standard(),
            &rules,
            &[BonusSource::new("breakthrough_pill", 0.30)],
        )
        .unwrap();
        let names: Vec<&str> = bonuses.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, ["affinity", "luck", "breakthrough_pill", "abode", "toxin"]);
        assert_eq!(bonuses[1].delta, 0.05);
        assert!((bonuses[4].delta + 0.02).abs() < 1e-12);
    }

    #[test]
    fn test_success_consumes_requirement() {
        let rules = rules();
        let mut s = state(130);
        let attempt = attempt_breakthrough(
            &s,
            1,
            &affinity(0.0),
            &LuckPolicy::standard(),
            &rules,
            &[],
            &mut FixedRoll::new(0.0),
        )
        .unwrap();
        assert_eq!(attempt.base_rate, 0.49);
        let outcome = apply_attempt(&mut s, &attempt, &rules).unwrap();
        assert_eq!(outcome.realm_after, 1);
        assert_eq!(s.experience, 30);

        // Applying the same attempt again is rejected.
        assert!(apply_attempt(&mut s, &attempt, &rules).is_err());
        assert_eq!(s.cultivation_realm, 1);
    }

    #[test]
    fn test_failure_loses_share_of_requirement() {
        let rules = rules();
        let mut s = state(260);
        s.cultivation_realm = 1;
        s.abode_level = 1;
        let attempt = attempt_breakthrough(
            &s,
            2,
            &affinity(0.0),
            &LuckPolicy::standard(),
            &rules,
            &[],
            &mut FixedRoll::new(0.99),
        )
        .unwrap();
        assert!(!attempt.succeeded);
        let outcome = apply_attempt(&mut s, &attempt, &rules).unwrap();
        // 250 * (0.20 - 0.02) = 45
        assert_eq!(outcome.experience_lost, 45);
        assert_eq!(s.experience, 215);
        assert_eq!(s.cultivation_realm, 1);
    }

    #[test]
    fn test_failed_attempt_applies_once() {
        let rules = rules();
        let mut s = state(100);
        let attempt = attempt_breakthrough(
            &s,
            1,
            &affinity(0.0),
            &LuckPolicy::standard(),
            &rules,
            &[],
            &mut FixedRoll::new(0.99),
        )
        .unwrap();
        assert!(!attempt.succeeded);
        assert_eq!(attempt.experience_before, 100);

        let outcome = apply_attempt(&mut s, &attempt, &rules).unwrap();
        assert_eq!(outcome.experience_lost, 20);
        assert_eq!(s.experience, 80);

        assert!(matches!(
            apply_attempt(&mut s, &attempt, &rules),
            Err(EngineError::StaleAttempt(_))
        ));
        assert_eq!(s.experience, 80);
        assert_eq!(s.cultivation_realm, 0);
    }

    #[test]
    fn test_attempt_rejected_after_state_moves() {
        let rules = rules();
        let mut s = state(120);
        let attempt = attempt_breakthrough(
            &s,
            1,
            &affinity(0.0),
            &LuckPolicy::standard(),
            &rules,
            &[],
            &mut FixedRoll::new(0.0),
        )
        .unwrap();

        s.experience += 10;
        assert!(matches!(
            apply_attempt(&mut s, &attempt, &rules),
            Err(EngineError::StaleAttempt(_))
        ));

        let mut other = state(120);
        assert!(matches!(
            apply_attempt(&mut other, &attempt, &rules),
            Err(EngineError::StaleAttempt(_))
        ));
        assert_eq!(other.cultivation_realm, 0);
    }

    #[test]
    fn test_high_abode_removes_failure_loss() {
        let rules = rules();
        assert_eq!(rules.failure_loss_rate_for(10), 0.0);
        assert_eq!(rules.failure_loss_rate_for(15), 0.0);
    }
}
