use crate::core::balance::combine_rates;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One named contribution to a breakthrough rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BonusSource {
    pub name: String,
    pub delta: f64,
}

impl BonusSource {
    pub fn new(name: impl Into<String>, delta: f64) -> Self {
        Self {
            name: name.into(),
            delta,
        }
    }
}

/// Record of a single breakthrough roll. Ephemeral; emitted for audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakthroughAttempt {
    pub character_id: Uuid,
    pub target_realm: u32,
    pub base_rate: f64,
    /// In the order they were supplied.
    pub bonus_sources: Vec<BonusSource>,
    pub final_rate: f64,
    pub succeeded: bool,
    pub rolled_value: f64,
    /// Experience of the state the attempt was rolled against.
    pub experience_before: u64,
}

/// Experience required to enter each realm. Index 0 is the starting realm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealmTable {
    requirements: Vec<u64>,
}

impl RealmTable {
    /// `requirements[i]` is the cost of entering realm `i + 1`.
    pub fn new(requirements: Vec<u64>) -> Self {
        Self { requirements }
    }

    pub fn max_realm(&self) -> u32 {
        self.requirements.len() as u32
    }

    pub fn requirement(&self, realm: u32) -> Option<u64> {
        if realm == 0 {
            return Some(0);
        }
        self.requirements.get(realm as usize - 1).copied()
    }

    pub fn requirements(&self) -> &[u64] {
        &self.requirements
    }
}

/// Realm rules and bonus coefficients for breakthroughs.
#[derive(Debug, Clone, PartialEq)]
pub struct BreakthroughRules {
    pub realms: RealmTable,
    pub base_rate: f64,
    /// Subtracted from the base rate per target realm.
    pub realm_difficulty: f64,
    pub luck_per_point: f64,
    pub abode_bonus_per_level: f64,
    pub toxin_penalty_per_point: f64,
    pub failure_loss_rate: f64,
    pub abode_loss_reduction: f64,
}

impl BreakthroughRules {
    /// Base rate for `target_realm`, floored at zero.
    pub fn base_rate_for(&self, target_realm: u32) -> f64 {
        combine_rates(
            self.base_rate,
            [-(self.realm_difficulty * target_realm as f64)],
            0.0,
            1.0,
        )
    }

    /// Share of the requirement lost on failure, reduced by the abode.
    pub fn failure_loss_rate_for(&self, abode_level: u32) -> f64 {
        combine_rates(
            self.failure_loss_rate,
            [-(self.abode_loss_reduction * abode_level as f64)],
            0.0,
            1.0,
        )
    }
}

/// What applying an attempt did to the character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptOutcome {
    pub realm_before: u32,
    pub realm_after: u32,
    pub experience_spent: u64,
    pub experience_lost: u64,
}
