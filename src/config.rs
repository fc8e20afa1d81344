//! Engine configuration: TOML on disk, validated into the rule types the
//! engine runs on.
//!
//! Everything is checked when the file is loaded. A configuration that
//! parses but breaks an invariant (a zero weight, unordered thresholds, an
//! unknown default class) is rejected here so the engine never starts with
//! it.

use crate::advancement::{BreakthroughRules, RealmTable};
use crate::catalog::{AffinityCatalog, AffinityClass, WeightedCatalog};
use crate::core::balance::is_unit_rate;
use crate::core::constants::{
    CONFIG_PATH_ENV, DEFAULT_MAX_CATCH_UP_INTERVALS, DEFAULT_TICK_INTERVAL_SECONDS,
};
use crate::error::{EngineError, Result};
use crate::luck::{BandEffect, LuckBand, LuckPolicy, NUM_LUCK_BANDS};
use crate::outcomes::{MutationTier, OutcomeRules};
use crate::progression::{EventRules, ProgressionSimulator, SpecialEventKind, TrainingRules};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

const EMBEDDED_DEFAULT: &str = include_str!("../config/default.toml");

/// Batch tick timing and parallelism.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchedulerConfig {
    pub interval_seconds: i64,
    /// Worker threads used while dispatching a batch.
    pub concurrency: usize,
    /// Sessions credited at most for one character in one batch.
    pub max_catch_up_intervals: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_seconds: DEFAULT_TICK_INTERVAL_SECONDS,
            concurrency: 8,
            max_catch_up_intervals: DEFAULT_MAX_CATCH_UP_INTERVALS,
        }
    }
}

impl SchedulerConfig {
    fn validate(&self) -> Result<()> {
        if self.interval_seconds <= 0 {
            return Err(EngineError::InvalidConfig(format!(
                "scheduler interval must be positive, got {}",
                self.interval_seconds
            )));
        }
        if self.concurrency == 0 {
            return Err(EngineError::InvalidConfig(
                "scheduler concurrency must be at least 1".to_string(),
            ));
        }
        if self.max_catch_up_intervals == 0 {
            return Err(EngineError::InvalidConfig(
                "max catch-up intervals must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Validated engine configuration. Read-only once built.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub training: TrainingRules,
    pub luck: LuckPolicy,
    pub breakthrough: BreakthroughRules,
    pub scheduler: SchedulerConfig,
    pub outcomes: OutcomeRules,
    pub affinity: AffinityCatalog,
}

impl EngineConfig {
    /// The configuration shipped with the crate.
    pub fn embedded() -> Result<Self> {
        Self::parse_toml(EMBEDDED_DEFAULT)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::parse_toml(&content)?;
        info!(path = %path.display(), classes = config.affinity.classes().len(), "loaded engine config");
        Ok(config)
    }

    /// Load from the path in `ASCEND_CONFIG`, or the embedded default.
    pub fn from_env() -> Result<Self> {
        match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) => Self::load(Path::new(&path)),
            None => Self::embedded(),
        }
    }

    pub fn parse_toml(content: &str) -> Result<Self> {
        let raw: RawConfig = toml::from_str(content)?;
        raw.validate()
    }

    pub fn simulator(&self) -> ProgressionSimulator<'_> {
        ProgressionSimulator::new(&self.training, &self.luck)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    training: RawTraining,
    luck: RawLuck,
    events: RawEvents,
    breakthrough: RawBreakthrough,
    #[serde(default)]
    scheduler: SchedulerConfig,
    outcomes: RawOutcomes,
    affinity: RawAffinity,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTraining {
    base_experience: f64,
    base_attribute: f64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawLuck {
    thresholds: [u8; NUM_LUCK_BANDS - 1],
    daily_min: u8,
    daily_max: u8,
    bands: Vec<RawBand>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawBand {
    band: LuckBand,
    training_multiplier: f64,
    insight_chance: f64,
    backlash_chance: f64,
    breakthrough_adjustment: f64,
    harvest_multiplier: f64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawEvents {
    insight_experience: u64,
    treasure_attribute: u64,
    setback_experience: u64,
    deviation_experience: u64,
    deviation_toxin: u32,
    weights: RawEventWeights,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawEventWeights {
    insight: i64,
    spirit_treasure: i64,
    setback: i64,
    qi_deviation: i64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawBreakthrough {
    base_rate: f64,
    realm_difficulty: f64,
    luck_per_point: f64,
    abode_bonus_per_level: f64,
    toxin_penalty_per_point: f64,
    failure_loss_rate: f64,
    abode_loss_reduction: f64,
    realm_requirements: Vec<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawOutcomes {
    alchemy_realm_bonus: f64,
    alchemy_luck_bonus: f64,
    alchemy_abode_bonus: f64,
    alchemy_abode_threshold: u32,
    alchemy_min_rate: f64,
    alchemy_max_rate: f64,
    quality_steps: Vec<RawQualityStep>,
    fortunate_quality_steps: Vec<RawQualityStep>,
    mutation: Vec<RawMutation>,
    fortunate_mutation: Vec<RawMutation>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawQualityStep {
    steps: u8,
    weight: i64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawMutation {
    tier: MutationTier,
    weight: i64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawAffinity {
    default_class: String,
    classes: Vec<AffinityClass>,
}

impl RawConfig {
    fn validate(self) -> Result<EngineConfig> {
        self.scheduler.validate()?;
        Ok(EngineConfig {
            training: validate_training(self.training, self.events)?,
            luck: validate_luck(self.luck)?,
            breakthrough: validate_breakthrough(self.breakthrough)?,
            scheduler: self.scheduler,
            outcomes: validate_outcomes(self.outcomes)?,
            affinity: AffinityCatalog::new(self.affinity.classes, &self.affinity.default_class)?,
        })
    }
}

fn non_negative(name: &str, value: f64) -> Result<f64> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(EngineError::InvalidConfig(format!(
            "{} must be a non-negative number, got {}",
            name, value
        )))
    }
}

fn unit(name: &str, value: f64) -> Result<f64> {
    if is_unit_rate(value) {
        Ok(value)
    } else {
        Err(EngineError::InvalidConfig(format!(
            "{} must be within [0, 1], got {}",
            name, value
        )))
    }
}

fn validate_training(training: RawTraining, events: RawEvents) -> Result<TrainingRules> {
    let weights = events.weights;
    Ok(TrainingRules {
        base_experience: non_negative("training.base_experience", training.base_experience)?,
        base_attribute: non_negative("training.base_attribute", training.base_attribute)?,
        events: EventRules {
            insight_experience: events.insight_experience,
            treasure_attribute: events.treasure_attribute,
            setback_experience: events.setback_experience,
            deviation_experience: events.deviation_experience,
            deviation_toxin: events.deviation_toxin,
            positive: WeightedCatalog::new(vec![
                (SpecialEventKind::Insight, weights.insight),
                (SpecialEventKind::SpiritTreasure, weights.spirit_treasure),
            ])?,
            negative: WeightedCatalog::new(vec![
                (SpecialEventKind::Setback, weights.setback),
                (SpecialEventKind::QiDeviation, weights.qi_deviation),
            ])?,
        },
    })
}

fn validate_luck(luck: RawLuck) -> Result<LuckPolicy> {
    let mut effects: [Option<BandEffect>; NUM_LUCK_BANDS] = [None; NUM_LUCK_BANDS];
    for raw in luck.bands {
        let slot = &mut effects[raw.band.index()];
        if slot.is_some() {
            return Err(EngineError::InvalidConfig(format!(
                "luck band {} is configured twice",
                raw.band.name()
            )));
        }
        *slot = Some(BandEffect {
            training_multiplier: raw.training_multiplier,
            insight_chance: raw.insight_chance,
            backlash_chance: raw.backlash_chance,
            breakthrough_adjustment: raw.breakthrough_adjustment,
            harvest_multiplier: raw.harvest_multiplier,
        });
    }

    let mut resolved = Vec::with_capacity(NUM_LUCK_BANDS);
    for band in LuckBand::all() {
        resolved.push(effects[band.index()].ok_or_else(|| {
            EngineError::InvalidConfig(format!("luck band {} is not configured", band.name()))
        })?);
    }
    let resolved: [BandEffect; NUM_LUCK_BANDS] = resolved
        .try_into()
        .map_err(|_| EngineError::InvalidConfig("luck bands are incomplete".to_string()))?;

    LuckPolicy::new(luck.thresholds, resolved, luck.daily_min, luck.daily_max)
}

fn validate_breakthrough(raw: RawBreakthrough) -> Result<BreakthroughRules> {
    if raw.realm_requirements.is_empty() {
        return Err(EngineError::InvalidConfig(
            "realm table has no realms".to_string(),
        ));
    }
    if raw.realm_requirements.windows(2).any(|pair| pair[0] >= pair[1]) {
        return Err(EngineError::InvalidConfig(
            "realm requirements must be strictly increasing".to_string(),
        ));
    }
    Ok(BreakthroughRules {
        realms: RealmTable::new(raw.realm_requirements),
        base_rate: unit("breakthrough.base_rate", raw.base_rate)?,
        realm_difficulty: unit("breakthrough.realm_difficulty", raw.realm_difficulty)?,
        luck_per_point: unit("breakthrough.luck_per_point", raw.luck_per_point)?,
        abode_bonus_per_level: unit("breakthrough.abode_bonus_per_level", raw.abode_bonus_per_level)?,
        toxin_penalty_per_point: unit(
            "breakthrough.toxin_penalty_per_point",
            raw.toxin_penalty_per_point,
        )?,
        failure_loss_rate: unit("breakthrough.failure_loss_rate", raw.failure_loss_rate)?,
        abode_loss_reduction: unit("breakthrough.abode_loss_reduction", raw.abode_loss_reduction)?,
    })
}

fn validate_outcomes(raw: RawOutcomes) -> Result<OutcomeRules> {
    let min = unit("outcomes.alchemy_min_rate", raw.alchemy_min_rate)?;
    let max = unit("outcomes.alchemy_max_rate", raw.alchemy_max_rate)?;
    if min > max {
        return Err(EngineError::InvalidConfig(format!(
            "alchemy rate bounds are inverted: {} > {}",
            min, max
        )));
    }
    let steps = |entries: Vec<RawQualityStep>| {
        WeightedCatalog::new(entries.into_iter().map(|e| (e.steps, e.weight)).collect())
    };
    let tiers = |entries: Vec<RawMutation>| {
        WeightedCatalog::new(entries.into_iter().map(|e| (e.tier, e.weight)).collect())
    };
    Ok(OutcomeRules {
        alchemy_realm_bonus: unit("outcomes.alchemy_realm_bonus", raw.alchemy_realm_bonus)?,
        alchemy_luck_bonus: unit("outcomes.alchemy_luck_bonus", raw.alchemy_luck_bonus)?,
        alchemy_abode_bonus: unit("outcomes.alchemy_abode_bonus", raw.alchemy_abode_bonus)?,
        alchemy_abode_threshold: raw.alchemy_abode_threshold,
        alchemy_min_rate: min,
        alchemy_max_rate: max,
        quality_steps: steps(raw.quality_steps)?,
        fortunate_quality_steps: steps(raw.fortunate_quality_steps)?,
        mutation: tiers(raw.mutation)?,
        fortunate_mutation: tiers(raw.fortunate_mutation)?,
    })
}
