use super::attributes::{AttributeKind, AttributeTotals};
use crate::catalog::WeightedCatalog;
use crate::luck::LuckBand;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Persistent progression fields for one character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterProgressionState {
    pub character_id: Uuid,
    /// Drawn once at creation and fixed for life.
    pub affinity_class_id: String,
    pub luck_value: u8,
    pub cultivation_realm: u32,
    pub experience: u64,
    pub attribute_totals: AttributeTotals,
    pub last_tick_timestamp: i64,
    pub toxin_level: u32,
    pub focus: AttributeKind,
    pub abode_level: u32,
    pub last_luck_refresh: Option<i64>,
    /// Optimistic concurrency token, bumped by the store on every save.
    pub version: u64,
    pub created_at: i64,
}

impl CharacterProgressionState {
    pub fn new(character_id: Uuid, affinity_class_id: &str, now: i64) -> Self {
        Self {
            character_id,
            affinity_class_id: affinity_class_id.to_string(),
            luck_value: 50,
            cultivation_realm: 0,
            experience: 0,
            attribute_totals: AttributeTotals::new(),
            last_tick_timestamp: now,
            toxin_level: 0,
            focus: AttributeKind::default(),
            abode_level: 0,
            last_luck_refresh: None,
            version: 0,
            created_at: now,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecialEventKind {
    /// Flat experience windfall.
    Insight,
    /// Flat attribute windfall on the focus.
    SpiritTreasure,
    /// Small flat experience penalty.
    Setback,
    /// Larger experience penalty plus toxin.
    QiDeviation,
}

impl SpecialEventKind {
    pub fn all() -> [SpecialEventKind; 4] {
        [
            SpecialEventKind::Insight,
            SpecialEventKind::SpiritTreasure,
            SpecialEventKind::Setback,
            SpecialEventKind::QiDeviation,
        ]
    }

    pub fn index(&self) -> usize {
        match self {
            SpecialEventKind::Insight => 0,
            SpecialEventKind::SpiritTreasure => 1,
            SpecialEventKind::Setback => 2,
            SpecialEventKind::QiDeviation => 3,
        }
    }

    pub fn is_positive(&self) -> bool {
        matches!(self, SpecialEventKind::Insight | SpecialEventKind::SpiritTreasure)
    }

    pub fn name(&self) -> &'static str {
        match self {
            SpecialEventKind::Insight => "insight",
            SpecialEventKind::SpiritTreasure => "spirit_treasure",
            SpecialEventKind::Setback => "setback",
            SpecialEventKind::QiDeviation => "qi_deviation",
        }
    }
}

/// A triggered event with its flat effect on the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialEvent {
    pub kind: SpecialEventKind,
    pub experience_delta: i64,
    pub attribute_delta: i64,
    pub toxin_delta: u32,
}

/// Flat effects and kind tables for special events.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRules {
    pub insight_experience: u64,
    pub treasure_attribute: u64,
    pub setback_experience: u64,
    pub deviation_experience: u64,
    pub deviation_toxin: u32,
    pub positive: WeightedCatalog<SpecialEventKind>,
    pub negative: WeightedCatalog<SpecialEventKind>,
}

impl EventRules {
    pub fn event(&self, kind: SpecialEventKind) -> SpecialEvent {
        let (experience_delta, attribute_delta, toxin_delta) = match kind {
            SpecialEventKind::Insight => (self.insight_experience as i64, 0, 0),
            SpecialEventKind::SpiritTreasure => (0, self.treasure_attribute as i64, 0),
            SpecialEventKind::Setback => (-(self.setback_experience as i64), 0, 0),
            SpecialEventKind::QiDeviation => {
                (-(self.deviation_experience as i64), 0, self.deviation_toxin)
            }
        };
        SpecialEvent {
            kind,
            experience_delta,
            attribute_delta,
            toxin_delta,
        }
    }
}

/// Per-session training constants.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingRules {
    pub base_experience: f64,
    pub base_attribute: f64,
    pub events: EventRules,
}

/// Outcome of one simulated training session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressionResult {
    pub band: LuckBand,
    pub experience_gained: u64,
    pub attribute_gained: u64,
    pub attribute_kind: AttributeKind,
    pub special_event: Option<SpecialEvent>,
    pub luck_effect_description: String,
}

impl ProgressionResult {
    pub fn toxin_gained(&self) -> u32 {
        self.special_event.map_or(0, |event| event.toxin_delta)
    }
}

/// State delta for one character in one batch tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickDelta {
    pub character_id: Uuid,
    pub previous_tick: i64,
    pub new_tick: i64,
    /// Sessions simulated; one per whole elapsed interval, capped.
    pub intervals: u32,
    pub experience_gained: u64,
    pub attribute_gains: AttributeTotals,
    pub toxin_gained: u32,
    pub events: Vec<SpecialEvent>,
    pub affinity_fallback: bool,
}

impl TickDelta {
    pub fn new(
        character_id: Uuid,
        previous_tick: i64,
        new_tick: i64,
        affinity_fallback: bool,
    ) -> Self {
        Self {
            character_id,
            previous_tick,
            new_tick,
            intervals: 0,
            experience_gained: 0,
            attribute_gains: AttributeTotals::new(),
            toxin_gained: 0,
            events: Vec::new(),
            affinity_fallback,
        }
    }

    pub fn record(&mut self, result: &ProgressionResult) {
        self.intervals += 1;
        self.experience_gained = self.experience_gained.saturating_add(result.experience_gained);
        self.attribute_gains
            .add(result.attribute_kind, result.attribute_gained);
        self.toxin_gained = self.toxin_gained.saturating_add(result.toxin_gained());
        if let Some(event) = result.special_event {
            self.events.push(event);
        }
    }

    /// Apply this delta to a state loaded from the store.
    pub fn apply(&self, state: &mut CharacterProgressionState) {
        state.experience = state.experience.saturating_add(self.experience_gained);
        state.attribute_totals.merge(&self.attribute_gains);
        state.toxin_level = state.toxin_level.saturating_add(self.toxin_gained);
        state.last_tick_timestamp = self.new_tick;
    }
}
