use crate::core::balance::is_unit_rate;
use crate::core::constants::{MAX_LUCK_VALUE, MIN_LUCK_VALUE};
use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};

/// Discrete effect tier derived from a luck value. Never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LuckBand {
    Backlash,
    Low,
    Neutral,
    Favorable,
    BreakthroughInsight,
}

pub const NUM_LUCK_BANDS: usize = 5;

impl LuckBand {
    pub fn all() -> [LuckBand; NUM_LUCK_BANDS] {
        [
            LuckBand::Backlash,
            LuckBand::Low,
            LuckBand::Neutral,
            LuckBand::Favorable,
            LuckBand::BreakthroughInsight,
        ]
    }

    pub fn index(&self) -> usize {
        match self {
            LuckBand::Backlash => 0,
            LuckBand::Low => 1,
            LuckBand::Neutral => 2,
            LuckBand::Favorable => 3,
            LuckBand::BreakthroughInsight => 4,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LuckBand::Backlash => "backlash",
            LuckBand::Low => "low",
            LuckBand::Neutral => "neutral",
            LuckBand::Favorable => "favorable",
            LuckBand::BreakthroughInsight => "breakthrough_insight",
        }
    }

    /// Player-facing summary of how the band shaped a session.
    pub fn description(&self) -> &'static str {
        match self {
            LuckBand::Backlash => "Ill omens weigh on your training",
            LuckBand::Low => "Fortune is poor",
            LuckBand::Neutral => "Fortune is even",
            LuckBand::Favorable => "Fortune smiles on you",
            LuckBand::BreakthroughInsight => "Heaven's favour opens your mind",
        }
    }

    /// Favorable and insight bands use the richer outcome tables.
    pub fn is_fortunate(&self) -> bool {
        matches!(self, LuckBand::Favorable | LuckBand::BreakthroughInsight)
    }
}

/// What a band does to training, events, breakthroughs and harvests.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandEffect {
    pub training_multiplier: f64,
    /// Chance per session of a positive special event.
    pub insight_chance: f64,
    /// Chance per session of a negative special event.
    pub backlash_chance: f64,
    /// Flat adjustment added to the luck breakthrough bonus.
    pub breakthrough_adjustment: f64,
    pub harvest_multiplier: f64,
}

impl BandEffect {
    fn validate(&self, band: LuckBand) -> Result<()> {
        let bad = |what: &str, value: f64| {
            Err(EngineError::InvalidConfig(format!(
                "luck band {} has invalid {} {}",
                band.name(),
                what,
                value
            )))
        };
        if !(self.training_multiplier.is_finite() && self.training_multiplier >= 0.0) {
            return bad("training multiplier", self.training_multiplier);
        }
        if !is_unit_rate(self.insight_chance) {
            return bad("insight chance", self.insight_chance);
        }
        if !is_unit_rate(self.backlash_chance) {
            return bad("backlash chance", self.backlash_chance);
        }
        if self.insight_chance + self.backlash_chance > 1.0 {
            return bad(
                "combined event chance",
                self.insight_chance + self.backlash_chance,
            );
        }
        if !(self.breakthrough_adjustment.is_finite() && self.breakthrough_adjustment.abs() <= 1.0)
        {
            return bad("breakthrough adjustment", self.breakthrough_adjustment);
        }
        if !(self.harvest_multiplier.is_finite() && self.harvest_multiplier >= 0.0) {
            return bad("harvest multiplier", self.harvest_multiplier);
        }
        Ok(())
    }
}

/// A classified luck value with its band effect.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LuckReading {
    pub luck: u8,
    pub band: LuckBand,
    pub effect: BandEffect,
}

/// Validated banding policy.
///
/// `thresholds[i]` is the lowest luck value of band `i + 1`; values below
/// `thresholds[0]` are backlash.
#[derive(Debug, Clone, PartialEq)]
pub struct LuckPolicy {
    thresholds: [u8; NUM_LUCK_BANDS - 1],
    effects: [BandEffect; NUM_LUCK_BANDS],
    daily_min: u8,
    daily_max: u8,
}

impl LuckPolicy {
    pub fn new(
        thresholds: [u8; NUM_LUCK_BANDS - 1],
        effects: [BandEffect; NUM_LUCK_BANDS],
        daily_min: u8,
        daily_max: u8,
    ) -> Result<Self> {
        if thresholds[0] == MIN_LUCK_VALUE {
            return Err(EngineError::InvalidConfig(
                "first luck threshold must leave room for the backlash band".to_string(),
            ));
        }
        if thresholds.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(EngineError::InvalidConfig(format!(
                "luck thresholds must be strictly increasing: {:?}",
                thresholds
            )));
        }
        if thresholds[NUM_LUCK_BANDS - 2] > MAX_LUCK_VALUE {
            return Err(EngineError::InvalidConfig(format!(
                "luck thresholds exceed {}: {:?}",
                MAX_LUCK_VALUE, thresholds
            )));
        }
        for band in LuckBand::all() {
            effects[band.index()].validate(band)?;
        }
        if daily_min > daily_max || daily_max > MAX_LUCK_VALUE {
            return Err(EngineError::InvalidConfig(format!(
                "daily luck range {}..={} is invalid",
                daily_min, daily_max
            )));
        }
        Ok(Self {
            thresholds,
            effects,
            daily_min,
            daily_max,
        })
    }

    /// The stock balance: cut points 20/40/70/90.
    pub fn standard() -> Self {
        Self {
            thresholds: [20, 40, 70, 90],
            effects: [
                BandEffect {
                    training_multiplier: 0.5,
                    insight_chance: 0.0,
                    backlash_chance: 0.20,
                    breakthrough_adjustment: -0.10,
                    harvest_multiplier: 0.5,
                },
                BandEffect {
                    training_multiplier: 0.8,
                    insight_chance: 0.0,
                    backlash_chance: 0.08,
                    breakthrough_adjustment: 0.0,
                    harvest_multiplier: 0.8,
                },
                BandEffect {
                    training_multiplier: 1.0,
                    insight_chance: 0.0,
                    backlash_chance: 0.0,
                    breakthrough_adjustment: 0.0,
                    harvest_multiplier: 1.0,
                },
                BandEffect {
                    training_multiplier: 1.3,
                    insight_chance: 0.08,
                    backlash_chance: 0.0,
                    breakthrough_adjustment: 0.0,
                    harvest_multiplier: 1.2,
                },
                BandEffect {
                    training_multiplier: 2.0,
                    insight_chance: 0.15,
                    backlash_chance: 0.0,
                    breakthrough_adjustment: 0.20,
                    harvest_multiplier: 1.5,
                },
            ],
            daily_min: MIN_LUCK_VALUE,
            daily_max: MAX_LUCK_VALUE,
        }
    }

    /// Map a luck value to its band. Pure; consumes no randomness.
    pub fn classify(&self, luck: i64) -> Result<LuckBand> {
        let luck = check_luck(luck)?;
        let band_index = self
            .thresholds
            .iter()
            .take_while(|&&threshold| luck >= threshold)
            .count();
        Ok(LuckBand::all()[band_index])
    }

    pub fn effect(&self, band: LuckBand) -> &BandEffect {
        &self.effects[band.index()]
    }

    pub fn read(&self, luck: i64) -> Result<LuckReading> {
        let band = self.classify(luck)?;
        Ok(LuckReading {
            luck: luck as u8,
            band,
            effect: self.effects[band.index()],
        })
    }

    pub fn thresholds(&self) -> [u8; NUM_LUCK_BANDS - 1] {
        self.thresholds
    }

    pub fn daily_range(&self) -> (u8, u8) {
        (self.daily_min, self.daily_max)
    }
}

/// Reject values outside the luck domain. Callers clamp upstream.
pub fn check_luck(value: i64) -> Result<u8> {
    if (MIN_LUCK_VALUE as i64..=MAX_LUCK_VALUE as i64).contains(&value) {
        Ok(value as u8)
    } else {
        Err(EngineError::InvalidLuckValue(value))
    }
}
