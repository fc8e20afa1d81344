//! One training session: affinity and luck scale the base gain, then a
//! single draw decides whether a special event fires.

use super::attributes::AttributeKind;
use super::types::{ProgressionResult, SpecialEvent, TrainingRules};
use crate::core::balance::floor_gain;
use crate::error::{EngineError, Result};
use crate::luck::LuckPolicy;
use rand::Rng;

pub struct ProgressionSimulator<'a> {
    rules: &'a TrainingRules,
    luck: &'a LuckPolicy,
}

impl<'a> ProgressionSimulator<'a> {
    pub fn new(rules: &'a TrainingRules, luck: &'a LuckPolicy) -> Self {
        Self { rules, luck }
    }

    /// Simulate one session. Pure apart from the randomness it draws.
    ///
    /// Always consumes one unit-interval draw for the event check, plus one
    /// catalog draw when an event fires.
    pub fn simulate<R: Rng + ?Sized>(
        &self,
        affinity_multiplier: f64,
        luck: i64,
        focus: AttributeKind,
        rng: &mut R,
    ) -> Result<ProgressionResult> {
        if !(affinity_multiplier.is_finite() && affinity_multiplier > 0.0) {
            return Err(EngineError::InvalidRate {
                context: "affinity multiplier",
                value: affinity_multiplier,
            });
        }
        let reading = self.luck.read(luck)?;
        let scale = affinity_multiplier * reading.effect.training_multiplier;

        let base_experience = floor_gain(self.rules.base_experience * scale);
        let base_attribute = floor_gain(self.rules.base_attribute * scale);

        let special_event = self.roll_event(
            reading.effect.insight_chance,
            reading.effect.backlash_chance,
            rng,
        );

        let (experience_gained, attribute_gained) = match special_event {
            Some(event) => (
                apply_flat(base_experience, event.experience_delta),
                apply_flat(base_attribute, event.attribute_delta),
            ),
            None => (base_experience, base_attribute),
        };

        Ok(ProgressionResult {
            band: reading.band,
            experience_gained,
            attribute_gained,
            attribute_kind: focus,
            special_event,
            luck_effect_description: reading.band.description().to_string(),
        })
    }

    fn roll_event<R: Rng + ?Sized>(
        &self,
        insight_chance: f64,
        backlash_chance: f64,
        rng: &mut R,
    ) -> Option<SpecialEvent> {
        let roll = rng.gen::<f64>();
        let events = &self.rules.events;
        if roll < insight_chance {
            Some(events.event(*events.positive.draw(rng)))
        } else if roll < insight_chance + backlash_chance {
            Some(events.event(*events.negative.draw(rng)))
        } else {
            None
        }
    }
}

/// Add a flat event delta, flooring the result at zero.
fn apply_flat(gain: u64, delta: i64) -> u64 {
    if delta >= 0 {
        gain.saturating_add(delta as u64)
    } else {
        gain.saturating_sub(delta.unsigned_abs())
    }
}
