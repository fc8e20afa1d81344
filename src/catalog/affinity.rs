//! Affinity classes: the innate trait drawn once per character.

use super::weighted::WeightedCatalog;
use crate::core::balance::is_unit_rate;
use crate::error::{EngineError, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RarityTier {
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
}

impl RarityTier {
    pub fn name(&self) -> &'static str {
        match self {
            RarityTier::Common => "Common",
            RarityTier::Uncommon => "Uncommon",
            RarityTier::Rare => "Rare",
            RarityTier::Epic => "Epic",
            RarityTier::Legendary => "Legendary",
        }
    }
}

/// Immutable catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffinityClass {
    pub id: String,
    pub display_name: String,
    /// Scales every training session; must be positive.
    pub training_multiplier: f64,
    /// Added to breakthrough odds; within `[0, 1]`.
    pub breakthrough_bonus: f64,
    pub rarity: RarityTier,
    pub weight: i64,
}

/// A class looked up for a character, noting whether the default was substituted.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedAffinity<'a> {
    pub class: &'a AffinityClass,
    pub fell_back: bool,
}

/// The validated, read-only set of affinity classes.
#[derive(Debug, Clone)]
pub struct AffinityCatalog {
    classes: Vec<AffinityClass>,
    sampler: WeightedCatalog<String>,
    default_index: usize,
}

impl AffinityCatalog {
    pub fn new(classes: Vec<AffinityClass>, default_id: &str) -> Result<Self> {
        for class in &classes {
            if !(class.training_multiplier.is_finite() && class.training_multiplier > 0.0) {
                return Err(EngineError::InvalidCatalog(format!(
                    "class {} has training multiplier {}",
                    class.id, class.training_multiplier
                )));
            }
            if !is_unit_rate(class.breakthrough_bonus) {
                return Err(EngineError::InvalidCatalog(format!(
                    "class {} has breakthrough bonus {} outside [0, 1]",
                    class.id, class.breakthrough_bonus
                )));
            }
        }

        let sampler = WeightedCatalog::new(
            classes
                .iter()
                .map(|class| (class.id.clone(), class.weight))
                .collect(),
        )?;

        let default_index = classes
            .iter()
            .position(|class| class.id == default_id)
            .ok_or_else(|| {
                EngineError::InvalidCatalog(format!(
                    "default class {} is not in the catalog",
                    default_id
                ))
            })?;

        Ok(Self {
            classes,
            sampler,
            default_index,
        })
    }

    /// Draw a class for a new character.
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> &AffinityClass {
        let id = self.sampler.draw(rng);
        // Every sampler id was built from `classes`.
        self.classes
            .iter()
            .find(|class| &class.id == id)
            .unwrap_or(&self.classes[self.default_index])
    }

    pub fn get(&self, id: &str) -> Option<&AffinityClass> {
        self.classes.iter().find(|class| class.id == id)
    }

    /// Strict lookup.
    pub fn lookup(&self, id: &str) -> Result<&AffinityClass> {
        self.get(id)
            .ok_or_else(|| EngineError::UnknownAffinityClass(id.to_string()))
    }

    /// Lookup that substitutes the default class for unknown ids.
    pub fn resolve(&self, id: &str) -> ResolvedAffinity<'_> {
        match self.lookup(id) {
            Ok(class) => ResolvedAffinity {
                class,
                fell_back: false,
            },
            Err(err) => {
                let class = self.default_class();
                warn!(error = %err, fallback = %class.id, "substituting default affinity class");
                ResolvedAffinity {
                    class,
                    fell_back: true,
                }
            }
        }
    }

    pub fn default_class(&self) -> &AffinityClass {
        &self.classes[self.default_index]
    }

    pub fn classes(&self) -> &[AffinityClass] {
        &self.classes
    }

    pub fn sampler(&self) -> &WeightedCatalog<String> {
        &self.sampler
    }
}
