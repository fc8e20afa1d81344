//! The engine facade: character operations over a store, with the live
//! configuration behind a swappable pointer.

use crate::advancement::{self, AttemptOutcome, BonusSource, BreakthroughAttempt};
use crate::audit::{AuditRecord, AuditSink};
use crate::catalog::AffinityClass;
use crate::config::EngineConfig;
use crate::core::rng::{character_rng, entropy_seed};
use crate::error::{EngineError, Result};
use crate::luck::{self, LuckConsumable, LuckRefresh};
use crate::progression::{AttributeKind, CharacterProgressionState, ProgressionResult, TickDelta};
use crate::store::{CharacterStore, StoreError};
use chrono::Utc;
use rand::Rng;
use std::sync::{Arc, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

/// Work out the sessions owed to `state` at `boundary` without touching it.
///
/// One session per whole elapsed interval, at most `max_catch_up_intervals`;
/// the tick timestamp still advances by every whole interval so forfeited
/// time is never credited later. `None` if no full interval has elapsed.
pub fn compute_tick_delta<R: Rng + ?Sized>(
    config: &EngineConfig,
    state: &CharacterProgressionState,
    boundary: i64,
    rng: &mut R,
) -> Result<Option<(TickDelta, Vec<ProgressionResult>)>> {
    let interval = config.scheduler.interval_seconds;
    let elapsed = boundary - state.last_tick_timestamp;
    if elapsed < interval {
        return Ok(None);
    }
    let whole_intervals = elapsed / interval;
    let sessions = whole_intervals.min(config.scheduler.max_catch_up_intervals as i64) as u32;
    let new_tick = state.last_tick_timestamp + whole_intervals * interval;

    let affinity = config.affinity.resolve(&state.affinity_class_id);
    let simulator = config.simulator();
    let mut delta = TickDelta::new(
        state.character_id,
        state.last_tick_timestamp,
        new_tick,
        affinity.fell_back,
    );
    let mut results = Vec::with_capacity(sessions as usize);
    for _ in 0..sessions {
        let result = simulator.simulate(
            affinity.class.training_multiplier,
            state.luck_value as i64,
            state.focus,
            rng,
        )?;
        delta.record(&result);
        results.push(result);
    }
    Ok(Some((delta, results)))
}

pub struct ProgressionEngine {
    config: RwLock<Arc<EngineConfig>>,
    store: Arc<dyn CharacterStore>,
    audit: Arc<dyn AuditSink>,
}

impl ProgressionEngine {
    pub fn new(
        config: EngineConfig,
        store: Arc<dyn CharacterStore>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            config: RwLock::new(Arc::new(config)),
            store,
            audit,
        }
    }

    /// The configuration in force right now. Later reloads do not affect
    /// the returned value.
    pub fn config(&self) -> Arc<EngineConfig> {
        Arc::clone(&*self.config.read().unwrap_or_else(|e| e.into_inner()))
    }

    /// Swap in a new, already validated configuration.
    pub fn reload_config(&self, config: EngineConfig) {
        let classes = config.affinity.classes().len();
        *self.config.write().unwrap_or_else(|e| e.into_inner()) = Arc::new(config);
        info!(classes, "engine config reloaded");
    }

    pub fn store(&self) -> &dyn CharacterStore {
        self.store.as_ref()
    }

    pub fn audit(&self) -> &dyn AuditSink {
        self.audit.as_ref()
    }

    pub fn draw_affinity_class<R: Rng + ?Sized>(&self, rng: &mut R) -> AffinityClass {
        self.config().affinity.draw(rng).clone()
    }

    /// Create and store a character with a freshly drawn affinity class and
    /// today's luck already rolled.
    pub fn create_character<R: Rng + ?Sized>(
        &self,
        now: i64,
        rng: &mut R,
    ) -> Result<CharacterProgressionState> {
        let config = self.config();
        let class = config.affinity.draw(rng);
        let mut state = CharacterProgressionState::new(Uuid::new_v4(), &class.id, now);
        luck::refresh_daily_luck(&mut state, now, &config.luck, rng);
        self.store.insert(state.clone())?;
        info!(
            character_id = %state.character_id,
            affinity = %class.id,
            luck = state.luck_value,
            "character created"
        );
        Ok(state)
    }

    pub fn remove_character(&self, id: Uuid) -> Result<()> {
        self.store.remove(id).map_err(|e| not_found(id, e))
    }

    pub fn character(&self, id: Uuid) -> Result<CharacterProgressionState> {
        self.store.load(id).map_err(|e| not_found(id, e))
    }

    /// Tick one character up to the current time.
    pub fn simulate_tick(&self, id: Uuid) -> Result<Option<TickDelta>> {
        let seed = entropy_seed()?;
        let mut rng = character_rng(seed, &id);
        self.simulate_tick_at(id, Utc::now().timestamp(), &mut rng)
    }

    /// Tick one character up to `boundary` and commit the result.
    pub fn simulate_tick_at<R: Rng + ?Sized>(
        &self,
        id: Uuid,
        boundary: i64,
        rng: &mut R,
    ) -> Result<Option<TickDelta>> {
        let config = self.config();
        let mut state = self.character(id)?;
        let Some((delta, results)) = compute_tick_delta(&config, &state, boundary, rng)? else {
            return Ok(None);
        };
        delta.apply(&mut state);
        self.commit(&mut state)?;
        self.record_results(id, &results);
        debug!(
            character_id = %id,
            intervals = delta.intervals,
            experience = delta.experience_gained,
            "tick applied"
        );
        Ok(Some(delta))
    }

    /// Roll a breakthrough to `target_realm` and apply it exactly once.
    pub fn evaluate_breakthrough(
        &self,
        id: Uuid,
        target_realm: u32,
        consumed_item_bonuses: &[BonusSource],
    ) -> Result<(BreakthroughAttempt, AttemptOutcome)> {
        let seed = entropy_seed()?;
        let mut rng = character_rng(seed, &id);
        self.evaluate_breakthrough_with(id, target_realm, consumed_item_bonuses, &mut rng)
    }

    pub fn evaluate_breakthrough_with<R: Rng + ?Sized>(
        &self,
        id: Uuid,
        target_realm: u32,
        consumed_item_bonuses: &[BonusSource],
        rng: &mut R,
    ) -> Result<(BreakthroughAttempt, AttemptOutcome)> {
        let config = self.config();
        let mut state = self.character(id)?;
        let affinity = config.affinity.resolve(&state.affinity_class_id);

        let attempt = advancement::attempt_breakthrough(
            &state,
            target_realm,
            affinity.class,
            &config.luck,
            &config.breakthrough,
            consumed_item_bonuses,
            rng,
        )?;
        let outcome = advancement::apply_attempt(&mut state, &attempt, &config.breakthrough)?;
        self.commit(&mut state)?;
        self.audit.record(&AuditRecord::Breakthrough(attempt.clone()));
        info!(
            character_id = %id,
            target_realm,
            final_rate = attempt.final_rate,
            succeeded = attempt.succeeded,
            "breakthrough attempted"
        );
        Ok((attempt, outcome))
    }

    pub fn refresh_daily_luck<R: Rng + ?Sized>(
        &self,
        id: Uuid,
        now: i64,
        rng: &mut R,
    ) -> Result<LuckRefresh> {
        let config = self.config();
        let mut state = self.character(id)?;
        let refresh = luck::refresh_daily_luck(&mut state, now, &config.luck, rng);
        if let LuckRefresh::Refreshed { previous, current } = refresh {
            self.commit(&mut state)?;
            debug!(character_id = %id, previous, current, "daily luck refreshed");
        }
        Ok(refresh)
    }

    pub fn apply_luck_consumable(&self, id: Uuid, consumable: &LuckConsumable) -> Result<(u8, u8)> {
        let mut state = self.character(id)?;
        let change = luck::apply_luck_consumable(&mut state, consumable);
        self.commit(&mut state)?;
        Ok(change)
    }

    pub fn change_focus(&self, id: Uuid, focus: AttributeKind) -> Result<()> {
        let mut state = self.character(id)?;
        state.focus = focus;
        self.commit(&mut state)
    }

    pub fn set_abode_level(&self, id: Uuid, level: u32) -> Result<()> {
        let mut state = self.character(id)?;
        state.abode_level = level;
        self.commit(&mut state)
    }

    pub(crate) fn record_results(&self, id: Uuid, results: &[ProgressionResult]) {
        for result in results {
            self.audit.record(&AuditRecord::Progression {
                character_id: id,
                result: result.clone(),
            });
        }
    }

    fn commit(&self, state: &mut CharacterProgressionState) -> Result<()> {
        state.version = self.store.save(state)?;
        Ok(())
    }
}

fn not_found(id: Uuid, err: StoreError) -> EngineError {
    match err {
        StoreError::NotFound(_) => EngineError::CharacterNotFound(id),
        other => EngineError::Store(other),
    }
}
