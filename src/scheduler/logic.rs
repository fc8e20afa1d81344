use super::types::{CancelToken, TickPhase, TickReport};
use crate::config::EngineConfig;
use crate::core::constants::SCHEDULER_POLL_SECONDS;
use crate::core::rng::{character_rng, entropy_seed};
use crate::engine::{compute_tick_delta, ProgressionEngine};
use crate::error::{EngineError, Result};
use crate::progression::{CharacterProgressionState, ProgressionResult, TickDelta};
use crate::store::StoreError;
use chrono::Utc;
use rayon::prelude::*;
use rayon::ThreadPool;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Per-character result of the dispatch phase.
enum Planned {
    Ready {
        state: CharacterProgressionState,
        delta: TickDelta,
        results: Vec<ProgressionResult>,
    },
    NotDue,
    Failed(Uuid, EngineError),
    Cancelled,
}

/// Drives batch ticks over every due character in the engine's store.
pub struct TickScheduler {
    phase: Mutex<TickPhase>,
    /// Rebuilt only when the configured concurrency changes.
    pool: Mutex<Option<Arc<ThreadPool>>>,
}

impl Default for TickScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl TickScheduler {
    pub fn new() -> Self {
        Self {
            phase: Mutex::new(TickPhase::Idle),
            pool: Mutex::new(None),
        }
    }

    pub fn phase(&self) -> TickPhase {
        *self.phase.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn enter(&self, phase: TickPhase) {
        *self.phase.lock().unwrap_or_else(|e| e.into_inner()) = phase;
        debug!(?phase, "tick phase");
    }

    fn worker_pool(&self, concurrency: usize) -> Result<Arc<ThreadPool>> {
        let mut cached = self.pool.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(pool) = cached.as_ref() {
            if pool.current_num_threads() == concurrency {
                return Ok(Arc::clone(pool));
            }
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(concurrency)
            .build()
            .map_err(|e| EngineError::InvalidConfig(format!("cannot build worker pool: {}", e)))?;
        let pool = Arc::new(pool);
        *cached = Some(Arc::clone(&pool));
        debug!(concurrency, "worker pool built");
        Ok(pool)
    }

    /// Run one batch tick at `boundary` with a fresh entropy seed.
    pub fn run_tick(
        &self,
        engine: &ProgressionEngine,
        boundary: i64,
        cancel: &CancelToken,
    ) -> Result<TickReport> {
        let seed = entropy_seed()?;
        self.run_tick_seeded(engine, boundary, seed, cancel)
    }

    /// Run one batch tick. Reproducible from `seed` and the collected ids.
    ///
    /// Per-character failures are counted and logged; only a failure to
    /// collect the batch at all is returned as an error.
    pub fn run_tick_seeded(
        &self,
        engine: &ProgressionEngine,
        boundary: i64,
        seed: u64,
        cancel: &CancelToken,
    ) -> Result<TickReport> {
        let config = engine.config();
        let interval = config.scheduler.interval_seconds;
        let mut report = TickReport::new(boundary, seed);

        self.enter(TickPhase::Collecting);
        let ids = match engine.store().due_for_tick(boundary - interval) {
            Ok(ids) => ids,
            Err(e) => {
                self.enter(TickPhase::Idle);
                return Err(e.into());
            }
        };
        report.collected = ids.len();

        self.enter(TickPhase::Dispatching);
        let pool = match self.worker_pool(config.scheduler.concurrency) {
            Ok(pool) => pool,
            Err(e) => {
                self.enter(TickPhase::Idle);
                return Err(e);
            }
        };
        let planned = pool.install(|| {
            ids.par_iter()
                .map(|id| plan_one(engine, &config, *id, boundary, seed, cancel))
                .collect::<Vec<_>>()
        });

        self.enter(TickPhase::Committing);
        for plan in planned {
            match plan {
                Planned::Ready {
                    mut state,
                    delta,
                    results,
                } => {
                    if cancel.is_cancelled() {
                        report.cancelled += 1;
                        continue;
                    }
                    delta.apply(&mut state);
                    match engine.store().save(&state) {
                        Ok(_) => {
                            report.succeeded += 1;
                            report.sessions += delta.intervals as u64;
                            report.experience_granted = report
                                .experience_granted
                                .saturating_add(delta.experience_gained);
                            if delta.affinity_fallback {
                                report.fallbacks += 1;
                            }
                            engine.record_results(state.character_id, &results);
                        }
                        Err(StoreError::Conflict { id, expected, found }) => {
                            warn!(
                                character_id = %id,
                                expected,
                                found,
                                "tick skipped after concurrent write"
                            );
                            report.skipped += 1;
                        }
                        Err(e) => {
                            warn!(
                                character_id = %state.character_id,
                                error = %e,
                                "tick commit failed"
                            );
                            report.failed += 1;
                        }
                    }
                }
                Planned::NotDue => report.skipped += 1,
                Planned::Failed(id, e) => {
                    warn!(character_id = %id, error = %e, "tick simulation failed");
                    report.failed += 1;
                }
                Planned::Cancelled => report.cancelled += 1,
            }
        }
        self.enter(TickPhase::Idle);

        info!(
            boundary,
            collected = report.collected,
            succeeded = report.succeeded,
            skipped = report.skipped,
            failed = report.failed,
            cancelled = report.cancelled,
            fallbacks = report.fallbacks,
            "batch tick complete"
        );
        Ok(report)
    }

    /// Tick at every interval boundary until cancelled.
    ///
    /// Entropy failure stops the loop; other batch errors are logged and the
    /// next boundary is tried.
    pub fn run(&self, engine: &ProgressionEngine, cancel: &CancelToken) -> Result<()> {
        info!("scheduler started");
        while !cancel.is_cancelled() {
            let interval = engine.config().scheduler.interval_seconds;
            let boundary = next_boundary(Utc::now().timestamp(), interval);
            if !wait_until(boundary, cancel) {
                break;
            }
            match self.run_tick(engine, boundary, cancel) {
                Ok(_) => {}
                Err(e @ EngineError::Entropy(_)) => {
                    error!(error = %e, "scheduler stopping");
                    return Err(e);
                }
                Err(e) => error!(boundary, error = %e, "batch tick failed"),
            }
        }
        info!("scheduler stopped");
        Ok(())
    }
}

fn plan_one(
    engine: &ProgressionEngine,
    config: &EngineConfig,
    id: Uuid,
    boundary: i64,
    seed: u64,
    cancel: &CancelToken,
) -> Planned {
    if cancel.is_cancelled() {
        return Planned::Cancelled;
    }
    let state = match engine.character(id) {
        Ok(state) => state,
        Err(e) => return Planned::Failed(id, e),
    };
    let mut rng = character_rng(seed, &id);
    match compute_tick_delta(config, &state, boundary, &mut rng) {
        Ok(Some((delta, results))) => Planned::Ready {
            state,
            delta,
            results,
        },
        Ok(None) => Planned::NotDue,
        Err(e) => Planned::Failed(id, e),
    }
}

/// The first interval boundary strictly after `now`.
pub fn next_boundary(now: i64, interval: i64) -> i64 {
    (now.div_euclid(interval) + 1) * interval
}

/// Sleep in short slices until `deadline`. False if cancelled first.
fn wait_until(deadline: i64, cancel: &CancelToken) -> bool {
    loop {
        if cancel.is_cancelled() {
            return false;
        }
        let remaining = deadline - Utc::now().timestamp();
        if remaining <= 0 {
            return true;
        }
        let slice = (remaining as u64).min(SCHEDULER_POLL_SECONDS);
        thread::sleep(Duration::from_secs(slice));
    }
}
