//! Monte Carlo runner built on the engine's own rules.
//!
//! Every character gets its own ChaCha stream derived from the run seed, so
//! characters can be simulated in parallel and a seeded run is reproducible.

use super::config::SimConfig;
use super::report::{CharacterRun, SimReport};
use crate::advancement::{apply_attempt, attempt_breakthrough, check_attempt};
use crate::config::EngineConfig;
use crate::core::rng::entropy_seed;
use crate::error::Result;
use crate::luck::roll_daily_luck;
use crate::progression::{CharacterProgressionState, TickDelta};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use tracing::debug;
use uuid::Uuid;

/// Run the full simulation and return a report.
pub fn run_simulation(engine: &EngineConfig, config: &SimConfig) -> Result<SimReport> {
    let base_seed = match config.seed {
        Some(seed) => seed,
        None => entropy_seed()?,
    };

    let runs = (0..config.num_characters)
        .into_par_iter()
        .map(|index| {
            let mut rng = ChaCha8Rng::seed_from_u64(base_seed);
            rng.set_stream(index as u64);
            simulate_character(engine, config, index, &mut rng)
        })
        .collect::<Result<Vec<_>>>()?;

    if config.verbosity >= 2 {
        for (index, run) in runs.iter().enumerate() {
            println!(
                "Character {}/{} - {} realm {}, {} attempts, {} breakthroughs",
                index + 1,
                config.num_characters,
                run.affinity_id,
                run.final_realm,
                run.attempts,
                run.successes
            );
        }
    }

    Ok(SimReport::from_runs(engine, config, base_seed, runs))
}

fn simulate_character(
    engine: &EngineConfig,
    config: &SimConfig,
    index: u32,
    rng: &mut ChaCha8Rng,
) -> Result<CharacterRun> {
    let class = engine.affinity.draw(rng);
    let id = Uuid::from_u128(index as u128);
    let mut state = CharacterProgressionState::new(id, &class.id, 0);
    state.luck_value = roll_daily_luck(&engine.luck, rng);

    let simulator = engine.simulator();
    let mut run = CharacterRun::new(&class.id);
    let ticks_per_day = config.ticks_per_day.max(1);

    for tick in 0..config.ticks_per_character {
        if tick > 0 && tick % ticks_per_day == 0 {
            state.luck_value = roll_daily_luck(&engine.luck, rng);
        }

        let result = simulator.simulate(
            class.training_multiplier,
            state.luck_value as i64,
            state.focus,
            rng,
        )?;
        run.record_session(&result);

        let last_tick = state.last_tick_timestamp;
        let mut delta = TickDelta::new(id, last_tick, last_tick, false);
        delta.record(&result);
        delta.apply(&mut state);

        if config.attempt_breakthroughs {
            let target = state.cultivation_realm + 1;
            if check_attempt(&state, target, &engine.breakthrough).is_ok() {
                let attempt = attempt_breakthrough(
                    &state,
                    target,
                    class,
                    &engine.luck,
                    &engine.breakthrough,
                    &[],
                    rng,
                )?;
                apply_attempt(&mut state, &attempt, &engine.breakthrough)?;
                run.record_attempt(&attempt);
            }
        }
    }

    run.final_realm = state.cultivation_realm;
    run.final_experience = state.experience;
    run.final_toxin = state.toxin_level;
    debug!(index, affinity = %class.id, realm = run.final_realm, "character simulated");
    Ok(run)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small(seed: u64) -> SimConfig {
        SimConfig {
            num_characters: 40,
            ticks_per_character: 600,
            seed: Some(seed),
            verbosity: 0,
            ..Default::default()
        }
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let engine = EngineConfig::embedded().unwrap();
        let first = run_simulation(&engine, &small(42)).unwrap();
        let second = run_simulation(&engine, &small(42)).unwrap();
        assert_eq!(first.mean_realm, second.mean_realm);
        assert_eq!(first.breakthrough_attempts, second.breakthrough_attempts);
        assert_eq!(first.to_json(), second.to_json());
    }

    #[test]
    fn test_characters_progress() {
        let engine = EngineConfig::embedded().unwrap();
        let report = run_simulation(&engine, &small(7)).unwrap();
        assert_eq!(report.num_characters, 40);
        assert_eq!(report.total_sessions, 40 * 600);
        assert!(report.mean_realm > 0.0);
        assert!(report.breakthrough_attempts > 0);
    }

    #[test]
    fn test_no_breakthroughs_when_disabled() {
        let engine = EngineConfig::embedded().unwrap();
        let config = SimConfig {
            attempt_breakthroughs: false,
            ..small(3)
        };
        let report = run_simulation(&engine, &config).unwrap();
        assert_eq!(report.breakthrough_attempts, 0);
        assert_eq!(report.mean_realm, 0.0);
    }
}
