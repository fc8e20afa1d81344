//! Simulation report generation.

use super::config::SimConfig;
use crate::advancement::BreakthroughAttempt;
use crate::config::EngineConfig;
use crate::luck::{LuckBand, NUM_LUCK_BANDS};
use crate::progression::{ProgressionResult, SpecialEventKind};
use serde::Serialize;
use std::collections::BTreeMap;

const NUM_EVENT_KINDS: usize = 4;

/// Statistics for one simulated character.
#[derive(Debug, Clone, Default)]
pub struct CharacterRun {
    pub affinity_id: String,
    pub sessions: u64,
    pub band_counts: [u64; NUM_LUCK_BANDS],
    pub event_counts: [u64; NUM_EVENT_KINDS],
    pub attempts: u64,
    pub successes: u64,
    pub final_rate_sum: f64,
    pub final_realm: u32,
    pub final_experience: u64,
    pub final_toxin: u32,
}

impl CharacterRun {
    pub fn new(affinity_id: &str) -> Self {
        Self {
            affinity_id: affinity_id.to_string(),
            ..Self::default()
        }
    }

    pub fn record_session(&mut self, result: &ProgressionResult) {
        self.sessions += 1;
        self.band_counts[result.band.index()] += 1;
        if let Some(event) = result.special_event {
            self.event_counts[event.kind.index()] += 1;
        }
    }

    pub fn record_attempt(&mut self, attempt: &BreakthroughAttempt) {
        self.attempts += 1;
        self.final_rate_sum += attempt.final_rate;
        if attempt.succeeded {
            self.successes += 1;
        }
    }
}

/// Observed share of one affinity class against its declared weight.
#[derive(Debug, Clone, Serialize)]
pub struct AffinityShare {
    pub id: String,
    pub count: u64,
    pub declared: f64,
    pub observed: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BandShare {
    pub band: LuckBand,
    pub share: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventRate {
    pub kind: SpecialEventKind,
    pub per_session: f64,
}

/// Aggregated results over every simulated character.
#[derive(Debug, Clone, Serialize)]
pub struct SimReport {
    pub num_characters: u32,
    pub ticks_per_character: u64,
    pub seed: u64,
    pub total_sessions: u64,

    pub affinity: Vec<AffinityShare>,
    pub max_affinity_deviation: f64,
    pub bands: Vec<BandShare>,
    pub events: Vec<EventRate>,

    pub mean_realm: f64,
    pub max_realm: u32,
    pub realm_distribution: BTreeMap<u32, u32>,
    pub mean_toxin: f64,

    pub breakthrough_attempts: u64,
    pub breakthrough_successes: u64,
    pub observed_success_rate: f64,
    pub mean_final_rate: f64,
}

impl SimReport {
    pub fn from_runs(
        engine: &EngineConfig,
        config: &SimConfig,
        seed: u64,
        runs: Vec<CharacterRun>,
    ) -> Self {
        let n = runs.len().max(1) as f64;
        let total_sessions: u64 = runs.iter().map(|r| r.sessions).sum();
        let sessions = total_sessions.max(1) as f64;

        let sampler = engine.affinity.sampler();
        let affinity: Vec<AffinityShare> = sampler
            .iter()
            .map(|(id, _)| {
                let count = runs.iter().filter(|r| &r.affinity_id == id).count() as u64;
                AffinityShare {
                    id: id.clone(),
                    count,
                    declared: sampler.probability(id).unwrap_or(0.0),
                    observed: count as f64 / n,
                }
            })
            .collect();
        let max_affinity_deviation = affinity
            .iter()
            .map(|share| (share.observed - share.declared).abs())
            .fold(0.0, f64::max);

        let bands = LuckBand::all()
            .into_iter()
            .map(|band| BandShare {
                band,
                share: runs.iter().map(|r| r.band_counts[band.index()]).sum::<u64>() as f64
                    / sessions,
            })
            .collect();

        let events = SpecialEventKind::all()
            .into_iter()
            .map(|kind| EventRate {
                kind,
                per_session: runs.iter().map(|r| r.event_counts[kind.index()]).sum::<u64>()
                    as f64
                    / sessions,
            })
            .collect();

        let mut realm_distribution = BTreeMap::new();
        for run in &runs {
            *realm_distribution.entry(run.final_realm).or_insert(0) += 1;
        }

        let breakthrough_attempts: u64 = runs.iter().map(|r| r.attempts).sum();
        let breakthrough_successes: u64 = runs.iter().map(|r| r.successes).sum();
        let attempts = breakthrough_attempts.max(1) as f64;

        Self {
            num_characters: config.num_characters,
            ticks_per_character: config.ticks_per_character,
            seed,
            total_sessions,
            affinity,
            max_affinity_deviation,
            bands,
            events,
            mean_realm: runs.iter().map(|r| r.final_realm as f64).sum::<f64>() / n,
            max_realm: runs.iter().map(|r| r.final_realm).max().unwrap_or(0),
            realm_distribution,
            mean_toxin: runs.iter().map(|r| r.final_toxin as f64).sum::<f64>() / n,
            breakthrough_attempts,
            breakthrough_successes,
            observed_success_rate: breakthrough_successes as f64 / attempts,
            mean_final_rate: runs.iter().map(|r| r.final_rate_sum).sum::<f64>() / attempts,
        }
    }

    /// Generate a text report.
    pub fn to_text(&self) -> String {
        let mut report = String::new();

        report.push_str("═══════════════════════════════════════════════════════════════\n");
        report.push_str("                  PROGRESSION SIMULATION REPORT\n");
        report.push_str("═══════════════════════════════════════════════════════════════\n\n");

        report.push_str(&format!(
            "Characters: {}, sessions each: {}, seed: {}\n\n",
            self.num_characters, self.ticks_per_character, self.seed
        ));

        report.push_str("── AFFINITY ─────────────────────────────────────────────────────\n");
        report.push_str("  Class          Count   Declared   Observed\n");
        for share in &self.affinity {
            report.push_str(&format!(
                "  {:<12} {:>7}   {:>7.2}%   {:>7.2}%\n",
                share.id,
                share.count,
                share.declared * 100.0,
                share.observed * 100.0
            ));
        }
        report.push_str(&format!(
            "  Max deviation: {:.2} pp\n\n",
            self.max_affinity_deviation * 100.0
        ));

        report.push_str("── LUCK BANDS ───────────────────────────────────────────────────\n");
        for band in &self.bands {
            let bar: String = "█".repeat((band.share * 100.0 / 2.0) as usize);
            report.push_str(&format!(
                "  {:<22} {:>5.1}% {}\n",
                band.band.name(),
                band.share * 100.0,
                bar
            ));
        }
        report.push('\n');

        report.push_str("── SPECIAL EVENTS (per session) ─────────────────────────────────\n");
        for event in &self.events {
            report.push_str(&format!(
                "  {:<16} {:.4}\n",
                event.kind.name(),
                event.per_session
            ));
        }
        report.push('\n');

        report.push_str("── REALMS ───────────────────────────────────────────────────────\n");
        report.push_str(&format!("  Mean Realm:  {:.2}\n", self.mean_realm));
        report.push_str(&format!("  Max Realm:   {}\n", self.max_realm));
        report.push_str(&format!("  Mean Toxin:  {:.1}\n", self.mean_toxin));
        for (realm, count) in &self.realm_distribution {
            let pct = *count as f64 / self.num_characters.max(1) as f64 * 100.0;
            report.push_str(&format!("  Realm {:2}: {:>5.1}%\n", realm, pct));
        }
        report.push('\n');

        report.push_str("── BREAKTHROUGHS ────────────────────────────────────────────────\n");
        report.push_str(&format!(
            "  Attempts:          {}\n",
            self.breakthrough_attempts
        ));
        report.push_str(&format!(
            "  Observed Success:  {:.2}%\n",
            self.observed_success_rate * 100.0
        ));
        report.push_str(&format!(
            "  Mean Final Rate:   {:.2}%\n\n",
            self.mean_final_rate * 100.0
        ));

        report.push_str("── CALIBRATION ──────────────────────────────────────────────────\n");
        let mut flagged = false;
        if self.num_characters >= 10_000 && self.max_affinity_deviation > 0.01 {
            flagged = true;
            report.push_str("  ⚠️  Affinity shares drift more than 1 pp from declared weights\n");
        }
        if self.breakthrough_attempts >= 10_000
            && (self.observed_success_rate - self.mean_final_rate).abs() > 0.01
        {
            flagged = true;
            report.push_str("  ⚠️  Breakthrough successes disagree with computed rates\n");
        }
        if !flagged {
            report.push_str("  Observed frequencies match declared distributions\n");
        }

        report.push_str("\n═══════════════════════════════════════════════════════════════\n");

        report
    }

    /// Generate a JSON report for further analysis.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(affinity: &str, realm: u32) -> CharacterRun {
        let mut run = CharacterRun::new(affinity);
        run.sessions = 10;
        run.band_counts[LuckBand::Neutral.index()] = 10;
        run.attempts = 2;
        run.successes = 1;
        run.final_rate_sum = 1.0;
        run.final_realm = realm;
        run
    }

    #[test]
    fn test_report_generation() {
        let engine = EngineConfig::embedded().unwrap();
        let config = SimConfig {
            num_characters: 2,
            ticks_per_character: 10,
            ..Default::default()
        };
        let report = SimReport::from_runs(
            &engine,
            &config,
            42,
            vec![run("triple", 2), run("heavenly", 4)],
        );

        assert_eq!(report.total_sessions, 20);
        assert!((report.mean_realm - 3.0).abs() < 1e-9);
        assert_eq!(report.max_realm, 4);
        assert_eq!(report.breakthrough_attempts, 4);
        assert!((report.observed_success_rate - 0.5).abs() < 1e-9);
        assert!((report.mean_final_rate - 0.5).abs() < 1e-9);
        let neutral = &report.bands[LuckBand::Neutral.index()];
        assert_eq!(neutral.share, 1.0);
        let triple = report.affinity.iter().find(|s| s.id == "triple").unwrap();
        assert_eq!(triple.count, 1);
        assert_eq!(triple.observed, 0.5);
    }

    #[test]
    fn test_text_and_json_render() {
        let engine = EngineConfig::embedded().unwrap();
        let config = SimConfig {
            num_characters: 1,
            ..Default::default()
        };
        let report = SimReport::from_runs(&engine, &config, 1, vec![run("dual", 1)]);
        assert!(report.to_text().contains("PROGRESSION SIMULATION REPORT"));
        let json: serde_json::Value = serde_json::from_str(&report.to_json()).unwrap();
        assert_eq!(json["num_characters"], 1);
        assert_eq!(json["bands"][2]["band"], "neutral");
    }
}
