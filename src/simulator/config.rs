//! Simulation configuration.

/// Configuration for a simulation run.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Number of simulated characters
    pub num_characters: u32,

    /// Training sessions per character
    pub ticks_per_character: u64,

    /// Sessions between daily luck re-rolls (288 five-minute ticks per day)
    pub ticks_per_day: u64,

    /// Random seed for reproducibility (None = random)
    pub seed: Option<u64>,

    /// Whether characters attempt breakthroughs as soon as they qualify
    pub attempt_breakthroughs: bool,

    /// Log verbosity (0 = silent, 1 = summary, 2 = detailed)
    pub verbosity: u8,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            num_characters: 10_000,
            ticks_per_character: 2_016,
            ticks_per_day: 288,
            seed: None,
            attempt_breakthroughs: true,
            verbosity: 1,
        }
    }
}

impl SimConfig {
    /// Many characters, few ticks: checks affinity shares against weights.
    pub fn affinity_check(num_characters: u32) -> Self {
        Self {
            num_characters,
            ticks_per_character: 1,
            attempt_breakthroughs: false,
            ..Default::default()
        }
    }

    /// Fewer characters over a long horizon: checks realm pacing.
    pub fn long_horizon() -> Self {
        Self {
            num_characters: 500,
            ticks_per_character: 288 * 90,
            ..Default::default()
        }
    }
}
