//! Progression balance simulator CLI.
//!
//! Runs Monte Carlo simulations over the engine's own rules and checks the
//! observed frequencies against the configured distributions.
//!
//! Usage:
//!   cargo run --bin simulate -- [OPTIONS]
//!
//! Examples:
//!   cargo run --bin simulate                    # Default: 10,000 characters, one week
//!   cargo run --bin simulate -- -n 500 -t 288   # 500 characters, one day
//!   cargo run --bin simulate -- --seed 42       # Reproducible run

use ascend::config::EngineConfig;
use ascend::simulator::{run_simulation, SimConfig};
use std::env;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    let config = parse_args(&args);

    let engine = match EngineConfig::from_env() {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Failed to load engine config: {}", e);
            return ExitCode::FAILURE;
        }
    };

    println!("╔═══════════════════════════════════════════════════════════════╗");
    println!("║              ASCEND BALANCE SIMULATOR                         ║");
    println!("╚═══════════════════════════════════════════════════════════════╝");
    println!();
    println!("Configuration:");
    println!("  Characters:     {}", config.num_characters);
    println!("  Sessions:       {}", config.ticks_per_character);
    println!("  Sessions/day:   {}", config.ticks_per_day);
    println!("  Breakthroughs:  {}", config.attempt_breakthroughs);
    if let Some(seed) = config.seed {
        println!("  Seed:           {}", seed);
    }
    println!();
    println!("Running simulation...");
    println!();

    let report = match run_simulation(&engine, &config) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Simulation failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if config.verbosity > 0 {
        println!("{}", report.to_text());
    }

    if args.iter().any(|a| a == "--json") {
        let filename = format!(
            "sim_report_{}.json",
            chrono::Utc::now().format("%Y%m%d_%H%M%S")
        );
        if let Err(e) = std::fs::write(&filename, report.to_json()) {
            eprintln!("Failed to write JSON report: {}", e);
            return ExitCode::FAILURE;
        }
        println!("JSON report saved to: {}", filename);
    }

    ExitCode::SUCCESS
}

fn parse_args(args: &[String]) -> SimConfig {
    let mut config = SimConfig::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-n" | "--characters" => {
                if i + 1 < args.len() {
                    config.num_characters = args[i + 1].parse().unwrap_or(10_000);
                    i += 1;
                }
            }
            "-t" | "--ticks" => {
                if i + 1 < args.len() {
                    config.ticks_per_character = args[i + 1].parse().unwrap_or(2_016);
                    i += 1;
                }
            }
            "-s" | "--seed" => {
                if i + 1 < args.len() {
                    config.seed = args[i + 1].parse().ok();
                    i += 1;
                }
            }
            "--no-breakthrough" => {
                config.attempt_breakthroughs = false;
            }
            "-q" | "--quiet" => {
                config.verbosity = 0;
            }
            "-v" | "--verbose" => {
                config.verbosity = 2;
            }
            "--quick" => {
                config = SimConfig::affinity_check(100_000);
            }
            "--long" => {
                config = SimConfig::long_horizon();
            }
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            _ => {}
        }
        i += 1;
    }

    config
}

fn print_help() {
    println!("Ascend Balance Simulator");
    println!();
    println!("USAGE:");
    println!("    cargo run --bin simulate -- [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    -n, --characters <N>  Number of simulated characters (default: 10,000)");
    println!("    -t, --ticks <T>       Training sessions per character (default: 2,016)");
    println!("    -s, --seed <S>        Random seed for reproducibility");
    println!("    --no-breakthrough     Never attempt breakthroughs");
    println!("    -q, --quiet           Skip the text report");
    println!("    -v, --verbose         Print one line per character");
    println!("    --json                Save JSON report");
    println!("    --quick               Affinity check (100,000 characters, one session)");
    println!("    --long                Realm pacing (500 characters, 90 days)");
    println!("    -h, --help            Show this help");
    println!();
    println!("ENVIRONMENT:");
    println!("    ASCEND_CONFIG         Path to an engine config TOML file");
    println!("    RUST_LOG              Log filter, e.g. ascend=debug");
}
