use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use civica::{CityConfig, Engine, GameMode};

#[derive(Debug, Parser)]
#[command(author, version, about = "Turn-based city simulation runner")]
struct Cli {
    /// Path to a city YAML file (uses the built-in demo city when omitted)
    #[arg(long)]
    city: Option<PathBuf>,

    /// Number of turns to simulate
    #[arg(long, default_value_t = 60)]
    ticks: u64,

    /// Override the scenario's election/random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Run in sandbox mode (policies apply without a vote)
    #[arg(long)]
    sandbox: bool,

    /// Emit one JSON turn summary per line instead of text
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.city {
        Some(path) => CityConfig::from_yaml_file(path)?,
        None => CityConfig::demo_city(),
    };
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    let mode = if cli.sandbox {
        GameMode::Sandbox
    } else {
        GameMode::Political
    };
    let city_name = config.name.clone();
    let mut engine = Engine::new(config, mode)?;

    for _ in 0..cli.ticks {
        let result = engine.tick();
        if cli.json {
            println!("{}", serde_json::to_string(&result)?);
        } else {
            println!(
                "turn {:>4}  pop {:>8}  happiness {:.3}  congestion {:.3}  rent {:>7.0}  balance {:>10.0}  events {}",
                result.turn,
                result.after.population,
                result.after.overall_happiness,
                result.after.congestion_index,
                result.after.average_rent,
                engine.state().budget.balance,
                result.events.len(),
            );
        }
        if engine.is_game_over() {
            break;
        }
    }

    if let Some(outcome) = engine.outcome() {
        println!(
            "'{}' ended after {} turns: {} ({})",
            city_name,
            engine.turn(),
            if outcome.won { "victory" } else { "defeat" },
            outcome.reason
        );
    } else {
        let metrics = engine.metrics();
        println!(
            "'{}' after {} turns: population {}, happiness {:.3}, balance {:.0}",
            city_name,
            engine.turn(),
            metrics.population,
            metrics.overall_happiness,
            engine.state().budget.balance
        );
    }
    Ok(())
}
