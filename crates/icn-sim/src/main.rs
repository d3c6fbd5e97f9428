use std::fs;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use icn_core::config::AqmModeInput;
use icn_sim::config::TopologyConfig;
use icn_sim::scenario;
use icn_sim::topology::Simulation;

#[derive(Parser, Debug)]
#[command(name = "icn-sim", about = "Discrete-event harness for the ICN congestion-control core")]
struct Cli {
    /// RNG seed override; applies to both built-in scenarios and TOML
    /// scenario files (overriding the file's own `seed`, if any).
    #[arg(long)]
    seed: Option<u64>,

    /// AQM discipline override for the run (built-in scenarios only;
    /// a TOML scenario file's own `queue_mode` wins otherwise).
    #[arg(long, value_enum)]
    queue_mode: Option<QueueModeArg>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum QueueModeArg {
    DropTail,
    Pie,
    Codel,
}

impl From<QueueModeArg> for AqmModeInput {
    fn from(v: QueueModeArg) -> Self {
        match v {
            QueueModeArg::DropTail => AqmModeInput::DropTail,
            QueueModeArg::Pie => AqmModeInput::Pie,
            QueueModeArg::Codel => AqmModeInput::CoDel,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one of the six built-in scenarios for a fixed duration.
    Run {
        /// One of the names in `icn_sim::scenario::NAMES`.
        name: String,
        #[arg(long, default_value_t = 10.0)]
        duration_s: f64,
    },
    /// Run a scenario described by a TOML topology file.
    RunConfig {
        path: String,
    },
    /// List the built-in scenario names.
    List,
}

fn main() -> anyhow::Result<()> {
    icn_core::init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::List => {
            for name in scenario::NAMES {
                println!("{name}");
            }
            Ok(())
        }
        Command::Run { name, duration_s } => {
            let seed = cli.seed.unwrap_or(1);
            let Some(mut sim) = scenario::build(&name, seed) else {
                bail!(
                    "unknown scenario '{name}'; run `icn-sim list` for the available names"
                );
            };
            tracing::info!(scenario = %name, seed, duration_s, "starting scenario");
            run_and_report(&mut sim, Duration::from_secs_f64(duration_s));
            Ok(())
        }
        Command::RunConfig { path } => {
            let raw = fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
            let mut cfg = TopologyConfig::from_toml_str(&raw).with_context(|| format!("parsing {path}"))?;
            if let Some(seed) = cli.seed {
                cfg.seed = seed;
            }
            if let Some(mode) = cli.queue_mode {
                cfg.shaper.queue_mode = mode.into();
            }
            let duration = cfg.duration;
            let mut sim = Simulation::from_config(&cfg);
            tracing::info!(path, seed = cfg.seed, "starting scenario from config");
            run_and_report(&mut sim, duration);
            Ok(())
        }
    }
}

fn run_and_report(sim: &mut Simulation, duration: Duration) {
    let until = icn_core::clock::Time::from_nanos(duration.as_nanos() as u64);
    sim.run_until(until);
    println!("interests sent:     {}", sim.stats.interests_sent);
    println!("content received:   {}", sim.stats.content_received);
    println!("give-up-pit NACKs:  {}", sim.stats.nacks_give_up_pit);
    println!("pit retransmits:    {}", sim.stats.pit_retransmissions);
    for (face, count) in &sim.stats.drops {
        println!("drops on face {face}: {count}");
    }
}
