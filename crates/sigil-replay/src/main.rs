//! Replays a recorded input trace through the casting core.
//!
//! Prints a header line with the world fingerprint, then every event as one
//! JSON object per line. Two runs over the same config and trace print the
//! same bytes.
//!
//! ```text
//! sigil-replay --config world.toml --trace session.json
//! RUST_LOG=sigil_core=debug sigil-replay -c world.toml -t session.json --ticks 200
//! ```

mod trace;

use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use sigil_core::{fingerprint, SpellConfig, SpellEngine};

use trace::Trace;

/// Ticks simulated after the last command so pending casts can settle.
const SETTLE_TICKS: u64 = 100;

#[derive(Parser)]
#[command(name = "sigil-replay")]
#[command(about = "Replay a recorded input trace through the Sigil casting core")]
struct Cli {
    /// Path to the world config (.toml)
    #[arg(short, long)]
    config: PathBuf,

    /// Path to the recorded trace (.json)
    #[arg(short, long)]
    trace: PathBuf,

    /// Number of ticks to simulate (default: last command tick plus settle time)
    #[arg(long)]
    ticks: Option<u64>,

    /// Override the world seed from the config
    #[arg(long)]
    seed: Option<u64>,

    /// Refuse traces recorded in a different world
    #[arg(long)]
    strict: bool,
}

#[derive(Serialize)]
struct Header {
    seed: u64,
    fingerprint: u64,
    ticks: u64,
    casters: usize,
    commands: usize,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let mut config = SpellConfig::load(&cli.config)
        .with_context(|| format!("loading config {}", cli.config.display()))?;
    if let Some(seed) = cli.seed {
        config.world_seed = seed;
    }
    let trace = Trace::load(&cli.trace)?;

    let mut engine = SpellEngine::builder(config)
        .with_registry(Box::new(trace.roster()))
        .with_resources(Box::new(trace.resources()))
        .build()?;

    let world = fingerprint(engine.symbol_map());
    if let Some(recorded) = trace.fingerprint {
        if recorded != world {
            if cli.strict {
                bail!("trace was recorded in world {recorded:#018x}, config builds {world:#018x}");
            }
            warn!(recorded, world, "trace fingerprint mismatch, symbols may not resolve");
        }
    }

    let ticks = cli
        .ticks
        .unwrap_or_else(|| trace.last_tick() + SETTLE_TICKS);
    info!(ticks, commands = trace.commands.len(), "replaying trace");

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let header = Header {
        seed: engine.config().world_seed,
        fingerprint: world,
        ticks,
        casters: trace.casters.len(),
        commands: trace.commands.len(),
    };
    serde_json::to_writer(&mut out, &header)?;
    writeln!(out)?;

    let mut emitted = 0_usize;
    for tick in 0..ticks {
        for timed in trace.at(tick) {
            engine.submit(timed.command.clone());
        }
        engine.step();
        for envelope in engine.take_events() {
            serde_json::to_writer(&mut out, &envelope)?;
            writeln!(out)?;
            emitted += 1;
        }
    }
    out.flush()?;

    let skipped = trace.commands.iter().filter(|c| c.tick >= ticks).count();
    if skipped > 0 {
        warn!(skipped, "commands scheduled after the last simulated tick were not replayed");
    }
    info!(events = emitted, "replay finished");
    Ok(())
}
