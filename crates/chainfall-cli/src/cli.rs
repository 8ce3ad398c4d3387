//! CLI argument definitions for Chainfall.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `drill` | Replay a scripted failover plan through the orchestrator |
//! | `config` | Print the effective orchestrator configuration |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--strict` | `false` | Exit with code 5 when any drill request fails |
//!
//! # Examples
//!
//! ```bash
//! # Check how the environment tunes the orchestrator
//! CHAINFALL_CIRCUIT_OPEN_MS=5000 chainfall config --pretty
//!
//! # Run a failover drill and show adapter decisions on stderr
//! RUST_LOG=chainfall_core=debug chainfall drill --plan drills/etherscan-outage.json
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Chainfall - chain-aware fallback orchestration for token analysis sources
#[derive(Debug, Parser)]
#[command(
    name = "chainfall",
    author,
    version,
    about = "Chain-aware fallback orchestration drills",
    long_about = "Chainfall routes token analysis requests across competing per-chain data \
sources with health scoring and circuit breaking.\n\
\n\
The CLI replays scripted outage drills and reports every routing decision \
together with the resulting health table."
)]
pub struct Cli {
    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Treat any failed drill request as a command failure (exit code 5).
    #[arg(long, global = true, default_value_t = false)]
    pub strict: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Replay a failover drill plan.
    ///
    /// The plan declares scripted adapters and rounds of requests. Each round
    /// runs as one batch; the report lists every outcome and the final
    /// health snapshot.
    ///
    /// # Examples
    ///
    ///   chainfall drill --plan outage.json
    ///   chainfall drill --plan outage.json --pretty --strict
    Drill(DrillArgs),

    /// Print the effective configuration after CHAINFALL_* overrides.
    Config,
}

#[derive(Debug, Args)]
pub struct DrillArgs {
    /// Path to the JSON drill plan.
    #[arg(long, value_name = "FILE")]
    pub plan: PathBuf,
}
