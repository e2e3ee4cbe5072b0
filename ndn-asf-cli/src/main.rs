use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

/// Adaptive SRTT forwarding scenario runner
#[derive(Parser)]
#[clap(author, version, about)]
struct Cli {
    /// Sets the level of verbosity
    #[clap(short, long, global = true)]
    verbose: bool,

    /// Subcommand to execute
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the two-path grid: a cheap slow route against a fast expensive one
    Grid {
        /// Number of Interests per batch
        #[clap(short, long, default_value = "30")]
        count: u32,

        /// Seconds between consecutive Interests
        #[clap(short, long, default_value = "1")]
        interval: u64,

        /// Strategy parameters appended to the strategy name,
        /// e.g. /probing-interval~30000/max-timeouts~5
        #[clap(short, long)]
        params: Option<String>,

        /// RNG seed for reproducible probe timing
        #[clap(short, long)]
        seed: Option<u64>,

        /// Fail the fast link after the first batch and run a second one
        #[clap(long)]
        fail: bool,

        /// Emit the report as JSON
        #[clap(long)]
        json: bool,
    },

    /// Run the grid with a dead-end route that answers with NoRoute Nacks
    Nack {
        /// Number of Interests to send
        #[clap(short, long, default_value = "30")]
        count: u32,

        /// RNG seed for reproducible probe timing
        #[clap(short, long)]
        seed: Option<u64>,

        /// Emit the report as JSON
        #[clap(long)]
        json: bool,
    },

    /// Replay the per-upstream retransmission suppression sequence
    Suppression {
        /// Emit the report as JSON
        #[clap(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if cli.verbose { "debug" } else { "info" }),
    )
    .init();

    match cli.command {
        Commands::Grid {
            count,
            interval,
            params,
            seed,
            fail,
            json,
        } => commands::grid::run(count, interval, params.as_deref(), seed, fail, json),
        Commands::Nack { count, seed, json } => commands::nack::run(count, seed, json),
        Commands::Suppression { json } => commands::suppression::run(json),
    }
}
